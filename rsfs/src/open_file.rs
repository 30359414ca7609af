//! # 打开文件表
//!
//! 每个槽位是一次 open 得到的会话，各自带一把锁，
//! 同一描述符上的操作因此互斥。

use std::sync::{Mutex, MutexGuard};

use enumflags2::{BitFlags, bitflags};

use crate::id::{Fd, InodeId};
use crate::sync::lock;

#[rustfmt::skip]
#[allow(clippy::upper_case_acronyms)]
#[bitflags]
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenFlag {
    /// 只写，不受支持
    WRONLY = 0b01,
    /// 读写兼备
    RDWR   = 0b10,
}

impl OpenFlag {
    // enumflags2拒绝值为0的标志
    /// 只读
    pub const RDONLY: u32 = 0b00;

    #[inline]
    pub fn read_only() -> BitFlags<OpenFlag> {
        BitFlags::from_bits_truncate(Self::RDONLY)
    }

    #[inline]
    pub fn read_write() -> BitFlags<OpenFlag> {
        OpenFlag::RDWR.into()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    ReadOnly,
    ReadWrite,
}

impl AccessMode {
    /// 两种模式都可读
    #[inline]
    pub fn readable(self) -> bool {
        matches!(self, AccessMode::ReadOnly | AccessMode::ReadWrite)
    }

    #[inline]
    pub fn writable(self) -> bool {
        self == AccessMode::ReadWrite
    }
}

impl TryFrom<BitFlags<OpenFlag>> for AccessMode {
    type Error = vfs::Error;

    fn try_from(flags: BitFlags<OpenFlag>) -> Result<Self, Self::Error> {
        if flags.is_empty() {
            Ok(AccessMode::ReadOnly)
        } else if flags == OpenFlag::RDWR {
            Ok(AccessMode::ReadWrite)
        } else {
            Err(vfs::Error::InvalidMode)
        }
    }
}

/// 外部传入的原始标志，含未知位时无效
impl TryFrom<u32> for AccessMode {
    type Error = vfs::Error;

    fn try_from(bits: u32) -> Result<Self, Self::Error> {
        BitFlags::<OpenFlag>::from_bits(bits)
            .map_err(|_| vfs::Error::InvalidMode)
            .and_then(AccessMode::try_from)
    }
}

impl From<AccessMode> for BitFlags<OpenFlag> {
    fn from(mode: AccessMode) -> Self {
        match mode {
            AccessMode::ReadOnly => OpenFlag::read_only(),
            AccessMode::ReadWrite => OpenFlag::read_write(),
        }
    }
}

/// 一次打开文件的会话
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub inode: InodeId,
    pub mode: AccessMode,
    /// **文件**内的偏移量，总不超过文件长度
    pub position: usize,
}

pub struct OpenFileTable {
    /// 空表示槽位未被占用
    entries: Box<[Mutex<Option<Session>>]>,
}

impl OpenFileTable {
    pub fn new(count: usize) -> Self {
        Self {
            entries: (0..count).map(|_| Mutex::new(None)).collect(),
        }
    }

    /// 占用第一个空闲槽位。
    /// 认领发生在槽位自己的锁内，不需要整表的锁。
    pub fn alloc(&self, mode: AccessMode, inode: InodeId) -> Option<Fd> {
        self.entries.iter().enumerate().find_map(|(index, entry)| {
            let mut entry = lock(entry);
            entry.is_none().then(|| {
                *entry = Some(Session {
                    inode,
                    mode,
                    position: 0,
                });
                Fd::from(index)
            })
        })
    }

    /// 锁住描述符对应的槽位，越界即 [`vfs::Error::InvalidFd`]。
    /// 槽位是否在用由调用者检查。
    pub fn entry(&self, fd: Fd) -> vfs::Result<MutexGuard<'_, Option<Session>>> {
        self.entries
            .get(usize::from(fd))
            .map(lock)
            .ok_or(vfs::Error::InvalidFd)
    }

    pub fn used(&self) -> usize {
        self.entries
            .iter()
            .filter(|&entry| lock(entry).is_some())
            .count()
    }
}
