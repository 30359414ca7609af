//! # 文件操作层
//!
//! 协调目录、inode 准入、打开文件表与数据块，实现 create/delete/open/close
//! 以及基于会话的 read/write/append/seek。
//!
//! 加锁顺序：
//! - 读写类操作：会话锁 → inode 元数据锁；
//! - 目录类操作：(统计锁 →) 目录锁 → inode 元数据锁 / 准入闸门。
//!
//! 不存在持有元数据锁或闸门时再去拿目录锁、会话锁的路径。
//! 准入等待期间不持有任何锁。

use std::sync::Mutex;

use enumflags2::BitFlags;
use vfs::{Error, FileStat, Stat};

use crate::admission::AdmissionState;
use crate::block_store::BlockStore;
use crate::config::Geometry;
use crate::directory::{Directory, FlatDirectory};
use crate::id::{Fd, InodeId};
use crate::inode::InodeTable;
use crate::open_file::{AccessMode, OpenFileTable, OpenFlag, Session};
use crate::sync::lock;

pub struct FileSystem<D: Directory = FlatDirectory> {
    geometry: Geometry,
    blocks: BlockStore,
    inodes: InodeTable,
    open_files: OpenFileTable,
    root: Mutex<D>,
    /// 保证 [`FileSystem::stat`] 之间互斥
    stat_lock: Mutex<()>,
}

impl FileSystem<FlatDirectory> {
    /// 几何参数无效时 panic，见 [`Geometry::validate`]
    pub fn new(geometry: Geometry) -> Self {
        match Self::try_new(geometry) {
            Ok(fs) => fs,
            Err(err) => panic!("invalid geometry {geometry:?}: {err}"),
        }
    }

    pub fn try_new(geometry: Geometry) -> Result<Self, crate::GeometryError> {
        Self::with_directory(geometry, FlatDirectory::with_capacity(geometry.dir_entries))
    }
}

impl<D: Directory> FileSystem<D> {
    pub fn with_directory(geometry: Geometry, root: D) -> Result<Self, crate::GeometryError> {
        geometry.validate()?;

        let inodes = InodeTable::new(geometry.inodes, geometry.pointers);
        // 0 号 inode 留给根目录
        assert_eq!(inodes.alloc(), Some(InodeId::ROOT));

        log::debug!("[fs] new file system {geometry:?}");
        Ok(Self {
            geometry,
            blocks: BlockStore::new(geometry.blocks, geometry.block_size),
            inodes,
            open_files: OpenFileTable::new(geometry.open_files),
            root: Mutex::new(root),
            stat_lock: Mutex::new(()),
        })
    }

    #[inline]
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// 创建空文件
    pub fn create(&self, name: D::Name) -> vfs::Result<()> {
        let mut root = lock(&self.root);
        if root.lookup(&name).is_some() {
            log::warn!("[create] file {name:?} already exists");
            return Err(Error::AlreadyExists);
        }

        let Some(inode) = self.inodes.alloc() else {
            log::warn!("[create] no free inode for {name:?}");
            return Err(Error::ResourceExhausted);
        };

        if let Err(err) = root.insert(name, inode) {
            log::warn!("[create] cannot insert {name:?} into root: {err}");
            self.inodes.dealloc(inode, &self.blocks);
            return Err(err);
        }

        log::debug!("[create] file {name:?} -> inode {inode}");
        Ok(())
    }

    /// 删除文件并回收其 inode 与数据块。
    ///
    /// 文件仍被打开时拒绝删除并返回 [`Error::Busy`]，存储总在最后一个会话关闭后才可回收。
    pub fn delete(&self, name: D::Name) -> vfs::Result<()> {
        let mut root = lock(&self.root);
        let Some(id) = root.lookup(&name) else {
            log::warn!("[delete] no file named {name:?}");
            return Err(Error::NotFound);
        };

        let inode = self.inode(id)?;
        let admission = inode.gate().state();
        if !admission.is_idle() {
            log::warn!("[delete] file {name:?} is held by {} session(s)", admission.holders());
            return Err(Error::Busy);
        }

        root.remove(&name);
        self.inodes.dealloc(id, &self.blocks);

        log::debug!("[delete] file {name:?} (inode {id})");
        Ok(())
    }

    /// 以只读（空标志）或读写方式打开文件，返回描述符。
    ///
    /// 读写打开会阻塞到其他会话全部关闭，只读打开会阻塞到写者关闭。
    pub fn open(&self, name: D::Name, flags: BitFlags<OpenFlag>) -> vfs::Result<Fd> {
        let mode = AccessMode::try_from(flags).inspect_err(|_| {
            log::warn!("[open] invalid access flags {flags:?}");
        })?;

        let (id, generation) = {
            let root = lock(&self.root);
            let Some(id) = root.lookup(&name) else {
                log::warn!("[open] no file named {name:?}");
                return Err(Error::NotFound);
            };
            (id, self.inode(id)?.meta().generation)
        };

        let gate = self.inodes.slot(id).gate();
        gate.acquire(mode);

        // 等待期间文件可能已被删除甚至重建，准入后再确认一次
        let still_there = {
            let root = lock(&self.root);
            root.lookup(&name) == Some(id)
                && self
                    .inodes
                    .get(id)
                    .is_ok_and(|inode| inode.meta().generation == generation)
        };
        if !still_there {
            gate.release(mode);
            log::warn!("[open] file {name:?} was deleted while waiting");
            return Err(Error::NotFound);
        }

        let Some(fd) = self.open_files.alloc(mode, id) else {
            gate.release(mode);
            log::warn!("[open] no free open-file entry for {name:?}");
            return Err(Error::ResourceExhausted);
        };

        log::debug!("[open] file {name:?} as {mode:?} -> fd {fd}");
        Ok(fd)
    }

    /// 关闭描述符并归还准入，唤醒等待者。重复关闭返回 [`Error::InvalidFd`]。
    pub fn close(&self, fd: Fd) -> vfs::Result<()> {
        let mut entry = self.open_files.entry(fd).inspect_err(|_| {
            log::warn!("[close] fd {fd} is out of range");
        })?;
        let Some(session) = *entry else {
            log::warn!("[close] fd {fd} is not in use");
            return Err(Error::InvalidFd);
        };

        self.inodes.slot(session.inode).gate().release(session.mode);
        *entry = None;

        log::debug!("[close] fd {fd}");
        Ok(())
    }

    /// 移动读写位置。
    ///
    /// 偏移在 `0..=length` 之内时更新位置；否则位置不变，
    /// 返回的是原来的位置而不是错误。
    pub fn seek(&self, fd: Fd, offset: isize) -> vfs::Result<usize> {
        let mut entry = self.session_entry(fd, "seek")?;
        let Some(session) = entry.as_mut() else {
            log::warn!("[seek] fd {fd} is not in use");
            return Err(Error::InvalidFd);
        };

        let length = self.inodes.slot(session.inode).meta().length;
        match usize::try_from(offset) {
            Ok(offset) if offset <= length => session.position = offset,
            _ => log::warn!("[seek] offset {offset} is outside 0..={length}, position stays"),
        }

        Ok(session.position)
    }

    /// 从当前位置读取至多 `buf.len()` 字节，位于文件末尾时读得 0 字节
    pub fn read(&self, fd: Fd, buf: &mut [u8]) -> vfs::Result<usize> {
        let mut entry = self.session_entry(fd, "read")?;
        let session = Self::checked(&mut entry, fd, "read", AccessMode::readable)?;

        let meta = self.inodes.slot(session.inode).meta();
        let read_size = meta.read_at(session.position, buf, &self.blocks);
        session.position += read_size;

        Ok(read_size)
    }

    /// 从当前位置覆盖写入，文件随即截断到写入终点。
    ///
    /// 数据块用尽或达到直接索引上限时只写入一部分，返回值即实际字节数。
    pub fn write(&self, fd: Fd, buf: &[u8]) -> vfs::Result<usize> {
        let mut entry = self.session_entry(fd, "write")?;
        let session = Self::checked(&mut entry, fd, "write", AccessMode::writable)?;

        let mut meta = self.inodes.slot(session.inode).meta();
        let written = meta.write_at(session.position, buf, &self.blocks);
        session.position += written;
        debug_assert_eq!(session.position, meta.length);

        if written < buf.len() {
            log::warn!("[write] fd {fd}: only {written} of {} bytes landed", buf.len());
        }
        Ok(written)
    }

    /// 忽略当前位置，追加到文件末尾，之后位置移到新的末尾
    pub fn append(&self, fd: Fd, buf: &[u8]) -> vfs::Result<usize> {
        let mut entry = self.session_entry(fd, "append")?;
        let session = Self::checked(&mut entry, fd, "append", AccessMode::writable)?;

        let mut meta = self.inodes.slot(session.inode).meta();
        let appended = meta.append(buf, &self.blocks);
        session.position = meta.length;

        if appended < buf.len() {
            log::warn!("[append] fd {fd}: only {appended} of {} bytes landed", buf.len());
        }
        Ok(appended)
    }

    /// 文件系统当前状态的快照
    pub fn stat(&self) -> Stat<D::Name> {
        let _guard = lock(&self.stat_lock);
        let root = lock(&self.root);

        let files = root
            .entries()
            .into_iter()
            .map(|dirent| FileStat {
                name: dirent.name,
                length: self.inodes.slot(InodeId::from(dirent.inode)).meta().length,
                inode: dirent.inode,
            })
            .collect();

        Stat {
            files,
            blocks_total: self.blocks.capacity(),
            blocks_used: self.blocks.used(),
            inodes_total: self.inodes.capacity(),
            inodes_used: self.inodes.used(),
            open_files: self.open_files.used(),
        }
    }

    /// 描述符对应会话的副本
    pub fn session(&self, fd: Fd) -> vfs::Result<Session> {
        (*self.session_entry(fd, "session")?).ok_or(Error::InvalidFd)
    }

    /// 文件当前的读者/写者登记情况
    pub fn admission(&self, name: D::Name) -> vfs::Result<AdmissionState> {
        let root = lock(&self.root);
        let id = root.lookup(&name).ok_or(Error::NotFound)?;
        Ok(self.inode(id)?.gate().state())
    }

    fn inode(&self, id: InodeId) -> vfs::Result<&crate::inode::Inode> {
        self.inodes.get(id).inspect_err(|_| {
            log::warn!("[fs] directory points at invalid inode {id}");
        })
    }

    fn session_entry(
        &self,
        fd: Fd,
        op: &str,
    ) -> vfs::Result<std::sync::MutexGuard<'_, Option<Session>>> {
        self.open_files.entry(fd).inspect_err(|_| {
            log::warn!("[{op}] fd {fd} is out of range");
        })
    }

    /// 确认槽位在用，且访问模式允许该操作
    fn checked<'a>(
        entry: &'a mut Option<Session>,
        fd: Fd,
        op: &str,
        allowed: fn(AccessMode) -> bool,
    ) -> vfs::Result<&'a mut Session> {
        let Some(session) = entry.as_mut() else {
            log::warn!("[{op}] fd {fd} is not in use");
            return Err(Error::InvalidFd);
        };
        if !allowed(session.mode) {
            log::warn!("[{op}] fd {fd} is opened {:?}", session.mode);
            return Err(Error::WrongMode);
        }
        Ok(session)
    }
}
