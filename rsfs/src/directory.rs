//! # 根目录
//!
//! 只有一层目录，文件名到 inode 编号的线性表。
//! 核心只依赖 [`Directory`] 提供的查找、插入与删除，
//! 换用更丰富的文件名类型无需改动其余部分。

use core::fmt::Debug;

use vfs::DirEntry;

use crate::id::InodeId;

pub trait Directory: Send {
    type Name: Copy + Eq + Debug + Send;

    fn lookup(&self, name: &Self::Name) -> Option<InodeId>;

    /// 同名项已存在时为 [`vfs::Error::AlreadyExists`]，
    /// 表满时为 [`vfs::Error::ResourceExhausted`]
    fn insert(&mut self, name: Self::Name, inode: InodeId) -> vfs::Result<()>;

    /// 删除并返回名字对应的 inode 编号
    fn remove(&mut self, name: &Self::Name) -> Option<InodeId>;

    fn entries(&self) -> Vec<DirEntry<Self::Name>>;
}

/// 固定容量的目录表，文件名为单个字符
#[derive(Debug)]
pub struct FlatDirectory {
    slots: Box<[Option<DirEntry<char>>]>,
}

impl FlatDirectory {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity].into_boxed_slice(),
        }
    }

    fn position(&self, name: char) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.is_some_and(|dirent| dirent.name == name))
    }
}

impl Directory for FlatDirectory {
    type Name = char;

    fn lookup(&self, name: &char) -> Option<InodeId> {
        self.position(*name)
            .and_then(|index| self.slots[index])
            .map(|dirent| InodeId::from(dirent.inode))
    }

    fn insert(&mut self, name: char, inode: InodeId) -> vfs::Result<()> {
        if self.position(name).is_some() {
            return Err(vfs::Error::AlreadyExists);
        }

        let slot = self
            .slots
            .iter_mut()
            .find(|slot| slot.is_none())
            .ok_or(vfs::Error::ResourceExhausted)?;
        *slot = Some(DirEntry {
            name,
            inode: inode.into(),
        });
        Ok(())
    }

    fn remove(&mut self, name: &char) -> Option<InodeId> {
        let index = self.position(*name)?;
        self.slots[index]
            .take()
            .map(|dirent| InodeId::from(dirent.inode))
    }

    fn entries(&self) -> Vec<DirEntry<char>> {
        self.slots.iter().flatten().copied().collect()
    }
}
