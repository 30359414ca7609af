//! 文件系统的几何参数，进程生命周期内固定不变

use core::fmt;

/// 数据块大小（字节）
pub const BLOCK_SIZE: usize = 32;
/// 数据块总数
pub const NUM_BLOCKS: usize = 64;
/// inode 总数，其中 0 号留给根目录
pub const NUM_INODES: usize = 16;
/// 每个 inode 的直接索引数
pub const NUM_POINTERS: usize = 8;
/// 打开文件表的槽位数
pub const NUM_OPEN_FILES: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub block_size: usize,
    pub blocks: usize,
    pub inodes: usize,
    pub pointers: usize,
    pub open_files: usize,
    /// 根目录可容纳的目录项数
    pub dir_entries: usize,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            block_size: BLOCK_SIZE,
            blocks: NUM_BLOCKS,
            inodes: NUM_INODES,
            pointers: NUM_POINTERS,
            open_files: NUM_OPEN_FILES,
            dir_entries: NUM_INODES,
        }
    }
}

impl Geometry {
    /// 单个文件能达到的最大字节数，没有间接索引
    #[inline]
    pub const fn max_file_size(&self) -> usize {
        self.pointers * self.block_size
    }

    pub fn validate(&self) -> Result<(), GeometryError> {
        if self.block_size == 0 {
            return Err(GeometryError::ZeroBlockSize);
        }
        if self.blocks == 0 {
            return Err(GeometryError::ZeroBlocks);
        }
        if self.inodes < 2 {
            return Err(GeometryError::TooFewInodes);
        }
        if self.pointers == 0 {
            return Err(GeometryError::ZeroPointers);
        }
        if self.open_files == 0 {
            return Err(GeometryError::ZeroOpenFiles);
        }
        if self.dir_entries == 0 {
            return Err(GeometryError::ZeroDirEntries);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryError {
    ZeroBlockSize,
    ZeroBlocks,
    /// 根目录占去一个 inode 后至少还要剩一个
    TooFewInodes,
    ZeroPointers,
    ZeroOpenFiles,
    ZeroDirEntries,
}

impl fmt::Display for GeometryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            GeometryError::ZeroBlockSize => "block size must be non-zero",
            GeometryError::ZeroBlocks => "at least one data block is required",
            GeometryError::TooFewInodes => "at least two inodes are required",
            GeometryError::ZeroPointers => "at least one direct pointer is required",
            GeometryError::ZeroOpenFiles => "at least one open-file slot is required",
            GeometryError::ZeroDirEntries => "at least one directory entry is required",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for GeometryError {}
