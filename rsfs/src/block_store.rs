//! # 数据块层
//!
//! 固定数量、固定大小的内存数据块，外加一张分配位图。
//! 块只在进程启动时清零，释放后不再清零：
//! 读取总以 inode 的长度为界，残留字节不会被看到。

use spin::Mutex;

use crate::bitmap::Bitmap;
use crate::id::BlockId;

pub struct BlockStore {
    block_size: usize,
    /// 块的内容由持有它的 inode 的元数据锁保护，
    /// 此处的锁几乎不会发生争用
    blocks: Box<[Mutex<Box<[u8]>>]>,
    bitmap: Mutex<Bitmap>,
}

impl BlockStore {
    pub fn new(count: usize, block_size: usize) -> Self {
        let blocks = (0..count)
            .map(|_| Mutex::new(vec![0u8; block_size].into_boxed_slice()))
            .collect();

        Self {
            block_size,
            blocks,
            bitmap: Mutex::new(Bitmap::new(count)),
        }
    }

    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.blocks.len()
    }

    pub fn used(&self) -> usize {
        self.bitmap.lock().count_allocated()
    }

    #[cfg(test)]
    pub fn is_allocated(&self, block: BlockId) -> bool {
        self.bitmap.lock().is_allocated(block.into())
    }

    /// 分配一个空闲块，块已用尽时返回空
    pub fn alloc(&self) -> Option<BlockId> {
        let block = self.bitmap.lock().alloc().map(BlockId::from);
        match block {
            Some(block) => log::trace!("[block] alloc {block:?}"),
            None => log::warn!("[block] all {} blocks are in use", self.capacity()),
        }
        block
    }

    /// 归还数据块。越界或重复释放属于编程错误，直接 panic。
    pub fn dealloc(&self, block: BlockId) {
        log::trace!("[block] dealloc {block:?}");
        self.bitmap.lock().dealloc(block.into());
    }

    pub fn map<V>(&self, block: BlockId, f: impl FnOnce(&[u8]) -> V) -> V {
        f(&self.blocks[usize::from(block)].lock())
    }

    pub fn map_mut<V>(&self, block: BlockId, f: impl FnOnce(&mut [u8]) -> V) -> V {
        f(&mut self.blocks[usize::from(block)].lock())
    }
}
