//! # 索引节点层
//!
//! inode 只有直接索引：`blocks[i]` 指向文件第 i 个逻辑块，
//! 文件最大为 `pointers * block_size` 字节。
//!
//! 每个 inode 带两把互不相干的锁：
//! - 元数据锁，保护长度与块索引，所有读写都要拿；
//! - 准入闸门，只在 open/close 时使用，见 [`AdmissionGate`]。

use std::sync::{Mutex, MutexGuard};

use spin::Mutex as SpinMutex;

use crate::admission::AdmissionGate;
use crate::bitmap::Bitmap;
use crate::block_store::BlockStore;
use crate::id::{BlockId, InodeId};
use crate::sync::lock;

pub struct InodeTable {
    bitmap: SpinMutex<Bitmap>,
    inodes: Box<[Inode]>,
}

pub struct Inode {
    meta: Mutex<InodeMeta>,
    gate: AdmissionGate,
}

#[derive(Debug)]
pub struct InodeMeta {
    /// 已用字节数
    pub length: usize,
    /// 直接索引，空表示未分配
    blocks: Box<[Option<BlockId>]>,
    /// 每次分配加一，用于识别同一编号的不同文件
    pub generation: u64,
}

impl InodeTable {
    pub fn new(count: usize, pointers: usize) -> Self {
        let inodes = (0..count)
            .map(|_| Inode {
                meta: Mutex::new(InodeMeta::new(pointers)),
                gate: AdmissionGate::new(),
            })
            .collect();

        Self {
            bitmap: SpinMutex::new(Bitmap::new(count)),
            inodes,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.inodes.len()
    }

    pub fn used(&self) -> usize {
        self.bitmap.lock().count_allocated()
    }

    /// 分配一个空闲 inode 并将其重置为空文件
    pub fn alloc(&self) -> Option<InodeId> {
        let id = InodeId::from(self.bitmap.lock().alloc()?);
        let mut meta = self.slot(id).meta();
        debug_assert!(meta.blocks.iter().all(Option::is_none));
        meta.length = 0;
        meta.generation += 1;
        Some(id)
    }

    /// 释放 inode 引用的全部数据块，再清除其位图位
    pub fn dealloc(&self, id: InodeId, store: &BlockStore) {
        self.slot(id).meta().clear(store);
        self.bitmap.lock().dealloc(id.into());
    }

    /// 校验编号有效且已分配
    pub fn get(&self, id: InodeId) -> vfs::Result<&Inode> {
        if self.bitmap.lock().is_allocated(id.into()) {
            Ok(&self.inodes[usize::from(id)])
        } else {
            Err(vfs::Error::InvalidInode)
        }
    }

    /// 不检查分配状态。
    /// 会话持有准入期间其 inode 不会被删除，直接按编号取即可。
    #[inline]
    pub fn slot(&self, id: InodeId) -> &Inode {
        &self.inodes[usize::from(id)]
    }
}

impl Inode {
    #[inline]
    pub fn meta(&self) -> MutexGuard<'_, InodeMeta> {
        lock(&self.meta)
    }

    #[inline]
    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }
}

impl InodeMeta {
    fn new(pointers: usize) -> Self {
        Self {
            length: 0,
            blocks: vec![None; pointers].into_boxed_slice(),
            generation: 0,
        }
    }

    #[inline]
    fn max_size(&self, store: &BlockStore) -> usize {
        self.blocks.len() * store.block_size()
    }

    /// 当前占用的数据块数
    #[cfg(test)]
    pub fn allocated_blocks(&self) -> usize {
        self.blocks.iter().filter(|block| block.is_some()).count()
    }

    /// 从 `offset` 起读出数据填充 `buf`，返回读到的字节数。
    /// 读取以文件长度为界，在文件末尾读得 0 字节。
    pub fn read_at(&self, offset: usize, buf: &mut [u8], store: &BlockStore) -> usize {
        let block_size = store.block_size();
        let mut start = offset;
        let end = (start + buf.len()).min(self.length);

        if start >= end {
            return 0;
        }

        let mut read_size = 0;
        loop {
            let block_index = start / block_size;
            // 当前块的末地址(字节)
            let current_block_end = ((block_index + 1) * block_size).min(end);
            let block_read_size = current_block_end - start;

            // 长度之内出现空洞说明 inode 已损坏，读到此为止
            let Some(block) = self.blocks[block_index] else {
                log::warn!("[inode] block {block_index} is missing below length {}", self.length);
                break;
            };

            let dest = &mut buf[read_size..read_size + block_read_size];
            store.map(block, |data| {
                let inner = start % block_size;
                dest.copy_from_slice(&data[inner..inner + block_read_size]);
            });
            log::trace!("[inode] read {block_read_size} bytes from {block:?}");

            read_size += block_read_size;

            if current_block_end == end {
                break;
            }

            start = current_block_end;
        }

        read_size
    }

    /// 从 `offset` 起覆盖写入，写完后文件恰好截断到写入终点。
    ///
    /// 超出直接索引上限或数据块用尽时提前停止，返回实际写入的字节数，
    /// 长度只反映真正落盘的部分。
    pub fn write_at(&mut self, offset: usize, buf: &[u8], store: &BlockStore) -> usize {
        debug_assert!(offset <= self.length);

        let block_size = store.block_size();
        let end = (offset + buf.len()).min(self.max_size(store));
        if end <= offset {
            self.truncate(offset, store);
            return 0;
        }

        // 先释放写入终点之后的块，本次写入就能复用它们
        self.release_from(end.div_ceil(block_size), store);

        let written = self.fill(offset, &buf[..end - offset], store);
        self.truncate(offset + written, store);
        written
    }

    /// 从文件末尾追加，返回实际追加的字节数
    pub fn append(&mut self, buf: &[u8], store: &BlockStore) -> usize {
        let offset = self.length;
        let end = (offset + buf.len()).min(self.max_size(store));
        if end <= offset {
            return 0;
        }

        let written = self.fill(offset, &buf[..end - offset], store);
        self.length += written;
        written
    }

    /// 将文件截为 `length` 字节，释放其后的全部块
    pub fn truncate(&mut self, length: usize, store: &BlockStore) {
        self.length = length;
        self.release_from(length.div_ceil(store.block_size()), store);
    }

    /// 释放全部数据块，文件变为空
    pub fn clear(&mut self, store: &BlockStore) {
        self.truncate(0, store);
    }

    /// 把 `data` 写到 `offset` 处，按需分配数据块，不改动长度
    fn fill(&mut self, offset: usize, data: &[u8], store: &BlockStore) -> usize {
        let block_size = store.block_size();
        let mut start = offset;
        let end = offset + data.len();

        let mut written_size = 0;
        while start < end {
            let block_index = start / block_size;
            let current_block_end = ((block_index + 1) * block_size).min(end);
            let block_write_size = current_block_end - start;

            let Some(block) = self.block_for_write(block_index, store) else {
                break;
            };

            let src = &data[written_size..written_size + block_write_size];
            store.map_mut(block, |data| {
                let inner = start % block_size;
                data[inner..inner + block_write_size].copy_from_slice(src);
            });
            log::trace!("[inode] wrote {block_write_size} bytes into {block:?}");

            written_size += block_write_size;
            start = current_block_end;
        }

        written_size
    }

    /// 取得第 `block_index` 个逻辑块，未分配则现场分配
    fn block_for_write(&mut self, block_index: usize, store: &BlockStore) -> Option<BlockId> {
        let slot = self.blocks.get_mut(block_index)?;
        if slot.is_none() {
            *slot = Some(store.alloc()?);
        }
        *slot
    }

    fn release_from(&mut self, first: usize, store: &BlockStore) {
        for slot in self.blocks.iter_mut().skip(first) {
            if let Some(block) = slot.take() {
                store.dealloc(block);
            }
        }
    }
}
