//! # rsfs
//!
//! 纯内存、可多线程并发访问的文件系统。整体架构，自上而下：
//!
//! 1. 文件操作层：create/delete/open/close/read/write/append/seek
//! 2. 打开文件表：描述符到会话的映射，每个会话一把锁
//! 3. 索引节点层：直接索引的 inode，每个 inode 带元数据锁与准入闸门
//! 4. 数据块层：固定大小的数据块与分配位图
//!
//! 根目录是单层的线性表，作为外部协作者通过 [`Directory`] 接入。

// 文件操作层
mod fs;

// 打开文件表
mod open_file;

// 索引节点层
mod admission;
mod inode;

// 数据块层
mod bitmap;
mod block_store;

mod config;
mod directory;
mod id;
mod sync;

pub use self::{
    admission::AdmissionState,
    config::{
        BLOCK_SIZE, Geometry, GeometryError, NUM_BLOCKS, NUM_INODES, NUM_OPEN_FILES, NUM_POINTERS,
    },
    directory::{Directory, FlatDirectory},
    fs::FileSystem,
    id::{BlockId, Fd, InodeId},
    open_file::{AccessMode, OpenFlag, Session},
};
