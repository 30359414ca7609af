use clap::Parser;
use rsfs::Geometry;
use std::path::PathBuf;

#[derive(Parser)]
#[command(about = "Drive an in-memory RSFS instance with a command script")]
pub struct Cli {
    /// Bytes per data block
    #[arg(long, default_value_t = rsfs::BLOCK_SIZE)]
    pub block_size: usize,

    /// Number of data blocks
    #[arg(long, default_value_t = rsfs::NUM_BLOCKS)]
    pub blocks: usize,

    /// Number of inodes, including the root directory
    #[arg(long, default_value_t = rsfs::NUM_INODES)]
    pub inodes: usize,

    /// Direct block pointers per inode
    #[arg(long, default_value_t = rsfs::NUM_POINTERS)]
    pub pointers: usize,

    /// Open-file table slots
    #[arg(long, default_value_t = rsfs::NUM_OPEN_FILES)]
    pub open_files: usize,

    /// Root directory capacity, defaults to the inode count
    #[arg(long)]
    pub dir_entries: Option<usize>,

    /// Command script, read from stdin when absent
    #[arg(long, short)]
    pub script: Option<PathBuf>,
}

impl Cli {
    pub fn geometry(&self) -> Geometry {
        Geometry {
            block_size: self.block_size,
            blocks: self.blocks,
            inodes: self.inodes,
            pointers: self.pointers,
            open_files: self.open_files,
            dir_entries: self.dir_entries.unwrap_or(self.inodes),
        }
    }
}
