use alloc::string::ToString;
use alloc::vec::Vec;
use core::fmt;

/// 文件系统某一时刻的快照
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stat<N = char> {
    pub files: Vec<FileStat<N>>,
    pub blocks_total: usize,
    pub blocks_used: usize,
    pub inodes_total: usize,
    pub inodes_used: usize,
    /// 处于打开状态的会话数
    pub open_files: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStat<N = char> {
    pub name: N,
    /// File size
    pub length: usize,
    pub inode: usize,
}

impl<N: fmt::Display> fmt::Display for Stat<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>16}{:>10}{:>10}", "File Name", "Length", "iNode #")?;
        for file in &self.files {
            writeln!(
                f,
                "{:>16}{:>10}{:>10}",
                file.name.to_string(),
                file.length,
                file.inode
            )?;
        }
        writeln!(
            f,
            "\nTotal Data Blocks: {:>4},  Used: {},  Unused: {}",
            self.blocks_total,
            self.blocks_used,
            self.blocks_total - self.blocks_used
        )?;
        writeln!(
            f,
            "Total iNode Blocks: {:>3},  Used: {},  Unused: {}",
            self.inodes_total,
            self.inodes_used,
            self.inodes_total - self.inodes_used
        )?;
        write!(f, "Total Opened Files: {:>3}", self.open_files)
    }
}
