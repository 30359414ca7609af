/// 目录表中的一项：文件名到 inode 编号的映射
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirEntry<N = char> {
    pub name: N,
    /// Inode number
    pub inode: usize,
}
