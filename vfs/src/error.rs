use core::fmt;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// 同名文件已存在
    AlreadyExists,
    NotFound,
    /// 打开标志既非只读也非读写
    InvalidMode,
    /// 描述符越界或未被占用
    InvalidFd,
    /// 会话的访问模式不允许该操作
    WrongMode,
    /// inode、数据块或会话槽位用尽
    ResourceExhausted,
    /// 目录项指向越界或未分配的 inode，属于内部不一致
    InvalidInode,
    /// 文件仍被打开
    Busy,
}

impl Error {
    /// 稳定的负数错误码，供命令行等外部调用者使用
    pub const fn code(self) -> isize {
        match self {
            Error::AlreadyExists => -1,
            Error::NotFound => -2,
            Error::InvalidMode => -3,
            Error::InvalidFd => -4,
            Error::WrongMode => -5,
            Error::ResourceExhausted => -6,
            Error::InvalidInode => -7,
            Error::Busy => -8,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Error::AlreadyExists => "file already exists",
            Error::NotFound => "no such file",
            Error::InvalidMode => "invalid access mode",
            Error::InvalidFd => "bad file descriptor",
            Error::WrongMode => "operation not permitted by access mode",
            Error::ResourceExhausted => "no free slot left",
            Error::InvalidInode => "directory entry points at an invalid inode",
            Error::Busy => "file is still open",
        };
        f.write_str(msg)
    }
}

impl core::error::Error for Error {}
