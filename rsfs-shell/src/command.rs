//! 脚本中的一行命令

use std::str::FromStr;

use rsfs::{Fd, OpenFlag};

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Create(char),
    Delete(char),
    /// 原始打开标志，是否有效由文件系统判定
    Open(char, u32),
    Close(Fd),
    Read(Fd, usize),
    Write(Fd, String),
    Append(Fd, String),
    Seek(Fd, isize),
    Stat,
    Help,
    Quit,
}

pub const HELP: &str = "\
create NAME          create an empty file (NAME is one character)
delete NAME          delete a closed file
open NAME ro|rw|BITS open a file, prints the descriptor
close FD             close a descriptor
read FD SIZE         read up to SIZE bytes from the current position
write FD TEXT        overwrite from the current position, truncating the rest
append FD TEXT       append to the end of the file
seek FD OFFSET       move the position, out-of-range offsets leave it unchanged
stat                 print the file system status
help                 print this message
quit                 stop reading commands";

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (op, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim_start();

        match op {
            "create" => name(rest).map(Command::Create),
            "delete" => name(rest).map(Command::Delete),
            "open" => {
                let (file, mode) = rest
                    .split_once(char::is_whitespace)
                    .ok_or("usage: open NAME ro|rw")?;
                let flags = match mode.trim() {
                    "ro" => OpenFlag::RDONLY,
                    "rw" => OpenFlag::read_write().bits(),
                    raw => raw
                        .parse::<u32>()
                        .map_err(|_| format!("unknown mode {raw:?}"))?,
                };
                Ok(Command::Open(name(file)?, flags))
            }
            "close" => fd(rest).map(Command::Close),
            "read" => {
                let (fd_arg, size) = two(rest, "usage: read FD SIZE")?;
                let size = size.parse().map_err(|_| format!("bad size {size:?}"))?;
                Ok(Command::Read(fd(fd_arg)?, size))
            }
            "write" => {
                let (fd_arg, text) = two(rest, "usage: write FD TEXT")?;
                Ok(Command::Write(fd(fd_arg)?, text.to_owned()))
            }
            "append" => {
                let (fd_arg, text) = two(rest, "usage: append FD TEXT")?;
                Ok(Command::Append(fd(fd_arg)?, text.to_owned()))
            }
            "seek" => {
                let (fd_arg, offset) = two(rest, "usage: seek FD OFFSET")?;
                let offset = offset
                    .parse()
                    .map_err(|_| format!("bad offset {offset:?}"))?;
                Ok(Command::Seek(fd(fd_arg)?, offset))
            }
            "stat" => Ok(Command::Stat),
            "help" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(format!("unknown command {other:?}, try `help`")),
        }
    }
}

fn name(arg: &str) -> Result<char, String> {
    let mut chars = arg.trim().chars();
    match (chars.next(), chars.next()) {
        (Some(name), None) => Ok(name),
        _ => Err(format!("file name must be one character, got {arg:?}")),
    }
}

fn fd(arg: &str) -> Result<Fd, String> {
    arg.trim()
        .parse::<usize>()
        .map(Fd::from)
        .map_err(|_| format!("bad descriptor {arg:?}"))
}

fn two<'a>(rest: &'a str, usage: &str) -> Result<(&'a str, &'a str), String> {
    rest.split_once(char::is_whitespace)
        .map(|(first, second)| (first, second.trim_start()))
        .ok_or_else(|| usage.to_owned())
}

#[cfg(test)]
mod tests {
    use super::Command;
    use rsfs::{Fd, OpenFlag};

    #[test]
    fn parses_commands() {
        assert_eq!("create A".parse::<Command>(), Ok(Command::Create('A')));
        assert_eq!(
            "open A rw".parse::<Command>(),
            Ok(Command::Open('A', OpenFlag::read_write().bits()))
        );
        assert_eq!(
            "open A 0".parse::<Command>(),
            Ok(Command::Open('A', OpenFlag::RDONLY))
        );
        assert_eq!("open A 8".parse::<Command>(), Ok(Command::Open('A', 8)));
        assert_eq!(
            "write 0 hello world".parse::<Command>(),
            Ok(Command::Write(Fd::from(0), "hello world".to_owned()))
        );
        assert_eq!("seek 1 -3".parse::<Command>(), Ok(Command::Seek(Fd::from(1), -3)));
        assert_eq!("  stat  ".parse::<Command>(), Ok(Command::Stat));
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!("create AB".parse::<Command>().is_err());
        assert!("open A".parse::<Command>().is_err());
        assert!("open A x".parse::<Command>().is_err());
        assert!("read x 3".parse::<Command>().is_err());
        assert!("format".parse::<Command>().is_err());
    }
}
