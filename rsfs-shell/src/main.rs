mod cli;
mod command;

use std::fs::File;
use std::io::{self, BufRead, BufReader};

use clap::Parser;
use rsfs::{AccessMode, FileSystem};

use self::{cli::Cli, command::Command};

fn main() -> io::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let geometry = cli.geometry();
    let fs = FileSystem::try_new(geometry)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;
    log::info!("geometry={geometry:?}");

    let input: Box<dyn BufRead> = match &cli.script {
        Some(path) => Box::new(BufReader::new(File::open(path)?)),
        None => Box::new(io::stdin().lock()),
    };

    for (lineno, line) in input.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() || line.trim_start().starts_with('#') {
            continue;
        }

        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(msg) => {
                eprintln!("line {}: {msg}", lineno + 1);
                continue;
            }
        };

        match run(&fs, command) {
            Some(output) => println!("{output}"),
            None => break,
        }
    }

    Ok(())
}

/// 执行一条命令并返回要打印的结果，`quit` 返回空
fn run(fs: &FileSystem, command: Command) -> Option<String> {
    let outcome = match command {
        Command::Create(name) => fs.create(name).map(|()| format!("created {name}")),
        Command::Delete(name) => fs.delete(name).map(|()| format!("deleted {name}")),
        Command::Open(name, bits) => AccessMode::try_from(bits)
            .and_then(|mode| fs.open(name, mode.into()))
            .map(|fd| format!("fd={fd}")),
        Command::Close(fd) => fs.close(fd).map(|()| format!("closed {fd}")),
        Command::Read(fd, size) => {
            // 读取量不会超过单个文件的上限
            let mut buf = vec![0; size.min(fs.geometry().max_file_size())];
            fs.read(fd, &mut buf).map(|n| {
                format!("read {n} bytes: {:?}", String::from_utf8_lossy(&buf[..n]))
            })
        }
        Command::Write(fd, text) => fs
            .write(fd, text.as_bytes())
            .map(|n| format!("wrote {n} of {} bytes", text.len())),
        Command::Append(fd, text) => fs
            .append(fd, text.as_bytes())
            .map(|n| format!("appended {n} of {} bytes", text.len())),
        Command::Seek(fd, offset) => fs.seek(fd, offset).map(|pos| format!("position={pos}")),
        Command::Stat => Ok(format!("\n{}\n", fs.stat())),
        Command::Help => Ok(crate::command::HELP.to_owned()),
        Command::Quit => return None,
    };

    Some(match outcome {
        Ok(msg) => msg,
        Err(err) => format!("error {}: {err}", err.code()),
    })
}
