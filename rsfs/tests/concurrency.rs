use std::sync::mpsc;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use rsfs::{FileSystem, Geometry, OpenFlag};
use vfs::Error;

fn shared() -> Arc<FileSystem> {
    Arc::new(FileSystem::new(Geometry {
        block_size: 32,
        blocks: 128,
        inodes: 16,
        pointers: 8,
        open_files: 32,
        dir_entries: 16,
    }))
}

#[test]
fn readers_proceed_together() {
    const READERS: usize = 8;
    let fs = shared();
    fs.create('A').unwrap();
    let barrier = Arc::new(Barrier::new(READERS));

    let handles: Vec<_> = (0..READERS)
        .map(|_| {
            let fs = fs.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                let fd = fs.open('A', OpenFlag::read_only()).unwrap();
                // 所有读者都打开之后才能越过屏障
                barrier.wait();
                let state = fs.admission('A').unwrap();
                assert_eq!(state.readers, READERS);
                assert!(!state.writer);
                barrier.wait();
                fs.close(fd).unwrap();
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert!(fs.admission('A').unwrap().is_idle());
}

#[test]
fn writer_waits_for_readers() {
    let fs = shared();
    fs.create('A').unwrap();
    let first = fs.open('A', OpenFlag::read_only()).unwrap();
    let second = fs.open('A', OpenFlag::read_only()).unwrap();

    let (tx, rx) = mpsc::channel();
    let writer = {
        let fs = fs.clone();
        thread::spawn(move || {
            let fd = fs.open('A', OpenFlag::read_write()).unwrap();
            tx.send(()).unwrap();
            fs.write(fd, b"done").unwrap();
            fs.close(fd).unwrap();
        })
    };

    assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    fs.close(first).unwrap();
    assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    fs.close(second).unwrap();
    rx.recv_timeout(Duration::from_secs(5)).unwrap();
    writer.join().unwrap();

    assert_eq!(fs.stat().files[0].length, 4);
}

#[test]
fn reader_waits_for_writer() {
    let fs = shared();
    fs.create('A').unwrap();
    let writer = fs.open('A', OpenFlag::read_write()).unwrap();

    let (tx, rx) = mpsc::channel();
    let reader = {
        let fs = fs.clone();
        thread::spawn(move || {
            let fd = fs.open('A', OpenFlag::read_only()).unwrap();
            let mut buf = [0; 8];
            let n = fs.read(fd, &mut buf).unwrap();
            tx.send(buf[..n].to_vec()).unwrap();
            fs.close(fd).unwrap();
        })
    };

    fs.write(writer, b"payload").unwrap();
    assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    fs.close(writer).unwrap();

    assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), b"payload");
    reader.join().unwrap();
}

#[test]
fn shared_fd_appends_are_atomic() {
    const THREADS: usize = 4;
    const ROUNDS: usize = 50;
    let fs = shared();
    fs.create('A').unwrap();
    let fd = fs.open('A', OpenFlag::read_write()).unwrap();

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let fs = fs.clone();
            thread::spawn(move || {
                for _ in 0..ROUNDS {
                    assert_eq!(fs.append(fd, &[b'a' + i as u8]), Ok(1));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(fs.session(fd).unwrap().position, THREADS * ROUNDS);
    fs.seek(fd, 0).unwrap();
    let mut buf = vec![0; THREADS * ROUNDS];
    assert_eq!(fs.read(fd, &mut buf), Ok(THREADS * ROUNDS));
    for i in 0..THREADS {
        let count = buf.iter().filter(|&&byte| byte == b'a' + i as u8).count();
        assert_eq!(count, ROUNDS);
    }
}

#[test]
fn distinct_files_in_parallel() {
    let fs = shared();
    let names = ['A', 'B', 'C', 'D', 'E', 'F'];

    let handles: Vec<_> = names
        .into_iter()
        .map(|name| {
            let fs = fs.clone();
            thread::spawn(move || {
                fs.create(name).unwrap();
                let fd = fs.open(name, OpenFlag::read_write()).unwrap();
                let data: Vec<u8> = (0..40).map(|i| name as u8 + i).collect();
                for _ in 0..20 {
                    fs.seek(fd, 0).unwrap();
                    assert_eq!(fs.write(fd, &data), Ok(data.len()));
                    fs.seek(fd, 0).unwrap();
                    let mut buf = vec![0; data.len()];
                    assert_eq!(fs.read(fd, &mut buf), Ok(data.len()));
                    assert_eq!(buf, data);
                }
                fs.close(fd).unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let stat = fs.stat();
    assert_eq!(stat.files.len(), names.len());
    assert!(stat.files.iter().all(|file| file.length == 40));
    // 40 字节占两个 32 字节的块
    assert_eq!(stat.blocks_used, names.len() * 2);
    assert_eq!(stat.open_files, 0);
}

#[test]
fn admission_never_mixes_readers_and_writer() {
    const THREADS: usize = 6;
    let fs = shared();
    fs.create('A').unwrap();

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let fs = fs.clone();
            thread::spawn(move || {
                for round in 0..100 {
                    if (i + round) % 3 == 0 {
                        let fd = fs.open('A', OpenFlag::read_write()).unwrap();
                        let state = fs.admission('A').unwrap();
                        assert!(state.writer && state.readers == 0, "{state:?}");
                        fs.append(fd, b"w").unwrap();
                        fs.close(fd).unwrap();
                    } else {
                        let fd = fs.open('A', OpenFlag::read_only()).unwrap();
                        let state = fs.admission('A').unwrap();
                        assert!(!state.writer && state.readers >= 1, "{state:?}");
                        fs.close(fd).unwrap();
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert!(fs.admission('A').unwrap().is_idle());
    assert_eq!(fs.stat().open_files, 0);
}

#[test]
fn delete_races_with_open() {
    let fs = shared();

    let churn = {
        let fs = fs.clone();
        thread::spawn(move || {
            for _ in 0..200 {
                fs.create('A').unwrap();
                let fd = fs.open('A', OpenFlag::read_write()).unwrap();
                fs.write(fd, b"some bytes").unwrap();
                fs.close(fd).unwrap();
                // 另一线程可能正打开着它
                while fs.delete('A') == Err(Error::Busy) {
                    thread::yield_now();
                }
            }
        })
    };

    let opener = {
        let fs = fs.clone();
        thread::spawn(move || {
            for _ in 0..500 {
                match fs.open('A', OpenFlag::read_only()) {
                    Ok(fd) => {
                        let mut buf = [0; 16];
                        let n = fs.read(fd, &mut buf).unwrap();
                        assert!(n == 0 || &buf[..n] == b"some bytes");
                        fs.close(fd).unwrap();
                    }
                    Err(err) => assert_eq!(err, Error::NotFound),
                }
            }
        })
    };

    churn.join().unwrap();
    opener.join().unwrap();

    let stat = fs.stat();
    assert!(stat.files.is_empty());
    assert_eq!(stat.blocks_used, 0);
    assert_eq!(stat.inodes_used, 1);
    assert_eq!(stat.open_files, 0);
}
