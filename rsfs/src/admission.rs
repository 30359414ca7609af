//! # 准入控制
//!
//! 每个 inode 一道闸门：任意时刻要么有零到多个读者，
//! 要么恰有一个写者。只在 open/close 时经过闸门。
//!
//! 没有写者优先：源源不断的读者会让等待中的写者一直饿着。

use std::sync::{Condvar, Mutex};

use crate::AccessMode;
use crate::sync::{lock, wait_while};

#[derive(Debug, Default)]
pub struct AdmissionGate {
    state: Mutex<AdmissionState>,
    /// 状态每次变化都广播
    changed: Condvar,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdmissionState {
    pub readers: usize,
    pub writer: bool,
}

impl AdmissionState {
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.readers == 0 && !self.writer
    }

    /// 已通过准入、尚未关闭的会话数
    #[inline]
    pub fn holders(&self) -> usize {
        self.readers + usize::from(self.writer)
    }
}

impl AdmissionGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> AdmissionState {
        *lock(&self.state)
    }

    #[inline]
    pub fn acquire(&self, mode: AccessMode) {
        match mode {
            AccessMode::ReadOnly => self.acquire_read(),
            AccessMode::ReadWrite => self.acquire_write(),
        }
    }

    #[inline]
    pub fn release(&self, mode: AccessMode) {
        match mode {
            AccessMode::ReadOnly => self.release_read(),
            AccessMode::ReadWrite => self.release_write(),
        }
    }

    /// 等到没有写者，再登记为读者
    pub fn acquire_read(&self) {
        let mut state = wait_while(&self.changed, lock(&self.state), |state| state.writer);
        state.readers += 1;
    }

    /// 等到既无读者也无写者，再登记为写者
    pub fn acquire_write(&self) {
        let mut state = wait_while(&self.changed, lock(&self.state), |state| {
            !state.is_idle()
        });
        state.writer = true;
    }

    pub fn release_read(&self) {
        let mut state = lock(&self.state);
        assert!(state.readers > 0, "releasing a read admission never taken");
        state.readers -= 1;
        if state.readers == 0 {
            self.changed.notify_all();
        }
    }

    pub fn release_write(&self) {
        let mut state = lock(&self.state);
        assert!(state.writer, "releasing a write admission never taken");
        state.writer = false;
        self.changed.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    use super::{AdmissionGate, AdmissionState};

    #[test]
    fn readers_share_the_gate() {
        let gate = AdmissionGate::new();
        gate.acquire_read();
        gate.acquire_read();
        assert_eq!(
            gate.state(),
            AdmissionState {
                readers: 2,
                writer: false
            }
        );
        assert_eq!(gate.state().holders(), 2);

        gate.release_read();
        gate.release_read();
        assert!(gate.state().is_idle());
    }

    #[test]
    fn writer_waits_for_last_reader() {
        let gate = Arc::new(AdmissionGate::new());
        gate.acquire_read();

        let (tx, rx) = mpsc::channel();
        let writer = {
            let gate = gate.clone();
            thread::spawn(move || {
                gate.acquire_write();
                tx.send(()).unwrap();
                gate.release_write();
            })
        };

        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
        gate.release_read();
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        writer.join().unwrap();
        assert!(gate.state().is_idle());
    }

    #[test]
    fn reader_waits_for_writer() {
        let gate = Arc::new(AdmissionGate::new());
        gate.acquire_write();

        let (tx, rx) = mpsc::channel();
        let reader = {
            let gate = gate.clone();
            thread::spawn(move || {
                gate.acquire_read();
                tx.send(gate.state()).unwrap();
                gate.release_read();
            })
        };

        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
        gate.release_write();
        let seen = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(!seen.writer);
        assert_eq!(seen.readers, 1);
        reader.join().unwrap();
    }

    #[test]
    #[should_panic(expected = "never taken")]
    fn unbalanced_release_panics() {
        AdmissionGate::new().release_write();
    }
}
