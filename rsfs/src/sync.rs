//! 标准库锁的薄封装。
//!
//! 每个临界区在可能 panic 之前都已让数据回到一致状态，
//! 因此锁中毒时直接取回内部数据。

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

#[inline]
pub fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// 在 `condition` 成立期间阻塞于 `condvar`
#[inline]
pub fn wait_while<'a, T>(
    condvar: &Condvar,
    guard: MutexGuard<'a, T>,
    condition: impl FnMut(&mut T) -> bool,
) -> MutexGuard<'a, T> {
    condvar
        .wait_while(guard, condition)
        .unwrap_or_else(PoisonError::into_inner)
}
