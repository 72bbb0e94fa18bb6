use portable_atomic::{AtomicU8, Ordering};

/// Observable states of a [`BusLock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum LockState {
    /// Nobody holds the bus.
    Free = 0,
    /// One consumer holds the bus.
    Locked = 1,
    /// The handle was torn down. Terminal.
    Released = 2,
}

impl LockState {
    fn from_raw(raw: u8) -> Self {
        match raw {
            0 => LockState::Free,
            1 => LockState::Locked,
            _ => LockState::Released,
        }
    }
}

/// Advisory, non-blocking lock guarding a shared bus.
///
/// The lock is never taken implicitly and never revoked: `try_lock` and
/// `unlock` are the only ways in and out of [`LockState::Locked`], and
/// [`release`](Self::release) ends the lock's life from any state.
pub struct BusLock {
    state: AtomicU8,
}

impl BusLock {
    /// A free lock.
    pub const fn new() -> Self {
        Self { state: AtomicU8::new(LockState::Free as u8) }
    }

    /// Try to take the lock. Returns `true` if the caller now holds it.
    ///
    /// Of any number of concurrent attempts against a free lock, exactly one
    /// succeeds.
    pub fn try_lock(&self) -> bool {
        self.state
            .compare_exchange(
                LockState::Free as u8,
                LockState::Locked as u8,
                Ordering::Acquire,
                Ordering::Relaxed,
            )
            .is_ok()
    }

    /// Give the lock back. A no-op if it is already free or released.
    pub fn unlock(&self) {
        let _ = self.state.compare_exchange(
            LockState::Locked as u8,
            LockState::Free as u8,
            Ordering::Release,
            Ordering::Relaxed,
        );
    }

    /// Move to [`LockState::Released`].
    ///
    /// Returns `true` for the call that performed the transition, so
    /// teardown runs exactly once.
    pub fn release(&self) -> bool {
        self.state.swap(LockState::Released as u8, Ordering::AcqRel)
            != LockState::Released as u8
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> LockState {
        LockState::from_raw(self.state.load(Ordering::Acquire))
    }

    /// Whether the lock is currently held.
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.state() == LockState::Locked
    }
}

impl Default for BusLock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_try_lock_fails_until_unlock() {
        let lock = BusLock::new();
        assert!(lock.try_lock());
        assert!(!lock.try_lock());
        lock.unlock();
        assert!(lock.try_lock());
    }

    #[test]
    fn unlock_is_idempotent() {
        let lock = BusLock::new();
        lock.unlock();
        lock.unlock();
        assert_eq!(lock.state(), LockState::Free);
        assert!(lock.try_lock());
    }

    #[test]
    fn release_is_terminal_and_reported_once() {
        let lock = BusLock::new();
        assert!(lock.try_lock());
        assert!(lock.release());
        assert!(!lock.release());

        lock.unlock();
        assert_eq!(lock.state(), LockState::Released);
        assert!(!lock.try_lock());
    }
}
