//! Per-filename reader/writer lock registry.
//!
//! Every file name ever referenced gets one `tokio::sync::RwLock` that lives
//! for the rest of the process. Entries are never removed, so memory grows with
//! the number of distinct names seen; in exchange a lock object can never be
//! dropped while another session still expects to contend on it.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

pub type FileLock = Arc<RwLock<()>>;

/// Shared guard: file content may be read while held.
pub type SharedGuard = OwnedRwLockReadGuard<()>;

/// Exclusive guard: file content may be written or removed while held.
pub type ExclusiveGuard = OwnedRwLockWriteGuard<()>;

#[derive(Debug, Default)]
pub struct LockRegistry {
    locks: Mutex<HashMap<String, FileLock>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the lock for `name`, creating it on first reference.
    ///
    /// Lookup and insert happen under one registry-wide mutex, so racing
    /// first references always observe the same lock object.
    pub fn lock_for(&self, name: &str) -> FileLock {
        let mut locks = self.locks.lock();
        if let Some(existing) = locks.get(name) {
            return Arc::clone(existing);
        }
        let lock = Arc::new(RwLock::new(()));
        locks.insert(name.to_string(), Arc::clone(&lock));
        lock
    }

    /// Waits for shared access to `name`.
    pub async fn acquire_shared(&self, name: &str) -> SharedGuard {
        self.lock_for(name).read_owned().await
    }

    /// Waits for exclusive access to `name`.
    pub async fn acquire_exclusive(&self, name: &str) -> ExclusiveGuard {
        self.lock_for(name).write_owned().await
    }

    /// Number of distinct names referenced so far.
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[test]
    fn same_name_shares_one_lock() {
        let registry = LockRegistry::new();
        let a = registry.lock_for("report.txt");
        let b = registry.lock_for("report.txt");
        let c = registry.lock_for("other.txt");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn concurrent_first_reference_creates_one_lock() {
        let registry = Arc::new(LockRegistry::new());
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.lock_for("brand-new.bin"))
            })
            .collect();
        let locks: Vec<FileLock> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for l in &locks[1..] {
            assert!(Arc::ptr_eq(&locks[0], l));
        }
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn readers_share() {
        let registry = LockRegistry::new();
        let _r1 = registry.acquire_shared("a").await;
        let r2 = timeout(Duration::from_millis(200), registry.acquire_shared("a")).await;
        assert!(r2.is_ok());
    }

    #[tokio::test]
    async fn writer_excludes_readers_and_writers() {
        let registry = LockRegistry::new();
        let w = registry.acquire_exclusive("a").await;
        assert!(timeout(Duration::from_millis(50), registry.acquire_shared("a")).await.is_err());
        assert!(timeout(Duration::from_millis(50), registry.acquire_exclusive("a")).await.is_err());
        // Other names are independent
        assert!(timeout(Duration::from_millis(50), registry.acquire_exclusive("b")).await.is_ok());
        drop(w);
        assert!(timeout(Duration::from_millis(200), registry.acquire_shared("a")).await.is_ok());
    }

    #[tokio::test]
    async fn writer_waits_for_readers() {
        let registry = LockRegistry::new();
        let r = registry.acquire_shared("a").await;
        assert!(timeout(Duration::from_millis(50), registry.acquire_exclusive("a")).await.is_err());
        drop(r);
        assert!(timeout(Duration::from_millis(200), registry.acquire_exclusive("a")).await.is_ok());
    }

    #[test]
    fn entries_are_never_removed() {
        let registry = LockRegistry::new();
        drop(registry.lock_for("x"));
        drop(registry.lock_for("y"));
        assert_eq!(registry.len(), 2);
        assert!(!registry.is_empty());
    }
}
