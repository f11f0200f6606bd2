//! Per-session concurrency control.
//!
//! Ensures only one turn runs per session at a time. A second message for
//! the same session waits until the first turn finishes; distinct
//! sessions never contend.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use pv_domain::error::{Error, Result};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Each session id maps to a `Semaphore(1)`; holding the permit grants
/// exclusive access for one turn.
#[derive(Default)]
pub struct SessionLockMap {
    locks: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl SessionLockMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for the run lock of `session_id`. The lock is released when
    /// the returned permit is dropped.
    pub async fn acquire(&self, session_id: &str) -> Result<OwnedSemaphorePermit> {
        let sem = {
            let mut locks = self.locks.lock();
            locks
                .entry(session_id.to_owned())
                .or_insert_with(|| Arc::new(Semaphore::new(1)))
                .clone()
        };
        sem.acquire_owned()
            .await
            .map_err(|_| Error::Session(format!("lock for session {session_id} was closed")))
    }

    /// Number of tracked sessions.
    pub fn session_count(&self) -> usize {
        self.locks.lock().len()
    }

    /// Forget locks nobody holds or waits for. Holders and waiters each
    /// keep a clone of the semaphore alive.
    pub fn prune_idle(&self) {
        self.locks.lock().retain(|_, sem| Arc::strong_count(sem) > 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test]
    async fn sequential_access() {
        let map = SessionLockMap::new();
        drop(map.acquire("s1").await.unwrap());
        drop(map.acquire("s1").await.unwrap());
    }

    #[tokio::test]
    async fn different_sessions_do_not_contend() {
        let map = SessionLockMap::new();
        let p1 = map.acquire("s1").await.unwrap();
        let p2 = map.acquire("s2").await.unwrap();
        assert_eq!(map.session_count(), 2);
        drop(p1);
        drop(p2);
        map.prune_idle();
        assert_eq!(map.session_count(), 0);
    }

    #[tokio::test]
    async fn same_session_waits_for_release() {
        let map = Arc::new(SessionLockMap::new());
        let released = Arc::new(AtomicBool::new(false));

        let p1 = map.acquire("s1").await.unwrap();

        let handle = {
            let map = map.clone();
            let released = released.clone();
            tokio::spawn(async move {
                let _p2 = map.acquire("s1").await.unwrap();
                released.load(Ordering::SeqCst)
            })
        };

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        released.store(true, Ordering::SeqCst);
        drop(p1);

        assert!(handle.await.unwrap());
    }
}
