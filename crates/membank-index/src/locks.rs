//! Per-scope mutation locks.
//!
//! Every read-modify-write of a scope's index holds that scope's guard, so
//! two concurrent document saves in one branch cannot overwrite each
//! other's index update. Different scopes never contend. Locks nobody
//! holds or waits on are dropped, so the map tracks only busy scopes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use membank_core::IndexScope;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Default)]
pub struct ScopeLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl ScopeLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for and take the guard for `scope`.
    pub async fn lock(&self, scope: &IndexScope) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            // Only the map references an idle lock
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(scope.cache_key()).or_default())
        };
        lock.lock_owned().await
    }

    /// Number of scopes with a live lock entry.
    pub fn tracked(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use membank_core::BranchName;

    #[tokio::test]
    async fn test_same_scope_is_exclusive() {
        let locks = Arc::new(ScopeLocks::new());
        let scope = IndexScope::Global;

        let guard = locks.lock(&scope).await;
        let contender = {
            let locks = Arc::clone(&locks);
            let scope = scope.clone();
            tokio::spawn(async move {
                let _g = locks.lock(&scope).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn test_idle_locks_are_pruned() {
        let locks = ScopeLocks::new();
        for name in ["a", "b", "c"] {
            let scope = IndexScope::Branch(BranchName::new(name).unwrap());
            drop(locks.lock(&scope).await);
        }
        // Only the entry created by the last call survives
        assert_eq!(locks.tracked(), 1);

        let held = locks.lock(&IndexScope::Global).await;
        let _other = locks.lock(&IndexScope::Branch(BranchName::new("d").unwrap())).await;
        assert_eq!(locks.tracked(), 2);
        drop(held);
    }

    #[tokio::test]
    async fn test_different_scopes_do_not_contend() {
        let locks = ScopeLocks::new();
        let _global = locks.lock(&IndexScope::Global).await;
        let branch = IndexScope::Branch(BranchName::new("main").unwrap());
        let _branch = locks.lock(&branch).await;
    }
}
