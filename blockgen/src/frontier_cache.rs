//! Frontier cache: the last block built for each account.
//!
//! Lets many dependent blocks be built before any of them reaches a node.
//! Entries are overwritten on every cached build and never evicted.
//!
//! Building a block for an account holds that account's lock from chain
//! lookup until the cache write, so two builders never both extend the same
//! `previous`. Builds on different accounts proceed concurrently.

use std::collections::HashMap;
use std::sync::Arc;

use nanomock_types::{Account, Amount, BlockHash};
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Chain head of one account as last built locally.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrontierEntry {
    pub frontier: BlockHash,
    pub balance: Amount,
    pub representative: Account,
}

#[derive(Default)]
pub struct FrontierCache {
    entries: Mutex<HashMap<Account, FrontierEntry>>,
    account_locks: Mutex<HashMap<Account, Arc<Mutex<()>>>>,
}

impl FrontierCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, account: &Account) -> Option<FrontierEntry> {
        self.entries.lock().await.get(account).cloned()
    }

    pub async fn put(&self, account: Account, entry: FrontierEntry) {
        self.entries.lock().await.insert(account, entry);
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Serialize chain extension for `account`. Hold the guard for the whole build.
    pub async fn lock_account(&self, account: &Account) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.account_locks.lock().await;
            locks
                .entry(*account)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    /// Forget `account`'s lock unless someone holds or waits on it.
    pub async fn release_account(&self, account: &Account) {
        let mut locks = self.account_locks.lock().await;
        if locks.get(account).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(account);
        }
    }

    #[cfg(test)]
    pub(crate) async fn lock_count(&self) -> usize {
        self.account_locks.lock().await.len()
    }
}
