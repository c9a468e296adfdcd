//! In-memory stores for development and tests.
//!
//! Each mutation runs entirely under the store's write guard, which is what
//! makes the conditional decrement atomic here. Individual operations can be
//! made to fail with `fail_on` to exercise compensation paths.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use ghost_models::{OpenerEntry, SearchRecord, Wallet, WalletHistoryEntry};

use crate::error::{FirestoreError, FirestoreResult};
use crate::store::{RecordStore, WalletStore};

/// Set of operation names that should fail.
#[derive(Default)]
struct Faults(RwLock<HashSet<&'static str>>);

impl Faults {
    async fn check(&self, op: &'static str) -> FirestoreResult<()> {
        if self.0.read().await.contains(op) {
            return Err(FirestoreError::request_failed(format!("injected failure: {}", op)));
        }
        Ok(())
    }

    async fn set(&self, op: &'static str, fail: bool) {
        let mut faults = self.0.write().await;
        if fail {
            faults.insert(op);
        } else {
            faults.remove(op);
        }
    }
}

/// Wallet store kept in process memory.
#[derive(Default)]
pub struct InMemoryWalletStore {
    wallets: RwLock<HashMap<String, Wallet>>,
    faults: Faults,
}

impl InMemoryWalletStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `op` fail until `recover` is called. Names match the trait methods.
    pub async fn fail_on(&self, op: &'static str) {
        self.faults.set(op, true).await;
    }

    pub async fn recover(&self, op: &'static str) {
        self.faults.set(op, false).await;
    }

    /// Current balance, bypassing fault injection.
    pub async fn balance(&self, address: &str) -> Option<u64> {
        self.wallets.read().await.get(address).map(|w| w.credits)
    }
}

#[async_trait]
impl WalletStore for InMemoryWalletStore {
    async fn create_if_absent(&self, wallet: Wallet) -> FirestoreResult<bool> {
        self.faults.check("create_if_absent").await?;
        let mut wallets = self.wallets.write().await;
        if wallets.contains_key(&wallet.address) {
            return Ok(false);
        }
        wallets.insert(wallet.address.clone(), wallet);
        Ok(true)
    }

    async fn get(&self, address: &str) -> FirestoreResult<Option<Wallet>> {
        self.faults.check("get").await?;
        Ok(self.wallets.read().await.get(address).cloned())
    }

    async fn decrement_if_sufficient(&self, address: &str, amount: u64) -> FirestoreResult<Option<u64>> {
        self.faults.check("decrement_if_sufficient").await?;
        let mut wallets = self.wallets.write().await;
        let wallet = wallets
            .get_mut(address)
            .ok_or_else(|| FirestoreError::not_found(format!("wallets/{}", address)))?;

        match wallet.credits.checked_sub(amount) {
            Some(remaining) => {
                wallet.credits = remaining;
                wallet.updated_at = Utc::now();
                Ok(Some(remaining))
            }
            None => Ok(None),
        }
    }

    async fn increment(&self, address: &str, amount: u64) -> FirestoreResult<Option<u64>> {
        self.faults.check("increment").await?;
        let mut wallets = self.wallets.write().await;
        let wallet = wallets
            .get_mut(address)
            .ok_or_else(|| FirestoreError::not_found(format!("wallets/{}", address)))?;
        Ok(wallet.add_credits(amount))
    }

    async fn append_history(&self, address: &str, entry: WalletHistoryEntry) -> FirestoreResult<()> {
        self.faults.check("append_history").await?;
        let mut wallets = self.wallets.write().await;
        let wallet = wallets
            .get_mut(address)
            .ok_or_else(|| FirestoreError::not_found(format!("wallets/{}", address)))?;
        wallet.history.push(entry);
        wallet.updated_at = Utc::now();
        Ok(())
    }
}

/// Search record store kept in process memory.
#[derive(Default)]
pub struct InMemoryRecordStore {
    records: RwLock<HashMap<String, SearchRecord>>,
    faults: Faults,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `op` fail until `recover` is called. Names match the trait methods.
    pub async fn fail_on(&self, op: &'static str) {
        self.faults.set(op, true).await;
    }

    pub async fn recover(&self, op: &'static str) {
        self.faults.set(op, false).await;
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn create(&self, record: &SearchRecord) -> FirestoreResult<()> {
        self.faults.check("create").await?;
        let mut records = self.records.write().await;
        if records.contains_key(&record.id) {
            return Err(FirestoreError::AlreadyExists(format!("search_results/{}", record.id)));
        }
        records.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> FirestoreResult<Option<SearchRecord>> {
        self.faults.check("get").await?;
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn update_opener(&self, id: &str, entry: OpenerEntry) -> FirestoreResult<SearchRecord> {
        self.faults.check("update_opener").await?;
        let mut records = self.records.write().await;
        let record = records
            .get_mut(id)
            .ok_or_else(|| FirestoreError::not_found(format!("search_results/{}", id)))?;
        record.apply_opener(entry);
        Ok(record.clone())
    }

    async fn touch(&self, id: &str) -> FirestoreResult<bool> {
        self.faults.check("touch").await?;
        match self.records.write().await.get_mut(id) {
            Some(record) => {
                record.touch();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
