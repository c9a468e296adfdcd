//! Storage traits the ledger and orchestrator depend on.
//!
//! Two implementations exist: Firestore-backed repositories and in-memory
//! stores for development and tests. Every mutation that depends on the
//! current value is evaluated by the store itself, never by the caller.

use async_trait::async_trait;

use ghost_models::{OpenerEntry, SearchRecord, Wallet, WalletHistoryEntry};

use crate::error::FirestoreResult;

/// Wallet persistence.
#[async_trait]
pub trait WalletStore: Send + Sync {
    /// Insert `wallet` unless its address exists. Returns true if inserted.
    ///
    /// An existing wallet is left untouched.
    async fn create_if_absent(&self, wallet: Wallet) -> FirestoreResult<bool>;

    async fn get(&self, address: &str) -> FirestoreResult<Option<Wallet>>;

    /// Atomically subtract `amount` iff the balance covers it.
    ///
    /// Returns the new balance, or `Ok(None)` with the balance unchanged when
    /// it is insufficient. A missing wallet is `NotFound`.
    async fn decrement_if_sufficient(&self, address: &str, amount: u64) -> FirestoreResult<Option<u64>>;

    /// Atomically add `amount`, returning the new balance.
    ///
    /// `Ok(None)` with the balance unchanged when the result would exceed
    /// `MAX_CREDITS`. A missing wallet is `NotFound`.
    async fn increment(&self, address: &str, amount: u64) -> FirestoreResult<Option<u64>>;

    async fn append_history(&self, address: &str, entry: WalletHistoryEntry) -> FirestoreResult<()>;
}

/// Search record persistence.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert a new record. Fails with `AlreadyExists` on id collision.
    async fn create(&self, record: &SearchRecord) -> FirestoreResult<()>;

    async fn get(&self, id: &str) -> FirestoreResult<Option<SearchRecord>>;

    /// Make `entry` the current opener and append it to the history.
    ///
    /// Returns the updated record; a missing record is `NotFound`.
    async fn update_opener(&self, id: &str, entry: OpenerEntry) -> FirestoreResult<SearchRecord>;

    /// Bump `updated_at`. Returns false if the record does not exist.
    async fn touch(&self, id: &str) -> FirestoreResult<bool>;
}
