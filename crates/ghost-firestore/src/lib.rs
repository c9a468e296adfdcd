//! Firestore REST client and the stores built on it.
//!
//! This crate provides:
//! - `WalletStore` / `RecordStore` traits for the ledger and orchestrator
//! - Firestore repositories using `updateTime` preconditions for conditional writes
//! - In-memory implementations for development and tests
//! - Service account authentication via gcp_auth, emulator support, retry logic

pub mod client;
pub mod error;
pub mod memory;
pub mod metrics;
mod optimistic;
pub mod retry;
pub mod search_repo;
pub mod store;
pub mod types;
pub mod wallet_repo;

pub use client::{FirestoreClient, FirestoreConfig};
pub use error::{FirestoreError, FirestoreResult};
pub use memory::{InMemoryRecordStore, InMemoryWalletStore};
pub use search_repo::FirestoreRecordStore;
pub use store::{RecordStore, WalletStore};
pub use types::{Document, FromFirestoreValue, ToFirestoreValue, Value};
pub use wallet_repo::FirestoreWalletStore;
