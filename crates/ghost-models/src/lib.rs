//! Shared data models for the Ghost enrichment backend.
//!
//! This crate provides Serde-serializable types for:
//! - Wallets, their credit balance and passive badge/reputation fields
//! - Search records with their opener history
//! - Enrichment results and job status

pub mod enrichment;
pub mod search;
pub mod wallet;

// Re-export common types
pub use enrichment::{EnrichedContact, EnrichmentJobStatus};
pub use search::{
    GeneratedOpener, GenerationUsage, OpenerEntry, OpenerHistoryView, SearchRecord, SearchView,
    UsageSummary,
};
pub use wallet::{Badge, Reputation, Wallet, WalletHistoryEntry, MAX_CREDITS, TEST_WALLET_ADDRESS};
