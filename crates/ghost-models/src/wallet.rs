//! Wallet data models.
//!
//! A wallet is the prepaid credit account keyed by its address. Credits are
//! the only field the ledger mutates conditionally; history is append-only and
//! badges/reputation are stored and returned but never computed here.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Designated development address that gets a larger signup bonus.
pub const TEST_WALLET_ADDRESS: &str = "0xTESTWALLET";

/// Largest storable balance; Firestore integers are signed 64-bit.
pub const MAX_CREDITS: u64 = i64::MAX as u64;

/// A credit account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    /// Wallet address (document key, immutable)
    pub address: String,

    /// Remaining credits, never negative
    pub credits: u64,

    /// Recorded searches, oldest first
    #[serde(default)]
    pub history: Vec<WalletHistoryEntry>,

    /// Passive badge list
    #[serde(default)]
    pub badges: Vec<Badge>,

    /// Passive reputation
    #[serde(default)]
    pub reputation: Reputation,

    /// Last mutation time
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    /// Create a wallet with an initial balance and empty passive fields.
    pub fn new(address: impl Into<String>, credits: u64) -> Self {
        Self {
            address: address.into(),
            credits,
            history: Vec::new(),
            badges: Vec::new(),
            reputation: Reputation::default(),
            updated_at: Utc::now(),
        }
    }

    /// Add `amount` credits, returning the new balance.
    ///
    /// None, with the balance unchanged, if it would exceed `MAX_CREDITS`.
    pub fn add_credits(&mut self, amount: u64) -> Option<u64> {
        let balance = self.credits.checked_add(amount).filter(|b| *b <= MAX_CREDITS)?;
        self.credits = balance;
        self.updated_at = Utc::now();
        Some(balance)
    }

    /// Set the badges.
    pub fn with_badges(mut self, badges: Vec<Badge>) -> Self {
        self.badges = badges;
        self
    }

    /// Set the reputation score.
    pub fn with_reputation(mut self, score: u32) -> Self {
        self.reputation = Reputation { score };
        self
    }
}

/// A single wallet history entry referencing a search record by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WalletHistoryEntry {
    /// Referenced search record id
    pub search_id: Option<String>,

    /// LinkedIn URL of the referenced search
    pub linkedin_url: Option<String>,

    /// When the entry was appended
    pub recorded_at: DateTime<Utc>,
}

impl WalletHistoryEntry {
    /// Create an entry stamped with the current time.
    pub fn new(search_id: Option<String>, linkedin_url: Option<String>) -> Self {
        Self {
            search_id,
            linkedin_url,
            recorded_at: Utc::now(),
        }
    }
}

/// Passive badge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
    pub token_id: String,
    pub name: String,
    pub issued_at: DateTime<Utc>,
}

impl Badge {
    pub fn new(token_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            token_id: token_id.into(),
            name: name.into(),
            issued_at: Utc::now(),
        }
    }
}

/// Passive reputation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Reputation {
    pub score: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wallet_serializes_camel_case() {
        let wallet = Wallet::new("0xabc", 3);
        let json = serde_json::to_value(&wallet).unwrap();
        assert_eq!(json["credits"], 3);
        assert!(json.get("updatedAt").is_some());
        assert_eq!(json["reputation"]["score"], 0);
    }

    #[test]
    fn test_wallet_deserializes_without_passive_fields() {
        let json = serde_json::json!({
            "address": "0xabc",
            "credits": 7,
            "updatedAt": "2025-01-01T00:00:00Z"
        });
        let wallet: Wallet = serde_json::from_value(json).unwrap();
        assert_eq!(wallet.credits, 7);
        assert!(wallet.history.is_empty());
        assert!(wallet.badges.is_empty());
    }

    #[test]
    fn test_add_credits_bounded_by_max() {
        let mut wallet = Wallet::new("0xa", MAX_CREDITS - 2);
        assert_eq!(wallet.add_credits(2), Some(MAX_CREDITS));
        assert_eq!(wallet.add_credits(1), None);
        assert_eq!(wallet.add_credits(u64::MAX), None);
        assert_eq!(wallet.credits, MAX_CREDITS);
    }
}
