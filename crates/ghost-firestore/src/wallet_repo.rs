//! Firestore-backed wallet store.
//!
//! One document per wallet in the `wallets` collection, keyed by address.
//! Balance changes go through `optimistic::update_with_precondition`, so two
//! concurrent decrements on a one-credit wallet cannot both succeed.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info};

use ghost_models::{Badge, Reputation, Wallet, WalletHistoryEntry};

use crate::client::FirestoreClient;
use crate::error::{FirestoreError, FirestoreResult};
use crate::optimistic::{update_with_precondition, Codec};
use crate::store::WalletStore;
use crate::types::{Document, FromFirestoreValue, ToFirestoreValue, Value};

pub const WALLETS_COLLECTION: &str = "wallets";

const BALANCE_MASK: &[&str] = &["credits", "updated_at"];
const HISTORY_MASK: &[&str] = &["history", "updated_at"];

const CODEC: Codec<Wallet> = Codec {
    decode: document_to_wallet,
    encode: wallet_to_fields,
};

/// Wallet store backed by Firestore.
#[derive(Clone)]
pub struct FirestoreWalletStore {
    client: FirestoreClient,
}

impl FirestoreWalletStore {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl WalletStore for FirestoreWalletStore {
    async fn create_if_absent(&self, wallet: Wallet) -> FirestoreResult<bool> {
        let fields = wallet_to_fields(&wallet);
        match self
            .client
            .create_document(WALLETS_COLLECTION, &wallet.address, fields)
            .await
        {
            Ok(_) => {
                info!(wallet = %wallet.address, credits = wallet.credits, "Created wallet");
                Ok(true)
            }
            Err(FirestoreError::AlreadyExists(_)) => {
                debug!(wallet = %wallet.address, "Wallet already exists");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn get(&self, address: &str) -> FirestoreResult<Option<Wallet>> {
        self.client
            .get_document(WALLETS_COLLECTION, address)
            .await?
            .map(|doc| document_to_wallet(&doc))
            .transpose()
    }

    async fn decrement_if_sufficient(&self, address: &str, amount: u64) -> FirestoreResult<Option<u64>> {
        let result = update_with_precondition(
            &self.client,
            WALLETS_COLLECTION,
            address,
            &CODEC,
            BALANCE_MASK,
            |wallet| {
                let remaining = wallet.credits.checked_sub(amount)?;
                wallet.credits = remaining;
                wallet.updated_at = Utc::now();
                Some(remaining)
            },
        )
        .await?;

        Ok(result.map(|(_, balance)| balance))
    }

    async fn increment(&self, address: &str, amount: u64) -> FirestoreResult<Option<u64>> {
        let result = update_with_precondition(
            &self.client,
            WALLETS_COLLECTION,
            address,
            &CODEC,
            BALANCE_MASK,
            |wallet| wallet.add_credits(amount),
        )
        .await?;

        Ok(result.map(|(_, balance)| balance))
    }

    async fn append_history(&self, address: &str, entry: WalletHistoryEntry) -> FirestoreResult<()> {
        update_with_precondition(
            &self.client,
            WALLETS_COLLECTION,
            address,
            &CODEC,
            HISTORY_MASK,
            |wallet| {
                wallet.history.push(entry.clone());
                wallet.updated_at = Utc::now();
                Some(())
            },
        )
        .await?;
        Ok(())
    }
}

// =============================================================================
// Document mapping
// =============================================================================

fn wallet_to_fields(wallet: &Wallet) -> HashMap<String, Value> {
    let mut fields = HashMap::new();
    fields.insert("address".to_string(), wallet.address.to_firestore_value());
    fields.insert("credits".to_string(), wallet.credits.to_firestore_value());
    fields.insert(
        "history".to_string(),
        Value::ArrayValue(crate::types::ArrayValue {
            values: Some(wallet.history.iter().map(history_entry_to_value).collect()),
        }),
    );
    fields.insert(
        "badges".to_string(),
        Value::ArrayValue(crate::types::ArrayValue {
            values: Some(wallet.badges.iter().map(badge_to_value).collect()),
        }),
    );
    let mut reputation = HashMap::new();
    reputation.insert("score".to_string(), wallet.reputation.score.to_firestore_value());
    fields.insert("reputation".to_string(), Value::map(reputation));
    fields.insert("updated_at".to_string(), wallet.updated_at.to_firestore_value());
    fields
}

fn history_entry_to_value(entry: &WalletHistoryEntry) -> Value {
    let mut m = HashMap::new();
    m.insert("search_id".to_string(), entry.search_id.to_firestore_value());
    m.insert("linkedin_url".to_string(), entry.linkedin_url.to_firestore_value());
    m.insert("recorded_at".to_string(), entry.recorded_at.to_firestore_value());
    Value::map(m)
}

fn badge_to_value(badge: &Badge) -> Value {
    let mut m = HashMap::new();
    m.insert("token_id".to_string(), badge.token_id.to_firestore_value());
    m.insert("name".to_string(), badge.name.to_firestore_value());
    m.insert("issued_at".to_string(), badge.issued_at.to_firestore_value());
    Value::map(m)
}

fn field<T: FromFirestoreValue>(map: &HashMap<String, Value>, key: &str) -> Option<T> {
    map.get(key).and_then(T::from_firestore_value)
}

pub(crate) fn document_to_wallet(doc: &Document) -> FirestoreResult<Wallet> {
    let address = doc
        .get::<String>("address")
        .or_else(|| {
            doc.name
                .as_deref()
                .and_then(|n| n.rsplit('/').next())
                .map(str::to_string)
        })
        .ok_or_else(|| FirestoreError::invalid_document("wallet without address"))?;

    let credits = doc
        .get::<u64>("credits")
        .ok_or_else(|| FirestoreError::invalid_document(format!("wallet {} has no valid credits", address)))?;

    let fields = doc.fields.clone().unwrap_or_default();

    let history = fields
        .get("history")
        .and_then(Value::as_array)
        .unwrap_or(&[])
        .iter()
        .filter_map(Value::as_map)
        .map(|m| WalletHistoryEntry {
            search_id: field::<String>(&m, "search_id"),
            linkedin_url: field::<String>(&m, "linkedin_url"),
            recorded_at: field(&m, "recorded_at").unwrap_or_else(Utc::now),
        })
        .collect();

    let badges = fields
        .get("badges")
        .and_then(Value::as_array)
        .unwrap_or(&[])
        .iter()
        .filter_map(Value::as_map)
        .filter_map(|m| {
            Some(Badge {
                token_id: field(&m, "token_id")?,
                name: field(&m, "name")?,
                issued_at: field(&m, "issued_at").unwrap_or_else(Utc::now),
            })
        })
        .collect();

    let reputation = fields
        .get("reputation")
        .and_then(Value::as_map)
        .and_then(|m| field::<u32>(&m, "score"))
        .map(|score| Reputation { score })
        .unwrap_or_default();

    Ok(Wallet {
        address,
        credits,
        history,
        badges,
        reputation,
        updated_at: doc.get("updated_at").unwrap_or_else(Utc::now),
    })
}
