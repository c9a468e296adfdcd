//! Wallet credit ledger.
//!
//! Every balance change is delegated to the store's conditional operations;
//! this layer decides bonuses, maps store outcomes to API errors and keeps
//! refunds best-effort.

use std::sync::Arc;

use tracing::{error, info, warn};

use ghost_firestore::{FirestoreError, RecordStore, WalletStore};
use ghost_models::{Badge, Wallet, WalletHistoryEntry, TEST_WALLET_ADDRESS};

use crate::error::{ApiError, ApiResult};
use crate::security::is_valid_record_id;

const DEFAULT_SIGNUP_BONUS: u64 = 3;
const DEFAULT_TEST_BONUS: u64 = 10;
const TEST_WALLET_REPUTATION: u32 = 72;

/// Ledger configuration.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Credits granted to a newly created wallet
    pub signup_bonus: u64,
    /// Address that receives `test_bonus` and the sample passive fields
    pub test_address: String,
    pub test_bonus: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            signup_bonus: DEFAULT_SIGNUP_BONUS,
            test_address: TEST_WALLET_ADDRESS.to_string(),
            test_bonus: DEFAULT_TEST_BONUS,
        }
    }
}

impl LedgerConfig {
    /// Create config from environment variables.
    ///
    /// An unparseable `SIGNUP_BONUS_CREDITS` falls back to the default.
    pub fn from_env() -> Self {
        Self {
            signup_bonus: std::env::var("SIGNUP_BONUS_CREDITS")
                .ok()
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(DEFAULT_SIGNUP_BONUS),
            ..Self::default()
        }
    }

    /// Build the wallet inserted on first reference to `address`.
    pub fn initial_wallet(&self, address: &str) -> Wallet {
        if address == self.test_address {
            Wallet::new(address, self.test_bonus)
                .with_badges(vec![Badge::new("1", "Early Adopter")])
                .with_reputation(TEST_WALLET_REPUTATION)
        } else {
            Wallet::new(address, self.signup_bonus)
        }
    }
}

/// Atomic credit account operations.
#[derive(Clone)]
pub struct WalletLedger {
    wallets: Arc<dyn WalletStore>,
    records: Arc<dyn RecordStore>,
    config: LedgerConfig,
}

impl WalletLedger {
    pub fn new(wallets: Arc<dyn WalletStore>, records: Arc<dyn RecordStore>, config: LedgerConfig) -> Self {
        Self {
            wallets,
            records,
            config,
        }
    }

    /// Create the wallet with its signup bonus unless it already exists.
    ///
    /// Returns true if the wallet was created by this call.
    pub async fn ensure_exists(&self, address: &str) -> ApiResult<bool> {
        let created = self
            .wallets
            .create_if_absent(self.config.initial_wallet(address))
            .await?;
        if created {
            info!(wallet = %address, "Created wallet with signup bonus");
        }
        Ok(created)
    }

    /// Ensure the wallet exists and read it back.
    pub async fn wallet(&self, address: &str) -> ApiResult<Wallet> {
        self.ensure_exists(address).await?;
        self.wallets
            .get(address)
            .await?
            .ok_or_else(|| ApiError::internal(format!("wallet {} missing after creation", address)))
    }

    /// Atomically take `amount` credits, returning the new balance.
    ///
    /// Fails with `InsufficientCredits` when the balance does not cover it
    /// (or the wallet does not exist), leaving the balance unchanged.
    pub async fn try_deduct(&self, address: &str, amount: u64) -> ApiResult<u64> {
        match self.wallets.decrement_if_sufficient(address, amount).await {
            Ok(Some(balance)) => {
                info!(wallet = %address, amount, balance, "Deducted credits");
                Ok(balance)
            }
            Ok(None) | Err(FirestoreError::NotFound(_)) => {
                info!(wallet = %address, amount, "Insufficient credits");
                Err(ApiError::InsufficientCredits)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Standalone paid action: ensure the wallet, then deduct.
    pub async fn deduct(&self, address: &str, amount: u64) -> ApiResult<u64> {
        if amount == 0 {
            return Err(ApiError::bad_request("amount must be a positive integer"));
        }
        self.ensure_exists(address).await?;
        self.try_deduct(address, amount).await
    }

    /// Give `amount` credits back. Never fails the caller.
    ///
    /// Returns false if the increment could not be applied; the failure is
    /// logged and not retried.
    pub async fn refund(&self, address: &str, amount: u64) -> bool {
        match self.wallets.increment(address, amount).await {
            Ok(Some(balance)) => {
                info!(wallet = %address, amount, balance, "Refunded credits");
                true
            }
            Ok(None) => {
                error!(wallet = %address, amount, "Refund would exceed the maximum balance");
                false
            }
            Err(e) => {
                error!(wallet = %address, amount, error = %e, "Failed to refund credits");
                false
            }
        }
    }

    /// Add purchased credits, returning the new balance.
    pub async fn buy(&self, address: &str, amount: u64) -> ApiResult<u64> {
        if amount == 0 {
            return Err(ApiError::bad_request("amount must be a positive integer"));
        }
        self.ensure_exists(address).await?;
        let balance = self
            .wallets
            .increment(address, amount)
            .await?
            .ok_or_else(|| ApiError::bad_request("amount would exceed the maximum balance"))?;
        info!(wallet = %address, amount, balance, "Bought credits");
        Ok(balance)
    }

    pub async fn append_history(&self, address: &str, entry: WalletHistoryEntry) -> ApiResult<()> {
        self.wallets.append_history(address, entry).await?;
        Ok(())
    }

    /// Append a history entry and bump the referenced record, if any.
    ///
    /// Unknown or malformed record ids are recorded but not linked.
    pub async fn record_search(
        &self,
        address: &str,
        search_id: Option<String>,
        linkedin_url: Option<String>,
    ) -> ApiResult<()> {
        self.ensure_exists(address).await?;

        let touch_id = search_id.clone().filter(|id| is_valid_record_id(id));
        self.append_history(address, WalletHistoryEntry::new(search_id, linkedin_url))
            .await?;

        if let Some(id) = touch_id {
            match self.records.touch(&id).await {
                Ok(true) => {}
                Ok(false) => info!(wallet = %address, search_id = %id, "Recorded search has no stored result"),
                Err(e) => warn!(wallet = %address, search_id = %id, error = %e, "Failed to touch search result"),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use serial_test::serial;

    use ghost_firestore::{InMemoryRecordStore, InMemoryWalletStore};
    use ghost_models::{EnrichedContact, GeneratedOpener, SearchRecord};

    use super::*;

    const ADDR: &str = "0x52908400098527886E0F7030069857D2E4169EE7";

    fn ledger() -> (WalletLedger, Arc<InMemoryWalletStore>, Arc<InMemoryRecordStore>) {
        let wallets = Arc::new(InMemoryWalletStore::new());
        let records = Arc::new(InMemoryRecordStore::new());
        let ledger = WalletLedger::new(wallets.clone(), records.clone(), LedgerConfig::default());
        (ledger, wallets, records)
    }

    #[test]
    #[serial]
    fn test_signup_bonus_from_env() {
        std::env::set_var("SIGNUP_BONUS_CREDITS", "5");
        assert_eq!(LedgerConfig::from_env().signup_bonus, 5);

        std::env::set_var("SIGNUP_BONUS_CREDITS", "lots");
        assert_eq!(LedgerConfig::from_env().signup_bonus, 3);

        std::env::remove_var("SIGNUP_BONUS_CREDITS");
        assert_eq!(LedgerConfig::from_env().signup_bonus, 3);
    }

    #[test]
    fn test_test_wallet_gets_passive_fields() {
        let wallet = LedgerConfig::default().initial_wallet(TEST_WALLET_ADDRESS);
        assert_eq!(wallet.credits, 10);
        assert_eq!(wallet.badges.len(), 1);
        assert_eq!(wallet.badges[0].token_id, "1");
        assert_eq!(wallet.badges[0].name, "Early Adopter");
        assert_eq!(wallet.reputation.score, 72);
    }

    #[tokio::test]
    async fn test_ensure_exists_never_resets_balance() {
        let (ledger, wallets, _) = ledger();
        assert!(ledger.ensure_exists(ADDR).await.unwrap());
        ledger.try_deduct(ADDR, 2).await.unwrap();

        assert!(!ledger.ensure_exists(ADDR).await.unwrap());
        assert_eq!(wallets.balance(ADDR).await, Some(1));
    }

    #[tokio::test]
    async fn test_try_deduct_insufficient_leaves_balance() {
        let (ledger, wallets, _) = ledger();
        ledger.ensure_exists(ADDR).await.unwrap();

        let err = ledger.try_deduct(ADDR, 4).await.unwrap_err();
        assert!(matches!(err, ApiError::InsufficientCredits));
        assert_eq!(wallets.balance(ADDR).await, Some(3));
    }

    #[tokio::test]
    async fn test_try_deduct_missing_wallet_is_insufficient() {
        let (ledger, _, _) = ledger();
        let err = ledger.try_deduct(ADDR, 1).await.unwrap_err();
        assert!(matches!(err, ApiError::InsufficientCredits));
    }

    #[tokio::test]
    async fn test_refund_failure_is_reported_not_raised() {
        let (ledger, wallets, _) = ledger();
        ledger.ensure_exists(ADDR).await.unwrap();
        wallets.fail_on("increment").await;

        assert!(!ledger.refund(ADDR, 1).await);
        assert_eq!(wallets.balance(ADDR).await, Some(3));

        wallets.recover("increment").await;
        assert!(ledger.refund(ADDR, 1).await);
        assert_eq!(wallets.balance(ADDR).await, Some(4));
    }

    #[tokio::test]
    async fn test_buy_rejects_zero() {
        let (ledger, _, _) = ledger();
        assert!(matches!(ledger.buy(ADDR, 0).await, Err(ApiError::BadRequest(_))));
        assert_eq!(ledger.buy(ADDR, 7).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_buy_past_max_balance_is_rejected() {
        let (ledger, wallets, _) = ledger();
        let max = ghost_models::MAX_CREDITS;

        assert!(matches!(ledger.buy(ADDR, max).await, Err(ApiError::BadRequest(_))));
        assert_eq!(wallets.balance(ADDR).await, Some(3));
        assert_eq!(ledger.buy(ADDR, max - 3).await.unwrap(), max);
        assert!(!ledger.refund(ADDR, 1).await);
        assert_eq!(wallets.balance(ADDR).await, Some(max));
    }

    #[tokio::test]
    async fn test_record_search_touches_existing_record() {
        let (ledger, _, records) = ledger();
        let record = SearchRecord::new(
            "https://linkedin.com/in/jane",
            EnrichedContact::sample(),
            &GeneratedOpener::local("Hi"),
        );
        let before = record.updated_at;
        records.create(&record).await.unwrap();

        ledger
            .record_search(ADDR, Some(record.id.clone()), Some(record.linkedin_url.clone()))
            .await
            .unwrap();
        ledger
            .record_search(ADDR, Some("../bogus".to_string()), None)
            .await
            .unwrap();

        let wallet = ledger.wallet(ADDR).await.unwrap();
        assert_eq!(wallet.history.len(), 2);
        assert_eq!(wallet.history[0].search_id.as_deref(), Some(record.id.as_str()));

        let touched = records.get(&record.id).await.unwrap().unwrap();
        assert!(touched.updated_at >= before);
        assert!(touched.updated_at <= Utc::now());
    }
}
