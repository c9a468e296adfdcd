//! Paid enrichment flows.
//!
//! Both flows follow the same shape: charge, resolve the contact, compose an
//! opener, persist, record. Any failure after the charge refunds it before
//! the error surfaces.

use std::sync::Arc;

use ghost_firestore::RecordStore;
use ghost_models::{OpenerEntry, SearchRecord, WalletHistoryEntry};
use tracing::Instrument;

use crate::error::{ApiError, ApiResult};
use crate::services::enrichment::{EnrichmentOutcome, EnrichmentPoller};
use crate::services::ledger::WalletLedger;
use crate::services::opener::OpenerGenerator;
use crate::services::saga::{Compensation, Saga, SagaStage};

/// Credits charged per search or regeneration.
pub const CREDITS_PER_REQUEST: u64 = 1;

#[derive(Clone)]
pub struct EnrichmentOrchestrator {
    ledger: WalletLedger,
    records: Arc<dyn RecordStore>,
    poller: EnrichmentPoller,
    opener: OpenerGenerator,
}

impl EnrichmentOrchestrator {
    pub fn new(
        ledger: WalletLedger,
        records: Arc<dyn RecordStore>,
        poller: EnrichmentPoller,
        opener: OpenerGenerator,
    ) -> Self {
        Self {
            ledger,
            records,
            poller,
            opener,
        }
    }

    /// Enrich a profile, generate an opener and store the result.
    ///
    /// `request_id` tags every saga event; pass the HTTP request's id.
    pub async fn search(
        &self,
        linkedin_url: &str,
        wallet: Option<&str>,
        request_id: Option<&str>,
    ) -> ApiResult<SearchRecord> {
        let mut saga = Saga::new("search", wallet, request_id);
        let span = saga.logger().create_span();

        async move {
            self.charge(&mut saga, wallet).await?;

            let record = match self.run_search(&mut saga, linkedin_url).await {
                Ok(record) => record,
                Err(e) => return Err(saga.fail(&self.ledger, e).await),
            };

            self.record_history(&mut saga, wallet, &record).await;
            saga.finish();
            Ok(record)
        }
        .instrument(span)
        .await
    }

    /// Generate a fresh opener for an existing record.
    pub async fn regenerate(
        &self,
        record_id: &str,
        wallet: Option<&str>,
        request_id: Option<&str>,
    ) -> ApiResult<SearchRecord> {
        let mut saga = Saga::new("regenerate", wallet, request_id);
        let span = saga.logger().create_span();

        async move {
            self.charge(&mut saga, wallet).await?;

            let record = match self.run_regenerate(&mut saga, record_id).await {
                Ok(record) => record,
                Err(e) => return Err(saga.fail(&self.ledger, e).await),
            };

            self.record_history(&mut saga, wallet, &record).await;
            saga.finish();
            Ok(record)
        }
        .instrument(span)
        .await
    }

    /// Take one credit when a wallet is supplied. Nothing to undo on failure.
    async fn charge(&self, saga: &mut Saga, wallet: Option<&str>) -> ApiResult<()> {
        let Some(address) = wallet else {
            return Ok(());
        };

        let charged = async {
            self.ledger.ensure_exists(address).await?;
            self.ledger.try_deduct(address, CREDITS_PER_REQUEST).await
        }
        .await;

        match charged {
            Ok(balance) => {
                saga.complete(
                    SagaStage::Charged,
                    Some(Compensation::Refund {
                        address: address.to_string(),
                        amount: CREDITS_PER_REQUEST,
                    }),
                );
                saga.logger()
                    .log_step(SagaStage::Charged.as_str(), &format!("balance now {}", balance));
                Ok(())
            }
            Err(e) => Err(saga.fail(&self.ledger, e).await),
        }
    }

    async fn run_search(&self, saga: &mut Saga, linkedin_url: &str) -> ApiResult<SearchRecord> {
        let contact = match self.poller.enrich(linkedin_url).await? {
            EnrichmentOutcome::Found(contact) => contact,
            EnrichmentOutcome::Empty => return Err(ApiError::not_found("No data found from FullEnrich")),
        };
        saga.complete(SagaStage::Enriched, None);

        let opener = self
            .opener
            .generate(
                contact.full_name.as_deref().unwrap_or_default(),
                contact.job_title.as_deref().unwrap_or_default(),
                contact.company_name.as_deref().unwrap_or_default(),
            )
            .await;
        saga.complete(SagaStage::Composed, None);

        let record = SearchRecord::new(linkedin_url, contact, &opener);
        self.records.create(&record).await?;
        saga.complete(SagaStage::Persisted, None);

        Ok(record)
    }

    async fn run_regenerate(&self, saga: &mut Saga, record_id: &str) -> ApiResult<SearchRecord> {
        let record = self
            .records
            .get(record_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Search result not found"))?;
        saga.complete(SagaStage::Enriched, None);

        let opener = self
            .opener
            .generate(
                record.full_name.as_deref().unwrap_or_default(),
                record.job_title.as_deref().unwrap_or_default(),
                record.company_name.as_deref().unwrap_or_default(),
            )
            .await;
        saga.complete(SagaStage::Composed, None);

        let updated = self
            .records
            .update_opener(&record.id, OpenerEntry::from(&opener))
            .await?;
        saga.complete(SagaStage::Persisted, None);

        Ok(updated)
    }

    /// Append the wallet history entry. The record is already stored, so a
    /// failure here is logged and the request still succeeds.
    async fn record_history(&self, saga: &mut Saga, wallet: Option<&str>, record: &SearchRecord) {
        let Some(address) = wallet else {
            return;
        };

        let entry = WalletHistoryEntry::new(Some(record.id.clone()), Some(record.linkedin_url.clone()));
        match self.ledger.append_history(address, entry).await {
            Ok(()) => saga.complete(SagaStage::Recorded, None),
            Err(e) => saga
                .logger()
                .log_warning(&format!("history append for record {} failed: {}", record.id, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use ghost_firestore::{InMemoryRecordStore, InMemoryWalletStore};
    use ghost_models::TEST_WALLET_ADDRESS;
    use serde_json::json;

    use super::*;
    use crate::services::enrichment::tests::{bulk, ScriptedProvider};
    use crate::services::enrichment::PollerConfig;
    use crate::services::ledger::LedgerConfig;
    use crate::services::opener::tests::{reply, ScriptedGenerator};
    use crate::services::opener::OpenerConfig;

    const ADDR: &str = "0x52908400098527886E0F7030069857D2E4169EE7";

    struct Fixture {
        orchestrator: EnrichmentOrchestrator,
        ledger: WalletLedger,
        wallets: Arc<InMemoryWalletStore>,
        records: Arc<InMemoryRecordStore>,
    }

    fn fixture(provider: ScriptedProvider, generator: ScriptedGenerator) -> Fixture {
        let wallets = Arc::new(InMemoryWalletStore::new());
        let records = Arc::new(InMemoryRecordStore::new());
        let ledger = WalletLedger::new(wallets.clone(), records.clone(), LedgerConfig::default());
        let poller = EnrichmentPoller::new(
            Some(Arc::new(provider)),
            PollerConfig {
                timeout: Duration::from_millis(1_000),
                poll_interval: Duration::from_millis(100),
                ..PollerConfig::default()
            },
        );
        let opener = OpenerGenerator::new(Some(Arc::new(generator)), OpenerConfig::default());
        Fixture {
            orchestrator: EnrichmentOrchestrator::new(ledger.clone(), records.clone(), poller, opener),
            ledger,
            wallets,
            records,
        }
    }

    fn finished() -> ScriptedProvider {
        ScriptedProvider::new(vec![Ok(bulk(json!({
            "status": "FINISHED",
            "data": [{
                "profile": {
                    "full_name": "Jane Doe",
                    "employment": { "current": { "title": "CTO", "company": { "name": "Acme" } } }
                },
                "contact_info": { "most_probable_work_email": { "email": "jane@acme.com" } }
            }]
        })))])
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_charges_once_and_records_history() {
        let f = fixture(finished(), ScriptedGenerator::new(vec![reply("Hi Jane, loved the launch!")]));

        let record = f.orchestrator.search("https://linkedin.com/in/jane", Some(ADDR), None).await.unwrap();

        assert_eq!(record.full_name.as_deref(), Some("Jane Doe"));
        assert_eq!(record.email.as_deref(), Some("jane@acme.com"));
        assert_eq!(record.opener, "Hi Jane, loved the launch!");
        assert_eq!(record.opener_history.len(), 1);
        assert_eq!(f.wallets.balance(ADDR).await, Some(2));
        assert_eq!(f.records.len().await, 1);

        let wallet = f.ledger.wallet(ADDR).await.unwrap();
        assert_eq!(wallet.history.len(), 1);
        assert_eq!(wallet.history[0].search_id.as_deref(), Some(record.id.as_str()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_without_wallet_is_free() {
        let f = fixture(finished(), ScriptedGenerator::new(vec![reply("Hello there")]));
        let record = f.orchestrator.search("https://linkedin.com/in/jane", None, None).await.unwrap();
        assert_eq!(record.opener, "Hello there");
        assert_eq!(f.wallets.balance(ADDR).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_refunds_charge() {
        let f = fixture(ScriptedProvider::new(vec![]), ScriptedGenerator::new(vec![]));

        let err = f.orchestrator.search("https://linkedin.com/in/slow", Some(ADDR), None).await.unwrap_err();

        assert!(matches!(err, ApiError::Timeout(_)));
        assert_eq!(f.wallets.balance(ADDR).await, Some(3));
        assert!(f.records.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_record_write_failure_refunds_charge() {
        let f = fixture(finished(), ScriptedGenerator::new(vec![reply("Hi")]));
        f.records.fail_on("create").await;

        let err = f.orchestrator.search("https://linkedin.com/in/jane", Some(ADDR), None).await.unwrap_err();

        assert!(matches!(err, ApiError::Firestore(_)));
        assert_eq!(err.kind(), "server_error");
        assert_eq!(f.wallets.balance(ADDR).await, Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_history_failure_keeps_result() {
        let f = fixture(finished(), ScriptedGenerator::new(vec![reply("Hi")]));
        f.ledger.ensure_exists(ADDR).await.unwrap();
        f.wallets.fail_on("append_history").await;

        let record = f.orchestrator.search("https://linkedin.com/in/jane", Some(ADDR), None).await.unwrap();

        assert_eq!(f.records.len().await, 1);
        assert_eq!(f.wallets.balance(ADDR).await, Some(2));
        assert!(f.records.get(&record.id).await.unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_regenerate_appends_history_and_charges_one() {
        let f = fixture(
            finished(),
            ScriptedGenerator::new(vec![reply("First opener"), reply("Second opener")]),
        );
        let record = f.orchestrator.search("https://linkedin.com/in/jane", None, None).await.unwrap();

        let updated = f.orchestrator.regenerate(&record.id, Some(TEST_WALLET_ADDRESS), None).await.unwrap();

        assert_eq!(updated.id, record.id);
        assert_eq!(updated.opener, "Second opener");
        assert_eq!(updated.opener_history.len(), 2);
        assert_eq!(updated.opener_history[0].text, "First opener");
        assert_eq!(f.wallets.balance(TEST_WALLET_ADDRESS).await, Some(9));
    }

    #[tokio::test(start_paused = true)]
    async fn test_regenerate_unknown_id_refunds() {
        let f = fixture(finished(), ScriptedGenerator::new(vec![]));

        let err = f.orchestrator.regenerate("does-not-exist", Some(ADDR), None).await.unwrap_err();

        assert!(matches!(err, ApiError::NotFound(_)));
        assert_eq!(f.wallets.balance(ADDR).await, Some(3));
    }
}
