//! Application state.

use std::sync::Arc;

use tracing::info;

use ghost_firestore::{
    FirestoreClient, FirestoreRecordStore, FirestoreWalletStore, InMemoryRecordStore, InMemoryWalletStore,
    RecordStore, WalletStore,
};

use crate::config::{ApiConfig, StoreBackend};
use crate::services::{
    EnrichmentOrchestrator, EnrichmentPoller, LedgerConfig, OpenerConfig, OpenerGenerator, PollerConfig, WalletLedger,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub ledger: WalletLedger,
    pub orchestrator: Arc<EnrichmentOrchestrator>,
}

impl AppState {
    /// Create application state from the environment.
    pub async fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let (wallets, records): (Arc<dyn WalletStore>, Arc<dyn RecordStore>) = match config.store_backend {
            StoreBackend::Firestore => {
                let client = FirestoreClient::from_env().await?;
                (
                    Arc::new(FirestoreWalletStore::new(client.clone())),
                    Arc::new(FirestoreRecordStore::new(client)),
                )
            }
            StoreBackend::Memory => (
                Arc::new(InMemoryWalletStore::new()),
                Arc::new(InMemoryRecordStore::new()),
            ),
        };

        let poller = EnrichmentPoller::from_config(PollerConfig::from_env())?;
        let opener = OpenerGenerator::from_config(OpenerConfig::from_env())?;
        info!(
            store = config.store_backend.as_str(),
            enrichment_stub = poller.is_stub(),
            opener_stub = opener.is_stub(),
            "Services configured"
        );

        Ok(Self::from_parts(
            config,
            wallets,
            records,
            LedgerConfig::from_env(),
            poller,
            opener,
        ))
    }

    /// Assemble state from already-built collaborators.
    pub fn from_parts(
        config: ApiConfig,
        wallets: Arc<dyn WalletStore>,
        records: Arc<dyn RecordStore>,
        ledger_config: LedgerConfig,
        poller: EnrichmentPoller,
        opener: OpenerGenerator,
    ) -> Self {
        let ledger = WalletLedger::new(wallets, Arc::clone(&records), ledger_config);
        let orchestrator = EnrichmentOrchestrator::new(ledger.clone(), records, poller, opener);

        Self {
            config,
            ledger,
            orchestrator: Arc::new(orchestrator),
        }
    }
}
