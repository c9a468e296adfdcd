//! Business logic services.

pub mod enrichment;
pub mod ledger;
pub mod opener;
pub mod orchestrator;
pub mod saga;

pub use enrichment::{EnrichmentError, EnrichmentOutcome, EnrichmentPoller, JobHandle, PollerConfig};
pub use ledger::{LedgerConfig, WalletLedger};
pub use opener::{OpenerConfig, OpenerGenerator};
pub use orchestrator::EnrichmentOrchestrator;
pub use saga::{Compensation, Saga, SagaStage};
