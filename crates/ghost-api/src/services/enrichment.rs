//! Enrichment job polling.
//!
//! A job is submitted once and then driven by a small state machine: fetch
//! the status, and while the provider is still working sleep for the poll
//! interval (clamped to the time left) and fetch again. The deadline is
//! checked locally; nothing is sent to the provider when we give up.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use ghost_models::{EnrichedContact, EnrichmentJobStatus};
use ghost_providers::fullenrich::DEFAULT_BASE_URL;
use ghost_providers::{BulkStatus, EnrichmentProvider, FullEnrichClient, ProviderError, ProviderResult};

use crate::error::ApiError;
use crate::metrics;

const DEFAULT_TIMEOUT_MS: u64 = 120_000;
const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;
const STUB_DELAY_MS: u64 = 500;

/// Poller configuration.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// FullEnrich API key; the local stub is used when absent
    pub api_key: Option<String>,
    pub base_url: String,
    /// Overall deadline measured from submission
    pub timeout: Duration,
    /// Fixed wait between status fetches
    pub poll_interval: Duration,
    pub stub_delay: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            stub_delay: Duration::from_millis(STUB_DELAY_MS),
        }
    }
}

impl PollerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let millis = |key: &str, default: u64| {
            Duration::from_millis(
                std::env::var(key)
                    .ok()
                    .and_then(|s| s.trim().parse().ok())
                    .unwrap_or(default),
            )
        };

        Self {
            api_key: std::env::var("FULLENRICH_API_KEY")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            base_url: std::env::var("FULLENRICH_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            timeout: millis("FULLENRICH_TIMEOUT_MS", DEFAULT_TIMEOUT_MS),
            poll_interval: millis("FULLENRICH_POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS),
            ..Self::default()
        }
    }
}

/// Terminal success of an enrichment run.
#[derive(Debug, Clone, PartialEq)]
pub enum EnrichmentOutcome {
    Found(EnrichedContact),
    /// Provider finished but resolved nothing
    Empty,
}

#[derive(Debug, Error)]
pub enum EnrichmentError {
    /// The job could not be submitted.
    #[error("enrichment submission failed: {0}")]
    Unavailable(#[source] ProviderError),

    #[error("enrichment provider reported insufficient credits")]
    ProviderInsufficientCredits,

    #[error("enrichment did not finish within {timeout_ms} ms ({polls} status checks)")]
    Timeout { timeout_ms: u128, polls: u32 },

    /// Provider reported failure or a status fetch failed.
    #[error("enrichment failed: {0}")]
    Failed(String),
}

impl From<EnrichmentError> for ApiError {
    fn from(err: EnrichmentError) -> Self {
        match err {
            EnrichmentError::Unavailable(e) => ApiError::provider_unavailable(e.to_string()),
            EnrichmentError::ProviderInsufficientCredits => ApiError::ProviderInsufficientCredits,
            e @ EnrichmentError::Timeout { .. } => ApiError::timeout(e.to_string()),
            EnrichmentError::Failed(msg) => ApiError::internal(msg),
        }
    }
}

/// A submitted enrichment job.
#[derive(Debug, Clone)]
pub struct JobHandle {
    pub enrichment_id: String,
    pub status: EnrichmentJobStatus,
    pub submitted_at: Instant,
    pub deadline: Instant,
    /// Status fetches made so far
    pub polls: u32,
}

impl JobHandle {
    fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }
}

enum PollStep {
    Fetch,
    Wait(Duration),
}

/// Drives one enrichment job per call to completion or deadline.
#[derive(Clone)]
pub struct EnrichmentPoller {
    provider: Option<Arc<dyn EnrichmentProvider>>,
    config: PollerConfig,
}

impl EnrichmentPoller {
    pub fn new(provider: Option<Arc<dyn EnrichmentProvider>>, config: PollerConfig) -> Self {
        Self { provider, config }
    }

    /// Build with the FullEnrich client when a key is configured.
    pub fn from_config(config: PollerConfig) -> ProviderResult<Self> {
        let provider = match &config.api_key {
            Some(key) => {
                let client = FullEnrichClient::new(key.clone(), config.base_url.clone())?;
                Some(Arc::new(client) as Arc<dyn EnrichmentProvider>)
            }
            None => None,
        };
        Ok(Self::new(provider, config))
    }

    pub fn is_stub(&self) -> bool {
        self.provider.is_none()
    }

    /// Resolve contact details for one profile.
    pub async fn enrich(&self, linkedin_url: &str) -> Result<EnrichmentOutcome, EnrichmentError> {
        let Some(provider) = self.provider.as_deref() else {
            sleep(self.config.stub_delay).await;
            debug!(linkedin_url, "No enrichment key configured, returning sample contact");
            return Ok(EnrichmentOutcome::Found(EnrichedContact::sample()));
        };

        let mut handle = self.submit(provider, linkedin_url).await?;
        let result = self.await_result(provider, &mut handle).await;

        let outcome = match &result {
            Ok(EnrichmentOutcome::Found(_)) => "found",
            Ok(EnrichmentOutcome::Empty) => "empty",
            Err(EnrichmentError::ProviderInsufficientCredits) => "provider_insufficient_credits",
            Err(EnrichmentError::Timeout { .. }) => "timeout",
            Err(_) => "error",
        };
        metrics::record_enrichment(outcome, handle.polls, handle.submitted_at.elapsed().as_secs_f64());
        info!(
            enrichment_id = %handle.enrichment_id,
            status = %handle.status,
            polls = handle.polls,
            outcome,
            "Enrichment finished"
        );

        result
    }

    /// Start a job. Failures here are never retried.
    pub async fn submit(
        &self,
        provider: &dyn EnrichmentProvider,
        linkedin_url: &str,
    ) -> Result<JobHandle, EnrichmentError> {
        let enrichment_id = provider
            .start_enrichment(linkedin_url)
            .await
            .map_err(EnrichmentError::Unavailable)?;

        let submitted_at = Instant::now();
        Ok(JobHandle {
            enrichment_id,
            status: EnrichmentJobStatus::Submitted,
            submitted_at,
            deadline: submitted_at + self.config.timeout,
            polls: 0,
        })
    }

    /// Poll `handle` until a terminal status or its deadline.
    pub async fn await_result(
        &self,
        provider: &dyn EnrichmentProvider,
        handle: &mut JobHandle,
    ) -> Result<EnrichmentOutcome, EnrichmentError> {
        let mut step = PollStep::Fetch;

        loop {
            step = match step {
                PollStep::Fetch => {
                    let bulk = match provider.enrichment_status(&handle.enrichment_id).await {
                        Ok(bulk) => bulk,
                        Err(e) => {
                            handle.status = EnrichmentJobStatus::Error;
                            return Err(EnrichmentError::Failed(e.to_string()));
                        }
                    };
                    handle.polls += 1;

                    match bulk.status {
                        BulkStatus::Finished => {
                            handle.status = EnrichmentJobStatus::Finished;
                            return Ok(match bulk.first_contact() {
                                Some(contact) => EnrichmentOutcome::Found(contact),
                                None => EnrichmentOutcome::Empty,
                            });
                        }
                        BulkStatus::CreditsInsufficient => {
                            handle.status = EnrichmentJobStatus::ProviderInsufficientCredits;
                            return Err(EnrichmentError::ProviderInsufficientCredits);
                        }
                        status if status.is_pending() => {
                            if status == BulkStatus::Unknown {
                                debug!(enrichment_id = %handle.enrichment_id, "Unrecognised enrichment status, still polling");
                            }
                            handle.status = EnrichmentJobStatus::Polling;
                            let remaining = handle.remaining();
                            if remaining.is_zero() {
                                return Err(self.time_out(handle));
                            }
                            PollStep::Wait(self.config.poll_interval.min(remaining))
                        }
                        status => {
                            handle.status = EnrichmentJobStatus::Error;
                            warn!(enrichment_id = %handle.enrichment_id, status = ?status, "Enrichment ended without result");
                            return Err(EnrichmentError::Failed(format!(
                                "enrichment {} ended with status {:?}",
                                handle.enrichment_id, status
                            )));
                        }
                    }
                }
                PollStep::Wait(delay) => {
                    sleep(delay).await;
                    if handle.remaining().is_zero() {
                        return Err(self.time_out(handle));
                    }
                    PollStep::Fetch
                }
            };
        }
    }

    fn time_out(&self, handle: &mut JobHandle) -> EnrichmentError {
        handle.status = EnrichmentJobStatus::TimedOut;
        EnrichmentError::Timeout {
            timeout_ms: self.config.timeout.as_millis(),
            polls: handle.polls,
        }
    }
}
