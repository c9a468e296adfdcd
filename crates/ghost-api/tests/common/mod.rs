//! Shared fixtures: in-memory stores and scripted providers.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use ghost_api::config::ApiConfig;
use ghost_api::services::{EnrichmentPoller, LedgerConfig, OpenerConfig, OpenerGenerator, PollerConfig};
use ghost_api::AppState;
use ghost_firestore::{InMemoryRecordStore, InMemoryWalletStore};
use ghost_models::GenerationUsage;
use ghost_providers::{BulkEnrichment, EnrichmentProvider, Generation, ProviderError, ProviderResult, TextGenerator};

pub const WALLET: &str = "0x52908400098527886E0F7030069857D2E4169EE7";
pub const PROFILE_URL: &str = "https://www.linkedin.com/in/jane-doe";

/// Enrichment provider replaying scripted statuses.
///
/// Once the script runs out every fetch reports `IN_PROGRESS`.
pub struct FakeEnrichment {
    pub fail_submit: bool,
    statuses: Mutex<VecDeque<Value>>,
    pub submissions: Mutex<Vec<String>>,
}

impl FakeEnrichment {
    pub fn new(statuses: Vec<Value>) -> Self {
        Self {
            fail_submit: false,
            statuses: Mutex::new(statuses.into()),
            submissions: Mutex::new(Vec::new()),
        }
    }

    pub fn finished_with_contact() -> Self {
        Self::new(vec![
            json!({ "status": "IN_PROGRESS" }),
            json!({
                "status": "FINISHED",
                "data": [{
                    "input": { "first_name": "Jane", "last_name": "Doe" },
                    "contact_info": {
                        "most_probable_work_email": { "email": "jane@acme.com" },
                        "phones": [{ "number": "+1-555-0000" }]
                    },
                    "profile": {
                        "full_name": "Jane Doe",
                        "employment": { "current": { "title": "VP Growth", "company": { "name": "Acme" } } }
                    }
                }]
            }),
        ])
    }

    pub fn finished_empty() -> Self {
        Self::new(vec![json!({ "status": "FINISHED", "data": [] })])
    }
}

#[async_trait]
impl EnrichmentProvider for FakeEnrichment {
    async fn start_enrichment(&self, linkedin_url: &str) -> ProviderResult<String> {
        if self.fail_submit {
            return Err(ProviderError::Status {
                provider: "fullenrich",
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        self.submissions.lock().unwrap().push(linkedin_url.to_string());
        Ok("enrichment-1".to_string())
    }

    async fn enrichment_status(&self, _enrichment_id: &str) -> ProviderResult<BulkEnrichment> {
        let next = self
            .statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| json!({ "status": "IN_PROGRESS" }));
        Ok(serde_json::from_value(next).unwrap())
    }
}

/// Text generator replaying scripted answers; errors once the script ends.
pub struct FakeGenerator {
    replies: Mutex<VecDeque<String>>,
    pub calls: Mutex<u32>,
}

impl FakeGenerator {
    pub fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|s| s.to_string()).collect()),
            calls: Mutex::new(0),
        }
    }
}

#[async_trait]
impl TextGenerator for FakeGenerator {
    async fn generate(&self, _model: &str, _prompt: &str, _max_output_tokens: u32) -> ProviderResult<Generation> {
        *self.calls.lock().unwrap() += 1;
        let text = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ProviderError::invalid_response("gemini", "no scripted reply"))?;
        Ok(Generation {
            text,
            usage: Some(GenerationUsage {
                prompt_token_count: Some(18),
                candidates_token_count: Some(9),
                total_token_count: Some(27),
            }),
            model_version: Some("gemini-test".to_string()),
        })
    }
}

pub struct TestApp {
    pub state: AppState,
    pub wallets: Arc<InMemoryWalletStore>,
    pub records: Arc<InMemoryRecordStore>,
    pub enrichment: Arc<FakeEnrichment>,
    pub generator: Arc<FakeGenerator>,
}

/// Poll every 100 ms with a 1 s deadline so paused-clock tests stay short.
pub fn test_app(enrichment: FakeEnrichment, generator: FakeGenerator) -> TestApp {
    let wallets = Arc::new(InMemoryWalletStore::new());
    let records = Arc::new(InMemoryRecordStore::new());
    let enrichment = Arc::new(enrichment);
    let generator = Arc::new(generator);

    let poller = EnrichmentPoller::new(
        Some(enrichment.clone()),
        PollerConfig {
            timeout: Duration::from_millis(1_000),
            poll_interval: Duration::from_millis(100),
            ..PollerConfig::default()
        },
    );
    let opener = OpenerGenerator::new(Some(generator.clone()), OpenerConfig::default());

    let state = AppState::from_parts(
        ApiConfig::default(),
        wallets.clone(),
        records.clone(),
        LedgerConfig::default(),
        poller,
        opener,
    );

    TestApp {
        state,
        wallets,
        records,
        enrichment,
        generator,
    }
}
