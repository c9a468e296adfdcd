//! Email opener generation.
//!
//! `OpenerGenerator::generate` never fails: provider errors degrade to a
//! deterministic template, and answers that stay over the word limit after
//! every attempt are truncated.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use regex::Regex;
use tracing::{debug, info, warn};

use ghost_models::GeneratedOpener;
use ghost_providers::gemini::DEFAULT_BASE_URL;
use ghost_providers::{GeminiClient, ProviderResult, TextGenerator};

use crate::metrics;

pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";
const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 40;
const MAX_ATTEMPTS: u32 = 3;
const MAX_WORDS: usize = 20;
const STUB_DELAY_MS: u64 = 200;

/// Placeholder tokens models sometimes emit instead of a name.
static NAME_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\[name\]|\{\{\s*name\s*\}\}|<name>").unwrap());

/// Opener generator configuration.
#[derive(Debug, Clone)]
pub struct OpenerConfig {
    /// Gemini API key; the template is used when absent
    pub api_key: Option<String>,
    pub model: String,
    pub max_output_tokens: u32,
    pub base_url: String,
    pub max_attempts: u32,
    pub max_words: usize,
    pub stub_delay: Duration,
}

impl Default for OpenerConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            base_url: DEFAULT_BASE_URL.to_string(),
            max_attempts: MAX_ATTEMPTS,
            max_words: MAX_WORDS,
            stub_delay: Duration::from_millis(STUB_DELAY_MS),
        }
    }
}

impl OpenerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var("GEMINI_API_KEY")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            model: std::env::var("GEMINI_MODEL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_output_tokens: std::env::var("GEMINI_MAX_OUTPUT_TOKENS")
                .ok()
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(DEFAULT_MAX_OUTPUT_TOKENS),
            base_url: std::env::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            ..Self::default()
        }
    }
}

/// Template opener used without a provider and on provider failure.
pub fn fallback_opener(job_title: &str, company: &str) -> String {
    let title = job_title.trim();
    let company = company.trim();
    let greeting = match (title.is_empty(), company.is_empty()) {
        (false, false) => format!("Hi {} at {}", title, company),
        (false, true) => format!("Hi {}", title),
        (true, false) => format!("Hi there at {}", company),
        (true, true) => "Hi there".to_string(),
    };
    truncate_words(
        &format!("{}, curious how you approach growth, can we connect?", greeting),
        MAX_WORDS,
    )
}

fn initial_prompt(job_title: &str, company: &str) -> String {
    let title = job_title.trim();
    let company = company.trim();
    let company_part = if company.is_empty() || company.eq_ignore_ascii_case("none at this time") {
        String::new()
    } else {
        format!(" at {}", company)
    };
    format!(
        "Write a single conversational, professional email opener under 20 words for a {}{}. \
         Keep it friendly and concise. Do not use placeholders like [Name].",
        if title.is_empty() { "professional" } else { title },
        company_part
    )
}

/// Each call is stateless, so the previous answer travels with the request.
fn shorten_prompt(previous: &str) -> String {
    format!(
        "Shorten the previous answer to a single conversational opener under 20 words. \
         Keep it professional and friendly.\n\nPrevious answer: {}",
        previous
    )
}

/// Collapse whitespace and substitute (or drop) name placeholders.
fn clean_text(raw: &str, full_name: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let replaced = NAME_PLACEHOLDER.replace_all(&collapsed, full_name.trim());
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_words(text: &str, max_words: usize) -> String {
    text.split_whitespace().take(max_words).collect::<Vec<_>>().join(" ")
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Produces one opener per call.
#[derive(Clone)]
pub struct OpenerGenerator {
    generator: Option<Arc<dyn TextGenerator>>,
    config: OpenerConfig,
}

impl OpenerGenerator {
    pub fn new(generator: Option<Arc<dyn TextGenerator>>, config: OpenerConfig) -> Self {
        Self { generator, config }
    }

    /// Build with the Gemini client when a key is configured.
    pub fn from_config(config: OpenerConfig) -> ProviderResult<Self> {
        let generator = match &config.api_key {
            Some(key) => {
                let client = GeminiClient::new(key.clone(), config.base_url.clone())?;
                Some(Arc::new(client) as Arc<dyn TextGenerator>)
            }
            None => None,
        };
        Ok(Self::new(generator, config))
    }

    pub fn is_stub(&self) -> bool {
        self.generator.is_none()
    }

    /// Generate an opener of at most `max_words` words.
    pub async fn generate(&self, full_name: &str, job_title: &str, company: &str) -> GeneratedOpener {
        let Some(generator) = self.generator.as_deref() else {
            tokio::time::sleep(self.config.stub_delay).await;
            debug!("No Gemini key configured, using template opener");
            return GeneratedOpener::local(fallback_opener(job_title, company));
        };

        match self.generate_with(generator, full_name, job_title, company).await {
            Ok(Some(opener)) => opener,
            Ok(None) => {
                warn!(model = %self.config.model, "Gemini returned an empty opener, using template");
                metrics::record_opener_fallback("empty");
                GeneratedOpener::local(fallback_opener(job_title, company))
            }
            Err(e) => {
                warn!(model = %self.config.model, error = %e, "Gemini opener generation failed, using template");
                metrics::record_opener_fallback("provider_error");
                GeneratedOpener::local(fallback_opener(job_title, company))
            }
        }
    }

    async fn generate_with(
        &self,
        generator: &dyn TextGenerator,
        full_name: &str,
        job_title: &str,
        company: &str,
    ) -> ProviderResult<Option<GeneratedOpener>> {
        let mut prompt = initial_prompt(job_title, company);
        let mut last = None;

        for attempt in 1..=self.config.max_attempts {
            metrics::record_opener_attempt();
            let generation = generator
                .generate(&self.config.model, &prompt, self.config.max_output_tokens)
                .await?;

            let text = clean_text(&generation.text, full_name);
            let words = word_count(&text);
            if words == 0 {
                return Ok(None);
            }

            let opener = GeneratedOpener {
                text,
                usage: generation.usage,
                model: Some(generation.model_version.unwrap_or_else(|| self.config.model.clone())),
            };

            if words <= self.config.max_words {
                debug!(attempt, words, "Opener within word limit");
                return Ok(Some(opener));
            }

            info!(attempt, words, "Opener over word limit, asking for a shorter one");
            prompt = shorten_prompt(&opener.text);
            last = Some(opener);
        }

        Ok(last.map(|mut opener| {
            opener.text = truncate_words(&opener.text, self.config.max_words);
            opener
        }))
    }
}
