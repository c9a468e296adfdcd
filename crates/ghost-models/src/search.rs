//! Search record data models.
//!
//! A search record is one enrichment plus opener outcome. It is created once
//! per new search and mutated in place when the opener is regenerated; each
//! opener ever produced is kept in `opener_history`.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::enrichment::EnrichedContact;

/// Token accounting reported by the text-generation provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerationUsage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_token_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidates_token_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_token_count: Option<u32>,
}

/// Output of the opener generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedOpener {
    /// Opener text, at most 20 words
    pub text: String,
    /// Provider usage (None for stub and fallback text)
    pub usage: Option<GenerationUsage>,
    /// Model that produced the text (None for stub and fallback text)
    pub model: Option<String>,
}

impl GeneratedOpener {
    /// Opener that did not come from the provider.
    pub fn local(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: None,
            model: None,
        }
    }

    /// Number of whitespace-separated words.
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// One immutable opener history entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OpenerEntry {
    pub text: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub usage: Option<GenerationUsage>,
    #[serde(default)]
    pub model: Option<String>,
}

impl From<&GeneratedOpener> for OpenerEntry {
    fn from(opener: &GeneratedOpener) -> Self {
        Self {
            text: opener.text.clone(),
            created_at: Utc::now(),
            usage: opener.usage,
            model: opener.model.clone(),
        }
    }
}

/// Persisted enrichment and opener outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchRecord {
    /// Unique identifier (UUID)
    pub id: String,

    /// Source LinkedIn profile URL
    pub linkedin_url: String,

    pub full_name: Option<String>,
    pub job_title: Option<String>,
    pub company_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,

    /// Current opener text
    pub opener: String,

    /// Usage of the generation that produced the current opener
    #[serde(default)]
    pub usage: Option<GenerationUsage>,

    /// Model of the generation that produced the current opener
    #[serde(default)]
    pub model: Option<String>,

    /// Every opener produced for this record, oldest first
    #[serde(default)]
    pub opener_history: Vec<OpenerEntry>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SearchRecord {
    /// Create a record for a fresh search with a one-entry opener history.
    pub fn new(
        linkedin_url: impl Into<String>,
        contact: EnrichedContact,
        opener: &GeneratedOpener,
    ) -> Self {
        let entry = OpenerEntry::from(opener);
        let now = entry.created_at;
        Self {
            id: Uuid::new_v4().to_string(),
            linkedin_url: linkedin_url.into(),
            full_name: contact.full_name,
            job_title: contact.job_title,
            company_name: contact.company_name,
            email: contact.email,
            phone: contact.phone,
            opener: opener.text.clone(),
            usage: opener.usage,
            model: opener.model.clone(),
            opener_history: vec![entry],
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the current opener and append it to the history.
    pub fn apply_opener(&mut self, entry: OpenerEntry) {
        self.opener = entry.text.clone();
        self.usage = entry.usage;
        self.model = entry.model.clone();
        self.updated_at = entry.created_at;
        self.opener_history.push(entry);
    }

    /// Bump `updated_at` without changing content.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Opener history entry as returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OpenerHistoryView {
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub gemini_model: Option<String>,
}

/// Usage summary as returned to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UsageSummary {
    pub total_token_count: u32,
}

/// Search record as returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchView {
    pub id: String,
    pub linkedin_url: String,
    pub full_name: Option<String>,
    pub job_title: Option<String>,
    pub company_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub opener: String,
    pub gemini_model: Option<String>,
    pub gemini_usage_summary: Option<UsageSummary>,
    pub opener_history: Vec<OpenerHistoryView>,
}

impl From<&SearchRecord> for SearchView {
    fn from(record: &SearchRecord) -> Self {
        let gemini_usage_summary = record
            .usage
            .and_then(|u| u.total_token_count)
            .filter(|total| *total > 0)
            .map(|total_token_count| UsageSummary { total_token_count });

        Self {
            id: record.id.clone(),
            linkedin_url: record.linkedin_url.clone(),
            full_name: record.full_name.clone(),
            job_title: record.job_title.clone(),
            company_name: record.company_name.clone(),
            email: record.email.clone(),
            phone: record.phone.clone(),
            opener: record.opener.clone(),
            gemini_model: record.model.clone(),
            gemini_usage_summary,
            opener_history: record
                .opener_history
                .iter()
                .map(|h| OpenerHistoryView {
                    text: h.text.clone(),
                    created_at: h.created_at,
                    gemini_model: h.model.clone(),
                })
                .collect(),
        }
    }
}
