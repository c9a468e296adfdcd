//! Enrichment result and job status types.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Contact fields resolved for a LinkedIn profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedContact {
    pub full_name: Option<String>,
    pub job_title: Option<String>,
    pub company_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl EnrichedContact {
    /// True if no field was resolved.
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.job_title.is_none()
            && self.company_name.is_none()
            && self.email.is_none()
            && self.phone.is_none()
    }

    /// Deterministic contact used when no enrichment credential is configured.
    pub fn sample() -> Self {
        Self {
            full_name: Some("Jane Doe".to_string()),
            job_title: Some("Growth Manager".to_string()),
            company_name: Some("Acme Corp".to_string()),
            email: Some("jane.doe@acme.com".to_string()),
            phone: Some("+1-555-1234".to_string()),
        }
    }
}

/// Lifecycle of one enrichment job inside a single orchestration call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentJobStatus {
    /// Submitted, no status fetched yet
    #[default]
    Submitted,
    /// At least one non-terminal status fetched
    Polling,
    /// Provider finished the job
    Finished,
    /// Provider refused for lack of its own credits
    ProviderInsufficientCredits,
    /// Local deadline passed
    TimedOut,
    /// Provider reported failure or could not be reached
    Error,
}

impl EnrichmentJobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::Polling => "polling",
            Self::Finished => "finished",
            Self::ProviderInsufficientCredits => "provider_insufficient_credits",
            Self::TimedOut => "timed_out",
            Self::Error => "error",
        }
    }

    /// Check if this is a terminal state (no more polls expected).
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Submitted | Self::Polling)
    }
}

impl std::fmt::Display for EnrichmentJobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!EnrichmentJobStatus::Submitted.is_terminal());
        assert!(!EnrichmentJobStatus::Polling.is_terminal());
        assert!(EnrichmentJobStatus::Finished.is_terminal());
        assert!(EnrichmentJobStatus::TimedOut.is_terminal());
        assert!(EnrichmentJobStatus::ProviderInsufficientCredits.is_terminal());
        assert!(EnrichmentJobStatus::Error.is_terminal());
    }

    #[test]
    fn test_contact_is_empty() {
        assert!(EnrichedContact::default().is_empty());
        assert!(!EnrichedContact::sample().is_empty());
    }
}
