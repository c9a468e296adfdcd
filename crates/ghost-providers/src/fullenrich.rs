//! FullEnrich v2 bulk contact enrichment client.
//!
//! A bulk job is started with one LinkedIn URL and polled by id until the
//! provider reports a terminal status. Polling policy lives with the caller;
//! this module only speaks the wire protocol.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info};

use ghost_models::EnrichedContact;

use crate::error::{status_error, ProviderError, ProviderResult};

const PROVIDER: &str = "fullenrich";

pub const DEFAULT_BASE_URL: &str = "https://app.fullenrich.com/api/v2";

/// Fields requested for every contact.
const ENRICH_FIELDS: [&str; 3] = ["contact.emails", "contact.personal_emails", "contact.phones"];

/// Enrichment provider operations the poller depends on.
#[async_trait]
pub trait EnrichmentProvider: Send + Sync {
    /// Start a bulk job for one profile, returning the enrichment id.
    async fn start_enrichment(&self, linkedin_url: &str) -> ProviderResult<String>;

    /// Fetch the current state of a bulk job.
    async fn enrichment_status(&self, enrichment_id: &str) -> ProviderResult<BulkEnrichment>;
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Serialize)]
struct StartBulkRequest<'a> {
    name: String,
    data: Vec<ContactRequest<'a>>,
}

#[derive(Debug, Serialize)]
struct ContactRequest<'a> {
    linkedin_url: &'a str,
    enrich_fields: [&'static str; 3],
}

#[derive(Debug, Deserialize)]
struct StartBulkResponse {
    #[serde(alias = "enrichmentId")]
    enrichment_id: Option<String>,
}

/// Bulk job status as reported by the provider.
///
/// Statuses this client does not know (and a missing status) map to
/// `Unknown`, which is treated as still running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BulkStatus {
    Created,
    InProgress,
    Finished,
    CreditsInsufficient,
    Canceled,
    RateLimit,
    #[default]
    #[serde(other)]
    Unknown,
}

impl BulkStatus {
    /// True unless the provider reported an outcome.
    pub fn is_pending(&self) -> bool {
        !matches!(self, Self::Finished | Self::CreditsInsufficient | Self::Canceled)
    }
}

/// Reads an explicit `null` the same as a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Bulk job state.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BulkEnrichment {
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: BulkStatus,
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: Vec<BulkEntry>,
}

impl BulkEnrichment {
    /// Contact resolved from the first entry, None when nothing was found.
    pub fn first_contact(&self) -> Option<EnrichedContact> {
        self.data
            .first()
            .map(BulkEntry::to_contact)
            .filter(|c| !c.is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BulkEntry {
    #[serde(default)]
    pub input: Option<EntryInput>,
    #[serde(default)]
    pub contact_info: Option<ContactInfo>,
    #[serde(default)]
    pub profile: Option<Profile>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntryInput {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub title: Option<String>,
    pub company_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactInfo {
    pub most_probable_work_email: Option<EmailItem>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub work_emails: Vec<EmailItem>,
    pub most_probable_phone: Option<PhoneItem>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub phones: Vec<PhoneItem>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmailItem {
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PhoneItem {
    pub number: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Profile {
    pub full_name: Option<String>,
    pub employment: Option<Employment>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Employment {
    pub current: Option<Position>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Position {
    pub title: Option<String>,
    pub company: Option<Company>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Company {
    pub name: Option<String>,
}

/// Empty strings count as absent.
fn present(value: Option<&String>) -> Option<String> {
    value.map(|s| s.trim()).filter(|s| !s.is_empty()).map(str::to_string)
}

impl BulkEntry {
    /// Extract contact fields, preferring the provider's best guesses.
    pub fn to_contact(&self) -> EnrichedContact {
        let contact = self.contact_info.clone().unwrap_or_default();
        let input = self.input.clone().unwrap_or_default();
        let current = self
            .profile
            .as_ref()
            .and_then(|p| p.employment.as_ref())
            .and_then(|e| e.current.as_ref());

        let email = present(contact.most_probable_work_email.as_ref().and_then(|e| e.email.as_ref()))
            .or_else(|| present(contact.work_emails.first().and_then(|e| e.email.as_ref())));

        let phone = present(contact.most_probable_phone.as_ref().and_then(|p| p.number.as_ref()))
            .or_else(|| present(contact.phones.first().and_then(|p| p.number.as_ref())));

        let job_title = present(current.and_then(|c| c.title.as_ref()))
            .or_else(|| present(input.title.as_ref()));

        let company_name = present(
            current
                .and_then(|c| c.company.as_ref())
                .and_then(|c| c.name.as_ref()),
        )
        .or_else(|| present(input.company_name.as_ref()));

        let full_name = present(self.profile.as_ref().and_then(|p| p.full_name.as_ref())).or_else(|| {
            let joined = [input.first_name.as_deref(), input.last_name.as_deref()]
                .iter()
                .flatten()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            present(Some(&joined))
        });

        EnrichedContact {
            full_name,
            job_title,
            company_name,
            email,
            phone,
        }
    }
}

// =============================================================================
// Client
// =============================================================================

/// FullEnrich HTTP client.
#[derive(Clone)]
pub struct FullEnrichClient {
    http: Client,
    api_key: String,
    base_url: String,
}

impl FullEnrichClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> ProviderResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(5))
            .user_agent(concat!("ghost-providers/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProviderError::Client(e.to_string()))?;

        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl EnrichmentProvider for FullEnrichClient {
    async fn start_enrichment(&self, linkedin_url: &str) -> ProviderResult<String> {
        let url = format!("{}/contact/enrich/bulk", self.base_url);
        let request = StartBulkRequest {
            name: format!("Ghost Enrichment - {}", Utc::now().to_rfc3339()),
            data: vec![ContactRequest {
                linkedin_url,
                enrich_fields: ENRICH_FIELDS,
            }],
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::network(PROVIDER, e))?;

        if !response.status().is_success() {
            return Err(status_error(PROVIDER, response).await);
        }

        let body: StartBulkResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::invalid_response(PROVIDER, e.to_string()))?;

        let enrichment_id = body
            .enrichment_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ProviderError::invalid_response(PROVIDER, "missing enrichment_id"))?;

        info!(enrichment_id = %enrichment_id, "Started FullEnrich bulk enrichment");
        Ok(enrichment_id)
    }

    async fn enrichment_status(&self, enrichment_id: &str) -> ProviderResult<BulkEnrichment> {
        let url = format!("{}/contact/enrich/bulk/{}", self.base_url, enrichment_id);

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| ProviderError::network(PROVIDER, e))?;

        if !response.status().is_success() {
            return Err(status_error(PROVIDER, response).await);
        }

        let result: BulkEnrichment = response
            .json()
            .await
            .map_err(|e| ProviderError::invalid_response(PROVIDER, e.to_string()))?;

        debug!(
            enrichment_id = %enrichment_id,
            status = ?result.status,
            entries = result.data.len(),
            "Fetched FullEnrich status"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn entry(value: serde_json::Value) -> BulkEntry {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_status_parsing() {
        let parse = |s: &str| serde_json::from_value::<BulkStatus>(json!(s)).unwrap();
        assert_eq!(parse("FINISHED"), BulkStatus::Finished);
        assert_eq!(parse("IN_PROGRESS"), BulkStatus::InProgress);
        assert_eq!(parse("CREDITS_INSUFFICIENT"), BulkStatus::CreditsInsufficient);
        assert_eq!(parse("SOMETHING_NEW"), BulkStatus::Unknown);
        assert!(parse("CREATED").is_pending());
        assert!(parse("SOMETHING_NEW").is_pending());
        assert!(!parse("CANCELED").is_pending());
        assert!(!parse("FINISHED").is_pending());
    }

    #[test]
    fn test_null_fields_read_as_empty() {
        let pending: BulkEnrichment =
            serde_json::from_value(json!({ "status": "IN_PROGRESS", "data": null })).unwrap();
        assert_eq!(pending.status, BulkStatus::InProgress);
        assert!(pending.data.is_empty());

        let no_status: BulkEnrichment = serde_json::from_value(json!({ "status": null })).unwrap();
        assert!(no_status.status.is_pending());

        let finished: BulkEnrichment = serde_json::from_value(json!({
            "status": "FINISHED",
            "data": [{
                "contact_info": {
                    "phones": null,
                    "work_emails": null,
                    "most_probable_work_email": { "email": "a@b.c" }
                }
            }]
        }))
        .unwrap();
        let contact = finished.first_contact().unwrap();
        assert_eq!(contact.email.as_deref(), Some("a@b.c"));
        assert!(contact.phone.is_none());
    }

    #[test]
    fn test_contact_prefers_most_probable_values() {
        let contact = entry(json!({
            "contact_info": {
                "most_probable_work_email": { "email": "best@acme.com" },
                "work_emails": [{ "email": "other@acme.com" }],
                "most_probable_phone": { "number": "+1-555-0000" },
                "phones": [{ "number": "+1-555-9999" }]
            },
            "profile": {
                "full_name": "Jane Doe",
                "employment": { "current": { "title": "CTO", "company": { "name": "Acme" } } }
            },
            "input": { "title": "Engineer", "company_name": "OldCo" }
        }))
        .to_contact();

        assert_eq!(contact.email.as_deref(), Some("best@acme.com"));
        assert_eq!(contact.phone.as_deref(), Some("+1-555-0000"));
        assert_eq!(contact.job_title.as_deref(), Some("CTO"));
        assert_eq!(contact.company_name.as_deref(), Some("Acme"));
        assert_eq!(contact.full_name.as_deref(), Some("Jane Doe"));
    }

    #[test]
    fn test_contact_falls_back_to_lists_and_input() {
        let contact = entry(json!({
            "contact_info": {
                "most_probable_work_email": { "email": "" },
                "work_emails": [{ "email": "first@acme.com" }, { "email": "second@acme.com" }],
                "phones": [{ "number": "+1-555-1111" }]
            },
            "profile": { "employment": {} },
            "input": { "first_name": "John", "last_name": "Smith", "title": "VP Sales", "company_name": "Initech" }
        }))
        .to_contact();

        assert_eq!(contact.email.as_deref(), Some("first@acme.com"));
        assert_eq!(contact.phone.as_deref(), Some("+1-555-1111"));
        assert_eq!(contact.job_title.as_deref(), Some("VP Sales"));
        assert_eq!(contact.company_name.as_deref(), Some("Initech"));
        assert_eq!(contact.full_name.as_deref(), Some("John Smith"));
    }

    #[test]
    fn test_contact_absent_fields() {
        let contact = entry(json!({})).to_contact();
        assert!(contact.is_empty());

        let result = BulkEnrichment {
            status: BulkStatus::Finished,
            data: vec![entry(json!({}))],
        };
        assert!(result.first_contact().is_none());
    }

    #[tokio::test]
    async fn test_start_enrichment_request_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/contact/enrich/bulk"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({
                "data": [{
                    "linkedin_url": "https://www.linkedin.com/in/jane",
                    "enrich_fields": ["contact.emails", "contact.personal_emails", "contact.phones"]
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "enrichment_id": "enr-1" })))
            .expect(1)
            .mount(&server)
            .await;

        let client = FullEnrichClient::new("test-key", server.uri()).unwrap();
        let id = client
            .start_enrichment("https://www.linkedin.com/in/jane")
            .await
            .unwrap();
        assert_eq!(id, "enr-1");
    }

    #[tokio::test]
    async fn test_start_enrichment_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let client = FullEnrichClient::new("test-key", server.uri()).unwrap();
        let err = client.start_enrichment("https://www.linkedin.com/in/jane").await.unwrap_err();
        assert_eq!(err.status(), Some(401));
    }

    #[tokio::test]
    async fn test_enrichment_status_parses_result() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/contact/enrich/bulk/enr-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "FINISHED",
                "data": [{
                    "contact_info": { "most_probable_work_email": { "email": "jane@acme.com" } },
                    "profile": { "full_name": "Jane Doe" }
                }]
            })))
            .mount(&server)
            .await;

        let client = FullEnrichClient::new("test-key", format!("{}/", server.uri())).unwrap();
        let result = client.enrichment_status("enr-1").await.unwrap();
        assert_eq!(result.status, BulkStatus::Finished);
        let contact = result.first_contact().unwrap();
        assert_eq!(contact.email.as_deref(), Some("jane@acme.com"));
    }
}
