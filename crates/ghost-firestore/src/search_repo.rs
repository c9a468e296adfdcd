//! Firestore-backed search record store (`search_results` collection).

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;

use ghost_models::{GenerationUsage, OpenerEntry, SearchRecord};

use crate::client::FirestoreClient;
use crate::error::{FirestoreError, FirestoreResult};
use crate::optimistic::{update_with_precondition, Codec};
use crate::store::RecordStore;
use crate::types::{ArrayValue, Document, FromFirestoreValue, ToFirestoreValue, Value};

pub const SEARCH_RESULTS_COLLECTION: &str = "search_results";

const OPENER_MASK: &[&str] = &["opener", "usage", "model", "opener_history", "updated_at"];

const CODEC: Codec<SearchRecord> = Codec {
    decode: document_to_record,
    encode: record_to_fields,
};

/// Search record store backed by Firestore.
#[derive(Clone)]
pub struct FirestoreRecordStore {
    client: FirestoreClient,
}

impl FirestoreRecordStore {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RecordStore for FirestoreRecordStore {
    async fn create(&self, record: &SearchRecord) -> FirestoreResult<()> {
        self.client
            .create_document(SEARCH_RESULTS_COLLECTION, &record.id, record_to_fields(record))
            .await?;
        info!(record_id = %record.id, "Created search record");
        Ok(())
    }

    async fn get(&self, id: &str) -> FirestoreResult<Option<SearchRecord>> {
        self.client
            .get_document(SEARCH_RESULTS_COLLECTION, id)
            .await?
            .map(|doc| document_to_record(&doc))
            .transpose()
    }

    async fn update_opener(&self, id: &str, entry: OpenerEntry) -> FirestoreResult<SearchRecord> {
        let updated = update_with_precondition(
            &self.client,
            SEARCH_RESULTS_COLLECTION,
            id,
            &CODEC,
            OPENER_MASK,
            |record| {
                record.apply_opener(entry.clone());
                Some(())
            },
        )
        .await?;

        updated
            .map(|(record, _)| record)
            .ok_or_else(|| FirestoreError::request_failed("opener update aborted"))
    }

    async fn touch(&self, id: &str) -> FirestoreResult<bool> {
        let mut fields = HashMap::new();
        fields.insert("updated_at".to_string(), Utc::now().to_firestore_value());

        match self
            .client
            .update_document(
                SEARCH_RESULTS_COLLECTION,
                id,
                fields,
                vec!["updated_at".to_string()],
            )
            .await
        {
            Ok(_) => Ok(true),
            Err(FirestoreError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

// =============================================================================
// Document mapping
// =============================================================================

fn usage_to_value(usage: &Option<GenerationUsage>) -> Value {
    match usage {
        Some(u) => {
            let mut m = HashMap::new();
            m.insert("prompt_token_count".to_string(), u.prompt_token_count.to_firestore_value());
            m.insert(
                "candidates_token_count".to_string(),
                u.candidates_token_count.to_firestore_value(),
            );
            m.insert("total_token_count".to_string(), u.total_token_count.to_firestore_value());
            Value::map(m)
        }
        None => Value::NullValue(()),
    }
}

fn usage_from_value(value: Option<&Value>) -> Option<GenerationUsage> {
    let m = value?.as_map()?;
    let count = |key: &str| m.get(key).and_then(u32::from_firestore_value);
    Some(GenerationUsage {
        prompt_token_count: count("prompt_token_count"),
        candidates_token_count: count("candidates_token_count"),
        total_token_count: count("total_token_count"),
    })
}

fn entry_to_value(entry: &OpenerEntry) -> Value {
    let mut m = HashMap::new();
    m.insert("text".to_string(), entry.text.to_firestore_value());
    m.insert("created_at".to_string(), entry.created_at.to_firestore_value());
    m.insert("usage".to_string(), usage_to_value(&entry.usage));
    m.insert("model".to_string(), entry.model.to_firestore_value());
    Value::map(m)
}

fn record_to_fields(record: &SearchRecord) -> HashMap<String, Value> {
    let mut fields = HashMap::new();
    fields.insert("linkedin_url".to_string(), record.linkedin_url.to_firestore_value());
    fields.insert("full_name".to_string(), record.full_name.to_firestore_value());
    fields.insert("job_title".to_string(), record.job_title.to_firestore_value());
    fields.insert("company_name".to_string(), record.company_name.to_firestore_value());
    fields.insert("email".to_string(), record.email.to_firestore_value());
    fields.insert("phone".to_string(), record.phone.to_firestore_value());
    fields.insert("opener".to_string(), record.opener.to_firestore_value());
    fields.insert("usage".to_string(), usage_to_value(&record.usage));
    fields.insert("model".to_string(), record.model.to_firestore_value());
    fields.insert(
        "opener_history".to_string(),
        Value::ArrayValue(ArrayValue {
            values: Some(record.opener_history.iter().map(entry_to_value).collect()),
        }),
    );
    fields.insert("created_at".to_string(), record.created_at.to_firestore_value());
    fields.insert("updated_at".to_string(), record.updated_at.to_firestore_value());
    fields
}

fn document_to_record(doc: &Document) -> FirestoreResult<SearchRecord> {
    let id = doc
        .name
        .as_deref()
        .and_then(|n| n.rsplit('/').next())
        .map(str::to_string)
        .ok_or_else(|| FirestoreError::invalid_document("search record without name"))?;

    let linkedin_url = doc
        .get::<String>("linkedin_url")
        .ok_or_else(|| FirestoreError::invalid_document(format!("search record {} has no linkedin_url", id)))?;

    let fields = doc.fields.clone().unwrap_or_default();
    let text = |key: &str| doc.get::<String>(key);

    let opener_history = fields
        .get("opener_history")
        .and_then(Value::as_array)
        .unwrap_or(&[])
        .iter()
        .filter_map(Value::as_map)
        .map(|m| OpenerEntry {
            text: m
                .get("text")
                .and_then(String::from_firestore_value)
                .unwrap_or_default(),
            created_at: m
                .get("created_at")
                .and_then(FromFirestoreValue::from_firestore_value)
                .unwrap_or_else(Utc::now),
            usage: usage_from_value(m.get("usage")),
            model: m.get("model").and_then(String::from_firestore_value),
        })
        .collect();

    let created_at = doc.get("created_at").unwrap_or_else(Utc::now);

    Ok(SearchRecord {
        id,
        linkedin_url,
        full_name: text("full_name"),
        job_title: text("job_title"),
        company_name: text("company_name"),
        email: text("email"),
        phone: text("phone"),
        opener: text("opener").unwrap_or_default(),
        usage: usage_from_value(fields.get("usage")),
        model: text("model"),
        opener_history,
        created_at,
        updated_at: doc.get("updated_at").unwrap_or(created_at),
    })
}

#[cfg(test)]
mod tests {
    use ghost_models::{EnrichedContact, GeneratedOpener};

    use super::*;

    fn record() -> SearchRecord {
        let opener = GeneratedOpener {
            text: "Hi Growth Manager at Acme Corp".to_string(),
            usage: Some(GenerationUsage {
                prompt_token_count: Some(20),
                candidates_token_count: Some(8),
                total_token_count: Some(28),
            }),
            model: Some("gemini-3-flash-preview".to_string()),
        };
        SearchRecord::new("https://www.linkedin.com/in/jane-doe", EnrichedContact::sample(), &opener)
    }

    fn as_stored(record: &SearchRecord) -> Document {
        let mut doc = Document::new(record_to_fields(record));
        doc.name = Some(format!(
            "projects/p/databases/(default)/documents/{}/{}",
            SEARCH_RESULTS_COLLECTION, record.id
        ));
        doc
    }

    #[test]
    fn test_record_field_mapping_round_trip() {
        let original = record();
        let decoded = document_to_record(&as_stored(&original)).unwrap();

        assert_eq!(decoded.id, original.id);
        assert_eq!(decoded.full_name.as_deref(), Some("Jane Doe"));
        assert_eq!(decoded.opener, original.opener);
        assert_eq!(decoded.usage, original.usage);
        assert_eq!(decoded.opener_history.len(), 1);
        assert_eq!(decoded.opener_history[0].model, original.model);
    }

    #[test]
    fn test_missing_usage_decodes_as_none() {
        let mut original = record();
        original.usage = None;
        original.opener_history[0].usage = None;
        let decoded = document_to_record(&as_stored(&original)).unwrap();
        assert_eq!(decoded.usage, None);
        assert_eq!(decoded.opener_history[0].usage, None);
    }

    #[test]
    fn test_opener_mask_covers_apply_opener_fields() {
        let fields = record_to_fields(&record());
        for key in OPENER_MASK {
            assert!(fields.contains_key(*key), "missing {}", key);
        }
    }
}
