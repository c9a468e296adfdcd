//! Optimistic read-modify-write against a single document.
//!
//! The document's `updateTime` is the version. A write made with a stale
//! version is rejected by Firestore, and the loop re-reads and re-applies the
//! mutation until it lands or the contention budget runs out.

use std::collections::HashMap;

use tracing::debug;

use crate::client::FirestoreClient;
use crate::error::{FirestoreError, FirestoreResult};
use crate::metrics::record_contention;
use crate::retry::{contention_exhausted, RetryConfig};
use crate::types::{Document, Value};

/// How a stored model maps to and from document fields.
pub(crate) struct Codec<M> {
    pub decode: fn(&Document) -> FirestoreResult<M>,
    pub encode: fn(&M) -> HashMap<String, Value>,
}

/// Apply `mutate` to the current document under an `updateTime` precondition.
///
/// `mutate` returning None aborts without writing and yields `Ok(None)`.
/// Only the fields named in `mask` are written.
pub(crate) async fn update_with_precondition<M, T, F>(
    client: &FirestoreClient,
    collection: &str,
    doc_id: &str,
    codec: &Codec<M>,
    mask: &[&str],
    mutate: F,
) -> FirestoreResult<Option<(M, T)>>
where
    M: Send,
    T: Send,
    F: Fn(&mut M) -> Option<T> + Send + Sync,
{
    let policy = RetryConfig::contention();

    for attempt in 0..=policy.max_retries {
        let doc = client
            .get_document(collection, doc_id)
            .await?
            .ok_or_else(|| FirestoreError::not_found(format!("{}/{}", collection, doc_id)))?;

        let update_time = doc.update_time.clone().ok_or_else(|| {
            FirestoreError::invalid_document(format!("{}/{} has no updateTime", collection, doc_id))
        })?;

        let mut model = (codec.decode)(&doc)?;
        let Some(output) = mutate(&mut model) else {
            return Ok(None);
        };

        let mut fields = (codec.encode)(&model);
        fields.retain(|k, _| mask.contains(&k.as_str()));
        let field_paths = mask.iter().map(|f| f.to_string()).collect();

        match client
            .update_document_with_precondition(collection, doc_id, fields, field_paths, &update_time)
            .await
        {
            Ok(_) => return Ok(Some((model, output))),
            Err(e) if e.is_precondition_failed() => {
                debug!(
                    collection = %collection,
                    doc_id = %doc_id,
                    attempt = attempt + 1,
                    "Concurrent write detected, retrying"
                );
                record_contention(collection, attempt == policy.max_retries);
                if attempt < policy.max_retries {
                    tokio::time::sleep(policy.delay_for(attempt, None)).await;
                }
            }
            Err(e) => return Err(e),
        }
    }

    Err(contention_exhausted(
        &format!("{}/{}", collection, doc_id),
        policy.max_retries + 1,
    ))
}
