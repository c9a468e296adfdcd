//! Paid search and regeneration handlers.

use axum::extract::State;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use ghost_models::SearchView;

use crate::error::{ApiError, ApiResult};
use crate::middleware::RequestId;
use crate::security::{is_valid_record_id, is_valid_wallet, validate_linkedin_url};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    #[serde(default)]
    pub linkedin_url: Option<String>,
    #[serde(default)]
    pub wallet: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RegenerateRequest {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub wallet: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub data: T,
}

/// Optional wallet field: blank means no wallet, anything else must be valid.
fn optional_wallet(wallet: Option<&str>) -> ApiResult<Option<&str>> {
    match wallet.map(str::trim).filter(|w| !w.is_empty()) {
        None => Ok(None),
        Some(w) if is_valid_wallet(w) => Ok(Some(w)),
        Some(_) => Err(ApiError::bad_request("invalid wallet")),
    }
}

/// Enrich a LinkedIn profile and generate an opener.
pub async fn search(
    State(state): State<AppState>,
    request_id: Option<Extension<RequestId>>,
    Json(request): Json<SearchRequest>,
) -> ApiResult<Json<DataResponse<SearchView>>> {
    let linkedin_url = validate_linkedin_url(request.linkedin_url.as_deref().unwrap_or_default())
        .map_err(ApiError::bad_request)?;
    let wallet = optional_wallet(request.wallet.as_deref())?;

    let request_id = request_id.map(|Extension(RequestId(id))| id);
    let record = state
        .orchestrator
        .search(&linkedin_url, wallet, request_id.as_deref())
        .await?;

    Ok(Json(DataResponse {
        data: SearchView::from(&record),
    }))
}

/// Generate a new opener for an existing search result.
pub async fn regenerate(
    State(state): State<AppState>,
    request_id: Option<Extension<RequestId>>,
    Json(request): Json<RegenerateRequest>,
) -> ApiResult<Json<DataResponse<SearchView>>> {
    let id = request.id.as_deref().map(str::trim).unwrap_or_default();
    if id.is_empty() {
        return Err(ApiError::bad_request("id is required"));
    }
    if !is_valid_record_id(id) {
        return Err(ApiError::bad_request("invalid id"));
    }
    let wallet = optional_wallet(request.wallet.as_deref())?;

    let request_id = request_id.map(|Extension(RequestId(id))| id);
    let record = state.orchestrator.regenerate(id, wallet, request_id.as_deref()).await?;

    Ok(Json(DataResponse {
        data: SearchView::from(&record),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_wallet() {
        assert_eq!(optional_wallet(None).unwrap(), None);
        assert_eq!(optional_wallet(Some("  ")).unwrap(), None);
        assert_eq!(optional_wallet(Some("0xTESTWALLET")).unwrap(), Some("0xTESTWALLET"));
        assert!(optional_wallet(Some("0x12")).is_err());
    }
}
