//! Wallet handlers: balances, passive fields and direct credit actions.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use ghost_models::{Badge, Reputation, WalletHistoryEntry};

use crate::error::{ApiError, ApiResult};
use crate::security::is_valid_wallet;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub wallet: String,
    pub balance: u64,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub wallet: String,
    pub history: Vec<WalletHistoryEntry>,
}

#[derive(Debug, Serialize)]
pub struct BadgesResponse {
    pub wallet: String,
    pub badges: Vec<Badge>,
}

#[derive(Debug, Serialize)]
pub struct ReputationResponse {
    pub wallet: String,
    pub reputation: Reputation,
}

#[derive(Debug, Serialize)]
pub struct RecordResponse {
    pub wallet: String,
    pub recorded: bool,
}

#[derive(Debug, Deserialize)]
pub struct DeductRequest {
    #[serde(default)]
    pub wallet: Option<String>,
    #[serde(default)]
    pub amount: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct BuyCreditsRequest {
    #[serde(default)]
    pub wallet: Option<String>,
    #[serde(default)]
    pub amount: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct RecordRequest {
    #[serde(default)]
    pub wallet: Option<String>,
    #[serde(default)]
    pub search: Option<RecordedSearch>,
}

/// Client-side search summary; only the reference fields are kept.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedSearch {
    #[serde(default, alias = "_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub linkedin_url: Option<String>,
}

fn require_wallet(wallet: Option<&str>) -> ApiResult<&str> {
    let wallet = wallet
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .ok_or_else(|| ApiError::bad_request("wallet required"))?;
    if !is_valid_wallet(wallet) {
        return Err(ApiError::bad_request("invalid wallet"));
    }
    Ok(wallet)
}

fn positive_amount(amount: i64) -> ApiResult<u64> {
    u64::try_from(amount)
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| ApiError::bad_request("amount must be a positive integer"))
}

pub async fn get_credits(State(state): State<AppState>, Path(wallet): Path<String>) -> ApiResult<Json<BalanceResponse>> {
    let address = require_wallet(Some(&wallet))?;
    let wallet = state.ledger.wallet(address).await?;
    Ok(Json(BalanceResponse {
        wallet: wallet.address,
        balance: wallet.credits,
    }))
}

pub async fn get_history(State(state): State<AppState>, Path(wallet): Path<String>) -> ApiResult<Json<HistoryResponse>> {
    let address = require_wallet(Some(&wallet))?;
    let wallet = state.ledger.wallet(address).await?;
    Ok(Json(HistoryResponse {
        wallet: wallet.address,
        history: wallet.history,
    }))
}

pub async fn get_badges(State(state): State<AppState>, Path(wallet): Path<String>) -> ApiResult<Json<BadgesResponse>> {
    let address = require_wallet(Some(&wallet))?;
    let wallet = state.ledger.wallet(address).await?;
    Ok(Json(BadgesResponse {
        wallet: wallet.address,
        badges: wallet.badges,
    }))
}

pub async fn get_reputation(
    State(state): State<AppState>,
    Path(wallet): Path<String>,
) -> ApiResult<Json<ReputationResponse>> {
    let address = require_wallet(Some(&wallet))?;
    let wallet = state.ledger.wallet(address).await?;
    Ok(Json(ReputationResponse {
        wallet: wallet.address,
        reputation: wallet.reputation,
    }))
}

/// Spend credits directly; `amount` defaults to 1.
pub async fn deduct(State(state): State<AppState>, Json(request): Json<DeductRequest>) -> ApiResult<Json<BalanceResponse>> {
    let address = require_wallet(request.wallet.as_deref())?;
    let amount = positive_amount(request.amount.unwrap_or(1))?;

    let balance = state.ledger.deduct(address, amount).await?;
    Ok(Json(BalanceResponse {
        wallet: address.to_string(),
        balance,
    }))
}

/// Add credits after a confirmed payment.
pub async fn buy_credits(
    State(state): State<AppState>,
    Json(request): Json<BuyCreditsRequest>,
) -> ApiResult<Json<BalanceResponse>> {
    let address = require_wallet(request.wallet.as_deref())?;
    let amount = request
        .amount
        .ok_or_else(|| ApiError::bad_request("amount required"))
        .and_then(positive_amount)?;

    let balance = state.ledger.buy(address, amount).await?;
    Ok(Json(BalanceResponse {
        wallet: address.to_string(),
        balance,
    }))
}

/// Append a search reference to the wallet history.
pub async fn record_search(
    State(state): State<AppState>,
    Json(request): Json<RecordRequest>,
) -> ApiResult<Json<RecordResponse>> {
    let address = require_wallet(request.wallet.as_deref())?;
    let search = request
        .search
        .ok_or_else(|| ApiError::bad_request("search required"))?;

    state
        .ledger
        .record_search(address, search.id, search.linkedin_url)
        .await?;

    Ok(Json(RecordResponse {
        wallet: address.to_string(),
        recorded: true,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_amount() {
        assert_eq!(positive_amount(5).unwrap(), 5);
        assert!(positive_amount(0).is_err());
        assert!(positive_amount(-3).is_err());
    }

    #[test]
    fn test_require_wallet() {
        assert!(matches!(require_wallet(None), Err(ApiError::BadRequest(msg)) if msg == "wallet required"));
        assert!(matches!(require_wallet(Some("nope")), Err(ApiError::BadRequest(msg)) if msg == "invalid wallet"));
        assert_eq!(require_wallet(Some("0xTESTWALLET")).unwrap(), "0xTESTWALLET");
    }

    #[test]
    fn test_recorded_search_accepts_legacy_id() {
        let search: RecordedSearch =
            serde_json::from_value(serde_json::json!({ "_id": "abc", "linkedinUrl": "u" })).unwrap();
        assert_eq!(search.id.as_deref(), Some("abc"));
        assert_eq!(search.linkedin_url.as_deref(), Some("u"));
    }
}
