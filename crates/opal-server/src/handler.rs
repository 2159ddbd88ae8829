use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;

use opal_crypto::SignatureEvidence;
use opal_store::{LedgerQueries, StorageEngine};
use opal_types::{AccountStatus, ByteString, LedgerPath, Record, TxId};
use opal_validation::TransactionRejected;

use crate::wiring::AppState;

fn error_code(status: StatusCode, code: &str) -> Response {
    (status, Json(json!({ "error_code": code }))).into_response()
}

fn internal_error(error: impl std::fmt::Display) -> Response {
    tracing::error!(%error, "request failed");
    error_code(StatusCode::INTERNAL_SERVER_ERROR, "InternalError")
}

// ---------------------------------------------------------------------------
// POST /submit
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    /// Hex-encoded serialized mutation.
    pub mutation: String,
    #[serde(default)]
    pub signatures: Vec<SignatureEvidence>,
}

pub async fn submit(
    State(state): State<AppState>,
    Json(request): Json<SubmitRequest>,
) -> Response {
    let Some(validator) = &state.validator else {
        return error_code(StatusCode::NOT_IMPLEMENTED, "ValidationDisabled");
    };
    let Ok(raw_mutation) = ByteString::from_hex(&request.mutation) else {
        return error_code(StatusCode::BAD_REQUEST, "InvalidMutation");
    };

    match validator
        .post_transaction(&raw_mutation, &request.signatures)
        .await
    {
        Ok(id) => Json(json!({ "transaction_hash": id.to_hex() })).into_response(),
        Err(TransactionRejected::Storage(error)) => internal_error(error),
        Err(rejected) => error_code(StatusCode::BAD_REQUEST, rejected.reason_code()),
    }
}

// ---------------------------------------------------------------------------
// GET /record
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct RecordQuery {
    /// Hex-encoded record key.
    pub key: String,
}

#[derive(Debug, Serialize)]
pub struct RecordResponse {
    pub key: String,
    pub value: Option<String>,
    pub version: String,
}

impl From<Record> for RecordResponse {
    fn from(record: Record) -> Self {
        Self {
            key: record.key.to_hex(),
            value: record.value.as_ref().map(ByteString::to_hex),
            version: record.version.to_hex(),
        }
    }
}

pub async fn get_record(
    State(state): State<AppState>,
    Query(query): Query<RecordQuery>,
) -> Response {
    let Ok(key) = ByteString::from_hex(&query.key) else {
        return error_code(StatusCode::BAD_REQUEST, "InvalidRecordKey");
    };
    match state.storage.get_records(std::slice::from_ref(&key)).await {
        // get_records returns one record per requested key.
        Ok(records) => match records.into_iter().next() {
            Some(record) => Json(RecordResponse::from(record)).into_response(),
            None => internal_error("storage returned no record"),
        },
        Err(error) => internal_error(error),
    }
}

// ---------------------------------------------------------------------------
// GET /query/account
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct AccountQuery {
    pub account: String,
}

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub account: String,
    pub asset: String,
    /// Decimal string; 64-bit balances overflow JSON number consumers.
    pub balance: String,
    pub version: String,
}

impl From<AccountStatus> for AccountResponse {
    fn from(status: AccountStatus) -> Self {
        Self {
            account: status.account_key.account.full_path(),
            asset: status.account_key.asset.full_path(),
            balance: status.balance.to_string(),
            version: status.version.to_hex(),
        }
    }
}

pub async fn query_account(
    State(state): State<AppState>,
    Query(query): Query<AccountQuery>,
) -> Response {
    let Ok(account) = LedgerPath::parse(&query.account) else {
        return error_code(StatusCode::BAD_REQUEST, "InvalidPath");
    };
    match state.storage.get_account_records(&account).await {
        Ok(statuses) => Json(
            statuses
                .into_iter()
                .map(AccountResponse::from)
                .collect::<Vec<_>>(),
        )
        .into_response(),
        Err(error) => internal_error(error),
    }
}

// ---------------------------------------------------------------------------
// GET /query/transaction
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct TransactionQuery {
    /// Hex-encoded double-SHA-256 hash of the mutation.
    pub mutation_hash: String,
}

pub async fn query_transaction(
    State(state): State<AppState>,
    Query(query): Query<TransactionQuery>,
) -> Response {
    let Ok(mutation_hash) = TxId::from_hex(&query.mutation_hash) else {
        return error_code(StatusCode::BAD_REQUEST, "InvalidTransaction");
    };
    match state.storage.get_transaction(&mutation_hash).await {
        Ok(Some(raw)) => Json(json!({ "raw": raw.to_hex() })).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(error) => internal_error(error),
    }
}

// ---------------------------------------------------------------------------
// GET /query/subaccounts
// ---------------------------------------------------------------------------

pub async fn query_subaccounts(
    State(state): State<AppState>,
    Query(query): Query<AccountQuery>,
) -> Response {
    let Ok(account) = LedgerPath::parse(&query.account) else {
        return error_code(StatusCode::BAD_REQUEST, "InvalidPath");
    };
    let prefix = ByteString::from(account.full_path().as_str());
    match state.storage.get_key_starting_from(&prefix).await {
        Ok(records) => Json(
            records
                .into_iter()
                .map(RecordResponse::from)
                .collect::<Vec<_>>(),
        )
        .into_response(),
        Err(error) => internal_error(error),
    }
}
