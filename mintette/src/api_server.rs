//! Mintette RPC surface
//!
//! JSON-over-HTTP dispatch binding the state machine to the wire. Every
//! handler returns either a typed success body or `{"error": ...}`; panics
//! inside the state machine surface as internal errors instead of killing
//! the server.

use crate::error::MintetteError;
use crate::node::MintetteNode;
use crate::storage::TxSignatures;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use rscoin_core::{
    ActionLog, AddrId, Address, CheckConfirmation, CheckConfirmations, CommitAcknowledgment,
    LBlock, NewPeriodData, PeriodId, PeriodResult, Transaction,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;

pub type ApiResult<T> = Result<Json<T>, ApiError>;

/// Typed error crossing the RPC boundary as `{"error": ...}`.
#[derive(Debug)]
pub struct ApiError(pub MintetteError);

impl From<MintetteError> for ApiError {
    fn from(err: MintetteError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            MintetteError::Storage(_) | MintetteError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::BAD_REQUEST,
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckTxRequest {
    pub transaction: Transaction,
    pub addr_id: AddrId,
    pub signatures: TxSignatures,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckTxBatchRequest {
    pub transaction: Transaction,
    pub signatures: Vec<(AddrId, TxSignatures)>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CommitTxRequest {
    pub transaction: Transaction,
    #[serde(with = "rscoin_core::serde_pairs")]
    pub confirmations: CheckConfirmations,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PeriodFinishedRequest {
    pub period_id: PeriodId,
}

/// Per-entry outcomes of a batched check.
pub type BatchResponse = Vec<(AddrId, Result<CheckConfirmation, String>)>;

pub fn create_routes(node: MintetteNode) -> Router {
    Router::new()
        .route("/check_tx", post(check_tx))
        .route("/check_tx_batch", post(check_tx_batch))
        .route("/commit_tx", post(commit_tx))
        .route("/period_finished", post(period_finished))
        .route("/announce_new_period", post(announce_new_period))
        .route("/period", get(get_period))
        .route("/utxo", get(get_utxo))
        .route("/blocks/:period_id", get(get_blocks))
        .route("/logs/:period_id", get(get_logs))
        .with_state(node)
}

pub async fn start_server(
    addr: SocketAddr,
    node: MintetteNode,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_routes(node);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn check_tx(
    State(node): State<MintetteNode>,
    Json(req): Json<CheckTxRequest>,
) -> ApiResult<CheckConfirmation> {
    let confirmation = node
        .check_tx(req.transaction, req.addr_id, req.signatures)
        .await?;
    Ok(Json(confirmation))
}

async fn check_tx_batch(
    State(node): State<MintetteNode>,
    Json(req): Json<CheckTxBatchRequest>,
) -> ApiResult<BatchResponse> {
    let signatures = req.signatures.into_iter().collect();
    let results = node.check_tx_batch(req.transaction, signatures).await?;

    let response = results
        .into_iter()
        .map(|(addr_id, outcome)| (addr_id, outcome.map_err(|e| e.to_string())))
        .collect();
    Ok(Json(response))
}

async fn commit_tx(
    State(node): State<MintetteNode>,
    Json(req): Json<CommitTxRequest>,
) -> ApiResult<CommitAcknowledgment> {
    let acknowledgment = node.commit_tx(req.transaction, req.confirmations).await?;
    Ok(Json(acknowledgment))
}

async fn period_finished(
    State(node): State<MintetteNode>,
    Json(req): Json<PeriodFinishedRequest>,
) -> ApiResult<PeriodResult> {
    let result = node.finish_period(req.period_id).await?;
    Ok(Json(result))
}

async fn announce_new_period(
    State(node): State<MintetteNode>,
    Json(data): Json<NewPeriodData>,
) -> ApiResult<()> {
    node.start_period(data).await?;
    Ok(Json(()))
}

/// `null` means the node has not adopted a period yet; a store failure goes
/// through the error channel instead.
async fn get_period(State(node): State<MintetteNode>) -> ApiResult<Option<PeriodId>> {
    Ok(Json(node.current_period().await?))
}

async fn get_utxo(State(node): State<MintetteNode>) -> ApiResult<Vec<(AddrId, Address)>> {
    Ok(Json(node.utxo().await.into_iter().collect()))
}

async fn get_blocks(
    State(node): State<MintetteNode>,
    Path(period_id): Path<PeriodId>,
) -> ApiResult<Vec<LBlock>> {
    match node.blocks(period_id).await {
        Some(blocks) => Ok(Json(blocks)),
        None => Err(ApiError(MintetteError::WrongPeriod {
            expected: node.current_period().await?.unwrap_or(0),
            got: period_id,
        })),
    }
}

async fn get_logs(
    State(node): State<MintetteNode>,
    Path(period_id): Path<PeriodId>,
) -> ApiResult<ActionLog> {
    match node.logs(period_id).await {
        Some(log) => Ok(Json(log)),
        None => Err(ApiError(MintetteError::WrongPeriod {
            expected: node.current_period().await?.unwrap_or(0),
            got: period_id,
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_tx_request_roundtrip() {
        use rscoin_core::Coin;
        use rscoin_crypto::{hash_value, KeyPair};

        let user = KeyPair::generate();
        let addr_id = AddrId {
            tx_hash: hash_value(&"funding"),
            index: 0,
            value: Coin::from_units(10),
        };
        let transaction = Transaction {
            inputs: vec![addr_id],
            outputs: vec![(Address(user.public_key()), Coin::from_units(10))],
        };
        let req = CheckTxRequest {
            signatures: vec![(Address(user.public_key()), user.sign_value(&transaction))],
            transaction,
            addr_id,
        };

        let json = serde_json::to_string(&req).unwrap();
        let back: CheckTxRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back.transaction, req.transaction);
        assert_eq!(back.addr_id, req.addr_id);
    }
}
