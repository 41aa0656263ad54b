//! Bank RPC surface
//!
//! Read access to the roster and the canonical chain, plus the admission
//! endpoints feeding the pending sets merged at period boundaries.

use crate::error::BankError;
use crate::node::BankNode;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use rscoin_core::{Address, HBlock, Mintette, PeriodId, TxStrategy};
use rscoin_crypto::PublicKey;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;

pub type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug)]
pub struct ApiError(pub BankError);

impl From<BankError> for ApiError {
    fn from(err: BankError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            BankError::UnknownMintette(_) | BankError::UnknownExplorer(_) => StatusCode::NOT_FOUND,
            BankError::Storage(_) | BankError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AddMintetteRequest {
    pub host: String,
    pub port: u16,
    /// Mintette public key, hex encoded.
    pub public_key: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AddAddressRequest {
    pub address: Address,
    pub strategy: TxStrategy,
}

pub fn create_routes(node: BankNode) -> Router {
    Router::new()
        .route("/mintettes", get(get_mintettes).post(add_mintette))
        .route("/height", get(get_height))
        .route("/hblock/:period_id", get(get_hblock))
        .route("/addresses", post(add_address))
        .with_state(node)
}

pub async fn start_server(
    addr: SocketAddr,
    node: BankNode,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_routes(node);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn get_mintettes(State(node): State<BankNode>) -> ApiResult<Vec<Mintette>> {
    Ok(Json(node.mintettes().await))
}

async fn get_height(State(node): State<BankNode>) -> ApiResult<u64> {
    Ok(Json(node.height().await))
}

async fn get_hblock(
    State(node): State<BankNode>,
    Path(period_id): Path<PeriodId>,
) -> ApiResult<HBlock> {
    match node.hblock(period_id).await {
        Some(block) => Ok(Json(block)),
        None => Err(ApiError(BankError::Internal(format!(
            "no block for period {}",
            period_id
        )))),
    }
}

async fn add_mintette(
    State(node): State<BankNode>,
    Json(req): Json<AddMintetteRequest>,
) -> ApiResult<()> {
    let key = PublicKey::from_hex(&req.public_key)
        .map_err(|e| ApiError(BankError::Internal(e.to_string())))?;
    node.add_mintette(
        Mintette {
            host: req.host,
            port: req.port,
        },
        key,
    )
    .await?;
    Ok(Json(()))
}

async fn add_address(
    State(node): State<BankNode>,
    Json(req): Json<AddAddressRequest>,
) -> ApiResult<()> {
    node.add_address(req.address, req.strategy).await;
    Ok(Json(()))
}
