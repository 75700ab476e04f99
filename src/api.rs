//! HTTP API
//!
//! - POST /bridge           - convert ERC20 and forward over IBC (service credential)
//! - POST /convert-address  - EVM hex address to destination-chain bech32
//! - POST /ibc-transfer     - IBC transfer signed by the caller's credential
//! - GET  /health           - JSON status
//! - GET  /healthz          - liveness probe
//! - GET  /metrics          - Prometheus metrics
//!
//! Validation failures answer 400 with a short message. Every other failure
//! is logged and answered with a generic 500 body.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use eyre::eyre;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::net::TcpListener;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tracing::{error, info};

use crate::address::AddressConverter;
use crate::composer::TransactionComposer;
use crate::error::BridgeError;
use crate::metrics;
use crate::types::{
    BridgeRequest, BridgeResponse, ConvertAddressRequest, ConvertAddressResponse, ErrorResponse,
    IbcTransferRequest, IbcTransferResponse,
};

/// Static facts reported by `/health`
#[derive(Debug, Clone)]
pub struct HealthInfo {
    pub cosmos_chain_id: String,
    pub evm_chain_id: u64,
    pub started_at: Instant,
}

/// Shared state for the HTTP server
#[derive(Clone)]
pub struct AppState {
    composer: Arc<TransactionComposer>,
    destination: Arc<AddressConverter>,
    health: Arc<HealthInfo>,
}

impl AppState {
    pub fn new(
        composer: Arc<TransactionComposer>,
        destination: AddressConverter,
        health: HealthInfo,
    ) -> Self {
        Self {
            composer,
            destination: Arc::new(destination),
            health: Arc::new(health),
        }
    }
}

/// Per-peer request limiter
#[derive(Debug, Clone, Copy)]
pub struct RateLimit {
    /// Seconds to replenish one unit of quota
    pub per_second: u64,
    pub burst: u32,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub cosmos_chain_id: String,
    pub evm_chain_id: u64,
    pub uptime_seconds: u64,
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn internal() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "Internal Server Error".to_string(),
        }
    }

    /// Validation errors go back to the caller; anything else is logged only
    fn from_domain(endpoint: &'static str, err: BridgeError) -> Self {
        match err {
            BridgeError::Validation(message) => Self::bad_request(message),
            other => {
                error!(endpoint, kind = %other.kind(), error = %other, "Request failed");
                Self::internal()
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

/// An empty body reads as `{}`
fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|_| ApiError::bad_request("Invalid request body"))
}

/// Render a handler result and count it
fn finish<T: Serialize>(endpoint: &'static str, result: Result<T, ApiError>) -> Response {
    let response = match result {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(e) => e.into_response(),
    };
    metrics::HTTP_REQUESTS
        .with_label_values(&[endpoint, response.status().as_str()])
        .inc();
    response
}

// ============================================================================
// Handlers
// ============================================================================

async fn bridge(State(state): State<AppState>, body: Bytes) -> Response {
    const ENDPOINT: &str = "/bridge";

    let result: Result<BridgeResponse, ApiError> = async {
        let request: BridgeRequest = parse_body(&body)?;
        let order = request
            .validate()
            .map_err(|e| ApiError::from_domain(ENDPOINT, e))?;

        let tx = state
            .composer
            .bridge(&order)
            .await
            .map_err(|e| ApiError::from_domain(ENDPOINT, e))?;

        Ok(BridgeResponse {
            transaction_hash: tx.transaction_hash,
        })
    }
    .await;

    finish(ENDPOINT, result)
}

async fn convert_address(State(state): State<AppState>, body: Bytes) -> Response {
    const ENDPOINT: &str = "/convert-address";

    let result = parse_body::<ConvertAddressRequest>(&body).and_then(|request| {
        let source = request
            .validate()
            .map_err(|e| ApiError::from_domain(ENDPOINT, e))?;
        let converted = state
            .destination
            .convert(&source)
            .map_err(|e| ApiError::from_domain(ENDPOINT, e))?;
        Ok(ConvertAddressResponse {
            destination_account_address: converted,
        })
    });

    finish(ENDPOINT, result)
}

async fn ibc_transfer(State(state): State<AppState>, body: Bytes) -> Response {
    const ENDPOINT: &str = "/ibc-transfer";

    let result: Result<IbcTransferResponse, ApiError> = async {
        let request: IbcTransferRequest = parse_body(&body)?;
        let order = request
            .validate()
            .map_err(|e| ApiError::from_domain(ENDPOINT, e))?;

        let tx = state
            .composer
            .ibc_transfer(&order)
            .await
            .map_err(|e| ApiError::from_domain(ENDPOINT, e))?;

        Ok(IbcTransferResponse {
            status: "success".to_string(),
            transaction_hash: tx.transaction_hash,
        })
    }
    .await;

    finish(ENDPOINT, result)
}

/// Health check endpoint handler
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        cosmos_chain_id: state.health.cosmos_chain_id.clone(),
        evm_chain_id: state.health.evm_chain_id,
        uptime_seconds: state.health.started_at.elapsed().as_secs(),
    })
}

/// Liveness probe (always returns OK if server is running)
async fn liveness() -> &'static str {
    "OK"
}

/// Prometheus metrics endpoint
async fn prometheus_metrics() -> Response {
    let (content_type, buffer) = match metrics::encode() {
        Ok(encoded) => encoded,
        Err(_) => {
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to encode metrics").into_response()
        }
    };

    match Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(buffer))
    {
        Ok(resp) => resp,
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to build metrics response",
        )
            .into_response(),
    }
}

// ============================================================================
// Server
// ============================================================================

/// All routes, without the rate limiter
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/bridge", post(bridge))
        .route("/convert-address", post(convert_address))
        .route("/ibc-transfer", post(ibc_transfer))
        .route("/health", get(health_check))
        .route("/healthz", get(liveness))
        .route("/metrics", get(prometheus_metrics))
        .with_state(state)
}

/// Serve the API behind a per-peer-IP limiter until `shutdown` resolves
pub async fn serve<F>(
    listener: TcpListener,
    state: AppState,
    limit: RateLimit,
    shutdown: F,
) -> eyre::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let governor_conf = GovernorConfigBuilder::default()
        .per_second(limit.per_second)
        .burst_size(limit.burst)
        .finish()
        .ok_or_else(|| eyre!("Invalid rate limit configuration"))?;

    // Evict limiter state of peers that went quiet
    let governor_limiter = governor_conf.limiter().clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            governor_limiter.retain_recent();
        }
    });

    let app = router(state).layer(GovernorLayer::new(governor_conf));

    let addr = listener.local_addr()?;
    info!("API server listening on {}", addr);
    info!("  POST /bridge, /convert-address, /ibc-transfer");
    info!("  GET  /health, /healthz, /metrics");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await?;

    Ok(())
}
