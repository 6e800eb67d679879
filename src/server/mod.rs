//! HTTP front door for the gateway.
//!
//! Thin boundary layer: parse and validate the lookup request, rate-limit
//! inbound clients, call the orchestrator, and map every core failure to a
//! generic JSON body. Nothing from the fetch internals (identities,
//! credentials, attempt details) leaks past this module.

mod rate_limit;

pub use rate_limit::RateLimiter;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::{ConnectInfo, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::gateway::{Gateway, GatewayError, LookupKey};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    gateway: Arc<Gateway>,
    limiter: Arc<RateLimiter>,
    started_at: Instant,
}

impl AppState {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self {
            gateway,
            limiter: Arc::new(RateLimiter::default()),
            started_at: Instant::now(),
        }
    }

    pub fn with_limiter(gateway: Arc<Gateway>, limiter: RateLimiter) -> Self {
        Self {
            gateway,
            limiter: Arc::new(limiter),
            started_at: Instant::now(),
        }
    }
}

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/product", get(product))
        .route("/status", get(status))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct ProductParams {
    #[serde(rename = "storeId")]
    store_id: Option<String>,
    #[serde(rename = "dealId")]
    deal_id: Option<String>,
}

async fn product(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Query(params): Query<ProductParams>,
) -> Response {
    if !state.limiter.check(addr.ip()) {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "error": "Too many requests, please try again later." })),
        )
            .into_response();
    }

    let key = match LookupKey::new(
        params.store_id.unwrap_or_default(),
        params.deal_id.unwrap_or_default(),
    ) {
        Ok(key) => key,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Missing storeId or dealId" })),
            )
                .into_response();
        }
    };

    match state.gateway.lookup(&key).await {
        Ok(payload) => Json(payload).into_response(),
        Err(err) => retrieval_failure(err),
    }
}

/// Generic mapping for core failures; bodies never carry internals.
fn retrieval_failure(err: GatewayError) -> Response {
    let status = match err {
        GatewayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        GatewayError::NoProxiesAvailable => StatusCode::SERVICE_UNAVAILABLE,
        GatewayError::AllAttemptsExhausted { .. } => StatusCode::BAD_GATEWAY,
    };
    let body = if status == StatusCode::BAD_REQUEST {
        json!({ "error": "Missing storeId or dealId" })
    } else {
        json!({ "error": "Failed to retrieve data" })
    };
    (status, Json(body)).into_response()
}

async fn status(State(state): State<AppState>) -> Response {
    Json(json!({
        "status": "OK",
        "uptime_secs": state.started_at.elapsed().as_secs(),
        "cachedProxies": state.gateway.cached_proxy_count(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
    .into_response()
}
