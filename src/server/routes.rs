//! Axum router and shared application state

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use super::handlers;
use crate::config::ServiceConfig;
use crate::output::schema::ReverseResponse;
use crate::pipeline::ReverseEngineeringService;
use crate::services::{MetricsRegistry, RateLimiter, TtlCache, UsageMeter};

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";
pub const USER_ID_HEADER: &str = "x-user-id";
pub const API_KEY_HEADER: &str = "x-api-key";
pub const ANONYMOUS: &str = "anonymous";
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Application state shared across handlers
pub struct AppState {
    pub config: ServiceConfig,
    pub service: Arc<ReverseEngineeringService>,
    pub cache: TtlCache<ReverseResponse>,
    pub rate_limiter: RateLimiter,
    pub usage: UsageMeter,
    pub metrics: MetricsRegistry,
}

impl AppState {
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            service: Arc::new(ReverseEngineeringService::from_config(&config)),
            cache: TtlCache::new(config.cache_ttl(), config.cache_max_entries),
            rate_limiter: RateLimiter::new(
                config.max_requests_per_minute,
                config.max_unique_texts_per_minute,
            ),
            usage: UsageMeter::new(
                config.per_user_quota_per_minute,
                config.per_key_quota_per_minute,
                config.billing_unit_chars,
                config.usage_log_max_entries,
            ),
            metrics: MetricsRegistry::new(),
            config,
        }
    }
}

/// Per-request identity resolved by [`request_context`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestMeta {
    pub request_id: String,
    pub client_key: String,
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Rate-limit key for a request: the peer address, else `unknown`
///
/// With `trust_forwarded_for` the first `x-forwarded-for` hop wins. Enable it
/// only behind a proxy that overwrites the header, since clients control it.
pub fn client_key(request: &Request, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for {
        if let Some(first) = header_str(request.headers(), FORWARDED_FOR_HEADER)
            .and_then(|forwarded| forwarded.split(',').map(str::trim).find(|s| !s.is_empty()))
        {
            return first.to_string();
        }
    }
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// Caller identity for usage metering: `(user_id, api_key_id)`
pub fn caller_identity(headers: &HeaderMap) -> (String, String) {
    let user = header_str(headers, USER_ID_HEADER).unwrap_or(ANONYMOUS);
    let key = header_str(headers, API_KEY_HEADER).unwrap_or(ANONYMOUS);
    (user.to_string(), key.to_string())
}

/// Assigns the request id and client key, and echoes the id on the response
pub async fn request_context(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let request_id = header_str(request.headers(), REQUEST_ID_HEADER)
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let client_key = client_key(&request, state.config.trust_forwarded_for);

    request.extensions_mut().insert(RequestMeta {
        request_id: request_id.clone(),
        client_key,
    });

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Create the application router
///
/// # Routes
///
/// - `GET /health` - Liveness and deployment info
/// - `POST /reverse` - Analyze one output text
/// - `POST /reverse/batch` - Analyze several texts, results in input order
/// - `GET /metrics` - Per-endpoint request counts and average latency
pub fn create_router(state: Arc<AppState>) -> Router {
    let timeout = state.config.request_timeout();

    Router::new()
        .route("/health", get(handlers::health))
        .route("/reverse", post(handlers::reverse))
        .route("/reverse/batch", post(handlers::reverse_batch))
        .route("/metrics", get(handlers::metrics))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            timeout,
        ))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            request_context,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
