//! HTTP request handlers

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::{Extension, Json};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use super::error::ApiError;
use super::routes::{caller_identity, AppState, RequestMeta};
use super::schema::{BatchReverseRequest, BatchReverseResponse, HealthResponse, ReverseRequest};
use crate::output::schema::ReverseResponse;
use crate::services::{EndpointStats, MeteredCall, RateDecision};
use crate::util::content_hash;

const REVERSE_PATH: &str = "/reverse";
const BATCH_PATH: &str = "/reverse/batch";

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        app: state.config.app_name.clone(),
        environment: state.config.app_env.clone(),
    })
}

pub async fn metrics(State(state): State<Arc<AppState>>) -> Json<BTreeMap<String, EndpointStats>> {
    Json(state.metrics.snapshot())
}

/// Rate-limits and meters every validated item of one request
///
/// Either all items are admitted and charged, or none are. Returns the
/// content hash of each item in order.
fn admit(
    state: &AppState,
    meta: &RequestMeta,
    headers: &HeaderMap,
    items: &[ReverseRequest],
) -> Result<Vec<String>, ApiError> {
    let hashes: Vec<String> = items
        .iter()
        .map(|item| content_hash(&item.output_text))
        .collect();
    let hash_refs: Vec<&str> = hashes.iter().map(String::as_str).collect();

    let decision = state.rate_limiter.allow_all(&meta.client_key, &hash_refs);
    if decision != RateDecision::Allowed {
        warn!(
            request_id = %meta.request_id,
            client = %meta.client_key,
            decision = ?decision,
            items = items.len(),
            "Request rejected by rate limiter"
        );
        return Err(ApiError::RateLimited);
    }

    let (user_id, api_key_id) = caller_identity(headers);
    let calls: Vec<MeteredCall<'_>> = items
        .iter()
        .map(|item| MeteredCall {
            chars: item.output_text.chars().count(),
            request_id: &meta.request_id,
        })
        .collect();
    match state
        .usage
        .check_and_record_all(&user_id, &api_key_id, &calls)
    {
        Ok(_units) => Ok(hashes),
        Err(e) => {
            warn!(request_id = %meta.request_id, error = %e, "Request rejected by usage quota");
            Err(ApiError::QuotaExceeded(e))
        }
    }
}

/// Serves one admitted item from the cache or by running the pipeline
///
/// Returns the response and whether it came from the cache.
async fn resolve(
    state: &AppState,
    meta: &RequestMeta,
    request: ReverseRequest,
    hash: String,
    failure: &'static str,
) -> Result<(ReverseResponse, bool), ApiError> {
    if let Some(cached) = state.cache.get(&hash) {
        return Ok((cached.restamped(&meta.request_id), true));
    }

    let deterministic = request
        .deterministic
        .unwrap_or(state.config.deterministic_default);
    let seed = request.seed();
    let service = Arc::clone(&state.service);
    let request_id = meta.request_id.clone();

    let response = tokio::task::spawn_blocking(move || {
        service.reverse(&request.output_text, &request_id, deterministic, seed, false)
    })
    .await
    .map_err(|e| {
        error!(request_id = %meta.request_id, error = %e, "Reverse analysis failed");
        ApiError::Internal(failure)
    })?;

    state.cache.insert(hash, response.clone());
    Ok((response, false))
}

pub async fn reverse(
    State(state): State<Arc<AppState>>,
    Extension(meta): Extension<RequestMeta>,
    headers: HeaderMap,
    payload: Result<Json<ReverseRequest>, JsonRejection>,
) -> Result<Json<ReverseResponse>, ApiError> {
    let started = Instant::now();
    let Json(request) = payload?;
    let request = request.validate(state.config.max_input_chars)?;

    let hash = admit(&state, &meta, &headers, std::slice::from_ref(&request))?
        .pop()
        .ok_or(ApiError::Internal("reverse_engineering_failed"))?;
    let (response, cache_hit) =
        resolve(&state, &meta, request, hash, "reverse_engineering_failed").await?;

    let elapsed = state.metrics.track(REVERSE_PATH, started);
    info!(
        request_id = %meta.request_id,
        path = REVERSE_PATH,
        duration_ms = (elapsed * 100.0).round() / 100.0,
        cache_hit,
        "reverse_processed"
    );
    Ok(Json(response))
}

pub async fn reverse_batch(
    State(state): State<Arc<AppState>>,
    Extension(meta): Extension<RequestMeta>,
    headers: HeaderMap,
    payload: Result<Json<BatchReverseRequest>, JsonRejection>,
) -> Result<Json<BatchReverseResponse>, ApiError> {
    let started = Instant::now();
    let Json(batch) = payload?;
    let batch = batch.validate(state.config.max_batch_items, state.config.max_input_chars)?;

    let hashes = admit(&state, &meta, &headers, &batch.items)?;

    let mut results = Vec::with_capacity(batch.items.len());
    let mut cache_hits = 0usize;
    for (item, hash) in batch.items.into_iter().zip(hashes) {
        let (response, cache_hit) =
            resolve(&state, &meta, item, hash, "batch_reverse_engineering_failed").await?;
        cache_hits += usize::from(cache_hit);
        results.push(response);
    }

    let elapsed = state.metrics.track(BATCH_PATH, started);
    info!(
        request_id = %meta.request_id,
        path = BATCH_PATH,
        duration_ms = (elapsed * 100.0).round() / 100.0,
        items = results.len(),
        cache_hits,
        "reverse_batch_processed"
    );
    Ok(Json(BatchReverseResponse { results }))
}
