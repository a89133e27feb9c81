//! One handler per public endpoint.
//!
//! Two dispatch patterns:
//! - single-shot: ask the selector once, forward, relay (optionally merging
//!   routing metadata into JSON bodies)
//! - broadcast-until-found: batch status is pinned to whichever node accepted
//!   the batch, and no batch-to-node index is kept, so every healthy node is
//!   asked in registry order until one answers without an `error` field

use std::time::{Instant, SystemTime, UNIX_EPOCH};

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

use crate::forwarder::ForwardRequest;
use crate::http::response;
use crate::http::server::AppState;
use crate::observability::metrics;

/// Upper bound when buffering an upstream body for JSON annotation.
const MAX_BUFFERED_BODY: usize = 4 * 1024 * 1024;

/// `POST /predict` — stream the multipart image upload to a selected backend
/// and merge routing metadata into its JSON answer.
pub async fn predict(State(state): State<AppState>, request: Request<Body>) -> Response {
    forward_annotated(
        &state,
        request,
        "/predict",
        StatusCode::SERVICE_UNAVAILABLE,
        "Prediction service unavailable",
        Some(1),
    )
    .await
}

/// CORS preflight for `/predict`, answered locally.
pub async fn predict_preflight() -> StatusCode {
    StatusCode::OK
}

/// `GET /history` — forward query parameters, annotate the JSON response.
pub async fn history(State(state): State<AppState>, request: Request<Body>) -> Response {
    forward_annotated(
        &state,
        request,
        "/history",
        StatusCode::INTERNAL_SERVER_ERROR,
        "Failed to fetch history",
        None,
    )
    .await
}

/// `GET /api/predictions/search` — forward query parameters, annotate.
pub async fn search_predictions(State(state): State<AppState>, request: Request<Body>) -> Response {
    forward_annotated(
        &state,
        request,
        "/api/predictions/search",
        StatusCode::INTERNAL_SERVER_ERROR,
        "Search failed",
        None,
    )
    .await
}

/// `GET /dashboard` — relay the raw upstream body, headers, and status.
pub async fn dashboard(State(state): State<AppState>, request: Request<Body>) -> Response {
    forward_raw(&state, request, "/dashboard".to_string(), "Dashboard service unavailable").await
}

/// `POST /batch/upload` — stream the multipart file set through unchanged.
pub async fn batch_upload(State(state): State<AppState>, request: Request<Body>) -> Response {
    forward_raw(
        &state,
        request,
        "/batch/upload".to_string(),
        "Batch upload service unavailable",
    )
    .await
}

/// `GET /batch/history` — forward the query string verbatim, relay raw.
pub async fn batch_history(State(state): State<AppState>, request: Request<Body>) -> Response {
    forward_raw(
        &state,
        request,
        "/batch/history".to_string(),
        "Batch history service unavailable",
    )
    .await
}

/// `GET /uploads/{filename}` — relay stored files from a selected backend.
pub async fn uploads(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    request: Request<Body>,
) -> Response {
    forward_raw(
        &state,
        request,
        format!("/uploads/{}", filename),
        "File service unavailable",
    )
    .await
}

/// `GET /batch/status/{batch_id}` — broadcast-until-found.
///
/// Batch jobs live on whichever node accepted the upload, so each healthy
/// node is queried in registry order; the first 200 whose JSON carries no
/// `error` key wins.
pub async fn batch_status(
    State(state): State<AppState>,
    Path(batch_id): Path<String>,
    request: Request<Body>,
) -> Response {
    tracing::info!(batch_id = %batch_id, "Checking batch status across backends");

    let healthy = state.registry.healthy_nodes();
    let checked: Vec<&str> = healthy.iter().map(|n| n.name.as_str()).collect();
    let path = format!("/batch/status/{}", batch_id);

    for node in &healthy {
        let forward = ForwardRequest::new(
            axum::http::Method::GET,
            path.clone(),
            request.headers().clone(),
            Body::empty(),
        );

        let upstream = match state.forwarder.forward(&state.registry, node, forward).await {
            Ok(upstream) => upstream,
            Err(e) => {
                tracing::warn!(batch_id = %batch_id, backend = %node.name, error = %e, "Error checking batch on backend");
                continue;
            }
        };

        if upstream.status() != StatusCode::OK {
            continue;
        }

        let (_, body) = upstream.into_parts();
        let bytes = match axum::body::to_bytes(Body::new(body), MAX_BUFFERED_BODY).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(batch_id = %batch_id, backend = %node.name, error = %e, "Failed reading batch status body");
                continue;
            }
        };

        if let Ok(Value::Object(mut map)) = serde_json::from_slice::<Value>(&bytes) {
            if !map.contains_key("error") {
                tracing::info!(batch_id = %batch_id, backend = %node.name, "Found batch");
                map.insert("found_on".to_string(), json!(node.name));
                map.insert(
                    "load_balancer_info".to_string(),
                    json!({
                        "checked_servers": checked,
                        "found_on": node.name,
                        "load_balancer_port": state.listen_port,
                    }),
                );
                return (StatusCode::OK, Json(Value::Object(map))).into_response();
            }
        }
    }

    tracing::warn!(batch_id = %batch_id, "Batch not found on any backend");
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Batch not found",
            "batch_id": batch_id,
            "checked_servers": checked,
            "load_balancer_info": {
                "message": "Checked all healthy backend servers",
                "load_balancer_port": state.listen_port,
            },
        })),
    )
        .into_response()
}

/// `GET /health` — answered locally from registry state, never forwarded.
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let nodes = state.registry.nodes();
    let healthy = state.registry.healthy_count();

    Json(json!({
        "status": if healthy > 0 { "healthy" } else { "unhealthy" },
        "load_balancer": "running",
        "port": state.listen_port,
        "total_servers": nodes.len(),
        "healthy_servers": healthy,
        "servers": nodes
            .iter()
            .map(|n| json!({
                "name": n.name,
                "url": n.base_url.as_str(),
                "healthy": n.is_healthy(),
            }))
            .collect::<Vec<_>>(),
        "timestamp": unix_timestamp(),
    }))
}

/// `GET /stats` — answered locally.
pub async fn stats(State(state): State<AppState>) -> Json<Value> {
    let mut server_stats = serde_json::Map::new();
    for node in state.registry.nodes() {
        server_stats.insert(
            node.base_url.as_str().to_string(),
            json!({
                "requests": node.stats.requests_forwarded.load(std::sync::atomic::Ordering::Relaxed),
                "errors": node.stats.errors.load(std::sync::atomic::Ordering::Relaxed),
            }),
        );
    }

    Json(json!({
        "total_requests_forwarded": state.registry.total_forwarded(),
        "healthy_servers": state.registry.healthy_count(),
        "total_servers": state.registry.len(),
        "server_stats": server_stats,
        "selector_cursor": state.selector.cursor(),
        "algorithm": "round-robin",
        "uptime_secs": state.started_at.elapsed().as_secs_f64(),
        "timestamp": unix_timestamp(),
    }))
}

/// Fallback for unmatched paths.
pub async fn not_found() -> Response {
    response::error_response(StatusCode::NOT_FOUND, "Endpoint not found")
}

/// Single-shot flow with JSON annotation: select once, forward, buffer the
/// body, merge `load_balancer_info` when the body is a JSON object.
async fn forward_annotated(
    state: &AppState,
    request: Request<Body>,
    upstream_path: &str,
    failure_status: StatusCode,
    failure_message: &str,
    attempt: Option<u32>,
) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();

    let Some(node) = state.selector.next(&state.registry) else {
        metrics::record_request(&method, StatusCode::SERVICE_UNAVAILABLE.as_u16(), "none", start);
        return response::no_healthy_backends();
    };

    tracing::info!(backend = %node.name, url = %node.base_url, path = %upstream_path, "Routing request");

    let path_and_query = with_query(upstream_path, request.uri().query());
    let (parts, body) = request.into_parts();
    let forward = ForwardRequest::new(parts.method, path_and_query, parts.headers, body);

    match state.forwarder.forward(&state.registry, &node, forward).await {
        Ok(upstream) => {
            let status = upstream.status();
            let (upstream_parts, body) = upstream.into_parts();
            match axum::body::to_bytes(Body::new(body), MAX_BUFFERED_BODY).await {
                Ok(bytes) => {
                    metrics::record_request(&method, status.as_u16(), &node.name, start);
                    let info = state.balancer_info(&node, attempt);
                    response::annotate_json(status, upstream_parts.headers, bytes, &info)
                }
                Err(e) => {
                    tracing::error!(backend = %node.name, error = %e, "Failed reading upstream body");
                    metrics::record_request(&method, StatusCode::BAD_GATEWAY.as_u16(), &node.name, start);
                    response::error_response(StatusCode::BAD_GATEWAY, failure_message)
                }
            }
        }
        Err(e) => {
            tracing::error!(backend = %node.name, error = %e, "Forwarding failed");
            metrics::record_request(&method, failure_status.as_u16(), &node.name, start);
            response::error_response(failure_status, failure_message)
        }
    }
}

/// Single-shot flow with raw relay: select once, forward, stream the
/// upstream response straight back.
async fn forward_raw(
    state: &AppState,
    request: Request<Body>,
    upstream_path: String,
    failure_message: &str,
) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();

    let Some(node) = state.selector.next(&state.registry) else {
        metrics::record_request(&method, StatusCode::SERVICE_UNAVAILABLE.as_u16(), "none", start);
        return response::no_healthy_backends();
    };

    tracing::info!(backend = %node.name, url = %node.base_url, path = %upstream_path, "Routing request");

    let path_and_query = with_query(&upstream_path, request.uri().query());
    let (parts, body) = request.into_parts();
    let forward = ForwardRequest::new(parts.method, path_and_query, parts.headers, body);

    match state.forwarder.forward(&state.registry, &node, forward).await {
        Ok(upstream) => {
            metrics::record_request(&method, upstream.status().as_u16(), &node.name, start);
            response::relay_streaming(upstream)
        }
        Err(e) => {
            tracing::error!(backend = %node.name, error = %e, "Forwarding failed");
            metrics::record_request(&method, StatusCode::SERVICE_UNAVAILABLE.as_u16(), &node.name, start);
            response::error_response(StatusCode::SERVICE_UNAVAILABLE, failure_message)
        }
    }
}

fn with_query(path: &str, query: Option<&str>) -> String {
    match query {
        Some(q) if !q.is_empty() => format!("{}?{}", path, q),
        _ => path.to_string(),
    }
}

fn unix_timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_carried_verbatim() {
        assert_eq!(with_query("/history", Some("page=2&limit=10")), "/history?page=2&limit=10");
        assert_eq!(with_query("/history", Some("")), "/history");
        assert_eq!(with_query("/history", None), "/history");
    }
}
