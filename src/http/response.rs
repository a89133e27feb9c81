//! Response shaping helpers.
//!
//! # Responsibilities
//! - Structured JSON error bodies (every error path carries an `error` field)
//! - Merge routing metadata into JSON bodies from backends
//! - Relay raw upstream responses with hop-by-hop headers stripped

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

/// Routing metadata merged into JSON responses.
#[derive(Debug, Clone, Serialize)]
pub struct BalancerInfo {
    pub handled_by: String,
    pub backend_port: u16,
    pub load_balancer_port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt: Option<u32>,
}

/// Hop-by-hop headers never relayed to the client.
const HOP_BY_HOP_RESPONSE_HEADERS: [HeaderName; 6] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// JSON error body with the given status.
pub fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// The 503 every handler returns when the selector comes up empty.
pub fn no_healthy_backends() -> Response {
    error_response(
        StatusCode::SERVICE_UNAVAILABLE,
        "No healthy backend servers available",
    )
}

/// Merge `load_balancer_info` into a JSON object body. Non-JSON (or
/// non-object) bodies are relayed untouched with their original headers.
pub fn annotate_json(
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    info: &BalancerInfo,
) -> Response {
    match serde_json::from_slice::<Value>(&body) {
        Ok(Value::Object(mut map)) => {
            map.insert(
                "load_balancer_info".to_string(),
                serde_json::to_value(info).unwrap_or(Value::Null),
            );
            (status, Json(Value::Object(map))).into_response()
        }
        _ => relay_bytes(status, headers, body),
    }
}

/// Relay a buffered upstream body as-is.
pub fn relay_bytes(status: StatusCode, headers: HeaderMap, body: Bytes) -> Response {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    strip_response_headers(response.headers_mut());
    response
}

/// Relay a streamed upstream response as-is (status, headers, body).
pub fn relay_streaming(upstream: axum::http::Response<hyper::body::Incoming>) -> Response {
    let (mut parts, body) = upstream.into_parts();
    strip_response_headers(&mut parts.headers);
    Response::from_parts(parts, Body::new(body))
}

fn strip_response_headers(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP_RESPONSE_HEADERS.iter() {
        headers.remove(name);
    }
}
