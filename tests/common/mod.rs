//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::extract::Path;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tokio::net::TcpListener;

use calorie_balancer::config::{BackendConfig, BalancerConfig};
use calorie_balancer::http::HttpServer;
use calorie_balancer::lifecycle::Shutdown;

/// A mock calorie-estimator backend with a controllable health flag.
pub struct MockBackend {
    pub addr: SocketAddr,
    pub name: &'static str,
    pub healthy: Arc<AtomicBool>,
}

/// Spawn a mock backend on an ephemeral port.
///
/// `/health` answers 200 while the flag is set, 503 otherwise. Content
/// endpoints embed the backend's name so tests can observe routing.
/// `known_batches` lists batch IDs this node claims to own.
pub async fn spawn_backend(name: &'static str, known_batches: Vec<&'static str>) -> MockBackend {
    let healthy = Arc::new(AtomicBool::new(true));

    let health_flag = healthy.clone();
    let router = Router::new()
        .route(
            "/health",
            get(move || {
                let flag = health_flag.clone();
                async move {
                    if flag.load(Ordering::SeqCst) {
                        (StatusCode::OK, Json(json!({ "status": "healthy" })))
                    } else {
                        (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "status": "down" })))
                    }
                }
            }),
        )
        .route(
            "/predict",
            post(move || async move {
                Json(json!({ "food": "pizza", "calories": 285, "served_by": name }))
            }),
        )
        .route(
            "/history",
            get(move || async move { Json(json!({ "items": [], "served_by": name })) }),
        )
        .route(
            "/api/predictions/search",
            get(move || async move { Json(json!({ "results": [], "served_by": name })) }),
        )
        .route(
            "/dashboard",
            get(move || async move {
                (
                    [(header::CONTENT_TYPE, "text/html")],
                    format!("<html>{}</html>", name),
                )
            }),
        )
        .route(
            "/batch/upload",
            post(move || async move {
                Json(json!({ "batch_id": "batch-123", "received_by": name }))
            }),
        )
        .route(
            "/batch/history",
            get(move || async move { Json(json!({ "batches": [], "served_by": name })) }),
        )
        .route(
            "/batch/status/{batch_id}",
            get(move |Path(batch_id): Path<String>| {
                let known = known_batches.clone();
                async move {
                    if known.iter().any(|id| *id == batch_id) {
                        Json(json!({ "batch_id": batch_id, "status": "completed", "served_by": name }))
                    } else {
                        // 200 with an error body, like a backend that owns
                        // the endpoint but not this batch.
                        Json(json!({ "error": "Batch not found" }))
                    }
                }
            }),
        )
        .route(
            "/uploads/{filename}",
            get(move |Path(filename): Path<String>| async move {
                let body = format!("file {} from {}", filename, name);
                Response::builder()
                    .header(header::CONTENT_TYPE, "application/octet-stream")
                    .body(axum::body::Body::from(body))
                    .unwrap()
                    .into_response()
            }),
        );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });

    MockBackend {
        addr,
        name,
        healthy,
    }
}

/// Spawn a backend whose content endpoints answer 500 with a JSON error body
/// while its health endpoint stays green.
#[allow(dead_code)]
pub async fn spawn_failing_backend(name: &'static str) -> MockBackend {
    let healthy = Arc::new(AtomicBool::new(true));

    let router = Router::new()
        .route(
            "/health",
            get(|| async { (StatusCode::OK, Json(json!({ "status": "healthy" }))) }),
        )
        .fallback(|| async {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "database unavailable" })),
            )
        });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });

    MockBackend {
        addr,
        name,
        healthy,
    }
}

/// Spawn a balancer in front of the given backends on an ephemeral port.
///
/// Returns the address and the shutdown coordinator; tests trigger it when
/// they finish.
pub async fn spawn_balancer(
    backends: &[&MockBackend],
    health_check_enabled: bool,
    health_interval_secs: u64,
) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let mut config = BalancerConfig::default();
    config.listener.bind_address = addr.to_string();
    for backend in backends {
        config.backends.push(BackendConfig {
            name: backend.name.to_string(),
            url: format!("http://{}", backend.addr),
        });
    }
    config.health_check.enabled = health_check_enabled;
    config.health_check.interval_secs = health_interval_secs;
    config.health_check.timeout_secs = 1;
    config.timeouts.request_secs = 5;

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config);
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    // Let the accept loop come up.
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    (addr, shutdown)
}

/// A reqwest client that never reuses pooled connections between tests.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
