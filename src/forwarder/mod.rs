//! Request forwarding to backend nodes.
//!
//! # Data Flow
//! ```text
//! Handler builds ForwardRequest (method, path+query, headers, body stream)
//!     → Forwarder rewrites the URI onto the node's base URL
//!     → hop-by-hop headers stripped, request ID preserved
//!     → bounded-timeout request through the shared hyper client
//!     → HTTP response (any status) relayed back, or ForwardError
//! ```
//!
//! # Design Decisions
//! - Bodies are streamed through, never buffered here; multipart payloads
//!   pass with their original boundary intact
//! - Backend 4xx/5xx are responses, not balancer errors
//! - No retry and no failover at this layer; the router owns that choice
//! - Counter discipline: the process-wide attempt counter bumps once per
//!   attempt, per-node counters split by response-vs-transport-failure

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, Method, Request};
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::time;

use crate::load_balancer::{BackendNode, Registry};
use crate::observability::metrics;

/// Headers meaningful only for a single hop, dropped before forwarding.
const HOP_BY_HOP_HEADERS: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Structured descriptor of a request to forward.
///
/// Form fields and file parts travel inside `body` with the original
/// `content-type` header, so multipart uploads stream straight through.
pub struct ForwardRequest {
    pub method: Method,
    pub path_and_query: String,
    pub headers: HeaderMap,
    pub body: Body,
}

impl ForwardRequest {
    /// Build a descriptor from the parts of an inbound request, overriding
    /// the upstream path (query string carried over verbatim).
    pub fn new(method: Method, path_and_query: impl Into<String>, headers: HeaderMap, body: Body) -> Self {
        Self {
            method,
            path_and_query: path_and_query.into(),
            headers,
            body,
        }
    }
}

/// Transport-level forwarding failure.
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("request to {backend} timed out after {timeout:?}")]
    Timeout { backend: String, timeout: Duration },

    #[error("transport error contacting {backend}: {source}")]
    Transport {
        backend: String,
        #[source]
        source: hyper_util::client::legacy::Error,
    },

    #[error("failed to build upstream request for {backend}: {source}")]
    BadUpstreamRequest {
        backend: String,
        #[source]
        source: axum::http::Error,
    },
}

/// Proxies requests to backend nodes through one shared client.
pub struct Forwarder {
    client: Client<HttpConnector, Body>,
    timeout: Duration,
}

impl Forwarder {
    pub fn new(request_timeout: Duration) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            client,
            timeout: request_timeout,
        }
    }

    /// Forward one request to `node`.
    ///
    /// Any HTTP response, including backend 4xx/5xx, is a success here and
    /// counts toward `requests_forwarded`; connect errors and timeouts count
    /// toward `errors`. Either way the registry's attempt counter moves
    /// exactly once.
    pub async fn forward(
        &self,
        registry: &Registry,
        node: &BackendNode,
        request: ForwardRequest,
    ) -> Result<axum::http::Response<Incoming>, ForwardError> {
        registry.record_attempt();

        let target = format!(
            "{}{}",
            node.base_url.as_str().trim_end_matches('/'),
            request.path_and_query
        );

        tracing::debug!(
            backend = %node.name,
            method = %request.method,
            target = %target,
            "Forwarding request"
        );

        let mut builder = Request::builder().method(request.method).uri(target);
        if let Some(headers) = builder.headers_mut() {
            for (name, value) in request.headers.iter() {
                headers.insert(name.clone(), value.clone());
            }
            strip_hop_by_hop(headers);
            // The client sets its own Host for the rewritten authority.
            headers.remove(header::HOST);
        }

        let upstream = match builder.body(request.body) {
            Ok(req) => req,
            Err(source) => {
                // Never reached the wire, still an attempt that failed.
                tracing::error!(backend = %node.name, error = %source, "Failed to build upstream request");
                node.record_error();
                metrics::record_forward_error(&node.name);
                return Err(ForwardError::BadUpstreamRequest {
                    backend: node.name.clone(),
                    source,
                });
            }
        };

        match time::timeout(self.timeout, self.client.request(upstream)).await {
            Ok(Ok(response)) => {
                node.record_forwarded();
                Ok(response)
            }
            Ok(Err(source)) => {
                tracing::error!(backend = %node.name, error = %source, "Upstream request failed");
                node.record_error();
                metrics::record_forward_error(&node.name);
                Err(ForwardError::Transport {
                    backend: node.name.clone(),
                    source,
                })
            }
            Err(_) => {
                tracing::error!(backend = %node.name, timeout = ?self.timeout, "Upstream request timed out");
                node.record_error();
                metrics::record_forward_error(&node.name);
                Err(ForwardError::Timeout {
                    backend: node.name.clone(),
                    timeout: self.timeout,
                })
            }
        }
    }
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP_HEADERS.iter() {
        headers.remove(name);
    }
}
