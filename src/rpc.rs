//! Outbound RPC dispatch.
//!
//! [`RpcClient`] orchestrates one outbound call end to end: resolve the
//! correlation id, assemble headers (bearer token, correlation id,
//! content type), perform the transport call with a per-call timeout,
//! classify the outcome, record metrics, and hand back a typed result.
//!
//! Hooks run in a fixed order because later steps read state set by
//! earlier ones: the latency recorded on completion comes from the timer
//! started before the transport call, which itself carries the headers
//! built from the resolved correlation id. There is no retry logic here;
//! the typed [`RpcError`] classification exists so callers can decide.

use std::sync::Arc;
use std::time::Instant;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;

use crate::config::RpcConfig;
use crate::context::{self, CorrelationId, RequestContext};
use crate::error::RpcError;
use crate::metrics::RpcMetrics;
use crate::sanitize::sanitize_endpoint;
use crate::token;

/// Status used when the transport failed without producing a response.
const FALLBACK_STATUS: u16 = 502;

/// Request body attached to an outbound call.
#[derive(Debug, Clone)]
pub enum Body {
    /// Structured body, serialized as JSON on the wire.
    Json(serde_json::Value),
    /// Plain-text body, sent verbatim.
    Text(String),
}

impl Body {
    fn content_type(&self) -> &'static str {
        match self {
            Self::Json(_) => "application/json; charset=utf-8",
            Self::Text(_) => "text/plain; charset=utf-8",
        }
    }

    fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Json(value) => value.to_string().into_bytes(),
            Self::Text(text) => text.into_bytes(),
        }
    }
}

/// Decoded response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Body parsed as JSON (response content type indicated JSON).
    Json(serde_json::Value),
    /// Body treated as plain text.
    Text(String),
}

/// Metadata accompanying a successful call.
#[derive(Debug, Clone)]
pub struct ResponseMetadata {
    /// HTTP status of the response.
    pub status: u16,
    /// Correlation id used for this call.
    pub correlation_id: CorrelationId,
    /// Wall-clock latency of the transport call in milliseconds.
    pub latency_ms: f64,
    /// Response headers.
    pub headers: HeaderMap,
}

/// A completed outbound call with its decoded body.
#[derive(Debug, Clone)]
pub struct RpcResponse {
    /// Response metadata.
    pub metadata: ResponseMetadata,
    /// Decoded body.
    pub payload: Payload,
}

impl RpcResponse {
    /// The body as JSON, if the response carried JSON.
    #[must_use]
    pub fn json(&self) -> Option<&serde_json::Value> {
        match &self.payload {
            Payload::Json(value) => Some(value),
            Payload::Text(_) => None,
        }
    }

    /// The body as text, if the response carried plain text.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match &self.payload {
            Payload::Text(text) => Some(text),
            Payload::Json(_) => None,
        }
    }
}

/// Authenticated, instrumented RPC client.
///
/// Construct one per process (it pools connections) and share it; the
/// metrics recorder is handed in so the embedding service controls its
/// lifecycle and exposition.
#[derive(Debug, Clone)]
pub struct RpcClient {
    http: reqwest::Client,
    config: Arc<RpcConfig>,
    metrics: Arc<RpcMetrics>,
}

impl RpcClient {
    /// Build a client from config and a shared metrics recorder.
    ///
    /// Build the recorder with [`RpcMetrics::from_config`] so the config's
    /// metric exclusions apply; a recorder is passed in (rather than built
    /// here) so the embedding service controls its lifecycle and can share
    /// it with the exposition endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: RpcConfig, metrics: Arc<RpcMetrics>) -> Result<Self, reqwest::Error> {
        let http = config.http.build_client()?;
        Ok(Self {
            http,
            config: Arc::new(config),
            metrics,
        })
    }

    /// The metrics recorder backing this client.
    #[must_use]
    pub fn metrics(&self) -> &Arc<RpcMetrics> {
        &self.metrics
    }

    /// Start building a GET call.
    pub fn get(&self, url: impl Into<String>) -> RpcRequest<'_> {
        RpcRequest::new(self, Method::GET, url)
    }

    /// Start building a PUT call.
    pub fn put(&self, url: impl Into<String>) -> RpcRequest<'_> {
        RpcRequest::new(self, Method::PUT, url)
    }

    /// Start building a POST call.
    pub fn post(&self, url: impl Into<String>) -> RpcRequest<'_> {
        RpcRequest::new(self, Method::POST, url)
    }

    /// Start building a PATCH call.
    pub fn patch(&self, url: impl Into<String>) -> RpcRequest<'_> {
        RpcRequest::new(self, Method::PATCH, url)
    }

    /// Start building a DELETE call.
    pub fn delete(&self, url: impl Into<String>) -> RpcRequest<'_> {
        RpcRequest::new(self, Method::DELETE, url)
    }

    /// Record the metric sample and completion log line for one call.
    /// Returns the measured latency in milliseconds.
    fn record(
        &self,
        method: &Method,
        url: &str,
        correlation_id: &CorrelationId,
        status: u16,
        started: Instant,
    ) -> f64 {
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
        let endpoint = sanitize_endpoint(url);
        self.metrics.record_call(
            method.as_str().to_ascii_lowercase().as_str(),
            &endpoint,
            status,
            latency_ms,
        );
        if status < 400 {
            tracing::info!(
                method = %method,
                url,
                status,
                latency_ms,
                correlation_id = %correlation_id,
                "RPC done"
            );
        } else {
            tracing::warn!(
                method = %method,
                url,
                status,
                latency_ms,
                correlation_id = %correlation_id,
                "RPC done"
            );
        }
        latency_ms
    }
}

/// Builder for one outbound call. Immutable once dispatched; owned solely
/// by the [`send`](Self::send) operation that consumes it.
#[derive(Debug)]
pub struct RpcRequest<'a> {
    client: &'a RpcClient,
    method: Method,
    url: String,
    subject: Option<String>,
    role: Option<String>,
    headers: Vec<(String, String)>,
    timeout: Option<std::time::Duration>,
    body: Option<Body>,
}

impl<'a> RpcRequest<'a> {
    fn new(client: &'a RpcClient, method: Method, url: impl Into<String>) -> Self {
        Self {
            client,
            method,
            url: url.into(),
            subject: None,
            role: None,
            headers: Vec::new(),
            timeout: None,
            body: None,
        }
    }

    /// Mint a bearer token for this subject and attach it.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Override the configured default role for the minted token.
    #[must_use]
    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Attach an extra header. Caller-supplied headers always win over
    /// inferred ones.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Override the configured default timeout for this call.
    #[must_use]
    pub const fn timeout(mut self, timeout: std::time::Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Attach a structured JSON body.
    #[must_use]
    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(Body::Json(body));
        self
    }

    /// Attach a plain-text body.
    #[must_use]
    pub fn text(mut self, body: impl Into<String>) -> Self {
        self.body = Some(Body::Text(body.into()));
        self
    }

    /// Dispatch the call.
    ///
    /// Resolves the correlation id from `ctx` (generating one when no
    /// context exists), performs the transport call, records the metric
    /// sample, and logs initiation and completion lines.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError`] when the transport fails or the response
    /// status is 400 or above. `status` carries the real HTTP status when
    /// one is known, otherwise 502.
    pub async fn send(self, ctx: Option<&RequestContext>) -> Result<RpcResponse, RpcError> {
        let client = self.client;
        let correlation_id = context::current(ctx);
        let headers = self.build_header_map(&correlation_id)?;

        tracing::info!(
            method = %self.method,
            url = %self.url,
            subject = ?self.subject,
            correlation_id = %correlation_id,
            "RPC initiated"
        );

        let timeout = self.timeout.unwrap_or(client.config.default_timeout);
        let mut request = client
            .http
            .request(self.method.clone(), &self.url)
            .headers(headers)
            .timeout(timeout);
        if let Some(body) = self.body.filter(|_| sends_body(&self.method)) {
            request = request.body(body.into_bytes());
        }

        let started = Instant::now();
        match request.send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                if status >= 400 {
                    let latency_ms =
                        client.record(&self.method, &self.url, &correlation_id, status, started);
                    let error_body = response.text().await.unwrap_or_default();
                    tracing::warn!(
                        status,
                        latency_ms,
                        correlation_id = %correlation_id,
                        error_response = %error_body,
                        "RPC failed"
                    );
                    return Err(RpcError::new(
                        &self.url,
                        format!("downstream returned {status}: {error_body}"),
                        status,
                    ));
                }
                let latency_ms =
                    client.record(&self.method, &self.url, &correlation_id, status, started);
                let headers = response.headers().clone();
                let payload = decode_payload(response, &self.url).await?;
                Ok(RpcResponse {
                    metadata: ResponseMetadata {
                        status,
                        correlation_id,
                        latency_ms,
                        headers,
                    },
                    payload,
                })
            }
            Err(e) => {
                let status = e.status().map_or(FALLBACK_STATUS, |s| s.as_u16());
                client.record(&self.method, &self.url, &correlation_id, status, started);
                tracing::warn!(
                    status,
                    correlation_id = %correlation_id,
                    error = %e,
                    "RPC failed"
                );
                Err(RpcError::new(&self.url, e.to_string(), status))
            }
        }
    }

    fn build_header_map(&self, correlation_id: &CorrelationId) -> Result<HeaderMap, RpcError> {
        let mut map = HeaderMap::new();
        for (name, value) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| self.invalid_header(name, &e.to_string()))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| self.invalid_header(name.as_str(), &e.to_string()))?;
            map.insert(name, value);
        }

        map.insert(
            HeaderName::from_static("x-request-id"),
            HeaderValue::from_str(correlation_id.as_str())
                .map_err(|e| self.invalid_header("x-request-id", &e.to_string()))?,
        );

        if let Some(subject) = &self.subject {
            let role = self
                .role
                .as_deref()
                .unwrap_or(&self.client.config.default_role);
            let token = token::mint_with_defaults(subject, role, &self.client.config.secret)
                .map_err(|e| {
                    RpcError::new(&self.url, format!("token minting failed: {e}"), 500)
                })?;
            map.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {token}"))
                    .map_err(|e| self.invalid_header("authorization", &e.to_string()))?,
            );
        }

        if let Some(body) = &self.body {
            if !has_content_type(&self.headers) {
                map.insert(CONTENT_TYPE, HeaderValue::from_static(body.content_type()));
            }
        }

        Ok(map)
    }

    fn invalid_header(&self, name: &str, detail: &str) -> RpcError {
        RpcError::new(&self.url, format!("invalid header {name}: {detail}"), 400)
    }
}

/// GET and DELETE calls never transmit a body, even when one was attached.
fn sends_body(method: &Method) -> bool {
    *method != Method::GET && *method != Method::DELETE
}

/// Case-insensitive check for a caller-supplied content type.
fn has_content_type(headers: &[(String, String)]) -> bool {
    headers
        .iter()
        .any(|(name, _)| name.eq_ignore_ascii_case("content-type"))
}

async fn decode_payload(response: reqwest::Response, url: &str) -> Result<Payload, RpcError> {
    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("application/json"));
    if is_json {
        let value = response.json::<serde_json::Value>().await.map_err(|e| {
            RpcError::new(url, format!("failed to decode JSON response: {e}"), FALLBACK_STATUS)
        })?;
        Ok(Payload::Json(value))
    } else {
        let text = response.text().await.map_err(|e| {
            RpcError::new(url, format!("failed to read response body: {e}"), FALLBACK_STATUS)
        })?;
        Ok(Payload::Text(text))
    }
}
