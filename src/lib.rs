//! Shared RPC client library for service-to-service communication.
//!
//! This crate provides centralized implementations for:
//! - Outbound call dispatch with per-call authentication and timeouts
//! - Signed, time-bound identity tokens (mint/verify)
//! - Request correlation id propagation
//! - Endpoint sanitization for low-cardinality metric labels
//! - Prometheus counters and latency histograms for every outbound call
//! - Tracing subscriber bootstrap for services embedding the client

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod context;
pub mod error;
pub mod metrics;
pub mod rpc;
pub mod sanitize;
pub mod telemetry;
pub mod token;

pub use config::{HttpConfig, RpcConfig};
pub use context::{CorrelationId, RequestContext, REQUEST_ID_HEADER};
pub use error::{AuthError, ContextError, RpcError, TokenError};
pub use metrics::RpcMetrics;
pub use rpc::{Body, Payload, ResponseMetadata, RpcClient, RpcRequest, RpcResponse};
pub use sanitize::sanitize_endpoint;
pub use telemetry::{init_telemetry, TelemetryConfig};
pub use token::Claims;
