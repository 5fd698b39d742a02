//! Request correlation context.
//!
//! A correlation id threads one logical request across service boundaries
//! so logs and metrics can be joined after the fact. The inbound boundary
//! constructs a [`RequestContext`] (adopting the inbound `X-Request-ID`
//! header or generating a fresh id) and passes it explicitly down the call
//! chain; there is no ambient thread-local state.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ContextError;

/// Header carrying the correlation id on both inbound and outbound calls.
pub const REQUEST_ID_HEADER: &str = "X-Request-ID";

/// Opaque identifier for one logical request chain.
///
/// Generated ids are lowercase v4 UUIDs; ids adopted from inbound headers
/// are carried unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Generate a fresh correlation id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// View the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CorrelationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for CorrelationId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Per-request context established by the inbound boundary.
#[derive(Debug, Clone)]
pub struct RequestContext {
    correlation_id: CorrelationId,
}

impl RequestContext {
    /// Create a context with a freshly generated correlation id.
    #[must_use]
    pub fn new() -> Self {
        Self {
            correlation_id: CorrelationId::new(),
        }
    }

    /// Create a context from an inbound `X-Request-ID` header value,
    /// generating a fresh id when the header was absent.
    #[must_use]
    pub fn from_inbound(header: Option<&str>) -> Self {
        Self {
            correlation_id: header.map_or_else(CorrelationId::new, CorrelationId::from),
        }
    }

    /// The correlation id for this request chain.
    #[must_use]
    pub fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve the current correlation id, generating one when no context
/// exists. Outbound calls may originate from background code paths that
/// never saw an inbound request, so absence is not an error here.
#[must_use]
pub fn current(ctx: Option<&RequestContext>) -> CorrelationId {
    ctx.map_or_else(CorrelationId::new, |c| c.correlation_id.clone())
}

/// Resolve the current correlation id, failing when no context exists.
///
/// For code paths that require the boundary middleware to have run first.
///
/// # Errors
///
/// Returns [`ContextError::MissingContext`] when `ctx` is `None`.
pub fn require(ctx: Option<&RequestContext>) -> Result<CorrelationId, ContextError> {
    ctx.map(|c| c.correlation_id.clone())
        .ok_or(ContextError::MissingContext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique_and_lowercase() {
        let a = CorrelationId::new();
        let b = CorrelationId::new();
        assert_ne!(a, b);
        assert_eq!(a.as_str(), a.as_str().to_lowercase());
        assert_eq!(a.as_str().len(), 36);
    }

    #[test]
    fn test_from_inbound_adopts_header() {
        let ctx = RequestContext::from_inbound(Some("abc-123"));
        assert_eq!(ctx.correlation_id().as_str(), "abc-123");
    }

    #[test]
    fn test_from_inbound_generates_when_absent() {
        let ctx = RequestContext::from_inbound(None);
        assert_eq!(ctx.correlation_id().as_str().len(), 36);
    }

    #[test]
    fn test_current_prefers_context() {
        let ctx = RequestContext::from_inbound(Some("fixed-id"));
        assert_eq!(current(Some(&ctx)).as_str(), "fixed-id");
    }

    #[test]
    fn test_current_generates_without_context() {
        let id = current(None);
        assert!(!id.as_str().is_empty());
    }

    #[test]
    fn test_require_fails_without_context() {
        assert_eq!(require(None).unwrap_err(), ContextError::MissingContext);
        let ctx = RequestContext::new();
        assert!(require(Some(&ctx)).is_ok());
    }
}
