//! Endpoint sanitization for low-cardinality metric labels.
//!
//! Raw URLs carry query strings and path-embedded identifiers that would
//! explode metric label cardinality. Sanitization collapses them so two
//! URLs differing only by an id produce the same label.

use once_cell::sync::Lazy;
use regex::Regex;

static UUID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}")
        .expect("invalid uuid pattern")
});

/// Normalize a URL into a metric label.
///
/// Applied in order: strip everything from the first `?`, replace UUID
/// substrings with `<id>`, replace all-digit path segments with `<id>`.
/// Deterministic and idempotent.
#[must_use]
pub fn sanitize_endpoint(url: &str) -> String {
    let without_query = url.split('?').next().unwrap_or(url);
    let without_uuid = UUID_RE.replace_all(without_query, "<id>");
    without_uuid
        .split('/')
        .map(|segment| {
            if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
                "<id>"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Extract the path portion of a sanitized endpoint, for matching against
/// the metrics exclusion set.
#[must_use]
pub fn endpoint_path(endpoint: &str) -> &str {
    match endpoint.split_once("://") {
        Some((_, rest)) => rest.find('/').map_or("/", |i| &rest[i..]),
        None => endpoint,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_query_string() {
        assert_eq!(
            sanitize_endpoint("https://svc/items?x=1&y=2"),
            "https://svc/items"
        );
        assert_eq!(
            sanitize_endpoint("https://svc/items?x=1"),
            sanitize_endpoint("https://svc/items")
        );
    }

    #[test]
    fn test_collapses_uuid_segments() {
        assert_eq!(
            sanitize_endpoint("https://svc/items/3fa85f64-5717-4562-b3fc-2c963f66afa6"),
            "https://svc/items/<id>"
        );
        // Case-insensitive.
        assert_eq!(
            sanitize_endpoint("https://svc/items/3FA85F64-5717-4562-B3FC-2C963F66AFA6"),
            "https://svc/items/<id>"
        );
    }

    #[test]
    fn test_collapses_numeric_segments() {
        assert_eq!(sanitize_endpoint("https://svc/items/123"), "https://svc/items/<id>");
        assert_eq!(
            sanitize_endpoint("https://svc/users/42/items/7"),
            "https://svc/users/<id>/items/<id>"
        );
    }

    #[test]
    fn test_numeric_and_uuid_collapse_to_same_label() {
        let by_uuid = sanitize_endpoint("https://svc/items/3fa85f64-5717-4562-b3fc-2c963f66afa6");
        let by_int = sanitize_endpoint("https://svc/items/123");
        assert_eq!(by_uuid, by_int);
    }

    #[test]
    fn test_mixed_segments_untouched() {
        // Segments that merely contain digits are not identifiers.
        assert_eq!(sanitize_endpoint("https://svc/v2/items"), "https://svc/v2/items");
        assert_eq!(
            sanitize_endpoint("https://svc/items/abc123"),
            "https://svc/items/abc123"
        );
    }

    #[test]
    fn test_idempotent() {
        let urls = [
            "https://svc/items/123?x=1",
            "https://svc/items/3fa85f64-5717-4562-b3fc-2c963f66afa6",
            "https://svc/items",
            "/items/9",
        ];
        for url in urls {
            let once = sanitize_endpoint(url);
            assert_eq!(sanitize_endpoint(&once), once);
        }
    }

    #[test]
    fn test_endpoint_path() {
        assert_eq!(endpoint_path("https://svc/items/<id>"), "/items/<id>");
        assert_eq!(endpoint_path("https://svc"), "/");
        assert_eq!(endpoint_path("/metrics"), "/metrics");
    }
}
