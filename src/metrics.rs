//! Prometheus metrics for outbound RPC calls.
//!
//! One [`RpcMetrics`] instance is constructed at process start and handed
//! (behind an `Arc`) to every call site; it owns its own registry rather
//! than registering into a process global. The underlying Prometheus
//! vectors use atomic updates, so `record_call` is safe to invoke from
//! arbitrarily many in-flight calls without external locking.

use std::collections::HashSet;

use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};

use crate::config::RpcConfig;
use crate::sanitize::endpoint_path;

/// Latency buckets in milliseconds, sized for sub-second RPC timeouts.
const LATENCY_BUCKETS_MS: &[f64] = &[
    1.0, 2.5, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0,
];

/// Counter and latency histogram for outbound calls, labeled by
/// `(method, endpoint, status)`.
pub struct RpcMetrics {
    registry: Registry,
    requests_total: IntCounterVec,
    latency_ms: HistogramVec,
    excluded_paths: HashSet<String>,
}

impl std::fmt::Debug for RpcMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcMetrics")
            .field("excluded_paths", &self.excluded_paths)
            .finish_non_exhaustive()
    }
}

impl RpcMetrics {
    /// Create a new metrics recorder with its own registry.
    ///
    /// `excluded_paths` lists endpoint paths (e.g. `/metrics`, `/health`)
    /// whose calls are not recorded at all, to avoid metrics about metrics.
    ///
    /// # Errors
    ///
    /// Returns an error if a metric family cannot be registered.
    pub fn new(
        excluded_paths: impl IntoIterator<Item = String>,
    ) -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new("rpc_client_requests_total", "Total outbound RPC calls"),
            &["method", "endpoint", "status"],
        )?;
        registry.register(Box::new(requests_total.clone()))?;

        let latency_ms = HistogramVec::new(
            HistogramOpts::new(
                "rpc_client_latency_milliseconds",
                "Outbound RPC call latency in milliseconds",
            )
            .buckets(LATENCY_BUCKETS_MS.to_vec()),
            &["method", "endpoint", "status"],
        )?;
        registry.register(Box::new(latency_ms.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            latency_ms,
            excluded_paths: excluded_paths.into_iter().collect(),
        })
    }

    /// Create a recorder whose exclusion set comes from the client config.
    ///
    /// This is the constructor to pair with [`crate::rpc::RpcClient::new`];
    /// it is what makes `RpcConfig::with_metric_exclusions` take effect.
    ///
    /// # Errors
    ///
    /// Returns an error if a metric family cannot be registered.
    pub fn from_config(config: &RpcConfig) -> Result<Self, prometheus::Error> {
        Self::new(config.metric_exclusions.iter().cloned())
    }

    /// Record one completed call.
    ///
    /// `endpoint` must already be sanitized; raw URLs would explode label
    /// cardinality. Calls against excluded paths are dropped silently.
    pub fn record_call(&self, method: &str, endpoint: &str, status: u16, latency_ms: f64) {
        if self.excluded_paths.contains(endpoint_path(endpoint)) {
            return;
        }
        let status = status.to_string();
        let labels = &[method, endpoint, status.as_str()];
        self.requests_total.with_label_values(labels).inc();
        self.latency_ms.with_label_values(labels).observe(latency_ms);
    }

    /// The registry holding both metric families.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Export all recorded metrics in Prometheus text format.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn export(&self) -> Result<String, prometheus::Error> {
        let mut out = String::new();
        TextEncoder::new().encode_utf8(&self.registry.gather(), &mut out)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics() -> RpcMetrics {
        RpcMetrics::new(std::iter::empty()).unwrap()
    }

    #[test]
    fn test_record_call_increments_counter() {
        let m = metrics();
        m.record_call("get", "https://svc/items/<id>", 200, 12.5);
        m.record_call("get", "https://svc/items/<id>", 200, 7.0);

        let count = m
            .requests_total
            .with_label_values(&["get", "https://svc/items/<id>", "200"])
            .get();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_distinct_statuses_are_distinct_series() {
        let m = metrics();
        m.record_call("get", "https://svc/items", 200, 1.0);
        m.record_call("get", "https://svc/items", 502, 1.0);

        let families = m.registry.gather();
        let counter = families
            .iter()
            .find(|f| f.get_name() == "rpc_client_requests_total")
            .unwrap();
        assert_eq!(counter.get_metric().len(), 2);
    }

    #[test]
    fn test_from_config_applies_config_exclusions() {
        let config = RpcConfig::new("secret")
            .with_metric_exclusions(vec!["/health".to_string()]);
        let m = RpcMetrics::from_config(&config).unwrap();
        m.record_call("get", "https://svc/health", 200, 1.0);

        let families = m.registry.gather();
        let counter = families
            .iter()
            .find(|f| f.get_name() == "rpc_client_requests_total")
            .unwrap();
        assert!(counter.get_metric().is_empty());
    }

    #[test]
    fn test_excluded_path_not_recorded() {
        let m = RpcMetrics::new(vec!["/metrics".to_string()]).unwrap();
        m.record_call("get", "https://svc/metrics", 200, 1.0);
        m.record_call("get", "/metrics", 200, 1.0);
        m.record_call("get", "https://svc/items", 200, 1.0);

        let families = m.registry.gather();
        let counter = families
            .iter()
            .find(|f| f.get_name() == "rpc_client_requests_total")
            .unwrap();
        assert_eq!(counter.get_metric().len(), 1);
    }

    #[test]
    fn test_export_contains_both_families() {
        let m = metrics();
        m.record_call("post", "https://svc/items", 201, 3.0);

        let out = m.export().unwrap();
        assert!(out.contains("# TYPE rpc_client_requests_total counter"));
        assert!(out.contains("# TYPE rpc_client_latency_milliseconds histogram"));
        assert!(out.contains("endpoint=\"https://svc/items\""));
    }

    #[test]
    fn test_concurrent_recording() {
        let m = std::sync::Arc::new(metrics());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let m = m.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        m.record_call("get", "https://svc/items", 200, 1.0);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let count = m
            .requests_total
            .with_label_values(&["get", "https://svc/items", "200"])
            .get();
        assert_eq!(count, 800);
    }
}
