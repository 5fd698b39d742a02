//! Tracing subscriber bootstrap for services embedding the RPC client.
//!
//! Call [`init_telemetry`] once at process start; RPC log lines are
//! emitted through `tracing` and formatted by whatever subscriber the
//! process installs.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log output configuration.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name reported in the telemetry startup event.
    pub service_name: String,
    /// Fallback log level filter when `RUST_LOG` is unset.
    pub log_level: String,
    /// Emit JSON-formatted lines instead of human-readable ones.
    pub json_output: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "rpc-client".to_string(),
            log_level: "info".to_string(),
            json_output: false,
        }
    }
}

impl TelemetryConfig {
    /// Set the service name.
    #[must_use]
    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    /// Set the fallback log level.
    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Switch to JSON output.
    #[must_use]
    pub const fn with_json_output(mut self) -> Self {
        self.json_output = true;
        self
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. Should be called
/// once at application startup.
pub fn init_telemetry(config: &TelemetryConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if config.json_output {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!(service = %config.service_name, "telemetry initialized");
}
