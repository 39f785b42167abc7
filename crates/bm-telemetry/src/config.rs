//! Telemetry configuration from environment variables.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `OTEL_SERVICE_NAME` | `blockmania` |
//! | `BM_NODE_LABEL` | unset |
//! | `OTEL_EXPORTER_OTLP_ENDPOINT` | `http://localhost:4317` |
//! | `BM_LOG_LEVEL`, then `RUST_LOG` | `info` |
//! | `BM_CONSOLE_OUTPUT` | `true` |
//! | `BM_JSON_LOGS` | `true` inside a container, else `false` |
//! | `BM_METRICS_PORT` | `9100` |
//! | `BM_NETWORK` | `devnet` |

const DEFAULT_SERVICE: &str = "blockmania";
const DEFAULT_OTLP: &str = "http://localhost:4317";
const DEFAULT_METRICS_PORT: u16 = 9100;

/// Configuration for logging, span export, and metrics.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub service_name: String,

    /// Distinguishes nodes of one cluster in a shared tracing backend.
    pub node_label: Option<String>,

    /// Only used with the `otlp` feature.
    pub otlp_endpoint: String,

    /// `EnvFilter` directives, e.g. `info` or `bm_05_gossip=debug,info`.
    pub log_level: String,

    pub console_output: bool,
    pub json_logs: bool,

    /// Port the embedding process serves [`crate::encode_metrics`] on.
    pub metrics_port: u16,

    /// Cluster name (devnet, testnet, ...)
    pub network: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: DEFAULT_SERVICE.to_string(),
            node_label: None,
            otlp_endpoint: DEFAULT_OTLP.to_string(),
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
            metrics_port: DEFAULT_METRICS_PORT,
            network: "devnet".to_string(),
        }
    }
}

fn flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl TelemetryConfig {
    /// Load from the process environment. Malformed values fall back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let in_container =
            lookup("KUBERNETES_SERVICE_HOST").is_some() || lookup("DOCKER_CONTAINER").is_some();

        Self {
            service_name: lookup("OTEL_SERVICE_NAME").unwrap_or(defaults.service_name),
            node_label: lookup("BM_NODE_LABEL").filter(|label| !label.is_empty()),
            otlp_endpoint: lookup("OTEL_EXPORTER_OTLP_ENDPOINT").unwrap_or(defaults.otlp_endpoint),
            log_level: lookup("BM_LOG_LEVEL")
                .or_else(|| lookup("RUST_LOG"))
                .unwrap_or(defaults.log_level),
            console_output: lookup("BM_CONSOLE_OUTPUT")
                .and_then(|v| flag(&v))
                .unwrap_or(defaults.console_output),
            json_logs: lookup("BM_JSON_LOGS")
                .and_then(|v| flag(&v))
                .unwrap_or(in_container),
            metrics_port: lookup("BM_METRICS_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.metrics_port),
            network: lookup("BM_NETWORK").unwrap_or(defaults.network),
        }
    }

    /// Service name qualified by the node label, if any.
    pub fn instance_name(&self) -> String {
        match &self.node_label {
            Some(label) => format!("{}-{}", self.service_name, label),
            None => self.service_name.clone(),
        }
    }
}
