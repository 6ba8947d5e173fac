//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for an application.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Name of the environment in which diagnostics are suppressed.
pub const PRODUCTION: &str = "production";

/// Root configuration for an application.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Application-wide behavior (environment, security switches).
    pub app: AppSection,

    /// CSRF token naming.
    pub csrf: CsrfConfig,

    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// View template settings.
    pub views: ViewConfig,
}

impl AppConfig {
    /// Whether the application runs in the production environment.
    pub fn is_production(&self) -> bool {
        self.app.environment == PRODUCTION
    }

    /// Whether the diagnostic footer should be appended to output.
    pub fn toolbar_active(&self) -> bool {
        self.app.toolbar_enabled && !self.is_production()
    }
}

/// Application behavior switches.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppSection {
    /// Public base URL, used when rebuilding secure URLs.
    pub base_url: String,

    /// Environment name ("development", "testing", "production").
    pub environment: String,

    /// Redirect every plain-HTTP request to HTTPS.
    pub force_global_secure_requests: bool,

    /// HSTS max-age sent with secure redirects, in seconds.
    pub hsts_max_age: u64,

    /// Verify CSRF tokens on unsafe methods.
    pub csrf_protection: bool,

    /// Append diagnostic output outside production.
    pub toolbar_enabled: bool,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/".to_string(),
            environment: PRODUCTION.to_string(),
            force_global_secure_requests: false,
            hsts_max_age: 31_536_000,
            csrf_protection: false,
            toolbar_enabled: false,
        }
    }
}

/// CSRF token configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CsrfConfig {
    /// Form field carrying the token.
    pub token_name: String,

    /// Header carrying the token (AJAX clients).
    pub header_name: String,

    /// Cookie holding the expected token.
    pub cookie_name: String,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            token_name: "csrf_token".to_string(),
            header_name: "X-CSRF-TOKEN".to_string(),
            cookie_name: "csrf_cookie".to_string(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Largest request body accepted, in bytes.
    pub max_body_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_body_size: 2 * 1024 * 1024,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// View template configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ViewConfig {
    /// Directory with template overrides. Built-in templates are used when unset.
    pub path: Option<String>,
}
