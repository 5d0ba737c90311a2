/*!
 * Configuration for report delivery.
 *
 * `Settings` is the flat, serde-friendly view read from a TOML document.
 * It is split into the pieces the engine actually consumes:
 *
 * - `TransportConfig`: timeouts, user agent, credentials
 * - `TrustPolicy`: how TLS certificates are judged
 *
 * The trust policy is not part of `TransportConfig`: `ReportTransport::new`
 * takes it as a separate argument.
 *
 * # Example
 * ```toml
 * form_uri = "https://collector.example.com/reports"
 * connect_timeout_ms = 3000
 * socket_timeout_ms = 5000
 * basic_auth_login = "reporter"
 * basic_auth_password = "hunter2"
 * ```
 */
use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::Result;
use crate::protocol::constants::{
    DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_SOCKET_TIMEOUT_MS, DEFAULT_USER_AGENT,
};

// ---------------------------------------------------------------------------
// TrustPolicy
// ---------------------------------------------------------------------------

/**
 * How server certificates are validated during the TLS handshake.
 */
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TrustPolicy {
    /// Validate the chain against the platform roots. Always the default.
    #[default]
    Verify,

    /// Accept any certificate, including self-signed ones. Only for test
    /// or staging collectors.
    AcceptAnyCertificate,
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Login and password injected as an HTTP Basic `Authorization` header.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// TransportConfig
// ---------------------------------------------------------------------------

/**
 * Everything `ReportTransport` needs besides the trust policy.
 *
 * A zero duration means "no bound", matching the legacy HTTP client
 * convention collectors were tuned against.
 */
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Bound on establishing the TCP (and TLS) connection.
    pub connect_timeout: Duration,

    /// Bound on each blocking read or write once connected.
    pub socket_timeout: Duration,

    /// Sent verbatim as `User-Agent`.
    pub user_agent: String,

    pub credentials: Option<Credentials>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
            socket_timeout: Duration::from_millis(DEFAULT_SOCKET_TIMEOUT_MS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            credentials: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Default retention for pending reports.
pub const DEFAULT_MAX_PENDING_REPORTS: usize = 100;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Collector endpoint reports are POSTed to.
    pub form_uri: Option<String>,

    pub connect_timeout_ms: u64,

    pub socket_timeout_ms: u64,

    /// Opt-in switch for `TrustPolicy::AcceptAnyCertificate`.
    pub disable_ssl_cert_validation: bool,

    pub user_agent: String,

    pub basic_auth_login: Option<String>,

    pub basic_auth_password: Option<String>,

    /// Capacity of the pending-report queue.
    pub max_pending_reports: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            form_uri: None,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            socket_timeout_ms: DEFAULT_SOCKET_TIMEOUT_MS,
            disable_ssl_cert_validation: false,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            basic_auth_login: None,
            basic_auth_password: None,
            max_pending_reports: DEFAULT_MAX_PENDING_REPORTS,
        }
    }
}

impl Settings {
    /// Parses settings from a TOML document. Missing keys take defaults.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Reads and parses a TOML settings file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /**
     * Basic credentials, present only when a login is configured.
     * A missing password is sent as empty.
     */
    pub fn credentials(&self) -> Option<Credentials> {
        self.basic_auth_login.as_ref().map(|login| Credentials {
            login: login.clone(),
            password: self.basic_auth_password.clone().unwrap_or_default(),
        })
    }

    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            socket_timeout: Duration::from_millis(self.socket_timeout_ms),
            user_agent: self.user_agent.clone(),
            credentials: self.credentials(),
        }
    }

    pub fn trust_policy(&self) -> TrustPolicy {
        if self.disable_ssl_cert_validation {
            TrustPolicy::AcceptAnyCertificate
        } else {
            TrustPolicy::Verify
        }
    }
}
