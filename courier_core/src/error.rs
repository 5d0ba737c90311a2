/*!
 * Error types for the courier engine.
 *
 * `Error` covers programmer and configuration mistakes (a bad capacity, a
 * malformed collector URL, a disallowed queue mutation) plus the generic
 * I/O failure of the streaming fetch. These surface to the caller
 * immediately.
 *
 * Network trouble is never an `Error`. Send operations report it as
 * `SendOutcome::Failed`.
 */
use thiserror::Error;

/// Convenience alias used throughout the engine.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A bounded queue was constructed with a capacity below one.
    #[error("queue capacity must be at least 1, got {capacity}")]
    InvalidCapacity { capacity: usize },

    /// The target URL could not be parsed.
    #[error("malformed URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The target URL parsed, but does not name an HTTP(S) resource.
    #[error("not an HTTP connection: {url:?} uses scheme {scheme:?}")]
    UnsupportedScheme { url: String, scheme: String },

    /// A caller-supplied header value (e.g. a content-type override)
    /// cannot be sent on the wire.
    #[error("invalid value for header {name}")]
    InvalidHeader { name: &'static str },

    /// A structured body could not be serialized to JSON.
    #[error("failed to encode JSON body: {0}")]
    Encoding(#[from] serde_json::Error),

    /// A mutation that would break FIFO eviction order was attempted.
    #[error("unsupported operation on bounded queue: {operation}")]
    UnsupportedOperation { operation: &'static str },

    /// The settings document is not valid TOML or has mistyped keys.
    #[error("invalid settings: {0}")]
    Settings(#[from] toml::de::Error),

    /// A required setting is absent.
    #[error("missing setting: {0}")]
    MissingSetting(&'static str),

    /// Generic I/O failure. The streaming fetch reports every connection
    /// fault this way; settings files that cannot be read land here too.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /**
     * Returns `true` for faults caused by how the engine was configured
     * or called, as opposed to I/O trouble or misuse of the queue.
     */
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::InvalidCapacity { .. }
                | Error::InvalidUrl { .. }
                | Error::UnsupportedScheme { .. }
                | Error::InvalidHeader { .. }
                | Error::Settings(_)
                | Error::MissingSetting(_)
        )
    }
}
