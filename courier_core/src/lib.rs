/*!
 * Courier Core: bounded report retention and cancellable HTTP delivery.
 *
 * Two independent pieces, composed by the caller:
 *
 * - `BoundedQueue<T>` keeps the last N reports (or log lines) in arrival
 *   order and evicts the oldest on overflow.
 * - `ReportTransport` performs one blocking HTTP request per call, applies
 *   the configured timeouts, cookie jar and trust policy, and can be
 *   aborted from another thread.
 *
 * End users normally depend on the `courier` facade crate, which re-exports
 * everything here and adds `Outbox`.
 *
 * # Module structure
 *
 * - `queue`: the bounded container
 * - `transport/`: how we deliver: HTTP session, cancellation, outcomes
 * - `protocol/`: what goes on the wire: fixed headers, URL checks
 * - `config`: settings, timeouts, trust policy, credentials
 * - `error`: caller-facing error type
 */

mod config;
mod error;
mod protocol;
mod queue;
mod transport;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use config::{
    Credentials, Settings, TransportConfig, TrustPolicy, DEFAULT_MAX_PENDING_REPORTS,
};
pub use error::{Error, Result};
pub use protocol::constants::{
    ACCEPT, DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_SOCKET_TIMEOUT_MS, DEFAULT_USER_AGENT,
    FORM_CONTENT_TYPE, JSON_CONTENT_TYPE,
};
pub use protocol::headers::parse_target;
pub use queue::BoundedQueue;
pub use transport::{
    CancelToken, FailureKind, Reply, ReportStream, ReportTransport, SendOutcome,
    TransportFailure,
};
