/*!
 * Courier: deliver diagnostic reports to a remote collector over HTTP.
 *
 * This is the crate applications depend on. It re-exports the engine from
 * `courier_core` and adds `Outbox`, which ties a bounded backlog of
 * pending reports to a delivery session.
 *
 * # Quick start
 *
 * ```ignore
 * fn main() -> courier::Result<()> {
 *     let settings = courier::Settings::load("courier.toml")?;
 *     let mut outbox = courier::Outbox::new(&settings)?;
 *
 *     outbox.enqueue(courier::Report::form("stack=..."));
 *     let summary = outbox.deliver()?;
 *     println!("{} delivered, {} still pending", summary.delivered, outbox.pending().len());
 *     Ok(())
 * }
 * ```
 *
 * # Cancelling from another thread
 *
 * ```ignore
 * let handle = outbox.abort_handle();
 * std::thread::spawn(move || handle.abort());
 * let summary = outbox.deliver()?; // returns promptly, summary.aborted == true
 * ```
 *
 * The crates never install a `tracing` subscriber; that is left to the
 * application.
 */

mod outbox;

// ---------------------------------------------------------------------------
// Re-exports from courier_core
// ---------------------------------------------------------------------------

pub use courier_core::{
    parse_target, BoundedQueue, CancelToken, Credentials, Error, FailureKind, Reply,
    ReportStream, ReportTransport, Result, SendOutcome, Settings, TransportConfig,
    TransportFailure, TrustPolicy, ACCEPT, DEFAULT_CONNECT_TIMEOUT_MS,
    DEFAULT_MAX_PENDING_REPORTS, DEFAULT_SOCKET_TIMEOUT_MS, DEFAULT_USER_AGENT,
    FORM_CONTENT_TYPE, JSON_CONTENT_TYPE,
};

pub use outbox::{AbortHandle, DeliverySummary, Outbox, Report};
