/*!
 * Transport layer: HTTP delivery and cancellation.
 *
 * Everything related to *how* a report reaches the collector:
 * - `http`: ureq-based session: POST, JSON POST, GET, streaming GET
 * - `cancel`: cancellation tokens and the in-flight request slot
 * - `socket`: TCP connector whose sockets an abort can shut down
 * - `outcome`: what a send produced: reply, transport failure, abort
 */

pub mod cancel;
pub mod http;
pub mod outcome;
mod socket;

pub use cancel::CancelToken;
pub use http::{ReportStream, ReportTransport};
pub use outcome::{FailureKind, Reply, SendOutcome, TransportFailure};
