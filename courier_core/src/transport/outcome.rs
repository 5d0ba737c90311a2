/*!
 * What a send call produced.
 *
 * Send operations never return transport faults as `Err`. They always come
 * back as a `SendOutcome`, and the caller decides whether to retry.
 * `into_text()` collapses the outcome to the minimal "body or nothing"
 * view for callers that do not care why a send failed.
 */
use std::fmt;

use thiserror::Error;

// ---------------------------------------------------------------------------
// SendOutcome
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum SendOutcome {
    /// The collector answered. The status may still be an error status.
    Completed(Reply),

    /// Something below HTTP went wrong: DNS, TCP, TLS, timeout, bad framing.
    Failed(TransportFailure),

    /// The caller cancelled the request before it finished.
    Aborted,
}

impl SendOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, SendOutcome::Completed(_))
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, SendOutcome::Aborted)
    }

    /// `true` only for a completed request with a 2xx status.
    pub fn is_success(&self) -> bool {
        matches!(self, SendOutcome::Completed(reply) if reply.is_success())
    }

    pub fn reply(&self) -> Option<&Reply> {
        match self {
            SendOutcome::Completed(reply) => Some(reply),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&TransportFailure> {
        match self {
            SendOutcome::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    /// Response body, if the request completed and the body was not empty.
    pub fn text(&self) -> Option<&str> {
        self.reply().and_then(Reply::body)
    }

    pub fn into_text(self) -> Option<String> {
        match self {
            SendOutcome::Completed(reply) => reply.body,
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Reply
// ---------------------------------------------------------------------------

/**
 * A response read to the end.
 *
 * `body` is `None` when the collector sent no content; that is "nothing to
 * say", not an error.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub body: Option<String>,
}

impl Reply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }
}

// ---------------------------------------------------------------------------
// TransportFailure
// ---------------------------------------------------------------------------

/// Coarse classification of a transport fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Host name did not resolve.
    Resolve,
    /// TCP connection could not be established.
    Connect,
    /// TLS handshake or certificate problem.
    Tls,
    /// A connect or socket bound elapsed.
    Timeout,
    /// The collector spoke broken HTTP.
    Protocol,
    Io,
    Other,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::Resolve => "resolve",
            FailureKind::Connect => "connect",
            FailureKind::Tls => "tls",
            FailureKind::Timeout => "timeout",
            FailureKind::Protocol => "protocol",
            FailureKind::Io => "io",
            FailureKind::Other => "other",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Error)]
#[error("{kind} failure: {message}")]
pub struct TransportFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl TransportFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /**
     * Classifies a `ureq` error. I/O errors are inspected further, since
     * socket read timeouts, refused connections and failed TLS handshakes
     * all arrive that way.
     */
    pub fn from_ureq(err: ureq::Error) -> Self {
        let kind = match &err {
            ureq::Error::Timeout(_) => FailureKind::Timeout,
            ureq::Error::HostNotFound => FailureKind::Resolve,
            ureq::Error::ConnectionFailed => FailureKind::Connect,
            ureq::Error::Tls(_) | ureq::Error::Rustls(_) => FailureKind::Tls,
            ureq::Error::Protocol(_) => FailureKind::Protocol,
            ureq::Error::Io(io) => classify_io(io),
            _ => FailureKind::Other,
        };
        Self::new(kind, err.to_string())
    }

    pub fn from_io(err: &std::io::Error) -> Self {
        Self::new(classify_io(err), err.to_string())
    }
}

fn classify_io(err: &std::io::Error) -> FailureKind {
    use std::io::ErrorKind;

    match err.kind() {
        ErrorKind::TimedOut | ErrorKind::WouldBlock => FailureKind::Timeout,
        ErrorKind::ConnectionRefused | ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted => {
            FailureKind::Connect
        }
        ErrorKind::InvalidData if is_tls(err) => FailureKind::Tls,
        ErrorKind::InvalidData => FailureKind::Protocol,
        _ => FailureKind::Io,
    }
}

/// rustls reports handshake and certificate failures wrapped in `io::Error`.
fn is_tls(err: &std::io::Error) -> bool {
    err.get_ref().is_some_and(|inner| inner.is::<rustls::Error>())
}
