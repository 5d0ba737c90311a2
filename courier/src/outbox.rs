/*!
 * Pending reports plus the session that delivers them.
 *
 * `Outbox` keeps the most recent reports in a `BoundedQueue` and, when
 * asked, makes exactly one delivery attempt per pending report, oldest
 * first. Reports the collector accepted (2xx) are dropped; everything else
 * stays queued for the next `deliver()` call. There is no retry schedule:
 * the caller decides when to call again.
 *
 * Each pass runs under its own `CancelToken`, published through
 * `AbortHandle`, so an abort stops the pass whether it lands during a
 * request or between two of them.
 */
use std::fmt;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tracing::{debug, info, warn};

use courier_core::{
    parse_target, BoundedQueue, CancelToken, Error, ReportTransport, Result, SendOutcome,
    Settings, JSON_CONTENT_TYPE,
};

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// A payload ready for the wire, with its content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    body: String,

    /// `None` means the form encoding.
    content_type: Option<String>,
}

impl Report {
    pub fn form(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            content_type: None,
        }
    }

    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        Ok(Self {
            body: serde_json::to_string(value)?,
            content_type: Some(JSON_CONTENT_TYPE.to_string()),
        })
    }

    pub fn with_content_type(body: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            content_type: Some(content_type.into()),
        }
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.body)
    }
}

// ---------------------------------------------------------------------------
// DeliverySummary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliverySummary {
    /// Reports the collector accepted.
    pub delivered: usize,

    /// Reports that hit a transport failure or an error status.
    pub failed: usize,

    /// `true` if the pass stopped early because of `abort()`.
    pub aborted: bool,
}

// ---------------------------------------------------------------------------
// AbortHandle
// ---------------------------------------------------------------------------

/**
 * Stops the delivery pass currently running on an `Outbox`, from any
 * thread. Aborting while no pass runs has no effect on later passes.
 */
#[derive(Clone, Default)]
pub struct AbortHandle {
    pass: Arc<Mutex<Option<CancelToken>>>,
}

impl AbortHandle {
    pub fn abort(&self) {
        let current = match self.pass.lock() {
            Ok(pass) => pass.clone(),
            Err(_) => None,
        };

        match current {
            Some(token) => {
                token.cancel();
                debug!("aborting delivery pass");
            }
            None => debug!("abort requested with no delivery pass running"),
        }
    }

    fn begin(&self) -> CancelToken {
        let token = CancelToken::new();
        if let Ok(mut pass) = self.pass.lock() {
            *pass = Some(token.clone());
        }
        token
    }

    fn finish(&self) {
        if let Ok(mut pass) = self.pass.lock() {
            *pass = None;
        }
    }
}

// ---------------------------------------------------------------------------
// Outbox
// ---------------------------------------------------------------------------

pub struct Outbox {
    endpoint: String,
    pending: BoundedQueue<Report>,
    transport: ReportTransport,
    abort: AbortHandle,
}

impl Outbox {
    /**
     * Builds an outbox from settings.
     *
     * `form_uri` is required; its absence, a malformed URL, or a zero
     * `max_pending_reports` is a configuration error.
     */
    pub fn new(settings: &Settings) -> Result<Self> {
        let endpoint = settings
            .form_uri
            .clone()
            .ok_or(Error::MissingSetting("form_uri"))?;
        let transport = ReportTransport::new(settings.transport_config(), settings.trust_policy())?;

        Self::with_transport(endpoint, settings.max_pending_reports, transport)
    }

    /// Builds an outbox around an already configured transport.
    pub fn with_transport(
        endpoint: impl Into<String>,
        capacity: usize,
        transport: ReportTransport,
    ) -> Result<Self> {
        let endpoint = endpoint.into();
        parse_target(&endpoint)?;

        Ok(Self {
            endpoint,
            pending: BoundedQueue::new(capacity)?,
            transport,
            abort: AbortHandle::default(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn pending(&self) -> &BoundedQueue<Report> {
        &self.pending
    }

    /**
     * Queues a report. Returns how many older reports were evicted to make
     * room (zero or one).
     */
    pub fn enqueue(&mut self, report: Report) -> usize {
        match self.pending.push(report) {
            Some(evicted) => {
                warn!(bytes = evicted.body.len(), "outbox full, dropped oldest report");
                1
            }
            None => 0,
        }
    }

    /// Queues several reports at once. Returns how many were discarded.
    pub fn enqueue_all<I>(&mut self, reports: I) -> usize
    where
        I: IntoIterator<Item = Report>,
    {
        let evicted = self.pending.push_all(reports);
        if evicted > 0 {
            warn!(evicted, "outbox full, dropped oldest reports");
        }
        evicted
    }

    /// Handle for interrupting a running `deliver()` from another thread.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /**
     * Attempts every pending report once, oldest first.
     *
     * Failed or rejected reports are re-queued in their original order. An
     * abort stops the pass and re-queues the current report and everything
     * after it untouched. A caller error (e.g. a report with an illegal
     * content type) stops the pass the same way and is returned.
     */
    pub fn deliver(&mut self) -> Result<DeliverySummary> {
        let token = self.abort.begin();
        let result = self.deliver_with(&token);
        self.abort.finish();
        result
    }

    fn deliver_with(&mut self, token: &CancelToken) -> Result<DeliverySummary> {
        let capacity = self.pending.capacity();
        let batch = std::mem::replace(&mut self.pending, BoundedQueue::new(capacity)?);
        let mut reports = batch.into_iter();
        let mut keep = Vec::new();
        let mut summary = DeliverySummary::default();

        debug!(endpoint = %self.endpoint, pending = reports.len(), "delivering pending reports");

        while let Some(report) = reports.next() {
            let sent = self.transport.send_cancellable(
                &self.endpoint,
                Some(report.body()),
                report.content_type(),
                token,
            );

            let outcome = match sent {
                Ok(outcome) => outcome,
                Err(err) => {
                    keep.push(report);
                    keep.extend(reports.by_ref());
                    self.pending.push_all(keep);
                    return Err(err);
                }
            };

            match outcome {
                SendOutcome::Aborted => {
                    summary.aborted = true;
                    keep.push(report);
                    keep.extend(reports.by_ref());
                    break;
                }
                outcome if outcome.is_success() => summary.delivered += 1,
                SendOutcome::Completed(reply) => {
                    warn!(status = reply.status, "collector rejected report");
                    summary.failed += 1;
                    keep.push(report);
                }
                SendOutcome::Failed(failure) => {
                    warn!(kind = %failure.kind, error = %failure, "report delivery failed");
                    summary.failed += 1;
                    keep.push(report);
                }
            }
        }

        self.pending.push_all(keep);

        info!(
            delivered = summary.delivered,
            failed = summary.failed,
            aborted = summary.aborted,
            remaining = self.pending.len(),
            "delivery pass finished"
        );
        Ok(summary)
    }
}
