/*!
 * Blocking HTTP delivery of reports to a collector.
 *
 * One `ReportTransport` is a delivery session against any number of
 * collectors: it holds the cookie jar, the timeouts and the trust policy,
 * and may be reused across many sends. Connections are not kept alive
 * between sends; every request gets its own socket.
 *
 * Contract:
 * - **Blocking**: every send blocks the caller until the collector answers,
 *   a timeout fires, or the request is cancelled.
 * - **Never fails on the network**: DNS, TCP, TLS and timeout faults come
 *   back as `SendOutcome::Failed`. Only caller mistakes (bad URL, bad header
 *   value, unserializable JSON) are returned as `Err`.
 * - **Single attempt**: no retries. Whether and when to try again is up
 *   to the caller.
 * - **Abortable**: the wire work runs on a helper thread while the caller
 *   waits on both the result and a `CancelToken`. On cancellation the
 *   request's socket is shut down, which fails the helper's blocked read or
 *   write, and the caller returns `SendOutcome::Aborted` right away.
 */
use std::io::Read;
use std::thread;
use std::time::Duration;

use crossbeam_channel::select;
use serde::Serialize;
use tracing::{debug, error, warn};
use ureq::http::{HeaderValue, Response};
use ureq::tls::TlsConfig;
use ureq::unversioned::resolver::DefaultResolver;
use ureq::unversioned::transport::{Connector, RustlsConnector};
use ureq::{Agent, Body};

use super::cancel::{CancelToken, InFlight};
use super::outcome::{FailureKind, Reply, SendOutcome, TransportFailure};
use super::socket::{SocketConnector, SocketSlot};
use crate::config::{Credentials, TransportConfig, TrustPolicy};
use crate::error::{Error, Result};
use crate::protocol::constants::JSON_CONTENT_TYPE;
use crate::protocol::headers::{self, HeaderList};

// ---------------------------------------------------------------------------
// ReportTransport
// ---------------------------------------------------------------------------

pub struct ReportTransport {
    agent: Agent,
    user_agent: String,
    credentials: Option<Credentials>,

    /// Token of the POST currently on the wire, for `abort()`.
    in_flight: InFlight,
}

impl ReportTransport {
    /**
     * Builds a session from `config` and an explicit trust policy.
     *
     * Socket timeout applies to each phase separately: writing the request,
     * writing the body, waiting for the response head, reading the body.
     * Zero durations disable the corresponding bound; an aborted request
     * is torn down either way.
     *
     * System proxy variables are ignored.
     *
     * Fails only if the configured user agent is not a legal header value.
     */
    pub fn new(config: TransportConfig, trust: TrustPolicy) -> Result<Self> {
        if HeaderValue::from_str(&config.user_agent).is_err() {
            return Err(Error::InvalidHeader { name: "User-Agent" });
        }

        let accept_any = trust == TrustPolicy::AcceptAnyCertificate;
        if accept_any {
            warn!("TLS certificate validation is disabled for this transport");
        }

        let tls = TlsConfig::builder().disable_verification(accept_any).build();
        let socket = bound(config.socket_timeout);

        let agent_config = Agent::config_builder()
            .timeout_connect(bound(config.connect_timeout))
            .timeout_send_request(socket)
            .timeout_send_body(socket)
            .timeout_recv_response(socket)
            .timeout_recv_body(socket)
            .http_status_as_error(false)
            .max_idle_connections(0)
            .max_idle_connections_per_host(0)
            .proxy(None)
            .tls_config(tls)
            .build();

        let connector = SocketConnector.chain(RustlsConnector::default());
        let agent = Agent::with_parts(agent_config, connector, DefaultResolver::default());

        Ok(Self {
            agent,
            user_agent: config.user_agent,
            credentials: config.credentials,
            in_flight: InFlight::default(),
        })
    }

    /// POSTs `body` form-encoded. See `send_post_as`.
    pub fn send_post(&self, url: &str, body: &str) -> Result<SendOutcome> {
        self.send_post_as(url, body, None)
    }

    /**
     * POSTs `body` with `content_type`, or the form encoding when `None`.
     *
     * The request becomes the session's in-flight request: `abort()` from
     * any thread cancels it. Starting another POST replaces the handle.
     */
    pub fn send_post_as(
        &self,
        url: &str,
        body: &str,
        content_type: Option<&str>,
    ) -> Result<SendOutcome> {
        let token = CancelToken::new();
        self.in_flight.register(&token);
        let outcome = self.execute(url, Some(body), content_type, &token);
        self.in_flight.release(&token);
        outcome
    }

    /**
     * Serializes `value` to JSON and POSTs it as `application/json`.
     *
     * A value that cannot be serialized is a caller error.
     */
    pub fn send_json<T: Serialize + ?Sized>(&self, url: &str, value: &T) -> Result<SendOutcome> {
        let body = serde_json::to_string(value)?;
        self.send_post_as(url, &body, Some(JSON_CONTENT_TYPE))
    }

    /**
     * GETs `url` and returns the body whatever the status.
     *
     * GETs are not tracked for `abort()`. Use `send_cancellable` with a
     * token of your own if one must be interruptible.
     */
    pub fn send_get(&self, url: &str) -> Result<SendOutcome> {
        self.execute(url, None, None, &CancelToken::new())
    }

    /**
     * Sends a POST (when `body` is set) or a GET, cancellable through
     * `token` instead of the session's in-flight slot.
     */
    pub fn send_cancellable(
        &self,
        url: &str,
        body: Option<&str>,
        content_type: Option<&str>,
        token: &CancelToken,
    ) -> Result<SendOutcome> {
        self.execute(url, body, content_type, token)
    }

    /**
     * Cancels the in-flight POST, if any. Safe to call from any thread, at
     * any time, any number of times.
     */
    pub fn abort(&self) {
        if self.in_flight.cancel() {
            debug!("aborting in-flight request");
        } else {
            debug!("abort requested with no request in flight");
        }
    }

    /// Forgets every cookie collected by this session.
    pub fn clear_cookies(&self) {
        self.agent.cookie_jar_lock().clear();
        debug!("cookie jar cleared");
    }

    /**
     * Opens a streaming GET on `url`, following redirects.
     *
     * Returns `Ok(None)` for any final status other than `200 OK`; the
     * error body is not exposed. Any fault while connecting is reported as
     * a generic I/O error without the underlying cause.
     */
    pub fn open_stream(&self, url: &str) -> Result<Option<ReportStream>> {
        headers::parse_target(url)?;
        let headers = headers::finalize(&self.user_agent, self.credentials.as_ref(), false, None)?;

        let mut request = self.agent.get(url);
        for (name, value) in &headers {
            request = request.header(*name, value.as_str());
        }

        let response = request.call().map_err(|err| {
            debug!(url, error = %err, "stream connection failed");
            Error::Io(std::io::Error::other(format!("error connecting to {url}")))
        })?;

        let status = response.status().as_u16();
        if status != 200 {
            debug!(url, status, "stream not opened");
            return Ok(None);
        }

        Ok(Some(ReportStream {
            reader: response.into_body().into_reader(),
        }))
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn execute(
        &self,
        url: &str,
        body: Option<&str>,
        content_type: Option<&str>,
        token: &CancelToken,
    ) -> Result<SendOutcome> {
        /*
         * Building: everything that can be a caller error is checked before
         * anything touches the network.
         */
        headers::parse_target(url)?;
        let headers = headers::finalize(
            &self.user_agent,
            self.credentials.as_ref(),
            body.is_some(),
            content_type,
        )?;
        let method = if body.is_some() { "POST" } else { "GET" };
        debug!(url, method, "request headers finalized");

        if token.is_cancelled() {
            debug!(url, "request cancelled before dispatch");
            return Ok(SendOutcome::Aborted);
        }

        let sockets = SocketSlot::default();
        let pending = Pending {
            agent: self.agent.clone(),
            url: url.to_string(),
            headers,
            body: body.map(str::to_owned),
            sockets: sockets.clone(),
        };

        /*
         * In flight: the helper thread owns the blocking call. Its sender is
         * dropped without a value only if it dies, which we report as a
         * failure rather than hang.
         */
        let (tx, rx) = crossbeam_channel::bounded(1);
        let spawned = thread::Builder::new()
            .name("courier-request".into())
            .spawn(move || {
                let _ = tx.send(pending.run());
            });

        if let Err(err) = spawned {
            error!(url, error = %err, "failed to spawn request thread");
            return Ok(SendOutcome::Failed(TransportFailure::from_io(&err)));
        }

        debug!(url, method, "sending request");

        let outcome = select! {
            recv(rx) -> result => result.unwrap_or_else(|_| {
                SendOutcome::Failed(TransportFailure::new(
                    FailureKind::Other,
                    "request thread exited without a result",
                ))
            }),
            recv(token.signal()) -> _ => {
                let closed = sockets.close();
                debug!(url, closed, "in-flight sockets shut down");
                SendOutcome::Aborted
            }
        };

        match &outcome {
            SendOutcome::Completed(reply) => {
                debug!(url, status = reply.status, body = ?reply.body, "request completed");
            }
            SendOutcome::Failed(failure) => {
                error!(url, kind = %failure.kind, error = %failure, "request failed");
            }
            SendOutcome::Aborted => {
                debug!(url, "request aborted by caller");
            }
        }

        Ok(outcome)
    }
}

/// Zero means unbounded.
fn bound(duration: Duration) -> Option<Duration> {
    if duration.is_zero() {
        None
    } else {
        Some(duration)
    }
}

// ---------------------------------------------------------------------------
// Pending: the part of a request that moves to the helper thread
// ---------------------------------------------------------------------------

struct Pending {
    agent: Agent,
    url: String,
    headers: HeaderList,
    body: Option<String>,
    sockets: SocketSlot,
}

impl Pending {
    fn run(self) -> SendOutcome {
        self.sockets.bind_to_current_thread();

        let result = match self.body {
            Some(body) => {
                let mut request = self.agent.post(self.url.as_str());
                for (name, value) in &self.headers {
                    request = request.header(*name, value.as_str());
                }
                request.send(body.as_bytes())
            }
            None => {
                let mut request = self.agent.get(self.url.as_str());
                for (name, value) in &self.headers {
                    request = request.header(*name, value.as_str());
                }
                request.call()
            }
        };

        match result {
            Ok(response) => read_reply(response),
            Err(err) => SendOutcome::Failed(TransportFailure::from_ureq(err)),
        }
    }
}

fn read_reply(response: Response<Body>) -> SendOutcome {
    let status = response.status().as_u16();
    let mut body = response.into_body();

    /* Undecodable bytes become U+FFFD; the status is what counts. */
    match body.read_to_vec() {
        Ok(bytes) if bytes.is_empty() => SendOutcome::Completed(Reply { status, body: None }),
        Ok(bytes) => SendOutcome::Completed(Reply {
            status,
            body: Some(String::from_utf8_lossy(&bytes).into_owned()),
        }),
        Err(err) => SendOutcome::Failed(TransportFailure::from_ureq(err)),
    }
}

// ---------------------------------------------------------------------------
// ReportStream
// ---------------------------------------------------------------------------

/// Body of a successful streaming GET.
pub struct ReportStream {
    reader: ureq::BodyReader<'static>,
}

impl Read for ReportStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.reader.read(buf)
    }
}
