/*!
 * Wire constants shared by every request.
 *
 * The `Accept` list and the form content type must stay byte-for-byte
 * identical: legacy collectors negotiate on them.
 */

/// Default `User-Agent`, derived from the `courier_core` package version.
pub const DEFAULT_USER_AGENT: &str = concat!("courier/", env!("CARGO_PKG_VERSION"));

/// `Accept` header sent on every POST and GET.
pub const ACCEPT: &str =
    "text/html,application/xml,application/xhtml+xml,text/html;q=0.9,text/plain;q=0.8,image/png,*/*;q=0.5";

/// Content type used when the caller does not override it.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Content type used by `send_json`.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Default connection establishment bound, in milliseconds.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 3_000;

/// Default per-phase read/write bound, in milliseconds.
pub const DEFAULT_SOCKET_TIMEOUT_MS: u64 = 5_000;
