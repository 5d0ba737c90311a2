/*!
 * Header finalization and target URL checks.
 *
 * Every request leaves here with the same fixed `User-Agent` and `Accept`
 * values. POSTs additionally carry a `Content-Type`: the caller's override,
 * or the form encoding. Optional Basic credentials are injected as an
 * `Authorization` header; no other authentication scheme exists.
 */
use base64::Engine as _;
use ureq::http::{HeaderValue, Uri};

use super::constants::{ACCEPT, FORM_CONTENT_TYPE};
use crate::config::Credentials;
use crate::error::{Error, Result};

/// A finalized header list, in the order it is applied to the request.
pub type HeaderList = Vec<(&'static str, String)>;

/**
 * Parses `url` and checks that it names an HTTP or HTTPS resource with a
 * host.
 *
 * Anything else is a programmer error and is reported as such rather than
 * turned into a transport failure.
 */
pub fn parse_target(url: &str) -> Result<Uri> {
    let uri = url.parse::<Uri>().map_err(|e| Error::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    match uri.scheme_str() {
        Some("http") | Some("https") => {}
        Some(other) => {
            return Err(Error::UnsupportedScheme {
                url: url.to_string(),
                scheme: other.to_string(),
            })
        }
        None => {
            return Err(Error::InvalidUrl {
                url: url.to_string(),
                reason: "missing scheme".into(),
            })
        }
    }

    if uri.host().map_or(true, str::is_empty) {
        return Err(Error::InvalidUrl {
            url: url.to_string(),
            reason: "missing host".into(),
        });
    }

    Ok(uri)
}

/**
 * Builds the `Authorization: Basic ...` value for `credentials`.
 */
pub fn basic_authorization(credentials: &Credentials) -> String {
    let pair = format!("{}:{}", credentials.login, credentials.password);
    let encoded = base64::engine::general_purpose::STANDARD.encode(pair);
    format!("Basic {encoded}")
}

/**
 * Produces the full header list for one request.
 *
 * `content_type` is only consulted when `has_body` is set. An override that
 * is not a legal header value fails with `Error::InvalidHeader`.
 */
pub fn finalize(
    user_agent: &str,
    credentials: Option<&Credentials>,
    has_body: bool,
    content_type: Option<&str>,
) -> Result<HeaderList> {
    if HeaderValue::from_str(user_agent).is_err() {
        return Err(Error::InvalidHeader { name: "User-Agent" });
    }

    let mut headers: HeaderList = vec![
        ("User-Agent", user_agent.to_string()),
        ("Accept", ACCEPT.to_string()),
    ];

    if has_body {
        let content_type = content_type.unwrap_or(FORM_CONTENT_TYPE);
        if HeaderValue::from_str(content_type).is_err() {
            return Err(Error::InvalidHeader { name: "Content-Type" });
        }
        headers.push(("Content-Type", content_type.to_string()));
    }

    if let Some(credentials) = credentials {
        let value = basic_authorization(credentials);
        if HeaderValue::from_str(&value).is_err() {
            return Err(Error::InvalidHeader { name: "Authorization" });
        }
        headers.push(("Authorization", value));
    }

    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::constants::{DEFAULT_USER_AGENT, JSON_CONTENT_TYPE};

    fn lookup<'a>(headers: &'a HeaderList, name: &str) -> Option<&'a str> {
        headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_parse_target_accepts_http_and_https() {
        assert!(parse_target("http://127.0.0.1:8080/report").is_ok());
        assert!(parse_target("https://collector.example.com/").is_ok());
    }

    #[test]
    fn test_parse_target_rejects_other_schemes() {
        let err = parse_target("ftp://collector.example.com/").unwrap_err();
        assert!(matches!(err, Error::UnsupportedScheme { ref scheme, .. } if scheme == "ftp"));
    }

    #[test]
    fn test_parse_target_rejects_garbage() {
        assert!(matches!(parse_target("not a url"), Err(Error::InvalidUrl { .. })));
        assert!(matches!(parse_target("/relative/path"), Err(Error::InvalidUrl { .. })));
    }

    #[test]
    fn test_post_defaults_to_form_content_type() {
        let headers = finalize(DEFAULT_USER_AGENT, None, true, None).unwrap();
        assert_eq!(lookup(&headers, "content-type"), Some(FORM_CONTENT_TYPE));
        assert_eq!(lookup(&headers, "accept"), Some(ACCEPT));
        assert_eq!(lookup(&headers, "user-agent"), Some(DEFAULT_USER_AGENT));
        assert_eq!(lookup(&headers, "authorization"), None);
    }

    #[test]
    fn test_override_and_get_without_body() {
        let headers = finalize("agent", None, true, Some(JSON_CONTENT_TYPE)).unwrap();
        assert_eq!(lookup(&headers, "content-type"), Some(JSON_CONTENT_TYPE));

        let headers = finalize("agent", None, false, Some(JSON_CONTENT_TYPE)).unwrap();
        assert_eq!(lookup(&headers, "content-type"), None);
    }

    #[test]
    fn test_invalid_content_type_is_reported() {
        let err = finalize("agent", None, true, Some("text/plain\r\nX-Evil: 1")).unwrap_err();
        assert!(matches!(err, Error::InvalidHeader { name: "Content-Type" }));
    }

    #[test]
    fn test_basic_credentials_are_injected() {
        let credentials = Credentials {
            login: "Aladdin".into(),
            password: "open sesame".into(),
        };
        let headers = finalize("agent", Some(&credentials), false, None).unwrap();
        assert_eq!(
            lookup(&headers, "authorization"),
            Some("Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ==")
        );
    }
}
