//! Authenticated HTTP session shared by the clipper API clients.
//!
//! - One [`Session`] owns one logical conversation: cookie store, default
//!   headers, optional per-scheme proxies
//! - Cookie save/load to a file, round-trippable by this crate only
//! - [`Session::execute`] performs exactly one request/response round trip;
//!   classification of the outcome belongs to the calling client
//! - Redirect following is disabled: the remote services use redirects to
//!   signal auth failure, so a 3xx must surface as an error
//!
//! Example (no_run):
//! ```rust,no_run
//! # async fn demo() -> Result<(), clipper_session::Error> {
//! let session = clipper_session::Session::builder().build()?;
//! session.load_cookies("cookies.json")?;
//! let url = url::Url::parse("https://api.example.com/ping").unwrap();
//! let resp = session
//!     .get(url, clipper_session::RequestOpts::default())
//!     .await?
//!     .ensure_success()?;
//! session.save_cookies("cookies.json")?;
//! # Ok(()) }
//! ```
//!
//! Observability: structured `tracing` events are emitted for request start,
//! response arrival, and every failure path. No retry, backoff, or caching
//! happens here; each call maps to exactly one wire exchange.

use std::borrow::Cow;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method, Proxy, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

mod cookies;

use cookies::{CookieJar, CookieRecord};

// ==============================
// Errors
// ==============================

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid URL: {0}")]
    Url(String),
    #[error("session build failed: {0}")]
    Build(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("cookie store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cookie snapshot malformed: {0}")]
    Cookie(String),
    #[error("decode error: {message}, body_snippet: {body_snippet}")]
    Decode {
        message: String,
        body_snippet: String,
    },
    /// The remote endpoint answered outside the caller's success criterion.
    /// Carries the raw body so callers can diagnose without this crate
    /// interpreting an error schema it does not own.
    #[error("remote API error {status}: {reason}")]
    Api {
        status: StatusCode,
        reason: String,
        body: String,
    },
}

// ==============================
// Request options
// ==============================

/// Per-request tuning knobs, merged on top of the session defaults.
///
/// ```
/// use clipper_session::RequestOpts;
/// use std::borrow::Cow;
///
/// let opts = RequestOpts {
///     query: Some(vec![("page", Cow::Borrowed("1"))]),
///     ..Default::default()
/// };
/// assert!(opts.headers.is_none());
/// ```
#[derive(Clone, Debug, Default)]
pub struct RequestOpts<'a> {
    pub headers: Option<HeaderMap>,
    pub query: Option<Vec<(&'a str, Cow<'a, str>)>>,
    pub timeout: Option<Duration>,
}

// ==============================
// Response
// ==============================

/// Raw outcome of one round trip. The session never decides success;
/// each client applies its own criterion via [`HttpResponse::ensure_success`]
/// or by inspecting `status` directly.
#[derive(Debug)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn reason(&self) -> String {
        self.status
            .canonical_reason()
            .unwrap_or("unknown status")
            .to_string()
    }

    /// Decode the body as JSON, surfacing a truncated snippet on failure.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        serde_json::from_slice(&self.body).map_err(|e| Error::Decode {
            message: e.to_string(),
            body_snippet: snip_body(&self.body),
        })
    }

    /// Convert this response into the API error it represents.
    pub fn into_api_error(self) -> Error {
        Error::Api {
            status: self.status,
            reason: self.reason(),
            body: String::from_utf8_lossy(&self.body).into_owned(),
        }
    }

    /// Treat any non-2xx status as a failure.
    pub fn ensure_success(self) -> Result<Self, Error> {
        if self.status.is_success() {
            Ok(self)
        } else {
            Err(self.into_api_error())
        }
    }
}

// ==============================
// Session
// ==============================

/// A reusable authenticated HTTP conversation.
///
/// Cloning is cheap (the transport client and cookie store are shared), but
/// a session is meant for one logical caller; concurrent callers race on
/// cookie updates unless they coordinate externally.
#[derive(Clone)]
pub struct Session {
    http: Client,
    jar: Arc<CookieJar>,
}

impl Session {
    pub fn builder() -> SessionBuilder {
        SessionBuilder::default()
    }

    /// A session with no default headers, proxies, or prior cookies.
    pub fn new() -> Result<Self, Error> {
        Self::builder().build()
    }

    /// Look up a cookie value by name, regardless of which domain set it.
    pub fn cookie_value(&self, name: &str) -> Option<String> {
        self.jar.value(name)
    }

    /// Serialize the cookie store to `path` as a JSON snapshot.
    pub fn save_cookies<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let snapshot = self.jar.snapshot();
        let bytes =
            serde_json::to_vec(&snapshot).map_err(|e| Error::Cookie(e.to_string()))?;
        std::fs::write(path.as_ref(), bytes)?;
        tracing::debug!(
            target: "session.cookies",
            path = %path.as_ref().display(),
            cookie_count = snapshot.len(),
            "cookies saved"
        );
        Ok(())
    }

    /// Restore a snapshot written by [`Session::save_cookies`], merging it
    /// into the live store. Same-domain/same-name cookies are overwritten;
    /// all others are preserved.
    pub fn load_cookies<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let bytes = std::fs::read(path.as_ref())?;
        let records: Vec<CookieRecord> =
            serde_json::from_slice(&bytes).map_err(|e| Error::Cookie(e.to_string()))?;
        tracing::debug!(
            target: "session.cookies",
            path = %path.as_ref().display(),
            cookie_count = records.len(),
            "cookies loaded"
        );
        self.jar.merge(records);
        Ok(())
    }

    /// GET without a body.
    pub async fn get(&self, url: Url, opts: RequestOpts<'_>) -> Result<HttpResponse, Error> {
        self.execute::<serde_json::Value>(Method::GET, url, None, opts)
            .await
    }

    /// DELETE without a body.
    pub async fn delete(&self, url: Url, opts: RequestOpts<'_>) -> Result<HttpResponse, Error> {
        self.execute::<serde_json::Value>(Method::DELETE, url, None, opts)
            .await
    }

    /// Send a JSON body with the given method.
    pub async fn send_json<B>(
        &self,
        method: Method,
        url: Url,
        body: &B,
        opts: RequestOpts<'_>,
    ) -> Result<HttpResponse, Error>
    where
        B: Serialize + ?Sized,
    {
        self.execute(method, url, Some(body), opts).await
    }

    /// One request/response round trip. `Set-Cookie` headers on the response
    /// update the session's store before any subsequent request.
    pub async fn execute<B>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
        opts: RequestOpts<'_>,
    ) -> Result<HttpResponse, Error>
    where
        B: Serialize + ?Sized,
    {
        let mut rb = self.http.request(method.clone(), url.clone());

        if let Some(timeout) = opts.timeout {
            rb = rb.timeout(timeout);
        }

        if let Some(query) = &opts.query {
            let pairs: Vec<(&str, &str)> =
                query.iter().map(|(k, v)| (*k, v.as_ref())).collect();
            rb = rb.query(&pairs);
        }

        if let Some(body) = body {
            let bytes = serde_json::to_vec(body).map_err(|e| Error::Build(e.to_string()))?;
            rb = rb.header(CONTENT_TYPE, "application/json").body(bytes);
        }

        if let Some(headers) = &opts.headers {
            rb = rb.headers(headers.clone());
        }

        tracing::debug!(
            target: "session.http",
            method = %method,
            host_path = %host_path(&url),
            has_body = body.is_some(),
            "http.request.start"
        );

        let started = std::time::Instant::now();
        let resp = rb.send().await.map_err(|e| {
            let message = e.to_string();
            tracing::warn!(
                target: "session.http",
                method = %method,
                host_path = %host_path(&url),
                message = %message,
                "http.network_error.send"
            );
            Error::Network(message)
        })?;

        let status = resp.status();
        let body = resp.bytes().await.map_err(|e| {
            let message = e.to_string();
            tracing::warn!(
                target: "session.http",
                method = %method,
                host_path = %host_path(&url),
                message = %message,
                "http.network_error.body"
            );
            Error::Network(message)
        })?;

        tracing::debug!(
            target: "session.http",
            method = %method,
            host_path = %host_path(&url),
            %status,
            duration_ms = started.elapsed().as_millis() as u64,
            body_len = body.len(),
            "http.response"
        );
        tracing::trace!(
            target: "session.http",
            body_snippet = %snip_body(&body),
            "http.response.body_snippet"
        );

        Ok(HttpResponse { status, body })
    }
}

// ==============================
// Builder
// ==============================

/// Builds a [`Session`]; headers and proxies have to be fixed before the
/// underlying transport client exists, hence the two-phase construction.
#[derive(Default)]
pub struct SessionBuilder {
    headers: HeaderMap,
    proxies: Vec<(String, String)>,
    timeout: Option<Duration>,
}

impl SessionBuilder {
    /// Add one default header, sent with every request of this session.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Merge a map of default headers.
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Route requests of `scheme` ("http", "https", or "all") through
    /// `endpoint`. Invalid endpoints are reported by [`SessionBuilder::build`].
    pub fn proxy(mut self, scheme: &str, endpoint: &str) -> Self {
        self.proxies.push((scheme.to_string(), endpoint.to_string()));
        self
    }

    /// Overall per-request timeout. Without one, the transport default
    /// applies (no timeout beyond connect).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<Session, Error> {
        let jar = Arc::new(CookieJar::default());
        let mut builder = Client::builder()
            .default_headers(self.headers)
            .redirect(reqwest::redirect::Policy::none())
            .cookie_provider(Arc::clone(&jar))
            .connect_timeout(Duration::from_secs(5));

        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        for (scheme, endpoint) in &self.proxies {
            let proxy = match scheme.as_str() {
                "http" => Proxy::http(endpoint),
                "https" => Proxy::https(endpoint),
                _ => Proxy::all(endpoint),
            }
            .map_err(|e| Error::Build(e.to_string()))?;
            builder = builder.proxy(proxy);
        }

        let http = builder.build().map_err(|e| Error::Build(e.to_string()))?;
        Ok(Session { http, jar })
    }
}

// ==============================
// Helpers
// ==============================

fn host_path(url: &Url) -> String {
    format!("{}{}", url.host_str().unwrap_or("-"), url.path())
}

fn snip_body(body: &[u8]) -> String {
    let mut snip = String::from_utf8_lossy(body).to_string();
    if snip.len() > 500 {
        snip.truncate(500);
        snip.push_str("...");
    }
    snip
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_carries_status_reason_and_body() {
        let resp = HttpResponse {
            status: StatusCode::NOT_FOUND,
            body: Bytes::from_static(b"no such article"),
        };
        match resp.ensure_success() {
            Err(Error::Api {
                status,
                reason,
                body,
            }) => {
                assert_eq!(status, StatusCode::NOT_FOUND);
                assert_eq!(reason, "Not Found");
                assert_eq!(body, "no such article");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn decode_error_includes_snippet() {
        let resp = HttpResponse {
            status: StatusCode::OK,
            body: Bytes::from_static(b"<html>not json</html>"),
        };
        let err = resp.json::<serde_json::Value>().unwrap_err();
        match err {
            Error::Decode { body_snippet, .. } => {
                assert!(body_snippet.contains("not json"));
            }
            other => panic!("expected Decode error, got {other:?}"),
        }
    }

    #[test]
    fn snip_body_truncates_long_payloads() {
        let long = vec![b'a'; 1000];
        let snip = snip_body(&long);
        assert_eq!(snip.len(), 503);
        assert!(snip.ends_with("..."));
    }
}
