//! Timeline page fetcher built on the shared session.
//!
//! The query identifier below is a versioned contract with the remote
//! service and must only change in lockstep with it.
use std::borrow::Cow;

use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, REFERER};
use serde_json::Value;
use url::Url;

use clipper_session::{Error, RequestOpts, Session};

use crate::types::QueryEnvelope;

const TIMELINE_QUERY_HASH: &str = "42323d64886122307be10013ad2dcc44";
const GRAPHQL_ENDPOINT: &str = "https://www.instagram.com/graphql/query/";
const FEED_REFERER: &str = "https://www.instagram.com/";
const DEFAULT_PAGE_SIZE: u32 = 12;

const X_REQUESTED_WITH: HeaderName = HeaderName::from_static("x-requested-with");
const X_CSRFTOKEN: HeaderName = HeaderName::from_static("x-csrftoken");

#[derive(Clone)]
pub struct FeedClient {
    session: Session,
    endpoint: Url,
}

impl FeedClient {
    /// Client with a freshly built session (no prior cookies).
    pub fn new() -> Result<Self, Error> {
        Ok(Self::with_session(Session::new()?))
    }

    /// Client over an existing session, e.g. one restored from a cookie
    /// snapshot.
    pub fn with_session(session: Session) -> Self {
        let endpoint = Url::parse(GRAPHQL_ENDPOINT).expect("static endpoint URL");
        Self { session, endpoint }
    }

    /// Point the client at a different endpoint. Test hook.
    pub fn with_endpoint(session: Session, endpoint: &str) -> Result<Self, Error> {
        let endpoint = Url::parse(endpoint).map_err(|e| Error::Url(e.to_string()))?;
        Ok(Self { session, endpoint })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Fetch one page of `user_id`'s media timeline.
    ///
    /// `page_size` defaults to 12; `cursor` absent means the first page.
    /// Succeeds only on HTTP 200 with payload `status == "ok"`, returning
    /// the payload's `data` field. Every other combination becomes
    /// [`Error::Api`] carrying the raw response for diagnosis — including
    /// redirects, which the session never follows because the remote uses
    /// them to signal expired auth.
    pub async fn fetch_timeline_page(
        &self,
        user_id: &str,
        page_size: Option<u32>,
        cursor: Option<&str>,
    ) -> Result<Value, Error> {
        let first = page_size.unwrap_or(DEFAULT_PAGE_SIZE);

        let mut variables = serde_json::Map::new();
        variables.insert("id".into(), Value::from(user_id));
        variables.insert("first".into(), Value::from(first));
        if let Some(cursor) = cursor {
            variables.insert("after".into(), Value::from(cursor));
        }
        let variables = serde_json::to_string(&Value::Object(variables))
            .map_err(|e| Error::Build(e.to_string()))?;

        let query: Vec<(&str, Cow<'_, str>)> = vec![
            ("query_hash", TIMELINE_QUERY_HASH.into()),
            ("variables", variables.into()),
        ];

        let mut headers = HeaderMap::new();
        headers.insert(REFERER, HeaderValue::from_static(FEED_REFERER));
        headers.insert(X_REQUESTED_WITH, HeaderValue::from_static("XMLHttpRequest"));
        if let Some(token) = self.session.cookie_value("csrftoken") {
            headers.insert(
                X_CSRFTOKEN,
                HeaderValue::from_str(&token).map_err(|e| Error::Build(e.to_string()))?,
            );
        }

        let resp = self
            .session
            .execute::<Value>(
                Method::GET,
                self.endpoint.clone(),
                None,
                RequestOpts {
                    headers: Some(headers),
                    query: Some(query),
                    ..Default::default()
                },
            )
            .await?;

        if resp.status != reqwest::StatusCode::OK {
            tracing::warn!(
                target: "feed",
                user_id,
                status = %resp.status,
                "feed.timeline_page.http_error"
            );
            return Err(resp.into_api_error());
        }

        let envelope: QueryEnvelope = resp.json()?;
        if envelope.status != "ok" {
            tracing::warn!(
                target: "feed",
                user_id,
                payload_status = %envelope.status,
                "feed.timeline_page.payload_error"
            );
            return Err(resp.into_api_error());
        }

        tracing::debug!(target: "feed", user_id, first, has_cursor = cursor.is_some(), "feed.timeline_page.ok");
        Ok(envelope.data.unwrap_or(Value::Null))
    }
}
