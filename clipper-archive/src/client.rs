//! Article CRUD over the shared session.
use std::borrow::Cow;

use reqwest::Method;
use serde_json::Value;
use url::Url;

use clipper_session::{Error, RequestOpts, Session};

use crate::types::CreatedArticle;

pub struct ArticleClient {
    session: Session,
    api_prefix: Url,
}

impl ArticleClient {
    /// Client with a freshly built session.
    pub fn new(api_prefix: &str) -> Result<Self, Error> {
        Self::with_session(api_prefix, Session::new()?)
    }

    /// Client over an existing session. A trailing slash is ensured on the
    /// prefix so relative joins keep the prefix's own path component.
    pub fn with_session(api_prefix: &str, session: Session) -> Result<Self, Error> {
        let mut prefix = api_prefix.to_string();
        if !prefix.ends_with('/') {
            prefix.push('/');
        }
        let api_prefix = Url::parse(&prefix).map_err(|e| Error::Url(e.to_string()))?;
        Ok(Self {
            session,
            api_prefix,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn collection_url(&self, collection: &str) -> Result<Url, Error> {
        self.api_prefix
            .join(&format!("article/{collection}"))
            .map_err(|e| Error::Url(e.to_string()))
    }

    fn article_url(&self, collection: &str, id: &str) -> Result<Url, Error> {
        self.api_prefix
            .join(&format!("article/{collection}/{id}"))
            .map_err(|e| Error::Url(e.to_string()))
    }

    /// Run an aggregation `pipeline` over a collection, optionally under a
    /// `collation`. Both are opaque to this client and serialized compactly;
    /// the `collation` parameter is omitted entirely when not given.
    pub async fn list(
        &self,
        collection: &str,
        pipeline: &Value,
        collation: Option<&Value>,
    ) -> Result<Value, Error> {
        let mut query: Vec<(&str, Cow<'_, str>)> =
            vec![("pipeline", compact_json(pipeline)?.into())];
        if let Some(collation) = collation {
            query.push(("collation", compact_json(collation)?.into()));
        }

        let resp = self
            .session
            .get(
                self.collection_url(collection)?,
                RequestOpts {
                    query: Some(query),
                    ..Default::default()
                },
            )
            .await?;
        if !resp.status.is_success() {
            tracing::warn!(target: "archive", collection, status = %resp.status, "archive.list.error");
            return Err(resp.into_api_error());
        }
        resp.json()
    }

    /// Store a new article, returning the server-assigned `_id`.
    ///
    /// `resolve_attachments` asks the server to extract embedded media
    /// references; `replace` overwrites an equivalent existing document
    /// instead of keeping it.
    pub async fn create(
        &self,
        collection: &str,
        article: &Value,
        resolve_attachments: bool,
        replace: bool,
    ) -> Result<String, Error> {
        let query: Vec<(&str, Cow<'_, str>)> = vec![
            ("resolve_attachments", bool_param(resolve_attachments).into()),
            ("replace", bool_param(replace).into()),
        ];

        let resp = self
            .session
            .send_json(
                Method::POST,
                self.collection_url(collection)?,
                article,
                RequestOpts {
                    query: Some(query),
                    ..Default::default()
                },
            )
            .await?;
        if !resp.status.is_success() {
            tracing::warn!(target: "archive", collection, status = %resp.status, "archive.create.error");
            return Err(resp.into_api_error());
        }
        let created: CreatedArticle = resp.json()?;
        tracing::debug!(target: "archive", collection, article_id = %created.id, "archive.create.ok");
        Ok(created.id)
    }

    /// Fetch one article by id. `projection` narrows the returned fields;
    /// when absent, the parameter is not sent at all.
    pub async fn get(
        &self,
        collection: &str,
        id: &str,
        projection: Option<&Value>,
    ) -> Result<Value, Error> {
        let mut query: Vec<(&str, Cow<'_, str>)> = Vec::new();
        if let Some(projection) = projection {
            query.push(("projection", compact_json(projection)?.into()));
        }

        let resp = self
            .session
            .get(
                self.article_url(collection, id)?,
                RequestOpts {
                    query: if query.is_empty() { None } else { Some(query) },
                    ..Default::default()
                },
            )
            .await?;
        if !resp.status.is_success() {
            tracing::warn!(target: "archive", collection, id, status = %resp.status, "archive.get.error");
            return Err(resp.into_api_error());
        }
        resp.json()
    }

    /// Apply `patch` to an existing article. Success carries no payload.
    pub async fn update(&self, collection: &str, id: &str, patch: &Value) -> Result<(), Error> {
        let resp = self
            .session
            .send_json(
                Method::PUT,
                self.article_url(collection, id)?,
                patch,
                RequestOpts::default(),
            )
            .await?;
        if !resp.status.is_success() {
            tracing::warn!(target: "archive", collection, id, status = %resp.status, "archive.update.error");
            return Err(resp.into_api_error());
        }
        Ok(())
    }

    /// Remove an article. Success carries no payload.
    pub async fn delete(&self, collection: &str, id: &str) -> Result<(), Error> {
        let resp = self
            .session
            .delete(self.article_url(collection, id)?, RequestOpts::default())
            .await?;
        if !resp.status.is_success() {
            tracing::warn!(target: "archive", collection, id, status = %resp.status, "archive.delete.error");
            return Err(resp.into_api_error());
        }
        Ok(())
    }
}

/// Compact serialization: pipelines and collations travel without
/// extraneous whitespace so the query string stays deterministic.
fn compact_json(value: &Value) -> Result<String, Error> {
    serde_json::to_string(value).map_err(|e| Error::Build(e.to_string()))
}

fn bool_param(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}
