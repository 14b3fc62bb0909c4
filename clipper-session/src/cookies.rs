//! Exportable cookie store backing a [`Session`](crate::Session).
//!
//! reqwest's built-in `Jar` cannot be enumerated, so persistence keeps its own
//! store and plugs it into the client via [`reqwest::cookie::CookieStore`].
//! Cookies are keyed by (domain, name); the most specific path wins on merge.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use reqwest::header::HeaderValue;
use serde::{Deserialize, Serialize};
use url::Url;

/// One persisted cookie. The snapshot format is a JSON array of these
/// records, readable only by [`CookieJar::merge`] — it is not meant to be
/// portable to other cookie-store implementations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CookieRecord {
    pub domain: String,
    pub path: String,
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone)]
struct StoredCookie {
    value: String,
    path: String,
}

/// In-memory cookie store: domain → cookie name → value/path.
///
/// Interior locking exists only so the reqwest cookie hook (which takes
/// `&self`) can mutate the store; a jar is still meant to serve one logical
/// caller at a time.
#[derive(Debug, Default)]
pub struct CookieJar {
    inner: RwLock<HashMap<String, HashMap<String, StoredCookie>>>,
}

impl CookieJar {
    pub fn insert(&self, domain: &str, path: &str, name: &str, value: &str) {
        let mut guard = self
            .inner
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        guard.entry(normalize_domain(domain)).or_default().insert(
            name.to_string(),
            StoredCookie {
                value: value.to_string(),
                path: path.to_string(),
            },
        );
    }

    /// Look up a cookie value by name across every stored domain. Used for
    /// tokens whose owning domain the caller does not track (e.g. the
    /// anti-CSRF cookie).
    pub fn value(&self, name: &str) -> Option<String> {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        guard
            .values()
            .find_map(|cookies| cookies.get(name))
            .map(|cookie| cookie.value.clone())
    }

    /// Stable, sorted export of the current store.
    pub fn snapshot(&self) -> Vec<CookieRecord> {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let mut records: Vec<CookieRecord> = guard
            .iter()
            .flat_map(|(domain, cookies)| {
                cookies.iter().map(|(name, cookie)| CookieRecord {
                    domain: domain.clone(),
                    path: cookie.path.clone(),
                    name: name.clone(),
                    value: cookie.value.clone(),
                })
            })
            .collect();
        records.sort_by(|a, b| (&a.domain, &a.name).cmp(&(&b.domain, &b.name)));
        records
    }

    /// Merge records into the live store. A record with the same domain and
    /// name overwrites the existing cookie; everything else is preserved.
    pub fn merge(&self, records: Vec<CookieRecord>) {
        let mut guard = self
            .inner
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        for record in records {
            guard
                .entry(normalize_domain(&record.domain))
                .or_default()
                .insert(
                    record.name,
                    StoredCookie {
                        value: record.value,
                        path: record.path,
                    },
                );
        }
    }
}

impl reqwest::cookie::CookieStore for CookieJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        for header in cookie_headers {
            let Ok(raw) = std::str::from_utf8(header.as_bytes()) else {
                continue;
            };
            let Ok(parsed) = cookie::Cookie::parse(raw) else {
                tracing::debug!(target: "session.cookies", "unparseable set-cookie header");
                continue;
            };
            let domain = parsed
                .domain()
                .map(str::to_string)
                .or_else(|| url.host_str().map(str::to_string));
            let Some(domain) = domain else { continue };
            self.insert(
                &domain,
                parsed.path().unwrap_or("/"),
                parsed.name(),
                parsed.value(),
            );
        }
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        let host = url.host_str()?;
        let request_path = url.path();
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let mut pairs: Vec<String> = guard
            .iter()
            .filter(|(domain, _)| domain_matches(domain, host))
            .flat_map(|(_, cookies)| cookies.iter())
            .filter(|(_, cookie)| path_matches(&cookie.path, request_path))
            .map(|(name, cookie)| format!("{}={}", name, cookie.value))
            .collect();
        if pairs.is_empty() {
            return None;
        }
        pairs.sort();
        HeaderValue::from_str(&pairs.join("; ")).ok()
    }
}

fn normalize_domain(domain: &str) -> String {
    domain.trim_start_matches('.').to_ascii_lowercase()
}

/// RFC 6265 domain matching: exact host, or the host is a subdomain of the
/// stored domain.
fn domain_matches(stored: &str, host: &str) -> bool {
    let host = host.to_ascii_lowercase();
    host == stored || host.ends_with(&format!(".{stored}"))
}

fn path_matches(stored: &str, request_path: &str) -> bool {
    request_path.starts_with(stored)
        || stored.trim_end_matches('/') == request_path
}
