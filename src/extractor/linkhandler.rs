// URL canonicalization: url <-> stable id, per scope
//
// Implementations are pure: no I/O, no shared state.

use serde::{Deserialize, Serialize};
use url::Url;

use super::errors::{ExtractionError, Result};
use super::models::Scope;

/// A canonicalized reference to one platform resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkHandler {
    pub scope: Scope,
    pub id: String,
    /// Canonical URL, always `url_of(id)`
    pub url: String,
    /// URL as supplied by the caller
    pub original_url: String,
}

pub trait LinkHandlerFactory: Send + Sync {
    fn scope(&self) -> Scope;

    /// Fails with `NotFound` when the URL is not in this scope
    fn id_of(&self, url: &str) -> Result<String>;

    /// Fails with `InvalidId` when `id` does not have the platform's shape
    fn url_of(&self, id: &str) -> Result<String>;

    fn accepts(&self, url: &str) -> bool {
        self.id_of(url).is_ok()
    }

    fn from_url(&self, url: &str) -> Result<LinkHandler> {
        let id = self.id_of(url)?;
        let canonical = self.url_of(&id)?;
        Ok(LinkHandler {
            scope: self.scope(),
            id,
            url: canonical,
            original_url: url.to_string(),
        })
    }

    fn from_id(&self, id: &str) -> Result<LinkHandler> {
        let canonical = self.url_of(id)?;
        Ok(LinkHandler {
            scope: self.scope(),
            id: id.to_string(),
            url: canonical.clone(),
            original_url: canonical,
        })
    }
}

/// Parse a user-supplied URL, tolerating a missing scheme
pub fn parse_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ExtractionError::NotFound("empty URL".to_string()));
    }
    let with_scheme = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else if trimmed.contains("://") {
        return Err(ExtractionError::NotFound(format!(
            "Unsupported URL scheme: {}",
            trimmed
        )));
    } else {
        format!("https://{}", trimmed)
    };
    Ok(Url::parse(&with_scheme)?)
}

/// Lowercase host with a leading `www.`/`m.` stripped
pub fn normalized_host(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_ascii_lowercase();
    let host = host
        .strip_prefix("www.")
        .or_else(|| host.strip_prefix("m."))
        .map(str::to_string)
        .unwrap_or(host);
    Some(host)
}

/// Non-empty path segments
pub fn path_segments(url: &Url) -> Vec<String> {
    url.path_segments()
        .map(|segments| {
            segments
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

pub fn query_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}

/// Append `?key=value` or `&key=value`, percent-encoding the value
pub fn append_query(base: &str, key: &str, value: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(value.as_bytes()).collect();
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{}{}{}={}", base, separator, key, encoded)
}

pub fn not_found(url: &str, scope: Scope) -> ExtractionError {
    ExtractionError::NotFound(format!("{} is not a {} URL", url, scope))
}

pub fn invalid_id(id: &str, scope: Scope) -> ExtractionError {
    ExtractionError::InvalidId(format!("{:?} is not a valid {} id", id, scope))
}
