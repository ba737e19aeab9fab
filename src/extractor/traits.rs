// Collaborator and capability traits
//
// - Downloader / ClientIdProvider: injected collaborators (transport, credentials)
// - *InfoItemExtractor: one listing entry, realized into an InfoItem by the collector
// - Extractor + per-scope sources: what a platform implements once per scope

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use time::OffsetDateTime;

use super::errors::{ExtractionError, Result};
use super::linkhandler::LinkHandler;
use super::models::{Page, StreamDescriptor, StreamType, UNKNOWN_COUNT, UNKNOWN_DURATION};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// Outgoing HTTP request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl Request {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            headers: Vec::new(),
            body: Some(body),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Response as seen by the extraction core
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: String,
    /// Header names are lowercase
    pub headers: HashMap<String, Vec<String>>,
    /// Final URL after redirects
    pub latest_url: String,
}

impl Response {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            headers: HashMap::new(),
            latest_url: String::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Non-2xx becomes a `Network` failure
    pub fn ensure_success(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ExtractionError::http_status(self.status, &self.latest_url))
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Decode the body; a mismatch is upstream drift, not a transport failure
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body).map_err(ExtractionError::from)
    }
}

/// Transport collaborator. The core never retries or pools connections itself.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Downloader: Send + Sync {
    async fn execute(&self, request: Request) -> Result<Response>;
}

impl dyn Downloader {
    pub async fn get(&self, url: &str) -> Result<Response> {
        self.execute(Request::get(url)).await
    }

    pub async fn get_with_headers(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<Response> {
        let request = headers
            .iter()
            .fold(Request::get(url), |req, (k, v)| req.with_header(*k, *v));
        self.execute(request).await
    }

    pub async fn post(&self, url: &str, body: Vec<u8>) -> Result<Response> {
        self.execute(Request::post(url, body)).await
    }
}

/// Supplies the rotating client id appended to API requests
#[async_trait]
pub trait ClientIdProvider: Send + Sync {
    async fn client_id(&self) -> Result<String>;
}

/// Fixed client id, e.g. from configuration
#[derive(Debug, Clone)]
pub struct StaticClientId(pub String);

#[async_trait]
impl ClientIdProvider for StaticClientId {
    async fn client_id(&self) -> Result<String> {
        if self.0.trim().is_empty() {
            return Err(ExtractionError::extraction("Empty client id"));
        }
        Ok(self.0.clone())
    }
}

// ---------------------------------------------------------------------------
// Listing entries
// ---------------------------------------------------------------------------

/// Variant view of a listing entry
pub enum ItemKind<'a> {
    Stream(&'a dyn StreamInfoItemExtractor),
    Channel(&'a dyn ChannelInfoItemExtractor),
    Playlist(&'a dyn PlaylistInfoItemExtractor),
}

/// One candidate entry on a listing page.
///
/// `kind`, `name` and `url` are required: a failure rejects the entry.
/// Everything else is best-effort and falls back to a sentinel.
pub trait InfoItemExtractor {
    fn kind(&self) -> Result<ItemKind<'_>>;
    fn name(&self) -> Result<String>;
    fn url(&self) -> Result<String>;
    fn thumbnail_url(&self) -> Result<String> {
        Ok(String::new())
    }
}

pub trait StreamInfoItemExtractor {
    /// Seconds
    fn duration(&self) -> Result<i64> {
        Ok(UNKNOWN_DURATION)
    }
    fn view_count(&self) -> Result<i64> {
        Ok(UNKNOWN_COUNT)
    }
    fn uploader_name(&self) -> Result<String> {
        Ok(String::new())
    }
    fn uploader_url(&self) -> Result<String> {
        Ok(String::new())
    }
    fn textual_upload_date(&self) -> Result<String> {
        Ok(String::new())
    }
    fn upload_date(&self) -> Result<Option<OffsetDateTime>> {
        Ok(None)
    }
    fn stream_type(&self) -> Result<StreamType> {
        Ok(StreamType::None)
    }
}

pub trait ChannelInfoItemExtractor {
    fn description(&self) -> Result<String> {
        Ok(String::new())
    }
    fn subscriber_count(&self) -> Result<i64> {
        Ok(UNKNOWN_COUNT)
    }
    fn stream_count(&self) -> Result<i64> {
        Ok(UNKNOWN_COUNT)
    }
}

pub trait PlaylistInfoItemExtractor {
    fn uploader_name(&self) -> Result<String> {
        Ok(String::new())
    }
    fn stream_count(&self) -> Result<i64> {
        Ok(UNKNOWN_COUNT)
    }
}

// ---------------------------------------------------------------------------
// Sources, one capability trait per scope
// ---------------------------------------------------------------------------

/// Lifecycle shared by every extractor: one target, at most one fetch.
#[async_trait]
pub trait Extractor: Send + Sync {
    fn target(&self) -> &LinkHandler;

    /// Idempotent: later calls replay the first outcome without network I/O
    async fn fetch(&self) -> Result<()>;

    fn url(&self) -> &str {
        &self.target().url
    }

    fn original_url(&self) -> &str {
        &self.target().original_url
    }
}

/// Paginated listing
#[async_trait]
pub trait ListSource: Extractor {
    async fn initial_page(&self) -> Result<Page>;

    /// `token` is whatever a previous page returned; never parse it
    async fn page(&self, token: &str) -> Result<Page>;
}

#[async_trait]
pub trait StreamSource: Extractor {
    fn id(&self) -> Result<String>;
    fn name(&self) -> Result<String>;
    fn description(&self) -> Result<String>;
    fn thumbnail_url(&self) -> Result<String>;
    fn textual_upload_date(&self) -> Result<String>;
    fn upload_date(&self) -> Result<Option<OffsetDateTime>>;
    /// Seconds
    fn length(&self) -> Result<i64>;
    fn view_count(&self) -> Result<i64>;
    fn like_count(&self) -> Result<i64>;
    fn uploader_name(&self) -> Result<String>;
    fn uploader_url(&self) -> Result<String>;
    fn uploader_avatar_url(&self) -> Result<String>;
    fn stream_type(&self) -> StreamType;

    async fn audio_streams(&self) -> Result<Vec<StreamDescriptor>>;
    async fn related_streams(&self) -> Result<Page>;
}

pub trait ChannelSource: ListSource {
    fn name(&self) -> Result<String>;
    fn avatar_url(&self) -> Result<String>;
    fn banner_url(&self) -> Result<String>;
    fn description(&self) -> Result<String>;
    fn subscriber_count(&self) -> Result<i64>;
}

pub trait PlaylistSource: ListSource {
    fn name(&self) -> Result<String>;
    fn thumbnail_url(&self) -> Result<String>;
    fn uploader_name(&self) -> Result<String>;
    fn uploader_url(&self) -> Result<String>;
    fn stream_count(&self) -> Result<i64>;
}

pub trait SearchSource: ListSource {
    fn query(&self) -> &str {
        &self.target().id
    }

    fn search_suggestion(&self) -> Result<Option<String>> {
        Ok(None)
    }
}
