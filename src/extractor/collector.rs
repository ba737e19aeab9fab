// InfoItemsCollector - turns listing candidates into InfoItems
//
// One malformed entry must not sink the page: required-field failures are
// recorded and collection continues, optional fields fall back to sentinels.

use tracing::{debug, warn};

use super::errors::{ExtractionError, Result};
use super::models::{
    ChannelInfoItem, InfoItem, Page, PlaylistInfoItem, StreamInfoItem, StreamType, UNKNOWN_COUNT,
    UNKNOWN_DURATION,
};
use super::traits::{
    ChannelInfoItemExtractor, InfoItemExtractor, ItemKind, PlaylistInfoItemExtractor,
    StreamInfoItemExtractor,
};

/// Ordered accumulator for one page; not shared between producers
#[derive(Debug, Default)]
pub struct InfoItemsCollector {
    items: Vec<InfoItem>,
    errors: Vec<ExtractionError>,
}

impl InfoItemsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Realize one candidate; on failure record the error and carry on
    pub fn commit(&mut self, candidate: &dyn InfoItemExtractor) {
        match realize(candidate) {
            Ok(item) => self.items.push(item),
            Err(e) => {
                warn!(error = %e, "skipping malformed listing entry");
                self.errors.push(e);
            }
        }
    }

    /// Record a failure that happened before a candidate could be built
    pub fn record_error(&mut self, error: ExtractionError) {
        warn!(error = %error, "listing entry could not be decoded");
        self.errors.push(error);
    }

    /// Clear items and errors, e.g. before retrying the same page
    pub fn reset(&mut self) {
        self.items.clear();
        self.errors.clear();
    }

    pub fn items(&self) -> &[InfoItem] {
        &self.items
    }

    pub fn errors(&self) -> &[ExtractionError] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_page(self, next_page_token: Option<String>) -> Page {
        Page {
            items: self.items,
            next_page_token: next_page_token.filter(|t| !t.is_empty()),
            errors: self.errors,
        }
    }
}

fn realize(candidate: &dyn InfoItemExtractor) -> Result<InfoItem> {
    let kind = candidate.kind()?;
    let name = candidate.name()?;
    let url = candidate.url()?;
    if url.trim().is_empty() {
        return Err(ExtractionError::missing_field("url"));
    }
    let thumbnail_url = optional(candidate.thumbnail_url(), "thumbnail_url", String::new());

    let item = match kind {
        ItemKind::Stream(fields) => InfoItem::Stream(realize_stream(fields, name, url, thumbnail_url)),
        ItemKind::Channel(fields) => {
            InfoItem::Channel(realize_channel(fields, name, url, thumbnail_url))
        }
        ItemKind::Playlist(fields) => {
            InfoItem::Playlist(realize_playlist(fields, name, url, thumbnail_url))
        }
    };
    Ok(item)
}

fn realize_stream(
    fields: &dyn StreamInfoItemExtractor,
    name: String,
    url: String,
    thumbnail_url: String,
) -> StreamInfoItem {
    StreamInfoItem {
        name,
        url,
        thumbnail_url,
        duration: optional(fields.duration(), "duration", UNKNOWN_DURATION),
        view_count: optional(fields.view_count(), "view_count", UNKNOWN_COUNT),
        uploader_name: optional(fields.uploader_name(), "uploader_name", String::new()),
        uploader_url: optional(fields.uploader_url(), "uploader_url", String::new()),
        textual_upload_date: optional(
            fields.textual_upload_date(),
            "textual_upload_date",
            String::new(),
        ),
        upload_date: optional(fields.upload_date(), "upload_date", None),
        stream_type: optional(fields.stream_type(), "stream_type", StreamType::None),
    }
}

fn realize_channel(
    fields: &dyn ChannelInfoItemExtractor,
    name: String,
    url: String,
    thumbnail_url: String,
) -> ChannelInfoItem {
    ChannelInfoItem {
        name,
        url,
        thumbnail_url,
        description: optional(fields.description(), "description", String::new()),
        subscriber_count: optional(fields.subscriber_count(), "subscriber_count", UNKNOWN_COUNT),
        stream_count: optional(fields.stream_count(), "stream_count", UNKNOWN_COUNT),
    }
}

fn realize_playlist(
    fields: &dyn PlaylistInfoItemExtractor,
    name: String,
    url: String,
    thumbnail_url: String,
) -> PlaylistInfoItem {
    PlaylistInfoItem {
        name,
        url,
        thumbnail_url,
        uploader_name: optional(fields.uploader_name(), "uploader_name", String::new()),
        stream_count: optional(fields.stream_count(), "stream_count", UNKNOWN_COUNT),
    }
}

fn optional<T>(value: Result<T>, field: &str, fallback: T) -> T {
    value.unwrap_or_else(|e| {
        debug!(field, error = %e, "optional field unavailable, using sentinel");
        fallback
    })
}
