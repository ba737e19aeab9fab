// Common data models for extracted items, streams and pages

use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;

use super::errors::ExtractionError;

/// Sentinel for counts the platform did not report
pub const UNKNOWN_COUNT: i64 = -1;

/// Sentinel for durations the platform did not report
pub const UNKNOWN_DURATION: i64 = -1;

/// Content scope a URL or identifier belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Stream,
    Channel,
    Playlist,
    Search,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stream => write!(f, "stream"),
            Self::Channel => write!(f, "channel"),
            Self::Playlist => write!(f, "playlist"),
            Self::Search => write!(f, "search"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamType {
    AudioStream,
    VideoStream,
    LiveStream,
    #[default]
    None,
}

/// A stream entry in a listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamInfoItem {
    pub name: String,
    pub url: String,
    pub thumbnail_url: String,
    /// Seconds, or `UNKNOWN_DURATION`
    pub duration: i64,
    pub view_count: i64,
    pub uploader_name: String,
    pub uploader_url: String,
    pub textual_upload_date: String,
    #[serde(with = "time::serde::rfc3339::option", default)]
    pub upload_date: Option<OffsetDateTime>,
    pub stream_type: StreamType,
}

/// A channel (artist, label, user) entry in a listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelInfoItem {
    pub name: String,
    pub url: String,
    pub thumbnail_url: String,
    pub description: String,
    pub subscriber_count: i64,
    pub stream_count: i64,
}

/// A playlist (album, set, mix) entry in a listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistInfoItem {
    pub name: String,
    pub url: String,
    pub thumbnail_url: String,
    pub uploader_name: String,
    pub stream_count: i64,
}

/// Polymorphic listing entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "infoType", rename_all = "lowercase")]
pub enum InfoItem {
    Stream(StreamInfoItem),
    Channel(ChannelInfoItem),
    Playlist(PlaylistInfoItem),
}

impl InfoItem {
    pub fn name(&self) -> &str {
        match self {
            Self::Stream(s) => &s.name,
            Self::Channel(c) => &c.name,
            Self::Playlist(p) => &p.name,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            Self::Stream(s) => &s.url,
            Self::Channel(c) => &c.url,
            Self::Playlist(p) => &p.url,
        }
    }

    pub fn thumbnail_url(&self) -> &str {
        match self {
            Self::Stream(s) => &s.thumbnail_url,
            Self::Channel(c) => &c.thumbnail_url,
            Self::Playlist(p) => &p.thumbnail_url,
        }
    }

    pub fn scope(&self) -> Scope {
        match self {
            Self::Stream(_) => Scope::Stream,
            Self::Channel(_) => Scope::Channel,
            Self::Playlist(_) => Scope::Playlist,
        }
    }
}

/// Audio container/codec recognized from an upstream preset tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MediaFormat {
    Mp3,
    Opus,
}

impl MediaFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Mp3 => "audio/mpeg",
            Self::Opus => "audio/ogg",
        }
    }
}

impl fmt::Display for MediaFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mp3 => write!(f, "MP3"),
            Self::Opus => write!(f, "OPUS"),
        }
    }
}

/// How the resolved URL delivers media
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMethod {
    Progressive,
    Hls,
    #[default]
    Unknown,
}

impl DeliveryMethod {
    pub fn from_protocol(protocol: Option<&str>) -> Self {
        match protocol {
            Some("progressive") => Self::Progressive,
            Some(p) if p.contains("hls") => Self::Hls,
            _ => Self::Unknown,
        }
    }
}

/// A playable, short-lived stream URL
///
/// The URL expires after a platform-defined window; never cache it beyond a
/// single playback session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    pub url: String,
    pub format: MediaFormat,
    /// Declared per format, not measured
    pub bitrate: u32,
    pub delivery: DeliveryMethod,
}

/// One page of a listing plus the cursor for the next
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub items: Vec<InfoItem>,
    /// Opaque; `None` means no further pages
    pub next_page_token: Option<String>,
    /// Per-item failures recorded while building `items`
    #[serde(skip)]
    pub errors: Vec<ExtractionError>,
}

impl Page {
    pub fn new(items: Vec<InfoItem>, next_page_token: Option<String>) -> Self {
        Self {
            items,
            next_page_token,
            errors: Vec::new(),
        }
    }

    /// Terminal page with no items
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn has_next_page(&self) -> bool {
        self.next_page_token
            .as_deref()
            .map_or(false, |t| !t.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_page_is_terminal() {
        let page = Page::empty();
        assert!(page.items.is_empty());
        assert!(!page.has_next_page());
    }

    #[test]
    fn test_empty_token_counts_as_absent() {
        let page = Page::new(Vec::new(), Some(String::new()));
        assert!(!page.has_next_page());
    }

    #[test]
    fn test_page_serializes_with_camel_case_token() {
        let page = Page::new(
            vec![InfoItem::Channel(ChannelInfoItem {
                name: "Zach Benson".to_string(),
                url: "https://zachbenson.bandcamp.com".to_string(),
                thumbnail_url: String::new(),
                description: "Nowhere".to_string(),
                subscriber_count: UNKNOWN_COUNT,
                stream_count: UNKNOWN_COUNT,
            })],
            None,
        );
        let json = serde_json::to_value(&page).unwrap();
        assert!(json["nextPageToken"].is_null());
        assert_eq!(json["items"][0]["infoType"], "channel");
        assert_eq!(json["items"][0]["subscriberCount"], -1);
        assert!(json.get("errors").is_none());
    }

    #[test]
    fn test_delivery_from_protocol() {
        assert_eq!(
            DeliveryMethod::from_protocol(Some("progressive")),
            DeliveryMethod::Progressive
        );
        assert_eq!(DeliveryMethod::from_protocol(Some("hls")), DeliveryMethod::Hls);
        assert_eq!(
            DeliveryMethod::from_protocol(Some("encrypted-hls")),
            DeliveryMethod::Hls
        );
        assert_eq!(DeliveryMethod::from_protocol(None), DeliveryMethod::Unknown);
    }
}
