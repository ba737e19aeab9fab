// SoundCloud API wire model
//
// Every field is optional on the wire; required-vs-optional is decided by the
// item extractor impls below, not by serde.

use serde::Deserialize;
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::extractor::collector::InfoItemsCollector;
use crate::extractor::errors::{ExtractionError, Result};
use crate::extractor::models::{StreamType, UNKNOWN_COUNT, UNKNOWN_DURATION};
use crate::extractor::resolver::{Media, TrackMetadata};
use crate::extractor::traits::{
    ChannelInfoItemExtractor, InfoItemExtractor, ItemKind, PlaylistInfoItemExtractor,
    StreamInfoItemExtractor,
};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiUser {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub permalink_url: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub followers_count: Option<i64>,
    #[serde(default)]
    pub track_count: Option<i64>,
    #[serde(default)]
    pub visuals: Option<Visuals>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Visuals {
    #[serde(default)]
    pub visuals: Vec<Visual>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Visual {
    #[serde(default)]
    pub visual_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiTrack {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub permalink_url: Option<String>,
    #[serde(default)]
    pub artwork_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Milliseconds
    #[serde(default)]
    pub duration: Option<i64>,
    #[serde(default)]
    pub playback_count: Option<i64>,
    #[serde(default, alias = "favoritings_count")]
    pub likes_count: Option<i64>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub user: Option<ApiUser>,
    #[serde(default)]
    pub policy: Option<String>,
    #[serde(default)]
    pub streamable: Option<bool>,
    #[serde(default)]
    pub media: Option<Media>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiPlaylist {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub permalink_url: Option<String>,
    #[serde(default)]
    pub artwork_url: Option<String>,
    #[serde(default)]
    pub user: Option<ApiUser>,
    #[serde(default)]
    pub track_count: Option<i64>,
    /// Full track objects first, then id-only stubs
    #[serde(default)]
    pub tracks: Vec<Value>,
}

/// Listing entry, discriminated by `kind`
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ApiItem {
    Track(ApiTrack),
    User(ApiUser),
    Playlist(ApiPlaylist),
    /// Anything else upstream mixes in (e.g. system playlists)
    #[serde(other)]
    Unsupported,
}

/// Paged listing envelope
#[derive(Debug, Default, Deserialize)]
pub struct ApiCollection {
    #[serde(default)]
    pub collection: Vec<Value>,
    #[serde(default)]
    pub next_href: Option<String>,
}

/// Artwork URLs point at the 100x100 variant; `crop` is the largest square
pub fn better_artwork(url: &str) -> String {
    url.replace("large.jpg", "crop.jpg")
}

pub fn parse_date(textual: &str) -> Result<OffsetDateTime> {
    OffsetDateTime::parse(textual, &Rfc3339)
        .map_err(|e| ExtractionError::extraction(format!("Could not parse date {:?}: {}", textual, e)))
}

impl ApiTrack {
    /// Artwork, falling back to the uploader's avatar
    pub fn artwork(&self) -> String {
        let artwork = self
            .artwork_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .or_else(|| self.user.as_ref().and_then(|u| u.avatar_url.as_deref()))
            .unwrap_or_default();
        better_artwork(artwork)
    }

    pub fn uploader_name(&self) -> String {
        self.user
            .as_ref()
            .and_then(|u| u.username.clone())
            .unwrap_or_default()
    }

    pub fn uploader_url(&self) -> String {
        self.user
            .as_ref()
            .and_then(|u| u.permalink_url.clone())
            .unwrap_or_default()
    }

    pub fn uploader_avatar_url(&self) -> String {
        self.user
            .as_ref()
            .and_then(|u| u.avatar_url.clone())
            .unwrap_or_default()
    }

    pub fn metadata(&self) -> TrackMetadata {
        TrackMetadata {
            id: self.id,
            title: self.title.clone(),
            duration: self.duration,
            policy: self.policy.clone(),
            streamable: self.streamable,
            media: self.media.clone(),
        }
    }
}

impl InfoItemExtractor for ApiTrack {
    fn kind(&self) -> Result<ItemKind<'_>> {
        Ok(ItemKind::Stream(self))
    }

    fn name(&self) -> Result<String> {
        self.title
            .clone()
            .ok_or_else(|| ExtractionError::missing_field("title"))
    }

    fn url(&self) -> Result<String> {
        self.permalink_url
            .clone()
            .ok_or_else(|| ExtractionError::missing_field("permalink_url"))
    }

    fn thumbnail_url(&self) -> Result<String> {
        Ok(self.artwork())
    }
}

impl StreamInfoItemExtractor for ApiTrack {
    fn duration(&self) -> Result<i64> {
        Ok(self.duration.map_or(UNKNOWN_DURATION, |ms| ms / 1000))
    }

    fn view_count(&self) -> Result<i64> {
        Ok(self.playback_count.unwrap_or(UNKNOWN_COUNT))
    }

    fn uploader_name(&self) -> Result<String> {
        Ok(ApiTrack::uploader_name(self))
    }

    fn uploader_url(&self) -> Result<String> {
        Ok(ApiTrack::uploader_url(self))
    }

    fn textual_upload_date(&self) -> Result<String> {
        Ok(self.created_at.clone().unwrap_or_default())
    }

    fn upload_date(&self) -> Result<Option<OffsetDateTime>> {
        self.created_at.as_deref().map(parse_date).transpose()
    }

    fn stream_type(&self) -> Result<StreamType> {
        Ok(StreamType::AudioStream)
    }
}

impl ApiUser {
    pub fn banner(&self) -> String {
        self.visuals
            .as_ref()
            .and_then(|v| v.visuals.first())
            .and_then(|v| v.visual_url.clone())
            .unwrap_or_default()
    }
}

impl InfoItemExtractor for ApiUser {
    fn kind(&self) -> Result<ItemKind<'_>> {
        Ok(ItemKind::Channel(self))
    }

    fn name(&self) -> Result<String> {
        self.username
            .clone()
            .ok_or_else(|| ExtractionError::missing_field("username"))
    }

    fn url(&self) -> Result<String> {
        self.permalink_url
            .clone()
            .ok_or_else(|| ExtractionError::missing_field("permalink_url"))
    }

    fn thumbnail_url(&self) -> Result<String> {
        Ok(better_artwork(self.avatar_url.as_deref().unwrap_or_default()))
    }
}

impl ChannelInfoItemExtractor for ApiUser {
    fn description(&self) -> Result<String> {
        Ok(self.description.clone().unwrap_or_default())
    }

    fn subscriber_count(&self) -> Result<i64> {
        Ok(self.followers_count.unwrap_or(UNKNOWN_COUNT))
    }

    fn stream_count(&self) -> Result<i64> {
        Ok(self.track_count.unwrap_or(UNKNOWN_COUNT))
    }
}

impl InfoItemExtractor for ApiPlaylist {
    fn kind(&self) -> Result<ItemKind<'_>> {
        Ok(ItemKind::Playlist(self))
    }

    fn name(&self) -> Result<String> {
        self.title
            .clone()
            .ok_or_else(|| ExtractionError::missing_field("title"))
    }

    fn url(&self) -> Result<String> {
        self.permalink_url
            .clone()
            .ok_or_else(|| ExtractionError::missing_field("permalink_url"))
    }

    fn thumbnail_url(&self) -> Result<String> {
        let artwork = self
            .artwork_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .or_else(|| self.user.as_ref().and_then(|u| u.avatar_url.as_deref()))
            .unwrap_or_default();
        Ok(better_artwork(artwork))
    }
}

impl PlaylistInfoItemExtractor for ApiPlaylist {
    fn uploader_name(&self) -> Result<String> {
        Ok(self
            .user
            .as_ref()
            .and_then(|u| u.username.clone())
            .unwrap_or_default())
    }

    fn stream_count(&self) -> Result<i64> {
        Ok(self.track_count.unwrap_or(UNKNOWN_COUNT))
    }
}

/// Commit a mixed listing (search results, related tracks)
pub fn collect_items(collector: &mut InfoItemsCollector, entries: Vec<Value>) {
    for entry in entries {
        match serde_json::from_value::<ApiItem>(entry) {
            Ok(ApiItem::Track(track)) => collector.commit(&track),
            Ok(ApiItem::User(user)) => collector.commit(&user),
            Ok(ApiItem::Playlist(playlist)) => collector.commit(&playlist),
            Ok(ApiItem::Unsupported) => {
                collector.record_error(ExtractionError::extraction("Unsupported item kind"))
            }
            Err(e) => collector.record_error(e.into()),
        }
    }
}

/// Commit a listing known to hold only tracks
pub fn collect_tracks(collector: &mut InfoItemsCollector, entries: Vec<Value>) {
    for entry in entries {
        match serde_json::from_value::<ApiTrack>(entry) {
            Ok(track) => collector.commit(&track),
            Err(e) => collector.record_error(e.into()),
        }
    }
}
