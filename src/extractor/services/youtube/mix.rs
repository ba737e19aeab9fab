// YouTube mix (auto-generated playlist) extractor
//
// Reads the `pbj=1` JSON form of the watch page. Mixes are endless but the
// response carries no continuation, so the listing is capped to the first
// response: next_page_token is always absent and the stream count unknown.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use super::links::video_url;
use crate::extractor::collector::InfoItemsCollector;
use crate::extractor::config::ExtractorContext;
use crate::extractor::errors::{ExtractionError, Result};
use crate::extractor::fetch::FetchCell;
use crate::extractor::linkhandler::{append_query, LinkHandler};
use crate::extractor::models::{Page, StreamType, UNKNOWN_COUNT, UNKNOWN_DURATION};
use crate::extractor::traits::{
    Extractor, InfoItemExtractor, ItemKind, ListSource, PlaylistSource, StreamInfoItemExtractor,
};

const CLIENT_NAME: &str = "1";
const CLIENT_VERSION: &str = "2.20200214.04.00";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WatchResponse {
    #[serde(default)]
    contents: Option<WatchContents>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WatchContents {
    #[serde(default)]
    two_column_watch_next_results: Option<TwoColumnResults>,
}

#[derive(Debug, Default, Deserialize)]
struct TwoColumnResults {
    #[serde(default)]
    playlist: Option<PlaylistWrapper>,
}

#[derive(Debug, Default, Deserialize)]
struct PlaylistWrapper {
    #[serde(default)]
    playlist: Option<MixPlaylist>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MixPlaylist {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub playlist_id: Option<String>,
    /// `{playlistPanelVideoRenderer: {...}}` entries
    #[serde(default)]
    pub contents: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PanelEntry {
    #[serde(default)]
    playlist_panel_video_renderer: Option<PanelVideo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Text {
    #[serde(default)]
    pub simple_text: Option<String>,
    #[serde(default)]
    pub runs: Vec<TextRun>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextRun {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub navigation_endpoint: Option<NavigationEndpoint>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationEndpoint {
    #[serde(default)]
    pub browse_endpoint: Option<BrowseEndpoint>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowseEndpoint {
    #[serde(default)]
    pub browse_id: Option<String>,
}

impl Text {
    fn content(&self) -> Option<String> {
        let text = match &self.simple_text {
            Some(simple) => simple.clone(),
            None => self.runs.iter().map(|r| r.text.as_str()).collect(),
        };
        Some(text).filter(|t| !t.trim().is_empty())
    }
}

/// One entry of the mix panel
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelVideo {
    #[serde(default)]
    pub video_id: Option<String>,
    #[serde(default)]
    pub title: Option<Text>,
    #[serde(default)]
    pub length_text: Option<Text>,
    #[serde(default)]
    pub short_byline_text: Option<Text>,
}

/// "1:02:03" -> 3723
fn parse_length(text: &str) -> Option<i64> {
    text.split(':').try_fold(0i64, |total, part| {
        part.trim().parse::<i64>().ok().map(|n| total * 60 + n)
    })
}

pub fn thumbnail_for(video_id: &str) -> String {
    format!("https://i.ytimg.com/vi/{}/hqdefault.jpg", video_id)
}

impl InfoItemExtractor for PanelVideo {
    fn kind(&self) -> Result<ItemKind<'_>> {
        Ok(ItemKind::Stream(self))
    }

    fn name(&self) -> Result<String> {
        self.title
            .as_ref()
            .and_then(Text::content)
            .ok_or_else(|| ExtractionError::missing_field("title"))
    }

    fn url(&self) -> Result<String> {
        self.video_id
            .as_deref()
            .map(video_url)
            .ok_or_else(|| ExtractionError::missing_field("videoId"))
    }

    fn thumbnail_url(&self) -> Result<String> {
        Ok(self.video_id.as_deref().map(thumbnail_for).unwrap_or_default())
    }
}

impl StreamInfoItemExtractor for PanelVideo {
    fn duration(&self) -> Result<i64> {
        Ok(self
            .length_text
            .as_ref()
            .and_then(Text::content)
            .and_then(|t| parse_length(&t))
            .unwrap_or(UNKNOWN_DURATION))
    }

    fn uploader_name(&self) -> Result<String> {
        Ok(self
            .short_byline_text
            .as_ref()
            .and_then(Text::content)
            .unwrap_or_default())
    }

    fn uploader_url(&self) -> Result<String> {
        Ok(self
            .short_byline_text
            .as_ref()
            .and_then(|t| t.runs.first())
            .and_then(|r| r.navigation_endpoint.as_ref())
            .and_then(|n| n.browse_endpoint.as_ref())
            .and_then(|b| b.browse_id.as_deref())
            .map(|id| format!("https://www.youtube.com/channel/{}", id))
            .unwrap_or_default())
    }

    fn stream_type(&self) -> Result<StreamType> {
        Ok(StreamType::VideoStream)
    }
}

/// Find the watch response inside the `pbj=1` payload, which is either an
/// array of parts or a single object
fn watch_response(payload: Value) -> Result<WatchResponse> {
    let response = match payload {
        Value::Array(parts) => parts
            .into_iter()
            .find_map(|mut part| part.get_mut("response").map(Value::take)),
        Value::Object(mut object) => object.remove("response"),
        _ => None,
    }
    .ok_or_else(|| ExtractionError::missing_field("response"))?;
    Ok(serde_json::from_value(response)?)
}

fn mix_playlist(response: WatchResponse) -> Result<MixPlaylist> {
    response
        .contents
        .and_then(|c| c.two_column_watch_next_results)
        .and_then(|r| r.playlist)
        .and_then(|p| p.playlist)
        .ok_or_else(|| ExtractionError::missing_field("playlist"))
}

pub struct YoutubeMixExtractor {
    ctx: ExtractorContext,
    target: LinkHandler,
    mix: FetchCell<MixPlaylist>,
}

impl YoutubeMixExtractor {
    pub fn new(ctx: ExtractorContext, target: LinkHandler) -> Self {
        Self {
            ctx,
            target,
            mix: FetchCell::new(),
        }
    }

    async fn load(&self) -> Result<MixPlaylist> {
        let url = append_query(&self.target.url, "pbj", "1");
        let response = self
            .ctx
            .downloader
            .get_with_headers(
                &url,
                &[
                    ("X-YouTube-Client-Name", CLIENT_NAME),
                    ("X-YouTube-Client-Version", CLIENT_VERSION),
                ],
            )
            .await?
            .ensure_success()?;

        let mix = mix_playlist(watch_response(response.json()?)?)?;
        info!(
            list = %self.target.id,
            entries = mix.contents.len(),
            "fetched youtube mix"
        );
        Ok(mix)
    }

    fn mix(&self) -> Result<&MixPlaylist> {
        self.mix.get()
    }

    fn first_video_id(&self) -> Result<Option<String>> {
        Ok(self.mix()?.contents.iter().find_map(|entry| {
            entry
                .pointer("/playlistPanelVideoRenderer/videoId")
                .and_then(Value::as_str)
                .map(str::to_string)
        }))
    }
}

#[async_trait]
impl Extractor for YoutubeMixExtractor {
    fn target(&self) -> &LinkHandler {
        &self.target
    }

    async fn fetch(&self) -> Result<()> {
        self.mix.get_or_fetch(|| self.load()).await.map(|_| ())
    }
}

#[async_trait]
impl ListSource for YoutubeMixExtractor {
    async fn initial_page(&self) -> Result<Page> {
        self.fetch().await?;
        let mut collector = InfoItemsCollector::new();
        for entry in &self.mix()?.contents {
            match serde_json::from_value::<PanelEntry>(entry.clone()) {
                Ok(PanelEntry {
                    playlist_panel_video_renderer: Some(video),
                }) => collector.commit(&video),
                Ok(_) => collector.record_error(ExtractionError::extraction(
                    "Unsupported mix entry (no playlistPanelVideoRenderer)",
                )),
                Err(e) => collector.record_error(e.into()),
            }
        }
        Ok(collector.into_page(None))
    }

    /// Mixes never hand out a token, so any token is past the end
    async fn page(&self, _token: &str) -> Result<Page> {
        Ok(Page::empty())
    }
}

impl PlaylistSource for YoutubeMixExtractor {
    fn name(&self) -> Result<String> {
        self.mix()?
            .title
            .clone()
            .ok_or_else(|| ExtractionError::missing_field("title"))
    }

    fn thumbnail_url(&self) -> Result<String> {
        self.first_video_id()?
            .map(|id| thumbnail_for(&id))
            .ok_or_else(|| ExtractionError::extraction("Mix has no videos to take a thumbnail from"))
    }

    /// Mixes are generated, not uploaded
    fn uploader_name(&self) -> Result<String> {
        Ok(String::new())
    }

    fn uploader_url(&self) -> Result<String> {
        Ok(String::new())
    }

    fn stream_count(&self) -> Result<i64> {
        Ok(UNKNOWN_COUNT)
    }
}
