use async_trait::async_trait;
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::items::{collect_tracks, parse_date, ApiCollection, ApiTrack};
use super::SoundcloudClient;
use crate::extractor::collector::InfoItemsCollector;
use crate::extractor::errors::{ExtractionError, Result};
use crate::extractor::fetch::FetchCell;
use crate::extractor::linkhandler::LinkHandler;
use crate::extractor::models::{Page, StreamDescriptor, StreamType, UNKNOWN_COUNT};
use crate::extractor::resolver::API_V2_URL;
use crate::extractor::traits::{Extractor, StreamSource};

pub struct SoundcloudStreamExtractor {
    client: SoundcloudClient,
    target: LinkHandler,
    track: FetchCell<ApiTrack>,
}

impl SoundcloudStreamExtractor {
    pub fn new(client: SoundcloudClient, target: LinkHandler) -> Self {
        Self {
            client,
            target,
            track: FetchCell::new(),
        }
    }

    async fn load(&self) -> Result<ApiTrack> {
        let track: ApiTrack = if self.target.id.bytes().all(|b| b.is_ascii_digit()) {
            self.client
                .api_get(&format!("{}/tracks/{}", API_V2_URL, self.target.id))
                .await?
        } else {
            self.client.resolve(&self.target.url).await?
        };

        self.client
            .context()
            .config
            .policy_gate()
            .check(track.policy.as_deref())?;
        info!(id = ?track.id, "fetched soundcloud track");
        Ok(track)
    }

    fn track(&self) -> Result<&ApiTrack> {
        self.track.get()
    }

    /// Like `audio_streams`, abandoning the second hops once `cancel` fires
    pub async fn audio_streams_with_cancel(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<StreamDescriptor>> {
        self.fetch().await?;
        let metadata = self.track()?.metadata();
        self.client.resolver().streams_from(&metadata, cancel).await
    }
}

#[async_trait]
impl Extractor for SoundcloudStreamExtractor {
    fn target(&self) -> &LinkHandler {
        &self.target
    }

    async fn fetch(&self) -> Result<()> {
        self.track.get_or_fetch(|| self.load()).await.map(|_| ())
    }
}

#[async_trait]
impl StreamSource for SoundcloudStreamExtractor {
    fn id(&self) -> Result<String> {
        self.track()?
            .id
            .map(|id| id.to_string())
            .ok_or_else(|| ExtractionError::missing_field("id"))
    }

    fn name(&self) -> Result<String> {
        self.track()?
            .title
            .clone()
            .ok_or_else(|| ExtractionError::missing_field("title"))
    }

    fn description(&self) -> Result<String> {
        Ok(self.track()?.description.clone().unwrap_or_default())
    }

    fn thumbnail_url(&self) -> Result<String> {
        Ok(self.track()?.artwork())
    }

    fn textual_upload_date(&self) -> Result<String> {
        Ok(self.track()?.created_at.clone().unwrap_or_default())
    }

    fn upload_date(&self) -> Result<Option<OffsetDateTime>> {
        self.track()?
            .created_at
            .as_deref()
            .map(parse_date)
            .transpose()
    }

    fn length(&self) -> Result<i64> {
        Ok(self.track()?.duration.unwrap_or(0) / 1000)
    }

    fn view_count(&self) -> Result<i64> {
        Ok(self.track()?.playback_count.unwrap_or(UNKNOWN_COUNT))
    }

    fn like_count(&self) -> Result<i64> {
        Ok(self.track()?.likes_count.unwrap_or(UNKNOWN_COUNT))
    }

    fn uploader_name(&self) -> Result<String> {
        Ok(self.track()?.uploader_name())
    }

    fn uploader_url(&self) -> Result<String> {
        Ok(self.track()?.uploader_url())
    }

    fn uploader_avatar_url(&self) -> Result<String> {
        Ok(self.track()?.uploader_avatar_url())
    }

    fn stream_type(&self) -> StreamType {
        StreamType::AudioStream
    }

    async fn audio_streams(&self) -> Result<Vec<StreamDescriptor>> {
        self.audio_streams_with_cancel(&CancellationToken::new())
            .await
    }

    async fn related_streams(&self) -> Result<Page> {
        self.fetch().await?;
        let id = self.id()?;
        let endpoint = format!("{}/tracks/{}/related", API_V2_URL, id);
        let listing: ApiCollection = self
            .client
            .api_get(&self.client.listing_url(&endpoint))
            .await?;

        let mut collector = InfoItemsCollector::new();
        collect_tracks(&mut collector, listing.collection);
        // related tracks are a single suggestion batch
        Ok(collector.into_page(None))
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::client;
    use super::*;
    use crate::extractor::diagnostics::UnavailableReason;
    use crate::extractor::models::MediaFormat;
    use crate::extractor::traits::{MockDownloader, Response};

    const TRACK: &str = r#"{
        "kind": "track",
        "id": 309689103,
        "title": "15 - Ps Uzi Ps",
        "description": "Luv Is Rage 2",
        "permalink_url": "https://soundcloud.com/liluzivert/15-ps-uzi-ps",
        "artwork_url": null,
        "duration": 215000,
        "playback_count": 1200,
        "likes_count": 30,
        "created_at": "2017-04-14T13:02:49Z",
        "policy": "ALLOW",
        "streamable": true,
        "user": {
            "username": "LIL UZI VERT",
            "permalink_url": "https://soundcloud.com/liluzivert",
            "avatar_url": "https://i1.sndcdn.com/avatars-large.jpg"
        },
        "media": {"transcodings": [
            {"url": "https://api-v2.soundcloud.com/media/1/mp3/stream/progressive",
             "preset": "mp3_0_0", "format": {"protocol": "progressive"}}
        ]}
    }"#;

    fn extractor(mock: MockDownloader) -> SoundcloudStreamExtractor {
        client(mock)
            .stream_extractor("https://soundcloud.com/liluzivert/15-ps-uzi-ps")
            .unwrap()
    }

    #[tokio::test]
    async fn test_accessors_before_fetch_are_not_ready() {
        let extractor = extractor(MockDownloader::new());
        assert!(matches!(extractor.name(), Err(ExtractionError::NotReady(_))));
        assert!(matches!(extractor.length(), Err(ExtractionError::NotReady(_))));
    }

    #[tokio::test]
    async fn test_fetch_is_memoized() {
        let mut mock = MockDownloader::new();
        mock.expect_execute()
            .withf(|req| req.url.contains("/resolve?url="))
            .times(1)
            .returning(|_| Ok(Response::new(200, TRACK)));
        let extractor = extractor(mock);

        extractor.fetch().await.unwrap();
        extractor.fetch().await.unwrap();

        assert_eq!(extractor.id().unwrap(), "309689103");
        assert_eq!(extractor.name().unwrap(), "15 - Ps Uzi Ps");
        assert_eq!(extractor.length().unwrap(), 215);
        assert_eq!(extractor.like_count().unwrap(), 30);
        assert_eq!(
            extractor.thumbnail_url().unwrap(),
            "https://i1.sndcdn.com/avatars-crop.jpg"
        );
        assert_eq!(extractor.uploader_name().unwrap(), "LIL UZI VERT");
        assert_eq!(extractor.upload_date().unwrap().map(|d| d.year()), Some(2017));
        assert_eq!(extractor.stream_type(), StreamType::AudioStream);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_replayed_without_io() {
        let mut mock = MockDownloader::new();
        mock.expect_execute()
            .times(1)
            .returning(|_| Ok(Response::new(500, "")));
        let extractor = extractor(mock);

        let first = extractor.fetch().await.unwrap_err();
        let second = extractor.fetch().await.unwrap_err();
        assert_eq!(first, second);
        assert_eq!(extractor.name().unwrap_err(), first);
    }

    #[tokio::test]
    async fn test_blocked_track_is_unavailable_at_fetch() {
        let blocked = TRACK.replace(r#""policy": "ALLOW""#, r#""policy": "SNIP""#);
        let mut mock = MockDownloader::new();
        mock.expect_execute()
            .times(1)
            .returning(move |_| Ok(Response::new(200, blocked.clone())));
        let extractor = extractor(mock);

        match extractor.fetch().await {
            Err(ExtractionError::ContentUnavailable { reason, .. }) => {
                assert_eq!(reason, UnavailableReason::PreviewOnly)
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_audio_streams_use_held_metadata() {
        let mut mock = MockDownloader::new();
        mock.expect_execute().times(2).returning(|req| {
            if req.url.contains("/resolve?url=") {
                Ok(Response::new(200, TRACK))
            } else {
                Ok(Response::new(200, r#"{"url": "https://cdn/track.mp3"}"#))
            }
        });
        let extractor = extractor(mock);

        let streams = extractor.audio_streams().await.unwrap();
        assert_eq!(streams.len(), 1);
        assert_eq!(streams[0].format, MediaFormat::Mp3);
        assert_eq!(streams[0].url, "https://cdn/track.mp3");
    }

    #[tokio::test]
    async fn test_numeric_target_skips_resolve() {
        let mut mock = MockDownloader::new();
        mock.expect_execute()
            .withf(|req| req.url.starts_with("https://api-v2.soundcloud.com/tracks/309689103?"))
            .times(1)
            .returning(|_| Ok(Response::new(200, TRACK)));
        let extractor = client(mock)
            .stream_extractor("https://api.soundcloud.com/tracks/309689103")
            .unwrap();
        extractor.fetch().await.unwrap();
        assert_eq!(extractor.name().unwrap(), "15 - Ps Uzi Ps");
    }

    #[tokio::test]
    async fn test_related_streams() {
        let mut mock = MockDownloader::new();
        mock.expect_execute().times(2).returning(|req| {
            if req.url.contains("/related") {
                Ok(Response::new(
                    200,
                    r#"{"collection": [
                        {"kind": "track", "title": "a", "permalink_url": "https://soundcloud.com/x/a"},
                        {"kind": "track", "title": "b"}
                    ]}"#,
                ))
            } else {
                Ok(Response::new(200, TRACK))
            }
        });
        let page = extractor(mock).related_streams().await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.errors.len(), 1);
        assert!(!page.has_next_page());
    }
}
