// Playlists embed only the first few tracks in full; the rest arrive as id-only
// stubs and are fetched in batches through `tracks?ids=` continuation tokens.

use async_trait::async_trait;
use serde_json::Value;

use super::items::{collect_tracks, ApiPlaylist};
use super::SoundcloudClient;
use crate::extractor::collector::InfoItemsCollector;
use crate::extractor::errors::{ExtractionError, Result};
use crate::extractor::fetch::FetchCell;
use crate::extractor::linkhandler::{parse_url, query_param, LinkHandler};
use crate::extractor::models::{Page, UNKNOWN_COUNT};
use crate::extractor::resolver::API_V2_URL;
use crate::extractor::traits::{Extractor, ListSource, PlaylistSource};

/// Upper bound upstream accepts for `ids`
const MAX_IDS_PER_REQUEST: usize = 50;

struct PlaylistDoc {
    playlist: ApiPlaylist,
    full_tracks: Vec<Value>,
    stub_ids: Vec<u64>,
}

pub struct SoundcloudPlaylistExtractor {
    client: SoundcloudClient,
    target: LinkHandler,
    doc: FetchCell<PlaylistDoc>,
}

impl SoundcloudPlaylistExtractor {
    pub fn new(client: SoundcloudClient, target: LinkHandler) -> Self {
        Self {
            client,
            target,
            doc: FetchCell::new(),
        }
    }

    async fn load(&self) -> Result<PlaylistDoc> {
        let mut playlist: ApiPlaylist = self.client.resolve(&self.target.url).await?;

        let mut full_tracks = Vec::new();
        let mut stub_ids = Vec::new();
        for track in std::mem::take(&mut playlist.tracks) {
            if track.get("title").is_some() {
                full_tracks.push(track);
            } else if let Some(id) = track.get("id").and_then(Value::as_u64) {
                stub_ids.push(id);
            }
        }

        Ok(PlaylistDoc {
            playlist,
            full_tracks,
            stub_ids,
        })
    }

    fn playlist(&self) -> Result<&ApiPlaylist> {
        Ok(&self.doc.get()?.playlist)
    }

    fn batch_size(&self) -> usize {
        self.client.page_size().min(MAX_IDS_PER_REQUEST)
    }

    /// Stub ids in the batch starting at `start`, empty past the end
    fn batch<'a>(&self, stub_ids: &'a [u64], start: usize) -> &'a [u64] {
        let start = start.min(stub_ids.len());
        let end = (start + self.batch_size()).min(stub_ids.len());
        &stub_ids[start..end]
    }

    fn batch_url(ids: &[u64]) -> String {
        let ids: Vec<String> = ids.iter().map(u64::to_string).collect();
        format!("{}/tracks?ids={}", API_V2_URL, ids.join("%2C"))
    }

    /// Token for the stub batch starting at `start`, `None` past the end.
    /// The offset travels in the token since ids may repeat within a playlist.
    fn batch_token(&self, stub_ids: &[u64], start: usize) -> Option<String> {
        let batch = self.batch(stub_ids, start);
        if batch.is_empty() {
            return None;
        }
        Some(format!("{}&offset={}", Self::batch_url(batch), start))
    }

    /// Offset of a token this extractor handed out; anything else is refused
    fn token_offset(&self, stub_ids: &[u64], token: &str) -> Result<usize> {
        let bad_token = || {
            ExtractionError::extraction(format!("Not a playlist continuation token: {}", token))
        };
        let url = parse_url(token).map_err(|_| bad_token())?;
        let start: usize = query_param(&url, "offset")
            .and_then(|o| o.parse().ok())
            .ok_or_else(bad_token)?;
        match self.batch_token(stub_ids, start) {
            Some(expected) if expected == token => Ok(start),
            _ => Err(bad_token()),
        }
    }
}

#[async_trait]
impl Extractor for SoundcloudPlaylistExtractor {
    fn target(&self) -> &LinkHandler {
        &self.target
    }

    async fn fetch(&self) -> Result<()> {
        self.doc.get_or_fetch(|| self.load()).await.map(|_| ())
    }
}

#[async_trait]
impl ListSource for SoundcloudPlaylistExtractor {
    async fn initial_page(&self) -> Result<Page> {
        self.fetch().await?;
        let doc = self.doc.get()?;

        let mut collector = InfoItemsCollector::new();
        collect_tracks(&mut collector, doc.full_tracks.clone());
        Ok(collector.into_page(self.batch_token(&doc.stub_ids, 0)))
    }

    async fn page(&self, token: &str) -> Result<Page> {
        self.fetch().await?;
        let doc = self.doc.get()?;
        let start = self.token_offset(&doc.stub_ids, token)?;
        let batch = self.batch(&doc.stub_ids, start);

        let tracks: Vec<Value> = self.client.api_get(&Self::batch_url(batch)).await?;
        let mut collector = InfoItemsCollector::new();
        collect_tracks(&mut collector, tracks);

        let next = self.batch_token(&doc.stub_ids, start + batch.len());
        Ok(collector.into_page(next))
    }
}

impl PlaylistSource for SoundcloudPlaylistExtractor {
    fn name(&self) -> Result<String> {
        self.playlist()?
            .title
            .clone()
            .ok_or_else(|| ExtractionError::missing_field("title"))
    }

    fn thumbnail_url(&self) -> Result<String> {
        use crate::extractor::traits::InfoItemExtractor;
        InfoItemExtractor::thumbnail_url(self.playlist()?)
    }

    fn uploader_name(&self) -> Result<String> {
        Ok(self
            .playlist()?
            .user
            .as_ref()
            .and_then(|u| u.username.clone())
            .unwrap_or_default())
    }

    fn uploader_url(&self) -> Result<String> {
        Ok(self
            .playlist()?
            .user
            .as_ref()
            .and_then(|u| u.permalink_url.clone())
            .unwrap_or_default())
    }

    fn stream_count(&self) -> Result<i64> {
        Ok(self.playlist()?.track_count.unwrap_or(UNKNOWN_COUNT))
    }
}
