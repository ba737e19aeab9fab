// SoundCloud service
//
// Page URLs are turned into API objects through the `resolve` endpoint; every
// API call carries the client id supplied by the ClientIdProvider.

pub mod channel;
pub mod items;
pub mod links;
pub mod playlist;
pub mod search;
pub mod stream;

use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::debug;

use crate::extractor::collector::InfoItemsCollector;
use crate::extractor::config::ExtractorContext;
use crate::extractor::errors::Result;
use crate::extractor::linkhandler::{append_query, LinkHandlerFactory};
use crate::extractor::models::Page;
use crate::extractor::resolver::{StreamResolver, API_V2_URL};
use crate::extractor::traits::ClientIdProvider;

pub use channel::SoundcloudChannelExtractor;
pub use links::{
    SoundcloudChannelLinks, SoundcloudPlaylistLinks, SoundcloudSearchLinks, SoundcloudStreamLinks,
};
pub use playlist::SoundcloudPlaylistExtractor;
pub use search::SoundcloudSearchExtractor;
pub use stream::SoundcloudStreamExtractor;

use items::{collect_items, ApiCollection};

/// Shared collaborators for every SoundCloud extractor
#[derive(Clone)]
pub struct SoundcloudClient {
    ctx: ExtractorContext,
    client_id: Arc<dyn ClientIdProvider>,
}

impl SoundcloudClient {
    pub fn new(ctx: ExtractorContext, client_id: Arc<dyn ClientIdProvider>) -> Self {
        Self { ctx, client_id }
    }

    pub fn context(&self) -> &ExtractorContext {
        &self.ctx
    }

    pub fn resolver(&self) -> StreamResolver {
        StreamResolver::new(&self.ctx, self.client_id.clone())
    }

    pub fn stream_extractor(&self, url: &str) -> Result<SoundcloudStreamExtractor> {
        let target = SoundcloudStreamLinks.from_url(url)?;
        Ok(SoundcloudStreamExtractor::new(self.clone(), target))
    }

    pub fn channel_extractor(&self, url: &str) -> Result<SoundcloudChannelExtractor> {
        let target = SoundcloudChannelLinks.from_url(url)?;
        Ok(SoundcloudChannelExtractor::new(self.clone(), target))
    }

    pub fn playlist_extractor(&self, url: &str) -> Result<SoundcloudPlaylistExtractor> {
        let target = SoundcloudPlaylistLinks.from_url(url)?;
        Ok(SoundcloudPlaylistExtractor::new(self.clone(), target))
    }

    pub fn search_extractor(&self, query: &str) -> Result<SoundcloudSearchExtractor> {
        let target = SoundcloudSearchLinks.from_id(query)?;
        Ok(SoundcloudSearchExtractor::new(self.clone(), target))
    }

    /// GET an API URL with the client id appended and decode the body
    pub(crate) async fn api_get<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let client_id = self.client_id.client_id().await?;
        let url = append_query(url, "client_id", &client_id);
        debug!(url = %url, "soundcloud api request");
        self.ctx.downloader.get(&url).await?.ensure_success()?.json()
    }

    /// Turn a public page URL into its API object
    pub(crate) async fn resolve<T: DeserializeOwned>(&self, page_url: &str) -> Result<T> {
        let url = append_query(&format!("{}/resolve", API_V2_URL), "url", page_url);
        self.api_get(&url).await
    }

    /// One page of a `collection` + `next_href` listing
    pub(crate) async fn collection_page(&self, url: &str) -> Result<Page> {
        let listing: ApiCollection = self.api_get(url).await?;
        let mut collector = InfoItemsCollector::new();
        collect_items(&mut collector, listing.collection);
        Ok(collector.into_page(listing.next_href))
    }

    /// First-page URL for a listing endpoint, sized from configuration
    pub(crate) fn listing_url(&self, endpoint: &str) -> String {
        append_query(
            endpoint,
            "limit",
            &self.ctx.config.page_size.max(1).to_string(),
        )
    }

    pub(crate) fn page_size(&self) -> usize {
        self.ctx.config.page_size.max(1) as usize
    }
}
