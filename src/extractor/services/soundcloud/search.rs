use async_trait::async_trait;

use super::SoundcloudClient;
use crate::extractor::errors::Result;
use crate::extractor::linkhandler::{append_query, LinkHandler};
use crate::extractor::models::Page;
use crate::extractor::resolver::API_V2_URL;
use crate::extractor::traits::{Extractor, ListSource, SearchSource};

/// Mixed track/user/playlist search. Nothing to fetch up front; every page is
/// one API call.
pub struct SoundcloudSearchExtractor {
    client: SoundcloudClient,
    target: LinkHandler,
}

impl SoundcloudSearchExtractor {
    pub fn new(client: SoundcloudClient, target: LinkHandler) -> Self {
        Self { client, target }
    }
}

#[async_trait]
impl Extractor for SoundcloudSearchExtractor {
    fn target(&self) -> &LinkHandler {
        &self.target
    }

    /// Searches keep no document between calls: every page, the first
    /// included, is its own request.
    async fn fetch(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl ListSource for SoundcloudSearchExtractor {
    async fn initial_page(&self) -> Result<Page> {
        let endpoint = append_query(&format!("{}/search", API_V2_URL), "q", self.query());
        self.client
            .collection_page(&self.client.listing_url(&endpoint))
            .await
    }

    async fn page(&self, token: &str) -> Result<Page> {
        self.client.collection_page(token).await
    }
}

impl SearchSource for SoundcloudSearchExtractor {}
