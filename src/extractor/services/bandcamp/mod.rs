// Bandcamp service: link handlers for every scope, search over the HTML site

pub mod links;
pub mod search;

use crate::extractor::config::ExtractorContext;
use crate::extractor::errors::Result;
use crate::extractor::linkhandler::LinkHandlerFactory;

pub use links::{BandcampChannelLinks, BandcampPlaylistLinks, BandcampSearchLinks, BandcampStreamLinks};
pub use search::BandcampSearchExtractor;

#[derive(Clone)]
pub struct BandcampClient {
    ctx: ExtractorContext,
}

impl BandcampClient {
    pub fn new(ctx: ExtractorContext) -> Self {
        Self { ctx }
    }

    pub fn search_extractor(&self, query: &str) -> Result<BandcampSearchExtractor> {
        let target = BandcampSearchLinks.from_id(query)?;
        Ok(BandcampSearchExtractor::new(self.ctx.clone(), target))
    }

    /// Search extractor for a `bandcamp.com/search?q=` URL
    pub fn search_extractor_for_url(&self, url: &str) -> Result<BandcampSearchExtractor> {
        let target = BandcampSearchLinks.from_url(url)?;
        Ok(BandcampSearchExtractor::new(self.ctx.clone(), target))
    }
}
