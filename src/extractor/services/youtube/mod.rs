// YouTube service: mix playlists only

pub mod links;
pub mod mix;

use crate::extractor::config::ExtractorContext;
use crate::extractor::errors::{ExtractionError, Result};
use crate::extractor::linkhandler::LinkHandlerFactory;

pub use links::YoutubePlaylistLinks;
pub use mix::YoutubeMixExtractor;

#[derive(Clone)]
pub struct YoutubeClient {
    ctx: ExtractorContext,
}

impl YoutubeClient {
    pub fn new(ctx: ExtractorContext) -> Self {
        Self { ctx }
    }

    /// Extractor for a mix (`list=RD...`); regular playlists are refused
    pub fn mix_extractor(&self, url: &str) -> Result<YoutubeMixExtractor> {
        let target = YoutubePlaylistLinks.from_url(url)?;
        if !links::is_mix(&target.id) {
            return Err(ExtractionError::NotFound(format!(
                "{} is a regular playlist, not a mix",
                url
            )));
        }
        Ok(YoutubeMixExtractor::new(self.ctx.clone(), target))
    }
}
