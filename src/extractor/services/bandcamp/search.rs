// Bandcamp search over the HTML results page
//
// Each `.searchresult` block declares its kind in `.itemtype`:
//   TRACK -> stream, ALBUM -> playlist, ARTIST / LABEL / FAN -> channel
// A block without a declared kind is recorded as an error, never guessed.

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use crate::extractor::collector::InfoItemsCollector;
use crate::extractor::config::ExtractorContext;
use crate::extractor::errors::{ExtractionError, Result};
use crate::extractor::linkhandler::LinkHandler;
use crate::extractor::models::{Page, StreamType, UNKNOWN_COUNT};
use crate::extractor::traits::{
    ChannelInfoItemExtractor, Extractor, InfoItemExtractor, ItemKind, ListSource,
    PlaylistInfoItemExtractor, SearchSource, StreamInfoItemExtractor,
};

lazy_static::lazy_static! {
    static ref RESULT_SEL: Selector = Selector::parse(".searchresult").unwrap();
    static ref ITEMTYPE_SEL: Selector = Selector::parse(".result-info .itemtype").unwrap();
    static ref HEADING_SEL: Selector = Selector::parse(".result-info .heading").unwrap();
    static ref SUBHEAD_SEL: Selector = Selector::parse(".result-info .subhead").unwrap();
    static ref ITEMURL_SEL: Selector = Selector::parse(".result-info .itemurl").unwrap();
    static ref LENGTH_SEL: Selector = Selector::parse(".result-info .length").unwrap();
    static ref ART_SEL: Selector = Selector::parse(".art img").unwrap();
    static ref NEXT_SEL: Selector = Selector::parse("a.next").unwrap();
}

/// Text content with whitespace collapsed
fn text_of(root: &ElementRef<'_>, selector: &Selector) -> Option<String> {
    root.select(selector)
        .next()
        .map(|e| e.text().collect::<Vec<_>>().join(" "))
        .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|t| !t.is_empty())
}

/// One result block, detached from the parsed document
#[derive(Debug, Clone, Default)]
pub struct SearchResult {
    itemtype: Option<String>,
    heading: Option<String>,
    subhead: Option<String>,
    url: Option<String>,
    image: Option<String>,
    length: Option<String>,
}

impl SearchResult {
    fn from_element(block: &ElementRef<'_>) -> Self {
        Self {
            itemtype: text_of(block, &ITEMTYPE_SEL).map(|t| t.to_ascii_uppercase()),
            heading: text_of(block, &HEADING_SEL),
            subhead: text_of(block, &SUBHEAD_SEL),
            url: text_of(block, &ITEMURL_SEL),
            image: block
                .select(&ART_SEL)
                .next()
                .and_then(|img| img.value().attr("src"))
                .map(str::to_string),
            length: text_of(block, &LENGTH_SEL),
        }
    }

    /// Artist from "from {album} by {artist}" or "by {artist}"
    fn artist(&self) -> String {
        let subhead = self.subhead.as_deref().unwrap_or_default();
        match subhead.rsplit_once("by ") {
            Some((_, artist)) => artist.trim().to_string(),
            None => String::new(),
        }
    }

    fn artist_page(&self) -> String {
        self.url
            .as_deref()
            .and_then(|u| Url::parse(u).ok())
            .map(|u| u.origin().ascii_serialization())
            .unwrap_or_default()
    }
}

impl InfoItemExtractor for SearchResult {
    fn kind(&self) -> Result<ItemKind<'_>> {
        match self.itemtype.as_deref() {
            Some("TRACK") => Ok(ItemKind::Stream(self)),
            Some("ALBUM") => Ok(ItemKind::Playlist(self)),
            Some("ARTIST") | Some("LABEL") | Some("FAN") => Ok(ItemKind::Channel(self)),
            Some(other) => Err(ExtractionError::extraction(format!(
                "Undeclared itemtype {:?}",
                other
            ))),
            None => Err(ExtractionError::missing_field("itemtype")),
        }
    }

    fn name(&self) -> Result<String> {
        self.heading
            .clone()
            .ok_or_else(|| ExtractionError::missing_field("heading"))
    }

    fn url(&self) -> Result<String> {
        self.url
            .clone()
            .ok_or_else(|| ExtractionError::missing_field("itemurl"))
    }

    fn thumbnail_url(&self) -> Result<String> {
        Ok(self.image.clone().unwrap_or_default())
    }
}

impl StreamInfoItemExtractor for SearchResult {
    fn uploader_name(&self) -> Result<String> {
        Ok(self.artist())
    }

    fn uploader_url(&self) -> Result<String> {
        Ok(self.artist_page())
    }

    fn stream_type(&self) -> Result<StreamType> {
        Ok(StreamType::AudioStream)
    }
}

impl PlaylistInfoItemExtractor for SearchResult {
    fn uploader_name(&self) -> Result<String> {
        Ok(self.artist())
    }

    /// "10 tracks, 41 minutes"
    fn stream_count(&self) -> Result<i64> {
        Ok(self
            .length
            .as_deref()
            .and_then(|l| l.split_whitespace().next())
            .and_then(|n| n.parse().ok())
            .unwrap_or(UNKNOWN_COUNT))
    }
}

impl ChannelInfoItemExtractor for SearchResult {
    /// Artists show their location as subhead
    fn description(&self) -> Result<String> {
        Ok(self.subhead.clone().unwrap_or_default())
    }
}

/// Collect every result block and the absolute URL of the next page
pub fn parse_results(html: &str, page_url: &str) -> (InfoItemsCollector, Option<String>) {
    let document = Html::parse_document(html);
    let mut collector = InfoItemsCollector::new();

    for block in document.select(&RESULT_SEL) {
        collector.commit(&SearchResult::from_element(&block));
    }

    let next = document
        .select(&NEXT_SEL)
        .next()
        .and_then(|a| a.value().attr("href"))
        .and_then(|href| Url::parse(page_url).ok()?.join(href).ok())
        .map(|u| u.to_string());

    (collector, next)
}

pub struct BandcampSearchExtractor {
    ctx: ExtractorContext,
    target: LinkHandler,
}

impl BandcampSearchExtractor {
    pub fn new(ctx: ExtractorContext, target: LinkHandler) -> Self {
        Self { ctx, target }
    }

    async fn results_page(&self, page_url: &str) -> Result<Page> {
        let response = self.ctx.downloader.get(page_url).await?.ensure_success()?;
        let (collector, next) = parse_results(&response.body, page_url);
        debug!(
            items = collector.len(),
            errors = collector.errors().len(),
            "parsed bandcamp search page"
        );
        Ok(collector.into_page(next))
    }
}

#[async_trait]
impl Extractor for BandcampSearchExtractor {
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
impl ListSource for BandcampSearchExtractor {
    async fn initial_page(&self) -> Result<Page> {
        self.results_page(&self.target.url).await
    }

    async fn page(&self, token: &str) -> Result<Page> {
        self.results_page(token).await
    }
}

impl SearchSource for BandcampSearchExtractor {}
