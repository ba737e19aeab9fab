// Extractor module - URL canonicalization, listings and stream resolution

pub mod collector;
pub mod config;
pub mod diagnostics;
pub mod errors;
pub mod fetch;
pub mod format_selector;
pub mod http;
pub mod linkhandler;
pub mod models;
pub mod resolver;
pub mod services;
pub mod traits;

pub use collector::InfoItemsCollector;
pub use config::{ExtractorConfig, ExtractorContext};
pub use diagnostics::{PolicyGate, UnavailableReason};
pub use errors::{ExtractionError, Result};
pub use fetch::{FetchCell, FetchState};
pub use format_selector::FormatSelector;
pub use http::ReqwestDownloader;
pub use linkhandler::{LinkHandler, LinkHandlerFactory};
pub use models::{
    ChannelInfoItem, DeliveryMethod, InfoItem, MediaFormat, Page, PlaylistInfoItem, Scope,
    StreamDescriptor, StreamInfoItem, StreamType, UNKNOWN_COUNT, UNKNOWN_DURATION,
};
pub use resolver::StreamResolver;
pub use traits::{
    ChannelSource, ClientIdProvider, Downloader, Extractor, ListSource, PlaylistSource, Request,
    Response, SearchSource, StaticClientId, StreamSource,
};
