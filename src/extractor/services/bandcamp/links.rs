// Bandcamp link handlers
//
//   channel   {artist}.bandcamp.com[/releases|/music|...]   id "artist"
//   stream    {artist}.bandcamp.com/track/{slug}            id "artist/slug"
//   playlist  {artist}.bandcamp.com/album/{slug}            id "artist/slug"
//   search    bandcamp.com/search?q={query}                 id "query"
//
// Artists on custom domains are not recognized: telling them apart from any
// other site needs a network request.

use regex::Regex;
use url::Url;

use crate::extractor::errors::Result;
use crate::extractor::linkhandler::{
    append_query, invalid_id, normalized_host, not_found, parse_url, path_segments, query_param,
    LinkHandlerFactory,
};
use crate::extractor::models::Scope;

pub const SITE_URL: &str = "https://bandcamp.com";

/// Subdomains run by Bandcamp itself
const RESERVED_SUBDOMAINS: &[&str] = &["www", "daily", "bandcamp", "blog", "get"];

/// Artist page sections that still identify the artist
const ARTIST_SECTIONS: &[&str] = &["releases", "music", "merch", "community", "concerts", "video"];

lazy_static::lazy_static! {
    static ref SUBDOMAIN_RE: Regex = Regex::new(r"^[a-z0-9][a-z0-9-]*$").unwrap();
    static ref SLUG_RE: Regex = Regex::new(r"^[A-Za-z0-9_-]+$").unwrap();
    static ref ITEM_ID_RE: Regex = Regex::new(r"^([a-z0-9][a-z0-9-]*)/([A-Za-z0-9_-]+)$").unwrap();
}

fn is_artist(subdomain: &str) -> bool {
    SUBDOMAIN_RE.is_match(subdomain) && !RESERVED_SUBDOMAINS.contains(&subdomain)
}

/// Artist subdomain and path segments of an artist-hosted URL
fn artist_parts(url: &str, scope: Scope) -> Result<(String, Vec<String>)> {
    let parsed = parse_url(url).map_err(|_| not_found(url, scope))?;
    let host = normalized_host(&parsed).unwrap_or_default();
    match host.strip_suffix(".bandcamp.com") {
        Some(artist) if !artist.contains('.') && is_artist(artist) => {
            Ok((artist.to_string(), path_segments(&parsed)))
        }
        _ => Err(not_found(url, scope)),
    }
}

/// Shared shape of track and album links: `/{kind}/{slug}`
fn item_id(url: &str, kind: &str, scope: Scope) -> Result<String> {
    let (artist, segments) = artist_parts(url, scope)?;
    match segments.as_slice() {
        [k, slug] if k == kind && SLUG_RE.is_match(slug) => Ok(format!("{}/{}", artist, slug)),
        _ => Err(not_found(url, scope)),
    }
}

fn item_url(id: &str, kind: &str, scope: Scope) -> Result<String> {
    match ITEM_ID_RE.captures(id) {
        Some(caps) if is_artist(&caps[1]) => {
            Ok(format!("https://{}.bandcamp.com/{}/{}", &caps[1], kind, &caps[2]))
        }
        _ => Err(invalid_id(id, scope)),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BandcampChannelLinks;

impl LinkHandlerFactory for BandcampChannelLinks {
    fn scope(&self) -> Scope {
        Scope::Channel
    }

    fn id_of(&self, url: &str) -> Result<String> {
        let (artist, segments) = artist_parts(url, Scope::Channel)?;
        match segments.as_slice() {
            [] => Ok(artist),
            [section] if ARTIST_SECTIONS.contains(&section.as_str()) => Ok(artist),
            _ => Err(not_found(url, Scope::Channel)),
        }
    }

    fn url_of(&self, id: &str) -> Result<String> {
        if is_artist(id) {
            Ok(format!("https://{}.bandcamp.com", id))
        } else {
            Err(invalid_id(id, Scope::Channel))
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BandcampStreamLinks;

impl LinkHandlerFactory for BandcampStreamLinks {
    fn scope(&self) -> Scope {
        Scope::Stream
    }

    fn id_of(&self, url: &str) -> Result<String> {
        item_id(url, "track", Scope::Stream)
    }

    fn url_of(&self, id: &str) -> Result<String> {
        item_url(id, "track", Scope::Stream)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BandcampPlaylistLinks;

impl LinkHandlerFactory for BandcampPlaylistLinks {
    fn scope(&self) -> Scope {
        Scope::Playlist
    }

    fn id_of(&self, url: &str) -> Result<String> {
        item_id(url, "album", Scope::Playlist)
    }

    fn url_of(&self, id: &str) -> Result<String> {
        item_url(id, "album", Scope::Playlist)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BandcampSearchLinks;

impl BandcampSearchLinks {
    fn parse(url: &str) -> Result<Url> {
        let parsed = parse_url(url).map_err(|_| not_found(url, Scope::Search))?;
        let on_site = normalized_host(&parsed).as_deref() == Some("bandcamp.com");
        if on_site && path_segments(&parsed) == ["search"] {
            Ok(parsed)
        } else {
            Err(not_found(url, Scope::Search))
        }
    }
}

impl LinkHandlerFactory for BandcampSearchLinks {
    fn scope(&self) -> Scope {
        Scope::Search
    }

    fn id_of(&self, url: &str) -> Result<String> {
        let parsed = Self::parse(url)?;
        query_param(&parsed, "q")
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| not_found(url, Scope::Search))
    }

    fn url_of(&self, id: &str) -> Result<String> {
        if id.trim().is_empty() {
            return Err(invalid_id(id, Scope::Search));
        }
        Ok(append_query(&format!("{}/search", SITE_URL), "q", id))
    }
}
