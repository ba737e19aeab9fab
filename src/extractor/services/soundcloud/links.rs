// SoundCloud link handlers
//
//   stream    soundcloud.com/{user}/{track}[/s-{secret}]   id "user/track[/s-secret]"
//             api.soundcloud.com/tracks/{n}                id "n" (positive)
//   channel   soundcloud.com/{user}[/{tab}]                id "user"
//   playlist  soundcloud.com/{user}/sets/{slug}[/s-{secret}]  id "user/sets/slug[/s-secret]"
//   search    soundcloud.com/search?q={query}              id "query"

use regex::Regex;

use crate::extractor::errors::Result;
use crate::extractor::linkhandler::{
    append_query, invalid_id, normalized_host, not_found, parse_url, path_segments, query_param,
    LinkHandlerFactory,
};
use crate::extractor::models::Scope;

pub const WEB_URL: &str = "https://soundcloud.com";
pub const API_URL: &str = "https://api.soundcloud.com";

/// First path segments that are site pages, not users
const RESERVED_USERS: &[&str] = &[
    "discover",
    "stream",
    "search",
    "upload",
    "you",
    "charts",
    "pages",
    "settings",
    "messages",
    "notifications",
    "terms-of-use",
    "mobile",
    "tags",
    "popular",
    "people",
    "jobs",
    "imprint",
];

/// Second path segments that are profile tabs, not tracks
const CHANNEL_TABS: &[&str] = &[
    "tracks",
    "albums",
    "sets",
    "reposts",
    "likes",
    "followers",
    "following",
    "comments",
    "popular-tracks",
    "spotlight",
];

lazy_static::lazy_static! {
    static ref SLUG_RE: Regex = Regex::new(r"^[A-Za-z0-9_-]+$").unwrap();
    static ref SECRET_RE: Regex = Regex::new(r"^s-[A-Za-z0-9]+$").unwrap();
    static ref TRACK_ID_RE: Regex =
        Regex::new(r"^([A-Za-z0-9_-]+)/([A-Za-z0-9_-]+)(?:/(s-[A-Za-z0-9]+))?$").unwrap();
    static ref PLAYLIST_ID_RE: Regex =
        Regex::new(r"^([A-Za-z0-9_-]+)/sets/([A-Za-z0-9_-]+)(?:/(s-[A-Za-z0-9]+))?$").unwrap();
}

fn is_user(segment: &str) -> bool {
    SLUG_RE.is_match(segment) && !RESERVED_USERS.contains(&segment.to_ascii_lowercase().as_str())
}

fn is_tab(segment: &str) -> bool {
    CHANNEL_TABS.contains(&segment.to_ascii_lowercase().as_str())
}

fn is_track_slug(segment: &str) -> bool {
    SLUG_RE.is_match(segment) && !is_tab(segment)
}

/// Path segments of a soundcloud.com page URL
fn site_segments(url: &str, scope: Scope) -> Result<Vec<String>> {
    let parsed = parse_url(url).map_err(|_| not_found(url, scope))?;
    match normalized_host(&parsed).as_deref() {
        Some("soundcloud.com") => Ok(path_segments(&parsed)),
        _ => Err(not_found(url, scope)),
    }
}

fn positive_id(value: &str) -> Option<u64> {
    if !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse::<u64>().ok().filter(|n| *n > 0)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SoundcloudStreamLinks;

impl LinkHandlerFactory for SoundcloudStreamLinks {
    fn scope(&self) -> Scope {
        Scope::Stream
    }

    fn id_of(&self, url: &str) -> Result<String> {
        let parsed = parse_url(url).map_err(|_| not_found(url, Scope::Stream))?;
        let host = normalized_host(&parsed).unwrap_or_default();
        let segments = path_segments(&parsed);

        if host == "api.soundcloud.com" || host == "api-v2.soundcloud.com" {
            return match segments.as_slice() {
                [tracks, n] if tracks == "tracks" => positive_id(n)
                    .map(|n| n.to_string())
                    .ok_or_else(|| not_found(url, Scope::Stream)),
                _ => Err(not_found(url, Scope::Stream)),
            };
        }
        if host != "soundcloud.com" {
            return Err(not_found(url, Scope::Stream));
        }

        match segments.as_slice() {
            [user, track] if is_user(user) && is_track_slug(track) => {
                Ok(format!("{}/{}", user, track))
            }
            [user, track, secret]
                if is_user(user) && is_track_slug(track) && SECRET_RE.is_match(secret) =>
            {
                Ok(format!("{}/{}/{}", user, track, secret))
            }
            _ => Err(not_found(url, Scope::Stream)),
        }
    }

    fn url_of(&self, id: &str) -> Result<String> {
        if let Some(n) = positive_id(id) {
            return Ok(format!("{}/tracks/{}", API_URL, n));
        }
        match TRACK_ID_RE.captures(id) {
            Some(caps) if is_user(&caps[1]) && is_track_slug(&caps[2]) => {
                Ok(format!("{}/{}", WEB_URL, id))
            }
            _ => Err(invalid_id(id, Scope::Stream)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SoundcloudChannelLinks;

impl LinkHandlerFactory for SoundcloudChannelLinks {
    fn scope(&self) -> Scope {
        Scope::Channel
    }

    fn id_of(&self, url: &str) -> Result<String> {
        let segments = site_segments(url, Scope::Channel)?;
        match segments.as_slice() {
            [user] if is_user(user) => Ok(user.clone()),
            [user, tab] if is_user(user) && is_tab(tab) => Ok(user.clone()),
            _ => Err(not_found(url, Scope::Channel)),
        }
    }

    fn url_of(&self, id: &str) -> Result<String> {
        if is_user(id) {
            Ok(format!("{}/{}", WEB_URL, id))
        } else {
            Err(invalid_id(id, Scope::Channel))
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SoundcloudPlaylistLinks;

impl LinkHandlerFactory for SoundcloudPlaylistLinks {
    fn scope(&self) -> Scope {
        Scope::Playlist
    }

    fn id_of(&self, url: &str) -> Result<String> {
        let segments = site_segments(url, Scope::Playlist)?;
        match segments.as_slice() {
            [user, sets, slug] if is_user(user) && sets == "sets" && SLUG_RE.is_match(slug) => {
                Ok(format!("{}/sets/{}", user, slug))
            }
            [user, sets, slug, secret]
                if is_user(user)
                    && sets == "sets"
                    && SLUG_RE.is_match(slug)
                    && SECRET_RE.is_match(secret) =>
            {
                Ok(format!("{}/sets/{}/{}", user, slug, secret))
            }
            _ => Err(not_found(url, Scope::Playlist)),
        }
    }

    fn url_of(&self, id: &str) -> Result<String> {
        match PLAYLIST_ID_RE.captures(id) {
            Some(caps) if is_user(&caps[1]) => Ok(format!("{}/{}", WEB_URL, id)),
            _ => Err(invalid_id(id, Scope::Playlist)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SoundcloudSearchLinks;

impl LinkHandlerFactory for SoundcloudSearchLinks {
    fn scope(&self) -> Scope {
        Scope::Search
    }

    fn id_of(&self, url: &str) -> Result<String> {
        let parsed = parse_url(url).map_err(|_| not_found(url, Scope::Search))?;
        if normalized_host(&parsed).as_deref() != Some("soundcloud.com") {
            return Err(not_found(url, Scope::Search));
        }
        let segments = path_segments(&parsed);
        if segments.first().map(String::as_str) != Some("search") {
            return Err(not_found(url, Scope::Search));
        }
        query_param(&parsed, "q")
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| not_found(url, Scope::Search))
    }

    fn url_of(&self, id: &str) -> Result<String> {
        if id.trim().is_empty() {
            return Err(invalid_id(id, Scope::Search));
        }
        Ok(append_query(&format!("{}/search", WEB_URL), "q", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::errors::ExtractionError;
    use rstest::rstest;

    #[rstest]
    #[case("https://soundcloud.com/liluzivert/15-ps-uzi-ps", "liluzivert/15-ps-uzi-ps")]
    #[case("soundcloud.com/liluzivert/15-ps-uzi-ps?in=playlist", "liluzivert/15-ps-uzi-ps")]
    #[case("https://m.soundcloud.com/liluzivert/15-ps-uzi-ps/", "liluzivert/15-ps-uzi-ps")]
    #[case("https://www.soundcloud.com/user/track/s-AbC123", "user/track/s-AbC123")]
    #[case("https://api.soundcloud.com/tracks/309689103", "309689103")]
    fn test_stream_ids(#[case] url: &str, #[case] id: &str) {
        assert_eq!(SoundcloudStreamLinks.id_of(url).unwrap(), id);
    }

    #[rstest]
    #[case("https://soundcloud.com/liluzivert")]
    #[case("https://soundcloud.com/liluzivert/tracks")]
    #[case("https://soundcloud.com/liluzivert/sets/the-perfect-luv-tape")]
    #[case("https://soundcloud.com/discover/sets/weekly")]
    #[case("https://api.soundcloud.com/tracks/0")]
    #[case("https://youtube.com/watch?v=abc")]
    fn test_stream_rejects(#[case] url: &str) {
        assert!(matches!(
            SoundcloudStreamLinks.id_of(url),
            Err(ExtractionError::NotFound(_))
        ));
    }

    #[rstest]
    #[case("0")]
    #[case("-12")]
    #[case("abc")]
    #[case("discover/track")]
    #[case("user/likes")]
    fn test_stream_invalid_ids(#[case] id: &str) {
        assert!(matches!(
            SoundcloudStreamLinks.url_of(id),
            Err(ExtractionError::InvalidId(_))
        ));
    }

    #[test]
    fn test_numeric_id_maps_to_api_url() {
        assert_eq!(
            SoundcloudStreamLinks.url_of("42").unwrap(),
            "https://api.soundcloud.com/tracks/42"
        );
    }

    #[rstest]
    #[case("https://soundcloud.com/liluzivert/15-ps-uzi-ps?utm_source=x")]
    #[case("https://api.soundcloud.com/tracks/309689103")]
    #[case("https://soundcloud.com/user/track/s-AbC123")]
    fn test_stream_round_trip(#[case] url: &str) {
        let handler = SoundcloudStreamLinks.from_url(url).unwrap();
        let again = SoundcloudStreamLinks.from_url(&handler.url).unwrap();
        assert_eq!(again.id, handler.id);
        assert_eq!(again.url, handler.url);
    }

    #[rstest]
    #[case("https://soundcloud.com/liluzivert", "liluzivert")]
    #[case("https://soundcloud.com/liluzivert/", "liluzivert")]
    #[case("https://soundcloud.com/liluzivert/albums", "liluzivert")]
    #[case("https://m.soundcloud.com/liluzivert/reposts", "liluzivert")]
    fn test_channel_ids(#[case] url: &str, #[case] id: &str) {
        assert_eq!(SoundcloudChannelLinks.id_of(url).unwrap(), id);
        assert_eq!(
            SoundcloudChannelLinks.url_of(id).unwrap(),
            format!("https://soundcloud.com/{}", id)
        );
    }

    #[rstest]
    #[case("https://soundcloud.com/discover")]
    #[case("https://soundcloud.com/search?q=x")]
    #[case("https://soundcloud.com/")]
    fn test_channel_rejects_site_pages(#[case] url: &str) {
        assert!(!SoundcloudChannelLinks.accepts(url));
    }

    #[rstest]
    #[case("https://soundcloud.com/user/sets/my-list", "user/sets/my-list")]
    #[case("https://soundcloud.com/user/sets/my-list/s-Xy12", "user/sets/my-list/s-Xy12")]
    fn test_playlist_ids(#[case] url: &str, #[case] id: &str) {
        assert_eq!(SoundcloudPlaylistLinks.id_of(url).unwrap(), id);
        let canonical = SoundcloudPlaylistLinks.url_of(id).unwrap();
        assert_eq!(canonical, format!("https://soundcloud.com/{}", id));
        assert_eq!(SoundcloudPlaylistLinks.id_of(&canonical).unwrap(), id);
    }

    #[test]
    fn test_private_playlist_keeps_secret() {
        let handler = SoundcloudPlaylistLinks
            .from_url("https://m.soundcloud.com/user/sets/my-list/s-Xy12?si=abc")
            .unwrap();
        assert_eq!(handler.url, "https://soundcloud.com/user/sets/my-list/s-Xy12");
        assert!(!SoundcloudPlaylistLinks.accepts("https://soundcloud.com/user/sets/my-list/extra"));
    }

    #[test]
    fn test_playlist_invalid_id() {
        assert!(matches!(
            SoundcloudPlaylistLinks.url_of("user/my-list"),
            Err(ExtractionError::InvalidId(_))
        ));
    }

    #[test]
    fn test_search_round_trip() {
        let url = SoundcloudSearchLinks.url_of("daft punk").unwrap();
        assert_eq!(url, "https://soundcloud.com/search?q=daft+punk");
        assert_eq!(SoundcloudSearchLinks.id_of(&url).unwrap(), "daft punk");
        assert!(matches!(
            SoundcloudSearchLinks.url_of(" "),
            Err(ExtractionError::InvalidId(_))
        ));
    }

    /// Each URL is accepted by exactly one scope
    #[rstest]
    #[case("https://soundcloud.com/user/track", Scope::Stream)]
    #[case("https://api.soundcloud.com/tracks/7", Scope::Stream)]
    #[case("https://soundcloud.com/user", Scope::Channel)]
    #[case("https://soundcloud.com/user/likes", Scope::Channel)]
    #[case("https://soundcloud.com/user/sets/list", Scope::Playlist)]
    #[case("https://soundcloud.com/search?q=house", Scope::Search)]
    fn test_scopes_are_disjoint(#[case] url: &str, #[case] expected: Scope) {
        let factories: [&dyn LinkHandlerFactory; 4] = [
            &SoundcloudStreamLinks,
            &SoundcloudChannelLinks,
            &SoundcloudPlaylistLinks,
            &SoundcloudSearchLinks,
        ];
        let accepted: Vec<Scope> = factories
            .iter()
            .filter(|f| f.accepts(url))
            .map(|f| f.scope())
            .collect();
        assert_eq!(accepted, vec![expected]);
    }
}
