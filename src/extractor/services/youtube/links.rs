// YouTube playlist link handler
//
// Accepts `list=` on /playlist and /watch (plus youtu.be short links). Mix ids
// (`RD...`) only resolve on a watch page, so they canonicalize to one seeded
// by the mix's first video.

use regex::Regex;

use crate::extractor::errors::Result;
use crate::extractor::linkhandler::{
    invalid_id, normalized_host, not_found, parse_url, path_segments, query_param,
    LinkHandlerFactory,
};
use crate::extractor::models::Scope;

pub const WEB_URL: &str = "https://www.youtube.com";

lazy_static::lazy_static! {
    static ref LIST_ID_RE: Regex = Regex::new(r"^[A-Za-z0-9_-]{2,}$").unwrap();
    static ref VIDEO_ID_RE: Regex = Regex::new(r"^[A-Za-z0-9_-]{11}$").unwrap();
}

/// Auto-generated mix rather than a user playlist
pub fn is_mix(list_id: &str) -> bool {
    list_id.starts_with("RD")
}

/// Video a mix was generated from, when the id encodes one
pub fn mix_seed_video(list_id: &str) -> Option<&str> {
    ["RDAMVM", "RDMM", "RD"]
        .iter()
        .filter_map(|prefix| list_id.strip_prefix(prefix))
        .find(|rest| VIDEO_ID_RE.is_match(rest))
}

pub fn video_url(video_id: &str) -> String {
    format!("{}/watch?v={}", WEB_URL, video_id)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct YoutubePlaylistLinks;

impl LinkHandlerFactory for YoutubePlaylistLinks {
    fn scope(&self) -> Scope {
        Scope::Playlist
    }

    fn id_of(&self, url: &str) -> Result<String> {
        let parsed = parse_url(url).map_err(|_| not_found(url, Scope::Playlist))?;
        let host = normalized_host(&parsed).unwrap_or_default();
        let segments = path_segments(&parsed);

        let on_playlist_page = match host.as_str() {
            "youtube.com" | "music.youtube.com" => {
                matches!(segments.first().map(String::as_str), Some("playlist") | Some("watch"))
                    && segments.len() == 1
            }
            "youtu.be" => segments.len() == 1,
            _ => false,
        };
        if !on_playlist_page {
            return Err(not_found(url, Scope::Playlist));
        }

        query_param(&parsed, "list")
            .filter(|id| LIST_ID_RE.is_match(id))
            .ok_or_else(|| not_found(url, Scope::Playlist))
    }

    fn url_of(&self, id: &str) -> Result<String> {
        if !LIST_ID_RE.is_match(id) {
            return Err(invalid_id(id, Scope::Playlist));
        }
        if is_mix(id) {
            if let Some(video) = mix_seed_video(id) {
                return Ok(format!("{}/watch?v={}&list={}", WEB_URL, video, id));
            }
        }
        Ok(format!("{}/playlist?list={}", WEB_URL, id))
    }
}
