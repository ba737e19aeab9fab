use async_trait::async_trait;

use super::items::{better_artwork, ApiUser};
use super::SoundcloudClient;
use crate::extractor::errors::{ExtractionError, Result};
use crate::extractor::fetch::FetchCell;
use crate::extractor::linkhandler::LinkHandler;
use crate::extractor::models::{Page, UNKNOWN_COUNT};
use crate::extractor::resolver::API_V2_URL;
use crate::extractor::traits::{ChannelSource, Extractor, ListSource};

/// A user profile and its uploaded tracks
pub struct SoundcloudChannelExtractor {
    client: SoundcloudClient,
    target: LinkHandler,
    user: FetchCell<ApiUser>,
}

impl SoundcloudChannelExtractor {
    pub fn new(client: SoundcloudClient, target: LinkHandler) -> Self {
        Self {
            client,
            target,
            user: FetchCell::new(),
        }
    }

    fn user(&self) -> Result<&ApiUser> {
        self.user.get()
    }

    /// Numeric user id, needed for listing endpoints
    pub fn user_id(&self) -> Result<u64> {
        self.user()?
            .id
            .ok_or_else(|| ExtractionError::missing_field("id"))
    }
}

#[async_trait]
impl Extractor for SoundcloudChannelExtractor {
    fn target(&self) -> &LinkHandler {
        &self.target
    }

    async fn fetch(&self) -> Result<()> {
        self.user
            .get_or_fetch(|| self.client.resolve::<ApiUser>(&self.target.url))
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl ListSource for SoundcloudChannelExtractor {
    async fn initial_page(&self) -> Result<Page> {
        self.fetch().await?;
        let endpoint = format!("{}/users/{}/tracks", API_V2_URL, self.user_id()?);
        self.client
            .collection_page(&self.client.listing_url(&endpoint))
            .await
    }

    async fn page(&self, token: &str) -> Result<Page> {
        self.client.collection_page(token).await
    }
}

impl ChannelSource for SoundcloudChannelExtractor {
    fn name(&self) -> Result<String> {
        self.user()?
            .username
            .clone()
            .ok_or_else(|| ExtractionError::missing_field("username"))
    }

    fn avatar_url(&self) -> Result<String> {
        Ok(better_artwork(
            self.user()?.avatar_url.as_deref().unwrap_or_default(),
        ))
    }

    fn banner_url(&self) -> Result<String> {
        Ok(self.user()?.banner())
    }

    fn description(&self) -> Result<String> {
        Ok(self.user()?.description.clone().unwrap_or_default())
    }

    fn subscriber_count(&self) -> Result<i64> {
        Ok(self.user()?.followers_count.unwrap_or(UNKNOWN_COUNT))
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{client, client_with};
    use super::*;
    use crate::extractor::config::ExtractorConfig;
    use crate::extractor::traits::{MockDownloader, Response};

    const USER: &str = r#"{
        "kind": "user",
        "id": 4803918,
        "username": "LIL UZI VERT",
        "permalink_url": "https://soundcloud.com/liluzivert",
        "avatar_url": "https://i1.sndcdn.com/avatars-large.jpg",
        "followers_count": 4200000,
        "visuals": {"visuals": [{"visual_url": "https://i1.sndcdn.com/visuals-x.jpg"}]}
    }"#;

    const FIRST_PAGE: &str = r#"{
        "collection": [
            {"kind": "track", "title": "a", "permalink_url": "https://soundcloud.com/liluzivert/a"},
            {"kind": "track", "title": "b", "permalink_url": "https://soundcloud.com/liluzivert/b"}
        ],
        "next_href": "https://api-v2.soundcloud.com/users/4803918/tracks?offset=2&limit=2"
    }"#;

    const LAST_PAGE: &str = r#"{
        "collection": [
            {"kind": "track", "title": "c", "permalink_url": "https://soundcloud.com/liluzivert/c"}
        ],
        "next_href": null
    }"#;

    #[tokio::test]
    async fn test_channel_metadata() {
        let mut mock = MockDownloader::new();
        mock.expect_execute()
            .times(1)
            .returning(|_| Ok(Response::new(200, USER)));
        let extractor = client(mock)
            .channel_extractor("https://soundcloud.com/liluzivert/tracks")
            .unwrap();
        extractor.fetch().await.unwrap();
        extractor.fetch().await.unwrap();

        assert_eq!(extractor.name().unwrap(), "LIL UZI VERT");
        assert_eq!(extractor.subscriber_count().unwrap(), 4200000);
        assert_eq!(extractor.avatar_url().unwrap(), "https://i1.sndcdn.com/avatars-crop.jpg");
        assert_eq!(extractor.banner_url().unwrap(), "https://i1.sndcdn.com/visuals-x.jpg");
        assert_eq!(extractor.description().unwrap(), "");
        assert_eq!(extractor.url(), "https://soundcloud.com/liluzivert");
        assert_eq!(extractor.original_url(), "https://soundcloud.com/liluzivert/tracks");
    }

    #[tokio::test]
    async fn test_pages_follow_next_href() {
        let mut mock = MockDownloader::new();
        mock.expect_execute().times(3).returning(|req| {
            if req.url.contains("/resolve?") {
                Ok(Response::new(200, USER))
            } else if req.url.contains("offset=2") {
                Ok(Response::new(200, LAST_PAGE))
            } else {
                assert!(req.url.contains("/users/4803918/tracks?limit=2&client_id=cid"));
                Ok(Response::new(200, FIRST_PAGE))
            }
        });
        let extractor = client_with(mock, ExtractorConfig::default().with_page_size(2))
            .channel_extractor("https://soundcloud.com/liluzivert")
            .unwrap();

        let first = extractor.initial_page().await.unwrap();
        assert_eq!(first.items.len(), 2);
        let token = first.next_page_token.clone().unwrap();

        let last = extractor.page(&token).await.unwrap();
        assert_eq!(last.items.len(), 1);
        assert_eq!(last.items[0].name(), "c");
        assert!(!last.has_next_page());
    }
}
