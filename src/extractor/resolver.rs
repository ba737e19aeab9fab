// StreamResolver - metadata hop, policy gate, per-transcoding second hop
//
// Flow:
// 1. GET track metadata                 -> Network / Extraction on failure
// 2. policy gate                        -> ContentUnavailable
// 3. streamable flag                    -> NotStreamable
//    no `media` section                 -> Extraction
// 4. per transcoding: classify preset, GET resolver URL with client_id
//    - transport or JSON failure        -> descriptor skipped
//    - `url` key missing                -> Extraction for the whole call
// 5. descriptors in enumeration order
//
// Nothing here retries. Every hop is bounded by the configured timeout and can
// be abandoned through a CancellationToken.

use futures::future::join_all;
use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::config::ExtractorContext;
use super::diagnostics::PolicyGate;
use super::errors::{ExtractionError, Result};
use super::format_selector::FormatSelector;
use super::linkhandler::append_query;
use super::models::{DeliveryMethod, StreamDescriptor};
use super::traits::{ClientIdProvider, Downloader};

pub const API_V2_URL: &str = "https://api-v2.soundcloud.com";

/// Track metadata document, only the fields resolution depends on
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TrackMetadata {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub title: Option<String>,
    /// Milliseconds
    #[serde(default)]
    pub duration: Option<i64>,
    #[serde(default)]
    pub policy: Option<String>,
    /// Absent is treated as not streamable
    #[serde(default)]
    pub streamable: Option<bool>,
    #[serde(default)]
    pub media: Option<Media>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Media {
    #[serde(default)]
    pub transcodings: Vec<Transcoding>,
}

/// Upstream pointer to one encoded variant; consumed once during resolution
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Transcoding {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub preset: Option<String>,
    #[serde(default)]
    pub format: Option<TranscodingFormat>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TranscodingFormat {
    #[serde(default)]
    pub protocol: Option<String>,
}

/// Second-hop response
#[derive(Debug, Deserialize)]
struct ResolvedUrl {
    #[serde(default)]
    url: Option<String>,
}

pub struct StreamResolver {
    downloader: Arc<dyn Downloader>,
    client_id: Arc<dyn ClientIdProvider>,
    gate: PolicyGate,
    timeout: Duration,
    parallel: bool,
}

impl StreamResolver {
    pub fn new(ctx: &ExtractorContext, client_id: Arc<dyn ClientIdProvider>) -> Self {
        Self {
            downloader: ctx.downloader.clone(),
            client_id,
            gate: ctx.config.policy_gate(),
            timeout: ctx.config.timeout(),
            parallel: ctx.config.parallel_resolution,
        }
    }

    /// Resolve playable streams for a numeric track id
    pub async fn resolve(&self, track_id: &str) -> Result<Vec<StreamDescriptor>> {
        self.resolve_with_cancel(track_id, &CancellationToken::new())
            .await
    }

    pub async fn resolve_with_cancel(
        &self,
        track_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<StreamDescriptor>> {
        let client_id = self.client_id.client_id().await?;
        let url = append_query(
            &format!("{}/tracks/{}", API_V2_URL, track_id),
            "client_id",
            &client_id,
        );

        debug!(track_id, "fetching track metadata");
        let response = self.hop(cancel, self.downloader.get(&url)).await?;
        let metadata: TrackMetadata = response.ensure_success()?.json()?;

        self.collect(&metadata, &client_id, cancel).await
    }

    /// Resolve from metadata an extractor already holds, skipping the first hop
    pub async fn streams_from(
        &self,
        metadata: &TrackMetadata,
        cancel: &CancellationToken,
    ) -> Result<Vec<StreamDescriptor>> {
        let client_id = self.client_id.client_id().await?;
        self.collect(metadata, &client_id, cancel).await
    }

    async fn collect(
        &self,
        metadata: &TrackMetadata,
        client_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<StreamDescriptor>> {
        self.gate.check(metadata.policy.as_deref())?;

        if metadata.streamable != Some(true) {
            return Err(ExtractionError::NotStreamable(format!(
                "track {} is not streamable",
                track_label(metadata)
            )));
        }

        let transcodings = match &metadata.media {
            Some(media) => &media.transcodings,
            None => {
                warn!(
                    target: "media_extractor::drift",
                    track = %track_label(metadata),
                    "metadata has no media section"
                );
                return Err(ExtractionError::missing_field("media"));
            }
        };

        let outcomes = if self.parallel {
            join_all(
                transcodings
                    .iter()
                    .map(|t| self.resolve_transcoding(t, client_id, cancel)),
            )
            .await
        } else {
            let mut outcomes = Vec::with_capacity(transcodings.len());
            for transcoding in transcodings {
                let outcome = self.resolve_transcoding(transcoding, client_id, cancel).await;
                let failed = outcome.is_err();
                outcomes.push(outcome);
                if failed {
                    break;
                }
            }
            outcomes
        };

        let mut streams = Vec::new();
        for outcome in outcomes {
            if let Some(stream) = outcome? {
                streams.push(stream);
            }
        }

        info!(
            track = %track_label(metadata),
            streams = streams.len(),
            "resolved audio streams"
        );
        Ok(streams)
    }

    /// `Ok(None)` means the descriptor was skipped
    async fn resolve_transcoding(
        &self,
        transcoding: &Transcoding,
        client_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<StreamDescriptor>> {
        let resolver_url = match transcoding.url.as_deref() {
            Some(url) if !url.is_empty() => url,
            _ => return Ok(None),
        };
        let preset = transcoding
            .preset
            .as_deref()
            .ok_or_else(|| ExtractionError::missing_field("preset"))?;
        // classified before the hop: an unknown preset would be dropped anyway
        if FormatSelector::classify(preset).is_none() {
            debug!(preset, "dropping unrecognized preset");
            return Ok(None);
        }

        let url = append_query(resolver_url, "client_id", client_id);
        let response = match self.hop(cancel, self.downloader.get(&url)).await {
            Ok(response) => response,
            Err(ExtractionError::Cancelled) => return Err(ExtractionError::Cancelled),
            Err(e) => {
                warn!(target: "media_extractor::network", preset, error = %e, "transcoding skipped");
                return Ok(None);
            }
        };
        let response = match response.ensure_success() {
            Ok(response) => response,
            Err(e) => {
                warn!(target: "media_extractor::network", preset, error = %e, "transcoding skipped");
                return Ok(None);
            }
        };

        let resolved: ResolvedUrl = match response.json() {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!(target: "media_extractor::drift", preset, error = %e, "transcoding skipped");
                return Ok(None);
            }
        };

        match resolved.url {
            None => Err(ExtractionError::missing_field("url")),
            Some(url) if url.is_empty() => {
                warn!(target: "media_extractor::drift", preset, "resolver returned an empty url");
                Ok(None)
            }
            Some(url) => {
                let delivery = DeliveryMethod::from_protocol(
                    transcoding
                        .format
                        .as_ref()
                        .and_then(|f| f.protocol.as_deref()),
                );
                Ok(FormatSelector::describe(preset, url, delivery))
            }
        }
    }

    /// One network hop: observe cancellation first, then race it against the
    /// request under the configured timeout
    async fn hop<T, F>(&self, cancel: &CancellationToken, request: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if cancel.is_cancelled() {
            return Err(ExtractionError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ExtractionError::Cancelled),
            outcome = tokio::time::timeout(self.timeout, request) => {
                outcome.unwrap_or_else(|_| {
                    Err(ExtractionError::network(format!(
                        "timed out after {}s",
                        self.timeout.as_secs()
                    )))
                })
            }
        }
    }
}

fn track_label(metadata: &TrackMetadata) -> String {
    match (metadata.id, metadata.title.as_deref()) {
        (Some(id), _) => id.to_string(),
        (None, Some(title)) => title.to_string(),
        (None, None) => "<unknown>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::config::ExtractorConfig;
    use crate::extractor::diagnostics::UnavailableReason;
    use crate::extractor::models::MediaFormat;
    use crate::extractor::traits::{MockDownloader, Request, Response, StaticClientId};
    use async_trait::async_trait;

    const MP3_HOP: &str = "https://api-v2.soundcloud.com/media/1/mp3/stream/progressive";
    const OPUS_HOP: &str = "https://api-v2.soundcloud.com/media/1/opus/stream/hls";

    fn metadata(policy: &str, streamable: bool, transcodings: &str) -> String {
        format!(
            r#"{{"id": 123, "title": "Song", "duration": 215000, "policy": "{}",
                "streamable": {}, "media": {{"transcodings": {}}}}}"#,
            policy, streamable, transcodings
        )
    }

    fn two_transcodings() -> String {
        format!(
            r#"[{{"url": "{}", "preset": "mp3_0_0", "format": {{"protocol": "progressive"}}}},
                {{"url": "{}", "preset": "opus_0_0", "format": {{"protocol": "hls"}}}}]"#,
            MP3_HOP, OPUS_HOP
        )
    }

    fn resolver_with(downloader: Arc<dyn Downloader>, config: ExtractorConfig) -> StreamResolver {
        let ctx = ExtractorContext::new(downloader, config);
        StreamResolver::new(&ctx, Arc::new(StaticClientId("cid".to_string())))
    }

    fn resolver(mock: MockDownloader) -> StreamResolver {
        resolver_with(Arc::new(mock), ExtractorConfig::default())
    }

    fn route(request: &Request, track: String, hops: &[(&str, &str)]) -> Result<Response> {
        if request.url.contains("/tracks/123") {
            return Ok(Response::new(200, track));
        }
        for (prefix, body) in hops {
            if request.url.starts_with(prefix) {
                return Ok(Response::new(200, *body));
            }
        }
        Err(ExtractionError::network(format!("unexpected {}", request.url)))
    }

    #[tokio::test]
    async fn test_two_transcodings_resolve_in_order() {
        let mut mock = MockDownloader::new();
        mock.expect_execute().times(3).returning(|req| {
            route(
                &req,
                metadata("ALLOW", true, &two_transcodings()),
                &[
                    (MP3_HOP, r#"{"url": "https://cdn/mp3"}"#),
                    (OPUS_HOP, r#"{"url": "https://cdn/opus.m3u8"}"#),
                ],
            )
        });

        let streams = resolver(mock).resolve("123").await.unwrap();
        assert_eq!(
            streams,
            vec![
                StreamDescriptor {
                    url: "https://cdn/mp3".to_string(),
                    format: MediaFormat::Mp3,
                    bitrate: 128,
                    delivery: DeliveryMethod::Progressive,
                },
                StreamDescriptor {
                    url: "https://cdn/opus.m3u8".to_string(),
                    format: MediaFormat::Opus,
                    bitrate: 128,
                    delivery: DeliveryMethod::Hls,
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_client_id_is_appended_to_every_hop() {
        let mut mock = MockDownloader::new();
        mock.expect_execute()
            .withf(|req| req.url.ends_with("client_id=cid"))
            .times(3)
            .returning(|req| {
                route(
                    &req,
                    metadata("MONETIZE", true, &two_transcodings()),
                    &[(MP3_HOP, r#"{"url": "a"}"#), (OPUS_HOP, r#"{"url": "b"}"#)],
                )
            });
        assert_eq!(resolver(mock).resolve("123").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_blocked_policy_fails_before_second_hop() {
        let mut mock = MockDownloader::new();
        mock.expect_execute()
            .times(1)
            .returning(|_| Ok(Response::new(200, metadata("BLOCK", true, &two_transcodings()))));

        match resolver(mock).resolve("123").await {
            Err(ExtractionError::ContentUnavailable { reason, .. }) => {
                assert_eq!(reason, UnavailableReason::Blocked)
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_policy_is_gated() {
        let mut mock = MockDownloader::new();
        mock.expect_execute().times(1).returning(|_| {
            Ok(Response::new(
                200,
                r#"{"id": 123, "streamable": true, "media": {"transcodings": []}}"#,
            ))
        });
        assert!(matches!(
            resolver(mock).resolve("123").await,
            Err(ExtractionError::ContentUnavailable {
                reason: UnavailableReason::Unknown,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_not_streamable_is_distinct() {
        let mut mock = MockDownloader::new();
        mock.expect_execute()
            .times(1)
            .returning(|_| Ok(Response::new(200, metadata("ALLOW", false, &two_transcodings()))));

        let err = resolver(mock).resolve("123").await.unwrap_err();
        assert!(matches!(err, ExtractionError::NotStreamable(_)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_unknown_preset_is_dropped_without_a_hop() {
        let transcodings = format!(
            r#"[{{"url": "https://api-v2.soundcloud.com/media/1/aac", "preset": "aac_160k"}},
                {{"url": "{}", "preset": "mp3_0_0"}}]"#,
            MP3_HOP
        );
        let mut mock = MockDownloader::new();
        mock.expect_execute().times(2).returning(move |req| {
            route(
                &req,
                metadata("ALLOW", true, &transcodings),
                &[(MP3_HOP, r#"{"url": "https://cdn/mp3"}"#)],
            )
        });

        let streams = resolver(mock).resolve("123").await.unwrap();
        assert_eq!(streams.len(), 1);
        assert_eq!(streams[0].format, MediaFormat::Mp3);
        assert_eq!(streams[0].delivery, DeliveryMethod::Unknown);
    }

    #[tokio::test]
    async fn test_invalid_second_hop_json_is_skipped() {
        let mut mock = MockDownloader::new();
        mock.expect_execute().times(3).returning(|req| {
            route(
                &req,
                metadata("ALLOW", true, &two_transcodings()),
                &[(MP3_HOP, "<html>rate limited</html>"), (OPUS_HOP, r#"{"url": "https://cdn/opus"}"#)],
            )
        });

        let streams = resolver(mock).resolve("123").await.unwrap();
        assert_eq!(streams.len(), 1);
        assert_eq!(streams[0].format, MediaFormat::Opus);
    }

    #[tokio::test]
    async fn test_failed_second_hop_is_skipped() {
        let mut mock = MockDownloader::new();
        mock.expect_execute().times(3).returning(|req| {
            if req.url.starts_with(MP3_HOP) {
                return Ok(Response::new(404, "gone"));
            }
            route(
                &req,
                metadata("ALLOW", true, &two_transcodings()),
                &[(OPUS_HOP, r#"{"url": "https://cdn/opus"}"#)],
            )
        });

        let streams = resolver(mock).resolve("123").await.unwrap();
        assert_eq!(streams.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_url_key_escalates() {
        let mut mock = MockDownloader::new();
        mock.expect_execute().returning(|req| {
            route(
                &req,
                metadata("ALLOW", true, &two_transcodings()),
                &[(MP3_HOP, r#"{"location": "https://cdn/mp3"}"#), (OPUS_HOP, r#"{"url": "b"}"#)],
            )
        });

        let err = resolver(mock).resolve("123").await.unwrap_err();
        assert_eq!(err, ExtractionError::missing_field("url"));
        assert!(err.is_upstream_drift());
    }

    #[tokio::test]
    async fn test_missing_preset_escalates() {
        let transcodings = format!(r#"[{{"url": "{}"}}]"#, MP3_HOP);
        let mut mock = MockDownloader::new();
        mock.expect_execute()
            .times(1)
            .returning(move |_| Ok(Response::new(200, metadata("ALLOW", true, &transcodings))));

        assert_eq!(
            resolver(mock).resolve("123").await.unwrap_err(),
            ExtractionError::missing_field("preset")
        );
    }

    #[tokio::test]
    async fn test_missing_media_fails_resolution() {
        let mut mock = MockDownloader::new();
        mock.expect_execute().times(1).returning(|_| {
            Ok(Response::new(
                200,
                r#"{"id": 1, "title": "t", "duration": 1, "policy": "ALLOW", "streamable": true}"#,
            ))
        });
        let err = resolver(mock).resolve("1").await.unwrap_err();
        assert_eq!(err, ExtractionError::missing_field("media"));
        assert!(err.is_upstream_drift());
    }

    #[tokio::test]
    async fn test_empty_transcoding_list_is_empty_result() {
        let mut mock = MockDownloader::new();
        mock.expect_execute().times(1).returning(|_| {
            Ok(Response::new(
                200,
                r#"{"id": 1, "policy": "ALLOW", "streamable": true, "media": {"transcodings": []}}"#,
            ))
        });
        assert!(resolver(mock).resolve("1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_metadata_http_error_is_network() {
        let mut mock = MockDownloader::new();
        mock.expect_execute()
            .times(1)
            .returning(|_| Ok(Response::new(401, "")));
        assert!(resolver(mock).resolve("123").await.unwrap_err().is_retryable());
    }

    #[tokio::test]
    async fn test_sequential_mode_matches_parallel_order() {
        let mut mock = MockDownloader::new();
        mock.expect_execute().times(3).returning(|req| {
            route(
                &req,
                metadata("ALLOW", true, &two_transcodings()),
                &[(MP3_HOP, r#"{"url": "a"}"#), (OPUS_HOP, r#"{"url": "b"}"#)],
            )
        });
        let resolver = resolver_with(
            Arc::new(mock),
            ExtractorConfig::default().with_parallel_resolution(false),
        );
        let urls: Vec<String> = resolver
            .resolve("123")
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.url)
            .collect();
        assert_eq!(urls, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_streams_from_held_metadata() {
        let metadata: TrackMetadata =
            serde_json::from_str(&metadata("ALLOW", true, &two_transcodings())).unwrap();
        let mut mock = MockDownloader::new();
        mock.expect_execute()
            .times(2)
            .returning(|_| Ok(Response::new(200, r#"{"url": "x"}"#)));
        let streams = resolver(mock)
            .streams_from(&metadata, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(streams.len(), 2);
    }

    /// Answers the first hop at once and delays second hops per format
    struct Delayed;

    #[async_trait]
    impl Downloader for Delayed {
        async fn execute(&self, request: Request) -> Result<Response> {
            if request.url.contains("/tracks/123") {
                return Ok(Response::new(200, metadata("ALLOW", true, &two_transcodings())));
            }
            if request.url.starts_with(MP3_HOP) {
                tokio::time::sleep(Duration::from_millis(50)).await;
                return Ok(Response::new(200, r#"{"url": "slow-mp3"}"#));
            }
            Ok(Response::new(200, r#"{"url": "fast-opus"}"#))
        }
    }

    #[tokio::test]
    async fn test_parallel_hops_keep_enumeration_order() {
        let resolver = resolver_with(Arc::new(Delayed), ExtractorConfig::default());
        let urls: Vec<String> = resolver
            .resolve("123")
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.url)
            .collect();
        assert_eq!(urls, vec!["slow-mp3", "fast-opus"]);
    }

    struct Stalled;

    #[async_trait]
    impl Downloader for Stalled {
        async fn execute(&self, _request: Request) -> Result<Response> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Response::new(200, "{}"))
        }
    }

    #[tokio::test]
    async fn test_cancelled_before_first_hop() {
        let mut mock = MockDownloader::new();
        mock.expect_execute().times(0);
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert_eq!(
            resolver(mock).resolve_with_cancel("123", &cancel).await,
            Err(ExtractionError::Cancelled)
        );
    }

    #[tokio::test]
    async fn test_cancel_abandons_stalled_hop() {
        let resolver = resolver_with(Arc::new(Stalled), ExtractorConfig::default());
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });
        assert_eq!(
            resolver.resolve_with_cancel("123", &cancel).await,
            Err(ExtractionError::Cancelled)
        );
    }

    #[tokio::test]
    async fn test_stalled_hop_times_out_as_network() {
        let resolver = resolver_with(Arc::new(Stalled), ExtractorConfig::default().with_timeout(1));
        let err = resolver.resolve("123").await.unwrap_err();
        assert!(err.is_retryable());
    }
}
