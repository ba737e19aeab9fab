// Extraction configuration and the context object handed to every extractor

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use super::diagnostics::PolicyGate;
use super::errors::{ExtractionError, Result};
use super::traits::Downloader;

/// Prefix for environment overrides, e.g. `MEDIA_EXTRACTOR_TIMEOUT_SECONDS=10`
pub const ENV_PREFIX: &str = "MEDIA_EXTRACTOR_";

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

/// Configuration for extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// SOCKS5/HTTP proxy URL
    pub proxy: Option<String>,
    /// Timeout applied to each network hop
    pub timeout_seconds: u64,
    /// User agent sent with every request
    pub user_agent: String,
    /// Upstream policy values that allow playback
    pub permitted_policies: Vec<String>,
    /// Items requested per page from listing APIs
    pub page_size: u32,
    /// Resolve transcodings concurrently
    pub parallel_resolution: bool,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            proxy: None,
            timeout_seconds: 30,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            permitted_policies: vec!["ALLOW".to_string(), "MONETIZE".to_string()],
            page_size: 20,
            parallel_resolution: true,
        }
    }
}

impl ExtractorConfig {
    /// Defaults, then `MEDIA_EXTRACTOR_*` environment variables
    pub fn load() -> Result<Self> {
        Self::figment(None).extract().map_err(config_error)
    }

    /// Defaults, then the TOML file, then environment variables
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        Self::figment(Some(path.as_ref()))
            .extract()
            .map_err(config_error)
    }

    fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_permitted_policies<I, S>(mut self, policies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permitted_policies = policies.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_page_size(mut self, size: u32) -> Self {
        self.page_size = size.max(1);
        self
    }

    pub fn with_parallel_resolution(mut self, enabled: bool) -> Self {
        self.parallel_resolution = enabled;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.max(1))
    }

    pub fn policy_gate(&self) -> PolicyGate {
        PolicyGate::new(self.permitted_policies.iter().cloned())
    }
}

fn config_error(e: figment::Error) -> ExtractionError {
    ExtractionError::Config(e.to_string())
}

/// Explicit collaborators for one or many extractions
///
/// Cheap to clone; holds no per-extraction state.
#[derive(Clone)]
pub struct ExtractorContext {
    pub downloader: Arc<dyn Downloader>,
    pub config: Arc<ExtractorConfig>,
}

impl ExtractorContext {
    pub fn new(downloader: Arc<dyn Downloader>, config: ExtractorConfig) -> Self {
        Self {
            downloader,
            config: Arc::new(config),
        }
    }
}
