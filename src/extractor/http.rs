// reqwest-backed Downloader

use async_trait::async_trait;
use std::collections::HashMap;
use tracing::debug;

use super::config::ExtractorConfig;
use super::errors::{ExtractionError, Result};
use super::traits::{Downloader, Method, Request, Response};

/// Production transport. Proxy, timeout and user agent come from configuration.
pub struct ReqwestDownloader {
    client: reqwest::Client,
}

impl ReqwestDownloader {
    pub fn new(config: &ExtractorConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone());

        if let Some(proxy_url) = config.proxy.as_deref() {
            let proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|e| ExtractionError::Config(format!("Invalid proxy URL {}: {}", proxy_url, e)))?;
            debug!(proxy = proxy_url, "using proxy");
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| ExtractionError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Wrap an already configured client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Downloader for ReqwestDownloader {
    async fn execute(&self, request: Request) -> Result<Response> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        debug!(method = ?request.method, url = %request.url, "sending request");
        let response = builder.send().await?;

        let status = response.status().as_u16();
        let latest_url = response.url().to_string();
        let mut headers: HashMap<String, Vec<String>> = HashMap::new();
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                headers
                    .entry(name.as_str().to_ascii_lowercase())
                    .or_default()
                    .push(value.to_string());
            }
        }
        let body = response.text().await?;

        Ok(Response {
            status,
            body,
            headers,
            latest_url,
        })
    }
}
