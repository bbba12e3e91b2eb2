//! Outbound HTTP client for the upstream origin.
//!
//! One `Upstream` is built at startup and shared by reference; it carries the
//! browser-like default headers so every fetch looks the same to the origin.

use std::time::Duration;

use reqwest::header::{self, HeaderMap, HeaderValue, InvalidHeaderValue};
use reqwest::{Client, Response};
use url::Url;

use super::path::LogicalPath;
use crate::config::UpstreamConfig;

/// Error building the upstream client.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamInitError {
    #[error("invalid origin URL: {0}")]
    Origin(#[from] url::ParseError),
    #[error("invalid header value: {0}")]
    Header(#[from] InvalidHeaderValue),
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Immutable handle on the origin: base URL plus a configured client.
#[derive(Debug, Clone)]
pub struct Upstream {
    client: Client,
    origin: Url,
}

impl Upstream {
    /// Wrap an existing client.
    pub fn new(client: Client, origin: Url) -> Self {
        Self { client, origin }
    }

    /// Build the client from configuration.
    pub fn from_config(config: &UpstreamConfig) -> Result<Self, UpstreamInitError> {
        let origin = Url::parse(&config.origin)?;

        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_str(&config.accept)?);
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_str(&config.accept_language)?,
        );

        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self::new(client, origin))
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Upstream URL for a logical path.
    ///
    /// The origin's own path is treated as a directory whether or not it ends
    /// in `/`; each segment is percent-encoded on the way in.
    pub fn url_for(&self, path: &LogicalPath) -> Url {
        let mut url = self.origin.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(path.segments());
            if path.is_directory() {
                segments.push("");
            }
        }
        url
    }

    /// Start a streaming GET for `path`. The body is not read yet.
    pub async fn get(&self, path: &LogicalPath) -> Result<Response, reqwest::Error> {
        self.client.get(self.url_for(path)).send().await
    }
}
