//! HTTP boundary for repository access

use std::time::Duration;

#[cfg(test)]
use mockall::automock;
use tracing::{debug, warn};

use crate::error::FetchError;

const USER_AGENT: &str = concat!("pom-resolver/", env!("CARGO_PKG_VERSION"));

/// One request per attempt; no retries.
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Body of a 2xx response, `None` for any other status
    async fn get(&self, url: &str) -> Result<Option<Vec<u8>>, FetchError>;

    /// True when the URL answers a HEAD request with a 2xx status
    async fn head(&self, url: &str) -> Result<bool, FetchError>;
}

pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<Option<Vec<u8>>, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            debug!("Not found: {}", url);
            return Ok(None);
        }

        if !status.is_success() {
            warn!("Repository returned status {}: {}", status, url);
            return Ok(None);
        }

        let body = response.bytes().await?;
        Ok(Some(body.to_vec()))
    }

    async fn head(&self, url: &str) -> Result<bool, FetchError> {
        let response = self.client.head(url).send().await?;
        let status = response.status();
        debug!("HEAD {} returned {}", url, status);
        Ok(status.is_success())
    }
}
