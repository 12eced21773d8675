use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;

use crate::config::HttpConfig;
use crate::error::{HostInitError, Result};

use super::{MetaData, MetadataService, LATEST};

/// Metadata fetched from the link-local HTTP endpoint.
///
/// Transport errors and 5xx responses are retried `retries` times; a 404 is
/// reported immediately as `MetadataNotFound`.
pub struct HttpService {
    client: Client,
    base_url: String,
    retries: u32,
}

impl HttpService {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            retries: config.retries,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/openstack/{path}", self.base_url)
    }

    fn get_text(&self, path: &str) -> Result<String> {
        let url = self.url(path);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let err = match self.client.get(&url).send() {
                Ok(resp) if resp.status() == StatusCode::NOT_FOUND => {
                    return Err(HostInitError::MetadataNotFound(url));
                }
                Ok(resp) if resp.status().is_server_error() => {
                    HostInitError::Metadata(format!("{url}: HTTP {}", resp.status()))
                }
                Ok(resp) => return Ok(resp.error_for_status()?.text()?),
                Err(e) => HostInitError::Http(e),
            };
            if attempt > self.retries {
                return Err(err);
            }
            tracing::debug!(url = %url, attempt, error = %err, "metadata request failed, retrying");
        }
    }
}

impl MetadataService for HttpService {
    fn name(&self) -> &str {
        "http"
    }

    fn load(&mut self) -> Result<bool> {
        match self.get_text(&format!("{LATEST}/meta_data.json")) {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::debug!(base_url = %self.base_url, error = %e, "http metadata unavailable");
                Ok(false)
            }
        }
    }

    fn get_meta_data(&self, version: &str) -> Result<MetaData> {
        let body = self.get_text(&format!("{version}/meta_data.json"))?;
        Ok(serde_json::from_str(&body)?)
    }

    fn get_content(&self, name: &str) -> Result<String> {
        self.get_text(&format!("content/{name}"))
    }
}
