use crate::config::Config;
use crate::error::Result;
use log::debug;
use reqwest::{Client, Response};
use std::time::Duration;

pub const USER_AGENT: &str = "ReverseImageSearch/1.0";

/// Thin wrapper over a shared `reqwest::Client` with fixed connect/read timeouts.
#[derive(Clone)]
pub struct Network {
    client: Client,
}

impl std::fmt::Debug for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Network").finish()
    }
}

impl Network {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { client })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.timeout)
    }

    pub async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!("GET JSON request to: {}", url);
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    /// Single multipart POST. Transport errors are returned as-is so callers
    /// can classify them.
    pub async fn post_multipart(
        &self,
        url: &str,
        form: reqwest::multipart::Form,
    ) -> reqwest::Result<Response> {
        debug!("POST multipart request to: {}", url);
        self.client.post(url).multipart(form).send().await
    }
}
