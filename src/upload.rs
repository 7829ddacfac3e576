//! Upload client: turns a decoded image into a publicly reachable URL.

use crate::config::Config;
use crate::error::{Result, UploadError};
use crate::imaging::encode_jpeg;
use crate::network::Network;
use crate::utils::timestamped_file_name;
use async_trait::async_trait;
use image::DynamicImage;
use log::{debug, info, warn};
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::Deserialize;

/// A public image host.
#[async_trait]
pub trait ImageHost: Send + Sync {
    fn name(&self) -> &'static str;

    /// One upload attempt. No retries.
    async fn upload(&self, image: &DynamicImage) -> std::result::Result<String, UploadError>;
}

/// reSmush.it: accepts a multipart `files` field and answers with the
/// optimized copy's URL in `dest`.
pub struct Resmush {
    network: Network,
    endpoint: String,
    quality: u8,
}

#[derive(Debug, Deserialize)]
struct ResmushResponse {
    dest: Option<String>,
    error: Option<serde_json::Value>,
    error_long: Option<String>,
}

impl Resmush {
    pub fn new(network: Network, endpoint: impl Into<String>, quality: u8) -> Self {
        Self {
            network,
            endpoint: endpoint.into(),
            quality,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            Network::from_config(config)?,
            config.upload_endpoint.clone(),
            config.jpeg_quality,
        ))
    }
}

#[async_trait]
impl ImageHost for Resmush {
    fn name(&self) -> &'static str {
        "reSmush.it"
    }

    async fn upload(&self, image: &DynamicImage) -> std::result::Result<String, UploadError> {
        let bytes = encode_jpeg(image, self.quality)?;
        let file_name = timestamped_file_name("image", "jpg");
        debug!("uploading {} ({} bytes)", file_name, bytes.len());

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("image/jpeg")?;
        let form = Form::new().part("files", part);

        let response = self.network.post_multipart(&self.endpoint, form).await?;
        let status = response.status();
        if status != StatusCode::OK {
            warn!("{} returned status code: {}", self.name(), status);
            return Err(UploadError::Status(status.as_u16()));
        }

        let body: ResmushResponse = serde_json::from_slice(&response.bytes().await?)?;
        match body.dest.filter(|d| !d.is_empty()) {
            Some(dest) => {
                info!("uploaded image to {}", dest);
                Ok(dest)
            }
            None => {
                warn!(
                    "{} response has no dest (error={:?}, {:?})",
                    self.name(),
                    body.error,
                    body.error_long
                );
                Err(UploadError::Status(status.as_u16()))
            }
        }
    }
}
