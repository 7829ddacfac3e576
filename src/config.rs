//! Runtime configuration.
//!
//! Values come from the process environment (a `.env` file is loaded first by
//! the binary). Every key is optional; unset keys fall back to the defaults
//! below.
//!
//! | Key | Default |
//! |---|---|
//! | `REVIMG_UPLOAD_ENDPOINT` | `https://api.resmush.it/?qlty=60` |
//! | `REVIMG_TIMEOUT_SECS` | `15` |
//! | `REVIMG_PIXEL_BUDGET` | `65536` |
//! | `REVIMG_JPEG_QUALITY` | `90` |
//! | `REVIMG_REQUIRE_SCHEME` | `true` |
//! | `REVIMG_ALLOW_IP_HOSTS` | `true` |
//! | `REVIMG_CHECK_UPDATES` | `true` |
//! | `REVIMG_RELEASES_URL` | [`DEFAULT_RELEASES_URL`] |

use crate::classifier::UrlPolicy;
use crate::error::{Error, Result};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_UPLOAD_ENDPOINT: &str = "https://api.resmush.it/?qlty=60";
pub const DEFAULT_RELEASES_URL: &str = "https://api.github.com/repos/zdz/revimg/releases/latest";
pub const DEFAULT_PIXEL_BUDGET: u32 = 65_536;
pub const DEFAULT_JPEG_QUALITY: u8 = 90;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub upload_endpoint: String,
    /// Applied to both connect and read.
    pub timeout: Duration,
    pub pixel_budget: u32,
    pub jpeg_quality: u8,
    pub url_policy: UrlPolicy,
    pub check_updates: bool,
    pub releases_url: String,
    pub current_version: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            upload_endpoint: DEFAULT_UPLOAD_ENDPOINT.to_string(),
            timeout: DEFAULT_TIMEOUT,
            pixel_budget: DEFAULT_PIXEL_BUDGET,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            url_policy: UrlPolicy::default(),
            check_updates: true,
            releases_url: DEFAULT_RELEASES_URL.to_string(),
            current_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(endpoint) = lookup("REVIMG_UPLOAD_ENDPOINT") {
            url::Url::parse(&endpoint)?;
            config.upload_endpoint = endpoint;
        }
        if let Some(secs) = parse_key::<u64>(&lookup, "REVIMG_TIMEOUT_SECS")? {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(budget) = parse_key::<u32>(&lookup, "REVIMG_PIXEL_BUDGET")? {
            if budget == 0 {
                return Err(Error::Config(
                    "REVIMG_PIXEL_BUDGET must be positive".to_string(),
                ));
            }
            config.pixel_budget = budget;
        }
        if let Some(quality) = parse_key::<u8>(&lookup, "REVIMG_JPEG_QUALITY")? {
            if !(1..=100).contains(&quality) {
                return Err(Error::Config(
                    "REVIMG_JPEG_QUALITY must be between 1 and 100".to_string(),
                ));
            }
            config.jpeg_quality = quality;
        }
        if let Some(v) = parse_key::<bool>(&lookup, "REVIMG_REQUIRE_SCHEME")? {
            config.url_policy.require_scheme = v;
        }
        if let Some(v) = parse_key::<bool>(&lookup, "REVIMG_ALLOW_IP_HOSTS")? {
            config.url_policy.allow_ip_hosts = v;
        }
        if let Some(v) = parse_key::<bool>(&lookup, "REVIMG_CHECK_UPDATES")? {
            config.check_updates = v;
        }
        if let Some(url) = lookup("REVIMG_RELEASES_URL") {
            config.releases_url = url;
        }

        Ok(config)
    }
}

fn parse_key<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| Error::Config(format!("invalid value for {}: {:?}", key, raw))),
    }
}
