//! Optional update check against the GitHub releases API.
//!
//! Runs as its own task next to a dispatch. It never gates the dispatch and
//! its failures are only logged.

use crate::config::Config;
use crate::error::Result;
use crate::network::Network;
use crate::platform::Platform;
use crate::types::UpdateInfo;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::Deserialize;
use std::cmp::Ordering;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

#[derive(Debug, Deserialize)]
struct Release {
    tag_name: String,
    html_url: String,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    published_at: Option<DateTime<Utc>>,
}

/// Numeric segments of a version string. `v1.2.3-beta` -> `[1, 2, 3]`.
fn segments(version: &str) -> Vec<u64> {
    let version = version.trim();
    let version = version
        .strip_prefix(['v', 'V'])
        .unwrap_or(version);
    let core = version.split(['-', '+']).next().unwrap_or_default();
    core.split('.')
        .map(|seg| {
            let digits: String = seg.chars().take_while(char::is_ascii_digit).collect();
            digits.parse().unwrap_or(0)
        })
        .collect()
}

/// Whether `latest` is newer than `current`.
///
/// Segments compare numerically left to right; with all shared segments
/// equal, the longer list wins.
pub fn is_newer_version(current: &str, latest: &str) -> bool {
    let current = segments(current);
    let latest = segments(latest);
    for (c, l) in current.iter().zip(&latest) {
        match l.cmp(c) {
            Ordering::Greater => return true,
            Ordering::Less => return false,
            Ordering::Equal => {}
        }
    }
    latest.len() > current.len()
}

pub struct UpdateChecker {
    network: Network,
    releases_url: String,
    current_version: String,
}

impl UpdateChecker {
    pub fn new(network: Network, releases_url: impl Into<String>, current_version: impl Into<String>) -> Self {
        Self {
            network,
            releases_url: releases_url.into(),
            current_version: current_version.into(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            Network::from_config(config)?,
            config.releases_url.clone(),
            config.current_version.clone(),
        ))
    }

    /// Fetch the latest release, whatever its version.
    pub async fn latest(&self) -> Result<UpdateInfo> {
        let release: Release = self.network.get_json(&self.releases_url).await?;
        Ok(UpdateInfo {
            current_version: self.current_version.clone(),
            latest_version: release.tag_name,
            release_url: release.html_url,
            release_notes: release.body.unwrap_or_default(),
            published_at: release.published_at,
        })
    }

    /// `Some` only when the latest release is newer than the running version.
    pub async fn check(&self) -> Result<Option<UpdateInfo>> {
        let info = self.latest().await?;
        if is_newer_version(&info.current_version, &info.latest_version) {
            info!(
                "update available: {} -> {}",
                info.current_version, info.latest_version
            );
            Ok(Some(info))
        } else {
            debug!("up to date ({})", info.current_version);
            Ok(None)
        }
    }
}

/// Run the check as an independent task. Its outcome never reaches the
/// dispatch it runs beside.
pub fn spawn_check(runtime: &Handle, checker: UpdateChecker, platform: Arc<dyn Platform>) -> JoinHandle<()> {
    runtime.spawn(async move {
        match checker.check().await {
            Ok(Some(info)) => platform.notify_update(&info),
            Ok(None) => {}
            Err(e) => warn!("update check failed: {}", e),
        }
    })
}
