//! The host platform seen from the dispatcher, plus a desktop implementation.

use crate::error::{Error, Result};
use crate::facade::{HostContext, PACKAGE_NAME};
use crate::intent::{Intent, ACTION_VIEW};
use crate::types::UpdateInfo;
use crate::utils::decode_data_uri;
use async_trait::async_trait;
use bytes::Bytes;
use log::{debug, info};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use url::Url;

/// Everything the dispatcher needs from its host.
///
/// `start_activity`, `toast_and_finish` and `set_result` are the UI-affine
/// steps; implementations marshal them onto their UI context.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Resolve a content reference to the bytes behind it.
    async fn read_content(&self, uri: &str) -> Result<Bytes>;

    /// Hand an outbound view action to the platform.
    fn start_activity(&self, intent: &Intent) -> Result<()>;

    /// Show `message` to the user and end the hosting unit of work.
    fn toast_and_finish(&self, message: &str);

    /// Return `result` to the calling app and end the unit of work.
    fn set_result(&self, result: Intent);

    fn notify_update(&self, info: &UpdateInfo);
}

/// Runs on a desktop: files and `data:` URIs are readable content, view
/// actions open the default browser.
#[derive(Debug, Default)]
pub struct DesktopPlatform {
    /// Print the query URL instead of opening a browser.
    pub dry_run: bool,
    finished: AtomicBool,
}

impl DesktopPlatform {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            finished: AtomicBool::new(false),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Platform for DesktopPlatform {
    async fn read_content(&self, uri: &str) -> Result<Bytes> {
        if uri.starts_with("data:") {
            return Ok(Bytes::from(decode_data_uri(uri)?));
        }

        let path = match Url::parse(uri) {
            Ok(url) if url.scheme() == "file" => url
                .to_file_path()
                .map_err(|_| Error::ImageProcessingFailed(format!("bad file URI: {}", uri)))?,
            // Windows drive letters parse as a one-letter scheme.
            Ok(url) if url.scheme().len() > 1 => {
                return Err(Error::ImageProcessingFailed(format!(
                    "unsupported content reference: {}",
                    uri
                )))
            }
            _ => PathBuf::from(uri),
        };

        debug!("reading content from {}", path.display());
        Ok(Bytes::from(tokio::fs::read(&path).await?))
    }

    fn start_activity(&self, intent: &Intent) -> Result<()> {
        let target = match (intent.action(), intent.data.as_deref()) {
            (Some(ACTION_VIEW), Some(data)) => data,
            _ => return Err(Error::DeliveryFailed(format!("cannot handle {:?}", intent.action()))),
        };

        if self.dry_run {
            println!("{}", target);
            return Ok(());
        }
        open::that(target).map_err(|e| Error::DeliveryFailed(e.to_string()))
    }

    fn toast_and_finish(&self, message: &str) {
        info!("{}", message);
        eprintln!("{}", message);
        self.finished.store(true, Ordering::SeqCst);
    }

    fn set_result(&self, result: Intent) {
        match serde_json::to_string_pretty(&result) {
            Ok(json) => println!("{}", json),
            Err(e) => log::error!("could not serialize result: {}", e),
        }
        self.finished.store(true, Ordering::SeqCst);
    }

    fn notify_update(&self, info: &UpdateInfo) {
        eprintln!(
            "Update available: {} -> {} ({})",
            info.current_version, info.latest_version, info.release_url
        );
    }
}

/// In-process stand-in for the OS message bus: serializes each intent to
/// JSON and queues it for the receiving side.
pub struct ChannelHost {
    cache_dir: PathBuf,
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelHost {
    pub fn new(cache_dir: PathBuf) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { cache_dir, tx }, rx)
    }

    fn send(&self, intent: Intent) -> Result<()> {
        let json = serde_json::to_string(&intent)?;
        self.tx
            .send(json)
            .map_err(|_| Error::DeliveryFailed("receiver is gone".to_string()))
    }
}

impl HostContext for ChannelHost {
    fn is_package_installed(&self, package: &str) -> bool {
        package == PACKAGE_NAME
    }

    fn cache_dir(&self) -> PathBuf {
        self.cache_dir.clone()
    }

    fn start_activity(&self, intent: Intent) -> Result<()> {
        self.send(intent)
    }

    fn launch_for_result(&self, intent: Intent) -> Result<()> {
        self.send(intent)
    }
}
