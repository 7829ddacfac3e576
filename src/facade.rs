//! Public library facade.
//!
//! What a third-party app links against to drive RevImg over inter-process
//! messaging: the package id, the action/extra vocabulary, an install check,
//! engine metadata and request builders. Every call is fire-and-forget:
//! `Ok(())` means the request reached the receiving process, not that the
//! search succeeded.

use crate::engines::{self, Engine, EngineInfo};
use crate::error::{Error, Result};
use crate::imaging::encode_jpeg;
use crate::intent::{Intent, FLAG_GRANT_READ_URI_PERMISSION};
use crate::utils::timestamped_file_name;
use image::DynamicImage;
use log::{debug, warn};
use std::path::PathBuf;

/// Identifier of the receiving application.
pub const PACKAGE_NAME: &str = "revimg";

pub mod actions {
    /// Search an image given as a content reference.
    pub const SEARCH_IMAGE: &str = "revimg.action.SEARCH_IMAGE";
    /// Search an image that is already reachable at a URL.
    pub const SEARCH_IMAGE_URL: &str = "revimg.action.SEARCH_IMAGE_URL";
    /// Ask for the list of supported engine ids.
    pub const GET_SEARCH_ENGINES: &str = "revimg.action.GET_SEARCH_ENGINES";

    pub fn is_api_action(action: &str) -> bool {
        matches!(action, SEARCH_IMAGE | SEARCH_IMAGE_URL | GET_SEARCH_ENGINES)
    }
}

pub mod extras {
    pub const SEARCH_ENGINE: &str = "search_engine";
    pub const SEARCH_ENGINES: &str = "search_engines";
    pub const IMAGE_URL: &str = "image_url";
}

/// The calling app's view of its platform.
pub trait HostContext {
    fn is_package_installed(&self, package: &str) -> bool;

    /// Directory the receiving process may read shared files from.
    fn cache_dir(&self) -> PathBuf;

    fn start_activity(&self, intent: Intent) -> Result<()>;

    fn launch_for_result(&self, intent: Intent) -> Result<()>;
}

pub fn is_installed(ctx: &dyn HostContext) -> bool {
    ctx.is_package_installed(PACKAGE_NAME)
}

/// Metadata of every engine, default first.
pub fn engines() -> Vec<EngineInfo> {
    engines::all_info()
}

pub fn search_image_uri_intent(uri: &str, mime_type: &str, engine: Engine) -> Intent {
    Intent::new(actions::SEARCH_IMAGE)
        .with_package(PACKAGE_NAME)
        .put_extra(extras::SEARCH_ENGINE, engine.id())
        .with_data(uri)
        .with_type(mime_type)
        .add_flags(FLAG_GRANT_READ_URI_PERMISSION)
}

pub fn search_image_url_intent(url: &str, engine: Engine) -> Intent {
    Intent::new(actions::SEARCH_IMAGE_URL)
        .with_package(PACKAGE_NAME)
        .put_extra(extras::SEARCH_ENGINE, engine.id())
        .put_extra(extras::IMAGE_URL, url)
}

pub fn get_search_engines_intent() -> Intent {
    Intent::new(actions::GET_SEARCH_ENGINES).with_package(PACKAGE_NAME)
}

/// Result intent answering [`actions::GET_SEARCH_ENGINES`].
pub fn search_engines_result() -> Intent {
    Intent::default().put_list_extra(
        extras::SEARCH_ENGINES,
        Engine::ALL.iter().map(|e| e.id().to_string()).collect(),
    )
}

pub fn parse_search_engines_result(data: Option<&Intent>) -> Option<Vec<String>> {
    data?.list_extra(extras::SEARCH_ENGINES).map(<[String]>::to_vec)
}

fn send(ctx: &dyn HostContext, intent: Intent, for_result: bool) -> Result<()> {
    if !is_installed(ctx) {
        return Err(Error::NotInstalled);
    }
    debug!("sending {:?}", intent.action());
    let sent = if for_result {
        ctx.launch_for_result(intent)
    } else {
        ctx.start_activity(intent)
    };
    sent.inspect_err(|e| warn!("could not reach {}: {}", PACKAGE_NAME, e))
}

pub fn get_search_engines(ctx: &dyn HostContext) -> Result<()> {
    send(ctx, get_search_engines_intent(), true)
}

/// Write `image` as JPEG into the host's cache directory and send its URI.
pub fn search_image(ctx: &dyn HostContext, image: &DynamicImage, engine: Engine) -> Result<()> {
    if !is_installed(ctx) {
        return Err(Error::NotInstalled);
    }

    let path = ctx
        .cache_dir()
        .join(timestamped_file_name("shared_image", "jpg"));
    std::fs::write(&path, encode_jpeg(image, 90)?)?;
    let uri = url::Url::from_file_path(&path)
        .map_err(|_| Error::InvalidUrl(path.display().to_string()))?;

    send(ctx, search_image_uri_intent(uri.as_str(), "image/jpeg", engine), false)
}

pub fn search_image_uri(ctx: &dyn HostContext, uri: &str, engine: Engine) -> Result<()> {
    send(ctx, search_image_uri_intent(uri, "image/*", engine), false)
}

pub fn search_image_url(ctx: &dyn HostContext, url: &str, engine: Engine) -> Result<()> {
    send(ctx, search_image_url_intent(url, engine), false)
}
