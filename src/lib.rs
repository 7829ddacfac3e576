pub mod api;
pub mod classifier;
pub mod config;
pub mod dispatcher;
pub mod engines;
pub mod error;
pub mod facade;
pub mod imaging;
pub mod intent;
pub mod network;
pub mod platform;
pub mod types;
pub mod update;
pub mod upload;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use classifier::UrlPolicy;
pub use config::Config;
pub use dispatcher::{Dispatcher, Outcome, Route};
pub use engines::{Engine, EngineInfo};
pub use error::{Error, Result, UploadError};
pub use intent::Intent;
pub use platform::{DesktopPlatform, Platform};
pub use types::{SearchRequest, Subject, SubjectKind, UpdateInfo};
pub use upload::{ImageHost, Resmush};
