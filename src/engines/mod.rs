//! Query template registry.
//!
//! Every supported provider is a variant of [`Engine`]. Each variant knows its
//! wire identifier, display metadata and a query template with exactly one
//! [`PLACEHOLDER`]. Substitution always URL-encodes the subject first.

use crate::utils::url_encode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Substitution marker inside every query template.
pub const PLACEHOLDER: &str = "%s";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Engine {
    #[serde(rename = "google")]
    GoogleLens,
    #[serde(rename = "saucenao")]
    SauceNao,
    #[serde(rename = "yandex")]
    Yandex,
    #[serde(rename = "iqdb")]
    Iqdb,
    #[serde(rename = "ascii2d")]
    Ascii2d,
    #[serde(rename = "tracemoe")]
    TraceMoe,
}

/// Static metadata for one engine, as exposed to third-party callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EngineInfo {
    pub id: &'static str,
    pub label: &'static str,
    pub icon: &'static str,
    pub description: &'static str,
    pub template: &'static str,
}

impl Engine {
    /// All engines, in enumeration order. The first one is the default.
    pub const ALL: [Engine; 6] = [
        Engine::GoogleLens,
        Engine::SauceNao,
        Engine::Yandex,
        Engine::Iqdb,
        Engine::Ascii2d,
        Engine::TraceMoe,
    ];

    pub fn id(&self) -> &'static str {
        self.info().id
    }

    pub fn label(&self) -> &'static str {
        self.info().label
    }

    pub fn template(&self) -> &'static str {
        self.info().template
    }

    pub fn info(&self) -> EngineInfo {
        match self {
            Engine::GoogleLens => EngineInfo {
                id: "google",
                label: "Google Lens",
                icon: "ic_google_lens",
                description: "Search the web for visually similar images with Google Lens",
                template: "https://lens.google.com/uploadbyurl?url=%s",
            },
            Engine::SauceNao => EngineInfo {
                id: "saucenao",
                label: "SauceNAO",
                icon: "ic_saucenao",
                description: "Find the source of anime art, illustrations and manga",
                template: "https://saucenao.com/search.php?url=%s",
            },
            Engine::Yandex => EngineInfo {
                id: "yandex",
                label: "Yandex",
                icon: "ic_yandex",
                description: "Yandex Images similar-picture search",
                template: "https://yandex.com/images/search?url=%s&rpt=imageview",
            },
            Engine::Iqdb => EngineInfo {
                id: "iqdb",
                label: "IQDB",
                icon: "ic_iqdb",
                description: "Multi-service image search across booru sites",
                template: "http://iqdb.org/?url=%s",
            },
            Engine::Ascii2d => EngineInfo {
                id: "ascii2d",
                label: "Ascii2d",
                icon: "ic_ascii2d",
                description: "Color and feature search for illustrations",
                template: "https://ascii2d.net/search/url/%s",
            },
            Engine::TraceMoe => EngineInfo {
                id: "tracemoe",
                label: "TraceMoe",
                icon: "ic_tracemoe",
                description: "Identify the anime scene a screenshot was taken from",
                template: "https://trace.moe/?auto&url=%s",
            },
        }
    }

    pub fn from_id(id: &str) -> Option<Engine> {
        Engine::ALL.into_iter().find(|e| e.id() == id)
    }

    /// Build the final query URL for `subject`.
    pub fn query_url(&self, subject: &str) -> String {
        self.template().replacen(PLACEHOLDER, &url_encode(subject), 1)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Engine::ALL[0]
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Engine {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Engine::from_id(&s.to_ascii_lowercase())
            .ok_or_else(|| crate::Error::UnsupportedEngine(s.to_string()))
    }
}

/// Metadata for every engine.
pub fn all_info() -> Vec<EngineInfo> {
    Engine::ALL.iter().map(Engine::info).collect()
}
