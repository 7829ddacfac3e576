//! Platform request model.
//!
//! An [`Intent`] is the message exchanged between apps: an action, an optional
//! data URI with a MIME type, attached clip data and named extras. It derives
//! serde so it can cross a process boundary as JSON.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const ACTION_VIEW: &str = "android.intent.action.VIEW";
pub const ACTION_SEND: &str = "android.intent.action.SEND";
pub const ACTION_PROCESS_TEXT: &str = "android.intent.action.PROCESS_TEXT";

pub const EXTRA_STREAM: &str = "android.intent.extra.STREAM";
pub const EXTRA_TEXT: &str = "android.intent.extra.TEXT";
pub const EXTRA_PROCESS_TEXT: &str = "android.intent.extra.PROCESS_TEXT";

pub const FLAG_GRANT_READ_URI_PERMISSION: u32 = 0x0000_0001;
pub const FLAG_ACTIVITY_NEW_TASK: u32 = 0x1000_0000;
pub const FLAG_ACTIVITY_CLEAR_TASK: u32 = 0x0000_8000;

/// Flags for a view action that must open in a fresh task.
pub const FLAG_NEW_TASK: u32 =
    FLAG_ACTIVITY_NEW_TASK | FLAG_ACTIVITY_CLEAR_TASK | FLAG_GRANT_READ_URI_PERMISSION;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Extra {
    Text(String),
    List(Vec<String>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Intent {
    pub action: Option<String>,
    pub data: Option<String>,
    #[serde(rename = "type")]
    pub mime_type: Option<String>,
    pub clip_data: Vec<String>,
    pub package: Option<String>,
    pub extras: BTreeMap<String, Extra>,
    pub flags: u32,
}

impl Intent {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: Some(action.into()),
            ..Default::default()
        }
    }

    /// A view action for `uri`, opened in a fresh task.
    pub fn view(uri: impl Into<String>) -> Self {
        Self::new(ACTION_VIEW).with_data(uri).add_flags(FLAG_NEW_TASK)
    }

    pub fn with_data(mut self, uri: impl Into<String>) -> Self {
        self.data = Some(uri.into());
        self
    }

    pub fn with_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn with_clip(mut self, uri: impl Into<String>) -> Self {
        self.clip_data.push(uri.into());
        self
    }

    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = Some(package.into());
        self
    }

    pub fn put_extra(mut self, name: &str, value: impl Into<String>) -> Self {
        self.extras.insert(name.to_string(), Extra::Text(value.into()));
        self
    }

    pub fn put_list_extra(mut self, name: &str, values: Vec<String>) -> Self {
        self.extras.insert(name.to_string(), Extra::List(values));
        self
    }

    pub fn add_flags(mut self, flags: u32) -> Self {
        self.flags |= flags;
        self
    }

    pub fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }

    pub fn string_extra(&self, name: &str) -> Option<&str> {
        match self.extras.get(name) {
            Some(Extra::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn list_extra(&self, name: &str) -> Option<&[String]> {
        match self.extras.get(name) {
            Some(Extra::List(v)) => Some(v),
            _ => None,
        }
    }

    pub fn has_image_type(&self) -> bool {
        self.mime_type
            .as_deref()
            .is_some_and(|t| t.starts_with("image/"))
    }

    /// First non-empty of the data URI, the first clip item and the stream extra.
    pub fn uri(&self) -> Option<&str> {
        self.data
            .as_deref()
            .or_else(|| self.clip_data.first().map(String::as_str))
            .or_else(|| self.string_extra(EXTRA_STREAM))
    }
}
