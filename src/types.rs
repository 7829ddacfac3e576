use crate::engines::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What is being searched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Subject {
    /// A literal, already validated web URL.
    Url(String),
    /// A content reference to local image bytes that must be uploaded first.
    LocalImage(String),
}

impl Subject {
    pub fn kind(&self) -> SubjectKind {
        match self {
            Subject::Url(_) => SubjectKind::Url,
            Subject::LocalImage(_) => SubjectKind::LocalImage,
        }
    }

    pub fn payload(&self) -> &str {
        match self {
            Subject::Url(s) | Subject::LocalImage(s) => s,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubjectKind {
    Url,
    LocalImage,
}

impl fmt::Display for SubjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubjectKind::Url => write!(f, "URL"),
            SubjectKind::LocalImage => write!(f, "local image"),
        }
    }
}

/// One normalized inbound task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub subject: Subject,
    pub engine: Engine,
}

impl SearchRequest {
    pub fn new(subject: Subject, engine: Engine) -> Self {
        Self { subject, engine }
    }
}

/// Result of the optional update check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateInfo {
    pub current_version: String,
    pub latest_version: String,
    pub release_url: String,
    pub release_notes: String,
    pub published_at: Option<DateTime<Utc>>,
}
