//! Input classification.
//!
//! Turns an inbound [`Intent`] into a [`SearchRequest`]: either a validated
//! literal URL or a reference to a local image that still has to be uploaded.

use crate::engines::Engine;
use crate::error::{Error, Result};
use crate::facade::{actions, extras};
use crate::intent::{
    Intent, ACTION_PROCESS_TEXT, ACTION_SEND, ACTION_VIEW, EXTRA_PROCESS_TEXT, EXTRA_TEXT,
};
use crate::types::{SearchRequest, Subject};
use log::{debug, warn};
use regex::Regex;
use std::sync::LazyLock;
use url::{Host, Url};

static SCHEME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://").unwrap());

// Punycode TLDs come out of `url` as `xn--...`.
static DOMAIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[a-z0-9](?:[a-z0-9\-]{0,61}[a-z0-9])?\.)+(?:[a-z]{2,63}|xn--[a-z0-9\-]{1,59})$")
        .unwrap()
});

/// Web URL grammar used to accept literal subjects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UrlPolicy {
    /// Reject candidates without an explicit `http://` or `https://`.
    pub require_scheme: bool,
    /// Accept IPv4/IPv6 literals as hosts.
    pub allow_ip_hosts: bool,
}

impl Default for UrlPolicy {
    fn default() -> Self {
        Self {
            require_scheme: true,
            allow_ip_hosts: true,
        }
    }
}

impl UrlPolicy {
    pub fn is_valid(&self, candidate: &str) -> bool {
        if candidate.is_empty() || candidate.chars().any(char::is_whitespace) {
            return false;
        }

        let parsed = if SCHEME_RE.is_match(candidate) {
            Url::parse(candidate)
        } else if self.require_scheme {
            return false;
        } else {
            Url::parse(&format!("http://{}", candidate))
        };

        let Ok(url) = parsed else {
            return false;
        };
        if !matches!(url.scheme(), "http" | "https") {
            return false;
        }

        match url.host() {
            Some(Host::Domain(domain)) => DOMAIN_RE.is_match(domain),
            Some(Host::Ipv4(_)) | Some(Host::Ipv6(_)) => self.allow_ip_hosts,
            None => false,
        }
    }

    /// Return `candidate` unchanged if it is a valid web URL.
    pub fn validate(&self, candidate: &str) -> Result<String> {
        if self.is_valid(candidate) {
            Ok(candidate.to_string())
        } else {
            warn!("rejecting invalid URL: {}", candidate);
            Err(Error::InvalidUrl(candidate.to_string()))
        }
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.trim().is_empty())
}

/// Classify an organic share, view or process-text event.
///
/// Decision order, first match wins:
/// 1. process-text: the selected text is a URL candidate;
/// 2. view/send with an `image/*` type: the data URI, first clip item or
///    stream extra is a local image;
/// 3. view/send otherwise: the data string, then the text extra, is a URL
///    candidate.
pub fn classify(intent: &Intent, engine: Engine, policy: &UrlPolicy) -> Result<SearchRequest> {
    let subject = match intent.action() {
        Some(ACTION_PROCESS_TEXT) => {
            let text = non_empty(intent.string_extra(EXTRA_PROCESS_TEXT))
                .ok_or(Error::NoSubjectFound)?;
            Subject::Url(policy.validate(text)?)
        }
        Some(ACTION_VIEW) | Some(ACTION_SEND) if intent.has_image_type() => {
            let uri = non_empty(intent.uri()).ok_or(Error::NoSubjectFound)?;
            Subject::LocalImage(uri.to_string())
        }
        Some(ACTION_VIEW) | Some(ACTION_SEND) => {
            let candidate = non_empty(intent.data.as_deref())
                .or_else(|| non_empty(intent.string_extra(EXTRA_TEXT)))
                .ok_or(Error::NoSubjectFound)?;
            Subject::Url(policy.validate(candidate)?)
        }
        other => {
            warn!("unsupported action: {:?}", other);
            return Err(Error::UnsupportedRequest);
        }
    };

    debug!("classified {:?} as {}", intent.action(), subject.kind());
    Ok(SearchRequest::new(subject, engine))
}

/// Classify a request sent through the public API.
///
/// The engine comes from the `search_engine` extra and defaults to the first
/// engine when absent.
pub fn classify_api(intent: &Intent, policy: &UrlPolicy) -> Result<SearchRequest> {
    let engine = match intent.string_extra(extras::SEARCH_ENGINE) {
        None => Engine::default(),
        Some(id) => Engine::from_id(id).ok_or_else(|| Error::UnsupportedEngine(id.to_string()))?,
    };

    let subject = match intent.action() {
        Some(actions::SEARCH_IMAGE) => {
            let uri = non_empty(intent.uri()).ok_or(Error::NoSubjectFound)?;
            if intent.has_image_type() {
                Subject::LocalImage(uri.to_string())
            } else {
                Subject::Url(policy.validate(uri)?)
            }
        }
        Some(actions::SEARCH_IMAGE_URL) => {
            let url = non_empty(intent.string_extra(extras::IMAGE_URL))
                .or_else(|| non_empty(intent.data.as_deref()))
                .ok_or(Error::NoSubjectFound)?;
            Subject::Url(policy.validate(url)?)
        }
        other => {
            warn!("unsupported API action: {:?}", other);
            return Err(Error::UnsupportedRequest);
        }
    };

    debug!("classified API {:?} as {} for {}", intent.action(), subject.kind(), engine);
    Ok(SearchRequest::new(subject, engine))
}
