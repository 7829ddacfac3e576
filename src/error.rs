use thiserror::Error;

/// Failures of a single upload attempt.
#[derive(Error, Debug)]
pub enum UploadError {
    /// Non-200 answer, or a 200 without a usable `dest` field.
    #[error("code={0}")]
    Status(u16),

    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    #[error("could not encode image: {0}")]
    Encode(#[from] image::error::ImageError),

    #[error("invalid response: {0}")]
    InvalidResponse(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("unsupported request")]
    UnsupportedRequest,

    #[error("unsupported search engine: {0}")]
    UnsupportedEngine(String),

    #[error("shared content does not contain a URL or image")]
    NoSubjectFound,

    #[error("shared content is not a valid URL: {0}")]
    InvalidUrl(String),

    #[error("could not process image: {0}")]
    ImageProcessingFailed(String),

    #[error("upload failed: {0}")]
    UploadFailed(#[from] UploadError),

    #[error("could not open result: {0}")]
    DeliveryFailed(String),

    #[error("RevImg is not installed")]
    NotInstalled,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Failed to parse URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::error::ImageError),

    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_status_message_carries_code() {
        let err = Error::from(UploadError::Status(503));
        assert_eq!(err.to_string(), "upload failed: code=503");
    }

    #[test]
    fn test_invalid_url_message() {
        let err = Error::InvalidUrl("not a url".to_string());
        assert!(err.to_string().contains("not a url"));
    }
}
