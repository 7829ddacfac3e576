use crate::error::{Error, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

/// Percent-encode `s` for use as a query value (`application/x-www-form-urlencoded`).
pub fn url_encode(s: &str) -> String {
    url::form_urlencoded::byte_serialize(s.as_bytes()).collect()
}

/// `<prefix>_<millis>.<ext>`, unique enough for one request at a time.
pub fn timestamped_file_name(prefix: &str, ext: &str) -> String {
    format!("{}_{}.{}", prefix, chrono::Utc::now().timestamp_millis(), ext)
}

pub fn bytes_to_base64(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

/// Decode the payload of a `data:` URI. Only base64 payloads are accepted.
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| Error::ImageProcessingFailed(format!("not a data URI: {}", uri)))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| Error::ImageProcessingFailed("malformed data URI".to_string()))?;
    if !meta.ends_with(";base64") {
        return Err(Error::ImageProcessingFailed(
            "data URI is not base64 encoded".to_string(),
        ));
    }
    Ok(BASE64.decode(payload)?)
}
