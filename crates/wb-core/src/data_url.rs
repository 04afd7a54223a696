//! Decoding of `data:` URLs produced by the client-side image codec.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;

use crate::error::{AppError, Result};

/// A decoded `data:<mime>;base64,<payload>` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    pub content_type: String,
    pub data: Bytes,
}

impl DataUrl {
    /// Accepts base64 image payloads only.
    pub fn parse(input: &str) -> Result<Self> {
        let rest = input
            .trim()
            .strip_prefix("data:")
            .ok_or_else(|| invalid("missing data: scheme"))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| invalid("missing payload separator"))?;
        let content_type = header
            .strip_suffix(";base64")
            .ok_or_else(|| invalid("payload is not base64 encoded"))?;
        if !content_type.starts_with("image/") {
            return Err(invalid("payload is not an image"));
        }
        let data = STANDARD
            .decode(payload)
            .map_err(|e| invalid(&format!("bad base64 payload: {e}")))?;
        if data.is_empty() {
            return Err(invalid("payload is empty"));
        }

        Ok(Self {
            content_type: content_type.to_owned(),
            data: Bytes::from(data),
        })
    }
}

fn invalid(reason: &str) -> AppError {
    AppError::ValidationError(format!("invalid image data URL: {reason}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_base64_image() {
        let parsed = DataUrl::parse("data:image/png;base64,iVBORw0KGgo=").unwrap();
        assert_eq!(parsed.content_type, "image/png");
        assert_eq!(&parsed.data[..4], b"\x89PNG");
    }

    #[test]
    fn rejects_non_image_or_plain_payloads() {
        for input in [
            "https://example.com/cat.jpg",
            "data:text/plain;base64,aGVsbG8=",
            "data:image/png,rawbytes",
            "data:image/png;base64,@@@",
            "data:image/png;base64,",
        ] {
            assert!(
                matches!(DataUrl::parse(input), Err(AppError::ValidationError(_))),
                "{input} should be rejected"
            );
        }
    }
}
