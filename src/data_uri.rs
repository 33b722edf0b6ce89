//! Conversion between raw images and `data:<mime>;base64,<payload>` strings,
//! the only form in which images travel to the model.

use crate::error::{Error, Result};
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

const SCHEME: &str = "data:";
const SEPARATOR: &str = ";base64,";

/// An in-memory representation of an image (not base 64)
#[derive(Clone, PartialEq, Eq)]
pub struct Image {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl Debug for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Image {{ mime_type: {:?}, bytes: <{} bytes> }}",
            self.mime_type,
            self.bytes.len()
        )
    }
}

/// Encode `bytes` as a base 64 data URI
pub fn encode(bytes: &[u8], mime_type: &str) -> String {
    format!(
        "{SCHEME}{mime_type}{SEPARATOR}{}",
        general_purpose::STANDARD.encode(bytes)
    )
}

/// Parse a data URI back into its MIME type and raw bytes
pub fn decode(data_uri: &str) -> Result<Image> {
    let (mime_type, payload) = split(data_uri)?;
    let bytes = general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| Error::MalformedInput(format!("invalid base64 payload: {e}")))?;

    Ok(Image {
        mime_type: mime_type.to_string(),
        bytes,
    })
}

/// Split a data URI into `(mime type, base 64 payload)` without decoding it
fn split(data_uri: &str) -> Result<(&str, &str)> {
    let rest = data_uri
        .strip_prefix(SCHEME)
        .ok_or_else(|| Error::MalformedInput("expected a `data:` URI".into()))?;
    let (mime_type, payload) = rest
        .split_once(SEPARATOR)
        .ok_or_else(|| Error::MalformedInput("data URI is not base 64 encoded".into()))?;

    if mime_type.is_empty() || mime_type.contains(';') {
        return Err(Error::MalformedInput(format!(
            "invalid MIME type in data URI: {mime_type:?}"
        )));
    }
    if payload.is_empty() {
        return Err(Error::MalformedInput("data URI has an empty payload".into()));
    }

    Ok((mime_type, payload))
}

/// A validated image data URI. This is the input of every image flow.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ImageInput {
    uri: String,
    mime_len: usize,
}

impl ImageInput {
    /// Validate a data URI, including its base 64 payload
    pub fn parse(uri: impl Into<String>) -> Result<Self> {
        let uri = uri.into();
        let mime_len = decode(&uri)?.mime_type.len();
        Ok(ImageInput { uri, mime_len })
    }

    pub fn from_image(image: &Image) -> Result<Self> {
        Self::parse(encode(&image.bytes, &image.mime_type))
    }

    pub fn as_str(&self) -> &str {
        &self.uri
    }

    pub fn mime_type(&self) -> &str {
        &self.uri[SCHEME.len()..SCHEME.len() + self.mime_len]
    }

    /// The base 64 payload, exactly as it appears in the URI
    pub fn payload(&self) -> &str {
        &self.uri[SCHEME.len() + self.mime_len + SEPARATOR.len()..]
    }

    pub fn decode(&self) -> Result<Image> {
        decode(&self.uri)
    }
}

impl Debug for ImageInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ImageInput {{ mime_type: {:?}, payload: <{} chars> }}",
            self.mime_type(),
            self.payload().len()
        )
    }
}

impl TryFrom<String> for ImageInput {
    type Error = Error;

    fn try_from(uri: String) -> Result<Self> {
        Self::parse(uri)
    }
}

impl From<ImageInput> for String {
    fn from(input: ImageInput) -> String {
        input.uri
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_URI: &str = "data:image/png;base64,iVBORw0KGgo=";

    #[test]
    fn test_encode() {
        assert_eq!(encode(b"hello", "text/plain"), "data:text/plain;base64,aGVsbG8=");
    }

    #[test]
    fn test_round_trip() {
        for uri in [PNG_URI, "data:image/jpeg;base64,/9j/4AAQ", "data:image/webp;base64,UklGRg=="] {
            let image = decode(uri).unwrap();
            assert_eq!(encode(&image.bytes, &image.mime_type), uri);
        }
    }

    #[test]
    fn test_decode() {
        let image = decode(PNG_URI).unwrap();
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(image.bytes, b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn test_decode_malformed() {
        let bad = [
            "",
            "image/png;base64,iVBORw0KGgo=",
            "https://picsum.photos/id/219/300/200",
            "data:image/png,iVBORw0KGgo=",
            "data:;base64,iVBORw0KGgo=",
            "data:image/png;charset=utf-8;base64,iVBORw0KGgo=",
            "data:image/png;base64,",
            "data:image/png;base64,not base64!",
        ];
        for uri in bad {
            assert!(
                matches!(decode(uri), Err(Error::MalformedInput(_))),
                "{uri:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_image_input_accessors() {
        let input = ImageInput::parse(PNG_URI).unwrap();
        assert_eq!(input.mime_type(), "image/png");
        assert_eq!(input.payload(), "iVBORw0KGgo=");
        assert_eq!(input.as_str(), PNG_URI);
        assert_eq!(
            format!("{input:?}"),
            "ImageInput { mime_type: \"image/png\", payload: <12 chars> }"
        );
    }

    #[test]
    fn test_image_input_serde() {
        let input: ImageInput = serde_json::from_str(&format!("\"{PNG_URI}\"")).unwrap();
        assert_eq!(serde_json::to_string(&input).unwrap(), format!("\"{PNG_URI}\""));
        assert!(serde_json::from_str::<ImageInput>("\"data:image/png;base64,\"").is_err());
    }

    #[test]
    fn test_from_image() {
        let image = Image {
            mime_type: "image/gif".into(),
            bytes: b"GIF89a".to_vec(),
        };
        let input = ImageInput::from_image(&image).unwrap();
        assert_eq!(input.decode().unwrap(), image);
        assert!(ImageInput::from_image(&Image {
            mime_type: "image/gif".into(),
            bytes: vec![],
        })
        .is_err());
    }
}
