//! Loading images from the places a user can pick them: a local file, a
//! remote URL fetched server-side, or one of the built-in samples.

use crate::data_uri::{Image, ImageInput};
use crate::error::{Error, Result};
use image::ImageFormat;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};
use url::Url;

const OCTET_STREAM: &str = "application/octet-stream";

/// A sample photo that can be analysed without uploading anything
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct Sample {
    pub id: &'static str,
    pub url: &'static str,
    pub alt: &'static str,
    pub hint: &'static str,
}

pub const SAMPLES: &[Sample] = &[
    Sample {
        id: "cat1",
        url: "https://picsum.photos/id/219/300/200",
        alt: "A fluffy cat",
        hint: "cat",
    },
    Sample {
        id: "dog1",
        url: "https://picsum.photos/id/237/300/200",
        alt: "A black puppy",
        hint: "dog",
    },
    Sample {
        id: "cat2",
        url: "https://picsum.photos/id/1074/300/200",
        alt: "A cat yawning",
        hint: "cat",
    },
    Sample {
        id: "dog2",
        url: "https://picsum.photos/id/568/300/200",
        alt: "A dog in a field",
        hint: "dog",
    },
];

pub fn sample(id: &str) -> Option<&'static Sample> {
    SAMPLES.iter().find(|s| s.id == id)
}

/// Where an image comes from
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    Sample(&'static Sample),
    Url(Url),
    File(PathBuf),
}

impl FromStr for ImageSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if let Some(sample) = sample(s) {
            return Ok(ImageSource::Sample(sample));
        }
        if s.starts_with("http://") || s.starts_with("https://") {
            let url = Url::parse(s)
                .map_err(|e| Error::MalformedInput(format!("invalid URL {s:?}: {e}")))?;
            return Ok(ImageSource::Url(url));
        }
        Ok(ImageSource::File(PathBuf::from(s)))
    }
}

/// Guess an image MIME type from its magic bytes
pub fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    let mime = match image::guess_format(bytes).ok()? {
        ImageFormat::Png => "image/png",
        ImageFormat::Jpeg => "image/jpeg",
        ImageFormat::Gif => "image/gif",
        ImageFormat::WebP => "image/webp",
        ImageFormat::Bmp => "image/bmp",
        ImageFormat::Tiff => "image/tiff",
        ImageFormat::Ico => "image/x-icon",
        ImageFormat::Avif => "image/avif",
        _ => return None,
    };
    Some(mime)
}

fn mime_from_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        _ => return None,
    };
    Some(mime)
}

/// Read a local image file into a data URI. Files that are not images are
/// rejected.
pub async fn read_file_as_data_uri(path: &Path) -> Result<ImageInput> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| Error::MalformedInput(format!("cannot read {}: {e}", path.display())))?;

    let mime_type = sniff_mime(&bytes)
        .or_else(|| mime_from_extension(path))
        .ok_or_else(|| {
            Error::MalformedInput(format!(
                "invalid file type: {} is not an image",
                path.display()
            ))
        })?;

    debug!("read {} ({} bytes, {mime_type})", path.display(), bytes.len());
    ImageInput::from_image(&Image {
        mime_type: mime_type.to_string(),
        bytes,
    })
}

/// Fetches remote images on behalf of the user
#[derive(Debug, Clone)]
pub struct ImageFetcher {
    http: reqwest::Client,
}

impl ImageFetcher {
    pub fn new(http: reqwest::Client) -> Self {
        ImageFetcher { http }
    }

    /// Download `url` and return its raw bytes with their MIME type
    pub async fn fetch(&self, url: &Url) -> Result<Image> {
        debug!("fetching remote image {url}");
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| Error::Fetch(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Fetch(format!("{url} responded with {status}")));
        }

        let declared = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(|v| v.trim().to_ascii_lowercase())
            .filter(|v| !v.is_empty() && v != OCTET_STREAM);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Fetch(format!("failed to read body of {url}: {e}")))?;
        if bytes.is_empty() {
            return Err(Error::Fetch(format!("{url} returned an empty body")));
        }

        let mime_type = declared
            .or_else(|| sniff_mime(&bytes).map(String::from))
            .unwrap_or_else(|| OCTET_STREAM.to_string());

        info!("fetched {url} ({} bytes, {mime_type})", bytes.len());
        Ok(Image {
            mime_type,
            bytes: bytes.to_vec(),
        })
    }

    /// Download `url` and convert it to a data URI
    pub async fn fetch_as_data_uri(&self, url: &Url) -> Result<ImageInput> {
        let image = self.fetch(url).await?;
        ImageInput::from_image(&image)
    }

    /// Turn any image source into a data URI
    pub async fn load(&self, source: &ImageSource) -> Result<ImageInput> {
        match source {
            ImageSource::Sample(sample) => {
                let url = Url::parse(sample.url)
                    .map_err(|e| Error::MalformedInput(format!("invalid sample URL: {e}")))?;
                self.fetch_as_data_uri(&url).await
            }
            ImageSource::Url(url) => self.fetch_as_data_uri(url).await,
            ImageSource::File(path) => read_file_as_data_uri(path).await,
        }
    }
}
