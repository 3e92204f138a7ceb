//! Image reference resolution and loading
//!
//! The `imageUrl` / `gcsPath` request parameters are parsed into an
//! [`ImageRef`]. Cloud Storage objects are handed to the vision API by
//! reference; everything else is loaded here and sent inline.

use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

/// Image loading errors
#[derive(Debug, Error)]
pub enum ImageSourceError {
    #[error("Invalid image reference: {0}")]
    InvalidReference(String),

    #[error("Unsupported image reference scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Failed to fetch image {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("Failed to read image file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Image is {size} bytes, limit is {limit} bytes")]
    TooLarge { size: u64, limit: u64 },
}

/// A parsed image reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRef {
    /// http(s) URL, downloaded by the service
    Remote(Url),
    /// `gs://bucket/object`, passed to the vision API as-is
    Gcs(String),
    /// Local filesystem path (bare path or `file:` URL)
    Local(PathBuf),
}

impl ImageRef {
    pub fn parse(raw: &str) -> Result<Self, ImageSourceError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ImageSourceError::InvalidReference(
                "image reference is empty".to_string(),
            ));
        }

        match Url::parse(trimmed) {
            Ok(url) => match url.scheme() {
                "http" | "https" => Ok(ImageRef::Remote(url)),
                "gs" => {
                    let has_bucket = url.host_str().map_or(false, |h| !h.is_empty());
                    let has_object = url.path().len() > 1;
                    if has_bucket && has_object {
                        Ok(ImageRef::Gcs(trimmed.to_string()))
                    } else {
                        Err(ImageSourceError::InvalidReference(format!(
                            "expected gs://bucket/object, got {}",
                            trimmed
                        )))
                    }
                }
                "file" => url.to_file_path().map(ImageRef::Local).map_err(|_| {
                    ImageSourceError::InvalidReference(format!("not a local file URL: {}", trimmed))
                }),
                // Windows drive letters parse as one-letter schemes
                scheme if scheme.len() == 1 => Ok(ImageRef::Local(PathBuf::from(trimmed))),
                scheme => Err(ImageSourceError::UnsupportedScheme(scheme.to_string())),
            },
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                Ok(ImageRef::Local(PathBuf::from(trimmed)))
            }
            Err(e) => Err(ImageSourceError::InvalidReference(format!(
                "{}: {}",
                trimmed, e
            ))),
        }
    }

    pub fn is_gcs(&self) -> bool {
        matches!(self, ImageRef::Gcs(_))
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageRef::Remote(url) => write!(f, "{}", url),
            ImageRef::Gcs(uri) => write!(f, "{}", uri),
            ImageRef::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

/// What gets sent to the vision API for one image
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImagePayload {
    Inline(Vec<u8>),
    GcsUri(String),
}

/// Loads image bytes for references that cannot be passed by URI
#[derive(Debug, Clone)]
pub struct ImageLoader {
    http_client: reqwest::Client,
    max_bytes: u64,
}

impl ImageLoader {
    pub fn new(http_client: reqwest::Client, max_bytes: u64) -> Self {
        Self {
            http_client,
            max_bytes,
        }
    }

    pub async fn load(&self, image: &ImageRef) -> Result<ImagePayload, ImageSourceError> {
        match image {
            ImageRef::Gcs(uri) => Ok(ImagePayload::GcsUri(uri.clone())),
            ImageRef::Remote(url) => self.fetch(url).await.map(ImagePayload::Inline),
            ImageRef::Local(path) => self.read_file(path).await.map(ImagePayload::Inline),
        }
    }

    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, ImageSourceError> {
        let fetch_error = |reason: String| ImageSourceError::Fetch {
            url: url.to_string(),
            reason,
        };

        tracing::debug!(url = %url, "Downloading image");

        let mut response = self
            .http_client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_error(format!("HTTP {}", status.as_u16())));
        }

        if let Some(length) = response.content_length() {
            self.check_size(length)?;
        }

        // Content-Length may be absent or wrong; count what actually arrives
        let mut bytes = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| fetch_error(e.to_string()))?
        {
            self.check_size((bytes.len() + chunk.len()) as u64)?;
            bytes.extend_from_slice(&chunk);
        }

        tracing::debug!(url = %url, bytes = bytes.len(), "Image downloaded");
        Ok(bytes)
    }

    async fn read_file(&self, path: &Path) -> Result<Vec<u8>, ImageSourceError> {
        let io_error = |source: std::io::Error| ImageSourceError::Io {
            path: path.display().to_string(),
            source,
        };

        let metadata = tokio::fs::metadata(path).await.map_err(io_error)?;
        self.check_size(metadata.len())?;

        tokio::fs::read(path).await.map_err(io_error)
    }

    fn check_size(&self, size: u64) -> Result<(), ImageSourceError> {
        if size > self.max_bytes {
            return Err(ImageSourceError::TooLarge {
                size,
                limit: self.max_bytes,
            });
        }
        Ok(())
    }
}
