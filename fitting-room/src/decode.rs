use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use bytes::Bytes;
use image::RgbaImage;

/// Where an image comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Bytes(Bytes),
    Path(PathBuf),
    Url(String),
}

impl ImageSource {
    /// Interpret a catalog locator. `http(s)` locators stay URLs, anything
    /// else is a path, relative ones resolved against `base`.
    pub fn locate(locator: &str, base: Option<&Path>) -> Self {
        if locator.starts_with("http://") || locator.starts_with("https://") {
            return ImageSource::Url(locator.to_string());
        }
        let path = Path::new(locator);
        match base {
            Some(base) if path.is_relative() => ImageSource::Path(base.join(path)),
            _ => ImageSource::Path(path.to_path_buf()),
        }
    }
}

impl From<Bytes> for ImageSource {
    fn from(value: Bytes) -> Self {
        ImageSource::Bytes(value)
    }
}

impl From<Vec<u8>> for ImageSource {
    fn from(value: Vec<u8>) -> Self {
        ImageSource::Bytes(value.into())
    }
}

impl From<PathBuf> for ImageSource {
    fn from(value: PathBuf) -> Self {
        ImageSource::Path(value)
    }
}

impl From<&Path> for ImageSource {
    fn from(value: &Path) -> Self {
        ImageSource::Path(value.to_path_buf())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ImageDecodeError {
    #[error("Failed to read image file {0}")]
    Io(PathBuf, #[source] std::io::Error),
    #[error("Failed to fetch image {0}")]
    Fetch(String, #[source] reqwest::Error),
    #[error("Unsupported or malformed image: {0}")]
    Image(#[from] image::ImageError),
    #[error("Image decoding timed out after {0:?}")]
    TimedOut(Duration),
    #[error("Image decoding task failed")]
    Task(#[from] tokio::task::JoinError),
}

/// Load and decode `source` into an RGBA raster.
///
/// Fetching happens on the async runtime, decoding on the blocking pool.
/// Nothing is cancelled when `timeout` elapses except this future; the
/// caller simply gets [`ImageDecodeError::TimedOut`].
pub async fn decode(
    source: &ImageSource,
    timeout: Option<Duration>,
) -> Result<RgbaImage, ImageDecodeError> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, load(source))
            .await
            .map_err(|_elapsed| ImageDecodeError::TimedOut(limit))?,
        None => load(source).await,
    }
}

/// Decode raw bytes synchronously.
pub fn decode_bytes(bytes: &[u8]) -> Result<RgbaImage, ImageDecodeError> {
    let image = image::load_from_memory(bytes)?;
    Ok(image.to_rgba8())
}

async fn load(source: &ImageSource) -> Result<RgbaImage, ImageDecodeError> {
    let bytes = read_bytes(source).await?;
    log::debug!("Decoding {} bytes", bytes.len());
    tokio::task::spawn_blocking(move || decode_bytes(&bytes)).await?
}

async fn read_bytes(source: &ImageSource) -> Result<Bytes, ImageDecodeError> {
    match source {
        ImageSource::Bytes(bytes) => Ok(bytes.clone()),
        ImageSource::Path(path) => tokio::fs::read(path)
            .await
            .map(Bytes::from)
            .map_err(|err| ImageDecodeError::Io(path.clone(), err)),
        ImageSource::Url(url) => {
            let fetch_err = |err| ImageDecodeError::Fetch(url.clone(), err);
            let response = reqwest::get(url)
                .await
                .and_then(|res| res.error_for_status())
                .map_err(fetch_err)?;
            response.bytes().await.map_err(fetch_err)
        }
    }
}
