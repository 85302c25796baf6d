use image::ImageFormat;

/// 10 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum UploadError {
    #[error("File is too large ({size} bytes, at most {limit} allowed)")]
    TooLarge { size: usize, limit: usize },
    #[error("Only image files can be uploaded, got {0}")]
    NotAnImageType(String),
    #[error("Only image files can be uploaded")]
    NotAnImage,
}

/// Checks a user upload before it is handed to the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadPolicy {
    pub max_bytes: usize,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl UploadPolicy {
    /// Returns the sniffed format on success. `declared_mime` is whatever the
    /// client claimed the file to be, if anything.
    pub fn check(
        &self,
        bytes: &[u8],
        declared_mime: Option<&str>,
    ) -> Result<ImageFormat, UploadError> {
        if let Some(mime) = declared_mime {
            if !mime.starts_with("image/") {
                return Err(UploadError::NotAnImageType(mime.to_string()));
            }
        }
        if bytes.len() > self.max_bytes {
            return Err(UploadError::TooLarge {
                size: bytes.len(),
                limit: self.max_bytes,
            });
        }
        image::guess_format(bytes).map_err(|_err| UploadError::NotAnImage)
    }
}
