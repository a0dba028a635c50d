//! Error types for the whiteout crate.

/// Errors that can occur while deriving transparency or processing files.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Pixel data is malformed: buffer length or dimensions do not line up.
    #[error("invalid pixel data: {0}")]
    InvalidPixelData(String),

    /// A tuning parameter is out of range. Raised before any pixel is touched.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// An I/O error occurred while reading, copying or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The image format is not supported.
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// An error occurred while decoding or encoding an image.
    #[error("image processing error: {0}")]
    Image(#[from] image::ImageError),
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let io_err = Error::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert!(io_err.to_string().contains("gone"));

        let unsupported = Error::UnsupportedFormat("tiff".to_string());
        assert!(unsupported.to_string().contains("tiff"));

        let pixels = Error::InvalidPixelData("alpha map is 3x3, image is 4x4".to_string());
        let msg = pixels.to_string();
        assert!(msg.starts_with("invalid pixel data"));
        assert!(msg.contains("3x3"));

        let config = Error::InvalidConfiguration("blur_radius must be >= 0".to_string());
        assert!(config.to_string().contains("blur_radius"));
    }
}
