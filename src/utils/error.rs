//! Error Handling Module
//!
//! Defines the closed set of error types for dataset preparation.
//! Uses thiserror for ergonomic error definitions; every variant names the
//! offending path and keeps the underlying cause where one exists.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for dataset-preparation operations
#[derive(Error, Debug)]
pub enum DataPrepError {
    /// A filesystem operation failed (missing, unreadable or unwritable path)
    #[error("filesystem error at '{}': {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An annotation file did not match the expected region-annotation schema
    #[error("annotation schema error in '{}': {detail}", path.display())]
    Schema { path: PathBuf, detail: String },

    /// An image could not be decoded or encoded
    #[error("image codec error at '{}': {source}", path.display())]
    ImageCodec {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Augmented samples were requested but the source directory holds no images
    #[error("no source images found in '{}'", dir.display())]
    NoSourceImages { dir: PathBuf },
}

impl DataPrepError {
    /// Shorthand for wrapping an IO error with the path it occurred on
    pub fn fs(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// Shorthand for a schema violation in a given annotation file
    pub fn schema(path: impl Into<PathBuf>, detail: impl Into<String>) -> Self {
        Self::Schema {
            path: path.into(),
            detail: detail.into(),
        }
    }

    /// Shorthand for wrapping an image decode/encode error with its path
    pub fn codec(path: impl Into<PathBuf>, source: image::ImageError) -> Self {
        Self::ImageCodec {
            path: path.into(),
            source,
        }
    }
}

/// Convenience Result type for dataset-preparation operations
pub type Result<T> = std::result::Result<T, DataPrepError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filesystem_error_display() {
        let err = DataPrepError::fs(
            "/data/waruna/Healthy",
            std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        );
        let msg = err.to_string();
        assert!(msg.contains("/data/waruna/Healthy"));
        assert!(msg.contains("not found"));
    }

    #[test]
    fn test_schema_error_display() {
        let err = DataPrepError::schema("/annotations/a.json", "no regions for 'x.jpg'");
        assert_eq!(
            err.to_string(),
            "annotation schema error in '/annotations/a.json': no regions for 'x.jpg'"
        );
    }

    #[test]
    fn test_no_source_images_display() {
        let err = DataPrepError::NoSourceImages {
            dir: PathBuf::from("/data/empty"),
        };
        assert!(err.to_string().contains("/data/empty"));
    }

    #[test]
    fn test_source_is_preserved() {
        let err = DataPrepError::fs(
            "/tmp/x",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(std::error::Error::source(&err).is_some());
    }
}
