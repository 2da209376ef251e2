//! Error types for RawScope.

use crate::format::PixelFormat;
use thiserror::Error;

/// Main error type for RawScope operations.
#[derive(Error, Debug)]
pub enum RawScopeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pixel format {0} cannot be decoded")]
    UnknownFormat(PixelFormat),

    #[error("frame lies past end of file: expected {expected} bytes, {actual} available")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("invalid dimensions {width}x{height} for {format}")]
    InvalidDimensions {
        width: u32,
        height: u32,
        format: PixelFormat,
    },

    #[error("bit depth {0} is not supported")]
    UnsupportedBitDepth(u32),
}

/// Result type alias for RawScope operations.
pub type Result<T> = std::result::Result<T, RawScopeError>;
