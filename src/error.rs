//! Error types for the batch-watermark crate.

/// Errors that can occur while compositing watermarks.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An input image could not be decoded into a raster.
    #[error("failed to decode {name}: {source}")]
    Decode {
        /// Filename of the input that failed.
        name: String,
        /// Underlying decoder error.
        #[source]
        source: image::ImageError,
    },

    /// Font data could not be parsed as a TrueType/OpenType face.
    #[error("invalid font data: {0}")]
    Font(String),

    /// A color string is neither a hex color nor a known color name.
    #[error("invalid color: {0}")]
    InvalidColor(String),

    /// An anchor tag is not one of the five supported positions.
    #[error("invalid anchor {0:?} (expected top-left, top-right, bottom-left, bottom-right or center)")]
    InvalidAnchor(String),

    /// The composited raster could not be encoded as PNG.
    #[error("failed to encode PNG: {0}")]
    Encode(#[source] image::ImageError),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
