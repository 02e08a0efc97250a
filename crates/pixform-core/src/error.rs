//! Error taxonomy shared by every conversion stage.
//!
//! A size mismatch between a PNM header and its sample data is deliberately
//! *not* an error: the pixel reader absorbs it and reports a
//! [`RecoveryOutcome`](crate::pnm::RecoveryOutcome) instead. Everything that
//! genuinely stops a conversion surfaces here and is attributed to the
//! offending file by the caller.

use thiserror::Error;

/// Errors that can occur during a single-file conversion.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The container magic or file extension is not recognized.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The textual preamble could not be parsed (dimensions, maxval,
    /// or non-numeric sample tokens).
    #[error("malformed header: {0}")]
    MalformedHeader(String),

    /// The sample stream contained zero decodable samples.
    #[error("no decodable samples in input")]
    EmptyData,

    /// Filesystem failure while reading or writing a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrong channel count, unknown pattern name, or otherwise unusable
    /// input handed to a transform stage.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Failure reported by the external raster codec (compressed decode,
    /// encode, or resize).
    #[error("codec error: {0}")]
    Codec(String),
}

impl From<image::ImageError> for ConvertError {
    fn from(err: image::ImageError) -> Self {
        ConvertError::Codec(err.to_string())
    }
}
