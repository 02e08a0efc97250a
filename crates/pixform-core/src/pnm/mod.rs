//! PNM container codec: P2/P5 (grayscale) and P3/P6 (RGB).
//!
//! This module implements the hand-written part of the conversion pipeline:
//!
//! - Header parsing (magic, comments, dimensions, maxval)
//! - Sample decoding (ASCII tokens or raw binary, 8-bit and 16-bit)
//! - A dimension-recovery heuristic for files whose sample count disagrees
//!   with the declared dimensions
//! - Four independent serializers, one per sub-format, each reproducing its
//!   exact historical byte layout
//!
//! # Byte order
//!
//! 16-bit binary samples are read and written big-endian, the conventional
//! byte order for this container family.

mod decode;
mod encode;

pub use decode::{decode, parse_header};
pub use encode::{encode, DEFAULT_COLOR_COMMENT};

use serde::{Deserialize, Serialize};

/// The four supported PNM sub-formats, identified by their magic token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PnmFormat {
    /// P2 - grayscale, ASCII decimal tokens.
    PgmAscii,
    /// P5 - grayscale, binary samples.
    PgmBinary,
    /// P3 - RGB, ASCII decimal tokens.
    PpmAscii,
    /// P6 - RGB, binary samples.
    PpmBinary,
}

impl PnmFormat {
    /// Look up a format by its magic token.
    pub fn from_magic(magic: &str) -> Option<Self> {
        match magic {
            "P2" => Some(PnmFormat::PgmAscii),
            "P5" => Some(PnmFormat::PgmBinary),
            "P3" => Some(PnmFormat::PpmAscii),
            "P6" => Some(PnmFormat::PpmBinary),
            _ => None,
        }
    }

    /// The two-character magic token for this format.
    pub fn magic(self) -> &'static str {
        match self {
            PnmFormat::PgmAscii => "P2",
            PnmFormat::PgmBinary => "P5",
            PnmFormat::PpmAscii => "P3",
            PnmFormat::PpmBinary => "P6",
        }
    }

    /// Channel count: 1 for the grayscale magics, 3 for the RGB magics.
    pub fn channels(self) -> u8 {
        match self {
            PnmFormat::PgmAscii | PnmFormat::PgmBinary => 1,
            PnmFormat::PpmAscii | PnmFormat::PpmBinary => 3,
        }
    }

    /// True for the binary sub-formats (P5, P6).
    pub fn is_binary(self) -> bool {
        matches!(self, PnmFormat::PgmBinary | PnmFormat::PpmBinary)
    }

    /// True for the RGB sub-formats (P3, P6).
    pub fn is_color(self) -> bool {
        self.channels() == 3
    }

    /// The binary counterpart carrying the same channel count.
    pub fn to_binary(self) -> Self {
        match self {
            PnmFormat::PgmAscii | PnmFormat::PgmBinary => PnmFormat::PgmBinary,
            PnmFormat::PpmAscii | PnmFormat::PpmBinary => PnmFormat::PpmBinary,
        }
    }

    /// The ASCII counterpart carrying the same channel count.
    pub fn to_ascii(self) -> Self {
        match self {
            PnmFormat::PgmAscii | PnmFormat::PgmBinary => PnmFormat::PgmAscii,
            PnmFormat::PpmAscii | PnmFormat::PpmBinary => PnmFormat::PpmAscii,
        }
    }
}

/// Parsed PNM preamble. Comment lines preceding the dimension line are
/// discarded during parsing and never retained for round-trips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PnmHeader {
    /// Which of the four sub-formats the magic declared.
    pub format: PnmFormat,
    /// Declared width in pixels.
    pub width: u32,
    /// Declared height in pixels.
    pub height: u32,
    /// Declared maximum sample value, in 1..=65535.
    pub max_value: u16,
}

impl PnmHeader {
    /// Sample width in bytes for the binary sub-formats: 1 if maxval fits in
    /// a byte, else 2.
    pub fn sample_width(&self) -> usize {
        if self.max_value > 255 {
            2
        } else {
            1
        }
    }

    /// Sample count the declared dimensions call for.
    pub fn expected_samples(&self) -> usize {
        (self.width as usize) * (self.height as usize) * (self.format.channels() as usize)
    }
}

/// How the pixel reader reconciled the declared dimensions with the sample
/// count it actually decoded.
///
/// A mismatch is never surfaced as an error; the reader adjusts and reports
/// what it did here. The dimensions on the returned buffer are authoritative
/// and may differ from the header's declared values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// Sample count matched the declared dimensions exactly.
    Exact,
    /// Dimensions were re-derived from the actual pixel count.
    Adjusted { width: u32, height: u32 },
    /// Declared dimensions kept; missing tail samples zero-filled.
    Padded,
    /// Declared dimensions kept; surplus samples dropped.
    Truncated,
}

impl RecoveryOutcome {
    /// True unless the sample count matched the header exactly.
    pub fn was_recovered(&self) -> bool {
        !matches!(self, RecoveryOutcome::Exact)
    }
}
