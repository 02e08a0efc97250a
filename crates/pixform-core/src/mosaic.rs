//! Bayer sensor-mosaic synthesis.
//!
//! Maps a 3-channel buffer onto a single-channel color-filter-array layout:
//! each output pixel keeps exactly one of its input channels, chosen by
//! row/column parity per the selected 2x2 tile. This is a lossy subsampling
//! mosaic; no interpolation or demosaicing is performed.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConvertError;
use crate::{RasterBuffer, Samples};

/// The four supported 2x2 color-filter-array tiles.
///
/// Names read left to right, top to bottom: `Bggr` places blue at (0,0),
/// green at (0,1) and (1,0), red at (1,1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BayerPattern {
    Bggr,
    Grbg,
    Gbrg,
    Rggb,
}

impl BayerPattern {
    /// Which input channel (0=R, 1=G, 2=B) survives at the given pixel site.
    #[inline]
    fn channel_at(self, row: usize, col: usize) -> usize {
        match (self, row & 1, col & 1) {
            (BayerPattern::Bggr, 0, 0) => 2,
            (BayerPattern::Bggr, 0, 1) => 1,
            (BayerPattern::Bggr, 1, 0) => 1,
            (BayerPattern::Bggr, _, _) => 0,

            (BayerPattern::Grbg, 0, 0) => 1,
            (BayerPattern::Grbg, 0, 1) => 0,
            (BayerPattern::Grbg, 1, 0) => 2,
            (BayerPattern::Grbg, _, _) => 1,

            (BayerPattern::Gbrg, 0, 0) => 1,
            (BayerPattern::Gbrg, 0, 1) => 2,
            (BayerPattern::Gbrg, 1, 0) => 0,
            (BayerPattern::Gbrg, _, _) => 1,

            (BayerPattern::Rggb, 0, 0) => 0,
            (BayerPattern::Rggb, 0, 1) => 1,
            (BayerPattern::Rggb, 1, 0) => 1,
            (BayerPattern::Rggb, _, _) => 2,
        }
    }
}

impl FromStr for BayerPattern {
    type Err = ConvertError;

    /// Case-insensitive name match against the four tile names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "BGGR" => Ok(BayerPattern::Bggr),
            "GRBG" => Ok(BayerPattern::Grbg),
            "GBRG" => Ok(BayerPattern::Gbrg),
            "RGGB" => Ok(BayerPattern::Rggb),
            other => Err(ConvertError::InvalidInput(format!(
                "unknown Bayer pattern: {other:?} (expected BGGR, GRBG, GBRG, or RGGB)"
            ))),
        }
    }
}

/// Synthesize a single-channel Bayer mosaic from a 3-channel buffer.
///
/// The output has the same width and height as the input; each sample is
/// written once into a freshly allocated plane at its computed index.
///
/// # Errors
///
/// Returns `InvalidInput` for buffers that are not 3-channel.
pub fn rgb_to_bayer(
    image: &RasterBuffer,
    pattern: BayerPattern,
) -> Result<RasterBuffer, ConvertError> {
    if image.channels != 3 {
        return Err(ConvertError::InvalidInput(format!(
            "Bayer mosaic requires a 3-channel buffer, got {} channel(s)",
            image.channels
        )));
    }

    let width = image.width as usize;
    let height = image.height as usize;
    let samples = match &image.samples {
        Samples::U8(v) => Samples::U8(mosaic_plane(v, width, height, pattern)),
        Samples::U16(v) => Samples::U16(mosaic_plane(v, width, height, pattern)),
    };

    Ok(RasterBuffer {
        width: image.width,
        height: image.height,
        channels: 1,
        max_value: image.max_value,
        samples,
    })
}

fn mosaic_plane<T: Copy + Default>(
    interleaved: &[T],
    width: usize,
    height: usize,
    pattern: BayerPattern,
) -> Vec<T> {
    let mut plane = vec![T::default(); width * height];
    for row in 0..height {
        for col in 0..width {
            let site = row * width + col;
            plane[site] = interleaved[site * 3 + pattern.channel_at(row, col)];
        }
    }
    plane
}
