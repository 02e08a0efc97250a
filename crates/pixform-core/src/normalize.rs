//! Bit-depth normalization for wide-sample buffers.
//!
//! Buffers whose maxval exceeds 255 are rescaled against the *observed*
//! maximum sample, not the declared maxval. This amplifies low-energy images
//! (a 16-bit file whose brightest sample is 4000 maps that sample to 255)
//! and differs from the naive `sample / 257` rescale on purpose.

use crate::{RasterBuffer, Samples};

/// Rescale a buffer to 8-bit samples.
///
/// No-op for buffers already at 8 bits. For wide buffers every output sample
/// is `floor(sample * 255 / observed_max)`; an all-zero buffer stays all
/// zero rather than dividing by zero.
pub fn normalize_to_8bit(buffer: RasterBuffer) -> RasterBuffer {
    let wide = match &buffer.samples {
        Samples::U8(_) => return buffer,
        Samples::U16(v) => v,
    };

    let observed_max = wide.iter().copied().max().unwrap_or(0) as u32;
    let narrow: Vec<u8> = if observed_max == 0 {
        vec![0; wide.len()]
    } else {
        wide.iter()
            .map(|&s| (s as u32 * 255 / observed_max) as u8)
            .collect()
    };

    RasterBuffer {
        width: buffer.width,
        height: buffer.height,
        channels: buffer.channels,
        max_value: 255,
        samples: Samples::U8(narrow),
    }
}
