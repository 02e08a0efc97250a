//! Chroma-subsampled byte packing.
//!
//! Consumes full-resolution luma/chroma planes produced by the codec
//! collaborator and serializes them into raw, headerless byte streams. Only
//! the planar 4:2:2 layout involves packing logic here (horizontal chroma
//! downsampling delegated to the codec's resize, then plane concatenation);
//! the packed 4:2:2 stream arrives fully interleaved from the collaborator
//! and is passed through verbatim.
//!
//! Dimensions are not recorded in the output; the caller must track them.

use serde::{Deserialize, Serialize};

use crate::codec::{self, ResizeFilter, YuvPlanes};
use crate::error::ConvertError;
use crate::RasterBuffer;

/// Supported 4:2:2 byte layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChromaLayout {
    /// Three contiguous planes: Y, then half-width U, then half-width V.
    Planar422,
    /// Interleaved YUYV: Y0, U, Y1, V per two horizontal pixels.
    Packed422,
}

/// Serialize planar 4:2:2: the full luma plane followed by each chroma
/// plane horizontally downsampled to `floor(width / 2)` columns at
/// unchanged height.
///
/// Odd source widths lose their last chroma column to the floor division;
/// that is lossy but deliberate, not an error.
pub fn pack_planar_422(planes: &YuvPlanes) -> Result<Vec<u8>, ConvertError> {
    let half_width = planes.width / 2;
    if half_width == 0 {
        return Err(ConvertError::InvalidInput(
            "planar 4:2:2 needs a width of at least 2".to_string(),
        ));
    }

    let u = codec::resize_plane(
        &planes.u,
        planes.width,
        planes.height,
        half_width,
        planes.height,
        ResizeFilter::Area,
    )?;
    let v = codec::resize_plane(
        &planes.v,
        planes.width,
        planes.height,
        half_width,
        planes.height,
        ResizeFilter::Area,
    )?;

    let mut out = Vec::with_capacity(planes.y.len() + u.len() + v.len());
    out.extend_from_slice(&planes.y);
    out.extend_from_slice(&u);
    out.extend_from_slice(&v);
    Ok(out)
}

/// Produce the serialized byte stream for a layout straight from an RGB
/// buffer, converting through the codec collaborator.
pub fn pack(image: &RasterBuffer, layout: ChromaLayout) -> Result<Vec<u8>, ConvertError> {
    match layout {
        ChromaLayout::Planar422 => pack_planar_422(&codec::rgb_to_yuv_planes(image)?),
        // Fully produced by the collaborator; serialized verbatim.
        ChromaLayout::Packed422 => codec::rgb_to_yuyv(image),
    }
}
