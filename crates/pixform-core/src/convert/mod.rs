//! File-level conversion operations.
//!
//! Each function here is one synchronous, whole-file conversion: read the
//! input entirely into memory, run it through the pipeline stages, write the
//! output, and return a [`ConversionReport`] with the dimensions actually
//! used. Errors are returned structurally; callers (the batch driver in
//! particular) attribute them to the offending path and keep going.

use std::path::Path;

use crate::chroma::{self, ChromaLayout};
use crate::codec::{self, ResizeFilter};
use crate::error::ConvertError;
use crate::mosaic::{self, BayerPattern};
use crate::normalize::normalize_to_8bit;
use crate::pnm::{self, PnmFormat, RecoveryOutcome};
use crate::RasterBuffer;

/// Which decoder family a source file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// One of the four PNM sub-formats, decoded by this crate.
    Pnm,
    /// A compressed container (JPEG, PNG, ...), decoded by the codec.
    Compressed,
}

/// Metadata for a completed single-file conversion.
///
/// `width`/`height` are the dimensions of the buffer that was actually
/// written; for PNM inputs they may differ from the declared header values,
/// in which case `recovery` says how they were reconciled.
#[derive(Debug, Clone, Copy)]
pub struct ConversionReport {
    pub width: u32,
    pub height: u32,
    pub recovery: Option<RecoveryOutcome>,
}

fn report(buffer: &RasterBuffer, recovery: Option<RecoveryOutcome>) -> ConversionReport {
    ConversionReport {
        width: buffer.width,
        height: buffer.height,
        recovery,
    }
}

/// Classify an input file, by extension first and magic bytes second.
///
/// The magic fallback covers extensionless or misnamed PNM files; anything
/// else unrecognized is an `UnsupportedFormat` failure.
pub fn sniff_input(path: &Path, bytes: &[u8]) -> Result<InputKind, ConvertError> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pgm" | "ppm" | "pnm" => return Ok(InputKind::Pnm),
        "jpg" | "jpeg" | "png" => return Ok(InputKind::Compressed),
        _ => {}
    }

    if matches!(bytes, [b'P', b'2' | b'3' | b'5' | b'6', ..]) {
        return Ok(InputKind::Pnm);
    }
    Err(ConvertError::UnsupportedFormat(
        path.display().to_string(),
    ))
}

/// Convert a PNM file to a compressed container chosen by the output
/// extension.
///
/// Wide samples are normalized to 8 bits before encoding; malformed sample
/// counts are recovered, and the outcome is surfaced in the report.
pub fn pnm_to_compressed(input: &Path, output: &Path) -> Result<ConversionReport, ConvertError> {
    let bytes = std::fs::read(input)?;
    let (buffer, outcome) = pnm::decode(&bytes)?;
    let buffer = normalize_to_8bit(buffer);
    codec::encode_file(&buffer, output)?;
    Ok(report(&buffer, Some(outcome)))
}

/// Convert a compressed image to the requested PNM sub-format.
///
/// Grayscale targets (P2/P5) get a BT.601 gray conversion first; `comment`
/// is honored only by the P3 writer.
pub fn compressed_to_pnm(
    input: &Path,
    output: &Path,
    format: PnmFormat,
    comment: Option<&str>,
) -> Result<ConversionReport, ConvertError> {
    let decoded = codec::decode_file(input)?;
    let buffer = if format.is_color() {
        decoded
    } else {
        codec::rgb_to_gray(&decoded)?
    };
    let encoded = pnm::encode(&buffer, format, comment)?;
    std::fs::write(output, encoded)?;
    Ok(report(&buffer, None))
}

/// Convert a compressed image to a headerless Bayer mosaic dump.
pub fn compressed_to_bayer(
    input: &Path,
    output: &Path,
    pattern: BayerPattern,
) -> Result<ConversionReport, ConvertError> {
    let decoded = codec::decode_file(input)?;
    let mosaic = mosaic::rgb_to_bayer(&decoded, pattern)?;
    let plane = mosaic.samples.as_u8().ok_or_else(|| {
        ConvertError::InvalidInput("mosaic output must be 8-bit".to_string())
    })?;
    std::fs::write(output, plane)?;
    Ok(report(&mosaic, None))
}

/// Convert a compressed image to a headerless chroma-subsampled 4:2:2 dump.
pub fn compressed_to_chroma(
    input: &Path,
    output: &Path,
    layout: ChromaLayout,
) -> Result<ConversionReport, ConvertError> {
    let decoded = codec::decode_file(input)?;
    let bytes = chroma::pack(&decoded, layout)?;
    std::fs::write(output, &bytes)?;
    Ok(report(&decoded, None))
}

/// Convert a compressed image to a planar 4:2:0 (YV12) dump.
///
/// The entire layout is produced by the codec collaborator and serialized
/// here as an opaque byte stream.
pub fn compressed_to_planar_420(
    input: &Path,
    output: &Path,
) -> Result<ConversionReport, ConvertError> {
    let decoded = codec::decode_file(input)?;
    let bytes = codec::rgb_to_yv12(&decoded)?;
    std::fs::write(output, &bytes)?;
    Ok(report(&decoded, None))
}

/// Target geometry for [`resize_file`].
///
/// Both dimensions given: exact. One given: the other follows the source
/// aspect ratio. Neither: the scale factor applies to both axes. Fractional
/// results truncate.
#[derive(Debug, Clone, Copy)]
pub struct ResizeTarget {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub scale: f64,
}

impl Default for ResizeTarget {
    fn default() -> Self {
        Self {
            width: None,
            height: None,
            scale: 1.0,
        }
    }
}

impl ResizeTarget {
    /// Resolve the target against the source dimensions.
    pub fn resolve(&self, src_width: u32, src_height: u32) -> (u32, u32) {
        match (self.width, self.height) {
            (Some(w), Some(h)) => (w, h),
            (Some(w), None) => {
                let h = (src_height as f64 * (w as f64 / src_width as f64)) as u32;
                (w, h)
            }
            (None, Some(h)) => {
                let w = (src_width as f64 * (h as f64 / src_height as f64)) as u32;
                (w, h)
            }
            (None, None) => (
                (src_width as f64 * self.scale) as u32,
                (src_height as f64 * self.scale) as u32,
            ),
        }
    }
}

/// Resize a file in place of its own container family.
///
/// PNM inputs are re-encoded in the same sub-format (magic and maxval
/// preserved, 16-bit included); compressed inputs are re-encoded by the
/// output path's extension.
pub fn resize_file(
    input: &Path,
    output: &Path,
    target: &ResizeTarget,
    filter: ResizeFilter,
) -> Result<ConversionReport, ConvertError> {
    let bytes = std::fs::read(input)?;
    match sniff_input(input, &bytes)? {
        InputKind::Pnm => {
            let (header, _) = pnm::parse_header(&bytes)?;
            let (buffer, outcome) = pnm::decode(&bytes)?;
            let (width, height) = target.resolve(buffer.width, buffer.height);
            let resized = codec::resize(&buffer, width, height, filter)?;
            let encoded = pnm::encode(&resized, header.format, None)?;
            std::fs::write(output, encoded)?;
            Ok(report(&resized, Some(outcome)))
        }
        InputKind::Compressed => {
            let buffer = codec::decode_bytes(&bytes)?;
            let (width, height) = target.resolve(buffer.width, buffer.height);
            let resized = codec::resize(&buffer, width, height, filter)?;
            codec::encode_file(&resized, output)?;
            Ok(report(&resized, None))
        }
    }
}
