//! External raster codec adapter.
//!
//! Everything the core does not hand-write lives behind this module:
//! compressed-format decode and encode, geometric resize, and colorspace
//! conversion. Decode applies EXIF orientation before handing the buffer
//! to the pipeline. The `image` crate does the heavy lifting; this module
//! only adapts between its types and [`RasterBuffer`].

use std::io::Cursor;
use std::path::Path;
use std::str::FromStr;

use exif::{In, Reader, Tag};
use image::{DynamicImage, ExtendedColorType, ImageReader};
use serde::{Deserialize, Serialize};

use crate::error::ConvertError;
use crate::{RasterBuffer, Samples};

/// Interpolation kernel for resize operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ResizeFilter {
    /// Nearest neighbor (fastest, lowest quality).
    Nearest,
    /// Bilinear interpolation.
    #[default]
    Linear,
    /// Bicubic (Catmull-Rom) interpolation.
    Cubic,
    /// Area averaging, preferred for downsampling.
    Area,
    /// Lanczos3 (slowest, highest quality).
    Lanczos,
}

impl ResizeFilter {
    /// Convert to the image crate's FilterType.
    ///
    /// The image crate ships no dedicated area-averaging kernel; `Area` maps
    /// to the triangle filter, its closest downsampling match.
    pub fn to_image_filter(self) -> image::imageops::FilterType {
        match self {
            ResizeFilter::Nearest => image::imageops::FilterType::Nearest,
            ResizeFilter::Linear => image::imageops::FilterType::Triangle,
            ResizeFilter::Cubic => image::imageops::FilterType::CatmullRom,
            ResizeFilter::Area => image::imageops::FilterType::Triangle,
            ResizeFilter::Lanczos => image::imageops::FilterType::Lanczos3,
        }
    }
}

impl FromStr for ResizeFilter {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nearest" => Ok(ResizeFilter::Nearest),
            "linear" => Ok(ResizeFilter::Linear),
            "cubic" => Ok(ResizeFilter::Cubic),
            "area" => Ok(ResizeFilter::Area),
            "lanczos" => Ok(ResizeFilter::Lanczos),
            other => Err(ConvertError::InvalidInput(format!(
                "unknown interpolation: {other:?} (expected nearest, linear, cubic, area, or lanczos)"
            ))),
        }
    }
}

/// Decode a compressed image (JPEG, PNG, ...) from bytes.
///
/// EXIF orientation is applied before the buffer is returned, so downstream
/// stages always see upright pixels.
pub fn decode_bytes(bytes: &[u8]) -> Result<RasterBuffer, ConvertError> {
    let orientation = extract_orientation(bytes);

    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ConvertError::Codec(e.to_string()))?;
    let img = reader.decode()?;

    let img = apply_orientation(img, orientation);
    Ok(RasterBuffer::from_rgb_image(img.into_rgb8()))
}

/// Read and decode a compressed image file.
pub fn decode_file(path: &Path) -> Result<RasterBuffer, ConvertError> {
    let bytes = std::fs::read(path)?;
    decode_bytes(&bytes)
}

/// Encode a buffer to a compressed container chosen by the output path's
/// extension.
///
/// # Errors
///
/// Returns `InvalidInput` for 16-bit buffers (normalize first) and `Codec`
/// when the image crate rejects the path or fails to encode.
pub fn encode_file(image: &RasterBuffer, path: &Path) -> Result<(), ConvertError> {
    let data = image.samples.as_u8().ok_or_else(|| {
        ConvertError::InvalidInput("16-bit buffers must be normalized before codec encode".to_string())
    })?;
    let color = match image.channels {
        1 => ExtendedColorType::L8,
        3 => ExtendedColorType::Rgb8,
        other => {
            return Err(ConvertError::InvalidInput(format!(
                "cannot encode a {other}-channel buffer"
            )));
        }
    };
    image::save_buffer(path, data, image.width, image.height, color)?;
    Ok(())
}

/// Extract the EXIF orientation tag (1-8), defaulting to 1 (upright) when
/// no usable EXIF data exists.
fn extract_orientation(bytes: &[u8]) -> u32 {
    let reader = Reader::new();
    let mut cursor = Cursor::new(bytes);
    match reader.read_from_container(&mut cursor) {
        Ok(exif) => exif
            .get_field(Tag::Orientation, In::PRIMARY)
            .and_then(|field| field.value.get_uint(0))
            .unwrap_or(1),
        Err(_) => 1,
    }
}

/// Apply an EXIF orientation transformation.
fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}

/// Resize a buffer to exact dimensions with the given kernel.
///
/// All four buffer shapes (gray/RGB at 8 or 16 bits) are supported; the
/// maxval is carried through unchanged.
pub fn resize(
    image: &RasterBuffer,
    width: u32,
    height: u32,
    filter: ResizeFilter,
) -> Result<RasterBuffer, ConvertError> {
    if width == 0 || height == 0 {
        return Err(ConvertError::InvalidInput(format!(
            "resize target {width}x{height} must be non-zero"
        )));
    }

    // Fast path: nothing to do.
    if image.width == width && image.height == height {
        return Ok(image.clone());
    }

    let kernel = filter.to_image_filter();
    let samples = match (&image.samples, image.channels) {
        (Samples::U8(v), 1) => {
            let src = raw_buffer::<image::Luma<u8>>(image, v.clone())?;
            Samples::U8(image::imageops::resize(&src, width, height, kernel).into_raw())
        }
        (Samples::U8(v), 3) => {
            let src = raw_buffer::<image::Rgb<u8>>(image, v.clone())?;
            Samples::U8(image::imageops::resize(&src, width, height, kernel).into_raw())
        }
        (Samples::U16(v), 1) => {
            let src = raw_buffer::<image::Luma<u16>>(image, v.clone())?;
            Samples::U16(image::imageops::resize(&src, width, height, kernel).into_raw())
        }
        (Samples::U16(v), 3) => {
            let src = raw_buffer::<image::Rgb<u16>>(image, v.clone())?;
            Samples::U16(image::imageops::resize(&src, width, height, kernel).into_raw())
        }
        (_, other) => {
            return Err(ConvertError::InvalidInput(format!(
                "cannot resize a {other}-channel buffer"
            )));
        }
    };

    Ok(RasterBuffer {
        width,
        height,
        channels: image.channels,
        max_value: image.max_value,
        samples,
    })
}

fn raw_buffer<P>(
    image: &RasterBuffer,
    samples: Vec<P::Subpixel>,
) -> Result<image::ImageBuffer<P, Vec<P::Subpixel>>, ConvertError>
where
    P: image::Pixel,
{
    image::ImageBuffer::from_raw(image.width, image.height, samples)
        .ok_or_else(|| ConvertError::InvalidInput("sample count does not match dimensions".to_string()))
}

/// Resize a single full-resolution plane (used for chroma downsampling).
pub(crate) fn resize_plane(
    plane: &[u8],
    width: u32,
    height: u32,
    new_width: u32,
    new_height: u32,
    filter: ResizeFilter,
) -> Result<Vec<u8>, ConvertError> {
    let src = image::GrayImage::from_raw(width, height, plane.to_vec()).ok_or_else(|| {
        ConvertError::InvalidInput("plane length does not match dimensions".to_string())
    })?;
    Ok(image::imageops::resize(&src, new_width, new_height, filter.to_image_filter()).into_raw())
}

// ============================================================================
// Colorspace conversion
// ============================================================================

/// Convert an RGB buffer to grayscale with the conventional BT.601 integer
/// weights (the same weighting compressed codecs use for luma).
pub fn rgb_to_gray(image: &RasterBuffer) -> Result<RasterBuffer, ConvertError> {
    let rgb = require_rgb8(image)?;
    let gray: Vec<u8> = rgb
        .chunks_exact(3)
        .map(|px| {
            let (r, g, b) = (px[0] as u32, px[1] as u32, px[2] as u32);
            ((r * 299 + g * 587 + b * 114 + 500) / 1000) as u8
        })
        .collect();
    Ok(RasterBuffer::new_u8(image.width, image.height, 1, gray))
}

/// Full-resolution luma and chroma planes, one sample per pixel each.
#[derive(Debug, Clone)]
pub struct YuvPlanes {
    pub width: u32,
    pub height: u32,
    pub y: Vec<u8>,
    pub u: Vec<u8>,
    pub v: Vec<u8>,
}

/// Convert an RGB buffer to full-resolution YUV planes.
///
/// Uses the classic 8-bit analog-YUV mapping:
/// `Y = 0.299R + 0.587G + 0.114B`, `U = 0.492(B-Y) + 128`,
/// `V = 0.877(R-Y) + 128`, rounded and clamped to 0..=255.
pub fn rgb_to_yuv_planes(image: &RasterBuffer) -> Result<YuvPlanes, ConvertError> {
    let rgb = require_rgb8(image)?;
    let pixels = image.pixel_count();
    let mut y_plane = Vec::with_capacity(pixels);
    let mut u_plane = Vec::with_capacity(pixels);
    let mut v_plane = Vec::with_capacity(pixels);

    for px in rgb.chunks_exact(3) {
        let (r, g, b) = (px[0] as f32, px[1] as f32, px[2] as f32);
        let y = 0.299 * r + 0.587 * g + 0.114 * b;
        let u = 0.492 * (b - y) + 128.0;
        let v = 0.877 * (r - y) + 128.0;
        y_plane.push(y.round().clamp(0.0, 255.0) as u8);
        u_plane.push(u.round().clamp(0.0, 255.0) as u8);
        v_plane.push(v.round().clamp(0.0, 255.0) as u8);
    }

    Ok(YuvPlanes {
        width: image.width,
        height: image.height,
        y: y_plane,
        u: u_plane,
        v: v_plane,
    })
}

/// Produce the fully interleaved packed 4:2:2 (YUYV) byte stream.
///
/// Layout per two horizontal pixels: Y0, U, Y1, V, where U and V are the
/// rounded mean of the pair's chroma samples.
///
/// # Errors
///
/// Returns `InvalidInput` for odd widths; pixel pairs cannot be formed.
pub fn rgb_to_yuyv(image: &RasterBuffer) -> Result<Vec<u8>, ConvertError> {
    if image.width % 2 != 0 {
        return Err(ConvertError::InvalidInput(format!(
            "packed 4:2:2 requires an even width, got {}",
            image.width
        )));
    }
    let planes = rgb_to_yuv_planes(image)?;

    let width = image.width as usize;
    let mut out = Vec::with_capacity(image.pixel_count() * 2);
    for row in 0..image.height as usize {
        for pair in 0..width / 2 {
            let left = row * width + pair * 2;
            let right = left + 1;
            out.push(planes.y[left]);
            out.push(mean2(planes.u[left], planes.u[right]));
            out.push(planes.y[right]);
            out.push(mean2(planes.v[left], planes.v[right]));
        }
    }
    Ok(out)
}

/// Produce a planar 4:2:0 (YV12) byte stream: full Y plane, then the
/// quarter-resolution V plane, then U.
///
/// # Errors
///
/// Returns `InvalidInput` when width or height is odd; 2x2 chroma blocks
/// cannot be formed.
pub fn rgb_to_yv12(image: &RasterBuffer) -> Result<Vec<u8>, ConvertError> {
    if image.width % 2 != 0 || image.height % 2 != 0 {
        return Err(ConvertError::InvalidInput(format!(
            "planar 4:2:0 requires even dimensions, got {}x{}",
            image.width, image.height
        )));
    }
    let planes = rgb_to_yuv_planes(image)?;

    let width = image.width as usize;
    let half_w = width / 2;
    let half_h = (image.height / 2) as usize;
    let mut out = Vec::with_capacity(image.pixel_count() * 3 / 2);
    out.extend_from_slice(&planes.y);

    // V precedes U in the YV12 layout.
    for plane in [&planes.v, &planes.u] {
        for row in 0..half_h {
            for col in 0..half_w {
                let top = row * 2 * width + col * 2;
                let bottom = top + width;
                out.push(mean4(plane[top], plane[top + 1], plane[bottom], plane[bottom + 1]));
            }
        }
    }
    Ok(out)
}

#[inline]
fn mean2(a: u8, b: u8) -> u8 {
    ((a as u16 + b as u16 + 1) / 2) as u8
}

#[inline]
fn mean4(a: u8, b: u8, c: u8, d: u8) -> u8 {
    ((a as u16 + b as u16 + c as u16 + d as u16 + 2) / 4) as u8
}

fn require_rgb8(image: &RasterBuffer) -> Result<&[u8], ConvertError> {
    if image.channels != 3 {
        return Err(ConvertError::InvalidInput(format!(
            "colorspace conversion requires a 3-channel buffer, got {}",
            image.channels
        )));
    }
    image.samples.as_u8().ok_or_else(|| {
        ConvertError::InvalidInput("colorspace conversion requires 8-bit samples".to_string())
    })
}
