//! Pixform Core - Raster container and pixel-layout conversion library
//!
//! This crate converts raster images between container formats (JPEG/PNG via
//! the external codec, plus the four PNM sub-formats implemented here) and
//! between pixel layouts (Bayer sensor mosaics, chroma-subsampled YUV).
//!
//! The hand-written portion is the PNM codec: a tolerant header parser, a
//! pixel reader with a best-effort dimension-recovery heuristic for malformed
//! or truncated payloads, a bit-depth normalizer, and four exact serializers.
//! Compressed-format decode/encode, resize kernels, and colorspace math are
//! delegated to the `image` crate through the [`codec`] module.

pub mod chroma;
pub mod codec;
pub mod convert;
pub mod error;
pub mod mosaic;
pub mod normalize;
pub mod pnm;

pub use chroma::ChromaLayout;
pub use codec::ResizeFilter;
pub use error::ConvertError;
pub use mosaic::BayerPattern;
pub use pnm::{PnmFormat, PnmHeader, RecoveryOutcome};

/// Flat sample storage at one of the two supported sample widths.
///
/// PNM headers with a maxval above 255 carry 16-bit samples; everything else
/// is 8-bit. Transform stages that only operate on 8-bit data (mosaic
/// synthesis, chroma packing) reject 16-bit buffers with `InvalidInput`
/// unless noted otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Samples {
    /// One byte per sample.
    U8(Vec<u8>),
    /// Two bytes per sample (stored big-endian on disk).
    U16(Vec<u16>),
}

impl Samples {
    /// Number of samples, independent of sample width.
    pub fn len(&self) -> usize {
        match self {
            Samples::U8(v) => v.len(),
            Samples::U16(v) => v.len(),
        }
    }

    /// True when no samples are present.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all samples past `len`.
    pub fn truncate(&mut self, len: usize) {
        match self {
            Samples::U8(v) => v.truncate(len),
            Samples::U16(v) => v.truncate(len),
        }
    }

    /// Zero-extend to `len` samples.
    pub fn resize_with_zeros(&mut self, len: usize) {
        match self {
            Samples::U8(v) => v.resize(len, 0),
            Samples::U16(v) => v.resize(len, 0),
        }
    }

    /// Borrow the 8-bit sample slice, if this buffer is 8-bit.
    pub fn as_u8(&self) -> Option<&[u8]> {
        match self {
            Samples::U8(v) => Some(v),
            Samples::U16(_) => None,
        }
    }

    /// Borrow the 16-bit sample slice, if this buffer is 16-bit.
    pub fn as_u16(&self) -> Option<&[u16]> {
        match self {
            Samples::U8(_) => None,
            Samples::U16(v) => Some(v),
        }
    }
}

/// A decoded raster image: dimensions, channel count, and a flat row-major,
/// channel-interleaved sample sequence.
///
/// Invariant: `samples.len() == width * height * channels` after any
/// successful parse or recovery. The buffer is exclusively owned by whichever
/// pipeline stage currently holds it and is moved to the next stage.
#[derive(Debug, Clone)]
pub struct RasterBuffer {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Channel count: 1 (grayscale) or 3 (RGB, channel order R, G, B).
    pub channels: u8,
    /// Declared maximum sample value (1..=65535). 255 for 8-bit data.
    pub max_value: u16,
    /// Flat sample data.
    pub samples: Samples,
}

impl RasterBuffer {
    /// Create an 8-bit buffer with the given dimensions and sample data.
    pub fn new_u8(width: u32, height: u32, channels: u8, samples: Vec<u8>) -> Self {
        debug_assert_eq!(
            samples.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "Sample buffer size mismatch"
        );
        Self {
            width,
            height,
            channels,
            max_value: 255,
            samples: Samples::U8(samples),
        }
    }

    /// Create a 16-bit buffer with the given dimensions, maxval, and samples.
    pub fn new_u16(
        width: u32,
        height: u32,
        channels: u8,
        max_value: u16,
        samples: Vec<u16>,
    ) -> Self {
        debug_assert_eq!(
            samples.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "Sample buffer size mismatch"
        );
        Self {
            width,
            height,
            channels,
            max_value,
            samples: Samples::U16(samples),
        }
    }

    /// Create a buffer from an `image::RgbImage`.
    pub fn from_rgb_image(img: image::RgbImage) -> Self {
        let (width, height) = img.dimensions();
        Self::new_u8(width, height, 3, img.into_raw())
    }

    /// Create a buffer from an `image::GrayImage`.
    pub fn from_gray_image(img: image::GrayImage) -> Self {
        let (width, height) = img.dimensions();
        Self::new_u8(width, height, 1, img.into_raw())
    }

    /// Convert to an `image::RgbImage` for the codec collaborator.
    ///
    /// Returns `None` for grayscale or 16-bit buffers.
    pub fn to_rgb_image(&self) -> Option<image::RgbImage> {
        if self.channels != 3 {
            return None;
        }
        image::RgbImage::from_raw(self.width, self.height, self.samples.as_u8()?.to_vec())
    }

    /// Convert to an `image::GrayImage` for the codec collaborator.
    ///
    /// Returns `None` for color or 16-bit buffers.
    pub fn to_gray_image(&self) -> Option<image::GrayImage> {
        if self.channels != 1 {
            return None;
        }
        image::GrayImage::from_raw(self.width, self.height, self.samples.as_u8()?.to_vec())
    }

    /// Total number of pixels.
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Expected sample count for the current dimensions.
    pub fn expected_samples(&self) -> usize {
        self.pixel_count() * (self.channels as usize)
    }

    /// True for buffers carrying 16-bit samples.
    pub fn is_16bit(&self) -> bool {
        matches!(self.samples, Samples::U16(_))
    }

    /// Check if this is an empty/invalid image.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.samples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_creation_u8() {
        let buf = RasterBuffer::new_u8(4, 3, 3, vec![0u8; 36]);
        assert_eq!(buf.pixel_count(), 12);
        assert_eq!(buf.expected_samples(), 36);
        assert_eq!(buf.max_value, 255);
        assert!(!buf.is_16bit());
        assert!(!buf.is_empty());
    }

    #[test]
    fn test_buffer_creation_u16() {
        let buf = RasterBuffer::new_u16(2, 2, 1, 4095, vec![0u16; 4]);
        assert!(buf.is_16bit());
        assert_eq!(buf.max_value, 4095);
        assert_eq!(buf.samples.len(), 4);
    }

    #[test]
    fn test_buffer_empty() {
        let buf = RasterBuffer::new_u8(0, 0, 1, vec![]);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_rgb_image_round_trip() {
        let buf = RasterBuffer::new_u8(2, 2, 3, (0u8..12).collect());
        let img = buf.to_rgb_image().unwrap();
        let back = RasterBuffer::from_rgb_image(img);
        assert_eq!(back.samples, buf.samples);
        assert_eq!((back.width, back.height), (2, 2));
    }

    #[test]
    fn test_gray_buffer_has_no_rgb_view() {
        let buf = RasterBuffer::new_u8(2, 2, 1, vec![7; 4]);
        assert!(buf.to_rgb_image().is_none());
        assert!(buf.to_gray_image().is_some());
    }

    #[test]
    fn test_samples_truncate_and_pad() {
        let mut s = Samples::U8(vec![1, 2, 3, 4]);
        s.truncate(2);
        assert_eq!(s.as_u8().unwrap(), &[1, 2]);
        s.resize_with_zeros(5);
        assert_eq!(s.as_u8().unwrap(), &[1, 2, 0, 0, 0]);
    }
}
