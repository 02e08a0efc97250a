//! PNM serializers: one exact formatting policy per sub-format.
//!
//! The four writers are deliberately not unified:
//!
//! - Binary (P5/P6): magic, a freshly synthesized dimension comment, the
//!   dimension line, maxval, then raw samples (big-endian pairs for 16-bit).
//! - P2: no comment line; decimal tokens wrapped so no line exceeds 70
//!   characters.
//! - P3: a caller-supplied comment line; exactly one output line per image
//!   row with a trailing space after every sample, however long the row is.
//!
//! Consumers depend on each of these layouts, so the P2/P3 asymmetry is kept
//! as-is. Input comments are never re-emitted.

use crate::error::ConvertError;
use crate::pnm::PnmFormat;
use crate::{RasterBuffer, Samples};

/// Comment written into P3 output when the caller does not supply one.
pub const DEFAULT_COLOR_COMMENT: &str = "Created by pixform";

/// Longest line the P2 writer will emit.
const ASCII_LINE_LIMIT: usize = 70;

/// Serialize a raster buffer into the requested PNM sub-format.
///
/// The target format is independent of wherever the data came from; the only
/// requirement is that the channel count matches (1 for P2/P5, 3 for P3/P6).
/// `comment` is only honored by the P3 writer.
///
/// # Errors
///
/// Returns `InvalidInput` when the buffer's channel count does not match the
/// requested format.
pub fn encode(
    buffer: &RasterBuffer,
    format: PnmFormat,
    comment: Option<&str>,
) -> Result<Vec<u8>, ConvertError> {
    if buffer.channels != format.channels() {
        return Err(ConvertError::InvalidInput(format!(
            "{} output requires {} channel(s), buffer has {}",
            format.magic(),
            format.channels(),
            buffer.channels
        )));
    }

    Ok(match format {
        PnmFormat::PgmBinary | PnmFormat::PpmBinary => encode_binary(buffer, format),
        PnmFormat::PgmAscii => encode_gray_ascii(buffer),
        PnmFormat::PpmAscii => {
            encode_color_ascii(buffer, comment.unwrap_or(DEFAULT_COLOR_COMMENT))
        }
    })
}

/// Iterate samples as plain integer values regardless of sample width.
fn values(samples: &Samples) -> Box<dyn Iterator<Item = u32> + '_> {
    match samples {
        Samples::U8(v) => Box::new(v.iter().map(|&s| s as u32)),
        Samples::U16(v) => Box::new(v.iter().map(|&s| s as u32)),
    }
}

/// P5/P6: header with a synthesized dimension comment, then raw samples.
fn encode_binary(buffer: &RasterBuffer, format: PnmFormat) -> Vec<u8> {
    let header = format!(
        "{}\n# {}x{}\n{} {}\n{}\n",
        format.magic(),
        buffer.width,
        buffer.height,
        buffer.width,
        buffer.height,
        buffer.max_value
    );

    let wide = buffer.max_value > 255;
    let sample_bytes = if wide { 2 } else { 1 };
    let mut out = Vec::with_capacity(header.len() + buffer.samples.len() * sample_bytes);
    out.extend_from_slice(header.as_bytes());

    if wide {
        for value in values(&buffer.samples) {
            out.extend_from_slice(&(value as u16).to_be_bytes());
        }
    } else {
        match &buffer.samples {
            Samples::U8(v) => out.extend_from_slice(v),
            Samples::U16(v) => out.extend(v.iter().map(|&s| s as u8)),
        }
    }

    out
}

/// P2: no comment line, decimal tokens wrapped at 70 characters.
fn encode_gray_ascii(buffer: &RasterBuffer) -> Vec<u8> {
    let mut out = format!(
        "P2\n{} {}\n{}\n",
        buffer.width, buffer.height, buffer.max_value
    );

    let mut line = String::new();
    for value in values(&buffer.samples) {
        let token = value.to_string();
        // Flush before the token would push the line past the limit.
        if line.len() + token.len() + 1 > ASCII_LINE_LIMIT {
            out.push_str(&line);
            out.push('\n');
            line.clear();
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(&token);
    }
    if !line.is_empty() {
        out.push_str(&line);
        out.push('\n');
    }

    out.into_bytes()
}

/// P3: comment line, then exactly one line per image row with a trailing
/// space after every sample. No line-length limit applies here.
fn encode_color_ascii(buffer: &RasterBuffer, comment: &str) -> Vec<u8> {
    let mut out = format!(
        "P3\n# {}\n{} {}\n{}\n",
        comment, buffer.width, buffer.height, buffer.max_value
    );

    let row_samples = (buffer.width as usize) * 3;
    let mut samples = values(&buffer.samples);
    for _ in 0..buffer.height {
        for _ in 0..row_samples {
            // The buffer invariant guarantees enough samples for every row.
            if let Some(value) = samples.next() {
                out.push_str(&value.to_string());
                out.push(' ');
            }
        }
        out.push('\n');
    }

    out.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pnm::decode;

    fn gray_buffer(width: u32, height: u32) -> RasterBuffer {
        let samples = (0..width * height).map(|i| (i % 251) as u8).collect();
        RasterBuffer::new_u8(width, height, 1, samples)
    }

    fn color_buffer(width: u32, height: u32) -> RasterBuffer {
        let samples = (0..width * height * 3).map(|i| (i % 253) as u8).collect();
        RasterBuffer::new_u8(width, height, 3, samples)
    }

    #[test]
    fn test_binary_gray_layout() {
        let buf = RasterBuffer::new_u8(2, 2, 1, vec![1, 2, 3, 4]);
        let bytes = encode(&buf, PnmFormat::PgmBinary, None).unwrap();
        assert_eq!(bytes, b"P5\n# 2x2\n2 2\n255\n\x01\x02\x03\x04");
    }

    #[test]
    fn test_binary_16bit_big_endian() {
        let buf = RasterBuffer::new_u16(2, 1, 1, 1023, vec![0x0102, 0x0304]);
        let bytes = encode(&buf, PnmFormat::PgmBinary, None).unwrap();
        assert_eq!(bytes, b"P5\n# 2x1\n2 1\n1023\n\x01\x02\x03\x04");
    }

    #[test]
    fn test_gray_ascii_layout() {
        let buf = RasterBuffer::new_u8(3, 1, 1, vec![0, 128, 255]);
        let bytes = encode(&buf, PnmFormat::PgmAscii, None).unwrap();
        assert_eq!(bytes, b"P2\n3 1\n255\n0 128 255\n");
    }

    #[test]
    fn test_gray_ascii_line_limit() {
        // 200 three-digit samples force wrapping; each line must stay at or
        // under 70 characters and carry no trailing whitespace.
        let buf = RasterBuffer::new_u8(200, 1, 1, vec![100; 200]);
        let bytes = encode(&buf, PnmFormat::PgmAscii, None).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        for line in text.lines().skip(3) {
            assert!(line.len() <= 70, "line too long: {:?}", line);
            assert_eq!(line, line.trim_end());
        }
    }

    #[test]
    fn test_gray_ascii_single_digit_fill() {
        // 35 single-digit tokens separated by spaces fill a 69-char line
        // exactly; the 36th token must start a new line.
        let buf = RasterBuffer::new_u8(40, 1, 1, vec![7; 40]);
        let bytes = encode(&buf, PnmFormat::PgmAscii, None).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().skip(3).collect();
        assert_eq!(lines[0].len(), 69);
        assert_eq!(lines[1], "7 7 7 7 7");
    }

    #[test]
    fn test_color_ascii_one_line_per_row() {
        let buf = color_buffer(50, 4);
        let bytes = encode(&buf, PnmFormat::PpmAscii, None).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let rows: Vec<&str> = text.lines().skip(4).collect();
        assert_eq!(rows.len(), 4);
        // Long rows are never wrapped, and every sample has a trailing space.
        assert!(rows[0].len() > 70);
        for row in rows {
            assert!(row.ends_with(' '));
            assert_eq!(row.split_whitespace().count(), 150);
        }
    }

    #[test]
    fn test_color_ascii_comment() {
        let buf = color_buffer(1, 1);
        let bytes = encode(&buf, PnmFormat::PpmAscii, Some("hand-made")).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text.lines().nth(1), Some("# hand-made"));

        let bytes = encode(&buf, PnmFormat::PpmAscii, None).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text.lines().nth(1), Some("# Created by pixform"));
    }

    #[test]
    fn test_channel_mismatch_rejected() {
        let gray = gray_buffer(2, 2);
        let color = color_buffer(2, 2);
        assert!(matches!(
            encode(&gray, PnmFormat::PpmBinary, None),
            Err(ConvertError::InvalidInput(_))
        ));
        assert!(matches!(
            encode(&color, PnmFormat::PgmAscii, None),
            Err(ConvertError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_round_trip_all_variants() {
        for (width, height) in [(1u32, 1u32), (3, 5), (64, 64)] {
            let gray = gray_buffer(width, height);
            for format in [PnmFormat::PgmAscii, PnmFormat::PgmBinary] {
                let bytes = encode(&gray, format, None).unwrap();
                let (back, outcome) = decode(&bytes).unwrap();
                assert_eq!(outcome, crate::pnm::RecoveryOutcome::Exact);
                assert_eq!(back.samples, gray.samples, "{format:?} {width}x{height}");
                assert_eq!((back.width, back.height), (width, height));
            }

            let color = color_buffer(width, height);
            for format in [PnmFormat::PpmAscii, PnmFormat::PpmBinary] {
                let bytes = encode(&color, format, None).unwrap();
                let (back, outcome) = decode(&bytes).unwrap();
                assert_eq!(outcome, crate::pnm::RecoveryOutcome::Exact);
                assert_eq!(back.samples, color.samples, "{format:?} {width}x{height}");
            }
        }
    }

    #[test]
    fn test_round_trip_16bit_binary() {
        let samples: Vec<u16> = (0..15).map(|i| i * 997).collect();
        let buf = RasterBuffer::new_u16(3, 5, 1, 65535, samples);
        let bytes = encode(&buf, PnmFormat::PgmBinary, None).unwrap();
        let (back, _) = decode(&bytes).unwrap();
        assert_eq!(back.samples, buf.samples);
        assert_eq!(back.max_value, 65535);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::pnm::decode;
    use proptest::prelude::*;

    proptest! {
        /// Property: no P2 output line ever exceeds 70 characters, for any
        /// mix of 1-5 digit sample values.
        #[test]
        fn prop_gray_ascii_lines_bounded(
            samples in prop::collection::vec(any::<u16>(), 1..400),
        ) {
            let len = samples.len() as u32;
            let buf = RasterBuffer::new_u16(len, 1, 1, 65535, samples);
            let bytes = encode(&buf, PnmFormat::PgmAscii, None).unwrap();
            let text = String::from_utf8(bytes).unwrap();
            for line in text.lines() {
                prop_assert!(line.len() <= 70, "line too long: {:?}", line);
            }
        }

        /// Property: encode then decode restores the exact sample values for
        /// every sub-format.
        #[test]
        fn prop_round_trip_preserves_samples(
            width in 1u32..=12,
            height in 1u32..=12,
            color in any::<bool>(),
            ascii in any::<bool>(),
        ) {
            let channels = if color { 3 } else { 1 };
            let len = (width * height * channels) as usize;
            let samples: Vec<u8> = (0..len).map(|i| (i * 37 % 256) as u8).collect();
            let buf = RasterBuffer::new_u8(width, height, channels as u8, samples);

            let format = match (color, ascii) {
                (false, true) => PnmFormat::PgmAscii,
                (false, false) => PnmFormat::PgmBinary,
                (true, true) => PnmFormat::PpmAscii,
                (true, false) => PnmFormat::PpmBinary,
            };

            let bytes = encode(&buf, format, None).unwrap();
            let (back, _) = decode(&bytes).unwrap();
            prop_assert_eq!(back.samples, buf.samples);
        }
    }
}
