//! PNM header parsing, sample decoding, and dimension recovery.
//!
//! The reader is deliberately tolerant: a disagreement between the declared
//! dimensions and the decoded sample count is not a failure. The recovery
//! heuristic first tries to re-derive plausible dimensions from the actual
//! pixel count (height from width, width from height, then a perfect
//! square), and only falls back to truncating or zero-padding against the
//! declared dimensions when no clean factorization exists.

use crate::error::ConvertError;
use crate::pnm::{PnmFormat, PnmHeader, RecoveryOutcome};
use crate::{RasterBuffer, Samples};

/// Line-oriented cursor over the textual preamble.
struct HeaderCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> HeaderCursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Consume the next line, without its terminator.
    fn next_line(&mut self) -> Result<&'a str, ConvertError> {
        if self.pos >= self.data.len() {
            return Err(ConvertError::MalformedHeader(
                "unexpected end of header".to_string(),
            ));
        }
        let rest = &self.data[self.pos..];
        let end = rest.iter().position(|&b| b == b'\n').unwrap_or(rest.len());
        // Step past the newline when there is one.
        self.pos += (end + 1).min(rest.len());
        let line = std::str::from_utf8(&rest[..end])
            .map_err(|_| ConvertError::MalformedHeader("header is not ASCII".to_string()))?;
        Ok(line.trim_end_matches('\r'))
    }

    /// Byte offset of the first unconsumed byte.
    fn offset(&self) -> usize {
        self.pos
    }
}

/// Parse the textual preamble of a PNM payload.
///
/// Returns the parsed header and the byte offset at which the sample data
/// begins. Comment lines (`#`-prefixed) between the magic and the dimension
/// line are skipped and discarded.
///
/// # Errors
///
/// - `UnsupportedFormat` when the leading magic token is not P2/P5/P3/P6.
/// - `MalformedHeader` when dimensions or maxval are missing, non-numeric,
///   non-positive, or out of range.
pub fn parse_header(data: &[u8]) -> Result<(PnmHeader, usize), ConvertError> {
    let mut cursor = HeaderCursor::new(data);

    let magic_line = cursor.next_line()?;
    let magic = magic_line
        .split_whitespace()
        .next()
        .ok_or_else(|| ConvertError::UnsupportedFormat("missing magic".to_string()))?;
    let format = PnmFormat::from_magic(magic)
        .ok_or_else(|| ConvertError::UnsupportedFormat(magic.to_string()))?;

    // Skip comment lines until the dimension line.
    let dims_line = loop {
        let line = cursor.next_line()?;
        if !line.starts_with('#') {
            break line;
        }
    };

    let (width, height) = parse_dimensions(dims_line)?;

    let maxval_line = cursor.next_line()?;
    let max_value = parse_max_value(maxval_line)?;

    Ok((
        PnmHeader {
            format,
            width,
            height,
            max_value,
        },
        cursor.offset(),
    ))
}

fn parse_dimensions(line: &str) -> Result<(u32, u32), ConvertError> {
    let mut tokens = line.split_whitespace();
    let width = parse_positive(tokens.next(), "width")?;
    let height = parse_positive(tokens.next(), "height")?;
    if tokens.next().is_some() {
        return Err(ConvertError::MalformedHeader(format!(
            "trailing tokens on dimension line: {line:?}"
        )));
    }
    Ok((width, height))
}

fn parse_positive(token: Option<&str>, what: &str) -> Result<u32, ConvertError> {
    let token =
        token.ok_or_else(|| ConvertError::MalformedHeader(format!("missing {what}")))?;
    let value: u32 = token
        .parse()
        .map_err(|_| ConvertError::MalformedHeader(format!("non-numeric {what}: {token:?}")))?;
    if value == 0 {
        return Err(ConvertError::MalformedHeader(format!(
            "{what} must be positive"
        )));
    }
    Ok(value)
}

fn parse_max_value(line: &str) -> Result<u16, ConvertError> {
    let token = line.trim();
    let value: u32 = token
        .parse()
        .map_err(|_| ConvertError::MalformedHeader(format!("non-numeric maxval: {token:?}")))?;
    if !(1..=65535).contains(&value) {
        return Err(ConvertError::MalformedHeader(format!(
            "maxval {value} outside 1..=65535"
        )));
    }
    Ok(value as u16)
}

/// Decode a complete PNM payload into a raster buffer.
///
/// The returned [`RecoveryOutcome`] reports whether the declared dimensions
/// were honored exactly or had to be recovered; the dimensions on the buffer
/// are the ones actually used and are authoritative.
///
/// # Errors
///
/// Header errors as in [`parse_header`], plus `EmptyData` when the payload
/// contains zero decodable samples and `MalformedHeader` for non-numeric
/// ASCII sample tokens.
pub fn decode(data: &[u8]) -> Result<(RasterBuffer, RecoveryOutcome), ConvertError> {
    let (header, body_start) = parse_header(data)?;
    let samples = read_samples(&header, &data[body_start..])?;
    reshape(header, samples)
}

/// Decode the sample stream following the header.
fn read_samples(header: &PnmHeader, body: &[u8]) -> Result<Samples, ConvertError> {
    if header.format.is_binary() {
        if header.sample_width() == 2 {
            // A trailing odd byte cannot form a sample and is dropped.
            let samples = body
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            Ok(Samples::U16(samples))
        } else {
            Ok(Samples::U8(body.to_vec()))
        }
    } else {
        let text = std::str::from_utf8(body).map_err(|_| {
            ConvertError::MalformedHeader("ASCII sample data is not valid text".to_string())
        })?;
        let values: Vec<u32> = text
            .split_whitespace()
            .map(|token| {
                token.parse::<u32>().map_err(|_| {
                    ConvertError::MalformedHeader(format!("non-numeric sample token: {token:?}"))
                })
            })
            .collect::<Result<_, _>>()?;
        // Out-of-range tokens wrap to the sample width rather than erroring,
        // matching unsigned narrowing on ingest.
        if header.max_value > 255 {
            Ok(Samples::U16(values.into_iter().map(|v| v as u16).collect()))
        } else {
            Ok(Samples::U8(values.into_iter().map(|v| v as u8).collect()))
        }
    }
}

/// Reconcile the decoded sample count with the declared dimensions.
fn reshape(
    header: PnmHeader,
    mut samples: Samples,
) -> Result<(RasterBuffer, RecoveryOutcome), ConvertError> {
    let actual = samples.len();
    if actual == 0 {
        return Err(ConvertError::EmptyData);
    }

    let channels = header.format.channels() as usize;
    let expected = header.expected_samples();

    // Drop a trailing partial pixel so 3-channel data reshapes cleanly.
    let usable = actual - actual % channels;
    let pixels = usable / channels;
    if pixels == 0 {
        return Err(ConvertError::EmptyData);
    }

    let (width, height, outcome) = if actual == expected {
        (header.width, header.height, RecoveryOutcome::Exact)
    } else {
        recover_dimensions(&header, pixels, usable > expected)
    };

    match outcome {
        RecoveryOutcome::Exact => {}
        RecoveryOutcome::Adjusted { width, height } => {
            samples.truncate((width as usize) * (height as usize) * channels);
        }
        RecoveryOutcome::Truncated => samples.truncate(expected),
        RecoveryOutcome::Padded => {
            samples.truncate(usable);
            samples.resize_with_zeros(expected);
        }
    }

    let buffer = RasterBuffer {
        width,
        height,
        channels: header.format.channels(),
        max_value: header.max_value,
        samples,
    };
    debug_assert_eq!(buffer.samples.len(), buffer.expected_samples());
    Ok((buffer, outcome))
}

/// Pick recovered dimensions for a sample-count mismatch.
///
/// Tried in order: keep the declared width and re-derive the height, keep
/// the declared height and re-derive the width, reshape to a perfect square.
/// When none factorizes, the declared dimensions stand and the data is
/// truncated or zero-padded to fit.
fn recover_dimensions(
    header: &PnmHeader,
    pixels: usize,
    surplus: bool,
) -> (u32, u32, RecoveryOutcome) {
    let width = header.width as usize;
    let height = header.height as usize;

    if pixels % width == 0 {
        let new_height = (pixels / width) as u32;
        return (
            header.width,
            new_height,
            RecoveryOutcome::Adjusted {
                width: header.width,
                height: new_height,
            },
        );
    }

    if pixels % height == 0 {
        let new_width = (pixels / height) as u32;
        return (
            new_width,
            header.height,
            RecoveryOutcome::Adjusted {
                width: new_width,
                height: header.height,
            },
        );
    }

    let side = (pixels as f64).sqrt() as usize;
    if side * side == pixels {
        let side = side as u32;
        return (
            side,
            side,
            RecoveryOutcome::Adjusted {
                width: side,
                height: side,
            },
        );
    }

    if surplus {
        (header.width, header.height, RecoveryOutcome::Truncated)
    } else {
        (header.width, header.height, RecoveryOutcome::Padded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p5(width: u32, height: u32, maxval: u16, body: &[u8]) -> Vec<u8> {
        let mut data = format!("P5\n# test\n{width} {height}\n{maxval}\n").into_bytes();
        data.extend_from_slice(body);
        data
    }

    #[test]
    fn test_parse_header_with_comments() {
        let data = b"P5\n# one comment\n# another\n4 3\n255\nrest";
        let (header, offset) = parse_header(data).unwrap();
        assert_eq!(header.format, PnmFormat::PgmBinary);
        assert_eq!((header.width, header.height), (4, 3));
        assert_eq!(header.max_value, 255);
        assert_eq!(&data[offset..], b"rest");
    }

    #[test]
    fn test_parse_header_no_comments() {
        let (header, _) = parse_header(b"P2\n2 2\n15\n0 1 2 3\n").unwrap();
        assert_eq!(header.format, PnmFormat::PgmAscii);
        assert_eq!(header.max_value, 15);
    }

    #[test]
    fn test_unrecognized_magic() {
        let result = parse_header(b"P7\n2 2\n255\n");
        assert!(matches!(result, Err(ConvertError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_malformed_dimensions() {
        for header in [
            "P5\nab cd\n255\n",
            "P5\n4\n255\n",
            "P5\n0 4\n255\n",
            "P5\n4 -3\n255\n",
            "P5\n4 4 4\n255\n",
        ] {
            let result = parse_header(header.as_bytes());
            assert!(
                matches!(result, Err(ConvertError::MalformedHeader(_))),
                "header {header:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_maxval_out_of_range() {
        assert!(matches!(
            parse_header(b"P5\n2 2\n0\n"),
            Err(ConvertError::MalformedHeader(_))
        ));
        assert!(matches!(
            parse_header(b"P5\n2 2\n65536\n"),
            Err(ConvertError::MalformedHeader(_))
        ));
    }

    #[test]
    fn test_truncated_header() {
        assert!(matches!(
            parse_header(b"P5\n# only a comment"),
            Err(ConvertError::MalformedHeader(_))
        ));
    }

    #[test]
    fn test_decode_p5_exact() {
        let (buf, outcome) = decode(&p5(2, 2, 255, &[10, 20, 30, 40])).unwrap();
        assert_eq!(outcome, RecoveryOutcome::Exact);
        assert_eq!((buf.width, buf.height, buf.channels), (2, 2, 1));
        assert_eq!(buf.samples.as_u8().unwrap(), &[10, 20, 30, 40]);
    }

    #[test]
    fn test_decode_p5_16bit_big_endian() {
        let (buf, outcome) = decode(&p5(2, 1, 4095, &[0x0F, 0xFF, 0x00, 0x01])).unwrap();
        assert_eq!(outcome, RecoveryOutcome::Exact);
        assert_eq!(buf.samples.as_u16().unwrap(), &[0x0FFF, 0x0001]);
        assert_eq!(buf.max_value, 4095);
    }

    #[test]
    fn test_decode_p2_exact() {
        let (buf, outcome) = decode(b"P2\n3 1\n255\n0 128  255\n").unwrap();
        assert_eq!(outcome, RecoveryOutcome::Exact);
        assert_eq!(buf.samples.as_u8().unwrap(), &[0, 128, 255]);
    }

    #[test]
    fn test_decode_p3_exact() {
        let (buf, outcome) = decode(b"P3\n# c\n2 1\n255\n1 2 3 4 5 6\n").unwrap();
        assert_eq!(outcome, RecoveryOutcome::Exact);
        assert_eq!(buf.channels, 3);
        assert_eq!(buf.samples.as_u8().unwrap(), &[1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_decode_p6_exact() {
        let mut data = b"P6\n1 2\n255\n".to_vec();
        data.extend_from_slice(&[9, 8, 7, 6, 5, 4]);
        let (buf, outcome) = decode(&data).unwrap();
        assert_eq!(outcome, RecoveryOutcome::Exact);
        assert_eq!(buf.samples.as_u8().unwrap(), &[9, 8, 7, 6, 5, 4]);
    }

    #[test]
    fn test_decode_non_numeric_token() {
        let result = decode(b"P2\n2 1\n255\n12 abc\n");
        assert!(matches!(result, Err(ConvertError::MalformedHeader(_))));
    }

    #[test]
    fn test_decode_empty_body() {
        let result = decode(b"P5\n2 2\n255\n");
        assert!(matches!(result, Err(ConvertError::EmptyData)));
    }

    #[test]
    fn test_recovery_clean_height_factorization() {
        // Declared 10x10, only 90 samples: height re-derived from width.
        let body: Vec<u8> = (0..90).collect();
        let (buf, outcome) = decode(&p5(10, 10, 255, &body)).unwrap();
        assert_eq!(
            outcome,
            RecoveryOutcome::Adjusted {
                width: 10,
                height: 9
            }
        );
        assert_eq!((buf.width, buf.height), (10, 9));
        assert_eq!(buf.samples.len(), 90);
    }

    #[test]
    fn test_recovery_width_factorization() {
        // Declared 10x7, 21 samples: 21 % 10 != 0 but 21 % 7 == 0.
        let body = vec![1u8; 21];
        let (buf, outcome) = decode(&p5(10, 7, 255, &body)).unwrap();
        assert_eq!(
            outcome,
            RecoveryOutcome::Adjusted {
                width: 3,
                height: 7
            }
        );
        assert_eq!((buf.width, buf.height), (3, 7));
    }

    #[test]
    fn test_recovery_perfect_square() {
        // Declared 5x5, 16 samples: no divisor match, but 16 is a square.
        let body = vec![3u8; 16];
        let (buf, outcome) = decode(&p5(5, 5, 255, &body)).unwrap();
        assert_eq!(
            outcome,
            RecoveryOutcome::Adjusted {
                width: 4,
                height: 4
            }
        );
        assert_eq!((buf.width, buf.height), (4, 4));
    }

    #[test]
    fn test_recovery_padded_fallback() {
        // Declared 10x10 (expected 100), 77 samples: 77 has no clean
        // factorization and is not a square, so the tail is zero-filled.
        let body = vec![9u8; 77];
        let (buf, outcome) = decode(&p5(10, 10, 255, &body)).unwrap();
        assert_eq!(outcome, RecoveryOutcome::Padded);
        assert_eq!((buf.width, buf.height), (10, 10));
        let samples = buf.samples.as_u8().unwrap();
        assert_eq!(samples.len(), 100);
        assert!(samples[..77].iter().all(|&s| s == 9));
        assert!(samples[77..].iter().all(|&s| s == 0));
    }

    #[test]
    fn test_recovery_truncated_fallback() {
        // Declared 6x7 (expected 42), 53 samples: 53 is prime and not a
        // square, so the surplus is dropped.
        let body: Vec<u8> = (0..53).collect();
        let (buf, outcome) = decode(&p5(6, 7, 255, &body)).unwrap();
        assert_eq!(outcome, RecoveryOutcome::Truncated);
        assert_eq!((buf.width, buf.height), (6, 7));
        let samples = buf.samples.as_u8().unwrap();
        assert_eq!(samples.len(), 42);
        assert_eq!(samples, &body[..42]);
    }

    #[test]
    fn test_recovery_partial_pixel_dropped() {
        // 2x2 RGB expects 12 samples; 13 arrive. The 13th cannot form a
        // pixel, and the remaining 12 reshape to the declared dimensions.
        let mut data = b"P6\n2 2\n255\n".to_vec();
        data.extend_from_slice(&[1u8; 13]);
        let (buf, outcome) = decode(&data).unwrap();
        assert_eq!(
            outcome,
            RecoveryOutcome::Adjusted {
                width: 2,
                height: 2
            }
        );
        assert_eq!(buf.samples.len(), 12);
    }

    #[test]
    fn test_recovery_color_too_small_for_one_pixel() {
        let mut data = b"P6\n2 2\n255\n".to_vec();
        data.extend_from_slice(&[1, 2]);
        assert!(matches!(decode(&data), Err(ConvertError::EmptyData)));
    }

    #[test]
    fn test_odd_trailing_byte_dropped_for_16bit() {
        // 5 bytes of 16-bit data: two samples plus a dangling byte.
        let (buf, outcome) = decode(&p5(2, 1, 1000, &[0, 1, 0, 2, 0xEE])).unwrap();
        assert_eq!(outcome, RecoveryOutcome::Exact);
        assert_eq!(buf.samples.as_u16().unwrap(), &[1, 2]);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================
