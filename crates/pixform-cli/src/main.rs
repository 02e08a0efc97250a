//! `pixform` converts raster images between PNM files, compressed
//! containers, Bayer mosaic dumps, and raw YUV layouts.
//!
//! The operation is chosen from the output path's extension, except when a
//! resize option is given, in which case the input is resized within its own
//! container family.

mod batch;
mod logger;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::bail;
use clap::Parser;
use tracing::{error, info};

use pixform_core::codec;
use pixform_core::convert::{self, ConversionReport, InputKind, ResizeTarget};
use pixform_core::{BayerPattern, ChromaLayout, ConvertError, PnmFormat, ResizeFilter};

#[derive(Parser, Debug)]
#[command(name = "pixform")]
#[command(author, version, about = "Raster image conversion tool", long_about = None)]
struct Args {
    /// Input file, or input directory in batch mode
    input: PathBuf,

    /// Output file, or output directory in batch mode
    output: PathBuf,

    /// Target width in pixels
    #[arg(short = 'W', long)]
    width: Option<u32>,

    /// Target height in pixels
    #[arg(short = 'H', long)]
    height: Option<u32>,

    /// Uniform scale factor, used when neither width nor height is given
    #[arg(short, long, default_value_t = 1.0)]
    scale: f64,

    /// Resampling filter: nearest, linear, cubic, area or lanczos
    #[arg(short = 'i', long, default_value = "linear")]
    interpolation: ResizeFilter,

    /// Bayer tile for mosaic output: bggr, grbg, gbrg or rggb
    #[arg(long, default_value = "bggr")]
    pattern: BayerPattern,

    /// Write ASCII PNM variants (P2/P3) instead of binary
    #[arg(long)]
    ascii: bool,

    /// Header comment for P3 output
    #[arg(long)]
    comment: Option<String>,

    /// Treat input and output as directories and convert every file
    #[arg(short, long)]
    batch: bool,

    /// Output extension for batch results, e.g. `png` or `pgm`
    #[arg(long)]
    to: Option<String>,
}

/// Settings shared by single-file and batch runs.
pub struct RunOptions {
    pub target: ResizeTarget,
    pub filter: ResizeFilter,
    pub pattern: BayerPattern,
    pub ascii: bool,
    pub comment: Option<String>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            target: ResizeTarget::default(),
            filter: ResizeFilter::Linear,
            pattern: BayerPattern::Bggr,
            ascii: false,
            comment: None,
        }
    }
}

impl RunOptions {
    fn from_args(args: &Args) -> Self {
        Self {
            target: ResizeTarget {
                width: args.width,
                height: args.height,
                scale: args.scale,
            },
            filter: args.interpolation,
            pattern: args.pattern,
            ascii: args.ascii,
            comment: args.comment.clone(),
        }
    }

    fn is_resize(&self) -> bool {
        self.target.width.is_some() || self.target.height.is_some() || self.target.scale != 1.0
    }
}

/// Run one conversion, picking the operation from the options and the
/// output extension.
pub fn dispatch(
    input: &Path,
    output: &Path,
    opts: &RunOptions,
) -> Result<ConversionReport, ConvertError> {
    if opts.is_resize() {
        return convert::resize_file(input, output, &opts.target, opts.filter);
    }

    let ext = output
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pgm" => {
            let format = if opts.ascii {
                PnmFormat::PgmAscii
            } else {
                PnmFormat::PgmBinary
            };
            convert::compressed_to_pnm(input, output, format, None)
        }
        "ppm" => {
            let format = if opts.ascii {
                PnmFormat::PpmAscii
            } else {
                PnmFormat::PpmBinary
            };
            convert::compressed_to_pnm(input, output, format, opts.comment.as_deref())
        }
        "raw" => convert::compressed_to_bayer(input, output, opts.pattern),
        "yuyv" => convert::compressed_to_chroma(input, output, ChromaLayout::Packed422),
        "yuv422p" => convert::compressed_to_chroma(input, output, ChromaLayout::Planar422),
        "yv12" => convert::compressed_to_planar_420(input, output),
        "png" | "jpg" | "jpeg" => {
            let bytes = std::fs::read(input)?;
            match convert::sniff_input(input, &bytes)? {
                InputKind::Pnm => convert::pnm_to_compressed(input, output),
                InputKind::Compressed => {
                    // Plain container transcode.
                    let buffer = codec::decode_bytes(&bytes)?;
                    codec::encode_file(&buffer, output)?;
                    Ok(ConversionReport {
                        width: buffer.width,
                        height: buffer.height,
                        recovery: None,
                    })
                }
            }
        }
        _ => Err(ConvertError::UnsupportedFormat(
            output.display().to_string(),
        )),
    }
}

fn run(args: &Args) -> anyhow::Result<()> {
    let opts = RunOptions::from_args(args);

    if args.batch {
        let Some(to) = args.to.as_deref() else {
            bail!("--batch requires --to <EXT>");
        };
        let summary = batch::run(&args.input, &args.output, to, &opts)?;
        if !summary.all_succeeded() {
            bail!(
                "{} of {} conversions failed",
                summary.total - summary.succeeded,
                summary.total
            );
        }
        return Ok(());
    }

    let report = dispatch(&args.input, &args.output, &opts)?;
    if let Some(outcome) = report.recovery {
        if outcome.was_recovered() {
            info!("input dimensions reconciled: {:?}", outcome);
        }
    }
    info!(
        "{} -> {} ({}x{})",
        args.input.display(),
        args.output.display(),
        report.width,
        report.height
    );
    Ok(())
}

fn main() -> ExitCode {
    logger::init();
    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
