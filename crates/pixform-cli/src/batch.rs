//! Directory-at-a-time conversion driver.
//!
//! Every regular file in the input directory goes through the same
//! conversion settings; a file that fails is logged and skipped so one bad
//! input cannot abort the rest of the run.

use std::path::Path;

use anyhow::Context;
use tracing::{error, info};

use crate::RunOptions;

/// Tally of a finished batch run.
#[derive(Debug, Clone, Copy)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub total: usize,
}

impl BatchSummary {
    pub fn all_succeeded(&self) -> bool {
        self.succeeded == self.total
    }
}

/// Convert every file in `input_dir`, writing each result under
/// `output_dir` with the `to` extension. Entries are processed in path
/// order; subdirectories are ignored.
pub fn run(
    input_dir: &Path,
    output_dir: &Path,
    to: &str,
    opts: &RunOptions,
) -> anyhow::Result<BatchSummary> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("creating {}", output_dir.display()))?;

    let mut entries: Vec<_> = std::fs::read_dir(input_dir)
        .with_context(|| format!("reading {}", input_dir.display()))?
        .collect::<Result<_, _>>()
        .with_context(|| format!("reading {}", input_dir.display()))?;
    entries.sort_by_key(|entry| entry.path());

    let mut summary = BatchSummary {
        succeeded: 0,
        total: 0,
    };
    for entry in entries {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(stem) = path.file_stem() else {
            continue;
        };
        let mut name = stem.to_os_string();
        name.push(".");
        name.push(to);
        let output = output_dir.join(name);

        summary.total += 1;
        match crate::dispatch(&path, &output, opts) {
            Ok(report) => {
                summary.succeeded += 1;
                info!(
                    "{} -> {} ({}x{})",
                    path.display(),
                    output.display(),
                    report.width,
                    report.height
                );
            }
            Err(e) => error!("{}: {}", path.display(), e),
        }
    }

    info!("converted {}/{} files", summary.succeeded, summary.total);
    Ok(summary)
}
