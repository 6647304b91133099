//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{ArgAction, Parser};
use mirrorkit_io_fs::{EnumMirrorCompareMode, SpecMirrorOptions};

/// Mirror a source directory tree onto a destination tree.
///
/// Destination-only entries are removed, missing or stale files are copied.
/// Paths matched by the ignore-rules file are left untouched on both sides.
#[derive(Parser, Debug)]
#[command(name = "mirrorkit")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Source directory
    pub source: PathBuf,

    /// Destination directory (created if missing)
    pub destination: PathBuf,

    /// Ignore-rules file: one substring per line, `!` re-includes, `#` comments.
    /// A missing file means no rules.
    pub ignore_file: Option<PathBuf>,

    /// Report actions without touching the filesystem
    #[arg(long)]
    pub dry_run: bool,

    /// Compare file contents (BLAKE3) instead of modification times
    #[arg(long)]
    pub checksum: bool,

    /// Worker threads for the file-copy stage
    #[arg(long, value_name = "N", default_value_t = 1)]
    pub workers: usize,

    /// Increase log verbosity (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Engine options selected by the flags.
    pub fn to_options(&self) -> SpecMirrorOptions {
        SpecMirrorOptions {
            rule_compare: if self.checksum {
                EnumMirrorCompareMode::Content
            } else {
                EnumMirrorCompareMode::Metadata
            },
            num_workers_max: Some(self.workers),
            if_dry_run: self.dry_run,
        }
    }
}
