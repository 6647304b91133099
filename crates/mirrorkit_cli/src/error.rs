//! Error types for mirrorkit_cli

use std::io;
use std::path::PathBuf;

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Errors that end a CLI run with a non-zero exit status
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Structural failure from the mirror engine
    #[error(transparent)]
    Mirror(#[from] mirrorkit_io_fs::MirrorTreeError),

    /// Ignore-rules file exists but could not be read
    #[error("Failed to read ignore rules {}: {source}", .path.display())]
    RulesFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Action log could not be written to stdout
    #[error("Failed to write action log: {0}")]
    Output(#[source] io::Error),

    /// Tracing subscriber could not be installed
    #[error("Failed to initialize logging: {0}")]
    Logging(String),
}
