//! Mirror specification models, action log entries and top-level error types.

use std::fmt;
use std::io;
use std::path::PathBuf;

////////////////////////////////////////////////////////////////////////////////
// #region EnumsInit

/// Staleness check used by the copy/update pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumMirrorCompareMode {
    /// Copy when the destination is absent or its mtime or size differs.
    Metadata,
    /// Copy when the destination is absent, its size differs, or its BLAKE3
    /// digest differs from the source.
    Content,
}

/// One observable action of a mirror run.
///
/// `Display` renders the action-log line (`[COPY]`, `[DEL F]`, `[DEL D]`,
/// `[ERROR]`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumMirrorAction {
    /// Source file copied over the destination path.
    Copy {
        /// Source file.
        path_src: PathBuf,
        /// Destination file.
        path_dst: PathBuf,
    },
    /// Destination-only file removed.
    DeleteFile(PathBuf),
    /// Destination-only directory removed.
    DeleteDir(PathBuf),
    /// Recoverable per-entry failure.
    Error {
        /// Path the failure relates to.
        path: PathBuf,
        /// User-facing error text.
        message: String,
    },
}

impl fmt::Display for EnumMirrorAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Copy { path_src, path_dst } => {
                write!(f, "[COPY] {} -> {}", path_src.display(), path_dst.display())
            }
            Self::DeleteFile(path) => write!(f, "[DEL F] {}", path.display()),
            Self::DeleteDir(path) => write!(f, "[DEL D] {}", path.display()),
            Self::Error { message, .. } => write!(f, "[ERROR] {message}"),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region StructsAndErrors

/// Input options for `mirror_tree`.
#[derive(Debug, Clone)]
pub struct SpecMirrorOptions {
    /// Staleness check for existing destination files.
    pub rule_compare: EnumMirrorCompareMode,
    /// Maximum worker threads for the file-copy stage. `Some(1)` keeps the
    /// run fully sequential.
    pub num_workers_max: Option<usize>,
    /// Do not mutate filesystem; record what would happen.
    pub if_dry_run: bool,
}

impl Default for SpecMirrorOptions {
    fn default() -> Self {
        Self {
            rule_compare: EnumMirrorCompareMode::Metadata,
            num_workers_max: Some(1),
            if_dry_run: false,
        }
    }
}

/// One recoverable failure item with path + error text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecMirrorError {
    /// Failed source or destination path.
    pub path: PathBuf,
    /// User-facing error text.
    pub exception: String,
}

/// "Run cannot proceed" errors (validation / setup / traversal stage).
#[derive(Debug, thiserror::Error)]
pub enum MirrorTreeError {
    /// Source path is missing or not a directory.
    #[error("Source is not a directory: {}", .0.display())]
    SourceNotDirectory(PathBuf),
    /// Source and destination overlap (`src` contains `dst` or vice versa).
    #[error(
        "Source and destination directories overlap: {} <-> {}",
        .source_dir.display(),
        .destination_dir.display()
    )]
    SourceDestinationOverlap {
        /// Normalized source directory.
        source_dir: PathBuf,
        /// Normalized destination directory.
        destination_dir: PathBuf,
    },
    /// Destination root creation failed.
    #[error("Failed to initialize destination {}: {source}", .path.display())]
    DestinationInitFailed {
        /// Destination path that failed initialization.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Listing a directory during a traversal pass failed.
    #[error("Failed to read directory {}: {source}", .path.display())]
    TraversalFailed {
        /// Directory that could not be listed.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::EnumMirrorAction;

    #[test]
    fn action_display_uses_log_tags() {
        let action_copy = EnumMirrorAction::Copy {
            path_src: PathBuf::from("src/a.txt"),
            path_dst: PathBuf::from("dst/a.txt"),
        };
        assert_eq!(action_copy.to_string(), "[COPY] src/a.txt -> dst/a.txt");
        assert_eq!(
            EnumMirrorAction::DeleteFile(PathBuf::from("dst/old.txt")).to_string(),
            "[DEL F] dst/old.txt"
        );
        assert_eq!(
            EnumMirrorAction::DeleteDir(PathBuf::from("dst/sub")).to_string(),
            "[DEL D] dst/sub"
        );
        let action_error = EnumMirrorAction::Error {
            path: PathBuf::from("dst/x"),
            message: "Is a directory".to_string(),
        };
        assert_eq!(action_error.to_string(), "[ERROR] Is a directory");
    }
}
