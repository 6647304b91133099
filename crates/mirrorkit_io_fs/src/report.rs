//! Mirror report models and mutable report builder.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::spec::{EnumMirrorAction, SpecMirrorError};

/// Aggregate counters, ordered action log and diagnostics for one
/// `mirror_tree` run.
#[derive(Debug, Default, Clone)]
pub struct ReportMirror {
    /// Total traversed entries (both passes).
    pub cnt_scanned: u64,
    /// Entries left untouched because the ignore rules excluded them.
    pub cnt_excluded: u64,
    /// Files copied (or planned, in dry-run).
    pub cnt_copied: u64,
    /// Destination entries removed (or planned, in dry-run).
    pub cnt_deleted: u64,
    /// Source files skipped as up to date.
    pub cnt_skipped: u64,
    /// Every action in the order it happened.
    pub actions: Vec<EnumMirrorAction>,
    /// Non-fatal warnings collected during traversal.
    pub warnings: Vec<String>,
    /// Per-entry failures.
    pub errors: Vec<SpecMirrorError>,
}

impl ReportMirror {
    /// Number of collected per-entry errors.
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Number of collected warnings.
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// Machine-readable counters.
    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_scanned".to_string(), self.cnt_scanned);
        dict_counts.insert("cnt_excluded".to_string(), self.cnt_excluded);
        dict_counts.insert("cnt_copied".to_string(), self.cnt_copied);
        dict_counts.insert("cnt_deleted".to_string(), self.cnt_deleted);
        dict_counts.insert("cnt_skipped".to_string(), self.cnt_skipped);
        dict_counts.insert("cnt_errors".to_string(), self.error_count() as u64);
        dict_counts.insert("cnt_warnings".to_string(), self.warning_count() as u64);
        dict_counts
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        let dict_counts = self.to_dict();
        format!(
            "{prefix} scanned={} excluded={} copied={} deleted={} skipped={} errors={} warnings={}",
            dict_counts["cnt_scanned"],
            dict_counts["cnt_excluded"],
            dict_counts["cnt_copied"],
            dict_counts["cnt_deleted"],
            dict_counts["cnt_skipped"],
            dict_counts["cnt_errors"],
            dict_counts["cnt_warnings"]
        )
    }
}

impl fmt::Display for ReportMirror {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[MIRROR]"))
    }
}

/// Mutable accumulator for mirror statistics.
#[derive(Debug, Default, Clone)]
pub struct ReportMirrorBuilder {
    /// See [`ReportMirror::cnt_scanned`].
    pub cnt_scanned: u64,
    /// See [`ReportMirror::cnt_excluded`].
    pub cnt_excluded: u64,
    /// See [`ReportMirror::cnt_copied`].
    pub cnt_copied: u64,
    /// See [`ReportMirror::cnt_deleted`].
    pub cnt_deleted: u64,
    /// See [`ReportMirror::cnt_skipped`].
    pub cnt_skipped: u64,
    /// See [`ReportMirror::actions`].
    pub actions: Vec<EnumMirrorAction>,
    /// See [`ReportMirror::warnings`].
    pub warnings: Vec<String>,
    /// See [`ReportMirror::errors`].
    pub errors: Vec<SpecMirrorError>,
}

impl ReportMirrorBuilder {
    pub fn add_scanned(&mut self) {
        self.cnt_scanned += 1;
    }

    pub fn add_excluded(&mut self) {
        self.cnt_excluded += 1;
    }

    pub fn add_skipped(&mut self) {
        self.cnt_skipped += 1;
    }

    /// Add warning message.
    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    /// Append one action and bump the matching counter.
    ///
    /// `Error` actions are also recorded as [`SpecMirrorError`].
    pub fn add_action(&mut self, action: EnumMirrorAction) {
        match &action {
            EnumMirrorAction::Copy { .. } => self.cnt_copied += 1,
            EnumMirrorAction::DeleteFile(_) | EnumMirrorAction::DeleteDir(_) => {
                self.cnt_deleted += 1
            }
            EnumMirrorAction::Error { path, message } => self.errors.push(SpecMirrorError {
                path: path.clone(),
                exception: message.clone(),
            }),
        }
        self.actions.push(action);
    }

    /// Shorthand for an `Error` action on `path`.
    pub fn add_error(&mut self, path: PathBuf, message: String) {
        self.add_action(EnumMirrorAction::Error { path, message });
    }

    /// Finalize builder into immutable report.
    pub fn build(self) -> ReportMirror {
        ReportMirror {
            cnt_scanned: self.cnt_scanned,
            cnt_excluded: self.cnt_excluded,
            cnt_copied: self.cnt_copied,
            cnt_deleted: self.cnt_deleted,
            cnt_skipped: self.cnt_skipped,
            actions: self.actions,
            warnings: self.warnings,
            errors: self.errors,
        }
    }
}
