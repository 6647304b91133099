//! `mirrorkit_io_fs` v1:
//! Rust-side directory mirroring engine.
//!
//! Modules:
//! - `ignore` : ordered substring ignore rules
//! - `mirror` : two-pass tree reconciliation (delete, then copy/update)
//! - `spec`   : enums/options/actions/errors
//! - `report` : run-time report model
//! - `util`   : shared helper functions

pub mod ignore;
pub mod mirror;
pub mod report;
pub mod spec;
mod util;

pub use ignore::{IgnoreMatcher, SpecIgnoreRule};
pub use mirror::{mirror_tree, mirror_tree_with};
pub use report::{ReportMirror, ReportMirrorBuilder};
pub use spec::{
    EnumMirrorAction, EnumMirrorCompareMode, MirrorTreeError, SpecMirrorError, SpecMirrorOptions,
};
