//! Two-pass directory mirroring: deletion pass, then copy/update pass.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use filetime::FileTime;
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::ignore::IgnoreMatcher;
use crate::report::{ReportMirror, ReportMirrorBuilder};
use crate::spec::{EnumMirrorAction, MirrorTreeError, SpecMirrorOptions};
use crate::util::{
    calculate_worker_limit, copy_file_with_mtime, derive_relative_path, is_destination_stale,
    is_overlap, is_path_present,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EnumTreeEntryKind {
    Directory,
    File,
    Symlink,
    Special,
}

#[derive(Debug, Clone)]
struct SpecTreeEntry {
    path_entry: PathBuf,
    name_entry: OsString,
    enum_kind: EnumTreeEntryKind,
}

#[derive(Debug, Clone)]
struct SpecCopyTaskFile {
    path_file_src: PathBuf,
    path_file_dst: PathBuf,
    file_time_modify: FileTime,
}

struct SpecMirrorContext<'a, 'f> {
    path_dir_src: PathBuf,
    path_dir_dst: PathBuf,
    ignore_matcher: &'a IgnoreMatcher,
    spec_mr_options: SpecMirrorOptions,
    n_workers_max: usize,
    builder_mr_report: ReportMirrorBuilder,
    l_paths_removal: Vec<PathBuf>,
    l_tasks_file_copy: Vec<SpecCopyTaskFile>,
    fn_on_action: &'f mut dyn FnMut(&EnumMirrorAction),
}

impl SpecMirrorContext<'_, '_> {
    fn emit(&mut self, action: EnumMirrorAction) {
        match &action {
            EnumMirrorAction::Error { message, .. } => warn!("{message}"),
            _ => debug!(%action, "mirror action"),
        }
        (self.fn_on_action)(&action);
        self.builder_mr_report.add_action(action);
    }

    fn is_excluded(&self, path_rel: &Path) -> bool {
        self.ignore_matcher.is_excluded_path(path_rel)
    }
}

/// Mirror `dir_source` onto `dir_destination`.
///
/// See [`mirror_tree_with`]; this variant only collects actions into the
/// returned report.
pub fn mirror_tree<P, Q>(
    dir_source: P,
    dir_destination: Q,
    ignore_matcher: &IgnoreMatcher,
    spec_mr_options: SpecMirrorOptions,
) -> Result<ReportMirror, MirrorTreeError>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    mirror_tree_with(
        dir_source,
        dir_destination,
        ignore_matcher,
        spec_mr_options,
        &mut |_| {},
    )
}

/// Mirror `dir_source` onto `dir_destination`, streaming each action to
/// `on_action` as it happens.
///
/// This function performs:
/// 1. Input validation and destination root creation.
/// 2. Deletion pass: every destination entry that is not excluded by
///    `ignore_matcher` and has no source counterpart is collected, then the
///    list is removed in descending path order so children go before their
///    parent directories.
/// 3. Copy/update pass: every non-excluded source directory is ensured at the
///    destination and every stale source file is copied, after which the
///    destination mtime is set to the source mtime.
///
/// Excluded directories are still traversed: each path is judged on its own so
/// that negation rules can re-include descendants.
///
/// Returns [`ReportMirror`] when the run completes (with possible per-entry
/// errors stored in the report). Returns [`MirrorTreeError`] for setup and
/// traversal failures.
pub fn mirror_tree_with<P, Q>(
    dir_source: P,
    dir_destination: Q,
    ignore_matcher: &IgnoreMatcher,
    spec_mr_options: SpecMirrorOptions,
    on_action: &mut dyn FnMut(&EnumMirrorAction),
) -> Result<ReportMirror, MirrorTreeError>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let path_dir_src = dir_source.as_ref().to_path_buf();
    let path_dir_dst = dir_destination.as_ref().to_path_buf();

    if !path_dir_src.is_dir() {
        return Err(MirrorTreeError::SourceNotDirectory(path_dir_src));
    }
    if is_overlap(&path_dir_src, &path_dir_dst) {
        return Err(MirrorTreeError::SourceDestinationOverlap {
            source_dir: path_dir_src,
            destination_dir: path_dir_dst,
        });
    }
    if !spec_mr_options.if_dry_run {
        fs::create_dir_all(&path_dir_dst).map_err(|e| MirrorTreeError::DestinationInitFailed {
            path: path_dir_dst.clone(),
            source: e,
        })?;
    }

    let n_workers_max = calculate_worker_limit(spec_mr_options.num_workers_max);
    info!(
        source = %path_dir_src.display(),
        destination = %path_dir_dst.display(),
        rules = ignore_matcher.len(),
        workers = n_workers_max,
        dry_run = spec_mr_options.if_dry_run,
        "mirror started"
    );

    let mut spec_mr_ctx = SpecMirrorContext {
        path_dir_src: path_dir_src.clone(),
        path_dir_dst: path_dir_dst.clone(),
        ignore_matcher,
        spec_mr_options,
        n_workers_max,
        builder_mr_report: ReportMirrorBuilder::default(),
        l_paths_removal: Vec::new(),
        l_tasks_file_copy: Vec::new(),
        fn_on_action: on_action,
    };

    // Dry-run leaves a missing destination root uncreated; treat it as empty.
    if path_dir_dst.exists() {
        collect_removals(&path_dir_dst, &mut spec_mr_ctx)?;
    }
    flush_removals(&mut spec_mr_ctx);

    let res_walk = walk_source_directory(&path_dir_src, &mut spec_mr_ctx);
    // Tasks queued before a traversal failure are still executed.
    flush_file_copy_tasks(&mut spec_mr_ctx);
    res_walk?;

    let report = spec_mr_ctx.builder_mr_report.build();
    info!(summary = %report, "mirror finished");
    Ok(report)
}

////////////////////////////////////////////////////////////////////////////////
// #region Traversal

fn read_directory_sorted(path_dir: &Path) -> Result<Vec<SpecTreeEntry>, MirrorTreeError> {
    let as_traversal_error = |e| MirrorTreeError::TraversalFailed {
        path: path_dir.to_path_buf(),
        source: e,
    };

    let mut l_entries = Vec::new();
    for entry_res in fs::read_dir(path_dir).map_err(as_traversal_error)? {
        let entry = entry_res.map_err(as_traversal_error)?;
        let cfg_file_type = entry.file_type().map_err(as_traversal_error)?;
        let enum_kind = if cfg_file_type.is_dir() {
            EnumTreeEntryKind::Directory
        } else if cfg_file_type.is_file() {
            EnumTreeEntryKind::File
        } else if cfg_file_type.is_symlink() {
            EnumTreeEntryKind::Symlink
        } else {
            EnumTreeEntryKind::Special
        };
        l_entries.push(SpecTreeEntry {
            path_entry: entry.path(),
            name_entry: entry.file_name(),
            enum_kind,
        });
    }
    l_entries.sort_by(|a, b| a.name_entry.cmp(&b.name_entry));
    Ok(l_entries)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region DeletionPass

fn collect_removals(
    path_dir: &Path,
    spec_mr_ctx: &mut SpecMirrorContext<'_, '_>,
) -> Result<(), MirrorTreeError> {
    for spec_entry in read_directory_sorted(path_dir)? {
        spec_mr_ctx.builder_mr_report.add_scanned();
        let path_rel = derive_relative_path(&spec_entry.path_entry, &spec_mr_ctx.path_dir_dst);

        if spec_mr_ctx.is_excluded(&path_rel) {
            debug!(path = %path_rel.display(), "destination entry excluded");
            spec_mr_ctx.builder_mr_report.add_excluded();
        } else if !is_path_present(&spec_mr_ctx.path_dir_src.join(&path_rel)) {
            spec_mr_ctx
                .l_paths_removal
                .push(spec_entry.path_entry.clone());
        }

        if spec_entry.enum_kind == EnumTreeEntryKind::Directory {
            collect_removals(&spec_entry.path_entry, spec_mr_ctx)?;
        }
    }
    Ok(())
}

fn flush_removals(spec_mr_ctx: &mut SpecMirrorContext<'_, '_>) {
    let mut l_paths_removal = std::mem::take(&mut spec_mr_ctx.l_paths_removal);
    if l_paths_removal.is_empty() {
        return;
    }
    // Descending byte order puts every child before its parent directory.
    l_paths_removal.sort_by(|a, b| b.as_os_str().cmp(a.as_os_str()));
    info!(count = l_paths_removal.len(), "removing destination-only entries");

    for path_removal in l_paths_removal {
        let b_is_dir = fs::symlink_metadata(&path_removal)
            .map(|meta| meta.file_type().is_dir())
            .unwrap_or(false);

        if !spec_mr_ctx.spec_mr_options.if_dry_run {
            let res_remove = if b_is_dir {
                fs::remove_dir(&path_removal)
            } else {
                fs::remove_file(&path_removal)
            };
            if let Err(e) = res_remove {
                let message = format!("Failed to remove {} ({e})", path_removal.display());
                spec_mr_ctx.emit(EnumMirrorAction::Error {
                    path: path_removal,
                    message,
                });
                continue;
            }
        }

        if b_is_dir {
            spec_mr_ctx.emit(EnumMirrorAction::DeleteDir(path_removal));
        } else {
            spec_mr_ctx.emit(EnumMirrorAction::DeleteFile(path_removal));
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CopyPass

fn walk_source_directory(
    path_dir: &Path,
    spec_mr_ctx: &mut SpecMirrorContext<'_, '_>,
) -> Result<(), MirrorTreeError> {
    for spec_entry in read_directory_sorted(path_dir)? {
        spec_mr_ctx.builder_mr_report.add_scanned();
        let path_rel = derive_relative_path(&spec_entry.path_entry, &spec_mr_ctx.path_dir_src);
        let b_excluded = spec_mr_ctx.is_excluded(&path_rel);
        if b_excluded {
            debug!(path = %path_rel.display(), "source entry excluded");
            spec_mr_ctx.builder_mr_report.add_excluded();
        }

        match spec_entry.enum_kind {
            EnumTreeEntryKind::Directory => {
                if !b_excluded {
                    handle_dir_entry(&path_rel, spec_mr_ctx);
                }
                walk_source_directory(&spec_entry.path_entry, spec_mr_ctx)?;
            }
            EnumTreeEntryKind::File | EnumTreeEntryKind::Symlink => {
                if !b_excluded {
                    handle_file_entry(&spec_entry, &path_rel, spec_mr_ctx);
                }
            }
            EnumTreeEntryKind::Special => {
                if !b_excluded {
                    let warning =
                        format!("Special file skipped: {}", spec_entry.path_entry.display());
                    warn!("{warning}");
                    spec_mr_ctx.builder_mr_report.add_warning(warning);
                }
            }
        }
    }
    Ok(())
}

fn handle_dir_entry(path_rel: &Path, spec_mr_ctx: &mut SpecMirrorContext<'_, '_>) {
    if spec_mr_ctx.spec_mr_options.if_dry_run {
        return;
    }
    let path_dir_dst_sub = spec_mr_ctx.path_dir_dst.join(path_rel);
    if let Err(e) = fs::create_dir_all(&path_dir_dst_sub) {
        let message = format!(
            "Failed to create directory {} ({e})",
            path_dir_dst_sub.display()
        );
        spec_mr_ctx.emit(EnumMirrorAction::Error {
            path: path_dir_dst_sub,
            message,
        });
    }
}

fn handle_file_entry(
    spec_entry: &SpecTreeEntry,
    path_rel: &Path,
    spec_mr_ctx: &mut SpecMirrorContext<'_, '_>,
) {
    let path_file_src = &spec_entry.path_entry;
    // Follows symlinks: a link to a regular file is mirrored as that file.
    let meta_file_src = match fs::metadata(path_file_src) {
        Ok(v) => v,
        Err(e) if spec_entry.enum_kind == EnumTreeEntryKind::Symlink => {
            let warning = format!("Broken symlink skipped: {} ({e})", path_file_src.display());
            warn!("{warning}");
            spec_mr_ctx.builder_mr_report.add_warning(warning);
            return;
        }
        Err(e) => {
            let message = format!("Failed to inspect {} ({e})", path_file_src.display());
            spec_mr_ctx.emit(EnumMirrorAction::Error {
                path: path_file_src.clone(),
                message,
            });
            return;
        }
    };
    if !meta_file_src.is_file() {
        let warning = format!("Non-file symlink target skipped: {}", path_file_src.display());
        warn!("{warning}");
        spec_mr_ctx.builder_mr_report.add_warning(warning);
        return;
    }

    let path_file_dst = spec_mr_ctx.path_dir_dst.join(path_rel);
    if !is_destination_stale(
        path_file_src,
        &meta_file_src,
        &path_file_dst,
        spec_mr_ctx.spec_mr_options.rule_compare,
    ) {
        debug!(path = %path_rel.display(), "destination up to date");
        spec_mr_ctx.builder_mr_report.add_skipped();
        return;
    }

    let spec_task = SpecCopyTaskFile {
        path_file_src: path_file_src.clone(),
        path_file_dst,
        file_time_modify: FileTime::from_last_modification_time(&meta_file_src),
    };
    if spec_mr_ctx.spec_mr_options.if_dry_run {
        apply_copy_result(spec_task, Ok(()), spec_mr_ctx);
    } else if spec_mr_ctx.n_workers_max <= 1 {
        let res_copy = execute_copy_task(&spec_task);
        apply_copy_result(spec_task, res_copy, spec_mr_ctx);
    } else {
        spec_mr_ctx.l_tasks_file_copy.push(spec_task);
    }
}

fn execute_copy_task(spec_task: &SpecCopyTaskFile) -> Result<(), String> {
    copy_file_with_mtime(
        &spec_task.path_file_src,
        &spec_task.path_file_dst,
        spec_task.file_time_modify,
    )
    .map_err(|e| e.to_string())
}

fn apply_copy_result(
    spec_task: SpecCopyTaskFile,
    res_copy: Result<(), String>,
    spec_mr_ctx: &mut SpecMirrorContext<'_, '_>,
) {
    match res_copy {
        Ok(_) => spec_mr_ctx.emit(EnumMirrorAction::Copy {
            path_src: spec_task.path_file_src,
            path_dst: spec_task.path_file_dst,
        }),
        Err(msg) => {
            let message = format!(
                "Failed to copy {} -> {} ({msg})",
                spec_task.path_file_src.display(),
                spec_task.path_file_dst.display()
            );
            spec_mr_ctx.emit(EnumMirrorAction::Error {
                path: spec_task.path_file_dst,
                message,
            });
        }
    }
}

/// Run tasks queued for the worker pool. Serial and dry-run copies never queue.
fn flush_file_copy_tasks(spec_mr_ctx: &mut SpecMirrorContext<'_, '_>) {
    let l_tasks_file_copy = std::mem::take(&mut spec_mr_ctx.l_tasks_file_copy);
    if l_tasks_file_copy.is_empty() {
        return;
    }

    let thread_pool = ThreadPoolBuilder::new()
        .num_threads(spec_mr_ctx.n_workers_max)
        .build();
    let Ok(thread_pool) = thread_pool else {
        let warning = format!(
            "Failed to initialize thread pool (workers={}); fallback to serial copy.",
            spec_mr_ctx.n_workers_max
        );
        warn!("{warning}");
        spec_mr_ctx.builder_mr_report.add_warning(warning);
        for spec_task in l_tasks_file_copy {
            let res_copy = execute_copy_task(&spec_task);
            apply_copy_result(spec_task, res_copy, spec_mr_ctx);
        }
        return;
    };

    // Results keep task order, so the action log stays in traversal order.
    let l_results = thread_pool.install(|| {
        l_tasks_file_copy
            .into_par_iter()
            .map(|spec_task| {
                let res_copy = execute_copy_task(&spec_task);
                (spec_task, res_copy)
            })
            .collect::<Vec<_>>()
    });
    for (spec_task, res_copy) in l_results {
        apply_copy_result(spec_task, res_copy, spec_mr_ctx);
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
