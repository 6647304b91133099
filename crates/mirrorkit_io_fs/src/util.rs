use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use filetime::FileTime;

use crate::spec::EnumMirrorCompareMode;

////////////////////////////////////////////////////////////////////////////////
// #region PathUtilities

fn _absolutize_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(path)
}

/// Canonicalize the deepest existing ancestor and re-attach the missing tail.
fn _normalize_path(path: &Path) -> PathBuf {
    let path_abs = _absolutize_path(path);
    if let Ok(resolved) = fs::canonicalize(&path_abs) {
        return resolved;
    }
    match (path_abs.parent(), path_abs.file_name()) {
        (Some(path_parent), Some(name)) => _normalize_path(path_parent).join(name),
        _ => path_abs,
    }
}

pub(crate) fn is_overlap(src: &Path, dst: &Path) -> bool {
    let src_resolved = _normalize_path(src);
    let dst_resolved = _normalize_path(dst);
    dst_resolved.starts_with(&src_resolved) || src_resolved.starts_with(&dst_resolved)
}

/// Path of `path_entry` below `path_dir_root`.
pub(crate) fn derive_relative_path(path_entry: &Path, path_dir_root: &Path) -> PathBuf {
    path_entry
        .strip_prefix(path_dir_root)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| path_entry.to_path_buf())
}

/// Existence probe for the deletion pass.
///
/// Only "not found" and "not a directory" count as absent. Any other probe
/// failure reports the path as present so the destination entry is kept.
pub(crate) fn is_path_present(path: &Path) -> bool {
    match fs::symlink_metadata(path) {
        Ok(_) => true,
        Err(e) => !matches!(
            e.kind(),
            io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
        ),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region FileUtilities

fn _digest_file(path: &Path) -> io::Result<blake3::Hash> {
    let mut file = fs::File::open(path)?;
    let mut hasher = blake3::Hasher::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hasher.finalize())
}

/// Staleness check of `path_file_dst` against its source counterpart.
///
/// An absent (or unreadable) destination and a size mismatch are always
/// stale. Otherwise `rule_compare` decides between mtime and digest equality.
pub(crate) fn is_destination_stale(
    path_file_src: &Path,
    meta_file_src: &fs::Metadata,
    path_file_dst: &Path,
    rule_compare: EnumMirrorCompareMode,
) -> bool {
    let Ok(meta_file_dst) = fs::metadata(path_file_dst) else {
        return true;
    };
    if meta_file_dst.len() != meta_file_src.len() {
        return true;
    }

    match rule_compare {
        EnumMirrorCompareMode::Metadata => {
            FileTime::from_last_modification_time(meta_file_src)
                != FileTime::from_last_modification_time(&meta_file_dst)
        }
        EnumMirrorCompareMode::Content => {
            match (_digest_file(path_file_src), _digest_file(path_file_dst)) {
                (Ok(hash_src), Ok(hash_dst)) => hash_src != hash_dst,
                _ => true,
            }
        }
    }
}

/// Overwrite `path_file_dst` with `path_file_src`, then stamp the source mtime.
///
/// The mtime is applied after the copy so that the next staleness check sees
/// identical timestamps.
pub(crate) fn copy_file_with_mtime(
    path_file_src: &Path,
    path_file_dst: &Path,
    file_time_modify: FileTime,
) -> Result<(), io::Error> {
    if let Some(path_parent_dst) = path_file_dst.parent() {
        fs::create_dir_all(path_parent_dst)?;
    }
    fs::copy(path_file_src, path_file_dst)?;
    filetime::set_file_mtime(path_file_dst, file_time_modify)?;
    Ok(())
}

pub(crate) fn calculate_worker_limit(num_workers_max: Option<usize>) -> usize {
    let n_cpu = std::thread::available_parallelism()
        .map(|v| v.get())
        .unwrap_or(1);

    match num_workers_max {
        Some(n) => n.clamp(1, n_cpu),
        None => n_cpu.clamp(1, 8),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::path::Path;

    use filetime::{FileTime, set_file_mtime};

    use super::{
        calculate_worker_limit, derive_relative_path, is_destination_stale, is_overlap,
        is_path_present,
    };
    use crate::spec::EnumMirrorCompareMode;

    #[test]
    fn is_path_present_treats_not_a_directory_as_absent() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path_file = tmp.path().join("x");
        std::fs::write(&path_file, "x").expect("write");

        assert!(is_path_present(&path_file));
        assert!(!is_path_present(&tmp.path().join("missing")));
        assert!(!is_path_present(&path_file.join("inner")));
    }

    #[test]
    fn is_overlap_detects_nested_missing_destination() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let src = tmp.path().join("src");
        std::fs::create_dir_all(&src).expect("mkdir");

        assert!(is_overlap(&src, &src.join("a/b")));
        assert!(is_overlap(&src.join("a"), &src));
        assert!(!is_overlap(&src, &tmp.path().join("dst")));
    }

    #[test]
    fn derive_relative_path_strips_root() {
        let rel = derive_relative_path(Path::new("/r/a/b.txt"), Path::new("/r"));
        assert_eq!(rel, Path::new("a/b.txt"));
    }

    #[test]
    fn content_mode_ignores_mtime_but_not_bytes() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path_src = tmp.path().join("src.txt");
        let path_dst = tmp.path().join("dst.txt");
        std::fs::write(&path_src, "abc").expect("write src");
        std::fs::write(&path_dst, "abc").expect("write dst");
        set_file_mtime(&path_src, FileTime::from_unix_time(1_700_000_000, 0)).expect("mtime");
        set_file_mtime(&path_dst, FileTime::from_unix_time(1_600_000_000, 0)).expect("mtime");

        let meta_src = std::fs::metadata(&path_src).expect("meta");
        assert!(!is_destination_stale(
            &path_src,
            &meta_src,
            &path_dst,
            EnumMirrorCompareMode::Content
        ));
        assert!(is_destination_stale(
            &path_src,
            &meta_src,
            &path_dst,
            EnumMirrorCompareMode::Metadata
        ));

        std::fs::write(&path_dst, "abd").expect("rewrite dst");
        assert!(is_destination_stale(
            &path_src,
            &meta_src,
            &path_dst,
            EnumMirrorCompareMode::Content
        ));
    }

    #[test]
    fn worker_limit_is_at_least_one() {
        assert_eq!(calculate_worker_limit(Some(0)), 1);
        assert_eq!(calculate_worker_limit(Some(1)), 1);
        assert!(calculate_worker_limit(None) >= 1);
    }
}
