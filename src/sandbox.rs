//! Served-root path validation.
//!
//! The single security gate between a requested name and the filesystem.
//! Resolution is purely lexical: `.` and `..` segments are folded without
//! touching the filesystem, and anything that would land on or above the
//! root is rejected.

use anyhow::{bail, Result};
use std::path::{Component, Path, PathBuf};

/// Resolve a requested relative name under the served root.
///
/// Rejects:
/// - empty names and names containing NUL
/// - absolute paths and prefix/root components anywhere in the name
/// - any `..` segment that would climb above the root
/// - names that resolve to the root itself
pub fn resolve_under_root(root: &Path, name: &str) -> Result<PathBuf> {
    if name.is_empty() {
        bail!("empty file name");
    }
    if name.contains('\0') {
        bail!("file name contains NUL byte");
    }

    let requested = Path::new(name);
    let mut safe = PathBuf::new();
    let mut depth = 0usize;
    for component in requested.components() {
        match component {
            Component::CurDir => {}
            Component::Normal(s) => {
                safe.push(s);
                depth += 1;
            }
            Component::ParentDir => {
                if depth == 0 {
                    bail!("file name escapes served root: {name:?}");
                }
                safe.pop();
                depth -= 1;
            }
            Component::RootDir | Component::Prefix(_) => {
                bail!("absolute file name not allowed: {name:?}");
            }
        }
    }

    if safe.as_os_str().is_empty() {
        bail!("file name resolves to the served root itself: {name:?}");
    }

    Ok(root.join(safe))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> &'static Path {
        Path::new("/srv/files")
    }

    #[test]
    fn test_plain_names_resolve_under_root() {
        assert_eq!(
            resolve_under_root(root(), "report.bin").unwrap(),
            Path::new("/srv/files/report.bin")
        );
        assert_eq!(
            resolve_under_root(root(), "sub/dir/data.txt").unwrap(),
            Path::new("/srv/files/sub/dir/data.txt")
        );
    }

    #[test]
    fn test_cur_dir_segments_fold_away() {
        assert_eq!(
            resolve_under_root(root(), "./a/./b").unwrap(),
            Path::new("/srv/files/a/b")
        );
    }

    #[test]
    fn test_interior_parent_staying_inside_is_safe() {
        assert_eq!(
            resolve_under_root(root(), "a/../b").unwrap(),
            Path::new("/srv/files/b")
        );
        assert_eq!(
            resolve_under_root(root(), "a/b/../../c").unwrap(),
            Path::new("/srv/files/c")
        );
    }

    #[test]
    fn test_parent_traversal_rejected() {
        assert!(resolve_under_root(root(), "../etc/passwd").is_err());
        assert!(resolve_under_root(root(), "../../etc/passwd").is_err());
        assert!(resolve_under_root(root(), "a/../../etc/passwd").is_err());
        assert!(resolve_under_root(root(), "..").is_err());
    }

    #[test]
    fn test_absolute_paths_rejected() {
        assert!(resolve_under_root(root(), "/etc/passwd").is_err());
        assert!(resolve_under_root(root(), "//server/share").is_err());
    }

    #[test]
    fn test_empty_and_root_resolving_names_rejected() {
        assert!(resolve_under_root(root(), "").is_err());
        assert!(resolve_under_root(root(), ".").is_err());
        assert!(resolve_under_root(root(), "./.").is_err());
        assert!(resolve_under_root(root(), "a/..").is_err());
    }

    #[test]
    fn test_trailing_separator_tolerated() {
        assert_eq!(
            resolve_under_root(root(), "dir/file/").unwrap(),
            Path::new("/srv/files/dir/file")
        );
    }

    #[test]
    fn test_nul_rejected() {
        assert!(resolve_under_root(root(), "file\0.txt").is_err());
    }

    #[test]
    fn test_dotted_names_are_not_traversal() {
        // ".." must be rejected as a segment, not as a substring.
        assert_eq!(
            resolve_under_root(root(), "notes..old").unwrap(),
            Path::new("/srv/files/notes..old")
        );
        assert_eq!(
            resolve_under_root(root(), "a..b/c").unwrap(),
            Path::new("/srv/files/a..b/c")
        );
    }
}
