//! # File System Operations Module / 文件系统操作模块
//!
//! Walking a workspace for files matching the test glob, and the stat
//! check used to decide whether a path segment is a directory level.
//!
//! 遍历工作区以查找匹配测试通配模式的文件，以及用于判断路径段是否为目录层级的检查。

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};
use url::Url;
use walkdir::{DirEntry, WalkDir};

use crate::core::error::DiscoveryError;

/// Compiles a single glob pattern where `*` never crosses a path separator.
pub fn compile_glob(pattern: &str) -> Result<GlobSet, DiscoveryError> {
    let glob = GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|e| DiscoveryError::Walk {
            path: PathBuf::from(pattern),
            message: e.to_string(),
        })?;
    GlobSetBuilder::new()
        .add(glob)
        .build()
        .map_err(|e| DiscoveryError::Walk {
            path: PathBuf::from(pattern),
            message: e.to_string(),
        })
}

/// Hidden directories such as `.git` or `.bundle` are never scanned.
fn is_hidden_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry.file_name().to_string_lossy().starts_with('.')
}

fn walk_matches<'a>(root: &'a Path, globs: &'a GlobSet) -> impl Iterator<Item = PathBuf> + 'a {
    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| !is_hidden_dir(e))
        .filter_map(move |entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(root = %root.display(), error = %e, "skipping unreadable entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(move |entry| {
            entry
                .path()
                .strip_prefix(root)
                .is_ok_and(|rel| globs.is_match(rel))
        })
        .map(|entry| entry.into_path())
}

/// All files under `root` whose root-relative path matches `globs`, sorted.
pub fn find_files(root: &Path, globs: &GlobSet) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walk_matches(root, globs).collect();
    files.sort();
    files
}

/// Whether at least one file under `root` matches `globs`. Stops at the first hit.
pub fn has_matching_file(root: &Path, globs: &GlobSet) -> bool {
    walk_matches(root, globs).next().is_some()
}

/// Checks if a path is a directory. A failing stat counts as "not a directory".
pub fn is_directory(path: &Path) -> bool {
    match fs::metadata(path) {
        Ok(meta) => meta.is_dir(),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "stat failed, treating as file");
            false
        }
    }
}

/// The normal components of a relative path as strings.
pub fn path_segments(relative: &Path) -> Vec<String> {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect()
}

/// Converts a `file://` URI into a path. Anything that is not a file URI
/// (a plain path, an `untitled:` buffer) is taken as a path verbatim.
pub fn path_from_uri(uri: &str) -> PathBuf {
    match Url::parse(uri) {
        Ok(url) if url.scheme() == "file" => url.to_file_path().unwrap_or_else(|()| {
            debug!(uri, "file URI without a local path");
            PathBuf::from(uri)
        }),
        _ => PathBuf::from(uri),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_segments_skip_non_normal_components() {
        let segments = path_segments(Path::new("./app/test/models/user_test.rb"));
        assert_eq!(segments, vec!["app", "test", "models", "user_test.rb"]);
    }

    #[test]
    fn test_path_from_uri() {
        assert_eq!(
            path_from_uri("file:///w/test/my%20file_test.rb"),
            PathBuf::from("/w/test/my file_test.rb")
        );
        assert_eq!(path_from_uri("/plain/path.rb"), PathBuf::from("/plain/path.rb"));
        assert_eq!(path_from_uri("/trailing%"), PathBuf::from("/trailing%"));
    }

    #[cfg(unix)]
    #[test]
    fn test_path_from_uri_accepts_localhost_authority() {
        assert_eq!(
            path_from_uri("file://localhost/w/test/a_test.rb"),
            PathBuf::from("/w/test/a_test.rb")
        );
        assert!(path_from_uri("file://localhost/w/a_test.rb").is_absolute());
    }

    #[test]
    fn test_compile_glob_respects_separators() {
        let globs = compile_glob("**/{test,spec}/**/{*_test.rb,*_spec.rb}").unwrap();
        assert!(globs.is_match("test/a_test.rb"));
        assert!(globs.is_match("engine/spec/models/user_spec.rb"));
        assert!(!globs.is_match("lib/a_test.rb"));
        assert!(!globs.is_match("test/a_test.py"));
    }

    #[test]
    fn test_is_directory_on_missing_path() {
        assert!(!is_directory(Path::new("/definitely/not/here/at/all")));
    }
}
