//! Store-relative path helpers.
//!
//! [`is_safe`] is a purely textual check. It does not resolve symlinks or look at
//! the filesystem, so it must run on every externally supplied path before the
//! store mutates anything.

use std::path::{Path, PathBuf};

/// Suffix of every encrypted entry on disk.
pub const GPG_SUFFIX: &str = ".gpg";

/// Name of the recipient-list file.
pub const GPG_ID_FILE: &str = ".gpg-id";

/// `false` for paths that could climb out of the store via `..`.
pub fn is_safe(path: &str) -> bool {
    !(path == ".." || path.ends_with("/..") || path.starts_with("../") || path.contains("/../"))
}

pub fn has_sneaky_paths<'a>(paths: impl IntoIterator<Item = &'a str>) -> bool {
    paths.into_iter().any(|p| !is_safe(p))
}

/// Drop one trailing `.gpg`, if present.
pub fn strip_gpg_suffix(path: &str) -> &str {
    path.strip_suffix(GPG_SUFFIX).unwrap_or(path)
}

pub fn remove_one_trailing_slash(path: &str) -> &str {
    path.strip_suffix('/').unwrap_or(path)
}

/// `path` with `.gpg` appended to its final component.
pub fn with_gpg_suffix(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(GPG_SUFFIX);
    PathBuf::from(name)
}

/// User-facing name of an entry: relative to `root`, `.gpg` stripped.
pub fn entry_name(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    let rel = rel.to_string_lossy();
    strip_gpg_suffix(&rel).to_string()
}

/// Turn user input into a store-relative string. Absolute paths inside `root`
/// lose the root prefix; everything else is returned as given.
pub fn relative_to_store(root: &Path, input: &str) -> String {
    let candidate = Path::new(input);
    if candidate.is_absolute() {
        if let Ok(rel) = candidate.strip_prefix(root) {
            let mut rel = rel.to_string_lossy().into_owned();
            if input.ends_with('/') && !rel.is_empty() {
                rel.push('/');
            }
            return rel;
        }
    }
    input.to_string()
}
