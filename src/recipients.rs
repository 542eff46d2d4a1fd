//! # Recipient Lists
//!
//! A `.gpg-id` file governs every entry below its directory until a deeper
//! `.gpg-id` overrides it. [`RecipientResolver`] finds the governing file for an
//! entry by walking up from the entry's directory, never past the store root.
//!
//! ## File Format
//!
//! ```text
//! # team keys
//! 0123456789ABCDEF
//! alice@example.com   # trailing comments are ignored
//! ```
//!
//! One identifier per line; blank lines and `#` comments are skipped.

use crate::error::{PassError, Result};
use crate::paths::GPG_ID_FILE;
use std::fs;
use std::path::{Path, PathBuf};

/// Resolves the recipients governing entries of one store.
#[derive(Debug, Clone)]
pub struct RecipientResolver {
    root: PathBuf,
}

impl RecipientResolver {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Nearest `.gpg-id` at or above the directory containing `target`.
    ///
    /// `target` may be absolute or relative to the store root. Returns `None`
    /// once the walk leaves the store.
    pub fn gpg_id_file(&self, target: &Path) -> Option<PathBuf> {
        let target = if target.is_absolute() {
            target.to_path_buf()
        } else {
            self.root.join(target)
        };

        let mut dir = target.parent()?.to_path_buf();
        while dir.starts_with(&self.root) {
            let candidate = dir.join(GPG_ID_FILE);
            if candidate.is_file() {
                return Some(candidate);
            }
            if dir == self.root || !dir.pop() {
                break;
            }
        }
        None
    }

    /// Ordered recipient identifiers for `target`. Empty when no `.gpg-id`
    /// governs it or the file cannot be read.
    pub fn resolve(&self, target: &Path) -> Vec<String> {
        let Some(file) = self.gpg_id_file(target) else {
            return Vec::new();
        };
        match read_gpg_id(&file) {
            Ok(ids) => ids,
            Err(err) => {
                tracing::warn!(file = %file.display(), error = %err, "unreadable .gpg-id");
                Vec::new()
            }
        }
    }

    /// Like [`resolve`](Self::resolve), but an empty list is an error.
    pub fn require(&self, target: &Path) -> Result<Vec<String>> {
        let ids = self.resolve(target);
        if ids.is_empty() {
            return Err(PassError::NoRecipients(target.to_path_buf()));
        }
        Ok(ids)
    }
}

/// Parse a `.gpg-id` file.
pub fn read_gpg_id(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)?;
    Ok(parse_gpg_id(&content))
}

pub fn parse_gpg_id(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|line| line.split('#').next().unwrap_or_default().trim())
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Write `ids` one per line, replacing any existing file.
pub fn write_gpg_id<S: AsRef<str>>(path: &Path, ids: &[S]) -> Result<()> {
    let mut content = String::new();
    for id in ids {
        content.push_str(id.as_ref());
        content.push('\n');
    }
    fs::write(path, content).map_err(|e| PassError::fs("write", path, e))
}
