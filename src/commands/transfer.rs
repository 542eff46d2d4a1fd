//! Move and copy, modelled on `pass mv` / `pass cp`.
//!
//! Input is validated before anything is touched; a rejected request only
//! produces a status message. Once the filesystem has been changed the
//! destination is always re-encrypted for its governing `.gpg-id`, even when the
//! rename or copy itself failed, so a later run can repair partial state.
//! A source is never moved or copied into itself or its own subtree.

use crate::commands::remove::remove_tree;
use crate::error::{PassError, Result};
use crate::events::EventSink;
use crate::git::COMMIT_SUFFIX;
use crate::paths::{
    entry_name, has_sneaky_paths, relative_to_store, remove_one_trailing_slash, strip_gpg_suffix,
    with_gpg_suffix,
};
use crate::store::ImitatePass;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    Move,
    Copy,
}

impl TransferMode {
    fn verb(self) -> &'static str {
        match self {
            Self::Move => "move",
            Self::Copy => "copy",
        }
    }
}

#[derive(Debug)]
pub enum Transfer {
    /// The entry now lives at `dest`.
    Completed { dest: PathBuf },
    /// The entry now lives at `dest`, but re-encrypting it for its new
    /// recipients failed. The change is still committed.
    Unreconciled { dest: PathBuf, error: PassError },
    /// The rename or copy to `dest` failed.
    Failed { dest: PathBuf, error: PassError },
    /// Refused before touching the store.
    Rejected(PassError),
}

impl Transfer {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

pub fn move_entry(store: &ImitatePass, src: &str, dest: &str, force: bool) -> Result<Transfer> {
    transfer(store, src, dest, force, TransferMode::Move)
}

pub fn copy_entry(store: &ImitatePass, src: &str, dest: &str, force: bool) -> Result<Transfer> {
    transfer(store, src, dest, force, TransferMode::Copy)
}

fn reject(events: &EventSink, text: String, error: PassError) -> Transfer {
    events.status(text, 5000);
    Transfer::Rejected(error)
}

/// Move or copy `src_param` to `dest_param`.
///
/// Both are store-relative names or absolute paths inside the store, with or
/// without the `.gpg` suffix. A destination that is an existing directory, or
/// ends in `/`, receives the source under its own name.
pub fn transfer(
    store: &ImitatePass,
    src_param: &str,
    dest_param: &str,
    force: bool,
    mode: TransferMode,
) -> Result<Transfer> {
    let events = store.events();
    let root = store.root();

    let src_rel = relative_to_store(root, src_param);
    let dest_rel = relative_to_store(root, dest_param);
    let src = strip_gpg_suffix(&src_rel);
    let dest = strip_gpg_suffix(&dest_rel);

    if src.trim().is_empty() {
        return Ok(reject(
            events,
            "You passed an empty source".into(),
            PassError::EmptyPath("source"),
        ));
    }
    if dest.trim().is_empty() {
        return Ok(reject(
            events,
            "You passed an empty destination".into(),
            PassError::EmptyPath("destination"),
        ));
    }
    if has_sneaky_paths([src, dest]) || Path::new(src).is_absolute() || Path::new(dest).is_absolute() {
        return Ok(reject(
            events,
            format!("You've attempted to pass a sneaky path \"{src}\" or \"{dest}\""),
            PassError::PathUnsafe(format!("{src} -> {dest}")),
        ));
    }

    let mut old_path = root.join(remove_one_trailing_slash(src));
    let old_gpg = with_gpg_suffix(&old_path);
    if old_gpg.is_file() && !old_path.is_dir() && !src_param.ends_with('/') {
        old_path = old_gpg;
    }
    if !old_path.exists() {
        return Ok(reject(
            events,
            format!("\"{src_param}\" is not in the password store"),
            PassError::NotInStore(src_param.to_string()),
        ));
    }

    let dest_is_dir = dest.ends_with('/');
    let mut new_path = root.join(remove_one_trailing_slash(dest));
    let into_dir = dest_is_dir || new_path.is_dir();
    if !(old_path.is_dir() || into_dir) {
        new_path = with_gpg_suffix(&new_path);
    }
    let dest_path = match old_path.file_name() {
        Some(name) if into_dir => new_path.join(name),
        _ => new_path,
    };

    if dest_path.starts_with(&old_path) || same_file(&old_path, &dest_path) {
        return Ok(reject(
            events,
            format!("Cannot {} \"{src_param}\" into itself", mode.verb()),
            PassError::IntoItself {
                op: mode.verb(),
                path: src_param.to_string(),
            },
        ));
    }

    if let Some(parent) = dest_path.parent() {
        if let Err(source) = fs::create_dir_all(parent) {
            return Ok(reject(
                events,
                format!("Could not create {}", parent.display()),
                PassError::fs("create", parent, source),
            ));
        }
    }

    if force && dest_path.exists() {
        let removed = if dest_path.is_dir() {
            remove_tree(&dest_path)
        } else {
            fs::remove_file(&dest_path).map_err(|e| PassError::fs("remove", &dest_path, e))
        };
        if let Err(err) = removed {
            tracing::warn!(dest = %dest_path.display(), error = %err, "could not clear destination");
        }
    }

    let outcome = if dest_path.exists() {
        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            "destination already exists",
        ))
    } else {
        match mode {
            TransferMode::Move => fs::rename(&old_path, &dest_path),
            TransferMode::Copy => copy_tree(&old_path, &dest_path),
        }
    };
    let error = outcome.err().map(|source| {
        events.status(format!("The {} was not successful", mode.verb()), 5000);
        PassError::fs(mode.verb(), &dest_path, source)
    });

    // Re-encryption errors are reported in the result; the commit still runs.
    let unreconciled = if dest_path.exists() {
        store.reencryptor().reconcile(&dest_path).err()
    } else {
        None
    };
    if let Some(err) = &unreconciled {
        tracing::warn!(dest = %dest_path.display(), error = %err, "destination not re-encrypted");
        events.status(
            format!("Could not re-encrypt {}: {err}", entry_name(root, &dest_path)),
            5000,
        );
    }

    let settings = store.settings();
    if settings.uses_git() {
        let git = store.git();
        let from = entry_name(root, &old_path);
        let to = entry_name(root, &dest_path);
        match mode {
            TransferMode::Move if !old_path.exists() => {
                git.rm(&old_path, true)?;
                git.add(&dest_path)?;
                let message = format!("Moved from {from} to {to} {COMMIT_SUFFIX}");
                git.commit(&[old_path.as_path(), dest_path.as_path()], &message)?;
                if settings.auto_push {
                    git.push();
                }
            }
            TransferMode::Copy if error.is_none() => {
                git.add(&dest_path)?;
                let message = format!("Copied from {from} to {to} {COMMIT_SUFFIX}");
                git.commit(&[dest_path.as_path()], &message)?;
                if settings.auto_push {
                    git.push();
                }
            }
            _ => {}
        }
    }

    Ok(match (error, unreconciled) {
        (Some(error), _) => Transfer::Failed {
            dest: dest_path,
            error,
        },
        (None, Some(error)) => Transfer::Unreconciled {
            dest: dest_path,
            error,
        },
        (None, None) => {
            tracing::info!(from = %old_path.display(), to = %dest_path.display(), mode = mode.verb(), "transferred");
            Transfer::Completed { dest: dest_path }
        }
    })
}

/// Both paths name the same existing file or directory.
fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Copy a file, or a directory recursively.
fn copy_tree(src: &Path, dest: &Path) -> io::Result<()> {
    if !src.is_dir() {
        return fs::copy(src, dest).map(|_| ());
    }
    fs::create_dir_all(dest)?;
    for item in fs::read_dir(src)? {
        let item = item?;
        copy_tree(&item.path(), &dest.join(item.file_name()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_copy_tree() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        fs::create_dir_all(src.join("nested")).unwrap();
        fs::write(src.join("a.gpg"), b"a").unwrap();
        fs::write(src.join("nested/.gpg-id"), b"alice\n").unwrap();

        let dest = temp.path().join("dest");
        copy_tree(&src, &dest).unwrap();
        assert_eq!(fs::read(dest.join("a.gpg")).unwrap(), b"a");
        assert_eq!(fs::read(dest.join("nested/.gpg-id")).unwrap(), b"alice\n");
        assert!(src.join("a.gpg").exists());
    }

    #[test]
    fn test_verbs() {
        assert_eq!(TransferMode::Move.verb(), "move");
        assert_eq!(TransferMode::Copy.verb(), "copy");
    }
}
