//! # Re-encryption
//!
//! Brings every entry under a directory in line with its governing `.gpg-id`.
//!
//! For each `*.gpg` entry the sorted encryption key ids of its recipients
//! (`intended`) are compared with the sorted key ids gpg reports for the
//! ciphertext (`actual`). Only entries where the two sequences differ are
//! decrypted and encrypted again, so a second pass over an unchanged tree does
//! no gpg work beyond the queries.
//!
//! ## Failure Handling
//!
//! - An entry that cannot be decrypted, or decrypts to nothing, is left untouched
//!   and listed in [`ReencryptReport::failed`]; the sweep continues.
//! - A missing or empty `.gpg-id` aborts the sweep with [`PassError::NoRecipients`].
//! - A gpg or git binary that cannot be launched aborts the sweep.

use crate::config::Settings;
use crate::error::{PassError, Result};
use crate::events::{EventSink, StoreEvent};
use crate::git::{commit_message, Git};
use crate::gpg::Gpg;
use crate::paths::entry_name;
use crate::process::Executor;
use crate::recipients::RecipientResolver;
use std::fs;
use std::path::{Path, PathBuf};

const DECRYPT_PLACEHOLDER: &str = "Could not decrypt";

/// Outcome of one reconciliation pass.
#[derive(Debug, Default)]
pub struct ReencryptReport {
    /// Entries inspected.
    pub scanned: usize,
    pub reencrypted: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, PassError)>,
}

pub struct Reencryptor {
    settings: Settings,
    gpg: Gpg,
    git: Git,
    resolver: RecipientResolver,
    events: EventSink,
}

impl Reencryptor {
    pub fn new(settings: &Settings, executor: &Executor, events: EventSink) -> Self {
        Self {
            gpg: Gpg::new(executor.clone(), &settings.gpg_executable),
            git: Git::new(executor.clone(), &settings.git_executable, &settings.store),
            resolver: RecipientResolver::new(&settings.store),
            settings: settings.clone(),
            events,
        }
    }

    /// Re-encrypt every drifted entry under `root`, which may be a directory or
    /// a single `.gpg` file, absolute or relative to the store.
    pub fn reconcile(&self, root: &Path) -> Result<ReencryptReport> {
        let root = if root.is_absolute() {
            root.to_path_buf()
        } else {
            self.settings.store.join(root)
        };
        tracing::info!(root = %root.display(), "re-encrypting");
        self.events
            .status(format!("Re-encrypting from folder {}", root.display()), 3000);
        self.events.emit(StoreEvent::ReencryptionStarted);

        let result = self.sweep(&root);

        self.events.emit(StoreEvent::ReencryptionFinished);
        if result.is_ok() && self.settings.auto_push && self.settings.uses_git() {
            self.events.status("Updating password-store", 2000);
            self.git.push();
        }
        result
    }

    fn sweep(&self, root: &Path) -> Result<ReencryptReport> {
        let uses_git = self.settings.uses_git();
        if self.settings.auto_pull && uses_git {
            self.events.status("Updating password-store", 2000);
            self.git.pull_blocking()?;
        }

        let mut report = ReencryptReport::default();
        let mut current_dir: Option<PathBuf> = None;
        let mut recipients = Vec::new();
        let mut intended = Vec::new();

        for entry in collect_entries(root)? {
            report.scanned += 1;

            let dir = entry.parent().map(Path::to_path_buf);
            if current_dir != dir {
                recipients = self.resolver.resolve(&entry);
                if recipients.is_empty() {
                    self.events.critical(
                        "Can not edit",
                        "Could not read encryption key to use, .gpg-id file missing or invalid.",
                    );
                    return Err(PassError::NoRecipients(entry));
                }
                intended = self.intended_keys(&recipients)?;
                current_dir = dir;
            }

            let actual = self.gpg.list_only(&entry)?;
            if actual == intended {
                continue;
            }

            tracing::debug!(entry = %entry.display(), ?recipients, "re-encrypting entry");
            match self.reencrypt_entry(&entry, &recipients, uses_git) {
                Ok(()) => report.reencrypted.push(entry),
                Err(err @ PassError::Launch { .. }) => return Err(err),
                Err(err) => {
                    tracing::warn!(entry = %entry.display(), error = %err, "skipping entry");
                    report.failed.push((entry, err));
                }
            }
        }

        Ok(report)
    }

    /// Sorted, de-duplicated encryption key ids of `recipients`.
    fn intended_keys(&self, recipients: &[String]) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for recipient in recipients {
            keys.extend(self.gpg.subkeys_of(recipient)?);
        }
        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    fn reencrypt_entry(&self, entry: &Path, recipients: &[String], uses_git: bool) -> Result<()> {
        self.events
            .emit(StoreEvent::LastDecrypted(DECRYPT_PLACEHOLDER.into()));

        let output = self.gpg.decrypt(entry)?;
        let mut plaintext = output.stdout;
        if output.status != 0 || plaintext.is_empty() {
            return Err(PassError::Decryption {
                path: entry.to_path_buf(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        if plaintext.last() != Some(&b'\n') {
            plaintext.push(b'\n');
        }
        self.events.emit(StoreEvent::LastDecrypted(
            String::from_utf8_lossy(&plaintext).into_owned(),
        ));

        let output = self.gpg.encrypt(entry, recipients, &plaintext, true)?;
        if !output.success() {
            return Err(PassError::Encryption {
                path: entry.to_path_buf(),
                reason: output.stderr_str().trim().to_string(),
            });
        }

        if uses_git {
            self.git.add(entry)?;
            let name = entry_name(&self.settings.store, entry);
            self.git.commit(&[entry], &commit_message("Edit", &name))?;
        }
        Ok(())
    }
}

/// All `*.gpg` files at or below `root`, sorted. Hidden files and directories
/// are skipped and symlinks are not followed.
pub fn collect_entries(root: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = Vec::new();
    if root.is_file() {
        if is_entry(root) {
            entries.push(root.to_path_buf());
        }
    } else if root.is_dir() {
        visit(root, &mut entries)?;
    }
    entries.sort();
    Ok(entries)
}

fn visit(dir: &Path, entries: &mut Vec<PathBuf>) -> Result<()> {
    for item in fs::read_dir(dir)? {
        let item = item?;
        if item.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        let path = item.path();
        let file_type = item.file_type()?;
        if file_type.is_dir() {
            visit(&path, entries)?;
        } else if file_type.is_file() && is_entry(&path) {
            entries.push(path);
        }
    }
    Ok(())
}

fn is_entry(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "gpg")
}
