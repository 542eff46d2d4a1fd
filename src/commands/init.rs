use crate::error::{PassError, Result};
use crate::git::COMMIT_SUFFIX;
use crate::gpg::Recipient;
use crate::paths::{is_safe, relative_to_store, GPG_ID_FILE};
use crate::recipients::write_gpg_id;
use crate::reencrypt::ReencryptReport;
use crate::store::ImitatePass;
use std::fs;
use std::path::Path;

/// Write a `.gpg-id` for the directory `path` (store root when empty) listing
/// every enabled user, then re-encrypt the entries below it.
///
/// When none of the enabled users has a secret key the file is still written,
/// but nothing is committed or re-encrypted and [`PassError::NoSecretKey`] is
/// returned.
pub fn init(store: &ImitatePass, path: &str, users: &[Recipient]) -> Result<ReencryptReport> {
    let rel = relative_to_store(store.root(), path);
    if !is_safe(&rel) || Path::new(&rel).is_absolute() {
        return Err(PassError::PathUnsafe(path.to_string()));
    }
    let dir = store.root().join(&rel);
    fs::create_dir_all(&dir).map_err(|e| PassError::fs("create", &dir, e))?;

    let gpg_id = dir.join(GPG_ID_FILE);
    let add_file = store.settings().add_gpg_id && !gpg_id.is_file();

    let enabled: Vec<&str> = users
        .iter()
        .filter(|user| user.enabled)
        .map(|user| user.id.as_str())
        .collect();
    if let Err(err) = write_gpg_id(&gpg_id, &enabled) {
        store
            .events()
            .critical("Cannot update", "Failed to open .gpg-id for writing.");
        return Err(err);
    }
    tracing::info!(gpg_id = %gpg_id.display(), recipients = ?enabled, "wrote recipient list");

    if !users.iter().any(|user| user.enabled && user.has_secret) {
        store.events().critical(
            "Check selected users!",
            "None of the selected keys have a secret key available.\n\
             You will not be able to decrypt any newly added passwords!",
        );
        return Err(PassError::NoSecretKey);
    }

    if store.settings().uses_git() {
        let git = store.git();
        if add_file {
            git.add(&gpg_id)?;
        }
        let shown = gpg_id.strip_prefix(store.root()).unwrap_or(&gpg_id);
        let message = format!("Added {} {COMMIT_SUFFIX}", shown.display());
        git.commit(&[gpg_id.as_path()], &message)?;
    }

    store.reencryptor().reconcile(&dir)
}
