use crate::error::{PassError, Result};
use crate::git::commit_message;
use crate::store::ImitatePass;
use std::fs;

/// Encrypt `content` into the entry `name` for its governing recipients.
///
/// Without `overwrite` an existing entry is left alone and gpg's refusal is
/// reported as [`PassError::Encryption`].
pub fn insert(store: &ImitatePass, name: &str, content: &str, overwrite: bool) -> Result<()> {
    let name = store.checked_name(name)?;
    let file = store.entry_file(&name);

    let recipients = store.resolver().resolve(&file);
    if recipients.is_empty() {
        store.events().critical(
            "Can not edit",
            "Could not read encryption key to use, .gpg-id file missing or invalid.",
        );
        return Err(PassError::NoRecipients(file));
    }

    if let Some(parent) = file.parent() {
        fs::create_dir_all(parent).map_err(|e| PassError::fs("create", parent, e))?;
    }

    let output = store
        .gpg()
        .encrypt(&file, &recipients, content.as_bytes(), overwrite)?;
    if !output.success() {
        return Err(PassError::Encryption {
            path: file,
            reason: output.stderr_str().trim().to_string(),
        });
    }
    tracing::info!(entry = %name, overwrite, "stored entry");

    if store.settings().uses_git() {
        let git = store.git();
        if !overwrite {
            git.add(&file)?;
        }
        let action = if overwrite { "Edit" } else { "Add" };
        git.commit(&[file.as_path()], &commit_message(action, &name))?;
    }
    Ok(())
}
