use crate::error::{PassError, Result};
use crate::git::commit_message;
use crate::paths::{remove_one_trailing_slash, with_gpg_suffix};
use crate::store::ImitatePass;
use std::fs;
use std::path::Path;

/// Remove the entry or directory `name`.
///
/// With git in use the removal is a tracked `git rm` followed by a commit;
/// otherwise the files are deleted directly.
pub fn remove(store: &ImitatePass, name: &str, is_dir: bool) -> Result<()> {
    let name = store.checked_name(name)?;
    let base = store.root().join(remove_one_trailing_slash(&name));
    let target = if is_dir { base } else { with_gpg_suffix(&base) };

    if store.settings().uses_git() {
        let git = store.git();
        git.rm(&target, is_dir)?;
        git.commit(&[target.as_path()], &commit_message("Remove", &name))?;
    } else if is_dir {
        remove_tree(&target)?;
    } else {
        fs::remove_file(&target).map_err(|e| PassError::fs("remove", &target, e))?;
    }
    tracing::info!(entry = %name, is_dir, "removed");
    Ok(())
}

/// Delete `dir` and everything below it, children first. A missing directory
/// is not an error.
pub(crate) fn remove_tree(dir: &Path) -> Result<()> {
    if !dir.exists() {
        return Ok(());
    }
    for item in fs::read_dir(dir).map_err(|e| PassError::fs("read", dir, e))? {
        let item = item?;
        let path = item.path();
        if item.file_type()?.is_dir() {
            remove_tree(&path)?;
        } else {
            fs::remove_file(&path).map_err(|e| PassError::fs("remove", &path, e))?;
        }
    }
    fs::remove_dir(dir).map_err(|e| PassError::fs("remove", dir, e))
}
