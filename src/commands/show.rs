use crate::error::Result;
use crate::store::ImitatePass;

/// Decrypt the entry `name` and return its content.
pub fn show(store: &ImitatePass, name: &str) -> Result<String> {
    let name = store.checked_name(name)?;
    store.gpg().decrypt_text(&store.entry_file(&name))
}

/// Decrypt the entry `name` in the background; the output arrives as a
/// completion tagged [`OpTag::Show`](crate::process::OpTag::Show).
pub fn show_async(store: &ImitatePass, name: &str) -> Result<()> {
    let name = store.checked_name(name)?;
    store.gpg().decrypt_async(&store.entry_file(&name));
    Ok(())
}
