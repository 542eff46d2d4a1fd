//! # pass-imitate
//!
//! A password store in the layout of [pass](https://www.passwordstore.org/),
//! driven directly through the `gpg` and `git` command-line tools instead of the
//! `pass` shell script.
//!
//! ## Store Layout
//!
//! ```text
//! ~/.password-store/
//! ├── .gpg-id              recipients for everything below, one per line
//! ├── .git/                optional history
//! ├── email.gpg            one encrypted entry
//! └── work/
//!     ├── .gpg-id          overrides the root list for work/
//!     └── vpn.gpg
//! ```
//!
//! Every entry is a gpg-encrypted file ending in `.gpg`. The recipients of an
//! entry come from the nearest `.gpg-id` found by walking up from the entry's
//! directory, stopping at the store root.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pass_imitate::{ImitatePass, PassBackend, Recipient, Settings};
//!
//! # fn main() -> pass_imitate::Result<()> {
//! let settings = Settings::load(None)?;
//! let store = ImitatePass::new(settings);
//!
//! store.init("", &[Recipient::new("0123456789ABCDEF").with_secret(true)])?;
//! store.insert("email/personal", "hunter2\nuser: alice\n", false)?;
//! println!("{}", store.show("email/personal")?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Re-encryption
//!
//! Changing a `.gpg-id` (through [`PassBackend::init`]) or moving an entry under
//! another `.gpg-id` triggers a re-encryption pass. Each entry whose actual key
//! ids differ from the encryption subkeys of its recipients is decrypted and
//! encrypted again. Entries that already match are not touched. See
//! [`reencrypt`] for the failure rules.
//!
//! ## Events and Background Work
//!
//! Front ends observe the store through two optional channels:
//!
//! - [`ImitatePass::with_events`] receives [`StoreEvent`]s: status lines,
//!   critical errors and re-encryption progress
//! - [`ImitatePass::with_completions`] receives a [`Completion`] for every
//!   fire-and-forget command (`git push`, background `git pull`, `show_async`)
//!
//! Without them the store still logs through `tracing`.
//!
//! ## Module Overview
//!
//! - [`store`] - [`ImitatePass`] and the [`PassBackend`] capability trait
//! - [`commands`] - insert, show, remove, init, move and copy
//! - [`reencrypt`] - drift detection and re-encryption
//! - [`recipients`] - `.gpg-id` lookup, parsing and writing
//! - [`gpg`] / [`git`] - command-line wrappers
//! - [`process`] - process execution, blocking and fire-and-forget
//! - [`paths`] - entry name helpers and path safety
//! - [`config`] - [`Settings`] and their loading
//! - [`events`] - [`StoreEvent`] and its sink
//! - [`error`] - [`PassError`]
//!
//! ## Configuration
//!
//! [`Settings::load`] reads an optional TOML file, then `PASS_IMITATE_*`
//! environment variables. The store root falls back to `PASSWORD_STORE_DIR` and
//! finally `~/.password-store`.
//!
//! ```toml
//! store = "/home/alice/.password-store"
//! gpg_executable = "gpg2"
//! use_git = true
//! auto_push = true
//! ```
//!
//! ## Security Considerations
//!
//! - Plaintext only passes through gpg's stdin and stdout; it is never written
//!   to disk by this crate.
//! - Entry names containing `..` path components are rejected before any file
//!   is touched.
//! - A `.gpg-id` listing no key with a secret part is still written, but the
//!   caller is warned: nothing encrypted for it could be read back locally.

pub mod commands;
pub mod config;
pub mod error;
pub mod events;
pub mod git;
pub mod gpg;
pub mod paths;
pub mod process;
pub mod recipients;
pub mod reencrypt;
pub mod store;

pub use commands::{Transfer, TransferMode};
pub use config::Settings;
pub use error::{PassError, Result};
pub use events::{EventSink, StoreEvent};
pub use gpg::Recipient;
pub use process::{Completion, OpTag, ProcessOutput, Runner, SystemRunner};
pub use reencrypt::ReencryptReport;
pub use store::{ImitatePass, PassBackend};
