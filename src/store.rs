use crate::commands::{self, Transfer};
use crate::config::Settings;
use crate::error::{PassError, Result};
use crate::events::{EventSink, StoreEvent};
use crate::git::Git;
use crate::gpg::{Gpg, Recipient};
use crate::paths::{is_safe, relative_to_store, strip_gpg_suffix, with_gpg_suffix};
use crate::process::{Completion, Executor, ProcessOutput, Runner, SystemRunner};
use crate::recipients::RecipientResolver;
use crate::reencrypt::{ReencryptReport, Reencryptor};
use flume::Sender;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Operations a password-store backend offers to a front end.
///
/// Entry names are relative to the store root (absolute paths inside the store
/// are accepted too) and never carry the `.gpg` suffix.
pub trait PassBackend {
    /// `git init` the store root.
    fn git_init(&self) -> Result<ProcessOutput>;
    /// Background `git pull`.
    fn git_pull(&self);
    fn git_pull_blocking(&self) -> Result<ProcessOutput>;
    /// Background `git push`, when git is in use.
    fn git_push(&self);
    fn show(&self, name: &str) -> Result<String>;
    fn show_async(&self, name: &str) -> Result<()>;
    fn insert(&self, name: &str, content: &str, overwrite: bool) -> Result<()>;
    fn remove(&self, name: &str, is_dir: bool) -> Result<()>;
    fn init(&self, path: &str, users: &[Recipient]) -> Result<ReencryptReport>;
    fn move_entry(&self, src: &str, dest: &str, force: bool) -> Result<Transfer>;
    fn copy_entry(&self, src: &str, dest: &str, force: bool) -> Result<Transfer>;
    fn reencrypt(&self, path: &str) -> Result<ReencryptReport>;
}

/// Password store driven directly through gpg and git, without the `pass`
/// script.
pub struct ImitatePass {
    settings: Settings,
    executor: Executor,
    events: EventSink,
}

impl ImitatePass {
    pub fn new(settings: Settings) -> Self {
        Self::with_runner(settings, Arc::new(SystemRunner))
    }

    pub fn with_runner(settings: Settings, runner: Arc<dyn Runner>) -> Self {
        Self {
            settings,
            executor: Executor::new(runner),
            events: EventSink::detached(),
        }
    }

    /// Publish status and progress events on `tx`.
    pub fn with_events(mut self, tx: Sender<StoreEvent>) -> Self {
        self.events = EventSink::new(tx);
        self
    }

    /// Deliver background command results on `tx`.
    pub fn with_completions(mut self, tx: Sender<Completion>) -> Self {
        self.executor = self.executor.with_completions(tx);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn root(&self) -> &Path {
        &self.settings.store
    }

    pub fn gpg(&self) -> Gpg {
        Gpg::new(self.executor.clone(), &self.settings.gpg_executable)
    }

    pub fn git(&self) -> Git {
        Git::new(
            self.executor.clone(),
            &self.settings.git_executable,
            &self.settings.store,
        )
    }

    pub fn resolver(&self) -> RecipientResolver {
        RecipientResolver::new(&self.settings.store)
    }

    pub fn reencryptor(&self) -> Reencryptor {
        Reencryptor::new(&self.settings, &self.executor, self.events.clone())
    }

    pub(crate) fn events(&self) -> &EventSink {
        &self.events
    }

    /// Validate a user-supplied entry name and return it store-relative,
    /// without `.gpg`.
    pub(crate) fn checked_name(&self, name: &str) -> Result<String> {
        let rel = relative_to_store(self.root(), name);
        let rel = strip_gpg_suffix(&rel);
        if rel.trim().is_empty() {
            return Err(PassError::EmptyPath("entry"));
        }
        if !is_safe(rel) || Path::new(rel).is_absolute() {
            return Err(PassError::PathUnsafe(name.to_string()));
        }
        Ok(rel.to_string())
    }

    /// On-disk file of the entry `name` (as returned by `checked_name`).
    pub(crate) fn entry_file(&self, name: &str) -> PathBuf {
        with_gpg_suffix(&self.root().join(name))
    }
}

impl PassBackend for ImitatePass {
    fn git_init(&self) -> Result<ProcessOutput> {
        self.git().init()
    }

    fn git_pull(&self) {
        self.git().pull();
    }

    fn git_pull_blocking(&self) -> Result<ProcessOutput> {
        self.git().pull_blocking()
    }

    fn git_push(&self) {
        if self.settings.uses_git() {
            self.git().push();
        }
    }

    fn show(&self, name: &str) -> Result<String> {
        commands::show(self, name)
    }

    fn show_async(&self, name: &str) -> Result<()> {
        commands::show_async(self, name)
    }

    fn insert(&self, name: &str, content: &str, overwrite: bool) -> Result<()> {
        commands::insert(self, name, content, overwrite)
    }

    fn remove(&self, name: &str, is_dir: bool) -> Result<()> {
        commands::remove(self, name, is_dir)
    }

    fn init(&self, path: &str, users: &[Recipient]) -> Result<ReencryptReport> {
        commands::init(self, path, users)
    }

    fn move_entry(&self, src: &str, dest: &str, force: bool) -> Result<Transfer> {
        commands::move_entry(self, src, dest, force)
    }

    fn copy_entry(&self, src: &str, dest: &str, force: bool) -> Result<Transfer> {
        commands::copy_entry(self, src, dest, force)
    }

    fn reencrypt(&self, path: &str) -> Result<ReencryptReport> {
        let rel = relative_to_store(self.root(), path);
        if !is_safe(&rel) || Path::new(&rel).is_absolute() {
            return Err(PassError::PathUnsafe(path.to_string()));
        }
        self.reencryptor().reconcile(Path::new(&rel))
    }
}
