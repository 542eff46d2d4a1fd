//! # Settings
//!
//! Process-wide options are gathered once into [`Settings`] and handed to the
//! store at construction. Nothing in the crate reads them from a global.
//!
//! ## Sources
//!
//! Later sources override earlier ones:
//!
//! 1. Built-in defaults
//! 2. TOML file, by default `<config_dir>/pass-imitate/config.toml`
//! 3. Environment variables prefixed `PASS_IMITATE_` (`PASS_IMITATE_AUTO_PUSH=true`)
//!
//! ```toml
//! store = "/home/alice/.password-store"
//! gpg_executable = "gpg2"
//! auto_pull = true
//! auto_push = true
//! ```
//!
//! Without a configured store, `PASSWORD_STORE_DIR` is used, then
//! `~/.password-store`.

use crate::error::{PassError, Result};
use crate::git;
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "PASS_IMITATE";
const STORE_ENV: &str = "PASSWORD_STORE_DIR";

#[derive(Debug, Default, Deserialize)]
struct RawSettings {
    store: Option<PathBuf>,
    gpg_executable: Option<PathBuf>,
    git_executable: Option<PathBuf>,
    use_git: Option<bool>,
    auto_pull: Option<bool>,
    auto_push: Option<bool>,
    add_gpg_id: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Root of the password store.
    pub store: PathBuf,
    pub gpg_executable: PathBuf,
    pub git_executable: PathBuf,
    /// `None` means "use git when the store is a repository".
    pub use_git: Option<bool>,
    /// Pull before re-encrypting.
    pub auto_pull: bool,
    /// Push after re-encrypting and after move/copy.
    pub auto_push: bool,
    /// Stage a newly created `.gpg-id` on init.
    pub add_gpg_id: bool,
}

impl Settings {
    pub fn new(store: impl Into<PathBuf>) -> Self {
        Self {
            store: store.into(),
            gpg_executable: PathBuf::from("gpg"),
            git_executable: PathBuf::from("git"),
            use_git: None,
            auto_pull: false,
            auto_push: false,
            add_gpg_id: true,
        }
    }

    pub fn with_gpg(mut self, program: impl Into<PathBuf>) -> Self {
        self.gpg_executable = program.into();
        self
    }

    pub fn with_git(mut self, program: impl Into<PathBuf>) -> Self {
        self.git_executable = program.into();
        self
    }

    pub fn with_use_git(mut self, use_git: bool) -> Self {
        self.use_git = Some(use_git);
        self
    }

    pub fn with_auto_pull(mut self, auto_pull: bool) -> Self {
        self.auto_pull = auto_pull;
        self
    }

    pub fn with_auto_push(mut self, auto_push: bool) -> Self {
        self.auto_push = auto_push;
        self
    }

    pub fn with_add_gpg_id(mut self, add_gpg_id: bool) -> Self {
        self.add_gpg_id = add_gpg_id;
        self
    }

    /// Whether mutations are staged and committed.
    pub fn uses_git(&self) -> bool {
        self.use_git
            .unwrap_or_else(|| git::is_repository(&self.store))
    }

    /// Load settings from `file` (or the default location) and the environment.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let file = file.map(Path::to_path_buf).or_else(default_config_file);

        let mut builder = Config::builder();
        if let Some(path) = &file {
            let path = path
                .to_str()
                .ok_or_else(|| PassError::Config("Invalid config path".into()))?;
            builder = builder.add_source(File::new(path, FileFormat::Toml).required(false));
        }
        let raw: RawSettings = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;

        let store = raw
            .store
            .or_else(|| env::var_os(STORE_ENV).map(PathBuf::from))
            .or_else(|| dirs::home_dir().map(|home| home.join(".password-store")))
            .ok_or_else(|| PassError::Config("Could not determine the password store".into()))?;

        let defaults = Self::new(store);
        Ok(Self {
            gpg_executable: raw.gpg_executable.unwrap_or(defaults.gpg_executable.clone()),
            git_executable: raw.git_executable.unwrap_or(defaults.git_executable.clone()),
            use_git: raw.use_git,
            auto_pull: raw.auto_pull.unwrap_or(defaults.auto_pull),
            auto_push: raw.auto_push.unwrap_or(defaults.auto_push),
            add_gpg_id: raw.add_gpg_id.unwrap_or(defaults.add_gpg_id),
            ..defaults
        })
    }
}

fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("pass-imitate").join("config.toml"))
}
