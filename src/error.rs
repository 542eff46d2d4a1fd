use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PassError {
    #[error("Failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not read encryption key to use, .gpg-id file missing or invalid for {0}")]
    NoRecipients(PathBuf),

    #[error("None of the selected keys have a secret key available")]
    NoSecretKey,

    #[error("Could not decrypt {path}: {reason}")]
    Decryption { path: PathBuf, reason: String },

    #[error("Could not encrypt {path}: {reason}")]
    Encryption { path: PathBuf, reason: String },

    #[error("Refusing sneaky path: {0}")]
    PathUnsafe(String),

    #[error("Empty {0} path")]
    EmptyPath(&'static str),

    #[error("\"{0}\" is not in the password store")]
    NotInStore(String),

    #[error("Cannot {op} \"{path}\" into itself")]
    IntoItself { op: &'static str, path: String },

    #[error("Failed to {op} {path}: {source}")]
    Filesystem {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PassError {
    pub(crate) fn fs(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            op,
            path: path.into(),
            source,
        }
    }
}

impl From<config::ConfigError> for PassError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PassError>;
