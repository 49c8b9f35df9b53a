//! Error type shared across the crate.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The configuration is inconsistent or names something that cannot be
    /// honoured.
    #[error("configuration error: {0}")]
    Config(String),

    /// A file exists but cannot be understood.
    #[error("invalid file {path}: {reason}")]
    InvalidFile { path: PathBuf, reason: String },

    /// Required archive data is absent on the local filesystem.
    #[error("data missing: {0}")]
    DataMissing(String),

    /// A combination of inputs this crate does not support yet.
    #[error("not implemented: {0}")]
    NotImplemented(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    pub(crate) fn config(message: impl Into<String>) -> Error {
        Error::Config(message.into())
    }
}
