//! Error types for the runner.

use std::path::PathBuf;

/// All errors that can occur while loading, running, or exporting.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("failed to read {path}: {source}")]
    DataRead { path: PathBuf, source: csv::Error },

    #[error("bad data in {path}: {msg}")]
    Data { path: PathBuf, msg: String },

    #[error("failed to write {path}: {source}")]
    Export { path: PathBuf, source: csv::Error },

    #[error("portfolio {id}: NAV not appended ({detail})")]
    Discontinuous { id: String, detail: String },

    #[error("no stored NAV for portfolio {0}")]
    NoNav(String),

    #[error(transparent)]
    Sim(#[from] futsim::Error),

    #[error("output error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
