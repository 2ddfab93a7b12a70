//! Error types for the yearly archive pipeline.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Index or archive could not be fetched
    #[error("Network error: {0}")]
    Network(String),

    /// Index, archive or record could not be interpreted
    #[error("Parse error: {0}")]
    Parse(String),

    /// Batch insert or post-load procedure failed
    #[error("Load error: {0}")]
    Load(String),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether the error ends the whole run rather than just the current archive.
    pub fn is_fatal_to_run(&self) -> bool {
        !matches!(self, Error::Parse(_) | Error::Load(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Network(e.to_string())
    }
}

impl From<sqlx::Error> for Error {
    fn from(e: sqlx::Error) -> Self {
        Error::Load(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
