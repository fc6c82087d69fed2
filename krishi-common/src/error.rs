//! Shared error type for the krishi crates

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Scan history storage failure
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Root folder or log file could not be created
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Bootstrap config unreadable, unparsable or invalid
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
