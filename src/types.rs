//! Error types shared across the crate

use thiserror::Error;

/// Errors raised below the status-code boundary.
///
/// Handlers never see these directly: the relationship manager and the
/// pipeline fold them into a wire [`crate::status::Status`] before a
/// response is built.
#[derive(Error, Debug)]
pub enum RollcallError {
    #[error("database error: {0}")]
    Database(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("auth error: {0}")]
    Auth(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RollcallError>;
