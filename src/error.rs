// Startup error types for the whois daemon

use std::path::PathBuf;
use thiserror::Error;

use crate::store::StoreError;

/// Errors that stop the daemon before it starts serving
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to create log file '{path}': {source}")]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to bind listener on {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to open store pool: {0}")]
    StoreOpen(#[from] StoreError),

    #[error("Failed to register signal handler: {0}")]
    Signal(std::io::Error),
}

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = AppError::Bind {
            address: "0.0.0.0:43".to_string(),
            source: std::io::Error::from(std::io::ErrorKind::AddrInUse),
        };
        assert!(err.to_string().starts_with("Failed to bind listener on 0.0.0.0:43"));

        let err = AppError::from(StoreError::Unavailable("no route".to_string()));
        assert_eq!(
            err.to_string(),
            "Failed to open store pool: Store unavailable: no route"
        );
    }
}
