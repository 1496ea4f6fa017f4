//! Error types shared by the sync engine.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SyncError>;

#[derive(Error, Debug)]
pub enum SyncError {
    /// The login flow did not produce a session token.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// Total-count query, probe transport or page retrieval failed.
    #[error("Fetch failed: {message}")]
    Fetch { message: String },

    /// Store read or write failed.
    #[error("Persistence error: {message}")]
    Persistence { message: String },

    #[error("Notification failed: {message}")]
    Notification { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("A sync cycle is already running")]
    CycleInProgress,
}

impl SyncError {
    pub fn authentication<S: Into<String>>(message: S) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    pub fn fetch<S: Into<String>>(message: S) -> Self {
        Self::Fetch {
            message: message.into(),
        }
    }

    pub fn persistence<S: Into<String>>(message: S) -> Self {
        Self::Persistence {
            message: message.into(),
        }
    }

    pub fn notification<S: Into<String>>(message: S) -> Self {
        Self::Notification {
            message: message.into(),
        }
    }

    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    pub fn is_fetch(&self) -> bool {
        matches!(self, Self::Fetch { .. })
    }

    pub fn is_persistence(&self) -> bool {
        matches!(self, Self::Persistence { .. })
    }
}

impl From<redis::RedisError> for SyncError {
    fn from(err: redis::RedisError) -> Self {
        Self::persistence(format!("redis: {}", err))
    }
}

impl From<sqlx::Error> for SyncError {
    fn from(err: sqlx::Error) -> Self {
        Self::persistence(format!("sqlite: {}", err))
    }
}
