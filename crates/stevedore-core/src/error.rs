//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Compose file not found: {path}")]
    ComposeNotFound { path: String },

    #[error("Failed to parse compose file: {0}")]
    ComposeParse(#[from] serde_yaml::Error),

    #[error("Invalid service '{service}': {message}")]
    InvalidService { service: String, message: String },

    #[error("Invalid override file {path}: {message}")]
    InvalidOverride { path: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid version: {0}")]
    InvalidVersion(#[from] semver::Error),

    #[error("Missing required field: {field}")]
    MissingField { field: String },
}

impl CoreError {
    pub(crate) fn invalid_service(service: &str, message: impl Into<String>) -> Self {
        Self::InvalidService {
            service: service.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
