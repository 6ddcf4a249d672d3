use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::types::RowId;

/// Message shown for any file that cannot be parsed
pub const INVALID_FORMAT_MESSAGE: &str = "Invalid CSV/Excel format";
/// Message shown when parsing leaves no usable rows
pub const NO_DATA_MESSAGE: &str = "No valid data found in file";

/// Errors surfaced by the import pipeline
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ImportError {
    #[error("File is too large ({size_bytes} bytes); the limit is {limit_bytes} bytes")]
    FileTooLarge { size_bytes: u64, limit_bytes: u64 },

    #[error("{message}")]
    Parse { message: String },

    #[error("{} row(s) have errors; fix or remove them before importing", rows.len())]
    ValidationBlocked { rows: Vec<RowId> },

    #[error("{count} duplicate row(s) found; confirm again to import anyway")]
    DuplicatesPending { count: usize },

    #[error("{message}")]
    Submit { message: String },

    #[error("Cannot {action} while the session is {state}")]
    InvalidState { action: String, state: String },

    #[error("Invalid column setup: {message}")]
    InvalidDescriptor { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },
}

/// Serializable discriminant of an `ImportError`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ImportErrorType {
    FileTooLarge,
    ParseError,
    ValidationBlocked,
    DuplicateWarning,
    SubmitError,
    InvalidState,
    InvalidDescriptor,
    ConfigError,
}

impl ImportError {
    pub fn parse(message: impl Into<String>) -> Self {
        ImportError::Parse {
            message: message.into(),
        }
    }

    pub fn invalid_format() -> Self {
        ImportError::parse(INVALID_FORMAT_MESSAGE)
    }

    pub fn no_data() -> Self {
        ImportError::parse(NO_DATA_MESSAGE)
    }

    pub fn submit(message: impl Into<String>) -> Self {
        ImportError::Submit {
            message: message.into(),
        }
    }

    pub fn invalid_state(action: &str, state: impl std::fmt::Display) -> Self {
        ImportError::InvalidState {
            action: action.to_string(),
            state: state.to_string(),
        }
    }

    pub fn invalid_descriptor(message: impl Into<String>) -> Self {
        ImportError::InvalidDescriptor {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        ImportError::Config {
            message: message.into(),
        }
    }

    pub fn error_type(&self) -> ImportErrorType {
        match self {
            ImportError::FileTooLarge { .. } => ImportErrorType::FileTooLarge,
            ImportError::Parse { .. } => ImportErrorType::ParseError,
            ImportError::ValidationBlocked { .. } => ImportErrorType::ValidationBlocked,
            ImportError::DuplicatesPending { .. } => ImportErrorType::DuplicateWarning,
            ImportError::Submit { .. } => ImportErrorType::SubmitError,
            ImportError::InvalidState { .. } => ImportErrorType::InvalidState,
            ImportError::InvalidDescriptor { .. } => ImportErrorType::InvalidDescriptor,
            ImportError::Config { .. } => ImportErrorType::ConfigError,
        }
    }

    /// Whether the user can recover without picking another file
    pub fn is_recoverable_in_preview(&self) -> bool {
        matches!(
            self,
            ImportError::ValidationBlocked { .. }
                | ImportError::DuplicatesPending { .. }
                | ImportError::Submit { .. }
        )
    }
}
