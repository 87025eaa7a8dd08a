use thiserror::Error;

/// Errors that are safe to expose to other modules
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulingError {
    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Service unavailable")]
    Unavailable,

    #[error("Internal error")]
    Internal,
}

impl SchedulingError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

impl From<crate::domain::error::DomainError> for SchedulingError {
    fn from(domain_error: crate::domain::error::DomainError) -> Self {
        use crate::domain::error::DomainError::*;
        let message = domain_error.to_string();
        match domain_error {
            ProfileNotFound { .. } | EventNotFound { .. } => Self::not_found(message),
            ConcurrentModification { .. } => Self::conflict(message),
            Validation { .. }
            | InvalidTimezone { .. }
            | InvalidTimeRange
            | EndInPast
            | ProfileInactive { .. }
            | DuplicateProfileName { .. }
            | InvalidCreator { .. }
            | InvalidUpdater { .. }
            | InvalidProfileReferences => Self::validation(message),
            Unavailable { .. } => Self::Unavailable,
            Database { .. } => Self::Internal,
        }
    }
}
