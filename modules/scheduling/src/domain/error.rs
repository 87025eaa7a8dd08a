use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

/// Domain-specific errors using thiserror
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("{message}")]
    Validation { message: String },

    #[error("Invalid timezone provided: '{timezone}'")]
    InvalidTimezone { timezone: String },

    #[error("End date/time must be after start date/time")]
    InvalidTimeRange,

    #[error("End date/time cannot be in the past")]
    EndInPast,

    #[error("Profile not found: {id}")]
    ProfileNotFound { id: Uuid },

    #[error("Profile is not active: {id}")]
    ProfileInactive { id: Uuid },

    #[error("Profile with this name already exists: '{name}'")]
    DuplicateProfileName { name: String },

    #[error("Invalid creator profile: {id}")]
    InvalidCreator { id: Uuid },

    #[error("Invalid updater profile: {id}")]
    InvalidUpdater { id: Uuid },

    #[error("One or more assigned profiles are invalid or inactive")]
    InvalidProfileReferences,

    #[error("Event not found: {id}")]
    EventNotFound { id: Uuid },

    #[error("Event {id} was modified concurrently, please retry")]
    ConcurrentModification { id: Uuid },

    #[error("Persistence unavailable: {message}")]
    Unavailable { message: String },

    #[error("Database error: {message}")]
    Database { message: String },
}

impl DomainError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn invalid_timezone(timezone: impl Into<String>) -> Self {
        Self::InvalidTimezone {
            timezone: timezone.into(),
        }
    }

    pub fn invalid_time_range() -> Self {
        Self::InvalidTimeRange
    }

    pub fn end_in_past() -> Self {
        Self::EndInPast
    }

    pub fn profile_not_found(id: Uuid) -> Self {
        Self::ProfileNotFound { id }
    }

    pub fn profile_inactive(id: Uuid) -> Self {
        Self::ProfileInactive { id }
    }

    pub fn duplicate_profile_name(name: impl Into<String>) -> Self {
        Self::DuplicateProfileName { name: name.into() }
    }

    pub fn invalid_creator(id: Uuid) -> Self {
        Self::InvalidCreator { id }
    }

    pub fn invalid_updater(id: Uuid) -> Self {
        Self::InvalidUpdater { id }
    }

    pub fn invalid_profile_references() -> Self {
        Self::InvalidProfileReferences
    }

    pub fn event_not_found(id: Uuid) -> Self {
        Self::EventNotFound { id }
    }

    pub fn concurrent_modification(id: Uuid) -> Self {
        Self::ConcurrentModification { id }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    /// Classify a repository failure: lost connections become `Unavailable`,
    /// everything else is an internal `Database` error.
    pub fn storage(err: anyhow::Error) -> Self {
        let connection_lost = err.chain().any(|cause| {
            matches!(
                cause.downcast_ref::<DbErr>(),
                Some(DbErr::Conn(_)) | Some(DbErr::ConnectionAcquire(_))
            )
        });

        if connection_lost {
            Self::unavailable(format!("{err:#}"))
        } else {
            Self::database(format!("{err:#}"))
        }
    }
}
