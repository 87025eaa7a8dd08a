use axum::http::StatusCode;

use crate::api::rest::response::ApiError;
use crate::domain::error::DomainError;

/// Map a domain error to its HTTP envelope. Internal details stay in the log.
pub fn map_domain_error(e: &DomainError) -> ApiError {
    use DomainError::*;

    let message = e.to_string();
    match e {
        ProfileNotFound { .. } => {
            ApiError::new(StatusCode::NOT_FOUND, "SCHEDULING_PROFILE_NOT_FOUND", message)
        }
        EventNotFound { .. } => {
            ApiError::new(StatusCode::NOT_FOUND, "SCHEDULING_EVENT_NOT_FOUND", message)
        }
        InvalidTimezone { .. } => {
            ApiError::new(StatusCode::BAD_REQUEST, "SCHEDULING_INVALID_TIMEZONE", message)
        }
        InvalidTimeRange | EndInPast => {
            ApiError::new(StatusCode::BAD_REQUEST, "SCHEDULING_INVALID_TIME_RANGE", message)
        }
        ProfileInactive { .. } => {
            ApiError::new(StatusCode::BAD_REQUEST, "SCHEDULING_PROFILE_INACTIVE", message)
        }
        DuplicateProfileName { .. } => {
            ApiError::new(StatusCode::BAD_REQUEST, "SCHEDULING_DUPLICATE_PROFILE", message)
        }
        InvalidCreator { .. } | InvalidUpdater { .. } | InvalidProfileReferences => ApiError::new(
            StatusCode::BAD_REQUEST,
            "SCHEDULING_INVALID_PROFILE_REFERENCE",
            message,
        ),
        Validation { .. } => {
            ApiError::new(StatusCode::BAD_REQUEST, "SCHEDULING_VALIDATION", message)
        }
        ConcurrentModification { .. } => {
            ApiError::new(StatusCode::CONFLICT, "SCHEDULING_CONFLICT", message)
        }
        Unavailable { .. } => {
            tracing::error!(error = %e, "persistence unavailable");
            ApiError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "SCHEDULING_UNAVAILABLE",
                "Service temporarily unavailable",
            )
        }
        Database { .. } => {
            tracing::error!(error = %e, "internal database error");
            ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "SCHEDULING_INTERNAL",
                "An internal error occurred",
            )
        }
    }
}
