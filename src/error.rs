//! Core error taxonomy shared by the CRUD engine and the scheduler.
//!
//! Both engines fail fast and synchronously: no internal retries, no
//! swallowed errors. Bulk operations are the one place partial failure is
//! modeled explicitly (per-item results); everything else surfaces one of
//! the kinds below. Mapping these kinds onto protocol responses is the
//! caller's job (see `http::error` for the REST mapping).

use crate::db::error::StoreError;
use crate::models::AppointmentStatus;

pub type CoreResult<T> = Result<T, CoreError>;

/// A single field that failed payload validation.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Error kinds surfaced by the CRUD engine and the scheduler.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Entity name is not present in the registry.
    #[error("unknown entity '{0}'")]
    UnknownEntity(String),

    /// Query referenced fields or bounds the descriptor does not allow.
    /// Every violation is collected before failing.
    #[error("invalid query: {}", .issues.join("; "))]
    InvalidQuery { issues: Vec<String> },

    /// Payload validation failed. Lists every offending field so a caller
    /// can fix all issues in one round trip.
    #[error("validation failed for {} field(s)", .fields.len())]
    ValidationError { fields: Vec<FieldError> },

    /// Record absent for the calling tenant. A record owned by another
    /// tenant reports the same error, so existence never leaks.
    #[error("{entity} '{id}' not found")]
    NotFound { entity: String, id: String },

    /// Requested appointment status change is not in the transition table.
    #[error("invalid appointment transition: {from} -> {to}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    /// Requested interval overlaps an existing booked or confirmed
    /// appointment. The caller decides whether to retry elsewhere.
    #[error("requested interval conflicts with an existing appointment")]
    SlotConflict,

    /// Requested interval does not fit any scheduled working window.
    #[error("requested interval falls outside the doctor's working hours")]
    OutsideWorkingHours,

    /// The data store did not answer within its configured deadline.
    #[error("data store timed out during '{operation}'")]
    DependencyTimeout { operation: String },

    /// Unclassified data-access failure, passed through unchanged.
    #[error(transparent)]
    Store(StoreError),
}

impl CoreError {
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn validation(fields: Vec<FieldError>) -> Self {
        Self::ValidationError { fields }
    }

    pub fn invalid_query(issues: Vec<String>) -> Self {
        Self::InvalidQuery { issues }
    }
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            // Store deadlines surface uniformly as dependency timeouts so
            // callers never have to inspect the store layer.
            StoreError::Timeout { ref context, .. } => CoreError::DependencyTimeout {
                operation: context
                    .operation
                    .clone()
                    .unwrap_or_else(|| "store call".to_string()),
            },
            other => CoreError::Store(other),
        }
    }
}
