//! Error types for data store operations.

use std::fmt;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Structured context attached to store errors.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// The operation being performed (e.g. "fetch_page", "book_if_free")
    pub operation: Option<String>,
    /// The entity type involved (e.g. "products", "appointment")
    pub entity: Option<String>,
    /// The entity ID if applicable
    pub entity_id: Option<String>,
    /// Additional details about the error
    pub details: Option<String>,
    /// Whether this error is retryable
    pub retryable: bool,
}

impl ErrorContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: Some(operation.into()),
            ..Default::default()
        }
    }

    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    pub fn with_entity_id(mut self, id: impl ToString) -> Self {
        self.entity_id = Some(id.to_string());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn retryable(mut self) -> Self {
        self.retryable = true;
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(ref op) = self.operation {
            parts.push(format!("operation={}", op));
        }
        if let Some(ref entity) = self.entity {
            parts.push(format!("entity={}", entity));
        }
        if let Some(ref id) = self.entity_id {
            parts.push(format!("id={}", id));
        }
        if let Some(ref details) = self.details {
            parts.push(format!("details={}", details));
        }
        if self.retryable {
            parts.push("retryable=true".to_string());
        }
        write!(f, "[{}]", parts.join(", "))
    }
}

/// Error type for store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Connection pool or database connection failure. Typically transient.
    #[error("connection error: {message} {context}")]
    Connection {
        message: String,
        context: ErrorContext,
    },

    /// Query execution failure.
    #[error("query error: {message} {context}")]
    Query {
        message: String,
        context: ErrorContext,
    },

    /// Requested row was not found.
    #[error("not found: {message} {context}")]
    NotFound {
        message: String,
        context: ErrorContext,
    },

    /// A uniqueness or overlap constraint rejected the write.
    #[error("conflict: {message} {context}")]
    Conflict {
        message: String,
        context: ErrorContext,
    },

    /// Configuration or initialization failure.
    #[error("configuration error: {message} {context}")]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    /// Transaction commit or rollback failure.
    #[error("transaction error: {message} {context}")]
    Transaction {
        message: String,
        context: ErrorContext,
    },

    /// Deadline exceeded waiting for a connection or a query.
    #[error("timeout: {message} {context}")]
    Timeout {
        message: String,
        context: ErrorContext,
    },

    /// Internal/unexpected failure.
    #[error("internal error: {message} {context}")]
    Internal {
        message: String,
        context: ErrorContext,
    },
}

impl StoreError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            context: ErrorContext::default().retryable(),
        }
    }

    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    pub fn query_with_context(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::Query {
            message: message.into(),
            context,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    pub fn not_found_with_context(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::NotFound {
            message: message.into(),
            context,
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    pub fn transaction(message: impl Into<String>) -> Self {
        Self::Transaction {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
            context: ErrorContext::default().retryable(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Whether retrying the operation could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Connection { context, .. }
            | Self::Query { context, .. }
            | Self::Transaction { context, .. }
            | Self::Timeout { context, .. }
            if context.retryable
        )
    }

    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::Connection { context, .. }
            | Self::Query { context, .. }
            | Self::NotFound { context, .. }
            | Self::Conflict { context, .. }
            | Self::Configuration { context, .. }
            | Self::Transaction { context, .. }
            | Self::Timeout { context, .. }
            | Self::Internal { context, .. } => context,
        }
    }

    /// Add or replace the operation name in the error context.
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        match &mut self {
            Self::Connection { context, .. }
            | Self::Query { context, .. }
            | Self::NotFound { context, .. }
            | Self::Conflict { context, .. }
            | Self::Configuration { context, .. }
            | Self::Transaction { context, .. }
            | Self::Timeout { context, .. }
            | Self::Internal { context, .. } => {
                context.operation = Some(operation.into());
            }
        }
        self
    }
}

#[cfg(feature = "postgres-repo")]
impl From<diesel::result::Error> for StoreError {
    fn from(err: diesel::result::Error) -> Self {
        use diesel::result::DatabaseErrorKind;

        match err {
            diesel::result::Error::NotFound => StoreError::not_found("row not found"),
            diesel::result::Error::DatabaseError(kind, info) => {
                let message = info.message().to_string();
                match kind {
                    DatabaseErrorKind::UniqueViolation => StoreError::Conflict {
                        message,
                        context: ErrorContext::default().with_details("unique_violation"),
                    },
                    DatabaseErrorKind::SerializationFailure => StoreError::Conflict {
                        message,
                        context: ErrorContext::default()
                            .with_details("serialization_failure")
                            .retryable(),
                    },
                    other => StoreError::Query {
                        message,
                        context: ErrorContext::default()
                            .with_details(format!("db_error_kind={:?}", other)),
                    },
                }
            }
            other => StoreError::query(other.to_string()),
        }
    }
}

#[cfg(feature = "postgres-repo")]
impl From<diesel::r2d2::PoolError> for StoreError {
    fn from(err: diesel::r2d2::PoolError) -> Self {
        StoreError::Connection {
            message: err.to_string(),
            context: ErrorContext::default().with_details("pool_error").retryable(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_display() {
        let context = ErrorContext::new("fetch")
            .with_entity("products")
            .with_entity_id(7)
            .retryable();
        let rendered = context.to_string();
        assert!(rendered.contains("operation=fetch"));
        assert!(rendered.contains("entity=products"));
        assert!(rendered.contains("id=7"));
        assert!(rendered.contains("retryable=true"));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(StoreError::connection("pool exhausted").is_retryable());
        assert!(StoreError::timeout("deadline exceeded").is_retryable());
        assert!(!StoreError::query("syntax error").is_retryable());
        assert!(!StoreError::conflict("overlap").is_retryable());
    }

    #[test]
    fn test_with_operation_overrides_context() {
        let err = StoreError::query("bad").with_operation("count");
        assert_eq!(err.context().operation.as_deref(), Some("count"));
    }
}
