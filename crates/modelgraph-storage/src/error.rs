//! Storage error types for the model storage abstraction layer.
//!
//! This module defines all error types that can occur during storage operations.

use std::fmt;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The model is not known to the storage backend.
    #[error("Model not found: {model}")]
    ModelNotFound {
        /// The model identity that was requested.
        model: String,
    },

    /// A field (or lookup path segment) does not exist on the model.
    #[error("Field not found: {model}.{field}")]
    FieldNotFound {
        /// The model the field was looked up on.
        model: String,
        /// The missing field name.
        field: String,
    },

    /// A record with the given identifier does not exist.
    #[error("Record not found: {model}/{id}")]
    RecordNotFound {
        /// The model of the missing record.
        model: String,
        /// The identifier of the missing record.
        id: String,
    },

    /// A value could not be stored or compared.
    #[error("Invalid value for {field}: {message}")]
    InvalidValue {
        /// The field that received the value.
        field: String,
        /// Why the value was rejected.
        message: String,
    },

    /// A blocking worker task failed to complete.
    #[error("Storage task failed: {message}")]
    TaskJoin {
        /// Description of the join failure.
        message: String,
    },

    /// Any other backend failure.
    #[error("Backend error: {message}")]
    Backend {
        /// Description of the backend error.
        message: String,
    },
}

impl StorageError {
    /// Creates a new `ModelNotFound` error.
    #[must_use]
    pub fn model_not_found(model: impl Into<String>) -> Self {
        Self::ModelNotFound {
            model: model.into(),
        }
    }

    /// Creates a new `FieldNotFound` error.
    #[must_use]
    pub fn field_not_found(model: impl Into<String>, field: impl Into<String>) -> Self {
        Self::FieldNotFound {
            model: model.into(),
            field: field.into(),
        }
    }

    /// Creates a new `RecordNotFound` error.
    #[must_use]
    pub fn record_not_found(model: impl Into<String>, id: impl Into<String>) -> Self {
        Self::RecordNotFound {
            model: model.into(),
            id: id.into(),
        }
    }

    /// Creates a new `InvalidValue` error.
    #[must_use]
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates a new `Backend` error.
    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a missing record error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::RecordNotFound { .. })
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ModelNotFound { .. } | Self::FieldNotFound { .. } => ErrorCategory::Schema,
            Self::RecordNotFound { .. } => ErrorCategory::NotFound,
            Self::InvalidValue { .. } => ErrorCategory::Validation,
            Self::TaskJoin { .. } | Self::Backend { .. } => ErrorCategory::Infrastructure,
        }
    }
}

/// Categories of storage errors for monitoring and error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// The request referenced a model or field the backend does not know.
    Schema,
    /// The requested record does not exist.
    NotFound,
    /// The supplied data was rejected.
    Validation,
    /// Backend or runtime failure.
    Infrastructure,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Schema => write!(f, "schema"),
            Self::NotFound => write!(f, "not_found"),
            Self::Validation => write!(f, "validation"),
            Self::Infrastructure => write!(f, "infrastructure"),
        }
    }
}
