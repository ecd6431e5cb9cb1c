use crate::errors::CivicError;

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("Record payload has no usable 'id'")]
    MissingId,

    #[error("Invalid record payload: {message}")]
    InvalidPayload { message: String },

    #[error("Record '{id}' not found")]
    NotFound { id: String },
}

impl CivicError for RecordError {
    fn error_code(&self) -> &'static str {
        match self {
            RecordError::MissingId => "RECORD_MISSING_ID",
            RecordError::InvalidPayload { .. } => "RECORD_INVALID_PAYLOAD",
            RecordError::NotFound { .. } => "RECORD_NOT_FOUND",
        }
    }

    fn is_user_error(&self) -> bool {
        matches!(self, RecordError::NotFound { .. })
    }
}

/// Failure to obtain data from a backend. Cloneable so a shared load can hand
/// the same failure to every waiter.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransportError {
    #[error("Resource '{location}' not found")]
    NotFound { location: String },

    #[error("Backend unavailable: {message}")]
    Unavailable { message: String },

    #[error("Malformed response from '{location}': {message}")]
    Malformed { location: String, message: String },
}

impl CivicError for TransportError {
    fn error_code(&self) -> &'static str {
        match self {
            TransportError::NotFound { .. } => "TRANSPORT_NOT_FOUND",
            TransportError::Unavailable { .. } => "TRANSPORT_UNAVAILABLE",
            TransportError::Malformed { .. } => "TRANSPORT_MALFORMED",
        }
    }
}
