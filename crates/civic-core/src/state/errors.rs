use crate::errors::CivicError;

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Hash keys cannot be empty")]
    EmptyKey,
}

impl CivicError for StateError {
    fn error_code(&self) -> &'static str {
        match self {
            StateError::EmptyKey => "STATE_EMPTY_KEY",
        }
    }

    fn is_user_error(&self) -> bool {
        match self {
            StateError::EmptyKey => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_key_error() {
        let err = StateError::EmptyKey;
        assert_eq!(err.to_string(), "Hash keys cannot be empty");
        assert_eq!(err.error_code(), "STATE_EMPTY_KEY");
        assert!(err.is_user_error());
    }
}
