use crate::errors::CivicError;
use crate::layers::{LayerError, RegionError};
use crate::state::StateError;

#[derive(Debug, thiserror::Error)]
pub enum ExplorerError {
    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Region(#[from] RegionError),

    #[error(transparent)]
    Layer(#[from] LayerError),
}

impl CivicError for ExplorerError {
    fn error_code(&self) -> &'static str {
        match self {
            ExplorerError::State(e) => e.error_code(),
            ExplorerError::Region(e) => e.error_code(),
            ExplorerError::Layer(e) => e.error_code(),
        }
    }

    fn is_user_error(&self) -> bool {
        match self {
            ExplorerError::State(e) => e.is_user_error(),
            ExplorerError::Region(e) => e.is_user_error(),
            ExplorerError::Layer(e) => e.is_user_error(),
        }
    }
}
