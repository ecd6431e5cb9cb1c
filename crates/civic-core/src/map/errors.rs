use crate::errors::CivicError;
use crate::layers::{GeometryError, LayerError};

#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error(transparent)]
    Layer(#[from] LayerError),

    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

impl CivicError for MapError {
    fn error_code(&self) -> &'static str {
        match self {
            MapError::Layer(e) => e.error_code(),
            MapError::Geometry(e) => e.error_code(),
        }
    }

    fn is_user_error(&self) -> bool {
        match self {
            MapError::Layer(e) => e.is_user_error(),
            MapError::Geometry(e) => e.is_user_error(),
        }
    }
}
