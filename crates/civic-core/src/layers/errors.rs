use crate::errors::CivicError;
use crate::records::TransportError;

/// A geometry load that failed. Cloneable so every waiter on a shared load
/// receives it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    #[error("Failed to load geometry '{id}': {source}")]
    Fetch { id: String, source: TransportError },
}

impl CivicError for GeometryError {
    fn error_code(&self) -> &'static str {
        match self {
            GeometryError::Fetch { .. } => "GEOMETRY_FETCH_FAILED",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegionError {
    #[error("Region '{id}' is not configured")]
    NotFound { id: String },
}

impl CivicError for RegionError {
    fn error_code(&self) -> &'static str {
        match self {
            RegionError::NotFound { .. } => "REGION_NOT_FOUND",
        }
    }

    fn is_user_error(&self) -> bool {
        true
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LayerError {
    #[error("Info layer '{id}' is not configured")]
    NotFound { id: String },
}

impl CivicError for LayerError {
    fn error_code(&self) -> &'static str {
        match self {
            LayerError::NotFound { .. } => "LAYER_NOT_FOUND",
        }
    }

    fn is_user_error(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_geometry_error_keeps_source() {
        let err = GeometryError::Fetch {
            id: "glx".to_string(),
            source: TransportError::NotFound {
                location: "glx.geojson".to_string(),
            },
        };
        assert!(err.source().is_some());
        assert!(err.to_string().contains("glx.geojson"));
        assert_eq!(err.error_code(), "GEOMETRY_FETCH_FAILED");
    }

    #[test]
    fn test_not_found_errors_are_user_errors() {
        let region = RegionError::NotFound {
            id: "x".to_string(),
        };
        assert!(region.is_user_error());
        assert_eq!(region.error_code(), "REGION_NOT_FOUND");
        let layer = LayerError::NotFound {
            id: "y".to_string(),
        };
        assert_eq!(layer.to_string(), "Info layer 'y' is not configured");
    }
}
