//! File-backed record transport and geometry source.

use std::io;
use std::path::{Path, PathBuf};

use civic_core::geo::GeoJson;
use civic_core::records::{FetchQuery, Transport, TransportError};
use civic_core::GeometrySource;
use futures::FutureExt;
use futures::future::LocalBoxFuture;
use serde_json::Value;
use tracing::debug;

fn read_error(location: &str, e: io::Error) -> TransportError {
    match e.kind() {
        io::ErrorKind::NotFound => TransportError::NotFound {
            location: location.to_string(),
        },
        _ => TransportError::Unavailable {
            message: format!("{}: {}", location, e),
        },
    }
}

/// Serves the records in one JSON file. The file holds either an array of
/// record objects or an object with a `records` array.
#[derive(Debug, Clone)]
pub struct FileTransport {
    path: PathBuf,
}

impl FileTransport {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Transport for FileTransport {
    async fn fetch_records(&self, query: &FetchQuery) -> Result<Vec<Value>, TransportError> {
        let location = self.path.display().to_string();
        debug!(
            event = "cli.transport.fetch_started",
            path = %location,
            query = %query.to_query_string()
        );

        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| read_error(&location, e))?;
        let malformed = |message: String| TransportError::Malformed {
            location: location.clone(),
            message,
        };

        match serde_json::from_str::<Value>(&text).map_err(|e| malformed(e.to_string()))? {
            Value::Array(records) => Ok(records),
            Value::Object(mut object) => match object.remove("records") {
                Some(Value::Array(records)) => Ok(records),
                _ => Err(malformed("expected a 'records' array".to_string())),
            },
            _ => Err(malformed("expected an array of records".to_string())),
        }
    }
}

/// Resolves region and layer sources as paths under one directory.
#[derive(Debug, Clone)]
pub struct FileGeometrySource {
    dir: PathBuf,
}

impl FileGeometrySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn resolve(&self, location: &str) -> PathBuf {
        let path = Path::new(location);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.dir.join(path)
        }
    }
}

impl GeometrySource for FileGeometrySource {
    fn fetch_geometry(&self, location: &str) -> LocalBoxFuture<'static, Result<GeoJson, TransportError>> {
        if location.contains("://") {
            let message = format!("remote geometry is not supported offline: {}", location);
            return async move { Err(TransportError::Unavailable { message }) }.boxed_local();
        }

        let path = self.resolve(location);
        async move {
            let location = path.display().to_string();
            let text = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| read_error(&location, e))?;
            serde_json::from_str::<Value>(&text)
                .and_then(GeoJson::from_value)
                .map_err(|e| TransportError::Malformed {
                    location,
                    message: e.to_string(),
                })
        }
        .boxed_local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn block_on<F: std::future::Future>(future: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(future)
    }

    #[test]
    fn test_reads_record_array() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("records.json");
        fs::write(&path, r#"[{"id": 1}, {"id": 2}]"#).unwrap();

        let records = block_on(FileTransport::new(&path).fetch_records(&FetchQuery::default())).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_reads_wrapped_records() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("records.json");
        fs::write(&path, r#"{"records": [{"id": "a"}]}"#).unwrap();

        let records = block_on(FileTransport::new(&path).fetch_records(&FetchQuery::default())).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let result = block_on(
            FileTransport::new(dir.path().join("absent.json")).fetch_records(&FetchQuery::default()),
        );
        assert!(matches!(result, Err(TransportError::NotFound { .. })));
    }

    #[test]
    fn test_non_array_is_malformed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("records.json");
        fs::write(&path, "42").unwrap();

        let result = block_on(FileTransport::new(&path).fetch_records(&FetchQuery::default()));
        assert!(matches!(result, Err(TransportError::Malformed { .. })));
    }

    #[test]
    fn test_geometry_resolves_under_dir() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("ward1.geojson"),
            r#"{"type": "Polygon", "coordinates": [[[-71.1, 42.39], [-71.09, 42.39], [-71.09, 42.4], [-71.1, 42.39]]]}"#,
        )
        .unwrap();

        let source = FileGeometrySource::new(dir.path());
        let shape = block_on(source.fetch_geometry("ward1.geojson")).unwrap();
        assert!(shape.bounds().is_some());
    }

    #[test]
    fn test_remote_geometry_unavailable() {
        let source = FileGeometrySource::new(".");
        let result = block_on(source.fetch_geometry("https://example.org/ward1.geojson"));
        assert!(matches!(result, Err(TransportError::Unavailable { .. })));
    }
}
