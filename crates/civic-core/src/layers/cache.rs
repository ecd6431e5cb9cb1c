use std::collections::HashMap;
use std::rc::Rc;

use futures::FutureExt;
use futures::future::{LocalBoxFuture, Shared};
use tracing::debug;

use crate::geo::GeoJson;
use crate::records::TransportError;

use super::errors::GeometryError;

/// Backend that resolves a configured source (path or URL) to GeoJSON.
pub trait GeometrySource {
    fn fetch_geometry(&self, location: &str) -> LocalBoxFuture<'static, Result<GeoJson, TransportError>>;
}

/// A load in flight or settled. Clones await the same operation.
pub type GeometryLoad = Shared<LocalBoxFuture<'static, Result<Rc<GeoJson>, GeometryError>>>;

/// Memoised geometry per id.
///
/// Concurrent requests for one id share a single fetch. A settled failure is
/// dropped on the next request so it can be retried.
#[derive(Default)]
pub struct GeometryCache {
    entries: HashMap<String, GeometryLoad>,
}

impl std::fmt::Debug for GeometryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeometryCache")
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl GeometryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load<S>(&mut self, id: &str, location: &str, source: &S) -> GeometryLoad
    where
        S: GeometrySource + ?Sized,
    {
        if let Some(entry) = self.entries.get(id) {
            match entry.peek() {
                Some(Err(_)) => {
                    debug!(event = "core.layers.geometry_evicted", id = id);
                    self.entries.remove(id);
                }
                _ => return entry.clone(),
            }
        }

        debug!(event = "core.layers.geometry_fetch_started", id = id, location = location);
        let owned_id = id.to_string();
        let fetch = source.fetch_geometry(location);
        let load = async move {
            fetch
                .await
                .map(Rc::new)
                .map_err(|source| GeometryError::Fetch {
                    id: owned_id,
                    source,
                })
        }
        .boxed_local()
        .shared();
        self.entries.insert(id.to_string(), load.clone());
        load
    }

    /// The geometry if its load has already succeeded.
    pub fn cached(&self, id: &str) -> Option<Rc<GeoJson>> {
        match self.entries.get(id)?.peek()? {
            Ok(geojson) => Some(Rc::clone(geojson)),
            Err(_) => None,
        }
    }

    /// Known and not yet settled.
    pub fn is_pending(&self, id: &str) -> bool {
        self.entries
            .get(id)
            .is_some_and(|entry| entry.peek().is_none())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
