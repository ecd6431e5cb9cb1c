use std::rc::Rc;

use futures::future::join_all;

use crate::geo::{Bounds, GeoJson};
use crate::layers::{GeometryError, GeometryLoad};

/// A region focus request whose shapes may still be loading.
///
/// Produced by [`super::MapView::begin_region_focus`]. Already cached shapes
/// are settled loads, so resolving a fully cached request never suspends.
pub struct RegionFocus {
    pub(crate) generation: u64,
    pub(crate) loads: Vec<(String, GeometryLoad)>,
}

impl std::fmt::Debug for RegionFocus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegionFocus")
            .field("generation", &self.generation)
            .field("ids", &self.ids().collect::<Vec<_>>())
            .finish()
    }
}

impl RegionFocus {
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.loads.iter().map(|(id, _)| id.as_str())
    }

    /// True when every shape of the request has settled.
    pub fn is_ready(&self) -> bool {
        self.loads.iter().all(|(_, load)| load.peek().is_some())
    }

    /// Wait for every load of the request.
    pub async fn resolve(self) -> ResolvedRegions {
        let (ids, loads): (Vec<String>, Vec<GeometryLoad>) = self.loads.into_iter().unzip();
        let results = join_all(loads).await;

        let mut shapes = Vec::new();
        let mut failed = Vec::new();
        for (id, result) in ids.into_iter().zip(results) {
            match result {
                Ok(shape) => shapes.push((id, shape)),
                Err(e) => failed.push((id, e)),
            }
        }
        ResolvedRegions {
            generation: self.generation,
            shapes,
            failed,
        }
    }
}

/// Settled outcome of a [`RegionFocus`].
#[derive(Debug)]
pub struct ResolvedRegions {
    pub(crate) generation: u64,
    pub shapes: Vec<(String, Rc<GeoJson>)>,
    pub failed: Vec<(String, GeometryError)>,
}

impl ResolvedRegions {
    /// Union of the loaded shapes' extents.
    pub fn union(&self) -> Option<Bounds> {
        self.shapes
            .iter()
            .filter_map(|(_, shape)| shape.bounds())
            .reduce(|a, b| a.union(&b))
    }
}
