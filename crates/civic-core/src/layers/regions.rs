use std::borrow::Cow;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::{debug, info};

use crate::config::RegionConfig;
use crate::emitter::{Emitter, SubscriptionId, Topic};
use crate::geo::{Bounds, GeoJson};

use super::cache::{GeometryCache, GeometryLoad, GeometrySource};
use super::errors::RegionError;

/// A selectable boundary, e.g. a city or ward.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub id: String,
    pub name: Option<String>,
    pub source: String,
    pub color: Option<String>,
}

impl From<&RegionConfig> for Region {
    fn from(config: &RegionConfig) -> Self {
        Self {
            id: config.id.clone(),
            name: config.name.clone(),
            source: config.source.clone(),
            color: config.color.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RegionEvent {
    /// Regions newly part of the selection.
    SelectionLoaded { added: Vec<String> },
    /// Regions no longer selected.
    SelectionRemoved { removed: Vec<String> },
    /// Union of the selected regions' shapes, once known.
    RegionBounds { bounds: Option<Bounds> },
}

impl Topic for RegionEvent {
    fn topic(&self) -> Cow<'_, str> {
        Cow::Borrowed(match self {
            RegionEvent::SelectionLoaded { .. } => "selectionLoaded",
            RegionEvent::SelectionRemoved { .. } => "selectionRemoved",
            RegionEvent::RegionBounds { .. } => "regionBounds",
        })
    }
}

#[derive(Debug, Default)]
pub struct RegionRegistry {
    regions: IndexMap<String, Region>,
    selection: Vec<String>,
    bounds: Option<Bounds>,
    cache: GeometryCache,
    emitter: Emitter<RegionEvent>,
}

impl RegionRegistry {
    pub fn from_config(configs: &[RegionConfig]) -> Self {
        Self {
            regions: configs
                .iter()
                .map(|c| (c.id.clone(), Region::from(c)))
                .collect(),
            ..Default::default()
        }
    }

    pub fn get(&self, id: &str) -> Option<&Region> {
        self.regions.get(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.regions.keys().map(String::as_str)
    }

    pub fn selection(&self) -> &[String] {
        &self.selection
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    pub fn on<F>(&mut self, topic: &str, handler: F) -> SubscriptionId
    where
        F: FnMut(&RegionEvent) + 'static,
    {
        self.emitter.subscribe(topic, handler)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.emitter.unsubscribe(id)
    }

    /// Replace the selection. Unknown ids reject the whole update.
    pub fn set_selection(&mut self, ids: &[String]) -> Result<Vec<RegionEvent>, RegionError> {
        if let Some(unknown) = ids.iter().find(|id| !self.regions.contains_key(*id)) {
            return Err(RegionError::NotFound {
                id: unknown.clone(),
            });
        }

        let mut next: Vec<String> = Vec::with_capacity(ids.len());
        for id in ids {
            if !next.contains(id) {
                next.push(id.clone());
            }
        }

        let removed: Vec<String> = self
            .selection
            .iter()
            .filter(|id| !next.contains(id))
            .cloned()
            .collect();
        let added: Vec<String> = next
            .iter()
            .filter(|id| !self.selection.contains(id))
            .cloned()
            .collect();
        self.selection = next;

        let mut events = Vec::new();
        if !removed.is_empty() {
            events.push(RegionEvent::SelectionRemoved { removed });
        }
        if !added.is_empty() {
            events.push(RegionEvent::SelectionLoaded { added });
        }
        if !events.is_empty() {
            info!(
                event = "core.regions.selection_changed",
                selection = ?self.selection
            );
        }
        self.emitter.emit_all(&events);
        Ok(events)
    }

    /// Start (or join) the load of one region's shape.
    pub fn load_shape<S>(&mut self, id: &str, source: &S) -> Result<GeometryLoad, RegionError>
    where
        S: GeometrySource + ?Sized,
    {
        let region = self.regions.get(id).ok_or_else(|| RegionError::NotFound {
            id: id.to_string(),
        })?;
        Ok(self.cache.load(id, &region.source, source))
    }

    /// The shape if it has already loaded.
    pub fn shape(&self, id: &str) -> Option<Rc<GeoJson>> {
        self.cache.cached(id)
    }

    pub fn set_bounds(&mut self, bounds: Option<Bounds>) -> Vec<RegionEvent> {
        if self.bounds == bounds {
            return Vec::new();
        }
        self.bounds = bounds;
        debug!(event = "core.regions.bounds_updated", bounds = ?bounds);
        let events = vec![RegionEvent::RegionBounds { bounds }];
        self.emitter.emit_all(&events);
        events
    }
}
