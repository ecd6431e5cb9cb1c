use std::borrow::Cow;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::debug;

use crate::config::LayerConfig;
use crate::emitter::{Emitter, SubscriptionId, Topic};
use crate::geo::GeoJson;

use super::cache::{GeometryCache, GeometryLoad, GeometrySource};
use super::errors::LayerError;

/// A toggleable informational overlay (transit lines, paths, hydrants).
#[derive(Debug, Clone, PartialEq)]
pub struct InfoLayer {
    pub id: String,
    pub name: Option<String>,
    pub source: String,
    pub color: String,
    pub shown: bool,
}

impl From<&LayerConfig> for InfoLayer {
    fn from(config: &LayerConfig) -> Self {
        Self {
            id: config.id.clone(),
            name: config.name.clone(),
            source: config.source.clone(),
            color: config.color.clone(),
            shown: config.shown,
        }
    }
}

/// `change` on one layer; only the touched attributes are `Some`.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerChange {
    pub id: String,
    pub shown: Option<bool>,
    pub color: Option<String>,
}

impl Topic for LayerChange {
    fn topic(&self) -> Cow<'_, str> {
        Cow::Borrowed("change")
    }
}

#[derive(Debug, Default)]
pub struct InfoLayerRegistry {
    layers: IndexMap<String, InfoLayer>,
    cache: GeometryCache,
    emitter: Emitter<LayerChange>,
}

impl InfoLayerRegistry {
    pub fn from_config(configs: &[LayerConfig]) -> Self {
        Self {
            layers: configs
                .iter()
                .map(|c| (c.id.clone(), InfoLayer::from(c)))
                .collect(),
            ..Default::default()
        }
    }

    pub fn get(&self, id: &str) -> Option<&InfoLayer> {
        self.layers.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &InfoLayer> {
        self.layers.values()
    }

    pub fn shown(&self) -> impl Iterator<Item = &InfoLayer> {
        self.layers.values().filter(|l| l.shown)
    }

    pub fn on_change<F>(&mut self, handler: F) -> SubscriptionId
    where
        F: FnMut(&LayerChange) + 'static,
    {
        self.emitter.subscribe("change", handler)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.emitter.unsubscribe(id)
    }

    /// Changes announcing the layers configured as shown at startup.
    pub fn initial_changes(&self) -> Vec<LayerChange> {
        self.shown()
            .map(|layer| LayerChange {
                id: layer.id.clone(),
                shown: Some(true),
                color: None,
            })
            .collect()
    }

    pub fn set_shown(&mut self, id: &str, shown: bool) -> Result<Option<LayerChange>, LayerError> {
        let layer = self.layer_mut(id)?;
        if layer.shown == shown {
            return Ok(None);
        }
        layer.shown = shown;
        debug!(event = "core.layers.visibility_changed", id = id, shown = shown);
        Ok(Some(self.notify(LayerChange {
            id: id.to_string(),
            shown: Some(shown),
            color: None,
        })))
    }

    pub fn set_color(&mut self, id: &str, color: &str) -> Result<Option<LayerChange>, LayerError> {
        let layer = self.layer_mut(id)?;
        if layer.color == color {
            return Ok(None);
        }
        layer.color = color.to_string();
        debug!(event = "core.layers.color_changed", id = id, color = color);
        Ok(Some(self.notify(LayerChange {
            id: id.to_string(),
            shown: None,
            color: Some(color.to_string()),
        })))
    }

    /// Start (or join) the load of one layer's features.
    pub fn load_features<S>(&mut self, id: &str, source: &S) -> Result<GeometryLoad, LayerError>
    where
        S: GeometrySource + ?Sized,
    {
        let layer = self.layers.get(id).ok_or_else(|| LayerError::NotFound {
            id: id.to_string(),
        })?;
        Ok(self.cache.load(id, &layer.source, source))
    }

    pub fn features(&self, id: &str) -> Option<Rc<GeoJson>> {
        self.cache.cached(id)
    }

    fn layer_mut(&mut self, id: &str) -> Result<&mut InfoLayer, LayerError> {
        self.layers.get_mut(id).ok_or_else(|| LayerError::NotFound {
            id: id.to_string(),
        })
    }

    fn notify(&mut self, change: LayerChange) -> LayerChange {
        self.emitter.emit(&change);
        change
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;

    use super::*;
    use crate::layers::cache::tests::FakeSource;

    fn registry() -> InfoLayerRegistry {
        InfoLayerRegistry::from_config(&[
            LayerConfig {
                id: "glx".to_string(),
                name: Some("Green Line Extension".to_string()),
                source: "glx.geojson".to_string(),
                color: "green".to_string(),
                shown: true,
            },
            LayerConfig {
                id: "path".to_string(),
                name: None,
                source: "community_path.geojson".to_string(),
                color: "orange".to_string(),
                shown: false,
            },
        ])
    }

    #[test]
    fn test_initial_changes_cover_shown_layers() {
        let layers = registry();
        let changes = layers.initial_changes();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].id, "glx");
        assert_eq!(layers.iter().count(), 2);
    }

    #[test]
    fn test_set_shown_and_color_report_attributes() {
        let mut layers = registry();
        let change = layers.set_shown("path", true).unwrap().unwrap();
        assert_eq!(change.shown, Some(true));
        assert!(change.color.is_none());
        assert!(layers.set_shown("path", true).unwrap().is_none());

        let change = layers.set_color("path", "purple").unwrap().unwrap();
        assert_eq!(change.color.as_deref(), Some("purple"));
        assert!(change.shown.is_none());
        assert_eq!(layers.get("path").unwrap().color, "purple");
    }

    #[test]
    fn test_unknown_layer() {
        let mut layers = registry();
        assert!(matches!(
            layers.set_shown("nope", true),
            Err(LayerError::NotFound { .. })
        ));
    }

    #[test]
    fn test_features_load_lazily() {
        let mut layers = registry();
        let source = FakeSource::default();
        assert!(layers.features("glx").is_none());
        block_on(layers.load_features("glx", &source).unwrap()).unwrap();
        assert!(layers.features("glx").is_some());
        assert_eq!(source.fetches.get(), 1);
    }
}
