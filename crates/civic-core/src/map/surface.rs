use std::rc::Rc;

use crate::config::PathStyle;
use crate::geo::{Bounds, GeoJson, LatLng, Point};

/// Compositing panes, bottom to top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Pane {
    Tiles,
    Regions,
    Info,
    Parcels,
    Markers,
    Overlay,
}

/// Opaque id of a layer created on a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerHandle(pub(crate) u64);

/// What a layer draws.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerContent {
    Tiles { url: String },
    /// A record marker, labelled with its reference key.
    Marker { latlng: LatLng, label: String },
    RefMarker { latlng: LatLng },
    Shape { geojson: Rc<GeoJson>, style: PathStyle },
    Rectangle { bounds: Bounds, style: PathStyle },
}

impl LayerContent {
    pub fn bounds(&self) -> Option<Bounds> {
        match self {
            LayerContent::Tiles { .. } => None,
            LayerContent::Marker { latlng, .. } | LayerContent::RefMarker { latlng } => {
                Some(Bounds::from_corners(*latlng, *latlng))
            }
            LayerContent::Shape { geojson, .. } => geojson.bounds(),
            LayerContent::Rectangle { bounds, .. } => Some(*bounds),
        }
    }
}

/// Center, integer zoom and the visible rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub center: LatLng,
    pub zoom: u8,
    pub bounds: Bounds,
}

/// The rendering engine seam.
///
/// Layers are created detached; `attach` makes them visible in their pane.
/// Viewport changes mark a pending move-end that hosts collect with
/// [`MapSurface::take_move_end`].
pub trait MapSurface {
    fn viewport(&self) -> Viewport;
    fn zoom_range(&self) -> (u8, u8);
    fn set_view(&mut self, center: LatLng, zoom: u8, animate: bool);
    fn fit_bounds(&mut self, bounds: Bounds);
    fn pan_to(&mut self, center: LatLng, animate: bool);
    fn set_max_bounds(&mut self, bounds: Option<Bounds>);
    fn max_bounds(&self) -> Option<Bounds>;

    /// World pixel coordinates at `zoom`.
    fn project(&self, latlng: LatLng, zoom: u8) -> Point;
    fn unproject(&self, point: Point, zoom: u8) -> LatLng;

    fn create_layer(&mut self, pane: Pane, content: LayerContent) -> LayerHandle;
    fn attach(&mut self, layer: LayerHandle);
    fn detach(&mut self, layer: LayerHandle);
    fn destroy(&mut self, layer: LayerHandle);
    fn set_style(&mut self, layer: LayerHandle, style: PathStyle);
    fn move_layer(&mut self, layer: LayerHandle, latlng: LatLng);
    fn set_rectangle_bounds(&mut self, layer: LayerHandle, bounds: Bounds);
    /// `Some(level)` switches a marker to its detail rendering.
    fn set_marker_zoom(&mut self, layer: LayerHandle, level: Option<u8>);
    /// Lowest position within its pane.
    fn bring_to_back(&mut self, layer: LayerHandle);
    fn layer_bounds(&self, layer: LayerHandle) -> Option<Bounds>;

    /// True once per batch of viewport changes.
    fn take_move_end(&mut self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pane_order() {
        assert!(Pane::Tiles < Pane::Regions);
        assert!(Pane::Parcels < Pane::Markers);
        assert!(Pane::Markers < Pane::Overlay);
    }

    #[test]
    fn test_content_bounds() {
        let point = LatLng::new(42.39, -71.1);
        let marker = LayerContent::Marker {
            latlng: point,
            label: "C-1".to_string(),
        };
        assert_eq!(marker.bounds().map(|b| b.center()), Some(point));
        assert!(
            LayerContent::Tiles {
                url: String::new()
            }
            .bounds()
            .is_none()
        );
    }
}
