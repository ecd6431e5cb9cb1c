//! A rendering-free surface: a Web Mercator viewport of fixed pixel size and
//! a layer table, with every call recorded.

use indexmap::IndexMap;
use tracing::trace;

use crate::config::PathStyle;
use crate::geo::projection::{project, unproject};
use crate::geo::{Bounds, LatLng, Point};

use super::surface::{LayerContent, LayerHandle, MapSurface, Pane, Viewport};

/// One recorded surface call.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceOp {
    SetView {
        center: LatLng,
        zoom: u8,
        animate: bool,
    },
    FitBounds(Bounds),
    PanTo {
        center: LatLng,
        animate: bool,
    },
    SetMaxBounds(Option<Bounds>),
    Create {
        layer: LayerHandle,
        pane: Pane,
    },
    Attach(LayerHandle),
    Detach(LayerHandle),
    Destroy(LayerHandle),
    SetStyle(LayerHandle),
    Move(LayerHandle),
    SetRectangleBounds(LayerHandle),
    SetMarkerZoom {
        layer: LayerHandle,
        level: Option<u8>,
    },
    BringToBack(LayerHandle),
}

impl SurfaceOp {
    /// Calls that add, remove or change layers (as opposed to the viewport).
    pub fn is_layer_mutation(&self) -> bool {
        !matches!(
            self,
            SurfaceOp::SetView { .. }
                | SurfaceOp::FitBounds(_)
                | SurfaceOp::PanTo { .. }
                | SurfaceOp::SetMaxBounds(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessLayer {
    pub pane: Pane,
    pub content: LayerContent,
    pub attached: bool,
    pub marker_zoom: Option<u8>,
}

#[derive(Debug)]
pub struct HeadlessSurface {
    width: f64,
    height: f64,
    center: LatLng,
    zoom: u8,
    min_zoom: u8,
    max_zoom: u8,
    max_bounds: Option<Bounds>,
    /// Creation order; `bring_to_back` moves an entry to the front.
    layers: IndexMap<LayerHandle, HeadlessLayer>,
    next_layer: u64,
    ops: Vec<SurfaceOp>,
    moved: bool,
}

impl HeadlessSurface {
    pub fn new(width: u32, height: u32, zoom_range: (u8, u8)) -> Self {
        let (min_zoom, max_zoom) = zoom_range;
        Self {
            width: f64::from(width.max(1)),
            height: f64::from(height.max(1)),
            center: LatLng::new(0.0, 0.0),
            zoom: min_zoom,
            min_zoom,
            max_zoom: max_zoom.max(min_zoom),
            max_bounds: None,
            layers: IndexMap::new(),
            next_layer: 0,
            ops: Vec::new(),
            moved: false,
        }
    }

    pub fn ops(&self) -> &[SurfaceOp] {
        &self.ops
    }

    pub fn clear_ops(&mut self) {
        self.ops.clear();
    }

    pub fn count_ops(&self, predicate: impl Fn(&SurfaceOp) -> bool) -> usize {
        self.ops.iter().filter(|op| predicate(op)).count()
    }

    pub fn layer(&self, handle: LayerHandle) -> Option<&HeadlessLayer> {
        self.layers.get(&handle)
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Attached layers of one pane, bottom first.
    pub fn attached_in(&self, pane: Pane) -> Vec<LayerHandle> {
        self.layers
            .iter()
            .filter(|(_, layer)| layer.pane == pane && layer.attached)
            .map(|(handle, _)| *handle)
            .collect()
    }

    fn record(&mut self, op: SurfaceOp) {
        trace!(event = "core.map.surface_op", op = ?op);
        self.ops.push(op);
    }

    fn clamp_zoom(&self, zoom: u8) -> u8 {
        zoom.clamp(self.min_zoom, self.max_zoom)
    }

    fn move_to(&mut self, center: LatLng, zoom: u8) {
        let center = match &self.max_bounds {
            Some(bounds) => bounds.clamp(center),
            None => center,
        };
        let zoom = self.clamp_zoom(zoom);
        if center != self.center || zoom != self.zoom {
            self.center = center;
            self.zoom = zoom;
            self.moved = true;
        }
    }

    fn visible_bounds(&self, center: LatLng, zoom: u8) -> Bounds {
        let z = f64::from(zoom);
        let c = project(center, z);
        let (hw, hh) = (self.width / 2.0, self.height / 2.0);
        Bounds::from_corners(
            unproject(Point::new(c.x - hw, c.y - hh), z),
            unproject(Point::new(c.x + hw, c.y + hh), z),
        )
    }

    /// Largest zoom at which `bounds` fits the viewport.
    fn zoom_to_fit(&self, bounds: &Bounds) -> u8 {
        (self.min_zoom..=self.max_zoom)
            .rev()
            .find(|zoom| {
                let z = f64::from(*zoom);
                let nw = project(bounds.north_west(), z);
                let se = project(bounds.south_east(), z);
                (se.x - nw.x).abs() <= self.width && (se.y - nw.y).abs() <= self.height
            })
            .unwrap_or(self.min_zoom)
    }

    fn layer_mut(&mut self, handle: LayerHandle) -> Option<&mut HeadlessLayer> {
        self.layers.get_mut(&handle)
    }
}

impl MapSurface for HeadlessSurface {
    fn viewport(&self) -> Viewport {
        Viewport {
            center: self.center,
            zoom: self.zoom,
            bounds: self.visible_bounds(self.center, self.zoom),
        }
    }

    fn zoom_range(&self) -> (u8, u8) {
        (self.min_zoom, self.max_zoom)
    }

    fn set_view(&mut self, center: LatLng, zoom: u8, animate: bool) {
        self.record(SurfaceOp::SetView {
            center,
            zoom,
            animate,
        });
        self.move_to(center, zoom);
    }

    fn fit_bounds(&mut self, bounds: Bounds) {
        self.record(SurfaceOp::FitBounds(bounds));
        let zoom = self.zoom_to_fit(&bounds);
        self.move_to(bounds.center(), zoom);
    }

    fn pan_to(&mut self, center: LatLng, animate: bool) {
        self.record(SurfaceOp::PanTo { center, animate });
        self.move_to(center, self.zoom);
    }

    fn set_max_bounds(&mut self, bounds: Option<Bounds>) {
        self.record(SurfaceOp::SetMaxBounds(bounds));
        self.max_bounds = bounds;
        self.move_to(self.center, self.zoom);
    }

    fn max_bounds(&self) -> Option<Bounds> {
        self.max_bounds
    }

    fn project(&self, latlng: LatLng, zoom: u8) -> Point {
        project(latlng, f64::from(zoom))
    }

    fn unproject(&self, point: Point, zoom: u8) -> LatLng {
        unproject(point, f64::from(zoom))
    }

    fn create_layer(&mut self, pane: Pane, content: LayerContent) -> LayerHandle {
        let layer = LayerHandle(self.next_layer);
        self.next_layer += 1;
        self.layers.insert(
            layer,
            HeadlessLayer {
                pane,
                content,
                attached: false,
                marker_zoom: None,
            },
        );
        self.record(SurfaceOp::Create { layer, pane });
        layer
    }

    fn attach(&mut self, layer: LayerHandle) {
        self.record(SurfaceOp::Attach(layer));
        if let Some(state) = self.layer_mut(layer) {
            state.attached = true;
        }
    }

    fn detach(&mut self, layer: LayerHandle) {
        self.record(SurfaceOp::Detach(layer));
        if let Some(state) = self.layer_mut(layer) {
            state.attached = false;
        }
    }

    fn destroy(&mut self, layer: LayerHandle) {
        self.record(SurfaceOp::Destroy(layer));
        self.layers.shift_remove(&layer);
    }

    fn set_style(&mut self, layer: LayerHandle, style: PathStyle) {
        self.record(SurfaceOp::SetStyle(layer));
        if let Some(state) = self.layer_mut(layer)
            && let LayerContent::Shape { style: current, .. }
            | LayerContent::Rectangle { style: current, .. } = &mut state.content
        {
            *current = style;
        }
    }

    fn move_layer(&mut self, layer: LayerHandle, latlng: LatLng) {
        self.record(SurfaceOp::Move(layer));
        if let Some(state) = self.layer_mut(layer)
            && let LayerContent::Marker { latlng: current, .. }
            | LayerContent::RefMarker { latlng: current } = &mut state.content
        {
            *current = latlng;
        }
    }

    fn set_rectangle_bounds(&mut self, layer: LayerHandle, bounds: Bounds) {
        self.record(SurfaceOp::SetRectangleBounds(layer));
        if let Some(state) = self.layer_mut(layer)
            && let LayerContent::Rectangle { bounds: current, .. } = &mut state.content
        {
            *current = bounds;
        }
    }

    fn set_marker_zoom(&mut self, layer: LayerHandle, level: Option<u8>) {
        self.record(SurfaceOp::SetMarkerZoom { layer, level });
        if let Some(state) = self.layer_mut(layer) {
            state.marker_zoom = level;
        }
    }

    fn bring_to_back(&mut self, layer: LayerHandle) {
        self.record(SurfaceOp::BringToBack(layer));
        if let Some(index) = self.layers.get_index_of(&layer) {
            self.layers.move_index(index, 0);
        }
    }

    fn layer_bounds(&self, layer: LayerHandle) -> Option<Bounds> {
        self.layers.get(&layer)?.content.bounds()
    }

    fn take_move_end(&mut self) -> bool {
        std::mem::take(&mut self.moved)
    }
}
