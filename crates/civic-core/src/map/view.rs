use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::{debug, info, warn};

use crate::geo::{Bounds, GeoJson, LatLng, box_string_to_bounds};
use crate::layers::{GeometrySource, InfoLayerRegistry, LayerChange, RegionEvent, RegionRegistry};
use crate::records::{CollectionEvent, Record, RecordChange, RecordCollection, RecordId};
use crate::reference::{RefLocationChange, ReferenceLocation, SetMethod};
use crate::state::{AppState, HashPatch, HashValue, StateError, StateEvent};

use super::errors::MapError;
use super::focus::{RegionFocus, ResolvedRegions};
use super::markers::{MarkerEntry, MarkerInput, MarkerState, OverlayEntry, ParcelEntry, next_state};
use super::settings::MapSettings;
use super::surface::{LayerContent, LayerHandle, MapSurface, Pane};

/// Decimal places kept for `lat`/`lng` in the hash.
pub const HASH_COORD_PRECISION: i32 = 6;

/// Half-size in degrees of the box fitted around the reference marker.
const REF_ZOOM_RADIUS: f64 = 0.0005;

/// Which zoom buttons are enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoomControls {
    pub can_zoom_in: bool,
    pub can_zoom_out: bool,
}

/// Keeps a [`MapSurface`] consistent with the records, registries and
/// reference location it is fed.
///
/// The view owns every layer it creates. Markers and parcel overlays are
/// keyed by record reference and owned by the record that created them. When
/// records share a reference, the marker passes to the next one once its owner
/// leaves the collection.
pub struct MapView<S: MapSurface> {
    surface: S,
    settings: MapSettings,
    tiles: LayerHandle,
    markers: IndexMap<String, MarkerEntry>,
    parcels: HashMap<String, ParcelEntry>,
    regions: IndexMap<String, LayerHandle>,
    info_layers: HashMap<String, OverlayEntry>,
    ref_marker: Option<LayerHandle>,
    filter_rect: Option<LayerHandle>,
    focus_generation: u64,
}

impl<S: MapSurface> std::fmt::Debug for MapView<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapView")
            .field("markers", &self.markers.len())
            .field("parcels", &self.parcels.len())
            .field("regions", &self.regions.len())
            .field("info_layers", &self.info_layers.len())
            .finish()
    }
}

impl<S: MapSurface> MapView<S> {
    /// Set up the viewport from `lat`/`lng`/`zoom`, falling back to the
    /// configured defaults when they are absent or malformed.
    pub fn new(mut surface: S, settings: MapSettings, state: &AppState) -> Self {
        let center = match (state.get_float("lat"), state.get_float("lng")) {
            (Some(lat), Some(lng)) if LatLng::new(lat, lng).is_valid() => LatLng::new(lat, lng),
            _ => settings.default_center,
        };
        let zoom = state
            .get_int("zoom")
            .and_then(|z| u8::try_from(z).ok())
            .unwrap_or(settings.default_zoom);

        surface.set_max_bounds(Some(settings.bounds));
        surface.set_view(center, zoom, false);
        let tiles = surface.create_layer(
            Pane::Tiles,
            LayerContent::Tiles {
                url: settings.tiles_url.clone(),
            },
        );
        surface.attach(tiles);
        // The initial view is not a user move.
        surface.take_move_end();

        info!(
            event = "core.map.view_created",
            lat = center.lat,
            lng = center.lng,
            zoom = surface.viewport().zoom
        );

        Self {
            surface,
            settings,
            tiles,
            markers: IndexMap::new(),
            parcels: HashMap::new(),
            regions: IndexMap::new(),
            info_layers: HashMap::new(),
            ref_marker: None,
            filter_rect: None,
            focus_generation: 0,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn settings(&self) -> &MapSettings {
        &self.settings
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn has_marker(&self, reference: &str) -> bool {
        self.markers.contains_key(reference)
    }

    pub fn marker_state(&self, reference: &str) -> Option<MarkerState> {
        self.markers.get(reference).map(|m| m.state)
    }

    pub fn is_marker_attached(&self, reference: &str) -> bool {
        self.markers.get(reference).is_some_and(|m| m.attached)
    }

    /// `(reference, state, attached)` for every marker, in creation order.
    pub fn markers(&self) -> impl Iterator<Item = (&str, MarkerState, bool)> {
        self.markers
            .iter()
            .map(|(reference, m)| (reference.as_str(), m.state, m.attached))
    }

    pub fn parcel_count(&self) -> usize {
        self.parcels.len()
    }

    pub fn parcel_visible(&self, reference: &str) -> bool {
        self.parcels.get(reference).is_some_and(|p| p.attached)
    }

    pub fn region_layer_ids(&self) -> impl Iterator<Item = &str> {
        self.regions.keys().map(String::as_str)
    }

    pub fn info_layer_visible(&self, id: &str) -> bool {
        self.info_layers.get(id).is_some_and(|l| l.attached)
    }

    pub fn has_reference_marker(&self) -> bool {
        self.ref_marker.is_some()
    }

    pub fn filter_rectangle(&self) -> Option<Bounds> {
        self.filter_rect.and_then(|rect| self.surface.layer_bounds(rect))
    }

    // --- Records -------------------------------------------------------

    /// Route one collection event. `records` must already reflect it.
    pub fn apply_collection_event(&mut self, event: &CollectionEvent, records: &RecordCollection) {
        match event {
            CollectionEvent::Added { id } => {
                if let Some(record) = records.get(id) {
                    self.record_added(record);
                }
            }
            CollectionEvent::Removed { record } => {
                if let Some(vacated) = self.record_removed(record) {
                    self.adopt(&vacated, records);
                }
            }
            CollectionEvent::Changed { id, change } => {
                if let Some(record) = records.get(id) {
                    let previous = self.entry_key(record);
                    self.record_changed(record, change);
                    if let Some(key) = previous
                        && key != record.reference()
                    {
                        self.adopt(&key, records);
                    }
                }
            }
            CollectionEvent::Reset => self.records_reset(records.iter()),
            CollectionEvent::Fetching
            | CollectionEvent::FetchingComplete { .. }
            | CollectionEvent::FetchingFailed { .. }
            | CollectionEvent::Sort { .. } => {}
        }
    }

    /// Create the record's marker. Unmapped records and references that
    /// already have a marker are left alone.
    pub fn record_added(&mut self, record: &Record) {
        let Some(latlng) = record.location else {
            debug!(event = "core.map.marker_skipped", id = %record.id, reason = "unmapped");
            return;
        };
        let reference = record.reference();
        if self.markers.contains_key(reference) {
            debug!(event = "core.map.marker_skipped", reference = reference, reason = "exists");
            return;
        }

        let layer = self.surface.create_layer(
            Pane::Markers,
            LayerContent::Marker {
                latlng,
                label: reference.to_string(),
            },
        );
        let attached = !record.flags.excluded;
        if attached {
            self.surface.attach(layer);
        }
        let viewport = self.surface.viewport();
        let state = next_state(
            &viewport,
            self.settings.zoom_threshold,
            latlng,
            MarkerState::Unzoomed,
        );
        if let MarkerState::Zoomed(level) = state {
            self.surface.set_marker_zoom(layer, Some(level));
        }

        self.markers.insert(
            reference.to_string(),
            MarkerEntry {
                record_id: record.id.clone(),
                layer,
                latlng,
                state,
                attached,
            },
        );
        self.sync_parcel(record);
    }

    /// Drop the layers `record` owns. Returns the reference they were kept
    /// under, so another record sharing it can take over.
    pub fn record_removed(&mut self, record: &Record) -> Option<String> {
        let reference = self.entry_key(record)?;
        if !self.drop_owned_layers(&reference, &record.id) {
            return None;
        }
        debug!(event = "core.map.marker_removed", reference = %reference);
        Some(reference)
    }

    /// Rebuild every marker from the collection.
    pub fn records_reset<'a>(&mut self, records: impl Iterator<Item = &'a Record>) {
        let references: Vec<String> = self.markers.keys().cloned().collect();
        for reference in references {
            self.drop_record_layers(&reference);
        }
        for (_, parcel) in self.parcels.drain() {
            self.surface.destroy(parcel.layer);
        }
        for record in records {
            self.record_added(record);
        }
        debug!(event = "core.map.markers_reset", count = self.markers.len());
    }

    pub fn record_changed(&mut self, record: &Record, change: &RecordChange) {
        if let Some(key) = self.entry_key(record)
            && key != record.reference()
        {
            // The reference is the marker label; rebuild under the new key.
            self.drop_owned_layers(&key, &record.id);
            self.record_added(record);
            self.sync_parcel(record);
            return;
        }

        if change.touches("location") {
            self.relocate(record);
        }

        if let Some(excluded) = change.excluded
            && let Some(entry) = self.markers.get_mut(record.reference())
            && entry.record_id == record.id
            && entry.attached == excluded
        {
            if excluded {
                self.surface.detach(entry.layer);
            } else {
                self.surface.attach(entry.layer);
            }
            entry.attached = !excluded;
        }

        if change.touches("parcel")
            && self.owns_parcel(record)
            && let Some(stale) = self.parcels.remove(record.reference())
        {
            self.surface.destroy(stale.layer);
        }

        if change.selected.is_some()
            || change.hovered.is_some()
            || change.excluded.is_some()
            || change.touches("parcel")
        {
            self.sync_parcel(record);
        }
    }

    /// Forward pointer input to the record. The map itself is only updated
    /// when the resulting change events come back.
    pub fn on_marker_input(
        &self,
        reference: &str,
        input: MarkerInput,
        records: &mut RecordCollection,
    ) -> Vec<CollectionEvent> {
        let Some(entry) = self.markers.get(reference) else {
            debug!(event = "core.map.input_ignored", reference = reference);
            return Vec::new();
        };
        let id = entry.record_id.clone();
        match input {
            MarkerInput::MouseOver => records.set_hovered(&id, true),
            MarkerInput::MouseOut => records.set_hovered(&id, false),
            MarkerInput::Click => records.set_selection(&[id]),
            MarkerInput::PopupClose => records.remove_from_selection(&id),
        }
    }

    fn relocate(&mut self, record: &Record) {
        let reference = record.reference();
        match (record.location, self.markers.get_mut(reference)) {
            (_, Some(entry)) if entry.record_id != record.id => {}
            (Some(latlng), Some(entry)) => {
                entry.latlng = latlng;
                self.surface.move_layer(entry.layer, latlng);
                let viewport = self.surface.viewport();
                let state = next_state(&viewport, self.settings.zoom_threshold, latlng, entry.state);
                if state != entry.state {
                    entry.state = state;
                    self.surface.set_marker_zoom(entry.layer, zoom_level(state));
                }
            }
            (Some(_), None) => self.record_added(record),
            (None, Some(_)) => {
                if let Some(entry) = self.markers.shift_remove(reference) {
                    self.surface.destroy(entry.layer);
                }
            }
            (None, None) => {}
        }
    }

    /// Show the parcel while the record is selected or hovered, has a parcel
    /// and is not excluded. Hidden overlays are kept for a cheap re-show.
    fn sync_parcel(&mut self, record: &Record) {
        let flags = record.flags;
        let wanted = (flags.selected || flags.hovered) && !flags.excluded;
        let reference = record.reference();
        if self.parcels.contains_key(reference) && !self.owns_parcel(record) {
            return;
        }

        match (wanted, self.parcels.get_mut(reference)) {
            (true, Some(parcel)) if !parcel.attached => {
                self.surface.attach(parcel.layer);
                parcel.attached = true;
            }
            (true, None) => {
                let Some(geometry) = &record.parcel else {
                    return;
                };
                let layer = self.surface.create_layer(
                    Pane::Parcels,
                    LayerContent::Shape {
                        geojson: Rc::new(GeoJson::Geometry(geometry.clone())),
                        style: self.settings.parcel_style.clone(),
                    },
                );
                self.surface.attach(layer);
                self.parcels.insert(
                    reference.to_string(),
                    ParcelEntry {
                        record_id: record.id.clone(),
                        layer,
                        attached: true,
                    },
                );
            }
            (false, Some(parcel)) if parcel.attached => {
                self.surface.detach(parcel.layer);
                parcel.attached = false;
            }
            _ => {}
        }
    }

    /// Key of the marker or parcel owned by `record`. Differs from its
    /// reference after the case number changed.
    fn entry_key(&self, record: &Record) -> Option<String> {
        let owned_marker = self
            .markers
            .iter()
            .find(|(_, m)| m.record_id == record.id)
            .map(|(key, _)| key.clone());
        owned_marker.or_else(|| {
            self.parcels
                .iter()
                .find(|(_, p)| p.record_id == record.id)
                .map(|(key, _)| key.clone())
        })
    }

    fn owns_parcel(&self, record: &Record) -> bool {
        self.parcels
            .get(record.reference())
            .is_some_and(|p| p.record_id == record.id)
    }

    /// Destroy the layers under `reference` owned by `id`.
    fn drop_owned_layers(&mut self, reference: &str, id: &RecordId) -> bool {
        let mut dropped = false;
        if self.markers.get(reference).is_some_and(|m| &m.record_id == id)
            && let Some(entry) = self.markers.shift_remove(reference)
        {
            self.surface.destroy(entry.layer);
            dropped = true;
        }
        if self.parcels.get(reference).is_some_and(|p| &p.record_id == id)
            && let Some(parcel) = self.parcels.remove(reference)
        {
            self.surface.destroy(parcel.layer);
            dropped = true;
        }
        dropped
    }

    /// Give a vacated reference to the next record that shares it.
    fn adopt(&mut self, reference: &str, records: &RecordCollection) {
        if let Some(heir) = records.iter().find(|r| r.reference() == reference) {
            debug!(event = "core.map.marker_adopted", reference = reference, id = %heir.id);
            self.record_added(heir);
            self.sync_parcel(heir);
        }
    }

    fn drop_record_layers(&mut self, reference: &str) {
        if let Some(entry) = self.markers.shift_remove(reference) {
            self.surface.destroy(entry.layer);
        }
        if let Some(parcel) = self.parcels.remove(reference) {
            self.surface.destroy(parcel.layer);
        }
    }

    // --- Viewport ------------------------------------------------------

    /// Re-evaluate every marker against the current viewport.
    pub fn update_markers(&mut self) {
        let viewport = self.surface.viewport();
        let threshold = self.settings.zoom_threshold;
        for entry in self.markers.values_mut() {
            let state = next_state(&viewport, threshold, entry.latlng, entry.state);
            if state != entry.state {
                entry.state = state;
                self.surface.set_marker_zoom(entry.layer, zoom_level(state));
            }
        }
    }

    /// Handle the end of a viewport move: update markers, then write the
    /// viewport to the hash silently when it differs from the stored one.
    pub fn on_move_end(&mut self, state: &mut AppState) -> Result<Vec<StateEvent>, StateError> {
        self.update_markers();

        let viewport = self.surface.viewport();
        let center = viewport.center.rounded(HASH_COORD_PRECISION);
        let mut patch = HashPatch::new();
        if state.get_float("lat") != Some(center.lat) {
            patch.insert("lat", Some(HashValue::from(center.lat)));
        }
        if state.get_float("lng") != Some(center.lng) {
            patch.insert("lng", Some(HashValue::from(center.lng)));
        }
        if state.get_int("zoom") != Some(i64::from(viewport.zoom)) {
            patch.insert("zoom", Some(HashValue::from(viewport.zoom)));
        }
        if patch.is_empty() {
            return Ok(Vec::new());
        }
        debug!(event = "core.map.viewport_persisted", keys = patch.len());
        state.extend_hash(patch, true)
    }

    /// Follow a navigation-driven change of `lat`/`lng`/`zoom`. Returns
    /// false when the view already shows the stored values.
    pub fn apply_state_viewport(&mut self, state: &AppState) -> bool {
        let viewport = self.surface.viewport();
        let center = match (state.get_float("lat"), state.get_float("lng")) {
            (Some(lat), Some(lng)) if LatLng::new(lat, lng).is_valid() => LatLng::new(lat, lng),
            _ => viewport.center,
        };
        let zoom = state
            .get_int("zoom")
            .and_then(|z| u8::try_from(z).ok())
            .unwrap_or(viewport.zoom);

        if center.rounded(HASH_COORD_PRECISION) == viewport.center.rounded(HASH_COORD_PRECISION)
            && zoom == viewport.zoom
        {
            return false;
        }
        self.surface.set_view(center, zoom, false);
        true
    }

    /// Bring records into view: one record is centred, several are fitted.
    pub fn on_focus(&mut self, records: &[&Record], zoom: bool) {
        let points: Vec<LatLng> = records.iter().filter_map(|r| r.location).collect();
        match points.as_slice() {
            [] => {}
            [point] => {
                let level = if zoom {
                    self.settings.zoom_threshold
                } else {
                    self.surface.viewport().zoom
                };
                self.surface.set_view(*point, level, true);
            }
            _ => {
                if let Some(bounds) = Bounds::from_points(points.iter().copied()) {
                    self.surface.fit_bounds(bounds);
                }
            }
        }
    }

    /// Pan so a popup of the given pixel height opening at `anchor` is
    /// fully visible.
    pub fn on_popup_opened(&mut self, anchor: LatLng, popup_height_px: f64) {
        let zoom = self.surface.viewport().zoom;
        let mut point = self.surface.project(anchor, zoom);
        point.y -= popup_height_px / 2.0;
        let target = self.surface.unproject(point, zoom);
        self.surface.pan_to(target, true);
    }

    pub fn zoom_in(&mut self) {
        let viewport = self.surface.viewport();
        if self.zoom_controls().can_zoom_in {
            self.surface.set_view(viewport.center, viewport.zoom + 1, true);
        }
    }

    pub fn zoom_out(&mut self) {
        let viewport = self.surface.viewport();
        if self.zoom_controls().can_zoom_out {
            self.surface.set_view(viewport.center, viewport.zoom - 1, true);
        }
    }

    pub fn zoom_controls(&self) -> ZoomControls {
        let zoom = self.surface.viewport().zoom;
        let (min, max) = self.surface.zoom_range();
        ZoomControls {
            can_zoom_in: zoom < max,
            can_zoom_out: zoom > min,
        }
    }

    /// Fit the configured bounds.
    pub fn reset_bounds(&mut self) {
        self.surface.fit_bounds(self.settings.bounds);
    }

    /// Zoom closely onto the reference marker, if one is shown.
    pub fn zoom_to_ref_location(&mut self) -> bool {
        let Some(bounds) = self
            .ref_marker
            .and_then(|marker| self.surface.layer_bounds(marker))
        else {
            return false;
        };
        let center = bounds.center();
        self.surface.fit_bounds(Bounds::from_corners(
            LatLng::new(center.lat - REF_ZOOM_RADIUS, center.lng - REF_ZOOM_RADIUS),
            LatLng::new(center.lat + REF_ZOOM_RADIUS, center.lng + REF_ZOOM_RADIUS),
        ));
        true
    }

    // --- Reference location and filter box ------------------------------

    /// Treat a double click as "my location is here".
    pub fn on_dbl_click(
        &self,
        latlng: LatLng,
        reference: &mut dyn ReferenceLocation,
    ) -> RefLocationChange {
        reference.set_from_lat_lng(latlng.lat, latlng.lng)
    }

    /// Show the reference marker unless the location is automatic, and
    /// recenter on it without animation.
    pub fn place_reference_marker(&mut self, reference: &dyn ReferenceLocation) {
        if reference.set_method() == SetMethod::Auto {
            if let Some(marker) = self.ref_marker.take() {
                self.surface.destroy(marker);
                debug!(event = "core.map.ref_marker_removed");
            }
            return;
        }

        let point = reference.point();
        let marker = match self.ref_marker {
            Some(marker) => {
                self.surface.move_layer(marker, point);
                marker
            }
            None => {
                let marker = self
                    .surface
                    .create_layer(Pane::Markers, LayerContent::RefMarker { latlng: point });
                self.surface.attach(marker);
                self.ref_marker = Some(marker);
                marker
            }
        };
        let zoom = self
            .surface
            .viewport()
            .zoom
            .max(self.settings.ref_marker_min_zoom);
        self.surface.set_view(point, zoom, false);
        self.surface.bring_to_back(marker);
        info!(
            event = "core.map.ref_marker_placed",
            method = %reference.set_method(),
            lat = point.lat,
            lng = point.lng
        );
    }

    /// Draw, move or remove the `f.box` rectangle.
    pub fn on_box_filter_changed(&mut self, value: Option<&HashValue>) {
        let bounds = value.and_then(|v| box_string_to_bounds(&v.encode()));
        match (bounds, self.filter_rect) {
            (Some(bounds), Some(rect)) => self.surface.set_rectangle_bounds(rect, bounds),
            (Some(bounds), None) => {
                let rect = self.surface.create_layer(
                    Pane::Overlay,
                    LayerContent::Rectangle {
                        bounds,
                        style: self.settings.filter_bounds_style.clone(),
                    },
                );
                self.surface.attach(rect);
                self.filter_rect = Some(rect);
            }
            (None, Some(rect)) => {
                self.surface.destroy(rect);
                self.filter_rect = None;
            }
            (None, None) => {}
        }
    }

    // --- Regions -------------------------------------------------------

    /// Start loading the shapes of `ids`. Only the most recent focus request
    /// commits bounds.
    pub fn begin_region_focus<G>(
        &mut self,
        ids: &[String],
        regions: &mut RegionRegistry,
        source: &G,
    ) -> RegionFocus
    where
        G: GeometrySource + ?Sized,
    {
        self.focus_generation += 1;
        let loads = ids
            .iter()
            .filter_map(|id| match regions.load_shape(id, source) {
                Ok(load) => Some((id.clone(), load)),
                Err(e) => {
                    warn!(event = "core.map.region_focus_skipped", id = %id, error = %e);
                    None
                }
            })
            .collect();
        debug!(
            event = "core.map.region_focus_started",
            generation = self.focus_generation,
            regions = ids.len()
        );
        RegionFocus {
            generation: self.focus_generation,
            loads,
        }
    }

    /// Materialise the loaded shapes and, for the latest request, clamp the
    /// viewport to their union. Max bounds change once per request.
    pub fn commit_region_focus(
        &mut self,
        resolved: ResolvedRegions,
        regions: &mut RegionRegistry,
    ) -> Vec<RegionEvent> {
        for (id, error) in &resolved.failed {
            warn!(event = "core.map.region_load_failed", id = %id, error = %error);
        }

        let selected = |id: &str| regions.selection().iter().any(|s| s == id);
        let mut union: Option<Bounds> = None;
        for (id, shape) in &resolved.shapes {
            if !selected(id) {
                continue;
            }
            if let Some(bounds) = shape.bounds() {
                union = Some(union.map_or(bounds, |u| u.union(&bounds)));
            }
            if self.regions.contains_key(id) {
                continue;
            }
            let color = regions.get(id).and_then(|r| r.color.as_deref());
            let layer = self.surface.create_layer(
                Pane::Regions,
                LayerContent::Shape {
                    geojson: Rc::clone(shape),
                    style: self.settings.region_style_for(color),
                },
            );
            self.surface.attach(layer);
            self.regions.insert(id.clone(), layer);
        }

        if resolved.generation != self.focus_generation {
            debug!(
                event = "core.map.region_focus_superseded",
                generation = resolved.generation,
                latest = self.focus_generation
            );
            return Vec::new();
        }
        let Some(bounds) = union else {
            return Vec::new();
        };

        self.surface.set_max_bounds(Some(bounds.pad(1.0)));
        if !bounds.contains(&self.surface.viewport().bounds) {
            self.surface.fit_bounds(bounds);
        }
        info!(
            event = "core.map.region_focus_completed",
            regions = resolved.shapes.len(),
            failed = resolved.failed.len()
        );
        regions.set_bounds(Some(bounds))
    }

    /// Load, draw and focus on the given regions.
    pub async fn show_regions<G>(
        &mut self,
        ids: &[String],
        regions: &mut RegionRegistry,
        source: &G,
    ) -> Vec<RegionEvent>
    where
        G: GeometrySource + ?Sized,
    {
        let focus = self.begin_region_focus(ids, regions, source);
        let resolved = focus.resolve().await;
        self.commit_region_focus(resolved, regions)
    }

    /// Drop the layers of deselected regions and re-clamp to what is left,
    /// or to the configured bounds when nothing is.
    pub fn remove_regions(
        &mut self,
        removed: &[String],
        regions: &mut RegionRegistry,
    ) -> Vec<RegionEvent> {
        let mut dropped = 0;
        for id in removed {
            if let Some(layer) = self.regions.shift_remove(id) {
                self.surface.destroy(layer);
                dropped += 1;
            }
        }
        debug!(event = "core.map.regions_removed", count = dropped);

        if regions.selection().is_empty() {
            // Any focus still loading is now moot.
            self.focus_generation += 1;
            self.surface.set_max_bounds(Some(self.settings.bounds));
            return regions.set_bounds(None);
        }

        let remaining = self
            .regions
            .values()
            .filter_map(|layer| self.surface.layer_bounds(*layer))
            .reduce(|a, b| a.union(&b));
        match remaining {
            Some(bounds) if dropped > 0 => {
                self.surface.set_max_bounds(Some(bounds.pad(1.0)));
                regions.set_bounds(Some(bounds))
            }
            _ => Vec::new(),
        }
    }

    // --- Info layers ---------------------------------------------------

    /// React to an info layer change: fetch features on first show, restyle
    /// on colour, detach on hide.
    pub async fn on_layer_changed<G>(
        &mut self,
        change: &LayerChange,
        layers: &mut InfoLayerRegistry,
        source: &G,
    ) -> Result<(), MapError>
    where
        G: GeometrySource + ?Sized,
    {
        let id = change.id.as_str();

        if change.shown == Some(true) {
            if let Some(entry) = self.info_layers.get_mut(id) {
                if !entry.attached {
                    self.surface.attach(entry.layer);
                    entry.attached = true;
                }
                return Ok(());
            }

            let features = layers.load_features(id, source)?.await?;
            let Some(layer) = layers.get(id) else {
                return Ok(());
            };
            if !layer.shown || self.info_layers.contains_key(id) {
                return Ok(());
            }
            let handle = self.surface.create_layer(
                Pane::Info,
                LayerContent::Shape {
                    geojson: features,
                    style: self.settings.info_style_for(&layer.color),
                },
            );
            self.surface.attach(handle);
            self.info_layers.insert(
                id.to_string(),
                OverlayEntry {
                    layer: handle,
                    attached: true,
                },
            );
            info!(event = "core.map.info_layer_shown", id = id);
            return Ok(());
        }

        let Some(entry) = self.info_layers.get_mut(id) else {
            return Ok(());
        };
        if let Some(color) = &change.color {
            self.surface.set_style(entry.layer, self.settings.info_style_for(color));
        }
        if change.shown == Some(false) && entry.attached {
            self.surface.detach(entry.layer);
            entry.attached = false;
        }
        Ok(())
    }

    /// Destroy every layer the view created.
    pub fn teardown(&mut self) -> usize {
        let markers = self.markers.len();
        for (_, entry) in self.markers.drain(..) {
            self.surface.destroy(entry.layer);
        }
        let overlays = self
            .parcels
            .drain()
            .map(|(_, parcel)| parcel.layer)
            .chain(self.info_layers.drain().map(|(_, entry)| entry.layer))
            .chain(self.regions.drain(..).map(|(_, layer)| layer))
            .chain(self.ref_marker.take())
            .chain(self.filter_rect.take())
            .collect::<Vec<_>>();
        for layer in overlays {
            self.surface.destroy(layer);
        }
        self.surface.destroy(self.tiles);
        debug!(event = "core.map.teardown_completed", markers = markers);
        markers
    }
}

fn zoom_level(state: MarkerState) -> Option<u8> {
    match state {
        MarkerState::Unzoomed => None,
        MarkerState::Zoomed(level) => Some(level),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use futures::channel::oneshot;
    use futures::executor::block_on;
    use serde_json::json;

    use super::*;
    use crate::config::{LayerConfig, RegionConfig};
    use crate::geo::Geometry;
    use crate::layers::cache::tests::{FakeSource, GatedSource, square};
    use crate::map::headless::{HeadlessSurface, SurfaceOp};
    use crate::reference::RefLocation;
    use crate::state::MemoryLocation;

    fn state(hash: &str) -> AppState {
        let mut state = AppState::new(Box::new(MemoryLocation::new(hash)));
        state.init();
        state
    }

    fn view_with(hash: &str) -> MapView<HeadlessSurface> {
        let mut view = MapView::new(
            HeadlessSurface::new(1024, 768, (13, 18)),
            MapSettings::default(),
            &state(hash),
        );
        view.surface_mut().clear_ops();
        view
    }

    fn view() -> MapView<HeadlessSurface> {
        view_with("")
    }

    fn parcel() -> Geometry {
        serde_json::from_value(json!({
            "type": "Polygon",
            "coordinates": [[[-71.1, 42.39], [-71.099, 42.39], [-71.099, 42.391], [-71.1, 42.39]]]
        }))
        .unwrap()
    }

    fn record(id: &str) -> Record {
        Record::new(id)
            .with_case_number(format!("PB-{id}"))
            .with_location(42.39, -71.1)
            .with_parcel(parcel())
    }

    fn collection(records: Vec<Record>) -> RecordCollection {
        let mut collection = RecordCollection::new();
        collection.set(records);
        collection
    }

    fn route(view: &mut MapView<HeadlessSurface>, events: &[CollectionEvent], records: &RecordCollection) {
        for event in events {
            view.apply_collection_event(event, records);
        }
    }

    #[test]
    fn test_initial_view_from_state() {
        let view = view_with("lat=42.4&lng=-71.1&zoom=16");
        let viewport = view.surface().viewport();
        assert_eq!(viewport.zoom, 16);
        assert!((viewport.center.lat - 42.4).abs() < 1e-9);
    }

    #[test]
    fn test_malformed_state_falls_back_to_defaults() {
        let view = view_with("lat=north&zoom=close");
        let viewport = view.surface().viewport();
        assert_eq!(viewport.zoom, 14);
        assert_eq!(viewport.center, MapSettings::default().default_center);
    }

    #[test]
    fn test_add_then_remove_leaves_no_entries() {
        let mut view = view();
        let mut records = RecordCollection::new();
        let events = records.set(vec![record("1"), record("2")]);
        route(&mut view, &events, &records);
        assert_eq!(view.marker_count(), 2);

        let events = records.set(Vec::new());
        route(&mut view, &events, &records);
        assert_eq!(view.marker_count(), 0);
        assert_eq!(view.parcel_count(), 0);
        assert_eq!(view.surface().layer_count(), 1);
    }

    fn shared(id: &str, lat: f64) -> Record {
        Record::new(id).with_case_number("X").with_location(lat, -71.1)
    }

    #[test]
    fn test_removing_non_owner_keeps_shared_marker() {
        let mut view = view();
        let mut records = RecordCollection::new();
        let events = records.set(vec![shared("1", 42.39), shared("2", 42.391)]);
        route(&mut view, &events, &records);
        assert_eq!(view.marker_count(), 1);

        let events = records.set(vec![shared("1", 42.39)]);
        route(&mut view, &events, &records);
        assert_eq!(records.len(), 1);
        assert!(view.has_marker("X"));
        assert_eq!(view.surface().layer_count(), 2);
    }

    #[test]
    fn test_removing_owner_hands_marker_to_sibling() {
        let mut view = view();
        let mut records = RecordCollection::new();
        let events = records.set(vec![shared("1", 42.39), shared("2", 42.391)]);
        route(&mut view, &events, &records);

        let events = records.set(vec![shared("2", 42.391)]);
        route(&mut view, &events, &records);
        assert!(view.has_marker("X"));
        assert_eq!(view.marker_count(), 1);
        assert_eq!(view.surface().layer_count(), 2);

        let events = records.set(Vec::new());
        route(&mut view, &events, &records);
        assert_eq!(view.marker_count(), 0);
        assert_eq!(view.surface().layer_count(), 1);
    }

    #[test]
    fn test_unmapped_parcel_follows_case_number() {
        let mut view = view();
        let unmapped = |case: &str| Record::new("5").with_case_number(case).with_parcel(parcel());
        let mut records = RecordCollection::new();
        let events = records.set(vec![unmapped("A")]);
        route(&mut view, &events, &records);
        let events = records.set_selection(&["5".into()]);
        route(&mut view, &events, &records);
        assert!(view.parcel_visible("A"));

        let events = records.set(vec![unmapped("B")]);
        route(&mut view, &events, &records);
        assert!(!view.parcel_visible("A"));
        assert!(view.parcel_visible("B"));
        assert_eq!(view.parcel_count(), 1);
        assert_eq!(view.surface().layer_count(), 2);
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut view = view();
        let record = record("1");
        view.record_added(&record);
        view.record_added(&record);
        assert_eq!(view.marker_count(), 1);
        assert_eq!(
            view.surface().count_ops(|op| matches!(op, SurfaceOp::Create { .. })),
            1
        );
    }

    #[test]
    fn test_unmapped_record_makes_no_surface_calls() {
        let mut view = view();
        let records = collection(vec![Record::new("9").with_case_number("PB-9")]);
        let events = vec![CollectionEvent::Added {
            id: "9".into(),
        }];
        route(&mut view, &events, &records);
        assert!(view.surface().ops().is_empty());
        assert!(!view.has_marker("PB-9"));
    }

    #[test]
    fn test_exclusion_toggle_does_not_duplicate() {
        let mut view = view();
        let record = record("1");
        view.record_added(&record);

        let mut excluded = record.clone();
        excluded.flags.excluded = true;
        let hide = RecordChange {
            excluded: Some(true),
            ..Default::default()
        };
        view.record_changed(&excluded, &hide);
        assert!(!view.is_marker_attached("PB-1"));

        let show = RecordChange {
            excluded: Some(false),
            ..Default::default()
        };
        view.record_changed(&record, &show);
        assert!(view.is_marker_attached("PB-1"));
        assert_eq!(view.marker_count(), 1);
        assert_eq!(view.surface().attached_in(Pane::Markers).len(), 1);
        assert_eq!(
            view.surface().count_ops(|op| matches!(op, SurfaceOp::Create { .. })),
            1
        );
    }

    #[test]
    fn test_marker_input_goes_through_records() {
        let mut view = view();
        let mut records = RecordCollection::new();
        let events = records.set(vec![record("1")]);
        route(&mut view, &events, &records);
        view.surface_mut().clear_ops();

        let events = view.on_marker_input("PB-1", MarkerInput::MouseOver, &mut records);
        assert!(view.surface().ops().is_empty());
        assert!(records.get(&"1".into()).unwrap().flags.hovered);

        route(&mut view, &events, &records);
        assert!(view.parcel_visible("PB-1"));

        let events = view.on_marker_input("PB-1", MarkerInput::MouseOut, &mut records);
        route(&mut view, &events, &records);
        assert!(!view.parcel_visible("PB-1"));
        assert_eq!(view.parcel_count(), 1);

        let events = view.on_marker_input("PB-1", MarkerInput::Click, &mut records);
        route(&mut view, &events, &records);
        assert_eq!(records.get_selection().len(), 1);
        assert!(view.parcel_visible("PB-1"));

        let events = view.on_marker_input("PB-1", MarkerInput::PopupClose, &mut records);
        route(&mut view, &events, &records);
        assert!(records.get_selection().is_empty());
        assert!(!view.parcel_visible("PB-1"));
        assert_eq!(
            view.surface().count_ops(|op| matches!(op, SurfaceOp::Create { .. })),
            1
        );
    }

    #[test]
    fn test_excluded_record_never_shows_parcel() {
        let mut view = view();
        let mut record = record("1");
        view.record_added(&record);
        record.flags.selected = true;
        record.flags.excluded = true;
        view.record_changed(
            &record,
            &RecordChange {
                selected: Some(true),
                excluded: Some(true),
                ..Default::default()
            },
        );
        assert!(!view.parcel_visible("PB-1"));
    }

    #[test]
    fn test_markers_zoom_above_threshold() {
        let mut view = view();
        let record = record("1");
        view.record_added(&record);
        assert_eq!(view.marker_state("PB-1"), Some(MarkerState::Unzoomed));

        view.surface_mut()
            .set_view(LatLng::new(42.39, -71.1), 18, false);
        view.update_markers();
        assert_eq!(view.marker_state("PB-1"), Some(MarkerState::Zoomed(1)));

        view.surface_mut()
            .set_view(LatLng::new(42.39, -71.1), 15, false);
        view.update_markers();
        assert_eq!(view.marker_state("PB-1"), Some(MarkerState::Unzoomed));
    }

    #[test]
    fn test_move_end_writes_viewport_silently() {
        let location = MemoryLocation::new("view=main");
        let mut state = AppState::new(Box::new(location.clone()));
        state.init();
        let mut view = MapView::new(
            HeadlessSurface::new(1024, 768, (13, 18)),
            MapSettings::default(),
            &state,
        );
        let changes = std::rc::Rc::new(RefCell::new(0));
        let counter = changes.clone();
        state.on_change(move |_| *counter.borrow_mut() += 1);

        view.surface_mut()
            .set_view(LatLng::new(42.3901234567, -71.1), 15, false);
        assert!(view.surface_mut().take_move_end());
        let events = view.on_move_end(&mut state).unwrap();
        assert!(events.is_empty());
        assert_eq!(*changes.borrow(), 0);
        assert_eq!(state.get_float("lat"), Some(42.390123));
        assert_eq!(state.get_int("zoom"), Some(15));
        assert!(state.hash().starts_with("view=main&"));

        let writes = location.replacement_count();
        view.on_move_end(&mut state).unwrap();
        assert_eq!(location.replacement_count(), writes);
    }

    #[test]
    fn test_state_viewport_is_noop_when_equal() {
        let mut view = view_with("lat=42.39&lng=-71.1&zoom=15");
        let current = state("lat=42.39&lng=-71.1&zoom=15");
        assert!(!view.apply_state_viewport(&current));
        assert!(view.surface().ops().is_empty());

        let moved = state("lat=42.4&lng=-71.1&zoom=16");
        assert!(view.apply_state_viewport(&moved));
        assert_eq!(view.surface().viewport().zoom, 16);
    }

    fn regions() -> RegionRegistry {
        RegionRegistry::from_config(
            &["a", "bb"]
                .iter()
                .map(|id| RegionConfig {
                    id: id.to_string(),
                    name: None,
                    source: id.to_string(),
                    color: None,
                })
                .collect::<Vec<_>>(),
        )
    }

    fn ids(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_mixed_cached_and_pending_regions_clamp_once() {
        let mut view = view();
        let mut registry = regions();
        block_on(registry.load_shape("a", &FakeSource::default()).unwrap()).unwrap();
        registry.set_selection(&ids(&["a", "bb"])).unwrap();

        let (release, gate) = oneshot::channel();
        let source = GatedSource {
            gate: RefCell::new(Some(gate)),
        };
        let focus = view.begin_region_focus(&ids(&["a", "bb"]), &mut registry, &source);
        assert!(!focus.is_ready());
        assert_eq!(
            view.surface().count_ops(|op| matches!(op, SurfaceOp::SetMaxBounds(_))),
            0
        );

        release.send(()).unwrap();
        let resolved = block_on(focus.resolve());
        let events = view.commit_region_focus(resolved, &mut registry);

        let union = square("a").bounds().unwrap().union(&square("bb").bounds().unwrap());
        let clamps: Vec<&SurfaceOp> = view
            .surface()
            .ops()
            .iter()
            .filter(|op| matches!(op, SurfaceOp::SetMaxBounds(_)))
            .collect();
        assert_eq!(clamps, vec![&SurfaceOp::SetMaxBounds(Some(union.pad(1.0)))]);
        assert_eq!(events, vec![RegionEvent::RegionBounds { bounds: Some(union) }]);
        assert_eq!(view.region_layer_ids().count(), 2);
        assert!(view.surface().viewport().bounds.intersects(&union));
    }

    #[test]
    fn test_cached_regions_need_no_fetch() {
        let mut view = view();
        let mut registry = regions();
        let source = FakeSource::default();
        registry.set_selection(&ids(&["a"])).unwrap();
        block_on(view.show_regions(&ids(&["a"]), &mut registry, &source));
        block_on(view.show_regions(&ids(&["a"]), &mut registry, &source));
        assert_eq!(source.fetches.get(), 1);
        assert_eq!(view.region_layer_ids().count(), 1);
    }

    #[test]
    fn test_superseded_focus_does_not_clamp() {
        let mut view = view();
        let mut registry = regions();
        let source = FakeSource::default();
        registry.set_selection(&ids(&["a", "bb"])).unwrap();
        let first = view.begin_region_focus(&ids(&["a"]), &mut registry, &source);
        let second = view.begin_region_focus(&ids(&["a", "bb"]), &mut registry, &source);

        assert!(view.commit_region_focus(block_on(first.resolve()), &mut registry).is_empty());
        assert!(!view.commit_region_focus(block_on(second.resolve()), &mut registry).is_empty());
        assert_eq!(
            view.surface().count_ops(|op| matches!(op, SurfaceOp::SetMaxBounds(_))),
            1
        );
    }

    #[test]
    fn test_removing_all_regions_restores_config_bounds() {
        let mut view = view();
        let mut registry = regions();
        let source = FakeSource::default();
        registry.set_selection(&ids(&["a"])).unwrap();
        block_on(view.show_regions(&ids(&["a"]), &mut registry, &source));

        registry.set_selection(&[]).unwrap();
        let events = view.remove_regions(&ids(&["a"]), &mut registry);
        assert_eq!(events, vec![RegionEvent::RegionBounds { bounds: None }]);
        assert_eq!(view.surface().max_bounds(), Some(MapSettings::default().bounds));
        assert_eq!(view.region_layer_ids().count(), 0);
    }

    fn info_layers() -> InfoLayerRegistry {
        InfoLayerRegistry::from_config(&[LayerConfig {
            id: "glx".to_string(),
            name: None,
            source: "glx".to_string(),
            color: "green".to_string(),
            shown: false,
        }])
    }

    #[test]
    fn test_info_layer_lifecycle() {
        let mut view = view();
        let mut layers = info_layers();
        let source = FakeSource::default();

        let change = layers.set_shown("glx", true).unwrap().unwrap();
        block_on(view.on_layer_changed(&change, &mut layers, &source)).unwrap();
        assert!(view.info_layer_visible("glx"));

        let change = layers.set_color("glx", "purple").unwrap().unwrap();
        block_on(view.on_layer_changed(&change, &mut layers, &source)).unwrap();
        assert_eq!(
            view.surface().count_ops(|op| matches!(op, SurfaceOp::SetStyle(_))),
            1
        );

        let change = layers.set_shown("glx", false).unwrap().unwrap();
        block_on(view.on_layer_changed(&change, &mut layers, &source)).unwrap();
        assert!(!view.info_layer_visible("glx"));

        let change = layers.set_shown("glx", true).unwrap().unwrap();
        block_on(view.on_layer_changed(&change, &mut layers, &source)).unwrap();
        assert!(view.info_layer_visible("glx"));
        assert_eq!(source.fetches.get(), 1);
    }

    #[test]
    fn test_failed_info_layer_reports_error() {
        let mut view = view();
        let mut layers = info_layers();
        let source = FakeSource::default();
        source.failing.borrow_mut().push("glx".to_string());
        let change = layers.set_shown("glx", true).unwrap().unwrap();
        let err = block_on(view.on_layer_changed(&change, &mut layers, &source)).unwrap_err();
        assert!(matches!(err, MapError::Geometry(_)));
        assert!(!view.info_layer_visible("glx"));
    }

    #[test]
    fn test_reference_marker_follows_method() {
        let mut view = view();
        let mut location = RefLocation::new(MapSettings::default().default_center);
        view.place_reference_marker(&location);
        assert!(!view.has_reference_marker());

        let change = view.on_dbl_click(LatLng::new(42.39, -71.1), &mut location);
        assert_eq!(change.method, Some(SetMethod::Map));
        assert!(view.surface().ops().is_empty());

        view.place_reference_marker(&location);
        assert!(view.has_reference_marker());
        assert_eq!(view.surface().viewport().zoom, 16);
        assert!(view.surface().ops().contains(&SurfaceOp::SetView {
            center: LatLng::new(42.39, -71.1),
            zoom: 16,
            animate: false,
        }));
        assert!(view.zoom_to_ref_location());
        assert_eq!(view.surface().viewport().zoom, 18);

        location.reset_to_auto();
        view.place_reference_marker(&location);
        assert!(!view.has_reference_marker());
        assert!(!view.zoom_to_ref_location());
    }

    #[test]
    fn test_box_filter_rectangle() {
        let mut view = view();
        let value = HashValue::from("42.38,-71.11,42.40,-71.09");
        view.on_box_filter_changed(Some(&value));
        let drawn = view.filter_rectangle().unwrap();
        assert!((drawn.north - 42.40).abs() < 1e-9);

        let value = HashValue::from("42.37,-71.12,42.41,-71.08");
        view.on_box_filter_changed(Some(&value));
        assert!((view.filter_rectangle().unwrap().north - 42.41).abs() < 1e-9);
        assert_eq!(
            view.surface().count_ops(|op| matches!(op, SurfaceOp::Create { .. })),
            1
        );

        view.on_box_filter_changed(None);
        assert!(view.filter_rectangle().is_none());
    }

    #[test]
    fn test_focus_single_and_many() {
        let mut view = view();
        let one = record("1");
        view.on_focus(&[&one], true);
        assert_eq!(view.surface().viewport().zoom, 17);

        let two = Record::new("2").with_location(42.41, -71.12);
        view.on_focus(&[&one, &two], false);
        let bounds = view.surface().viewport().bounds;
        assert!(bounds.contains_point(LatLng::new(42.39, -71.1)));
        assert!(bounds.contains_point(LatLng::new(42.41, -71.12)));
    }

    #[test]
    fn test_popup_pans_north() {
        let mut view = view();
        let anchor = view.surface().viewport().center;
        view.on_popup_opened(anchor, 200.0);
        let pan = view.surface().ops().last().cloned();
        match pan {
            Some(SurfaceOp::PanTo { center, animate }) => {
                assert!(animate);
                assert!(center.lat > anchor.lat);
            }
            other => panic!("expected pan, got {other:?}"),
        }
    }

    #[test]
    fn test_zoom_controls() {
        let mut view = view_with("zoom=18");
        assert!(!view.zoom_controls().can_zoom_in);
        view.zoom_in();
        assert_eq!(view.surface().viewport().zoom, 18);
        view.zoom_out();
        assert_eq!(view.surface().viewport().zoom, 17);
        assert!(view.zoom_controls().can_zoom_in);

        view.reset_bounds();
        assert!(view.surface().viewport().bounds.contains(&MapSettings::default().bounds));
    }

    #[test]
    fn test_teardown_destroys_everything() {
        let mut view = view();
        let mut record = record("1");
        record.flags.selected = true;
        view.record_added(&record);
        assert_eq!(view.parcel_count(), 1);
        assert_eq!(view.teardown(), 1);
        assert_eq!(view.surface().layer_count(), 0);
    }
}
