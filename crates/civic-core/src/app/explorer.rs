use std::collections::VecDeque;

use tracing::{debug, info, warn};

use crate::config::ExplorerConfig;
use crate::events;
use crate::geo::{LatLng, bounds_to_box_string};
use crate::layers::{GeometrySource, InfoLayerRegistry, LayerChange, RegionEvent, RegionRegistry};
use crate::list::{ListUpdate, ListView};
use crate::map::{MapSettings, MapSurface, MapView, MarkerInput};
use crate::records::{CollectionEvent, FetchQuery, FilterSpec, RecordCollection, SortSpec, Transport};
use crate::reference::{RefLocation, RefLocationChange, SetMethod};
use crate::state::{AppState, HashLocation, HashPatch, HashValue, StateEvent};

use super::errors::ExplorerError;
use super::snapshot::{ExplorerSnapshot, LoadStatus, MarkerSnapshot, ViewportSnapshot};

/// Body view shown before the user has picked a location.
pub const INTRO_VIEW: &str = "intro";
pub const MAIN_VIEW: &str = "main";

const VIEWPORT_KEYS: [&str; 3] = ["lat", "lng", "zoom"];

/// Work queued while handling an event.
#[derive(Debug, Clone, PartialEq)]
enum Pending {
    State(StateEvent),
    Records(CollectionEvent),
    Regions(RegionEvent),
    Layer(LayerChange),
    Fetch,
}

/// Wires the store, the record collection, the registries and the views
/// together. Every collaborator is owned here and handed to the others
/// explicitly; nothing is looked up ambiently.
///
/// Events are handled in the order they were produced. Follow-up work (a
/// refetch, region focus, viewport persistence) goes through one queue, so a
/// handler never runs re-entrantly.
pub struct Explorer<S, T, G>
where
    S: MapSurface,
    T: Transport,
    G: GeometrySource,
{
    state: AppState,
    records: RecordCollection,
    regions: RegionRegistry,
    layers: InfoLayerRegistry,
    reference: RefLocation,
    map: MapView<S>,
    list: ListView,
    transport: T,
    geometry: G,
    status: LoadStatus,
    view: Option<String>,
    pending: VecDeque<Pending>,
}

impl<S, T, G> Explorer<S, T, G>
where
    S: MapSurface,
    T: Transport,
    G: GeometrySource,
{
    /// Seed the store from `location` and build the views. Nothing is
    /// fetched until [`Explorer::start`].
    pub fn new(
        config: &ExplorerConfig,
        location: Box<dyn HashLocation>,
        surface: S,
        transport: T,
        geometry: G,
    ) -> Self {
        let mut state = AppState::new(location);
        let initial = state.init();
        let settings = MapSettings::from_config(config);
        let reference = RefLocation::new(settings.default_center);
        let map = MapView::new(surface, settings, &state);
        let layers = InfoLayerRegistry::from_config(&config.layers);

        let mut pending: VecDeque<Pending> = initial.into_iter().map(Pending::State).collect();
        pending.extend(layers.initial_changes().into_iter().map(Pending::Layer));

        events::log_explorer_ready(state.hash(), state.get_state().len());

        Self {
            view: state.get_text("view"),
            state,
            records: RecordCollection::new(),
            regions: RegionRegistry::from_config(&config.regions),
            layers,
            reference,
            map,
            list: ListView::new(&config.list),
            transport,
            geometry,
            status: LoadStatus::Idle,
            pending,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn records(&self) -> &RecordCollection {
        &self.records
    }

    pub fn regions(&self) -> &RegionRegistry {
        &self.regions
    }

    pub fn layers(&self) -> &InfoLayerRegistry {
        &self.layers
    }

    pub fn reference(&self) -> &RefLocation {
        &self.reference
    }

    pub fn map(&self) -> &MapView<S> {
        &self.map
    }

    pub fn map_mut(&mut self) -> &mut MapView<S> {
        &mut self.map
    }

    pub fn list(&self) -> &ListView {
        &self.list
    }

    pub fn status(&self) -> LoadStatus {
        self.status
    }

    pub fn view(&self) -> Option<&str> {
        self.view.as_deref()
    }

    /// True while no body view has been chosen or the intro is showing.
    pub fn is_intro(&self) -> bool {
        matches!(self.view.as_deref(), None | Some(INTRO_VIEW))
    }

    /// Apply the initial hash, show the list and fetch records.
    pub async fn start(&mut self) {
        self.list.show(&self.records);
        self.queue_fetch();
        self.drain().await;
        info!(
            event = "core.explorer.start_completed",
            records = self.records.len(),
            status = ?self.status
        );
    }

    pub async fn set_hash_key(
        &mut self,
        key: &str,
        value: impl Into<HashValue>,
    ) -> Result<(), ExplorerError> {
        let events = self.state.set_hash_key(key, value)?;
        self.enqueue_state(events);
        self.drain().await;
        Ok(())
    }

    pub async fn remove_hash_key(&mut self, key: &str) -> Result<(), ExplorerError> {
        let events = self.state.remove_hash_key(key)?;
        self.enqueue_state(events);
        self.drain().await;
        Ok(())
    }

    pub async fn extend_hash(&mut self, patch: HashPatch, silent: bool) -> Result<(), ExplorerError> {
        let events = self.state.extend_hash(patch, silent)?;
        self.enqueue_state(events);
        self.drain().await;
        Ok(())
    }

    /// The location changed underneath us (back/forward, edited URL).
    pub async fn hash_changed(&mut self) {
        let events = self.state.handle_hash_change();
        self.enqueue_state(events);
        self.drain().await;
    }

    /// Select regions through the `regions` key so the choice is shareable.
    pub async fn select_regions(&mut self, ids: &[String]) -> Result<(), ExplorerError> {
        if ids.is_empty() {
            return self.remove_hash_key("regions").await;
        }
        self.set_hash_key("regions", ids.join(",")).await
    }

    pub async fn request_focus(&mut self, ids: Vec<String>, zoom: bool) {
        let events = self.state.request_focus(ids, zoom);
        self.enqueue_state(events);
        self.drain().await;
    }

    pub async fn marker_input(&mut self, reference: &str, input: MarkerInput) {
        let events = self.map.on_marker_input(reference, input, &mut self.records);
        self.enqueue_records(events);
        self.drain().await;
    }

    pub async fn set_layer_shown(&mut self, id: &str, shown: bool) -> Result<(), ExplorerError> {
        if let Some(change) = self.layers.set_shown(id, shown)? {
            self.pending.push_back(Pending::Layer(change));
        }
        self.drain().await;
        Ok(())
    }

    pub async fn set_layer_color(&mut self, id: &str, color: &str) -> Result<(), ExplorerError> {
        if let Some(change) = self.layers.set_color(id, color)? {
            self.pending.push_back(Pending::Layer(change));
        }
        self.drain().await;
        Ok(())
    }

    /// A double click on the map sets the reference location.
    pub async fn dbl_click(&mut self, latlng: LatLng) -> Result<(), ExplorerError> {
        let change = self.map.on_dbl_click(latlng, &mut self.reference);
        self.reference_changed(change).await
    }

    pub async fn set_reference_from_address(
        &mut self,
        address: &str,
        point: LatLng,
    ) -> Result<(), ExplorerError> {
        let change = self.reference.set_from_address(address, point);
        self.reference_changed(change).await
    }

    pub async fn set_reference_from_geolocation(&mut self, point: LatLng) -> Result<(), ExplorerError> {
        let change = self.reference.set_from_geolocation(point);
        self.reference_changed(change).await
    }

    pub async fn reset_reference(&mut self) -> Result<(), ExplorerError> {
        let change = self.reference.reset_to_auto();
        self.reference_changed(change).await
    }

    pub fn render_next_page(&mut self) -> ListUpdate {
        self.list.render_next(&self.records)
    }

    pub fn snapshot(&self) -> ExplorerSnapshot {
        let viewport = self.map.surface().viewport();
        ExplorerSnapshot {
            hash: self.state.hash().to_string(),
            view: self.view.clone(),
            status: self.status,
            viewport: ViewportSnapshot {
                lat: viewport.center.lat,
                lng: viewport.center.lng,
                zoom: viewport.zoom,
                bounds: bounds_to_box_string(&viewport.bounds),
            },
            record_count: self.records.len(),
            results_info: self.list.results_info(&self.records),
            markers: self
                .map
                .markers()
                .map(|(reference, state, attached)| MarkerSnapshot {
                    reference: reference.to_string(),
                    state,
                    attached,
                })
                .collect(),
            list: self.list.rows().cloned().collect(),
            selection: self
                .records
                .get_selection()
                .iter()
                .map(|r| r.id.clone())
                .collect(),
            regions: self.regions.selection().to_vec(),
            region_bounds: self.regions.bounds().map(|b| bounds_to_box_string(&b)),
            layers_shown: self.layers.shown().map(|l| l.id.clone()).collect(),
            filter_box: self.map.filter_rectangle().map(|b| bounds_to_box_string(&b)),
            reference: self.reference.clone(),
        }
    }

    /// Drop subscriptions and every map layer.
    pub fn teardown(&mut self) {
        events::log_explorer_teardown(self.records.len(), self.map.marker_count());
        self.pending.clear();
        self.map.teardown();
        self.list.hide();
        self.state.teardown();
    }

    // --- Dispatch ------------------------------------------------------

    async fn reference_changed(&mut self, change: RefLocationChange) -> Result<(), ExplorerError> {
        if change.is_empty() {
            return Ok(());
        }
        self.map.place_reference_marker(&self.reference);
        self.persist_viewport();

        let explicit = change.method.is_some_and(|m| m != SetMethod::Auto);
        if explicit && self.is_intro() {
            debug!(event = "core.explorer.intro_left", method = ?change.method);
            return self.set_hash_key("view", MAIN_VIEW).await;
        }
        self.drain().await;
        Ok(())
    }

    fn enqueue_state(&mut self, events: Vec<StateEvent>) {
        self.pending.extend(events.into_iter().map(Pending::State));
    }

    fn enqueue_records(&mut self, events: Vec<CollectionEvent>) {
        self.pending.extend(events.into_iter().map(Pending::Records));
    }

    fn queue_fetch(&mut self) {
        if !self.pending.contains(&Pending::Fetch) {
            self.pending.push_back(Pending::Fetch);
        }
    }

    async fn drain(&mut self) {
        while let Some(next) = self.pending.pop_front() {
            match next {
                Pending::State(event) => self.on_state_event(event),
                Pending::Records(event) => self.on_collection_event(&event),
                Pending::Regions(event) => self.on_region_event(event).await,
                Pending::Layer(change) => self.on_layer_change(change).await,
                Pending::Fetch => self.fetch().await,
            }
            self.persist_viewport();
        }
    }

    fn on_state_event(&mut self, event: StateEvent) {
        match event {
            StateEvent::KeyChanged { key, new, .. } => match key.as_str() {
                "view" => {
                    self.view = new.map(|v| v.encode());
                    debug!(event = "core.explorer.view_changed", view = ?self.view);
                }
                "sort" => {
                    let spec = new.and_then(|v| SortSpec::parse(&v.encode()));
                    let events = self.records.set_sort(spec);
                    self.enqueue_records(events);
                }
                "f.box" => self.map.on_box_filter_changed(new.as_ref()),
                "regions" => self.regions_key_changed(new.as_ref()),
                _ => {}
            },
            StateEvent::Changed { keys } => {
                if keys.iter().any(|k| k.starts_with("f.")) {
                    let filter = FilterSpec::from_state(&self.state.get_state());
                    let events = self.records.apply_filter(filter);
                    self.enqueue_records(events);
                    self.queue_fetch();
                }
                if keys.iter().any(|k| VIEWPORT_KEYS.contains(&k.as_str())) {
                    self.map.apply_state_viewport(&self.state);
                }
            }
            StateEvent::FocusRequested { ids, zoom } => {
                let targets: Vec<_> = ids
                    .iter()
                    .filter_map(|id| self.records.get(&id.as_str().into()))
                    .collect();
                self.map.on_focus(&targets, zoom);
            }
        }
    }

    fn regions_key_changed(&mut self, value: Option<&HashValue>) {
        let ids: Vec<String> = value
            .map(|v| {
                v.encode()
                    .split(',')
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();
        match self.regions.set_selection(&ids) {
            Ok(events) => self
                .pending
                .extend(events.into_iter().map(Pending::Regions)),
            Err(e) => warn!(event = "core.explorer.regions_rejected", error = %e),
        }
    }

    fn on_collection_event(&mut self, event: &CollectionEvent) {
        match event {
            CollectionEvent::Fetching => self.status = LoadStatus::Loading,
            CollectionEvent::FetchingComplete { .. } => self.status = LoadStatus::Loaded,
            CollectionEvent::FetchingFailed { error } => {
                warn!(event = "core.explorer.fetch_failed", error = %error);
                self.status = LoadStatus::Failed;
            }
            _ => {}
        }
        self.map.apply_collection_event(event, &self.records);
        self.list.on_collection_event(event, &self.records);
    }

    async fn on_region_event(&mut self, event: RegionEvent) {
        match event {
            RegionEvent::SelectionLoaded { .. } => {
                let selection = self.regions.selection().to_vec();
                let events = self
                    .map
                    .show_regions(&selection, &mut self.regions, &self.geometry)
                    .await;
                self.pending.extend(events.into_iter().map(Pending::Regions));
            }
            RegionEvent::SelectionRemoved { removed } => {
                let events = self.map.remove_regions(&removed, &mut self.regions);
                self.pending.extend(events.into_iter().map(Pending::Regions));
            }
            RegionEvent::RegionBounds { bounds } => {
                debug!(event = "core.explorer.region_bounds_changed", bounds = ?bounds);
            }
        }
    }

    async fn on_layer_change(&mut self, change: LayerChange) {
        if let Err(e) = self
            .map
            .on_layer_changed(&change, &mut self.layers, &self.geometry)
            .await
        {
            warn!(event = "core.explorer.layer_failed", id = %change.id, error = %e);
        }
    }

    async fn fetch(&mut self) {
        let query = FetchQuery::from_state(&self.state.get_state());
        let events = self.records.fetch(&self.transport, &query).await;
        self.enqueue_records(events);
    }

    /// Write the viewport back after the surface reports a finished move.
    fn persist_viewport(&mut self) {
        if !self.map.surface_mut().take_move_end() {
            return;
        }
        if let Err(e) = self.map.on_move_end(&mut self.state) {
            warn!(event = "core.explorer.viewport_persist_failed", error = %e);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::future::Future;
    use std::rc::Rc;

    use futures::executor::block_on;
    use serde_json::{Value, json};

    use super::*;
    use crate::config::{LayerConfig, RegionConfig};
    use crate::layers::cache::tests::FakeSource;
    use crate::map::{HeadlessSurface, MarkerState};
    use crate::records::TransportError;
    use crate::reference::ReferenceLocation;
    use crate::state::MemoryLocation;

    /// Serves fixed payloads and records every query.
    #[derive(Clone)]
    struct MemoryTransport {
        payloads: Rc<RefCell<Result<Vec<Value>, TransportError>>>,
        queries: Rc<RefCell<Vec<FetchQuery>>>,
    }

    impl MemoryTransport {
        fn serving(payloads: Vec<Value>) -> Self {
            Self {
                payloads: Rc::new(RefCell::new(Ok(payloads))),
                queries: Rc::default(),
            }
        }
    }

    impl Transport for MemoryTransport {
        fn fetch_records(
            &self,
            query: &FetchQuery,
        ) -> impl Future<Output = Result<Vec<Value>, TransportError>> {
            self.queries.borrow_mut().push(query.clone());
            let result = self.payloads.borrow().clone();
            async move { result }
        }
    }

    type TestExplorer = Explorer<HeadlessSurface, MemoryTransport, FakeSource>;

    fn config() -> ExplorerConfig {
        ExplorerConfig {
            regions: vec![RegionConfig {
                id: "somerville".to_string(),
                name: None,
                source: "somerville".to_string(),
                color: None,
            }],
            layers: vec![LayerConfig {
                id: "glx".to_string(),
                name: None,
                source: "glx".to_string(),
                color: "green".to_string(),
                shown: true,
            }],
            ..Default::default()
        }
    }

    fn payloads() -> Vec<Value> {
        vec![
            json!({"id": 1, "caseNumber": "PB-1", "address": "1 Elm St", "price": 3,
                   "location": {"lat": 42.39, "lng": -71.1}}),
            json!({"id": 2, "caseNumber": "PB-2", "address": "9 Oak Ave", "price": 1,
                   "location": {"lat": 42.395, "lng": -71.105}}),
            json!({"id": 3, "caseNumber": "PB-3", "address": "4 Elm St", "price": 2}),
        ]
    }

    fn explorer_at(hash: &str, transport: MemoryTransport) -> (TestExplorer, MemoryLocation) {
        let location = MemoryLocation::new(hash);
        let mut explorer = Explorer::new(
            &config(),
            Box::new(location.clone()),
            HeadlessSurface::new(1024, 768, (13, 18)),
            transport,
            FakeSource::default(),
        );
        block_on(explorer.start());
        (explorer, location)
    }

    #[test]
    fn test_start_fetches_and_renders() {
        let transport = MemoryTransport::serving(payloads());
        let (explorer, _) = explorer_at("view=main", transport.clone());
        assert_eq!(explorer.status(), LoadStatus::Loaded);
        assert_eq!(explorer.records().len(), 3);
        assert_eq!(explorer.map().marker_count(), 2);
        assert_eq!(explorer.list().row_count(), 3);
        assert_eq!(transport.queries.borrow().len(), 1);
        assert!(explorer.map().info_layer_visible("glx"));
    }

    #[test]
    fn test_failed_fetch_sets_status() {
        let transport = MemoryTransport::serving(Vec::new());
        *transport.payloads.borrow_mut() = Err(TransportError::Unavailable {
            message: "offline".to_string(),
        });
        let (explorer, _) = explorer_at("", transport);
        assert_eq!(explorer.status(), LoadStatus::Failed);
        assert_eq!(explorer.map().marker_count(), 0);
        assert_eq!(explorer.snapshot().results_info, "No proposals found.");
    }

    #[test]
    fn test_sort_key_orders_list() {
        let (mut explorer, _) = explorer_at("", MemoryTransport::serving(payloads()));
        block_on(explorer.set_hash_key("sort", "-price")).unwrap();
        assert_eq!(
            explorer.state().get_key("sort"),
            Some(&HashValue::from("-price"))
        );
        let order: Vec<&str> = explorer.list().rows().map(|r| r.reference.as_str()).collect();
        assert_eq!(order, vec!["PB-1", "PB-3", "PB-2"]);
    }

    #[test]
    fn test_filter_key_excludes_and_refetches() {
        let transport = MemoryTransport::serving(payloads());
        let (mut explorer, _) = explorer_at("", transport.clone());
        block_on(explorer.set_hash_key("f.text", "elm")).unwrap();

        assert!(!explorer.map().is_marker_attached("PB-2"));
        assert!(explorer.map().is_marker_attached("PB-1"));
        assert_eq!(explorer.list().row_count(), 2);
        let queries = transport.queries.borrow();
        assert_eq!(queries.len(), 2);
        assert_eq!(queries[1].get("text"), Some("elm"));
    }

    #[test]
    fn test_box_filter_draws_rectangle() {
        let (mut explorer, _) = explorer_at("", MemoryTransport::serving(payloads()));
        block_on(explorer.set_hash_key("f.box", "42.38,-71.11,42.392,-71.09")).unwrap();
        assert!(explorer.snapshot().filter_box.is_some());
        assert!(explorer.map().is_marker_attached("PB-1"));
        assert!(!explorer.map().is_marker_attached("PB-2"));

        block_on(explorer.remove_hash_key("f.box")).unwrap();
        assert!(explorer.snapshot().filter_box.is_none());
        assert!(explorer.map().is_marker_attached("PB-2"));
    }

    #[test]
    fn test_regions_key_focuses_map() {
        let (mut explorer, _) = explorer_at("", MemoryTransport::serving(payloads()));
        block_on(explorer.select_regions(&["somerville".to_string()])).unwrap();
        assert_eq!(explorer.regions().selection().to_vec(), vec!["somerville".to_string()]);
        assert!(explorer.regions().bounds().is_some());
        assert_eq!(explorer.map().region_layer_ids().count(), 1);

        block_on(explorer.select_regions(&[])).unwrap();
        assert!(explorer.regions().bounds().is_none());
        assert_eq!(explorer.map().region_layer_ids().count(), 0);
    }

    #[test]
    fn test_unknown_region_is_ignored() {
        let (mut explorer, _) = explorer_at("", MemoryTransport::serving(payloads()));
        block_on(explorer.select_regions(&["atlantis".to_string()])).unwrap();
        assert!(explorer.regions().selection().is_empty());
    }

    #[test]
    fn test_hover_shows_parcel_through_records() {
        let mut records = payloads();
        records[0]["parcel"] = json!({
            "type": "Polygon",
            "coordinates": [[[-71.1, 42.39], [-71.099, 42.39], [-71.099, 42.391], [-71.1, 42.39]]]
        });
        let (mut explorer, _) = explorer_at("", MemoryTransport::serving(records));
        block_on(explorer.marker_input("PB-1", MarkerInput::MouseOver));
        assert!(explorer.map().parcel_visible("PB-1"));
        block_on(explorer.marker_input("PB-1", MarkerInput::Click));
        assert_eq!(explorer.snapshot().selection.len(), 1);
        block_on(explorer.marker_input("PB-1", MarkerInput::MouseOut));
        assert!(explorer.map().parcel_visible("PB-1"));
    }

    #[test]
    fn test_viewport_round_trips_without_loop() {
        let (mut explorer, location) = explorer_at("zoom=15", MemoryTransport::serving(payloads()));
        explorer
            .map_mut()
            .surface_mut()
            .set_view(LatLng::new(42.4, -71.1), 17, false);
        block_on(explorer.set_hash_key("view", "main")).unwrap();
        assert_eq!(explorer.state().get_int("zoom"), Some(17));
        assert_eq!(explorer.state().get_float("lat"), Some(42.4));

        let writes = location.replacement_count();
        location.navigate("view=main&lat=42.39&lng=-71.1&zoom=18");
        block_on(explorer.hash_changed());
        assert_eq!(explorer.map().surface().viewport().zoom, 18);
        assert_eq!(explorer.map().marker_state("PB-1"), Some(MarkerState::Zoomed(1)));
        assert_eq!(location.replacement_count(), writes);
    }

    #[test]
    fn test_explicit_reference_leaves_intro() {
        let (mut explorer, _) = explorer_at("view=intro", MemoryTransport::serving(payloads()));
        assert!(explorer.is_intro());
        block_on(explorer.dbl_click(LatLng::new(42.39, -71.1))).unwrap();
        assert_eq!(explorer.view(), Some(MAIN_VIEW));
        assert!(explorer.map().has_reference_marker());
        assert_eq!(explorer.snapshot().reference.set_method(), SetMethod::Map);

        block_on(explorer.reset_reference()).unwrap();
        assert!(!explorer.map().has_reference_marker());
        assert_eq!(explorer.view(), Some(MAIN_VIEW));
    }

    #[test]
    fn test_focus_request_centres_record() {
        let (mut explorer, _) = explorer_at("", MemoryTransport::serving(payloads()));
        block_on(explorer.request_focus(vec!["2".to_string()], true));
        let viewport = explorer.map().surface().viewport();
        assert_eq!(viewport.zoom, 17);
        assert!((viewport.center.lat - 42.395).abs() < 1e-9);
    }

    #[test]
    fn test_layer_toggle() {
        let (mut explorer, _) = explorer_at("", MemoryTransport::serving(payloads()));
        block_on(explorer.set_layer_shown("glx", false)).unwrap();
        assert!(!explorer.map().info_layer_visible("glx"));
        block_on(explorer.set_layer_color("glx", "red")).unwrap();
        block_on(explorer.set_layer_shown("glx", true)).unwrap();
        assert!(explorer.map().info_layer_visible("glx"));
        assert!(block_on(explorer.set_layer_shown("nope", true)).is_err());
    }

    #[test]
    fn test_snapshot_and_teardown() {
        let (mut explorer, _) = explorer_at("view=main", MemoryTransport::serving(payloads()));
        let snapshot = explorer.snapshot();
        assert_eq!(snapshot.view.as_deref(), Some("main"));
        assert_eq!(snapshot.markers.len(), 2);
        assert_eq!(snapshot.results_info, "Matched 3 proposals");
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["status"], json!("loaded"));

        explorer.teardown();
        assert_eq!(explorer.map().marker_count(), 0);
        assert!(!explorer.state().is_initialized());
    }
}
