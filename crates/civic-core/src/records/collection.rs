use indexmap::{IndexMap, IndexSet};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::emitter::{Emitter, SubscriptionId};

use super::errors::TransportError;
use super::events::{CollectionEvent, RecordChange};
use super::filter::FilterSpec;
use super::sort::SortSpec;
use super::transport::{FetchQuery, Transport};
use super::types::{Record, RecordId};

/// Proof of a started fetch. Only the most recent ticket can complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    generation: u64,
}

/// Ordered, observable set of records.
///
/// Every mutating method returns the events it delivered, in delivery order.
#[derive(Debug, Default)]
pub struct RecordCollection {
    records: IndexMap<RecordId, Record>,
    selection: IndexSet<RecordId>,
    sort: Option<SortSpec>,
    filter: FilterSpec,
    generation: u64,
    fetching: bool,
    emitter: Emitter<CollectionEvent>,
}

impl RecordCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &RecordId) -> Option<&Record> {
        self.records.get(id)
    }

    /// Records in current order, excluded ones included.
    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }

    /// Records not hidden by the filter, in current order.
    pub fn visible(&self) -> impl Iterator<Item = &Record> {
        self.records.values().filter(|r| !r.flags.excluded)
    }

    /// Find a record by its reference key.
    pub fn by_reference(&self, reference: &str) -> Option<&Record> {
        self.records.values().find(|r| r.reference() == reference)
    }

    pub fn sort_spec(&self) -> Option<&SortSpec> {
        self.sort.as_ref()
    }

    pub fn filter_spec(&self) -> &FilterSpec {
        &self.filter
    }

    pub fn is_fetching(&self) -> bool {
        self.fetching
    }

    pub fn on<F>(&mut self, topic: &str, handler: F) -> SubscriptionId
    where
        F: FnMut(&CollectionEvent) + 'static,
    {
        self.emitter.subscribe(topic, handler)
    }

    pub fn on_any<F>(&mut self, handler: F) -> SubscriptionId
    where
        F: FnMut(&CollectionEvent) + 'static,
    {
        self.emitter.subscribe_all(handler)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.emitter.unsubscribe(id)
    }

    /// Start a fetch. A later `begin_fetch` supersedes this one.
    pub fn begin_fetch(&mut self) -> (FetchTicket, Vec<CollectionEvent>) {
        self.generation += 1;
        self.fetching = true;
        debug!(event = "core.records.fetch_started", generation = self.generation);
        let events = vec![CollectionEvent::Fetching];
        self.emitter.emit_all(&events);
        (
            FetchTicket {
                generation: self.generation,
            },
            events,
        )
    }

    /// Finish a fetch. Completions of superseded tickets are dropped.
    pub fn complete_fetch(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<Value>, TransportError>,
    ) -> Vec<CollectionEvent> {
        if ticket.generation != self.generation {
            debug!(
                event = "core.records.fetch_discarded",
                generation = ticket.generation,
                latest = self.generation
            );
            return Vec::new();
        }
        self.fetching = false;

        let payloads = match result {
            Ok(payloads) => payloads,
            Err(e) => {
                warn!(event = "core.records.fetch_failed", error = %e);
                let events = vec![CollectionEvent::FetchingFailed {
                    error: e.to_string(),
                }];
                self.emitter.emit_all(&events);
                return events;
            }
        };

        let records: Vec<Record> = payloads
            .into_iter()
            .filter_map(|payload| match Record::from_json(payload) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(event = "core.records.payload_skipped", error = %e);
                    None
                }
            })
            .collect();

        let mut events = self.set(records);
        let complete = CollectionEvent::FetchingComplete {
            count: self.records.len(),
        };
        self.emitter.emit(&complete);
        events.push(complete);
        info!(event = "core.records.fetch_completed", count = self.records.len());
        events
    }

    /// Fetch through a transport and apply the result.
    pub async fn fetch<T: Transport>(
        &mut self,
        transport: &T,
        query: &FetchQuery,
    ) -> Vec<CollectionEvent> {
        let (ticket, mut events) = self.begin_fetch();
        let result = transport.fetch_records(query).await;
        events.extend(self.complete_fetch(ticket, result));
        events
    }

    /// Merge a fresh list: unseen ids are added, missing ids removed and
    /// known ids updated in place. Selection and filter flags are recomputed,
    /// hover is cleared.
    pub fn set(&mut self, fresh: Vec<Record>) -> Vec<CollectionEvent> {
        let mut events = Vec::new();

        let mut incoming: IndexMap<RecordId, Record> = IndexMap::new();
        for record in fresh {
            incoming.insert(record.id.clone(), record);
        }

        let stale: Vec<RecordId> = self
            .records
            .keys()
            .filter(|id| !incoming.contains_key(*id))
            .cloned()
            .collect();
        for id in stale {
            if let Some(record) = self.records.shift_remove(&id) {
                events.push(CollectionEvent::Removed {
                    record: Box::new(record),
                });
            }
        }

        let mut next: IndexMap<RecordId, Record> = IndexMap::with_capacity(incoming.len());
        for (id, fresh) in incoming {
            match self.records.shift_remove(&id) {
                Some(mut existing) => {
                    let attributes = existing.update_from(fresh);
                    let mut change = RecordChange {
                        attributes,
                        ..Default::default()
                    };
                    if existing.flags.hovered {
                        existing.flags.hovered = false;
                        change.hovered = Some(false);
                    }
                    let selected = self.selection.contains(&id);
                    if existing.flags.selected != selected {
                        existing.flags.selected = selected;
                        change.selected = Some(selected);
                    }
                    next.insert(id.clone(), existing);
                    if !change.is_empty() {
                        events.push(CollectionEvent::Changed { id, change });
                    }
                }
                None => {
                    let mut record = fresh;
                    record.flags.selected = self.selection.contains(&id);
                    record.flags.hovered = false;
                    record.flags.excluded = self.filter.excludes(&record);
                    next.insert(id.clone(), record);
                    events.push(CollectionEvent::Added { id });
                }
            }
        }
        self.records = next;

        if let Some(spec) = &self.sort {
            self.records.sort_by(|_, a, _, b| spec.compare(a, b));
            events.push(CollectionEvent::Sort {
                field: Some(spec.field.clone()),
            });
        }
        self.emitter.emit_all(&events);

        let filter = self.filter.clone();
        events.extend(self.apply_filter(filter));
        events
    }

    /// Replace the contents wholesale.
    pub fn reset(&mut self, records: Vec<Record>) -> Vec<CollectionEvent> {
        self.records = records
            .into_iter()
            .map(|mut record| {
                record.flags.selected = self.selection.contains(&record.id);
                record.flags.hovered = false;
                record.flags.excluded = self.filter.excludes(&record);
                (record.id.clone(), record)
            })
            .collect();
        if let Some(spec) = &self.sort {
            self.records.sort_by(|_, a, _, b| spec.compare(a, b));
        }
        debug!(event = "core.records.reset_completed", count = self.records.len());
        let events = vec![CollectionEvent::Reset];
        self.emitter.emit_all(&events);
        events
    }

    pub fn set_selection(&mut self, ids: &[RecordId]) -> Vec<CollectionEvent> {
        self.selection = ids.iter().cloned().collect();
        self.sync_selection_flags()
    }

    pub fn add_to_selection(&mut self, id: &RecordId) -> Vec<CollectionEvent> {
        self.selection.insert(id.clone());
        self.sync_selection_flags()
    }

    pub fn remove_from_selection(&mut self, id: &RecordId) -> Vec<CollectionEvent> {
        self.selection.shift_remove(id);
        self.sync_selection_flags()
    }

    /// Selected records present in the collection, in selection order.
    pub fn get_selection(&self) -> Vec<&Record> {
        self.selection
            .iter()
            .filter_map(|id| self.records.get(id))
            .collect()
    }

    pub fn set_hovered(&mut self, id: &RecordId, hovered: bool) -> Vec<CollectionEvent> {
        let Some(record) = self.records.get_mut(id) else {
            debug!(event = "core.records.hover_ignored", id = %id, reason = "unknown_id");
            return Vec::new();
        };
        if record.flags.hovered == hovered {
            return Vec::new();
        }
        record.flags.hovered = hovered;
        let events = vec![CollectionEvent::Changed {
            id: id.clone(),
            change: RecordChange {
                hovered: Some(hovered),
                ..Default::default()
            },
        }];
        self.emitter.emit_all(&events);
        events
    }

    /// Stable re-sort in place. `None` keeps the current order.
    pub fn set_sort(&mut self, spec: Option<SortSpec>) -> Vec<CollectionEvent> {
        self.sort = spec;
        if let Some(spec) = &self.sort {
            self.records.sort_by(|_, a, _, b| spec.compare(a, b));
        }
        debug!(
            event = "core.records.sort_applied",
            field = self.sort.as_ref().map(|s| s.field.as_str()).unwrap_or("")
        );
        let events = vec![CollectionEvent::Sort {
            field: self.sort.as_ref().map(|s| s.field.clone()),
        }];
        self.emitter.emit_all(&events);
        events
    }

    /// Recompute every `excluded` flag.
    pub fn apply_filter(&mut self, filter: FilterSpec) -> Vec<CollectionEvent> {
        let mut events = Vec::new();
        for (id, record) in self.records.iter_mut() {
            let excluded = filter.excludes(record);
            if record.flags.excluded != excluded {
                record.flags.excluded = excluded;
                events.push(CollectionEvent::Changed {
                    id: id.clone(),
                    change: RecordChange {
                        excluded: Some(excluded),
                        ..Default::default()
                    },
                });
            }
        }
        self.filter = filter;
        if !events.is_empty() {
            debug!(event = "core.records.filter_applied", changed = events.len());
        }
        self.emitter.emit_all(&events);
        events
    }

    fn sync_selection_flags(&mut self) -> Vec<CollectionEvent> {
        let mut events = Vec::new();
        for (id, record) in self.records.iter_mut() {
            let selected = self.selection.contains(id);
            if record.flags.selected != selected {
                record.flags.selected = selected;
                events.push(CollectionEvent::Changed {
                    id: id.clone(),
                    change: RecordChange {
                        selected: Some(selected),
                        ..Default::default()
                    },
                });
            }
        }
        self.emitter.emit_all(&events);
        events
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use futures::executor::block_on;
    use serde_json::json;

    use super::*;
    use crate::emitter::Topic;
    use crate::state::{HashValue, StateMap};

    fn ids(collection: &RecordCollection) -> Vec<&str> {
        collection.iter().map(|r| r.id.as_str()).collect()
    }

    fn topics(events: &[CollectionEvent]) -> Vec<String> {
        events.iter().map(|e| e.topic().into_owned()).collect()
    }

    struct StaticTransport(Result<Vec<Value>, TransportError>);

    impl Transport for StaticTransport {
        async fn fetch_records(&self, _query: &FetchQuery) -> Result<Vec<Value>, TransportError> {
            self.0.clone()
        }
    }

    #[test]
    fn test_fetch_adds_records_and_completes() {
        let mut collection = RecordCollection::new();
        let transport = StaticTransport(Ok(vec![
            json!({"id": "a", "location": {"lat": 42.39, "lng": -71.1}}),
            json!({"id": "b"}),
            json!({"caseNumber": "no id"}),
        ]));

        let events = block_on(collection.fetch(&transport, &FetchQuery::default()));
        assert_eq!(
            topics(&events),
            vec!["fetching", "add", "add", "fetchingComplete"]
        );
        assert_eq!(ids(&collection), vec!["a", "b"]);
        assert!(!collection.is_fetching());
    }

    #[test]
    fn test_fetch_failure_keeps_contents() {
        let mut collection = RecordCollection::new();
        collection.set(vec![Record::new("a")]);
        let transport = StaticTransport(Err(TransportError::Unavailable {
            message: "offline".to_string(),
        }));

        let events = block_on(collection.fetch(&transport, &FetchQuery::default()));
        assert_eq!(topics(&events), vec!["fetching", "fetchingFailed"]);
        assert_eq!(collection.len(), 1);
    }

    #[test]
    fn test_stale_fetch_is_discarded() {
        let mut collection = RecordCollection::new();
        let (first, _) = collection.begin_fetch();
        let (second, _) = collection.begin_fetch();

        let applied = collection.complete_fetch(second, Ok(vec![json!({"id": "new"})]));
        assert!(!applied.is_empty());
        let dropped = collection.complete_fetch(first, Ok(vec![json!({"id": "old"})]));
        assert!(dropped.is_empty());
        assert_eq!(ids(&collection), vec!["new"]);
    }

    #[test]
    fn test_set_semantics_and_flag_recompute() {
        let mut collection = RecordCollection::new();
        collection.set(vec![
            Record::new("a").with_field("price", 1),
            Record::new("b"),
        ]);
        collection.set_selection(&[RecordId::from("a")]);
        collection.set_hovered(&RecordId::from("a"), true);

        let events = collection.set(vec![
            Record::new("a").with_field("price", 2),
            Record::new("c"),
        ]);
        assert_eq!(topics(&events), vec!["remove", "change", "add"]);
        let CollectionEvent::Changed { change, .. } = &events[1] else {
            panic!("expected change");
        };
        assert_eq!(change.attributes, vec!["price"]);
        assert_eq!(change.hovered, Some(false));

        let a = collection.get(&RecordId::from("a")).unwrap();
        assert!(a.flags.selected);
        assert!(!a.flags.hovered);
    }

    #[test]
    fn test_sort_is_stable_and_emits_sort() {
        let mut collection = RecordCollection::new();
        collection.set(vec![
            Record::new("a").with_field("price", 5),
            Record::new("b"),
            Record::new("c").with_field("price", 9),
            Record::new("d").with_field("price", 5),
        ]);

        let events = collection.set_sort(SortSpec::parse("-price"));
        assert_eq!(topics(&events), vec!["sort"]);
        assert_eq!(ids(&collection), vec!["c", "a", "d", "b"]);

        collection.set_sort(SortSpec::parse("price"));
        assert_eq!(ids(&collection), vec!["a", "d", "c", "b"]);
    }

    #[test]
    fn test_filter_sets_excluded_without_removal() {
        let mut collection = RecordCollection::new();
        collection.set(vec![
            Record::new("in").with_location(42.39, -71.1),
            Record::new("out").with_location(42.0, -71.1),
            Record::new("unmapped"),
        ]);

        let mut state = StateMap::new();
        state.insert("f.box".into(), HashValue::from("42.38,-71.11,42.40,-71.09"));
        let events = collection.apply_filter(FilterSpec::from_state(&state));
        assert_eq!(events.len(), 2);
        assert_eq!(collection.len(), 3);
        assert_eq!(collection.visible().count(), 1);

        assert!(collection.apply_filter(FilterSpec::from_state(&state)).is_empty());
        let cleared = collection.apply_filter(FilterSpec::default());
        assert_eq!(cleared.len(), 2);
    }

    #[test]
    fn test_new_records_get_filter_flag_before_add() {
        let mut collection = RecordCollection::new();
        let mut state = StateMap::new();
        state.insert("f.status".into(), HashValue::from("open"));
        collection.apply_filter(FilterSpec::from_state(&state));

        let seen = Rc::new(RefCell::new(Vec::new()));
        {
            let seen = seen.clone();
            collection.on("add", move |event| {
                if let CollectionEvent::Added { id } = event {
                    seen.borrow_mut().push(id.clone());
                }
            });
        }
        let events = collection.set(vec![Record::new("x").with_field("status", "closed")]);
        assert_eq!(topics(&events), vec!["add"]);
        assert!(collection.get(&RecordId::from("x")).unwrap().flags.excluded);
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn test_selection_round_trip() {
        let mut collection = RecordCollection::new();
        collection.set(vec![Record::new("a"), Record::new("b"), Record::new("c")]);

        let events = collection.set_selection(&[RecordId::from("c"), RecordId::from("a")]);
        assert_eq!(events.len(), 2);
        let selected: Vec<_> = collection
            .get_selection()
            .iter()
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(selected, vec!["c", "a"]);

        collection.add_to_selection(&RecordId::from("b"));
        collection.remove_from_selection(&RecordId::from("c"));
        let selected: Vec<_> = collection
            .get_selection()
            .iter()
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(selected, vec!["a", "b"]);
        assert!(collection.set_selection(&[RecordId::from("a"), RecordId::from("b")]).is_empty());
    }

    #[test]
    fn test_reset_replaces_contents() {
        let mut collection = RecordCollection::new();
        collection.set(vec![Record::new("a")]);
        let events = collection.reset(vec![Record::new("z"), Record::new("y")]);
        assert_eq!(topics(&events), vec!["reset"]);
        assert_eq!(ids(&collection), vec!["z", "y"]);
        assert!(collection.by_reference("y").is_some());
    }
}
