//! Paged list model over the record collection.
//!
//! Holds which rows are rendered, not how they look.

use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

use crate::config::ListConfig;
use crate::records::{CollectionEvent, Record, RecordCollection, RecordId};

/// One rendered row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListRow {
    pub id: RecordId,
    pub reference: String,
    pub selected: bool,
    pub hovered: bool,
}

impl From<&Record> for ListRow {
    fn from(record: &Record) -> Self {
        Self {
            id: record.id.clone(),
            reference: record.reference().to_string(),
            selected: record.flags.selected,
            hovered: record.flags.hovered,
        }
    }
}

/// What a collection event did to the list.
#[derive(Debug, Clone, PartialEq)]
pub enum ListUpdate {
    Unchanged,
    /// Every row was rebuilt.
    Rendered { rows: usize },
    Appended { rows: usize },
    RowUpdated { id: RecordId },
    RowRemoved { id: RecordId },
}

#[derive(Debug)]
pub struct ListView {
    initial_count: usize,
    render_count: usize,
    render_increment: usize,
    rows: IndexMap<RecordId, ListRow>,
    shown: bool,
}

impl ListView {
    pub fn new(config: &ListConfig) -> Self {
        let render_count = config.render_count();
        Self {
            initial_count: render_count,
            render_count,
            render_increment: config.render_increment(),
            rows: IndexMap::new(),
            shown: false,
        }
    }

    pub fn rows(&self) -> impl Iterator<Item = &ListRow> {
        self.rows.values()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Rows the list may show before the next page is requested.
    pub fn render_count(&self) -> usize {
        self.render_count
    }

    pub fn is_shown(&self) -> bool {
        self.shown
    }

    pub fn show(&mut self, records: &RecordCollection) -> ListUpdate {
        self.shown = true;
        self.render(records)
    }

    pub fn hide(&mut self) {
        self.shown = false;
    }

    /// Rebuild the first `render_count` non-excluded rows.
    pub fn render(&mut self, records: &RecordCollection) -> ListUpdate {
        self.rows = records
            .visible()
            .take(self.render_count)
            .map(|record| (record.id.clone(), ListRow::from(record)))
            .collect();
        debug!(event = "core.list.render_completed", rows = self.rows.len());
        ListUpdate::Rendered {
            rows: self.rows.len(),
        }
    }

    /// Render the next page, if there is more to show.
    pub fn render_next(&mut self, records: &RecordCollection) -> ListUpdate {
        // Rows are a prefix of the visible records; removals shrink it.
        let available = records.visible().count();
        let start = self.rows.len();
        if available <= start {
            return ListUpdate::Unchanged;
        }
        let end = available.min(start + self.render_increment);
        self.rows.extend(
            records
                .visible()
                .skip(start)
                .take(end - start)
                .map(|record| (record.id.clone(), ListRow::from(record))),
        );
        self.render_count = end;
        ListUpdate::Appended {
            rows: self.rows.len() - start,
        }
    }

    /// Summary line above the list.
    pub fn results_info(&self, records: &RecordCollection) -> String {
        match records.visible().count() {
            0 => "No proposals found.".to_string(),
            1 => "Matched 1 proposal".to_string(),
            n => format!("Matched {n} proposals"),
        }
    }

    pub fn on_collection_event(
        &mut self,
        event: &CollectionEvent,
        records: &RecordCollection,
    ) -> ListUpdate {
        match event {
            CollectionEvent::Sort { .. } | CollectionEvent::Reset => {
                self.render_count = self.initial_count;
                self.render(records)
            }
            CollectionEvent::Changed { id, change } => {
                let sort_touched = records
                    .sort_spec()
                    .is_some_and(|spec| change.touches(&spec.field));
                if sort_touched || change.excluded.is_some() {
                    return self.render(records);
                }
                match (self.rows.get_mut(id), records.get(id)) {
                    (Some(row), Some(record)) => {
                        *row = ListRow::from(record);
                        ListUpdate::RowUpdated { id: id.clone() }
                    }
                    _ => ListUpdate::Unchanged,
                }
            }
            CollectionEvent::Added { id } => {
                let fits = self.rows.len() < self.render_count;
                let visible = records.get(id).is_some_and(|r| !r.flags.excluded);
                if fits && visible {
                    self.render(records)
                } else {
                    ListUpdate::Unchanged
                }
            }
            CollectionEvent::Removed { record } => match self.rows.shift_remove(&record.id) {
                Some(_) => ListUpdate::RowRemoved {
                    id: record.id.clone(),
                },
                None => ListUpdate::Unchanged,
            },
            CollectionEvent::Fetching
            | CollectionEvent::FetchingComplete { .. }
            | CollectionEvent::FetchingFailed { .. } => ListUpdate::Unchanged,
        }
    }
}
