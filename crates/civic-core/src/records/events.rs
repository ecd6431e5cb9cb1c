use std::borrow::Cow;

use crate::emitter::Topic;

use super::types::{Record, RecordId};

/// What changed on one record. `None` flag fields were not touched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordChange {
    pub selected: Option<bool>,
    pub hovered: Option<bool>,
    pub excluded: Option<bool>,
    /// Domain attributes replaced by a re-fetch.
    pub attributes: Vec<String>,
}

impl RecordChange {
    pub fn is_empty(&self) -> bool {
        self.selected.is_none()
            && self.hovered.is_none()
            && self.excluded.is_none()
            && self.attributes.is_empty()
    }

    /// True when the attribute (or flag, by its `_` name) was touched.
    pub fn touches(&self, name: &str) -> bool {
        match name {
            "_selected" => self.selected.is_some(),
            "_hovered" => self.hovered.is_some(),
            "_excluded" => self.excluded.is_some(),
            _ => self.attributes.iter().any(|a| a == name),
        }
    }
}

/// Notifications produced by the record collection.
#[derive(Debug, Clone, PartialEq)]
pub enum CollectionEvent {
    Fetching,
    FetchingComplete { count: usize },
    FetchingFailed { error: String },
    Added { id: RecordId },
    Removed { record: Box<Record> },
    Changed { id: RecordId, change: RecordChange },
    /// Order changed in place; `field` is the active sort field.
    Sort { field: Option<String> },
    /// Contents replaced wholesale.
    Reset,
}

impl Topic for CollectionEvent {
    fn topic(&self) -> Cow<'_, str> {
        Cow::Borrowed(match self {
            CollectionEvent::Fetching => "fetching",
            CollectionEvent::FetchingComplete { .. } => "fetchingComplete",
            CollectionEvent::FetchingFailed { .. } => "fetchingFailed",
            CollectionEvent::Added { .. } => "add",
            CollectionEvent::Removed { .. } => "remove",
            CollectionEvent::Changed { .. } => "change",
            CollectionEvent::Sort { .. } => "sort",
            CollectionEvent::Reset => "reset",
        })
    }
}
