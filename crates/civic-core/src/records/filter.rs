use crate::geo::{Bounds, box_string_to_bounds};
use crate::state::StateMap;

use super::types::Record;

/// Fields searched by `f.text`, besides the case number.
const TEXT_FIELDS: [&str; 3] = ["address", "summary", "description"];

/// Active filter, derived from the `f.*` hash keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
    /// `f.box`: only mapped records inside the rectangle.
    pub bounds: Option<Bounds>,
    /// `f.text`: lowercase substring.
    pub text: Option<String>,
    /// `f.status`: lowercase accepted statuses.
    pub statuses: Vec<String>,
}

impl FilterSpec {
    pub fn from_state(state: &StateMap) -> Self {
        let text_of = |key: &str| state.get(key).map(|v| v.encode());

        let bounds = text_of("f.box").and_then(|raw| box_string_to_bounds(&raw));
        let text = text_of("f.text")
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty());
        let statuses = text_of("f.status")
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_lowercase())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            bounds,
            text,
            statuses,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_none() && self.text.is_none() && self.statuses.is_empty()
    }

    /// Whether the record is hidden by this filter.
    pub fn excludes(&self, record: &Record) -> bool {
        if let Some(bounds) = &self.bounds {
            match record.location {
                Some(location) if bounds.contains_point(location) => {}
                _ => return true,
            }
        }

        if let Some(text) = &self.text {
            let matched = record
                .case_number
                .iter()
                .map(String::as_str)
                .chain(TEXT_FIELDS.iter().filter_map(|f| record.text_field(f)))
                .any(|haystack| haystack.to_lowercase().contains(text.as_str()));
            if !matched {
                return true;
            }
        }

        if !self.statuses.is_empty() {
            let status = record.text_field("status").map(str::to_lowercase);
            match status {
                Some(status) if self.statuses.contains(&status) => {}
                _ => return true,
            }
        }

        false
    }
}
