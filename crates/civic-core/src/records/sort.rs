use std::cmp::Ordering;

use serde_json::Value;

use super::types::Record;

/// Active ordering, parsed from the `sort` hash key (`-field` = descending).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub field: String,
    pub descending: bool,
}

#[derive(Debug, Clone, PartialEq)]
enum SortKey {
    Num(f64),
    Text(String),
}

impl SortSpec {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let (field, descending) = match raw.strip_prefix('-') {
            Some(field) => (field, true),
            None => (raw, false),
        };
        if field.is_empty() {
            return None;
        }
        Some(Self {
            field: field.to_string(),
            descending,
        })
    }

    /// Inverse of [`SortSpec::parse`].
    pub fn encode(&self) -> String {
        if self.descending {
            format!("-{}", self.field)
        } else {
            self.field.clone()
        }
    }

    /// Records without a value for the field sort last in both directions.
    pub fn compare(&self, a: &Record, b: &Record) -> Ordering {
        match (sort_key(a, &self.field), sort_key(b, &self.field)) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(x), Some(y)) => {
                let ordering = compare_keys(&x, &y);
                if self.descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            }
        }
    }
}

fn sort_key(record: &Record, field: &str) -> Option<SortKey> {
    match field {
        "id" => return Some(SortKey::Text(record.id.as_str().to_lowercase())),
        "caseNumber" | "case_number" => {
            return record
                .case_number
                .as_ref()
                .map(|c| SortKey::Text(c.to_lowercase()));
        }
        _ => {}
    }
    match record.field(field)? {
        Value::Number(n) => n.as_f64().map(SortKey::Num),
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(SortKey::Text(s.to_lowercase())),
        Value::Bool(b) => Some(SortKey::Num(if *b { 1.0 } else { 0.0 })),
        _ => None,
    }
}

/// Numbers order before text.
fn compare_keys(a: &SortKey, b: &SortKey) -> Ordering {
    match (a, b) {
        (SortKey::Num(x), SortKey::Num(y)) => x.total_cmp(y),
        (SortKey::Text(x), SortKey::Text(y)) => x.cmp(y),
        (SortKey::Num(_), SortKey::Text(_)) => Ordering::Less,
        (SortKey::Text(_), SortKey::Num(_)) => Ordering::Greater,
    }
}
