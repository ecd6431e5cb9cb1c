use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A primitive value stored under one hash key.
///
/// Values are canonical: [`HashValue::parse`] turns `"true"`/`"false"` into
/// `Bool`, text that is exactly the shortest rendering of a finite float into
/// `Num`, and everything else into `Str`. Constructing from text always goes
/// through `parse`, so `encode → decode` reproduces the same value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HashValue {
    Bool(bool),
    Num(f64),
    Str(String),
}

impl HashValue {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "true" => HashValue::Bool(true),
            "false" => HashValue::Bool(false),
            _ => match raw.parse::<f64>() {
                Ok(n) if n.is_finite() && n.to_string() == raw => HashValue::Num(n),
                _ => HashValue::Str(raw.to_string()),
            },
        }
    }

    /// Only finite numbers can be written to the hash.
    pub fn is_storable(&self) -> bool {
        match self {
            HashValue::Num(n) => n.is_finite(),
            _ => true,
        }
    }

    /// Floating point reading; unparsable text is `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            HashValue::Num(n) => Some(*n).filter(|n| n.is_finite()),
            HashValue::Str(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            HashValue::Bool(_) => None,
        }
    }

    /// Integer reading, truncating toward zero.
    pub fn as_i64(&self) -> Option<i64> {
        self.as_f64().map(|n| n.trunc() as i64)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            HashValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            HashValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The value a reader of the encoded hash will see.
    pub fn canonical(&self) -> Self {
        HashValue::parse(&self.encode())
    }

    /// Rendering used inside the hash (before escaping).
    pub fn encode(&self) -> String {
        match self {
            HashValue::Bool(b) => b.to_string(),
            HashValue::Num(n) => n.to_string(),
            HashValue::Str(s) => s.clone(),
        }
    }
}

impl fmt::Display for HashValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl From<&str> for HashValue {
    fn from(value: &str) -> Self {
        HashValue::parse(value)
    }
}

impl From<String> for HashValue {
    fn from(value: String) -> Self {
        HashValue::parse(&value)
    }
}

impl From<f64> for HashValue {
    fn from(value: f64) -> Self {
        HashValue::Num(value)
    }
}

impl From<i64> for HashValue {
    fn from(value: i64) -> Self {
        HashValue::Num(value as f64)
    }
}

impl From<i32> for HashValue {
    fn from(value: i32) -> Self {
        HashValue::Num(f64::from(value))
    }
}

impl From<u8> for HashValue {
    fn from(value: u8) -> Self {
        HashValue::Num(f64::from(value))
    }
}

impl From<bool> for HashValue {
    fn from(value: bool) -> Self {
        HashValue::Bool(value)
    }
}

/// The full key/value mapping, in insertion order.
pub type StateMap = IndexMap<String, HashValue>;

/// A partial update: `Some` sets a key, `None` removes it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HashPatch {
    entries: IndexMap<String, Option<HashValue>>,
}

impl HashPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<HashValue>) -> Self {
        self.entries.insert(key.into(), Some(value.into()));
        self
    }

    pub fn unset(mut self, key: impl Into<String>) -> Self {
        self.entries.insert(key.into(), None);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Option<HashValue>) {
        self.entries.insert(key.into(), value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Option<HashValue>)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Mutations accepted by the state store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Set (`Some`) or remove (`None`) one key.
    SetKey {
        key: String,
        value: Option<HashValue>,
    },
    /// Merge several keys atomically. Silent updates rewrite the hash but
    /// notify nobody.
    Extend { patch: HashPatch, silent: bool },
    /// The location's hash was changed from outside (back/forward, link).
    HashChanged,
    /// Ask views to bring some records into view. Not persisted.
    RequestFocus { ids: Vec<String>, zoom: bool },
}
