use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::geo::{Geometry, LatLng};

use super::errors::RecordError;

/// Record identifier. Numeric JSON ids are normalised to their text form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Transient view flags. Never serialized, never read from payloads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordFlags {
    pub selected: bool,
    pub hovered: bool,
    pub excluded: bool,
}

/// A permit, proposal or project shown on the map and in the list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub id: RecordId,
    #[serde(rename = "caseNumber", skip_serializing_if = "Option::is_none")]
    pub case_number: Option<String>,
    /// `None` when the payload had no usable coordinates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<LatLng>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parcel: Option<Geometry>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    #[serde(skip)]
    pub flags: RecordFlags,
}

const RESERVED_KEYS: [&str; 5] = ["id", "caseNumber", "case_number", "location", "parcel"];

impl Record {
    pub fn new(id: impl Into<RecordId>) -> Self {
        Self {
            id: id.into(),
            case_number: None,
            location: None,
            parcel: None,
            fields: Map::new(),
            flags: RecordFlags::default(),
        }
    }

    pub fn with_location(mut self, lat: f64, lng: f64) -> Self {
        self.location = Some(LatLng::new(lat, lng)).filter(LatLng::is_valid);
        self
    }

    pub fn with_case_number(mut self, case_number: impl Into<String>) -> Self {
        self.case_number = Some(case_number.into());
        self
    }

    pub fn with_field(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    pub fn with_parcel(mut self, parcel: Geometry) -> Self {
        self.parcel = Some(parcel);
        self
    }

    /// Build a record from a backend payload.
    ///
    /// Keys starting with `_` are dropped so view flags cannot be injected.
    pub fn from_json(value: Value) -> Result<Self, RecordError> {
        let Value::Object(mut object) = value else {
            return Err(RecordError::InvalidPayload {
                message: "record must be a JSON object".to_string(),
            });
        };

        let id = match object.get("id") {
            Some(Value::String(s)) if !s.is_empty() => RecordId::new(s.clone()),
            Some(Value::Number(n)) => RecordId::new(n.to_string()),
            _ => return Err(RecordError::MissingId),
        };

        let case_number = ["caseNumber", "case_number"]
            .iter()
            .find_map(|key| object.get(*key).and_then(Value::as_str))
            .map(str::to_owned);

        let location = object.get("location").and_then(parse_location);

        let parcel = object.remove("parcel").and_then(|raw| {
            let raw = match raw {
                Value::Object(mut feature) if feature.contains_key("geometry") => {
                    feature.remove("geometry").unwrap_or(Value::Null)
                }
                other => other,
            };
            if raw.is_null() {
                return None;
            }
            match serde_json::from_value::<Geometry>(raw) {
                Ok(geometry) => Some(geometry),
                Err(e) => {
                    debug!(event = "core.records.parcel_ignored", id = %id, error = %e);
                    None
                }
            }
        });

        let fields = object
            .into_iter()
            .filter(|(key, _)| !key.starts_with('_') && !RESERVED_KEYS.contains(&key.as_str()))
            .collect();

        Ok(Self {
            id,
            case_number,
            location,
            parcel,
            fields,
            flags: RecordFlags::default(),
        })
    }

    /// Key used by side tables: the case number, or the id when absent.
    pub fn reference(&self) -> &str {
        self.case_number.as_deref().unwrap_or(self.id.as_str())
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Text value of a domain field.
    pub fn text_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    pub fn is_mapped(&self) -> bool {
        self.location.is_some()
    }

    /// Copy attributes from a fresher version of the same record, keeping
    /// flags. Returns the names of attributes that changed.
    pub fn update_from(&mut self, fresh: Record) -> Vec<String> {
        let mut changed = Vec::new();
        if self.case_number != fresh.case_number {
            changed.push("caseNumber".to_string());
        }
        if self.location != fresh.location {
            changed.push("location".to_string());
        }
        if self.parcel != fresh.parcel {
            changed.push("parcel".to_string());
        }
        for (key, value) in &fresh.fields {
            if self.fields.get(key) != Some(value) {
                changed.push(key.clone());
            }
        }
        for key in self.fields.keys() {
            if !fresh.fields.contains_key(key) {
                changed.push(key.clone());
            }
        }

        self.case_number = fresh.case_number;
        self.location = fresh.location;
        self.parcel = fresh.parcel;
        self.fields = fresh.fields;
        changed
    }
}

fn parse_location(value: &Value) -> Option<LatLng> {
    let lat = value.get("lat").and_then(Value::as_f64)?;
    let lng = value
        .get("lng")
        .or_else(|| value.get("long"))
        .or_else(|| value.get("lon"))
        .and_then(Value::as_f64)?;
    Some(LatLng::new(lat, lng)).filter(LatLng::is_valid)
}
