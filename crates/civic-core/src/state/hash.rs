//! `key=value&key2=value2` encoding of the state mapping.

use crate::escape::{hash_component_escape, hash_component_unescape};

use super::types::{HashValue, StateMap};

/// Drop a single leading `#`.
pub fn strip_hash(raw: &str) -> &str {
    raw.strip_prefix('#').unwrap_or(raw)
}

/// Serialize the mapping in key order.
pub fn encode_state(state: &StateMap) -> String {
    state
        .iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                hash_component_escape(key),
                hash_component_escape(&value.encode())
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Parse a hash fragment. Empty segments and empty keys are skipped, a
/// segment without `=` is an empty string value, and the last duplicate wins.
pub fn decode_hash(raw: &str) -> StateMap {
    let mut state = StateMap::new();
    for segment in strip_hash(raw).split('&') {
        if segment.is_empty() {
            continue;
        }
        let (key, value) = segment.split_once('=').unwrap_or((segment, ""));
        let key = hash_component_unescape(key);
        if key.is_empty() {
            continue;
        }
        let value = HashValue::parse(&hash_component_unescape(value));
        state.insert(key, value);
    }
    state
}
