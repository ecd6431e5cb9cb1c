use std::future::Future;

use indexmap::IndexMap;
use serde_json::Value;

use crate::escape::hash_component_escape;
use crate::state::StateMap;

use super::errors::TransportError;

/// Query sent to the record backend: every `f.*` key, prefix stripped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchQuery {
    pub params: IndexMap<String, String>,
}

impl FetchQuery {
    pub fn from_state(state: &StateMap) -> Self {
        let params = state
            .iter()
            .filter_map(|(key, value)| {
                key.strip_prefix("f.")
                    .filter(|name| !name.is_empty())
                    .map(|name| (name.to_string(), value.encode()))
            })
            .collect();
        Self { params }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn to_query_string(&self) -> String {
        self.params
            .iter()
            .map(|(k, v)| format!("{}={}", hash_component_escape(k), hash_component_escape(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// Backend that returns raw record payloads.
pub trait Transport {
    fn fetch_records(
        &self,
        query: &FetchQuery,
    ) -> impl Future<Output = Result<Vec<Value>, TransportError>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::HashValue;

    #[test]
    fn test_query_carries_filter_keys_only() {
        let mut state = StateMap::new();
        state.insert("view".into(), HashValue::from("main"));
        state.insert("f.text".into(), HashValue::from("elm st"));
        state.insert("f.box".into(), HashValue::from("1,2,3,4"));
        state.insert("f.".into(), HashValue::from("x"));

        let query = FetchQuery::from_state(&state);
        assert_eq!(query.params.len(), 2);
        assert_eq!(query.get("text"), Some("elm st"));
        assert_eq!(query.to_query_string(), "text=elm%20st&box=1,2,3,4");
    }
}
