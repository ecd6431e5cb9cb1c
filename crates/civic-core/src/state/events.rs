use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::emitter::Topic;

use super::types::HashValue;

/// Notifications produced by the state store.
///
/// Within one transition every `KeyChanged` precedes the single `Changed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StateEvent {
    /// `change:<key>` with `(new, old)`; `None` means absent.
    KeyChanged {
        key: String,
        new: Option<HashValue>,
        old: Option<HashValue>,
    },
    /// `change`, listing every key touched by the transition.
    Changed { keys: Vec<String> },
    /// `shouldFocus`: bring these record ids into view.
    FocusRequested { ids: Vec<String>, zoom: bool },
}

impl Topic for StateEvent {
    fn topic(&self) -> Cow<'_, str> {
        match self {
            StateEvent::KeyChanged { key, .. } => Cow::Owned(format!("change:{key}")),
            StateEvent::Changed { .. } => Cow::Borrowed("change"),
            StateEvent::FocusRequested { .. } => Cow::Borrowed("shouldFocus"),
        }
    }
}

impl StateEvent {
    /// The key of a `KeyChanged` event.
    pub fn changed_key(&self) -> Option<&str> {
        match self {
            StateEvent::KeyChanged { key, .. } => Some(key),
            _ => None,
        }
    }
}
