use std::fmt;

use tracing::{debug, info, warn};

use crate::emitter::{Emitter, SubscriptionId};

use super::errors::StateError;
use super::events::StateEvent;
use super::hash::{decode_hash, encode_state, strip_hash};
use super::location::HashLocation;
use super::store::Store;
use super::types::{Command, HashPatch, HashValue, StateMap};

/// `(key, new, old)` for one touched key.
type KeyChange = (String, Option<HashValue>, Option<HashValue>);

/// Application state kept in the URL hash.
///
/// The hash is the single source of truth: every non-silent transition
/// rewrites it (replace, not push) and then notifies `change:<key>`
/// subscribers followed by `change` subscribers.
pub struct AppState {
    current: StateMap,
    previous: StateMap,
    /// Last fragment written or observed, without `#`.
    hash: String,
    location: Box<dyn HashLocation>,
    emitter: Emitter<StateEvent>,
    initialized: bool,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("current", &self.current)
            .field("hash", &self.hash)
            .field("initialized", &self.initialized)
            .field("emitter", &self.emitter)
            .finish()
    }
}

impl AppState {
    pub fn new(location: Box<dyn HashLocation>) -> Self {
        Self {
            current: StateMap::new(),
            previous: StateMap::new(),
            hash: String::new(),
            location,
            emitter: Emitter::new(),
            initialized: false,
        }
    }

    /// Read the location and announce every initial key. Calling twice is a
    /// no-op.
    pub fn init(&mut self) -> Vec<StateEvent> {
        if self.initialized {
            debug!(event = "core.state.init_skipped", reason = "already_initialized");
            return Vec::new();
        }
        self.initialized = true;

        let raw = self.location.hash();
        self.hash = strip_hash(&raw).to_string();
        self.previous = StateMap::new();
        self.current = decode_hash(&self.hash);

        let mut events: Vec<StateEvent> = self
            .current
            .iter()
            .map(|(key, value)| StateEvent::KeyChanged {
                key: key.clone(),
                new: Some(value.clone()),
                old: None,
            })
            .collect();
        if !events.is_empty() {
            events.push(StateEvent::Changed {
                keys: self.current.keys().cloned().collect(),
            });
        }

        info!(
            event = "core.state.init_completed",
            hash = %self.hash,
            key_count = self.current.len()
        );
        self.emitter.emit_all(&events);
        events
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Drop all subscriptions. The mapping is kept so a later `init` is a
    /// fresh start from the location.
    pub fn teardown(&mut self) {
        let listeners = self.emitter.len();
        self.emitter.clear();
        self.initialized = false;
        info!(event = "core.state.teardown_completed", listeners = listeners);
    }

    /// A copy of the current mapping.
    pub fn get_state(&self) -> StateMap {
        self.current.clone()
    }

    /// A copy of the mapping before the most recent transition.
    pub fn previous_state(&self) -> StateMap {
        self.previous.clone()
    }

    pub fn get_key(&self, key: &str) -> Option<&HashValue> {
        self.current.get(key)
    }

    /// Text reading of a key; numbers and booleans are rendered.
    pub fn get_text(&self, key: &str) -> Option<String> {
        self.current.get(key).map(HashValue::encode)
    }

    pub fn get_float(&self, key: &str) -> Option<f64> {
        self.current.get(key).and_then(HashValue::as_f64)
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.current.get(key).and_then(HashValue::as_i64)
    }

    /// The current fragment, without `#`.
    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn set_hash_key(
        &mut self,
        key: &str,
        value: impl Into<HashValue>,
    ) -> Result<Vec<StateEvent>, StateError> {
        self.dispatch(Command::SetKey {
            key: key.to_string(),
            value: Some(value.into()),
        })
    }

    pub fn remove_hash_key(&mut self, key: &str) -> Result<Vec<StateEvent>, StateError> {
        self.dispatch(Command::SetKey {
            key: key.to_string(),
            value: None,
        })
    }

    pub fn extend_hash(
        &mut self,
        patch: HashPatch,
        silent: bool,
    ) -> Result<Vec<StateEvent>, StateError> {
        self.dispatch(Command::Extend { patch, silent })
    }

    /// Re-read the location after an external navigation.
    pub fn handle_hash_change(&mut self) -> Vec<StateEvent> {
        let raw = self.location.hash();
        let observed = strip_hash(&raw);
        if observed == self.hash {
            debug!(event = "core.state.hash_change_ignored", reason = "own_write");
            return Vec::new();
        }

        let next = decode_hash(observed);
        let mut changes: Vec<KeyChange> = Vec::new();
        for (key, value) in &next {
            let old = self.current.get(key);
            if old != Some(value) {
                changes.push((key.clone(), Some(value.clone()), old.cloned()));
            }
        }
        for (key, value) in &self.current {
            if !next.contains_key(key) {
                changes.push((key.clone(), None, Some(value.clone())));
            }
        }

        self.hash = observed.to_string();
        if changes.is_empty() {
            debug!(event = "core.state.hash_change_ignored", reason = "same_values");
            return Vec::new();
        }

        self.previous = std::mem::replace(&mut self.current, next);
        info!(
            event = "core.state.hash_change_applied",
            hash = %self.hash,
            changed = changes.len()
        );
        self.notify(changes)
    }

    /// Broadcast `shouldFocus`. The mapping is not touched.
    pub fn request_focus(&mut self, ids: Vec<String>, zoom: bool) -> Vec<StateEvent> {
        let events = vec![StateEvent::FocusRequested { ids, zoom }];
        self.emitter.emit_all(&events);
        events
    }

    /// Subscribe to one key with a `(new, old)` handler.
    pub fn on_state_key_change<F>(&mut self, key: &str, mut handler: F) -> SubscriptionId
    where
        F: FnMut(Option<&HashValue>, Option<&HashValue>) + 'static,
    {
        self.emitter
            .subscribe(format!("change:{key}"), move |event: &StateEvent| {
                if let StateEvent::KeyChanged { new, old, .. } = event {
                    handler(new.as_ref(), old.as_ref());
                }
            })
    }

    /// Subscribe to the aggregate `change` event.
    pub fn on_change<F>(&mut self, mut handler: F) -> SubscriptionId
    where
        F: FnMut(&[String]) + 'static,
    {
        self.emitter.subscribe("change", move |event: &StateEvent| {
            if let StateEvent::Changed { keys } = event {
                handler(keys);
            }
        })
    }

    /// Subscribe by raw topic name.
    pub fn on<F>(&mut self, topic: &str, handler: F) -> SubscriptionId
    where
        F: FnMut(&StateEvent) + 'static,
    {
        self.emitter.subscribe(topic, handler)
    }

    /// Subscribe to every event the store emits.
    pub fn on_any<F>(&mut self, handler: F) -> SubscriptionId
    where
        F: FnMut(&StateEvent) + 'static,
    {
        self.emitter.subscribe_all(handler)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.emitter.unsubscribe(id)
    }

    fn apply_patch(
        &mut self,
        patch: &HashPatch,
        silent: bool,
    ) -> Result<Vec<StateEvent>, StateError> {
        if patch.iter().any(|(key, _)| key.is_empty()) {
            warn!(event = "core.state.patch_rejected", reason = "empty_key");
            return Err(StateError::EmptyKey);
        }

        let mut next = self.current.clone();
        let mut changes = Vec::new();
        for (key, value) in patch.iter() {
            let value = value
                .as_ref()
                .filter(|v| v.is_storable())
                .map(HashValue::canonical);
            let old = next.get(key).cloned();
            if old == value {
                continue;
            }
            match &value {
                Some(v) => {
                    next.insert(key.clone(), v.clone());
                }
                None => {
                    next.shift_remove(key);
                }
            }
            changes.push((key.clone(), value, old));
        }

        if changes.is_empty() {
            debug!(event = "core.state.patch_ignored", reason = "no_change");
            return Ok(Vec::new());
        }

        self.previous = std::mem::replace(&mut self.current, next);
        self.hash = encode_state(&self.current);
        self.location.replace_hash(&self.hash);
        debug!(
            event = "core.state.hash_written",
            hash = %self.hash,
            changed = changes.len(),
            silent = silent
        );

        if silent {
            return Ok(Vec::new());
        }
        Ok(self.notify(changes))
    }

    fn notify(&mut self, changes: Vec<KeyChange>) -> Vec<StateEvent> {
        let keys: Vec<String> = changes.iter().map(|(key, _, _)| key.clone()).collect();
        let mut events: Vec<StateEvent> = changes
            .into_iter()
            .map(|(key, new, old)| StateEvent::KeyChanged { key, new, old })
            .collect();
        events.push(StateEvent::Changed { keys });
        self.emitter.emit_all(&events);
        events
    }
}

impl Store for AppState {
    type Error = StateError;

    fn dispatch(&mut self, cmd: Command) -> Result<Vec<StateEvent>, StateError> {
        debug!(event = "core.state.dispatch_started", command = ?cmd);

        let result = match cmd {
            Command::SetKey { key, value } => {
                let mut patch = HashPatch::new();
                patch.insert(key, value);
                self.apply_patch(&patch, false)
            }
            Command::Extend { patch, silent } => self.apply_patch(&patch, silent),
            Command::HashChanged => Ok(self.handle_hash_change()),
            Command::RequestFocus { ids, zoom } => Ok(self.request_focus(ids, zoom)),
        };

        match &result {
            Ok(events) => {
                debug!(event = "core.state.dispatch_completed", event_count = events.len())
            }
            Err(e) => warn!(event = "core.state.dispatch_failed", error = %e),
        }
        result
    }
}
