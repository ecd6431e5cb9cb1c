//! Named-topic event sources.
//!
//! Every observable component (the state store, the record collection, the
//! registries) owns an [`Emitter`] for its event type. Handlers are plain
//! closures; they receive the event by reference and cannot reach back into
//! the emitting component, so emission never re-enters a mutation.

use std::borrow::Cow;

/// An event that can be addressed by topic name (`"change"`, `"change:sort"`).
pub trait Topic {
    fn topic(&self) -> Cow<'_, str>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler<E> = Box<dyn FnMut(&E)>;

struct Subscription<E> {
    id: SubscriptionId,
    /// `None` receives every event.
    topic: Option<String>,
    handler: Handler<E>,
}

pub struct Emitter<E> {
    next_id: u64,
    subscriptions: Vec<Subscription<E>>,
}

impl<E> Default for Emitter<E> {
    fn default() -> Self {
        Self {
            next_id: 0,
            subscriptions: Vec::new(),
        }
    }
}

impl<E> std::fmt::Debug for Emitter<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emitter")
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}

impl<E: Topic> Emitter<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one topic.
    pub fn subscribe<F>(&mut self, topic: impl Into<String>, handler: F) -> SubscriptionId
    where
        F: FnMut(&E) + 'static,
    {
        self.push(Some(topic.into()), Box::new(handler))
    }

    /// Register a handler for every topic.
    pub fn subscribe_all<F>(&mut self, handler: F) -> SubscriptionId
    where
        F: FnMut(&E) + 'static,
    {
        self.push(None, Box::new(handler))
    }

    fn push(&mut self, topic: Option<String>, handler: Handler<E>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscriptions.push(Subscription { id, topic, handler });
        id
    }

    /// Remove a handler. Returns false if it was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id != id);
        self.subscriptions.len() != before
    }

    /// Deliver one event to matching handlers in registration order.
    pub fn emit(&mut self, event: &E) {
        let topic = event.topic();
        for subscription in &mut self.subscriptions {
            let matches = match &subscription.topic {
                Some(t) => t.as_str() == topic.as_ref(),
                None => true,
            };
            if matches {
                (subscription.handler)(event);
            }
        }
    }

    /// Deliver a batch in order; each event reaches all handlers before the
    /// next one is delivered.
    pub fn emit_all(&mut self, events: &[E]) {
        for event in events {
            self.emit(event);
        }
    }

    pub fn clear(&mut self) {
        self.subscriptions.clear();
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}
