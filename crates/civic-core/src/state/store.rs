use super::events::StateEvent;
use super::types::Command;

/// Trait for dispatching state commands.
///
/// # Semantics
///
/// - **Ordering**: Commands apply in the order received. Each one is a single
///   transition: the mapping and the hash are updated before any event is
///   delivered.
/// - **Idempotency**: Setting a key to its current value is a no-op and
///   produces no events.
/// - **Events**: The returned vector is what subscribers were sent, in
///   delivery order. Silent transitions return an empty vector.
pub trait Store {
    type Error;
    fn dispatch(&mut self, cmd: Command) -> Result<Vec<StateEvent>, Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_trait_is_implementable() {
        struct EchoStore;
        impl Store for EchoStore {
            type Error = String;
            fn dispatch(&mut self, cmd: Command) -> Result<Vec<StateEvent>, String> {
                match cmd {
                    Command::RequestFocus { ids, zoom } => {
                        Ok(vec![StateEvent::FocusRequested { ids, zoom }])
                    }
                    _ => Err("unsupported".to_string()),
                }
            }
        }

        let mut store = EchoStore;
        let events = store
            .dispatch(Command::RequestFocus {
                ids: vec!["r1".into()],
                zoom: true,
            })
            .unwrap();
        assert_eq!(events.len(), 1);
        assert!(store.dispatch(Command::HashChanged).is_err());
    }
}
