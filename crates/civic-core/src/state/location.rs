use std::cell::RefCell;
use std::rc::Rc;

/// The externally visible home of the serialized state (the URL fragment).
pub trait HashLocation {
    /// Current fragment, with or without a leading `#`.
    fn hash(&self) -> String;

    /// Overwrite the current fragment without creating a history entry.
    fn replace_hash(&mut self, hash: &str);
}

#[derive(Debug, Default)]
struct History {
    entries: Vec<String>,
    index: usize,
    replacements: usize,
}

/// In-memory location with browser-like history, for headless hosts and tests.
///
/// Clones share one history, so a host can keep a handle for navigation
/// while the store owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryLocation {
    history: Rc<RefCell<History>>,
}

impl MemoryLocation {
    pub fn new(initial: &str) -> Self {
        Self {
            history: Rc::new(RefCell::new(History {
                entries: vec![initial.trim_start_matches('#').to_string()],
                index: 0,
                replacements: 0,
            })),
        }
    }

    /// Navigate to a new fragment, dropping any forward history.
    pub fn navigate(&self, hash: &str) {
        let mut history = self.history.borrow_mut();
        let keep = history.index + 1;
        history.entries.truncate(keep);
        history.entries.push(hash.trim_start_matches('#').to_string());
        history.index = history.entries.len() - 1;
    }

    pub fn back(&self) -> bool {
        let mut history = self.history.borrow_mut();
        if history.index == 0 {
            return false;
        }
        history.index -= 1;
        true
    }

    pub fn forward(&self) -> bool {
        let mut history = self.history.borrow_mut();
        if history.index + 1 >= history.entries.len() {
            return false;
        }
        history.index += 1;
        true
    }

    pub fn history_len(&self) -> usize {
        self.history.borrow().entries.len()
    }

    /// How many times the fragment was replaced in place.
    pub fn replacement_count(&self) -> usize {
        self.history.borrow().replacements
    }
}

impl HashLocation for MemoryLocation {
    fn hash(&self) -> String {
        let history = self.history.borrow();
        history
            .entries
            .get(history.index)
            .cloned()
            .unwrap_or_default()
    }

    fn replace_hash(&mut self, hash: &str) {
        let mut history = self.history.borrow_mut();
        let index = history.index;
        if history.entries.is_empty() {
            history.entries.push(String::new());
        }
        history.entries[index] = hash.trim_start_matches('#').to_string();
        history.replacements += 1;
    }
}
