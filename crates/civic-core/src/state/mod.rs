pub mod app_state;
pub mod errors;
pub mod events;
pub mod hash;
pub mod location;
pub mod store;
pub mod types;

pub use app_state::AppState;
pub use errors::StateError;
pub use events::StateEvent;
pub use hash::{decode_hash, encode_state};
pub use location::{HashLocation, MemoryLocation};
pub use store::Store;
pub use types::{Command, HashPatch, HashValue, StateMap};
