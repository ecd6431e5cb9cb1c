//! The explorer: one store, one record collection and the views that
//! follow them.

pub mod errors;
pub mod explorer;
pub mod snapshot;

pub use errors::ExplorerError;
pub use explorer::{Explorer, INTRO_VIEW, MAIN_VIEW};
pub use snapshot::{ExplorerSnapshot, LoadStatus, MarkerSnapshot, ViewportSnapshot};
