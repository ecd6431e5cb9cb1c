//! civic-core: Core library for the civic-map record explorer
//!
//! This library keeps a map and a list of permit/proposal records in sync with
//! shareable URL-hash state. It is used by the CLI and by embedding hosts that
//! provide a real rendering surface.
//!
//! # Main Entry Points
//!
//! - [`state`] - URL-hash backed application state
//! - [`records`] - Observable, filterable, sortable record collection
//! - [`layers`] - Region and info-layer registries with memoised geometry
//! - [`map`] - Marker lifecycle and layer compositing over a map surface
//! - [`app`] - The explorer that wires them together
//! - [`config`] - Configuration management

pub mod app;
pub mod config;
pub mod emitter;
pub mod errors;
pub mod escape;
pub mod events;
pub mod geo;
pub mod layers;
pub mod list;
pub mod logging;
pub mod map;
pub mod records;
pub mod reference;
pub mod state;

// Re-export commonly used types at crate root for convenience
pub use app::{Explorer, ExplorerError, ExplorerSnapshot, LoadStatus};
pub use config::ExplorerConfig;
pub use errors::{CivicError, CivicResult, ConfigError};
pub use geo::{Bounds, LatLng};
pub use layers::{GeometrySource, InfoLayerRegistry, RegionRegistry};
pub use list::ListView;
pub use map::{HeadlessSurface, MapSettings, MapSurface, MapView};
pub use records::{Record, RecordCollection, RecordId, Transport, TransportError};
pub use reference::{RefLocation, ReferenceLocation, SetMethod};
pub use state::{AppState, HashLocation, HashPatch, HashValue, MemoryLocation, StateEvent};

// Re-export logging initialization
pub use logging::init_logging;
