//! Region and info-layer registries with memoised geometry loading.

pub mod cache;
pub mod errors;
pub mod info;
pub mod regions;

pub use cache::{GeometryCache, GeometryLoad, GeometrySource};
pub use errors::{GeometryError, LayerError, RegionError};
pub use info::{InfoLayer, InfoLayerRegistry, LayerChange};
pub use regions::{Region, RegionEvent, RegionRegistry};
