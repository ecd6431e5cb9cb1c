//! Map view: marker lifecycle, overlays and viewport sync over an abstract
//! rendering surface.

pub mod errors;
pub mod focus;
pub mod headless;
pub mod markers;
pub mod settings;
pub mod surface;
pub mod view;

pub use errors::MapError;
pub use focus::{RegionFocus, ResolvedRegions};
pub use headless::{HeadlessLayer, HeadlessSurface, SurfaceOp};
pub use markers::{MarkerInput, MarkerState};
pub use settings::MapSettings;
pub use surface::{LayerContent, LayerHandle, MapSurface, Pane, Viewport};
pub use view::{HASH_COORD_PRECISION, MapView, ZoomControls};
