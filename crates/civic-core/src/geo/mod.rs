pub mod geometry;
pub mod projection;
pub mod types;

pub use geometry::{Feature, GeoJson, Geometry};
pub use types::{Bounds, LatLng, Point, bounds_to_box_string, box_string_to_bounds};
