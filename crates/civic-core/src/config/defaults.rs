//! Default values and accessor methods for configuration types.

use std::path::PathBuf;

use crate::config::types::{ListConfig, MapConfig, PathStyle, StyleConfig, TransportConfig};
use crate::geo::{Bounds, LatLng};

pub const DEFAULT_TILES_URL: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";

/// Somerville, MA.
pub const DEFAULT_CENTER: LatLng = LatLng::new(42.3876, -71.0995);

pub const DEFAULT_BOUNDS: Bounds = Bounds {
    south: 42.3727,
    west: -71.1346,
    north: 42.4181,
    east: -71.0730,
};

pub const DEFAULT_ZOOM: u8 = 14;
pub const DEFAULT_MIN_ZOOM: u8 = 13;
pub const DEFAULT_MAX_ZOOM: u8 = 18;
pub const DEFAULT_ZOOM_THRESHOLD: u8 = 17;
pub const DEFAULT_REF_MARKER_MIN_ZOOM: u8 = 16;
pub const DEFAULT_VIEWPORT_WIDTH: u32 = 1024;
pub const DEFAULT_VIEWPORT_HEIGHT: u32 = 768;
pub const DEFAULT_RENDER_COUNT: usize = 10;
pub const DEFAULT_RENDER_INCREMENT: usize = 10;

/// Used by serde `#[serde(default = "...")]` attribute.
pub fn default_weight() -> f64 {
    2.0
}

/// Used by serde `#[serde(default = "...")]` attribute.
pub fn default_opacity() -> f64 {
    1.0
}

/// Used by serde `#[serde(default = "...")]` attribute.
pub fn default_layer_color() -> String {
    "blue".to_string()
}

pub fn default_parcel_style() -> PathStyle {
    PathStyle {
        color: "#ff7800".to_string(),
        weight: 2.0,
        opacity: 1.0,
        fill: true,
        fill_color: None,
        fill_opacity: 0.2,
        dash_array: None,
    }
}

pub fn default_region_style() -> PathStyle {
    PathStyle {
        color: "#3388ff".to_string(),
        weight: 3.0,
        opacity: 0.8,
        fill: false,
        fill_color: None,
        fill_opacity: 0.0,
        dash_array: Some("6, 4".to_string()),
    }
}

pub fn default_info_style() -> PathStyle {
    PathStyle {
        color: default_layer_color(),
        weight: 4.0,
        opacity: 0.7,
        fill: false,
        fill_color: None,
        fill_opacity: 0.0,
        dash_array: None,
    }
}

pub fn default_filter_bounds_style() -> PathStyle {
    PathStyle {
        color: "#555555".to_string(),
        weight: 1.0,
        opacity: 0.8,
        fill: true,
        fill_color: Some("#ffffff".to_string()),
        fill_opacity: 0.1,
        dash_array: Some("2, 4".to_string()),
    }
}

impl MapConfig {
    pub fn tiles_url(&self) -> &str {
        self.tiles_url.as_deref().unwrap_or(DEFAULT_TILES_URL)
    }

    pub fn default_center(&self) -> LatLng {
        self.default_center.unwrap_or(DEFAULT_CENTER)
    }

    pub fn default_zoom(&self) -> u8 {
        self.default_zoom.unwrap_or(DEFAULT_ZOOM)
    }

    pub fn min_zoom(&self) -> u8 {
        self.min_zoom.unwrap_or(DEFAULT_MIN_ZOOM)
    }

    pub fn max_zoom(&self) -> u8 {
        self.max_zoom.unwrap_or(DEFAULT_MAX_ZOOM)
    }

    pub fn zoom_threshold(&self) -> u8 {
        self.zoom_threshold.unwrap_or(DEFAULT_ZOOM_THRESHOLD)
    }

    pub fn ref_marker_min_zoom(&self) -> u8 {
        self.ref_marker_min_zoom
            .unwrap_or(DEFAULT_REF_MARKER_MIN_ZOOM)
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds.unwrap_or(DEFAULT_BOUNDS)
    }

    pub fn viewport_size(&self) -> (u32, u32) {
        (
            self.viewport_width.unwrap_or(DEFAULT_VIEWPORT_WIDTH),
            self.viewport_height.unwrap_or(DEFAULT_VIEWPORT_HEIGHT),
        )
    }
}

impl StyleConfig {
    pub fn parcel(&self) -> PathStyle {
        self.parcel.clone().unwrap_or_else(default_parcel_style)
    }

    pub fn region(&self) -> PathStyle {
        self.region.clone().unwrap_or_else(default_region_style)
    }

    pub fn filter_bounds(&self) -> PathStyle {
        self.filter_bounds
            .clone()
            .unwrap_or_else(default_filter_bounds_style)
    }

    pub fn info(&self) -> PathStyle {
        self.info.clone().unwrap_or_else(default_info_style)
    }
}

impl ListConfig {
    pub fn render_count(&self) -> usize {
        self.render_count.unwrap_or(DEFAULT_RENDER_COUNT)
    }

    pub fn render_increment(&self) -> usize {
        self.render_increment.unwrap_or(DEFAULT_RENDER_INCREMENT)
    }
}

impl TransportConfig {
    /// Geometry directory, falling back to the working directory.
    pub fn geometry_dir(&self) -> PathBuf {
        self.geometry_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }
}
