//! Configuration type definitions for the explorer.
//!
//! # Example Configuration
//!
//! ```toml
//! [map]
//! tiles_url = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png"
//! default_zoom = 14
//! zoom_threshold = 17
//!
//! [map.bounds]
//! south = 42.3727
//! west = -71.1346
//! north = 42.4181
//! east = -71.0730
//!
//! [list]
//! render_count = 20
//!
//! [[regions]]
//! id = "somerville"
//! source = "regions/somerville.geojson"
//!
//! [[layers]]
//! id = "glx"
//! name = "Green Line Extension"
//! source = "layers/glx.geojson"
//! color = "green"
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::geo::{Bounds, LatLng};

/// Main configuration loaded from TOML config files.
///
/// Loaded from `~/.civic/config.toml` then `./.civic/config.toml`; project
/// values override user values.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExplorerConfig {
    /// Viewport, zoom and tile settings
    #[serde(default)]
    pub map: MapConfig,

    /// Overlay path styles
    #[serde(default)]
    pub styles: StyleConfig,

    /// List pagination
    #[serde(default)]
    pub list: ListConfig,

    /// Where records and geometry come from
    #[serde(default)]
    pub transport: TransportConfig,

    /// Selectable region boundaries
    #[serde(default)]
    pub regions: Vec<RegionConfig>,

    /// Informational overlay layers
    #[serde(default)]
    pub layers: Vec<LayerConfig>,
}

/// Map view settings. Unset fields fall back to the defaults in
/// [`super::defaults`] through the accessor methods.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MapConfig {
    /// Tile URL template with `{s}`, `{z}`, `{x}`, `{y}` placeholders.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tiles_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_center: Option<LatLng>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_zoom: Option<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_zoom: Option<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_zoom: Option<u8>,

    /// Zoom at which markers switch to their zoomed rendering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zoom_threshold: Option<u8>,

    /// Minimum zoom used when centering on the reference location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_marker_min_zoom: Option<u8>,

    /// Outer limit for panning.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Bounds>,

    /// Pixel size of headless viewports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport_width: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport_height: Option<u32>,
}

/// Stroke and fill of a vector overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathStyle {
    pub color: String,
    #[serde(default = "super::defaults::default_weight")]
    pub weight: f64,
    #[serde(default = "super::defaults::default_opacity")]
    pub opacity: f64,
    #[serde(default)]
    pub fill: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<String>,
    #[serde(default)]
    pub fill_opacity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dash_array: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StyleConfig {
    /// Parcel outline shown for selected or hovered records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parcel: Option<PathStyle>,

    /// Region boundaries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<PathStyle>,

    /// Rectangle drawn for the `f.box` filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_bounds: Option<PathStyle>,

    /// Info layer stroke. The colour is replaced by each layer's own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<PathStyle>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ListConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render_count: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render_increment: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TransportConfig {
    /// Records file used when none is given on the command line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub records_path: Option<PathBuf>,

    /// Directory that relative geometry sources resolve against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry_dir: Option<PathBuf>,
}

/// One selectable region boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionConfig {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// GeoJSON location, resolved by the geometry source.
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// One informational overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerConfig {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub source: String,
    #[serde(default = "super::defaults::default_layer_color")]
    pub color: String,
    /// Shown on startup.
    #[serde(default)]
    pub shown: bool,
}
