use crate::config::{ExplorerConfig, PathStyle};
use crate::geo::{Bounds, LatLng};

/// Resolved map configuration, injected into [`super::MapView`].
#[derive(Debug, Clone, PartialEq)]
pub struct MapSettings {
    pub tiles_url: String,
    pub default_center: LatLng,
    pub default_zoom: u8,
    pub zoom_threshold: u8,
    pub ref_marker_min_zoom: u8,
    /// Max bounds outside any region focus.
    pub bounds: Bounds,
    pub parcel_style: PathStyle,
    pub region_style: PathStyle,
    pub filter_bounds_style: PathStyle,
    /// Info layer stroke; each layer substitutes its colour.
    pub info_style: PathStyle,
}

impl MapSettings {
    pub fn from_config(config: &ExplorerConfig) -> Self {
        Self {
            tiles_url: config.map.tiles_url().to_string(),
            default_center: config.map.default_center(),
            default_zoom: config.map.default_zoom(),
            zoom_threshold: config.map.zoom_threshold(),
            ref_marker_min_zoom: config.map.ref_marker_min_zoom(),
            bounds: config.map.bounds(),
            parcel_style: config.styles.parcel(),
            region_style: config.styles.region(),
            filter_bounds_style: config.styles.filter_bounds(),
            info_style: config.styles.info(),
        }
    }

    /// Stroke used for an info layer of the given colour.
    pub fn info_style_for(&self, color: &str) -> PathStyle {
        PathStyle {
            color: color.to_string(),
            ..self.info_style.clone()
        }
    }

    /// Region stroke, with the region's own colour when it has one.
    pub fn region_style_for(&self, color: Option<&str>) -> PathStyle {
        match color {
            Some(color) => PathStyle {
                color: color.to_string(),
                ..self.region_style.clone()
            },
            None => self.region_style.clone(),
        }
    }
}

impl Default for MapSettings {
    fn default() -> Self {
        Self::from_config(&ExplorerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_follow_config_accessors() {
        let settings = MapSettings::default();
        assert_eq!(settings.default_zoom, 14);
        assert_eq!(settings.zoom_threshold, 17);
        assert_eq!(settings.ref_marker_min_zoom, 16);
        assert!(settings.bounds.contains_point(settings.default_center));
    }

    #[test]
    fn test_config_overrides() {
        let mut config = ExplorerConfig::default();
        config.map.zoom_threshold = Some(16);
        config.map.tiles_url = Some("https://tiles.example/{z}/{x}/{y}.png".to_string());
        let settings = MapSettings::from_config(&config);
        assert_eq!(settings.zoom_threshold, 16);
        assert!(settings.tiles_url.starts_with("https://tiles.example"));
    }

    #[test]
    fn test_region_colour_override() {
        let settings = MapSettings::default();
        let style = settings.region_style_for(Some("red"));
        assert_eq!(style.color, "red");
        assert_eq!(style.weight, settings.region_style.weight);
        assert_eq!(settings.region_style_for(None), settings.region_style);
        assert_eq!(settings.info_style_for("green").color, "green");
    }

    #[test]
    fn test_info_style_from_config() {
        let mut config = ExplorerConfig::default();
        config.styles.info = Some(PathStyle {
            weight: 9.0,
            opacity: 0.5,
            ..crate::config::defaults::default_info_style()
        });
        let settings = MapSettings::from_config(&config);
        let style = settings.info_style_for("purple");
        assert_eq!(style.color, "purple");
        assert_eq!(style.weight, 9.0);
        assert_eq!(style.opacity, 0.5);

        let defaults = MapSettings::default().info_style_for("purple");
        assert_eq!(defaults.weight, 4.0);
        assert_eq!(defaults.opacity, 0.7);
    }
}
