//! Configuration validation logic.

use std::collections::HashSet;

use crate::config::types::ExplorerConfig;
use crate::errors::ConfigError;
use crate::geo::Bounds;

/// Validate an ExplorerConfig, returning an error if any values are invalid.
///
/// # Validation Rules
///
/// - The tile URL must not be empty
/// - `min_zoom <= default_zoom <= max_zoom`
/// - Zoom threshold and reference marker zoom lie in `[min_zoom, max_zoom]`
/// - Bounds are finite with `south < north` and `west < east`, and contain
///   the default center
/// - Viewport and list sizes are positive
/// - Region and layer ids are non-empty and unique, sources are non-empty
pub fn validate_config(config: &ExplorerConfig) -> Result<(), ConfigError> {
    let map = &config.map;

    if map.tiles_url().trim().is_empty() {
        return Err(ConfigError::InvalidConfiguration {
            message: "tiles_url cannot be empty".to_string(),
        });
    }

    let (min, max) = (map.min_zoom(), map.max_zoom());
    if min > max {
        return Err(ConfigError::InvalidConfiguration {
            message: format!("min_zoom {} is greater than max_zoom {}", min, max),
        });
    }
    for (name, zoom) in [
        ("default_zoom", map.default_zoom()),
        ("zoom_threshold", map.zoom_threshold()),
        ("ref_marker_min_zoom", map.ref_marker_min_zoom()),
    ] {
        if !(min..=max).contains(&zoom) {
            return Err(ConfigError::InvalidConfiguration {
                message: format!("{} {} is outside [{}, {}]", name, zoom, min, max),
            });
        }
    }

    validate_bounds(&map.bounds())?;
    if !map.default_center().is_valid() || !map.bounds().contains_point(map.default_center()) {
        return Err(ConfigError::InvalidBounds {
            message: "default_center must lie inside the map bounds".to_string(),
        });
    }

    let (width, height) = map.viewport_size();
    if width == 0 || height == 0 {
        return Err(ConfigError::InvalidConfiguration {
            message: "viewport size must be positive".to_string(),
        });
    }

    if config.list.render_count() == 0 || config.list.render_increment() == 0 {
        return Err(ConfigError::InvalidConfiguration {
            message: "list render_count and render_increment must be positive".to_string(),
        });
    }

    check_ids(
        "region",
        config.regions.iter().map(|r| (r.id.as_str(), r.source.as_str())),
    )?;
    check_ids(
        "layer",
        config.layers.iter().map(|l| (l.id.as_str(), l.source.as_str())),
    )?;

    Ok(())
}

fn validate_bounds(bounds: &Bounds) -> Result<(), ConfigError> {
    if !bounds.is_valid() || bounds.south >= bounds.north || bounds.west >= bounds.east {
        return Err(ConfigError::InvalidBounds {
            message: format!(
                "expected south < north and west < east, got {},{},{},{}",
                bounds.south, bounds.west, bounds.north, bounds.east
            ),
        });
    }
    Ok(())
}

fn check_ids<'a>(
    kind: &'static str,
    entries: impl Iterator<Item = (&'a str, &'a str)>,
) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for (id, source) in entries {
        if id.trim().is_empty() || source.trim().is_empty() {
            return Err(ConfigError::InvalidConfiguration {
                message: format!("every {} needs an id and a source", kind),
            });
        }
        if !seen.insert(id) {
            return Err(ConfigError::DuplicateId {
                kind,
                id: id.to_string(),
            });
        }
    }
    Ok(())
}
