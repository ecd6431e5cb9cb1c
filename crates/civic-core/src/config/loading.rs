//! Configuration loading and merging logic.
//!
//! Configuration is loaded in the following order (later sources override earlier ones):
//! 1. **Hardcoded defaults** - Built-in fallback values
//! 2. **User config** - `~/.civic/config.toml`
//! 3. **Project config** - `./.civic/config.toml`
//! 4. **CLI arguments** - Command-line flags (highest priority)

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::types::{
    ExplorerConfig, LayerConfig, ListConfig, MapConfig, RegionConfig, StyleConfig,
    TransportConfig,
};
use crate::config::validation::validate_config;
use crate::errors::ConfigError;

const CONFIG_DIR: &str = ".civic";
const CONFIG_FILE: &str = "config.toml";

/// Load configuration from the hierarchy of config files.
///
/// # Errors
///
/// Returns an error if a present file cannot be parsed or the merged result
/// fails validation. Missing config files are not errors.
pub fn load_hierarchy() -> Result<ExplorerConfig, ConfigError> {
    let user_path = dirs::home_dir().map(|home| home.join(CONFIG_DIR).join(CONFIG_FILE));
    let project_path = std::env::current_dir()?.join(CONFIG_DIR).join(CONFIG_FILE);
    load_from_paths(user_path.as_deref(), &project_path)
}

/// Load and merge the user file then the project file.
pub fn load_from_paths(
    user_path: Option<&Path>,
    project_path: &Path,
) -> Result<ExplorerConfig, ConfigError> {
    let mut config = ExplorerConfig::default();

    if let Some(path) = user_path {
        match load_config_file(path) {
            Ok(user_config) => config = merge_configs(config, user_config),
            Err(ConfigError::ConfigNotFound { .. }) => {}
            Err(e) => return Err(e),
        }
    }

    match load_config_file(project_path) {
        Ok(project_config) => config = merge_configs(config, project_config),
        Err(ConfigError::ConfigNotFound { .. }) => {}
        Err(e) => return Err(e),
    }

    validate_config(&config)?;
    info!(
        event = "core.config.load_completed",
        regions = config.regions.len(),
        layers = config.layers.len()
    );
    Ok(config)
}

/// Load one configuration file.
pub fn load_config_file(path: &Path) -> Result<ExplorerConfig, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(event = "core.config.file_missing", path = %path.display());
            return Err(ConfigError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }
        Err(e) => return Err(e.into()),
    };
    toml::from_str(&content).map_err(|e| ConfigError::ConfigParseError {
        message: format!("'{}': {}", path.display(), e),
    })
}

/// Merge two configurations, with `override_config` taking precedence.
///
/// Optional fields are replaced only when the override sets them. Regions and
/// layers merge by id: an override entry replaces the base entry in place,
/// new ids are appended.
pub fn merge_configs(base: ExplorerConfig, override_config: ExplorerConfig) -> ExplorerConfig {
    let map = override_config.map;
    let styles = override_config.styles;
    let list = override_config.list;
    let transport = override_config.transport;

    ExplorerConfig {
        map: MapConfig {
            tiles_url: map.tiles_url.or(base.map.tiles_url),
            default_center: map.default_center.or(base.map.default_center),
            default_zoom: map.default_zoom.or(base.map.default_zoom),
            min_zoom: map.min_zoom.or(base.map.min_zoom),
            max_zoom: map.max_zoom.or(base.map.max_zoom),
            zoom_threshold: map.zoom_threshold.or(base.map.zoom_threshold),
            ref_marker_min_zoom: map.ref_marker_min_zoom.or(base.map.ref_marker_min_zoom),
            bounds: map.bounds.or(base.map.bounds),
            viewport_width: map.viewport_width.or(base.map.viewport_width),
            viewport_height: map.viewport_height.or(base.map.viewport_height),
        },
        styles: StyleConfig {
            parcel: styles.parcel.or(base.styles.parcel),
            region: styles.region.or(base.styles.region),
            filter_bounds: styles.filter_bounds.or(base.styles.filter_bounds),
            info: styles.info.or(base.styles.info),
        },
        list: ListConfig {
            render_count: list.render_count.or(base.list.render_count),
            render_increment: list.render_increment.or(base.list.render_increment),
        },
        transport: TransportConfig {
            records_path: transport.records_path.or(base.transport.records_path),
            geometry_dir: transport.geometry_dir.or(base.transport.geometry_dir),
        },
        regions: merge_by_id(base.regions, override_config.regions, |r: &RegionConfig| {
            r.id.clone()
        }),
        layers: merge_by_id(base.layers, override_config.layers, |l: &LayerConfig| {
            l.id.clone()
        }),
    }
}

fn merge_by_id<T>(base: Vec<T>, overrides: Vec<T>, id: impl Fn(&T) -> String) -> Vec<T> {
    let mut merged = base;
    for entry in overrides {
        match merged.iter().position(|existing| id(existing) == id(&entry)) {
            Some(index) => merged[index] = entry,
            None => merged.push(entry),
        }
    }
    merged
}

/// Path of the project config file relative to `dir`.
pub fn project_config_path(dir: &Path) -> PathBuf {
    dir.join(CONFIG_DIR).join(CONFIG_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_missing_files_give_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let missing = temp.path().join("nope.toml");
        let config = load_from_paths(Some(missing.as_path()), &temp.path().join("x")).unwrap();
        assert!(config.map.default_zoom.is_none());
        assert_eq!(config.map.default_zoom(), 14);
    }

    #[test]
    fn test_config_hierarchy_integration() {
        let temp = tempfile::tempdir().unwrap();
        let user = write(
            temp.path(),
            "user.toml",
            r#"
[map]
default_zoom = 15
tiles_url = "https://tiles.example/{z}/{x}/{y}.png"

[[regions]]
id = "somerville"
source = "somerville.geojson"

[[regions]]
id = "cambridge"
source = "cambridge.geojson"
"#,
        );
        fs::create_dir_all(temp.path().join(".civic")).unwrap();
        let project = write(
            &temp.path().join(".civic"),
            "config.toml",
            r#"
[map]
default_zoom = 16

[list]
render_count = 25

[[regions]]
id = "cambridge"
source = "cambridge-2024.geojson"
"#,
        );
        assert_eq!(project, project_config_path(temp.path()));

        let config = load_from_paths(Some(user.as_path()), &project).unwrap();
        assert_eq!(config.map.default_zoom(), 16);
        assert_eq!(config.map.tiles_url(), "https://tiles.example/{z}/{x}/{y}.png");
        assert_eq!(config.list.render_count(), 25);
        assert_eq!(config.regions.len(), 2);
        assert_eq!(config.regions[0].id, "somerville");
        assert_eq!(config.regions[1].source, "cambridge-2024.geojson");
    }

    #[test]
    fn test_parse_error_is_reported() {
        let temp = tempfile::tempdir().unwrap();
        let broken = write(temp.path(), "config.toml", "[map\ndefault_zoom = ");
        let err = load_from_paths(None, &broken).unwrap_err();
        assert!(matches!(err, ConfigError::ConfigParseError { .. }));
    }

    #[test]
    fn test_invalid_merged_config_is_rejected() {
        let temp = tempfile::tempdir().unwrap();
        let bad = write(
            temp.path(),
            "config.toml",
            "[map]\nmin_zoom = 17\nmax_zoom = 12\n",
        );
        assert!(load_from_paths(None, &bad).is_err());
    }
}
