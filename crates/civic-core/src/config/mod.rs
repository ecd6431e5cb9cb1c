//! # Configuration System
//!
//! Hierarchical TOML configuration for the explorer.
//!
//! ## Configuration Hierarchy
//!
//! 1. **Hardcoded defaults** - see [`defaults`]
//! 2. **User config** - `~/.civic/config.toml`
//! 3. **Project config** - `./.civic/config.toml`
//! 4. **CLI arguments** - Command-line flags (highest priority)
//!
//! ## Loading Configuration
//!
//! ```rust,no_run
//! use civic_core::config::ExplorerConfig;
//!
//! fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ExplorerConfig::load_hierarchy()?;
//!     let zoom = config.map.default_zoom();
//!     Ok(())
//! }
//! ```

pub mod defaults;
pub mod loading;
pub mod types;
pub mod validation;

pub use types::{
    ExplorerConfig, LayerConfig, ListConfig, MapConfig, PathStyle, RegionConfig, StyleConfig,
    TransportConfig,
};
pub use validation::validate_config;

impl ExplorerConfig {
    /// Load configuration from the hierarchy of config files.
    ///
    /// See [`loading::load_hierarchy`] for details.
    pub fn load_hierarchy() -> Result<Self, crate::errors::ConfigError> {
        loading::load_hierarchy()
    }

    /// Validate the configuration.
    ///
    /// See [`validation::validate_config`] for details.
    pub fn validate(&self) -> Result<(), crate::errors::ConfigError> {
        validation::validate_config(self)
    }
}
