use std::{fs, path::Path};

use anyhow::{Context, Result};
use cityroute_system_movement::MovementConfig;
use cityroute_world::{CityLayout, Topology};
use serde::Deserialize;

/// Settings read from the optional `--config` file.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct AppConfig {
    /// Motion tunables, `[movement]` table.
    pub(crate) movement: MovementConfig,
    /// Terrain tables, `[layout]` table; the built-in city when absent.
    pub(crate) layout: CityLayout,
}

impl AppConfig {
    /// Reads the configuration file, or falls back to defaults without one.
    pub(crate) fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid config file {}", path.display()))
    }

    fn parse(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.movement.validate()?;
        tracing::debug!(
            columns = config.layout.columns,
            rows = config.layout.rows,
            "configuration loaded"
        );
        Ok(config)
    }

    /// Builds the walkable topology described by the layout.
    pub(crate) fn topology(&self) -> Result<Topology> {
        Topology::from_layout(&self.layout).context("city layout failed validation")
    }
}
