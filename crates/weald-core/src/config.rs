//! Configuration loading and typed config structures for the Weald server.
//!
//! The canonical configuration lives in `weald-config.yaml` at the project
//! root. This module defines strongly-typed structs that mirror the YAML
//! structure; every field has a sensible default so a missing file or a
//! partial file still produces a runnable world.

use std::path::Path;

use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulation configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// World generation settings.
    #[serde(default)]
    pub world: WorldConfig,

    /// Frame timing settings.
    #[serde(default)]
    pub frame: FrameConfig,

    /// Sync gateway bind settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Infrastructure connection strings.
    #[serde(default)]
    pub infrastructure: InfrastructureConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_yml::from_str(&contents)?;
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(yaml)?;
        Ok(config)
    }
}

/// World generation settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WorldConfig {
    /// Map width in hexes.
    #[serde(default = "default_map_width")]
    pub width: i32,

    /// Map height in hexes.
    #[serde(default = "default_map_height")]
    pub height: i32,

    /// RNG seed for terrain and clan generation.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Number of clans to spawn at world initialization.
    #[serde(default = "default_clan_count")]
    pub clan_count: u32,
}

/// Default map width.
const fn default_map_width() -> i32 {
    16
}

/// Default map height.
const fn default_map_height() -> i32 {
    16
}

/// Default world seed.
const fn default_seed() -> u64 {
    42
}

/// Default clan count.
const fn default_clan_count() -> u32 {
    6
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: default_map_width(),
            height: default_map_height(),
            seed: default_seed(),
            clan_count: default_clan_count(),
        }
    }
}

/// Frame timing settings.
///
/// The frame is the fundamental time unit of the system: the external
/// driver ticks the orchestrator once per frame.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FrameConfig {
    /// Duration of each frame in milliseconds.
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,
}

/// Default frame duration.
const fn default_frame_interval_ms() -> u64 {
    5000
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: default_frame_interval_ms(),
        }
    }
}

/// Sync gateway bind settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    /// The host address to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// The TCP port to listen on. Both the command and update routes
    /// share this listener.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Default bind host.
fn default_host() -> String {
    String::from("0.0.0.0")
}

/// Default bind port.
const fn default_port() -> u16 {
    4225
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Infrastructure connection strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct InfrastructureConfig {
    /// NATS server URL for turn-lifecycle events. Absent means event
    /// publication is disabled.
    #[serde(default)]
    pub nats_url: Option<String>,
}
