//! Application configuration structures.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Data and output locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// Event view settings
    #[serde(default)]
    pub events: EventsConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Tracked players and their display settings
    #[serde(default)]
    pub players: PlayersConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| AppError::config(format!("cannot read {}: {e}", path.display())))?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Serialize the configuration back to TOML.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Override the event window (when given) and validate the result.
    ///
    /// Returns the effective window in days.
    pub fn apply_window(&mut self, days: Option<u32>) -> Result<u32> {
        if let Some(days) = days {
            self.events.window_days = days;
        }
        self.validate()?;
        Ok(self.events.window_days)
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.paths.player_data_dir.as_os_str().is_empty() {
            return Err(AppError::validation("paths.player_data_dir is empty"));
        }
        if self.paths.game_data_dir.as_os_str().is_empty() {
            return Err(AppError::validation("paths.game_data_dir is empty"));
        }
        if self.paths.events_file.as_os_str().is_empty() {
            return Err(AppError::validation("paths.events_file is empty"));
        }
        if self.paths.progress_file.as_os_str().is_empty() {
            return Err(AppError::validation("paths.progress_file is empty"));
        }
        if self.events.window_days == 0 {
            return Err(AppError::validation("events.window_days must be > 0"));
        }
        for (player, color) in &self.players.colors {
            if !is_hex_color(color) {
                return Err(AppError::validation(format!(
                    "players.colors.{player}: '{color}' is not a #RRGGBB color"
                )));
            }
        }
        Ok(())
    }
}

/// Locations of snapshot data, reference data and generated output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// One sub-directory of snapshots per player
    #[serde(default = "defaults::player_data_dir")]
    pub player_data_dir: PathBuf,

    /// Wiki exports (`quests.json`, `combat_achievements.json`, `collection_log.json`)
    #[serde(default = "defaults::game_data_dir")]
    pub game_data_dir: PathBuf,

    /// Where the generated event document is written
    #[serde(default = "defaults::events_file")]
    pub events_file: PathBuf,

    /// Where the generated progress and comparison document is written
    #[serde(default = "defaults::progress_file")]
    pub progress_file: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            player_data_dir: defaults::player_data_dir(),
            game_data_dir: defaults::game_data_dir(),
            events_file: defaults::events_file(),
            progress_file: defaults::progress_file(),
        }
    }
}

/// Event view settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsConfig {
    /// Trailing window of the default event view, in days
    #[serde(default = "defaults::window_days")]
    pub window_days: u32,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            window_days: defaults::window_days(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level when neither `--verbose` nor `RUST_LOG` is set
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

/// Tracked players and their presentation settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayersConfig {
    /// Player keys to process (empty means every player directory)
    #[serde(default)]
    pub tracked: Vec<String>,

    /// Player key to display name
    #[serde(default)]
    pub display_names: HashMap<String, String>,

    /// Player key to chart color
    #[serde(default)]
    pub colors: HashMap<String, String>,

    /// Ironman accounts
    #[serde(default)]
    pub ironman: Vec<String>,
}

impl PlayersConfig {
    /// Display name for a player, falling back to the player key.
    pub fn display_name<'a>(&'a self, player: &'a str) -> &'a str {
        self.display_names
            .get(player)
            .map(String::as_str)
            .unwrap_or(player)
    }

    /// Chart color for a player.
    pub fn color(&self, player: &str) -> &str {
        self.colors
            .get(player)
            .map(String::as_str)
            .unwrap_or(defaults::FALLBACK_COLOR)
    }

    /// Whether a player directory should be processed.
    pub fn is_tracked(&self, player: &str) -> bool {
        self.tracked.is_empty() || self.tracked.iter().any(|p| p == player)
    }

    pub fn is_ironman(&self, player: &str) -> bool {
        self.ironman.iter().any(|p| p == player)
    }
}

fn is_hex_color(color: &str) -> bool {
    color
        .strip_prefix('#')
        .is_some_and(|hex| hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

mod defaults {
    use std::path::PathBuf;

    pub const FALLBACK_COLOR: &str = "#999999";

    pub fn player_data_dir() -> PathBuf {
        PathBuf::from("player_data")
    }
    pub fn game_data_dir() -> PathBuf {
        PathBuf::from("game_data")
    }
    pub fn events_file() -> PathBuf {
        PathBuf::from("public/events.json")
    }
    pub fn progress_file() -> PathBuf {
        PathBuf::from("public/progress.json")
    }
    pub fn window_days() -> u32 {
        30
    }
    pub fn log_level() -> String {
        "info".into()
    }
}
