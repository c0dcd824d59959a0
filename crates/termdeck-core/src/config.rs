//! Configuration types for termdeck.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{CellMetrics, DisplayRegion, Error};

/// Deck configuration loaded from a YAML file.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(default)]
pub struct DeckConfig {
    /// Host driver settings
    pub deck: DeckSettings,
    /// Session collection settings
    pub session: SessionSettings,
    /// Terminal settings
    pub terminal: TerminalSettings,
    /// Text capture settings
    pub capture: CaptureSettings,
    /// Thumbnail settings
    pub thumbnail: ThumbnailSettings,
}

impl DeckConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML string.
    pub fn from_yaml(yaml: &str) -> crate::Result<Self> {
        let config: DeckConfig =
            serde_yaml::from_str(yaml).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> crate::Result<()> {
        if self.session.max_sessions == 0 {
            return Err(Error::Config("session.max_sessions must be > 0".to_string()));
        }

        if self.deck.tick_interval_ms == 0 {
            return Err(Error::Config("deck.tick_interval_ms must be > 0".to_string()));
        }

        if self.deck.startup_sessions > self.session.max_sessions {
            return Err(Error::Config(format!(
                "deck.startup_sessions ({}) exceeds session.max_sessions ({})",
                self.deck.startup_sessions, self.session.max_sessions
            )));
        }

        if self.terminal.cell.width == 0 || self.terminal.cell.height == 0 {
            return Err(Error::Config("terminal.cell dimensions must be > 0".to_string()));
        }

        if self.thumbnail.width == 0 || self.thumbnail.height == 0 {
            return Err(Error::Config("thumbnail dimensions must be > 0".to_string()));
        }

        if self.capture.preview_lines == 0 || self.capture.banner_lines == 0 {
            return Err(Error::Config("capture line counts must be > 0".to_string()));
        }

        Ok(())
    }
}

/// Host driver settings.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct DeckSettings {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Interval between host ticks in milliseconds
    pub tick_interval_ms: u64,
    /// Number of sessions the driver opens at startup
    pub startup_sessions: usize,
}

impl Default for DeckSettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            tick_interval_ms: 250,
            startup_sessions: 1,
        }
    }
}

/// Session collection settings.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SessionSettings {
    /// Maximum number of concurrent sessions
    pub max_sessions: usize,
    /// New sessions start in the selected session's directory
    pub inherit_working_directory: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_sessions: 32,
            inherit_working_directory: true,
        }
    }
}

/// Terminal settings.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct TerminalSettings {
    /// Shell to launch (None = $SHELL, then a platform default)
    pub shell: Option<String>,
    /// TERM environment variable value
    pub term: String,
    /// Scrollback buffer lines
    pub scrollback_lines: usize,
    /// Character cell size used to turn regions into grids
    pub cell: CellMetrics,
    /// Region used when the host does not supply one
    pub default_region: DisplayRegion,
}

impl Default for TerminalSettings {
    fn default() -> Self {
        Self {
            shell: None,
            term: "xterm-256color".to_string(),
            scrollback_lines: 10000,
            cell: CellMetrics::default(),
            default_region: DisplayRegion::sized(640, 384),
        }
    }
}

/// Text capture settings.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct CaptureSettings {
    /// Lines taken from the end of a session for previews
    pub preview_lines: usize,
    /// Character budget for previews
    pub preview_max_chars: usize,
    /// Lines taken from the start of the screen for banners
    pub banner_lines: usize,
    /// Character budget for banners
    pub banner_max_chars: usize,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            preview_lines: 5,
            preview_max_chars: 1000,
            banner_lines: 2,
            banner_max_chars: 200,
        }
    }
}

/// Thumbnail settings.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ThumbnailSettings {
    /// Thumbnail width in pixels
    pub width: u32,
    /// Thumbnail height in pixels
    pub height: u32,
}

impl Default for ThumbnailSettings {
    fn default() -> Self {
        Self {
            width: 160,
            height: 96,
        }
    }
}
