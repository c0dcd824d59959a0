//! Surface types shared between the engine boundary and the session layer.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Dimensions, SurfaceGeometry};

/// Unique identifier for a terminal surface.
///
/// The session collection owns every surface; hosts hold ids and the
/// collection resolves them, so a stale id is reported instead of dangling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct SurfaceId(Uuid);

impl SurfaceId {
    /// Create a new random surface ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for SurfaceId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for SurfaceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Health of a surface's engine handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceState {
    /// Handle is valid and usable
    Live,
    /// Handle never initialized or broke; the surface must be removed
    Failed,
}

/// Configuration for creating a new engine surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SurfaceConfig {
    /// Initial geometry
    pub geometry: SurfaceGeometry,
    /// Shell command to execute (None = engine default)
    pub shell: Option<String>,
    /// Working directory for the session
    pub working_directory: Option<String>,
    /// Environment variables
    pub env: Vec<(String, String)>,
}

impl SurfaceConfig {
    /// Config with the given geometry and engine defaults for everything else.
    pub fn new(geometry: SurfaceGeometry) -> Self {
        Self {
            geometry,
            shell: None,
            working_directory: None,
            env: Vec::new(),
        }
    }

    /// Set the working directory.
    pub fn with_working_directory(mut self, dir: impl Into<String>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    /// Set the shell command.
    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = Some(shell.into());
        self
    }
}

/// Read-only summary of a surface, for listing in a host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SurfaceInfo {
    /// Surface identifier
    pub id: SurfaceId,
    /// Ordinal position in the collection
    pub index: usize,
    /// Tracked working directory (empty when unknown)
    pub working_directory: String,
    /// Current grid size
    pub dimensions: Dimensions,
    /// Handle health
    pub state: SurfaceState,
    /// Whether this surface is the selection
    pub selected: bool,
    /// Whether the cached thumbnail is stale
    pub thumbnail_dirty: bool,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CellMetrics, DisplayRegion};

    #[test]
    fn test_surface_id_creation() {
        let id1 = SurfaceId::new();
        let id2 = SurfaceId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_surface_id_display() {
        let id = SurfaceId::new();
        assert_eq!(format!("{id}").len(), 36);
    }

    #[test]
    fn test_surface_config_builder() {
        let geometry =
            SurfaceGeometry::from_region(DisplayRegion::sized(800, 600), CellMetrics::default());
        let config = SurfaceConfig::new(geometry)
            .with_shell("/bin/zsh")
            .with_working_directory("/tmp");

        assert_eq!(config.shell.as_deref(), Some("/bin/zsh"));
        assert_eq!(config.working_directory.as_deref(), Some("/tmp"));
        assert!(config.env.is_empty());
    }

    #[test]
    fn test_surface_info_serialization() {
        let info = SurfaceInfo {
            id: SurfaceId::new(),
            index: 0,
            working_directory: "/home/user".to_string(),
            dimensions: Dimensions::default(),
            state: SurfaceState::Live,
            selected: true,
            thumbnail_dirty: false,
            created_at: Utc::now(),
        };

        let json = serde_json::to_string(&info).unwrap();
        assert!(json.contains("\"state\":\"live\""));

        let deserialized: SurfaceInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, info);
    }
}
