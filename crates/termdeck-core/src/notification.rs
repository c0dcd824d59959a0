//! Host and engine notifications.

use serde::{Deserialize, Serialize};

use crate::SurfaceId;

/// Notification delivered by the host shell or the engine.
///
/// The set is closed; the host shim routes every variant through one
/// dispatch function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    /// Periodic tick from the host event loop
    Tick,
    /// Host woke up; every thumbnail may be stale
    Wake,
    /// The shell in a surface reported a new working directory
    DirectoryChanged {
        /// Target surface
        surface: SurfaceId,
        /// New directory
        path: String,
    },
    /// The engine reported new content for a surface
    ContentChanged {
        /// Target surface
        surface: SurfaceId,
    },
}

impl Notification {
    /// The surface this notification targets, if any.
    pub fn target(&self) -> Option<SurfaceId> {
        match self {
            Notification::Tick | Notification::Wake => None,
            Notification::DirectoryChanged { surface, .. }
            | Notification::ContentChanged { surface } => Some(*surface),
        }
    }
}

/// Why a surface's thumbnail went stale.
///
/// Only used for logging; every reason collapses into one dirty flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidationReason {
    /// Working directory changed
    DirectoryChanged,
    /// Geometry changed
    Resized,
    /// Engine reported new content
    ContentChanged,
    /// Host woke up
    Wake,
}

impl std::fmt::Display for InvalidationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            InvalidationReason::DirectoryChanged => "directory_changed",
            InvalidationReason::Resized => "resized",
            InvalidationReason::ContentChanged => "content_changed",
            InvalidationReason::Wake => "wake",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_target() {
        let id = SurfaceId::new();
        assert_eq!(Notification::Tick.target(), None);
        assert_eq!(Notification::Wake.target(), None);
        assert_eq!(
            Notification::DirectoryChanged {
                surface: id,
                path: "/tmp".to_string()
            }
            .target(),
            Some(id)
        );
        assert_eq!(Notification::ContentChanged { surface: id }.target(), Some(id));
    }

    #[test]
    fn test_notification_tagged_serialization() {
        let json = serde_json::to_string(&Notification::Wake).unwrap();
        assert_eq!(json, r#"{"kind":"wake"}"#);

        let id = SurfaceId::new();
        let note = Notification::DirectoryChanged {
            surface: id,
            path: "/srv".to_string(),
        };
        let json = serde_json::to_string(&note).unwrap();
        assert!(json.contains(r#""kind":"directory_changed""#));
        let back: Notification = serde_json::from_str(&json).unwrap();
        assert_eq!(back, note);
    }

    #[test]
    fn test_invalidation_reason_display() {
        assert_eq!(InvalidationReason::Resized.to_string(), "resized");
        assert_eq!(
            InvalidationReason::DirectoryChanged.to_string(),
            "directory_changed"
        );
    }
}
