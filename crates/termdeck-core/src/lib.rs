//! # termdeck-core
//!
//! Core types for termdeck.
//!
//! This crate contains all fundamental types with **no internal dependencies**
//! on other termdeck crates. It provides:
//!
//! - Geometry types (DisplayRegion, CellMetrics, SurfaceGeometry, Dimensions)
//! - Surface types (SurfaceId, SurfaceConfig, SurfaceInfo, SurfaceState)
//! - Host/engine notifications and thumbnail invalidation reasons
//! - Deck configuration
//! - Error types
//!
//! ## Architecture
//!
//! This is Layer 0 in the architecture - all other crates depend on this one,
//! but this crate has no dependencies on other termdeck crates.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod geometry;
pub mod notification;
pub mod surface;

// Re-export commonly used types
pub use config::{
    CaptureSettings, DeckConfig, DeckSettings, SessionSettings, TerminalSettings,
    ThumbnailSettings,
};
pub use error::{Error, Result};
pub use geometry::{CellMetrics, Dimensions, DisplayRegion, SurfaceGeometry, MAX_GRID_CELLS};
pub use notification::{InvalidationReason, Notification};
pub use surface::{SurfaceConfig, SurfaceId, SurfaceInfo, SurfaceState};
