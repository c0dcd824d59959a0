//! # termdeck-session
//!
//! Session collection management for termdeck.
//!
//! This crate provides:
//! - The surface adapter (size negotiation, head/tail capture, working
//!   directory, thumbnail cache)
//! - The session manager (ordered collection, selection, create/select/remove)
//! - The host shim routing shell notifications to the manager
//!
//! ## Architecture
//!
//! This is Layer 2 in the architecture - it depends on termdeck-core and
//! termdeck-emulator, and only talks to the terminal engine through
//! `TerminalEngine` and `EngineHandle`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod capture;
pub mod host;
pub mod manager;
pub mod surface;
pub mod thumbnail;

// Re-export commonly used types
pub use capture::CaptureEdge;
pub use host::{Dispatched, HostShim, TickReport};
pub use manager::{SessionManager, SessionManagerConfig};
pub use surface::Surface;
pub use thumbnail::{TextThumbnailRenderer, Thumbnail, ThumbnailRenderer};
