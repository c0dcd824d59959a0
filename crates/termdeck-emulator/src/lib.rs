//! # termdeck-emulator
//!
//! Engine boundary and engine implementations for termdeck.
//!
//! This crate provides:
//! - The engine traits (`TerminalEngine`, `EngineSurface`) and the move-only
//!   `EngineHandle` that owns a surface
//! - An in-memory engine for headless hosts and tests
//! - A PTY-backed reference engine (portable-pty + VTE) with a line screen,
//!   scrollback, and OSC 7 working-directory reports
//!
//! ## Architecture
//!
//! This is Layer 1 in the architecture - it depends on termdeck-core and is
//! consumed by termdeck-session.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod engine;
pub mod memory;
pub mod parser;
pub mod pty;
pub mod pty_engine;
pub mod screen;

// Re-export commonly used types
pub use engine::{EngineEvent, EngineHandle, EngineSurface, TerminalEngine};
pub use memory::{MemoryEngine, MemorySurfaceProbe, ProbeList};
pub use parser::Parser;
pub use pty::{PtyHandle, SpawnOptions};
pub use pty_engine::{PtyEngine, PtySurface};
pub use screen::{Cursor, Screen};
