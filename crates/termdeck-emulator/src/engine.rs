//! Boundary with the terminal-emulation engine.
//!
//! The engine owns PTY I/O and screen state. termdeck only ever sees it
//! through [`TerminalEngine`] and [`EngineSurface`], and only ever owns a
//! surface through an [`EngineHandle`].

use tracing::debug;

use termdeck_core::{Result, SurfaceConfig, SurfaceGeometry};

/// Notification produced by an engine surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Screen or scrollback content changed
    ContentChanged,
    /// The shell reported a new working directory
    DirectoryChanged(String),
}

/// Factory for engine surfaces.
pub trait TerminalEngine: Send {
    /// Allocate a new surface.
    ///
    /// Failure here is reported to the caller and never retried.
    fn create_surface(&mut self, config: &SurfaceConfig) -> Result<Box<dyn EngineSurface>>;
}

/// One engine-owned terminal session.
///
/// Lines are addressed logically: index 0 is the oldest scrollback line and
/// `line_count() - 1` the last non-blank line on screen.
pub trait EngineSurface: Send {
    /// Whether the surface finished initializing and is still usable.
    fn is_valid(&self) -> bool;

    /// Apply a new geometry. Repeating the current geometry is allowed.
    fn resize(&mut self, geometry: SurfaceGeometry) -> Result<()>;

    /// Total logical lines (scrollback plus used screen rows).
    fn line_count(&self) -> usize;

    /// Index of the first line of the visible screen.
    fn viewport_start(&self) -> usize;

    /// Lines in `[from_line, to_line)` joined with `\n`. Out-of-range bounds
    /// are clamped.
    fn screen_text(&self, from_line: usize, to_line: usize) -> Result<String>;

    /// Drain pending engine notifications.
    fn poll_events(&mut self) -> Vec<EngineEvent>;

    /// Release engine resources.
    fn destroy(self: Box<Self>);
}

/// Exclusive owner of an engine surface.
///
/// Not `Clone`. The surface is destroyed at most once, either by
/// [`EngineHandle::release`] or on drop.
pub struct EngineHandle {
    inner: Option<Box<dyn EngineSurface>>,
}

impl EngineHandle {
    /// Take ownership of an engine surface.
    pub fn new(surface: Box<dyn EngineSurface>) -> Self {
        Self {
            inner: Some(surface),
        }
    }

    /// Whether the handle still holds a usable surface.
    pub fn is_valid(&self) -> bool {
        self.inner.as_ref().is_some_and(|s| s.is_valid())
    }

    /// Whether the handle has been released.
    pub fn is_released(&self) -> bool {
        self.inner.is_none()
    }

    /// Borrow the surface, if not released.
    pub fn get(&self) -> Option<&dyn EngineSurface> {
        self.inner.as_deref()
    }

    /// Mutably borrow the surface, if not released.
    pub fn get_mut(&mut self) -> Option<&mut (dyn EngineSurface + 'static)> {
        self.inner.as_deref_mut()
    }

    /// Destroy the engine surface. Returns false if it was already released.
    pub fn release(&mut self) -> bool {
        match self.inner.take() {
            Some(surface) => {
                debug!("Releasing engine surface");
                surface.destroy();
                true
            }
            None => false,
        }
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle")
            .field("released", &self.is_released())
            .finish_non_exhaustive()
    }
}
