//! Session manager: the ordered collection of surfaces and its selection.

use std::sync::Arc;

use tracing::{debug, info, warn};

use termdeck_core::{
    CaptureSettings, CellMetrics, DeckConfig, DisplayRegion, Error, InvalidationReason, Result,
    SurfaceConfig, SurfaceGeometry, SurfaceId, SurfaceInfo,
};
use termdeck_emulator::{EngineHandle, TerminalEngine};

use crate::surface::Surface;
use crate::thumbnail::{TextThumbnailRenderer, Thumbnail, ThumbnailRenderer};

/// Configuration for session manager.
#[derive(Debug, Clone)]
pub struct SessionManagerConfig {
    /// Maximum number of concurrent sessions
    pub max_sessions: usize,

    /// New sessions start in the selected session's directory
    pub inherit_working_directory: bool,

    /// Cell size used to turn display regions into grids
    pub cell_metrics: CellMetrics,

    /// Shell for new sessions (None = engine default)
    pub shell: Option<String>,
}

impl Default for SessionManagerConfig {
    fn default() -> Self {
        Self::from(&DeckConfig::default())
    }
}

impl From<&DeckConfig> for SessionManagerConfig {
    fn from(config: &DeckConfig) -> Self {
        Self {
            max_sessions: config.session.max_sessions,
            inherit_working_directory: config.session.inherit_working_directory,
            cell_metrics: config.terminal.cell,
            shell: config.terminal.shell.clone(),
        }
    }
}

/// Owns every surface, in order, and tracks which one is selected.
///
/// Invariants held after every public call:
/// - the selection is `None` exactly when the collection is empty, otherwise
///   it names a member;
/// - surfaces keep insertion order unless moved with
///   [`move_surface`](Self::move_surface);
/// - a surface's engine handle is released exactly once, when the surface
///   leaves the collection.
pub struct SessionManager {
    engine: Box<dyn TerminalEngine>,
    renderer: Box<dyn ThumbnailRenderer>,
    surfaces: Vec<Surface>,
    selected: Option<SurfaceId>,
    config: SessionManagerConfig,
}

impl SessionManager {
    /// Create a manager with default configuration.
    pub fn new(engine: Box<dyn TerminalEngine>) -> Self {
        Self::with_config(engine, SessionManagerConfig::default())
    }

    /// Create a manager with custom configuration.
    pub fn with_config(engine: Box<dyn TerminalEngine>, config: SessionManagerConfig) -> Self {
        Self {
            engine,
            renderer: Box::new(TextThumbnailRenderer::default()),
            surfaces: Vec::new(),
            selected: None,
            config,
        }
    }

    /// Create a manager from a full deck configuration.
    pub fn from_deck_config(engine: Box<dyn TerminalEngine>, config: &DeckConfig) -> Self {
        Self::with_config(engine, SessionManagerConfig::from(config))
            .with_renderer(Box::new(TextThumbnailRenderer::from(&config.thumbnail)))
    }

    /// Replace the thumbnail renderer.
    pub fn with_renderer(mut self, renderer: Box<dyn ThumbnailRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Manager configuration.
    pub fn config(&self) -> &SessionManagerConfig {
        &self.config
    }

    /// Create a session sized to `region`.
    ///
    /// The new surface is appended. An existing selection is left alone; the
    /// first surface of an empty collection becomes selected.
    pub fn create_session(&mut self, region: DisplayRegion) -> Result<SurfaceId> {
        let geometry = SurfaceGeometry::checked_from_region(region, self.config.cell_metrics)?;
        let mut config = SurfaceConfig::new(geometry);
        config.shell.clone_from(&self.config.shell);
        self.create_session_with(config)
    }

    /// Create a session from an explicit surface configuration.
    pub fn create_session_with(&mut self, mut config: SurfaceConfig) -> Result<SurfaceId> {
        if self.surfaces.len() >= self.config.max_sessions {
            warn!("Session limit reached ({})", self.config.max_sessions);
            return Err(Error::SessionLimitReached(self.config.max_sessions));
        }

        if config.working_directory.is_none() && self.config.inherit_working_directory {
            config.working_directory = self
                .selected()
                .map(|s| s.working_directory())
                .filter(|dir| !dir.is_empty())
                .map(str::to_string);
        }

        let engine_surface = self.engine.create_surface(&config).map_err(|e| match e {
            Error::EngineHandleCreation(_) => e,
            other => Error::EngineHandleCreation(other.to_string()),
        })?;

        let surface = Surface::new(
            EngineHandle::new(engine_surface),
            &config,
            self.config.cell_metrics,
        );
        let id = surface.id();
        self.surfaces.push(surface);

        info!(
            "Created session {} ({}x{}, cwd={:?}), {} total",
            id,
            config.geometry.cells.rows,
            config.geometry.cells.cols,
            config.working_directory,
            self.surfaces.len()
        );

        // Sole member: the selection invariant requires it be selected
        if self.selected.is_none() {
            self.selected = Some(id);
        }

        Ok(id)
    }

    /// Select the surface at ordinal position `index`.
    pub fn select_at_index(&mut self, index: usize) -> Result<()> {
        let id = self
            .surfaces
            .get(index)
            .map(Surface::id)
            .ok_or(Error::IndexOutOfRange {
                index,
                len: self.surfaces.len(),
            })?;
        self.set_selected(id);
        Ok(())
    }

    /// Select a member surface.
    pub fn select(&mut self, id: SurfaceId) -> Result<()> {
        self.position(id)?;
        self.set_selected(id);
        Ok(())
    }

    fn set_selected(&mut self, id: SurfaceId) {
        if self.selected != Some(id) {
            info!("Selected session {}", id);
        }
        self.selected = Some(id);
    }

    /// Remove a surface and release its engine handle.
    ///
    /// When the removed surface was selected, the surface now at the same
    /// position is selected, else the new last one, else nothing.
    pub fn remove(&mut self, id: SurfaceId) -> Result<()> {
        let index = self.position(id)?;
        let mut surface = self.surfaces.remove(index);
        surface.release();

        if self.selected == Some(id) {
            self.selected = self
                .surfaces
                .get(index)
                .or_else(|| self.surfaces.last())
                .map(Surface::id);
            debug!("Selection after removal: {:?}", self.selected);
        }

        info!("Removed session {}, {} remaining", id, self.surfaces.len());
        Ok(())
    }

    /// The selected surface.
    pub fn selected(&self) -> Option<&Surface> {
        self.selected.and_then(|id| self.get(id).ok())
    }

    /// Id of the selected surface.
    pub fn selected_id(&self) -> Option<SurfaceId> {
        self.selected
    }

    /// Ordinal position of the selected surface.
    pub fn selected_index(&self) -> Option<usize> {
        self.selected.and_then(|id| self.index_of(id))
    }

    /// All surfaces in order.
    pub fn all(&self) -> &[Surface] {
        &self.surfaces
    }

    /// Ids of all surfaces in order.
    pub fn ids(&self) -> Vec<SurfaceId> {
        self.surfaces.iter().map(Surface::id).collect()
    }

    /// Get a surface by id.
    pub fn get(&self, id: SurfaceId) -> Result<&Surface> {
        self.surfaces
            .iter()
            .find(|s| s.id() == id)
            .ok_or(Error::NotFound(id))
    }

    /// Get a surface by id, mutably.
    ///
    /// Prefer [`with_surface`](Self::with_surface), which also removes the
    /// surface if its handle turns out to be broken.
    pub fn get_mut(&mut self, id: SurfaceId) -> Result<&mut Surface> {
        self.surfaces
            .iter_mut()
            .find(|s| s.id() == id)
            .ok_or(Error::NotFound(id))
    }

    /// Ordinal position of a surface.
    pub fn index_of(&self, id: SurfaceId) -> Option<usize> {
        self.surfaces.iter().position(|s| s.id() == id)
    }

    fn position(&self, id: SurfaceId) -> Result<usize> {
        self.index_of(id).ok_or(Error::NotFound(id))
    }

    /// Whether `id` is a member.
    pub fn contains(&self, id: SurfaceId) -> bool {
        self.index_of(id).is_some()
    }

    /// Number of surfaces.
    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    /// Whether there are no surfaces.
    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    /// Listing of every surface.
    pub fn infos(&self) -> Vec<SurfaceInfo> {
        self.surfaces
            .iter()
            .enumerate()
            .map(|(index, s)| s.info(index, self.selected == Some(s.id())))
            .collect()
    }

    /// Move the surface at `from` to position `to`. The selection stays on
    /// the same surface.
    pub fn move_surface(&mut self, from: usize, to: usize) -> Result<()> {
        let len = self.surfaces.len();
        for index in [from, to] {
            if index >= len {
                return Err(Error::IndexOutOfRange { index, len });
            }
        }

        let surface = self.surfaces.remove(from);
        debug!("Moving session {} from {} to {}", surface.id(), from, to);
        self.surfaces.insert(to, surface);
        Ok(())
    }

    /// Run an operation on one surface.
    ///
    /// If it fails with [`Error::InvalidSurfaceState`] the surface is removed
    /// and the error is still returned.
    pub fn with_surface<T>(
        &mut self,
        id: SurfaceId,
        f: impl FnOnce(&mut Surface) -> Result<T>,
    ) -> Result<T> {
        let result = f(self.get_mut(id)?);
        self.settle(id, result)
    }

    fn settle<T>(&mut self, id: SurfaceId, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            if e.is_fatal_for_surface() {
                warn!("Removing session {}: {}", id, e);
                if let Err(remove_err) = self.remove(id) {
                    debug!("Session {} already gone: {}", id, remove_err);
                }
            }
        }
        result
    }

    /// Thumbnail of a surface, re-rendered if stale.
    pub fn refresh_thumbnail(&mut self, id: SurfaceId) -> Result<Arc<Thumbnail>> {
        let index = self.position(id)?;
        let result = self.surfaces[index].refresh_thumbnail_if_needed(self.renderer.as_ref());
        self.settle(id, result)
    }

    /// Last lines of a surface.
    pub fn capture_tail(&mut self, id: SurfaceId, line_count: usize, max_chars: usize) -> Result<String> {
        self.with_surface(id, |s| s.capture_tail(line_count, max_chars))
    }

    /// First visible lines of a surface.
    pub fn capture_head(&mut self, id: SurfaceId, line_count: usize, max_chars: usize) -> Result<String> {
        self.with_surface(id, |s| s.capture_head(line_count, max_chars))
    }

    /// Preview text of a surface using the configured budget.
    pub fn preview(&mut self, id: SurfaceId, capture: &CaptureSettings) -> Result<String> {
        self.capture_tail(id, capture.preview_lines, capture.preview_max_chars)
    }

    /// Resize a surface.
    pub fn update_size(&mut self, id: SurfaceId, region: DisplayRegion) -> Result<()> {
        self.with_surface(id, |s| s.update_size(region))
    }

    /// Record a working directory for a surface.
    pub fn set_working_directory(&mut self, id: SurfaceId, path: impl Into<String>) -> Result<()> {
        let path = path.into();
        self.with_surface(id, |s| s.set_working_directory(path))
    }

    /// Mark every thumbnail stale.
    pub fn mark_all_dirty(&mut self, reason: InvalidationReason) -> usize {
        for surface in &mut self.surfaces {
            surface.mark_dirty(reason);
        }
        self.surfaces.len()
    }

    /// Remove every surface, releasing each handle once.
    pub fn close_all(&mut self) {
        if self.surfaces.is_empty() {
            return;
        }

        info!("Closing all {} sessions", self.surfaces.len());
        self.selected = None;
        for mut surface in self.surfaces.drain(..) {
            surface.release();
        }
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.close_all();
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("surfaces", &self.surfaces)
            .field("selected", &self.selected)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
