//! Surface adapter: one running terminal session.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use termdeck_core::{
    CellMetrics, Dimensions, DisplayRegion, Error, InvalidationReason, Result, SurfaceConfig,
    SurfaceGeometry, SurfaceId, SurfaceInfo, SurfaceState,
};
use termdeck_emulator::{EngineEvent, EngineHandle, EngineSurface};

use crate::capture::{apply_budget, line_window, CaptureEdge};
use crate::thumbnail::{Thumbnail, ThumbnailRenderer};

/// A terminal session wrapping one engine handle.
///
/// Only the [`SessionManager`](crate::SessionManager) creates and drops
/// surfaces; the handle is released exactly once, when the surface leaves the
/// collection.
#[derive(Debug)]
pub struct Surface {
    id: SurfaceId,
    handle: EngineHandle,
    state: SurfaceState,
    geometry: SurfaceGeometry,
    cell_metrics: CellMetrics,
    working_directory: String,
    last_capture: String,
    thumbnail: Option<Arc<Thumbnail>>,
    dirty: bool,
    created_at: DateTime<Utc>,
}

impl Surface {
    pub(crate) fn new(handle: EngineHandle, config: &SurfaceConfig, cell_metrics: CellMetrics) -> Self {
        let id = SurfaceId::new();
        let state = if handle.is_valid() {
            SurfaceState::Live
        } else {
            warn!("Surface {} came up without a usable engine handle", id);
            SurfaceState::Failed
        };

        Self {
            id,
            handle,
            state,
            geometry: config.geometry,
            cell_metrics,
            working_directory: config.working_directory.clone().unwrap_or_default(),
            last_capture: String::new(),
            thumbnail: None,
            dirty: true,
            created_at: Utc::now(),
        }
    }

    /// Surface identifier.
    pub fn id(&self) -> SurfaceId {
        self.id
    }

    /// Tracked working directory; empty until the shell reports one.
    pub fn working_directory(&self) -> &str {
        &self.working_directory
    }

    /// Text returned by the most recent capture.
    pub fn last_capture(&self) -> &str {
        &self.last_capture
    }

    /// Current geometry.
    pub fn geometry(&self) -> SurfaceGeometry {
        self.geometry
    }

    /// Current grid size.
    pub fn dimensions(&self) -> Dimensions {
        self.geometry.cells
    }

    /// Handle health.
    pub fn state(&self) -> SurfaceState {
        self.state
    }

    /// Whether the cached thumbnail is stale.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Cached thumbnail, without refreshing it.
    pub fn cached_thumbnail(&self) -> Option<Arc<Thumbnail>> {
        self.thumbnail.clone()
    }

    /// Creation time.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Whether the engine handle is still usable. Does not change state.
    pub fn is_live(&self) -> bool {
        self.state == SurfaceState::Live && self.handle.is_valid()
    }

    /// Summary for listing.
    pub fn info(&self, index: usize, selected: bool) -> SurfaceInfo {
        SurfaceInfo {
            id: self.id,
            index,
            working_directory: self.working_directory.clone(),
            dimensions: self.geometry.cells,
            state: self.state,
            selected,
            thumbnail_dirty: self.dirty,
            created_at: self.created_at,
        }
    }

    /// Borrow the engine surface, failing fast when the handle is unusable.
    fn engine(&mut self) -> Result<&mut (dyn EngineSurface + 'static)> {
        if !self.is_live() {
            if self.state == SurfaceState::Live {
                warn!("Engine handle of surface {} is no longer valid", self.id);
                self.state = SurfaceState::Failed;
            }
            return Err(Error::InvalidSurfaceState(self.id));
        }
        self.handle
            .get_mut()
            .ok_or(Error::InvalidSurfaceState(self.id))
    }

    /// Resize to the given display region.
    ///
    /// Always forwarded to the engine, even when the size is unchanged.
    pub fn update_size(&mut self, region: DisplayRegion) -> Result<()> {
        self.engine()?;
        let geometry = SurfaceGeometry::checked_from_region(region, self.cell_metrics)?;
        debug!(
            "Resizing surface {} to {}x{} cells ({}x{} px)",
            self.id, geometry.cells.rows, geometry.cells.cols, geometry.pixel_width, geometry.pixel_height
        );

        self.engine()?.resize(geometry)?;
        self.geometry = geometry;
        self.mark_dirty(InvalidationReason::Resized);
        Ok(())
    }

    /// Last `line_count` lines, trimmed from the start to `max_chars`.
    pub fn capture_tail(&mut self, line_count: usize, max_chars: usize) -> Result<String> {
        self.capture(CaptureEdge::Tail, line_count, max_chars)
    }

    /// First `line_count` lines of the visible screen, trimmed from the end
    /// to `max_chars`.
    pub fn capture_head(&mut self, line_count: usize, max_chars: usize) -> Result<String> {
        self.capture(CaptureEdge::Head, line_count, max_chars)
    }

    fn capture(&mut self, edge: CaptureEdge, line_count: usize, max_chars: usize) -> Result<String> {
        let engine = self.engine()?;
        let (from, to) = line_window(edge, engine.line_count(), engine.viewport_start(), line_count);
        let text = engine.screen_text(from, to)?;

        let text = apply_budget(&text, edge, max_chars);
        self.last_capture.clone_from(&text);
        Ok(text)
    }

    /// Record a new working directory reported by the shell.
    pub fn set_working_directory(&mut self, path: impl Into<String>) -> Result<()> {
        self.engine()?;
        let path = path.into();
        if path != self.working_directory {
            info!("Surface {} working directory: {}", self.id, path);
        }
        self.working_directory = path;
        self.mark_dirty(InvalidationReason::DirectoryChanged);
        Ok(())
    }

    /// Record that the engine produced new output.
    pub fn note_content_changed(&mut self) -> Result<()> {
        self.engine()?;
        self.mark_dirty(InvalidationReason::ContentChanged);
        Ok(())
    }

    /// Mark the thumbnail stale.
    pub fn mark_dirty(&mut self, reason: InvalidationReason) {
        if !self.dirty {
            debug!("Thumbnail of surface {} invalidated: {}", self.id, reason);
        }
        self.dirty = true;
    }

    /// Return the thumbnail, re-rendering it first if it is stale.
    ///
    /// The dirty flag is only cleared when rendering succeeds.
    pub fn refresh_thumbnail_if_needed(
        &mut self,
        renderer: &dyn ThumbnailRenderer,
    ) -> Result<Arc<Thumbnail>> {
        self.engine()?;
        if let Some(thumbnail) = &self.thumbnail {
            if !self.dirty {
                return Ok(Arc::clone(thumbnail));
            }
        }

        let dimensions = self.geometry.cells;
        let engine = self.engine()?;
        let start = engine.viewport_start();
        let text = engine.screen_text(start, start + usize::from(dimensions.rows))?;
        let thumbnail = Arc::new(renderer.render(&text, dimensions));

        debug!("Refreshed thumbnail of surface {}", self.id);
        self.thumbnail = Some(Arc::clone(&thumbnail));
        self.dirty = false;
        Ok(thumbnail)
    }

    /// Drain engine notifications and apply them. Returns how many were
    /// applied.
    pub fn pump_engine_events(&mut self) -> Result<usize> {
        let events = self.engine()?.poll_events();
        let count = events.len();

        for event in events {
            match event {
                EngineEvent::ContentChanged => self.mark_dirty(InvalidationReason::ContentChanged),
                EngineEvent::DirectoryChanged(path) => self.set_working_directory(path)?,
            }
        }

        // The engine may have broken while producing these events
        if !self.handle.is_valid() {
            self.engine()?;
        }
        Ok(count)
    }

    /// Destroy the engine surface. Safe to call on failed or released handles.
    pub(crate) fn release(&mut self) -> bool {
        self.handle.release()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use termdeck_emulator::{MemoryEngine, MemorySurfaceProbe, TerminalEngine};

    use crate::thumbnail::TextThumbnailRenderer;

    struct CountingRenderer {
        renders: AtomicUsize,
    }

    impl CountingRenderer {
        fn new() -> Self {
            Self {
                renders: AtomicUsize::new(0),
            }
        }

        fn count(&self) -> usize {
            self.renders.load(Ordering::SeqCst)
        }
    }

    impl ThumbnailRenderer for CountingRenderer {
        fn render(&self, text: &str, dimensions: Dimensions) -> Thumbnail {
            self.renders.fetch_add(1, Ordering::SeqCst);
            TextThumbnailRenderer::new(8, 4).render(text, dimensions)
        }
    }

    fn region(rows: u32) -> DisplayRegion {
        DisplayRegion::sized(640, rows * 16)
    }

    fn surface_with(engine: &mut MemoryEngine, config: SurfaceConfig) -> (Surface, MemorySurfaceProbe) {
        let handle = EngineHandle::new(engine.create_surface(&config).unwrap());
        let probe = engine.probe(engine.created_count() - 1).unwrap();
        (Surface::new(handle, &config, CellMetrics::default()), probe)
    }

    fn surface(rows: u32) -> (Surface, MemorySurfaceProbe) {
        let mut engine = MemoryEngine::new();
        let config =
            SurfaceConfig::new(SurfaceGeometry::from_region(region(rows), CellMetrics::default()));
        surface_with(&mut engine, config)
    }

    fn numbered(count: usize) -> Vec<String> {
        (1..=count).map(|i| format!("line {i}")).collect()
    }

    #[test]
    fn test_new_surface() {
        let (surface, _) = surface(24);
        assert_eq!(surface.state(), SurfaceState::Live);
        assert_eq!(surface.dimensions(), Dimensions::new(24, 80));
        assert_eq!(surface.working_directory(), "");
        assert!(surface.is_dirty());
        assert!(surface.cached_thumbnail().is_none());
    }

    #[test]
    fn test_initial_working_directory() {
        let mut engine = MemoryEngine::new();
        let config =
            SurfaceConfig::new(SurfaceGeometry::from_region(region(24), CellMetrics::default()))
                .with_working_directory("/srv");
        let (surface, _) = surface_with(&mut engine, config);
        assert_eq!(surface.working_directory(), "/srv");
    }

    #[test]
    fn test_update_size_forwards_and_marks_dirty() {
        let (mut surface, probe) = surface(24);
        let renderer = CountingRenderer::new();
        surface.refresh_thumbnail_if_needed(&renderer).unwrap();
        assert!(!surface.is_dirty());

        surface.update_size(DisplayRegion::new(10, 20, 800, 600)).unwrap();
        assert!(surface.is_dirty());
        assert_eq!(surface.dimensions(), Dimensions::new(37, 100));
        assert_eq!(probe.geometry().pixel_width, 800);
        assert_eq!(probe.geometry().pixel_height, 600);
    }

    #[test]
    fn test_update_size_same_size_still_forwarded() {
        let (mut surface, probe) = surface(24);
        surface.update_size(region(24)).unwrap();
        surface.update_size(region(24)).unwrap();
        assert_eq!(probe.resize_calls().len(), 2);
    }

    #[test]
    fn test_update_size_rejects_sub_cell_region() {
        let (mut surface, probe) = surface(24);
        let result = surface.update_size(DisplayRegion::sized(640, 8));
        assert!(matches!(result, Err(Error::InvalidDimensions { rows: 0, cols: 80 })));
        assert_eq!(surface.dimensions(), Dimensions::new(24, 80));
        assert!(probe.resize_calls().is_empty());
        assert_eq!(surface.state(), SurfaceState::Live);
    }

    #[test]
    fn test_capture_tail_last_lines() {
        let (mut surface, probe) = surface(24);
        probe.set_lines(numbered(100));

        let text = surface.capture_tail(5, 1000).unwrap();
        assert_eq!(text, "line 96\nline 97\nline 98\nline 99\nline 100");
        assert_eq!(surface.last_capture(), text);
    }

    #[test]
    fn test_capture_tail_budget_drops_earliest() {
        let (mut surface, probe) = surface(24);
        probe.set_lines(["first line", "second line", "the end"]);

        let text = surface.capture_tail(3, 10).unwrap();
        assert_eq!(text, "ne\nthe end");
        assert_eq!(text.chars().count(), 10);
    }

    #[test]
    fn test_capture_tail_fewer_lines_than_requested() {
        let (mut surface, probe) = surface(24);
        probe.set_lines(["only", "two"]);
        assert_eq!(surface.capture_tail(5, 1000).unwrap(), "only\ntwo");
    }

    #[test]
    fn test_capture_head_from_viewport() {
        let (mut surface, probe) = surface(2);
        probe.set_lines(["old 1", "old 2", "$ make", "Compiling"]);

        // Viewport is the last two lines
        assert_eq!(surface.capture_head(5, 1000).unwrap(), "$ make\nCompiling");
        assert_eq!(surface.capture_head(5, 6).unwrap(), "$ make");
        assert_eq!(surface.last_capture(), "$ make");
    }

    #[test]
    fn test_capture_does_not_touch_engine_state() {
        let (mut surface, probe) = surface(24);
        probe.set_lines(numbered(10));
        surface.capture_tail(3, 100).unwrap();
        assert!(probe.resize_calls().is_empty());
        assert_eq!(probe.destroy_count(), 0);
    }

    #[test]
    fn test_set_working_directory_marks_dirty() {
        let (mut surface, _) = surface(24);
        let renderer = CountingRenderer::new();
        surface.refresh_thumbnail_if_needed(&renderer).unwrap();

        surface.set_working_directory("/home/user/project").unwrap();
        assert_eq!(surface.working_directory(), "/home/user/project");
        assert!(surface.is_dirty());

        let after_move = surface.refresh_thumbnail_if_needed(&renderer).unwrap();
        assert_eq!(renderer.count(), 2);
        assert!(!surface.is_dirty());

        let cached = surface.refresh_thumbnail_if_needed(&renderer).unwrap();
        assert_eq!(renderer.count(), 2);
        assert!(Arc::ptr_eq(&after_move, &cached));
    }

    #[test]
    fn test_note_content_changed() {
        let (mut surface, probe) = surface(24);
        let renderer = CountingRenderer::new();
        surface.refresh_thumbnail_if_needed(&renderer).unwrap();

        surface.note_content_changed().unwrap();
        assert!(surface.is_dirty());

        probe.invalidate();
        assert!(matches!(
            surface.note_content_changed(),
            Err(Error::InvalidSurfaceState(_))
        ));
        assert_eq!(surface.state(), SurfaceState::Failed);
    }

    #[test]
    fn test_refresh_only_when_dirty() {
        let (mut surface, _) = surface(24);
        let renderer = CountingRenderer::new();

        let first = surface.refresh_thumbnail_if_needed(&renderer).unwrap();
        let second = surface.refresh_thumbnail_if_needed(&renderer).unwrap();
        assert_eq!(renderer.count(), 1);
        assert!(Arc::ptr_eq(&first, &second));

        surface.mark_dirty(InvalidationReason::Wake);
        let third = surface.refresh_thumbnail_if_needed(&renderer).unwrap();
        assert_eq!(renderer.count(), 2);
        assert!(!Arc::ptr_eq(&first, &third));
    }

    #[test]
    fn test_refresh_failure_keeps_dirty() {
        let (mut surface, probe) = surface(24);
        probe.invalidate();

        let renderer = CountingRenderer::new();
        let result = surface.refresh_thumbnail_if_needed(&renderer);
        assert!(matches!(result, Err(Error::InvalidSurfaceState(_))));
        assert!(surface.is_dirty());
        assert_eq!(renderer.count(), 0);
    }

    #[test]
    fn test_pump_engine_events() {
        let (mut surface, probe) = surface(24);
        let renderer = CountingRenderer::new();
        surface.refresh_thumbnail_if_needed(&renderer).unwrap();

        probe.push_line("$ cd /tmp");
        probe.report_directory("/tmp");
        assert_eq!(surface.pump_engine_events().unwrap(), 2);
        assert_eq!(surface.working_directory(), "/tmp");
        assert!(surface.is_dirty());

        assert_eq!(surface.pump_engine_events().unwrap(), 0);
    }

    #[test]
    fn test_invalid_handle_fails_fast() {
        let (mut surface, probe) = surface(24);
        probe.invalidate();

        let id = surface.id();
        assert!(matches!(surface.capture_tail(5, 100), Err(Error::InvalidSurfaceState(i)) if i == id));
        assert_eq!(surface.state(), SurfaceState::Failed);
        assert!(matches!(surface.update_size(region(30)), Err(Error::InvalidSurfaceState(_))));
        assert!(matches!(
            surface.set_working_directory("/x"),
            Err(Error::InvalidSurfaceState(_))
        ));
        assert!(matches!(surface.pump_engine_events(), Err(Error::InvalidSurfaceState(_))));
        assert_eq!(probe.query_count(), 0);
    }

    #[test]
    fn test_surface_created_without_valid_handle() {
        let mut engine = MemoryEngine::new();
        engine.invalid_next_create();
        let config =
            SurfaceConfig::new(SurfaceGeometry::from_region(region(24), CellMetrics::default()));
        let (mut surface, _) = surface_with(&mut engine, config);

        assert_eq!(surface.state(), SurfaceState::Failed);
        assert!(matches!(surface.capture_head(1, 10), Err(Error::InvalidSurfaceState(_))));
    }

    #[test]
    fn test_release_once() {
        let (mut surface, probe) = surface(24);
        assert!(surface.release());
        assert!(!surface.release());
        drop(surface);
        assert_eq!(probe.destroy_count(), 1);
    }

    #[test]
    fn test_info() {
        let (mut surface, _) = surface(24);
        surface.set_working_directory("/var").unwrap();
        let info = surface.info(3, true);
        assert_eq!(info.id, surface.id());
        assert_eq!(info.index, 3);
        assert!(info.selected);
        assert!(info.thumbnail_dirty);
        assert_eq!(info.working_directory, "/var");
    }
}
