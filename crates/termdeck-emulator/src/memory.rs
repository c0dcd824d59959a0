//! In-memory engine.
//!
//! Surfaces hold scripted lines instead of a PTY. Every surface has a
//! [`MemorySurfaceProbe`] that feeds it content and records what the session
//! layer asked of it, which makes the engine useful for hosts without a PTY
//! and for tests.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use termdeck_core::{Error, Result, SurfaceConfig, SurfaceGeometry};

use crate::engine::{EngineEvent, EngineSurface, TerminalEngine};

#[derive(Debug)]
struct MemoryState {
    lines: Vec<String>,
    geometry: SurfaceGeometry,
    resize_calls: Vec<SurfaceGeometry>,
    pending: Vec<EngineEvent>,
    valid: bool,
    destroy_count: usize,
    query_count: usize,
}

fn lock(state: &Mutex<MemoryState>) -> MutexGuard<'_, MemoryState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Engine whose surfaces live entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryEngine {
    probes: ProbeList,
    fail_next: Option<String>,
    invalid_next: bool,
}

impl MemoryEngine {
    /// Create an engine with no surfaces.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `create_surface` call fail with the given reason.
    pub fn fail_next_create(&mut self, reason: impl Into<String>) {
        self.fail_next = Some(reason.into());
    }

    /// Make the next surface come up without a usable handle.
    pub fn invalid_next_create(&mut self) {
        self.invalid_next = true;
    }

    /// Probe for the n-th surface this engine created.
    pub fn probe(&self, index: usize) -> Option<MemorySurfaceProbe> {
        self.probes.get(index)
    }

    /// Number of surfaces created so far.
    pub fn created_count(&self) -> usize {
        self.probes.len()
    }

    /// Shared view of this engine's probes. It keeps tracking new surfaces
    /// after the engine has been moved into a session manager.
    pub fn probe_list(&self) -> ProbeList {
        self.probes.clone()
    }
}

impl TerminalEngine for MemoryEngine {
    fn create_surface(&mut self, config: &SurfaceConfig) -> Result<Box<dyn EngineSurface>> {
        if let Some(reason) = self.fail_next.take() {
            debug!("Memory engine refusing surface: {}", reason);
            return Err(Error::EngineHandleCreation(reason));
        }

        let state = Arc::new(Mutex::new(MemoryState {
            lines: Vec::new(),
            geometry: config.geometry,
            resize_calls: Vec::new(),
            pending: Vec::new(),
            valid: !std::mem::take(&mut self.invalid_next),
            destroy_count: 0,
            query_count: 0,
        }));

        self.probes.push(MemorySurfaceProbe {
            state: Arc::clone(&state),
            config: config.clone(),
        });
        debug!("Memory engine created surface #{}", self.probes.len());

        Ok(Box::new(MemorySurface { state }))
    }
}

/// Probes of every surface a [`MemoryEngine`] created, in creation order.
#[derive(Debug, Clone, Default)]
pub struct ProbeList {
    inner: Arc<Mutex<Vec<MemorySurfaceProbe>>>,
}

impl ProbeList {
    /// Probe by creation index.
    pub fn get(&self, index: usize) -> Option<MemorySurfaceProbe> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(index)
            .cloned()
    }

    /// Number of probes.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether no surface was created yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total destroy calls across all surfaces.
    pub fn total_destroys(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(MemorySurfaceProbe::destroy_count)
            .sum()
    }

    fn push(&self, probe: MemorySurfaceProbe) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(probe);
    }
}

/// Test-side view of a memory surface.
#[derive(Debug, Clone)]
pub struct MemorySurfaceProbe {
    state: Arc<Mutex<MemoryState>>,
    config: SurfaceConfig,
}

impl MemorySurfaceProbe {
    /// Configuration the surface was created with.
    pub fn config(&self) -> &SurfaceConfig {
        &self.config
    }

    /// Append one line of output and signal a content change.
    pub fn push_line(&self, line: impl Into<String>) {
        let mut state = lock(&self.state);
        state.lines.push(line.into());
        state.pending.push(EngineEvent::ContentChanged);
    }

    /// Replace all content and signal a content change.
    pub fn set_lines<I, S>(&self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut state = lock(&self.state);
        state.lines = lines.into_iter().map(Into::into).collect();
        state.pending.push(EngineEvent::ContentChanged);
    }

    /// Queue a working-directory report, as a shell would via OSC 7.
    pub fn report_directory(&self, path: impl Into<String>) {
        lock(&self.state)
            .pending
            .push(EngineEvent::DirectoryChanged(path.into()));
    }

    /// Break the surface; later operations see an invalid handle.
    pub fn invalidate(&self) {
        lock(&self.state).valid = false;
    }

    /// Every geometry passed to `resize`, in order.
    pub fn resize_calls(&self) -> Vec<SurfaceGeometry> {
        lock(&self.state).resize_calls.clone()
    }

    /// Current geometry.
    pub fn geometry(&self) -> SurfaceGeometry {
        lock(&self.state).geometry
    }

    /// How many times the surface was destroyed.
    pub fn destroy_count(&self) -> usize {
        lock(&self.state).destroy_count
    }

    /// How many `screen_text` queries were made.
    pub fn query_count(&self) -> usize {
        lock(&self.state).query_count
    }
}

struct MemorySurface {
    state: Arc<Mutex<MemoryState>>,
}

impl EngineSurface for MemorySurface {
    fn is_valid(&self) -> bool {
        lock(&self.state).valid
    }

    fn resize(&mut self, geometry: SurfaceGeometry) -> Result<()> {
        let mut state = lock(&self.state);
        state.geometry = geometry;
        state.resize_calls.push(geometry);
        Ok(())
    }

    fn line_count(&self) -> usize {
        lock(&self.state).lines.len()
    }

    fn viewport_start(&self) -> usize {
        let state = lock(&self.state);
        state
            .lines
            .len()
            .saturating_sub(usize::from(state.geometry.cells.rows))
    }

    fn screen_text(&self, from_line: usize, to_line: usize) -> Result<String> {
        let mut state = lock(&self.state);
        state.query_count += 1;
        let end = to_line.min(state.lines.len());
        let start = from_line.min(end);
        Ok(state.lines[start..end].join("\n"))
    }

    fn poll_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut lock(&self.state).pending)
    }

    fn destroy(self: Box<Self>) {
        let mut state = lock(&self.state);
        state.destroy_count += 1;
        state.valid = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use termdeck_core::{CellMetrics, Dimensions, DisplayRegion};

    fn config(rows: u16) -> SurfaceConfig {
        SurfaceConfig::new(SurfaceGeometry::from_region(
            DisplayRegion::sized(640, u32::from(rows) * 16),
            CellMetrics::default(),
        ))
    }

    #[test]
    fn test_create_and_query() {
        let mut engine = MemoryEngine::new();
        let surface = engine.create_surface(&config(24)).unwrap();
        let probe = engine.probe(0).unwrap();

        probe.set_lines(["a", "b", "c"]);
        assert_eq!(surface.line_count(), 3);
        assert_eq!(surface.screen_text(1, 3).unwrap(), "b\nc");
        assert_eq!(surface.screen_text(0, 100).unwrap(), "a\nb\nc");
        assert_eq!(surface.screen_text(5, 9).unwrap(), "");
        assert_eq!(probe.query_count(), 3);
    }

    #[test]
    fn test_viewport_follows_geometry() {
        let mut engine = MemoryEngine::new();
        let surface = engine.create_surface(&config(2)).unwrap();
        let probe = engine.probe(0).unwrap();

        probe.set_lines(["1", "2", "3", "4", "5"]);
        assert_eq!(surface.viewport_start(), 3);
    }

    #[test]
    fn test_fail_next_create() {
        let mut engine = MemoryEngine::new();
        engine.fail_next_create("out of ptys");

        let result = engine.create_surface(&config(24));
        assert!(matches!(result, Err(Error::EngineHandleCreation(_))));

        // Only the next call fails
        assert!(engine.create_surface(&config(24)).is_ok());
        assert_eq!(engine.created_count(), 1);
    }

    #[test]
    fn test_invalid_next_create() {
        let mut engine = MemoryEngine::new();
        engine.invalid_next_create();
        let broken = engine.create_surface(&config(24)).unwrap();
        let healthy = engine.create_surface(&config(24)).unwrap();
        assert!(!broken.is_valid());
        assert!(healthy.is_valid());
    }

    #[test]
    fn test_events_drain() {
        let mut engine = MemoryEngine::new();
        let mut surface = engine.create_surface(&config(24)).unwrap();
        let probe = engine.probe(0).unwrap();

        probe.push_line("hello");
        probe.report_directory("/tmp");

        let events = surface.poll_events();
        assert_eq!(
            events,
            vec![
                EngineEvent::ContentChanged,
                EngineEvent::DirectoryChanged("/tmp".to_string())
            ]
        );
        assert!(surface.poll_events().is_empty());
    }

    #[test]
    fn test_resize_recorded() {
        let mut engine = MemoryEngine::new();
        let mut surface = engine.create_surface(&config(24)).unwrap();
        let probe = engine.probe(0).unwrap();

        let geometry = config(30).geometry;
        surface.resize(geometry).unwrap();
        surface.resize(geometry).unwrap();

        assert_eq!(probe.resize_calls().len(), 2);
        assert_eq!(probe.geometry().cells, Dimensions::new(30, 80));
    }

    #[test]
    fn test_probe_list_outlives_engine() {
        let mut engine = MemoryEngine::new();
        let probes = engine.probe_list();
        assert!(probes.is_empty());

        let surface = engine.create_surface(&config(24)).unwrap();
        drop(engine);

        surface.destroy();
        assert_eq!(probes.len(), 1);
        assert_eq!(probes.get(0).unwrap().destroy_count(), 1);
        assert_eq!(probes.total_destroys(), 1);
        assert!(probes.get(1).is_none());
    }
}
