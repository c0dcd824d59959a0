//! Host integration shim.
//!
//! Receives lifecycle callbacks from the windowing shell and routes them to
//! the session manager. The manager sits behind one mutex, so callbacks may
//! arrive from any thread and are applied in delivery order.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{debug, info, warn};

use termdeck_core::{
    CaptureSettings, DisplayRegion, InvalidationReason, Notification, Result, SurfaceId,
    SurfaceInfo,
};

use crate::manager::SessionManager;
use crate::thumbnail::Thumbnail;

/// What a tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    /// Surfaces whose thumbnail was re-rendered
    pub refreshed: Vec<SurfaceId>,
    /// Surfaces removed because their engine handle broke
    pub removed: Vec<SurfaceId>,
}

impl TickReport {
    /// Whether the tick changed nothing.
    pub fn is_idle(&self) -> bool {
        self.refreshed.is_empty() && self.removed.is_empty()
    }
}

/// Result of routing one notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched {
    /// A tick ran
    Tick(TickReport),
    /// Every thumbnail was marked stale
    Wake {
        /// Number of surfaces marked
        marked: usize,
    },
    /// The notification was applied to one surface
    Surface(SurfaceId),
}

/// Shared front door to a [`SessionManager`].
#[derive(Debug, Clone)]
pub struct HostShim {
    manager: Arc<Mutex<SessionManager>>,
    capture: CaptureSettings,
}

impl HostShim {
    /// Wrap a manager.
    pub fn new(manager: SessionManager, capture: CaptureSettings) -> Self {
        Self::from_shared(Arc::new(Mutex::new(manager)), capture)
    }

    /// Share an already wrapped manager.
    pub fn from_shared(manager: Arc<Mutex<SessionManager>>, capture: CaptureSettings) -> Self {
        Self { manager, capture }
    }

    /// Capture budgets used for previews.
    pub fn capture_settings(&self) -> &CaptureSettings {
        &self.capture
    }

    fn lock(&self) -> MutexGuard<'_, SessionManager> {
        self.manager.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Route one notification.
    pub fn dispatch(&self, notification: Notification) -> Result<Dispatched> {
        match notification {
            Notification::Tick => Ok(Dispatched::Tick(self.on_tick())),
            Notification::Wake => Ok(Dispatched::Wake {
                marked: self.on_wake(),
            }),
            Notification::DirectoryChanged { surface, path } => {
                self.on_directory_changed(surface, path)?;
                Ok(Dispatched::Surface(surface))
            }
            Notification::ContentChanged { surface } => {
                self.on_content_changed(surface)?;
                Ok(Dispatched::Surface(surface))
            }
        }
    }

    /// Periodic tick: apply pending engine events, then re-render stale
    /// thumbnails. Surfaces with a broken handle are removed.
    pub fn on_tick(&self) -> TickReport {
        let mut manager = self.lock();
        let mut report = TickReport::default();

        for id in manager.ids() {
            if let Err(e) = manager.with_surface(id, |s| s.pump_engine_events()) {
                if e.is_fatal_for_surface() {
                    report.removed.push(id);
                } else {
                    warn!("Failed to apply engine events for {}: {}", id, e);
                }
                continue;
            }

            let dirty = manager.get(id).is_ok_and(|s| s.is_dirty());
            if !dirty {
                continue;
            }

            match manager.refresh_thumbnail(id) {
                Ok(_) => report.refreshed.push(id),
                Err(e) if e.is_fatal_for_surface() => report.removed.push(id),
                Err(e) => warn!("Thumbnail refresh failed for {}: {}", id, e),
            }
        }

        if !report.is_idle() {
            debug!(
                "Tick: {} refreshed, {} removed",
                report.refreshed.len(),
                report.removed.len()
            );
        }
        report
    }

    /// Host woke up: every thumbnail may be stale.
    pub fn on_wake(&self) -> usize {
        let marked = self.lock().mark_all_dirty(InvalidationReason::Wake);
        debug!("Wake: marked {} thumbnails stale", marked);
        marked
    }

    /// The shell in `id` reported a new working directory.
    pub fn on_directory_changed(&self, id: SurfaceId, path: impl Into<String>) -> Result<()> {
        self.lock().set_working_directory(id, path)
    }

    /// The engine reported new content for `id`.
    pub fn on_content_changed(&self, id: SurfaceId) -> Result<()> {
        self.lock().with_surface(id, |s| s.note_content_changed())
    }

    /// Open a new terminal. Failure is logged and returned; existing
    /// terminals are unaffected.
    pub fn create_terminal(&self, region: DisplayRegion) -> Result<SurfaceId> {
        self.lock().create_session(region).map_err(|e| {
            warn!("Could not open a new terminal: {}", e);
            e
        })
    }

    /// Select a terminal.
    pub fn select_terminal(&self, id: SurfaceId) -> Result<()> {
        self.lock().select(id)
    }

    /// Select the terminal at an ordinal position.
    pub fn select_terminal_at_index(&self, index: usize) -> Result<()> {
        self.lock().select_at_index(index)
    }

    /// Close a terminal.
    pub fn remove_terminal(&self, id: SurfaceId) -> Result<()> {
        self.lock().remove(id)
    }

    /// Resize a terminal.
    pub fn resize_terminal(&self, id: SurfaceId, region: DisplayRegion) -> Result<()> {
        self.lock().update_size(id, region)
    }

    /// The selected terminal.
    pub fn selected_terminal(&self) -> Option<SurfaceId> {
        self.lock().selected_id()
    }

    /// Every terminal, in order.
    pub fn all_terminals(&self) -> Vec<SurfaceId> {
        self.lock().ids()
    }

    /// Listing of every terminal.
    pub fn terminal_infos(&self) -> Vec<SurfaceInfo> {
        self.lock().infos()
    }

    /// Thumbnail of a terminal, re-rendered only if stale.
    pub fn thumbnail(&self, id: SurfaceId) -> Result<Arc<Thumbnail>> {
        self.lock().refresh_thumbnail(id)
    }

    /// Latest output of a terminal, for overview tiles.
    pub fn preview(&self, id: SurfaceId) -> Result<String> {
        self.lock().preview(id, &self.capture)
    }

    /// First visible lines of a terminal, for a title banner.
    pub fn banner(&self, id: SurfaceId) -> Result<String> {
        self.lock().capture_head(
            id,
            self.capture.banner_lines,
            self.capture.banner_max_chars,
        )
    }

    /// Close every terminal.
    pub fn close_all(&self) {
        let mut manager = self.lock();
        info!("Host closing {} terminals", manager.len());
        manager.close_all();
    }
}
