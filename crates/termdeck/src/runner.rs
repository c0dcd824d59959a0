//! Tick driver standing in for a windowing shell.
//!
//! Opens the startup terminals, delivers a tick on every interval, and logs
//! an overview of the deck whenever its membership changes.

use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use termdeck_core::{DeckConfig, Result, SurfaceId, SurfaceInfo};
use termdeck_emulator::TerminalEngine;
use termdeck_session::{HostShim, SessionManager, TickReport};

/// One terminal as shown in an overview.
#[derive(Debug, Clone, Serialize)]
pub struct OverviewTile {
    /// Terminal summary
    #[serde(flatten)]
    pub info: SurfaceInfo,
    /// First visible lines
    pub banner: String,
    /// Latest output
    pub preview: String,
}

/// Totals over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Ticks delivered
    pub ticks: u64,
    /// Thumbnails re-rendered
    pub refreshed: u64,
    /// Terminals removed because their handle broke
    pub removed: u64,
}

impl RunStats {
    fn record(&mut self, report: &TickReport) {
        self.ticks += 1;
        self.refreshed += report.refreshed.len() as u64;
        self.removed += report.removed.len() as u64;
    }
}

/// Drives a [`HostShim`] from a tokio interval.
#[derive(Debug, Clone)]
pub struct Runner {
    host: HostShim,
    config: DeckConfig,
    exit_when_empty: bool,
}

impl Runner {
    /// Build a runner around a fresh manager using `engine`.
    pub fn new(engine: Box<dyn TerminalEngine>, config: DeckConfig) -> Self {
        let manager = SessionManager::from_deck_config(engine, &config);
        let host = HostShim::new(manager, config.capture.clone());
        Self {
            host,
            config,
            exit_when_empty: true,
        }
    }

    /// Whether the run ends once every terminal has closed. Defaults to true.
    pub fn exit_when_empty(mut self, exit: bool) -> Self {
        self.exit_when_empty = exit;
        self
    }

    /// The host shim, for delivering notifications from elsewhere.
    pub fn host(&self) -> &HostShim {
        &self.host
    }

    /// Configuration in use.
    pub fn config(&self) -> &DeckConfig {
        &self.config
    }

    /// Open `count` terminals at the default region and select the first.
    ///
    /// Stops at the first failure; terminals already opened stay open.
    pub fn open_startup_sessions(&self, count: usize) -> Result<Vec<SurfaceId>> {
        let region = self.config.terminal.default_region;
        let mut opened = Vec::with_capacity(count);
        for _ in 0..count {
            opened.push(self.host.create_terminal(region)?);
        }

        if let Some(first) = opened.first() {
            self.host.select_terminal(*first)?;
        }
        info!("Opened {} startup terminals", opened.len());
        Ok(opened)
    }

    /// Overview of every terminal, in order.
    pub fn overview(&self) -> Vec<OverviewTile> {
        self.host
            .terminal_infos()
            .into_iter()
            .filter_map(|info| {
                let id = info.id;
                let banner = self.host.banner(id);
                let preview = self.host.preview(id);
                match (banner, preview) {
                    (Ok(banner), Ok(preview)) => Some(OverviewTile {
                        info,
                        banner,
                        preview,
                    }),
                    (Err(e), _) | (_, Err(e)) => {
                        warn!("Skipping terminal {} in overview: {}", id, e);
                        None
                    }
                }
            })
            .collect()
    }

    fn log_overview(&self) {
        let tiles = self.overview();
        info!("Deck: {} terminals", tiles.len());
        for tile in &tiles {
            let marker = if tile.info.selected { "*" } else { " " };
            info!(
                "{} [{}] {} {}x{} cwd={:?} last={:?}",
                marker,
                tile.info.index,
                tile.info.id,
                tile.info.dimensions.rows,
                tile.info.dimensions.cols,
                tile.info.working_directory,
                tile.preview.lines().last().unwrap_or_default()
            );
        }
    }

    /// Deliver ticks until `shutdown` resolves, or until the deck empties
    /// when [`exit_when_empty`](Self::exit_when_empty) is set.
    pub async fn run_until<F>(&self, shutdown: F) -> RunStats
    where
        F: Future<Output = ()>,
    {
        let period = Duration::from_millis(self.config.deck.tick_interval_ms);
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        let mut stats = RunStats::default();
        self.log_overview();

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
                _ = interval.tick() => {
                    let report = self.host.on_tick();
                    stats.record(&report);

                    if !report.removed.is_empty() {
                        info!("{} terminals closed", report.removed.len());
                        self.log_overview();
                    }
                    if self.exit_when_empty && self.host.all_terminals().is_empty() {
                        info!("All terminals closed");
                        break;
                    }
                }
            }
        }

        info!(
            "Ran {} ticks: {} thumbnails refreshed, {} terminals removed",
            stats.ticks, stats.refreshed, stats.removed
        );
        stats
    }

    /// Close every terminal.
    pub fn shutdown(&self) {
        self.host.close_all();
    }
}
