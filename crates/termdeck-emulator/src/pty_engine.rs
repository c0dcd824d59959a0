//! Reference engine backed by real PTYs.

use tracing::{debug, info, warn};

use termdeck_core::{Error, Result, SurfaceConfig, SurfaceGeometry, TerminalSettings};

use crate::engine::{EngineEvent, EngineSurface, TerminalEngine};
use crate::parser::Parser;
use crate::pty::{PtyHandle, SpawnOptions};
use crate::screen::Screen;

/// Upper bound on reads per poll so a chatty child cannot stall a tick.
const MAX_READS_PER_POLL: usize = 64;

/// Engine that runs a shell per surface in a PTY.
#[derive(Debug, Clone)]
pub struct PtyEngine {
    settings: TerminalSettings,
}

impl PtyEngine {
    /// Create an engine using the given terminal settings.
    pub fn new(settings: TerminalSettings) -> Self {
        Self { settings }
    }

    /// Shell for a surface: the surface config, then settings, then `$SHELL`,
    /// then a platform default.
    pub fn resolve_shell(&self, config: &SurfaceConfig) -> String {
        config
            .shell
            .clone()
            .or_else(|| self.settings.shell.clone())
            .or_else(|| std::env::var("SHELL").ok().filter(|s| !s.is_empty()))
            .unwrap_or_else(|| {
                if cfg!(windows) {
                    "powershell.exe".to_string()
                } else {
                    "/bin/sh".to_string()
                }
            })
    }
}

impl TerminalEngine for PtyEngine {
    fn create_surface(&mut self, config: &SurfaceConfig) -> Result<Box<dyn EngineSurface>> {
        let shell = self.resolve_shell(config);
        let options = SpawnOptions {
            geometry: config.geometry,
            cwd: config.working_directory.clone(),
            env: config.env.clone(),
            term: self.settings.term.clone(),
        };

        let pty = PtyHandle::spawn(&shell, &[], options)
            .map_err(|e| Error::EngineHandleCreation(e.to_string()))?;
        let screen = Screen::new(config.geometry.cells, self.settings.scrollback_lines);

        info!("PTY surface created: shell='{}'", shell);
        Ok(Box::new(PtySurface {
            pty,
            parser: Parser::new(screen),
            exited: false,
        }))
    }
}

/// One shell in a PTY, with its screen.
#[derive(Debug)]
pub struct PtySurface {
    pty: PtyHandle,
    parser: Parser,
    exited: bool,
}

impl PtySurface {
    /// Send input to the shell.
    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        self.pty.write(data)
    }
}

impl EngineSurface for PtySurface {
    fn is_valid(&self) -> bool {
        !self.exited
    }

    fn resize(&mut self, geometry: SurfaceGeometry) -> Result<()> {
        self.pty
            .resize(geometry)
            .map_err(|e| Error::Engine(e.to_string()))?;
        self.parser.screen_mut().resize(geometry.cells);
        Ok(())
    }

    fn line_count(&self) -> usize {
        self.parser.screen().line_count()
    }

    fn viewport_start(&self) -> usize {
        self.parser.screen().viewport_start()
    }

    fn screen_text(&self, from_line: usize, to_line: usize) -> Result<String> {
        Ok(self.parser.screen().lines(from_line, to_line).join("\n"))
    }

    fn poll_events(&mut self) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        if self.exited {
            return events;
        }

        let mut total = 0;
        for _ in 0..MAX_READS_PER_POLL {
            match self.pty.read() {
                Ok(bytes) if bytes.is_empty() => break,
                Ok(bytes) => {
                    total += bytes.len();
                    self.parser.process(&bytes);
                }
                Err(e) => {
                    // EIO once the child side has closed
                    debug!("PTY read ended: {}", e);
                    self.exited = true;
                    break;
                }
            }
        }

        if total > 0 {
            events.push(EngineEvent::ContentChanged);
        }
        if let Some(dir) = self.parser.take_reported_directory() {
            events.push(EngineEvent::DirectoryChanged(dir));
        }
        if !self.exited && !self.pty.is_alive() {
            info!("PTY child exited");
            self.exited = true;
        }

        events
    }

    fn destroy(mut self: Box<Self>) {
        if let Err(e) = self.pty.kill() {
            warn!("Failed to kill PTY child: {}", e);
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};
    use termdeck_core::{CellMetrics, DisplayRegion};

    fn config() -> SurfaceConfig {
        SurfaceConfig::new(SurfaceGeometry::from_region(
            DisplayRegion::sized(640, 384),
            CellMetrics::default(),
        ))
        .with_shell("sh")
    }

    fn poll_until(surface: &mut PtySurface, mut done: impl FnMut(&PtySurface, &[EngineEvent]) -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            let events = surface.poll_events();
            if done(surface, &events) {
                return true;
            }
            std::thread::sleep(Duration::from_millis(20));
        }
        false
    }

    fn spawn(config: &SurfaceConfig) -> PtySurface {
        let settings = TerminalSettings::default();
        let shell = PtyEngine::new(settings.clone()).resolve_shell(config);
        let options = SpawnOptions {
            geometry: config.geometry,
            cwd: config.working_directory.clone(),
            env: config.env.clone(),
            term: settings.term.clone(),
        };
        PtySurface {
            pty: PtyHandle::spawn(&shell, &[], options).unwrap(),
            parser: Parser::new(Screen::new(config.geometry.cells, settings.scrollback_lines)),
            exited: false,
        }
    }

    #[test]
    fn test_resolve_shell_prefers_surface_config() {
        let mut settings = TerminalSettings::default();
        settings.shell = Some("/bin/bash".to_string());
        let engine = PtyEngine::new(settings);

        assert_eq!(engine.resolve_shell(&config()), "sh");

        let mut no_shell = config();
        no_shell.shell = None;
        assert_eq!(engine.resolve_shell(&no_shell), "/bin/bash");
    }

    #[test]
    fn test_create_surface() {
        let mut engine = PtyEngine::new(TerminalSettings::default());
        let surface = engine.create_surface(&config()).unwrap();
        assert!(surface.is_valid());
        surface.destroy();
    }

    #[test]
    fn test_create_surface_failure() {
        let mut engine = PtyEngine::new(TerminalSettings::default());
        let result = engine.create_surface(&config().with_shell("/definitely/not/a/shell"));
        assert!(matches!(result, Err(Error::EngineHandleCreation(_))));
    }

    #[test]
    fn test_output_reaches_screen() {
        let mut surface = spawn(&config());
        surface.write(b"echo screen-$((6*7))\n").unwrap();

        let found = poll_until(&mut surface, |s, _| {
            let end = s.line_count();
            s.screen_text(0, end).unwrap().contains("screen-42")
        });
        assert!(found);
        Box::new(surface).destroy();
    }

    #[test]
    fn test_osc7_reported_as_event() {
        let mut surface = spawn(&config());
        surface
            .write(b"printf '\\033]7;file://localhost/var/tmp\\007'\n")
            .unwrap();

        let found = poll_until(&mut surface, |_, events| {
            events.contains(&EngineEvent::DirectoryChanged("/var/tmp".to_string()))
        });
        assert!(found);
        Box::new(surface).destroy();
    }

    #[test]
    fn test_exit_invalidates_surface() {
        let mut surface = spawn(&config());
        surface.write(b"exit\n").unwrap();

        let exited = poll_until(&mut surface, |s, _| !s.is_valid());
        assert!(exited);
        Box::new(surface).destroy();
    }
}
