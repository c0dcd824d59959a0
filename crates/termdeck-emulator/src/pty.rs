//! PTY (Pseudo-Terminal) handling with portable-pty.

use portable_pty::{native_pty_system, Child, ChildKiller, CommandBuilder, MasterPty, PtySize};
use std::io::{Read, Write};
use tracing::{debug, error, info, warn};

use termdeck_core::{Error, Result, SurfaceGeometry};

/// Options for spawning a PTY child.
#[derive(Debug, Clone)]
pub struct SpawnOptions {
    /// Initial geometry
    pub geometry: SurfaceGeometry,
    /// Working directory
    pub cwd: Option<String>,
    /// Extra environment variables
    pub env: Vec<(String, String)>,
    /// TERM value
    pub term: String,
}

/// Handle to a spawned PTY process.
pub struct PtyHandle {
    master: Box<dyn MasterPty + Send>,
    child: Box<dyn Child + Send + Sync>,
    writer: Box<dyn Write + Send>,
    /// Kept as a field so the master FD stays non-blocking
    reader: Box<dyn Read + Send>,
    geometry: SurfaceGeometry,
}

impl std::fmt::Debug for PtyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PtyHandle")
            .field("geometry", &self.geometry)
            .finish_non_exhaustive()
    }
}

fn pty_size(geometry: SurfaceGeometry) -> PtySize {
    PtySize {
        rows: geometry.cells.rows,
        cols: geometry.cells.cols,
        pixel_width: geometry.pixel_width.min(u32::from(u16::MAX)) as u16,
        pixel_height: geometry.pixel_height.min(u32::from(u16::MAX)) as u16,
    }
}

impl PtyHandle {
    /// Spawn `command` in a new PTY.
    pub fn spawn(command: &str, args: &[String], options: SpawnOptions) -> Result<Self> {
        info!(
            "Spawning PTY: command='{}' args={:?}, cells={}x{}, cwd={:?}",
            command,
            args,
            options.geometry.cells.rows,
            options.geometry.cells.cols,
            options.cwd
        );

        let pty_system = native_pty_system();
        let pair = pty_system
            .openpty(pty_size(options.geometry))
            .map_err(|e| {
                error!("Failed to open PTY: {}", e);
                Error::Pty(format!("Failed to open PTY: {e}"))
            })?;

        let mut cmd = CommandBuilder::new(command);
        cmd.args(args);
        cmd.env("TERM", &options.term);
        for (key, value) in &options.env {
            cmd.env(key, value);
        }
        if let Some(dir) = &options.cwd {
            debug!("Setting working directory to: {}", dir);
            cmd.cwd(dir);
        }

        let child = pair.slave.spawn_command(cmd).map_err(|e| {
            error!("Failed to spawn command '{}': {}", command, e);
            Error::Pty(format!("Failed to spawn command: {e}"))
        })?;

        let writer = pair
            .master
            .take_writer()
            .map_err(|e| Error::Pty(format!("Failed to take writer: {e}")))?;
        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| Error::Pty(format!("Failed to clone reader: {e}")))?;

        // Reads happen on the host's tick and must never block it
        #[cfg(unix)]
        {
            if let Some(master_fd) = pair.master.as_raw_fd() {
                // SAFETY: fcntl on a descriptor owned by `pair.master`, which
                // outlives this block.
                unsafe {
                    let flags = libc::fcntl(master_fd, libc::F_GETFL, 0);
                    if flags == -1
                        || libc::fcntl(master_fd, libc::F_SETFL, flags | libc::O_NONBLOCK) == -1
                    {
                        warn!("Failed to set master PTY FD {} non-blocking", master_fd);
                    }
                }
            }
        }

        info!("PTY spawned successfully: command='{}'", command);

        Ok(Self {
            master: pair.master,
            child,
            writer,
            reader,
            geometry: options.geometry,
        })
    }

    /// Read available output (non-blocking). Returns an empty vec when idle.
    pub fn read(&mut self) -> Result<Vec<u8>> {
        let mut buffer = vec![0u8; 4096];
        match self.reader.read(&mut buffer) {
            Ok(n) => {
                buffer.truncate(n);
                if n > 0 {
                    debug!("Read {} bytes from PTY", n);
                }
                Ok(buffer)
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(Vec::new()),
            Err(e) => Err(Error::Io(e)),
        }
    }

    /// Write data to the PTY.
    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        debug!("Writing {} bytes to PTY", data.len());
        self.writer.write_all(data)?;
        self.writer.flush()?;
        Ok(data.len())
    }

    /// Resize the PTY; the child receives SIGWINCH.
    pub fn resize(&mut self, geometry: SurfaceGeometry) -> Result<()> {
        debug!(
            "Resizing PTY to {}x{}",
            geometry.cells.rows, geometry.cells.cols
        );
        self.master
            .resize(pty_size(geometry))
            .map_err(|e| Error::Pty(format!("Resize failed: {e}")))?;
        self.geometry = geometry;
        Ok(())
    }

    /// Current geometry.
    pub fn geometry(&self) -> SurfaceGeometry {
        self.geometry
    }

    /// Check if the child process is still running.
    pub fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Kill the child process and reap it.
    pub fn kill(&mut self) -> Result<()> {
        if !self.is_alive() {
            return Ok(());
        }
        info!("Killing PTY process");
        self.child
            .kill()
            .map_err(|e| Error::Pty(format!("Kill failed: {e}")))?;
        let _ = self.child.try_wait();
        Ok(())
    }
}
