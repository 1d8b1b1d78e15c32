//! Playback engine adapters.
//!
//! | Adapter         | Backend                                           |
//! |-----------------|---------------------------------------------------|
//! | `CommandEngine` | External player process (`aplay` by default)      |
//! | `SimEngine`     | In-memory transport with a fixed track length     |
//!
//! `CommandEngine` pauses and resumes by stopping / continuing the player
//! process; the child is reaped on stop, on end of track, and on drop.

use std::io;
use std::path::Path;
use std::process::{Child, Command, Stdio};

use embassy_time::{Duration, Instant};
use log::{debug, info, warn};

use crate::app::ports::PlaybackEngine;
use crate::error::EngineFault;

/// Placeholder replaced with the asset path in the argv template.
pub const ASSET_PLACEHOLDER: &str = "{asset}";

// ── Process-backed engine ─────────────────────────────────────

pub struct CommandEngine {
    argv: Vec<String>,
    child: Option<Child>,
    paused: bool,
}

impl CommandEngine {
    pub fn new(argv: Vec<String>) -> Self {
        Self {
            argv,
            child: None,
            paused: false,
        }
    }

    fn command_for(&self, asset: &Path) -> Result<Command, EngineFault> {
        let (program, args) = self.argv.split_first().ok_or(EngineFault::SpawnFailed)?;
        let mut cmd = Command::new(program);
        for arg in args {
            if arg == ASSET_PLACEHOLDER {
                cmd.arg(asset);
            } else {
                cmd.arg(arg);
            }
        }
        cmd.stdin(Stdio::null()).stdout(Stdio::null());
        Ok(cmd)
    }

    fn signal(&self, sig: &str) -> Result<(), EngineFault> {
        let Some(child) = self.child.as_ref() else {
            debug!("no player process for {}", sig);
            return Ok(());
        };
        let status = Command::new("kill")
            .arg(sig)
            .arg(child.id().to_string())
            .status()
            .map_err(|_| EngineFault::CommandFailed)?;
        if status.success() {
            Ok(())
        } else {
            Err(EngineFault::CommandFailed)
        }
    }

    fn reap(&mut self) -> io::Result<()> {
        if let Some(mut child) = self.child.take() {
            match child.kill() {
                Ok(()) => {}
                // Already exited.
                Err(e) if e.kind() == io::ErrorKind::InvalidInput => {}
                Err(e) => return Err(e),
            }
            child.wait()?;
        }
        self.paused = false;
        Ok(())
    }
}

impl PlaybackEngine for CommandEngine {
    fn start(&mut self, asset: &Path) -> Result<(), EngineFault> {
        if !asset.is_file() {
            return Err(EngineFault::AssetMissing);
        }
        self.reap().map_err(|_| EngineFault::CommandFailed)?;
        let child = self
            .command_for(asset)?
            .spawn()
            .map_err(|e| {
                warn!("spawning {:?} failed: {}", self.argv.first(), e);
                EngineFault::SpawnFailed
            })?;
        info!("playing {} (pid {})", asset.display(), child.id());
        self.child = Some(child);
        Ok(())
    }

    fn pause(&mut self) -> Result<(), EngineFault> {
        self.signal("-STOP")?;
        self.paused = self.child.is_some();
        Ok(())
    }

    fn resume(&mut self) -> Result<(), EngineFault> {
        self.signal("-CONT")?;
        self.paused = false;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), EngineFault> {
        self.reap().map_err(|_| EngineFault::CommandFailed)
    }

    fn is_finished(&mut self) -> bool {
        if self.paused {
            return false;
        }
        let Some(child) = self.child.as_mut() else {
            return false;
        };
        match child.try_wait() {
            Ok(Some(status)) => {
                debug!("player exited: {}", status);
                self.child = None;
                true
            }
            Ok(None) => false,
            Err(e) => {
                warn!("polling player process failed: {}", e);
                false
            }
        }
    }
}

impl Drop for CommandEngine {
    fn drop(&mut self) {
        if let Err(e) = self.reap() {
            warn!("player cleanup failed: {}", e);
        }
    }
}

// ── Simulated engine ──────────────────────────────────────────

/// Transport without audio.  A started track "plays" for `track_len` of
/// unpaused time, then reports finished once.
pub struct SimEngine {
    track_len: Duration,
    played: Duration,
    resumed_at: Option<Instant>,
    loaded: bool,
}

impl SimEngine {
    pub fn new(track_len: Duration) -> Self {
        Self {
            track_len,
            played: Duration::from_ticks(0),
            resumed_at: None,
            loaded: false,
        }
    }

    fn position(&self) -> Duration {
        self.played + self.resumed_at.map_or(Duration::from_ticks(0), |t| t.elapsed())
    }
}

impl PlaybackEngine for SimEngine {
    fn start(&mut self, asset: &Path) -> Result<(), EngineFault> {
        info!("[sim] playing {}", asset.display());
        self.played = Duration::from_ticks(0);
        self.resumed_at = Some(Instant::now());
        self.loaded = true;
        Ok(())
    }

    fn pause(&mut self) -> Result<(), EngineFault> {
        self.played = self.position();
        self.resumed_at = None;
        info!("[sim] paused at {}s", self.played.as_secs());
        Ok(())
    }

    fn resume(&mut self) -> Result<(), EngineFault> {
        if self.loaded && self.resumed_at.is_none() {
            self.resumed_at = Some(Instant::now());
            info!("[sim] resumed");
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), EngineFault> {
        if self.loaded {
            info!("[sim] stopped");
        }
        self.loaded = false;
        self.resumed_at = None;
        Ok(())
    }

    fn is_finished(&mut self) -> bool {
        if self.loaded && self.resumed_at.is_some() && self.position() >= self.track_len {
            self.loaded = false;
            self.resumed_at = None;
            return true;
        }
        false
    }
}
