//! Full-cycle pipeline adapters.
//!
//! The controller only forwards the full-cycle button; the orchestrator
//! (news fetch → mood → music generation) runs as a separate process and
//! publishes its result at the configured asset path.

use std::process::{Child, Command, Stdio};

use log::{info, warn};

use crate::app::ports::PipelinePort;

/// Runs the orchestrator command in the background.  At most one cycle
/// runs at a time; a trigger while one is running is refused.
pub struct CommandPipeline {
    argv: Vec<String>,
    running: Option<Child>,
}

impl CommandPipeline {
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv, running: None }
    }

    /// Whether a previously launched cycle is still running.
    pub fn is_running(&mut self) -> bool {
        let Some(child) = self.running.as_mut() else {
            return false;
        };
        match child.try_wait() {
            Ok(Some(status)) => {
                info!("full cycle finished: {}", status);
                self.running = None;
                false
            }
            Ok(None) => true,
            Err(e) => {
                warn!("polling full cycle failed: {}", e);
                self.running = None;
                false
            }
        }
    }
}

impl PipelinePort for CommandPipeline {
    fn trigger_full_cycle(&mut self) -> bool {
        if self.is_running() {
            warn!("full cycle already running, request ignored");
            return false;
        }
        let Some((program, args)) = self.argv.split_first() else {
            warn!("no full cycle command configured");
            return false;
        };
        match Command::new(program).args(args).stdin(Stdio::null()).spawn() {
            Ok(child) => {
                info!("full cycle launched (pid {})", child.id());
                self.running = Some(child);
                true
            }
            Err(e) => {
                warn!("launching full cycle failed: {}", e);
                false
            }
        }
    }
}

/// Stand-in that only logs the request.
#[derive(Debug, Default)]
pub struct LogPipeline {
    requests: u32,
}

impl LogPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> u32 {
        self.requests
    }
}

impl PipelinePort for LogPipeline {
    fn trigger_full_cycle(&mut self) -> bool {
        self.requests += 1;
        info!("[sim] full cycle requested (#{})", self.requests);
        true
    }
}
