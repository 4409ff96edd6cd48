//! Test doubles shared by unit tests.
//!
//! Nothing here touches the network, spawns a process or needs root:
//! - [`RecordingRunner`] records every command and answers from a closure
//! - [`StaticTransport`] serves a fixed body for every URL
//! - [`CountingConfirm`] counts acknowledgments instead of blocking
//! - [`host`] builds a host layout rooted in a temporary directory

use std::cell::{Cell, RefCell};
use std::io::Write;

use tempfile::TempDir;

use crate::download::Transport;
use crate::error::Result;
use crate::preflight::Confirm;
use crate::runner::{CommandOutput, CommandRunner, CommandSpec};
use crate::settings::{DownloadPolicy, Paths, Settings};

/// How a recorded command was run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Captured,
    Interactive,
}

type Responder = Box<dyn Fn(&CommandSpec) -> CommandOutput>;

pub struct RecordingRunner {
    calls: RefCell<Vec<(Mode, CommandSpec)>>,
    responder: Responder,
}

impl RecordingRunner {
    /// Every command succeeds
    pub fn ok() -> Self {
        Self::with(|_| CommandOutput::succeeded())
    }

    pub fn with(responder: impl Fn(&CommandSpec) -> CommandOutput + 'static) -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            responder: Box::new(responder),
        }
    }

    pub fn calls(&self) -> Vec<(Mode, CommandSpec)> {
        self.calls.borrow().clone()
    }

    /// Rendered command lines, in order
    pub fn lines(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .map(|(_, spec)| spec.to_string())
            .collect()
    }

    fn record(&self, mode: Mode, spec: &CommandSpec) -> CommandOutput {
        self.calls.borrow_mut().push((mode, spec.clone()));
        (self.responder)(spec)
    }
}

impl CommandRunner for RecordingRunner {
    fn run_captured(&self, spec: &CommandSpec) -> CommandOutput {
        self.record(Mode::Captured, spec)
    }

    fn run_interactive(&self, spec: &CommandSpec) -> CommandOutput {
        self.record(Mode::Interactive, spec)
    }
}

/// Serves the same body for every URL and remembers what was asked for
pub struct StaticTransport {
    pub body: Vec<u8>,
    pub urls: RefCell<Vec<String>>,
}

impl StaticTransport {
    pub fn new(body: &[u8]) -> Self {
        Self {
            body: body.to_vec(),
            urls: RefCell::new(Vec::new()),
        }
    }
}

impl Transport for StaticTransport {
    fn fetch_into(&self, url: &str, sink: &mut dyn Write) -> std::result::Result<u64, String> {
        self.urls.borrow_mut().push(url.to_string());
        sink.write_all(&self.body).map_err(|e| e.to_string())?;
        Ok(self.body.len() as u64)
    }
}

#[derive(Default)]
pub struct CountingConfirm {
    pub count: Cell<u32>,
}

impl Confirm for CountingConfirm {
    fn acknowledge(&self, _message: &str) -> Result<()> {
        self.count.set(self.count.get() + 1);
        Ok(())
    }
}

/// Settings rooted in a fresh temp dir with instant retries
pub fn host() -> (TempDir, Settings) {
    let temp = TempDir::new().expect("Failed to create temp directory");
    let settings = Settings {
        paths: Paths::rooted_at(temp.path()),
        download: DownloadPolicy {
            backoff: std::time::Duration::ZERO,
            ..DownloadPolicy::default()
        },
        ..Settings::default()
    };
    for dir in ["etc", "proc/self", "var/tmp", "var/log"] {
        std::fs::create_dir_all(temp.path().join(dir)).expect("Failed to create host dir");
    }
    (temp, settings)
}
