//! Remote downloads with bounded retries
//!
//! Every attempt streams into a temporary file next to the destination and
//! only a complete body is renamed into place. A failed attempt leaves nothing
//! behind at the destination path. An interrupt stops the stream, the retry
//! backoff, and the persisting of a body that arrived after it.

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tempfile::NamedTempFile;

use crate::error::{InstallerError, Result};
use crate::progress::DownloadProgress;
use crate::settings::DownloadPolicy;
use crate::signal::sleep_unless_interrupted;

/// Moves bytes from a URL into a writer
pub trait Transport {
    /// Fetch the whole body of `url` into `sink`, returning the byte count
    fn fetch_into(&self, url: &str, sink: &mut dyn Write) -> std::result::Result<u64, String>;
}

/// HTTP(S) transport on a ureq agent
pub struct HttpTransport<'a> {
    agent: ureq::Agent,
    interrupted: &'a AtomicBool,
}

impl<'a> HttpTransport<'a> {
    pub fn new(policy: &DownloadPolicy, interrupted: &'a AtomicBool) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(policy.connect_timeout)
            .timeout_read(policy.read_timeout)
            .user_agent(concat!("asl-extras/", env!("CARGO_PKG_VERSION")))
            .build();
        Self { agent, interrupted }
    }
}

/// Fails the next read once the interrupt flag is up
struct InterruptibleReader<'a, R> {
    inner: R,
    interrupted: &'a AtomicBool,
}

impl<R: Read> Read for InterruptibleReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        // ErrorKind::Interrupted would be retried by io::copy
        if self.interrupted.load(Ordering::SeqCst) {
            return Err(io::Error::other("download interrupted"));
        }
        self.inner.read(buf)
    }
}

impl Transport for HttpTransport<'_> {
    fn fetch_into(&self, url: &str, sink: &mut dyn Write) -> std::result::Result<u64, String> {
        let response = self.agent.get(url).call().map_err(|e| e.to_string())?;
        let total = response
            .header("Content-Length")
            .and_then(|v| v.parse::<u64>().ok());
        let name = url.rsplit('/').next().unwrap_or(url);

        let progress = DownloadProgress::new(total, name);
        let mut reader = progress.wrap(InterruptibleReader {
            inner: response.into_reader(),
            interrupted: self.interrupted,
        });
        match std::io::copy(&mut reader, sink) {
            Ok(written) => {
                progress.finish();
                match total {
                    Some(expected) if expected != written => Err(format!(
                        "body truncated: got {written} of {expected} bytes"
                    )),
                    _ => Ok(written),
                }
            }
            Err(e) => {
                progress.abandon();
                Err(e.to_string())
            }
        }
    }
}

/// State of one download while it is being retried
#[derive(Debug)]
struct DownloadAttempt<'a> {
    url: &'a str,
    dest: &'a Path,
    attempt: u32,
    last_error: Option<String>,
}

/// Fetches remote resources to local files
pub struct Downloader<'a> {
    transport: &'a dyn Transport,
    max_attempts: u32,
    backoff: Duration,
    interrupted: &'a AtomicBool,
}

impl<'a> Downloader<'a> {
    pub fn new(
        transport: &'a dyn Transport,
        policy: &DownloadPolicy,
        interrupted: &'a AtomicBool,
    ) -> Self {
        Self {
            transport,
            max_attempts: policy.max_attempts.max(1),
            backoff: policy.backoff,
            interrupted,
        }
    }

    /// Download `url` to `dest`, retrying transport failures
    pub fn fetch(&self, url: &str, dest: &Path) -> Result<PathBuf> {
        let mut state = DownloadAttempt {
            url,
            dest,
            attempt: 0,
            last_error: None,
        };

        while state.attempt < self.max_attempts {
            if self.interrupted.load(Ordering::SeqCst) {
                return Err(InstallerError::Interrupted);
            }
            state.attempt += 1;
            tracing::info!("downloading {} (attempt {})", state.url, state.attempt);

            let result = self.attempt(&state);
            if self.interrupted.load(Ordering::SeqCst) {
                return Err(InstallerError::Interrupted);
            }
            match result {
                Ok(bytes) => {
                    tracing::debug!("saved {bytes} bytes to {}", state.dest.display());
                    return Ok(state.dest.to_path_buf());
                }
                Err(reason) => {
                    tracing::warn!(
                        "download attempt {}/{} for {} failed: {reason}",
                        state.attempt,
                        self.max_attempts,
                        state.url
                    );
                    state.last_error = Some(reason);
                    if state.attempt < self.max_attempts
                        && sleep_unless_interrupted(self.interrupted, self.backoff)
                    {
                        return Err(InstallerError::Interrupted);
                    }
                }
            }
        }

        Err(InstallerError::DownloadFailed {
            url: url.to_string(),
            attempts: state.attempt,
            reason: state.last_error.unwrap_or_default(),
        })
    }

    fn attempt(&self, state: &DownloadAttempt<'_>) -> std::result::Result<u64, String> {
        let dir = state
            .dest
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let mut partial = NamedTempFile::new_in(dir).map_err(|e| e.to_string())?;

        let bytes = self.transport.fetch_into(state.url, partial.as_file_mut())?;
        if self.interrupted.load(Ordering::SeqCst) {
            return Err("interrupted".to_string());
        }
        partial.as_file_mut().flush().map_err(|e| e.to_string())?;
        partial.persist(state.dest).map_err(|e| e.error.to_string())?;
        Ok(bytes)
    }
}
