//! Scratch workspace management
//!
//! The workspace is a single directory that every step downloads and
//! extracts into. It is created only after preflight (so it lands on disk
//! when the temp mount was released) and removed exactly once when the run
//! ends, whichever way it ends.
//!
//! ## Usage
//!
//! ```ignore
//! let workspace = ScratchWorkspace::acquire(&settings.paths.workspace)?;
//!
//! // Steps work inside workspace.path()...
//!
//! // On success:
//! workspace.release()?;
//!
//! // On error (automatic via Drop if not released):
//! // the directory is removed anyway
//! ```

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use crate::error::{InstallerError, Result};

const WORKSPACE_MODE: u32 = 0o755;

/// Owned scratch directory
#[derive(Debug)]
pub struct ScratchWorkspace {
    path: PathBuf,
    /// Whether the directory is ours to remove
    created: bool,
}

impl ScratchWorkspace {
    /// Create the workspace, replacing any leftover from an earlier run
    pub fn acquire(path: &Path) -> Result<Self> {
        let fail = |reason: String| InstallerError::WorkspaceFailed {
            path: path.display().to_string(),
            reason,
        };

        if path.exists() {
            tracing::warn!("removing stale workspace {}", path.display());
            fs::remove_dir_all(path).map_err(|e| fail(e.to_string()))?;
        }
        fs::create_dir_all(path).map_err(|e| fail(e.to_string()))?;
        fs::set_permissions(path, fs::Permissions::from_mode(WORKSPACE_MODE))
            .map_err(|e| fail(e.to_string()))?;

        tracing::debug!("created workspace {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            created: true,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A file or directory in the workspace removed when the guard drops
    pub fn scratch(&self, name: &str) -> ScratchFile {
        ScratchFile {
            path: self.path.join(name),
        }
    }

    /// Remove the workspace now, reporting failures
    pub fn release(mut self) -> Result<()> {
        self.remove()
    }

    fn remove(&mut self) -> Result<()> {
        if !self.created {
            return Ok(());
        }
        self.created = false;
        match fs::remove_dir_all(&self.path) {
            Ok(()) => {
                tracing::debug!("removed workspace {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(InstallerError::WorkspaceFailed {
                path: self.path.display().to_string(),
                reason: e.to_string(),
            }),
        }
    }
}

impl Drop for ScratchWorkspace {
    fn drop(&mut self) {
        if let Err(e) = self.remove() {
            tracing::warn!("workspace cleanup failed: {e}");
        }
    }
}

/// A step input inside the workspace, removed when dropped
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        let result = if self.path.is_dir() {
            fs::remove_dir_all(&self.path)
        } else {
            fs::remove_file(&self.path)
        };
        match result {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("could not remove {}: {e}", self.path.display()),
        }
    }
}
