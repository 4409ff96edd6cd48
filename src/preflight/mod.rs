//! Scratch mount preflight
//!
//! Some images mount their temp directories as `noexec` tmpfs, which breaks
//! installers that run binaries out of the scratch workspace. Before any step
//! runs, the mount table is normalized:
//! 1. the short-term temp path gets one canonical, size-bounded tmpfs record
//! 2. every other tmpfs record is commented out (kept for the operator)
//! 3. the original table is backed up before the first change
//!
//! The rewrite only takes effect after a reboot, so the long-lived temp path
//! is also unmounted for the rest of this run when it is currently a mount
//! point. A failed unmount is a warning; later steps may then fail and the
//! operator has to reboot and re-run.

pub mod confirm;
pub mod mount_table;

use std::fs;
use std::path::Path;

pub use confirm::{Confirm, NoConfirm, TerminalConfirm};
pub use mount_table::MountTable;

use crate::config_file::write_atomically;
use crate::error::{InstallerError, Result};
use crate::runner::{CommandRunner, CommandSpec};
use crate::settings::{Paths, TmpfsPolicy};

/// What preflight did to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreflightOutcome {
    /// Mount table missing or not accessible; nothing was touched
    Skipped,
    Checked {
        rewritten: bool,
        unmount: Unmount,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unmount {
    NotMounted,
    Unmounted,
    Failed,
}

/// Inspects and repairs the mount table
pub struct Preflight<'a> {
    paths: &'a Paths,
    tmpfs: &'a TmpfsPolicy,
    runner: &'a dyn CommandRunner,
    confirm: &'a dyn Confirm,
    interactive: bool,
}

impl<'a> Preflight<'a> {
    pub fn new(
        paths: &'a Paths,
        tmpfs: &'a TmpfsPolicy,
        runner: &'a dyn CommandRunner,
        confirm: &'a dyn Confirm,
        interactive: bool,
    ) -> Self {
        Self {
            paths,
            tmpfs,
            runner,
            confirm,
            interactive,
        }
    }

    pub fn run(&self) -> Result<PreflightOutcome> {
        let table_path = &self.paths.mount_table;
        let Some(original) = read_writable(table_path) else {
            tracing::debug!("{} not accessible, skipping preflight", table_path.display());
            return Ok(PreflightOutcome::Skipped);
        };

        let updated = MountTable::parse(&original)
            .with_canonical_tmpfs(&self.paths.short_term_tmp, self.tmpfs)
            .render();

        let rewritten = updated != original;
        if rewritten {
            self.rewrite(&original, &updated)?;
        } else {
            tracing::debug!("{} already normalized", table_path.display());
        }

        let unmount = self.release_long_lived_tmp();
        Ok(PreflightOutcome::Checked { rewritten, unmount })
    }

    fn rewrite(&self, original: &str, updated: &str) -> Result<()> {
        let backup = &self.paths.mount_table_backup;
        fs::write(backup, original).map_err(|e| InstallerError::FileWriteFailed {
            path: backup.display().to_string(),
            reason: e.to_string(),
        })?;
        tracing::info!("backed up {} to {}", self.paths.mount_table.display(), backup.display());

        write_atomically(&self.paths.mount_table, updated)?;
        tracing::warn!(
            "{} updated for {}; a reboot is recommended once installation finishes",
            self.paths.mount_table.display(),
            self.paths.short_term_tmp.display()
        );

        if self.interactive {
            self.confirm.acknowledge(&format!(
                "The mount table was changed. The original is saved at {}.",
                backup.display()
            ))?;
        }
        Ok(())
    }

    fn release_long_lived_tmp(&self) -> Unmount {
        let target = &self.paths.long_lived_tmp;
        let mounted = fs::read_to_string(&self.paths.live_mounts)
            .map(|mounts| MountTable::parse(&mounts).has_mount_point(target))
            .unwrap_or(false);
        if !mounted {
            return Unmount::NotMounted;
        }

        let spec = CommandSpec::new("umount").path_arg(target);
        let out = self.runner.run_captured(&spec);
        if out.success {
            tracing::info!("unmounted {} for this run", target.display());
            Unmount::Unmounted
        } else {
            tracing::warn!(
                "could not unmount {}: {}; installers may fail until the host is rebooted",
                target.display(),
                out.stderr.trim()
            );
            Unmount::Failed
        }
    }
}

/// Content of `path` if it can be both read and written
fn read_writable(path: &Path) -> Option<String> {
    let content = fs::read_to_string(path).ok()?;
    fs::OpenOptions::new().append(true).open(path).ok()?;
    Some(content)
}
