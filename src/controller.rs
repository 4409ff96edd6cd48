//! Run controller
//!
//! Composes one run: preflight, then the scratch workspace, then the
//! selected steps one at a time, then teardown. The first failing step ends
//! the run; later steps are never started and the workspace is still
//! removed.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::download::{Downloader, Transport};
use crate::error::{InstallerError, Result};
use crate::preflight::{Confirm, Preflight};
use crate::privilege::{AccountLookup, InvocationContext};
use crate::runner::CommandRunner;
use crate::settings::Settings;
use crate::steps::{Idempotency, InstallMode, InstallStep, StepEnv};
use crate::workspace::ScratchWorkspace;

/// What happened to one selected step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Installed,
    Reinstalled,
    AlreadyInstalled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub name: String,
    pub outcome: StepOutcome,
}

/// Host capabilities a run depends on
pub struct Services<'a> {
    pub runner: &'a dyn CommandRunner,
    pub transport: &'a dyn Transport,
    pub confirm: &'a dyn Confirm,
    pub accounts: &'a dyn AccountLookup,
}

pub struct RunController<'a> {
    context: &'a InvocationContext,
    settings: &'a Settings,
    services: Services<'a>,
    node: Option<&'a str>,
    interrupted: &'a AtomicBool,
}

impl<'a> RunController<'a> {
    pub fn new(
        context: &'a InvocationContext,
        settings: &'a Settings,
        services: Services<'a>,
        node: Option<&'a str>,
        interrupted: &'a AtomicBool,
    ) -> Self {
        Self {
            context,
            settings,
            services,
            node,
            interrupted,
        }
    }

    /// Run `steps` in the given order
    pub fn run<S: InstallStep>(&self, steps: &[S]) -> Result<Vec<StepReport>> {
        Preflight::new(
            &self.settings.paths,
            &self.settings.tmpfs,
            self.services.runner,
            self.services.confirm,
            self.context.interactive,
        )
        .run()?;

        let workspace = ScratchWorkspace::acquire(&self.settings.paths.workspace)?;
        let result = self.run_steps(steps, &workspace);
        let released = workspace.release();

        let reports = result?;
        released?;
        Ok(reports)
    }

    fn run_steps<S: InstallStep>(
        &self,
        steps: &[S],
        workspace: &ScratchWorkspace,
    ) -> Result<Vec<StepReport>> {
        let downloader = Downloader::new(
            self.services.transport,
            &self.settings.download,
            self.interrupted,
        );
        let env = StepEnv {
            context: self.context,
            settings: self.settings,
            workspace,
            runner: self.services.runner,
            downloader: &downloader,
            accounts: self.services.accounts,
            node: self.node,
            interrupted: self.interrupted,
        };

        let mut reports = Vec::with_capacity(steps.len());
        for (index, step) in steps.iter().enumerate() {
            if self.interrupted.load(Ordering::SeqCst) {
                return Err(InstallerError::Interrupted);
            }
            tracing::info!("[{}/{}] {}", index + 1, steps.len(), step.name());

            let outcome = run_step(step, &env).map_err(|e| {
                if self.interrupted.load(Ordering::SeqCst) {
                    InstallerError::Interrupted
                } else {
                    match e {
                        InstallerError::Interrupted => e,
                        other => InstallerError::StepFailed {
                            step: step.name().to_string(),
                            message: other.to_string(),
                        },
                    }
                }
            })?;

            reports.push(StepReport {
                name: step.name().to_string(),
                outcome,
            });
        }
        Ok(reports)
    }
}

fn run_step<S: InstallStep>(step: &S, env: &StepEnv<'_>) -> Result<StepOutcome> {
    match step.idempotency() {
        Idempotency::AlwaysRun => {
            step.execute(env, InstallMode::Fresh)?;
            tracing::info!("{} installed", step.name());
            Ok(StepOutcome::Installed)
        }
        Idempotency::SkipWhenSatisfied => {
            if step.is_already_satisfied(env) {
                tracing::info!("{} is already installed, skipping", step.name());
                return Ok(StepOutcome::AlreadyInstalled);
            }
            step.execute(env, InstallMode::Fresh)?;
            tracing::info!("{} installed", step.name());
            Ok(StepOutcome::Installed)
        }
        Idempotency::ReinstallWhenSatisfied => {
            if step.is_already_satisfied(env) {
                tracing::info!("{} is already installed, reinstalling", step.name());
                step.execute(env, InstallMode::Reinstall)?;
                tracing::info!("{} reinstalled", step.name());
                Ok(StepOutcome::Reinstalled)
            } else {
                step.execute(env, InstallMode::Fresh)?;
                tracing::info!("{} installed", step.name());
                Ok(StepOutcome::Installed)
            }
        }
    }
}
