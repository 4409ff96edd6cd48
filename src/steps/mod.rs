//! Install step registry
//!
//! Steps form a closed set ([`StepKind`]) that always runs in declaration
//! order, whatever order the flags were given in. Every step implements
//! [`InstallStep`], and the controller only talks to that contract.
//!
//! Idempotency comes in three families:
//! - package-manager steps reinstall when the package is already present
//! - script and archive steps are skipped when their marker exists
//! - steps without a probe always run
//!
//! Each step removes its own downloads before returning, through
//! [`ScratchFile`] guards, independent of the final workspace teardown.

mod allscan;
mod dvswitch;
mod internet_monitor;
pub mod packages;
mod sayip;
mod saytime;
mod skywarn;
mod supermon;

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::download::Downloader;
use crate::error::{InstallerError, Result};
use crate::privilege::{AccountLookup, InvocationContext};
use crate::runner::{CommandOutput, CommandRunner, CommandSpec};
use crate::settings::Settings;
use crate::workspace::{ScratchFile, ScratchWorkspace};

/// How a step reacts to finding itself already installed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Idempotency {
    /// No probe; the step always runs
    AlwaysRun,
    /// Marker present means nothing to do
    SkipWhenSatisfied,
    /// Package present means use the reinstall form
    ReinstallWhenSatisfied,
}

/// Which form of install a step should perform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallMode {
    Fresh,
    Reinstall,
}

/// Contract shared by every install step
pub trait InstallStep {
    /// Human readable name used in logs
    fn name(&self) -> &str;

    fn idempotency(&self) -> Idempotency;

    /// Best-effort probe of host state
    fn is_already_satisfied(&self, env: &StepEnv<'_>) -> bool;

    fn execute(&self, env: &StepEnv<'_>, mode: InstallMode) -> Result<()>;
}

/// The selectable steps, in run order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StepKind {
    AllScan,
    DvSwitchServer,
    SupermonNg,
    SkywarnPlusNg,
    SaytimeWeather,
    SayIpNodeUtils,
    InternetMonitor,
}

impl StepKind {
    pub const ALL: [StepKind; 7] = [
        StepKind::AllScan,
        StepKind::DvSwitchServer,
        StepKind::SupermonNg,
        StepKind::SkywarnPlusNg,
        StepKind::SaytimeWeather,
        StepKind::SayIpNodeUtils,
        StepKind::InternetMonitor,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            StepKind::AllScan => "AllScan",
            StepKind::DvSwitchServer => "DVSwitch Server",
            StepKind::SupermonNg => "Supermon-NG",
            StepKind::SkywarnPlusNg => "SkywarnPlus-NG",
            StepKind::SaytimeWeather => "Saytime Weather",
            StepKind::SayIpNodeUtils => "SayIP Node Utils",
            StepKind::InternetMonitor => "Internet Monitor",
        }
    }

    /// Command-line flag selecting this step
    #[cfg(test)]
    pub fn flag(self) -> &'static str {
        match self {
            StepKind::AllScan => "--allscan",
            StepKind::DvSwitchServer => "--dvswitch-server",
            StepKind::SupermonNg => "--supermon-ng",
            StepKind::SkywarnPlusNg => "--skywarnplus-ng",
            StepKind::SaytimeWeather => "--saytime-weather",
            StepKind::SayIpNodeUtils => "--sayip-node-utils",
            StepKind::InternetMonitor => "--internet-monitor",
        }
    }

    /// Whether the step needs `--node`
    pub fn needs_node(self) -> bool {
        matches!(self, StepKind::SayIpNodeUtils | StepKind::InternetMonitor)
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl InstallStep for StepKind {
    fn name(&self) -> &str {
        self.display_name()
    }

    fn idempotency(&self) -> Idempotency {
        match self {
            StepKind::AllScan | StepKind::SayIpNodeUtils => Idempotency::AlwaysRun,
            StepKind::SupermonNg | StepKind::SkywarnPlusNg => Idempotency::SkipWhenSatisfied,
            StepKind::DvSwitchServer | StepKind::SaytimeWeather | StepKind::InternetMonitor => {
                Idempotency::ReinstallWhenSatisfied
            }
        }
    }

    fn is_already_satisfied(&self, env: &StepEnv<'_>) -> bool {
        match self {
            StepKind::AllScan | StepKind::SayIpNodeUtils => false,
            StepKind::DvSwitchServer => env.package_installed(dvswitch::PACKAGE),
            StepKind::SupermonNg => env.settings.paths.supermon_marker.exists(),
            StepKind::SkywarnPlusNg => env.settings.paths.skywarn_marker.exists(),
            StepKind::SaytimeWeather => env.package_installed(saytime::PACKAGE),
            StepKind::InternetMonitor => env.package_installed(internet_monitor::PACKAGE),
        }
    }

    fn execute(&self, env: &StepEnv<'_>, mode: InstallMode) -> Result<()> {
        match self {
            StepKind::AllScan => allscan::execute(env),
            StepKind::DvSwitchServer => dvswitch::execute(env, mode),
            StepKind::SupermonNg => supermon::execute(env),
            StepKind::SkywarnPlusNg => skywarn::execute(env),
            StepKind::SaytimeWeather => saytime::execute(env, mode),
            StepKind::SayIpNodeUtils => sayip::execute(env),
            StepKind::InternetMonitor => internet_monitor::execute(env, mode),
        }
    }
}

/// Everything a step may use while it runs
pub struct StepEnv<'a> {
    pub context: &'a InvocationContext,
    pub settings: &'a Settings,
    pub workspace: &'a ScratchWorkspace,
    pub runner: &'a dyn CommandRunner,
    pub downloader: &'a Downloader<'a>,
    pub accounts: &'a dyn AccountLookup,
    pub node: Option<&'a str>,
    /// Raised by SIGINT/SIGTERM; no command starts once it is up
    pub interrupted: &'a AtomicBool,
}

impl StepEnv<'_> {
    /// Download into the workspace; the returned guard deletes the file
    pub fn download(&self, url: &str, file_name: &str) -> Result<ScratchFile> {
        let scratch = self.workspace.scratch(file_name);
        self.downloader.fetch(url, scratch.path())?;
        Ok(scratch)
    }

    /// Run captured, failing on a non-zero exit
    pub fn run(&self, spec: CommandSpec) -> Result<CommandOutput> {
        self.ensure_not_interrupted()?;
        let spec = self.in_workspace(spec);
        self.runner.run_captured(&spec).check(&spec)
    }

    /// Run attached to the terminal, failing on a non-zero exit
    pub fn run_interactive(&self, spec: CommandSpec) -> Result<()> {
        self.ensure_not_interrupted()?;
        let spec = self.in_workspace(spec);
        tracing::info!("starting {} (interactive)", spec.program);
        self.runner.run_interactive(&spec).check(&spec).map(|_| ())
    }

    /// Whether dpkg reports `package` as installed
    pub fn package_installed(&self, package: &str) -> bool {
        let spec = CommandSpec::new("dpkg-query")
            .args(["-W", "-f=${Status}", package]);
        let out = self.runner.run_captured(&spec);
        out.success && out.stdout.contains("install ok installed")
    }

    /// The node number; only steps with [`StepKind::needs_node`] call this
    pub fn node(&self, step: &str) -> Result<&str> {
        self.node.ok_or_else(|| InstallerError::NodeNumberRequired {
            step: step.to_string(),
        })
    }

    /// Log a warning when an installer finished without leaving its marker
    pub fn verify_marker(&self, step: &str, marker: &std::path::Path) {
        if !marker.exists() {
            tracing::warn!(
                "{step} installer finished but {} was not found",
                marker.display()
            );
        }
    }

    fn ensure_not_interrupted(&self) -> Result<()> {
        if self.interrupted.load(Ordering::SeqCst) {
            Err(InstallerError::Interrupted)
        } else {
            Ok(())
        }
    }

    fn in_workspace(&self, spec: CommandSpec) -> CommandSpec {
        if spec.cwd.is_some() {
            spec
        } else {
            spec.current_dir(self.workspace.path())
        }
    }
}

#[cfg(test)]
mod tests;
