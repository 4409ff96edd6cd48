//! AllScan web dashboard
//!
//! The upstream PHP script installs on first run and updates in place
//! afterwards, so this step has no probe.

use super::packages::{apt_install, noninteractive};
use super::{InstallMode, StepEnv};
use crate::error::Result;
use crate::runner::CommandSpec;

const SCRIPT: &str = "AllScanInstallUpdate.php";
const PREREQUISITES: [&str; 3] = ["php", "php-sqlite3", "php-curl"];

pub(super) fn execute(env: &StepEnv<'_>) -> Result<()> {
    tracing::info!("installing AllScan prerequisites");
    env.run(noninteractive(apt_install(&PREREQUISITES, InstallMode::Fresh)))?;

    let script = env.download(&env.settings.sources.allscan_installer, SCRIPT)?;
    env.run_interactive(CommandSpec::new("php").path_arg(script.path()))?;
    Ok(())
}
