//! Supermon-NG

use super::StepEnv;
use crate::error::Result;
use crate::runner::CommandSpec;

const SCRIPT: &str = "supermon-ng-installer.sh";

pub(super) fn execute(env: &StepEnv<'_>) -> Result<()> {
    let script = env.download(&env.settings.sources.supermon_installer, SCRIPT)?;
    env.run_interactive(CommandSpec::new("bash").path_arg(script.path()))?;

    env.verify_marker("Supermon-NG", &env.settings.paths.supermon_marker);
    Ok(())
}
