//! DVSwitch Server from the DVSwitch apt repository

use super::packages::{apt_install, apt_update};
use super::{InstallMode, StepEnv};
use crate::error::Result;
use crate::runner::CommandSpec;

pub(super) const PACKAGE: &str = "dvswitch-server";
const REPO_SCRIPT: &str = "dvswitch-repo.sh";

pub(super) fn execute(env: &StepEnv<'_>, mode: InstallMode) -> Result<()> {
    let script = env.download(&env.settings.sources.dvswitch_repo_script, REPO_SCRIPT)?;
    tracing::info!("adding the DVSwitch repository");
    env.run(CommandSpec::new("bash").path_arg(script.path()))?;
    drop(script);

    env.run(apt_update())?;

    // The package's debconf questions need a terminal
    env.run_interactive(apt_install(&[PACKAGE], mode))
}
