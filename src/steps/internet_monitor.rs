//! Internet Monitor

use super::packages::{enable_service, install_deb};
use super::{InstallMode, StepEnv};
use crate::config_file;
use crate::error::Result;

pub(super) const PACKAGE: &str = "internet-monitor";
const DEB: &str = "internet-monitor.deb";
const UNIT: &str = "internet-monitor.service";

pub(super) fn execute(env: &StepEnv<'_>, mode: InstallMode) -> Result<()> {
    let node = env.node("Internet Monitor")?;
    let deb = env.download(&env.settings.sources.internet_monitor_deb, DEB)?;
    install_deb(env, deb.path(), mode)?;
    drop(deb);

    let config = &env.settings.paths.internet_monitor_config;
    config_file::set_value(config, "NODE_NUMBER", node)?;
    tracing::info!("set NODE_NUMBER={node} in {}", config.display());

    env.run(enable_service(UNIT))?;
    Ok(())
}
