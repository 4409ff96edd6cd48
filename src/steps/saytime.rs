//! Saytime Weather

use super::packages::install_deb;
use super::{InstallMode, StepEnv};
use crate::error::Result;

pub(super) const PACKAGE: &str = "saytime-weather-rs";
const DEB: &str = "saytime-weather-rs.deb";

pub(super) fn execute(env: &StepEnv<'_>, mode: InstallMode) -> Result<()> {
    let deb = env.download(&env.settings.sources.saytime_deb, DEB)?;
    install_deb(env, deb.path(), mode)
}
