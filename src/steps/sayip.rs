//! SayIP Node Utils
//!
//! The package's maintainer scripts read the node number from
//! `NODE_NUMBER`. dpkg does not pull dependencies, so a failed `dpkg -i` is
//! followed by apt's fix-broken form, which finishes the configuration.

use super::StepEnv;
use super::packages::{dpkg_install, fix_broken};
use crate::error::Result;

const DEB: &str = "sayip-node-utils.deb";
const NODE_VAR: &str = "NODE_NUMBER";

pub(super) fn execute(env: &StepEnv<'_>) -> Result<()> {
    let node = env.node("SayIP Node Utils")?;
    let deb = env.download(&env.settings.sources.sayip_deb, DEB)?;

    tracing::info!("installing SayIP Node Utils for node {node}");
    if let Err(e) = env.run(dpkg_install(deb.path(), &[(NODE_VAR, node)])) {
        tracing::warn!("dpkg reported a problem ({e}); resolving dependencies");
        env.run(fix_broken().env(NODE_VAR, node))?;
    }
    Ok(())
}
