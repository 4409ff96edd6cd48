//! Package manager and service manager invocations

use std::path::Path;

use super::{InstallMode, StepEnv};
use crate::error::Result;
use crate::runner::CommandSpec;

/// `apt-get install` for repository packages or local `.deb` files
pub fn apt_install(targets: &[&str], mode: InstallMode) -> CommandSpec {
    let mut spec = CommandSpec::new("apt-get").arg("install");
    if mode == InstallMode::Reinstall {
        spec = spec.arg("--reinstall");
    }
    spec.arg("-y").args(targets.iter().copied())
}

/// Keep apt and debconf from prompting in captured runs
pub fn noninteractive(spec: CommandSpec) -> CommandSpec {
    spec.env("DEBIAN_FRONTEND", "noninteractive")
}

/// apt needs a path-like argument to treat a file as a package
pub fn local_deb(path: &Path) -> String {
    if path.is_absolute() {
        path.display().to_string()
    } else {
        format!("./{}", path.display())
    }
}

/// Hand a downloaded `.deb` to apt
pub fn install_deb(env: &StepEnv<'_>, deb: &Path, mode: InstallMode) -> Result<()> {
    let target = local_deb(deb);
    tracing::info!(
        "{} {}",
        match mode {
            InstallMode::Fresh => "installing",
            InstallMode::Reinstall => "reinstalling",
        },
        deb.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    );
    env.run(noninteractive(apt_install(&[target.as_str()], mode)))?;
    Ok(())
}

pub fn apt_update() -> CommandSpec {
    noninteractive(CommandSpec::new("apt-get").arg("update"))
}

/// `apt-get -f install -y`, completing half-configured packages
pub fn fix_broken() -> CommandSpec {
    noninteractive(CommandSpec::new("apt-get").args(["-f", "install", "-y"]))
}

/// `dpkg -i` with extra environment for the maintainer scripts
pub fn dpkg_install(deb: &Path, vars: &[(&str, &str)]) -> CommandSpec {
    let mut spec = CommandSpec::new("dpkg").arg("-i").path_arg(deb);
    for (key, value) in vars {
        spec = spec.env(*key, *value);
    }
    spec
}

/// `systemctl enable --now <unit>`
pub fn enable_service(unit: &str) -> CommandSpec {
    CommandSpec::new("systemctl").args(["enable", "--now", unit])
}
