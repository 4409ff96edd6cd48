//! SkywarnPlus-NG
//!
//! The release tarball's installer refuses to run as root; it is run as the
//! account that invoked sudo and escalates only the parts that need it.

use super::StepEnv;
use crate::error::{InstallerError, Result};
use crate::runner::CommandSpec;

const ARCHIVE: &str = "skywarnplus-ng.tar.gz";
const UNPACK_DIR: &str = "skywarnplus-ng";
const INSTALLER: &str = "install.sh";

pub(super) fn execute(env: &StepEnv<'_>) -> Result<()> {
    let account = env.context.resolve_invoking_user(env.accounts)?;

    let archive = env.download(&env.settings.sources.skywarn_archive, ARCHIVE)?;
    let unpacked = env.workspace.scratch(UNPACK_DIR);
    std::fs::create_dir_all(unpacked.path())?;

    env.run(
        CommandSpec::new("tar")
            .arg("-xzf")
            .path_arg(archive.path())
            .arg("-C")
            .path_arg(unpacked.path())
            .arg("--strip-components=1"),
    )?;
    drop(archive);

    if !unpacked.path().join(INSTALLER).is_file() {
        return Err(InstallerError::StepFailed {
            step: "SkywarnPlus-NG".to_string(),
            message: format!("{INSTALLER} missing from {ARCHIVE}"),
        });
    }

    env.run(
        CommandSpec::new("chown")
            .arg("-R")
            .arg(format!("{}:{}", account.uid, account.gid))
            .path_arg(unpacked.path()),
    )?;

    tracing::info!("running the SkywarnPlus-NG installer as {}", account.name);
    env.run_interactive(
        CommandSpec::new("bash")
            .arg(format!("./{INSTALLER}"))
            .current_dir(unpacked.path())
            .run_as(account),
    )?;

    env.verify_marker("SkywarnPlus-NG", &env.settings.paths.skywarn_marker);
    Ok(())
}
