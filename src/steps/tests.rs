//! Tests for the install steps, driven through recording doubles

use std::cell::Cell;
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::*;
use crate::controller::{RunController, Services, StepOutcome};
use crate::download::Downloader;
use crate::preflight::NoConfirm;
use crate::privilege::{UserAccount, validate_from};
use crate::test_fixtures::{Mode, RecordingRunner, StaticTransport, host};

struct Accounts(Option<UserAccount>);

impl AccountLookup for Accounts {
    fn lookup(&self, name: &str) -> Option<UserAccount> {
        self.0.clone().filter(|a| a.name == name)
    }
}

fn alice() -> UserAccount {
    UserAccount {
        name: "alice".to_string(),
        uid: 1000,
        gid: 1000,
        home: PathBuf::from("/home/alice"),
    }
}

/// A host, a workspace and doubles for one step invocation
struct Rig {
    _temp: tempfile::TempDir,
    settings: Settings,
    context: InvocationContext,
    workspace: ScratchWorkspace,
    runner: RecordingRunner,
    transport: StaticTransport,
    accounts: Accounts,
    flag: AtomicBool,
}

impl Rig {
    fn new(runner: RecordingRunner) -> Self {
        let (temp, settings) = host();
        let workspace = ScratchWorkspace::acquire(&settings.paths.workspace).unwrap();
        Self {
            _temp: temp,
            settings,
            context: validate_from(0, Some("alice".to_string()), false).unwrap(),
            workspace,
            runner,
            transport: StaticTransport::new(b"payload"),
            accounts: Accounts(Some(alice())),
            flag: AtomicBool::new(false),
        }
    }

    fn execute(&self, step: StepKind, mode: InstallMode, node: Option<&str>) -> Result<()> {
        let downloader = Downloader::new(&self.transport, &self.settings.download, &self.flag);
        let env = StepEnv {
            context: &self.context,
            settings: &self.settings,
            workspace: &self.workspace,
            runner: &self.runner,
            downloader: &downloader,
            accounts: &self.accounts,
            node,
            interrupted: &self.flag,
        };
        step.execute(&env, mode)
    }

    fn ws(&self, name: &str) -> String {
        self.workspace.path().join(name).display().to_string()
    }

    fn workspace_is_empty(&self) -> bool {
        std::fs::read_dir(self.workspace.path()).unwrap().count() == 0
    }
}

/// Answers `dpkg-query` as if `installed` packages are present
fn dpkg_reports(installed: &'static [&'static str]) -> RecordingRunner {
    RecordingRunner::with(move |spec| {
        if spec.program == "dpkg-query" {
            let package = spec.args.last().map(String::as_str).unwrap_or_default();
            if installed.contains(&package) {
                return CommandOutput {
                    success: true,
                    status: "exit status: 0".to_string(),
                    stdout: "install ok installed".to_string(),
                    stderr: String::new(),
                };
            }
            return CommandOutput::failed("exit status: 1", "no packages found");
        }
        CommandOutput::succeeded()
    })
}

#[test]
fn test_declared_order_and_unique_flags() {
    assert_eq!(StepKind::ALL.first(), Some(&StepKind::AllScan));
    assert_eq!(StepKind::ALL.last(), Some(&StepKind::InternetMonitor));
    let mut sorted = StepKind::ALL;
    sorted.sort();
    assert_eq!(sorted, StepKind::ALL);

    let flags: HashSet<_> = StepKind::ALL.iter().map(|s| s.flag()).collect();
    assert_eq!(flags.len(), StepKind::ALL.len());
}

#[test]
fn test_idempotency_families() {
    assert_eq!(StepKind::AllScan.idempotency(), Idempotency::AlwaysRun);
    assert_eq!(
        StepKind::SupermonNg.idempotency(),
        Idempotency::SkipWhenSatisfied
    );
    assert_eq!(
        StepKind::SkywarnPlusNg.idempotency(),
        Idempotency::SkipWhenSatisfied
    );
    assert_eq!(
        StepKind::SaytimeWeather.idempotency(),
        Idempotency::ReinstallWhenSatisfied
    );
    assert!(StepKind::SayIpNodeUtils.needs_node());
    assert!(StepKind::InternetMonitor.needs_node());
    assert!(!StepKind::AllScan.needs_node());
}

#[test]
fn test_allscan_runs_php_installer_interactively() {
    let rig = Rig::new(RecordingRunner::ok());

    rig.execute(StepKind::AllScan, InstallMode::Fresh, None).unwrap();

    let calls = rig.runner.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].0, Mode::Captured);
    assert_eq!(
        calls[0].1.to_string(),
        "DEBIAN_FRONTEND=noninteractive apt-get install -y php php-sqlite3 php-curl"
    );
    assert_eq!(calls[1].0, Mode::Interactive);
    assert_eq!(
        calls[1].1.to_string(),
        format!("php {}", rig.ws("AllScanInstallUpdate.php"))
    );
    assert_eq!(calls[1].1.cwd.as_deref(), Some(rig.workspace.path()));
    assert!(rig.workspace_is_empty());
}

#[test]
fn test_dvswitch_fresh_and_reinstall_forms() {
    let rig = Rig::new(RecordingRunner::ok());
    rig.execute(StepKind::DvSwitchServer, InstallMode::Fresh, None)
        .unwrap();
    rig.execute(StepKind::DvSwitchServer, InstallMode::Reinstall, None)
        .unwrap();

    assert_eq!(
        rig.runner.lines(),
        vec![
            format!("bash {}", rig.ws("dvswitch-repo.sh")),
            "DEBIAN_FRONTEND=noninteractive apt-get update".to_string(),
            "apt-get install -y dvswitch-server".to_string(),
            format!("bash {}", rig.ws("dvswitch-repo.sh")),
            "DEBIAN_FRONTEND=noninteractive apt-get update".to_string(),
            "apt-get install --reinstall -y dvswitch-server".to_string(),
        ]
    );
    assert!(rig.workspace_is_empty());
}

#[test]
fn test_failed_command_is_fatal_and_cleans_scratch() {
    let rig = Rig::new(RecordingRunner::with(|spec| {
        if spec.program == "bash" {
            CommandOutput::failed("exit status: 2", "gpg: no valid OpenPGP data found")
        } else {
            CommandOutput::succeeded()
        }
    }));

    let err = rig
        .execute(StepKind::DvSwitchServer, InstallMode::Fresh, None)
        .unwrap_err();

    assert!(matches!(err, InstallerError::CommandFailed { ref stderr, .. } if stderr.contains("OpenPGP")));
    assert_eq!(rig.runner.calls().len(), 1);
    assert!(rig.workspace_is_empty());
}

#[test]
fn test_supermon_skipped_when_marker_present() {
    let rig = Rig::new(RecordingRunner::ok());
    let downloader = Downloader::new(&rig.transport, &rig.settings.download, &rig.flag);
    let env = StepEnv {
        context: &rig.context,
        settings: &rig.settings,
        workspace: &rig.workspace,
        runner: &rig.runner,
        downloader: &downloader,
        accounts: &rig.accounts,
        node: None,
        interrupted: &rig.flag,
    };

    assert!(!StepKind::SupermonNg.is_already_satisfied(&env));
    std::fs::create_dir_all(&rig.settings.paths.supermon_marker).unwrap();
    assert!(StepKind::SupermonNg.is_already_satisfied(&env));
}

#[test]
fn test_supermon_runs_installer() {
    let rig = Rig::new(RecordingRunner::ok());

    rig.execute(StepKind::SupermonNg, InstallMode::Fresh, None)
        .unwrap();

    let calls = rig.runner.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, Mode::Interactive);
    assert_eq!(
        calls[0].1.to_string(),
        format!("bash {}", rig.ws("supermon-ng-installer.sh"))
    );
    assert!(rig.workspace_is_empty());
}

/// Pretends to unpack an archive by creating install.sh in the `-C` directory
fn fake_tar() -> RecordingRunner {
    RecordingRunner::with(|spec| {
        if spec.program == "tar" {
            if let Some(pos) = spec.args.iter().position(|a| a == "-C") {
                let dir = Path::new(&spec.args[pos + 1]);
                std::fs::write(dir.join("install.sh"), "#!/bin/bash\n").unwrap();
            }
        }
        CommandOutput::succeeded()
    })
}

#[test]
fn test_skywarn_runs_as_invoking_user() {
    let rig = Rig::new(fake_tar());

    rig.execute(StepKind::SkywarnPlusNg, InstallMode::Fresh, None)
        .unwrap();

    let calls = rig.runner.calls();
    let programs: Vec<_> = calls.iter().map(|(_, s)| s.program.as_str()).collect();
    assert_eq!(programs, vec!["tar", "chown", "bash"]);

    let chown = &calls[1].1;
    assert_eq!(chown.args[1], "1000:1000");

    let (mode, installer) = &calls[2];
    assert_eq!(*mode, Mode::Interactive);
    assert_eq!(installer.args, vec!["./install.sh"]);
    assert_eq!(installer.run_as, Some(alice()));
    assert_eq!(
        installer.cwd.as_deref(),
        Some(rig.workspace.path().join("skywarnplus-ng").as_path())
    );
    assert!(rig.workspace_is_empty());
}

#[test]
fn test_skywarn_unresolvable_user_is_fatal() {
    let mut rig = Rig::new(fake_tar());
    rig.accounts = Accounts(None);

    let err = rig
        .execute(StepKind::SkywarnPlusNg, InstallMode::Fresh, None)
        .unwrap_err();

    assert!(matches!(err, InstallerError::UserNotFound { ref user } if user == "alice"));
    assert!(rig.runner.calls().is_empty());
    assert!(rig.transport.urls.borrow().is_empty());
}

#[test]
fn test_skywarn_archive_without_installer() {
    let rig = Rig::new(RecordingRunner::ok());

    let err = rig
        .execute(StepKind::SkywarnPlusNg, InstallMode::Fresh, None)
        .unwrap_err();

    assert!(matches!(err, InstallerError::StepFailed { .. }));
    assert!(rig.workspace_is_empty());
}

#[test]
fn test_saytime_install_forms() {
    let rig = Rig::new(RecordingRunner::ok());
    rig.execute(StepKind::SaytimeWeather, InstallMode::Fresh, None)
        .unwrap();
    rig.execute(StepKind::SaytimeWeather, InstallMode::Reinstall, None)
        .unwrap();

    let deb = rig.ws("saytime-weather-rs.deb");
    assert_eq!(
        rig.runner.lines(),
        vec![
            format!("DEBIAN_FRONTEND=noninteractive apt-get install -y {deb}"),
            format!("DEBIAN_FRONTEND=noninteractive apt-get install --reinstall -y {deb}"),
        ]
    );
    assert!(rig.workspace_is_empty());
}

#[test]
fn test_sayip_requires_node() {
    let rig = Rig::new(RecordingRunner::ok());

    let err = rig
        .execute(StepKind::SayIpNodeUtils, InstallMode::Fresh, None)
        .unwrap_err();

    assert!(matches!(err, InstallerError::NodeNumberRequired { .. }));
    assert!(rig.transport.urls.borrow().is_empty());
}

#[test]
fn test_sayip_passes_node_through_environment() {
    let rig = Rig::new(RecordingRunner::ok());

    rig.execute(StepKind::SayIpNodeUtils, InstallMode::Fresh, Some("1999"))
        .unwrap();

    let calls = rig.runner.calls();
    assert_eq!(calls.len(), 1);
    let dpkg = &calls[0].1;
    assert_eq!(dpkg.program, "dpkg");
    assert_eq!(dpkg.args, vec!["-i".to_string(), rig.ws("sayip-node-utils.deb")]);
    assert!(
        dpkg.env
            .contains(&("NODE_NUMBER".to_string(), "1999".to_string()))
    );
}

#[test]
fn test_sayip_falls_back_to_fix_broken() {
    let rig = Rig::new(RecordingRunner::with(|spec| {
        if spec.program == "dpkg" {
            CommandOutput::failed("exit status: 1", "dependency problems")
        } else {
            CommandOutput::succeeded()
        }
    }));

    rig.execute(StepKind::SayIpNodeUtils, InstallMode::Fresh, Some("1999"))
        .unwrap();

    let calls = rig.runner.calls();
    assert_eq!(calls.len(), 2);
    let fix = &calls[1].1;
    assert_eq!(fix.args, vec!["-f", "install", "-y"]);
    assert!(fix.env.contains(&("NODE_NUMBER".to_string(), "1999".to_string())));
    assert!(rig.workspace_is_empty());
}

#[test]
fn test_sayip_fix_broken_failure_is_fatal() {
    let rig = Rig::new(RecordingRunner::with(|_| {
        CommandOutput::failed("exit status: 100", "unmet dependencies")
    }));

    let err = rig
        .execute(StepKind::SayIpNodeUtils, InstallMode::Fresh, Some("1999"))
        .unwrap_err();

    assert!(matches!(err, InstallerError::CommandFailed { .. }));
}

#[test]
fn test_internet_monitor_configures_and_enables() {
    let rig = Rig::new(RecordingRunner::ok());
    let config = &rig.settings.paths.internet_monitor_config;
    std::fs::create_dir_all(config.parent().unwrap()).unwrap();
    std::fs::write(config, "# Internet Monitor\nNODE_NUMBER=1\nCHECK_INTERVAL=60\n").unwrap();

    rig.execute(StepKind::InternetMonitor, InstallMode::Fresh, Some("2345"))
        .unwrap();

    assert_eq!(
        std::fs::read_to_string(config).unwrap(),
        "# Internet Monitor\nNODE_NUMBER=2345\nCHECK_INTERVAL=60\n"
    );
    assert_eq!(
        rig.runner.lines(),
        vec![
            format!(
                "DEBIAN_FRONTEND=noninteractive apt-get install -y {}",
                rig.ws("internet-monitor.deb")
            ),
            "systemctl enable --now internet-monitor.service".to_string(),
        ]
    );
}

#[test]
fn test_package_probe() {
    let rig = Rig::new(dpkg_reports(&["internet-monitor"]));
    let downloader = Downloader::new(&rig.transport, &rig.settings.download, &rig.flag);
    let env = StepEnv {
        context: &rig.context,
        settings: &rig.settings,
        workspace: &rig.workspace,
        runner: &rig.runner,
        downloader: &downloader,
        accounts: &rig.accounts,
        node: None,
        interrupted: &rig.flag,
    };

    assert!(StepKind::InternetMonitor.is_already_satisfied(&env));
    assert!(!StepKind::SaytimeWeather.is_already_satisfied(&env));
    assert!(!StepKind::AllScan.is_already_satisfied(&env));
}

#[test]
fn test_second_run_of_package_step_reinstalls() {
    let (_temp, settings) = host();
    let context = validate_from(0, Some("alice".to_string()), false).unwrap();
    let installed = Rc::new(Cell::new(false));
    let state = Rc::clone(&installed);
    let runner = RecordingRunner::with(move |spec| {
        if spec.program == "dpkg-query" {
            return if state.get() {
                CommandOutput {
                    success: true,
                    status: "exit status: 0".to_string(),
                    stdout: "install ok installed".to_string(),
                    stderr: String::new(),
                }
            } else {
                CommandOutput::failed("exit status: 1", "")
            };
        }
        if spec.program == "apt-get" {
            state.set(true);
        }
        CommandOutput::succeeded()
    });
    let transport = StaticTransport::new(b"deb");
    let flag = AtomicBool::new(false);
    let accounts = Accounts(Some(alice()));

    let mut outcomes = Vec::new();
    for _ in 0..2 {
        let services = Services {
            runner: &runner,
            transport: &transport,
            confirm: &NoConfirm,
            accounts: &accounts,
        };
        let reports = RunController::new(&context, &settings, services, None, &flag)
            .run(&[StepKind::SaytimeWeather])
            .unwrap();
        outcomes.push(reports[0].outcome);
    }

    assert_eq!(
        outcomes,
        vec![StepOutcome::Installed, StepOutcome::Reinstalled]
    );
    let installs: Vec<_> = runner
        .lines()
        .into_iter()
        .filter(|l| l.contains("apt-get install"))
        .collect();
    assert_eq!(installs.len(), 2);
    assert!(!installs[0].contains("--reinstall"));
    assert!(installs[1].contains("--reinstall"));
    assert!(installed.get());
}

#[test]
fn test_two_steps_second_already_installed() {
    let (_temp, settings) = host();
    std::fs::create_dir_all(&settings.paths.supermon_marker).unwrap();
    let context = validate_from(0, Some("alice".to_string()), false).unwrap();
    let runner = RecordingRunner::ok();
    let transport = StaticTransport::new(b"deb");
    let flag = AtomicBool::new(false);
    let accounts = Accounts(Some(alice()));
    let services = Services {
        runner: &runner,
        transport: &transport,
        confirm: &NoConfirm,
        accounts: &accounts,
    };

    let reports = RunController::new(&context, &settings, services, None, &flag)
        .run(&[StepKind::DvSwitchServer, StepKind::SupermonNg])
        .unwrap();

    assert_eq!(reports[0].outcome, StepOutcome::Installed);
    assert_eq!(reports[1].outcome, StepOutcome::AlreadyInstalled);
    assert_eq!(transport.urls.borrow().len(), 1);
    assert!(!settings.paths.workspace.exists());
}

/// Raises the interrupt flag while the body is being written
struct InterruptingTransport<'f> {
    flag: &'f AtomicBool,
}

impl crate::download::Transport for InterruptingTransport<'_> {
    fn fetch_into(
        &self,
        _url: &str,
        sink: &mut dyn Write,
    ) -> std::result::Result<u64, String> {
        sink.write_all(b"#!/bin/bash\n")
            .map_err(|e| e.to_string())?;
        self.flag.store(true, Ordering::SeqCst);
        Ok(12)
    }
}

#[test]
fn test_interrupt_during_download_starts_no_commands() {
    let rig = Rig::new(RecordingRunner::ok());
    let transport = InterruptingTransport { flag: &rig.flag };
    let downloader = Downloader::new(&transport, &rig.settings.download, &rig.flag);
    let env = StepEnv {
        context: &rig.context,
        settings: &rig.settings,
        workspace: &rig.workspace,
        runner: &rig.runner,
        downloader: &downloader,
        accounts: &rig.accounts,
        node: None,
        interrupted: &rig.flag,
    };

    let err = StepKind::DvSwitchServer
        .execute(&env, InstallMode::Fresh)
        .unwrap_err();

    assert!(matches!(err, InstallerError::Interrupted));
    assert!(rig.runner.calls().is_empty(), "ran {:?}", rig.runner.lines());
    assert!(rig.workspace_is_empty());
}

#[test]
fn test_no_command_starts_after_interrupt() {
    let rig = Rig::new(RecordingRunner::ok());
    rig.flag.store(true, Ordering::SeqCst);
    let downloader = Downloader::new(&rig.transport, &rig.settings.download, &rig.flag);
    let env = StepEnv {
        context: &rig.context,
        settings: &rig.settings,
        workspace: &rig.workspace,
        runner: &rig.runner,
        downloader: &downloader,
        accounts: &rig.accounts,
        node: None,
        interrupted: &rig.flag,
    };

    assert!(matches!(
        env.run(CommandSpec::new("apt-get").arg("update")),
        Err(InstallerError::Interrupted)
    ));
    assert!(matches!(
        env.run_interactive(CommandSpec::new("bash").arg("install.sh")),
        Err(InstallerError::Interrupted)
    ));
    assert!(rig.runner.calls().is_empty());
}
