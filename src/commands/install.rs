//! Install command implementation
//!
//! Wires the production pieces together and runs the selected steps:
//! 1. Check privileges and capture the invocation context
//! 2. Route SIGINT/SIGTERM to the interrupt flag
//! 3. Preflight, workspace, steps and teardown (see [`RunController`])
//! 4. Print a summary

use console::Style;

use crate::cli::Selection;
use crate::controller::{RunController, Services, StepOutcome, StepReport};
use crate::download::HttpTransport;
use crate::error::Result;
use crate::preflight::{Confirm, NoConfirm, TerminalConfirm};
use crate::privilege::{self, SystemAccounts};
use crate::runner::SystemRunner;
use crate::settings::Settings;
use crate::signal;

/// Run install command
pub fn run(selection: &Selection) -> Result<()> {
    let context = privilege::validate()?;
    if let Err(e) = signal::install_handlers() {
        tracing::warn!("could not install signal handlers: {e}");
    }

    let interrupted = signal::interrupt_flag();

    let settings = Settings::default();
    tracing::info!(
        "asl-extras {} started by {} (euid {}, {} step(s) selected)",
        env!("CARGO_PKG_VERSION"),
        context.invoking_user,
        context.effective_uid,
        selection.steps.len()
    );

    let transport = HttpTransport::new(&settings.download, interrupted);
    let terminal = TerminalConfirm::new(interrupted);
    let confirm: &dyn Confirm = if context.interactive {
        &terminal
    } else {
        &NoConfirm
    };
    let services = Services {
        runner: &SystemRunner,
        transport: &transport,
        confirm,
        accounts: &SystemAccounts,
    };

    let reports = RunController::new(
        &context,
        &settings,
        services,
        selection.node.as_deref(),
        interrupted,
    )
    .run(&selection.steps)?;

    let elapsed = context.started_at.elapsed().unwrap_or_default();
    print_summary(&reports);
    tracing::info!("all selected steps finished in {}s", elapsed.as_secs());
    Ok(())
}

fn print_summary(reports: &[StepReport]) {
    let bold = Style::new().bold();
    let green = Style::new().green();
    let dim = Style::new().dim();

    println!();
    println!("{}", bold.apply_to("Summary:"));
    for report in reports {
        let (marker, label) = match report.outcome {
            StepOutcome::Installed => (green.apply_to("✓"), "installed"),
            StepOutcome::Reinstalled => (green.apply_to("✓"), "reinstalled"),
            StepOutcome::AlreadyInstalled => (dim.apply_to("-"), "already installed"),
        };
        println!("  {} {} {}", marker, report.name, dim.apply_to(label));
    }
}
