//! asl-extras - AllStarLink node add-on installer
//!
//! Installs a fixed set of optional third-party packages onto an AllStarLink
//! node, each through its own upstream installer, after making sure the
//! host's scratch mounts can run them.

use clap::Parser;

mod cli;
mod commands;
mod config_file;
mod controller;
mod download;
mod error;
mod logging;
mod preflight;
mod privilege;
mod progress;
mod runner;
mod settings;
mod signal;
mod steps;
#[cfg(test)]
mod test_fixtures;
mod workspace;

use cli::Cli;
use settings::Paths;

fn main() {
    let cli = Cli::parse();

    let log_file = cli
        .log_file
        .clone()
        .unwrap_or_else(|| Paths::default().log_file);
    let _log = match logging::init(&log_file, cli.verbose) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Warning: {}", e);
            None
        }
    };

    let result = cli.selection().and_then(|selection| {
        commands::install::run(&selection)
    });

    if let Err(e) = result {
        if e.is_usage() {
            eprintln!("{}", Cli::help_text());
        }
        tracing::error!("{}", e);
        let code = e.exit_code();
        // Flush the file log before exiting
        drop(_log);
        std::process::exit(code);
    }
}
