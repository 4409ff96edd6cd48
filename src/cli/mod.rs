//! CLI definitions using clap derive API
//!
//! Every install step has its own flag; flags combine freely and the steps
//! always run in the registry's order, not the order given here.

use std::path::PathBuf;

use clap::builder::{Styles, styling::AnsiColor};
use clap::{CommandFactory, Parser};

use crate::error::{InstallerError, Result};
use crate::steps::StepKind;

/// asl-extras - AllStarLink node add-on installer
///
/// Installs optional third-party packages onto an AllStarLink node.
#[derive(Parser, Debug)]
#[command(
    name = "asl-extras",
    author,
    version,
    color = clap::ColorChoice::Auto,
    styles = Styles::styled()
        .header(AnsiColor::Green.on_default().bold())
        .usage(AnsiColor::Green.on_default().bold())
        .literal(AnsiColor::Cyan.on_default().bold())
        .placeholder(AnsiColor::Cyan.on_default()),
    about = "Install optional add-ons onto an AllStarLink node",
    long_about = "Installs optional add-ons (AllScan, DVSwitch Server, Supermon-NG, \
                  SkywarnPlus-NG, Saytime Weather, SayIP Node Utils, Internet Monitor) \
                  onto an AllStarLink node. Must be run with sudo from a regular account.",
    after_help = "\x1b[1m\x1b[32mExamples:\x1b[0m\n   \
                  sudo asl-extras --allscan                          \x1b[90m# Install AllScan\x1b[0m\n   \
                  sudo asl-extras --supermon-ng --skywarnplus-ng     \x1b[90m# Install two add-ons\x1b[0m\n   \
                  sudo asl-extras --sayip-node-utils --node 12345    \x1b[90m# Add-ons that need a node number\x1b[0m\n   \
                  sudo asl-extras --all --node 12345                 \x1b[90m# Install everything\x1b[0m\n\n\
                  "
)]
pub struct Cli {
    /// Install the AllScan web dashboard
    #[arg(long)]
    pub allscan: bool,

    /// Install DVSwitch Server
    #[arg(long = "dvswitch-server")]
    pub dvswitch_server: bool,

    /// Install Supermon-NG
    #[arg(long = "supermon-ng")]
    pub supermon_ng: bool,

    /// Install SkywarnPlus-NG (runs its installer as your user)
    #[arg(long = "skywarnplus-ng")]
    pub skywarnplus_ng: bool,

    /// Install Saytime Weather
    #[arg(long = "saytime-weather")]
    pub saytime_weather: bool,

    /// Install SayIP Node Utils (requires --node)
    #[arg(long = "sayip-node-utils")]
    pub sayip_node_utils: bool,

    /// Install Internet Monitor (requires --node)
    #[arg(long = "internet-monitor")]
    pub internet_monitor: bool,

    /// Install every add-on
    #[arg(long)]
    pub all: bool,

    /// AllStarLink node number
    #[arg(long, value_name = "NUMBER")]
    pub node: Option<String>,

    /// Enable verbose output
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Durable log file
    #[arg(long, env = "ASL_EXTRAS_LOG_FILE", value_name = "PATH", hide = true)]
    pub log_file: Option<PathBuf>,
}

/// Validated choice of what to install
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub steps: Vec<StepKind>,
    pub node: Option<String>,
}

impl Cli {
    fn flag_for(&self, step: StepKind) -> bool {
        self.all
            || match step {
                StepKind::AllScan => self.allscan,
                StepKind::DvSwitchServer => self.dvswitch_server,
                StepKind::SupermonNg => self.supermon_ng,
                StepKind::SkywarnPlusNg => self.skywarnplus_ng,
                StepKind::SaytimeWeather => self.saytime_weather,
                StepKind::SayIpNodeUtils => self.sayip_node_utils,
                StepKind::InternetMonitor => self.internet_monitor,
            }
    }

    /// Selected steps in run order
    pub fn selected_steps(&self) -> Vec<StepKind> {
        StepKind::ALL
            .into_iter()
            .filter(|step| self.flag_for(*step))
            .collect()
    }

    /// Validate the flags into something runnable
    pub fn selection(&self) -> Result<Selection> {
        let steps = self.selected_steps();
        if steps.is_empty() {
            return Err(InstallerError::NoStepsSelected);
        }

        let node = self.node.as_deref().map(validate_node).transpose()?;
        if node.is_none() {
            if let Some(step) = steps.iter().find(|s| s.needs_node()) {
                return Err(InstallerError::NodeNumberRequired {
                    step: step.to_string(),
                });
            }
        }

        Ok(Selection { steps, node })
    }

    /// Long help text, as printed for `--help`
    pub fn help_text() -> String {
        Cli::command().render_long_help().to_string()
    }
}

fn validate_node(value: &str) -> Result<String> {
    let value = value.trim();
    let valid = !value.is_empty() && value.len() <= 10 && value.chars().all(|c| c.is_ascii_digit());
    if valid {
        Ok(value.to_string())
    } else {
        Err(InstallerError::InvalidNodeNumber {
            value: value.to_string(),
        })
    }
}
