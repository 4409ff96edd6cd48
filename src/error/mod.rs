//! Error types and handling for asl-extras
//!
//! Uses `thiserror` for error definitions and `miette` for pretty diagnostics.
//!
//! Variants are grouped by the phase of the run that raises them:
//! privilege checks, usage, downloads, external commands, individual steps
//! and the filesystem.

use miette::Diagnostic;
use thiserror::Error;

/// Main error type for asl-extras operations
#[derive(Error, Diagnostic, Debug)]
pub enum InstallerError {
    // Privilege errors
    #[error("This installer must be run with root privileges")]
    #[diagnostic(
        code(asl_extras::privilege::not_elevated),
        help("Run it from your normal account with sudo, e.g. 'sudo asl-extras --allscan'")
    )]
    NotElevated,

    #[error("Could not determine the user who invoked sudo")]
    #[diagnostic(
        code(asl_extras::privilege::no_invoking_user),
        help(
            "Log in as a regular user and run the installer with sudo instead of from a root shell"
        )
    )]
    NoInvokingUser,

    // Usage errors
    #[error("No install steps selected")]
    #[diagnostic(
        code(asl_extras::usage::no_steps),
        help("Pass at least one step flag, e.g. --allscan, or --all for every step")
    )]
    NoStepsSelected,

    #[error("--node is required by {step}")]
    #[diagnostic(
        code(asl_extras::usage::node_required),
        help("Pass your AllStarLink node number, e.g. --node 12345")
    )]
    NodeNumberRequired { step: String },

    #[error("Invalid node number: '{value}'")]
    #[diagnostic(
        code(asl_extras::usage::invalid_node),
        help("Node numbers contain digits only")
    )]
    InvalidNodeNumber { value: String },

    // Download errors
    #[error("Failed to download {url} after {attempts} attempts: {reason}")]
    #[diagnostic(
        code(asl_extras::download::failed),
        help("Check the node's internet connection and try again")
    )]
    DownloadFailed {
        url: String,
        attempts: u32,
        reason: String,
    },

    // Command errors
    #[error("Command '{command}' failed ({status}): {stderr}")]
    #[diagnostic(code(asl_extras::command::failed))]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("Failed to start '{program}': {reason}")]
    #[diagnostic(
        code(asl_extras::command::spawn_failed),
        help("Make sure the program is installed and on PATH")
    )]
    CommandSpawnFailed { program: String, reason: String },

    // Step errors
    #[error("User account '{user}' could not be resolved")]
    #[diagnostic(
        code(asl_extras::step::user_not_found),
        help("The installer refuses to fall back to root for steps that must run as you")
    )]
    UserNotFound { user: String },

    #[error("{step} failed: {message}")]
    #[diagnostic(code(asl_extras::step::failed))]
    StepFailed { step: String, message: String },

    // Workspace errors
    #[error("Scratch workspace error at {path}: {reason}")]
    #[diagnostic(code(asl_extras::workspace::failed))]
    WorkspaceFailed { path: String, reason: String },

    // File system errors
    #[error("Failed to read file {path}: {reason}")]
    #[diagnostic(code(asl_extras::fs::read_failed))]
    FileReadFailed { path: String, reason: String },

    #[error("Failed to write file {path}: {reason}")]
    #[diagnostic(code(asl_extras::fs::write_failed))]
    FileWriteFailed { path: String, reason: String },

    #[error("IO error: {message}")]
    #[diagnostic(code(asl_extras::fs::io_error))]
    IoError { message: String },

    // Run errors
    #[error("Interrupted")]
    #[diagnostic(
        code(asl_extras::run::interrupted),
        help("Re-run the installer to finish the remaining steps")
    )]
    Interrupted,

    #[error("Failed to initialize logging: {message}")]
    #[diagnostic(code(asl_extras::run::log_init_failed))]
    LogInitFailed { message: String },
}

impl InstallerError {
    /// Process exit status for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            InstallerError::NoStepsSelected
            | InstallerError::NodeNumberRequired { .. }
            | InstallerError::InvalidNodeNumber { .. } => 2,
            InstallerError::Interrupted => 130,
            _ => 1,
        }
    }

    /// Whether this error comes from how the tool was invoked rather than from the host
    pub fn is_usage(&self) -> bool {
        self.exit_code() == 2
    }
}

impl From<std::io::Error> for InstallerError {
    fn from(err: std::io::Error) -> Self {
        InstallerError::IoError {
            message: err.to_string(),
        }
    }
}

/// Result type alias using miette for error handling
pub type Result<T> = miette::Result<T, InstallerError>;
