//! Privilege guard and per-run invocation facts
//!
//! A run must be elevated *and* traceable to the regular account that ran
//! `sudo`, because some steps drop back to that account.

use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::SystemTime;

use nix::unistd::{Uid, User};

use crate::error::{InstallerError, Result};

/// Immutable facts about this run, captured once at startup
#[derive(Debug, Clone)]
pub struct InvocationContext {
    pub effective_uid: u32,
    pub invoking_user: String,
    pub interactive: bool,
    pub started_at: SystemTime,
}

/// A resolved login account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAccount {
    pub name: String,
    pub uid: u32,
    pub gid: u32,
    pub home: PathBuf,
}

/// Check the current process and build the run context
pub fn validate() -> Result<InvocationContext> {
    validate_from(
        Uid::effective().as_raw(),
        std::env::var("SUDO_USER").ok(),
        std::io::stdin().is_terminal(),
    )
}

/// Pure form of [`validate`] over already-gathered facts
pub fn validate_from(
    effective_uid: u32,
    sudo_user: Option<String>,
    interactive: bool,
) -> Result<InvocationContext> {
    if effective_uid != 0 {
        return Err(InstallerError::NotElevated);
    }

    let invoking_user = sudo_user
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty() && u != "root")
        .ok_or(InstallerError::NoInvokingUser)?;

    Ok(InvocationContext {
        effective_uid,
        invoking_user,
        interactive,
        started_at: SystemTime::now(),
    })
}

/// Source of account records; the system password database in production
pub trait AccountLookup {
    fn lookup(&self, name: &str) -> Option<UserAccount>;
}

/// Reads the password database through `getpwnam`
pub struct SystemAccounts;

impl AccountLookup for SystemAccounts {
    fn lookup(&self, name: &str) -> Option<UserAccount> {
        match User::from_name(name) {
            Ok(Some(user)) => Some(UserAccount {
                name: user.name,
                uid: user.uid.as_raw(),
                gid: user.gid.as_raw(),
                home: user.dir,
            }),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("account lookup for {name} failed: {e}");
                None
            }
        }
    }
}

impl InvocationContext {
    /// Re-resolve the invoking user's account; missing accounts are fatal
    pub fn resolve_invoking_user(&self, accounts: &dyn AccountLookup) -> Result<UserAccount> {
        accounts
            .lookup(&self.invoking_user)
            .ok_or_else(|| InstallerError::UserNotFound {
                user: self.invoking_user.clone(),
            })
    }
}
