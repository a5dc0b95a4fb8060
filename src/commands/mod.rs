//! Command dispatch and handlers.

pub mod context;
pub mod init;
pub mod remove;
pub mod select;
pub mod update;

use std::env;
use std::path::{Path, PathBuf};

use tokio::runtime::Runtime;
use tracing::debug;

use crate::adapters::live::filesystem::LiveFileSystem;
use crate::cli::{Cli, Command};
use crate::config::Config;
use crate::logging;
use crate::workspace::discover_project_root;

/// Dispatch a parsed command line to its handler.
///
/// Logging is initialized first, using the `--log-level` flag or the level
/// configured by the enclosing project, if any.
///
/// # Errors
///
/// Returns an error string if logging cannot be initialized or the selected
/// command handler fails.
pub fn dispatch(cli: &Cli) -> Result<(), String> {
    let cwd = env::current_dir().map_err(|e| format!("failed to get current directory: {e}"))?;
    let config = nearby_config(&cwd);
    logging::init(&logging::resolve_level(cli.log_level.as_deref(), config.as_ref()))?;

    match &cli.command {
        Command::Init { provider } => init::run(&cwd, provider.as_deref(), cli.debug),
        Command::Update => update::run(&cwd, cli.debug),
        Command::Remove => remove::run(&cwd),
        Command::Select { target, include, exclude } => {
            select::run(&cwd, target.as_deref(), include, exclude)
        }
        Command::Context { target, all } => context::run(&cwd, target.as_deref(), *all),
    }
}

/// Configuration of the project enclosing `cwd`, if one can be loaded.
///
/// Only consulted for the log level, so failures fall back to defaults here and
/// surface later in the command that actually needs the configuration.
fn nearby_config(cwd: &Path) -> Option<Config> {
    let root = discover_project_root(cwd).ok()?;
    match Config::load(&LiveFileSystem, &root) {
        Ok(config) => Some(config),
        Err(err) => {
            debug!(error = %err, "ignoring unreadable configuration");
            None
        }
    }
}

/// Multi-threaded runtime for commands that annotate.
pub(crate) fn runtime() -> Result<Runtime, String> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to start async runtime: {e}"))
}

/// Resolves a command-line target against the current directory.
pub(crate) fn absolute_target(cwd: &Path, target: Option<&Path>) -> Option<PathBuf> {
    target.map(|t| if t.is_absolute() { t.to_path_buf() } else { cwd.join(t) })
}
