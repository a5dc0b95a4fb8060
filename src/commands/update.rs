//! `strata update` command.

use std::path::Path;

use crate::adapters::live::filesystem::LiveFileSystem;
use crate::config::Config;
use crate::context::ServiceContext;
use crate::project::{self, format_patch};

/// Execute the `update` command.
///
/// Finds the enclosing project, rebuilds its module tree, re-annotates the
/// modules whose content changed and prints what changed. `debug` forces
/// request and response logging for this run.
///
/// # Errors
///
/// Returns an error string if no project encloses `cwd` or the update fails.
pub fn run(cwd: &Path, debug: bool) -> Result<(), String> {
    let root = project::find_project_root(cwd).map_err(|e| e.to_string())?;
    let config = Config::load(&LiveFileSystem, &root)
        .map_err(|e| e.to_string())?
        .with_payload_debug(debug);
    let ctx = ServiceContext::live(&config).map_err(|e| e.to_string())?;

    let result = super::runtime()?
        .block_on(project::update(&ctx, &root))
        .map_err(|e| e.to_string())?;

    println!("{}", format_patch(&result));
    Ok(())
}
