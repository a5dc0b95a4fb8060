//! `strata context` command.

use std::path::Path;

use crate::adapters::live::filesystem::LiveFileSystem;
use crate::config::Config;
use crate::context::ServiceContext;
use crate::project;
use crate::scope::assemble_scope;
use crate::workspace::{select, ExecutionContext};

/// Execute the `context` command.
///
/// Assembles the scope request for the target (or `cwd`) from the stored
/// annotations and the current tree, and prints it as JSON.
///
/// # Errors
///
/// Returns an error string if the project is missing or stale, the target is
/// invalid, or a file cannot be read.
pub fn run(cwd: &Path, target: Option<&Path>, include_all: bool) -> Result<(), String> {
    let root = project::find_project_root(cwd).map_err(|e| e.to_string())?;
    let config = Config::load(&LiveFileSystem, &root).map_err(|e| e.to_string())?;
    let ctx = ServiceContext::live(&config).map_err(|e| e.to_string())?;

    let target = super::absolute_target(cwd, target);
    let exec = ExecutionContext::new(&root, cwd, target.as_deref()).map_err(|e| e.to_string())?;

    let stored = project::load(ctx.fs.as_ref(), &root).map_err(|e| e.to_string())?;
    let mut fresh = project::build_snapshot(&root, &config).map_err(|e| e.to_string())?;
    let files = select(&exec, &project::exclusions(&config), &["*"]).map_err(|e| e.to_string())?;

    let request = assemble_scope(&ctx, &exec, &stored, &mut fresh, &files, include_all)
        .map_err(|e| e.to_string())?;
    let json = serde_json::to_string_pretty(&request)
        .map_err(|e| format!("failed to serialize scope request: {e}"))?;
    println!("{json}");
    Ok(())
}
