//! `strata select` command.

use std::path::Path;

use crate::adapters::live::filesystem::LiveFileSystem;
use crate::config::Config;
use crate::project;
use crate::workspace::{select, validate_pattern, ExecutionContext};

/// Execute the `select` command.
///
/// Prints, one per line, the files under the target's directory (or `cwd`)
/// that survive the project exclusions plus `exclude` and match `include`.
/// An empty `include` list selects everything.
///
/// # Errors
///
/// Returns an error string if no project encloses `cwd`, a pattern is
/// malformed, the target is invalid, or the tree cannot be walked.
pub fn run(
    cwd: &Path,
    target: Option<&Path>,
    include: &[String],
    exclude: &[String],
) -> Result<(), String> {
    for pattern in include.iter().chain(exclude) {
        validate_pattern(pattern).map_err(|e| e.to_string())?;
    }

    let root = project::find_project_root(cwd).map_err(|e| e.to_string())?;
    let config = Config::load(&LiveFileSystem, &root).map_err(|e| e.to_string())?;
    let target = super::absolute_target(cwd, target);
    let exec = ExecutionContext::new(&root, cwd, target.as_deref()).map_err(|e| e.to_string())?;

    let mut exclusions = project::exclusions(&config);
    exclusions.extend(exclude.iter().cloned());
    let inclusions = if include.is_empty() { vec!["*".to_string()] } else { include.to_vec() };

    for file in select(&exec, &exclusions, &inclusions).map_err(|e| e.to_string())? {
        println!("{file}");
    }
    Ok(())
}
