//! `strata remove` command.

use std::path::Path;

use crate::adapters::live::filesystem::LiveFileSystem;
use crate::project;

/// Execute the `remove` command, deleting the project state in `cwd`.
///
/// # Errors
///
/// Returns an error string if `cwd` holds no project state or it cannot be
/// deleted.
pub fn run(cwd: &Path) -> Result<(), String> {
    project::remove(&LiveFileSystem, cwd).map_err(|e| e.to_string())?;
    println!("Removed project metadata from {}", cwd.display());
    Ok(())
}
