//! `strata init` command.

use std::path::Path;

use crate::config::Config;
use crate::context::ServiceContext;
use crate::project;

/// Execute the `init` command.
///
/// Writes the configuration for `provider`, builds the module tree for `cwd`,
/// annotates every module and stores the result. `debug` forces request and
/// response logging for this run.
///
/// # Errors
///
/// Returns an error string if the provider is unknown, a project already
/// exists within `cwd`, or building or annotating fails.
pub fn run(cwd: &Path, provider: Option<&str>, debug: bool) -> Result<(), String> {
    let config = Config::with_provider(provider).map_err(|e| e.to_string())?;
    let ctx = ServiceContext::live(&config.clone().with_payload_debug(debug))
        .map_err(|e| e.to_string())?;

    let root = super::runtime()?
        .block_on(project::create(&ctx, cwd, &config))
        .map_err(|e| e.to_string())?;

    println!(
        "Initialized project at {}: {} modules, {} tokens",
        cwd.display(),
        root.descendants().len(),
        root.token_count,
    );
    Ok(())
}
