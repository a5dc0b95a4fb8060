//! Project metadata: building, annotating and persisting the module tree.
//!
//! State lives under `.strata/` at the project root: `config.yaml` and
//! `metadata.yaml`, the latter holding the annotated root module.

pub mod annotate;
pub mod builder;
pub mod module;
pub mod patch;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::Config;
use crate::context::ServiceContext;
use crate::error::{ProjectError, SelectionError};
use crate::ports::filesystem::FileSystem;
use crate::workspace::execution::{
    discover_project_root, relative, ExecutionContext, MARKER_DIR, METADATA_FILE,
};
use crate::workspace::selector::select;

pub use module::{Annotation, FileRef, Module};
pub use patch::{format_patch, PatchResult};

/// Exclusions applied to every metadata build, ahead of configured ones.
pub const SYSTEM_EXCLUSIONS: &[&str] = &[".git/", ".gitignore", ".strata/"];

/// Persisted metadata document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Metadata {
    /// Root of the module tree.
    pub modules: Module,
}

/// Path of the metadata document for a project root.
#[must_use]
pub fn metadata_path(project_root: &Path) -> PathBuf {
    project_root.join(MARKER_DIR).join(METADATA_FILE)
}

/// System exclusions followed by the configured ones.
#[must_use]
pub fn exclusions(config: &Config) -> Vec<String> {
    SYSTEM_EXCLUSIONS
        .iter()
        .map(|p| (*p).to_string())
        .chain(config.exclusions.iter().cloned())
        .collect()
}

/// Ascends from `start` to the nearest directory holding project metadata.
///
/// # Errors
///
/// Returns [`ProjectError::Context`] when no ancestor is a project root.
pub fn find_project_root(start: &Path) -> Result<PathBuf, ProjectError> {
    Ok(discover_project_root(start)?)
}

/// Selects, scans and builds a fresh module tree for the whole project.
///
/// The project marker directory must already exist.
///
/// # Errors
///
/// Returns an error if the root is not a project or a file cannot be read.
pub fn build_snapshot(project_root: &Path, config: &Config) -> Result<Module, ProjectError> {
    let exec = ExecutionContext::new(project_root, project_root, None)?;
    let files = select(&exec, &exclusions(config), &["*"])?;
    let refs = builder::scan_files(exec.project_root(), &files)?;
    Ok(builder::build(refs, &config.budget))
}

/// Loads the stored module tree and restores its derived fields.
///
/// # Errors
///
/// Returns [`ProjectError::NotInitialized`] when no metadata exists, or a
/// read/parse error.
pub fn load(fs: &dyn FileSystem, project_root: &Path) -> Result<Module, ProjectError> {
    let path = metadata_path(project_root);
    if !fs.exists(&path) {
        return Err(ProjectError::NotInitialized(project_root.to_path_buf()));
    }
    let text = fs
        .read_to_string(&path)
        .map_err(|e| ProjectError::io(format!("failed to read {}", path.display()), e))?;
    let mut metadata: Metadata = serde_yaml::from_str(&text)
        .map_err(|e| ProjectError::yaml(format!("failed to parse {}", path.display()), e))?;
    metadata.modules.rehydrate();
    Ok(metadata.modules)
}

/// Writes the module tree as the project's metadata document.
///
/// # Errors
///
/// Returns an error if serialization or the write fails.
pub fn save(fs: &dyn FileSystem, project_root: &Path, root: &Module) -> Result<(), ProjectError> {
    let path = metadata_path(project_root);
    let yaml = serde_yaml::to_string(&Metadata { modules: root.clone() })
        .map_err(|e| ProjectError::yaml("failed to serialize metadata", e))?;
    fs.write(&path, &yaml)
        .map_err(|e| ProjectError::io(format!("failed to write {}", path.display()), e))
}

/// Creates project state under `project_root`: configuration first, then the
/// annotated module tree.
///
/// Refuses when any marker directory already exists within the root. When
/// building or annotating fails, the new marker directory is removed again.
///
/// # Errors
///
/// Returns [`ProjectError::AlreadyInitialized`], a configuration error, or the
/// first build/annotation failure.
pub async fn create(
    ctx: &ServiceContext,
    project_root: &Path,
    config: &Config,
) -> Result<Module, ProjectError> {
    if let Some(existing) = existing_marker(project_root)? {
        return Err(ProjectError::AlreadyInitialized(existing));
    }
    config.validate()?;
    config.save(ctx.fs.as_ref(), project_root)?;

    match build_and_annotate(ctx, project_root, config).await {
        Ok(root) => {
            let modules = root.descendants().len();
            info!(root = %project_root.display(), modules, "project created");
            Ok(root)
        }
        Err(err) => {
            let marker = project_root.join(MARKER_DIR);
            if let Err(cleanup) = ctx.fs.remove_dir_all(&marker) {
                warn!(error = %cleanup, "failed to remove partial project state");
            }
            Err(err)
        }
    }
}

async fn build_and_annotate(
    ctx: &ServiceContext,
    project_root: &Path,
    config: &Config,
) -> Result<Module, ProjectError> {
    let mut root = build_snapshot(project_root, config)?;
    annotate::annotate(&mut root, project_root, &ctx.fs, &ctx.summarizer).await?;
    save(ctx.fs.as_ref(), project_root, &root)?;
    Ok(root)
}

/// Rebuilds the module tree, keeps annotations of unchanged modules,
/// summarizes the rest and writes the result.
///
/// # Errors
///
/// Returns an error if the project is not initialized, the build fails, or
/// annotation fails. Stored metadata is left untouched on failure.
pub async fn update(ctx: &ServiceContext, project_root: &Path) -> Result<PatchResult, ProjectError> {
    let config = Config::load(ctx.fs.as_ref(), project_root)?;
    let stored = load(ctx.fs.as_ref(), project_root)?;
    let mut fresh = build_snapshot(project_root, &config)?;

    let result = patch::patch(&stored, &mut fresh);
    debug!(report = %format_patch(&result), "metadata patched");

    annotate::annotate(&mut fresh, project_root, &ctx.fs, &ctx.summarizer).await?;
    save(ctx.fs.as_ref(), project_root, &fresh)?;
    info!(root = %project_root.display(), "project updated");
    Ok(result)
}

/// Deletes the project's marker directory.
///
/// # Errors
///
/// Returns [`ProjectError::NotInitialized`] when there is no marker directory.
pub fn remove(fs: &dyn FileSystem, project_root: &Path) -> Result<(), ProjectError> {
    let marker = project_root.join(MARKER_DIR);
    if !fs.is_dir(&marker) {
        return Err(ProjectError::NotInitialized(project_root.to_path_buf()));
    }
    fs.remove_dir_all(&marker)
        .map_err(|e| ProjectError::io(format!("failed to remove {}", marker.display()), e))?;
    info!(root = %project_root.display(), "project state removed");
    Ok(())
}

/// First marker directory inside `project_root`, relative to it, in sorted order.
fn existing_marker(project_root: &Path) -> Result<Option<String>, ProjectError> {
    let walker = WalkDir::new(project_root).follow_links(false).sort_by_file_name();
    for entry in walker {
        let entry = entry.map_err(|source| SelectionError::Walk {
            path: source.path().unwrap_or(project_root).to_path_buf(),
            source,
        })?;
        if entry.file_type().is_dir() && entry.file_name() == MARKER_DIR {
            let rel = relative(project_root, entry.path());
            return Ok(Some(rel));
        }
    }
    Ok(None)
}
