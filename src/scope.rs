//! Assembles the context handed to a generation request for one scope.
//!
//! Given the validated execution context, the stored (annotated) tree and a
//! fresh snapshot, this picks the target module's own context, the public
//! contexts of the modules around it, and the contents of the files in scope.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::ServiceContext;
use crate::error::ProjectError;
use crate::ports::summarizer::{FileContent, NamedContext};
use crate::project::module::{owns, Module};
use crate::project::patch::{ensure_same_structure, patch};
use crate::workspace::execution::ExecutionContext;

/// Context used when the target module carries no annotation.
pub const NO_CONTEXT: &str = "No specific context available for this module.";

/// Everything a generation request needs to know about one scope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScopeRequest {
    /// Target directory relative to the project root.
    pub target_directory: String,
    /// Target file relative to the project root, when a file was targeted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_file: Option<String>,
    /// Module owning the working directory.
    pub working_module: String,
    /// Module owning the target directory.
    pub target_module: String,
    /// External and internal context of the target module.
    pub target_module_context: String,
    /// Public contexts of modules beside the target's ancestry, up to the working module.
    pub parent_module_contexts: Vec<NamedContext>,
    /// Public contexts of the target module's direct sub-modules.
    pub sub_module_contexts: Vec<NamedContext>,
    /// Files in scope with their content.
    pub files: Vec<FileContent>,
}

/// Builds a [`ScopeRequest`].
///
/// `stored` and `fresh` must enumerate the same modules; annotations whose
/// content hash still matches are then carried from `stored` onto `fresh`.
/// Unless `include_all` is set, only files owned directly by the target
/// module are kept from `files`.
///
/// # Errors
///
/// Returns [`ProjectError::HierarchyMismatch`] when the trees disagree, or an
/// I/O error when a file cannot be read.
pub fn assemble_scope(
    ctx: &ServiceContext,
    exec: &ExecutionContext,
    stored: &Module,
    fresh: &mut Module,
    files: &[String],
    include_all: bool,
) -> Result<ScopeRequest, ProjectError> {
    ensure_same_structure(stored, fresh)?;
    patch(stored, fresh);
    let fresh: &Module = fresh;

    let target_directory = exec.target_rel();
    let working_rel = exec.working_rel();
    let target = fresh
        .find_module(&target_directory)
        .ok_or_else(|| ProjectError::ModuleNotFound(target_directory.clone()))?;
    let working = fresh
        .find_module(&working_rel)
        .ok_or_else(|| ProjectError::ModuleNotFound(working_rel.clone()))?;

    let mut contents = Vec::new();
    for path in files {
        let owned_by_target = fresh.find_module(path).is_some_and(|m| m.name == target.name);
        if !include_all && !owned_by_target {
            continue;
        }
        let full = exec.project_root().join(path);
        let bytes =
            ctx.fs.read(&full).map_err(|e| ProjectError::io(format!("failed to read {path}"), e))?;
        contents.push(FileContent::from_bytes(path.clone(), &bytes));
    }

    let request = ScopeRequest {
        target_directory,
        target_file: exec.target_file_rel(),
        working_module: working.name.clone(),
        target_module: target.name.clone(),
        target_module_context: target_context(target),
        parent_module_contexts: surrounding_contexts(fresh, target, working),
        sub_module_contexts: target.modules.iter().filter_map(public_context).collect(),
        files: contents,
    };
    debug!(
        target = %request.target_module,
        parents = request.parent_module_contexts.len(),
        subs = request.sub_module_contexts.len(),
        files = request.files.len(),
        "assembled scope"
    );
    Ok(request)
}

fn target_context(target: &Module) -> String {
    let mut out = String::new();
    if let Some(annotation) = &target.annotation {
        if !annotation.external_context.is_empty() {
            out.push_str("External Context: ");
            out.push_str(&annotation.external_context);
            out.push_str("\n\n");
        }
        if !annotation.internal_context.is_empty() {
            out.push_str("Internal Context: ");
            out.push_str(&annotation.internal_context);
        }
    }
    if out.is_empty() {
        NO_CONTEXT.to_string()
    } else {
        out.trim_end().to_string()
    }
}

/// Public contexts of the siblings met while climbing from the target to the
/// working module, skipping the target's own line of ancestors.
fn surrounding_contexts(root: &Module, target: &Module, working: &Module) -> Vec<NamedContext> {
    let mut out = Vec::new();
    let mut ancestor = target.parent.as_deref();
    while let Some(name) = ancestor {
        if !owns(&working.name, name) {
            break;
        }
        let Some(module) = root.find_by_name(name) else {
            break;
        };
        out.extend(
            module
                .modules
                .iter()
                .filter(|child| !owns(&child.name, &target.name))
                .filter_map(public_context),
        );
        ancestor = module.parent.as_deref();
    }
    out
}

fn public_context(module: &Module) -> Option<NamedContext> {
    let text = module.public_context();
    (!text.is_empty()).then(|| NamedContext { name: module.name.clone(), content: text.to_string() })
}
