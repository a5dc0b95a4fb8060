//! Reconciles a stored module tree with a freshly built one.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use super::module::{Annotation, Module};
use crate::error::ProjectError;

/// Token count movement of a module present in both trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenChange {
    /// Total tokens in the stored tree.
    pub previous: u64,
    /// Total tokens in the fresh tree.
    pub current: u64,
}

/// What changed between the stored and fresh trees.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PatchResult {
    /// Modules in both trees whose total token count changed.
    pub changed: BTreeMap<String, TokenChange>,
    /// Modules present only in the fresh tree.
    pub added: Vec<String>,
    /// Modules present only in the stored tree.
    pub removed: Vec<String>,
}

impl PatchResult {
    /// Whether nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.added.is_empty() && self.removed.is_empty()
    }
}

/// Copies annotations from `stored` into `fresh` wherever a module with the
/// same name has an identical content hash; every other fresh annotation is
/// cleared. `fresh` keeps its own structure.
pub fn patch(stored: &Module, fresh: &mut Module) -> PatchResult {
    let mut previous: BTreeMap<&str, (&str, u64, Option<&Annotation>)> = BTreeMap::new();
    for module in stored.descendants() {
        previous.insert(
            module.name.as_str(),
            (module.content_hash.as_str(), module.token_count, module.annotation.as_ref()),
        );
    }

    let mut result = PatchResult::default();
    let mut seen: BTreeSet<String> = BTreeSet::new();
    let mut reused = 0usize;
    apply(fresh, &previous, &mut result, &mut seen, &mut reused);

    result.removed = previous
        .keys()
        .filter(|name| !seen.contains(**name))
        .map(|name| (*name).to_string())
        .collect();
    result.added.sort();

    debug!(
        reused,
        added = result.added.len(),
        removed = result.removed.len(),
        changed = result.changed.len(),
        "patched module tree"
    );
    result
}

fn apply(
    module: &mut Module,
    previous: &BTreeMap<&str, (&str, u64, Option<&Annotation>)>,
    result: &mut PatchResult,
    seen: &mut BTreeSet<String>,
    reused: &mut usize,
) {
    seen.insert(module.name.clone());
    match previous.get(module.name.as_str()) {
        Some(&(hash, tokens, annotation)) => {
            if hash == module.content_hash {
                module.annotation = annotation.cloned();
                if module.annotation.is_some() {
                    *reused += 1;
                }
            } else {
                module.annotation = None;
            }
            if tokens != module.token_count {
                result.changed.insert(
                    module.name.clone(),
                    TokenChange { previous: tokens, current: module.token_count },
                );
            }
        }
        None => {
            module.annotation = None;
            result.added.push(module.name.clone());
        }
    }

    for child in &mut module.modules {
        apply(child, previous, result, seen, reused);
    }
}

/// Fails unless both trees enumerate exactly the same module names.
///
/// # Errors
///
/// Returns [`ProjectError::HierarchyMismatch`] listing the names on each side.
pub fn ensure_same_structure(stored: &Module, fresh: &Module) -> Result<(), ProjectError> {
    let stored_names = stored.names();
    let fresh_names = fresh.names();
    if stored_names == fresh_names {
        return Ok(());
    }
    Err(ProjectError::HierarchyMismatch {
        only_stored: stored_names.difference(&fresh_names).cloned().collect(),
        only_fresh: fresh_names.difference(&stored_names).cloned().collect(),
    })
}

/// Formats a [`PatchResult`] for display.
#[must_use]
pub fn format_patch(result: &PatchResult) -> String {
    if result.is_empty() {
        return "No module changes since last update.".to_string();
    }

    let mut lines = Vec::new();
    if !result.added.is_empty() {
        lines.push("Added modules:".to_string());
        for name in &result.added {
            lines.push(format!("  + {name}"));
        }
    }
    if !result.removed.is_empty() {
        lines.push("Removed modules:".to_string());
        for name in &result.removed {
            lines.push(format!("  - {name}"));
        }
    }
    if !result.changed.is_empty() {
        lines.push("Changed modules:".to_string());
        for (name, change) in &result.changed {
            lines.push(format!("  ~ {name}: {} -> {} tokens", change.previous, change.current));
        }
    }
    lines.join("\n")
}
