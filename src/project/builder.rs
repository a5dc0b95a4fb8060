//! Builds the module tree from a flat file list.
//!
//! The naive tree mirrors directories one-to-one. Two passes then shrink it:
//! pass-through directories (no files, a single sub-module) are replaced by
//! their child, and undersized modules are folded into their parent while the
//! parent stays within budget. The root is never folded and never absorbs.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, trace};

use super::module::{hex, parent_dir, FileRef, Module, ROOT_MODULE};
use crate::error::SelectionError;

/// Default lower bound of a module's own token count.
pub const DEFAULT_MIN_TOKENS: u64 = 10_000;

/// Default upper bound a parent may reach by absorbing small children.
pub const DEFAULT_MAX_TOKENS: u64 = 100_000;

/// Size bounds applied by the budget collapse.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TokenBudget {
    /// Modules with fewer own tokens are candidates for merging into their parent.
    #[serde(default = "default_min")]
    pub min_tokens: u64,
    /// A parent never grows beyond this many own tokens by absorbing children.
    #[serde(default = "default_max")]
    pub max_tokens: u64,
}

fn default_min() -> u64 {
    DEFAULT_MIN_TOKENS
}

fn default_max() -> u64 {
    DEFAULT_MAX_TOKENS
}

impl Default for TokenBudget {
    fn default() -> Self {
        Self { min_tokens: DEFAULT_MIN_TOKENS, max_tokens: DEFAULT_MAX_TOKENS }
    }
}

impl TokenBudget {
    /// Checks that the bounds are ordered.
    ///
    /// # Errors
    ///
    /// Returns a message when `min_tokens` exceeds `max_tokens`.
    pub fn validate(&self) -> Result<(), String> {
        if self.min_tokens > self.max_tokens {
            return Err(format!(
                "budget.min_tokens ({}) must not exceed budget.max_tokens ({})",
                self.min_tokens, self.max_tokens
            ));
        }
        Ok(())
    }
}

/// Rough token estimate: one token per four bytes, rounded up.
#[must_use]
pub fn estimate_tokens(byte_len: usize) -> u64 {
    (byte_len as u64).div_ceil(4)
}

/// Stats and hashes the given root-relative files.
///
/// # Errors
///
/// Returns a [`SelectionError`] for the first file that cannot be stat'd or read.
pub fn scan_files(root: &Path, paths: &[String]) -> Result<Vec<FileRef>, SelectionError> {
    paths.iter().map(|rel| scan_file(root, rel)).collect()
}

fn scan_file(root: &Path, rel: &str) -> Result<FileRef, SelectionError> {
    let path = root.join(rel);
    let io_err = |source| SelectionError::Io { path: path.clone(), source };

    let modified = std::fs::metadata(&path).and_then(|m| m.modified()).map_err(io_err)?;
    let bytes = std::fs::read(&path).map_err(io_err)?;

    trace!(file = rel, bytes = bytes.len(), "scanned file");
    Ok(FileRef {
        name: rel.to_string(),
        last_modified: DateTime::<Utc>::from(modified),
        token_count: estimate_tokens(bytes.len()),
        content_hash: hex(&Sha256::digest(&bytes)),
    })
}

/// Builds and collapses the module tree for a snapshot.
#[must_use]
pub fn build(files: Vec<FileRef>, budget: &TokenBudget) -> Module {
    let mut root = naive_tree(files);
    collapse(&mut root, budget);
    debug!(
        modules = root.descendants().len(),
        tokens = root.token_count,
        "built module tree"
    );
    root
}

/// Runs both collapse passes and refreshes aggregates. Idempotent.
pub fn collapse(root: &mut Module, budget: &TokenBudget) {
    collapse_structural(root);
    collapse_budget(root, budget);
    root.finalize();
}

fn naive_tree(files: Vec<FileRef>) -> Module {
    let mut by_dir: BTreeMap<String, Vec<FileRef>> = BTreeMap::new();
    let mut dirs: BTreeSet<String> = BTreeSet::new();
    for file in files {
        let dir = parent_dir(&file.name);
        let mut cursor = dir.clone();
        while cursor != ROOT_MODULE && dirs.insert(cursor.clone()) {
            cursor = parent_dir(&cursor);
        }
        by_dir.entry(dir).or_default().push(file);
    }

    let mut children: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for dir in &dirs {
        children.entry(parent_dir(dir)).or_default().push(dir.clone());
    }

    node(ROOT_MODULE, &mut by_dir, &children)
}

fn node(
    name: &str,
    by_dir: &mut BTreeMap<String, Vec<FileRef>>,
    children: &BTreeMap<String, Vec<String>>,
) -> Module {
    let mut module = Module::new(name);
    module.files = by_dir.remove(name).unwrap_or_default();
    if let Some(kids) = children.get(name) {
        module.modules = kids.iter().map(|kid| node(kid, by_dir, children)).collect();
    }
    module
}

fn collapse_structural(module: &mut Module) {
    for child in &mut module.modules {
        collapse_structural(child);
        while child.files.is_empty() && child.modules.len() == 1 {
            if let Some(only) = child.modules.pop() {
                trace!(from = %child.name, to = %only.name, "collapsing pass-through module");
                *child = only;
            }
        }
    }
}

fn own_tokens(module: &Module) -> u64 {
    module.files.iter().map(|f| f.token_count).sum()
}

fn collapse_budget(module: &mut Module, budget: &TokenBudget) {
    for child in &mut module.modules {
        collapse_budget(child, budget);
    }
    if module.is_root() {
        return;
    }

    let mut local = own_tokens(module);
    loop {
        let candidate = module.modules.iter().position(|child| {
            let size = own_tokens(child);
            size < budget.min_tokens && local + size <= budget.max_tokens
        });
        let Some(idx) = candidate else { break };

        let absorbed = module.modules.remove(idx);
        debug!(module = %module.name, absorbed = %absorbed.name, "merging undersized module");
        local += own_tokens(&absorbed);
        module.files.extend(absorbed.files);
        module.modules.extend(absorbed.modules);
    }
}
