//! Scope-aware file selection.
//!
//! The walk always starts at the project root so that `.gitignore` rules
//! declared above the target directory apply inside it. Directories off the
//! path to the target are pruned; excluded directories are never entered.

use std::path::Path;

use tracing::{debug, trace};
use walkdir::WalkDir;

use super::execution::{relative, ExecutionContext};
use super::matcher::PatternList;
use crate::error::SelectionError;

const IGNORE_FILE: &str = ".gitignore";

/// Lists the files visible to `exec`, as `/`-separated paths relative to the
/// project root, in deterministic (sorted walk) order.
///
/// A file is emitted only when it lies under the target directory, no inherited
/// exclusion matches it, and `inclusions` includes it.
///
/// # Errors
///
/// Returns a [`SelectionError`] when a directory cannot be walked or an
/// ignore file exists but cannot be read.
pub fn select<E: AsRef<str>, I: AsRef<str>>(
    exec: &ExecutionContext,
    exclusions: &[E],
    inclusions: &[I],
) -> Result<Vec<String>, SelectionError> {
    let root = exec.project_root();
    let target = exec.target_rel();
    let inclusions = PatternList::compile(inclusions);

    let mut root_rules = PatternList::compile(exclusions);
    root_rules.extend_in(&read_ignore_file(root)?, "");
    // stack[d] holds the rules in force for entries at depth d + 1.
    let mut stack: Vec<PatternList> = vec![root_rules];

    let mut selected = Vec::new();
    let mut walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .min_depth(1)
        .into_iter();

    while let Some(entry) = walker.next() {
        let entry = entry.map_err(|source| SelectionError::Walk {
            path: source.path().unwrap_or(root).to_path_buf(),
            source,
        })?;
        let depth = entry.depth();
        stack.truncate(depth);
        let Some(rules) = stack.last() else {
            continue;
        };
        let rel = relative(root, entry.path());
        let file_type = entry.file_type();

        if file_type.is_dir() {
            if !on_target_path(&rel, &target) {
                trace!(dir = %rel, "pruning directory outside target path");
                walker.skip_current_dir();
                continue;
            }
            if rules.is_excluded(&rel, true) {
                debug!(dir = %rel, "pruning excluded directory");
                walker.skip_current_dir();
                continue;
            }
            let mut nested = rules.clone();
            nested.extend_in(&read_ignore_file(entry.path())?, &rel);
            stack.push(nested);
        } else if file_type.is_file() {
            if is_within(&rel, &target)
                && !rules.is_excluded(&rel, false)
                && inclusions.is_included(&rel, false)
            {
                selected.push(rel);
            }
        } else {
            trace!(path = %rel, "skipping non-regular entry");
        }
    }

    debug!(count = selected.len(), target = %target, "selected files");
    Ok(selected)
}

fn read_ignore_file(dir: &Path) -> Result<Vec<String>, SelectionError> {
    let path = dir.join(IGNORE_FILE);
    match std::fs::read_to_string(&path) {
        Ok(text) => Ok(text.lines().map(str::to_string).collect()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(source) => Err(SelectionError::Io { path, source }),
    }
}

/// Whether `path` equals `dir` or lies beneath it (`dir` empty means the root).
pub(crate) fn is_within(path: &str, dir: &str) -> bool {
    dir.is_empty()
        || path == dir
        || (path.len() > dir.len() && path.starts_with(dir) && path.as_bytes()[dir.len()] == b'/')
}

/// A directory is worth entering when it is an ancestor or descendant of the target.
fn on_target_path(dir: &str, target: &str) -> bool {
    is_within(dir, target) || is_within(target, dir)
}
