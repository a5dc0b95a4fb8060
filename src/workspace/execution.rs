//! Validated scope paths for a single operation.
//!
//! An [`ExecutionContext`] bounds what an operation may read (the selector only
//! emits files under [`ExecutionContext::target_dir`]) and what the surrounding
//! layer may write. Construction fails instead of correcting bad input.

use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::error::ContextError;

/// Name of the directory that marks a project root.
pub const MARKER_DIR: &str = ".strata";

/// Name of the metadata document inside [`MARKER_DIR`].
pub const METADATA_FILE: &str = "metadata.yaml";

/// The `{project root, working dir, target dir}` triple, all absolute and clean.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionContext {
    project_root: PathBuf,
    working_dir: PathBuf,
    target_file: Option<PathBuf>,
    target_dir: PathBuf,
}

impl ExecutionContext {
    /// Validates the scope paths in order: absoluteness, project marker,
    /// working dir containment, then the optional target file.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant as a [`ContextError`].
    pub fn new(
        project_root: &Path,
        working_dir: &Path,
        target_file: Option<&Path>,
    ) -> Result<Self, ContextError> {
        if !project_root.is_absolute() {
            return Err(ContextError::NotAbsolute(project_root.to_path_buf()));
        }
        if !working_dir.is_absolute() {
            return Err(ContextError::NotAbsolute(working_dir.to_path_buf()));
        }

        let project_root = clean(project_root);
        let working_dir = clean(working_dir);

        if !project_root.join(MARKER_DIR).is_dir() {
            return Err(ContextError::MissingMarker(project_root));
        }
        if !working_dir.starts_with(&project_root) {
            return Err(ContextError::WorkingOutsideRoot {
                working: working_dir,
                root: project_root,
            });
        }

        let (target_file, target_dir) = match target_file {
            None => (None, working_dir.clone()),
            Some(target) => {
                if !target.is_absolute() {
                    return Err(ContextError::TargetNotAbsolute(target.to_path_buf()));
                }
                let target = clean(target);
                let Ok(meta) = std::fs::metadata(&target) else {
                    return Err(ContextError::TargetMissing(target));
                };
                if meta.is_dir() {
                    return Err(ContextError::TargetIsDirectory(target));
                }
                if !target.starts_with(&working_dir) {
                    return Err(ContextError::TargetOutsideWorking {
                        target,
                        working: working_dir,
                    });
                }
                let dir = target.parent().map_or_else(|| working_dir.clone(), Path::to_path_buf);
                (Some(target), dir)
            }
        };

        debug!(
            root = %project_root.display(),
            working = %working_dir.display(),
            target = %target_dir.display(),
            "execution context validated"
        );

        Ok(Self { project_root, working_dir, target_file, target_dir })
    }

    /// Absolute project root.
    #[must_use]
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Absolute working directory.
    #[must_use]
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Target file relative to the root, when one was given.
    #[must_use]
    pub fn target_file_rel(&self) -> Option<String> {
        self.target_file.as_deref().map(|file| relative(&self.project_root, file))
    }

    /// Absolute target directory.
    #[must_use]
    pub fn target_dir(&self) -> &Path {
        &self.target_dir
    }

    /// Working directory relative to the root, `/`-separated, empty for the root.
    #[must_use]
    pub fn working_rel(&self) -> String {
        relative(&self.project_root, &self.working_dir)
    }

    /// Target directory relative to the root, `/`-separated, empty for the root.
    #[must_use]
    pub fn target_rel(&self) -> String {
        relative(&self.project_root, &self.target_dir)
    }
}

/// Converts a relative directory into a module name (`"."` for the root).
#[must_use]
pub fn module_name(rel: &str) -> String {
    if rel.is_empty() {
        ".".to_string()
    } else {
        rel.to_string()
    }
}

/// Ascends from `start` until a directory holding `.strata/metadata.yaml` is found.
///
/// # Errors
///
/// Returns [`ContextError::RootNotFound`] when no ancestor qualifies.
pub fn discover_project_root(start: &Path) -> Result<PathBuf, ContextError> {
    let start = clean(start);
    start
        .ancestors()
        .find(|dir| dir.join(MARKER_DIR).join(METADATA_FILE).is_file())
        .map(Path::to_path_buf)
        .ok_or(ContextError::RootNotFound(start))
}

/// Lexically normalizes a path: drops `.` components and resolves `..`
/// against preceding normal components. Never touches the filesystem.
#[must_use]
pub fn clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(out.components().next_back(), Some(Component::Normal(_)))
                    && out.pop();
                if !popped && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// `/`-joined path of `path` below `root`; empty when they are equal or unrelated.
#[must_use]
pub fn relative(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .map(|rel| {
            rel.components()
                .filter_map(|c| match c {
                    Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("/")
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(MARKER_DIR)).unwrap();
        std::fs::create_dir_all(dir.path().join("work/sub")).unwrap();
        std::fs::write(dir.path().join("work/sub/c.txt"), "c").unwrap();
        std::fs::write(dir.path().join("top.txt"), "t").unwrap();
        dir
    }

    #[test]
    fn defaults_target_to_working_dir() {
        let root = project();
        let working = root.path().join("work");
        let ctx = ExecutionContext::new(root.path(), &working, None).unwrap();
        assert_eq!(ctx.target_dir(), working.as_path());
        assert_eq!(ctx.working_rel(), "work");
        assert_eq!(ctx.target_rel(), "work");
        assert!(ctx.target_file_rel().is_none());
    }

    #[test]
    fn target_dir_is_parent_of_target_file() {
        let root = project();
        let working = root.path().join("work");
        let target = working.join("sub/c.txt");
        let ctx = ExecutionContext::new(root.path(), &working, Some(&target)).unwrap();
        assert_eq!(ctx.target_dir(), working.join("sub").as_path());
        assert_eq!(ctx.target_rel(), "work/sub");
        assert_eq!(ctx.target_file_rel().as_deref(), Some("work/sub/c.txt"));
    }

    #[test]
    fn rejects_relative_paths() {
        let root = project();
        let err = ExecutionContext::new(Path::new("rel"), root.path(), None).unwrap_err();
        assert_eq!(err, ContextError::NotAbsolute(PathBuf::from("rel")));
        let err = ExecutionContext::new(root.path(), Path::new("rel"), None).unwrap_err();
        assert_eq!(err, ContextError::NotAbsolute(PathBuf::from("rel")));
        let err =
            ExecutionContext::new(root.path(), root.path(), Some(Path::new("top.txt"))).unwrap_err();
        assert_eq!(err, ContextError::TargetNotAbsolute(PathBuf::from("top.txt")));
    }

    #[test]
    fn rejects_root_without_marker() {
        let dir = tempfile::tempdir().unwrap();
        let err = ExecutionContext::new(dir.path(), dir.path(), None).unwrap_err();
        assert!(matches!(err, ContextError::MissingMarker(_)));
    }

    #[test]
    fn rejects_working_dir_outside_root() {
        let root = project();
        let escaped = root.path().join("work/../..");
        let err = ExecutionContext::new(root.path(), &escaped, None).unwrap_err();
        assert!(matches!(err, ContextError::WorkingOutsideRoot { .. }));
    }

    #[test]
    fn rejects_sibling_with_shared_name_prefix() {
        let root = project();
        let sibling = PathBuf::from(format!("{}-other", root.path().display()));
        let err = ExecutionContext::new(root.path(), &sibling, None).unwrap_err();
        assert!(matches!(err, ContextError::WorkingOutsideRoot { .. }));
    }

    #[test]
    fn rejects_bad_targets() {
        let root = project();
        let working = root.path().join("work");

        let missing = working.join("nope.txt");
        let err = ExecutionContext::new(root.path(), &working, Some(&missing)).unwrap_err();
        assert!(matches!(err, ContextError::TargetMissing(_)));

        let dir = working.join("sub");
        let err = ExecutionContext::new(root.path(), &working, Some(&dir)).unwrap_err();
        assert!(matches!(err, ContextError::TargetIsDirectory(_)));

        let outside = root.path().join("top.txt");
        let err = ExecutionContext::new(root.path(), &working, Some(&outside)).unwrap_err();
        assert!(matches!(err, ContextError::TargetOutsideWorking { .. }));
    }

    #[test]
    fn discovers_root_from_nested_dir() {
        let root = project();
        std::fs::write(root.path().join(MARKER_DIR).join(METADATA_FILE), "modules: {}").unwrap();
        let found = discover_project_root(&root.path().join("work/sub")).unwrap();
        assert_eq!(found, clean(root.path()));

        let bare = tempfile::tempdir().unwrap();
        assert!(matches!(
            discover_project_root(bare.path()),
            Err(ContextError::RootNotFound(_))
        ));
    }

    #[test]
    fn clean_resolves_dots() {
        assert_eq!(clean(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(clean(Path::new("/../a")), PathBuf::from("/a"));
        assert_eq!(clean(Path::new("a/../../b")), PathBuf::from("../b"));
    }

    #[test]
    fn module_names_use_dot_for_root() {
        assert_eq!(module_name(""), ".");
        assert_eq!(module_name("a/b"), "a/b");
        assert_eq!(relative(Path::new("/r"), Path::new("/r/a/b")), "a/b");
        assert_eq!(relative(Path::new("/r"), Path::new("/r")), "");
    }
}
