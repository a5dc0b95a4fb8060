//! Module tree data model.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Name of the root module.
pub const ROOT_MODULE: &str = ".";

/// One tracked file in a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileRef {
    /// Path relative to the project root, `/`-separated.
    pub name: String,
    /// File modification time.
    pub last_modified: DateTime<Utc>,
    /// Estimated token count of the file content.
    pub token_count: u64,
    /// Hex SHA-256 of the file content.
    pub content_hash: String,
}

/// Summaries attached to a module.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Annotation {
    /// Where the module sits in the hierarchy, seen from inside it.
    #[serde(default)]
    pub external_context: String,
    /// What the module's own files do, excluding sub-modules.
    #[serde(default)]
    pub internal_context: String,
    /// Self-contained synopsis of the module and everything beneath it.
    #[serde(default)]
    pub public_context: String,
}

impl Annotation {
    /// Whether the internal or public summary has been produced.
    #[must_use]
    pub fn has_summary(&self) -> bool {
        !self.internal_context.is_empty() || !self.public_context.is_empty()
    }

    /// Whether the external context has been produced.
    #[must_use]
    pub fn has_external(&self) -> bool {
        !self.external_context.is_empty()
    }
}

/// A logical grouping of files and sub-modules, summarized as one unit.
///
/// `parent`, `directories` and `local_token_count` are derived and not
/// persisted; [`Module::rehydrate`] recomputes them after loading.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Module {
    /// Path of the module relative to the root (`"."` for the root).
    pub name: String,
    /// Name of the parent module; `None` for the root.
    #[serde(skip)]
    pub parent: Option<String>,
    /// Owned sub-modules, sorted by name.
    #[serde(default)]
    pub modules: Vec<Module>,
    /// Files owned directly by this module, sorted by name.
    #[serde(default)]
    pub files: Vec<FileRef>,
    /// Raw directories holding this module's own files.
    #[serde(skip)]
    pub directories: Vec<String>,
    /// Summaries, absent until annotated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<Annotation>,
    /// Tokens of the module's own files.
    #[serde(skip)]
    pub local_token_count: u64,
    /// Tokens of the module and all descendants.
    pub token_count: u64,
    /// Order-independent digest of direct children.
    pub content_hash: String,
}

impl Module {
    /// Creates an empty module.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            modules: Vec::new(),
            files: Vec::new(),
            directories: Vec::new(),
            annotation: None,
            local_token_count: 0,
            token_count: 0,
            content_hash: String::new(),
        }
    }

    /// Whether this is the root module.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.name == ROOT_MODULE
    }

    /// Public context, or `""` when not annotated.
    #[must_use]
    pub fn public_context(&self) -> &str {
        self.annotation.as_ref().map_or("", |a| a.public_context.as_str())
    }

    /// Whether this module's internal/public summary is present.
    #[must_use]
    pub fn has_summary(&self) -> bool {
        self.annotation.as_ref().is_some_and(Annotation::has_summary)
    }

    /// Recomputes derived and aggregate fields bottom-up: parent links,
    /// directories, local and total token counts, and content hashes.
    pub fn finalize(&mut self) {
        self.finalize_under(None);
    }

    fn finalize_under(&mut self, parent: Option<&str>) {
        self.parent = parent.map(str::to_string);
        self.modules.sort_by(|a, b| a.name.cmp(&b.name));
        self.files.sort_by(|a, b| a.name.cmp(&b.name));

        let name = self.name.clone();
        for child in &mut self.modules {
            child.finalize_under(Some(&name));
        }

        self.refresh_local();
        self.token_count = self.local_token_count
            + self.modules.iter().map(|m| m.token_count).sum::<u64>();
        self.content_hash = digest_children(
            self.modules
                .iter()
                .map(|m| m.content_hash.as_str())
                .chain(self.files.iter().map(|f| f.content_hash.as_str())),
        );
    }

    /// Restores non-persisted fields after deserialization, keeping the stored
    /// totals and hashes untouched.
    pub fn rehydrate(&mut self) {
        self.rehydrate_under(None);
    }

    fn rehydrate_under(&mut self, parent: Option<&str>) {
        self.parent = parent.map(str::to_string);
        let name = self.name.clone();
        for child in &mut self.modules {
            child.rehydrate_under(Some(&name));
        }
        self.refresh_local();
    }

    fn refresh_local(&mut self) {
        self.local_token_count = self.files.iter().map(|f| f.token_count).sum();
        let dirs: BTreeSet<String> = self.files.iter().map(|f| parent_dir(&f.name)).collect();
        self.directories = dirs.into_iter().collect();
    }

    /// Deepest module whose name equals or is a path-prefix of `rel_path`.
    #[must_use]
    pub fn find_module(&self, rel_path: &str) -> Option<&Module> {
        if !owns(&self.name, rel_path) {
            return None;
        }
        self.modules.iter().find_map(|child| child.find_module(rel_path)).or(Some(self))
    }

    /// Mutable variant of [`Module::find_module`].
    pub fn find_module_mut(&mut self, rel_path: &str) -> Option<&mut Module> {
        if !owns(&self.name, rel_path) {
            return None;
        }
        match self.modules.iter().position(|child| owns(&child.name, rel_path)) {
            Some(idx) => self.modules[idx].find_module_mut(rel_path),
            None => Some(self),
        }
    }

    /// Module with exactly this name.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<&Module> {
        self.find_module(name).filter(|m| m.name == name)
    }

    /// Mutable module with exactly this name.
    pub fn find_by_name_mut(&mut self, name: &str) -> Option<&mut Module> {
        self.find_module_mut(name).filter(|m| m.name == name)
    }

    /// Pre-order list of this module and all descendants.
    #[must_use]
    pub fn descendants(&self) -> Vec<&Module> {
        let mut out = vec![self];
        for child in &self.modules {
            out.extend(child.descendants());
        }
        out
    }

    /// Names of this module and all descendants.
    #[must_use]
    pub fn names(&self) -> BTreeSet<String> {
        self.descendants().into_iter().map(|m| m.name.clone()).collect()
    }
}

/// Whether a module called `name` covers `rel_path`.
#[must_use]
pub fn owns(name: &str, rel_path: &str) -> bool {
    name == ROOT_MODULE
        || rel_path == name
        || (rel_path.len() > name.len()
            && rel_path.starts_with(name)
            && rel_path.as_bytes()[name.len()] == b'/')
}

/// Directory part of a relative file path (`"."` for top-level files).
#[must_use]
pub fn parent_dir(path: &str) -> String {
    path.rsplit_once('/').map_or_else(|| ROOT_MODULE.to_string(), |(dir, _)| dir.to_string())
}

/// Hex SHA-256 over the sorted concatenation of child hashes.
pub fn digest_children<'a>(hashes: impl IntoIterator<Item = &'a str>) -> String {
    let mut sorted: Vec<&str> = hashes.into_iter().collect();
    sorted.sort_unstable();
    let mut hasher = Sha256::new();
    for hash in sorted {
        hasher.update(hash.as_bytes());
    }
    hex(&hasher.finalize())
}

/// Lowercase hex encoding.
pub(crate) fn hex(bytes: &[u8]) -> String {
    use std::fmt::Write;

    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}
