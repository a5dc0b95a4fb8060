//! Filesystem port for project state and file contents.

use std::path::Path;

use super::PortError;

/// Disk access used by persistence, configuration and annotation.
///
/// The selector walks the real tree directly; everything that reads or writes
/// project state goes through this trait so tests can run in memory.
pub trait FileSystem: Send + Sync {
    /// Reads a UTF-8 file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, unreadable or not UTF-8.
    fn read_to_string(&self, path: &Path) -> Result<String, PortError>;

    /// Reads a file's raw bytes, whatever their encoding.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or unreadable.
    fn read(&self, path: &Path) -> Result<Vec<u8>, PortError>;

    /// Replaces a file's contents, creating missing parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory or the file cannot be written.
    fn write(&self, path: &Path, contents: &str) -> Result<(), PortError>;

    /// Whether anything exists at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Whether `path` is an existing directory.
    fn is_dir(&self, path: &Path) -> bool;

    /// Deletes a directory tree.
    ///
    /// # Errors
    ///
    /// Returns an error if the tree cannot be removed.
    fn remove_dir_all(&self, path: &Path) -> Result<(), PortError>;
}
