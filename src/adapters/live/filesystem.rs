//! `std::fs` implementation of the filesystem port.

use std::fs;
use std::path::Path;

use crate::ports::{FileSystem, PortError};

/// Filesystem adapter over the real disk.
pub struct LiveFileSystem;

impl FileSystem for LiveFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String, PortError> {
        Ok(fs::read_to_string(path)?)
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>, PortError> {
        Ok(fs::read(path)?)
    }

    fn write(&self, path: &Path, contents: &str) -> Result<(), PortError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)?;
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn remove_dir_all(&self, path: &Path) -> Result<(), PortError> {
        fs::remove_dir_all(path)?;
        Ok(())
    }
}
