//! Temp-dir workspaces for tests that touch the filesystem.
//!
//! A [`TestWorkspace`] owns a temporary directory holding an input program
//! and, optionally, an `mmpost.toml`. The directory is deleted when the value
//! is dropped, even on panic.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Default config file name looked up by the CLI.
pub const CONFIG_FILE: &str = "mmpost.toml";

/// A test-scoped directory with an input program and config file.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write `content` to `name` inside the workspace and return its path.
    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path().join(name);
        fs::write(&path, content).expect("failed to write test file");
        path
    }

    /// Write the config file.
    pub fn write_config(&self, toml_content: &str) -> PathBuf {
        self.write(CONFIG_FILE, toml_content)
    }

    /// Read a file back, or `None` if it does not exist.
    pub fn read(&self, name: &str) -> Option<String> {
        fs::read_to_string(self.path().join(name)).ok()
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path().join(name).exists()
    }
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}
