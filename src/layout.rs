//! Output directory layout
//!
//! Every artifact path is derived from a channel descriptor:
//! - `<root>/<descriptor>.desktop` - launcher file
//! - `<root>/icon-<descriptor>.png` - icon

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Extension of launcher files
pub const LAUNCHER_EXTENSION: &str = "desktop";

/// Working directory receiving generated artifacts
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    /// Layout rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Launcher file path for `descriptor`
    #[must_use]
    pub fn launcher_path(&self, descriptor: &str) -> PathBuf {
        self.root.join(format!("{}.{}", descriptor, LAUNCHER_EXTENSION))
    }

    /// Icon file path for `descriptor`
    #[must_use]
    pub fn icon_path(&self, descriptor: &str) -> PathBuf {
        self.root.join(format!("icon-{}.png", descriptor))
    }

    /// Create the root directory (and parents) if missing
    pub async fn ensure_root(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| Error::file_write(&self.root, e))
    }
}

/// Sibling path used while an artifact is still being written
#[must_use]
pub fn partial_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    path.with_file_name(name)
}
