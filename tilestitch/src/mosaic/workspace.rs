//! Scoped scratch directory for block and merge artifacts.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tempfile::TempDir;
use tracing::{debug, warn};

/// Temporary directory owned by one compose run.
///
/// The directory and everything in it is removed when the workspace is
/// dropped, whether the run succeeded, failed, or panicked.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
    counter: AtomicU64,
}

impl Workspace {
    /// Creates a workspace below `parent`, or the system temp dir.
    pub fn create(parent: Option<&Path>) -> std::io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(".tilestitch-work-");
        let dir = match parent {
            Some(parent) => {
                std::fs::create_dir_all(parent)?;
                builder.tempdir_in(parent)?
            }
            None => builder.tempdir()?,
        };
        debug!(path = %dir.path().display(), "Workspace created");
        Ok(Self {
            dir,
            counter: AtomicU64::new(0),
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Returns a fresh, unique file path inside the workspace.
    pub fn artifact_path(&self, label: &str) -> PathBuf {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        self.dir.path().join(format!("{}-{:06}.rgba", label, n))
    }

    /// Removes the workspace now, reporting any error.
    pub fn close(self) -> std::io::Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir.close().inspect_err(|e| {
            warn!(path = %path.display(), error = %e, "Failed to remove workspace");
        })?;
        debug!(path = %path.display(), "Workspace removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_are_unique_and_inside() {
        let workspace = Workspace::create(None).unwrap();
        let a = workspace.artifact_path("block");
        let b = workspace.artifact_path("block");

        assert_ne!(a, b);
        assert!(a.starts_with(workspace.path()));
    }

    #[test]
    fn test_drop_removes_directory() {
        let parent = tempfile::TempDir::new().unwrap();
        let path = {
            let workspace = Workspace::create(Some(parent.path())).unwrap();
            std::fs::write(workspace.artifact_path("x"), b"data").unwrap();
            workspace.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_close_removes_directory() {
        let workspace = Workspace::create(None).unwrap();
        let path = workspace.path().to_path_buf();
        workspace.close().unwrap();
        assert!(!path.exists());
    }
}
