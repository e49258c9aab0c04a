//! Per-run scratch directory.
//!
//! Every intermediate artifact of a run lives under one directory that is
//! removed when the run ends, whatever the outcome.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// A uniquely named working directory owned by one pipeline run.
///
/// The directory name combines the title, the process id and a random
/// suffix so concurrent runs never collide. Dropping the value without
/// calling [`ScratchSpace::remove`] still attempts removal.
#[derive(Debug)]
pub struct ScratchSpace {
    path: PathBuf,
    removed: bool,
}

impl ScratchSpace {
    /// Create `<base>/<title>_temp_<pid>_<suffix>`.
    pub fn create(base: &Path, title: &str) -> io::Result<Self> {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let name = format!("{}_temp_{}_{}", title, std::process::id(), &suffix[..8]);
        let path = base.join(name);

        fs::create_dir_all(&path)?;
        tracing::debug!("Created scratch directory {}", path.display());

        Ok(Self {
            path,
            removed: false,
        })
    }

    /// Root of the scratch directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of an entry inside the scratch directory (not created).
    pub fn join(&self, name: impl AsRef<Path>) -> PathBuf {
        self.path.join(name)
    }

    /// Create (if needed) and return a subdirectory.
    pub fn subdir(&self, name: &str) -> io::Result<PathBuf> {
        let dir = self.path.join(name);
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Remove the whole tree. A directory that is already gone is not an error.
    pub fn remove(mut self) -> io::Result<()> {
        self.removed = true;
        remove_tree(&self.path)
    }
}

impl Drop for ScratchSpace {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        if let Err(e) = remove_tree(&self.path) {
            tracing::warn!(
                "Could not remove scratch directory {}: {}",
                self.path.display(),
                e
            );
        }
    }
}

fn remove_tree(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => {
            tracing::debug!("Removed scratch directory {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
