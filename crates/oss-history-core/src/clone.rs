//! Disposable clones that host history rewrites.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::domain::error::{CheckError, Result};
use crate::git::Git;

/// Create a fresh clone of `source` at `dest`.
///
/// An existing `dest` is an error unless `overwrite` is set, in which case it
/// is removed first. The clone is never reused or merged into, and is left on
/// disk afterwards for inspection.
pub fn prepare_clone(git: &Git, source: &Path, dest: &Path, overwrite: bool) -> Result<PathBuf> {
    if dest.exists() || dest.is_symlink() {
        if !overwrite {
            return Err(CheckError::ClonePathConflict {
                path: dest.to_path_buf(),
            });
        }
        warn!("removing stale clone {}", dest.display());
        if dest.is_dir() && !dest.is_symlink() {
            std::fs::remove_dir_all(dest)?;
        } else {
            std::fs::remove_file(dest)?;
        }
    }

    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }

    info!("cloning {} into {}", source.display(), dest.display());
    git.clone_local(source, dest)?;
    Ok(dest.to_path_buf())
}
