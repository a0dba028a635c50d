//! Scoped backup of a file that is about to be replaced in place.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, error, warn};

use crate::error::Result;

/// A copy of an original file, held while the original is being rewritten.
///
/// Dropping the guard without calling [`commit`](Self::commit) copies the
/// backup back over the original. The backup copy itself is always left in
/// place.
#[derive(Debug)]
pub struct BackupGuard {
    original: PathBuf,
    backup: PathBuf,
    armed: bool,
}

impl BackupGuard {
    /// Copy `original` into `backup_dir`, keeping its file name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`](crate::Error::Io) if `original` has no file name
    /// or the copy fails. The original is untouched in either case.
    pub fn create(original: &Path, backup_dir: &Path) -> Result<Self> {
        let name = original.file_name().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{} has no file name", original.display()),
            )
        })?;
        let backup = backup_dir.join(name);

        fs::copy(original, &backup)?;
        debug!("backed up {} to {}", original.display(), backup.display());

        Ok(Self {
            original: original.to_path_buf(),
            backup,
            armed: true,
        })
    }

    /// Where the backup copy lives.
    #[must_use]
    pub fn backup_path(&self) -> &Path {
        &self.backup
    }

    /// The replacement succeeded; keep the new file.
    pub fn commit(mut self) {
        self.armed = false;
    }

    /// Copy the backup over the original now, reporting any failure.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`](crate::Error::Io) if the copy fails.
    pub fn restore(mut self) -> Result<()> {
        self.armed = false;
        self.copy_back()
    }

    fn copy_back(&self) -> Result<()> {
        fs::copy(&self.backup, &self.original)?;
        warn!("restored original {}", self.original.display());
        Ok(())
    }
}

impl Drop for BackupGuard {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = self.copy_back() {
                error!("failed to restore {}: {e}", self.original.display());
            }
        }
    }
}
