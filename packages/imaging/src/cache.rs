//! Derivative Cache.
//!
//! Derivatives live next to their sources as `<hash>_<size>.<ext>`. The
//! filesystem is the index: a derivative exists iff its file exists.
//!
//! Writes go to a staging file in the same directory and are committed with
//! a no-clobber rename, so a reader never observes a partially written
//! derivative and a concurrent writer of the same key cannot overwrite a
//! finished one.

use std::io;
use std::path::{Path, PathBuf};

use photoline::{AssetKind, SizeClass};
use tempfile::TempPath;

use crate::engine::scratch_file;
use crate::error::TransformError;

/// Identifies one derivative: a source id plus a size class.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DerivativeKey {
    pub hash: String,
    pub size: SizeClass,
}

impl DerivativeKey {
    pub fn new(hash: impl Into<String>, size: SizeClass) -> Self {
        Self {
            hash: hash.into(),
            size,
        }
    }
}

/// Result of committing a staged derivative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The staged file became the derivative.
    Created,
    /// Another writer got there first; the staged file was discarded.
    AlreadyPresent,
}

/// Create-if-absent store of derivatives for one asset directory.
#[derive(Debug, Clone)]
pub struct DerivativeCache {
    dir: PathBuf,
    kind: AssetKind,
}

impl DerivativeCache {
    pub fn new(dir: impl Into<PathBuf>, kind: AssetKind) -> Self {
        Self {
            dir: dir.into(),
            kind,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn kind(&self) -> AssetKind {
        self.kind
    }

    /// Path of the source file for `hash`.
    pub fn source_path(&self, hash: &str) -> PathBuf {
        self.dir.join(format!("{hash}.{}", self.kind.extension()))
    }

    /// Final on-disk location of `key`.
    pub fn path_for(&self, key: &DerivativeKey) -> PathBuf {
        self.dir.join(format!(
            "{}_{}.{}",
            key.hash,
            key.size.suffix(),
            self.kind.extension()
        ))
    }

    pub async fn contains(&self, key: &DerivativeKey) -> Result<bool, TransformError> {
        Ok(tokio::fs::try_exists(self.path_for(key)).await?)
    }

    /// A fresh staging file in the cache directory. Staging names start
    /// with a dot and never match a source or derivative name.
    pub fn staging_path(&self) -> Result<TempPath, TransformError> {
        scratch_file(&self.dir, self.kind.extension())
    }

    /// Atomically move `staged` into place as `key`. If the derivative
    /// already exists it is left untouched and `staged` is removed.
    pub fn commit(
        &self,
        staged: TempPath,
        key: &DerivativeKey,
    ) -> Result<CommitOutcome, TransformError> {
        let dest = self.path_for(key);
        match staged.persist_noclobber(&dest) {
            Ok(()) => Ok(CommitOutcome::Created),
            // The returned TempPath is dropped here, unlinking the staged file.
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
                Ok(CommitOutcome::AlreadyPresent)
            }
            Err(e) => Err(TransformError::Io(e.error)),
        }
    }
}
