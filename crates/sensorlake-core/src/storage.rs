//! Data lake storage access.
//!
//! This module centralizes the storage contract the location resolver and the
//! series reader are written against: listing a directory, stating a file,
//! and reading file bytes, all addressed by `/`-separated lake paths. A local
//! filesystem backend is provided; the enum leaves room for remote backends
//! (ADLS, S3, ...) without rewriting the lookup and reader logic.
//!
//! Absence is a first-class condition here: callers routinely probe candidate
//! paths that do not exist, so a missing path is reported as the
//! distinguishable [`StorageError::NotFound`] rather than folded into a
//! generic I/O error.

use std::{
    error::Error,
    fmt, io,
    path::{Path, PathBuf},
};

use bytes::Bytes;
use snafu::{Backtrace, prelude::*};
use tokio::fs;

/// General result type used by storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors produced by the storage backend implementation.
///
/// Backend-specific I/O errors are wrapped in this enum so higher layers can
/// map them into [`StorageError`] variants with additional context.
#[derive(Debug)]
pub enum BackendError {
    /// A local filesystem I/O error.
    Local(io::Error),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::Local(e) => write!(f, "local I/O error: {e}"),
        }
    }
}

impl Error for BackendError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            BackendError::Local(e) => Some(e),
        }
    }
}

/// Errors that can occur during storage operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum StorageError {
    /// The specified path was not found.
    #[snafu(display("Path not found: {path}"))]
    NotFound {
        /// The lake path that was not found.
        path: String,
        /// Underlying backend error that caused the failure.
        source: BackendError,
        /// The backtrace at the time the error occurred.
        backtrace: Backtrace,
    },

    /// An I/O error occurred in the storage backend.
    #[snafu(display("Storage I/O error at {path}: {source}"))]
    OtherIo {
        /// The lake path where the I/O error occurred.
        path: String,
        /// Underlying backend I/O error with platform-specific details.
        source: BackendError,
        /// The backtrace at the time the error occurred.
        backtrace: Backtrace,
    },
}

impl StorageError {
    /// Whether this error represents expected absence rather than failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }
}

/// One entry returned by a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Lake path of the entry.
    pub path: String,
    /// Whether the entry is a directory.
    pub is_dir: bool,
    /// Size of the entry in bytes (0 for directories).
    pub size: u64,
}

/// Metadata for a single file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileInfo {
    /// Size of the file in bytes.
    pub size: u64,
}

/// A data lake storage backend.
///
/// Lake paths are `/`-separated strings relative to the storage root; the
/// [`DataLakeStorage::join`] and [`DataLakeStorage::split`] helpers keep that
/// convention in one place. The backend is shared read-only across lookup
/// workers; all operations take `&self`.
#[derive(Debug)]
pub enum DataLakeStorage {
    /// A lake rooted at a local filesystem directory.
    Local(PathBuf),
}

impl DataLakeStorage {
    /// Creates a storage backend rooted at a local filesystem path.
    pub fn local(root: impl Into<PathBuf>) -> Self {
        DataLakeStorage::Local(root.into())
    }

    /// Logical name of this storage, used as the asset-catalog key.
    pub fn name(&self) -> &str {
        match self {
            DataLakeStorage::Local(_) => "local",
        }
    }

    /// Join a base lake path with a relative component.
    pub fn join(&self, base: &str, rel: &str) -> String {
        let base = base.trim_end_matches('/');
        let rel = rel.trim_start_matches('/');
        if base.is_empty() {
            rel.to_string()
        } else if rel.is_empty() {
            base.to_string()
        } else {
            format!("{base}/{rel}")
        }
    }

    /// Split a lake path into its parent directory and file name.
    pub fn split<'a>(&self, path: &'a str) -> (&'a str, &'a str) {
        match path.trim_end_matches('/').rsplit_once('/') {
            Some((dir, name)) => (dir, name),
            None => ("", path),
        }
    }

    fn absolute(&self, path: &str) -> PathBuf {
        match self {
            DataLakeStorage::Local(root) => root.join(path.trim_start_matches('/')),
        }
    }

    /// List the entries of the directory at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] when the directory does not exist,
    /// [`StorageError::OtherIo`] for any other backend failure.
    pub async fn ls(&self, path: &str) -> StorageResult<Vec<FileEntry>> {
        let abs = self.absolute(path);
        let mut read_dir = match fs::read_dir(&abs).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(BackendError::Local(e)).context(NotFoundSnafu { path });
            }
            Err(e) => return Err(BackendError::Local(e)).context(OtherIoSnafu { path }),
        };

        let mut entries = Vec::new();
        loop {
            let entry = match read_dir.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => return Err(BackendError::Local(e)).context(OtherIoSnafu { path }),
            };
            let meta = match entry.metadata().await {
                Ok(meta) => meta,
                Err(e) => return Err(BackendError::Local(e)).context(OtherIoSnafu { path }),
            };
            let name = entry.file_name().to_string_lossy().into_owned();
            entries.push(FileEntry {
                path: self.join(path, &name),
                is_dir: meta.is_dir(),
                size: if meta.is_dir() { 0 } else { meta.len() },
            });
        }
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    /// Return metadata for the regular file at `path`.
    ///
    /// Non-regular entries (directories, symlinks to nowhere) are reported as
    /// [`StorageError::NotFound`]: for the callers of this API they are just
    /// as unusable as a missing file.
    pub async fn info(&self, path: &str) -> StorageResult<FileInfo> {
        let abs = self.absolute(path);
        let meta = match fs::metadata(&abs).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(BackendError::Local(e)).context(NotFoundSnafu { path });
            }
            Err(e) => return Err(BackendError::Local(e)).context(OtherIoSnafu { path }),
        };
        if !meta.is_file() {
            let synthetic = io::Error::other("not a regular file");
            return Err(BackendError::Local(synthetic)).context(NotFoundSnafu { path });
        }
        Ok(FileInfo { size: meta.len() })
    }

    /// Read the full contents of the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] when the file does not exist,
    /// [`StorageError::OtherIo`] for any other backend failure.
    pub async fn read(&self, path: &str) -> StorageResult<Bytes> {
        let abs = self.absolute(path);
        match fs::read(&abs).await {
            Ok(bytes) => Ok(Bytes::from(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(BackendError::Local(e)).context(NotFoundSnafu { path })
            }
            Err(e) => Err(BackendError::Local(e)).context(OtherIoSnafu { path }),
        }
    }
}

/// Write a fixture file under a local root, creating parent directories.
///
/// Test support shared by this crate's lookup and reader tests.
#[cfg(test)]
pub(crate) async fn write_fixture(root: &Path, rel: &str, contents: &[u8]) -> io::Result<()> {
    let abs = root.join(rel);
    if let Some(parent) = abs.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(&abs, contents).await
}
