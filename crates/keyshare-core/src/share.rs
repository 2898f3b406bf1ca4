// ABOUTME: Writes share-file exports into a private directory for handoff to other processes.
// ABOUTME: Files are written to a temp name and atomically renamed into place.

use crate::error::{ExportError, Result};
use crate::export::{sanitize_filename, NamedFile};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Scratch directory for share files, removed when dropped unless kept.
#[derive(Debug)]
pub struct ShareDir {
    dir: tempfile::TempDir,
}

impl ShareDir {
    /// Create a fresh share directory under the system temp dir.
    pub fn new() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("keyshare-")
            .tempdir()
            .map_err(|source| ExportError::WriteShareFile {
                path: std::env::temp_dir(),
                source,
            })?;
        Ok(Self { dir })
    }

    /// Create a share directory inside `parent`.
    pub fn new_in(parent: impl AsRef<Path>) -> Result<Self> {
        let parent = parent.as_ref();
        let dir = tempfile::Builder::new()
            .prefix("keyshare-")
            .tempdir_in(parent)
            .map_err(|source| ExportError::WriteShareFile {
                path: parent.to_path_buf(),
                source,
            })?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, file: &NamedFile) -> Result<PathBuf> {
        write_share_file(self.path(), file)
    }

    /// Stop cleaning up the directory and return its path.
    pub fn keep(self) -> PathBuf {
        self.dir.keep()
    }
}

/// Write `file` into `dir` under its suggested filename, replacing any
/// existing file of that name.
///
/// # Errors
/// Returns `WriteShareFile` on any I/O failure; nothing is left behind under
/// the final name when writing fails.
pub fn write_share_file(dir: &Path, file: &NamedFile) -> Result<PathBuf> {
    // NamedFile fields are public, so the name may not come from suggested_filename
    let filename = sanitize_filename(&file.filename).ok_or_else(|| ExportError::WriteShareFile {
        path: dir.join(&file.filename),
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "unusable filename"),
    })?;
    let target = dir.join(filename);
    let io_err = |source| ExportError::WriteShareFile {
        path: target.clone(),
        source,
    };

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(&file.contents).map_err(io_err)?;
    tmp.flush().map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(&target).map_err(|e| io_err(e.error))?;

    tracing::debug!(
        path = %target.display(),
        bytes = file.contents.len(),
        mime_type = file.mime_type,
        "wrote share file"
    );
    Ok(target)
}
