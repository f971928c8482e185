//! Output directory verification.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Number of names shown in a listing preview.
pub const PREVIEW_LEN: usize = 10;

/// Why an output directory is not deployable.
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("Output directory does not exist: {0}")]
    Missing(PathBuf),

    #[error("Output path exists but is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Output directory is empty: {0}")]
    Empty(PathBuf),

    #[error("Failed to read output directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Top-level contents of a verified output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputListing {
    /// Entry names in `read_dir` order
    pub names: Vec<String>,
}

impl OutputListing {
    /// Number of top-level entries.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Always false for a listing returned by [`inspect_output`].
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// First [`PREVIEW_LEN`] names joined by `, `, with `...` when truncated.
    pub fn preview(&self) -> String {
        let shown = &self.names[..self.names.len().min(PREVIEW_LEN)];
        let mut preview = shown.join(", ");
        if self.names.len() > PREVIEW_LEN {
            preview.push_str("...");
        }
        preview
    }
}

impl fmt::Display for OutputListing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} entries: {}", self.len(), self.preview())
    }
}

/// Check that `output_dir` exists, is a directory, and has at least one entry.
///
/// Read-only; safe to call any number of times.
pub fn inspect_output(output_dir: &Path) -> Result<OutputListing, VerifyError> {
    let metadata = match fs::metadata(output_dir) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(VerifyError::Missing(output_dir.to_path_buf()));
        }
        Err(source) => {
            return Err(VerifyError::Io {
                path: output_dir.to_path_buf(),
                source,
            });
        }
    };

    if !metadata.is_dir() {
        return Err(VerifyError::NotADirectory(output_dir.to_path_buf()));
    }

    let io_err = |source| VerifyError::Io {
        path: output_dir.to_path_buf(),
        source,
    };

    let mut names = Vec::new();
    for entry in fs::read_dir(output_dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        names.push(entry.file_name().to_string_lossy().into_owned());
    }

    if names.is_empty() {
        return Err(VerifyError::Empty(output_dir.to_path_buf()));
    }

    Ok(OutputListing { names })
}
