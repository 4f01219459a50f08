use std::fmt;
use std::path::{Path, PathBuf};

use conferencia_recon::ReconError;

#[derive(Debug)]
pub enum IoError {
    /// File could not be read.
    Read { path: PathBuf, source: std::io::Error },
    /// File could not be written or replaced.
    Write { path: PathBuf, message: String },
    /// CSV writer failure.
    Csv(String),
    /// XLSX writer failure.
    Xlsx(String),
    /// Domain error while building the export or document.
    Recon(ReconError),
}

impl IoError {
    pub(crate) fn write(path: &Path, message: impl fmt::Display) -> Self {
        Self::Write {
            path: path.to_path_buf(),
            message: message.to_string(),
        }
    }
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read { path, source } => write!(f, "cannot read {}: {source}", path.display()),
            Self::Write { path, message } => write!(f, "cannot write {}: {message}", path.display()),
            Self::Csv(msg) => write!(f, "CSV write error: {msg}"),
            Self::Xlsx(msg) => write!(f, "XLSX write error: {msg}"),
            Self::Recon(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for IoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Recon(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ReconError> for IoError {
    fn from(e: ReconError) -> Self {
        Self::Recon(e)
    }
}
