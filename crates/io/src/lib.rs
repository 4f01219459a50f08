// File I/O: registry persistence, CSV, XLSX and text exports

pub mod csv;
pub mod error;
pub mod store;
pub mod text;
pub mod xlsx;

use std::path::{Path, PathBuf};

pub use error::IoError;
pub use store::RouteStore;

/// Where an export lands: `output` itself when it names a file, inside it
/// when it is an existing directory, else `default_name` in the working
/// directory.
pub fn output_path(output: Option<&Path>, default_name: &str) -> PathBuf {
    match output {
        Some(dir) if dir.is_dir() => dir.join(default_name),
        Some(file) => file.to_path_buf(),
        None => PathBuf::from(default_name),
    }
}
