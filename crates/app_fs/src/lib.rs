//! PhotoCuller Backend Layer
//!
//! Everything that touches the disk lives behind this crate:
//! - PhotoBackend: the operations the metadata engine consumes
//! - LocalBackend: real filesystem implementation (scan, sidecars, EXIF, rename)
//! - MemoryBackend: in-process implementation for tests and dry runs
//! - Filename validation for renames

mod backend;
mod exif_data;
mod local;
mod memory;
mod sanitize;
mod scan;
mod sidecar;

pub use backend::{file_url, PhotoBackend};
pub use exif_data::read_exif;
pub use local::LocalBackend;
pub use memory::MemoryBackend;
pub use sanitize::{is_valid_filename, validate_new_name};
pub use scan::{is_supported_photo, list_subfolders, scan_folder, SUPPORTED_EXTENSIONS};
pub use sidecar::{atomic_write, read_folder_meta, sidecar_path, write_folder_meta, SIDECAR_NAME};

use directories::ProjectDirs;
use std::path::PathBuf;
use thiserror::Error;

/// Backend errors
#[derive(Error, Debug)]
pub enum FsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Path not found: {0}")]
    NotFound(String),

    #[error("File already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid file name: {0}")]
    InvalidName(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, FsError>;

/// Get the application data directory (holds data.json)
pub fn data_dir() -> PathBuf {
    ProjectDirs::from("com", "PhotoCuller", "PhotoCuller")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("./data"))
}
