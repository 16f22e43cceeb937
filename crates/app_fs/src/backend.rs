//! Backend operations consumed by the metadata engine

use crate::Result;
use ipc_proto::{AppData, ExifRecord, FolderMeta, FolderNode, ScanResult};
use std::path::Path;

/// Operations the engine consumes from the backend.
///
/// Formats are owned by the backend; the engine only sees the protocol types.
/// Every call is synchronous from the backend's point of view; callers that
/// must not block run them on a blocking pool.
pub trait PhotoBackend: Send + Sync {
    /// Scan one folder (non-recursive) with sidecar metadata merged inline
    fn scan_folder(&self, folder: &Path) -> Result<ScanResult>;

    /// List the visible subfolders of a folder
    fn list_subfolders(&self, folder: &Path) -> Result<Vec<FolderNode>>;

    /// Read the folder's sidecar (empty when absent)
    fn load_folder_meta(&self, folder: &Path) -> Result<FolderMeta>;

    /// Replace the folder's sidecar with a full snapshot
    fn save_folder_meta(&self, folder: &Path, meta: &FolderMeta) -> Result<()>;

    /// Read the global workspace/album document (default when absent)
    fn load_data(&self) -> Result<AppData>;

    /// Replace the global workspace/album document with a full snapshot
    fn save_data(&self, data: &AppData) -> Result<()>;

    /// Read EXIF; a file without EXIF yields an empty record, not an error
    fn get_exif_data(&self, path: &Path) -> Result<ExifRecord>;

    /// Rename a photo on disk and move its sidecar entry to the new name
    fn rename_photo(&self, folder: &Path, old_name: &str, new_name: &str) -> Result<()>;

    /// Show a file or folder in the system file manager
    fn reveal_in_file_manager(&self, path: &Path) -> Result<()>;

    /// Map an absolute path to a URL a renderer can load
    fn to_image_url(&self, path: &Path) -> String {
        file_url(path)
    }
}

/// `file://` URL for an absolute path; relative paths are returned unchanged
pub fn file_url(path: &Path) -> String {
    url::Url::from_file_path(path)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| path.to_string_lossy().into_owned())
}
