//! Filesystem-backed implementation of PhotoBackend

use crate::sanitize::validate_new_name;
use crate::sidecar::{read_folder_meta, read_json, sidecar_path, write_folder_meta, write_json};
use crate::{scan, FsError, PhotoBackend, Result};
use ipc_proto::{AppData, ExifRecord, FolderMeta, FolderNode, ScanResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Backend that reads and writes the real filesystem
pub struct LocalBackend {
    data_file: PathBuf,
}

impl LocalBackend {
    /// Backend storing data.json in the platform data directory
    pub fn new() -> Self {
        Self::with_data_dir(crate::data_dir())
    }

    /// Backend storing data.json in a specific directory
    pub fn with_data_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            data_file: dir.into().join("data.json"),
        }
    }

    pub fn data_file(&self) -> &Path {
        &self.data_file
    }
}

impl Default for LocalBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl PhotoBackend for LocalBackend {
    fn scan_folder(&self, folder: &Path) -> Result<ScanResult> {
        scan::scan_folder(folder)
    }

    fn list_subfolders(&self, folder: &Path) -> Result<Vec<FolderNode>> {
        scan::list_subfolders(folder)
    }

    fn load_folder_meta(&self, folder: &Path) -> Result<FolderMeta> {
        read_folder_meta(folder)
    }

    fn save_folder_meta(&self, folder: &Path, meta: &FolderMeta) -> Result<()> {
        write_folder_meta(folder, meta)?;
        tracing::debug!("Saved {} entries to {}", meta.photos.len(), sidecar_path(folder).display());
        Ok(())
    }

    fn load_data(&self) -> Result<AppData> {
        read_json(&self.data_file)
    }

    fn save_data(&self, data: &AppData) -> Result<()> {
        write_json(&self.data_file, data)
    }

    fn get_exif_data(&self, path: &Path) -> Result<ExifRecord> {
        crate::read_exif(path)
    }

    fn rename_photo(&self, folder: &Path, old_name: &str, new_name: &str) -> Result<()> {
        validate_new_name(new_name)?;

        let old_path = folder.join(old_name);
        let new_path = folder.join(new_name);
        if !old_path.exists() {
            return Err(FsError::NotFound(old_path.display().to_string()));
        }
        if new_path.exists() {
            return Err(FsError::AlreadyExists(new_path.display().to_string()));
        }

        // Read the sidecar up front so an unreadable one aborts before the move
        let mut moved_meta = None;
        if sidecar_path(folder).exists() {
            let mut meta = read_folder_meta(folder)?;
            if let Some(entry) = meta.photos.remove(old_name) {
                meta.photos.insert(new_name.to_string(), entry);
                moved_meta = Some(meta);
            }
        }

        fs::rename(&old_path, &new_path)?;

        if let Some(meta) = moved_meta {
            if let Err(e) = write_folder_meta(folder, &meta) {
                tracing::warn!("Sidecar update failed, undoing rename of {}: {}", old_name, e);
                fs::rename(&new_path, &old_path)?;
                return Err(e);
            }
        }

        tracing::info!("Renamed {} -> {} in {}", old_name, new_name, folder.display());
        Ok(())
    }

    #[cfg(feature = "open-external")]
    fn reveal_in_file_manager(&self, path: &Path) -> Result<()> {
        open::that_detached(path)?;
        Ok(())
    }

    #[cfg(not(feature = "open-external"))]
    fn reveal_in_file_manager(&self, path: &Path) -> Result<()> {
        Err(FsError::Unavailable(format!(
            "Cannot reveal {}: built without open-external",
            path.display()
        )))
    }
}
