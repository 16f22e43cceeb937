//! Per-folder sidecar metadata and atomic JSON writes

use crate::{FsError, Result};
use ipc_proto::FolderMeta;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Sidecar file name inside every folder that has annotations
pub const SIDECAR_NAME: &str = ".photo_meta.json";

/// Location of a folder's sidecar
pub fn sidecar_path(folder: &Path) -> PathBuf {
    folder.join(SIDECAR_NAME)
}

/// Write via a temporary sibling and rename, so readers never see a torn file
pub fn atomic_write(path: &Path, content: &str) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, content)?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

pub(crate) fn read_json<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Ok(T::default());
    }
    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(value)?;
    atomic_write(path, &json)
}

/// Read a folder's sidecar; a missing sidecar is an empty one
pub fn read_folder_meta(folder: &Path) -> Result<FolderMeta> {
    read_json(&sidecar_path(folder))
}

/// Read a folder's sidecar for scanning; a corrupt sidecar loads as empty
pub(crate) fn read_folder_meta_lenient(folder: &Path) -> FolderMeta {
    match read_folder_meta(folder) {
        Ok(meta) => meta,
        Err(e) => {
            tracing::warn!("Ignoring unreadable sidecar in {}: {}", folder.display(), e);
            FolderMeta::default()
        }
    }
}

/// Replace a folder's sidecar
pub fn write_folder_meta(folder: &Path, meta: &FolderMeta) -> Result<()> {
    if !folder.is_dir() {
        return Err(FsError::NotFound(folder.display().to_string()));
    }
    write_json(&sidecar_path(folder), meta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ipc_proto::{Label, PhotoMeta};
    use tempfile::TempDir;

    #[test]
    fn test_missing_sidecar_is_empty() {
        let dir = TempDir::new().unwrap();
        let meta = read_folder_meta(dir.path()).unwrap();
        assert!(meta.photos.is_empty());
    }

    #[test]
    fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let mut meta = FolderMeta::default();
        meta.photos.insert(
            "IMG_1.jpg".into(),
            PhotoMeta {
                rating: 5,
                label: Label::Red,
                flagged: true,
                rejected: false,
            },
        );

        write_folder_meta(dir.path(), &meta).unwrap();

        assert!(sidecar_path(dir.path()).exists());
        assert!(!dir.path().join(".photo_meta.json.tmp").exists());
        assert_eq!(read_folder_meta(dir.path()).unwrap(), meta);
    }

    #[test]
    fn test_corrupt_sidecar_lenient() {
        let dir = TempDir::new().unwrap();
        fs::write(sidecar_path(dir.path()), "{not json").unwrap();

        assert!(read_folder_meta(dir.path()).is_err());
        assert!(read_folder_meta_lenient(dir.path()).photos.is_empty());
    }

    #[test]
    fn test_write_to_missing_folder_fails() {
        let dir = TempDir::new().unwrap();
        let gone = dir.path().join("gone");
        assert!(matches!(
            write_folder_meta(&gone, &FolderMeta::default()),
            Err(FsError::NotFound(_))
        ));
    }
}
