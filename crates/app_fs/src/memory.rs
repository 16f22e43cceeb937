//! In-process backend for tests and dry runs

use crate::sanitize::validate_new_name;
use crate::{FsError, PhotoBackend, Result};
use ipc_proto::{AppData, ExifRecord, FolderMeta, FolderNode, ScanResult, ScannedPhoto};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

#[derive(Debug, Clone)]
struct MemFile {
    filename: String,
    size: u64,
    modified: u64,
}

#[derive(Default)]
struct MemoryState {
    /// Folder path -> files in scan order
    folders: BTreeMap<String, Vec<MemFile>>,
    sidecars: HashMap<String, FolderMeta>,
    data: AppData,
    exif: HashMap<String, ExifRecord>,
    revealed: Vec<String>,
    fail_writes: bool,
    fail_scans: bool,
    folder_meta_writes: usize,
    data_writes: usize,
}

/// Backend holding folders, sidecars and app data in memory.
///
/// Scans return files in the order they were added.
#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
}

fn key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing app document
    pub fn with_data(data: AppData) -> Self {
        let backend = Self::new();
        backend.state.lock().data = data;
        backend
    }

    /// Register an empty folder
    pub fn add_folder(&self, folder: impl AsRef<Path>) {
        self.state
            .lock()
            .folders
            .entry(key(folder.as_ref()))
            .or_default();
    }

    /// Add a photo to a folder, creating the folder if needed
    pub fn add_photo(&self, folder: impl AsRef<Path>, filename: &str, modified: u64) {
        let mut state = self.state.lock();
        let files = state.folders.entry(key(folder.as_ref())).or_default();
        files.retain(|f| f.filename != filename);
        files.push(MemFile {
            filename: filename.to_string(),
            size: filename.len() as u64 * 1024,
            modified,
        });
    }

    /// Seed a folder's sidecar
    pub fn set_folder_meta(&self, folder: impl AsRef<Path>, meta: FolderMeta) {
        self.state.lock().sidecars.insert(key(folder.as_ref()), meta);
    }

    pub fn set_exif(&self, path: impl AsRef<Path>, record: ExifRecord) {
        self.state.lock().exif.insert(key(path.as_ref()), record);
    }

    /// Make every save fail until turned off
    pub fn set_fail_writes(&self, fail: bool) {
        self.state.lock().fail_writes = fail;
    }

    /// Make every scan fail until turned off
    pub fn set_fail_scans(&self, fail: bool) {
        self.state.lock().fail_scans = fail;
    }

    /// Last sidecar written (or seeded) for a folder
    pub fn folder_meta(&self, folder: impl AsRef<Path>) -> Option<FolderMeta> {
        self.state.lock().sidecars.get(&key(folder.as_ref())).cloned()
    }

    /// Last app document written (or seeded)
    pub fn saved_data(&self) -> AppData {
        self.state.lock().data.clone()
    }

    /// Filenames currently in a folder, in scan order
    pub fn filenames(&self, folder: impl AsRef<Path>) -> Vec<String> {
        self.state
            .lock()
            .folders
            .get(&key(folder.as_ref()))
            .map(|files| files.iter().map(|f| f.filename.clone()).collect())
            .unwrap_or_default()
    }

    pub fn folder_meta_writes(&self) -> usize {
        self.state.lock().folder_meta_writes
    }

    pub fn data_writes(&self) -> usize {
        self.state.lock().data_writes
    }

    /// Paths passed to reveal_in_file_manager
    pub fn revealed(&self) -> Vec<String> {
        self.state.lock().revealed.clone()
    }
}

impl PhotoBackend for MemoryBackend {
    fn scan_folder(&self, folder: &Path) -> Result<ScanResult> {
        let state = self.state.lock();
        if state.fail_scans {
            return Err(FsError::Unavailable("scan disabled".into()));
        }
        let folder_key = key(folder);
        let files = state
            .folders
            .get(&folder_key)
            .ok_or_else(|| FsError::NotFound(folder_key.clone()))?;
        let sidecar = state.sidecars.get(&folder_key);

        let photos = files
            .iter()
            .map(|f| ScannedPhoto {
                path: key(&folder.join(&f.filename)),
                filename: f.filename.clone(),
                size: f.size,
                modified: f.modified,
                meta: sidecar
                    .and_then(|s| s.photos.get(&f.filename).copied())
                    .unwrap_or_default(),
            })
            .collect();

        Ok(ScanResult {
            photos,
            folder_path: folder_key,
        })
    }

    fn list_subfolders(&self, folder: &Path) -> Result<Vec<FolderNode>> {
        let state = self.state.lock();
        let parent = key(folder);
        if !state.folders.contains_key(&parent) {
            return Err(FsError::NotFound(parent));
        }

        let mut nodes: Vec<FolderNode> = state
            .folders
            .keys()
            .filter_map(|candidate| {
                let path = Path::new(candidate);
                if path.parent() != Some(folder) {
                    return None;
                }
                let name = path.file_name()?.to_string_lossy().into_owned();
                if name.starts_with('.') {
                    return None;
                }
                let has_children = !state.folders[candidate].is_empty()
                    || state
                        .folders
                        .keys()
                        .any(|k| Path::new(k).parent() == Some(path));
                Some(FolderNode {
                    name,
                    path: candidate.clone(),
                    has_children,
                })
            })
            .collect();

        nodes.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(nodes)
    }

    fn load_folder_meta(&self, folder: &Path) -> Result<FolderMeta> {
        Ok(self
            .state
            .lock()
            .sidecars
            .get(&key(folder))
            .cloned()
            .unwrap_or_default())
    }

    fn save_folder_meta(&self, folder: &Path, meta: &FolderMeta) -> Result<()> {
        let mut state = self.state.lock();
        if state.fail_writes {
            return Err(FsError::Unavailable("writes disabled".into()));
        }
        let folder_key = key(folder);
        if !state.folders.contains_key(&folder_key) {
            return Err(FsError::NotFound(folder_key));
        }
        state.sidecars.insert(folder_key, meta.clone());
        state.folder_meta_writes += 1;
        Ok(())
    }

    fn load_data(&self) -> Result<AppData> {
        Ok(self.state.lock().data.clone())
    }

    fn save_data(&self, data: &AppData) -> Result<()> {
        let mut state = self.state.lock();
        if state.fail_writes {
            return Err(FsError::Unavailable("writes disabled".into()));
        }
        state.data = data.clone();
        state.data_writes += 1;
        Ok(())
    }

    fn get_exif_data(&self, path: &Path) -> Result<ExifRecord> {
        Ok(self
            .state
            .lock()
            .exif
            .get(&key(path))
            .cloned()
            .unwrap_or_default())
    }

    fn rename_photo(&self, folder: &Path, old_name: &str, new_name: &str) -> Result<()> {
        validate_new_name(new_name)?;

        let mut state = self.state.lock();
        if state.fail_writes {
            return Err(FsError::Unavailable("writes disabled".into()));
        }
        let folder_key = key(folder);
        let files = state
            .folders
            .get_mut(&folder_key)
            .ok_or_else(|| FsError::NotFound(folder_key.clone()))?;

        if files.iter().any(|f| f.filename == new_name) {
            return Err(FsError::AlreadyExists(key(&folder.join(new_name))));
        }
        let file = files
            .iter_mut()
            .find(|f| f.filename == old_name)
            .ok_or_else(|| FsError::NotFound(key(&folder.join(old_name))))?;
        file.filename = new_name.to_string();

        if let Some(sidecar) = state.sidecars.get_mut(&folder_key) {
            if let Some(entry) = sidecar.photos.remove(old_name) {
                sidecar.photos.insert(new_name.to_string(), entry);
            }
        }

        let old_path = key(&folder.join(old_name));
        if let Some(record) = state.exif.remove(&old_path) {
            state.exif.insert(key(&folder.join(new_name)), record);
        }
        Ok(())
    }

    fn reveal_in_file_manager(&self, path: &Path) -> Result<()> {
        self.state.lock().revealed.push(key(path));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ipc_proto::{Label, PhotoMeta};

    #[test]
    fn test_scan_keeps_insertion_order_and_merges_sidecar() {
        let backend = MemoryBackend::new();
        backend.add_photo("/p", "b.jpg", 1);
        backend.add_photo("/p", "a.jpg", 2);

        let mut meta = FolderMeta::default();
        meta.photos.insert(
            "a.jpg".into(),
            PhotoMeta {
                label: Label::Blue,
                ..Default::default()
            },
        );
        backend.set_folder_meta("/p", meta);

        let result = backend.scan_folder(Path::new("/p")).unwrap();
        let names: Vec<_> = result.photos.iter().map(|p| p.filename.as_str()).collect();
        assert_eq!(names, vec!["b.jpg", "a.jpg"]);
        assert_eq!(result.photos[1].meta.label, Label::Blue);
        assert_eq!(result.photos[0].path, "/p/b.jpg");
    }

    #[test]
    fn test_fail_writes() {
        let backend = MemoryBackend::new();
        backend.add_folder("/p");
        backend.set_fail_writes(true);

        assert!(backend
            .save_folder_meta(Path::new("/p"), &FolderMeta::default())
            .is_err());
        assert!(backend.save_data(&AppData::default()).is_err());
        assert_eq!(backend.folder_meta_writes(), 0);
        assert_eq!(backend.data_writes(), 0);

        backend.set_fail_writes(false);
        backend
            .save_folder_meta(Path::new("/p"), &FolderMeta::default())
            .unwrap();
        assert_eq!(backend.folder_meta_writes(), 1);
    }

    #[test]
    fn test_rename_moves_sidecar_key() {
        let backend = MemoryBackend::new();
        backend.add_photo("/p", "a.jpg", 1);
        let mut meta = FolderMeta::default();
        meta.photos.insert(
            "a.jpg".into(),
            PhotoMeta {
                rating: 3,
                ..Default::default()
            },
        );
        backend.set_folder_meta("/p", meta);

        backend.rename_photo(Path::new("/p"), "a.jpg", "b.jpg").unwrap();

        assert_eq!(backend.filenames("/p"), vec!["b.jpg".to_string()]);
        let meta = backend.folder_meta("/p").unwrap();
        assert_eq!(meta.photos["b.jpg"].rating, 3);
        assert!(!meta.photos.contains_key("a.jpg"));
    }

    #[test]
    fn test_subfolders() {
        let backend = MemoryBackend::new();
        backend.add_folder("/p");
        backend.add_photo("/p/zeta", "x.jpg", 1);
        backend.add_folder("/p/Alpha");
        backend.add_folder("/p/.hidden");

        let nodes = backend.list_subfolders(Path::new("/p")).unwrap();
        let names: Vec<_> = nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "zeta"]);
        assert!(!nodes[0].has_children);
        assert!(nodes[1].has_children);
    }
}
