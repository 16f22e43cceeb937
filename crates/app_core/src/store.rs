//! Canonical photo, metadata and workspace collections
//!
//! `MetadataStore` is the only writer of the current folder's entries and
//! their `PhotoMeta`. Every other component reads through it.

use crate::photo::{MetaPatch, PhotoEntry};
use crate::workspace::WorkspaceSet;
use ipc_proto::{FolderMeta, PhotoMeta, ScannedPhoto};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

#[derive(Debug, Default)]
pub struct MetadataStore {
    workspaces: WorkspaceSet,
    folder: Option<String>,
    entries: Vec<PhotoEntry>,
    /// Keyed by filename
    meta: HashMap<String, PhotoMeta>,
}

impl MetadataStore {
    pub fn new(workspaces: WorkspaceSet) -> Self {
        Self {
            workspaces,
            ..Default::default()
        }
    }

    pub fn workspaces(&self) -> &WorkspaceSet {
        &self.workspaces
    }

    pub(crate) fn workspaces_mut(&mut self) -> &mut WorkspaceSet {
        &mut self.workspaces
    }

    /// Folder whose photos are loaded, if any
    pub fn folder(&self) -> Option<&str> {
        self.folder.as_deref()
    }

    /// Replace the entry collection with a fresh scan; inline metadata is authoritative
    pub fn load_folder(&mut self, folder: &str, photos: &[ScannedPhoto]) {
        self.entries = photos.iter().map(PhotoEntry::from).collect();
        self.meta = photos
            .iter()
            .filter(|p| !p.meta.is_default())
            .map(|p| (p.filename.clone(), p.meta))
            .collect();
        self.folder = Some(folder.to_string());
        tracing::debug!("Loaded {} photos from {}", self.entries.len(), folder);
    }

    /// Drop the current folder
    pub fn clear(&mut self) {
        self.folder = None;
        self.entries.clear();
        self.meta.clear();
    }

    pub fn entries(&self) -> &[PhotoEntry] {
        &self.entries
    }

    pub fn entry(&self, index: usize) -> Option<&PhotoEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn index_of(&self, filename: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.filename == filename)
    }

    pub fn index_of_path(&self, path: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.path == path)
    }

    pub fn contains(&self, filename: &str) -> bool {
        self.index_of(filename).is_some()
    }

    /// Metadata for a filename; absence reads as all defaults
    pub fn meta(&self, filename: &str) -> PhotoMeta {
        self.meta.get(filename).copied().unwrap_or_default()
    }

    pub fn meta_map(&self) -> &HashMap<String, PhotoMeta> {
        &self.meta
    }

    /// Merge a patch into one photo's metadata.
    ///
    /// Returns the merged value, or `None` (with a warning) when the folder
    /// has no photo by that name.
    pub fn update_meta(&mut self, filename: &str, patch: &MetaPatch) -> Option<PhotoMeta> {
        if !self.contains(filename) {
            tracing::warn!("Ignoring metadata update for unknown photo {:?}", filename);
            return None;
        }
        let meta = self.meta.entry(filename.to_string()).or_default();
        patch.apply_to(meta);
        let merged = *meta;
        tracing::debug!("{} -> {:?}", filename, merged);
        Some(merged)
    }

    /// Move an entry and its metadata to a new filename.
    ///
    /// Returns `(old_path, new_path)`, or `None` when the old name is unknown.
    pub fn rename(&mut self, old_name: &str, new_name: &str) -> Option<(String, String)> {
        let index = self.index_of(old_name)?;
        let entry = &mut self.entries[index];

        let old_path = entry.path.clone();
        let new_path = match Path::new(&old_path).parent() {
            Some(parent) => parent.join(new_name).to_string_lossy().into_owned(),
            None => new_name.to_string(),
        };
        entry.filename = new_name.to_string();
        entry.path = new_path.clone();

        if let Some(meta) = self.meta.remove(old_name) {
            self.meta.insert(new_name.to_string(), meta);
        }
        Some((old_path, new_path))
    }

    /// Full sidecar payload for the current folder
    pub fn folder_snapshot(&self) -> Option<(String, FolderMeta)> {
        let folder = self.folder.clone()?;
        let photos: BTreeMap<String, PhotoMeta> = self
            .meta
            .iter()
            .filter(|(_, m)| !m.is_default())
            .map(|(k, m)| (k.clone(), *m))
            .collect();
        Some((
            folder,
            FolderMeta {
                photos,
                ..Default::default()
            },
        ))
    }
}
