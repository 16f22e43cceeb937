//! Albums and photo membership
//!
//! Membership is stored per photo path as a set of album ids. Every id in
//! any set refers to a live album: deleting an album strips it from every
//! set before the call returns.

use crate::error::AppError;
use ipc_proto::{Album, AlbumId};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Default)]
pub struct AlbumManager {
    albums: Vec<Album>,
    /// Photo path -> albums it belongs to; empty sets are not kept
    members: BTreeMap<String, BTreeSet<AlbumId>>,
    /// Album shown in the detail view
    viewing: Option<AlbumId>,
}

impl AlbumManager {
    /// Build from persisted data, dropping references to albums that no longer exist
    pub fn from_data(albums: Vec<Album>, mut members: BTreeMap<String, BTreeSet<AlbumId>>) -> Self {
        let known: BTreeSet<AlbumId> = albums.iter().map(|a| a.id).collect();
        let mut dropped = 0;
        for ids in members.values_mut() {
            let before = ids.len();
            ids.retain(|id| known.contains(id));
            dropped += before - ids.len();
        }
        members.retain(|_, ids| !ids.is_empty());
        if dropped > 0 {
            tracing::warn!("Dropped {} dangling album references", dropped);
        }

        Self {
            albums,
            members,
            viewing: None,
        }
    }

    pub fn albums(&self) -> &[Album] {
        &self.albums
    }

    pub fn members(&self) -> &BTreeMap<String, BTreeSet<AlbumId>> {
        &self.members
    }

    pub fn get(&self, id: AlbumId) -> Option<&Album> {
        self.albums.iter().find(|a| a.id == id)
    }

    /// Find an album by exact id string or by name
    pub fn find(&self, key: &str) -> Option<&Album> {
        match key.parse::<AlbumId>() {
            Ok(id) => self.get(id),
            Err(_) => self.albums.iter().find(|a| a.name == key.trim()),
        }
    }

    pub fn create(&mut self, name: &str) -> Result<AlbumId, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Album name cannot be empty".into()));
        }
        let album = Album::new(name);
        let id = album.id;
        tracing::info!("Created album {:?} ({})", name, id);
        self.albums.push(album);
        Ok(id)
    }

    /// Remove an album together with every membership and the detail view that refer to it
    pub fn delete(&mut self, id: AlbumId) -> Option<Album> {
        let Some(pos) = self.albums.iter().position(|a| a.id == id) else {
            tracing::warn!("Ignoring delete of unknown album {}", id);
            return None;
        };
        let album = self.albums.remove(pos);

        for ids in self.members.values_mut() {
            ids.remove(&id);
        }
        self.members.retain(|_, ids| !ids.is_empty());

        if self.viewing == Some(id) {
            self.viewing = None;
        }

        tracing::info!("Deleted album {:?}", album.name);
        Some(album)
    }

    /// Add a photo to an album; already being a member is not an error
    pub fn add(&mut self, path: &str, id: AlbumId) -> Result<bool, AppError> {
        if self.get(id).is_none() {
            return Err(AppError::NotFound(format!("album {}", id)));
        }
        Ok(self.members.entry(path.to_string()).or_default().insert(id))
    }

    /// Remove a photo from an album; returns false when it was not a member
    pub fn remove(&mut self, path: &str, id: AlbumId) -> bool {
        let Some(ids) = self.members.get_mut(path) else {
            return false;
        };
        let removed = ids.remove(&id);
        if ids.is_empty() {
            self.members.remove(path);
        }
        removed
    }

    /// Albums a photo belongs to
    pub fn albums_of(&self, path: &str) -> Vec<AlbumId> {
        self.members
            .get(path)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn is_member(&self, path: &str, id: AlbumId) -> bool {
        self.members.get(path).is_some_and(|ids| ids.contains(&id))
    }

    /// Number of photos in an album, counted on every call
    pub fn member_count(&self, id: AlbumId) -> usize {
        self.members.values().filter(|ids| ids.contains(&id)).count()
    }

    /// Photo paths in an album, sorted
    pub fn member_paths(&self, id: AlbumId) -> Vec<&str> {
        self.members
            .iter()
            .filter(|(_, ids)| ids.contains(&id))
            .map(|(path, _)| path.as_str())
            .collect()
    }

    /// Carry a photo's memberships over to its new path
    pub fn rename_member(&mut self, old_path: &str, new_path: &str) -> bool {
        match self.members.remove(old_path) {
            Some(ids) => {
                self.members.entry(new_path.to_string()).or_default().extend(ids);
                true
            }
            None => false,
        }
    }

    pub fn viewing(&self) -> Option<AlbumId> {
        self.viewing
    }

    /// Open an album in the detail view
    pub fn open(&mut self, id: AlbumId) -> bool {
        if self.get(id).is_none() {
            tracing::warn!("Cannot open unknown album {}", id);
            return false;
        }
        self.viewing = Some(id);
        true
    }

    pub fn close(&mut self) {
        self.viewing = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_rejects_blank() {
        let mut albums = AlbumManager::default();
        assert!(matches!(albums.create("   "), Err(AppError::Validation(_))));
        assert!(albums.albums().is_empty());

        let id = albums.create("  Keepers ").unwrap();
        assert_eq!(albums.get(id).unwrap().name, "Keepers");
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut albums = AlbumManager::default();
        let id = albums.create("Best").unwrap();

        assert!(albums.add("/p/a.jpg", id).unwrap());
        assert!(!albums.add("/p/a.jpg", id).unwrap());
        assert_eq!(albums.albums_of("/p/a.jpg"), vec![id]);
        assert_eq!(albums.member_count(id), 1);
    }

    #[test]
    fn test_add_to_unknown_album() {
        let mut albums = AlbumManager::default();
        let result = albums.add("/p/a.jpg", AlbumId::new());
        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert!(albums.members().is_empty());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut albums = AlbumManager::default();
        let id = albums.create("Best").unwrap();
        albums.add("/p/a.jpg", id).unwrap();

        assert!(albums.remove("/p/a.jpg", id));
        assert!(!albums.remove("/p/a.jpg", id));
        assert!(albums.members().is_empty());
    }

    #[test]
    fn test_delete_strips_every_membership() {
        let mut albums = AlbumManager::default();
        let doomed = albums.create("Doomed").unwrap();
        let kept = albums.create("Kept").unwrap();
        for path in ["/p/a.jpg", "/p/b.jpg", "/q/c.jpg"] {
            albums.add(path, doomed).unwrap();
        }
        albums.add("/p/a.jpg", kept).unwrap();
        albums.open(doomed);

        assert!(albums.delete(doomed).is_some());

        assert!(albums.members().values().all(|ids| !ids.contains(&doomed)));
        assert_eq!(albums.albums_of("/p/a.jpg"), vec![kept]);
        assert!(albums.albums_of("/p/b.jpg").is_empty());
        assert_eq!(albums.viewing(), None);
        assert!(albums.delete(doomed).is_none());
    }

    #[test]
    fn test_from_data_prunes_dangling() {
        let album = Album::new("Live");
        let mut members = BTreeMap::new();
        members.insert("/p/a.jpg".to_string(), BTreeSet::from([album.id, AlbumId::new()]));
        members.insert("/p/b.jpg".to_string(), BTreeSet::from([AlbumId::new()]));

        let albums = AlbumManager::from_data(vec![album.clone()], members);

        assert_eq!(albums.albums_of("/p/a.jpg"), vec![album.id]);
        assert!(!albums.members().contains_key("/p/b.jpg"));
    }

    #[test]
    fn test_rename_member_and_find() {
        let mut albums = AlbumManager::default();
        let id = albums.create("Trip").unwrap();
        albums.add("/p/a.jpg", id).unwrap();

        assert!(albums.rename_member("/p/a.jpg", "/p/z.jpg"));
        assert!(albums.is_member("/p/z.jpg", id));
        assert!(!albums.is_member("/p/a.jpg", id));
        assert_eq!(albums.member_paths(id), vec!["/p/z.jpg"]);

        assert_eq!(albums.find("Trip").map(|a| a.id), Some(id));
        assert_eq!(albums.find(&id.to_string()).map(|a| a.id), Some(id));
    }
}
