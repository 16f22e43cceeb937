//! Protocol definitions for Core <-> Backend communication
//!
//! This crate defines the shared data structures exchanged between the
//! metadata engine and the backend that owns the filesystem: scan results,
//! the per-folder sidecar payload, the global workspace/album document and
//! EXIF records.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Current sidecar format version
pub const FOLDER_META_VERSION: u32 = 1;

/// Highest star rating
pub const MAX_RATING: u8 = 5;

/// Protocol parse errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtoError {
    #[error("Invalid album id: {0}")]
    InvalidAlbumId(String),

    #[error("Unknown label: {0}")]
    UnknownLabel(String),
}

/// Color tag attached to a photo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Label {
    #[default]
    None,
    Red,
    Yellow,
    Green,
    Blue,
    Purple,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::None => "",
            Label::Red => "red",
            Label::Yellow => "yellow",
            Label::Green => "green",
            Label::Blue => "blue",
            Label::Purple => "purple",
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Label::None)
    }
}

impl FromStr for Label {
    type Err = ProtoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(Label::None),
            "red" => Ok(Label::Red),
            "yellow" => Ok(Label::Yellow),
            "green" => Ok(Label::Green),
            "blue" => Ok(Label::Blue),
            "purple" => Ok(Label::Purple),
            _ => Err(ProtoError::UnknownLabel(s.to_string())),
        }
    }
}

// Sidecars written by other tools may carry labels we don't know; they load as untagged.
impl From<String> for Label {
    fn from(s: String) -> Self {
        s.parse().unwrap_or_default()
    }
}

impl From<Label> for String {
    fn from(label: Label) -> Self {
        label.as_str().to_string()
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::None => write!(f, "none"),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

/// User annotation for one photo, keyed by filename
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PhotoMeta {
    #[serde(default)]
    pub rating: u8,
    #[serde(default)]
    pub label: Label,
    #[serde(default)]
    pub flagged: bool,
    #[serde(default)]
    pub rejected: bool,
}

impl PhotoMeta {
    /// True when every field holds its default value
    pub fn is_default(&self) -> bool {
        *self == PhotoMeta::default()
    }
}

/// Contents of `{folder}/.photo_meta.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderMeta {
    #[serde(default = "default_version")]
    pub version: u32,
    /// Keyed by filename, not full path
    #[serde(default)]
    pub photos: BTreeMap<String, PhotoMeta>,
}

fn default_version() -> u32 {
    FOLDER_META_VERSION
}

impl Default for FolderMeta {
    fn default() -> Self {
        Self {
            version: FOLDER_META_VERSION,
            photos: BTreeMap::new(),
        }
    }
}

/// A single photo returned by a folder scan, with its sidecar metadata inline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScannedPhoto {
    pub path: String,
    pub filename: String,
    pub size: u64,
    /// Last modification, unix milliseconds
    pub modified: u64,
    #[serde(flatten)]
    pub meta: PhotoMeta,
}

/// Result of scanning one folder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub photos: Vec<ScannedPhoto>,
    pub folder_path: String,
}

/// A subfolder in the folder tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderNode {
    pub name: String,
    pub path: String,
    pub has_children: bool,
}

/// Best-effort EXIF summary for one file
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExifRecord {
    pub date_taken: Option<String>,
    pub camera_make: Option<String>,
    pub camera_model: Option<String>,
    pub iso: Option<u32>,
    pub aperture: Option<String>,
    pub shutter_speed: Option<String>,
    pub focal_length: Option<String>,
    pub gps_lat: Option<f64>,
    pub gps_lon: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl ExifRecord {
    pub fn is_empty(&self) -> bool {
        *self == ExifRecord::default()
    }
}

/// Opaque album identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlbumId(pub Uuid);

impl AlbumId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AlbumId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AlbumId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AlbumId {
    type Err = ProtoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(AlbumId)
            .map_err(|_| ProtoError::InvalidAlbumId(s.to_string()))
    }
}

/// A named, cross-folder collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Album {
    pub id: AlbumId,
    pub name: String,
    /// Unix milliseconds
    pub created_at: i64,
}

impl Album {
    pub fn new(name: &str) -> Self {
        Self {
            id: AlbumId::new(),
            name: name.to_string(),
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// Global app document: workspace list and album catalog
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AppData {
    #[serde(default)]
    pub workspaces: Vec<String>,
    #[serde(default)]
    pub active_workspace: Option<String>,
    #[serde(default)]
    pub albums: Vec<Album>,
    /// Photo path -> albums it belongs to
    #[serde(default)]
    pub album_members: BTreeMap<String, BTreeSet<AlbumId>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_serialization() {
        assert_eq!(serde_json::to_string(&Label::None).unwrap(), r#""""#);
        assert_eq!(serde_json::to_string(&Label::Green).unwrap(), r#""green""#);

        let label: Label = serde_json::from_str(r#""purple""#).unwrap();
        assert_eq!(label, Label::Purple);

        // Unknown tags degrade to no label
        let label: Label = serde_json::from_str(r#""orange""#).unwrap();
        assert_eq!(label, Label::None);
    }

    #[test]
    fn test_label_parse() {
        assert_eq!("Red".parse::<Label>(), Ok(Label::Red));
        assert_eq!("none".parse::<Label>(), Ok(Label::None));
        assert!("teal".parse::<Label>().is_err());
    }

    #[test]
    fn test_folder_meta_tolerates_missing_fields() {
        let meta: FolderMeta =
            serde_json::from_str(r#"{"photos":{"IMG_1.jpg":{"rating":4}}}"#).unwrap();

        assert_eq!(meta.version, FOLDER_META_VERSION);
        let photo = meta.photos["IMG_1.jpg"];
        assert_eq!(photo.rating, 4);
        assert_eq!(photo.label, Label::None);
        assert!(!photo.flagged);
        assert!(!photo.rejected);
    }

    #[test]
    fn test_scanned_photo_flattens_meta() {
        let json = r#"{
            "path": "/photos/a.jpg",
            "filename": "a.jpg",
            "size": 10,
            "modified": 5,
            "rating": 3,
            "label": "blue",
            "flagged": true,
            "rejected": false
        }"#;
        let photo: ScannedPhoto = serde_json::from_str(json).unwrap();
        assert_eq!(photo.meta.rating, 3);
        assert_eq!(photo.meta.label, Label::Blue);
        assert!(photo.meta.flagged);
    }

    #[test]
    fn test_app_data_defaults() {
        let data: AppData = serde_json::from_str(r#"{"workspaces":["/a"]}"#).unwrap();
        assert_eq!(data.workspaces, vec!["/a".to_string()]);
        assert!(data.active_workspace.is_none());
        assert!(data.albums.is_empty());
        assert!(data.album_members.is_empty());
    }

    #[test]
    fn test_album_id_parse() {
        let id = AlbumId::new();
        assert_eq!(id.to_string().parse::<AlbumId>(), Ok(id));
        assert!("not-a-uuid".parse::<AlbumId>().is_err());
    }
}
