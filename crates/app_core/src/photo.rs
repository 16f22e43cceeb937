//! Photo entries and metadata patches

use ipc_proto::{Label, PhotoMeta, ScannedPhoto, MAX_RATING};

/// One image file in the current folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoEntry {
    /// Absolute path, identity within the folder
    pub path: String,
    /// Metadata join key
    pub filename: String,
    pub size: u64,
    /// Unix milliseconds
    pub modified: u64,
}

impl From<&ScannedPhoto> for PhotoEntry {
    fn from(p: &ScannedPhoto) -> Self {
        Self {
            path: p.path.clone(),
            filename: p.filename.clone(),
            size: p.size,
            modified: p.modified,
        }
    }
}

/// Partial metadata update; `None` fields are left untouched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetaPatch {
    pub rating: Option<u8>,
    pub label: Option<Label>,
    pub flagged: Option<bool>,
    pub rejected: Option<bool>,
}

impl MetaPatch {
    pub fn rating(rating: u8) -> Self {
        Self {
            rating: Some(rating),
            ..Default::default()
        }
    }

    pub fn label(label: Label) -> Self {
        Self {
            label: Some(label),
            ..Default::default()
        }
    }

    pub fn flagged(flagged: bool) -> Self {
        Self {
            flagged: Some(flagged),
            ..Default::default()
        }
    }

    pub fn rejected(rejected: bool) -> Self {
        Self {
            rejected: Some(rejected),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == MetaPatch::default()
    }

    /// Merge field by field; ratings above the maximum are clamped
    pub fn apply_to(&self, meta: &mut PhotoMeta) {
        if let Some(rating) = self.rating {
            meta.rating = rating.min(MAX_RATING);
        }
        if let Some(label) = self.label {
            meta.label = label;
        }
        if let Some(flagged) = self.flagged {
            meta.flagged = flagged;
        }
        if let Some(rejected) = self.rejected {
            meta.rejected = rejected;
        }
    }
}

/// Read-only view of one photo as rendered by a view
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhotoView<'a> {
    /// Position in the filtered sequence
    pub position: usize,
    pub entry: &'a PhotoEntry,
    pub meta: PhotoMeta,
}
