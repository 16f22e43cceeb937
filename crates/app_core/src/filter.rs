//! Filter predicates and the filtered photo sequence

use crate::photo::{MetaPatch, PhotoEntry};
use ipc_proto::{Label, PhotoMeta};
use std::collections::HashMap;

/// Active filter predicates, combined with AND.
///
/// `rating == 0` and `label == Label::None` mean "inactive".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterState {
    pub rating: u8,
    pub label: Label,
    pub flagged_only: bool,
}

impl FilterState {
    pub fn is_active(&self) -> bool {
        *self != FilterState::default()
    }

    pub fn matches(&self, meta: &PhotoMeta) -> bool {
        (self.rating == 0 || meta.rating == self.rating)
            && (self.label.is_none() || meta.label == self.label)
            && (!self.flagged_only || meta.flagged)
    }

    /// Whether a patch touches a field an active predicate reads
    pub fn constrains(&self, patch: &MetaPatch) -> bool {
        (self.rating != 0 && patch.rating.is_some())
            || (!self.label.is_none() && patch.label.is_some())
            || (self.flagged_only && patch.flagged.is_some())
    }
}

/// Indices of the entries that pass `filters`, in entry order
pub fn apply(
    entries: &[PhotoEntry],
    meta: &HashMap<String, PhotoMeta>,
    filters: &FilterState,
) -> Vec<usize> {
    if !filters.is_active() {
        return (0..entries.len()).collect();
    }

    entries
        .iter()
        .enumerate()
        .filter(|(_, e)| {
            let m = meta.get(&e.filename).copied().unwrap_or_default();
            filters.matches(&m)
        })
        .map(|(i, _)| i)
        .collect()
}
