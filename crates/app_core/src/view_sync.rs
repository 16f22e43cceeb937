//! Filtered photo set and per-view cursors
//!
//! The coordinator owns the filtered sequence every view renders from and
//! three cursors into it: grid selection, culling position, and the
//! full-screen viewer position. Cursors are positions in the filtered
//! sequence, or `None` for "no selection"; they never index the unfiltered
//! entries.
//!
//! Metadata edits never re-filter. An edit to a field an active filter reads
//! only marks the set stale; the next navigation, filter change, folder load
//! or view switch re-derives it.

use crate::filter::{self, FilterState};
use crate::store::MetadataStore;
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Grid,
    Cull,
}

/// Culling sub-mode; `Filter` swaps the marking controls for the filter bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CullMode {
    #[default]
    Mark,
    Filter,
}

impl CullMode {
    pub fn toggled(self) -> Self {
        match self {
            CullMode::Mark => CullMode::Filter,
            CullMode::Filter => CullMode::Mark,
        }
    }
}

/// Surfaces that can render a photo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    Grid,
    Filmstrip,
    Cull,
    Viewer,
    MetadataPanel,
    AlbumDetail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nav {
    Next,
    Prev,
    GoTo(usize),
}

/// Zoom, pan and rotation of a single-photo view
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    pub zoom: f32,
    pub pan: (f32, f32),
    /// Degrees, always in `0..360`
    pub rotation: i32,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan: (0.0, 0.0),
            rotation: 0,
        }
    }
}

impl ViewTransform {
    pub fn is_identity(&self) -> bool {
        *self == ViewTransform::default()
    }

    pub fn reset(&mut self) {
        *self = ViewTransform::default();
    }

    /// Multiply the zoom, clamped to `[min, max]`
    pub fn zoom_by(&mut self, factor: f32, min: f32, max: f32) {
        self.zoom = (self.zoom * factor).clamp(min, max);
    }

    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.pan.0 += dx;
        self.pan.1 += dy;
    }

    /// Rotate left (counterclockwise)
    pub fn rotate_left(&mut self) {
        self.rotation = (self.rotation - 90).rem_euclid(360);
    }

    /// Rotate right (clockwise)
    pub fn rotate_right(&mut self) {
        self.rotation = (self.rotation + 90).rem_euclid(360);
    }
}

/// Which cursor a navigation moves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorSlot {
    Grid,
    Cull,
    Viewer,
}

/// Cursor targets remembered by photo path across a re-derive
#[derive(Debug, Clone, Default)]
pub struct CapturedCursors {
    grid: Option<String>,
    cull: Option<String>,
    viewer: Option<String>,
}

#[derive(Debug, Default)]
pub struct ViewSyncCoordinator {
    /// Entry indices passing the filters, in entry order
    filtered: Vec<usize>,
    stale: bool,
    mode: ViewMode,
    cull_mode: CullMode,
    viewer_open: bool,
    grid: Option<usize>,
    cull: Option<usize>,
    viewer: Option<usize>,
    cull_transform: ViewTransform,
    viewer_transform: ViewTransform,
}

impl ViewSyncCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Back to defaults: grid view, mark sub-mode, no selection, empty set
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn filtered(&self) -> &[usize] {
        &self.filtered
    }

    pub fn len(&self) -> usize {
        self.filtered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filtered.is_empty()
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn cull_mode(&self) -> CullMode {
        self.cull_mode
    }

    pub fn set_cull_mode(&mut self, mode: CullMode) {
        self.cull_mode = mode;
    }

    pub fn viewer_open(&self) -> bool {
        self.viewer_open
    }

    pub fn cursor(&self, slot: CursorSlot) -> Option<usize> {
        match slot {
            CursorSlot::Grid => self.grid,
            CursorSlot::Cull => self.cull,
            CursorSlot::Viewer => self.viewer,
        }
    }

    fn cursor_mut(&mut self, slot: CursorSlot) -> &mut Option<usize> {
        match slot {
            CursorSlot::Grid => &mut self.grid,
            CursorSlot::Cull => &mut self.cull,
            CursorSlot::Viewer => &mut self.viewer,
        }
    }

    pub fn cull_transform(&self) -> &ViewTransform {
        &self.cull_transform
    }

    pub fn viewer_transform(&self) -> &ViewTransform {
        &self.viewer_transform
    }

    /// Transform of the single-photo view in front, if one is showing
    pub fn active_transform_mut(&mut self) -> Option<&mut ViewTransform> {
        match self.active_slot() {
            CursorSlot::Viewer => Some(&mut self.viewer_transform),
            CursorSlot::Cull => Some(&mut self.cull_transform),
            CursorSlot::Grid => None,
        }
    }

    fn reset_transform(&mut self, slot: CursorSlot) {
        match slot {
            CursorSlot::Viewer => self.viewer_transform.reset(),
            CursorSlot::Cull => self.cull_transform.reset(),
            CursorSlot::Grid => {}
        }
    }

    /// The cursor user input currently drives
    pub fn active_slot(&self) -> CursorSlot {
        if self.viewer_open {
            CursorSlot::Viewer
        } else if self.mode == ViewMode::Cull {
            CursorSlot::Cull
        } else {
            CursorSlot::Grid
        }
    }

    /// Entry index at a filtered position
    pub fn entry_at(&self, position: usize) -> Option<usize> {
        self.filtered.get(position).copied()
    }

    /// Filtered position of an entry index
    pub fn position_of(&self, entry: usize) -> Option<usize> {
        self.filtered.iter().position(|&e| e == entry)
    }

    pub fn current_position(&self) -> Option<usize> {
        self.cursor(self.active_slot())
    }

    /// Entry index of the photo the active cursor points at
    pub fn current_entry(&self) -> Option<usize> {
        self.current_position().and_then(|p| self.entry_at(p))
    }

    fn slot_entry(&self, slot: CursorSlot) -> Option<usize> {
        self.cursor(slot).and_then(|p| self.entry_at(p))
    }

    /// Remember the photos under each cursor by path
    pub fn capture(&self, store: &MetadataStore) -> CapturedCursors {
        let path = |slot| {
            self.slot_entry(slot)
                .and_then(|e| store.entry(e))
                .map(|e| e.path.clone())
        };
        CapturedCursors {
            grid: path(CursorSlot::Grid),
            cull: path(CursorSlot::Cull),
            viewer: path(CursorSlot::Viewer),
        }
    }

    /// Recompute the filtered set and retarget each cursor to its photo's new position
    pub fn rederive(
        &mut self,
        store: &MetadataStore,
        filters: &FilterState,
        captured: CapturedCursors,
    ) {
        self.filtered = filter::apply(store.entries(), store.meta_map(), filters);
        self.stale = false;

        let retarget = |path: Option<String>, filtered: &[usize]| {
            path.and_then(|p| store.index_of_path(&p))
                .and_then(|e| filtered.iter().position(|&x| x == e))
        };
        self.grid = retarget(captured.grid, &self.filtered);
        self.cull = retarget(captured.cull, &self.filtered);
        self.viewer = retarget(captured.viewer, &self.filtered);

        if self.cull.is_none() {
            self.cull_transform.reset();
        }
        if self.viewer.is_none() {
            self.viewer_transform.reset();
        }

        tracing::debug!(
            shown = self.filtered.len(),
            total = store.len(),
            "Filtered set re-derived"
        );
    }

    /// Re-derive against the same entries
    pub fn refilter(&mut self, store: &MetadataStore, filters: &FilterState) {
        let captured = self.capture(store);
        self.rederive(store, filters, captured);
    }

    /// An edit touched a field an active filter reads
    pub fn mark_stale(&mut self) {
        self.stale = true;
    }

    /// Move the active cursor with wrap-around.
    ///
    /// Returns the new position, or `None` when nothing moved (empty set,
    /// out-of-range target).
    pub fn navigate(
        &mut self,
        nav: Nav,
        store: &MetadataStore,
        filters: &FilterState,
    ) -> Option<usize> {
        let slot = self.active_slot();
        let before = self.slot_entry(slot);

        if self.stale {
            self.refilter(store, filters);
            if let (Some(anchor), None) = (before, self.cursor(slot)) {
                // The photo left the set; step to its canonical neighbour
                if let Some(pos) = self.neighbour_of(anchor, nav) {
                    return Some(self.move_to(slot, pos, before));
                }
            }
        }

        let len = self.filtered.len();
        if len == 0 {
            return None;
        }
        let current = self.cursor(slot);
        let target = match nav {
            Nav::Next => current.map_or(0, |c| (c + 1) % len),
            Nav::Prev => current.map_or(len - 1, |c| (c + len - 1) % len),
            Nav::GoTo(i) if i < len => i,
            Nav::GoTo(i) => {
                tracing::warn!("Ignoring navigation to {} in a set of {}", i, len);
                return None;
            }
        };
        Some(self.move_to(slot, target, before))
    }

    fn neighbour_of(&self, anchor: usize, nav: Nav) -> Option<usize> {
        let len = self.filtered.len();
        if len == 0 {
            return None;
        }
        match nav {
            Nav::Next => Some(self.filtered.iter().position(|&e| e > anchor).unwrap_or(0)),
            Nav::Prev => Some(
                self.filtered
                    .iter()
                    .rposition(|&e| e < anchor)
                    .unwrap_or(len - 1),
            ),
            Nav::GoTo(_) => None,
        }
    }

    fn move_to(&mut self, slot: CursorSlot, position: usize, before: Option<usize>) -> usize {
        *self.cursor_mut(slot) = Some(position);
        if self.entry_at(position) != before {
            self.reset_transform(slot);
        }
        position
    }

    /// Set the grid selection
    pub fn select(&mut self, position: Option<usize>) -> bool {
        match position {
            Some(p) if p >= self.filtered.len() => {
                tracing::warn!("Ignoring selection {} in a set of {}", p, self.filtered.len());
                false
            }
            p => {
                self.grid = p;
                true
            }
        }
    }

    /// Switch between grid and culling; always re-derives the filtered set
    pub fn set_mode(&mut self, mode: ViewMode, store: &MetadataStore, filters: &FilterState) {
        self.refilter(store, filters);
        if mode == ViewMode::Cull {
            let start = self.grid.or(if self.filtered.is_empty() { None } else { Some(0) });
            self.cull = start;
            self.cull_mode = CullMode::Mark;
            self.cull_transform.reset();
        }
        self.mode = mode;
    }

    /// Open the full-screen viewer at a position, or at the active cursor.
    ///
    /// A stale set is settled first; the viewer lands on the chosen photo,
    /// or its canonical successor when the photo no longer matches.
    pub fn open_viewer(
        &mut self,
        position: Option<usize>,
        store: &MetadataStore,
        filters: &FilterState,
    ) -> bool {
        let len = self.filtered.len();
        if let Some(p) = position.filter(|&p| p >= len) {
            tracing::warn!("Cannot open viewer at {} in a set of {}", p, len);
            return false;
        }
        // Positions refer to the set as shown, so pin the photo before settling
        let anchor = match position {
            Some(p) => self.entry_at(p),
            None => self.current_entry(),
        };
        if self.stale {
            self.refilter(store, filters);
        }
        let start = match anchor {
            Some(e) => self
                .position_of(e)
                .or_else(|| self.neighbour_of(e, Nav::Next)),
            None if self.filtered.is_empty() => None,
            None => Some(0),
        };
        let Some(start) = start else {
            tracing::warn!("Cannot open viewer on an empty set");
            return false;
        };
        self.viewer_open = true;
        self.viewer = Some(start);
        self.viewer_transform.reset();
        true
    }

    /// Close the viewer, handing its position back to the grid selection
    pub fn close_viewer(&mut self) -> bool {
        if !self.viewer_open {
            return false;
        }
        self.viewer_open = false;
        self.grid = self.viewer.take();
        self.viewer_transform.reset();
        true
    }

    /// Filtered positions shown in the filmstrip, centred on the culling cursor
    pub fn filmstrip(&self, size: usize) -> Range<usize> {
        let len = self.filtered.len();
        if len == 0 || size == 0 {
            return 0..0;
        }
        let current = self.cull.unwrap_or(0);
        let start = current.saturating_sub(size / 2);
        let end = (len - 1).min(start + size - 1);
        start..end + 1
    }

    /// Views currently rendering the photo at `entry`
    pub fn affected_views(
        &self,
        entry: usize,
        filmstrip_size: usize,
        in_open_album: bool,
    ) -> Vec<ViewKind> {
        let mut views = Vec::new();
        let position = self.position_of(entry);

        match self.mode {
            ViewMode::Grid => {
                if position.is_some() {
                    views.push(ViewKind::Grid);
                }
            }
            ViewMode::Cull => {
                if position.is_some_and(|p| self.filmstrip(filmstrip_size).contains(&p)) {
                    views.push(ViewKind::Filmstrip);
                }
                if self.slot_entry(CursorSlot::Cull) == Some(entry) {
                    views.push(ViewKind::Cull);
                }
            }
        }
        if self.viewer_open && self.slot_entry(CursorSlot::Viewer) == Some(entry) {
            views.push(ViewKind::Viewer);
        }
        if self.current_entry() == Some(entry) {
            views.push(ViewKind::MetadataPanel);
        }
        if in_open_album {
            views.push(ViewKind::AlbumDetail);
        }
        views
    }
}
