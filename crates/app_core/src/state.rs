//! Application state management
//!
//! `AppState` owns every component and is the single entry point for user
//! actions. Each operation mutates canonical state, re-derives what the
//! views need and schedules persistence before returning, so callers never
//! observe metadata and views out of step.

use crate::album::AlbumManager;
use crate::command::{Command, CommandId};
use crate::config::AppConfig;
use crate::error::{AppError, Notice};
use crate::filter::FilterState;
use crate::persistence::{FlushReport, PersistenceGateway, WriteKind, WritePayload};
use crate::photo::{MetaPatch, PhotoView};
use crate::store::MetadataStore;
use crate::view_sync::{CullMode, Nav, ViewKind, ViewMode, ViewSyncCoordinator};
use crate::workspace::{Removal, WorkspaceSet};
use app_fs::{FsError, PhotoBackend};
use ipc_proto::{AlbumId, AppData, ExifRecord, FolderNode, Label, PhotoMeta, ScanResult, MAX_RATING};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Identifies one folder load; completions for superseded tickets are dropped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderLoadTicket {
    generation: u64,
    workspace: Option<String>,
    folder: String,
}

impl FolderLoadTicket {
    pub fn folder(&self) -> &str {
        &self.folder
    }

    pub fn workspace(&self) -> Option<&str> {
        self.workspace.as_deref()
    }
}

/// Outcome of completing a folder load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderLoad {
    Applied { shown: usize, total: usize },
    /// The user moved on before the scan finished
    Stale,
}

/// A metadata mutation and the views that must redraw the photo
#[derive(Debug, Clone, PartialEq)]
pub struct MetaChange {
    pub filename: String,
    pub path: String,
    pub meta: PhotoMeta,
    pub views: Vec<ViewKind>,
}

/// Main application state
pub struct AppState {
    config: AppConfig,
    backend: Arc<dyn PhotoBackend>,
    store: MetadataStore,
    albums: AlbumManager,
    filters: FilterState,
    view: ViewSyncCoordinator,
    persistence: PersistenceGateway,
    /// Successful EXIF lookups by path, empty records included
    exif_cache: HashMap<String, ExifRecord>,
    notices: Vec<Notice>,
    generation: u64,
}

impl AppState {
    /// Create the state from the backend's saved workspace and album data
    pub fn new(config: AppConfig, backend: Arc<dyn PhotoBackend>) -> Self {
        let mut notices = Vec::new();
        let data = match backend.load_data() {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!("Could not load saved workspaces: {}", e);
                notices.push(Notice::warning(format!("Could not load saved workspaces: {}", e)));
                AppData::default()
            }
        };

        let workspaces = WorkspaceSet::from_data(data.workspaces, data.active_workspace);
        let albums = AlbumManager::from_data(data.albums, data.album_members);
        let delay = Duration::from_millis(config.general.debounce_ms);

        tracing::info!(
            workspaces = workspaces.paths().len(),
            albums = albums.albums().len(),
            "State restored"
        );

        Self {
            persistence: PersistenceGateway::new(backend.clone(), delay),
            store: MetadataStore::new(workspaces),
            albums,
            filters: FilterState::default(),
            view: ViewSyncCoordinator::new(),
            exif_cache: HashMap::new(),
            notices,
            generation: 0,
            config,
            backend,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn backend(&self) -> Arc<dyn PhotoBackend> {
        self.backend.clone()
    }

    pub fn store(&self) -> &MetadataStore {
        &self.store
    }

    pub fn workspaces(&self) -> &WorkspaceSet {
        self.store.workspaces()
    }

    pub fn albums(&self) -> &AlbumManager {
        &self.albums
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn view(&self) -> &ViewSyncCoordinator {
        &self.view
    }

    /// Drain pending user-visible notices
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    fn warn(&mut self, message: String) {
        tracing::warn!("{}", message);
        self.notices.push(Notice::warning(message));
    }

    // ===== Folder loading =====

    /// Ticket for reopening the last workspace, when enabled
    pub fn startup_ticket(&mut self) -> Option<FolderLoadTicket> {
        if !self.config.general.restore_last_workspace {
            return None;
        }
        let active = self.store.workspaces().active()?.to_string();
        Some(self.begin_folder_load(&active))
    }

    /// Start loading a folder; any earlier ticket becomes stale
    pub fn begin_folder_load(&mut self, folder: &str) -> FolderLoadTicket {
        // The scan reads the sidecar, so it must see every edit made so far
        self.flush_kind(WriteKind::FolderMeta);
        self.generation += 1;
        FolderLoadTicket {
            generation: self.generation,
            workspace: self.store.workspaces().active().map(str::to_string),
            folder: folder.to_string(),
        }
    }

    /// Apply a finished scan if its ticket is still current
    pub fn complete_folder_load(
        &mut self,
        ticket: FolderLoadTicket,
        result: Result<ScanResult, FsError>,
    ) -> Result<FolderLoad, AppError> {
        if ticket.generation != self.generation
            || ticket.workspace.as_deref() != self.store.workspaces().active()
        {
            tracing::debug!("Discarding stale scan of {}", ticket.folder);
            self.notices
                .push(Notice::info(format!("Discarded stale scan of {}", ticket.folder)));
            return Ok(FolderLoad::Stale);
        }

        let scan = match result {
            Ok(scan) => scan,
            Err(e) => {
                let message = format!("Scan failed for {}: {}", ticket.folder, e);
                self.warn(message.clone());
                return Err(AppError::External(message));
            }
        };

        let mut photos = scan.photos;
        let mut diverged = false;
        if self.store.folder() == Some(ticket.folder.as_str()) {
            // Memory is authoritative over whatever the sidecar held
            for photo in photos.iter_mut() {
                if !self.store.contains(&photo.filename) {
                    continue;
                }
                let current = self.store.meta(&photo.filename);
                if current != photo.meta {
                    photo.meta = current;
                    diverged = true;
                }
            }
        }

        let captured = self.view.capture(&self.store);
        self.store.load_folder(&ticket.folder, &photos);
        self.exif_cache.clear();
        self.view.rederive(&self.store, &self.filters, captured);
        if diverged {
            self.schedule_folder_write();
        }

        let (shown, total) = self.counts();
        tracing::info!(folder = %ticket.folder, shown, total, "Folder loaded");
        Ok(FolderLoad::Applied { shown, total })
    }

    /// Scan on the current thread and apply the result
    pub fn run_load(&mut self, ticket: FolderLoadTicket) -> Result<FolderLoad, AppError> {
        let result = self.backend.scan_folder(Path::new(&ticket.folder));
        self.complete_folder_load(ticket, result)
    }

    pub fn load_folder(&mut self, folder: &str) -> Result<FolderLoad, AppError> {
        let ticket = self.begin_folder_load(folder);
        self.run_load(ticket)
    }

    pub fn list_subfolders(&self, folder: &str) -> Result<Vec<FolderNode>, AppError> {
        Ok(self.backend.list_subfolders(Path::new(folder))?)
    }

    // ===== Workspaces =====

    /// Add a workspace (if new) and switch to it
    pub fn add_workspace(&mut self, path: &str) -> Result<FolderLoadTicket, AppError> {
        let path = path.trim();
        if path.is_empty() {
            return Err(AppError::Validation("Workspace path cannot be empty".into()));
        }
        if self.store.workspaces_mut().add(path) {
            tracing::info!("Added workspace {}", path);
        }
        self.switch_workspace(path)
            .ok_or_else(|| AppError::NotFound(format!("workspace {}", path)))
    }

    /// Make a workspace active, resetting filters and views, and start loading its root
    pub fn switch_workspace(&mut self, path: &str) -> Option<FolderLoadTicket> {
        if !self.store.workspaces().contains(path) {
            self.warn(format!("Unknown workspace {}", path));
            return None;
        }
        self.flush_kind(WriteKind::FolderMeta);
        self.store.workspaces_mut().set_active(path);
        self.reset_for_workspace();
        self.schedule_workspace_write();
        Some(self.begin_folder_load(path))
    }

    /// Remove a workspace; removing the active one moves to the first remaining
    pub fn remove_workspace(&mut self, path: &str) -> Option<FolderLoadTicket> {
        match self.store.workspaces_mut().remove(path) {
            Removal::Missing => {
                self.warn(format!("Unknown workspace {}", path));
                None
            }
            Removal::Removed => {
                self.schedule_workspace_write();
                None
            }
            Removal::ActiveChanged(next) => {
                self.flush_kind(WriteKind::FolderMeta);
                self.reset_for_workspace();
                self.schedule_workspace_write();
                tracing::info!("Removed active workspace {}, now {:?}", path, next);
                next.map(|n| self.begin_folder_load(&n))
            }
        }
    }

    fn reset_for_workspace(&mut self) {
        self.filters = FilterState::default();
        self.view.reset();
        self.store.clear();
        self.exif_cache.clear();
    }

    // ===== Metadata =====

    /// Merge a patch into a photo's metadata and report who must redraw
    pub fn update_meta(&mut self, filename: &str, patch: &MetaPatch) -> Option<MetaChange> {
        if patch.is_empty() {
            return None;
        }
        let meta = self.store.update_meta(filename, patch)?;
        if self.filters.constrains(patch) {
            self.view.mark_stale();
        }
        self.schedule_folder_write();

        let index = self.store.index_of(filename)?;
        let path = self.store.entry(index)?.path.clone();
        let in_album = self
            .albums
            .viewing()
            .is_some_and(|id| self.albums.is_member(&path, id));
        let views = self
            .view
            .affected_views(index, self.config.viewer.filmstrip_size, in_album);

        Some(MetaChange {
            filename: filename.to_string(),
            path,
            meta,
            views,
        })
    }

    fn update_current(&mut self, make_patch: impl FnOnce(&PhotoMeta) -> MetaPatch) -> Option<MetaChange> {
        let Some(current) = self.current_photo() else {
            tracing::debug!("No current photo to annotate");
            return None;
        };
        let filename = current.entry.filename.clone();
        let patch = make_patch(&current.meta);
        self.update_meta(&filename, &patch)
    }

    pub fn set_rating(&mut self, rating: u8) -> Option<MetaChange> {
        self.update_current(|_| MetaPatch::rating(rating))
    }

    pub fn set_label(&mut self, label: Label) -> Option<MetaChange> {
        self.update_current(|_| MetaPatch::label(label))
    }

    pub fn toggle_flag(&mut self) -> Option<MetaChange> {
        self.update_current(|m| MetaPatch::flagged(!m.flagged))
    }

    pub fn toggle_reject(&mut self) -> Option<MetaChange> {
        self.update_current(|m| MetaPatch::rejected(!m.rejected))
    }

    // ===== Filters =====

    pub fn set_filters(&mut self, filters: FilterState) {
        self.filters = filters;
        self.view.refilter(&self.store, &self.filters);
    }

    pub fn set_rating_filter(&mut self, rating: u8) {
        let filters = FilterState {
            rating: rating.min(MAX_RATING),
            ..self.filters
        };
        self.set_filters(filters);
    }

    pub fn set_label_filter(&mut self, label: Label) {
        let filters = FilterState { label, ..self.filters };
        self.set_filters(filters);
    }

    pub fn set_flagged_only(&mut self, flagged_only: bool) {
        let filters = FilterState {
            flagged_only,
            ..self.filters
        };
        self.set_filters(filters);
    }

    pub fn reset_filters(&mut self) {
        self.set_filters(FilterState::default());
    }

    // ===== Albums =====

    pub fn create_album(&mut self, name: &str) -> Result<AlbumId, AppError> {
        let id = self.albums.create(name)?;
        self.schedule_workspace_write();
        Ok(id)
    }

    pub fn delete_album(&mut self, id: AlbumId) -> bool {
        let deleted = self.albums.delete(id).is_some();
        if deleted {
            self.schedule_workspace_write();
        }
        deleted
    }

    /// Add a photo of the current folder to an album
    pub fn add_to_album(&mut self, path: &str, id: AlbumId) -> bool {
        if self.store.index_of_path(path).is_none() {
            tracing::warn!("Ignoring album add for {}: not in the current folder", path);
            return false;
        }
        match self.albums.add(path, id) {
            Ok(added) => {
                if !added {
                    tracing::debug!("{} already in album {}", path, id);
                }
                self.schedule_workspace_write();
                true
            }
            Err(e) => {
                tracing::warn!("Ignoring album add for {}: {}", path, e);
                false
            }
        }
    }

    pub fn remove_from_album(&mut self, path: &str, id: AlbumId) -> bool {
        let removed = self.albums.remove(path, id);
        if removed {
            self.schedule_workspace_write();
        }
        removed
    }

    pub fn open_album(&mut self, id: AlbumId) -> bool {
        self.albums.open(id)
    }

    pub fn close_album(&mut self) {
        self.albums.close();
    }

    // ===== Rename / EXIF / external =====

    /// Rename a photo of the current folder on disk and in every in-memory index.
    ///
    /// On any failure nothing changes.
    pub fn rename_photo(&mut self, old_name: &str, new_name: &str) -> Result<(), AppError> {
        let new_name = new_name.trim();
        app_fs::validate_new_name(new_name)?;

        let folder = self
            .store
            .folder()
            .ok_or_else(|| AppError::NotFound("no folder is open".into()))?
            .to_string();
        if !self.store.contains(old_name) {
            return Err(AppError::NotFound(old_name.to_string()));
        }
        if old_name == new_name {
            return Ok(());
        }
        if self.store.contains(new_name) {
            return Err(AppError::Validation(format!("{} already exists", new_name)));
        }

        if let Err(e) = self.backend.rename_photo(Path::new(&folder), old_name, new_name) {
            tracing::warn!("Rename {} -> {} failed: {}", old_name, new_name, e);
            return Err(e.into());
        }

        let (old_path, new_path) = self
            .store
            .rename(old_name, new_name)
            .ok_or_else(|| AppError::NotFound(old_name.to_string()))?;
        if self.albums.rename_member(&old_path, &new_path) {
            self.schedule_workspace_write();
        }
        if let Some(record) = self.exif_cache.remove(&old_path) {
            self.exif_cache.insert(new_path, record);
        }
        self.schedule_folder_write();

        tracing::info!("Renamed {} -> {}", old_name, new_name);
        Ok(())
    }

    /// EXIF for a photo; files without EXIF and failed reads both give `None`
    pub fn exif_for(&mut self, path: &str) -> Option<ExifRecord> {
        if let Some(record) = self.exif_cache.get(path) {
            return (!record.is_empty()).then(|| record.clone());
        }
        match self.backend.get_exif_data(Path::new(path)) {
            Ok(record) => {
                self.exif_cache.insert(path.to_string(), record.clone());
                (!record.is_empty()).then_some(record)
            }
            Err(e) => {
                tracing::debug!("No EXIF for {}: {}", path, e);
                None
            }
        }
    }

    pub fn image_url(&self, path: &str) -> String {
        self.backend.to_image_url(Path::new(path))
    }

    pub fn reveal(&mut self, path: &str) -> Result<(), AppError> {
        self.backend.reveal_in_file_manager(Path::new(path)).map_err(|e| {
            let message = format!("Cannot reveal {}: {}", path, e);
            self.warn(message.clone());
            AppError::External(message)
        })
    }

    // ===== Views =====

    pub fn set_view_mode(&mut self, mode: ViewMode) {
        self.view.set_mode(mode, &self.store, &self.filters);
    }

    pub fn toggle_cull_mode(&mut self) -> CullMode {
        let mode = self.view.cull_mode().toggled();
        self.view.set_cull_mode(mode);
        mode
    }

    pub fn open_viewer(&mut self, position: Option<usize>) -> bool {
        self.view.open_viewer(position, &self.store, &self.filters)
    }

    /// Escape: close the viewer if open, otherwise leave culling
    pub fn close_view(&mut self) -> bool {
        if self.view.close_viewer() {
            return true;
        }
        if self.view.mode() == ViewMode::Cull {
            self.set_view_mode(ViewMode::Grid);
            return true;
        }
        false
    }

    pub fn navigate(&mut self, nav: Nav) -> Option<usize> {
        self.view.navigate(nav, &self.store, &self.filters)
    }

    pub fn select(&mut self, position: Option<usize>) -> bool {
        self.view.select(position)
    }

    pub fn zoom_in(&mut self) -> bool {
        let v = &self.config.viewer;
        let (factor, min, max) = (v.zoom_in_factor, v.zoom_min, v.zoom_max);
        self.view
            .active_transform_mut()
            .map(|t| t.zoom_by(factor, min, max))
            .is_some()
    }

    pub fn zoom_out(&mut self) -> bool {
        let v = &self.config.viewer;
        let (factor, min, max) = (v.zoom_out_factor, v.zoom_min, v.zoom_max);
        self.view
            .active_transform_mut()
            .map(|t| t.zoom_by(factor, min, max))
            .is_some()
    }

    pub fn zoom_reset(&mut self) -> bool {
        self.view.active_transform_mut().map(|t| t.reset()).is_some()
    }

    pub fn pan_by(&mut self, dx: f32, dy: f32) -> bool {
        self.view.active_transform_mut().map(|t| t.pan_by(dx, dy)).is_some()
    }

    pub fn rotate_left(&mut self) -> bool {
        self.view.active_transform_mut().map(|t| t.rotate_left()).is_some()
    }

    pub fn rotate_right(&mut self) -> bool {
        self.view.active_transform_mut().map(|t| t.rotate_right()).is_some()
    }

    // ===== Derived reads =====

    pub fn photo_at(&self, position: usize) -> Option<PhotoView<'_>> {
        let entry = self.store.entry(self.view.entry_at(position)?)?;
        Some(PhotoView {
            position,
            entry,
            meta: self.store.meta(&entry.filename),
        })
    }

    /// Photo under the cursor of the view in front
    pub fn current_photo(&self) -> Option<PhotoView<'_>> {
        self.photo_at(self.view.current_position()?)
    }

    /// The filtered sequence, in order
    pub fn visible_photos(&self) -> Vec<PhotoView<'_>> {
        (0..self.view.len()).filter_map(|p| self.photo_at(p)).collect()
    }

    pub fn filmstrip(&self) -> Vec<PhotoView<'_>> {
        self.view
            .filmstrip(self.config.viewer.filmstrip_size)
            .filter_map(|p| self.photo_at(p))
            .collect()
    }

    /// Photos of the open album that are in the current folder
    pub fn album_detail(&self) -> Vec<PhotoView<'_>> {
        let Some(id) = self.albums.viewing() else {
            return Vec::new();
        };
        self.visible_photos()
            .into_iter()
            .filter(|p| self.albums.is_member(&p.entry.path, id))
            .collect()
    }

    /// `(shown, total)` photo counts
    pub fn counts(&self) -> (usize, usize) {
        (self.view.len(), self.store.len())
    }

    /// Status line text: the total, or `shown / total` while filtering
    pub fn count_label(&self) -> String {
        let (shown, total) = self.counts();
        if shown == total {
            format!("{} photos", total)
        } else {
            format!("{} / {} photos", shown, total)
        }
    }

    // ===== Persistence =====

    pub fn app_data(&self) -> AppData {
        let workspaces = self.store.workspaces();
        AppData {
            workspaces: workspaces.paths().to_vec(),
            active_workspace: workspaces.active().map(str::to_string),
            albums: self.albums.albums().to_vec(),
            album_members: self.albums.members().clone(),
        }
    }

    fn schedule_folder_write(&mut self) {
        if let Some((folder, meta)) = self.store.folder_snapshot() {
            let report = self
                .persistence
                .schedule_write(WritePayload::FolderMeta { folder, meta });
            self.record(report);
        }
    }

    fn schedule_workspace_write(&mut self) {
        let report = self
            .persistence
            .schedule_write(WritePayload::WorkspaceList(self.app_data()));
        self.record(report);
    }

    fn flush_kind(&mut self, kind: WriteKind) -> FlushReport {
        let report = self.persistence.flush_kind(kind);
        self.record(report)
    }

    fn record(&mut self, report: FlushReport) -> FlushReport {
        for (kind, error) in &report.failed {
            let what = match kind {
                WriteKind::FolderMeta => "photo metadata",
                WriteKind::WorkspaceList => "workspaces and albums",
            };
            self.notices
                .push(Notice::warning(format!("Could not save {}: {}", what, error)));
        }
        report
    }

    pub fn is_write_pending(&self, kind: WriteKind) -> bool {
        self.persistence.is_pending(kind)
    }

    pub fn next_flush_deadline(&self) -> Option<Instant> {
        self.persistence.next_deadline()
    }

    pub fn poll_persistence(&mut self) -> FlushReport {
        self.poll_persistence_at(Instant::now())
    }

    pub fn poll_persistence_at(&mut self, now: Instant) -> FlushReport {
        let report = self.persistence.poll_at(now);
        self.record(report)
    }

    /// Write everything pending now; used on shutdown
    pub fn flush_all(&mut self) -> FlushReport {
        let report = self.persistence.flush_all();
        self.record(report)
    }

    // ===== Commands =====

    /// Execute a parsed command against the current context
    pub fn execute(&mut self, cmd: &Command) -> Result<Option<MetaChange>, AppError> {
        let change = match cmd.id.as_str() {
            CommandId::NAV_NEXT_ITEM => {
                self.navigate(Nav::Next);
                None
            }
            CommandId::NAV_PREV_ITEM => {
                self.navigate(Nav::Prev);
                None
            }
            CommandId::NAV_GOTO => {
                self.navigate(Nav::GoTo(position_param(cmd)?));
                None
            }
            CommandId::NAV_SELECT => {
                self.select(Some(position_param(cmd)?));
                None
            }
            CommandId::VIEW_GRID => {
                self.set_view_mode(ViewMode::Grid);
                None
            }
            CommandId::VIEW_CULL => {
                self.set_view_mode(ViewMode::Cull);
                None
            }
            CommandId::VIEW_OPEN_VIEWER => {
                let position = match cmd.params.int_value {
                    Some(_) => Some(position_param(cmd)?),
                    None => None,
                };
                self.open_viewer(position);
                None
            }
            CommandId::VIEW_CLOSE => {
                self.close_view();
                None
            }
            CommandId::VIEW_CULL_MODE => {
                self.toggle_cull_mode();
                None
            }
            CommandId::VIEW_ZOOM_IN => {
                self.zoom_in();
                None
            }
            CommandId::VIEW_ZOOM_OUT => {
                self.zoom_out();
                None
            }
            CommandId::VIEW_ZOOM_RESET => {
                self.zoom_reset();
                None
            }
            CommandId::VIEW_ROTATE_LEFT => {
                self.rotate_left();
                None
            }
            CommandId::VIEW_ROTATE_RIGHT => {
                self.rotate_right();
                None
            }
            CommandId::META_RATE => self.set_rating(rating_param(cmd)?),
            CommandId::META_LABEL => self.set_label(label_param(cmd)?),
            CommandId::META_TOGGLE_FLAG => self.toggle_flag(),
            CommandId::META_TOGGLE_REJECT => self.toggle_reject(),
            CommandId::FILTER_RATING => {
                self.set_rating_filter(rating_param(cmd)?);
                None
            }
            CommandId::FILTER_LABEL => {
                self.set_label_filter(label_param(cmd)?);
                None
            }
            CommandId::FILTER_FLAGGED => {
                let on = match cmd.params.int_value {
                    Some(n) => n != 0,
                    None => !self.filters.flagged_only,
                };
                self.set_flagged_only(on);
                None
            }
            CommandId::FILTER_RESET => {
                self.reset_filters();
                None
            }
            CommandId::FILE_REVEAL => {
                let target = match self.current_photo() {
                    Some(p) => Some(p.entry.path.clone()),
                    None => self.store.folder().map(str::to_string),
                };
                if let Some(path) = target {
                    self.reveal(&path)?;
                }
                None
            }
            other => {
                tracing::warn!("Unknown command: {}", other);
                None
            }
        };
        Ok(change)
    }
}

fn int_param(cmd: &Command) -> Result<i64, AppError> {
    cmd.params
        .int_value
        .ok_or_else(|| AppError::Validation(format!("{} needs a number", cmd.id.as_str())))
}

fn position_param(cmd: &Command) -> Result<usize, AppError> {
    let n = int_param(cmd)?;
    usize::try_from(n)
        .map_err(|_| AppError::Validation(format!("{} is not a valid position", n)))
}

fn rating_param(cmd: &Command) -> Result<u8, AppError> {
    let n = int_param(cmd)?;
    if n < 0 {
        return Err(AppError::Validation(format!("{} is not a valid rating", n)));
    }
    Ok(n.min(MAX_RATING as i64) as u8)
}

fn label_param(cmd: &Command) -> Result<Label, AppError> {
    let value = cmd.params.string_value.as_deref().unwrap_or("");
    Ok(value.parse::<Label>()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Keymap;
    use crate::view_sync::CursorSlot;
    use app_fs::MemoryBackend;
    use ipc_proto::FolderMeta;

    fn seed(backend: &MemoryBackend, folder: &str, photos: &[(&str, u8)]) {
        let mut meta = FolderMeta::default();
        for (i, (name, rating)) in photos.iter().enumerate() {
            backend.add_photo(folder, name, 1_000 - i as u64);
            if *rating > 0 {
                meta.photos.insert(
                    name.to_string(),
                    PhotoMeta {
                        rating: *rating,
                        ..Default::default()
                    },
                );
            }
        }
        backend.set_folder_meta(folder, meta);
    }

    fn open(photos: &[(&str, u8)]) -> (Arc<MemoryBackend>, AppState) {
        let backend = Arc::new(MemoryBackend::new());
        seed(&backend, "/p", photos);
        let mut state = AppState::new(AppConfig::default(), backend.clone());
        let ticket = state.add_workspace("/p").unwrap();
        state.run_load(ticket).unwrap();
        (backend, state)
    }

    fn visible_names(state: &AppState) -> Vec<String> {
        state
            .visible_photos()
            .iter()
            .map(|p| p.entry.filename.clone())
            .collect()
    }

    fn current_name(state: &AppState) -> Option<String> {
        state.current_photo().map(|p| p.entry.filename.clone())
    }

    fn later(state: &AppState) -> Instant {
        Instant::now() + state.persistence.delay() + Duration::from_millis(1)
    }

    #[test]
    fn test_rating_filter_keeps_culling_view_until_reapplied() {
        let (_, mut state) = open(&[("A", 0), ("B", 5), ("C", 3)]);

        state.set_rating_filter(3);
        state.set_view_mode(ViewMode::Cull);
        assert_eq!(visible_names(&state), vec!["C"]);
        assert_eq!(current_name(&state).as_deref(), Some("C"));

        state.update_meta("B", &MetaPatch::rating(3)).unwrap();
        assert_eq!(visible_names(&state), vec!["C"]);
        assert_eq!(current_name(&state).as_deref(), Some("C"));
        assert_eq!(state.view().cursor(CursorSlot::Cull), Some(0));

        state.set_rating_filter(3);
        assert_eq!(visible_names(&state), vec!["B", "C"]);
        assert_eq!(current_name(&state).as_deref(), Some("C"));
    }

    #[test]
    fn test_removing_active_workspace_resets_to_remaining() {
        let backend = Arc::new(MemoryBackend::new());
        seed(&backend, "/p", &[("a", 2)]);
        seed(&backend, "/q", &[("x", 0), ("y", 0)]);
        let mut state = AppState::new(AppConfig::default(), backend.clone());

        let t = state.add_workspace("/p").unwrap();
        state.run_load(t).unwrap();
        let t = state.add_workspace("/q").unwrap();
        state.run_load(t).unwrap();
        state.set_flagged_only(true);
        state.set_view_mode(ViewMode::Cull);
        state.toggle_cull_mode();

        let ticket = state.remove_workspace("/q").unwrap();
        assert_eq!(state.workspaces().active(), Some("/p"));
        assert_eq!(*state.filters(), FilterState::default());
        assert_eq!(state.view().mode(), ViewMode::Grid);
        assert_eq!(state.view().cull_mode(), CullMode::Mark);
        assert_eq!(state.view().current_position(), None);

        assert_eq!(ticket.folder(), "/p");
        state.run_load(ticket).unwrap();
        assert_eq!(visible_names(&state), vec!["a"]);

        state.flush_all();
        let saved = backend.saved_data();
        assert_eq!(saved.workspaces, vec!["/p".to_string()]);
        assert_eq!(saved.active_workspace.as_deref(), Some("/p"));
    }

    #[test]
    fn test_removing_last_workspace_clears_folder() {
        let (_, mut state) = open(&[("a", 0)]);
        assert!(state.remove_workspace("/p").is_none());
        assert_eq!(state.workspaces().active(), None);
        assert!(state.store().folder().is_none());
        assert_eq!(state.counts(), (0, 0));
    }

    #[test]
    fn test_stale_scan_discarded() {
        let backend = Arc::new(MemoryBackend::new());
        seed(&backend, "/p", &[("a", 0)]);
        backend.add_photo("/p/sub", "deep.jpg", 5);
        let mut state = AppState::new(AppConfig::default(), backend.clone());
        let first = state.add_workspace("/p").unwrap();
        let second = state.begin_folder_load("/p/sub");

        let scan = backend.scan_folder(Path::new("/p")).unwrap();
        assert_eq!(state.complete_folder_load(first, Ok(scan)).unwrap(), FolderLoad::Stale);
        assert!(state.store().folder().is_none());
        assert_eq!(state.take_notices().len(), 1);

        let loaded = state.run_load(second).unwrap();
        assert_eq!(loaded, FolderLoad::Applied { shown: 1, total: 1 });
        assert_eq!(state.store().folder(), Some("/p/sub"));
    }

    #[test]
    fn test_scan_failure_keeps_previous_folder() {
        let (backend, mut state) = open(&[("a", 0)]);
        backend.set_fail_scans(true);

        assert!(matches!(state.load_folder("/p/sub"), Err(AppError::External(_))));
        assert_eq!(state.store().folder(), Some("/p"));
        assert_eq!(visible_names(&state), vec!["a"]);
        assert!(!state.take_notices().is_empty());
    }

    #[test]
    fn test_updates_debounced_into_one_snapshot() {
        let (backend, mut state) = open(&[("a", 0), ("b", 0)]);
        state.select(Some(0));

        state.set_rating(1);
        state.set_rating(4);
        state.set_label(Label::Purple);
        state.toggle_flag();
        assert_eq!(backend.folder_meta_writes(), 0);
        assert_eq!(state.store().meta("a").rating, 4);

        let when = later(&state);
        state.poll_persistence_at(when);
        assert_eq!(backend.folder_meta_writes(), 1);
        let saved = backend.folder_meta("/p").unwrap().photos["a"];
        assert_eq!(saved.rating, 4);
        assert_eq!(saved.label, Label::Purple);
        assert!(saved.flagged);
    }

    #[test]
    fn test_failed_write_keeps_memory_and_heals() {
        let (backend, mut state) = open(&[("a", 0), ("b", 0)]);
        state.flush_all();
        backend.set_fail_writes(true);

        state.update_meta("a", &MetaPatch::rating(5));
        let when = later(&state);
        let report = state.poll_persistence_at(when);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(state.store().meta("a").rating, 5);
        assert_eq!(state.take_notices().len(), 1);

        backend.set_fail_writes(false);
        state.update_meta("b", &MetaPatch::flagged(true));
        state.flush_all();
        let saved = backend.folder_meta("/p").unwrap();
        assert_eq!(saved.photos["a"].rating, 5);
        assert!(saved.photos["b"].flagged);
    }

    #[test]
    fn test_pending_folder_write_flushed_before_switch() {
        let backend = Arc::new(MemoryBackend::new());
        seed(&backend, "/p", &[("a", 0)]);
        backend.add_photo("/p/sub", "b.jpg", 1);
        let mut state = AppState::new(AppConfig::default(), backend.clone());
        let t = state.add_workspace("/p").unwrap();
        state.run_load(t).unwrap();

        state.update_meta("a", &MetaPatch::rating(2));
        state.load_folder("/p/sub").unwrap();

        assert_eq!(backend.folder_meta("/p").unwrap().photos["a"].rating, 2);
        assert!(!state.is_write_pending(WriteKind::FolderMeta));
    }

    #[test]
    fn test_reload_same_folder_keeps_edits() {
        let (backend, mut state) = open(&[("a", 0), ("b", 2)]);

        state.update_meta("a", &MetaPatch::rating(4));
        state.load_folder("/p").unwrap();
        assert_eq!(state.store().meta("a").rating, 4);
        assert_eq!(state.store().meta("b").rating, 2);

        state.flush_all();
        let saved = backend.folder_meta("/p").unwrap();
        assert_eq!(saved.photos["a"].rating, 4);
        assert_eq!(saved.photos["b"].rating, 2);
    }

    #[test]
    fn test_reload_after_failed_write_keeps_and_resaves_edits() {
        let (backend, mut state) = open(&[("a", 0)]);
        state.flush_all();
        backend.set_fail_writes(true);

        state.update_meta("a", &MetaPatch::rating(4));
        state.load_folder("/p").unwrap();
        assert_eq!(state.store().meta("a").rating, 4);
        assert!(state.is_write_pending(WriteKind::FolderMeta));
        assert!(!state.take_notices().is_empty());

        backend.set_fail_writes(false);
        state.flush_all();
        assert_eq!(backend.folder_meta("/p").unwrap().photos["a"].rating, 4);
    }

    #[test]
    fn test_opening_viewer_settles_stale_cull_set() {
        let (_, mut state) = open(&[("a", 0), ("b", 5), ("c", 3), ("d", 3)]);
        state.set_rating_filter(3);
        state.set_view_mode(ViewMode::Cull);
        assert_eq!(current_name(&state).as_deref(), Some("c"));

        state.update_meta("c", &MetaPatch::rating(1));
        assert_eq!(visible_names(&state), vec!["c", "d"]);

        assert!(state.open_viewer(None));
        assert_eq!(visible_names(&state), vec!["d"]);
        assert_eq!(current_name(&state).as_deref(), Some("d"));
    }

    #[test]
    fn test_meta_change_fan_out() {
        let (_, mut state) = open(&[("a", 0), ("b", 0)]);
        let album = state.create_album("Picks").unwrap();
        assert!(state.add_to_album("/p/b", album));
        state.open_album(album);
        state.set_view_mode(ViewMode::Cull);
        state.navigate(Nav::Next);

        let change = state.set_rating(3).unwrap();
        assert_eq!(change.filename, "b");
        assert!(change.views.contains(&ViewKind::Cull));
        assert!(change.views.contains(&ViewKind::Filmstrip));
        assert!(change.views.contains(&ViewKind::MetadataPanel));
        assert!(change.views.contains(&ViewKind::AlbumDetail));
        assert!(!change.views.contains(&ViewKind::Grid));
    }

    #[test]
    fn test_update_unknown_filename_is_noop() {
        let (_, mut state) = open(&[("a", 0)]);
        assert!(state.update_meta("ghost.jpg", &MetaPatch::rating(3)).is_none());
        assert!(!state.is_write_pending(WriteKind::FolderMeta));
    }

    #[test]
    fn test_rename_moves_everything() {
        let (backend, mut state) = open(&[("IMG_1.jpg", 4), ("IMG_3.jpg", 0)]);
        let album = state.create_album("Trip").unwrap();
        state.add_to_album("/p/IMG_1.jpg", album);
        backend.set_exif(
            "/p/IMG_1.jpg",
            ExifRecord {
                iso: Some(200),
                ..Default::default()
            },
        );
        assert!(state.exif_for("/p/IMG_1.jpg").is_some());
        state.select(Some(0));
        let before = state.store().meta("IMG_1.jpg");

        state.rename_photo("IMG_1.jpg", "IMG_2.jpg").unwrap();

        assert_eq!(state.store().meta("IMG_2.jpg"), before);
        assert!(!state.store().meta_map().contains_key("IMG_1.jpg"));
        assert_eq!(current_name(&state).as_deref(), Some("IMG_2.jpg"));
        assert!(state.albums().is_member("/p/IMG_2.jpg", album));
        assert!(!state.albums().is_member("/p/IMG_1.jpg", album));
        assert_eq!(state.exif_for("/p/IMG_2.jpg").and_then(|r| r.iso), Some(200));

        assert!(state.update_meta("IMG_1.jpg", &MetaPatch::rating(1)).is_none());
        assert!(!state.store().meta_map().contains_key("IMG_1.jpg"));

        state.flush_all();
        let saved = backend.folder_meta("/p").unwrap();
        assert_eq!(saved.photos["IMG_2.jpg"].rating, 4);
        assert!(!saved.photos.contains_key("IMG_1.jpg"));
    }

    #[test]
    fn test_rename_failure_changes_nothing() {
        let (backend, mut state) = open(&[("a.jpg", 2), ("b.jpg", 0)]);
        backend.set_fail_writes(true);

        assert!(state.rename_photo("a.jpg", "c.jpg").is_err());
        assert!(matches!(
            state.rename_photo("a.jpg", "b.jpg"),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            state.rename_photo("a.jpg", "bad/name.jpg"),
            Err(AppError::Validation(_))
        ));

        assert_eq!(state.store().meta("a.jpg").rating, 2);
        assert!(state.store().contains("a.jpg"));
        assert_eq!(backend.filenames("/p"), vec!["a.jpg".to_string(), "b.jpg".to_string()]);
    }

    #[test]
    fn test_delete_album_clears_detail_and_memberships() {
        let (backend, mut state) = open(&[("a", 0), ("b", 0)]);
        let album = state.create_album("Rejects").unwrap();
        state.add_to_album("/p/a", album);
        state.add_to_album("/p/b", album);
        state.open_album(album);
        assert_eq!(state.album_detail().len(), 2);

        assert!(state.delete_album(album));
        assert_eq!(state.albums().viewing(), None);
        assert!(state.album_detail().is_empty());
        assert!(state.albums().members().is_empty());

        state.flush_all();
        let saved = backend.saved_data();
        assert!(saved.albums.is_empty());
        assert!(saved.album_members.is_empty());
    }

    #[test]
    fn test_add_to_album_requires_current_photo() {
        let (_, mut state) = open(&[("a", 0)]);
        let album = state.create_album("Any").unwrap();

        assert!(!state.add_to_album("/elsewhere/x.jpg", album));
        assert!(!state.add_to_album("/p/a", AlbumId::new()));
        assert!(state.add_to_album("/p/a", album));
        assert!(state.add_to_album("/p/a", album));
        assert_eq!(state.albums().member_count(album), 1);
        assert!(matches!(state.create_album(" "), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_exif_absence_is_none() {
        let (backend, mut state) = open(&[("a", 0)]);
        assert!(state.exif_for("/p/a").is_none());

        backend.set_exif(
            "/p/a",
            ExifRecord {
                camera_make: Some("Fujifilm".into()),
                ..Default::default()
            },
        );
        // Empty result was cached for the folder session
        assert!(state.exif_for("/p/a").is_none());
        state.load_folder("/p").unwrap();
        assert_eq!(
            state.exif_for("/p/a").and_then(|r| r.camera_make),
            Some("Fujifilm".to_string())
        );
    }

    #[test]
    fn test_keymap_drives_commands() {
        let (_, mut state) = open(&[("a", 0), ("b", 0), ("c", 0)]);
        let keymap = Keymap::from_bindings(&state.config().keybindings);
        let press = |state: &mut AppState, key: &str| {
            let cmd = keymap.resolve(key).cloned().unwrap();
            state.execute(&cmd).unwrap()
        };

        press(&mut state, "C");
        assert_eq!(state.view().mode(), ViewMode::Cull);
        press(&mut state, "Right");
        let change = press(&mut state, "4").unwrap();
        assert_eq!(change.filename, "b");
        assert_eq!(change.meta.rating, 4);
        press(&mut state, "x");
        assert!(state.store().meta("b").rejected);

        press(&mut state, "]");
        assert_eq!(state.view().cull_transform().rotation, 90);
        press(&mut state, "Left");
        assert!(state.view().cull_transform().is_identity());

        press(&mut state, "Escape");
        assert_eq!(state.view().mode(), ViewMode::Grid);
    }

    #[test]
    fn test_execute_rejects_bad_params() {
        let (_, mut state) = open(&[("a", 0)]);
        state.select(Some(0));

        assert!(state.execute(&Command::new("meta.rate")).is_err());
        assert!(state.execute(&Command::new("meta.rate").with_int(-1)).is_err());
        assert!(state
            .execute(&Command::new("meta.label").with_string("teal"))
            .is_err());
        assert!(state.execute(&Command::new("nope.nothing")).unwrap().is_none());

        state.execute(&Command::new("meta.rate").with_int(9)).unwrap();
        assert_eq!(state.store().meta("a").rating, MAX_RATING);
    }

    #[test]
    fn test_filters_and_counts() {
        let (_, mut state) = open(&[("a", 3), ("b", 0), ("c", 3)]);
        assert_eq!(state.count_label(), "3 photos");

        state.execute(&Command::parse("filter.rating:3").unwrap()).unwrap();
        assert_eq!(state.counts(), (2, 3));
        assert_eq!(state.count_label(), "2 / 3 photos");

        state.execute(&Command::parse("filter.flagged").unwrap()).unwrap();
        assert_eq!(state.counts(), (0, 3));

        state.execute(&Command::parse("filter.reset").unwrap()).unwrap();
        assert_eq!(visible_names(&state), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_startup_restores_active_workspace() {
        let backend = Arc::new(MemoryBackend::with_data(AppData {
            workspaces: vec!["/p".into(), "/q".into()],
            active_workspace: Some("/q".into()),
            ..Default::default()
        }));
        seed(&backend, "/q", &[("z", 1)]);

        let mut state = AppState::new(AppConfig::default(), backend.clone());
        let ticket = state.startup_ticket().unwrap();
        assert_eq!(ticket.folder(), "/q");
        state.run_load(ticket).unwrap();
        assert_eq!(state.store().meta("z").rating, 1);

        let mut config = AppConfig::default();
        config.general.restore_last_workspace = false;
        let mut state = AppState::new(config, backend);
        assert!(state.startup_ticket().is_none());
    }

    #[test]
    fn test_viewer_zoom_clamped_and_reset_on_close() {
        let (_, mut state) = open(&[("a", 0), ("b", 0)]);
        assert!(!state.zoom_in());

        state.open_viewer(Some(1));
        for _ in 0..40 {
            state.zoom_in();
        }
        assert_eq!(state.view().viewer_transform().zoom, 8.0);
        state.pan_by(10.0, -4.0);

        assert!(state.close_view());
        assert!(state.view().viewer_transform().is_identity());
        assert_eq!(state.view().cursor(CursorSlot::Grid), Some(1));
    }
}
