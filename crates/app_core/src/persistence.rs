//! Debounced snapshot writes to the backend
//!
//! Each write kind has one pending slot holding the latest full snapshot and
//! a deadline. Scheduling again replaces the payload and pushes the deadline
//! back. Nothing here touches in-memory state, so a failed write is only
//! reported; the next flush carries the same change because every payload
//! is a full snapshot.

use crate::error::AppError;
use app_fs::PhotoBackend;
use ipc_proto::{AppData, FolderMeta};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WriteKind {
    FolderMeta,
    WorkspaceList,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WritePayload {
    FolderMeta { folder: String, meta: FolderMeta },
    WorkspaceList(AppData),
}

impl WritePayload {
    pub fn kind(&self) -> WriteKind {
        match self {
            WritePayload::FolderMeta { .. } => WriteKind::FolderMeta,
            WritePayload::WorkspaceList(_) => WriteKind::WorkspaceList,
        }
    }
}

#[derive(Debug)]
struct PendingWrite {
    payload: WritePayload,
    deadline: Instant,
}

/// Outcome of a flush
#[derive(Debug, Default, PartialEq)]
pub struct FlushReport {
    pub written: Vec<WriteKind>,
    pub failed: Vec<(WriteKind, String)>,
}

impl FlushReport {
    pub fn is_empty(&self) -> bool {
        self.written.is_empty() && self.failed.is_empty()
    }

    fn merge(&mut self, other: FlushReport) {
        self.written.extend(other.written);
        self.failed.extend(other.failed);
    }
}

pub struct PersistenceGateway {
    backend: Arc<dyn PhotoBackend>,
    delay: Duration,
    pending: HashMap<WriteKind, PendingWrite>,
}

impl PersistenceGateway {
    pub fn new(backend: Arc<dyn PhotoBackend>, delay: Duration) -> Self {
        Self {
            backend,
            delay,
            pending: HashMap::new(),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn is_pending(&self, kind: WriteKind) -> bool {
        self.pending.contains_key(&kind)
    }

    /// Payload waiting in a slot
    pub fn pending_payload(&self, kind: WriteKind) -> Option<&WritePayload> {
        self.pending.get(&kind).map(|p| &p.payload)
    }

    /// Earliest deadline among pending writes
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|p| p.deadline).min()
    }

    pub fn schedule_write(&mut self, payload: WritePayload) -> FlushReport {
        self.schedule_write_at(payload, Instant::now())
    }

    /// Replace the slot for the payload's kind and restart its timer.
    ///
    /// A pending sidecar for a different folder is written first, since the
    /// new snapshot cannot carry another folder's edits.
    pub fn schedule_write_at(&mut self, payload: WritePayload, now: Instant) -> FlushReport {
        let mut report = FlushReport::default();

        if let WritePayload::FolderMeta { folder, .. } = &payload {
            let other_folder = matches!(
                self.pending_payload(WriteKind::FolderMeta),
                Some(WritePayload::FolderMeta { folder: pending, .. }) if pending != folder
            );
            if other_folder {
                report.merge(self.flush_kind(WriteKind::FolderMeta));
            }
        }

        let kind = payload.kind();
        tracing::trace!(?kind, "Write scheduled");
        self.pending.insert(
            kind,
            PendingWrite {
                payload,
                deadline: now + self.delay,
            },
        );
        report
    }

    pub fn poll(&mut self) -> FlushReport {
        self.poll_at(Instant::now())
    }

    /// Write every slot whose deadline has passed
    pub fn poll_at(&mut self, now: Instant) -> FlushReport {
        let mut due: Vec<WriteKind> = self
            .pending
            .iter()
            .filter(|(_, p)| p.deadline <= now)
            .map(|(k, _)| *k)
            .collect();
        due.sort();

        let mut report = FlushReport::default();
        for kind in due {
            report.merge(self.flush_kind(kind));
        }
        report
    }

    /// Write one slot now, regardless of its deadline
    pub fn flush_kind(&mut self, kind: WriteKind) -> FlushReport {
        let mut report = FlushReport::default();
        let Some(pending) = self.pending.remove(&kind) else {
            return report;
        };

        match self.write(&pending.payload) {
            Ok(()) => report.written.push(kind),
            Err(e) => {
                tracing::warn!(?kind, "Save failed, keeping in-memory state: {}", e);
                report.failed.push((kind, e.to_string()));
            }
        }
        report
    }

    /// Write every slot now
    pub fn flush_all(&mut self) -> FlushReport {
        let mut report = FlushReport::default();
        report.merge(self.flush_kind(WriteKind::FolderMeta));
        report.merge(self.flush_kind(WriteKind::WorkspaceList));
        report
    }

    fn write(&self, payload: &WritePayload) -> Result<(), AppError> {
        let result = match payload {
            WritePayload::FolderMeta { folder, meta } => {
                self.backend.save_folder_meta(Path::new(folder), meta)
            }
            WritePayload::WorkspaceList(data) => self.backend.save_data(data),
        };
        result.map_err(|e| AppError::Persistence(e.to_string()))?;
        tracing::debug!(kind = ?payload.kind(), "Saved");
        Ok(())
    }
}
