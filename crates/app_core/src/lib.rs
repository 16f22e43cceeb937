//! Photo Culler core domain logic
//!
//! This crate contains:
//! - Application state management
//! - Photo metadata store and workspaces
//! - Filtering and view synchronization
//! - Albums
//! - Debounced persistence
//! - Command system
//! - Configuration
//! - Error types

pub mod album;
pub mod command;
pub mod config;
pub mod error;
pub mod filter;
pub mod persistence;
pub mod photo;
pub mod state;
pub mod store;
pub mod view_sync;
pub mod workspace;

pub use album::AlbumManager;
pub use command::{Command, CommandId, CommandParams, Keymap};
pub use config::{AppConfig, GeneralConfig, ViewerConfig};
pub use error::{AppError, Notice, NoticeLevel};
pub use filter::FilterState;
pub use persistence::{FlushReport, PersistenceGateway, WriteKind, WritePayload};
pub use photo::{MetaPatch, PhotoEntry, PhotoView};
pub use state::{AppState, FolderLoad, FolderLoadTicket, MetaChange};
pub use store::MetadataStore;
pub use view_sync::{CullMode, CursorSlot, Nav, ViewKind, ViewMode, ViewSyncCoordinator, ViewTransform};
pub use workspace::{Removal, WorkspaceSet};
