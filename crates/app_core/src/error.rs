//! Application error types

use thiserror::Error;

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    // ===== Recoverable (rejected or reported, state untouched) =====
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Could not save: {0}")]
    Persistence(String),

    #[error("Backend call failed: {0}")]
    External(String),

    // ===== Fatal at startup =====
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Is this error recoverable?
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AppError::Validation(_)
                | AppError::NotFound(_)
                | AppError::Persistence(_)
                | AppError::External(_)
        )
    }

    /// Is this a fatal error?
    pub fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }

    /// Get a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(msg) => msg.clone(),
            AppError::NotFound(what) => format!("{} no longer exists", what),
            AppError::Persistence(msg) => format!("Changes kept in memory, save failed: {}", msg),
            AppError::External(msg) => msg.clone(),
            _ => self.to_string(),
        }
    }
}

impl From<app_fs::FsError> for AppError {
    fn from(e: app_fs::FsError) -> Self {
        match e {
            app_fs::FsError::InvalidName(msg) => AppError::Validation(format!("Invalid name: {}", msg)),
            app_fs::FsError::AlreadyExists(p) => AppError::Validation(format!("Already exists: {}", p)),
            other => AppError::External(other.to_string()),
        }
    }
}

impl From<ipc_proto::ProtoError> for AppError {
    fn from(e: ipc_proto::ProtoError) -> Self {
        AppError::Validation(e.to_string())
    }
}

/// Severity of a notice shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
}

/// Non-blocking message for the status area
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fs_error_mapping() {
        let e: AppError = app_fs::FsError::InvalidName("a/b".into()).into();
        assert!(matches!(e, AppError::Validation(_)));

        let e: AppError = app_fs::FsError::NotFound("/gone".into()).into();
        assert!(matches!(e, AppError::External(_)));
        assert!(e.is_recoverable());
    }

    #[test]
    fn test_fatal() {
        assert!(AppError::Config("bad toml".into()).is_fatal());
        assert!(!AppError::Persistence("disk full".into()).is_fatal());
    }
}
