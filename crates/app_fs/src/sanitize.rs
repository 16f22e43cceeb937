//! Photo filename validation for renames

use crate::{FsError, Result};

/// Names Windows refuses regardless of extension
const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL",
    "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8", "COM9",
    "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Characters that cannot appear in a single path component
const FORBIDDEN_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Nearest usable name, offered when a rename is refused
fn suggest_filename(name: &str) -> String {
    let mut result: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_control() || FORBIDDEN_CHARS.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect();

    let base_name = result.to_uppercase();
    let base_name = base_name.split('.').next().unwrap_or("");
    if RESERVED_NAMES.contains(&base_name) {
        result = format!("_{}", result);
    }

    while result.ends_with('.') || result.ends_with(' ') {
        result.pop();
    }

    if result.is_empty() {
        result = "_unnamed".to_string();
    }

    result
}

/// Check whether a name is usable as a photo filename
pub fn is_valid_filename(name: &str) -> bool {
    if name.is_empty() || name == "." || name == ".." {
        return false;
    }

    if name
        .chars()
        .any(|c| c.is_control() || FORBIDDEN_CHARS.contains(&c))
    {
        return false;
    }

    let name_upper = name.to_uppercase();
    let base_name = name_upper.split('.').next().unwrap_or("");
    if RESERVED_NAMES.contains(&base_name) {
        return false;
    }

    !(name.ends_with('.') || name.ends_with(' ') || name.starts_with(' '))
}

/// Validate a rename target, suggesting a sanitized alternative on failure
pub fn validate_new_name(name: &str) -> Result<()> {
    if is_valid_filename(name) {
        Ok(())
    } else {
        Err(FsError::InvalidName(format!(
            "{:?} (try {:?})",
            name,
            suggest_filename(name)
        )))
    }
}
