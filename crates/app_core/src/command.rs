//! Command system for user actions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Command identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommandId(pub String);

impl CommandId {
    pub fn new(id: &str) -> Self {
        Self(id.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    // Navigation commands
    pub const NAV_NEXT_ITEM: &'static str = "nav.next_item";
    pub const NAV_PREV_ITEM: &'static str = "nav.prev_item";
    pub const NAV_GOTO: &'static str = "nav.goto";
    pub const NAV_SELECT: &'static str = "nav.select";

    // View commands
    pub const VIEW_GRID: &'static str = "view.grid";
    pub const VIEW_CULL: &'static str = "view.cull";
    pub const VIEW_OPEN_VIEWER: &'static str = "view.open_viewer";
    pub const VIEW_CLOSE: &'static str = "view.close";
    pub const VIEW_CULL_MODE: &'static str = "view.cull_mode";
    pub const VIEW_ZOOM_IN: &'static str = "view.zoom_in";
    pub const VIEW_ZOOM_OUT: &'static str = "view.zoom_out";
    pub const VIEW_ZOOM_RESET: &'static str = "view.zoom_reset";
    pub const VIEW_ROTATE_LEFT: &'static str = "view.rotate_left";
    pub const VIEW_ROTATE_RIGHT: &'static str = "view.rotate_right";

    // Metadata commands (act on the current photo)
    pub const META_RATE: &'static str = "meta.rate";
    pub const META_LABEL: &'static str = "meta.label";
    pub const META_TOGGLE_FLAG: &'static str = "meta.toggle_flag";
    pub const META_TOGGLE_REJECT: &'static str = "meta.toggle_reject";

    // Filter commands
    pub const FILTER_RATING: &'static str = "filter.rating";
    pub const FILTER_LABEL: &'static str = "filter.label";
    pub const FILTER_FLAGGED: &'static str = "filter.flagged";
    pub const FILTER_RESET: &'static str = "filter.reset";

    // File commands
    pub const FILE_REVEAL: &'static str = "file.reveal";
}

/// Command with optional parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub id: CommandId,
    pub params: CommandParams,
}

/// Command parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandParams {
    pub int_value: Option<i64>,
    pub string_value: Option<String>,
}

impl Command {
    pub fn new(id: &str) -> Self {
        Self {
            id: CommandId::new(id),
            params: CommandParams::default(),
        }
    }

    pub fn with_int(mut self, value: i64) -> Self {
        self.params.int_value = Some(value);
        self
    }

    pub fn with_string(mut self, value: &str) -> Self {
        self.params.string_value = Some(value.to_string());
        self
    }

    /// Parse `"id"` or `"id:arg"`; numeric arguments become `int_value`
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        let (id, arg) = match input.split_once(':') {
            Some((id, arg)) => (id.trim(), Some(arg.trim())),
            None => (input, None),
        };
        if id.is_empty() || !id.contains('.') {
            return None;
        }

        let cmd = Command::new(id);
        Some(match arg {
            Some(a) => match a.parse::<i64>() {
                Ok(n) => cmd.with_int(n),
                Err(_) => cmd.with_string(a),
            },
            None => cmd,
        })
    }
}

/// Key name -> command lookup built from the configured bindings
#[derive(Debug, Clone, Default)]
pub struct Keymap {
    bindings: HashMap<String, Command>,
}

impl Keymap {
    pub fn from_bindings(bindings: &HashMap<String, Vec<String>>) -> Self {
        let mut map = HashMap::new();
        let mut ids: Vec<&String> = bindings.keys().collect();
        ids.sort();

        for id in ids {
            let Some(cmd) = Command::parse(id) else {
                tracing::warn!("Ignoring keybinding for malformed command {:?}", id);
                continue;
            };
            for key in &bindings[id] {
                if let Some(previous) = map.insert(key.clone(), cmd.clone()) {
                    tracing::warn!(
                        "Key {:?} bound to both {} and {}",
                        key,
                        previous.id.as_str(),
                        id
                    );
                }
            }
        }

        Self { bindings: map }
    }

    pub fn resolve(&self, key: &str) -> Option<&Command> {
        self.bindings.get(key)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[test]
    fn test_parse() {
        let cmd = Command::parse("meta.rate:3").unwrap();
        assert_eq!(cmd.id.as_str(), CommandId::META_RATE);
        assert_eq!(cmd.params.int_value, Some(3));

        let cmd = Command::parse("meta.label:red").unwrap();
        assert_eq!(cmd.params.string_value.as_deref(), Some("red"));

        let cmd = Command::parse(" nav.next_item ").unwrap();
        assert_eq!(cmd, Command::new(CommandId::NAV_NEXT_ITEM));

        assert!(Command::parse("").is_none());
        assert!(Command::parse("hello").is_none());
    }

    #[test]
    fn test_default_keymap() {
        let keymap = Keymap::from_bindings(&AppConfig::default().keybindings);

        assert_eq!(
            keymap.resolve("Right").map(|c| c.id.as_str()),
            Some(CommandId::NAV_NEXT_ITEM)
        );
        assert_eq!(keymap.resolve("3"), Some(&Command::new("meta.rate").with_int(3)));
        assert_eq!(
            keymap.resolve("g"),
            Some(&Command::new("meta.label").with_string("green"))
        );
        assert!(keymap.resolve("Q").is_none());
    }
}
