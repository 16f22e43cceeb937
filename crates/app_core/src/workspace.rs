//! Workspace list and the active workspace pointer

/// Result of removing a workspace
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Removal {
    /// The path was not in the list
    Missing,
    /// Removed; the active workspace is unchanged
    Removed,
    /// Removed the active workspace; holds the new active one
    ActiveChanged(Option<String>),
}

/// Ordered, duplicate-free set of workspace root folders
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkspaceSet {
    paths: Vec<String>,
    active: Option<String>,
}

impl WorkspaceSet {
    /// Build from persisted data, repairing an active pointer that is not in the list
    pub fn from_data(workspaces: Vec<String>, active: Option<String>) -> Self {
        let mut set = Self::default();
        for path in workspaces {
            set.add(&path);
        }
        set.active = match active {
            Some(a) if set.contains(&a) => Some(a),
            _ => set.paths.first().cloned(),
        };
        set
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.iter().any(|p| p == path)
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Append a workspace; returns false when it is already present
    pub fn add(&mut self, path: &str) -> bool {
        if self.contains(path) {
            return false;
        }
        self.paths.push(path.to_string());
        true
    }

    /// Point at a listed workspace; returns false for unknown paths
    pub fn set_active(&mut self, path: &str) -> bool {
        if !self.contains(path) {
            return false;
        }
        self.active = Some(path.to_string());
        true
    }

    /// Remove a workspace; removing the active one falls back to the first remaining
    pub fn remove(&mut self, path: &str) -> Removal {
        let Some(pos) = self.paths.iter().position(|p| p == path) else {
            return Removal::Missing;
        };
        self.paths.remove(pos);

        if self.active.as_deref() == Some(path) {
            self.active = self.paths.first().cloned();
            Removal::ActiveChanged(self.active.clone())
        } else {
            Removal::Removed
        }
    }
}
