//! Executable discovery.

use std::path::PathBuf;

/// Finds external executables by name.
pub trait ToolLocator: Send + Sync {
    /// Returns the path of `name`, or `None` if it cannot be found.
    fn locate(&self, name: &str) -> Option<PathBuf>;
}

/// Probes a fixed list of install directories, then `PATH`.
#[derive(Debug, Clone)]
pub struct WellKnownLocator {
    search_dirs: Vec<PathBuf>,
    use_path: bool,
}

impl WellKnownLocator {
    pub fn new(search_dirs: Vec<PathBuf>) -> Self {
        Self {
            search_dirs,
            use_path: true,
        }
    }

    /// Only probe the configured directories.
    pub fn without_path_lookup(mut self) -> Self {
        self.use_path = false;
        self
    }
}

impl ToolLocator for WellKnownLocator {
    fn locate(&self, name: &str) -> Option<PathBuf> {
        let found = self
            .search_dirs
            .iter()
            .map(|dir| dir.join(name))
            .find(|candidate| candidate.is_file());

        if found.is_some() || !self.use_path {
            return found;
        }
        which::which(name).ok()
    }
}
