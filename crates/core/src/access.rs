//! Folder access tokens.
//!
//! Hosts that sandbox filesystem access hand the engine an [`AccessScope`]
//! for the duration of a scan or process call. The engine only asks whether
//! a root is covered; granting and releasing access is the host's business.

use std::path::{Path, PathBuf};

/// Proof that the caller currently holds access to some set of folders.
pub trait AccessScope: Send + Sync {
    /// Whether `path` may be read or written under this scope.
    fn covers(&self, path: &Path) -> bool;
}

/// Scope that covers every path. Used when the host has no sandbox.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnrestrictedAccess;

impl AccessScope for UnrestrictedAccess {
    fn covers(&self, _path: &Path) -> bool {
        true
    }
}

/// Scope limited to an explicit list of granted roots.
#[derive(Debug, Clone, Default)]
pub struct GrantedFolders {
    roots: Vec<PathBuf>,
}

impl GrantedFolders {
    pub fn new(roots: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            roots: roots.into_iter().collect(),
        }
    }

    pub fn grant(&mut self, root: PathBuf) {
        self.roots.push(root);
    }
}

impl AccessScope for GrantedFolders {
    fn covers(&self, path: &Path) -> bool {
        self.roots.iter().any(|root| path.starts_with(root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unrestricted_covers_everything() {
        assert!(UnrestrictedAccess.covers(Path::new("/anything")));
    }

    #[test]
    fn test_granted_folders_cover_descendants_only() {
        let mut scope = GrantedFolders::new([PathBuf::from("/photos")]);
        assert!(scope.covers(Path::new("/photos")));
        assert!(scope.covers(Path::new("/photos/2020/a.jpg")));
        assert!(!scope.covers(Path::new("/photoshop")));
        assert!(!scope.covers(Path::new("/sorted")));

        scope.grant(PathBuf::from("/sorted"));
        assert!(scope.covers(Path::new("/sorted")));
    }
}
