use std::path::{Path, PathBuf};

/// Watch event after ignore filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// A path was created or modified.
    Changed(PathBuf),
    /// A path no longer exists.
    Removed(PathBuf),
}

impl WatchEvent {
    pub fn path(&self) -> &Path {
        match self {
            Self::Changed(path) | Self::Removed(path) => path,
        }
    }
}
