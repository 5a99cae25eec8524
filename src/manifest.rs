use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{CpLinkError, Result};
use crate::paths::find_closest_file;

pub const MANIFEST_FILE: &str = "package.json";

/// The parts of package.json that decide what gets published.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct PackageManifest {
    #[serde(default)]
    pub name: String,
    /// Publish allow-list. When absent, only `main` is published.
    pub files: Option<Vec<String>>,
    pub main: Option<String>,
}

impl PackageManifest {
    /// Read and parse a manifest. A manifest without a `name` is rejected, since
    /// the name decides where the package is installed.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let manifest: Self =
            serde_json::from_str(&contents).map_err(|err| CpLinkError::InvalidManifest {
                path: path.to_path_buf(),
                reason: err.to_string(),
            })?;

        if manifest.name.trim().is_empty() {
            return Err(CpLinkError::InvalidManifest {
                path: path.to_path_buf(),
                reason: "missing \"name\" field".to_string(),
            });
        }

        Ok(manifest)
    }
}

/// Locate the package.json that governs `cwd`.
pub fn find_package_manifest(cwd: &Path) -> Result<PathBuf> {
    find_closest_file(cwd, MANIFEST_FILE).ok_or_else(|| CpLinkError::ManifestNotFound {
        start: cwd.to_path_buf(),
    })
}
