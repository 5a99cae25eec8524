use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::{CpLinkError, Result};
use crate::manifest::{MANIFEST_FILE, PackageManifest};
use crate::paths::is_contained;

/// Entry point npm assumes when a manifest declares neither `files` nor `main`.
const DEFAULT_MAIN: &str = "index.js";

/// List the files that make up the published package, relative to `package_root`.
///
/// package.json always comes first. Then each `files` entry in manifest order:
/// glob entries are expanded (matches sorted), literal entries are kept even when
/// they do not exist yet so the copier can report them. Without `files`, `main`
/// (or `index.js`) is the only entry. Duplicates keep their first position.
/// Absolute entries and entries reaching outside the package with `..` are
/// rejected as `InvalidPattern`.
pub fn list_package_files(
    package_root: &Path,
    manifest: &PackageManifest,
) -> Result<Vec<PathBuf>> {
    let mut out = vec![PathBuf::from(MANIFEST_FILE)];

    match &manifest.files {
        Some(entries) => {
            for entry in entries {
                expand_entry(package_root, entry, &mut out)?;
            }
        }
        None => {
            let main = manifest.main.as_deref().unwrap_or(DEFAULT_MAIN);
            out.push(normalize(main)?);
        }
    }

    let mut seen = HashSet::new();
    out.retain(|p| seen.insert(p.clone()));
    Ok(out)
}

fn expand_entry(package_root: &Path, entry: &str, out: &mut Vec<PathBuf>) -> Result<()> {
    let entry = entry.trim();
    if entry.is_empty() {
        return Ok(());
    }

    let rel = normalize(entry)?;
    if !is_glob(entry) {
        out.push(rel);
        return Ok(());
    }

    let invalid = |reason: String| CpLinkError::InvalidPattern {
        pattern: entry.to_string(),
        reason,
    };
    // Only the entry is a pattern; metacharacters in the root are literal.
    let root = glob::Pattern::escape(&package_root.to_string_lossy());
    let pattern = Path::new(&root).join(rel);
    let paths = glob::glob(&pattern.to_string_lossy()).map_err(|e| invalid(e.to_string()))?;

    let mut matched = Vec::new();
    for path in paths {
        let path = path.map_err(|e| invalid(e.to_string()))?;
        if let Ok(rel) = path.strip_prefix(package_root) {
            matched.push(rel.to_path_buf());
        }
    }
    matched.sort();
    out.extend(matched);
    Ok(())
}

fn is_glob(entry: &str) -> bool {
    entry.contains(['*', '?', '['])
}

fn normalize(entry: &str) -> Result<PathBuf> {
    let trimmed = entry.trim_start_matches("./").trim_end_matches('/');
    let rel = PathBuf::from(trimmed);
    if !is_contained(&rel) {
        return Err(CpLinkError::InvalidPattern {
            pattern: entry.to_string(),
            reason: "entries must be relative paths inside the package".to_string(),
        });
    }
    Ok(rel)
}
