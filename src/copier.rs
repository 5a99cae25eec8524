use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{CpLinkError, Result};
use crate::paths::is_contained;

/// Totals for one copy pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CopySummary {
    /// Manifest entries copied.
    pub entries: usize,
    /// Individual files written (directories count their contents).
    pub files: u64,
}

/// Copy every entry of `files` from `package_root` into `install_dir`, in order.
///
/// The first failure aborts the pass; entries copied before it stay in place.
pub fn copy_package(
    package_root: &Path,
    files: &[PathBuf],
    install_dir: &Path,
) -> Result<CopySummary> {
    let mut summary = CopySummary::default();

    for rel in files {
        let written = copy_entry(package_root, rel, install_dir)?;
        info!("Copied \"{}\" to \"{}\"", rel.display(), install_dir.join(rel).display());
        summary.entries += 1;
        summary.files += written;
    }

    Ok(summary)
}

/// Copy one file or directory tree. Returns the number of files written.
///
/// `rel` must stay inside both roots. The source must exist when this is
/// called. Parent directories of the
/// destination are created. Directory trees are copied without their `.git`
/// metadata; gitignore rules are not applied since build output is usually
/// ignored by git.
pub fn copy_entry(package_root: &Path, rel: &Path, install_dir: &Path) -> Result<u64> {
    if !is_contained(rel) {
        return Err(CpLinkError::PathOutsidePackage {
            path: rel.to_path_buf(),
        });
    }
    let src = package_root.join(rel);
    let dest = install_dir.join(rel);

    let metadata = match fs::metadata(&src) {
        Ok(m) => m,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(CpLinkError::SourceFileMissing { path: src });
        }
        Err(source) => return Err(CpLinkError::CopyFailed { from: src, to: dest, source }),
    };

    if metadata.is_dir() {
        copy_tree(&src, &dest)
    } else {
        copy_file(&src, &dest)?;
        Ok(1)
    }
}

fn copy_tree(src: &Path, dest: &Path) -> Result<u64> {
    let mut written = 0;

    let walker = ignore::WalkBuilder::new(src)
        .standard_filters(false)
        .filter_entry(|entry| entry.file_name() != ".git")
        .build();

    for result in walker {
        let entry = result.map_err(|err| CpLinkError::CopyFailed {
            from: src.to_path_buf(),
            to: dest.to_path_buf(),
            source: err
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::other("directory walk failed")),
        })?;

        let path = entry.path();
        let Ok(rel) = path.strip_prefix(src) else {
            continue;
        };
        let target = dest.join(rel);

        if entry.file_type().is_some_and(|ft| ft.is_dir()) {
            fs::create_dir_all(&target).map_err(|source| CpLinkError::CopyFailed {
                from: path.to_path_buf(),
                to: target.clone(),
                source,
            })?;
            continue;
        }

        copy_file(path, &target)?;
        written += 1;
    }

    Ok(written)
}

fn copy_file(src: &Path, dest: &Path) -> Result<()> {
    let failed = |source| CpLinkError::CopyFailed {
        from: src.to_path_buf(),
        to: dest.to_path_buf(),
        source,
    };

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(failed)?;
    }
    fs::copy(src, dest).map_err(failed)?;
    debug!("copied {} -> {}", src.display(), dest.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tmp() -> TempDir {
        tempfile::tempdir().expect("tempdir")
    }

    #[test]
    fn test_copy_entry_file_creates_parents() {
        let src = tmp();
        let dest = tmp();
        fs::create_dir_all(src.path().join("dist")).unwrap();
        fs::write(src.path().join("dist").join("index.js"), "module.exports = 1;").unwrap();

        let install = dest.path().join("node_modules").join("pkg");
        let written = copy_entry(src.path(), Path::new("dist/index.js"), &install).unwrap();

        assert_eq!(written, 1);
        assert_eq!(
            fs::read_to_string(install.join("dist").join("index.js")).unwrap(),
            "module.exports = 1;"
        );
    }

    #[test]
    fn test_copy_entry_directory_is_recursive_and_skips_git() {
        let src = tmp();
        let dest = tmp();
        let dist = src.path().join("dist");
        fs::create_dir_all(dist.join("nested")).unwrap();
        fs::create_dir_all(dist.join(".git")).unwrap();
        fs::write(dist.join("a.js"), "a").unwrap();
        fs::write(dist.join("nested").join("b.js"), "b").unwrap();
        fs::write(dist.join(".git").join("HEAD"), "ref").unwrap();
        // gitignore must not hide build output from the copy
        fs::write(dist.join(".gitignore"), "*.js\n").unwrap();

        let written = copy_entry(src.path(), Path::new("dist"), dest.path()).unwrap();

        assert_eq!(written, 3);
        assert!(dest.path().join("dist/a.js").exists());
        assert!(dest.path().join("dist/nested/b.js").exists());
        assert!(dest.path().join("dist/.gitignore").exists());
        assert!(!dest.path().join("dist/.git").exists());
    }

    #[test]
    fn test_copy_entry_missing_source() {
        let src = tmp();
        let dest = tmp();

        let err = copy_entry(src.path(), Path::new("dist"), dest.path()).unwrap_err();
        match err {
            CpLinkError::SourceFileMissing { path } => assert_eq!(path, src.path().join("dist")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_copy_entry_rejects_absolute_path() {
        let src = tmp();
        let dest = tmp();
        let index = src.path().join("index.js");
        fs::write(&index, "important contents").unwrap();

        let install = dest.path().join("node_modules").join("pkg");
        let err = copy_entry(src.path(), &index, &install).unwrap_err();

        assert!(matches!(err, CpLinkError::PathOutsidePackage { .. }), "{err}");
        assert_eq!(fs::read_to_string(&index).unwrap(), "important contents");
    }

    #[test]
    fn test_copy_entry_rejects_parent_components() {
        let src = tmp();
        let dest = tmp();
        let lib = src.path().join("lib");
        fs::create_dir(&lib).unwrap();
        fs::write(src.path().join("secret.txt"), "s").unwrap();

        let install = dest.path().join("node_modules").join("pkg");
        let err = copy_entry(&lib, Path::new("../secret.txt"), &install).unwrap_err();

        assert!(matches!(err, CpLinkError::PathOutsidePackage { .. }), "{err}");
        assert!(!dest.path().join("node_modules").join("secret.txt").exists());
    }

    #[test]
    fn test_copy_package_copies_all_and_stops_on_missing() {
        let src = tmp();
        let dest = tmp();
        fs::write(src.path().join("package.json"), "{}").unwrap();
        fs::write(src.path().join("index.js"), "").unwrap();

        let summary = copy_package(
            src.path(),
            &[PathBuf::from("package.json"), PathBuf::from("index.js")],
            dest.path(),
        )
        .unwrap();
        assert_eq!(summary, CopySummary { entries: 2, files: 2 });

        let err = copy_package(
            src.path(),
            &[PathBuf::from("missing.js"), PathBuf::from("index.js")],
            &dest.path().join("second"),
        )
        .unwrap_err();
        assert!(matches!(err, CpLinkError::SourceFileMissing { .. }));
        assert!(!dest.path().join("second").join("index.js").exists());
    }
}
