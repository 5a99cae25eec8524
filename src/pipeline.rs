use std::path::Path;

use tracing::info;

use crate::build::BuildRunner;
use crate::copier::{CopySummary, copy_package};
use crate::coordinator::{CycleSteps, RebuildRequest};
use crate::enumerate::list_package_files;
use crate::error::Result;
use crate::manifest::{MANIFEST_FILE, PackageManifest};
use crate::paths::install_dir;

/// The real cycle: run the build command, then copy the published files.
#[derive(Debug, Default, Clone, Copy)]
pub struct PackagePipeline;

impl CycleSteps for PackagePipeline {
    async fn build(&self, request: &RebuildRequest) -> Result<()> {
        match &request.build_command {
            Some(command) => BuildRunner::new(command.clone()).run(&request.package_root).await,
            None => Ok(()),
        }
    }

    async fn copy(&self, request: &RebuildRequest) -> Result<CopySummary> {
        let package_root = request.package_root.clone();
        let destination = request.destination.clone();
        let summary = tokio::task::spawn_blocking(move || {
            copy_published_files(&package_root, &destination)
        })
        .await
        .map_err(std::io::Error::from)??;
        Ok(summary)
    }
}

/// Copy the package rooted at `package_root` into `destination`'s node_modules.
///
/// The manifest is re-read on every call so edits to `name` or `files` take
/// effect on the next cycle.
pub fn copy_published_files(package_root: &Path, destination: &Path) -> Result<CopySummary> {
    let manifest = PackageManifest::load(&package_root.join(MANIFEST_FILE))?;
    let target = install_dir(destination, &manifest.name);
    let files = list_package_files(package_root, &manifest)?;

    info!("Copying {} into {}", manifest.name, target.display());
    copy_package(package_root, &files, &target)
}
