//! One run of cp-link: settings resolved from flags, environment and
//! `cp-link.toml`, then either a single cycle or a watch loop.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::cli::Cli;
use crate::config::CpLinkConfig;
use crate::coordinator::{CycleReport, RebuildCoordinator, RebuildRequest};
use crate::error::{CpLinkError, Result};
use crate::manifest::{PackageManifest, find_package_manifest};
use crate::paths::{install_dir, resolve_destination};
use crate::pipeline::PackagePipeline;
use crate::watcher::debounce::Debouncer;
use crate::watcher::event::WatchEvent;
use crate::watcher::rules::IgnoreRuleSet;
use crate::watcher::start_watcher;

pub const DEFAULT_BUILD_COMMAND: &str = "npm run build";
pub const DEFAULT_DEBOUNCE_MS: u64 = 100;

#[derive(Debug, Clone)]
pub struct Session {
    /// Working directory the session was started from.
    pub cwd: PathBuf,
    /// Directory holding package.json.
    pub package_root: PathBuf,
    pub package_name: String,
    /// Absolute destination project directory.
    pub destination: PathBuf,
    /// Where the package lands inside the destination.
    pub install_dir: PathBuf,
    /// `None` when building is skipped.
    pub build_command: Option<String>,
    pub debounce: Duration,
    /// Directory to watch; `None` for a one-shot copy.
    pub watch_dir: Option<PathBuf>,
    /// Extra ignore patterns from config.
    pub ignore: Vec<String>,
}

impl Session {
    /// Resolve settings for a run started in `cwd`.
    ///
    /// Flags win over `CP_LINK_DEST` (already folded into `cli` by clap), which
    /// wins over `cp-link.toml`, which wins over built-in defaults.
    pub fn resolve(cli: &Cli, cwd: &Path) -> Result<Self> {
        let manifest_path = find_package_manifest(cwd)?;
        let manifest = PackageManifest::load(&manifest_path)?;
        let package_root = manifest_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| cwd.to_path_buf());
        debug!("using manifest {}", manifest_path.display());

        let config = CpLinkConfig::load(&package_root);

        let raw_destination = cli
            .destination
            .clone()
            .or_else(|| config.destination.as_ref().map(PathBuf::from))
            .ok_or(CpLinkError::Usage)?;
        let destination = resolve_destination(&raw_destination, cwd);
        let install_dir = install_dir(&destination, &manifest.name);

        let build_command = if cli.skip_build {
            None
        } else {
            Some(
                cli.build
                    .clone()
                    .or(config.build_command)
                    .unwrap_or_else(|| DEFAULT_BUILD_COMMAND.to_string()),
            )
        };

        let debounce_ms = cli
            .debounce
            .or(config.debounce_ms)
            .unwrap_or(DEFAULT_DEBOUNCE_MS);

        let watch_dir = cli.watch.as_ref().map(|dir| match dir {
            Some(dir) => resolve_destination(dir, cwd),
            None => cwd.to_path_buf(),
        });

        Ok(Self {
            cwd: cwd.to_path_buf(),
            package_root,
            package_name: manifest.name,
            destination,
            install_dir,
            build_command,
            debounce: Duration::from_millis(debounce_ms),
            watch_dir,
            ignore: config.ignore.unwrap_or_default(),
        })
    }

    /// The request reported for every change in this session.
    pub fn request(&self) -> RebuildRequest {
        RebuildRequest {
            package_root: self.package_root.clone(),
            destination: self.destination.clone(),
            build_command: self.build_command.clone(),
        }
    }

    pub async fn run(&self) -> Result<()> {
        match &self.watch_dir {
            Some(dir) => self.watch(dir).await,
            None => self.run_once().await.map(|_| ()),
        }
    }

    /// Build (unless skipped) and copy once.
    pub async fn run_once(&self) -> Result<CycleReport> {
        let coordinator = RebuildCoordinator::new(PackagePipeline);
        let report = coordinator
            .run_cycle(self.request())
            .await?
            .unwrap_or_default();
        info!("Success.");
        Ok(report)
    }

    /// Copy now, then rebuild and copy after every burst of changes under
    /// `dir` until Ctrl-C. Failed cycles are logged and the watch continues.
    pub async fn watch(&self, dir: &Path) -> Result<()> {
        let dir = dir.canonicalize()?;
        let rules = IgnoreRuleSet::load(&self.cwd, &self.ignore)?;
        let (_watcher, mut events) = start_watcher(&dir, rules)?;
        let coordinator = RebuildCoordinator::new(PackagePipeline);
        let (mut debouncer, mut settled) = Debouncer::new(self.debounce);
        // Events carry canonical paths.
        let destination = self
            .destination
            .canonicalize()
            .unwrap_or_else(|_| self.destination.clone());
        let own_output = install_dir(&destination, &self.package_name);

        info!(
            "Watching {} for changes, copying {} into {} (Ctrl-C to stop)",
            dir.display(),
            self.package_name,
            self.install_dir.display()
        );
        coordinator.on_file_changed(self.request());

        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                event = events.recv() => {
                    let Some(event) = event else {
                        warn!("file watcher stopped");
                        break;
                    };
                    if is_own_output(event.path(), &destination, &own_output) {
                        continue;
                    }
                    match &event {
                        WatchEvent::Changed(path) => info!("File changed: {}", path.display()),
                        WatchEvent::Removed(path) => info!("File removed: {}", path.display()),
                    }
                    debouncer.schedule(self.request());
                }
                Some(request) = settled.recv() => {
                    if coordinator.on_file_changed(request).is_none() {
                        debug!("rebuild already in progress, it will run again when done");
                    }
                }
                _ = &mut shutdown => {
                    info!("Stopping.");
                    break;
                }
            }
        }

        debouncer.cancel();
        Ok(())
    }
}

/// True for paths the copy step itself writes: anything inside the install
/// directory, and the directories created on the way to it.
fn is_own_output(path: &Path, destination: &Path, own_output: &Path) -> bool {
    path.starts_with(own_output) || (path.starts_with(destination) && own_output.starts_with(path))
}
