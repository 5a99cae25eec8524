pub mod debounce;
pub mod event;
pub mod rules;

use std::path::Path;

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc as tokio_mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::error::Result;
use event::WatchEvent;
use rules::IgnoreRuleSet;

/// Handle to a running watcher. Dropping it stops watching.
pub struct WatcherHandle {
    /// Keep alive: dropping the watcher stops the OS notifications.
    _watcher: RecommendedWatcher,
    /// The bridge task forwarding events from the std channel to the tokio channel.
    _bridge_task: JoinHandle<()>,
}

/// Start a recursive watcher on `watch_root`.
///
/// Returns a `WatcherHandle` (must be kept alive) and a tokio mpsc receiver
/// that yields every changed path not excluded by `rules`. Access events are
/// dropped since reading a file does not change the package.
pub fn start_watcher(
    watch_root: &Path,
    rules: IgnoreRuleSet,
) -> Result<(WatcherHandle, tokio_mpsc::Receiver<WatchEvent>)> {
    let (std_tx, std_rx) = std::sync::mpsc::channel::<notify::Result<notify::Event>>();

    let mut watcher = notify::recommended_watcher(move |res| {
        let _ = std_tx.send(res);
    })?;
    watcher.watch(watch_root, RecursiveMode::Recursive)?;

    let (tokio_tx, tokio_rx) = tokio_mpsc::channel::<WatchEvent>(256);

    // Bridge: spawn_blocking to receive from std channel, filter, forward to tokio
    let bridge_task = tokio::task::spawn_blocking(move || {
        while let Ok(result) = std_rx.recv() {
            match result {
                Ok(event) => {
                    if matches!(event.kind, EventKind::Access(_)) {
                        continue;
                    }
                    for path in event.paths {
                        if let Some(watch_event) = classify_event(&path, &rules)
                            && tokio_tx.blocking_send(watch_event).is_err()
                        {
                            return; // receiver dropped, shutdown
                        }
                    }
                }
                Err(err) => {
                    warn!("[watcher] error: {err}");
                }
            }
        }
    });

    Ok((
        WatcherHandle {
            _watcher: watcher,
            _bridge_task: bridge_task,
        },
        tokio_rx,
    ))
}

/// Classify a changed path, or `None` if the ignore rules exclude it.
fn classify_event(path: &Path, rules: &IgnoreRuleSet) -> Option<WatchEvent> {
    if rules.is_ignored(path) {
        return None;
    }

    if path.exists() {
        Some(WatchEvent::Changed(path.to_path_buf()))
    } else {
        Some(WatchEvent::Removed(path.to_path_buf()))
    }
}
