use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

/// Recursive watcher over the run root using OS-level file system
/// notifications. Raw change paths are forwarded to the supervisor loop;
/// classification happens there.
pub struct ChangeWatcher {
    // Held so the OS watch stays registered for the supervisor's lifetime.
    _watcher: RecommendedWatcher,
}

impl ChangeWatcher {
    pub fn start(root: &Path) -> Result<(Self, mpsc::UnboundedReceiver<PathBuf>)> {
        let (tx, rx) = mpsc::unbounded_channel();

        let mut watcher = RecommendedWatcher::new(
            move |res: std::result::Result<notify::Event, notify::Error>| {
                if let Ok(event) = res {
                    let is_change = matches!(
                        event.kind,
                        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                    );
                    if is_change {
                        for path in event.paths {
                            if tx.send(path).is_err() {
                                return; // Supervisor is gone
                            }
                        }
                    }
                }
            },
            notify::Config::default(),
        )
        .context("failed to initialize the file watcher")?;

        watcher
            .watch(root, RecursiveMode::Recursive)
            .with_context(|| format!("failed to watch {}", root.display()))?;

        Ok((Self { _watcher: watcher }, rx))
    }
}
