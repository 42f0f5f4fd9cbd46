use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

/// Events sent from the file watcher to the watch loop.
#[derive(Debug)]
pub enum VaultEvent {
    /// One or more markdown documents were created, modified, renamed or removed.
    Changed(Vec<PathBuf>),
}

/// Recursive watcher over a vault's markdown documents.
pub struct VaultWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<VaultEvent>,
}

impl VaultWatcher {
    /// Start watching everything under `root`.
    pub fn start(root: &Path) -> Result<Self, notify::Error> {
        let (tx, rx) = mpsc::channel();
        let root_owned = root.to_path_buf();

        let mut watcher = RecommendedWatcher::new(
            move |result: Result<Event, notify::Error>| {
                let event = match result {
                    Ok(e) => e,
                    Err(e) => {
                        tracing::warn!(error = %e, "watch error");
                        return;
                    }
                };

                match event.kind {
                    EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) => {}
                    _ => return,
                }

                let relevant: Vec<PathBuf> = event
                    .paths
                    .into_iter()
                    .filter(|p| is_relevant(&root_owned, p))
                    .collect();

                if !relevant.is_empty() {
                    let _ = tx.send(VaultEvent::Changed(relevant));
                }
            },
            Config::default(),
        )?;

        watcher.watch(root, RecursiveMode::Recursive)?;
        Ok(VaultWatcher {
            _watcher: watcher,
            rx,
        })
    }

    /// Wait up to `timeout` for the next event.
    pub fn next_timeout(&self, timeout: Duration) -> Option<VaultEvent> {
        self.rx.recv_timeout(timeout).ok()
    }
}

/// Markdown files inside `root`, outside any dot-directory.
fn is_relevant(root: &Path, path: &Path) -> bool {
    let Ok(rel) = path.strip_prefix(root) else {
        return false;
    };
    if rel
        .components()
        .any(|c| c.as_os_str().to_str().is_none_or(|s| s.starts_with('.')))
    {
        return false;
    }
    path.extension().and_then(|e| e.to_str()) == Some("md")
}
