use std::time::{Duration, Instant};

use crate::io::store::{DocumentStore, FsStore};
use crate::io::watcher::{VaultEvent, VaultWatcher};
use crate::model::config::WatchConfig;
use crate::sync::debounce::Debouncer;
use crate::sync::engine::{Engine, SyncError};

/// Idle poll interval when nothing is pending
const IDLE_WAIT: Duration = Duration::from_millis(250);

/// Which pass a `fire` ran
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fired {
    Reconcile,
    Refresh,
}

/// Turns a stream of change notifications into debounced passes.
///
/// Edits to the aggregate schedule a reconciliation; edits anywhere else
/// schedule a refresh. A reconciliation re-collects the vault too, so it
/// absorbs any refresh still waiting.
#[derive(Debug, Clone)]
pub struct WatchLoop {
    aggregate: Debouncer,
    corpus: Debouncer,
}

impl WatchLoop {
    pub fn new(config: &WatchConfig) -> Self {
        WatchLoop {
            aggregate: Debouncer::new(Duration::from_millis(config.aggregate_debounce_ms)),
            corpus: Debouncer::new(Duration::from_millis(config.corpus_debounce_ms)),
        }
    }

    /// Record changed vault-relative paths.
    pub fn observe<S: DocumentStore>(
        &mut self,
        engine: &mut Engine<S>,
        paths: &[String],
        now: Instant,
    ) {
        for path in paths {
            if engine.is_own_write(path, now) {
                tracing::debug!(path = %path, "ignoring own write");
                continue;
            }
            if engine.is_aggregate(path) {
                self.aggregate.touch(now);
            } else if !engine.settings().is_excluded(path) {
                self.corpus.touch(now);
            }
        }
    }

    /// Run whichever pass is due. Pass errors are logged and the loop goes on.
    pub fn fire<S: DocumentStore>(&mut self, engine: &mut Engine<S>, now: Instant) -> Option<Fired> {
        if self.aggregate.take_due(now) {
            self.corpus.cancel();
            if let Err(e) = engine.sync_aggregate() {
                tracing::error!(error = %e, "could not reconcile aggregate");
            }
            return Some(Fired::Reconcile);
        }
        if self.corpus.take_due(now) {
            if self.aggregate.is_pending() {
                // an aggregate edit is still settling; its pass covers this one
                return None;
            }
            if let Err(e) = engine.refresh() {
                tracing::error!(error = %e, "could not refresh aggregate");
            }
            return Some(Fired::Refresh);
        }
        None
    }

    /// How long to wait for the next notification.
    pub fn next_wakeup(&self, now: Instant) -> Duration {
        [self.aggregate.remaining(now), self.corpus.remaining(now)]
            .into_iter()
            .flatten()
            .min()
            .unwrap_or(IDLE_WAIT)
    }
}

/// Watch the vault until the process is stopped.
pub fn run(engine: &mut Engine<FsStore>) -> Result<(), SyncError> {
    let watcher = VaultWatcher::start(engine.root())?;
    let mut watch = WatchLoop::new(&engine.settings().watch);
    engine.refresh()?;
    tracing::info!(root = %engine.root().display(), "watching vault");

    loop {
        let wait = watch.next_wakeup(Instant::now());
        if let Some(VaultEvent::Changed(paths)) = watcher.next_timeout(wait) {
            let paths: Vec<String> = paths.iter().filter_map(|p| engine.relative(p)).collect();
            watch.observe(engine, &paths, Instant::now());
        }
        watch.fire(engine, Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::store::MemoryStore;
    use crate::model::config::Settings;
    use tempfile::TempDir;

    fn setup(tmp: &TempDir) -> (Engine<MemoryStore>, WatchLoop) {
        let store = MemoryStore::new().with("Notes.md", "- [ ] A\n");
        let settings = Settings::default();
        let watch = WatchLoop::new(&settings.watch);
        (Engine::new(store, settings, tmp.path().to_path_buf()), watch)
    }

    fn paths(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn corpus_change_refreshes_after_quiet_period() {
        let tmp = TempDir::new().unwrap();
        let (mut engine, mut watch) = setup(&tmp);
        let t0 = Instant::now();
        watch.observe(&mut engine, &paths(&["Notes.md"]), t0);
        assert_eq!(watch.fire(&mut engine, t0 + Duration::from_millis(900)), None);
        assert_eq!(
            watch.fire(&mut engine, t0 + Duration::from_millis(1000)),
            Some(Fired::Refresh)
        );
        assert!(engine.store().exists("Tasks.md"));
    }

    #[test]
    fn aggregate_edit_absorbs_pending_refresh() {
        let tmp = TempDir::new().unwrap();
        let (mut engine, mut watch) = setup(&tmp);
        let t0 = Instant::now();
        watch.observe(&mut engine, &paths(&["Notes.md", "Tasks.md"]), t0);
        assert_eq!(
            watch.fire(&mut engine, t0 + Duration::from_millis(500)),
            Some(Fired::Reconcile)
        );
        assert_eq!(watch.fire(&mut engine, t0 + Duration::from_millis(2000)), None);
    }

    #[test]
    fn own_writes_are_ignored() {
        let tmp = TempDir::new().unwrap();
        let (mut engine, mut watch) = setup(&tmp);
        engine.refresh().unwrap();
        let now = Instant::now();
        watch.observe(&mut engine, &paths(&["Tasks.md"]), now);
        assert_eq!(watch.next_wakeup(now), IDLE_WAIT);
        assert_eq!(watch.fire(&mut engine, now + Duration::from_secs(5)), None);
    }

    #[test]
    fn excluded_folders_do_not_schedule() {
        let tmp = TempDir::new().unwrap();
        let store = MemoryStore::new();
        let settings = Settings {
            exclude_folders: vec!["Archive".into()],
            ..Default::default()
        };
        let mut watch = WatchLoop::new(&settings.watch);
        let mut engine = Engine::new(store, settings, tmp.path().to_path_buf());
        let t0 = Instant::now();
        watch.observe(&mut engine, &paths(&["Archive/old.md"]), t0);
        assert_eq!(watch.fire(&mut engine, t0 + Duration::from_secs(5)), None);
    }

    #[test]
    fn wakeup_tracks_nearest_deadline() {
        let tmp = TempDir::new().unwrap();
        let (mut engine, mut watch) = setup(&tmp);
        let t0 = Instant::now();
        watch.observe(&mut engine, &paths(&["Tasks.md"]), t0);
        watch.observe(&mut engine, &paths(&["Notes.md"]), t0);
        assert_eq!(watch.next_wakeup(t0), Duration::from_millis(500));
    }
}
