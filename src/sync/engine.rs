use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::io::config_io::{self, ConfigError};
use crate::io::lock::{FileLock, LockError};
use crate::io::recovery::{RecoveryCategory, RecoveryEntry, log_recovery};
use crate::io::state::{read_state, write_state};
use crate::io::store::{DocumentStore, FsStore, StoreError};
use crate::model::category::Category;
use crate::model::config::Settings;
use crate::model::item::normalize;
use crate::model::state::SyncState;
use crate::ops::collect::collect;
use crate::ops::format::{bucket, open_items};
use crate::ops::order_ops::{self, DragSession, DropPosition, OrderError};
use crate::ops::reconcile::{ReconcileReport, rebuild, reconcile};
use crate::parse::scan_aggregate;
use crate::sync::guard::WriteGuard;

/// Error type for engine passes
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error(transparent)]
    Order(#[from] OrderError),
    #[error("could not save state to {path}: {source}")]
    StateWrite {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("watcher error: {0}")]
    Watch(#[from] notify::Error),
}

/// Result of one pass over the vault
#[derive(Debug, Clone, Default)]
pub struct PassOutcome {
    /// The aggregate text changed and was written
    pub aggregate_written: bool,
    /// Set for reconciliation passes
    pub report: Option<ReconcileReport>,
}

/// One open task as listed by `gather list`
#[derive(Debug, Clone)]
pub struct ListedItem {
    pub text: String,
    pub source: String,
    pub key: String,
    pub category: Category,
}

/// Owns one vault: its documents, settings and remembered state.
///
/// Every public pass takes the vault lock, engages the write guard for its
/// whole duration and releases it afterwards whatever the outcome.
pub struct Engine<S: DocumentStore> {
    store: S,
    settings: Settings,
    state: SyncState,
    state_dir: PathBuf,
    guard: WriteGuard,
    clock: fn() -> DateTime<Utc>,
}

impl Engine<FsStore> {
    /// Open the vault rooted at `root`.
    pub fn open(root: &Path) -> Result<Self, SyncError> {
        let root = root.canonicalize().map_err(|e| StoreError::ReadError {
            path: root.to_path_buf(),
            source: e,
        })?;
        let state_dir = config_io::state_dir(&root);
        let (settings, _) = config_io::read_settings(&state_dir)?;
        Ok(Engine::new(FsStore::new(root), settings, state_dir))
    }

    pub fn root(&self) -> &Path {
        self.store.root()
    }

    /// Vault-relative form of a path reported by the watcher.
    pub fn relative(&self, path: &Path) -> Option<String> {
        self.store.relative(path)
    }
}

impl<S: DocumentStore> Engine<S> {
    /// State is loaded from `state_dir` here and again at the start of
    /// every pass.
    pub fn new(store: S, settings: Settings, state_dir: PathBuf) -> Self {
        let state = read_state(&state_dir);
        let guard = WriteGuard::new(Duration::from_millis(settings.watch.grace_ms));
        Engine {
            store,
            settings,
            state,
            state_dir,
            guard,
            clock: Utc::now,
        }
    }

    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn state(&self) -> &SyncState {
        &self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    pub fn is_aggregate(&self, path: &str) -> bool {
        path == self.settings.output_file_path
    }

    /// Whether a change event for `path` is an echo of our own write.
    pub fn is_own_write(&mut self, path: &str, now: Instant) -> bool {
        self.guard.suppresses(path, now)
    }

    // -----------------------------------------------------------------------
    // Passes
    // -----------------------------------------------------------------------

    /// Re-collect the vault and rewrite the aggregate.
    pub fn refresh(&mut self) -> Result<PassOutcome, SyncError> {
        self.guarded(Self::render)
    }

    /// Fold the aggregate as it is now on disk back into the vault.
    pub fn sync_aggregate(&mut self) -> Result<PassOutcome, SyncError> {
        if !self.store.exists(&self.settings.output_file_path) {
            return self.refresh();
        }
        self.guarded(|engine| {
            let edited = engine.read_aggregate()?;
            engine.reconcile_pass(&edited)
        })
    }

    /// Move the task on a 1-based aggregate line to `category`.
    pub fn move_task(&mut self, line_no: usize, category: Category) -> Result<PassOutcome, SyncError> {
        self.guarded(|engine| {
            let aggregate = engine.read_aggregate()?;
            let key = order_ops::task_key_at_line(&aggregate, line_no)?;
            let report = engine.absorb_pending(&aggregate)?;
            if order_ops::move_to_category(&mut engine.state, &key, category) {
                tracing::info!(key = %key, %category, "moved task");
                engine.save_state()?;
            }
            let mut outcome = engine.rebuild_and_write(&aggregate)?;
            outcome.report = report;
            Ok(outcome)
        })
    }

    /// Drag the task on line `from` next to the task on line `to`.
    pub fn reorder(
        &mut self,
        from: usize,
        to: usize,
        position: DropPosition,
    ) -> Result<PassOutcome, SyncError> {
        self.guarded(|engine| {
            let aggregate = engine.read_aggregate()?;
            let mut drag = DragSession::new();
            drag.begin(&aggregate, from)?;
            let target = order_ops::task_key_at_line(&aggregate, to)?;
            let report = engine.absorb_pending(&aggregate)?;
            let section_keys = engine.section_keys(engine.state.category_of(&target))?;
            if drag.drop_on(&mut engine.state, &aggregate, to, position, &section_keys)? {
                tracing::info!(from, to, "reordered task");
                engine.save_state()?;
            }
            let mut outcome = engine.rebuild_and_write(&aggregate)?;
            outcome.report = report;
            Ok(outcome)
        })
    }

    /// Make sure the aggregate exists, rendering it if it does not.
    pub fn ensure_aggregate(&mut self) -> Result<String, SyncError> {
        if !self.store.exists(&self.settings.output_file_path) {
            self.refresh()?;
        }
        Ok(self.settings.output_file_path.clone())
    }

    /// Open items with their keys and categories, in aggregate order.
    pub fn list_items(&self) -> Result<Vec<ListedItem>, SyncError> {
        let items = collect(&self.store, &self.settings)?;
        let open = open_items(&items, &self.state.checked);
        let ordered: Vec<_> = if self.settings.enable_time_groups {
            bucket(&open, &self.state)
                .into_iter()
                .flat_map(|(_, items)| items)
                .collect()
        } else {
            open
        };
        Ok(ordered
            .into_iter()
            .map(|item| ListedItem {
                text: item.text.clone(),
                source: item.source_name.clone(),
                key: item.key(),
                category: self.state.category_of(&item.key()),
            })
            .collect())
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// Run a pass under the vault lock with the write guard engaged.
    fn guarded<T>(
        &mut self,
        pass: impl FnOnce(&mut Self) -> Result<T, SyncError>,
    ) -> Result<T, SyncError> {
        let _lock = FileLock::acquire_default(&self.state_dir)?;
        // another process may have moved or reordered since we loaded
        self.state = read_state(&self.state_dir);
        self.guard.engage(Instant::now());
        let result = pass(self);
        self.guard.release(Instant::now());
        if let Err(e) = &result {
            tracing::warn!(error = %e, "pass failed; aggregate may be stale");
        }
        result
    }

    /// Collect, render and write. Runs inside `guarded`. Edits still
    /// sitting in the aggregate are reconciled instead of overwritten.
    fn render(&mut self) -> Result<PassOutcome, SyncError> {
        let existing = self.read_aggregate()?;
        if self.has_pending_edits(&existing) {
            tracing::info!("aggregate has unsynced edits, reconciling");
            return self.reconcile_pass(&existing);
        }
        self.rebuild_and_write(&existing)
    }

    fn rebuild_and_write(&mut self, existing: &str) -> Result<PassOutcome, SyncError> {
        let checked = self.state.checked.clone();
        let now = (self.clock)();
        let rebuilt = rebuild(
            &self.store,
            &self.settings,
            &mut self.state,
            &checked,
            existing,
            now,
        )?;
        if rebuilt.state_changed {
            self.save_state()?;
        }
        let aggregate_written = self.write_aggregate(existing, &rebuilt.text)?;
        Ok(PassOutcome {
            aggregate_written,
            report: None,
        })
    }

    fn reconcile_pass(&mut self, edited: &str) -> Result<PassOutcome, SyncError> {
        let report = self.fold_in(edited)?;
        let aggregate_written = self.write_aggregate(edited, &report.aggregate)?;
        Ok(PassOutcome {
            aggregate_written,
            report: Some(report),
        })
    }

    /// Reconcile `edited` into state and sources without writing the
    /// aggregate.
    fn fold_in(&mut self, edited: &str) -> Result<ReconcileReport, SyncError> {
        let now = (self.clock)();
        let report = reconcile(
            &mut self.store,
            &self.settings,
            &mut self.state,
            edited,
            now,
        )?;
        for path in &report.synced {
            self.guard.record(path);
        }
        if report.state_changed {
            self.save_state()?;
        }
        Ok(report)
    }

    /// Fold in pending aggregate edits before a move or reorder re-renders.
    fn absorb_pending(&mut self, aggregate: &str) -> Result<Option<ReconcileReport>, SyncError> {
        if !self.has_pending_edits(aggregate) {
            return Ok(None);
        }
        tracing::info!("folding unsynced aggregate edits in first");
        self.fold_in(aggregate).map(Some)
    }

    /// Whether the aggregate on disk differs from what the last pass
    /// rendered: a box ticked or unticked, or an item under another header.
    fn has_pending_edits(&self, aggregate: &str) -> bool {
        if !self.store.exists(&self.settings.output_file_path) {
            return false;
        }
        let scan = scan_aggregate(aggregate, self.settings.enable_time_groups);
        let rendered: HashSet<String> = self.state.checked.iter().map(|t| normalize(t)).collect();
        let current: HashSet<String> = scan.checked.iter().map(|t| normalize(t)).collect();
        rendered != current
            || scan
                .placements
                .iter()
                .any(|(key, category)| self.state.category_of(key) != *category)
    }

    fn read_aggregate(&self) -> Result<String, StoreError> {
        match self.store.read(&self.settings.output_file_path) {
            Ok(text) => Ok(text),
            Err(StoreError::NotFound(_)) => Ok(String::new()),
            Err(e) => Err(e),
        }
    }

    /// Write the aggregate if it changed. A failed write is kept in the
    /// recovery log.
    fn write_aggregate(&mut self, existing: &str, text: &str) -> Result<bool, SyncError> {
        let path = self.settings.output_file_path.clone();
        if existing == text && self.store.exists(&path) {
            tracing::debug!(path = %path, "aggregate unchanged");
            return Ok(false);
        }
        self.guard.record(&path);
        let result = if self.store.exists(&path) {
            self.store.write(&path, text)
        } else {
            self.store.create(&path, text)
        };
        if let Err(e) = result {
            log_recovery(
                &self.state_dir,
                RecoveryEntry {
                    timestamp: Utc::now(),
                    category: RecoveryCategory::Aggregate,
                    description: "aggregate write failed".to_string(),
                    fields: vec![
                        ("Target".to_string(), path.clone()),
                        ("Error".to_string(), e.to_string()),
                    ],
                    body: text.to_string(),
                },
            );
            return Err(e.into());
        }
        tracing::info!(path = %path, "wrote aggregate");
        Ok(true)
    }

    fn save_state(&self) -> Result<(), SyncError> {
        let Err(e) = write_state(&self.state_dir, &self.state) else {
            return Ok(());
        };
        log_recovery(
            &self.state_dir,
            RecoveryEntry {
                timestamp: Utc::now(),
                category: RecoveryCategory::State,
                description: "state write failed".to_string(),
                fields: vec![("Error".to_string(), e.to_string())],
                body: serde_json::to_string_pretty(&self.state).unwrap_or_default(),
            },
        );
        Err(SyncError::StateWrite {
            path: self.state_dir.join("state.json"),
            source: e,
        })
    }

    /// Keys of a category's section as it would render right now.
    fn section_keys(&self, category: Category) -> Result<Vec<String>, SyncError> {
        let items = collect(&self.store, &self.settings)?;
        let open = open_items(&items, &self.state.checked);
        Ok(bucket(&open, &self.state)
            .into_iter()
            .find(|(c, _)| *c == category)
            .map(|(_, items)| items.iter().map(|item| item.key()).collect())
            .unwrap_or_default())
    }
}
