use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::io::store::{DocumentStore, StoreError};
use crate::model::config::Settings;
use crate::model::item::normalize;
use crate::model::state::SyncState;
use crate::ops::collect::{collect, find_source};
use crate::ops::format::format;
use crate::ops::order_ops::move_to_category;
use crate::parse::{scan_aggregate, split_backlink, split_frontmatter};

/// What one reconciliation pass did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Texts checked off in the aggregate since the last pass
    pub newly_checked: Vec<String>,
    /// Texts unchecked (or removed) in the aggregate since the last pass
    pub newly_unchecked: Vec<String>,
    /// Source documents that were rewritten
    pub synced: Vec<String>,
    /// Items whose category changed because of where they sat
    pub regrouped: usize,
    /// The new aggregate text, frontmatter included
    pub aggregate: String,
    pub state_changed: bool,
}

/// Newly rendered aggregate text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rebuilt {
    pub text: String,
    pub state_changed: bool,
}

/// Collect the vault and render the aggregate, keeping the frontmatter of
/// `existing`. The rendered checked list becomes the new snapshot.
pub fn rebuild<S: DocumentStore + ?Sized>(
    store: &S,
    settings: &Settings,
    state: &mut SyncState,
    checked: &[String],
    existing: &str,
    now: DateTime<Utc>,
) -> Result<Rebuilt, StoreError> {
    let items = collect(store, settings)?;
    let rendered = format(&items, checked, settings, state, now);
    let mut state_changed = rendered.state_changed;
    if state.checked != rendered.checked {
        state.checked = rendered.checked;
        state_changed = true;
    }
    let (frontmatter, _) = split_frontmatter(existing);
    Ok(Rebuilt {
        text: format!("{}{}", frontmatter, rendered.text),
        state_changed,
    })
}

/// Fold a user edit of the aggregate back into state and sources, then
/// re-render it.
///
/// Category headers above open items update the group map. Checked items
/// that are new since the last snapshot get `- [ ] task` → `- [x] task` in
/// their source document; items that disappeared from the checked list get
/// the reverse. Rewrites replace the first literal occurrence and silently
/// do nothing when it is missing. The caller writes `aggregate` back.
pub fn reconcile<S: DocumentStore + ?Sized>(
    store: &mut S,
    settings: &Settings,
    state: &mut SyncState,
    edited: &str,
    now: DateTime<Utc>,
) -> Result<ReconcileReport, StoreError> {
    let scan = scan_aggregate(edited, settings.enable_time_groups);
    let mut report = ReconcileReport::default();

    for (key, category) in &scan.placements {
        if state.category_of(key) != *category {
            move_to_category(state, key, *category);
            report.regrouped += 1;
        }
    }

    let previous: HashSet<String> = state.checked.iter().map(|t| normalize(t)).collect();
    let current: HashSet<String> = scan.checked.iter().map(|t| normalize(t)).collect();

    let mut seen = HashSet::new();
    for text in &scan.checked {
        let norm = normalize(text);
        if previous.contains(&norm) || !seen.insert(norm) {
            continue;
        }
        state.stamp_completion(text, now);
        report.newly_checked.push(text.clone());
        if let Some(path) = sync_source(store, settings, text, true) {
            report.synced.push(path);
        }
    }

    let unchecked: Vec<String> = state
        .checked
        .iter()
        .filter(|t| !current.contains(&normalize(t)))
        .cloned()
        .collect();
    for text in unchecked {
        state.clear_completion(&text);
        if let Some(path) = sync_source(store, settings, &text, false) {
            report.synced.push(path);
        }
        report.newly_unchecked.push(text);
    }

    let snapshot_changed = state.checked != scan.checked;
    state.checked = scan.checked.clone();

    let rebuilt = rebuild(store, settings, state, &scan.checked, edited, now)?;
    report.aggregate = rebuilt.text;
    report.state_changed = rebuilt.state_changed
        || snapshot_changed
        || report.regrouped > 0
        || !report.newly_checked.is_empty()
        || !report.newly_unchecked.is_empty();

    tracing::info!(
        checked = report.newly_checked.len(),
        unchecked = report.newly_unchecked.len(),
        regrouped = report.regrouped,
        synced = report.synced.len(),
        "reconciled aggregate edit"
    );
    Ok(report)
}

/// Flip a task's checkbox in the document its backlink names. Returns the
/// path when the document was rewritten. Failures are logged, not raised.
fn sync_source<S: DocumentStore + ?Sized>(
    store: &mut S,
    settings: &Settings,
    checked_text: &str,
    done: bool,
) -> Option<String> {
    let (task, Some(source)) = split_backlink(checked_text) else {
        tracing::debug!(task = checked_text, "no backlink, source not synced");
        return None;
    };
    let path = match find_source(store, settings, source) {
        Ok(Some(path)) => path,
        Ok(None) => {
            tracing::debug!(source, "backlinked document not found");
            return None;
        }
        Err(e) => {
            tracing::warn!(source, error = %e, "could not look up source document");
            return None;
        }
    };

    let result = store.read(&path).and_then(|content| {
        match toggle_checkbox(&content, task, done) {
            Some(updated) => store.write(&path, &updated).map(|_| true),
            None => Ok(false),
        }
    });
    match result {
        Ok(true) => {
            tracing::info!(path = %path, task, done, "synced source document");
            Some(path)
        }
        Ok(false) => {
            tracing::debug!(path = %path, task, done, "task text not found in source");
            None
        }
        Err(e) => {
            tracing::warn!(path = %path, error = %e, "could not sync source document");
            None
        }
    }
}

/// Literal first-occurrence replacement of `- [ ] task` with `- [x] task`
/// (or back). Not anchored to a line: a task that appears twice in one
/// document always flips its first occurrence.
pub fn toggle_checkbox(content: &str, task: &str, done: bool) -> Option<String> {
    let open = format!("- [ ] {}", task);
    let closed = format!("- [x] {}", task);
    let (from, to) = if done { (open, closed) } else { (closed, open) };
    content
        .contains(&from)
        .then(|| content.replacen(&from, &to, 1))
}
