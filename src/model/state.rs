use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::model::category::Category;
use crate::model::item::normalize;
use crate::parse::matcher::split_backlink;

/// Everything remembered between passes (written to .gather/state.json)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncState {
    /// Item key → category. Never pruned.
    #[serde(default)]
    pub groups: IndexMap<String, Category>,
    /// Manual order of item keys within each category
    #[serde(default)]
    pub orders: IndexMap<Category, Vec<String>>,
    /// Completion key → when the task was checked off
    #[serde(default)]
    pub completions: IndexMap<String, DateTime<Utc>>,
    /// Checked texts the aggregate showed after the last pass
    #[serde(default)]
    pub checked: Vec<String>,
}

impl SyncState {
    /// Category of an item key, defaulting to the backlog.
    pub fn category_of(&self, key: &str) -> Category {
        self.groups.get(key).copied().unwrap_or_default()
    }

    /// Record a category for `key`. Returns true if anything changed.
    pub fn assign(&mut self, key: &str, category: Category) -> bool {
        match self.groups.get(key) {
            Some(current) if *current == category => false,
            _ => {
                self.groups.insert(key.to_string(), category);
                true
            }
        }
    }

    /// Position of `key` in its category's manual order, if it has one.
    pub fn rank(&self, category: Category, key: &str) -> Option<usize> {
        self.orders
            .get(&category)
            .and_then(|order| order.iter().position(|k| k == key))
    }

    pub fn completed_at(&self, checked_text: &str) -> Option<DateTime<Utc>> {
        self.completions.get(&completion_key(checked_text)).copied()
    }

    pub fn stamp_completion(&mut self, checked_text: &str, at: DateTime<Utc>) {
        self.completions.insert(completion_key(checked_text), at);
    }

    /// Returns true if a stamp was removed.
    pub fn clear_completion(&mut self, checked_text: &str) -> bool {
        self.completions
            .shift_remove(&completion_key(checked_text))
            .is_some()
    }
}

/// Decay timers are keyed by task text alone, without the source backlink.
pub fn completion_key(checked_text: &str) -> String {
    let (task, _) = split_backlink(checked_text);
    normalize(task)
}
