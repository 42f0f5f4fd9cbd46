use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::model::category::Category;
use crate::model::config::Settings;
use crate::model::item::{ChecklistItem, normalize};
use crate::model::state::SyncState;

/// A freshly rendered aggregate body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    /// Document text, without frontmatter
    pub text: String,
    /// Checked texts that made it into the document; the next diff baseline
    pub checked: Vec<String>,
    /// Completion stamps were added or purged
    pub state_changed: bool,
}

/// Open items that belong in the document: anything whose checked form is
/// already listed is dropped, and items sharing a key collapse to the first.
pub fn open_items<'a>(items: &'a [ChecklistItem], checked: &[String]) -> Vec<&'a ChecklistItem> {
    let checked: HashSet<String> = checked.iter().map(|t| normalize(t)).collect();
    let mut seen = HashSet::new();
    items
        .iter()
        .filter(|item| {
            let key = item.key();
            !checked.contains(&normalize(&key)) && seen.insert(key)
        })
        .collect()
}

/// Split open items into the four categories, each sorted by its manual
/// order. Items without a recorded position keep discovery order after the
/// ordered ones.
pub fn bucket<'a>(
    items: &[&'a ChecklistItem],
    state: &SyncState,
) -> Vec<(Category, Vec<&'a ChecklistItem>)> {
    Category::ALL
        .into_iter()
        .map(|category| {
            let mut bucket: Vec<(usize, &ChecklistItem)> = items
                .iter()
                .filter_map(|item| {
                    let key = item.key();
                    (state.category_of(&key) == category)
                        .then(|| (state.rank(category, &key).unwrap_or(usize::MAX), *item))
                })
                .collect();
            bucket.sort_by_key(|(rank, _)| *rank);
            (category, bucket.into_iter().map(|(_, item)| item).collect())
        })
        .collect()
}

/// Render the aggregate body.
///
/// Grouped mode also runs decay over the completed section: unstamped
/// items get stamped `now`, expired ones are dropped and their stamp purged.
pub fn format(
    items: &[ChecklistItem],
    checked: &[String],
    settings: &Settings,
    state: &mut SyncState,
    now: DateTime<Utc>,
) -> Rendered {
    let open = open_items(items, checked);
    let mut blocks = Vec::new();

    if settings.enable_time_groups {
        let sections: Vec<String> = bucket(&open, state)
            .into_iter()
            .map(|(category, items)| render_section(category, &items))
            .collect();
        blocks.push(sections.join("\n\n"));
    } else if !open.is_empty() {
        let lines: Vec<String> = open.iter().map(|item| open_line(item)).collect();
        blocks.push(lines.join("\n"));
    }

    let mut state_changed = false;
    let mut shown = Vec::new();
    if settings.show_checked_section {
        let mut lines = Vec::new();
        let mut seen = HashSet::new();
        for text in checked {
            if !seen.insert(normalize(text)) {
                continue;
            }
            let suffix = if settings.enable_time_groups {
                match decay(text, settings, state, now, &mut state_changed) {
                    Some(suffix) => suffix,
                    None => continue,
                }
            } else {
                String::new()
            };
            lines.push(format!("- [x] {}{}", text, suffix));
            shown.push(text.clone());
        }
        if !lines.is_empty() {
            blocks.push(format!(
                "---\n\n## {}\n{}",
                settings.checked_section_header,
                lines.join("\n")
            ));
        }
    }

    let mut text = blocks.join("\n\n");
    if !text.is_empty() {
        text.push('\n');
    }
    Rendered {
        text,
        checked: shown,
        state_changed,
    }
}

fn open_line(item: &ChecklistItem) -> String {
    format!("- [ ] {}", item.linked_text())
}

fn render_section(category: Category, items: &[&ChecklistItem]) -> String {
    let mut out = if items.is_empty() {
        format!("## {}", category.label())
    } else {
        format!("## {} ({})", category.label(), items.len())
    };
    for item in items {
        out.push('\n');
        out.push_str(&open_line(item));
    }
    out
}

/// Countdown suffix for a checked item, or None once it has expired.
fn decay(
    text: &str,
    settings: &Settings,
    state: &mut SyncState,
    now: DateTime<Utc>,
    changed: &mut bool,
) -> Option<String> {
    let completed = match state.completed_at(text) {
        Some(at) => at,
        None => {
            state.stamp_completion(text, now);
            *changed = true;
            now
        }
    };
    if settings.decay_days == 0 {
        return Some(String::new());
    }

    let window = i64::from(settings.decay_days);
    let elapsed = (now - completed).num_days().max(0);
    if elapsed > window {
        tracing::debug!(task = text, elapsed, "completed task expired");
        state.clear_completion(text);
        *changed = true;
        return None;
    }
    if !settings.show_decay_countdown {
        return Some(String::new());
    }
    let left = window - elapsed;
    Some(if left == 1 {
        " (1 day left)".to_string()
    } else {
        format!(" ({} days left)", left)
    })
}
