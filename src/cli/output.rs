use serde::Serialize;

use crate::model::category::Category;
use crate::ops::reconcile::ReconcileReport;
use crate::sync::engine::{ListedItem, PassOutcome};

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct ItemJson {
    pub text: String,
    pub source: String,
    pub key: String,
    pub category: Category,
}

#[derive(Serialize)]
pub struct PassJson {
    pub aggregate: String,
    pub written: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reconcile: Option<ReconcileJson>,
}

#[derive(Serialize)]
pub struct ReconcileJson {
    pub newly_checked: Vec<String>,
    pub newly_unchecked: Vec<String>,
    pub synced: Vec<String>,
    pub regrouped: usize,
}

#[derive(Serialize)]
pub struct ExcludeJson {
    pub exclude_folders: Vec<String>,
    pub changed: bool,
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

pub fn item_to_json(item: &ListedItem) -> ItemJson {
    ItemJson {
        text: item.text.clone(),
        source: item.source.clone(),
        key: item.key.clone(),
        category: item.category,
    }
}

pub fn pass_to_json(aggregate: &str, outcome: &PassOutcome) -> PassJson {
    PassJson {
        aggregate: aggregate.to_string(),
        written: outcome.aggregate_written,
        reconcile: outcome.report.as_ref().map(reconcile_to_json),
    }
}

fn reconcile_to_json(report: &ReconcileReport) -> ReconcileJson {
    ReconcileJson {
        newly_checked: report.newly_checked.clone(),
        newly_unchecked: report.newly_unchecked.clone(),
        synced: report.synced.clone(),
        regrouped: report.regrouped,
    }
}

// ---------------------------------------------------------------------------
// Text formatting
// ---------------------------------------------------------------------------

/// One line per item for `gather list`, sections in order.
pub fn format_items(items: &[ListedItem], grouped: bool) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current: Option<Category> = None;
    for item in items {
        if grouped && current != Some(item.category) {
            if current.is_some() {
                lines.push(String::new());
            }
            lines.push(format!("{}:", item.category.label()));
            current = Some(item.category);
        }
        let indent = if grouped { "  " } else { "" };
        lines.push(format!("{}{}  [[{}]]", indent, item.text, item.source));
    }
    lines
}

/// Summary line for a pass, e.g. `Tasks.md: 1 checked, 1 source updated`.
pub fn format_pass(aggregate: &str, outcome: &PassOutcome) -> String {
    let mut parts = Vec::new();
    if let Some(report) = &outcome.report {
        if !report.newly_checked.is_empty() {
            parts.push(format!("{} checked", report.newly_checked.len()));
        }
        if !report.newly_unchecked.is_empty() {
            parts.push(format!("{} unchecked", report.newly_unchecked.len()));
        }
        if report.regrouped > 0 {
            parts.push(format!("{} regrouped", report.regrouped));
        }
        if !report.synced.is_empty() {
            parts.push(plural(report.synced.len(), "source updated", "sources updated"));
        }
    }
    if parts.is_empty() {
        parts.push(if outcome.aggregate_written { "updated" } else { "up to date" }.to_string());
    }
    format!("{}: {}", aggregate, parts.join(", "))
}

fn plural(n: usize, one: &str, many: &str) -> String {
    format!("{} {}", n, if n == 1 { one } else { many })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listed(text: &str, category: Category) -> ListedItem {
        ListedItem {
            text: text.into(),
            source: "Notes".into(),
            key: format!("{} [[Notes]]", text.to_lowercase()),
            category,
        }
    }

    #[test]
    fn items_grouped_by_section() {
        let items = vec![
            listed("A", Category::Today),
            listed("B", Category::Today),
            listed("C", Category::Backlog),
        ];
        assert_eq!(
            format_items(&items, true),
            vec!["Today:", "  A  [[Notes]]", "  B  [[Notes]]", "", "Backlog:", "  C  [[Notes]]"]
        );
        assert_eq!(format_items(&items, false)[0], "A  [[Notes]]");
    }

    #[test]
    fn pass_summary() {
        let quiet = PassOutcome::default();
        assert_eq!(format_pass("Tasks.md", &quiet), "Tasks.md: up to date");

        let report = ReconcileReport {
            newly_checked: vec!["A [[N]]".into()],
            synced: vec!["N.md".into()],
            ..Default::default()
        };
        let outcome = PassOutcome {
            aggregate_written: true,
            report: Some(report),
        };
        assert_eq!(
            format_pass("Tasks.md", &outcome),
            "Tasks.md: 1 checked, 1 source updated"
        );
    }

    #[test]
    fn item_json_uses_kebab_category() {
        let json = serde_json::to_string(&item_to_json(&listed("A", Category::ThisWeek))).unwrap();
        assert!(json.contains("\"category\":\"this-week\""));
    }
}
