use crate::model::category::Category;
use crate::model::item::item_key;
use crate::parse::matcher::{checked_item, section_header, split_backlink, strip_countdown, unchecked_item};

const RULE: &str = "---";

/// What a user-edited aggregate document says
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateScan {
    /// Checked item texts in document order, countdown annotations removed
    pub checked: Vec<String>,
    /// Open items found under a category header: (item key, category)
    pub placements: Vec<(String, Category)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    BeforeFrontmatter,
    InFrontmatter,
    AfterFrontmatter,
}

/// Scan the aggregate line by line.
///
/// A leading `---` block is skipped as frontmatter. After it, every `---`
/// line ends the current section, so the completed section never counts as
/// a category. Headers are only tracked when `grouped` is set.
pub fn scan_aggregate(text: &str, grouped: bool) -> AggregateScan {
    let mut scan = AggregateScan::default();
    let has_frontmatter = frontmatter_len(text).is_some();
    let mut state = ScanState::BeforeFrontmatter;
    let mut current: Option<Category> = None;

    for line in text.lines() {
        match state {
            ScanState::BeforeFrontmatter => {
                if has_frontmatter && line == RULE {
                    state = ScanState::InFrontmatter;
                    continue;
                }
                state = ScanState::AfterFrontmatter;
            }
            ScanState::InFrontmatter => {
                if line == RULE {
                    state = ScanState::AfterFrontmatter;
                }
                continue;
            }
            ScanState::AfterFrontmatter => {}
        }

        if line == RULE {
            current = None;
            continue;
        }

        if grouped && let Some(label) = section_header(line) {
            current = Category::from_label(label);
            continue;
        }

        if let Some(text) = checked_item(line) {
            scan.checked.push(strip_countdown(text).to_string());
            continue;
        }

        if let Some(category) = current
            && let Some(m) = unchecked_item(line)
            && let (task, Some(source)) = split_backlink(m.text)
        {
            scan.placements.push((item_key(task, source), category));
        }
    }

    scan
}

/// Byte length of a leading frontmatter block, closing `---` line included.
///
/// The first line must be `---` and a second `---` line must follow;
/// otherwise a lone rule is the completed-section separator.
pub fn frontmatter_len(text: &str) -> Option<usize> {
    let mut offset = 0;
    let mut opened = false;
    for line in text.split_inclusive('\n') {
        let bare = line.trim_end_matches(['\n', '\r']);
        offset += line.len();
        if !opened {
            if bare != RULE {
                return None;
            }
            opened = true;
        } else if bare == RULE {
            return Some(offset);
        }
    }
    None
}

/// Split the aggregate into its frontmatter block (possibly empty) and body.
pub fn split_frontmatter(text: &str) -> (&str, &str) {
    match frontmatter_len(text) {
        Some(len) => text.split_at(len),
        None => ("", text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const GROUPED: &str = "\
---
tags: [tasks]
---
## Today (1)
- [ ] Call Alice [[Daily]]

## Tomorrow
- [ ] Fix bug [[Notes]]

## This Week

## Backlog (1)
- [ ] Read book [[Reading]]

---

## Completed
- [x] Pay rent [[Home]] (2 days left)
";

    #[test]
    fn grouped_scan_records_placements_and_checked() {
        let scan = scan_aggregate(GROUPED, true);
        assert_eq!(
            scan.placements,
            vec![
                ("call alice [[Daily]]".to_string(), Category::Today),
                ("fix bug [[Notes]]".to_string(), Category::Tomorrow),
                ("read book [[Reading]]".to_string(), Category::Backlog),
            ]
        );
        assert_eq!(scan.checked, vec!["Pay rent [[Home]]".to_string()]);
    }

    #[test]
    fn flat_scan_ignores_headers() {
        let scan = scan_aggregate(GROUPED, false);
        assert!(scan.placements.is_empty());
        assert_eq!(scan.checked.len(), 1);
    }

    #[test]
    fn frontmatter_contents_are_skipped() {
        let text = "---\n- [x] not a task\n---\n- [x] real [[N]]\n";
        let scan = scan_aggregate(text, true);
        assert_eq!(scan.checked, vec!["real [[N]]".to_string()]);
    }

    #[test]
    fn leading_rule_without_close_is_completed_section() {
        let text = "---\n\n## Completed\n- [x] Done thing [[N]]\n";
        assert_eq!(frontmatter_len(text), None);
        let scan = scan_aggregate(text, false);
        assert_eq!(scan.checked, vec!["Done thing [[N]]".to_string()]);
    }

    #[test]
    fn rule_clears_category() {
        let text = "## Today\n- [ ] a [[N]]\n---\n- [ ] b [[N]]\n";
        let scan = scan_aggregate(text, true);
        assert_eq!(scan.placements, vec![("a [[N]]".to_string(), Category::Today)]);
    }

    #[test]
    fn unknown_header_clears_category() {
        let text = "## Today\n## Someday\n- [ ] a [[N]]\n";
        let scan = scan_aggregate(text, true);
        assert!(scan.placements.is_empty());
    }

    #[test]
    fn lines_without_backlink_are_skipped() {
        let text = "## Today\n- [ ] stray task\n- [ ] linked [[N]]\n";
        let scan = scan_aggregate(text, true);
        assert_eq!(scan.placements, vec![("linked [[N]]".to_string(), Category::Today)]);
    }

    #[test]
    fn split_keeps_frontmatter_verbatim() {
        let (front, body) = split_frontmatter("---\na: 1\n---\n## Today\n");
        assert_eq!(front, "---\na: 1\n---\n");
        assert_eq!(body, "## Today\n");
        assert_eq!(split_frontmatter("## Today\n"), ("", "## Today\n"));
    }
}
