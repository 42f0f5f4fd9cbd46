use std::sync::LazyLock;

use regex::Regex;

static UNCHECKED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([ \t]*)- \[ \] (.+)$").unwrap());

// Tolerates a doubled leading dash (`- - [x]`, `-- [x]`) and `[X]`.
static CHECKED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[ \t]*(?:-[ \t]*)?- \[[xX]\] (.+)$").unwrap());

static BACKLINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*?)\s*\[\[([^\[\]]+)\]\]\s*$").unwrap());

static COUNTDOWN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\(\d+ days? left\)\s*$").unwrap());

static HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^##[ \t]+(.+?)(?:[ \t]+\(\d+\))?[ \t]*$").unwrap());

/// One open checklist line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UncheckedMatch<'a> {
    /// Whitespace before the `- [ ]` marker
    pub indent: &'a str,
    /// Task text, trimmed
    pub text: &'a str,
}

/// Match a single `- [ ] task` line.
pub fn unchecked_item(line: &str) -> Option<UncheckedMatch<'_>> {
    let caps = UNCHECKED_RE.captures(line)?;
    let text = caps.get(2)?.as_str().trim();
    if text.is_empty() {
        return None;
    }
    Some(UncheckedMatch {
        indent: caps.get(1).map_or("", |m| m.as_str()),
        text,
    })
}

/// Lazily yield every open checklist line in `text`, in line order.
pub fn unchecked_items(text: &str) -> impl Iterator<Item = UncheckedMatch<'_>> {
    text.lines().filter_map(unchecked_item)
}

/// Match a checked line of the aggregate document, returning its text.
pub fn checked_item(line: &str) -> Option<&str> {
    let text = CHECKED_RE.captures(line)?.get(1)?.as_str().trim();
    if text.is_empty() { None } else { Some(text) }
}

/// Split `task [[Source]]` into the task text and the source name.
/// Text without a trailing backlink comes back whole with no source.
pub fn split_backlink(text: &str) -> (&str, Option<&str>) {
    match BACKLINK_RE.captures(text) {
        Some(caps) => {
            let task = caps.get(1).map_or("", |m| m.as_str()).trim();
            let source = caps.get(2).map(|m| m.as_str().trim());
            (task, source)
        }
        None => (text.trim(), None),
    }
}

/// Remove a trailing `(N days left)` annotation.
pub fn strip_countdown(text: &str) -> &str {
    match COUNTDOWN_RE.find(text) {
        Some(m) => text[..m.start()].trim_end(),
        None => text,
    }
}

/// The label of a `## Label` or `## Label (3)` header line.
pub fn section_header(line: &str) -> Option<&str> {
    HEADER_RE.captures(line)?.get(1).map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_unchecked_lines_in_order() {
        let text = "# Notes\n- [ ] First\n  - [ ] Nested  \nplain\n- [x] Done\n- [ ] Second\n";
        let found: Vec<_> = unchecked_items(text).map(|m| (m.indent, m.text)).collect();
        assert_eq!(
            found,
            vec![("", "First"), ("  ", "Nested"), ("", "Second")]
        );
    }

    #[test]
    fn scans_are_independent() {
        let a = "- [ ] one\n- [ ] two\n";
        let b = "- [ ] three\n";
        let mut first = unchecked_items(a);
        assert_eq!(first.next().map(|m| m.text), Some("one"));
        // A scan over another document starts from its own first line.
        assert_eq!(unchecked_items(b).next().map(|m| m.text), Some("three"));
        assert_eq!(first.next().map(|m| m.text), Some("two"));
    }

    #[test]
    fn ignores_empty_and_malformed_boxes() {
        assert!(unchecked_item("- [ ]    ").is_none());
        assert!(unchecked_item("- [] task").is_none());
        assert!(unchecked_item("* [ ] task").is_none());
        assert!(unchecked_item("text - [ ] task").is_none());
    }

    #[test]
    fn handles_crlf() {
        let found: Vec<_> = unchecked_items("- [ ] a\r\n- [ ] b\r\n").map(|m| m.text).collect();
        assert_eq!(found, vec!["a", "b"]);
    }

    #[test]
    fn checked_is_lenient() {
        assert_eq!(checked_item("- [x] Fix bug [[Notes]]"), Some("Fix bug [[Notes]]"));
        assert_eq!(checked_item("- [X] Upper"), Some("Upper"));
        assert_eq!(checked_item("- - [x] Doubled"), Some("Doubled"));
        assert_eq!(checked_item("-- [x] Squashed"), Some("Squashed"));
        assert_eq!(checked_item("  - [x] Indented"), Some("Indented"));
        assert_eq!(checked_item("- [ ] Open"), None);
    }

    #[test]
    fn backlink_split() {
        assert_eq!(split_backlink("Fix bug [[Notes]]"), ("Fix bug", Some("Notes")));
        assert_eq!(
            split_backlink("See [[Other]] then [[Daily 2025-01-01]]"),
            ("See [[Other]] then", Some("Daily 2025-01-01"))
        );
        assert_eq!(split_backlink("No link"), ("No link", None));
    }

    #[test]
    fn countdown_is_stripped() {
        assert_eq!(strip_countdown("Fix bug [[Notes]] (3 days left)"), "Fix bug [[Notes]]");
        assert_eq!(strip_countdown("Fix bug [[Notes]] (1 day left)"), "Fix bug [[Notes]]");
        assert_eq!(strip_countdown("Fix bug (soon)"), "Fix bug (soon)");
    }

    #[test]
    fn header_strips_count() {
        assert_eq!(section_header("## Today (3)"), Some("Today"));
        assert_eq!(section_header("## This Week"), Some("This Week"));
        assert_eq!(section_header("### Deeper"), None);
        assert_eq!(section_header("- [ ] ## no"), None);
    }
}
