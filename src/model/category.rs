use std::fmt;

use serde::{Deserialize, Serialize};

/// Time bucket a task is filed under in grouped mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Today,
    Tomorrow,
    ThisWeek,
    #[default]
    Backlog,
}

impl Category {
    /// Render order of the sections in the aggregate document
    pub const ALL: [Category; 4] = [
        Category::Today,
        Category::Tomorrow,
        Category::ThisWeek,
        Category::Backlog,
    ];

    /// The `##` header text for this section
    pub fn label(self) -> &'static str {
        match self {
            Category::Today => "Today",
            Category::Tomorrow => "Tomorrow",
            Category::ThisWeek => "This Week",
            Category::Backlog => "Backlog",
        }
    }

    /// Identifier used in the state file and on the command line
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Today => "today",
            Category::Tomorrow => "tomorrow",
            Category::ThisWeek => "this-week",
            Category::Backlog => "backlog",
        }
    }

    pub fn parse_category(s: &str) -> Option<Self> {
        match s {
            "today" => Some(Category::Today),
            "tomorrow" => Some(Category::Tomorrow),
            "this-week" | "week" => Some(Category::ThisWeek),
            "backlog" => Some(Category::Backlog),
            _ => None,
        }
    }

    /// Match a section header label (without `## ` or count) to a category.
    pub fn from_label(label: &str) -> Option<Self> {
        Category::ALL
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(label.trim()))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_backlog() {
        assert_eq!(Category::default(), Category::Backlog);
    }

    #[test]
    fn labels_round_trip() {
        for c in Category::ALL {
            assert_eq!(Category::from_label(c.label()), Some(c));
            assert_eq!(Category::parse_category(c.as_str()), Some(c));
        }
        assert_eq!(Category::from_label("Someday"), None);
    }

    #[test]
    fn serializes_kebab_case() {
        let json = serde_json::to_string(&Category::ThisWeek).unwrap();
        assert_eq!(json, "\"this-week\"");
    }
}
