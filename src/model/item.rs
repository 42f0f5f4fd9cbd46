use serde::Serialize;

/// An open checklist line found in a source document.
///
/// Items are rebuilt from document text on every collection pass and never
/// persisted; `item_key` gives them a stable identity across passes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChecklistItem {
    /// Task text with surrounding whitespace removed
    pub text: String,
    /// Base name of the document the task was found in (no folder, no extension)
    pub source_name: String,
}

impl ChecklistItem {
    pub fn new(text: impl Into<String>, source_name: impl Into<String>) -> Self {
        ChecklistItem {
            text: text.into(),
            source_name: source_name.into(),
        }
    }

    pub fn key(&self) -> String {
        item_key(&self.text, &self.source_name)
    }

    /// The text as it appears in the aggregate document, backlink included.
    pub fn linked_text(&self) -> String {
        format!("{} [[{}]]", self.text, self.source_name)
    }
}

/// Canonical identity of a task: normalized text plus its source backlink.
///
/// Two tasks with the same text in the same document share a key and are
/// indistinguishable.
pub fn item_key(text: &str, source_name: &str) -> String {
    format!("{} [[{}]]", normalize(text), source_name)
}

/// Case- and whitespace-insensitive form used for every text comparison.
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}
