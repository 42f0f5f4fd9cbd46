use serde::{Deserialize, Serialize};

/// Decay windows offered for completed tasks (0 = never expire)
pub const DECAY_CHOICES: [u32; 7] = [0, 1, 2, 3, 5, 7, 14];

/// Settings from .gather/config.toml
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Vault-relative path of the aggregate document
    #[serde(default = "default_output_file_path")]
    pub output_file_path: String,
    /// Folders whose documents are never collected
    #[serde(default)]
    pub exclude_folders: Vec<String>,
    /// Keep the aggregate pinned at the top of a file browser. Read by
    /// editor integrations only.
    #[serde(default)]
    pub pin_to_top: bool,
    #[serde(default = "default_true")]
    pub show_checked_section: bool,
    #[serde(default = "default_checked_section_header")]
    pub checked_section_header: String,
    /// Four time sections instead of a flat list
    #[serde(default = "default_true")]
    pub enable_time_groups: bool,
    /// Days a completed task stays visible (grouped mode only)
    #[serde(default)]
    pub decay_days: u32,
    #[serde(default = "default_true")]
    pub show_decay_countdown: bool,
    #[serde(default)]
    pub watch: WatchConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            output_file_path: default_output_file_path(),
            exclude_folders: Vec::new(),
            pin_to_top: false,
            show_checked_section: true,
            checked_section_header: default_checked_section_header(),
            enable_time_groups: true,
            decay_days: 0,
            show_decay_countdown: true,
            watch: WatchConfig::default(),
        }
    }
}

impl Settings {
    /// Whether `path` is an excluded folder or lies underneath one.
    pub fn is_excluded(&self, path: &str) -> bool {
        self.exclude_folders.iter().any(|folder| {
            let folder = folder.trim_matches('/');
            !folder.is_empty()
                && (path == folder
                    || path
                        .strip_prefix(folder)
                        .is_some_and(|rest| rest.starts_with('/')))
        })
    }
}

/// Timing of the watch loop, in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchConfig {
    #[serde(default = "default_aggregate_debounce_ms")]
    pub aggregate_debounce_ms: u64,
    #[serde(default = "default_corpus_debounce_ms")]
    pub corpus_debounce_ms: u64,
    /// How long our own writes keep being ignored after a pass finishes
    #[serde(default = "default_grace_ms")]
    pub grace_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        WatchConfig {
            aggregate_debounce_ms: default_aggregate_debounce_ms(),
            corpus_debounce_ms: default_corpus_debounce_ms(),
            grace_ms: default_grace_ms(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_output_file_path() -> String {
    "Tasks.md".to_string()
}

fn default_checked_section_header() -> String {
    "Completed".to_string()
}

fn default_aggregate_debounce_ms() -> u64 {
    500
}

fn default_corpus_debounce_ms() -> u64 {
    1000
}

fn default_grace_ms() -> u64 {
    300
}
