use std::fs;
use std::path::{Path, PathBuf};

use crate::io::recovery::atomic_write;
use crate::model::config::{DECAY_CHOICES, Settings};

/// Name of the per-vault settings directory
pub const STATE_DIR: &str = ".gather";

/// Error type for settings I/O
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("not a gather vault: no .gather/config.toml found (run `gather init`)")]
    NotAVault,
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not write {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse config.toml: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("could not edit config.toml: {0}")]
    EditError(#[from] toml_edit::TomlError),
    #[error("decay_days must be one of 0, 1, 2, 3, 5, 7, 14 (got {0})")]
    InvalidDecay(u32),
    #[error("invalid path \"{0}\": use a path inside the vault")]
    InvalidPath(String),
}

pub fn state_dir(vault_root: &Path) -> PathBuf {
    vault_root.join(STATE_DIR)
}

/// Find the vault by walking up from `start` to the first directory with a
/// `.gather/config.toml`.
pub fn discover_vault(start: &Path) -> Result<PathBuf, ConfigError> {
    let mut current = start.to_path_buf();
    loop {
        if state_dir(&current).join("config.toml").is_file() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(ConfigError::NotAVault);
        }
    }
}

/// Read the settings, returning both the parsed value and the raw
/// toml_edit document for formatting-preserving edits.
pub fn read_settings(state_dir: &Path) -> Result<(Settings, toml_edit::DocumentMut), ConfigError> {
    let path = state_dir.join("config.toml");
    let text = fs::read_to_string(&path).map_err(|e| ConfigError::ReadError {
        path: path.clone(),
        source: e,
    })?;
    let settings = parse_settings(&text)?;
    let doc: toml_edit::DocumentMut = text.parse()?;
    Ok((settings, doc))
}

pub fn parse_settings(text: &str) -> Result<Settings, ConfigError> {
    let mut settings: Settings = toml::from_str(text)?;
    if !DECAY_CHOICES.contains(&settings.decay_days) {
        return Err(ConfigError::InvalidDecay(settings.decay_days));
    }
    let output = normalize_vault_path(&settings.output_file_path)?;
    if output.is_empty() {
        return Err(ConfigError::InvalidPath(settings.output_file_path));
    }
    settings.output_file_path = output;
    let mut folders = Vec::new();
    for folder in &settings.exclude_folders {
        let folder = normalize_vault_path(folder)?;
        if !folder.is_empty() && !folders.contains(&folder) {
            folders.push(folder);
        }
    }
    settings.exclude_folders = folders;
    Ok(settings)
}

/// Canonical vault-relative form of a configured path, as the document
/// store lists it. `.` and empty segments are dropped; `..` is rejected.
pub fn normalize_vault_path(path: &str) -> Result<String, ConfigError> {
    let mut parts = Vec::new();
    for part in path.trim().split(['/', '\\']) {
        match part {
            "" | "." => {}
            ".." => return Err(ConfigError::InvalidPath(path.to_string())),
            _ => parts.push(part),
        }
    }
    Ok(parts.join("/"))
}

pub fn write_config(state_dir: &Path, doc: &toml_edit::DocumentMut) -> Result<(), ConfigError> {
    let path = state_dir.join("config.toml");
    atomic_write(&path, doc.to_string().as_bytes())
        .map_err(|e| ConfigError::WriteError { path, source: e })
}

/// Whether a raw `exclude_folders` entry names `folder` once normalized.
fn names_folder(value: &toml_edit::Value, folder: &str) -> bool {
    value
        .as_str()
        .and_then(|v| normalize_vault_path(v).ok())
        .is_some_and(|v| v == folder)
}

/// Add a folder to `exclude_folders`. Returns false if it was already there.
pub fn add_exclude(doc: &mut toml_edit::DocumentMut, raw: &str) -> Result<bool, ConfigError> {
    let folder = normalize_vault_path(raw)?;
    if folder.is_empty() {
        return Err(ConfigError::InvalidPath(raw.to_string()));
    }
    if !doc.contains_key("exclude_folders") {
        doc["exclude_folders"] = toml_edit::value(toml_edit::Array::new());
    }
    let Some(list) = doc["exclude_folders"].as_array_mut() else {
        return Ok(false);
    };
    if list.iter().any(|v| names_folder(v, &folder)) {
        return Ok(false);
    }
    list.push(folder);
    Ok(true)
}

/// Remove a folder from `exclude_folders`. Returns false if it was absent.
pub fn remove_exclude(doc: &mut toml_edit::DocumentMut, folder: &str) -> Result<bool, ConfigError> {
    let folder = normalize_vault_path(folder)?;
    let Some(list) = doc
        .get_mut("exclude_folders")
        .and_then(|item| item.as_array_mut())
    else {
        return Ok(false);
    };
    let before = list.len();
    list.retain(|v| !names_folder(v, &folder));
    Ok(list.len() != before)
}

/// Initial config.toml contents for `gather init`.
pub fn initial_config(settings: &Settings) -> String {
    let excludes: Vec<String> = settings
        .exclude_folders
        .iter()
        .map(|f| format!("{:?}", f))
        .collect();
    format!(
        "\
# Aggregate document, relative to the vault root
output_file_path = {output:?}
# Folders never scanned for tasks
exclude_folders = [{excludes}]
pin_to_top = {pin}

# Four time sections (Today, Tomorrow, This Week, Backlog) or one flat list
enable_time_groups = {groups}

show_checked_section = {show_checked}
checked_section_header = {header:?}
# Days a completed task stays listed: 0 (never expire), 1, 2, 3, 5, 7, 14
decay_days = {decay}
show_decay_countdown = {countdown}

[watch]
aggregate_debounce_ms = {agg_ms}
corpus_debounce_ms = {corpus_ms}
grace_ms = {grace_ms}
",
        output = settings.output_file_path,
        excludes = excludes.join(", "),
        pin = settings.pin_to_top,
        groups = settings.enable_time_groups,
        show_checked = settings.show_checked_section,
        header = settings.checked_section_header,
        decay = settings.decay_days,
        countdown = settings.show_decay_countdown,
        agg_ms = settings.watch.aggregate_debounce_ms,
        corpus_ms = settings.watch.corpus_debounce_ms,
        grace_ms = settings.watch.grace_ms,
    )
}
