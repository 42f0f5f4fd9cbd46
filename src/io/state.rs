use std::fs;
use std::path::Path;

use crate::io::recovery::atomic_write;
use crate::model::state::SyncState;

const STATE_FILE: &str = "state.json";

/// Read state.json from the settings directory.
/// A missing or unreadable file starts from empty state.
pub fn read_state(state_dir: &Path) -> SyncState {
    let path = state_dir.join(STATE_FILE);
    let Ok(content) = fs::read_to_string(&path) else {
        return SyncState::default();
    };
    match serde_json::from_str(&content) {
        Ok(state) => state,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring malformed state file");
            SyncState::default()
        }
    }
}

/// Write state.json to the settings directory
pub fn write_state(state_dir: &Path, state: &SyncState) -> Result<(), std::io::Error> {
    let path = state_dir.join(STATE_FILE);
    let content = serde_json::to_string_pretty(state)?;
    atomic_write(&path, content.as_bytes())
}
