pub mod debounce;
pub mod engine;
pub mod guard;
pub mod watch;

pub use engine::{Engine, ListedItem, PassOutcome, SyncError};
pub use watch::{Fired, WatchLoop};
