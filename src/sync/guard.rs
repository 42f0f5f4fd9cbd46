use std::collections::HashSet;
use std::time::{Duration, Instant};

/// Keeps the watch loop from mistaking our own writes for user edits.
///
/// Engaged for the whole of a pass; after release, change events for the
/// paths the pass wrote keep being ignored until the grace period is over,
/// since the watcher reports them with some delay.
#[derive(Debug, Clone)]
pub struct WriteGuard {
    grace: Duration,
    engaged: bool,
    written: HashSet<String>,
    release_at: Option<Instant>,
}

impl WriteGuard {
    pub fn new(grace: Duration) -> Self {
        WriteGuard {
            grace,
            engaged: false,
            written: HashSet::new(),
            release_at: None,
        }
    }

    pub fn engage(&mut self, now: Instant) {
        self.expire(now);
        self.engaged = true;
    }

    /// Remember a path written during the current pass.
    pub fn record(&mut self, path: &str) {
        self.written.insert(path.to_string());
    }

    /// End the pass; the grace period starts now.
    pub fn release(&mut self, now: Instant) {
        self.engaged = false;
        self.release_at = Some(now + self.grace);
    }

    pub fn is_engaged(&self) -> bool {
        self.engaged
    }

    /// Whether a change to `path` at `now` is an echo of our own write.
    pub fn suppresses(&mut self, path: &str, now: Instant) -> bool {
        self.expire(now);
        self.written.contains(path)
    }

    fn expire(&mut self, now: Instant) {
        if !self.engaged && self.release_at.is_some_and(|at| now >= at) {
            self.written.clear();
            self.release_at = None;
        }
    }
}
