use std::path::{Path, PathBuf};

use tokio::time::{Duration, Instant};

/// Quiet window after the last observed change before acting.
pub const CHANGE_TIMEOUT: Duration = Duration::from_millis(1000);

/// Grace period after watch start during which events are ignored.
/// Prevents the watcher's own startup scan from triggering restarts.
pub const WATCH_GRACE: Duration = Duration::from_millis(500);

/// What a classified change means for the running server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeAction {
    /// Server-source change: kill the child, the supervisor respawns it.
    Restart,
    /// Asset change: notify the running child, no restart.
    Refresh,
}

/// Coalesces bursts of raw file-change events into at most one
/// classified action per quiet period. At most one change is armed at a
/// time; a newer event supersedes the check scheduled for the older one.
#[derive(Debug)]
pub struct Debouncer {
    api_root: PathBuf,
    ready_at: Instant,
    pending: Option<(PathBuf, Instant)>,
}

impl Debouncer {
    pub fn new(api_root: PathBuf, started_at: Instant) -> Self {
        Self {
            api_root,
            ready_at: started_at + WATCH_GRACE,
            pending: None,
        }
    }

    /// Record a raw change event, overwriting any previous pending one.
    /// Returns the stamp to schedule a check for at `stamp +
    /// CHANGE_TIMEOUT`, or None while the startup grace period runs.
    pub fn record(&mut self, path: PathBuf, now: Instant) -> Option<Instant> {
        if now < self.ready_at {
            return None;
        }
        self.pending = Some((path, now));
        Some(now)
    }

    /// Run the check scheduled for `stamp`. If a newer event has arrived
    /// since, the pending stamp differs and this check is a no-op.
    pub fn fire(&mut self, stamp: Instant) -> Option<ChangeAction> {
        if !matches!(&self.pending, Some((_, at)) if *at == stamp) {
            return None;
        }
        let (path, _) = self.pending.take()?;
        Some(self.classify(&path))
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    // Explicit prefix comparison against the absolute API directory, no
    // regex. Anything under it restarts, content is never inspected.
    fn classify(&self, path: &Path) -> ChangeAction {
        if path.starts_with(&self.api_root) {
            ChangeAction::Restart
        } else {
            ChangeAction::Refresh
        }
    }
}
