use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;

pub type WarningHandler = Arc<dyn Fn(&str) + Send + Sync>;

/// Per-client record of platform warnings already surfaced to the caller.
#[derive(Default)]
pub(crate) struct WarningTracker {
    seen: Mutex<HashSet<String>>,
    handler: Mutex<Option<WarningHandler>>,
}

impl WarningTracker {
    pub(crate) fn set_handler(&self, handler: WarningHandler) {
        *self.handler.lock() = Some(handler);
    }

    /// Invokes the handler unless `warning` was already reported. Returns
    /// whether this warning was new.
    pub(crate) fn observe(&self, warning: &str) -> bool {
        if !self.seen.lock().insert(warning.to_string()) {
            return false;
        }
        tracing::debug!(target: "skiff::warnings", warning, "platform warning");
        let handler = self.handler.lock().clone();
        if let Some(handler) = handler {
            handler(warning);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recording_tracker() -> (WarningTracker, Arc<Mutex<Vec<String>>>) {
        let tracker = WarningTracker::default();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        tracker.set_handler(Arc::new(move |warning: &str| {
            sink.lock().push(warning.to_string());
        }));
        (tracker, seen)
    }

    #[test]
    fn repeated_warning_fires_once() {
        let (tracker, seen) = recording_tracker();
        for _ in 0..5 {
            tracker.observe("stack is deprecated");
        }
        assert_eq!(seen.lock().as_slice(), ["stack is deprecated"]);
    }

    #[test]
    fn distinct_warnings_each_fire() {
        let (tracker, seen) = recording_tracker();
        assert!(tracker.observe("first"));
        assert!(tracker.observe("second"));
        assert!(!tracker.observe("first"));
        assert_eq!(seen.lock().as_slice(), ["first", "second"]);
    }

    #[test]
    fn warnings_without_handler_are_still_tracked() {
        let tracker = WarningTracker::default();
        assert!(tracker.observe("quota nearly exhausted"));
        assert!(!tracker.observe("quota nearly exhausted"));
    }
}
