use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Keyed accumulator with a single-shot timer.
///
/// Every `push` stores the latest value for its key and moves the deadline to
/// `now + quiet`. Once the deadline passes, `take_due` hands back the whole
/// batch at once. Time is passed in by the caller, so the same logic serves a
/// tokio timer task and plain unit tests.
#[derive(Debug, Clone)]
pub struct Debouncer<K: Ord, V> {
    quiet: Duration,
    pending: BTreeMap<K, V>,
    deadline: Option<Instant>,
}

impl<K: Ord, V> Debouncer<K, V> {
    pub fn new(quiet: Duration) -> Self {
        Debouncer {
            quiet,
            pending: BTreeMap::new(),
            deadline: None,
        }
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet
    }

    /// Record `value` for `key`, replacing any earlier pending value, and
    /// restart the timer.
    pub fn push(&mut self, key: K, value: V, now: Instant) {
        self.pending.insert(key, value);
        self.deadline = Some(now + self.quiet);
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.pending.get(key)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_due(&self, now: Instant) -> bool {
        matches!(self.deadline, Some(deadline) if now >= deadline)
    }

    /// The accumulated batch if the quiet period has elapsed. Clears the timer.
    pub fn take_due(&mut self, now: Instant) -> Option<BTreeMap<K, V>> {
        if !self.is_due(now) {
            return None;
        }
        self.deadline = None;
        Some(std::mem::take(&mut self.pending))
    }

    /// Drop pending entries whose key no longer qualifies. The timer is
    /// cancelled if nothing is left.
    pub fn retain<F: FnMut(&K) -> bool>(&mut self, mut keep: F) {
        self.pending.retain(|k, _| keep(k));
        if self.pending.is_empty() {
            self.deadline = None;
        }
    }

    pub fn clear(&mut self) {
        self.pending.clear();
        self.deadline = None;
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
