use foundation::time::Time;

/// Deterministic one-shot timer queue.
///
/// Key properties:
/// - Total ordering on `(due, id)`.
/// - Timers due at the same instant fire in insertion order.
/// - Cancellation removes the timer without perturbing the others.
///
/// Vec-backed: the dashboard keeps a handful of timers alive at most.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(pub u64);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct Key {
    due: Time,
    id: TimerId,
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        self.due.cmp(&other.due).then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug)]
struct Entry<T> {
    key: Key,
    payload: T,
}

#[derive(Debug)]
pub struct TimerQueue<T> {
    next_id: u64,
    entries: Vec<Entry<T>>,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn schedule(&mut self, due: Time, payload: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.entries.push(Entry {
            key: Key { due, id },
            payload,
        });
        id
    }

    /// Returns the payload of the canceled timer, `None` if it already fired
    /// or never existed.
    pub fn cancel(&mut self, id: TimerId) -> Option<T> {
        let idx = self.entries.iter().position(|e| e.key.id == id)?;
        Some(self.entries.swap_remove(idx).payload)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn contains(&self, id: TimerId) -> bool {
        self.entries.iter().any(|e| e.key.id == id)
    }

    /// Earliest pending deadline.
    pub fn next_due(&self) -> Option<Time> {
        self.entries.iter().map(|e| e.key).min().map(|k| k.due)
    }

    /// Pops the earliest timer whose deadline is `<= now`.
    pub fn pop_due(&mut self, now: Time) -> Option<(TimerId, T)> {
        let mut best_idx: Option<usize> = None;
        for (idx, entry) in self.entries.iter().enumerate() {
            if entry.key.due > now {
                continue;
            }
            match best_idx {
                None => best_idx = Some(idx),
                Some(best) => {
                    if entry.key < self.entries[best].key {
                        best_idx = Some(idx);
                    }
                }
            }
        }

        let idx = best_idx?;
        let entry = self.entries.swap_remove(idx);
        Some((entry.key.id, entry.payload))
    }

    /// Pops every timer due at `now`, in firing order.
    pub fn drain_due(&mut self, now: Time) -> Vec<(TimerId, T)> {
        let mut out = Vec::new();
        while let Some(fired) = self.pop_due(now) {
            out.push(fired);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::TimerQueue;
    use foundation::time::Time;

    #[test]
    fn same_deadline_fires_in_insertion_order() {
        let mut q = TimerQueue::new();
        q.schedule(Time(10), "a");
        q.schedule(Time(10), "b");
        q.schedule(Time(10), "c");

        let fired: Vec<_> = q.drain_due(Time(10)).into_iter().map(|(_, v)| v).collect();
        assert_eq!(fired, vec!["a", "b", "c"]);
    }

    #[test]
    fn earlier_deadline_fires_first() {
        let mut q = TimerQueue::new();
        q.schedule(Time(30), "late");
        q.schedule(Time(5), "early");
        assert_eq!(q.next_due(), Some(Time(5)));
        let (_, v) = q.pop_due(Time(100)).unwrap();
        assert_eq!(v, "early");
    }

    #[test]
    fn nothing_fires_before_deadline() {
        let mut q = TimerQueue::new();
        q.schedule(Time(50), ());
        assert!(q.pop_due(Time(49)).is_none());
        assert!(q.pop_due(Time(50)).is_some());
        assert!(q.is_empty());
    }

    #[test]
    fn cancel_removes_only_that_timer() {
        let mut q = TimerQueue::new();
        let a = q.schedule(Time(0), "a");
        let b = q.schedule(Time(0), "b");
        assert_eq!(q.cancel(a), Some("a"));
        assert_eq!(q.cancel(a), None);
        assert!(q.contains(b));

        let (id, v) = q.pop_due(Time(0)).unwrap();
        assert_eq!((id, v), (b, "b"));
        assert!(q.pop_due(Time(0)).is_none());
    }
}
