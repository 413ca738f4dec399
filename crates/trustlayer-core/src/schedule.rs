//! Deferred work on a virtual timeline
//!
//! Time is a [`Duration`] since the clock's epoch. Front ends poll with the
//! current time; tests drive a [`ManualClock`] instead of sleeping.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub trait Clock: Send + Sync {
    /// Time elapsed since this clock's epoch
    fn now(&self) -> Duration;
}

#[derive(Debug, Clone)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { start: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    millis: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.millis.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn set(&self, at: Duration) {
        self.millis.store(at.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_millis(self.millis.load(Ordering::SeqCst))
    }
}

/// Handle returned by [`TaskQueue::schedule`], used to cancel the task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskHandle {
    due: Duration,
    id: u64,
}

impl TaskHandle {
    pub fn due(&self) -> Duration {
        self.due
    }
}

/// Pending tasks ordered by due time, ties broken by scheduling order
#[derive(Debug)]
pub struct TaskQueue<T> {
    next_id: u64,
    pending: BTreeMap<(Duration, u64), T>,
}

impl<T> Default for TaskQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TaskQueue<T> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            pending: BTreeMap::new(),
        }
    }

    pub fn schedule(&mut self, due: Duration, task: T) -> TaskHandle {
        let id = self.next_id;
        self.next_id += 1;
        self.pending.insert((due, id), task);
        TaskHandle { due, id }
    }

    /// Returns the task if it had not fired or been cancelled yet
    pub fn cancel(&mut self, handle: TaskHandle) -> Option<T> {
        self.pending.remove(&(handle.due, handle.id))
    }

    /// Drops everything still pending and reports how many tasks that was
    pub fn cancel_all(&mut self) -> usize {
        let n = self.pending.len();
        self.pending.clear();
        n
    }

    /// Removes and returns every task due at or before `now`, in firing order
    pub fn take_due(&mut self, now: Duration) -> Vec<T> {
        let mut due = Vec::new();
        while let Some(entry) = self.pending.first_entry() {
            if entry.key().0 > now {
                break;
            }
            due.push(entry.remove());
        }
        due
    }

    pub fn next_due(&self) -> Option<Duration> {
        self.pending.keys().next().map(|(due, _)| *due)
    }

    pub fn pending(&self) -> impl Iterator<Item = &T> {
        self.pending.values()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_take_due_orders_by_time_then_insertion() {
        let mut q = TaskQueue::new();
        q.schedule(ms(200), "c");
        q.schedule(ms(100), "a");
        q.schedule(ms(100), "b");
        q.schedule(ms(300), "d");

        assert!(q.take_due(ms(50)).is_empty());
        assert_eq!(q.take_due(ms(200)), vec!["a", "b", "c"]);
        assert_eq!(q.next_due(), Some(ms(300)));
        assert_eq!(q.take_due(ms(1000)), vec!["d"]);
        assert!(q.is_empty());
    }

    #[test]
    fn test_cancel_single_task() {
        let mut q = TaskQueue::new();
        let keep = q.schedule(ms(10), 1);
        let drop = q.schedule(ms(10), 2);
        assert_eq!(q.cancel(drop), Some(2));
        assert_eq!(q.cancel(drop), None);
        assert_eq!(keep.due(), ms(10));
        assert_eq!(q.take_due(ms(10)), vec![1]);
    }

    #[test]
    fn test_cancel_all() {
        let mut q = TaskQueue::new();
        q.schedule(ms(1), ());
        q.schedule(ms(2), ());
        assert_eq!(q.cancel_all(), 2);
        assert!(q.take_due(ms(100)).is_empty());
    }

    #[test]
    fn test_manual_clock_clones_share_time() {
        let clock = ManualClock::new();
        let other = clock.clone();
        clock.advance(ms(750));
        assert_eq!(other.now(), ms(750));
        other.set(ms(10));
        assert_eq!(clock.now(), ms(10));
    }

    #[test]
    fn test_system_clock_moves_forward() {
        let clock = SystemClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
