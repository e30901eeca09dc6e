//! Ordered collections of PIDs. Queues hold PIDs, not
//! owned descriptors — the Process Table is the sole owner.
//!
//! The original source's callback-based queue comparisons
//! (`compare_time`, `compare_priority`, function pointers) map either to a
//! sum-typed ordering or to per-queue methods; we take the latter since each
//! queue has exactly one fixed ordering rule and never needs to switch it at
//! runtime.

use std::collections::VecDeque;

/// Ready Queue: ascending priority, FIFO within a priority class.
#[derive(Debug, Default)]
pub struct ReadyQueue {
    items: VecDeque<i32>,
    priorities: VecDeque<i32>,
}

impl ReadyQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Insert stably: after every existing entry with `priority <= new
    /// priority`, so FIFO is preserved among equals.
    pub fn insert(&mut self, pid: i32, priority: i32) {
        let idx = self
            .priorities
            .iter()
            .position(|&p| p > priority)
            .unwrap_or(self.items.len());
        self.items.insert(idx, pid);
        self.priorities.insert(idx, priority);
    }

    pub fn pop_front(&mut self) -> Option<i32> {
        self.priorities.pop_front();
        self.items.pop_front()
    }

    pub fn remove(&mut self, pid: i32) -> bool {
        if let Some(idx) = self.items.iter().position(|&p| p == pid) {
            self.items.remove(idx);
            self.priorities.remove(idx);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, pid: i32) -> bool {
        self.items.contains(&pid)
    }

    /// Re-sort stably after a priority change.
    pub fn reorder(&mut self, pid: i32, new_priority: i32) {
        if self.remove(pid) {
            self.insert(pid, new_priority);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = i32> + '_ {
        self.items.iter().copied()
    }
}

/// Timer Queue: ascending `wake_time`.
#[derive(Debug, Default)]
pub struct TimerQueue {
    items: VecDeque<i32>,
    wake_times: VecDeque<u32>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn insert(&mut self, pid: i32, wake_time: u32) {
        let idx = self
            .wake_times
            .iter()
            .position(|&w| w > wake_time)
            .unwrap_or(self.items.len());
        self.items.insert(idx, pid);
        self.wake_times.insert(idx, wake_time);
    }

    pub fn peek_head_wake_time(&self) -> Option<u32> {
        self.wake_times.front().copied()
    }

    pub fn remove(&mut self, pid: i32) -> bool {
        if let Some(idx) = self.items.iter().position(|&p| p == pid) {
            self.items.remove(idx);
            self.wake_times.remove(idx);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, pid: i32) -> bool {
        self.items.contains(&pid)
    }

    /// Drain every entry with `wake_time <= now`, in ascending wake-time
    /// order.
    pub fn drain_due(&mut self, now: u32) -> Vec<i32> {
        let mut due = Vec::new();
        while matches!(self.wake_times.front(), Some(&w) if w <= now) {
            self.wake_times.pop_front();
            due.push(self.items.pop_front().unwrap());
        }
        due
    }

    pub fn iter(&self) -> impl Iterator<Item = i32> + '_ {
        self.items.iter().copied()
    }
}

/// Suspend Queue: FIFO, with a reverse (LIFO) insert used for disk-completion
/// retries.
#[derive(Debug, Default)]
pub struct SuspendQueue {
    items: VecDeque<i32>,
}

impl SuspendQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_back(&mut self, pid: i32) {
        self.items.push_back(pid);
    }

    /// "reverse-insert" — push to the head, used when re-queueing a deferred
    /// disk retry so it is re-examined before older waiters.
    pub fn push_front(&mut self, pid: i32) {
        self.items.push_front(pid);
    }

    pub fn remove(&mut self, pid: i32) -> bool {
        if let Some(idx) = self.items.iter().position(|&p| p == pid) {
            self.items.remove(idx);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, pid: i32) -> bool {
        self.items.contains(&pid)
    }

    pub fn iter(&self) -> impl Iterator<Item = i32> + '_ {
        self.items.iter().copied()
    }
}

/// Free physical frame indices.
#[derive(Debug)]
pub struct FramePool {
    free: VecDeque<u16>,
}

impl FramePool {
    pub fn new(phys_frames: usize) -> Self {
        Self {
            free: (0..phys_frames as u16).collect(),
        }
    }

    pub fn pop(&mut self) -> Option<u16> {
        self.free.pop_front()
    }

    pub fn push(&mut self, frame: u16) {
        self.free.push_back(frame);
    }

    pub fn is_empty(&self) -> bool {
        self.free.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_queue_orders_by_priority_fifo_within_class() {
        let mut q = ReadyQueue::new();
        q.insert(1, 10);
        q.insert(2, 5);
        q.insert(3, 10);
        q.insert(4, 5);
        // priority 5 first (2 before 4, FIFO), then priority 10 (1 before 3).
        assert_eq!(q.pop_front(), Some(2));
        assert_eq!(q.pop_front(), Some(4));
        assert_eq!(q.pop_front(), Some(1));
        assert_eq!(q.pop_front(), Some(3));
    }

    #[test]
    fn timer_queue_drains_due_in_ascending_order() {
        let mut q = TimerQueue::new();
        q.insert(1, 100);
        q.insert(2, 50);
        q.insert(3, 75);
        assert_eq!(q.drain_due(80), vec![2, 3]);
        assert_eq!(q.peek_head_wake_time(), Some(100));
    }

    #[test]
    fn suspend_queue_reverse_insert_is_lifo_at_head() {
        let mut q = SuspendQueue::new();
        q.push_back(1);
        q.push_back(2);
        q.push_front(3);
        assert_eq!(q.iter().collect::<Vec<_>>(), vec![3, 1, 2]);
    }
}
