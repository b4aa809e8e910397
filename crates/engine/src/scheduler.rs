//! Timed visual work.
//!
//! Visual transitions are split into tasks that fire later. Tasks are plain
//! data: the grid runs them against its own cells when they come due, and
//! every task that touches a cell carries the phase it was scheduled under
//! so a superseded task does nothing.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use rustc_hash::FxHashMap;

use crate::cell::StyleKind;
use crate::fader::FaderId;
use crate::sliding::SlidingRef;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisualTask {
    /// Show the staged value and hot styles.
    CommitValue { cell: SlidingRef, phase: u64 },
    /// Apply the staged hot or cold styles.
    CommitStyle { cell: SlidingRef, phase: u64, kind: StyleKind },
    /// Start a prepared colour fade.
    LaunchFader { fader: FaderId },
    /// Advance every running fade by one step.
    FadeTick,
}

impl VisualTask {
    /// Row key of the cell the task touches directly.
    pub fn key(&self) -> Option<&str> {
        match self {
            VisualTask::CommitValue { cell, .. } | VisualTask::CommitStyle { cell, .. } => Some(&cell.key),
            VisualTask::LaunchFader { .. } | VisualTask::FadeTick => None,
        }
    }
}

/// Clock and queue the grid hands its timed tasks to.
pub trait TaskScheduler {
    /// Current time in milliseconds.
    fn now(&self) -> u64;

    fn schedule_after(&mut self, delay_ms: u64, task: VisualTask);

    /// Pop the earliest task due at or before `deadline`, moving the clock
    /// to its due time. Tasks due at the same time come out in the order
    /// they were scheduled.
    fn take_due(&mut self, deadline: u64) -> Option<VisualTask>;

    /// Move the clock forward to `now` (never backwards).
    fn set_now(&mut self, now: u64);

    /// Number of tasks not yet run.
    fn pending(&self) -> usize;

    /// Drop every queued task `doomed` picks. Returns how many went.
    fn cancel(&mut self, doomed: &mut dyn FnMut(&VisualTask) -> bool) -> usize;
}

/// Deterministic virtual-clock scheduler.
#[derive(Debug, Default)]
pub struct TimerQueue {
    now: u64,
    seq: u64,
    queue: BinaryHeap<Reverse<(u64, u64)>>,
    tasks: FxHashMap<u64, VisualTask>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Due time of the next task, if any.
    pub fn next_due(&self) -> Option<u64> {
        self.queue.peek().map(|Reverse((due, _))| *due)
    }
}

impl TaskScheduler for TimerQueue {
    fn now(&self) -> u64 {
        self.now
    }

    fn schedule_after(&mut self, delay_ms: u64, task: VisualTask) {
        let seq = self.seq;
        self.seq += 1;
        self.queue.push(Reverse((self.now + delay_ms, seq)));
        self.tasks.insert(seq, task);
    }

    fn take_due(&mut self, deadline: u64) -> Option<VisualTask> {
        let Reverse((due, seq)) = *self.queue.peek()?;
        if due > deadline {
            return None;
        }
        self.queue.pop();
        self.set_now(due);
        self.tasks.remove(&seq)
    }

    fn set_now(&mut self, now: u64) {
        self.now = self.now.max(now);
    }

    fn pending(&self) -> usize {
        self.queue.len()
    }

    fn cancel(&mut self, doomed: &mut dyn FnMut(&VisualTask) -> bool) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|_, task| !doomed(task));
        let tasks = &self.tasks;
        self.queue.retain(|Reverse((_, seq))| tasks.contains_key(seq));
        before - self.tasks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commit(key: &str) -> VisualTask {
        VisualTask::CommitValue {
            cell: SlidingRef::new(key, "f"),
            phase: 1,
        }
    }

    #[test]
    fn test_tasks_come_out_by_due_time_then_order() {
        let mut q = TimerQueue::new();
        q.schedule_after(20, commit("late"));
        q.schedule_after(10, commit("a"));
        q.schedule_after(10, commit("b"));

        assert_eq!(q.take_due(5), None);
        assert_eq!(q.take_due(100), Some(commit("a")));
        assert_eq!(q.now(), 10);
        assert_eq!(q.take_due(100), Some(commit("b")));
        assert_eq!(q.take_due(100), Some(commit("late")));
        assert_eq!(q.now(), 20);
        assert_eq!(q.pending(), 0);
    }

    #[test]
    fn test_cancel_drops_only_picked_tasks() {
        let mut q = TimerQueue::new();
        q.schedule_after(10, commit("a"));
        q.schedule_after(10, commit("b"));
        q.schedule_after(20, VisualTask::FadeTick);
        q.schedule_after(30, commit("a"));

        let dropped = q.cancel(&mut |task| task.key() == Some("a"));
        assert_eq!(dropped, 2);
        assert_eq!(q.pending(), 2);
        assert_eq!(q.take_due(100), Some(commit("b")));
        assert_eq!(q.take_due(100), Some(VisualTask::FadeTick));
        assert_eq!(q.take_due(100), None);
    }

    #[test]
    fn test_delay_is_relative_to_clock() {
        let mut q = TimerQueue::new();
        q.set_now(100);
        q.schedule_after(5, VisualTask::FadeTick);
        assert_eq!(q.next_due(), Some(105));

        q.set_now(50);
        assert_eq!(q.now(), 100, "clock never goes back");
    }
}
