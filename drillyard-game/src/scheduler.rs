//! Cooperative deadline scheduler for timed effects.
//!
//! The scheduler owns a monotonic clock that only moves when [`Scheduler::advance`]
//! is called from the game loop tick. Tasks carry a [`CancelToken`]; a cancelled
//! task is dropped silently the next time the scheduler is advanced.
use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

/// Shared cancellation flag for a scheduled task.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Rc<Cell<bool>>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.set(true);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.get()
    }
}

/// Identifier of a scheduled task, unique per scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

#[derive(Debug)]
struct Task<T> {
    id: TaskId,
    deadline: Duration,
    token: CancelToken,
    payload: T,
}

/// Handle for a freshly scheduled task.
#[derive(Debug, Clone)]
pub struct Scheduled {
    pub id: TaskId,
    pub deadline: Duration,
    pub token: CancelToken,
}

#[derive(Debug)]
pub struct Scheduler<T> {
    now: Duration,
    next_id: u64,
    tasks: Vec<Task<T>>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self {
            now: Duration::ZERO,
            next_id: 0,
            tasks: Vec::new(),
        }
    }
}

impl<T> Scheduler<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current scheduler time.
    #[must_use]
    pub const fn now(&self) -> Duration {
        self.now
    }

    /// Schedule `payload` to fire `delay` after the current time.
    pub fn schedule_after(&mut self, delay: Duration, payload: T) -> Scheduled {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        let deadline = self.now.saturating_add(delay);
        let token = CancelToken::new();
        self.tasks.push(Task {
            id,
            deadline,
            token: token.clone(),
            payload,
        });
        Scheduled {
            id,
            deadline,
            token,
        }
    }

    /// Advance the clock by `dt` and return every due, uncancelled payload
    /// ordered by deadline, then by scheduling order.
    pub fn advance(&mut self, dt: Duration) -> Vec<T> {
        self.now = self.now.saturating_add(dt);
        let now = self.now;
        self.tasks.retain(|task| !task.token.is_cancelled());
        let (mut due, pending): (Vec<Task<T>>, Vec<Task<T>>) = std::mem::take(&mut self.tasks)
            .into_iter()
            .partition(|task| task.deadline <= now);
        self.tasks = pending;
        due.sort_by_key(|task| (task.deadline, task.id));
        due.into_iter().map(|task| task.payload).collect()
    }

    /// Cancel every pending task and return their payloads.
    pub fn cancel_all(&mut self) -> Vec<T> {
        let drained = std::mem::take(&mut self.tasks);
        drained
            .into_iter()
            .filter_map(|task| {
                let was_live = !task.token.is_cancelled();
                task.token.cancel();
                was_live.then_some(task.payload)
            })
            .collect()
    }

    /// Number of tasks that are neither due-and-fired nor cancelled.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.tasks
            .iter()
            .filter(|task| !task.token.is_cancelled())
            .count()
    }
}

/// Convert authored seconds into a duration. Negative and non-finite values
/// collapse to zero.
#[must_use]
pub fn seconds(value: f32) -> Duration {
    if value.is_finite() && value > 0.0 {
        Duration::try_from_secs_f32(value).unwrap_or(Duration::MAX)
    } else {
        Duration::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_in_deadline_order_once() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule_after(seconds(2.0), "late");
        scheduler.schedule_after(seconds(1.0), "early");
        scheduler.schedule_after(seconds(1.0), "early-second");

        assert!(scheduler.advance(seconds(0.5)).is_empty());
        assert_eq!(scheduler.advance(seconds(0.5)), vec!["early", "early-second"]);
        assert_eq!(scheduler.advance(seconds(5.0)), vec!["late"]);
        assert!(scheduler.advance(seconds(5.0)).is_empty());
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn cancelled_tasks_never_fire() {
        let mut scheduler = Scheduler::new();
        let first = scheduler.schedule_after(seconds(1.0), 1);
        let second = scheduler.schedule_after(seconds(1.0), 2);
        first.token.cancel();
        second.token.cancel();
        assert_eq!(scheduler.pending(), 0);
        assert!(scheduler.advance(seconds(2.0)).is_empty());
    }

    #[test]
    fn cancel_all_returns_live_payloads() {
        let mut scheduler = Scheduler::new();
        let a = scheduler.schedule_after(seconds(3.0), 'a');
        scheduler.schedule_after(seconds(3.0), 'b');
        a.token.cancel();
        assert_eq!(scheduler.cancel_all(), vec!['b']);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn seconds_rejects_invalid_values() {
        assert_eq!(seconds(-1.0), Duration::ZERO);
        assert_eq!(seconds(f32::NAN), Duration::ZERO);
        assert_eq!(seconds(1.5), Duration::from_millis(1500));
    }
}
