#![forbid(unsafe_code)]

//! Virtual clock and task queue.
//!
//! A [`Scheduler`] owns a monotonic virtual clock and a queue of scheduled
//! actions. Tasks are ordered by `(execute_at, sequence)`: the sequence number
//! is assigned at post time, so tasks due at the same instant run in the order
//! they were posted.
//!
//! # Key Invariants
//!
//! 1. **Monotonic clock**: `current_time` never decreases.
//! 2. **FIFO ties**: equal `execute_at` runs in post order.
//! 3. **Exactly once**: a task runs at most once; cancelled tasks never run.
//! 4. **Eager while unpaused**: a due task posted to an unpaused scheduler
//!    that is not mid-drain has run by the time `post` returns. Tasks queued
//!    while paused stay queued across [`Scheduler::unpause`] until the next
//!    drain.
//!
//! # Paused vs unpaused
//!
//! | Mode | `post` of a due task | Draining |
//! |------|----------------------|----------|
//! | unpaused | runs before `post` returns (unless a drain is in progress) | explicit or eager |
//! | paused | queued | explicit only (`idle`, `advance_to`, ...) |
//!
//! [`Scheduler::unpause`] never drains by itself. The lifecycle controller's
//! "pause, run callback, drain" pattern is expressed as a [`PauseScope`].

use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::collections::binary_heap::PeekMut;
use std::fmt;
use std::rc::{Rc, Weak};

use lifesim_core::{SimError, SimResult};
use tracing::{debug, trace};

/// Virtual time in milliseconds.
pub type VirtualTime = u64;

/// Scheduler construction parameters.
#[derive(Debug, Clone, Default)]
pub struct SchedulerConfig {
    /// Initial value of the virtual clock.
    pub start_time: VirtualTime,
    /// Whether the scheduler starts paused.
    pub start_paused: bool,
}

/// Counters accumulated over the scheduler's life.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Tasks accepted by `post*`.
    pub posted: u64,
    /// Tasks whose action ran.
    pub executed: u64,
    /// Cancelled tasks dropped from the queue without running.
    pub cancelled: u64,
    /// Completed drain passes (`idle`, `advance_to`, eager runs).
    pub drains: u64,
}

/// A queued action.
struct ScheduledTask {
    execute_at: VirtualTime,
    seq: u64,
    cancelled: Rc<Cell<bool>>,
    action: Box<dyn FnOnce()>,
}

impl PartialEq for ScheduledTask {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for ScheduledTask {}

impl PartialOrd for ScheduledTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledTask {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap: earliest deadline first, then lowest sequence.
        other
            .execute_at
            .cmp(&self.execute_at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Cancellation token for a posted task.
///
/// Holds only a weak reference to the task's cancellation flag: the queue
/// keeps ownership, and once the task has run (or been discarded) the token
/// reports it as no longer pending.
#[derive(Clone)]
pub struct TaskToken {
    seq: u64,
    execute_at: VirtualTime,
    flag: Weak<Cell<bool>>,
}

impl TaskToken {
    /// Sequence number assigned when the task was posted.
    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.seq
    }

    /// Virtual time at which the task is due.
    #[must_use]
    pub fn execute_at(&self) -> VirtualTime {
        self.execute_at
    }

    /// Whether the task is still queued and not cancelled.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.flag.upgrade().is_some_and(|flag| !flag.get())
    }

    /// Mark the task cancelled. Returns `true` if it was still pending.
    pub fn cancel(&self) -> bool {
        match self.flag.upgrade() {
            Some(flag) if !flag.get() => {
                flag.set(true);
                trace!(seq = self.seq, "task cancelled");
                true
            }
            _ => false,
        }
    }
}

impl fmt::Debug for TaskToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskToken")
            .field("seq", &self.seq)
            .field("execute_at", &self.execute_at)
            .field("pending", &self.is_pending())
            .finish()
    }
}

struct SchedulerState {
    now: VirtualTime,
    paused: bool,
    drain_depth: u32,
    next_seq: u64,
    queue: BinaryHeap<ScheduledTask>,
    stats: SchedulerStats,
}

/// Single-threaded virtual-time task scheduler.
///
/// All methods take `&self`; tasks may post further tasks onto the scheduler
/// that is running them. The queue is never borrowed while an action runs.
pub struct Scheduler {
    label: String,
    config: SchedulerConfig,
    state: RefCell<SchedulerState>,
}

impl Scheduler {
    /// Create a scheduler with the given configuration.
    #[must_use]
    pub fn new(config: SchedulerConfig) -> Self {
        Self::with_label("scheduler", config)
    }

    /// Create a scheduler whose log events carry `label`.
    #[must_use]
    pub fn with_label(label: impl Into<String>, config: SchedulerConfig) -> Self {
        let state = SchedulerState {
            now: config.start_time,
            paused: config.start_paused,
            drain_depth: 0,
            next_seq: 0,
            queue: BinaryHeap::new(),
            stats: SchedulerStats::default(),
        };
        Self {
            label: label.into(),
            config,
            state: RefCell::new(state),
        }
    }

    /// Label used in log events.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Current virtual time.
    #[must_use]
    pub fn current_time(&self) -> VirtualTime {
        self.state.borrow().now
    }

    /// Whether the scheduler is paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.state.borrow().paused
    }

    /// Whether a drain is currently running on this scheduler.
    #[must_use]
    pub fn is_draining(&self) -> bool {
        self.state.borrow().drain_depth > 0
    }

    /// Stop eager execution. Posts still enqueue.
    pub fn pause(&self) {
        self.state.borrow_mut().paused = true;
    }

    /// Resume eager execution for future posts. Does not drain.
    pub fn unpause(&self) {
        self.state.borrow_mut().paused = false;
    }

    /// Enqueue `action` at the current time.
    pub fn post(&self, action: impl FnOnce() + 'static) -> TaskToken {
        let now = self.current_time();
        self.enqueue(now, Box::new(action))
    }

    /// Enqueue `action` at `current_time + delay_ms`.
    ///
    /// A negative delay is rejected with `IllegalArgument`.
    pub fn post_delayed(
        &self,
        action: impl FnOnce() + 'static,
        delay_ms: i64,
    ) -> SimResult<TaskToken> {
        let delay = u64::try_from(delay_ms).map_err(|_| {
            SimError::illegal_argument(format!("negative delay {delay_ms}ms on {}", self.label))
        })?;
        let execute_at = self.current_time().checked_add(delay).ok_or_else(|| {
            SimError::illegal_argument(format!("delay {delay_ms}ms overflows virtual time"))
        })?;
        Ok(self.enqueue(execute_at, Box::new(action)))
    }

    /// Enqueue `action` at the absolute time `execute_at`.
    ///
    /// A time earlier than the current time is rejected with `IllegalArgument`.
    pub fn post_at(
        &self,
        action: impl FnOnce() + 'static,
        execute_at: VirtualTime,
    ) -> SimResult<TaskToken> {
        let now = self.current_time();
        if execute_at < now {
            return Err(SimError::illegal_argument(format!(
                "cannot post at {execute_at}, {} is already at {now}",
                self.label
            )));
        }
        Ok(self.enqueue(execute_at, Box::new(action)))
    }

    fn enqueue(&self, execute_at: VirtualTime, action: Box<dyn FnOnce()>) -> TaskToken {
        let cancelled = Rc::new(Cell::new(false));
        let (token, run_eagerly) = {
            let mut state = self.state.borrow_mut();
            let seq = state.next_seq;
            state.next_seq += 1;
            state.stats.posted += 1;
            let token = TaskToken {
                seq,
                execute_at,
                flag: Rc::downgrade(&cancelled),
            };
            state.queue.push(ScheduledTask {
                execute_at,
                seq,
                cancelled,
                action,
            });
            trace!(
                scheduler = %self.label,
                seq,
                execute_at,
                now = state.now,
                "task posted"
            );
            let run_eagerly = !state.paused && state.drain_depth == 0 && execute_at <= state.now;
            (token, run_eagerly)
        };
        if run_eagerly {
            let now = self.current_time();
            self.run_due(now);
        }
        token
    }

    /// Run every task due at or before the current time, including tasks that
    /// become due while draining. Does not advance time.
    ///
    /// Returns the number of tasks executed.
    pub fn idle(&self) -> usize {
        let now = self.current_time();
        self.run_due(now)
    }

    /// Run, in order, every task with `execute_at <= time`, then set the
    /// clock to `time`.
    ///
    /// Moving the clock backwards is rejected with `IllegalArgument`.
    pub fn advance_to(&self, time: VirtualTime) -> SimResult<usize> {
        let now = self.current_time();
        if time < now {
            return Err(SimError::illegal_argument(format!(
                "cannot move {} back from {now} to {time}",
                self.label
            )));
        }
        let executed = self.run_due(time);
        let mut state = self.state.borrow_mut();
        state.now = state.now.max(time);
        Ok(executed)
    }

    /// [`advance_to`](Self::advance_to) `current_time + delta_ms`.
    pub fn advance_by(&self, delta_ms: u64) -> SimResult<usize> {
        let target = self.current_time().checked_add(delta_ms).ok_or_else(|| {
            SimError::illegal_argument(format!("advance by {delta_ms}ms overflows virtual time"))
        })?;
        self.advance_to(target)
    }

    /// Advance to the latest `execute_at` among queued, uncancelled tasks.
    ///
    /// A no-op returning `0` when nothing is queued.
    pub fn advance_to_last_scheduled(&self) -> SimResult<usize> {
        match self.last_task_time() {
            Some(last) => {
                let target = last.max(self.current_time());
                self.advance_to(target)
            }
            None => Ok(0),
        }
    }

    /// Run the next uncancelled task, moving the clock forward to its time if
    /// it is in the future. Returns `false` when the queue is empty.
    pub fn run_one_task(&self) -> bool {
        let task = loop {
            let task = {
                let mut guard = self.state.borrow_mut();
                let state = &mut *guard;
                let Some(task) = state.queue.pop() else {
                    return false;
                };
                if task.cancelled.get() {
                    state.stats.cancelled += 1;
                } else {
                    state.now = state.now.max(task.execute_at);
                    state.stats.executed += 1;
                    state.drain_depth += 1;
                }
                task
            };
            if task.cancelled.get() {
                // Dropped outside the borrow: captures may touch this scheduler.
                drop(task);
                continue;
            }
            break task;
        };
        let _depth = DrainDepth(self);
        trace!(scheduler = %self.label, seq = task.seq, "running task");
        (task.action)();
        true
    }

    fn run_due(&self, limit: VirtualTime) -> usize {
        self.state.borrow_mut().drain_depth += 1;
        let _depth = DrainDepth(self);
        let mut executed = 0usize;
        loop {
            let task = {
                let mut guard = self.state.borrow_mut();
                let state = &mut *guard;
                let Some(top) = state.queue.peek_mut() else {
                    break;
                };
                if top.execute_at > limit {
                    break;
                }
                let task = PeekMut::pop(top);
                if task.cancelled.get() {
                    state.stats.cancelled += 1;
                } else {
                    state.now = state.now.max(task.execute_at);
                    state.stats.executed += 1;
                }
                task
            };
            if task.cancelled.get() {
                drop(task);
                continue;
            }
            trace!(
                scheduler = %self.label,
                seq = task.seq,
                execute_at = task.execute_at,
                "running task"
            );
            (task.action)();
            executed += 1;
        }
        let mut state = self.state.borrow_mut();
        state.stats.drains += 1;
        debug!(
            scheduler = %self.label,
            limit,
            executed,
            now = state.now,
            remaining = state.queue.len(),
            "drain complete"
        );
        executed
    }

    /// Number of queued, uncancelled tasks.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.state
            .borrow()
            .queue
            .iter()
            .filter(|task| !task.cancelled.get())
            .count()
    }

    /// Whether any uncancelled task is queued.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.pending_count() > 0
    }

    /// Earliest `execute_at` among queued, uncancelled tasks.
    #[must_use]
    pub fn next_task_time(&self) -> Option<VirtualTime> {
        self.state
            .borrow()
            .queue
            .iter()
            .filter(|task| !task.cancelled.get())
            .map(|task| task.execute_at)
            .min()
    }

    /// Latest `execute_at` among queued, uncancelled tasks.
    #[must_use]
    pub fn last_task_time(&self) -> Option<VirtualTime> {
        self.state
            .borrow()
            .queue
            .iter()
            .filter(|task| !task.cancelled.get())
            .map(|task| task.execute_at)
            .max()
    }

    /// Drop every queued task without running it.
    pub fn clear(&self) {
        let dropped = {
            let mut state = self.state.borrow_mut();
            std::mem::take(&mut state.queue)
        };
        debug!(scheduler = %self.label, dropped = dropped.len(), "queue cleared");
        // Actions are dropped here, outside the borrow: their captures may
        // own handles that touch this scheduler when dropped.
        drop(dropped);
    }

    /// Clear the queue and restore the configured start time and pause state.
    /// Sequence numbers keep counting up.
    pub fn reset(&self) {
        self.clear();
        let mut state = self.state.borrow_mut();
        state.now = self.config.start_time;
        state.paused = self.config.start_paused;
        state.stats = SchedulerStats::default();
    }

    /// Counters accumulated since creation or the last [`reset`](Self::reset).
    #[must_use]
    pub fn stats(&self) -> SchedulerStats {
        self.state.borrow().stats
    }

    /// Pause for the lifetime of the returned scope.
    ///
    /// If the scheduler was unpaused, [`PauseScope::finish`] unpauses it and
    /// drains everything that became due. If it was already paused, the scope
    /// leaves it paused and drains nothing, so a caller that paused on purpose
    /// keeps control over when queued work runs.
    pub fn pause_scope(self: &Rc<Self>) -> PauseScope {
        let paused_here = {
            let mut state = self.state.borrow_mut();
            let was_paused = state.paused;
            state.paused = true;
            !was_paused
        };
        trace!(scheduler = %self.label, paused_here, "pause scope acquired");
        PauseScope {
            scheduler: Rc::clone(self),
            paused_here,
            finished: false,
        }
    }

    /// Run `f` inside a [`PauseScope`] and finish the scope afterwards.
    pub fn run_paused<R>(self: &Rc<Self>, f: impl FnOnce() -> R) -> R {
        let scope = self.pause_scope();
        let out = f();
        scope.finish();
        out
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Scheduler")
            .field("label", &self.label)
            .field("now", &state.now)
            .field("paused", &state.paused)
            .field("queued", &state.queue.len())
            .finish()
    }
}

/// Decrements the drain depth on scope exit, including unwinding.
struct DrainDepth<'a>(&'a Scheduler);

impl Drop for DrainDepth<'_> {
    fn drop(&mut self) {
        let mut state = self.0.state.borrow_mut();
        state.drain_depth = state.drain_depth.saturating_sub(1);
    }
}

/// Scoped pause acquired by [`Scheduler::pause_scope`].
///
/// Dropping the scope without calling [`finish`](Self::finish) (for example
/// while unwinding out of a panicking callback) restores the previous pause
/// state without draining.
#[must_use = "dropping the scope releases the pause without draining"]
pub struct PauseScope {
    scheduler: Rc<Scheduler>,
    paused_here: bool,
    finished: bool,
}

impl PauseScope {
    /// Whether this scope paused a previously unpaused scheduler.
    #[must_use]
    pub fn paused_here(&self) -> bool {
        self.paused_here
    }

    /// Release the pause. Drains due work only if this scope did the pausing.
    ///
    /// Returns the number of tasks executed by the drain.
    pub fn finish(mut self) -> usize {
        self.finished = true;
        if !self.paused_here {
            return 0;
        }
        self.scheduler.unpause();
        self.scheduler.idle()
    }
}

impl Drop for PauseScope {
    fn drop(&mut self) {
        if !self.finished && self.paused_here {
            self.scheduler.unpause();
        }
    }
}

impl fmt::Debug for PauseScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PauseScope")
            .field("scheduler", &self.scheduler.label)
            .field("paused_here", &self.paused_here)
            .finish()
    }
}
