//! Property-based invariant tests for the virtual-time scheduler.
//!
//! 1. `advance_to(T)` runs every task due at or before `T` exactly once, in
//!    `(execute_at, sequence)` order, and nothing due later.
//! 2. The clock lands on `T` after `advance_to(T)`.
//! 3. `idle` is idempotent once nothing is due.
//! 4. A paused scheduler runs nothing until drained explicitly.
//! 5. Cancelled tasks never run.
//! 6. An unpaused scheduler never holds an overdue task between calls.
//! 7. Splitting an advance into steps runs the same tasks in the same order.

use std::cell::RefCell;
use std::rc::Rc;

use lifesim_runtime::{Scheduler, SchedulerConfig};
use proptest::prelude::*;

// ── Helpers ───────────────────────────────────────────────────────────────

fn paused_scheduler() -> Scheduler {
    Scheduler::new(SchedulerConfig {
        start_time: 0,
        start_paused: true,
    })
}

fn delays(max_len: usize) -> impl Strategy<Value = Vec<i64>> {
    proptest::collection::vec(0i64..=100, 0..=max_len)
}

/// Post one recording task per delay; the log receives the task's index.
fn post_all(scheduler: &Scheduler, delays: &[i64]) -> Rc<RefCell<Vec<usize>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    for (index, &delay) in delays.iter().enumerate() {
        let sink = Rc::clone(&log);
        scheduler
            .post_delayed(move || sink.borrow_mut().push(index), delay)
            .unwrap();
    }
    log
}

fn expected_order(delays: &[i64], limit: u64) -> Vec<usize> {
    let mut due: Vec<(i64, usize)> = delays
        .iter()
        .enumerate()
        .filter(|&(_, &delay)| delay as u64 <= limit)
        .map(|(index, &delay)| (delay, index))
        .collect();
    due.sort_unstable();
    due.into_iter().map(|(_, index)| index).collect()
}

// ─── 1–2. advance_to runs exactly the due tasks, in order ─────────────────

proptest! {
    #[test]
    fn advance_runs_due_tasks_once_in_order(
        delays in delays(40),
        target in 0u64..=150,
    ) {
        let scheduler = paused_scheduler();
        let log = post_all(&scheduler, &delays);

        let executed = scheduler.advance_to(target).unwrap();

        let expected = expected_order(&delays, target);
        prop_assert_eq!(executed, expected.len());
        prop_assert_eq!(&*log.borrow(), &expected);
        prop_assert_eq!(scheduler.current_time(), target);
        prop_assert_eq!(scheduler.pending_count(), delays.len() - expected.len());
    }
}

// ─── 3. idle is idempotent ────────────────────────────────────────────────

proptest! {
    #[test]
    fn idle_is_idempotent(delays in delays(30), start in 0u64..=50) {
        let scheduler = paused_scheduler();
        scheduler.advance_to(start).unwrap();
        let log = post_all(&scheduler, &delays);

        scheduler.idle();
        let after_first = log.borrow().len();
        let time = scheduler.current_time();

        prop_assert_eq!(scheduler.idle(), 0);
        prop_assert_eq!(log.borrow().len(), after_first);
        prop_assert_eq!(scheduler.current_time(), time);
    }
}

// ─── 4. paused scheduler runs nothing on post ─────────────────────────────

proptest! {
    #[test]
    fn paused_scheduler_runs_nothing_until_drained(delays in delays(50)) {
        let scheduler = paused_scheduler();
        let log = post_all(&scheduler, &delays);
        for _ in 0..delays.len() {
            let sink = Rc::clone(&log);
            scheduler.post(move || sink.borrow_mut().push(usize::MAX));
        }

        prop_assert!(log.borrow().is_empty());
        prop_assert_eq!(scheduler.pending_count(), delays.len() * 2);
        prop_assert_eq!(scheduler.stats().executed, 0);
    }
}

// ─── 5. cancelled tasks never run ─────────────────────────────────────────

proptest! {
    #[test]
    fn cancelled_tasks_never_run(
        entries in proptest::collection::vec((0i64..=50, any::<bool>()), 0..=30),
    ) {
        let scheduler = paused_scheduler();
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut kept = Vec::new();
        for (index, &(delay, cancel)) in entries.iter().enumerate() {
            let sink = Rc::clone(&log);
            let token = scheduler
                .post_delayed(move || sink.borrow_mut().push(index), delay)
                .unwrap();
            if cancel {
                prop_assert!(token.cancel());
            } else {
                kept.push((delay, index));
            }
        }

        scheduler.advance_to_last_scheduled().unwrap();

        kept.sort_unstable();
        let expected: Vec<usize> = kept.into_iter().map(|(_, index)| index).collect();
        prop_assert_eq!(&*log.borrow(), &expected);
        prop_assert_eq!(scheduler.pending_count(), 0);
    }
}

// ─── 6. unpaused scheduler keeps nothing overdue ──────────────────────────

proptest! {
    #[test]
    fn unpaused_scheduler_holds_no_overdue_task(
        delays in delays(30),
        steps in proptest::collection::vec(0u64..=40, 1..=5),
    ) {
        let scheduler = Scheduler::new(SchedulerConfig::default());
        let _log = post_all(&scheduler, &delays);
        for step in steps {
            scheduler.advance_by(step).unwrap();
            scheduler.post(|| {});
            if let Some(next) = scheduler.next_task_time() {
                prop_assert!(next > scheduler.current_time());
            }
        }
    }
}

// ─── 7. stepwise advance matches a single advance ─────────────────────────

proptest! {
    #[test]
    fn stepwise_advance_matches_single_advance(
        delays in delays(30),
        steps in proptest::collection::vec(0u64..=30, 1..=6),
    ) {
        let total: u64 = steps.iter().sum();

        let single = paused_scheduler();
        let single_log = post_all(&single, &delays);
        single.advance_to(total).unwrap();

        let stepped = paused_scheduler();
        let stepped_log = post_all(&stepped, &delays);
        for step in steps {
            stepped.advance_by(step).unwrap();
        }

        prop_assert_eq!(&*single_log.borrow(), &*stepped_log.borrow());
        prop_assert_eq!(single.current_time(), stepped.current_time());
    }
}
