#![forbid(unsafe_code)]

//! Named cooperative message loops.
//!
//! A [`Looper`] gives a [`Scheduler`] the identity of a logical thread. Each
//! looper has its own clock and queue; there is no parallel execution, only
//! virtual-time interleaving driven by explicit calls. Work meant for another
//! thread must be posted to that thread's looper (see [`crate::Handler`]).

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use lifesim_core::SimResult;
use tracing::debug;

use crate::looper_mode::LooperMode;
use crate::scheduler::{PauseScope, Scheduler, SchedulerConfig, SchedulerStats, TaskToken, VirtualTime};

/// Name of the foreground (UI) looper.
pub const MAIN_LOOPER: &str = "main";

/// Name of the default background looper.
pub const BACKGROUND_LOOPER: &str = "background";

/// A named, single-threaded virtual-time message loop.
///
/// Cloning is cheap and yields a handle to the same loop.
#[derive(Clone)]
pub struct Looper {
    name: Rc<str>,
    scheduler: Rc<Scheduler>,
}

impl Looper {
    /// Create a looper with its own scheduler.
    #[must_use]
    pub fn new(name: &str, config: SchedulerConfig) -> Self {
        Self {
            name: Rc::from(name),
            scheduler: Rc::new(Scheduler::with_label(name, config)),
        }
    }

    /// The looper's thread name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The underlying scheduler.
    #[must_use]
    pub fn scheduler(&self) -> &Rc<Scheduler> {
        &self.scheduler
    }

    /// Whether both handles refer to the same loop.
    #[must_use]
    pub fn ptr_eq(&self, other: &Looper) -> bool {
        Rc::ptr_eq(&self.scheduler, &other.scheduler)
    }

    /// See [`Scheduler::post`].
    pub fn post(&self, action: impl FnOnce() + 'static) -> TaskToken {
        self.scheduler.post(action)
    }

    /// See [`Scheduler::post_delayed`].
    pub fn post_delayed(&self, action: impl FnOnce() + 'static, delay_ms: i64) -> SimResult<TaskToken> {
        self.scheduler.post_delayed(action, delay_ms)
    }

    /// See [`Scheduler::post_at`].
    pub fn post_at(&self, action: impl FnOnce() + 'static, execute_at: VirtualTime) -> SimResult<TaskToken> {
        self.scheduler.post_at(action, execute_at)
    }

    /// See [`Scheduler::idle`].
    pub fn idle(&self) -> usize {
        self.scheduler.idle()
    }

    /// See [`Scheduler::advance_to`].
    pub fn advance_to(&self, time: VirtualTime) -> SimResult<usize> {
        self.scheduler.advance_to(time)
    }

    /// See [`Scheduler::advance_by`].
    pub fn advance_by(&self, delta_ms: u64) -> SimResult<usize> {
        self.scheduler.advance_by(delta_ms)
    }

    /// See [`Scheduler::advance_to_last_scheduled`].
    pub fn advance_to_last_scheduled(&self) -> SimResult<usize> {
        self.scheduler.advance_to_last_scheduled()
    }

    /// See [`Scheduler::run_one_task`].
    pub fn run_one_task(&self) -> bool {
        self.scheduler.run_one_task()
    }

    /// See [`Scheduler::pause`].
    pub fn pause(&self) {
        self.scheduler.pause();
    }

    /// See [`Scheduler::unpause`].
    pub fn unpause(&self) {
        self.scheduler.unpause();
    }

    /// See [`Scheduler::is_paused`].
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.scheduler.is_paused()
    }

    /// See [`Scheduler::current_time`].
    #[must_use]
    pub fn current_time(&self) -> VirtualTime {
        self.scheduler.current_time()
    }

    /// See [`Scheduler::pending_count`].
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.scheduler.pending_count()
    }

    /// See [`Scheduler::stats`].
    #[must_use]
    pub fn stats(&self) -> SchedulerStats {
        self.scheduler.stats()
    }

    /// See [`Scheduler::pause_scope`].
    pub fn pause_scope(&self) -> PauseScope {
        self.scheduler.pause_scope()
    }

    /// See [`Scheduler::run_paused`].
    pub fn run_paused<R>(&self, f: impl FnOnce() -> R) -> R {
        self.scheduler.run_paused(f)
    }
}

impl fmt::Debug for Looper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Looper")
            .field("name", &self.name)
            .field("now", &self.current_time())
            .field("paused", &self.is_paused())
            .field("pending", &self.pending_count())
            .finish()
    }
}

/// The loopers of one simulated process.
///
/// The main looper follows the configured [`LooperMode`]; every other looper
/// starts paused so background work only runs when a test drives it.
pub struct LooperRegistry {
    mode: LooperMode,
    start_time: VirtualTime,
    loopers: RefCell<BTreeMap<String, Looper>>,
}

impl LooperRegistry {
    /// Registry with a main and a background looper.
    #[must_use]
    pub fn new(mode: LooperMode, start_time: VirtualTime) -> Self {
        let registry = Self {
            mode,
            start_time,
            loopers: RefCell::new(BTreeMap::new()),
        };
        registry.get_or_create(MAIN_LOOPER);
        registry.get_or_create(BACKGROUND_LOOPER);
        registry
    }

    /// Mode the registry was created with.
    #[must_use]
    pub fn mode(&self) -> LooperMode {
        self.mode
    }

    /// The foreground looper.
    #[must_use]
    pub fn main(&self) -> Looper {
        self.get_or_create(MAIN_LOOPER)
    }

    /// The default background looper.
    #[must_use]
    pub fn background(&self) -> Looper {
        self.get_or_create(BACKGROUND_LOOPER)
    }

    /// Looper named `name`, if it exists.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Looper> {
        self.loopers.borrow().get(name).cloned()
    }

    /// Looper named `name`, creating it on first use.
    pub fn get_or_create(&self, name: &str) -> Looper {
        if let Some(looper) = self.get(name) {
            return looper;
        }
        let config = SchedulerConfig {
            start_time: self.start_time,
            start_paused: name != MAIN_LOOPER || self.mode.starts_paused(),
        };
        let looper = Looper::new(name, config);
        debug!(looper = name, mode = %self.mode, "looper created");
        self.loopers
            .borrow_mut()
            .insert(name.to_string(), looper.clone());
        looper
    }

    /// Names of all loopers, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.loopers.borrow().keys().cloned().collect()
    }

    /// Idle every looper, repeating until a full pass executes nothing, so
    /// work bounced between loopers at the current times settles.
    pub fn idle_all(&self) -> usize {
        let loopers: Vec<Looper> = self.loopers.borrow().values().cloned().collect();
        let mut total = 0;
        loop {
            let pass: usize = loopers.iter().map(Looper::idle).sum();
            total += pass;
            if pass == 0 {
                return total;
            }
        }
    }

    /// Reset every looper to its start state.
    pub fn reset(&self) {
        let loopers: Vec<Looper> = self.loopers.borrow().values().cloned().collect();
        for looper in loopers {
            looper.scheduler().reset();
        }
    }
}

impl fmt::Debug for LooperRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LooperRegistry")
            .field("mode", &self.mode)
            .field("loopers", &self.names())
            .finish()
    }
}
