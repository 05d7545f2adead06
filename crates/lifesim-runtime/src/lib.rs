#![forbid(unsafe_code)]

//! Lifesim Runtime
//!
//! Deterministic, single-threaded stand-ins for a platform message loop and
//! for native object lifetime tracking.
//!
//! # Key Components
//!
//! - [`Scheduler`] - virtual clock plus task queue ordered by `(execute_at, sequence)`
//! - [`PauseScope`] - scoped pause that drains on release only if it did the pausing
//! - [`Looper`] - a named scheduler, one per logical thread
//! - [`LooperRegistry`] - the set of loopers (main, background, ...) of one environment
//! - [`Handler`] - posts work onto one specific looper and can retract it
//! - [`LooperModeContext`] - resolves whether loopers start paused or eager
//! - [`RefRegistry`] / [`StrongRef`] - reference-counted opaque handles
//!
//! # Time model
//! Nothing here touches the wall clock. Virtual time only moves inside
//! [`Scheduler::advance_to`] and its relatives; queued work only runs inside
//! an explicit drain or, for an unpaused scheduler, as part of the `post`
//! that made it due.

pub mod handler;
pub mod looper;
pub mod looper_mode;
pub mod native_ref;
pub mod scheduler;

pub use handler::Handler;
pub use looper::{BACKGROUND_LOOPER, Looper, LooperRegistry, MAIN_LOOPER};
pub use looper_mode::{LOOPER_MODE_ENV, LooperMode, LooperModeContext, LooperModeOverride};
pub use native_ref::{FIRST_HANDLE, NULL_HANDLE, RefRegistry, ReleasePolicy, StrongRef};
pub use scheduler::{
    PauseScope, Scheduler, SchedulerConfig, SchedulerStats, TaskToken, VirtualTime,
};
