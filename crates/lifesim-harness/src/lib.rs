#![forbid(unsafe_code)]

//! Lifecycle harness: drive a UI component through its lifecycle
//! deterministically, without a device.
//!
//! - [`LifecycleController`] - the state machine, pause/drain protocol and
//!   configuration-change recreation
//! - [`Component`] - callbacks a test subject implements
//! - [`ComponentContext`] - intent, configuration, main handler, fragments,
//!   window and theme of one instance
//! - [`FragmentManager`] / [`Fragment`] - child objects, retained or saved
//!   across recreation
//! - [`WindowManager`] - in-memory [`HostContainer`] recording attached surfaces
//! - [`Transcript`] - test-scoped ordered log, also a [`LifecycleObserver`]
//! - [`Environment`] / [`SimConfig`] - loopers, configuration, host and
//!   handle registry for one test
//!
//! # Quick Start
//!
//! ```ignore
//! use lifesim_harness::{Component, ComponentContext, Environment};
//!
//! #[derive(Default)]
//! struct Screen;
//!
//! impl Component for Screen {
//!     fn on_resume(&mut self, ctx: &mut ComponentContext) {
//!         ctx.run_on_ui_thread(|| println!("resumed"));
//!     }
//! }
//!
//! let env = Environment::default();
//! let controller = env.setup::<Screen>()?;
//! assert!(controller.context().window().is_attached());
//! ```

pub mod component;
pub mod config;
pub mod context;
pub mod controller;
pub mod environment;
pub mod fragment;
pub mod host;
pub mod state;
pub mod transcript;

pub use component::Component;
pub use config::{START_TIME_ENV, SimConfig};
pub use context::ComponentContext;
pub use controller::{ControllerBuilder, LifecycleController};
pub use environment::Environment;
pub use fragment::{Fragment, FragmentManager, RetainedState, SAVED_FRAGMENTS_KEY};
pub use host::{Attachment, HostContainer, SurfaceId, Window, WindowManager};
pub use state::ComponentState;
pub use transcript::{LifecycleObserver, Transcript};
