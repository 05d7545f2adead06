#![forbid(unsafe_code)]

//! Lifesim public facade crate.
//!
//! Re-exports the value types, the virtual-time runtime and the lifecycle
//! harness behind one dependency, plus a prelude for test files.

// --- Core re-exports -------------------------------------------------------

pub use lifesim_core::{
    Bundle, ConfigChanges, Configuration, ConfigurationContext, ConfigurationOverride,
    ConfigurationSource, Intent, Orientation, SimError, SimResult, UiMode,
};

// --- Runtime re-exports ----------------------------------------------------

pub use lifesim_runtime::{
    BACKGROUND_LOOPER, FIRST_HANDLE, Handler, Looper, LooperMode, LooperModeContext,
    LooperModeOverride, LooperRegistry, MAIN_LOOPER, NULL_HANDLE, PauseScope, RefRegistry,
    ReleasePolicy, Scheduler, SchedulerConfig, SchedulerStats, StrongRef, TaskToken, VirtualTime,
};

// --- Harness re-exports ----------------------------------------------------

#[cfg(feature = "harness")]
pub use lifesim_harness::{
    Component, ComponentContext, ComponentState, ControllerBuilder, Environment, Fragment,
    FragmentManager, HostContainer, LifecycleController, LifecycleObserver, SimConfig, SurfaceId,
    Transcript, Window, WindowManager,
};

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        Bundle, ConfigChanges, Configuration, Handler, Intent, Looper, LooperMode, Orientation,
        SimError, SimResult,
    };

    #[cfg(feature = "harness")]
    pub use crate::{
        Component, ComponentContext, ComponentState, Environment, Fragment, LifecycleController,
        SimConfig, Transcript,
    };

    pub use crate::{core, runtime};

    #[cfg(feature = "harness")]
    pub use crate::harness;
}

pub use lifesim_core as core;
#[cfg(feature = "harness")]
pub use lifesim_harness as harness;
pub use lifesim_runtime as runtime;
