#![forbid(unsafe_code)]

//! One simulated process: loopers, ambient configuration, host windows and
//! the handle registry, wired together for building controllers.

use std::rc::Rc;

use lifesim_core::{ConfigurationContext, Intent, SimResult};
use lifesim_runtime::{Looper, LooperRegistry, RefRegistry};
use tracing::debug;

use crate::component::Component;
use crate::config::SimConfig;
use crate::controller::{ControllerBuilder, LifecycleController};
use crate::host::WindowManager;

/// Shared collaborators for the controllers of one test.
pub struct Environment {
    config: SimConfig,
    loopers: LooperRegistry,
    configuration: ConfigurationContext,
    window_manager: WindowManager,
    refs: RefRegistry,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new(SimConfig::default())
    }
}

impl Environment {
    #[must_use]
    pub fn new(config: SimConfig) -> Self {
        debug!(
            looper_mode = %config.looper_mode,
            start_time = config.start_time,
            release_policy = ?config.release_policy,
            "environment created"
        );
        Self {
            loopers: LooperRegistry::new(config.looper_mode, config.start_time),
            configuration: ConfigurationContext::new(config.configuration.clone()),
            window_manager: WindowManager::new(),
            refs: RefRegistry::with_policy(config.release_policy),
            config,
        }
    }

    /// Environment configured by [`SimConfig::from_env`].
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(SimConfig::from_env())
    }

    #[must_use]
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    #[must_use]
    pub fn loopers(&self) -> &LooperRegistry {
        &self.loopers
    }

    /// The foreground looper every controller of this environment uses.
    #[must_use]
    pub fn main_looper(&self) -> Looper {
        self.loopers.main()
    }

    /// Ambient configuration read by `configuration_change()`.
    #[must_use]
    pub fn configuration(&self) -> &ConfigurationContext {
        &self.configuration
    }

    #[must_use]
    pub fn window_manager(&self) -> &WindowManager {
        &self.window_manager
    }

    #[must_use]
    pub fn refs(&self) -> &RefRegistry {
        &self.refs
    }

    /// Builder wired to this environment's main looper, window manager and
    /// configuration.
    pub fn builder<C: Component>(&self, factory: impl Fn() -> C + 'static) -> ControllerBuilder<C> {
        ControllerBuilder::new(self.main_looper(), factory)
            .host(Rc::new(self.window_manager.clone()))
            .configuration_source(Rc::new(self.configuration.clone()))
    }

    /// Controller for a default-constructed `C`.
    #[must_use]
    pub fn build<C: Component + Default>(&self) -> LifecycleController<C> {
        self.builder(C::default).build()
    }

    /// Controller for a default-constructed `C` started with `intent`.
    #[must_use]
    pub fn build_with_intent<C: Component + Default>(&self, intent: Intent) -> LifecycleController<C> {
        self.builder(C::default).intent(intent).build()
    }

    /// Controller whose instances come from `factory`.
    #[must_use]
    pub fn build_with<C: Component>(&self, factory: impl Fn() -> C + 'static) -> LifecycleController<C> {
        self.builder(factory).build()
    }

    /// Build a default `C` and run [`LifecycleController::setup`] on it.
    pub fn setup<C: Component + Default>(&self) -> SimResult<LifecycleController<C>> {
        let mut controller = self.build::<C>();
        controller.setup()?;
        Ok(controller)
    }

    /// Reset every looper and forget attached windows.
    pub fn reset(&self) {
        self.loopers.reset();
        self.window_manager.clear();
    }
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("config", &self.config)
            .field("loopers", &self.loopers)
            .field("windows", &self.window_manager.len())
            .field("refs", &self.refs)
            .finish()
    }
}
