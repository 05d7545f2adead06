#![forbid(unsafe_code)]

//! Deterministic lifecycle driver.
//!
//! A [`LifecycleController`] owns one component instance and its
//! [`ComponentContext`], and moves it through the lifecycle state machine on
//! command:
//!
//! | Command | Valid from | To | Callbacks |
//! |---------|------------|----|-----------|
//! | `create` | NEW | CREATED | `on_create` |
//! | `start` | CREATED | STARTED | `on_start` |
//! | `resume` | STARTED, PAUSED | RESUMED | `on_resume`, `on_post_resume` |
//! | `pause` | CREATED, STARTED, RESUMED | PAUSED | `on_pause` |
//! | `stop` | STARTED, PAUSED | STOPPED | `on_stop` |
//! | `restart` | STOPPED | STARTED (via RESTARTING) | `on_restart`, `on_start` |
//! | `destroy` | anything but DESTROYED | DESTROYED | whatever is missing of `on_pause`, `on_stop`, `on_destroy` |
//!
//! # Transition protocol
//!
//! Every lifecycle command runs inside a [`PauseScope`] on the main looper:
//! the looper is paused (if it was running), the callback runs synchronously,
//! and the scope drains the looper afterwards only if it did the pausing.
//! Work a callback posts with zero delay has therefore run by the time the
//! command returns, unless the test paused the looper itself. Delayed posts
//! stay queued until the test advances the clock.
//!
//! # Configuration changes
//!
//! When every changed axis is in [`Component::handled_config_changes`], the
//! instance keeps running and receives `on_configuration_changed`. Otherwise
//! the controller saves state, tears the instance down, builds a new one from
//! its factory, re-attaches retained children, and drives the new instance to
//! RESUMED, all inside a single pause scope.
//!
//! # Failure
//!
//! Invalid commands fail with `IllegalState` before any callback runs. A
//! panicking callback unwinds out of the command unmodified; the pause scope
//! restores the looper's paused flag without draining, and the instance is
//! left in whatever state it reached.
//!
//! [`PauseScope`]: lifesim_runtime::PauseScope

use std::fmt;
use std::rc::Rc;

use lifesim_core::{
    Bundle, Configuration, ConfigurationContext, ConfigurationSource, Intent, SimError, SimResult,
};
use lifesim_runtime::{Handler, Looper};
use tracing::{debug, info};

use crate::component::Component;
use crate::context::ComponentContext;
use crate::fragment::{FragmentManager, RetainedState};
use crate::host::{HostContainer, WindowManager};
use crate::state::ComponentState;
use crate::transcript::LifecycleObserver;

use crate::state::ComponentState::{
    Created, Destroyed, New, Paused, Restarting, Resumed, Started, Stopped,
};

/// Configures and builds a [`LifecycleController`].
pub struct ControllerBuilder<C: Component> {
    factory: Box<dyn Fn() -> C>,
    instance: Option<C>,
    looper: Looper,
    host: Rc<dyn HostContainer>,
    configuration_source: Rc<dyn ConfigurationSource>,
    intent: Option<Intent>,
    observers: Vec<Rc<dyn LifecycleObserver>>,
}

impl<C: Component> ControllerBuilder<C> {
    /// Builder driving instances made by `factory` on `looper`.
    ///
    /// Defaults: a private [`WindowManager`] host and the thread's global
    /// [`ConfigurationContext`].
    pub fn new(looper: Looper, factory: impl Fn() -> C + 'static) -> Self {
        Self {
            factory: Box::new(factory),
            instance: None,
            looper,
            host: Rc::new(WindowManager::new()),
            configuration_source: Rc::new(ConfigurationContext::global()),
            intent: None,
            observers: Vec::new(),
        }
    }

    /// Drive this instance first; the factory is only used for recreation.
    #[must_use]
    pub fn instance(mut self, instance: C) -> Self {
        self.instance = Some(instance);
        self
    }

    /// Start with `intent`. Its component is filled in when absent.
    #[must_use]
    pub fn intent(mut self, intent: Intent) -> Self {
        self.intent = Some(intent);
        self
    }

    #[must_use]
    pub fn host(mut self, host: Rc<dyn HostContainer>) -> Self {
        self.host = host;
        self
    }

    #[must_use]
    pub fn configuration_source(mut self, source: Rc<dyn ConfigurationSource>) -> Self {
        self.configuration_source = source;
        self
    }

    #[must_use]
    pub fn observer(mut self, observer: Rc<dyn LifecycleObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    #[must_use]
    pub fn build(self) -> LifecycleController<C> {
        let name = std::any::type_name::<C>().to_string();
        let mut intent = self.intent.unwrap_or_default();
        if intent.component().is_none() {
            intent.set_component(name.clone());
        }
        let configuration = self.configuration_source.configuration();
        let handler = Handler::new(self.looper.clone());
        let component = match self.instance {
            Some(instance) => instance,
            None => (self.factory)(),
        };
        LifecycleController {
            component,
            context: ComponentContext::new(name, intent, configuration, handler),
            state: New,
            looper: self.looper,
            host: self.host,
            configuration_source: self.configuration_source,
            factory: self.factory,
            observers: self.observers,
            recreations: 0,
        }
    }
}

/// Drives one component through its lifecycle.
///
/// Commands return `&mut Self` so they chain:
///
/// ```ignore
/// controller.create()?.start()?.resume()?;
/// ```
pub struct LifecycleController<C: Component> {
    component: C,
    context: ComponentContext,
    state: ComponentState,
    looper: Looper,
    host: Rc<dyn HostContainer>,
    configuration_source: Rc<dyn ConfigurationSource>,
    factory: Box<dyn Fn() -> C>,
    observers: Vec<Rc<dyn LifecycleObserver>>,
    recreations: u32,
}

impl<C: Component> LifecycleController<C> {
    /// Builder for instances made by `factory`, driven on `looper`.
    pub fn builder(looper: Looper, factory: impl Fn() -> C + 'static) -> ControllerBuilder<C> {
        ControllerBuilder::new(looper, factory)
    }

    // ── Accessors ────────────────────────────────────────────────────────

    /// The current component instance.
    #[must_use]
    pub fn component(&self) -> &C {
        &self.component
    }

    pub fn component_mut(&mut self) -> &mut C {
        &mut self.component
    }

    /// The current instance's context.
    #[must_use]
    pub fn context(&self) -> &ComponentContext {
        &self.context
    }

    /// Mutable context, for test setup such as [`ComponentContext::set_theme`].
    pub fn context_mut(&mut self) -> &mut ComponentContext {
        &mut self.context
    }

    #[must_use]
    pub fn state(&self) -> ComponentState {
        self.state
    }

    /// The looper transitions pause and drain.
    #[must_use]
    pub fn looper(&self) -> &Looper {
        &self.looper
    }

    /// How many times the instance was replaced by a configuration change.
    #[must_use]
    pub fn recreations(&self) -> u32 {
        self.recreations
    }

    // ── Lifecycle commands ───────────────────────────────────────────────

    /// NEW → CREATED.
    pub fn create(&mut self) -> SimResult<&mut Self> {
        self.create_with(None)
    }

    /// NEW → CREATED, passing `saved_state` to `on_create`.
    ///
    /// Fragments saved in `saved_state` are re-instantiated before
    /// `on_create` runs, so the component can look them up by tag.
    pub fn create_with(&mut self, saved_state: Option<&Bundle>) -> SimResult<&mut Self> {
        self.expect_state("create", &[New])?;
        if let Some(saved) = saved_state {
            *self.context.fragments_mut() = FragmentManager::restore(Vec::new(), Some(saved))?;
        }
        self.paused(|this| {
            this.component.on_create(&mut this.context, saved_state);
            this.move_to(Created);
            Ok(())
        })?;
        Ok(self)
    }

    /// CREATED → STARTED.
    pub fn start(&mut self) -> SimResult<&mut Self> {
        self.expect_state("start", &[Created])?;
        self.paused(|this| {
            this.component.on_start(&mut this.context);
            this.move_to(Started);
            Ok(())
        })?;
        Ok(self)
    }

    /// STARTED or PAUSED → RESUMED; calls `on_resume` then `on_post_resume`.
    pub fn resume(&mut self) -> SimResult<&mut Self> {
        self.expect_state("resume", &[Started, Paused])?;
        self.paused(|this| {
            this.component.on_resume(&mut this.context);
            this.move_to(Resumed);
            this.component.on_post_resume(&mut this.context);
            Ok(())
        })?;
        Ok(self)
    }

    /// CREATED, STARTED or RESUMED → PAUSED.
    pub fn pause(&mut self) -> SimResult<&mut Self> {
        self.expect_state("pause", &[Created, Started, Resumed])?;
        self.paused(|this| {
            this.component.on_pause(&mut this.context);
            this.move_to(Paused);
            Ok(())
        })?;
        Ok(self)
    }

    /// STARTED or PAUSED → STOPPED.
    pub fn stop(&mut self) -> SimResult<&mut Self> {
        self.expect_state("stop", &[Started, Paused])?;
        self.paused(|this| {
            this.component.on_stop(&mut this.context);
            this.move_to(Stopped);
            Ok(())
        })?;
        Ok(self)
    }

    /// STOPPED → RESTARTING → STARTED; calls `on_restart` then `on_start`.
    pub fn restart(&mut self) -> SimResult<&mut Self> {
        self.expect_state("restart", &[Stopped])?;
        self.paused(|this| {
            this.move_to(Restarting);
            this.component.on_restart(&mut this.context);
            this.component.on_start(&mut this.context);
            this.move_to(Started);
            Ok(())
        })?;
        Ok(self)
    }

    /// Any state → DESTROYED, pausing and stopping on the way as needed.
    pub fn destroy(&mut self) -> SimResult<&mut Self> {
        self.expect_not_destroyed("destroy")?;
        self.paused(|this| {
            this.teardown();
            Ok(())
        })?;
        Ok(self)
    }

    // ── Auxiliary callbacks (any created, not destroyed state) ───────────

    pub fn post_create(&mut self, saved_state: Option<&Bundle>) -> SimResult<&mut Self> {
        self.expect_alive("post_create")?;
        self.paused(|this| {
            this.component.on_post_create(&mut this.context, saved_state);
            Ok(())
        })?;
        Ok(self)
    }

    pub fn post_resume(&mut self) -> SimResult<&mut Self> {
        self.expect_alive("post_resume")?;
        self.paused(|this| {
            this.component.on_post_resume(&mut this.context);
            Ok(())
        })?;
        Ok(self)
    }

    pub fn restore_instance_state(&mut self, saved_state: &Bundle) -> SimResult<&mut Self> {
        self.expect_alive("restore_instance_state")?;
        self.paused(|this| {
            this.component
                .on_restore_instance_state(&mut this.context, saved_state);
            Ok(())
        })?;
        Ok(self)
    }

    /// Replace the intent and deliver it through `on_new_intent`.
    pub fn new_intent(&mut self, mut intent: Intent) -> SimResult<&mut Self> {
        self.expect_alive("new_intent")?;
        if intent.component().is_none() {
            intent.set_component(self.context.name().to_string());
        }
        self.paused(|this| {
            this.context.set_intent(intent.clone());
            this.component.on_new_intent(&mut this.context, &intent);
            Ok(())
        })?;
        Ok(self)
    }

    pub fn user_leaving(&mut self) -> SimResult<&mut Self> {
        self.expect_alive("user_leaving")?;
        self.paused(|this| {
            this.component.on_user_leave_hint(&mut this.context);
            Ok(())
        })?;
        Ok(self)
    }

    /// Attach the component's window surface to the host container.
    pub fn visible(&mut self) -> SimResult<&mut Self> {
        self.expect_alive("visible")?;
        self.paused(|this| {
            this.attach_window();
            Ok(())
        })?;
        Ok(self)
    }

    /// Set focus on the attached window and notify the component. Not a
    /// lifecycle transition: the looper is neither paused nor drained.
    ///
    /// Fails with `IllegalState` until [`visible`](Self::visible) attached
    /// the window.
    pub fn window_focus_changed(&mut self, has_focus: bool) -> SimResult<&mut Self> {
        self.expect_alive("window_focus_changed")?;
        if !self.context.window().is_attached() {
            return Err(SimError::illegal_state(format!(
                "window_focus_changed on {} before its window was attached",
                self.context.name()
            )));
        }
        self.context.window_mut().set_focus(has_focus);
        self.component
            .on_window_focus_changed(&mut self.context, has_focus);
        Ok(self)
    }

    /// Collect the instance state the component would save right now,
    /// including non-retained fragments.
    pub fn save_instance_state(&mut self) -> SimResult<Bundle> {
        self.expect_alive("save_instance_state")?;
        self.paused(|this| this.collect_instance_state())
    }

    // ── Composite commands ───────────────────────────────────────────────

    /// create → start → post_create → resume → visible. `resume` already
    /// runs `on_post_resume`, so it is called once.
    pub fn setup(&mut self) -> SimResult<&mut Self> {
        self.create()?
            .start()?
            .post_create(None)?
            .resume()?
            .visible()
    }

    /// Like [`setup`](Self::setup), creating from `saved_state` and
    /// restoring it between start and post_create.
    pub fn setup_with(&mut self, saved_state: &Bundle) -> SimResult<&mut Self> {
        self.create_with(Some(saved_state))?
            .start()?
            .restore_instance_state(saved_state)?
            .post_create(Some(saved_state))?
            .resume()?
            .visible()
    }

    /// Apply the configuration currently reported by the configuration source.
    pub fn configuration_change(&mut self) -> SimResult<&mut Self> {
        let configuration = self.configuration_source.configuration();
        self.configuration_change_to(configuration)
    }

    /// Apply `configuration`, recreating the instance unless every changed
    /// axis is self-handled.
    pub fn configuration_change_to(&mut self, configuration: Configuration) -> SimResult<&mut Self> {
        self.expect_not_destroyed("configuration_change")?;
        if self.state == New {
            // Nothing is running yet; `on_create` will see the new value.
            self.context.set_configuration(configuration);
            return Ok(self);
        }
        let changes = self.context.configuration().diff(&configuration);
        let unhandled = changes.difference(self.component.handled_config_changes());
        if unhandled.is_empty() {
            debug!(
                component = self.context.name(),
                changes = ?changes,
                "configuration change handled in place"
            );
            self.paused(|this| {
                this.context.set_configuration(configuration.clone());
                this.component
                    .on_configuration_changed(&mut this.context, &configuration);
                Ok(())
            })?;
            return Ok(self);
        }
        info!(
            component = self.context.name(),
            from = %self.state,
            unhandled = ?unhandled,
            "recreating for configuration change"
        );
        self.paused(|this| this.recreate(configuration))?;
        Ok(self)
    }

    // ── Internals ────────────────────────────────────────────────────────

    /// Run `f` with the main looper paused; drain afterwards if the pause
    /// was ours. An error or panic releases the pause without draining.
    fn paused<R>(&mut self, f: impl FnOnce(&mut Self) -> SimResult<R>) -> SimResult<R> {
        let scope = self.looper.pause_scope();
        let out = f(self)?;
        let drained = scope.finish();
        if drained > 0 {
            debug!(component = self.context.name(), drained, "transition drained looper");
        }
        Ok(out)
    }

    fn move_to(&mut self, to: ComponentState) {
        let from = std::mem::replace(&mut self.state, to);
        debug!(component = self.context.name(), %from, %to, "lifecycle transition");
        for observer in &self.observers {
            observer.on_transition(self.context.name(), from, to);
        }
    }

    fn expect_state(&self, command: &str, allowed: &[ComponentState]) -> SimResult<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(self.illegal(command))
        }
    }

    fn expect_alive(&self, command: &str) -> SimResult<()> {
        if self.state.is_alive() {
            Ok(())
        } else {
            Err(self.illegal(command))
        }
    }

    fn expect_not_destroyed(&self, command: &str) -> SimResult<()> {
        if self.state == Destroyed {
            Err(self.illegal(command))
        } else {
            Ok(())
        }
    }

    fn illegal(&self, command: &str) -> SimError {
        if self.state == Destroyed {
            SimError::illegal_state(format!(
                "{command} on {} after it was destroyed",
                self.context.name()
            ))
        } else {
            SimError::illegal_state(format!(
                "cannot {command} {} from {}",
                self.context.name(),
                self.state
            ))
        }
    }

    fn attach_window(&mut self) {
        let owner = self.context.name().to_string();
        self.context.window_mut().attach(&*self.host, &owner);
    }

    /// Walk down to DESTROYED from wherever the instance is.
    fn teardown(&mut self) {
        loop {
            match self.state {
                Resumed => {
                    self.component.on_pause(&mut self.context);
                    self.move_to(Paused);
                }
                Started | Paused | Restarting => {
                    self.component.on_stop(&mut self.context);
                    self.move_to(Stopped);
                }
                Created | Stopped => {
                    self.component.on_destroy(&mut self.context);
                    self.context.window_mut().detach(&*self.host);
                    self.move_to(Destroyed);
                }
                New => self.move_to(Destroyed),
                Destroyed => return,
            }
        }
    }

    fn collect_instance_state(&mut self) -> SimResult<Bundle> {
        let mut out = Bundle::new();
        self.component
            .on_save_instance_state(&mut self.context, &mut out);
        self.context.fragments().save_state(&mut out)?;
        Ok(out)
    }

    fn recreate(&mut self, configuration: Configuration) -> SimResult<()> {
        let was_visible = self.context.window().is_attached();

        self.context.set_changing_configurations(true);
        let non_config_instance = self
            .component
            .on_retain_non_config_instance(&mut self.context);
        let saved = self.collect_instance_state()?;
        self.teardown();
        let retained = RetainedState {
            fragments: self.context.fragments_mut().take_retained(),
            non_config_instance,
        };
        debug!(
            component = self.context.name(),
            retained = ?retained,
            saved_keys = saved.len(),
            "captured state for recreation"
        );

        let fragments = FragmentManager::restore(retained.fragments, Some(&saved))?;
        let context =
            self.context
                .successor(configuration, fragments, retained.non_config_instance);
        self.component = (self.factory)();
        self.context = context;
        self.state = New;
        self.recreations += 1;

        self.component.on_create(&mut self.context, Some(&saved));
        self.move_to(Created);
        self.component.on_start(&mut self.context);
        self.move_to(Started);
        self.component
            .on_restore_instance_state(&mut self.context, &saved);
        self.component.on_post_create(&mut self.context, Some(&saved));
        self.component.on_resume(&mut self.context);
        self.move_to(Resumed);
        self.component.on_post_resume(&mut self.context);
        if was_visible {
            self.attach_window();
        }
        Ok(())
    }
}

impl<C: Component> fmt::Debug for LifecycleController<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleController")
            .field("component", &self.context.name())
            .field("state", &self.state)
            .field("looper", &self.looper.name())
            .field("recreations", &self.recreations)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::{Fragment, SAVED_FRAGMENTS_KEY};
    use crate::transcript::Transcript;
    use lifesim_core::{ConfigChanges, Orientation};
    use lifesim_runtime::{LooperMode, LooperRegistry};

    struct Recorder {
        log: Transcript,
    }

    impl Component for Recorder {
        fn on_create(&mut self, _: &mut ComponentContext, saved: Option<&Bundle>) {
            self.log.add(if saved.is_some() { "onCreate(saved)" } else { "onCreate" });
        }
        fn on_start(&mut self, _: &mut ComponentContext) {
            self.log.add("onStart");
        }
        fn on_restart(&mut self, _: &mut ComponentContext) {
            self.log.add("onRestart");
        }
        fn on_resume(&mut self, _: &mut ComponentContext) {
            self.log.add("onResume");
        }
        fn on_post_resume(&mut self, _: &mut ComponentContext) {
            self.log.add("onPostResume");
        }
        fn on_pause(&mut self, _: &mut ComponentContext) {
            self.log.add("onPause");
        }
        fn on_stop(&mut self, _: &mut ComponentContext) {
            self.log.add("onStop");
        }
        fn on_destroy(&mut self, ctx: &mut ComponentContext) {
            self.log.add(if ctx.is_changing_configurations() {
                "onDestroy(changing)"
            } else {
                "onDestroy"
            });
        }
        fn on_save_instance_state(&mut self, _: &mut ComponentContext, out: &mut Bundle) {
            out.put("marker", &1u8).unwrap();
        }
        fn on_retain_non_config_instance(
            &mut self,
            _: &mut ComponentContext,
        ) -> Option<Box<dyn std::any::Any>> {
            Some(Box::new(String::from("kept")))
        }
    }

    fn controller(mode: LooperMode) -> (LifecycleController<Recorder>, Transcript) {
        let log = Transcript::new();
        let looper = LooperRegistry::new(mode, 0).main();
        let factory_log = log.clone();
        let controller = LifecycleController::builder(looper, move || Recorder {
            log: factory_log.clone(),
        })
        .configuration_source(Rc::new(ConfigurationContext::default()))
        .build();
        (controller, log)
    }

    #[test]
    fn happy_path_walks_the_state_machine() {
        let (mut c, log) = controller(LooperMode::Legacy);
        c.create().unwrap().start().unwrap().resume().unwrap();
        assert_eq!(c.state(), Resumed);
        c.pause().unwrap().stop().unwrap().restart().unwrap();
        assert_eq!(c.state(), Started);
        assert!(log.contains_in_order(&[
            "onCreate", "onStart", "onResume", "onPostResume", "onPause", "onStop", "onRestart",
            "onStart"
        ]));
    }

    #[test]
    fn invalid_transitions_are_illegal_state() {
        let (mut c, log) = controller(LooperMode::Legacy);
        assert_eq!(c.start().unwrap_err().kind(), "illegal_state");
        assert_eq!(c.post_resume().unwrap_err().kind(), "illegal_state");
        c.create().unwrap();
        assert!(c.create().is_err());
        assert!(c.restart().is_err());
        assert!(c.stop().is_err());
        assert_eq!(c.state(), Created);
        assert!(log.contains_exactly(&["onCreate"]));
    }

    #[test]
    fn destroy_runs_missing_teardown_callbacks() {
        let (mut c, log) = controller(LooperMode::Legacy);
        c.create().unwrap().start().unwrap().resume().unwrap();
        log.clear();
        c.destroy().unwrap();
        assert!(log.contains_exactly(&["onPause", "onStop", "onDestroy"]));
        assert_eq!(c.state(), Destroyed);
    }

    #[test]
    fn destroy_from_new_calls_nothing() {
        let (mut c, log) = controller(LooperMode::Legacy);
        c.destroy().unwrap();
        assert!(log.is_empty());
        assert_eq!(c.state(), Destroyed);
    }

    #[test]
    fn everything_fails_after_destroy() {
        let (mut c, _) = controller(LooperMode::Legacy);
        c.create().unwrap().destroy().unwrap();
        let err = c.destroy().unwrap_err();
        assert!(err.message().contains("after it was destroyed"));
        assert!(c.visible().is_err());
        assert!(c.window_focus_changed(true).is_err());
        assert!(c.configuration_change_to(Configuration::default()).is_err());
    }

    #[test]
    fn observers_see_every_transition() {
        let transitions = Transcript::new();
        let looper = LooperRegistry::new(LooperMode::Legacy, 0).main();
        let mut c = LifecycleController::builder(looper, || Recorder { log: Transcript::new() })
            .observer(Rc::new(transitions.clone()))
            .build();
        c.create().unwrap().start().unwrap().stop().unwrap().restart().unwrap();
        assert!(transitions.contains_exactly(&[
            "NEW->CREATED",
            "CREATED->STARTED",
            "STARTED->STOPPED",
            "STOPPED->RESTARTING",
            "RESTARTING->STARTED",
        ]));
    }

    #[test]
    fn intent_component_defaults_to_type_name() {
        let (mut c, _) = controller(LooperMode::Legacy);
        assert_eq!(c.context().intent().component(), Some(std::any::type_name::<Recorder>()));
        c.create().unwrap();
        c.new_intent(Intent::new("lifesim.intent.action.EDIT")).unwrap();
        let intent = c.context().intent();
        assert_eq!(intent.action(), Some("lifesim.intent.action.EDIT"));
        assert_eq!(intent.component(), Some(std::any::type_name::<Recorder>()));
    }

    #[test]
    fn recreation_carries_state_and_ends_resumed() {
        let (mut c, log) = controller(LooperMode::Legacy);
        c.create().unwrap().start().unwrap();
        c.context_mut().set_theme("Theme.Dark");
        let kept = Fragment::new("kept");
        kept.set_retain_instance(true);
        c.context_mut().fragments_mut().add(Rc::clone(&kept)).unwrap();
        log.clear();

        let landscape = Configuration::default().with_orientation(Orientation::Landscape);
        c.configuration_change_to(landscape.clone()).unwrap();

        assert_eq!(c.state(), Resumed);
        assert_eq!(c.recreations(), 1);
        assert!(log.contains_in_order(&[
            "onStop",
            "onDestroy(changing)",
            "onCreate(saved)",
            "onStart",
            "onResume",
            "onPostResume"
        ]));
        assert!(!log.contains("onPause"));
        assert_eq!(c.context().configuration(), &landscape);
        assert_eq!(c.context().theme(), Some("Theme.Dark"));
        assert!(!c.context().is_changing_configurations());
        assert_eq!(c.context().last_non_config_instance::<String>().map(String::as_str), Some("kept"));
        assert!(Rc::ptr_eq(&c.context().fragments().find_by_tag("kept").unwrap(), &kept));
    }

    #[test]
    fn config_change_before_create_just_records_configuration() {
        let (mut c, log) = controller(LooperMode::Legacy);
        let night = Configuration::default().with_ui_mode(lifesim_core::UiMode::Night);
        c.configuration_change_to(night.clone()).unwrap();
        assert_eq!(c.state(), New);
        assert_eq!(c.context().configuration(), &night);
        assert!(log.is_empty());
    }

    struct Adaptive;

    impl Component for Adaptive {
        fn handled_config_changes(&self) -> ConfigChanges {
            ConfigChanges::FONT_SCALE | ConfigChanges::UI_MODE
        }
    }

    #[test]
    fn handled_change_keeps_instance() {
        let looper = LooperRegistry::new(LooperMode::Legacy, 0).main();
        let mut c = LifecycleController::builder(looper, || Adaptive).build();
        c.setup().unwrap();
        let surface = c.context().window().surface();
        c.configuration_change_to(Configuration::default().with_font_scale(2.0))
            .unwrap();
        assert_eq!(c.recreations(), 0);
        assert_eq!(c.context().window().surface(), surface);
        assert_eq!(c.context().configuration().font_scale, 2.0);
    }

    #[test]
    fn pre_paused_looper_defers_posted_work() {
        let (mut c, _) = controller(LooperMode::Paused);
        let ran = Transcript::new();
        c.create().unwrap();
        c.context().run_on_ui_thread(ran.recorder("posted"));
        c.start().unwrap();
        assert!(ran.is_empty());
        assert!(c.looper().is_paused());
        c.looper().idle();
        assert!(ran.contains("posted"));
    }

    #[test]
    fn window_focus_is_not_wrapped() {
        let (mut c, _) = controller(LooperMode::Legacy);
        c.create().unwrap().visible().unwrap();
        let ran = Transcript::new();
        c.looper().pause();
        c.context().run_on_ui_thread(ran.recorder("queued"));
        c.looper().unpause();
        c.window_focus_changed(true).unwrap();
        assert!(c.context().has_window_focus());
        // No drain happened: unpause does not drain and focus changes do not either.
        assert!(ran.is_empty());
    }

    #[test]
    fn window_focus_requires_an_attached_window() {
        let (mut c, log) = controller(LooperMode::Legacy);
        c.create().unwrap();
        log.clear();
        let err = c.window_focus_changed(true).unwrap_err();
        assert!(matches!(err, SimError::IllegalState(_)));
        assert!(!c.context().has_window_focus());
        assert!(log.is_empty());

        c.visible().unwrap().window_focus_changed(true).unwrap();
        assert!(c.context().has_window_focus());
    }

    #[test]
    fn saved_fragments_are_back_before_on_create() {
        struct Lookup {
            found: Rc<std::cell::Cell<bool>>,
        }
        impl Component for Lookup {
            fn on_create(&mut self, ctx: &mut ComponentContext, saved: Option<&Bundle>) {
                if saved.is_some() {
                    self.found.set(ctx.fragments().find_by_tag("plain").is_some());
                } else {
                    ctx.fragments_mut().add(Fragment::new("plain")).unwrap();
                }
            }
        }

        let looper = LooperRegistry::new(LooperMode::Legacy, 0).main();
        let found = Rc::new(std::cell::Cell::new(false));
        let flag = Rc::clone(&found);
        let mut first =
            LifecycleController::builder(looper.clone(), move || Lookup { found: Rc::clone(&flag) })
                .build();
        first.setup().unwrap();
        let saved = first.save_instance_state().unwrap();
        assert!(saved.contains_key(SAVED_FRAGMENTS_KEY));

        let flag = Rc::clone(&found);
        let mut second =
            LifecycleController::builder(looper, move || Lookup { found: Rc::clone(&flag) }).build();
        second.setup_with(&saved).unwrap();
        assert!(found.get());
        assert_eq!(second.context().fragments().len(), 1);
    }
}
