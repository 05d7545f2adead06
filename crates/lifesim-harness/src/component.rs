#![forbid(unsafe_code)]

//! The callback interface driven by the lifecycle controller.

use std::any::Any;

use lifesim_core::{Bundle, ConfigChanges, Configuration, Intent};

use crate::context::ComponentContext;

/// A UI component whose lifecycle a [`LifecycleController`] drives.
///
/// Every callback has an empty default, so implementors override only what
/// they observe. Callbacks run synchronously on the test's thread with the
/// main looper paused; work they post through
/// [`ComponentContext::run_on_ui_thread`] runs once the callback returns.
/// A callback that panics unwinds straight out of the controller call.
///
/// [`LifecycleController`]: crate::LifecycleController
#[allow(unused_variables)]
pub trait Component: 'static {
    fn on_create(&mut self, ctx: &mut ComponentContext, saved_state: Option<&Bundle>) {}

    fn on_start(&mut self, ctx: &mut ComponentContext) {}

    fn on_restart(&mut self, ctx: &mut ComponentContext) {}

    fn on_resume(&mut self, ctx: &mut ComponentContext) {}

    fn on_post_create(&mut self, ctx: &mut ComponentContext, saved_state: Option<&Bundle>) {}

    fn on_post_resume(&mut self, ctx: &mut ComponentContext) {}

    fn on_pause(&mut self, ctx: &mut ComponentContext) {}

    fn on_stop(&mut self, ctx: &mut ComponentContext) {}

    fn on_destroy(&mut self, ctx: &mut ComponentContext) {}

    /// Write whatever must survive recreation into `out`.
    fn on_save_instance_state(&mut self, ctx: &mut ComponentContext, out: &mut Bundle) {}

    fn on_restore_instance_state(&mut self, ctx: &mut ComponentContext, saved_state: &Bundle) {}

    fn on_new_intent(&mut self, ctx: &mut ComponentContext, intent: &Intent) {}

    fn on_user_leave_hint(&mut self, ctx: &mut ComponentContext) {}

    /// Called instead of recreation when every changed axis is self-handled.
    fn on_configuration_changed(&mut self, ctx: &mut ComponentContext, new_config: &Configuration) {}

    fn on_window_focus_changed(&mut self, ctx: &mut ComponentContext, has_focus: bool) {}

    /// Configuration axes this component adapts to without recreation.
    fn handled_config_changes(&self) -> ConfigChanges {
        ConfigChanges::empty()
    }

    /// Arbitrary object handed to the recreated instance through
    /// [`ComponentContext::last_non_config_instance`].
    fn on_retain_non_config_instance(&mut self, ctx: &mut ComponentContext) -> Option<Box<dyn Any>> {
        None
    }
}
