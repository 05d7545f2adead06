#![forbid(unsafe_code)]

//! Per-instance environment handed to component callbacks.

use std::any::Any;
use std::fmt;

use lifesim_core::{Configuration, Intent};
use lifesim_runtime::{Handler, TaskToken};

use crate::fragment::FragmentManager;
use crate::host::Window;

/// Everything a component instance can see of its surroundings.
///
/// One context belongs to one component instance. Across a configuration
/// recreation the controller builds a fresh context and carries over the
/// intent, the theme, the retained fragments and the non-configuration
/// instance.
pub struct ComponentContext {
    name: String,
    intent: Intent,
    configuration: Configuration,
    main_handler: Handler,
    fragments: FragmentManager,
    window: Window,
    theme: Option<String>,
    changing_configurations: bool,
    last_non_config_instance: Option<Box<dyn Any>>,
}

impl ComponentContext {
    pub(crate) fn new(
        name: String,
        intent: Intent,
        configuration: Configuration,
        main_handler: Handler,
    ) -> Self {
        Self {
            name,
            intent,
            configuration,
            main_handler,
            fragments: FragmentManager::new(),
            window: Window::new(),
            theme: None,
            changing_configurations: false,
            last_non_config_instance: None,
        }
    }

    /// Name of the component type.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The intent this instance was started with (or last re-delivered).
    #[must_use]
    pub fn intent(&self) -> &Intent {
        &self.intent
    }

    /// The configuration resolved for this instance.
    #[must_use]
    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    /// Handler bound to the main looper.
    #[must_use]
    pub fn main_handler(&self) -> &Handler {
        &self.main_handler
    }

    /// Post `action` onto the main looper.
    ///
    /// During a lifecycle transition the looper is paused, so the action
    /// runs when the controller drains after the callback returns.
    pub fn run_on_ui_thread(&self, action: impl FnOnce() + 'static) -> TaskToken {
        self.main_handler.post(action)
    }

    #[must_use]
    pub fn fragments(&self) -> &FragmentManager {
        &self.fragments
    }

    pub fn fragments_mut(&mut self) -> &mut FragmentManager {
        &mut self.fragments
    }

    #[must_use]
    pub fn window(&self) -> &Window {
        &self.window
    }

    /// Whether the window currently has input focus.
    #[must_use]
    pub fn has_window_focus(&self) -> bool {
        self.window.has_focus()
    }

    /// Theme resource name, if one was set.
    #[must_use]
    pub fn theme(&self) -> Option<&str> {
        self.theme.as_deref()
    }

    pub fn set_theme(&mut self, theme: impl Into<String>) {
        self.theme = Some(theme.into());
    }

    /// True on the outgoing instance while it is torn down for a
    /// configuration recreation.
    #[must_use]
    pub fn is_changing_configurations(&self) -> bool {
        self.changing_configurations
    }

    /// The value the previous instance returned from
    /// `on_retain_non_config_instance`, if it is a `T`.
    #[must_use]
    pub fn last_non_config_instance<T: Any>(&self) -> Option<&T> {
        self.last_non_config_instance.as_deref()?.downcast_ref::<T>()
    }

    pub(crate) fn set_intent(&mut self, intent: Intent) {
        self.intent = intent;
    }

    pub(crate) fn set_configuration(&mut self, configuration: Configuration) {
        self.configuration = configuration;
    }

    pub(crate) fn set_changing_configurations(&mut self, changing: bool) {
        self.changing_configurations = changing;
    }

    pub(crate) fn window_mut(&mut self) -> &mut Window {
        &mut self.window
    }

    /// Context for the instance that replaces this one after a configuration
    /// recreation. Intent and theme move over; the window is new.
    pub(crate) fn successor(
        &mut self,
        configuration: Configuration,
        fragments: FragmentManager,
        last_non_config_instance: Option<Box<dyn Any>>,
    ) -> Self {
        Self {
            name: self.name.clone(),
            intent: std::mem::take(&mut self.intent),
            configuration,
            main_handler: self.main_handler.clone(),
            fragments,
            window: Window::new(),
            theme: self.theme.take(),
            changing_configurations: false,
            last_non_config_instance,
        }
    }
}

impl fmt::Debug for ComponentContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentContext")
            .field("name", &self.name)
            .field("intent", &self.intent)
            .field("window", &self.window)
            .field("fragments", &self.fragments.len())
            .field("theme", &self.theme)
            .field("changing_configurations", &self.changing_configurations)
            .finish()
    }
}
