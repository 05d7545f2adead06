#![forbid(unsafe_code)]

//! Device configuration and the ambient configuration provider.
//!
//! [`Configuration`] is the value a component is laid out against.
//! [`Configuration::diff`] reports which axes differ as [`ConfigChanges`], the
//! same flags a component uses to declare which changes it handles itself.
//!
//! [`ConfigurationContext`] owns the ambient configuration and exposes scoped
//! overrides. Changes are versioned so callers can detect that the ambient
//! value moved underneath them.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

thread_local! {
    static GLOBAL_CONTEXT: ConfigurationContext = ConfigurationContext::new(Configuration::default());
}

bitflags! {
    /// Configuration axes, used both for diffs and for declaring which changes
    /// a component adapts to without being recreated.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ConfigChanges: u32 {
        const ORIENTATION     = 1 << 0;
        const FONT_SCALE      = 1 << 1;
        const SCREEN_SIZE     = 1 << 2;
        const DENSITY         = 1 << 3;
        const LOCALE          = 1 << 4;
        const UI_MODE         = 1 << 5;
        const KEYBOARD_HIDDEN = 1 << 6;
    }
}

/// Screen orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Orientation {
    Undefined,
    #[default]
    Portrait,
    Landscape,
}

/// Day/night UI mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum UiMode {
    #[default]
    Day,
    Night,
}

/// A device configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    pub orientation: Orientation,
    pub font_scale: f32,
    pub screen_width_dp: u32,
    pub screen_height_dp: u32,
    pub density_dpi: u32,
    pub locale: String,
    pub ui_mode: UiMode,
    pub keyboard_hidden: bool,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            orientation: Orientation::Portrait,
            font_scale: 1.0,
            screen_width_dp: 320,
            screen_height_dp: 470,
            density_dpi: 160,
            locale: "en-US".to_string(),
            ui_mode: UiMode::Day,
            keyboard_hidden: true,
        }
    }
}

impl Configuration {
    /// Builder-style orientation change. Swaps the screen dimensions when the
    /// orientation flips between portrait and landscape.
    #[must_use]
    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        let flips = matches!(
            (self.orientation, orientation),
            (Orientation::Portrait, Orientation::Landscape)
                | (Orientation::Landscape, Orientation::Portrait)
        );
        if flips {
            std::mem::swap(&mut self.screen_width_dp, &mut self.screen_height_dp);
        }
        self.orientation = orientation;
        self
    }

    /// Builder-style font scale.
    #[must_use]
    pub fn with_font_scale(mut self, font_scale: f32) -> Self {
        self.font_scale = font_scale;
        self
    }

    /// Builder-style locale.
    #[must_use]
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    /// Builder-style UI mode.
    #[must_use]
    pub fn with_ui_mode(mut self, ui_mode: UiMode) -> Self {
        self.ui_mode = ui_mode;
        self
    }

    /// Axes on which `other` differs from `self`.
    #[must_use]
    pub fn diff(&self, other: &Configuration) -> ConfigChanges {
        let mut changes = ConfigChanges::empty();
        if self.orientation != other.orientation {
            changes |= ConfigChanges::ORIENTATION;
        }
        if self.font_scale.to_bits() != other.font_scale.to_bits() {
            changes |= ConfigChanges::FONT_SCALE;
        }
        if self.screen_width_dp != other.screen_width_dp
            || self.screen_height_dp != other.screen_height_dp
        {
            changes |= ConfigChanges::SCREEN_SIZE;
        }
        if self.density_dpi != other.density_dpi {
            changes |= ConfigChanges::DENSITY;
        }
        if self.locale != other.locale {
            changes |= ConfigChanges::LOCALE;
        }
        if self.ui_mode != other.ui_mode {
            changes |= ConfigChanges::UI_MODE;
        }
        if self.keyboard_hidden != other.keyboard_hidden {
            changes |= ConfigChanges::KEYBOARD_HIDDEN;
        }
        changes
    }
}

/// Supplies the ambient configuration.
///
/// The lifecycle controller reads it for the zero-argument configuration
/// change; resolving resource qualifiers into a configuration happens behind
/// this trait.
pub trait ConfigurationSource {
    /// The configuration currently in effect.
    fn configuration(&self) -> Configuration;
}

/// Ambient configuration with scoped overrides.
#[derive(Clone, Debug)]
pub struct ConfigurationContext {
    current: Rc<RefCell<Configuration>>,
    version: Rc<Cell<u64>>,
    overrides: Rc<RefCell<Vec<Configuration>>>,
}

impl Default for ConfigurationContext {
    fn default() -> Self {
        Self::new(Configuration::default())
    }
}

impl ConfigurationContext {
    /// Context initialized with `configuration`.
    #[must_use]
    pub fn new(configuration: Configuration) -> Self {
        Self {
            current: Rc::new(RefCell::new(configuration)),
            version: Rc::new(Cell::new(0)),
            overrides: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// The thread-local global context.
    #[must_use]
    pub fn global() -> Self {
        GLOBAL_CONTEXT.with(Clone::clone)
    }

    /// Active configuration, honoring any scoped override.
    #[must_use]
    pub fn current_configuration(&self) -> Configuration {
        if let Some(configuration) = self.overrides.borrow().last() {
            configuration.clone()
        } else {
            self.current.borrow().clone()
        }
    }

    /// Base configuration without overrides.
    #[must_use]
    pub fn base_configuration(&self) -> Configuration {
        self.current.borrow().clone()
    }

    /// Replace the base configuration. The version only advances when the
    /// value actually changes.
    pub fn set_configuration(&self, configuration: Configuration) {
        let changed = *self.current.borrow() != configuration;
        if changed {
            *self.current.borrow_mut() = configuration;
            self.version.set(self.version.get() + 1);
        }
    }

    /// Apply `f` to a copy of the base configuration and store the result.
    pub fn update(&self, f: impl FnOnce(Configuration) -> Configuration) {
        let next = f(self.base_configuration());
        self.set_configuration(next);
    }

    /// Push a scoped override. Dropping the guard restores the prior value.
    #[must_use = "dropping this guard clears the configuration override"]
    pub fn push_override(&self, configuration: Configuration) -> ConfigurationOverride {
        self.overrides.borrow_mut().push(configuration);
        ConfigurationOverride {
            stack: Rc::clone(&self.overrides),
            depth: self.overrides.borrow().len(),
        }
    }

    /// Version counter for the base configuration.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version.get()
    }
}

impl ConfigurationSource for ConfigurationContext {
    fn configuration(&self) -> Configuration {
        self.current_configuration()
    }
}

/// RAII guard for a scoped configuration override.
#[must_use = "dropping this guard clears the configuration override"]
pub struct ConfigurationOverride {
    stack: Rc<RefCell<Vec<Configuration>>>,
    depth: usize,
}

impl Drop for ConfigurationOverride {
    fn drop(&mut self) {
        let mut stack = self.stack.borrow_mut();
        debug_assert_eq!(stack.len(), self.depth, "configuration overrides dropped out of order");
        stack.pop();
    }
}
