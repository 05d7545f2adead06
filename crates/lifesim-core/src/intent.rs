#![forbid(unsafe_code)]

//! Launch requests.

use serde::{Deserialize, Serialize};

use crate::bundle::Bundle;

/// Standard action used when a component is launched without one.
pub const ACTION_MAIN: &str = "lifesim.intent.action.MAIN";

/// Action for "show this data to the user".
pub const ACTION_VIEW: &str = "lifesim.intent.action.VIEW";

/// The request a component instance was started (or re-delivered) with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    action: Option<String>,
    component: Option<String>,
    extras: Bundle,
}

impl Intent {
    /// Intent with the given action and no target component.
    #[must_use]
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: Some(action.into()),
            ..Self::default()
        }
    }

    /// Intent explicitly addressed to `component`.
    #[must_use]
    pub fn for_component(component: impl Into<String>) -> Self {
        Self {
            component: Some(component.into()),
            ..Self::default()
        }
    }

    /// Builder-style extras.
    #[must_use]
    pub fn with_extras(mut self, extras: Bundle) -> Self {
        self.extras = extras;
        self
    }

    /// The action, if any.
    #[must_use]
    pub fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }

    /// The addressed component name, if any.
    #[must_use]
    pub fn component(&self) -> Option<&str> {
        self.component.as_deref()
    }

    /// Set the addressed component.
    pub fn set_component(&mut self, component: impl Into<String>) {
        self.component = Some(component.into());
    }

    /// Extras carried with the intent.
    #[must_use]
    pub fn extras(&self) -> &Bundle {
        &self.extras
    }

    /// Mutable access to the extras.
    pub fn extras_mut(&mut self) -> &mut Bundle {
        &mut self.extras
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_intent_has_action_only() {
        let intent = Intent::new(ACTION_VIEW);
        assert_eq!(intent.action(), Some(ACTION_VIEW));
        assert_eq!(intent.component(), None);
        assert!(intent.extras().is_empty());
    }

    #[test]
    fn component_can_be_filled_later() {
        let mut intent = Intent::new(ACTION_VIEW);
        intent.set_component("app::Main");
        assert_eq!(intent.component(), Some("app::Main"));
        assert_eq!(Intent::for_component("x").component(), Some("x"));
    }
}
