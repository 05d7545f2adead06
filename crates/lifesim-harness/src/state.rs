#![forbid(unsafe_code)]

//! Lifecycle states.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a component instance is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComponentState {
    /// Constructed, `on_create` not yet called.
    #[default]
    New,
    Created,
    Started,
    Resumed,
    Paused,
    Stopped,
    /// Transient: between `on_restart` and `on_start` on the restart path.
    Restarting,
    /// Terminal. No further transitions are valid.
    Destroyed,
}

impl ComponentState {
    /// Whether `on_create` has run and `on_destroy` has not.
    #[must_use]
    pub fn is_alive(self) -> bool {
        !matches!(self, Self::New | Self::Destroyed)
    }

    /// Stable upper-case name used in logs and transcripts.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Created => "CREATED",
            Self::Started => "STARTED",
            Self::Resumed => "RESUMED",
            Self::Paused => "PAUSED",
            Self::Stopped => "STOPPED",
            Self::Restarting => "RESTARTING",
            Self::Destroyed => "DESTROYED",
        }
    }
}

impl fmt::Display for ComponentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
