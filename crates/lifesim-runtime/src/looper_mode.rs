#![forbid(unsafe_code)]

//! Looper mode resolution.
//!
//! [`LooperMode::Legacy`] loopers start unpaused: posting due work onto an
//! idle looper runs it immediately. [`LooperMode::Paused`] loopers start
//! paused and run nothing until the test drains them explicitly.
//!
//! [`LooperModeContext`] holds the default mode plus a LIFO stack of scoped
//! overrides, so a suite-wide default can be narrowed for a single test.

use std::cell::{Cell, RefCell};
use std::env;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use lifesim_core::SimError;

/// Environment variable read by [`LooperModeContext::from_env`].
pub const LOOPER_MODE_ENV: &str = "LIFESIM_LOOPER_MODE";

thread_local! {
    static GLOBAL_CONTEXT: LooperModeContext = LooperModeContext::from_env();
}

/// How newly created loopers behave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LooperMode {
    /// Loopers start unpaused; due posts run eagerly.
    #[default]
    Legacy,
    /// Loopers start paused; work runs only on explicit drains.
    Paused,
}

impl LooperMode {
    /// Whether loopers created under this mode start paused.
    #[must_use]
    pub fn starts_paused(self) -> bool {
        matches!(self, Self::Paused)
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::Paused => "paused",
        }
    }
}

impl fmt::Display for LooperMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LooperMode {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "legacy" => Ok(Self::Legacy),
            "paused" => Ok(Self::Paused),
            other => Err(SimError::illegal_argument(format!(
                "unknown looper mode {other:?} (expected \"legacy\" or \"paused\")"
            ))),
        }
    }
}

/// Default looper mode plus scoped overrides.
#[derive(Clone, Debug)]
pub struct LooperModeContext {
    default: Rc<Cell<LooperMode>>,
    overrides: Rc<RefCell<Vec<LooperMode>>>,
}

impl Default for LooperModeContext {
    fn default() -> Self {
        Self::new(LooperMode::default())
    }
}

impl LooperModeContext {
    /// Context with the given default mode.
    #[must_use]
    pub fn new(default: LooperMode) -> Self {
        Self {
            default: Rc::new(Cell::new(default)),
            overrides: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Context whose default comes from `LIFESIM_LOOPER_MODE`.
    ///
    /// Unset or unparseable values fall back to [`LooperMode::Legacy`].
    #[must_use]
    pub fn from_env() -> Self {
        let raw = env::var(LOOPER_MODE_ENV).ok();
        Self::new(mode_from(raw.as_deref()))
    }

    /// The thread-local global context.
    #[must_use]
    pub fn global() -> Self {
        GLOBAL_CONTEXT.with(Clone::clone)
    }

    /// Effective mode: the innermost override, else the default.
    #[must_use]
    pub fn current_mode(&self) -> LooperMode {
        self.overrides
            .borrow()
            .last()
            .copied()
            .unwrap_or_else(|| self.default.get())
    }

    /// Replace the default mode.
    pub fn set_default(&self, mode: LooperMode) {
        self.default.set(mode);
    }

    /// Push a scoped override. Dropping the guard restores the prior mode.
    #[must_use = "dropping this guard clears the looper mode override"]
    pub fn push_override(&self, mode: LooperMode) -> LooperModeOverride {
        self.overrides.borrow_mut().push(mode);
        LooperModeOverride {
            stack: Rc::clone(&self.overrides),
            mode,
        }
    }
}

/// RAII guard for a scoped looper mode override.
#[must_use = "dropping this guard clears the looper mode override"]
pub struct LooperModeOverride {
    stack: Rc<RefCell<Vec<LooperMode>>>,
    mode: LooperMode,
}

impl Drop for LooperModeOverride {
    fn drop(&mut self) {
        let popped = self.stack.borrow_mut().pop();
        if let Some(popped) = popped {
            debug_assert_eq!(popped, self.mode);
        }
    }
}

fn mode_from(raw: Option<&str>) -> LooperMode {
    match raw.map(str::parse::<LooperMode>) {
        Some(Ok(mode)) => mode,
        Some(Err(err)) => {
            tracing::warn!(var = LOOPER_MODE_ENV, error = %err, "ignoring looper mode override");
            LooperMode::default()
        }
        None => LooperMode::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_modes() {
        assert_eq!("legacy".parse::<LooperMode>().unwrap(), LooperMode::Legacy);
        assert_eq!(" PAUSED ".parse::<LooperMode>().unwrap(), LooperMode::Paused);
        assert!("realistic".parse::<LooperMode>().is_err());
    }

    #[test]
    fn env_value_falls_back_to_legacy() {
        assert_eq!(mode_from(None), LooperMode::Legacy);
        assert_eq!(mode_from(Some("paused")), LooperMode::Paused);
        assert_eq!(mode_from(Some("bogus")), LooperMode::Legacy);
    }

    #[test]
    fn method_override_wins_over_default() {
        let ctx = LooperModeContext::new(LooperMode::Paused);
        assert_eq!(ctx.current_mode(), LooperMode::Paused);
        {
            let _method = ctx.push_override(LooperMode::Legacy);
            assert_eq!(ctx.current_mode(), LooperMode::Legacy);
        }
        assert_eq!(ctx.current_mode(), LooperMode::Paused);
    }

    #[test]
    fn overrides_nest_lifo() {
        let ctx = LooperModeContext::default();
        let _outer = ctx.push_override(LooperMode::Paused);
        {
            let _inner = ctx.push_override(LooperMode::Legacy);
            assert_eq!(ctx.current_mode(), LooperMode::Legacy);
        }
        assert_eq!(ctx.current_mode(), LooperMode::Paused);
        ctx.set_default(LooperMode::Legacy);
        assert_eq!(ctx.current_mode(), LooperMode::Paused);
    }

    #[test]
    fn starts_paused_matches_mode() {
        assert!(LooperMode::Paused.starts_paused());
        assert!(!LooperMode::Legacy.starts_paused());
        assert_eq!(LooperMode::Paused.to_string(), "paused");
    }
}
