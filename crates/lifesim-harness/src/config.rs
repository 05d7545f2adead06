#![forbid(unsafe_code)]

//! Environment construction parameters.

use std::env;

use lifesim_core::{Configuration, ConfigurationContext};
use lifesim_runtime::{LooperMode, LooperModeContext, ReleasePolicy, VirtualTime};
use tracing::warn;

/// Environment variable holding the initial virtual time in milliseconds.
pub const START_TIME_ENV: &str = "LIFESIM_START_TIME";

/// How an [`Environment`](crate::Environment) is set up.
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    /// Whether the main looper starts paused.
    pub looper_mode: LooperMode,
    /// Initial virtual time of every looper.
    pub start_time: VirtualTime,
    /// Initial ambient device configuration.
    pub configuration: Configuration,
    /// Release policy of the environment's handle registry.
    pub release_policy: ReleasePolicy,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            looper_mode: LooperMode::default(),
            start_time: 0,
            configuration: Configuration::default(),
            release_policy: ReleasePolicy::default(),
        }
    }
}

impl SimConfig {
    /// Configuration resolved from the thread's global contexts and
    /// `LIFESIM_START_TIME`.
    ///
    /// The looper mode honors any override pushed on
    /// [`LooperModeContext::global`]; the device configuration is the current
    /// value of [`ConfigurationContext::global`].
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            looper_mode: LooperModeContext::global().current_mode(),
            start_time: start_time_from(env::var(START_TIME_ENV).ok().as_deref()),
            configuration: ConfigurationContext::global().current_configuration(),
            release_policy: ReleasePolicy::default(),
        }
    }

    #[must_use]
    pub fn with_looper_mode(mut self, mode: LooperMode) -> Self {
        self.looper_mode = mode;
        self
    }

    #[must_use]
    pub fn with_start_time(mut self, start_time: VirtualTime) -> Self {
        self.start_time = start_time;
        self
    }

    #[must_use]
    pub fn with_configuration(mut self, configuration: Configuration) -> Self {
        self.configuration = configuration;
        self
    }

    #[must_use]
    pub fn with_release_policy(mut self, policy: ReleasePolicy) -> Self {
        self.release_policy = policy;
        self
    }
}

fn start_time_from(raw: Option<&str>) -> VirtualTime {
    let Some(raw) = raw else {
        return 0;
    };
    match raw.trim().parse::<VirtualTime>() {
        Ok(time) => time,
        Err(err) => {
            warn!(var = START_TIME_ENV, value = raw, error = %err, "ignoring start time");
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lifesim_core::Orientation;

    #[test]
    fn start_time_parses_or_falls_back() {
        assert_eq!(start_time_from(None), 0);
        assert_eq!(start_time_from(Some(" 1500 ")), 1500);
        assert_eq!(start_time_from(Some("soon")), 0);
    }

    #[test]
    fn from_env_follows_global_mode_override() {
        let _paused = LooperModeContext::global().push_override(LooperMode::Paused);
        assert_eq!(SimConfig::from_env().looper_mode, LooperMode::Paused);
    }

    #[test]
    fn builders_set_fields() {
        let config = SimConfig::default()
            .with_looper_mode(LooperMode::Paused)
            .with_start_time(10)
            .with_configuration(Configuration::default().with_orientation(Orientation::Landscape))
            .with_release_policy(ReleasePolicy::OnReachingZero);
        assert_eq!(config.start_time, 10);
        assert_eq!(config.configuration.orientation, Orientation::Landscape);
        assert_eq!(config.release_policy, ReleasePolicy::OnReachingZero);
    }
}
