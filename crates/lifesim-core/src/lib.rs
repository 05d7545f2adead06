#![forbid(unsafe_code)]

//! Core: value types shared by the lifesim runtime and harness.
//!
//! - [`SimError`] / [`SimResult`] - the error taxonomy every crate reports with
//! - [`Bundle`] - typed key to opaque-blob map used for saved instance state
//! - [`Intent`] - the launch request a component is started with
//! - [`Configuration`] / [`ConfigChanges`] - device configuration and its diff
//! - [`ConfigurationContext`] - ambient configuration with scoped overrides

pub mod bundle;
pub mod configuration;
pub mod error;
pub mod intent;

pub use bundle::Bundle;
pub use configuration::{
    ConfigChanges, Configuration, ConfigurationContext, ConfigurationOverride,
    ConfigurationSource, Orientation, UiMode,
};
pub use error::{SimError, SimResult};
pub use intent::Intent;
