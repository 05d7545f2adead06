#![forbid(unsafe_code)]

use lifesim_core::{Configuration, Orientation};
use lifesim_harness::{Component, Environment};
use tracing_test::traced_test;

#[derive(Default)]
struct Quiet;

impl Component for Quiet {}

#[test]
#[traced_test]
fn transitions_are_logged() {
    let env = Environment::default();
    let _controller = env.setup::<Quiet>().unwrap();
    assert!(logs_contain("lifecycle transition"));
    assert!(logs_contain("to=RESUMED"));
}

#[test]
#[traced_test]
fn recreation_is_logged() {
    let env = Environment::default();
    let mut controller = env.setup::<Quiet>().unwrap();
    controller
        .configuration_change_to(Configuration::default().with_orientation(Orientation::Landscape))
        .unwrap();
    assert!(logs_contain("recreating for configuration change"));
    assert!(logs_contain("captured state for recreation"));
}
