#![forbid(unsafe_code)]

//! Test-scoped lifecycle log.
//!
//! A [`Transcript`] is an ordered list of entries shared between a test and
//! the components it drives. Components record into it (directly, or from
//! tasks posted on the main looper); the controller records transitions into
//! it when it is registered as a [`LifecycleObserver`].

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::state::ComponentState;

/// Notified of every state change a controller makes.
pub trait LifecycleObserver {
    /// `component` moved from `from` to `to`.
    fn on_transition(&self, component: &str, from: ComponentState, to: ComponentState);
}

/// Shared, ordered event log. Cloning yields a handle to the same log.
#[derive(Clone, Default)]
pub struct Transcript {
    entries: Rc<RefCell<Vec<String>>>,
}

impl Transcript {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    pub fn add(&self, entry: impl Into<String>) {
        self.entries.borrow_mut().push(entry.into());
    }

    /// Closure that appends `entry` when run; handy for posting.
    pub fn recorder(&self, entry: impl Into<String>) -> impl FnOnce() + 'static {
        let sink = self.clone();
        let entry = entry.into();
        move || sink.add(entry)
    }

    /// Snapshot of all entries.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.entries.borrow().clone()
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    #[must_use]
    pub fn contains(&self, entry: &str) -> bool {
        self.entries.borrow().iter().any(|e| e == entry)
    }

    /// Index of the first occurrence of `entry`.
    #[must_use]
    pub fn position(&self, entry: &str) -> Option<usize> {
        self.entries.borrow().iter().position(|e| e == entry)
    }

    /// Whether `expected` appears as a subsequence, in order, possibly with
    /// other entries in between.
    #[must_use]
    pub fn contains_in_order(&self, expected: &[&str]) -> bool {
        let entries = self.entries.borrow();
        let mut remaining = entries.iter();
        expected
            .iter()
            .all(|want| remaining.any(|entry| entry == want))
    }

    /// Whether the log is exactly `expected`.
    #[must_use]
    pub fn contains_exactly(&self, expected: &[&str]) -> bool {
        let entries = self.entries.borrow();
        entries.len() == expected.len() && entries.iter().zip(expected).all(|(a, b)| a == b)
    }

    /// Entries as a JSON array, for attaching to failure messages.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(&*self.entries.borrow()).unwrap_or_else(|_| String::from("[]"))
    }
}

impl LifecycleObserver for Transcript {
    fn on_transition(&self, _component: &str, from: ComponentState, to: ComponentState) {
        self.add(format!("{from}->{to}"));
    }
}

impl fmt::Debug for Transcript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.borrow().iter()).finish()
    }
}
