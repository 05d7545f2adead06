#![forbid(unsafe_code)]

//! Child objects of a component and what survives recreation.
//!
//! A [`Fragment`] marked with [`Fragment::set_retain_instance`] is handed to
//! the recreated component by identity. Every other fragment is written into
//! the saved instance bundle as `(tag, arguments)` and re-instantiated as a
//! new object before the recreated component's `on_create` runs.

use std::any::Any;
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use lifesim_core::{Bundle, SimError, SimResult};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Bundle key under which non-retained fragments are saved.
pub const SAVED_FRAGMENTS_KEY: &str = "lifesim:fragments";

/// A tagged child object of a component.
pub struct Fragment {
    tag: String,
    arguments: Bundle,
    retain_instance: Cell<bool>,
}

impl Fragment {
    /// Fragment with empty arguments.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Rc<Self> {
        Self::with_arguments(tag, Bundle::new())
    }

    /// Fragment carrying `arguments` across re-instantiation.
    #[must_use]
    pub fn with_arguments(tag: impl Into<String>, arguments: Bundle) -> Rc<Self> {
        Rc::new(Self {
            tag: tag.into(),
            arguments,
            retain_instance: Cell::new(false),
        })
    }

    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    #[must_use]
    pub fn arguments(&self) -> &Bundle {
        &self.arguments
    }

    /// Mark whether this instance survives recreation as-is.
    pub fn set_retain_instance(&self, retain: bool) {
        self.retain_instance.set(retain);
    }

    #[must_use]
    pub fn retain_instance(&self) -> bool {
        self.retain_instance.get()
    }
}

impl fmt::Debug for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fragment")
            .field("tag", &self.tag)
            .field("retain_instance", &self.retain_instance.get())
            .finish()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SavedFragment {
    tag: String,
    arguments: Bundle,
}

/// The fragments attached to one component instance, in insertion order.
#[derive(Debug, Default)]
pub struct FragmentManager {
    fragments: Vec<Rc<Fragment>>,
}

impl FragmentManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `fragment`. Tags are unique per manager.
    pub fn add(&mut self, fragment: Rc<Fragment>) -> SimResult<()> {
        if self.find_by_tag(fragment.tag()).is_some() {
            return Err(SimError::illegal_argument(format!(
                "fragment tag {:?} already in use",
                fragment.tag()
            )));
        }
        trace!(tag = fragment.tag(), "fragment added");
        self.fragments.push(fragment);
        Ok(())
    }

    /// Detach the fragment tagged `tag`.
    pub fn remove(&mut self, tag: &str) -> Option<Rc<Fragment>> {
        let index = self.fragments.iter().position(|f| f.tag() == tag)?;
        Some(self.fragments.remove(index))
    }

    #[must_use]
    pub fn find_by_tag(&self, tag: &str) -> Option<Rc<Fragment>> {
        self.fragments.iter().find(|f| f.tag() == tag).cloned()
    }

    /// All attached fragments.
    pub fn fragments(&self) -> impl Iterator<Item = &Rc<Fragment>> {
        self.fragments.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Move the retained fragments out, leaving the others attached.
    pub(crate) fn take_retained(&mut self) -> Vec<Rc<Fragment>> {
        let (retained, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.fragments)
            .into_iter()
            .partition(|f| f.retain_instance());
        self.fragments = rest;
        retained
    }

    /// Write the non-retained fragments into `out`.
    pub(crate) fn save_state(&self, out: &mut Bundle) -> SimResult<()> {
        let saved: Vec<SavedFragment> = self
            .fragments
            .iter()
            .filter(|f| !f.retain_instance())
            .map(|f| SavedFragment {
                tag: f.tag.clone(),
                arguments: f.arguments.clone(),
            })
            .collect();
        if saved.is_empty() {
            return Ok(());
        }
        out.put(SAVED_FRAGMENTS_KEY, &saved)
    }

    /// Rebuild a manager for a recreated component: retained fragments by
    /// identity, saved ones as new instances.
    pub(crate) fn restore(retained: Vec<Rc<Fragment>>, saved: Option<&Bundle>) -> SimResult<Self> {
        let mut manager = Self { fragments: retained };
        let records: Vec<SavedFragment> = match saved {
            Some(bundle) => bundle.get(SAVED_FRAGMENTS_KEY)?.unwrap_or_default(),
            None => Vec::new(),
        };
        for record in records {
            manager.add(Fragment::with_arguments(record.tag, record.arguments))?;
        }
        Ok(manager)
    }
}

/// What a component hands to its recreated successor.
#[derive(Default)]
pub struct RetainedState {
    /// Retained fragments, moved by identity.
    pub fragments: Vec<Rc<Fragment>>,
    /// Value returned by `on_retain_non_config_instance`.
    pub non_config_instance: Option<Box<dyn Any>>,
}

impl fmt::Debug for RetainedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetainedState")
            .field("fragments", &self.fragments)
            .field("non_config_instance", &self.non_config_instance.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_tags_are_rejected() {
        let mut fm = FragmentManager::new();
        fm.add(Fragment::new("a")).unwrap();
        let err = fm.add(Fragment::new("a")).unwrap_err();
        assert_eq!(err.kind(), "illegal_argument");
        assert_eq!(fm.len(), 1);
    }

    #[test]
    fn restore_keeps_retained_identity_and_recreates_the_rest() {
        let mut fm = FragmentManager::new();
        let kept = Fragment::new("kept");
        kept.set_retain_instance(true);
        let args = Bundle::new().with("page", &3u32).unwrap();
        let other = Fragment::with_arguments("other", args);
        fm.add(Rc::clone(&kept)).unwrap();
        fm.add(Rc::clone(&other)).unwrap();

        let mut saved = Bundle::new();
        fm.save_state(&mut saved).unwrap();
        let retained = fm.take_retained();
        assert_eq!(fm.len(), 1);

        let restored = FragmentManager::restore(retained, Some(&saved)).unwrap();
        let kept_again = restored.find_by_tag("kept").unwrap();
        let other_again = restored.find_by_tag("other").unwrap();
        assert!(Rc::ptr_eq(&kept, &kept_again));
        assert!(!Rc::ptr_eq(&other, &other_again));
        assert_eq!(other_again.arguments().get::<u32>("page").unwrap(), Some(3));
        assert!(!other_again.retain_instance());
    }

    #[test]
    fn saving_only_retained_fragments_writes_nothing() {
        let mut fm = FragmentManager::new();
        let kept = Fragment::new("kept");
        kept.set_retain_instance(true);
        fm.add(kept).unwrap();
        let mut saved = Bundle::new();
        fm.save_state(&mut saved).unwrap();
        assert!(saved.is_empty());
    }

    #[test]
    fn remove_detaches_by_tag() {
        let mut fm = FragmentManager::new();
        fm.add(Fragment::new("x")).unwrap();
        assert!(fm.remove("x").is_some());
        assert!(fm.remove("x").is_none());
        assert!(fm.is_empty());
    }
}
