#![forbid(unsafe_code)]

//! Saved-state bundles.
//!
//! A [`Bundle`] maps string keys to opaque byte blobs. Each key has an
//! explicit serialization contract: values go in through [`Bundle::put`]
//! (JSON-encoded via serde) and come back out through [`Bundle::get`] with
//! the caller naming the expected type. Raw blobs bypass encoding entirely
//! via [`Bundle::put_bytes`] / [`Bundle::get_bytes`].
//!
//! Keys are kept in a `BTreeMap` so iteration order, `Debug` output and
//! equality are deterministic.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// Typed key to opaque-blob mapping used for saved instance state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bundle {
    entries: BTreeMap<String, Vec<u8>>,
}

impl Bundle {
    /// Create an empty bundle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`put`](Self::put).
    pub fn with<T: Serialize + ?Sized>(mut self, key: impl Into<String>, value: &T) -> SimResult<Self> {
        self.put(key, value)?;
        Ok(self)
    }

    /// Encode `value` and store it under `key`, replacing any previous value.
    pub fn put<T: Serialize + ?Sized>(&mut self, key: impl Into<String>, value: &T) -> SimResult<()> {
        let key = key.into();
        let data = serde_json::to_vec(value).map_err(|e| {
            SimError::illegal_argument(format!("bundle key {key:?} cannot be encoded: {e}"))
        })?;
        self.entries.insert(key, data);
        Ok(())
    }

    /// Decode the value stored under `key`.
    ///
    /// Returns `Ok(None)` when the key is absent and `IllegalArgument` when the
    /// stored blob does not decode as `T`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> SimResult<Option<T>> {
        let Some(data) = self.entries.get(key) else {
            return Ok(None);
        };
        serde_json::from_slice(data).map(Some).map_err(|e| {
            tracing::warn!(key, error = %e, "bundle entry failed to decode");
            SimError::illegal_argument(format!(
                "bundle key {key:?} does not hold a {}: {e}",
                std::any::type_name::<T>()
            ))
        })
    }

    /// Store a raw blob under `key` without encoding.
    pub fn put_bytes(&mut self, key: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.entries.insert(key.into(), data.into());
    }

    /// Raw blob stored under `key`.
    #[must_use]
    pub fn get_bytes(&self, key: &str) -> Option<&[u8]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    /// Whether `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Remove `key`, returning its raw blob.
    pub fn remove(&mut self, key: &str) -> Option<Vec<u8>> {
        self.entries.remove(key)
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the bundle has no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Copy every entry of `other` into `self`; `other` wins on conflicts.
    pub fn merge(&mut self, other: &Bundle) {
        for (key, data) in &other.entries {
            self.entries.insert(key.clone(), data.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct ScrollState {
        offset: u32,
        anchor: String,
    }

    #[test]
    fn put_then_get_typed_value() {
        let mut bundle = Bundle::new();
        bundle
            .put(
                "scroll",
                &ScrollState {
                    offset: 42,
                    anchor: "top".into(),
                },
            )
            .unwrap();
        let state: ScrollState = bundle.get("scroll").unwrap().unwrap();
        assert_eq!(state.offset, 42);
        assert_eq!(state.anchor, "top");
    }

    #[test]
    fn missing_key_is_none() {
        let bundle = Bundle::new();
        let value: Option<u32> = bundle.get("absent").unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn wrong_type_is_illegal_argument() {
        let bundle = Bundle::new().with("count", &"not a number").unwrap();
        let err = bundle.get::<u32>("count").unwrap_err();
        assert_eq!(err.kind(), "illegal_argument");
    }

    #[test]
    fn raw_bytes_are_untouched() {
        let mut bundle = Bundle::new();
        bundle.put_bytes("blob", vec![0xde, 0xad]);
        assert_eq!(bundle.get_bytes("blob"), Some(&[0xde, 0xad][..]));
        assert!(bundle.contains_key("blob"));
        assert_eq!(bundle.remove("blob"), Some(vec![0xde, 0xad]));
        assert!(bundle.is_empty());
    }

    #[test]
    fn nested_bundle_survives() {
        let inner = Bundle::new().with("x", &1u8).unwrap();
        let outer = Bundle::new().with("inner", &inner).unwrap();
        let back: Bundle = outer.get("inner").unwrap().unwrap();
        assert_eq!(back, inner);
    }

    #[test]
    fn merge_overwrites_and_keys_are_sorted() {
        let mut a = Bundle::new().with("b", &1).unwrap().with("a", &1).unwrap();
        let b = Bundle::new().with("b", &2).unwrap().with("c", &3).unwrap();
        a.merge(&b);
        assert_eq!(a.keys().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(a.get::<i32>("b").unwrap(), Some(2));
        assert_eq!(a.len(), 3);
    }
}
