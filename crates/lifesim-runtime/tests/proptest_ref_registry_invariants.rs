//! Property-based invariant tests for the native reference registry.
//!
//! 1. `put` then `get` returns the stored object.
//! 2. Handles are unique and increase monotonically.
//! 3. Matched increments and decrements leave the handle registered with its
//!    original count.
//! 4. Under the default policy a handle survives exactly `n` decrements after
//!    `n` increments and is reclaimed by the next one.
//! 5. Under `OnReachingZero` the last matching decrement reclaims the handle.
//! 6. The null handle is never affected.

use lifesim_runtime::{FIRST_HANDLE, NULL_HANDLE, RefRegistry, ReleasePolicy};
use proptest::prelude::*;

// ─── 1–2. put/get and id allocation ───────────────────────────────────────

proptest! {
    #[test]
    fn put_get_round_trips_with_monotonic_ids(values in proptest::collection::vec(any::<i64>(), 1..=40)) {
        let registry = RefRegistry::new();
        let ids: Vec<u64> = values.iter().map(|&v| registry.put(v)).collect();

        prop_assert_eq!(ids[0], FIRST_HANDLE);
        prop_assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
        for (id, value) in ids.iter().zip(&values) {
            prop_assert_eq!(*registry.get::<i64>(*id).unwrap(), *value);
        }
        prop_assert_eq!(registry.len(), values.len());
    }
}

// ─── 3. matched inc/dec is neutral ────────────────────────────────────────

proptest! {
    #[test]
    fn matched_increment_decrement_restores_count(
        base in 0u64..=5,
        extra in 1u64..=20,
    ) {
        let registry = RefRegistry::new();
        let id = registry.put("surface");
        for _ in 0..base {
            registry.increment(id).unwrap();
        }
        for _ in 0..extra {
            registry.increment(id).unwrap();
        }
        for _ in 0..extra {
            prop_assert!(!registry.decrement(id).unwrap());
        }
        prop_assert_eq!(registry.ref_count(id), Some(base));
    }
}

// ─── 4. default policy releases on decrement from zero ────────────────────

proptest! {
    #[test]
    fn default_policy_releases_after_count_is_exhausted(increments in 0u64..=20) {
        let registry = RefRegistry::new();
        let id = registry.put(());
        for _ in 0..increments {
            registry.increment(id).unwrap();
        }
        for _ in 0..increments {
            prop_assert!(!registry.decrement(id).unwrap());
            prop_assert!(registry.contains(id));
        }
        prop_assert!(registry.decrement(id).unwrap());
        prop_assert!(!registry.contains(id));
        prop_assert_eq!(registry.decrement(id).unwrap_err().kind(), "not_found");
    }
}

// ─── 5. reaching-zero policy ──────────────────────────────────────────────

proptest! {
    #[test]
    fn reaching_zero_policy_releases_on_last_reference(increments in 1u64..=20) {
        let registry = RefRegistry::with_policy(ReleasePolicy::OnReachingZero);
        let id = registry.put(());
        for _ in 0..increments {
            registry.increment(id).unwrap();
        }
        for remaining in (1..increments).rev() {
            prop_assert!(!registry.decrement(id).unwrap());
            prop_assert_eq!(registry.ref_count(id), Some(remaining));
        }
        prop_assert!(registry.decrement(id).unwrap());
        prop_assert!(registry.is_empty());
    }
}

// ─── 6. null handle ───────────────────────────────────────────────────────

proptest! {
    #[test]
    fn null_handle_operations_are_no_ops(ops in proptest::collection::vec(any::<bool>(), 0..=30)) {
        let registry = RefRegistry::new();
        let id = registry.put(1u8);
        for inc in ops {
            if inc {
                registry.increment(NULL_HANDLE).unwrap();
            } else {
                prop_assert!(!registry.decrement(NULL_HANDLE).unwrap());
            }
        }
        prop_assert_eq!(registry.len(), 1);
        prop_assert_eq!(registry.ref_count(id), Some(0));
    }
}
