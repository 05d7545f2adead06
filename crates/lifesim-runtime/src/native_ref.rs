#![forbid(unsafe_code)]

//! Reference-counted registry of opaque native handles.
//!
//! Simulated native objects are stored behind integer handles. Callers hold
//! only the id; the registry owns the referent and reclaims it according to
//! its [`ReleasePolicy`]. Handle `0` is the null handle: reference count
//! changes on it are no-ops.
//!
//! All operations lock a single mutex, so proxies on different threads may
//! increment and decrement the same handle.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError};

use lifesim_core::{SimError, SimResult};
use tracing::{trace, warn};

/// The null handle.
pub const NULL_HANDLE: u64 = 0;

/// First id handed out by a fresh registry.
pub const FIRST_HANDLE: u64 = 10_000;

static GLOBAL_REGISTRY: LazyLock<RefRegistry> = LazyLock::new(RefRegistry::new);

/// When a decrement reclaims a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ReleasePolicy {
    /// Reclaim when a decrement finds the count already at zero; otherwise
    /// just decrement. A freshly `put` handle is reclaimed by its first
    /// decrement, and an increment followed by a decrement leaves it alive.
    #[default]
    OnDecrementFromZero,
    /// Reclaim when a decrement takes the count to zero (or finds it there).
    OnReachingZero,
}

struct RefHolder {
    referent: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
    ref_count: u64,
}

struct RegistryState {
    next_id: u64,
    entries: HashMap<u64, RefHolder>,
}

/// Maps integer handles to reference-counted referents.
pub struct RefRegistry {
    policy: ReleasePolicy,
    state: Mutex<RegistryState>,
}

impl Default for RefRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RefRegistry {
    /// Empty registry with the default release policy.
    #[must_use]
    pub fn new() -> Self {
        Self::with_policy(ReleasePolicy::default())
    }

    /// Empty registry with an explicit release policy.
    #[must_use]
    pub fn with_policy(policy: ReleasePolicy) -> Self {
        Self {
            policy,
            state: Mutex::new(RegistryState {
                next_id: FIRST_HANDLE,
                entries: HashMap::new(),
            }),
        }
    }

    /// The process-wide registry.
    #[must_use]
    pub fn global() -> &'static RefRegistry {
        &GLOBAL_REGISTRY
    }

    /// The registry's release policy.
    #[must_use]
    pub fn policy(&self) -> ReleasePolicy {
        self.policy
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store `object` with a reference count of zero and return its handle.
    pub fn put<T: Any + Send + Sync>(&self, object: T) -> u64 {
        self.put_arc(Arc::new(object))
    }

    /// Store an already shared referent. Two handles for the same `Arc` are
    /// distinct entries.
    pub fn put_arc<T: Any + Send + Sync>(&self, object: Arc<T>) -> u64 {
        let mut state = self.lock();
        let id = state.next_id;
        state.next_id += 1;
        state.entries.insert(
            id,
            RefHolder {
                referent: object,
                type_name: std::any::type_name::<T>(),
                ref_count: 0,
            },
        );
        trace!(handle = id, ty = std::any::type_name::<T>(), "native ref put");
        id
    }

    /// The referent behind `handle`.
    ///
    /// Fails with `NotFound` for an unknown handle and `IllegalArgument` when
    /// the referent is not a `T`.
    pub fn get<T: Any + Send + Sync>(&self, handle: u64) -> SimResult<Arc<T>> {
        let (referent, type_name) = {
            let state = self.lock();
            let holder = state.entries.get(&handle).ok_or_else(|| missing(handle))?;
            (Arc::clone(&holder.referent), holder.type_name)
        };
        referent.downcast::<T>().map_err(|_| {
            SimError::illegal_argument(format!(
                "handle {handle} holds {type_name}, not {}",
                std::any::type_name::<T>()
            ))
        })
    }

    /// Add a strong reference. No-op on the null handle.
    pub fn increment(&self, handle: u64) -> SimResult<()> {
        if handle == NULL_HANDLE {
            return Ok(());
        }
        let mut state = self.lock();
        let holder = state.entries.get_mut(&handle).ok_or_else(|| missing(handle))?;
        holder.ref_count += 1;
        trace!(handle, ref_count = holder.ref_count, "native ref increment");
        Ok(())
    }

    /// Drop a strong reference. No-op on the null handle.
    ///
    /// Returns `true` when this call reclaimed the handle.
    pub fn decrement(&self, handle: u64) -> SimResult<bool> {
        if handle == NULL_HANDLE {
            return Ok(false);
        }
        let mut state = self.lock();
        let holder = state.entries.get_mut(&handle).ok_or_else(|| missing(handle))?;
        let release = match self.policy {
            ReleasePolicy::OnDecrementFromZero => holder.ref_count == 0,
            ReleasePolicy::OnReachingZero => holder.ref_count <= 1,
        };
        if release {
            state.entries.remove(&handle);
            trace!(handle, "native ref released");
        } else {
            holder.ref_count -= 1;
            trace!(handle, ref_count = holder.ref_count, "native ref decrement");
        }
        Ok(release)
    }

    /// Current strong count of `handle`, if it is registered.
    #[must_use]
    pub fn ref_count(&self, handle: u64) -> Option<u64> {
        self.lock().entries.get(&handle).map(|holder| holder.ref_count)
    }

    /// Whether `handle` is registered.
    #[must_use]
    pub fn contains(&self, handle: u64) -> bool {
        self.lock().entries.contains_key(&handle)
    }

    /// Number of live handles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Whether no handle is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for RefRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("RefRegistry")
            .field("policy", &self.policy)
            .field("live", &state.entries.len())
            .field("next_id", &state.next_id)
            .finish()
    }
}

fn missing(handle: u64) -> SimError {
    SimError::not_found(format!("native handle {handle}"))
}

/// Proxy holding one strong reference to a registered handle.
///
/// Acquiring or cloning increments the count; dropping decrements it. Every
/// proxy for the same handle derefs to the same referent.
pub struct StrongRef<'r, T: Any + Send + Sync> {
    registry: &'r RefRegistry,
    handle: u64,
    value: Arc<T>,
    armed: bool,
}

impl<'r, T: Any + Send + Sync> StrongRef<'r, T> {
    /// Take a strong reference to `handle`.
    pub fn acquire(registry: &'r RefRegistry, handle: u64) -> SimResult<Self> {
        let value = registry.get::<T>(handle)?;
        registry.increment(handle)?;
        Ok(Self {
            registry,
            handle,
            value,
            armed: true,
        })
    }

    /// The proxied handle.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.handle
    }

    /// Whether `self` and `other` alias the same referent.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }

    /// Drop the reference now, reporting registry errors instead of logging.
    pub fn release(mut self) -> SimResult<bool> {
        self.armed = false;
        self.registry.decrement(self.handle)
    }
}

impl<T: Any + Send + Sync> Clone for StrongRef<'_, T> {
    fn clone(&self) -> Self {
        // A failed increment means the handle was reclaimed underneath us;
        // the clone then must not decrement on drop.
        let armed = match self.registry.increment(self.handle) {
            Ok(()) => true,
            Err(err) => {
                warn!(handle = self.handle, error = %err, "cloning a released native ref");
                false
            }
        };
        Self {
            registry: self.registry,
            handle: self.handle,
            value: Arc::clone(&self.value),
            armed,
        }
    }
}

impl<T: Any + Send + Sync> Deref for StrongRef<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T: Any + Send + Sync> Drop for StrongRef<'_, T> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(err) = self.registry.decrement(self.handle) {
            warn!(handle = self.handle, error = %err, "native ref already released");
        }
    }
}

impl<T: Any + Send + Sync + fmt::Debug> fmt::Debug for StrongRef<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrongRef")
            .field("handle", &self.handle)
            .field("value", &self.value)
            .finish()
    }
}
