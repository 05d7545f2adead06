#![forbid(unsafe_code)]

//! Host container and per-component windows.
//!
//! The controller never renders anything. Making a component visible means
//! asking its [`HostContainer`] to attach the component window's surface;
//! destroying it detaches that surface again.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

static NEXT_SURFACE: AtomicU64 = AtomicU64::new(1);

/// Identifier of a window surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(u64);

impl SurfaceId {
    /// Allocate a fresh id, unique within the process.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_SURFACE.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value.
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "surface#{}", self.0)
    }
}

/// Receives surfaces of components that become visible or go away.
pub trait HostContainer {
    /// Attach `surface`, owned by the component named `owner`.
    fn attach_surface(&self, surface: SurfaceId, owner: &str);

    /// Detach a previously attached surface. Unknown surfaces are ignored.
    fn detach_surface(&self, surface: SurfaceId);
}

/// A component's window: one surface plus its focus state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    surface: SurfaceId,
    attached: bool,
    has_focus: bool,
}

impl Default for Window {
    fn default() -> Self {
        Self::new()
    }
}

impl Window {
    /// Detached, unfocused window with a fresh surface.
    #[must_use]
    pub fn new() -> Self {
        Self {
            surface: SurfaceId::next(),
            attached: false,
            has_focus: false,
        }
    }

    /// The window's surface.
    #[must_use]
    pub fn surface(&self) -> SurfaceId {
        self.surface
    }

    /// Whether the surface is attached to the host.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Whether the window has input focus.
    #[must_use]
    pub fn has_focus(&self) -> bool {
        self.has_focus
    }

    pub(crate) fn attach(&mut self, host: &dyn HostContainer, owner: &str) {
        if !self.attached {
            host.attach_surface(self.surface, owner);
            self.attached = true;
        }
    }

    pub(crate) fn detach(&mut self, host: &dyn HostContainer) {
        if self.attached {
            host.detach_surface(self.surface);
            self.attached = false;
            self.has_focus = false;
        }
    }

    pub(crate) fn set_focus(&mut self, has_focus: bool) {
        self.has_focus = has_focus;
    }
}

/// Attachment record kept by [`WindowManager`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub surface: SurfaceId,
    pub owner: String,
}

/// In-memory [`HostContainer`] that records which surfaces are attached.
///
/// Cloning yields a handle to the same record.
#[derive(Debug, Clone, Default)]
pub struct WindowManager {
    attached: Rc<RefCell<Vec<Attachment>>>,
    attach_count: Rc<Cell<u64>>,
}

impl WindowManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `surface` is currently attached.
    #[must_use]
    pub fn is_attached(&self, surface: SurfaceId) -> bool {
        self.attached
            .borrow()
            .iter()
            .any(|attachment| attachment.surface == surface)
    }

    /// Currently attached surfaces, oldest first.
    #[must_use]
    pub fn attachments(&self) -> Vec<Attachment> {
        self.attached.borrow().clone()
    }

    /// Number of live attachments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.attached.borrow().len()
    }

    /// Whether nothing is attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attached.borrow().is_empty()
    }

    /// Total attach calls ever received.
    #[must_use]
    pub fn attach_count(&self) -> u64 {
        self.attach_count.get()
    }

    /// Forget every attachment.
    pub fn clear(&self) {
        self.attached.borrow_mut().clear();
    }
}

impl HostContainer for WindowManager {
    fn attach_surface(&self, surface: SurfaceId, owner: &str) {
        debug!(%surface, owner, "surface attached");
        self.attach_count.set(self.attach_count.get() + 1);
        self.attached.borrow_mut().push(Attachment {
            surface,
            owner: owner.to_string(),
        });
    }

    fn detach_surface(&self, surface: SurfaceId) {
        let mut attached = self.attached.borrow_mut();
        let before = attached.len();
        attached.retain(|attachment| attachment.surface != surface);
        if attached.len() != before {
            debug!(%surface, "surface detached");
        }
    }
}
