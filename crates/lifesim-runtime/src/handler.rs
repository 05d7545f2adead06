#![forbid(unsafe_code)]

//! Posting handles bound to one looper.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use lifesim_core::SimResult;

use crate::looper::Looper;
use crate::scheduler::{TaskToken, VirtualTime};

/// Posts work onto a specific [`Looper`] and remembers what it posted, so it
/// can retract everything that has not run yet.
///
/// Cloning yields a handle sharing the same posted-task bookkeeping.
#[derive(Clone)]
pub struct Handler {
    looper: Looper,
    posted: Rc<RefCell<Vec<TaskToken>>>,
}

impl Handler {
    /// Handler targeting `looper`.
    #[must_use]
    pub fn new(looper: Looper) -> Self {
        Self {
            looper,
            posted: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// The target looper.
    #[must_use]
    pub fn looper(&self) -> &Looper {
        &self.looper
    }

    /// Post `action` at the looper's current time.
    pub fn post(&self, action: impl FnOnce() + 'static) -> TaskToken {
        let token = self.looper.post(action);
        self.track(&token);
        token
    }

    /// Post `action` after `delay_ms`.
    pub fn post_delayed(&self, action: impl FnOnce() + 'static, delay_ms: i64) -> SimResult<TaskToken> {
        let token = self.looper.post_delayed(action, delay_ms)?;
        self.track(&token);
        Ok(token)
    }

    /// Post `action` at absolute time `execute_at`.
    pub fn post_at(&self, action: impl FnOnce() + 'static, execute_at: VirtualTime) -> SimResult<TaskToken> {
        let token = self.looper.post_at(action, execute_at)?;
        self.track(&token);
        Ok(token)
    }

    /// Cancel every task posted through this handler that has not run yet.
    ///
    /// Returns how many were cancelled.
    pub fn remove_callbacks(&self) -> usize {
        let tokens = std::mem::take(&mut *self.posted.borrow_mut());
        let cancelled = tokens.iter().filter(|token| token.cancel()).count();
        tracing::debug!(looper = self.looper.name(), cancelled, "handler callbacks removed");
        cancelled
    }

    /// Whether anything posted through this handler is still pending.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.posted.borrow().iter().any(TaskToken::is_pending)
    }

    fn track(&self, token: &TaskToken) {
        // A task that ran eagerly inside `post` is already gone.
        if token.is_pending() {
            let mut posted = self.posted.borrow_mut();
            posted.retain(TaskToken::is_pending);
            posted.push(token.clone());
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("looper", &self.looper.name())
            .field("pending", &self.has_pending())
            .finish()
    }
}
