//! Ambient call-time context.
//!
//! A [`Context`] travels with every resolution and is handed to any
//! constructor that declares a `Context` parameter. It carries cancellation,
//! an optional deadline and typed request-scoped values. The container never
//! checks cancellation itself; observing it is the constructor's job.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cancellable, deadline-bearing, value-carrying context.
///
/// Contexts are immutable chains: every `with_*` call derives a child that
/// sees its parent's values, deadline and cancellation.
///
/// # Examples
///
/// ```rust
/// use ferrous_wire::Context;
/// use std::time::Duration;
///
/// struct TenantId(&'static str);
///
/// let root = Context::background();
/// let ctx = root.with_value(TenantId("acme")).with_timeout(Duration::from_secs(5));
///
/// assert_eq!(ctx.value::<TenantId>().unwrap().0, "acme");
/// assert!(ctx.deadline().is_some());
///
/// ctx.cancel();
/// assert!(ctx.is_cancelled());
/// assert!(!root.is_cancelled());
/// ```
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    parent: Option<Context>,
    cancelled: AtomicBool,
    deadline: Option<Instant>,
    value: Option<(TypeId, Arc<dyn Any + Send + Sync>)>,
}

impl Context {
    /// An empty root context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self {
            inner: Arc::new(ContextInner {
                parent: None,
                cancelled: AtomicBool::new(false),
                deadline: None,
                value: None,
            }),
        }
    }

    fn derive(&self, deadline: Option<Instant>, value: Option<(TypeId, Arc<dyn Any + Send + Sync>)>) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                parent: Some(self.clone()),
                cancelled: AtomicBool::new(false),
                deadline,
                value,
            }),
        }
    }

    /// Child context that can be cancelled independently of its parent.
    pub fn with_cancel(&self) -> Self {
        self.derive(None, None)
    }

    /// Child context carrying `value`, retrievable with [`Context::value`].
    pub fn with_value<T: Send + Sync + 'static>(&self, value: T) -> Self {
        self.derive(None, Some((TypeId::of::<T>(), Arc::new(value))))
    }

    /// Child context expiring at `deadline` (or earlier if the parent does).
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        self.derive(Some(deadline), None)
    }

    /// Child context expiring after `timeout`.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Cancels this context and every context derived from it.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
    }

    /// True when this context or an ancestor was cancelled or the deadline passed.
    pub fn is_cancelled(&self) -> bool {
        if self.inner.cancelled.load(Ordering::Acquire) {
            return true;
        }
        if let Some(deadline) = self.inner.deadline {
            if Instant::now() >= deadline {
                return true;
            }
        }
        match &self.inner.parent {
            Some(parent) => parent.is_cancelled(),
            None => false,
        }
    }

    /// The earliest deadline along the chain.
    pub fn deadline(&self) -> Option<Instant> {
        let own = self.inner.deadline;
        let inherited = self.inner.parent.as_ref().and_then(|p| p.deadline());
        match (own, inherited) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// The nearest value of type `T` along the chain.
    pub fn value<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        let mut current = Some(self);
        while let Some(ctx) = current {
            if let Some((id, value)) = &ctx.inner.value {
                if *id == TypeId::of::<T>() {
                    return value.clone().downcast::<T>().ok();
                }
            }
            current = ctx.inner.parent.as_ref();
        }
        None
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("cancelled", &self.is_cancelled())
            .field("deadline", &self.deadline())
            .finish()
    }
}
