use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct Inner {
    cancelled: AtomicBool,
    parent: Option<Arc<Inner>>,
}

/// Ambient context passed to every task that asks for one.
///
/// Carries a cancellation flag; cancelling a context cancels every context
/// derived from it. Cloning is cheap and shares the flag.
#[derive(Debug, Clone, Default)]
pub struct Context {
    inner: Arc<Inner>,
}

/// Cancels the [`Context`] it was created with.
#[derive(Debug, Clone)]
pub struct Canceller {
    inner: Arc<Inner>,
}

impl Context {
    /// A context that is never cancelled.
    pub fn background() -> Self {
        Self::default()
    }

    /// Derive a child context along with a handle that cancels it.
    pub fn with_cancel(&self) -> (Context, Canceller) {
        let inner = Arc::new(Inner {
            cancelled: AtomicBool::new(false),
            parent: Some(Arc::clone(&self.inner)),
        });
        let ctx = Context {
            inner: Arc::clone(&inner),
        };
        (ctx, Canceller { inner })
    }

    /// True once this context or any of its ancestors has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        let mut cur = Some(&self.inner);
        while let Some(inner) = cur {
            if inner.cancelled.load(Ordering::Acquire) {
                return true;
            }
            cur = inner.parent.as_ref();
        }
        false
    }
}

impl Canceller {
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
    }
}
