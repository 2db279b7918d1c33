//! Listener registration with unsubscribe handles

use parking_lot::Mutex;
use std::sync::Arc;

type Cancel = Box<dyn FnOnce() + Send + Sync>;

/// Handle returned by every `subscribe_*` call
///
/// Dropping the handle keeps the listener registered; call
/// [`Subscription::unsubscribe`] to remove it.
pub struct Subscription {
    cancel: Option<Cancel>,
}

impl Subscription {
    pub(crate) fn new(cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A handle that is not attached to any registry
    pub fn detached() -> Self {
        Self { cancel: None }
    }

    /// Remove the listener. Safe to call after the source is gone.
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("attached", &self.cancel.is_some())
            .finish()
    }
}

struct RegistryInner<L: ?Sized> {
    next_id: u64,
    listeners: Vec<(u64, Arc<L>)>,
}

/// Ordered set of listeners of type `L`
///
/// Listeners are invoked on a snapshot taken outside the lock, so a listener
/// may subscribe, unsubscribe or mutate the source it listens to.
pub struct ListenerRegistry<L: ?Sized> {
    inner: Arc<Mutex<RegistryInner<L>>>,
}

impl<L: ?Sized> Clone for ListenerRegistry<L> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<L: ?Sized> Default for ListenerRegistry<L> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(RegistryInner {
                next_id: 0,
                listeners: Vec::new(),
            })),
        }
    }
}

impl<L: ?Sized + Send + Sync + 'static> ListenerRegistry<L> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener, returning its unsubscribe handle
    #[must_use = "dropping the subscription makes it impossible to unsubscribe"]
    pub fn register(&self, listener: Arc<L>) -> Subscription {
        let id = {
            let mut inner = self.inner.lock();
            inner.next_id += 1;
            let id = inner.next_id;
            inner.listeners.push((id, listener));
            id
        };
        let registry = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = registry.upgrade() {
                inner.lock().listeners.retain(|(listener_id, _)| *listener_id != id);
            }
        })
    }

    /// Invoke `notify` for every listener in registration order
    pub fn emit(&self, notify: impl Fn(&L)) {
        let listeners: Vec<Arc<L>> = self
            .inner
            .lock()
            .listeners
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            notify(&listener);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
