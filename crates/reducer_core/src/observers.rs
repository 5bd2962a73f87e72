//! Explicit observer registry.
//!
//! Observers are callbacks owned by the registry and released through the
//! [`Subscription`] handle returned at registration. The handle holds only a
//! weak reference, so it never keeps the registry alive.

use std::{
    collections::BTreeMap,
    fmt,
    sync::{Arc, Mutex, PoisonError, Weak},
};

use tracing::trace;

use crate::Reducer;

type Callback<T> = Box<dyn FnMut(&T) + Send>;

struct RegistryInner<T> {
    next_id: u64,
    callbacks: BTreeMap<u64, Callback<T>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

/// Callbacks must not subscribe to or notify the registry they run in.
pub struct ObserverRegistry<T> {
    inner: Arc<Mutex<RegistryInner<T>>>,
}

impl<T> Clone for ObserverRegistry<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for ObserverRegistry<T> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(RegistryInner {
                next_id: 0,
                callbacks: BTreeMap::new(),
            })),
        }
    }
}

impl<T> ObserverRegistry<T> {
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .callbacks
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> fmt::Debug for ObserverRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("observers", &self.len())
            .finish()
    }
}

impl<T: 'static> ObserverRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(&T) + Send + 'static,
    {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let id = guard.next_id;
        guard.next_id += 1;
        guard.callbacks.insert(id, Box::new(callback));
        drop(guard);

        let registry: Weak<Mutex<RegistryInner<T>>> = Arc::downgrade(&self.inner);
        Subscription {
            id: SubscriptionId(id),
            release: Some(Box::new(move || {
                if let Some(inner) = registry.upgrade() {
                    inner
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .callbacks
                        .remove(&id);
                }
            })),
        }
    }

    /// Calls every live observer in subscription order.
    pub fn notify(&self, value: &T) -> usize {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        for callback in guard.callbacks.values_mut() {
            callback(value);
        }
        let notified = guard.callbacks.len();
        trace!(notified, "observers notified");
        notified
    }
}

/// Registration handle. Dropping it releases the observer.
#[must_use = "dropping a Subscription releases the observer immediately"]
pub struct Subscription {
    id: SubscriptionId,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn cancel(mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }

    /// Keeps the observer registered for the registry's whole lifetime.
    pub fn detach(mut self) {
        self.release = None;
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.release.is_some())
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

/// Reports every output of the wrapped reducer to a registry.
pub struct ObservedReducer<R: Reducer> {
    reducer: R,
    observers: ObserverRegistry<R::Output>,
}

impl<R: Reducer> ObservedReducer<R> {
    pub fn new(reducer: R) -> Self {
        Self {
            reducer,
            observers: ObserverRegistry::new(),
        }
    }

    pub fn observers(&self) -> ObserverRegistry<R::Output> {
        self.observers.clone()
    }
}

impl<R: Reducer> Reducer for ObservedReducer<R> {
    type Message = R::Message;
    type Output = R::Output;

    fn handle(&mut self, message: R::Message) -> Option<R::Output> {
        let output = self.reducer.handle(message)?;
        self.observers.notify(&output);
        Some(output)
    }
}

#[cfg(test)]
#[path = "tests/observers_tests.rs"]
mod tests;
