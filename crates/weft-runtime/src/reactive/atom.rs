#![forbid(unsafe_code)]

//! Mutable, versioned cells.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use super::signal::{Signal, SignalId, Source, SubscriberList, Subscription};

struct AtomInner<T> {
    value: RefCell<T>,
    version: Cell<u64>,
    subscribers: SubscriberList,
}

/// A shared mutable value.
///
/// Every write bumps the version by one and synchronously notifies
/// subscribers, even when the new value equals the old one. Cloning shares
/// the cell.
pub struct Atom<T> {
    inner: Rc<AtomInner<T>>,
}

impl<T> Clone for Atom<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Atom<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Atom")
            .field("value", &*self.inner.value.borrow())
            .field("version", &self.inner.version.get())
            .finish()
    }
}

impl<T> Atom<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(AtomInner {
                value: RefCell::new(value),
                version: Cell::new(0),
                subscribers: SubscriberList::default(),
            }),
        }
    }

    /// Read by reference.
    ///
    /// # Panics
    ///
    /// Panics if `f` writes to this atom.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Replace the value, bump the version, notify.
    pub fn set(&self, value: T) {
        *self.inner.value.borrow_mut() = value;
        self.changed();
    }

    /// Mutate in place, bump the version, notify.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        f(&mut self.inner.value.borrow_mut());
        self.changed();
    }

    fn changed(&self) {
        self.inner.version.set(self.inner.version.get() + 1);
        self.inner.subscribers.notify();
    }

    /// Subscribe a plain closure.
    pub fn subscribe_fn(&self, callback: impl Fn() + 'static) -> Subscription {
        self.inner.subscribers.subscribe(Rc::new(callback))
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.live_count()
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: Clone> Atom<T> {
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }
}

impl<T> Source for Atom<T> {
    fn version(&self) -> u64 {
        self.inner.version.get()
    }

    fn subscribe(&self, callback: Rc<dyn Fn()>) -> Subscription {
        self.inner.subscribers.subscribe(callback)
    }

    fn signal_id(&self) -> SignalId {
        SignalId::of(Rc::as_ptr(&self.inner))
    }
}

impl<T: Clone> Signal<T> for Atom<T> {
    fn value(&self) -> T {
        self.get()
    }
}
