#![forbid(unsafe_code)]

//! Signal traits and subscription bookkeeping.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use super::projected::Projected;

/// Identity of a signal instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignalId(usize);

impl SignalId {
    pub(crate) fn of<T: ?Sized>(ptr: *const T) -> Self {
        Self(ptr.cast::<()>() as usize)
    }
}

/// Type-erased side of a signal: version and change notification.
pub trait Source {
    /// Monotonic version; changes whenever the value may have changed.
    fn version(&self) -> u64;

    /// Call `callback` after every change until the guard is dropped.
    fn subscribe(&self, callback: Rc<dyn Fn()>) -> Subscription;

    fn signal_id(&self) -> SignalId;
}

/// A readable, versioned value.
pub trait Signal<T>: Source {
    fn value(&self) -> T;
}

/// Combinators for signal handles.
pub trait SignalExt<T: 'static>: Signal<T> + Clone + Sized + 'static {
    /// Unmemoized view of this signal through `map`.
    fn map<U: 'static>(&self, map: impl Fn(&T) -> U + 'static) -> Projected<T, U> {
        Projected::new(self, map)
    }
}

impl<T: 'static, S: Signal<T> + Clone + 'static> SignalExt<T> for S {}

/// RAII guard: the subscription lives exactly as long as this value.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    callbacks: Vec<Rc<dyn Fn()>>,
}

impl Subscription {
    pub fn empty() -> Self {
        Self { callbacks: Vec::new() }
    }

    /// One guard covering both subscriptions.
    pub fn join(mut a: Self, b: Self) -> Self {
        a.callbacks.extend(b.callbacks);
        a
    }

    /// Number of sources this guard keeps subscribed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("sources", &self.callbacks.len())
            .finish()
    }
}

/// Weak subscriber list shared by every signal kind.
#[derive(Default)]
pub(crate) struct SubscriberList {
    entries: RefCell<Vec<Weak<dyn Fn()>>>,
}

impl SubscriberList {
    pub(crate) fn subscribe(&self, callback: Rc<dyn Fn()>) -> Subscription {
        self.entries.borrow_mut().push(Rc::downgrade(&callback));
        Subscription {
            callbacks: vec![callback],
        }
    }

    /// Call every live subscriber. No borrow is held during the calls, so
    /// callbacks may subscribe or drop guards.
    pub(crate) fn notify(&self) {
        let live: Vec<Rc<dyn Fn()>> = {
            let mut entries = self.entries.borrow_mut();
            entries.retain(|entry| entry.strong_count() > 0);
            entries.iter().filter_map(Weak::upgrade).collect()
        };
        for callback in live {
            callback();
        }
    }

    pub(crate) fn live_count(&self) -> usize {
        self.entries
            .borrow()
            .iter()
            .filter(|entry| entry.strong_count() > 0)
            .count()
    }
}
