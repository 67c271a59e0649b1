#![forbid(unsafe_code)]

//! Mapped views over a signal.

use std::rc::Rc;

use super::signal::{Signal, SignalId, Source, Subscription};

/// `map(source.value())`, recomputed on every read.
///
/// Version and subscriptions are forwarded to the source; the identity is
/// the projection's own.
pub struct Projected<S, T> {
    source: Rc<dyn Signal<S>>,
    map: Rc<dyn Fn(&S) -> T>,
}

impl<S, T> Clone for Projected<S, T> {
    fn clone(&self) -> Self {
        Self {
            source: Rc::clone(&self.source),
            map: Rc::clone(&self.map),
        }
    }
}

impl<S: 'static, T: 'static> Projected<S, T> {
    pub fn new<Src>(source: &Src, map: impl Fn(&S) -> T + 'static) -> Self
    where
        Src: Signal<S> + Clone + 'static,
    {
        Self {
            source: Rc::new(source.clone()),
            map: Rc::new(map),
        }
    }

    #[must_use]
    pub fn get(&self) -> T {
        (self.map)(&self.source.value())
    }
}

impl<S, T> Source for Projected<S, T> {
    fn version(&self) -> u64 {
        self.source.version()
    }

    fn subscribe(&self, callback: Rc<dyn Fn()>) -> Subscription {
        self.source.subscribe(callback)
    }

    fn signal_id(&self) -> SignalId {
        SignalId::of(Rc::as_ptr(&self.map))
    }
}

impl<S: 'static, T: 'static> Signal<T> for Projected<S, T> {
    fn value(&self) -> T {
        self.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{Atom, SignalExt};
    use std::cell::Cell;

    #[test]
    fn forwards_version_and_maps_value() {
        let atom = Atom::new(3);
        let label = atom.map(|v: &i32| format!("n={v}"));
        assert_eq!(label.get(), "n=3");
        atom.set(4);
        assert_eq!(label.version(), atom.version());
        assert_eq!(label.value(), "n=4");
        assert_ne!(label.signal_id(), atom.signal_id());
    }

    #[test]
    fn recomputes_on_every_read() {
        let runs = Rc::new(Cell::new(0));
        let r = Rc::clone(&runs);
        let atom = Atom::new(1);
        let projected = Projected::new(&atom, move |v: &i32| {
            r.set(r.get() + 1);
            *v
        });
        let _ = projected.get();
        let _ = projected.get();
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn subscription_is_forwarded() {
        let atom = Atom::new(0);
        let projected = atom.map(|v: &i32| v + 1);
        let sub = projected.subscribe(Rc::new(|| {}));
        assert_eq!(atom.subscriber_count(), 1);
        drop(sub);
        assert_eq!(atom.subscriber_count(), 0);
    }
}
