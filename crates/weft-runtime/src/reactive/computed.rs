#![forbid(unsafe_code)]

//! Lazy computed values derived from other signals.
//!
//! # Design
//!
//! [`Computed<T>`] wraps a compute function, its dependencies, and the cached
//! result in shared storage. Its version is the sum of the dependency
//! versions, so "did anything change" is one addition per dependency and no
//! dirty flags need to be pushed around. The next read after the aggregate
//! moves recomputes and caches.
//!
//! # Invariants
//!
//! 1. A read always reflects the current dependency values.
//! 2. The compute function runs at most once per aggregate version.
//! 3. The version is monotonic because every dependency version is.
//!
//! # Failure Modes
//!
//! - **Compute function panics**: the previous cache and cached version are
//!   kept, so the next read retries.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::signal::{Signal, SignalId, Source, Subscription};

struct ComputedInner<T> {
    compute: Box<dyn Fn() -> T>,
    cached: Option<T>,
    /// Aggregate dependency version the cache was computed at.
    cached_version: u64,
    recomputations: u64,
}

/// A memoized value derived from one or more signals.
///
/// Cloning a `Computed` creates a new handle to the **same** state.
pub struct Computed<T> {
    inner: Rc<RefCell<ComputedInner<T>>>,
    deps: Rc<[Rc<dyn Source>]>,
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
            deps: Rc::clone(&self.deps),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Computed")
            .field("cached", &inner.cached)
            .field("cached_version", &inner.cached_version)
            .field("deps", &self.deps.len())
            .finish()
    }
}

fn erase<S: Source + Clone + 'static>(source: &S) -> Rc<dyn Source> {
    Rc::new(source.clone())
}

impl<T: Clone + 'static> Computed<T> {
    /// Derive from a single signal.
    pub fn from_signal<A, S>(source: &S, map: impl Fn(&A) -> T + 'static) -> Self
    where
        S: Signal<A> + Clone + 'static,
    {
        let s = source.clone();
        Self::from_fn(vec![erase(source)], move || map(&s.value()))
    }

    /// Derive from two signals.
    pub fn from2<A, B, SA, SB>(a: &SA, b: &SB, map: impl Fn(&A, &B) -> T + 'static) -> Self
    where
        SA: Signal<A> + Clone + 'static,
        SB: Signal<B> + Clone + 'static,
    {
        let (sa, sb) = (a.clone(), b.clone());
        Self::from_fn(vec![erase(a), erase(b)], move || map(&sa.value(), &sb.value()))
    }

    /// Derive from three signals.
    pub fn from3<A, B, C, SA, SB, SC>(a: &SA, b: &SB, c: &SC, map: impl Fn(&A, &B, &C) -> T + 'static) -> Self
    where
        SA: Signal<A> + Clone + 'static,
        SB: Signal<B> + Clone + 'static,
        SC: Signal<C> + Clone + 'static,
    {
        let (sa, sb, sc) = (a.clone(), b.clone(), c.clone());
        Self::from_fn(vec![erase(a), erase(b), erase(c)], move || {
            map(&sa.value(), &sb.value(), &sc.value())
        })
    }

    /// Low-level constructor: `compute` must only read signals listed in
    /// `deps`.
    pub fn from_fn(deps: Vec<Rc<dyn Source>>, compute: impl Fn() -> T + 'static) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ComputedInner {
                compute: Box::new(compute),
                cached: None,
                cached_version: 0,
                recomputations: 0,
            })),
            deps: deps.into(),
        }
    }

    /// Current value, recomputed if the aggregate version moved.
    #[must_use]
    pub fn get(&self) -> T {
        let version = self.version();
        {
            let inner = self.inner.borrow();
            if let Some(cached) = inner.cached.as_ref()
                && version <= inner.cached_version
            {
                return cached.clone();
            }
        }
        let fresh = (self.inner.borrow().compute)();
        let mut inner = self.inner.borrow_mut();
        inner.cached = Some(fresh.clone());
        inner.cached_version = version;
        inner.recomputations += 1;
        fresh
    }

    /// Whether the next read will recompute.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        let inner = self.inner.borrow();
        inner.cached.is_none() || self.version() > inner.cached_version
    }

    /// Number of times the compute function has run.
    #[must_use]
    pub fn recomputations(&self) -> u64 {
        self.inner.borrow().recomputations
    }
}

impl<T> Source for Computed<T> {
    fn version(&self) -> u64 {
        self.deps.iter().map(|dep| dep.version()).sum()
    }

    fn subscribe(&self, callback: Rc<dyn Fn()>) -> Subscription {
        self.deps.iter().fold(Subscription::empty(), |acc, dep| {
            Subscription::join(acc, dep.subscribe(Rc::clone(&callback)))
        })
    }

    fn signal_id(&self) -> SignalId {
        SignalId::of(Rc::as_ptr(&self.inner))
    }
}

impl<T: Clone + 'static> Signal<T> for Computed<T> {
    fn value(&self) -> T {
        self.get()
    }
}
