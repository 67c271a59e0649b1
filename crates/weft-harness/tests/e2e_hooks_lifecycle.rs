//! E2E: component hooks across mount, re-render and unmount.
//!
//! Drives real components through a sync [`Harness`] and checks:
//! 1. Effects with unchanged deps run once; cleanups run on unmount
//! 2. Changed deps clean up the previous effect before re-running
//! 3. Layout effects commit before passive effects
//! 4. State setters batch within a tick and ignore equal values
//! 5. Changing the hook count between renders is reported
//! 6. Context flows from a provider to its descendants

#![forbid(unsafe_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use weft_core::{Error, Result};
use weft_harness::Harness;
use weft_runtime::{Cleanup, Component, RenderContext, SetState, Value};

type Log = Rc<RefCell<Vec<String>>>;

fn push(log: &Log, entry: impl Into<String>) {
    log.borrow_mut().push(entry.into());
}

// ── Components ──────────────────────────────────────────────────────────

#[derive(Default)]
struct Witness {
    renders: Cell<usize>,
    effects: Cell<usize>,
    cleanups: Cell<usize>,
}

fn witness_view(witness: &Rc<Witness>, rc: &mut RenderContext<'_>) -> Result<Value> {
    witness.renders.set(witness.renders.get() + 1);
    let target = Rc::clone(witness);
    rc.use_effect(Some(()), move || -> Cleanup {
        target.effects.set(target.effects.get() + 1);
        let target = Rc::clone(&target);
        Some(Box::new(move || target.cleanups.set(target.cleanups.get() + 1)))
    })?;
    Ok(Value::from(format!("render {}", witness.renders.get())))
}

struct Keyed {
    key: u32,
    log: Log,
}

fn keyed_view(props: &Keyed, rc: &mut RenderContext<'_>) -> Result<Value> {
    let key = props.key;
    let log = Rc::clone(&props.log);
    rc.use_effect(Some(key), move || -> Cleanup {
        push(&log, format!("run {key}"));
        Some(Box::new(move || push(&log, format!("clean {key}"))))
    })?;
    Ok(Value::from(key))
}

fn phased_view(log: &Log, rc: &mut RenderContext<'_>) -> Result<Value> {
    let passive = Rc::clone(log);
    rc.use_effect(None::<()>, move || -> Cleanup {
        push(&passive, "passive");
        None
    })?;
    let layout = Rc::clone(log);
    rc.use_layout_effect(None::<()>, move || -> Cleanup {
        push(&layout, "layout");
        None
    })?;
    Ok(Value::from("phased"))
}

#[derive(Default)]
struct Counter {
    renders: Cell<usize>,
    setter: RefCell<Option<SetState<i32>>>,
}

fn counter_view(counter: &Rc<Counter>, rc: &mut RenderContext<'_>) -> Result<Value> {
    counter.renders.set(counter.renders.get() + 1);
    let (count, set) = rc.use_state(|| 0)?;
    *counter.setter.borrow_mut() = Some(set);
    Ok(Value::from(format!("count {count}")))
}

fn conditional_view(with_state: &bool, rc: &mut RenderContext<'_>) -> Result<Value> {
    if *with_state {
        rc.use_state(|| 1)?;
    }
    Ok(Value::from("conditional"))
}

#[derive(Debug, Clone, PartialEq)]
struct Theme(&'static str);

fn provider_view(theme: &&'static str, rc: &mut RenderContext<'_>) -> Result<Value> {
    rc.provide_context(Theme(*theme));
    Ok(Component::new("themed", themed_view, ()).into())
}

fn themed_view(_: &(), rc: &mut RenderContext<'_>) -> Result<Value> {
    let theme = rc.use_context::<Theme>()?;
    Ok(Value::from(format!("theme {}", theme.0)))
}

struct Label {
    text: &'static str,
    renders: Rc<Cell<usize>>,
}

impl PartialEq for Label {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

fn label_view(label: &Label, _: &mut RenderContext<'_>) -> Result<Value> {
    label.renders.set(label.renders.get() + 1);
    Ok(Value::from(label.text))
}

fn counter_setter(counter: &Counter) -> SetState<i32> {
    counter.setter.borrow().clone().expect("counter rendered")
}

// ═════════════════════════════════════════════════════════════════════════
// Effects
// ═════════════════════════════════════════════════════════════════════════

#[test]
fn mount_effect_runs_once_across_rerenders() {
    let h = Harness::sync();
    let witness = Rc::new(Witness::default());
    let root = h
        .mount(Component::new("witness", witness_view, Rc::clone(&witness)))
        .expect("mount");
    for _ in 0..4 {
        root.update(Component::new("witness", witness_view, Rc::clone(&witness)))
            .expect("update");
        h.settle().expect("settle");
    }
    assert_eq!(witness.renders.get(), 5);
    assert_eq!(witness.effects.get(), 1);
    assert_eq!(witness.cleanups.get(), 0);
    assert_eq!(h.text(), "render 5");

    root.unmount().expect("unmount");
    h.settle().expect("settle");
    assert_eq!(witness.cleanups.get(), 1);
    assert_eq!(h.text(), "");
}

#[test]
fn changed_deps_clean_up_before_rerun() {
    let h = Harness::sync();
    let log: Log = Rc::default();
    let keyed = |key| Component::new("keyed", keyed_view, Keyed { key, log: Rc::clone(&log) });

    let root = h.mount(keyed(1)).expect("mount");
    root.update(keyed(1)).expect("update");
    h.settle().expect("settle");
    root.update(keyed(2)).expect("update");
    h.settle().expect("settle");

    assert_eq!(*log.borrow(), ["run 1", "clean 1", "run 2"]);
    assert_eq!(h.text(), "2");
}

#[test]
fn layout_effects_commit_before_passive() {
    let h = Harness::sync();
    let log: Log = Rc::default();
    h.mount(Component::new("phased", phased_view, Rc::clone(&log)))
        .expect("mount");
    assert_eq!(*log.borrow(), ["layout", "passive"]);
}

// ═════════════════════════════════════════════════════════════════════════
// State
// ═════════════════════════════════════════════════════════════════════════

#[test]
fn state_updates_in_one_tick_render_once() {
    let h = Harness::sync();
    let counter = Rc::new(Counter::default());
    let _root = h
        .mount(Component::new("counter", counter_view, Rc::clone(&counter)))
        .expect("mount");
    assert_eq!(h.text(), "count 0");

    let set = counter_setter(&counter);
    set.dispatch(1);
    set.dispatch(2);
    set.dispatch(3);
    h.settle().expect("settle");
    assert_eq!(counter.renders.get(), 2);
    assert_eq!(h.text(), "count 3");
}

#[test]
fn equal_state_schedules_nothing() {
    let h = Harness::sync();
    let counter = Rc::new(Counter::default());
    let _root = h
        .mount(Component::new("counter", counter_view, Rc::clone(&counter)))
        .expect("mount");
    h.surface.clear_ops();

    counter_setter(&counter).dispatch(0);
    assert!(!h.runtime.updater().is_pending());
    h.settle().expect("settle");
    assert_eq!(counter.renders.get(), 1);
    assert_eq!(h.surface.write_count(), 0);
}

#[test]
fn setter_identity_is_stable() {
    let h = Harness::sync();
    let counter = Rc::new(Counter::default());
    let _root = h
        .mount(Component::new("counter", counter_view, Rc::clone(&counter)))
        .expect("mount");
    let first = counter_setter(&counter);
    first.dispatch(7);
    h.settle().expect("settle");
    assert!(first.ptr_eq(&counter_setter(&counter)));
}

#[test]
fn hook_count_change_is_an_error() {
    let h = Harness::sync();
    let root = h
        .mount(Component::new("conditional", conditional_view, true))
        .expect("mount");
    root.update(Component::new("conditional", conditional_view, false))
        .expect("update");
    let err = h.settle().err();
    assert_eq!(
        err,
        Some(Error::HookCountMismatch {
            block: "conditional".into(),
            expected: 1,
            actual: 0,
        })
    );
    // Reported once.
    assert_eq!(h.settle(), Ok(()));
}

// ═════════════════════════════════════════════════════════════════════════
// Context and memoized components
// ═════════════════════════════════════════════════════════════════════════

#[test]
fn context_reaches_descendants() {
    let h = Harness::sync();
    let root = h
        .mount(Component::new("provider", provider_view, "dark"))
        .expect("mount");
    assert_eq!(h.text(), "theme dark");

    root.update(Component::new("provider", provider_view, "light"))
        .expect("update");
    h.settle().expect("settle");
    assert_eq!(h.text(), "theme light");
}

#[test]
fn missing_context_is_reported() {
    let h = Harness::sync();
    let err = h.mount(Component::new("themed", themed_view, ())).err();
    assert!(
        matches!(err, Some(Error::MissingContext { ref block, .. }) if block == "themed"),
        "{err:?}"
    );
}

#[test]
fn memo_component_skips_equal_props() {
    let h = Harness::sync();
    let renders = Rc::new(Cell::new(0));
    let label = |text| {
        Component::memo(
            "label",
            label_view,
            Label {
                text,
                renders: Rc::clone(&renders),
            },
        )
    };

    let root = h.mount(label("a")).expect("mount");
    root.update(label("a")).expect("update");
    h.settle().expect("settle");
    assert_eq!(renders.get(), 1);

    root.update(label("b")).expect("update");
    h.settle().expect("settle");
    assert_eq!(renders.get(), 2);
    assert_eq!(h.text(), "b");
}
