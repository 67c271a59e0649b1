//! E2E: structured log events emitted by the engine.
//!
//! Captures events with a `tracing_subscriber` layer and checks that list
//! reconciliation reports its statistics and that aborted flushes are logged
//! at error level with the error code.

#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::{Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::{Context, SubscriberExt};
use weft_core::Result;
use weft_harness::Harness;
use weft_runtime::{Component, KeyedList, RenderContext, Value};

// ── Capture layer ───────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Captured {
    level: Level,
    message: String,
    fields: HashMap<String, String>,
}

#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: HashMap<String, String>,
}

impl tracing::field::Visit for FieldVisitor {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.insert(field.name().to_string(), value.to_string());
        }
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.fields.insert(field.name().to_string(), value.to_string());
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.fields.insert(field.name().to_string(), value.to_string());
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn fmt::Debug) {
        let text = format!("{value:?}").trim_matches('"').to_string();
        if field.name() == "message" {
            self.message = text;
        } else {
            self.fields.insert(field.name().to_string(), text);
        }
    }
}

struct CaptureLayer {
    events: Arc<Mutex<Vec<Captured>>>,
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);
        self.events.lock().expect("capture lock").push(Captured {
            level: *event.metadata().level(),
            message: visitor.message,
            fields: visitor.fields,
        });
    }
}

fn capture<R>(f: impl FnOnce() -> R) -> (R, Vec<Captured>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let subscriber = tracing_subscriber::registry().with(CaptureLayer {
        events: Arc::clone(&events),
    });
    let result = tracing::subscriber::with_default(subscriber, f);
    let captured = events.lock().expect("capture lock").clone();
    (result, captured)
}

fn find<'a>(events: &'a [Captured], message: &str) -> Vec<&'a Captured> {
    events.iter().filter(|e| e.message == message).collect()
}

// ── Helpers ──────────────────────────────────────────────────────────

fn letters(keys: &[i64]) -> KeyedList {
    KeyedList::from_items(keys.iter().copied(), |k| *k, |k| format!("[{k}]"))
}

fn needs_context(_: &(), rc: &mut RenderContext<'_>) -> Result<Value> {
    rc.use_context::<String>()?;
    Ok(Value::none())
}

// ═════════════════════════════════════════════════════════════════════════
// Events
// ═════════════════════════════════════════════════════════════════════════

#[test]
fn keyed_reconcile_reports_statistics() {
    let (text, events) = capture(|| {
        let h = Harness::sync();
        let root = h.mount(letters(&[1, 2, 3])).expect("mount");
        root.update(letters(&[3, 1, 2, 4])).expect("update");
        h.settle().expect("settle");
        h.text()
    });
    assert_eq!(text, "[3][1][2][4]");

    let reconciles = find(&events, "keyed reconcile");
    assert_eq!(reconciles.len(), 2);
    let last = reconciles[1];
    assert_eq!(last.level, Level::TRACE);
    assert_eq!(last.fields.get("reused").map(String::as_str), Some("3"));
    assert_eq!(last.fields.get("created").map(String::as_str), Some("1"));
    assert_eq!(last.fields.get("removed").map(String::as_str), Some("0"));
    assert_eq!(last.fields.get("moves").map(String::as_str), Some("1"));

    assert_eq!(find(&events, "mount").len(), 1);
    assert!(find(&events, "sync flush").iter().all(|e| e.level == Level::DEBUG));
}

#[test]
fn aborted_flush_is_logged_with_code() {
    let (err, events) = capture(|| {
        let h = Harness::sync();
        h.mount(Component::new("needs-context", needs_context, ())).err()
    });
    assert_eq!(err.map(|e| e.code()), Some("missing_context"));

    let aborted = find(&events, "sync flush aborted");
    assert_eq!(aborted.len(), 1);
    assert_eq!(aborted[0].level, Level::ERROR);
    assert_eq!(aborted[0].fields.get("code").map(String::as_str), Some("missing_context"));
}
