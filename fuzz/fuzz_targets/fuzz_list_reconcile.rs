#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use weft_harness::Harness;
use weft_runtime::{KeyedList, PositionalList, Value};

#[derive(Arbitrary, Debug)]
enum ListOp {
    Keyed(Vec<u8>),
    Positional(Vec<u8>),
    Text(u8),
}

impl ListOp {
    fn expected_text(&self) -> String {
        match self {
            ListOp::Keyed(keys) | ListOp::Positional(keys) => keys.iter().map(|k| char::from(b'a' + k % 26)).collect(),
            ListOp::Text(t) => t.to_string(),
        }
    }

    fn to_value(&self) -> Value {
        let letter = |k: &u8| char::from(b'a' + k % 26).to_string();
        match self {
            ListOp::Keyed(keys) => KeyedList::from_items(keys.iter().copied(), |k| i64::from(*k), letter).into(),
            ListOp::Positional(keys) => PositionalList::from_items(keys.iter().copied(), letter).into(),
            ListOp::Text(t) => Value::from(u32::from(*t)),
        }
    }
}

fuzz_target!(|ops: Vec<ListOp>| {
    let h = Harness::sync();
    let Some((first, rest)) = ops.split_first() else {
        return;
    };
    let Ok(root) = h.mount(first.to_value()) else {
        return;
    };
    assert_eq!(h.text(), first.expected_text());
    for op in rest.iter().take(64) {
        root.update(op.to_value()).expect("update");
        h.settle().expect("settle");
        assert_eq!(h.text(), op.expected_text());
    }
    root.unmount().expect("unmount");
    h.settle().expect("settle");
    assert_eq!(h.text(), "");
});
