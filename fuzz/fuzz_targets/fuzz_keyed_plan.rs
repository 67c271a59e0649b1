#![no_main]

use libfuzzer_sys::fuzz_target;
use weft_runtime::list::plan_keyed;

fuzz_target!(|input: (Vec<u8>, Vec<u8>)| {
    let (old, new) = input;
    if old.len() > 512 || new.len() > 512 {
        return;
    }
    let plan = plan_keyed(&old, &new);

    assert_eq!(plan.sources.len(), new.len());
    assert_eq!(plan.reused() + plan.removed.len(), old.len());

    let mut seen = vec![false; old.len()];
    for (position, source) in plan.sources.iter().enumerate() {
        if let Some(index) = *source {
            assert!(!seen[index], "old entry reused twice");
            seen[index] = true;
            assert_eq!(old[index], new[position]);
        }
    }
    for &index in &plan.removed {
        assert!(!seen[index], "removed entry was also reused");
    }

    // Stable sources must be strictly increasing.
    let stable: Vec<usize> = plan
        .sources
        .iter()
        .zip(&plan.stable)
        .filter_map(|(source, stable)| source.filter(|_| *stable))
        .collect();
    assert!(stable.windows(2).all(|w| w[0] < w[1]));
});
