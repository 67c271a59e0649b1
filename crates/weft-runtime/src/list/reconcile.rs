#![forbid(unsafe_code)]

//! Pure keyed-diff planning.
//!
//! Given the old and new key sequences, [`plan_keyed`] decides which old
//! entry each new position reuses, which old entries are dropped, and which
//! reused entries stay put. Stable entries form a longest increasing
//! subsequence of reused old indices, so the number of moves is
//! `reused - LIS`, the minimum for this kind of reorder.
//!
//! Duplicate keys pair up left to right: the k-th occurrence of a key in
//! the new list reuses the k-th occurrence in the old list.

use std::collections::VecDeque;
use std::hash::Hash;

use ahash::AHashMap;

/// Reconciliation plan for one keyed update.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyedPlan {
    /// Old index reused at each new position, `None` for a new entry.
    pub sources: Vec<Option<usize>>,
    /// Old indices with no counterpart, ascending.
    pub removed: Vec<usize>,
    /// Whether each new position keeps its current place.
    pub stable: Vec<bool>,
}

impl KeyedPlan {
    #[must_use]
    pub fn reused(&self) -> usize {
        self.sources.iter().flatten().count()
    }

    #[must_use]
    pub fn created(&self) -> usize {
        self.sources.iter().filter(|s| s.is_none()).count()
    }

    /// Reused entries that must be moved.
    #[must_use]
    pub fn moves(&self) -> usize {
        self.sources
            .iter()
            .zip(&self.stable)
            .filter(|(source, stable)| source.is_some() && !**stable)
            .count()
    }

    /// Nothing created, removed or moved.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.removed.is_empty() && self.created() == 0 && self.moves() == 0
    }
}

/// Plan the transition from `old` to `new`.
#[must_use]
pub fn plan_keyed<K: Eq + Hash>(old: &[K], new: &[K]) -> KeyedPlan {
    let mut positions: AHashMap<&K, VecDeque<usize>> = AHashMap::with_capacity(old.len());
    for (index, key) in old.iter().enumerate() {
        positions.entry(key).or_default().push_back(index);
    }

    let sources: Vec<Option<usize>> = new
        .iter()
        .map(|key| positions.get_mut(key).and_then(VecDeque::pop_front))
        .collect();

    let mut used = vec![false; old.len()];
    for &source in sources.iter().flatten() {
        used[source] = true;
    }
    let removed = used
        .iter()
        .enumerate()
        .filter_map(|(index, used)| (!used).then_some(index))
        .collect();

    let reused_at: Vec<usize> = sources
        .iter()
        .enumerate()
        .filter_map(|(position, source)| source.map(|_| position))
        .collect();
    let reused_from: Vec<usize> = sources.iter().flatten().copied().collect();

    let mut stable = vec![false; new.len()];
    for i in longest_increasing_subsequence(&reused_from) {
        stable[reused_at[i]] = true;
    }

    KeyedPlan {
        sources,
        removed,
        stable,
    }
}

/// Indices of one longest strictly increasing subsequence of `seq`.
///
/// Patience sorting with predecessor links, `O(n log n)`.
#[must_use]
pub fn longest_increasing_subsequence(seq: &[usize]) -> Vec<usize> {
    // tails[k] = index of the smallest tail of an increasing run of length k+1
    let mut tails: Vec<usize> = Vec::new();
    let mut prev: Vec<Option<usize>> = vec![None; seq.len()];
    for (i, &value) in seq.iter().enumerate() {
        let pos = tails.partition_point(|&t| seq[t] < value);
        if pos > 0 {
            prev[i] = Some(tails[pos - 1]);
        }
        if pos == tails.len() {
            tails.push(i);
        } else {
            tails[pos] = i;
        }
    }
    let mut out = Vec::with_capacity(tails.len());
    let mut cursor = tails.last().copied();
    while let Some(i) = cursor {
        out.push(i);
        cursor = prev[i];
    }
    out.reverse();
    out
}
