#![forbid(unsafe_code)]

//! Minimal edit scripts between two orderings of unique keys.
//!
//! With unique keys the longest common subsequence of `old` and `new` is the
//! longest increasing run of old positions taken in new order, which patience
//! sorting finds in O(n log n). Everything outside it is a delete (old side)
//! or an insert (new side), so the script has the fewest possible entries.
//!
//! # Invariants
//!
//! 1. Applying `deletes` (highest first) to `old`, then `inserts` (lowest
//!    first, taking elements from `new`) yields `new`.
//! 2. `deletes.len() + inserts.len()` is minimal.
//! 3. `kept` pairs are strictly increasing on both sides.

use std::hash::Hash;

use ahash::AHashMap;

/// Positional edit script.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditScript {
    /// Indices into `old`, highest first.
    pub deletes: Vec<usize>,
    /// Indices into `new`, lowest first.
    pub inserts: Vec<usize>,
    /// `(old, new)` index pairs left in place.
    pub kept: Vec<(usize, usize)>,
}

impl EditScript {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.deletes.is_empty() && self.inserts.is_empty()
    }
}

/// Compute the minimal edit script turning `old` into `new`.
///
/// Keys must be unique within each side.
pub fn diff<K: Eq + Hash>(old: &[K], new: &[K]) -> EditScript {
    let old_positions: AHashMap<&K, usize> = old.iter().enumerate().map(|(i, k)| (k, i)).collect();

    // (new index, old index) for every key present on both sides, in new order.
    let common: Vec<(usize, usize)> = new
        .iter()
        .enumerate()
        .filter_map(|(j, k)| old_positions.get(k).map(|&i| (j, i)))
        .collect();
    let olds: Vec<usize> = common.iter().map(|&(_, i)| i).collect();

    let mut kept: Vec<(usize, usize)> = longest_increasing(&olds)
        .into_iter()
        .map(|c| (common[c].1, common[c].0))
        .collect();
    kept.sort_unstable();

    let mut keep_old = vec![false; old.len()];
    let mut keep_new = vec![false; new.len()];
    for &(i, j) in &kept {
        keep_old[i] = true;
        keep_new[j] = true;
    }
    EditScript {
        deletes: (0..old.len()).rev().filter(|&i| !keep_old[i]).collect(),
        inserts: (0..new.len()).filter(|&j| !keep_new[j]).collect(),
        kept,
    }
}

/// Indices of one longest strictly increasing subsequence of `seq`.
fn longest_increasing(seq: &[usize]) -> Vec<usize> {
    // tails[k]: index in `seq` of the smallest tail of an increasing run of length k + 1.
    let mut tails: Vec<usize> = Vec::new();
    let mut prev: Vec<Option<usize>> = vec![None; seq.len()];
    for (i, &value) in seq.iter().enumerate() {
        let k = tails.partition_point(|&t| seq[t] < value);
        if k > 0 {
            prev[i] = Some(tails[k - 1]);
        }
        if k == tails.len() {
            tails.push(i);
        } else {
            tails[k] = i;
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
