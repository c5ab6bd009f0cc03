// src/transaction/order.rs

use crate::package::Package;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;

/// Application order for packages found in `discovery` order
///
/// The starting point is the reversed discovery list. A Kahn topological sort
/// over the `(dependent, dependency)` edges then picks, among the packages
/// whose dependencies are all placed, the one earliest in that reversed list.
/// When the reversed list is already topological it comes out unchanged.
/// Cycles are broken at the earliest remaining package.
pub fn application_order(discovery: &[Package], edges: &[(Package, Package)]) -> Vec<Package> {
    let reversed: Vec<&Package> = discovery.iter().rev().collect();
    let n = reversed.len();
    let position: HashMap<&Package, usize> =
        reversed.iter().enumerate().map(|(i, p)| (*p, i)).collect();

    let mut pending = vec![0usize; n];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut seen = HashSet::new();

    for (dependent, dependency) in edges {
        let (Some(&from), Some(&to)) = (position.get(dependent), position.get(dependency)) else {
            continue;
        };
        if from == to || !seen.insert((from, to)) {
            continue;
        }
        pending[from] += 1;
        dependents[to].push(from);
    }

    let mut ready: BTreeSet<usize> = (0..n).filter(|&i| pending[i] == 0).collect();
    let mut placed = vec![false; n];
    let mut order = Vec::with_capacity(n);

    while order.len() < n {
        let next = match ready.pop_first() {
            Some(i) => i,
            None => {
                let Some(i) = (0..n).find(|&i| !placed[i]) else {
                    break;
                };
                debug!("Breaking dependency cycle at {}", reversed[i]);
                i
            }
        };
        if placed[next] {
            continue;
        }
        placed[next] = true;
        order.push(reversed[next].clone());

        for &d in &dependents[next] {
            pending[d] = pending[d].saturating_sub(1);
            if pending[d] == 0 && !placed[d] {
                ready.insert(d);
            }
        }
    }

    order
}
