//! Assigns each arc its effective Reusability Unit from the cycles it
//! belongs to (C5).

use crate::model::{Arc, Cycle};
use std::collections::HashMap;

/// For each arc in at least one cycle, `eRU(a) := min over containing
/// cycles of min_{b in cycle} l(b)`. Arcs in no cycle get `eRU := 0`.
/// Idempotent: calling this twice with the same cycle set is a no-op on
/// arcs already carrying the correct value.
pub fn assign_eru(arcs: &mut [Arc], cycles: &[Cycle]) {
    let mut best: HashMap<&str, u32> = HashMap::new();
    for cycle in cycles {
        let cycle_min_l = cycle.min_l();
        for arc in &cycle.arcs {
            best.entry(arc.rid.as_str())
                .and_modify(|v| *v = (*v).min(cycle_min_l))
                .or_insert(cycle_min_l);
        }
    }

    for arc in arcs.iter_mut() {
        arc.eru = best.get(arc.rid.as_str()).copied().unwrap_or(0);
    }
}
