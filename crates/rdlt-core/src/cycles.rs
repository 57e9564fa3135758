//! Simple-cycle detection by explicit-recursion-stack DFS, with
//! rotation-normalized deduplication (C2).

use crate::graph::Graph;
use crate::model::{Arc, Cycle};
use std::collections::HashSet;

struct CycleDetectionContext<'a> {
    graph: &'a Graph<'a>,
    recursion_stack: Vec<&'a Arc>,
    on_stack: HashSet<&'a str>,
    found: Vec<Vec<&'a Arc>>,
}

/// Finds every simple cycle in `graph`, deduplicated by rotation-normalized
/// arc-rid sequence, each tagged with a fresh UUID and its critical arcs
/// (the arcs of minimum `l` within the cycle).
pub fn detect_cycles<'a>(graph: &'a Graph<'a>, vertices: &[String]) -> Vec<Cycle> {
    let mut ctx = CycleDetectionContext {
        graph,
        recursion_stack: Vec::new(),
        on_stack: HashSet::new(),
        found: Vec::new(),
    };

    for start in vertices {
        ctx.on_stack.insert(start.as_str());
        find_cycles_from(&mut ctx, start, start);
        ctx.on_stack.remove(start.as_str());
        debug_assert!(ctx.recursion_stack.is_empty());
    }

    let deduped = deduplicate_cycles(ctx.found);
    deduped
        .into_iter()
        .map(|arcs| {
            let min_l = arcs.iter().map(|a| a.l).min().unwrap_or(0);
            let critical_arcs = arcs.iter().filter(|a| a.l == min_l).map(|a| (*a).clone()).collect();
            Cycle {
                id: uuid::Uuid::new_v4(),
                arcs: arcs.into_iter().cloned().collect(),
                critical_arcs,
            }
        })
        .collect()
}

fn find_cycles_from<'a>(ctx: &mut CycleDetectionContext<'a>, origin: &str, current: &str) {
    for arc in ctx.graph.outgoing(current) {
        if arc.target == origin {
            let mut cycle_arcs = ctx.recursion_stack.clone();
            cycle_arcs.push(arc);
            ctx.found.push(cycle_arcs);
            continue;
        }
        if ctx.on_stack.contains(arc.target.as_str()) {
            // Reappearance of a non-origin vertex already on the stack:
            // extract the slice from its first occurrence.
            if let Some(pos) = ctx
                .recursion_stack
                .iter()
                .position(|a| a.source.as_str() == arc.target.as_str())
            {
                let mut cycle_arcs: Vec<&'a Arc> = ctx.recursion_stack[pos..].to_vec();
                cycle_arcs.push(arc);
                ctx.found.push(cycle_arcs);
            }
            continue;
        }
        ctx.on_stack.insert(arc.target.as_str());
        ctx.recursion_stack.push(arc);
        find_cycles_from(ctx, origin, &arc.target);
        ctx.recursion_stack.pop();
        ctx.on_stack.remove(arc.target.as_str());
    }
}

/// Normalizes a cycle's arcs to start from its lexicographically smallest
/// rid, then dedups equal sequences.
fn deduplicate_cycles<'a>(found: Vec<Vec<&'a Arc>>) -> Vec<Vec<&'a Arc>> {
    let mut seen: HashSet<Vec<String>> = HashSet::new();
    let mut out = Vec::new();
    for cycle in found {
        if cycle.is_empty() {
            continue;
        }
        let min_idx = cycle
            .iter()
            .enumerate()
            .min_by_key(|(_, a)| a.rid.as_str())
            .map(|(i, _)| i)
            .unwrap_or(0);
        let mut rotated: Vec<&Arc> = cycle[min_idx..].to_vec();
        rotated.extend_from_slice(&cycle[..min_idx]);
        let key: Vec<String> = rotated.iter().map(|a| a.rid.clone()).collect();
        if seen.insert(key) {
            out.push(rotated);
        }
    }
    out
}

pub fn format_cycle(cycle: &Cycle) -> String {
    let mut parts: Vec<String> = cycle.arcs.iter().map(|a| a.source.clone()).collect();
    if let Some(last) = cycle.arcs.last() {
        parts.push(last.target.clone());
    }
    parts.join(" -> ")
}
