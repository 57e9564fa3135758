//! Synthesizes shortcut arcs that summarize an R2 subsystem's externally
//! observable reachability, for inclusion in R1 (C4).

use crate::config::AnalysisConfig;
use crate::graph::Graph;
use crate::model::{Arc, Condition, Region};
use std::collections::{BTreeSet, HashSet};

/// `V* = centers ∪ {target(i) | i ∈ In} ∪ {source(o) | o ∈ Out}`.
pub fn find_abstract_vertices(
    centers: &[String],
    in_bridges: &[(String, String)],
    out_bridges: &[(String, String)],
) -> BTreeSet<String> {
    let mut v = BTreeSet::new();
    v.extend(centers.iter().cloned());
    v.extend(in_bridges.iter().map(|(_, t)| t.clone()));
    v.extend(out_bridges.iter().map(|(s, _)| s.clone()));
    v
}

/// Builds the abstract arcs for one center's R2, appending them to R1 with
/// fresh rids. Runs Steps A (shortcuts), B (self-loops), and C (attribute
/// derivation) in sequence.
pub fn build_abstract_arcs(
    r2: &Region,
    in_bridges: &[(String, String)],
    abstract_vertices: &BTreeSet<String>,
    r1: &Region,
    config: &AnalysisConfig,
) -> Vec<Arc> {
    let graph = Graph::build_with_ceiling(r2, config.path_enum_ceiling);
    let pairs = step_a(&graph, in_bridges, abstract_vertices);
    let pairs = step_b(&graph, in_bridges, pairs);
    step_c(&graph, in_bridges, r1, pairs, config)
}

/// Step A: for every in-bridge target `u` and every `v ∈ V*`, `u ≠ v`,
/// emit `u → v` once if a simple path exists.
fn step_a(graph: &Graph<'_>, in_bridges: &[(String, String)], abstract_vertices: &BTreeSet<String>) -> Vec<(String, String)> {
    let mut seen_pairs: HashSet<(String, String)> = HashSet::new();
    let mut out = Vec::new();

    for (_, in_vertex) in in_bridges {
        if !abstract_vertices.contains(in_vertex) {
            continue;
        }
        for out_vertex in abstract_vertices {
            if in_vertex == out_vertex {
                continue;
            }
            let pair = (in_vertex.clone(), out_vertex.clone());
            if !seen_pairs.insert(pair.clone()) {
                continue;
            }
            if !graph.all_paths(in_vertex, out_vertex).is_empty() {
                out.push(pair);
            }
        }
    }
    out
}

/// Step B: every in-bridge target always emits its self-loop abstract arc
/// `u → u` (an RBS is assumed to carry a reset cycle by construction).
fn step_b(_graph: &Graph<'_>, in_bridges: &[(String, String)], mut pairs: Vec<(String, String)>) -> Vec<(String, String)> {
    let mut processed: HashSet<String> = HashSet::new();
    for (_, in_vertex) in in_bridges {
        if !processed.insert(in_vertex.clone()) {
            continue;
        }
        let pair = (in_vertex.clone(), in_vertex.clone());
        if !pairs.contains(&pair) {
            pairs.push(pair);
        }
    }
    pairs
}

/// Step C: derives `eRU` and `l` for each abstract arc and assigns it a
/// fresh rid in R1's namespace.
fn step_c(
    graph: &Graph<'_>,
    in_bridges: &[(String, String)],
    r1: &Region,
    pairs: Vec<(String, String)>,
    config: &AnalysisConfig,
) -> Vec<Arc> {
    let mut out = Vec::new();
    let first_rid = r1.next_rid("R1");
    let mut next_index: i64 = first_rid
        .strip_prefix("R1-")
        .and_then(|n| n.parse().ok())
        .unwrap_or(0);
    for (start, end) in pairs {
        let eru = calculate_eru(graph, in_bridges, r1, &start, &end, config);
        let rid = format!("R1-{next_index}");
        next_index += 1;
        out.push(Arc::new(rid, start, end, eru + 1, Condition::Epsilon).with_eru(eru));
    }
    out
}

fn calculate_eru(
    graph: &Graph<'_>,
    in_bridges: &[(String, String)],
    r1: &Region,
    start: &str,
    end: &str,
    config: &AnalysisConfig,
) -> u32 {
    let mut eru: u32 = 0;
    for (in_source, in_vertex) in in_bridges {
        if in_vertex != start {
            continue;
        }
        let Some(bridge_arc) = r1.arcs.iter().find(|a| a.source == *in_source && a.target == *in_vertex) else {
            continue;
        };
        let reusability = path_reusability(graph, in_vertex, start, end, config);
        eru += bridge_arc.l * (reusability + 1);
    }
    eru
}

/// `reusability(in_vertex, start, end)`: existence-weighted (default) or
/// walk-count-weighted (Open Question #1, `self_loop_walk_counting`) for
/// the self-loop case; plain path-count for the general case.
fn path_reusability(graph: &Graph<'_>, in_vertex: &str, start: &str, end: &str, config: &AnalysisConfig) -> u32 {
    if start == end && start == in_vertex {
        if config.self_loop_walk_counting {
            return closed_walk_count(graph, in_vertex);
        }
        return if has_closed_walk(graph, in_vertex) { 1 } else { 0 };
    }

    let paths = graph.all_paths(start, end);
    paths.iter().filter(|p| p.iter().any(|a| a.source == in_vertex)).count() as u32
}

fn has_closed_walk(graph: &Graph<'_>, u: &str) -> bool {
    graph.outgoing(u).iter().any(|first| !graph.all_paths(&first.target, u).is_empty() || first.target == u)
}

/// Counts distinct simple closed walks through `u`, via a one-step lookahead
/// plus simple-path-back enumeration (`u -> w -> ... -> u`).
fn closed_walk_count(graph: &Graph<'_>, u: &str) -> u32 {
    let mut count = 0;
    for first in graph.outgoing(u) {
        if first.target == u {
            count += 1;
            continue;
        }
        count += graph.all_paths(&first.target, u).len() as u32;
    }
    count
}

impl Arc {
    fn with_eru(mut self, eru: u32) -> Self {
        self.eru = eru;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Condition;
    use crate::parser::parse_input;
    use crate::region::split_regions;

    const S3_INPUT: &str = "\
x1, x2, a, 1
x2, x3, 0, 2
x3, x2, 0, 3
x2, x4, 0, 4
x3, x4, 0, 1
x4, x5, 0, 6
x4, x6, b, 7
x5, x6, a, 7
x6, x2, a, 5
x6, x7, 0, 1
CENTER
x2
IN
x1, x2
x6, x2
OUT
x4, x5
x4, x6
";

    #[test]
    fn test_find_abstract_vertices() {
        let in_bridges = vec![("x1".to_string(), "x2".to_string())];
        let out_bridges = vec![("x4".to_string(), "x5".to_string())];
        let v = find_abstract_vertices(&["x2".to_string()], &in_bridges, &out_bridges);
        assert!(v.contains("x2"));
        assert!(v.contains("x5"));
    }

    #[test]
    fn test_s3_abstract_arcs_include_shortcut_and_self_loop() {
        let parsed = parse_input(S3_INPUT).unwrap();
        let split = split_regions(&parsed);
        let r2 = split.r2_for("x2").unwrap();
        let abstract_vertices = find_abstract_vertices(&parsed.centers, &split.in_bridges, &split.out_bridges);
        let config = AnalysisConfig::default();
        let arcs = build_abstract_arcs(r2, &split.in_bridges, &abstract_vertices, &split.r1, &config);

        assert!(arcs.iter().any(|a| a.source == "x2" && a.target == "x4"));
        assert!(arcs.iter().any(|a| a.source == "x2" && a.target == "x2"));
        for a in &arcs {
            assert_eq!(a.c, Condition::Epsilon);
            assert_eq!(a.l, a.eru + 1);
        }
    }
}
