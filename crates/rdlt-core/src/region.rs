//! Splits parsed input into a top-level region R1 and one reset-bound
//! subsystem R2 per center (C3).

use crate::model::{Arc, Region};
use crate::parser::ParsedInput;
use std::collections::{BTreeSet, HashSet};

pub struct SplitResult {
    pub r1: Region,
    pub r2s: Vec<(String, Region)>,
    pub in_bridges: Vec<(String, String)>,
    pub out_bridges: Vec<(String, String)>,
}

/// For each center, collects arcs incident to it, extends to the subgraph
/// reachable without crossing an in- or out-bridge, then re-filters the
/// full arc list down to arcs whose *both* endpoints lie in that vertex
/// set. Arcs claimed by no R2 form R1.
pub fn split_regions(parsed: &ParsedInput) -> SplitResult {
    let bridge_pairs: HashSet<(&str, &str)> = parsed
        .in_bridges
        .iter()
        .chain(parsed.out_bridges.iter())
        .map(|(s, t)| (s.as_str(), t.as_str()))
        .collect();

    let mut r2s = Vec::new();
    let mut claimed: HashSet<String> = HashSet::new();

    for center in &parsed.centers {
        let vertex_set = reachable_vertex_set(parsed, center, &bridge_pairs);
        let mut r2 = Region::new(format!("R2-{center}"));
        for arc in &parsed.arcs {
            if vertex_set.contains(arc.source.as_str()) && vertex_set.contains(arc.target.as_str()) {
                r2.arcs.push(arc.clone());
                claimed.insert(arc.rid.clone());
            }
        }
        r2s.push((center.clone(), r2));
    }

    let mut r1 = Region::new("R1");
    for arc in &parsed.arcs {
        if !claimed.contains(&arc.rid) {
            r1.arcs.push(arc.clone());
        }
    }

    SplitResult {
        r1,
        r2s,
        in_bridges: parsed.in_bridges.clone(),
        out_bridges: parsed.out_bridges.clone(),
    }
}

/// Vertices reachable from `center` (in both directions) without crossing
/// an arc that is itself an in- or out-bridge.
fn reachable_vertex_set(parsed: &ParsedInput, center: &str, bridge_pairs: &HashSet<(&str, &str)>) -> BTreeSet<String> {
    let mut visited: BTreeSet<String> = BTreeSet::new();
    let mut stack = vec![center.to_string()];
    visited.insert(center.to_string());

    while let Some(v) = stack.pop() {
        for arc in &parsed.arcs {
            let key = (arc.source.as_str(), arc.target.as_str());
            if bridge_pairs.contains(&key) {
                continue;
            }
            if arc.source == v && visited.insert(arc.target.clone()) {
                stack.push(arc.target.clone());
            }
            if arc.target == v && visited.insert(arc.source.clone()) {
                stack.push(arc.source.clone());
            }
        }
    }

    visited
}

impl SplitResult {
    pub fn r2_for(&self, center: &str) -> Option<&Region> {
        self.r2s.iter().find(|(c, _)| c == center).map(|(_, r)| r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Condition;
    use crate::parser::parse_input;

    fn arc(rid: &str, s: &str, t: &str, c: &str, l: u32) -> Arc {
        Arc::new(rid, s, t, l, Condition::parse(c))
    }

    #[test]
    fn test_split_with_no_centers_is_all_r1() {
        let parsed = parse_input("x1, x2, a, 1\nx2, x3, b, 1\n").unwrap();
        let split = split_regions(&parsed);
        assert_eq!(split.r1.arcs.len(), 2);
        assert!(split.r2s.is_empty());
    }

    #[test]
    fn test_split_scenario_s3_shape() {
        let input = "\
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
        let parsed = parse_input(input).unwrap();
        let split = split_regions(&parsed);
        let r2 = split.r2_for("x2").unwrap();
        let vertices = r2.vertices();
        assert!(vertices.contains("x2"));
        assert!(vertices.contains("x3"));
        assert!(!vertices.contains("x1"));
        assert_eq!(split.in_bridges.len(), 2);
        assert_eq!(split.out_bridges.len(), 2);
        let _ = arc("R1-0", "x1", "x2", "a", 1);
    }
}
