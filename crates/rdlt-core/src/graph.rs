//! Adjacency-map graph primitives: neighbor lookup, simple-path
//! enumeration, and source/sink detection (C1).

use crate::error::{RdltError, Result};
use crate::model::{Arc, Region, Vertex};
use std::cell::Cell;
use std::collections::{HashMap, HashSet};

/// A read-only adjacency view over a [`Region`], preserving insertion order
/// for tie-breaking (§5: arc iteration order is observable).
pub struct Graph<'a> {
    region: &'a Region,
    adjacency: HashMap<&'a str, Vec<&'a Arc>>,
    incoming: HashMap<&'a str, Vec<&'a Arc>>,
    /// Per-call enumeration cap (§11's `analysis.path_enum_ceiling`);
    /// `usize::MAX` (the `build` default) means unbounded, used by tests
    /// and components that call `all_paths` over small subgraphs.
    path_enum_ceiling: usize,
    truncated: Cell<bool>,
}

impl<'a> Graph<'a> {
    pub fn build(region: &'a Region) -> Self {
        Self::build_with_ceiling(region, usize::MAX)
    }

    pub fn build_with_ceiling(region: &'a Region, path_enum_ceiling: usize) -> Self {
        let mut adjacency: HashMap<&str, Vec<&Arc>> = HashMap::new();
        let mut incoming: HashMap<&str, Vec<&Arc>> = HashMap::new();
        for arc in &region.arcs {
            adjacency.entry(arc.source.as_str()).or_default().push(arc);
            incoming.entry(arc.target.as_str()).or_default().push(arc);
        }
        Self {
            region,
            adjacency,
            incoming,
            path_enum_ceiling,
            truncated: Cell::new(false),
        }
    }

    /// Whether any `all_paths` call on this graph hit the enumeration
    /// ceiling and truncated its result set.
    pub fn path_enum_truncated(&self) -> bool {
        self.truncated.get()
    }

    /// Outgoing arcs from `v`, in input order, duplicates preserved.
    pub fn outgoing(&self, v: &str) -> &[&'a Arc] {
        self.adjacency.get(v).map_or(&[], Vec::as_slice)
    }

    pub fn incoming_arcs(&self, v: &str) -> &[&'a Arc] {
        self.incoming.get(v).map_or(&[], Vec::as_slice)
    }

    pub fn neighbors(&self, v: &str) -> Vec<&'a str> {
        self.outgoing(v).iter().map(|a| a.target.as_str()).collect()
    }

    /// Every simple path (no repeated vertices) from `src` to `dst`, in
    /// depth-first, adjacency-insertion-order tie-break.
    pub fn all_paths(&self, src: &str, dst: &str) -> Vec<Vec<&'a Arc>> {
        let mut results = Vec::new();
        let mut visited = HashSet::new();
        let mut stack: Vec<&'a Arc> = Vec::new();
        self.dfs_paths(src, dst, &mut visited, &mut stack, &mut results);
        results
    }

    fn dfs_paths(
        &self,
        current: &str,
        dst: &str,
        visited: &mut HashSet<&'a str>,
        stack: &mut Vec<&'a Arc>,
        results: &mut Vec<Vec<&'a Arc>>,
    ) {
        if results.len() >= self.path_enum_ceiling {
            self.truncated.set(true);
            return;
        }
        if current == dst && !stack.is_empty() {
            results.push(stack.clone());
            return;
        }
        for arc in self.outgoing(current) {
            if results.len() >= self.path_enum_ceiling {
                self.truncated.set(true);
                return;
            }
            if arc.target == dst {
                stack.push(arc);
                results.push(stack.clone());
                stack.pop();
                continue;
            }
            if visited.contains(arc.target.as_str()) {
                continue;
            }
            visited.insert(arc.target.as_str());
            stack.push(arc);
            self.dfs_paths(&arc.target, dst, visited, stack, results);
            stack.pop();
            visited.remove(arc.target.as_str());
        }
    }

    /// The unique vertex with no incoming arc, and the unique vertex with
    /// no outgoing arc.
    pub fn source_and_sink(&self) -> Result<(Vertex, Vertex)> {
        let vertices = self.region.vertices();
        let sources: Vec<&Vertex> = vertices
            .iter()
            .filter(|v| self.incoming_arcs(v).is_empty())
            .collect();
        let sinks: Vec<&Vertex> = vertices
            .iter()
            .filter(|v| self.outgoing(v).is_empty())
            .collect();

        if sources.len() != 1 || sinks.len() != 1 {
            return Err(RdltError::MultipleSourcesOrSinks);
        }
        Ok((sources[0].clone(), sinks[0].clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Condition;

    fn region(arcs: &[(&str, &str, &str, u32)]) -> Region {
        let mut r = Region::new("R1");
        for (i, (s, t, c, l)) in arcs.iter().enumerate() {
            r.arcs.push(Arc::new(format!("R1-{i}"), *s, *t, *l, Condition::parse(c)));
        }
        r
    }

    #[test]
    fn test_all_paths_simple_chain() {
        let r = region(&[("x1", "x2", "a", 1), ("x2", "x3", "b", 1)]);
        let g = Graph::build(&r);
        let paths = g.all_paths("x1", "x3");
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].len(), 2);
    }

    #[test]
    fn test_all_paths_no_repeats() {
        let r = region(&[
            ("x1", "x2", "0", 1),
            ("x2", "x3", "0", 1),
            ("x3", "x2", "0", 1),
            ("x2", "x4", "0", 1),
        ]);
        let g = Graph::build(&r);
        let paths = g.all_paths("x1", "x4");
        assert_eq!(paths.len(), 1);
    }

    #[test]
    fn test_path_enum_ceiling_truncates_and_flags() {
        // Three parallel two-hop routes x1 -> {a,b,c} -> x2: four simple
        // paths exist if we also count the direct arc, but a ceiling of 2
        // must cut the enumeration short and set the truncation flag.
        let r = region(&[
            ("x1", "a", "0", 1),
            ("a", "x2", "0", 1),
            ("x1", "b", "0", 1),
            ("b", "x2", "0", 1),
            ("x1", "c", "0", 1),
            ("c", "x2", "0", 1),
        ]);
        let g = Graph::build_with_ceiling(&r, 2);
        let paths = g.all_paths("x1", "x2");
        assert_eq!(paths.len(), 2);
        assert!(g.path_enum_truncated());
    }

    #[test]
    fn test_path_enum_ceiling_not_flagged_when_not_hit() {
        let r = region(&[("x1", "x2", "a", 1), ("x2", "x3", "b", 1)]);
        let g = Graph::build_with_ceiling(&r, 10);
        let _ = g.all_paths("x1", "x3");
        assert!(!g.path_enum_truncated());
    }

    #[test]
    fn test_source_and_sink() {
        let r = region(&[("x1", "x2", "a", 1), ("x2", "x3", "b", 1)]);
        let g = Graph::build(&r);
        let (src, sink) = g.source_and_sink().unwrap();
        assert_eq!(src, "x1");
        assert_eq!(sink, "x3");
    }

    #[test]
    fn test_source_and_sink_ambiguous() {
        let r = region(&[("x1", "x2", "a", 1), ("x3", "x4", "b", 1)]);
        let g = Graph::build(&r);
        assert!(g.source_and_sink().is_err());
    }
}
