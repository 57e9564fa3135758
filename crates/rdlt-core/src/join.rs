//! Classifies join vertices as AND / OR / MIX from the `c` attributes of
//! their incoming arcs (C6).

use crate::graph::Graph;
use crate::model::Condition;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    And,
    Or,
    Mix,
}

/// `v` is a join iff it has at least two incoming arcs and all of them are
/// bridges, or all of them are non-bridges (§4.6). `bridge_rids` holds the
/// rids of every in-/out-bridge arc in the working region, so membership is
/// a plain set lookup rather than a rid-prefix convention.
pub fn is_join(graph: &Graph<'_>, v: &str, bridge_rids: &HashSet<String>) -> bool {
    let incoming = graph.incoming_arcs(v);
    if incoming.len() < 2 {
        return false;
    }
    let all_bridges = incoming.iter().all(|a| bridge_rids.contains(&a.rid));
    let all_non_bridges = incoming.iter().all(|a| !bridge_rids.contains(&a.rid));
    all_bridges || all_non_bridges
}

pub fn classify_join(graph: &Graph<'_>, v: &str, bridge_rids: &HashSet<String>) -> Option<JoinKind> {
    if !is_join(graph, v, bridge_rids) {
        return None;
    }
    let incoming = graph.incoming_arcs(v);
    let conditions: Vec<&Condition> = incoming.iter().map(|a| &a.c).collect();
    let all_epsilon = conditions.iter().all(|c| c.is_epsilon());
    let any_epsilon = conditions.iter().any(|c| c.is_epsilon());

    let non_epsilon: Vec<&Condition> = conditions.iter().filter(|c| !c.is_epsilon()).copied().collect();
    let distinct_non_epsilon: std::collections::HashSet<&Condition> = non_epsilon.iter().copied().collect();

    if all_epsilon {
        return Some(JoinKind::Or);
    }
    if !any_epsilon {
        if distinct_non_epsilon.len() == non_epsilon.len() {
            return Some(JoinKind::And);
        }
        if distinct_non_epsilon.len() == 1 {
            return Some(JoinKind::Or);
        }
        return Some(JoinKind::Mix);
    }
    Some(JoinKind::Mix)
}
