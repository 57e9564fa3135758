//! Depth-bounded enumeration of timestep-structured activity profiles and
//! the classical-soundness check (C9).

use crate::graph::Graph;
use crate::model::{ActivityProfile, Arc, ArcStatus, Region, Timestep, Vertex};
use std::collections::{BTreeMap, HashMap, HashSet};

pub struct ExtractionConfig {
    pub max_depth: usize,
}

struct ExtractionContext<'a> {
    graph: &'a Graph<'a>,
    region: &'a Region,
    sink: &'a str,
    source: &'a str,
    paths_to_sink: HashSet<&'a str>,
    contraction_rids: &'a HashSet<String>,
    out_bridge_rids: &'a HashSet<String>,
    bridge_rids: &'a HashSet<String>,
    max_depth: usize,
    visited_states: HashSet<String>,
    profiles: Vec<ActivityProfile>,
    violating_rids: &'a HashSet<String>,
}

/// Enumerates all feasible timestep-indexed firing sequences from source to
/// sink, depth-bounded, memoized on `(vertex, traversed-counts,
/// target-condition-commitments)`.
pub fn extract_activity_profiles(
    region: &Region,
    contraction_rids: &HashSet<String>,
    out_bridge_rids: &HashSet<String>,
    bridge_rids: &HashSet<String>,
    violating_rids: &HashSet<String>,
    config: &ExtractionConfig,
) -> Vec<ActivityProfile> {
    let graph = Graph::build(region);
    let Ok((source, sink)) = graph.source_and_sink() else {
        return Vec::new();
    };
    let paths_to_sink = reachable_backward(&graph, &sink);

    let mut ctx = ExtractionContext {
        graph: &graph,
        region,
        sink: &sink,
        source: &source,
        paths_to_sink,
        contraction_rids,
        out_bridge_rids,
        bridge_rids,
        max_depth: config.max_depth,
        visited_states: HashSet::new(),
        profiles: Vec::new(),
        violating_rids,
    };

    record_first_step_if_deadlocks_immediately(&mut ctx);
    dfs(&mut ctx, &source, 0, Vec::new(), HashMap::new(), HashMap::new());
    ctx.profiles
}

fn reachable_backward<'a>(graph: &Graph<'a>, sink: &'a str) -> HashSet<&'a str> {
    let mut seen = HashSet::from([sink]);
    let mut stack = vec![sink];
    while let Some(v) = stack.pop() {
        for arc in graph.incoming_arcs(v) {
            if seen.insert(arc.source.as_str()) {
                stack.push(arc.source.as_str());
            }
        }
    }
    seen
}

/// §4.9: at depth 0, the first contraction-path arc from the source is
/// always recorded as a timestep-1 profile, even if the search immediately
/// deadlocks past it — this guarantees a real deadlock still surfaces.
fn record_first_step_if_deadlocks_immediately(ctx: &mut ExtractionContext<'_>) {
    let Some(first) = ctx
        .region
        .arcs
        .iter()
        .find(|a| a.source == ctx.source && ctx.contraction_rids.contains(&a.rid))
    else {
        return;
    };
    let traversed = HashMap::from([(first.rid.clone(), 1u32)]);
    ctx.profiles.push(ActivityProfile {
        timesteps: vec![vec![(first.rid.clone(), first.source.clone(), first.target.clone())]],
        reached_sink: first.target == ctx.sink,
        deadlock_reason: if first.target == ctx.sink { None } else { Some("seed step".to_string()) },
        violating_arc_status: arc_status(ctx, &traversed),
    });
}

fn state_signature(current: &str, traversed: &HashMap<String, u32>, commitments: &HashMap<Vertex, String>) -> String {
    let mut t: Vec<(&String, &u32)> = traversed.iter().collect();
    t.sort_by_key(|(k, _)| k.as_str());
    let mut c: Vec<(&Vertex, &String)> = commitments.iter().collect();
    c.sort_by_key(|(k, _)| k.as_str());
    format!("{current}|{t:?}|{c:?}")
}

fn dfs(
    ctx: &mut ExtractionContext<'_>,
    current: &str,
    depth: usize,
    timesteps: Vec<Timestep>,
    traversed: HashMap<String, u32>,
    commitments: HashMap<Vertex, String>,
) {
    let sig = state_signature(current, &traversed, &commitments);
    if !ctx.visited_states.insert(sig) {
        return;
    }

    if depth > ctx.max_depth {
        ctx.profiles.push(ActivityProfile {
            timesteps,
            reached_sink: false,
            deadlock_reason: Some("depth cap".to_string()),
            violating_arc_status: arc_status(ctx, &traversed),
        });
        return;
    }

    if current == ctx.sink {
        ctx.profiles.push(ActivityProfile {
            timesteps,
            reached_sink: true,
            deadlock_reason: None,
            violating_arc_status: arc_status(ctx, &traversed),
        });
        return;
    }

    let candidates = candidate_arcs(ctx, current, &traversed, &commitments);
    if candidates.is_empty() {
        ctx.profiles.push(ActivityProfile {
            timesteps,
            reached_sink: false,
            deadlock_reason: Some("no valid outgoing arcs".to_string()),
            violating_arc_status: arc_status(ctx, &traversed),
        });
        return;
    }

    for arc in candidates {
        let mut new_traversed = traversed.clone();
        *new_traversed.entry(arc.rid.clone()).or_insert(0) += 1;

        let mut new_commitments = commitments.clone();
        if !arc.c.is_epsilon() {
            new_commitments.insert(arc.target.clone(), arc.c.label().to_string());
        }

        if ctx.out_bridge_rids.contains(&arc.rid) {
            new_traversed.retain(|rid, _| ctx.bridge_rids.contains(rid));
            new_commitments.clear();
        }

        let mut new_timesteps = timesteps.clone();
        new_timesteps.push(vec![(arc.rid.clone(), arc.source.clone(), arc.target.clone())]);

        dfs(ctx, &arc.target, depth + 1, new_timesteps, new_traversed, new_commitments);
    }
}

fn candidate_arcs<'a>(
    ctx: &ExtractionContext<'a>,
    current: &str,
    traversed: &HashMap<String, u32>,
    commitments: &HashMap<Vertex, String>,
) -> Vec<&'a Arc> {
    let mut candidates: Vec<&Arc> = ctx
        .graph
        .outgoing(current)
        .iter()
        .filter(|a| ctx.paths_to_sink.contains(a.target.as_str()))
        .filter(|a| traversed.get(&a.rid).copied().unwrap_or(0) < a.l)
        .filter(|a| match commitments.get(&a.target) {
            Some(committed) => a.c.is_epsilon() || committed == a.c.label(),
            None => true,
        })
        .copied()
        .collect();

    candidates.sort_by_key(|a| (!ctx.contraction_rids.contains(&a.rid), a.rid.clone()));
    candidates
}

fn arc_status(ctx: &ExtractionContext<'_>, traversed: &HashMap<String, u32>) -> BTreeMap<String, ArcStatus> {
    let mut out = BTreeMap::new();
    for rid in ctx.violating_rids {
        let status = if traversed.get(rid).copied().unwrap_or(0) > 0 {
            ArcStatus::Traversed
        } else if ctx.region.arcs.iter().any(|a| &a.rid == rid) {
            ArcStatus::CheckedNotTraversed
        } else {
            ArcStatus::Unreached
        };
        out.insert(rid.clone(), status);
    }
    out
}

/// Proper termination + liveness, per §4.9.
pub fn verify_classical_soundness(region: &Region, profiles: &[ActivityProfile]) -> bool {
    if profiles.is_empty() {
        return false;
    }
    let proper_termination = profiles.iter().all(|p| p.reached_sink);

    let mut fired: HashSet<&str> = HashSet::new();
    for profile in profiles {
        for step in &profile.timesteps {
            for (rid, _s, _t) in step {
                fired.insert(rid.as_str());
            }
        }
    }
    let liveness = region.arcs.iter().all(|a| fired.contains(a.rid.as_str()));

    proper_termination && liveness
}

/// Diagnostic pass (§4.9.1 supplement): for each violating arc, reports
/// whether any enumerated profile traversed it and, if not, why it is
/// unreachable under the current contraction/commitment constraints.
pub fn analyze_deadlock_arcs(profiles: &[ActivityProfile], violating_rids: &HashSet<String>) -> BTreeMap<String, ArcStatus> {
    let mut out = BTreeMap::new();
    for rid in violating_rids {
        let traversed_anywhere = profiles
            .iter()
            .any(|p| p.violating_arc_status.get(rid) == Some(&ArcStatus::Traversed));
        out.insert(
            rid.clone(),
            if traversed_anywhere {
                ArcStatus::Traversed
            } else {
                ArcStatus::CheckedNotTraversed
            },
        );
    }
    out
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
    fn test_s1_single_profile_reaches_sink() {
        let r = region(&[("x1", "x2", "a", 1), ("x2", "x3", "b", 1)]);
        let profiles = extract_activity_profiles(
            &r,
            &HashSet::new(),
            &HashSet::new(),
            &HashSet::new(),
            &HashSet::new(),
            &ExtractionConfig { max_depth: 15 },
        );
        assert!(profiles.iter().any(|p| p.reached_sink));
        assert!(verify_classical_soundness(&r, &profiles));
    }

    #[test]
    fn test_liveness_distinguishes_parallel_arcs_sharing_endpoints() {
        // Two parallel x1->x2 arcs (distinct rid, same (source, target));
        // each is fired in a different enumerated profile. Liveness must
        // track both by rid, not collapse them to whichever one a plain
        // (source, target) lookup happens to find first.
        let r = region(&[("x1", "x2", "a", 1), ("x1", "x2", "b", 1), ("x2", "x3", "0", 1)]);
        let profiles = extract_activity_profiles(
            &r,
            &HashSet::new(),
            &HashSet::new(),
            &HashSet::new(),
            &HashSet::new(),
            &ExtractionConfig { max_depth: 15 },
        );
        assert!(profiles.iter().any(|p| p.timesteps.first().map(|s| s[0].0 == "R1-0").unwrap_or(false)));
        assert!(profiles.iter().any(|p| p.timesteps.first().map(|s| s[0].0 == "R1-1").unwrap_or(false)));
        assert!(verify_classical_soundness(&r, &profiles));
    }

    #[test]
    fn test_l_limit_forces_eventual_deadlock_alongside_a_sink_profile() {
        let r = region(&[
            ("x1", "x2", "0", 1),
            ("x2", "x3", "0", 2),
            ("x3", "x2", "0", 2),
            ("x3", "x4", "0", 1),
        ]);
        let profiles = extract_activity_profiles(
            &r,
            &HashSet::new(),
            &HashSet::new(),
            &HashSet::new(),
            &HashSet::new(),
            &ExtractionConfig { max_depth: 15 },
        );
        assert!(!profiles.is_empty());
        assert!(profiles.iter().any(|p| p.reached_sink));
    }
}
