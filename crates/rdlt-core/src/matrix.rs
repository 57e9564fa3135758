//! Builds the per-arc L-safeness vector — cycle, out-cycle, loop-safeness,
//! critical-arc-safeness, and join-safeness — and evaluates the region's
//! safety verdict (C7).

use crate::graph::Graph;
use crate::join::{classify_join, is_join, JoinKind};
use crate::model::{Arc, Condition, Cycle, MatrixRow, Region, SymVal, Violation, ViolationKind};
use std::collections::{HashMap, HashSet};

pub struct MatrixResult {
    pub rows: Vec<MatrixRow>,
    pub violations: Vec<Violation>,
    pub l_safe: bool,
    pub path_enum_truncated: bool,
}

/// Builds one [`MatrixRow`] per arc and evaluates the three safety
/// predicates (JoinSafe, LoopSafe, SafeCA) across the working region.
pub fn build_matrix(region: &Region, cycles: &[Cycle]) -> MatrixResult {
    build_matrix_with_ceiling(region, cycles, usize::MAX, &HashSet::new())
}

/// As [`build_matrix`], but bounds the join-safety path enumeration (the
/// `graph.all_paths` calls below) to `path_enum_ceiling` simple paths per
/// call (§5, §11), and takes the rids of every in-/out-bridge arc so the
/// join classifier (C6) can enforce the bridge-classification gate (§4.6).
pub fn build_matrix_with_ceiling(
    region: &Region,
    cycles: &[Cycle],
    path_enum_ceiling: usize,
    bridge_rids: &HashSet<String>,
) -> MatrixResult {
    let graph = Graph::build_with_ceiling(region, path_enum_ceiling);
    let cv_by_rid = cycle_vectors(region, cycles);

    let mut partial: Vec<PartialRow> = Vec::with_capacity(region.arcs.len());
    for arc in &region.arcs {
        let cv = cv_by_rid.get(arc.rid.as_str()).copied().unwrap_or(0);
        let ocv = out_cycle_vector(&graph, arc, cv, &cv_by_rid);
        let loopsafe_sign = loop_safe_sign(arc, cv);
        let cycle_val = SymVal::from_sign(cv, &arc.c);
        let safe_ca = SymVal::from_sign(ocv, &arc.c).literal_or(cycle_val.clone());
        let loopsafe = SymVal::from_sign(loopsafe_sign, &arc.c);
        partial.push(PartialRow {
            arc: arc.clone(),
            cv: cycle_val,
            ocv: SymVal::from_sign(ocv, &arc.c),
            loopsafe,
            safe_ca,
        });
    }

    let unsafe_rids = evaluate_join_safety(&graph, region, &partial, bridge_rids);

    let mut rows = Vec::with_capacity(partial.len());
    let mut violations = Vec::new();
    for p in partial {
        let join_violation = unsafe_rids.contains_key(p.arc.rid.as_str());
        let js = if join_violation { -1 } else { 1 };
        // §4.7's literal `joinsafe` formula; always non-negative by
        // construction (see the doc comment on `MatrixRow::joinsafe`), kept
        // only as the spec-defined matrix column, not as a check result.
        let joinsafe = SymVal::from_sign(js, &p.arc.c).literal_or(SymVal::Pos(p.arc.c.clone()));

        if p.loopsafe.is_negative() {
            violations.push(Violation {
                kind: ViolationKind::LoopSafe,
                arc_rid: p.arc.rid.clone(),
                arc: p.arc.clone(),
                detail: "l(a) <= eRU(a) for an arc in a non-critical cycle".to_string(),
            });
        }
        if p.safe_ca.is_negative() {
            violations.push(Violation {
                kind: ViolationKind::SafeCA,
                arc_rid: p.arc.rid.clone(),
                arc: p.arc.clone(),
                detail: "critical arc with no safe sibling branch".to_string(),
            });
        }
        if join_violation {
            let detail = unsafe_rids.get(p.arc.rid.as_str()).cloned().unwrap_or_default();
            violations.push(Violation {
                kind: ViolationKind::JoinSafe,
                arc_rid: p.arc.rid.clone(),
                arc: p.arc.clone(),
                detail,
            });
        }

        rows.push(MatrixRow {
            arc: p.arc,
            cv: p.cv,
            ocv: p.ocv,
            loopsafe: p.loopsafe,
            safe_ca: p.safe_ca,
            joinsafe,
            join_violation,
        });
    }

    let l_safe = rows.iter().all(MatrixRow::is_row_safe);
    let path_enum_truncated = graph.path_enum_truncated();
    MatrixResult { rows, violations, l_safe, path_enum_truncated }
}

struct PartialRow {
    arc: Arc,
    cv: SymVal,
    ocv: SymVal,
    loopsafe: SymVal,
    safe_ca: SymVal,
}

/// `cv := -1` if the arc is critical in some cycle, `+1` if it's in a
/// non-critical cycle, `0` otherwise. A critical-in-one, non-critical-in-
/// another arc is conservatively `-1` (critical takes precedence).
fn cycle_vectors(region: &Region, cycles: &[Cycle]) -> HashMap<&str, i32> {
    let mut cv: HashMap<&str, i32> = HashMap::new();
    for arc in &region.arcs {
        cv.insert(arc.rid.as_str(), 0);
    }
    for cycle in cycles {
        for arc in &cycle.arcs {
            let is_critical = cycle.is_critical(&arc.rid);
            let entry = cv.entry(arc.rid.as_str()).or_insert(0);
            if is_critical {
                *entry = -1;
            } else if *entry != -1 {
                *entry = 1;
            }
        }
    }
    cv
}

fn out_cycle_vector(graph: &Graph<'_>, arc: &Arc, cv: i32, cv_by_rid: &HashMap<&str, i32>) -> i32 {
    if cv == -1 {
        let has_safe_sibling = graph
            .outgoing(&arc.source)
            .iter()
            .any(|sibling| sibling.rid != arc.rid && cv_by_rid.get(sibling.rid.as_str()).copied().unwrap_or(0) != -1);
        return if has_safe_sibling { 1 } else { -1 };
    }
    if cv != 0 {
        return 1;
    }
    0
}

fn loop_safe_sign(arc: &Arc, cv: i32) -> i32 {
    if cv == 1 {
        return if arc.l > arc.eru { 1 } else { -1 };
    }
    0
}

/// Evaluates the six join-safety checks ((a)-(f) in SPEC_FULL §4.7) and
/// returns, per unsafe arc rid, a human-readable violation tag.
fn evaluate_join_safety<'a>(
    graph: &Graph<'a>,
    region: &'a Region,
    partial: &[PartialRow],
    bridge_rids: &HashSet<String>,
) -> HashMap<&'a str, String> {
    let rows_by_rid: HashMap<&str, &PartialRow> = partial.iter().map(|p| (p.arc.rid.as_str(), p)).collect();
    let mut unsafe_rids: HashMap<&str, String> = HashMap::new();

    let vertices = region.vertices();
    let joins: Vec<String> = vertices.iter().filter(|v| is_join(graph, v, bridge_rids)).cloned().collect();
    let splits: Vec<String> = vertices
        .iter()
        .filter(|v| graph.outgoing(v).len() > 1)
        .cloned()
        .collect();

    for join in &joins {
        let Some(kind) = classify_join(graph, join, bridge_rids) else { continue };
        let tag = join_tag(kind);
        let incoming = graph.incoming_arcs(join);

        // (c) + (a)/(b): every incoming arc must lie on a valid split->join path.
        let reaching_splits: Vec<&String> = splits
            .iter()
            .filter(|s| !graph.all_paths(s, join).is_empty())
            .collect();
        let mut valid_path_arcs: HashSet<(&str, &str)> = HashSet::new();
        for split in &reaching_splits {
            for path in graph.all_paths(split, join) {
                for arc in &path {
                    valid_path_arcs.insert((arc.source.as_str(), arc.target.as_str()));
                }
            }
        }
        for arc in incoming {
            if !valid_path_arcs.contains(&(arc.source.as_str(), arc.target.as_str())) {
                unsafe_rids
                    .entry(arc.rid.as_str())
                    .or_insert_with(|| format!("{tag} at {join}: incoming arc has no source on a valid split-join path"));
            }
        }

        // (d) duplicate / inconsistent conditions, and (e) unequal l for AND-joins.
        match kind {
            JoinKind::And => {
                let mut seen_conditions: HashMap<&Condition, &str> = HashMap::new();
                for arc in incoming {
                    if seen_conditions.insert(&arc.c, arc.rid.as_str()).is_some() {
                        unsafe_rids
                            .entry(arc.rid.as_str())
                            .or_insert_with(|| format!("{tag} at {join}: duplicate condition {}", arc.c));
                    }
                }
                let l_values: HashSet<u32> = incoming.iter().map(|a| a.l).collect();
                if l_values.len() > 1 {
                    for arc in incoming {
                        unsafe_rids
                            .entry(arc.rid.as_str())
                            .or_insert_with(|| format!("{tag} at {join}: unequal l-values"));
                    }
                }
            }
            JoinKind::Mix => {
                let non_epsilon: HashSet<&Condition> = incoming.iter().map(|a| &a.c).filter(|c| !c.is_epsilon()).collect();
                if non_epsilon.len() > 1 {
                    for arc in incoming {
                        if !arc.c.is_epsilon() {
                            unsafe_rids
                                .entry(arc.rid.as_str())
                                .or_insert_with(|| format!("{tag} at {join}: inconsistent conditions among non-ε arcs"));
                        }
                    }
                }
            }
            JoinKind::Or => {
                let conditions: HashSet<&Condition> = incoming.iter().map(|a| &a.c).collect();
                if conditions.len() > 1 {
                    for arc in incoming {
                        unsafe_rids
                            .entry(arc.rid.as_str())
                            .or_insert_with(|| format!("{tag} at {join}: incoming arcs carry different conditions"));
                    }
                }
            }
        }

        // (f) loop-safety by join kind.
        for arc in incoming {
            let Some(row) = rows_by_rid.get(arc.rid.as_str()) else { continue };
            match kind {
                JoinKind::Or => {
                    if row.safe_ca.is_negative() {
                        unsafe_rids
                            .entry(arc.rid.as_str())
                            .or_insert_with(|| format!("{tag} at {join}: incoming arc fails critical-arc safety"));
                    }
                }
                JoinKind::And | JoinKind::Mix => {
                    if row.loopsafe.is_negative() {
                        unsafe_rids
                            .entry(arc.rid.as_str())
                            .or_insert_with(|| format!("{tag} at {join}: incoming arc fails loop safety"));
                    }
                }
            }
        }
    }

    // (a)/(b): every split outgoing arc must reach some join, and intermediate
    // vertices on a split->join path must not branch outside the path.
    for split in &splits {
        for join in &joins {
            let paths = graph.all_paths(split, join);
            if paths.is_empty() {
                continue;
            }
            let tag = classify_join(graph, join, bridge_rids).map(join_tag).unwrap_or("JOIN");
            for outgoing in graph.outgoing(split) {
                let reaches = paths.iter().any(|p| p.first().map(|a| a.rid == outgoing.rid).unwrap_or(false));
                if !reaches {
                    unsafe_rids.entry(outgoing.rid.as_str()).or_insert_with(|| {
                        format!("SPLIT at {split}: outgoing arc does not reach {tag} at {join}")
                    });
                }
            }
            for path in &paths {
                let path_vertices: HashSet<&str> = path
                    .iter()
                    .flat_map(|a| [a.source.as_str(), a.target.as_str()])
                    .collect();
                for arc in path.iter().take(path.len().saturating_sub(1)).skip(1) {
                    for sibling in graph.outgoing(&arc.target) {
                        if sibling.target != *join && !path_vertices.contains(sibling.target.as_str()) {
                            unsafe_rids.entry(sibling.rid.as_str()).or_insert_with(|| {
                                format!("SPLIT at {split}: intermediate vertex branches outside the path to {tag} at {join}")
                            });
                        }
                    }
                }
            }
        }
    }

    unsafe_rids
}

fn join_tag(kind: JoinKind) -> &'static str {
    match kind {
        JoinKind::And => "AND-JOIN",
        JoinKind::Or => "OR-JOIN",
        JoinKind::Mix => "MIX-JOIN",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cycles::detect_cycles;
    use crate::eru::assign_eru;

    fn region(arcs: &[(&str, &str, &str, u32)]) -> Region {
        let mut r = Region::new("R1");
        for (i, (s, t, c, l)) in arcs.iter().enumerate() {
            r.arcs.push(Arc::new(format!("R1-{i}"), *s, *t, *l, Condition::parse(c)));
        }
        r
    }

    fn analyze(mut r: Region) -> MatrixResult {
        let graph = Graph::build(&r);
        let vertices: Vec<String> = r.vertices().into_iter().collect();
        let cycles = detect_cycles(&graph, &vertices);
        assign_eru(&mut r.arcs, &cycles);
        build_matrix(&r, &cycles)
    }

    #[test]
    fn test_s1_simple_acyclic_is_l_safe() {
        let r = region(&[("x1", "x2", "a", 1), ("x2", "x3", "b", 1)]);
        let result = analyze(r);
        assert!(result.l_safe);
        assert!(result.violations.is_empty());
    }

    #[test]
    fn test_s2_critical_cycle_is_safe_ca_unsafe() {
        // Both cycle arcs have l=2=min, so both are critical (cv=-1); that
        // takes loop-safeness out of play (cv must be +1 for a LoopSafe
        // check to fire at all). x3->x2 (R1-2) is the only outgoing arc of
        // x3, so it has no safe sibling branch: ocv=-1, safe_ca negative.
        // x2->x3 (R1-1) has a safe sibling (x2->x4, not in the cycle), so
        // its safe_ca stays non-negative.
        let r = region(&[
            ("x1", "x2", "0", 3),
            ("x2", "x3", "0", 2),
            ("x3", "x2", "0", 2),
            ("x2", "x4", "0", 1),
        ]);
        let result = analyze(r);
        assert!(!result.l_safe);
        assert!(result
            .violations
            .iter()
            .any(|v| v.kind == ViolationKind::SafeCA && v.arc_rid == "R1-2"));
        assert!(!result
            .violations
            .iter()
            .any(|v| v.arc_rid == "R1-1"));
    }

    #[test]
    fn test_s5_and_join_unequal_l_is_unsafe() {
        // `s` must be a real split reaching `j` through both branches —
        // without it, check (c) flags a->j/b->j for "no source on a valid
        // split-join path" first and the (e) unequal-l message never gets
        // recorded (its `unsafe_rids` entry is already taken).
        let r = region(&[("s", "a", "0", 1), ("s", "b", "0", 1), ("a", "j", "a", 2), ("b", "j", "b", 3)]);
        let result = analyze(r);
        assert!(!result.l_safe);
        assert!(result
            .violations
            .iter()
            .any(|v| v.kind == ViolationKind::JoinSafe && v.detail.contains("unequal l-values")));
    }

    #[test]
    fn test_s6_mix_join_inconsistent_conditions() {
        // `s` must split to all three branches (s->j, s->a, s->b) so every
        // incoming arc of `j` sits on a valid split-join path; otherwise
        // check (c) preempts the (d) inconsistent-conditions message.
        let r = region(&[
            ("s", "j", "0", 1),
            ("s", "a", "0", 1),
            ("s", "b", "0", 1),
            ("a", "j", "a", 1),
            ("b", "j", "b", 1),
        ]);
        let result = analyze(r);
        assert!(!result.l_safe);
        assert!(result
            .violations
            .iter()
            .any(|v| v.kind == ViolationKind::JoinSafe && v.detail.contains("inconsistent conditions")));
    }
}
