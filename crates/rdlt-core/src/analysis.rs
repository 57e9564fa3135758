//! Orchestrates the full pipeline: parse → split → abstract → merge →
//! cycles/eRU → matrix → (if unsafe) contraction → activity extraction.

use crate::abstract_arc::{build_abstract_arcs, find_abstract_vertices};
use crate::activity::{analyze_deadlock_arcs, extract_activity_profiles, verify_classical_soundness, ExtractionConfig};
use crate::config::RdltConfig;
use crate::contraction::build_contraction_reports;
use crate::cycles::detect_cycles;
use crate::eru::assign_eru;
use crate::error::Result;
use crate::graph::Graph;
use crate::matrix::build_matrix_with_ceiling;
use crate::model::{ActivityProfile, ArcStatus, DeadlockArc, DeadlockPoint, MatrixRow, Region, Violation};
use crate::parser::parse_input;
use crate::region::split_regions;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use tracing::info;

#[derive(Debug, Serialize)]
pub struct AnalysisReport {
    pub l_safe: bool,
    pub matrix: Vec<MatrixRow>,
    pub violations: Vec<Violation>,
    pub contraction_reports: BTreeMap<String, ContractionReportSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub activity_profiles: Vec<crate::model::ActivityProfile>,
    pub classically_sound: bool,
    pub deadlock_diagnostics: BTreeMap<String, ArcStatus>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub deadlock_breakdown: Vec<DeadlockPoint>,
    pub path_enum_truncated: bool,
    pub summary: String,
}

#[derive(Debug, Serialize)]
pub struct ContractionReportSummary {
    pub contracted_path: Vec<String>,
    pub successful_count: usize,
    pub failed_count: usize,
    pub failures: Vec<String>,
}

/// Runs the complete analysis pipeline over raw RDLT input text.
pub fn analyze(input_text: &str, config: &RdltConfig) -> Result<AnalysisReport> {
    let parsed = parse_input(input_text)?;
    info!(arcs = parsed.arcs.len(), centers = parsed.centers.len(), "parsed input");

    let split = split_regions(&parsed);

    let mut working = split.r1.clone();
    let abstract_vertices = find_abstract_vertices(&parsed.centers, &split.in_bridges, &split.out_bridges);
    for (_center, r2) in &split.r2s {
        let abstract_arcs = build_abstract_arcs(r2, &split.in_bridges, &abstract_vertices, &split.r1, &config.analysis);
        info!(center = %_center, abstract_arcs = abstract_arcs.len(), "built abstract arcs for RBS");
        working.arcs.extend(abstract_arcs);
    }

    let graph = Graph::build_with_ceiling(&working, config.analysis.path_enum_ceiling);
    let vertices: Vec<String> = working.vertices().into_iter().collect();
    let cycles = detect_cycles(&graph, &vertices);
    assign_eru(&mut working.arcs, &cycles);

    let bridge_rids: HashSet<String> = rids_for_bridges(&working, &split.in_bridges)
        .into_iter()
        .chain(rids_for_bridges(&working, &split.out_bridges))
        .collect();

    let matrix_result = build_matrix_with_ceiling(&working, &cycles, config.analysis.path_enum_ceiling, &bridge_rids);
    info!(l_safe = matrix_result.l_safe, violations = matrix_result.violations.len(), "evaluated L-safeness matrix");

    let violating_rids: HashSet<String> = matrix_result.violations.iter().map(|v| v.arc_rid.clone()).collect();

    let mut contraction_reports = BTreeMap::new();
    let mut contraction_rids: HashSet<String> = HashSet::new();

    if !matrix_result.l_safe {
        let violation_rids: Vec<String> = violating_rids.iter().cloned().collect();
        let reports = build_contraction_reports(&working, &violation_rids);
        for report in &reports {
            contraction_rids.extend(report.contracted_path.iter().cloned());
            contraction_reports.insert(
                report.violation_rid.clone(),
                ContractionReportSummary {
                    contracted_path: report.contracted_path.clone(),
                    successful_count: report.successful.len(),
                    failed_count: report.failed.len(),
                    failures: report.failed.iter().map(|f| format!("{}: {}", f.arc_rid, f.failure_reason)).collect(),
                },
            );
        }
    }

    let out_bridge_rids: HashSet<String> = rids_for_bridges(&working, &split.out_bridges);

    let activity_profiles = extract_activity_profiles(
        &working,
        &contraction_rids,
        &out_bridge_rids,
        &bridge_rids,
        &violating_rids,
        &ExtractionConfig {
            max_depth: config.analysis.max_depth,
        },
    );
    let classically_sound = verify_classical_soundness(&working, &activity_profiles);
    let deadlock_diagnostics = analyze_deadlock_arcs(&activity_profiles, &violating_rids);
    let deadlock_breakdown =
        build_deadlock_breakdown(&working, &activity_profiles, &violating_rids, &contraction_reports);
    info!(classically_sound, profiles = activity_profiles.len(), "ran activity extraction");

    let truncated = graph.path_enum_truncated() || matrix_result.path_enum_truncated;
    let summary = summarize(matrix_result.l_safe, classically_sound, truncated);

    Ok(AnalysisReport {
        l_safe: matrix_result.l_safe,
        matrix: matrix_result.rows,
        violations: matrix_result.violations,
        contraction_reports,
        activity_profiles: if config.output.include_activity_profiles {
            activity_profiles.into_iter().take(config.output.max_profiles_in_report).collect()
        } else {
            Vec::new()
        },
        classically_sound,
        deadlock_diagnostics,
        deadlock_breakdown,
        path_enum_truncated: truncated,
        summary,
    })
}

fn summarize(l_safe: bool, classically_sound: bool, truncated: bool) -> String {
    let mut s = match (l_safe, classically_sound) {
        (true, true) => "RDLT is L-safe and classically sound.".to_string(),
        (true, false) => "RDLT is L-safe but not classically sound.".to_string(),
        (false, true) => "RDLT is not L-safe; classical soundness unaffected.".to_string(),
        (false, false) => "RDLT is neither L-safe nor classically sound.".to_string(),
    };
    if truncated {
        s.push_str(" Path enumeration hit its ceiling; results may be incomplete.");
    }
    s
}

/// Groups deadlocked profiles by terminal vertex (§4.9.1 supplement): for
/// each such vertex, reports the violating arcs that were checked but never
/// fired by any profile stuck there, with a best-guess reason drawn from
/// the `l`-limit, a conflicting condition commitment among its siblings, or
/// membership in a failed contraction path.
fn build_deadlock_breakdown(
    region: &Region,
    profiles: &[ActivityProfile],
    violating_rids: &HashSet<String>,
    contraction_reports: &BTreeMap<String, ContractionReportSummary>,
) -> Vec<DeadlockPoint> {
    let failed_rids: HashSet<&str> = contraction_reports
        .values()
        .flat_map(|r| r.failures.iter())
        .filter_map(|f| f.split(':').next())
        .collect();

    let mut traversed_at: BTreeMap<&str, HashSet<&str>> = BTreeMap::new();
    let mut checked_at: BTreeMap<&str, HashSet<&str>> = BTreeMap::new();

    for profile in profiles {
        if profile.reached_sink {
            continue;
        }
        let Some(vertex) = profile.timesteps.last().and_then(|step| step.last()).map(|(_, _, t)| t.as_str()) else {
            continue;
        };
        for (rid, status) in &profile.violating_arc_status {
            match status {
                ArcStatus::Traversed => {
                    traversed_at.entry(vertex).or_default().insert(rid.as_str());
                }
                ArcStatus::CheckedNotTraversed => {
                    checked_at.entry(vertex).or_default().insert(rid.as_str());
                }
                ArcStatus::Unreached => {}
            }
        }
    }

    let mut points = Vec::new();
    for (vertex, checked) in &checked_at {
        let traversed = traversed_at.get(*vertex).cloned().unwrap_or_default();
        let mut unreached_arcs = Vec::new();
        for rid in checked.difference(&traversed) {
            if !violating_rids.contains(*rid) {
                continue;
            }
            let Some(arc) = region.arc_by_rid(*rid) else { continue };
            let reason = if failed_rids.contains(rid) {
                "member of a failed contraction path".to_string()
            } else if region
                .arcs
                .iter()
                .any(|other| other.source == arc.source && other.rid != arc.rid && !other.c.is_epsilon() && other.c != arc.c)
            {
                format!("c-attribute conflict on condition {}", arc.c)
            } else {
                format!("l-limit ({}) exhausted", arc.l)
            };
            unreached_arcs.push(DeadlockArc {
                arc_rid: (*rid).to_string(),
                target: arc.target.clone(),
                reason,
            });
        }
        if !unreached_arcs.is_empty() {
            unreached_arcs.sort_by(|a, b| a.arc_rid.cmp(&b.arc_rid));
            points.push(DeadlockPoint {
                vertex: (*vertex).to_string(),
                unreached_arcs,
            });
        }
    }
    points.sort_by(|a, b| a.vertex.cmp(&b.vertex));
    points
}

fn rids_for_bridges(region: &Region, bridges: &[(String, String)]) -> HashSet<String> {
    region
        .arcs
        .iter()
        .filter(|a| bridges.iter().any(|(s, t)| *s == a.source && *t == a.target))
        .map(|a| a.rid.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_s1_simple_acyclic_is_safe_and_sound() {
        let input = "x1, x2, a, 1\nx2, x3, b, 1\n";
        let report = analyze(input, &RdltConfig::default()).unwrap();
        assert!(report.l_safe);
        assert!(report.violations.is_empty());
        assert!(report.classically_sound);
    }

    #[test]
    fn test_s2_non_critical_cycle_not_loop_safe() {
        let input = "\
x1, x2, 0, 3
x2, x3, 0, 2
x3, x2, 0, 2
x2, x4, 0, 1
";
        let report = analyze(input, &RdltConfig::default()).unwrap();
        assert!(!report.l_safe);
        assert!(!report.contraction_reports.is_empty());
    }

    #[test]
    fn test_s3_rbs_reduces_to_r1_only_analysis() {
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
        let report = analyze(input, &RdltConfig::default()).unwrap();
        // R2's internal arcs (x2<->x3) are summarized away; the matrix
        // should only ever see R1 plus the synthesized abstract arcs.
        assert!(!report.matrix.iter().any(|row| row.arc.source == "x3"));
    }
}
