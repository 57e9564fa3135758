//! Parses the line-oriented RDLT input format (§6) into raw records ready
//! for region splitting (C3).

use crate::error::{RdltError, Result};
use crate::model::{Arc, Condition};
use tracing::warn;

#[derive(Debug, Clone, Default)]
pub struct ParsedInput {
    pub arcs: Vec<Arc>,
    pub centers: Vec<String>,
    pub in_bridges: Vec<(String, String)>,
    pub out_bridges: Vec<(String, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Arcs,
    Center,
    In,
    Out,
}

/// Parses the full input text. Malformed individual arc lines are logged
/// and skipped (§7: non-fatal warning); a misplaced or unrecognized section
/// header, or a non-integer `l`, is fatal.
pub fn parse_input(text: &str) -> Result<ParsedInput> {
    let mut section = Section::Arcs;
    let mut out = ParsedInput::default();
    let mut next_arc_index: u64 = 0;

    for (lineno, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        match line {
            "CENTER" => {
                section = Section::Center;
                continue;
            }
            "IN" => {
                section = Section::In;
                continue;
            }
            "OUT" => {
                section = Section::Out;
                continue;
            }
            _ => {}
        }

        match section {
            Section::Arcs => {
                let fields: Vec<&str> = line.split(',').map(str::trim).collect();
                if fields.len() != 4 {
                    warn!(line = lineno + 1, text = raw_line, "skipping malformed arc record");
                    continue;
                }
                let l: u32 = fields[3].parse().map_err(|_| RdltError::AttributeParseError {
                    line: lineno + 1,
                    detail: format!("non-integer reuse limit {:?}", fields[3]),
                })?;
                let rid = format!("R1-{next_arc_index}");
                next_arc_index += 1;
                out.arcs.push(Arc::new(rid, fields[0], fields[1], l, Condition::parse(fields[2])));
            }
            Section::Center => {
                for v in line.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                    out.centers.push(v.to_string());
                }
            }
            Section::In | Section::Out => {
                let fields: Vec<&str> = line.split(',').map(str::trim).collect();
                if fields.len() != 2 {
                    warn!(line = lineno + 1, text = raw_line, "skipping malformed bridge record");
                    continue;
                }
                let pair = (fields[0].to_string(), fields[1].to_string());
                if section == Section::In {
                    out.in_bridges.push(pair);
                } else {
                    out.out_bridges.push(pair);
                }
            }
        }
    }

    validate_bridges(&out)?;
    Ok(out)
}

fn validate_bridges(parsed: &ParsedInput) -> Result<()> {
    let vertices: std::collections::HashSet<&str> = parsed
        .arcs
        .iter()
        .flat_map(|a| [a.source.as_str(), a.target.as_str()])
        .collect();

    for (src, dst) in parsed.in_bridges.iter().chain(parsed.out_bridges.iter()) {
        if !vertices.contains(src.as_str()) {
            return Err(RdltError::UnknownVertexInBridge {
                rid: format!("{src},{dst}"),
                vertex: src.clone(),
            });
        }
        if !vertices.contains(dst.as_str()) {
            return Err(RdltError::UnknownVertexInBridge {
                rid: format!("{src},{dst}"),
                vertex: dst.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_acyclic() {
        let input = "x1, x2, a, 1\nx2, x3, b, 1\n";
        let parsed = parse_input(input).unwrap();
        assert_eq!(parsed.arcs.len(), 2);
        assert!(parsed.centers.is_empty());
        assert_eq!(parsed.arcs[0].l, 1);
        assert_eq!(parsed.arcs[0].c, Condition::Named("a".to_string()));
    }

    #[test]
    fn test_parse_epsilon_condition() {
        let parsed = parse_input("x1, x2, 0, 3\n").unwrap();
        assert_eq!(parsed.arcs[0].c, Condition::Epsilon);
    }

    #[test]
    fn test_parse_with_rbs_sections() {
        let input = "\
x1, x2, a, 1
x2, x3, 0, 2
CENTER
x2
IN
x1, x2
OUT
x2, x3
";
        let parsed = parse_input(input).unwrap();
        assert_eq!(parsed.centers, vec!["x2".to_string()]);
        assert_eq!(parsed.in_bridges, vec![("x1".to_string(), "x2".to_string())]);
        assert_eq!(parsed.out_bridges, vec![("x2".to_string(), "x3".to_string())]);
    }

    #[test]
    fn test_parse_rejects_non_integer_l() {
        let err = parse_input("x1, x2, a, foo\n").unwrap_err();
        assert!(matches!(err, RdltError::AttributeParseError { .. }));
    }

    #[test]
    fn test_parse_skips_malformed_line() {
        let parsed = parse_input("x1, x2, a\nx2, x3, b, 1\n").unwrap();
        assert_eq!(parsed.arcs.len(), 1);
    }

    #[test]
    fn test_parse_rejects_unknown_bridge_vertex() {
        let input = "x1, x2, a, 1\nCENTER\nx2\nIN\nx9, x2\n";
        let err = parse_input(input).unwrap_err();
        assert!(matches!(err, RdltError::UnknownVertexInBridge { .. }));
    }

    #[test]
    fn test_parse_blank_lines_ignored() {
        let parsed = parse_input("x1, x2, a, 1\n\n\nx2, x3, b, 1\n").unwrap();
        assert_eq!(parsed.arcs.len(), 2);
    }
}
