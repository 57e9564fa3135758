//! Core data model: vertices, arcs, regions, cycles, and the symbolic
//! values the L-safeness matrix is built from.

use serde::Serialize;
use std::collections::BTreeSet;

/// An opaque vertex identifier. Equality is by value; vertices carry no
/// attributes of their own.
pub type Vertex = String;

/// The condition label on an arc. `Epsilon` is the sentinel "unconditional"
/// value (written `0` in the input file).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Condition {
    Epsilon,
    Named(String),
}

impl Condition {
    pub fn parse(raw: &str) -> Self {
        if raw == "0" {
            Condition::Epsilon
        } else {
            Condition::Named(raw.to_string())
        }
    }

    pub fn is_epsilon(&self) -> bool {
        matches!(self, Condition::Epsilon)
    }

    /// The display label used in reports and r-id-free debug output.
    pub fn label(&self) -> &str {
        match self {
            Condition::Epsilon => "ε",
            Condition::Named(s) => s,
        }
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A directed edge with its reuse-limit and condition attributes.
///
/// `rid` is the stable identity used for equality and violation reporting;
/// `(source, target)` is a non-unique containment key (parallel arcs share
/// it). See §9 of the design notes: this replaces the reference's
/// `"src, dst"` string-as-identity encoding, which collides on parallel
/// edges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Arc {
    pub rid: String,
    pub source: Vertex,
    pub target: Vertex,
    pub l: u32,
    pub c: Condition,
    /// Derived by the eRU engine (C5); `0` until computed.
    pub eru: u32,
}

impl Arc {
    pub fn new(rid: impl Into<String>, source: impl Into<String>, target: impl Into<String>, l: u32, c: Condition) -> Self {
        Self {
            rid: rid.into(),
            source: source.into(),
            target: target.into(),
            l,
            c,
            eru: 0,
        }
    }

    pub fn key(&self) -> (&str, &str) {
        (&self.source, &self.target)
    }
}

/// An ordered sequence of arcs. Duplicates are permitted by `rid`; the
/// `(source, target)` pair need not be unique either (parallel arcs).
#[derive(Debug, Clone, Default)]
pub struct Region {
    pub name: String,
    pub arcs: Vec<Arc>,
}

impl Region {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arcs: Vec::new(),
        }
    }

    pub fn vertices(&self) -> BTreeSet<Vertex> {
        let mut v = BTreeSet::new();
        for arc in &self.arcs {
            v.insert(arc.source.clone());
            v.insert(arc.target.clone());
        }
        v
    }

    pub fn arc_by_rid(&self, rid: &str) -> Option<&Arc> {
        self.arcs.iter().find(|a| a.rid == rid)
    }

    pub fn next_rid(&self, prefix: &str) -> String {
        let mut max_seen: i64 = -1;
        for arc in &self.arcs {
            if let Some(rest) = arc.rid.strip_prefix(&format!("{prefix}-")) {
                if let Ok(n) = rest.parse::<i64>() {
                    max_seen = max_seen.max(n);
                }
            }
        }
        format!("{prefix}-{}", max_seen + 1)
    }
}

/// A closed walk in a region, with its critical arcs (arcs of minimum `l`
/// within the cycle; ties retained).
#[derive(Debug, Clone)]
pub struct Cycle {
    pub id: uuid::Uuid,
    pub arcs: Vec<Arc>,
    pub critical_arcs: Vec<Arc>,
}

impl Cycle {
    pub fn min_l(&self) -> u32 {
        self.arcs.iter().map(|a| a.l).min().unwrap_or(0)
    }

    pub fn contains_rid(&self, rid: &str) -> bool {
        self.arcs.iter().any(|a| a.rid == rid)
    }

    pub fn is_critical(&self, rid: &str) -> bool {
        self.critical_arcs.iter().any(|a| a.rid == rid)
    }
}

/// A symbolic safety value: `+a`, `-a`, or `0`. `ε` is folded into `Pos`/`Neg`
/// over `Condition::Epsilon` rather than kept as a fourth case — `a ∨ a = a`
/// already covers `ε ∨ ε = ε` once `Epsilon` is just another condition
/// value, and it sidesteps a bug class in the reference (see DESIGN.md:
/// `sign()`'s `elif 'ε' in element` check runs before its `-` check, so a
/// negative epsilon-conditioned symbol there is misread as positive).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SymVal {
    Zero,
    Pos(Condition),
    Neg(Condition),
}

impl SymVal {
    pub fn from_sign(sign: i32, c: &Condition) -> Self {
        match sign.signum() {
            1 => SymVal::Pos(c.clone()),
            -1 => SymVal::Neg(c.clone()),
            _ => SymVal::Zero,
        }
    }

    pub fn is_negative(&self) -> bool {
        matches!(self, SymVal::Neg(_))
    }

    /// The `literalOR` closed table: `a∨a=a`, `a∨0=a`, `0∨a=a`, `a∨-a=a`.
    /// The last rule always resolves to the positive variant — a violating
    /// (negative) contribution never survives an OR against its own
    /// positive counterpart, only against an *unrelated* negative.
    pub fn literal_or(self, other: SymVal) -> SymVal {
        if self == other {
            return self;
        }
        if other == SymVal::Zero {
            return self;
        }
        if self == SymVal::Zero {
            return other;
        }
        match (&self, &other) {
            (SymVal::Pos(a), SymVal::Neg(b)) if a == b => SymVal::Pos(a.clone()),
            (SymVal::Neg(a), SymVal::Pos(b)) if a == b => SymVal::Pos(b.clone()),
            _ => other,
        }
    }
}

/// The kind of per-arc L-safeness rule a [`Violation`] failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ViolationKind {
    JoinSafe,
    LoopSafe,
    SafeCA,
}

/// A tagged record of one L-safeness predicate failing for one arc.
#[derive(Debug, Clone, Serialize)]
pub struct Violation {
    pub kind: ViolationKind,
    pub arc_rid: String,
    pub arc: Arc,
    pub detail: String,
}

/// The per-arc analysis record built by the L-safeness matrix (C7).
///
/// `joinsafe` is the literal `literalOR(js·op, op)` symbolic field from
/// §4.7: by the `literalOR` table (`a∨-a = a`, resolved to the positive
/// variant — see [`SymVal::literal_or`]), this field is a tautology and is
/// never negative regardless of `js`. It is kept here only because the
/// spec defines it as a matrix column; `join_violation` carries the actual
/// (a)-(f) check outcome and is what `is_row_safe`/violation reporting use.
#[derive(Debug, Clone, Serialize)]
pub struct MatrixRow {
    pub arc: Arc,
    pub cv: SymVal,
    pub ocv: SymVal,
    pub loopsafe: SymVal,
    pub safe_ca: SymVal,
    pub joinsafe: SymVal,
    /// Real outcome of the (a)-(f) join-safety checks (C7), since
    /// `joinsafe` above can never itself go negative.
    pub join_violation: bool,
}

impl MatrixRow {
    pub fn is_row_safe(&self) -> bool {
        !self.loopsafe.is_negative() && !self.safe_ca.is_negative() && !self.join_violation
    }
}

/// One fired timestep: the set of arcs that fired together. Carries `rid`
/// alongside `(source, target)` so parallel arcs sharing an endpoint pair
/// stay distinguishable (§9: arc identity is `rid`, not `(src, dst)`).
pub type Timestep = Vec<(String, Vertex, Vertex)>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ArcStatus {
    Traversed,
    CheckedNotTraversed,
    Unreached,
}

/// A terminal vertex where one or more deadlocked profiles got stuck,
/// with the outgoing arcs that were checked but never traversed there and
/// why (§4.9.1).
#[derive(Debug, Clone, Serialize)]
pub struct DeadlockPoint {
    pub vertex: Vertex,
    pub unreached_arcs: Vec<DeadlockArc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeadlockArc {
    pub arc_rid: String,
    pub target: Vertex,
    pub reason: String,
}

/// One feasible execution enumerated by the activity extractor (C9).
#[derive(Debug, Clone, Serialize)]
pub struct ActivityProfile {
    pub timesteps: Vec<Timestep>,
    pub reached_sink: bool,
    pub deadlock_reason: Option<String>,
    /// Per-violating-arc status, keyed by rid.
    pub violating_arc_status: std::collections::BTreeMap<String, ArcStatus>,
}
