//! Error types for the RDLT analysis pipeline (§7).

use thiserror::Error;

/// Errors surfaced while parsing, validating, or analyzing an RDLT graph.
#[derive(Debug, Error)]
pub enum RdltError {
    /// Arc line lacks four fields, or a section header is misplaced.
    #[error("malformed input at line {line}: {detail}")]
    InputMalformed { line: usize, detail: String },

    /// Non-integer `l` field on an arc record.
    #[error("invalid reuse limit at line {line}: {detail}")]
    AttributeParseError { line: usize, detail: String },

    /// An in/out-bridge record references a vertex absent from the arc list.
    #[error("bridge {rid:?} references unknown vertex {vertex:?}")]
    UnknownVertexInBridge { rid: String, vertex: String },

    /// C1 cannot identify a unique source or sink in the working region.
    #[error("region has no unique source/sink vertex")]
    MultipleSourcesOrSinks,

    /// C9 hit the depth cap on every enumerated path; soundness is reported
    /// as unknown-but-unsafe rather than silently assumed true.
    #[error("activity extraction incomplete: {0}")]
    AnalysisIncomplete(String),

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RdltError>;
