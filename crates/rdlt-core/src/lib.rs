//! L-Safeness and Classical Soundness analysis for Robustness Diagrams
//! with Loop and Time Controls (RDLT).
//!
//! The pipeline: parse the input records, split the graph into a top-level
//! region and one reset-bound subsystem per center, summarize each
//! subsystem as abstract arcs, then evaluate the L-safeness matrix and
//! (when unsafe) run contraction and activity extraction to determine
//! classical soundness. See [`analysis::analyze`] for the entry point.

pub mod abstract_arc;
pub mod activity;
pub mod analysis;
pub mod config;
pub mod contraction;
pub mod cycles;
pub mod error;
pub mod eru;
pub mod graph;
pub mod join;
pub mod matrix;
pub mod model;
pub mod parser;
pub mod region;

pub use analysis::{analyze, AnalysisReport};
pub use config::RdltConfig;
pub use error::{RdltError, Result};
