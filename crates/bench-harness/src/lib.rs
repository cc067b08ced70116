//! Benchmark harness for the REX-7 pattern coprocessor.
//!
//! Drives a pattern corpus across one or more measurement backends (the
//! device itself and a golden-model reference matcher), tolerates
//! per-pattern failure, and assembles a sparse measurement table for the
//! report writer.

use tracing_subscriber as _;

/// External pattern compiler collaborator.
pub mod compiler;
/// Pattern and input corpus loading.
pub mod corpus;
/// Measurement backends behind one capability interface.
pub mod measure;
/// Golden-model oracle collaborator.
pub mod oracle;
/// Batch orchestration across patterns, inputs, and measurers.
pub mod orchestrator;
/// CSV rendering of the measurement table.
pub mod report;
/// Sparse measurement table.
pub mod table;

#[cfg(test)]
use rstest as _;
#[cfg(test)]
use tempfile as _;
