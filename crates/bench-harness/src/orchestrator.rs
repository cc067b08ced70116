//! Batch orchestration across patterns, inputs, and measurers.
//!
//! The orchestrator walks the cross-product of measurers × patterns in a
//! deterministic order (measurers outer, patterns inner, inputs in their
//! original order inside each measurer) and assembles the sparse
//! [`MeasurementTable`]. One device-level failure discards the whole
//! pattern's batch for that measurer; there is no per-input retry.

use thiserror::Error;
use tracing::{error, info};

use crate::compiler::CompileOptions;
use crate::measure::{MeasureError, Measurer};
use crate::table::MeasurementTable;

/// Options governing one batch run.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Compiler options applied to every pattern.
    pub compile: CompileOptions,
    /// Record absent markers and continue when a pattern's batch fails,
    /// instead of stopping the run. Enabled by default.
    pub skip_failures: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            compile: CompileOptions::default(),
            skip_failures: true,
        }
    }
}

/// Failure that stops a strict-mode run.
#[derive(Debug, Error)]
pub enum OrchestrationError {
    /// A measurer failed a pattern's batch with skipping disabled.
    #[error("measurer {measurer} failed pattern {pattern:?}: {source}")]
    MeasurementFailed {
        /// Pattern whose batch failed.
        pattern: String,
        /// Label of the failing measurer.
        measurer: &'static str,
        /// Underlying measurement failure.
        #[source]
        source: MeasureError,
    },
}

/// Observer of batch progress, polled for interruption between pairs.
pub trait ProgressSink {
    /// Called after each `(pattern, measurer)` pair completes or is skipped,
    /// with the number of inputs processed for it. Observability only; it
    /// fires regardless of success or failure.
    fn pair_finished(&mut self, pattern: &str, measurer: &str, inputs_processed: usize);

    /// Polled between pairs. Returning `true` abandons the remaining
    /// cross-product while keeping everything recorded so far.
    fn interrupted(&self) -> bool {
        false
    }
}

/// Sink that ignores progress and never interrupts.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn pair_finished(&mut self, _pattern: &str, _measurer: &str, _inputs_processed: usize) {}
}

/// Runs the cross-product of `measurers` × `patterns` over `inputs`.
///
/// On success every `(pattern, input, column)` cell holds a value. When a
/// pattern's batch fails under `skip_failures`, its cells are recorded as
/// absent markers and the run continues with the next pattern. An
/// interruption reported by `progress` stops the walk between pairs and the
/// partial table is returned intact.
///
/// # Errors
///
/// Returns [`OrchestrationError::MeasurementFailed`] for the first failing
/// pattern when `skip_failures` is disabled.
pub fn run_batch(
    measurers: &mut [Measurer],
    patterns: &[String],
    inputs: &[Vec<u8>],
    options: &BatchOptions,
    progress: &mut dyn ProgressSink,
) -> Result<MeasurementTable, OrchestrationError> {
    let mut table = MeasurementTable::new();
    'pairs: for measurer in measurers.iter_mut() {
        for pattern in patterns {
            if progress.interrupted() {
                info!("batch interrupted, keeping partial results");
                break 'pairs;
            }
            match measurer.run_pattern(pattern, inputs, &options.compile) {
                Ok(rows) => {
                    for (input, row) in inputs.iter().zip(rows) {
                        for (column, value) in measurer.columns().iter().zip(row) {
                            table.record(pattern, input, column, Some(value));
                        }
                    }
                }
                Err(err) => {
                    if !options.skip_failures {
                        return Err(OrchestrationError::MeasurementFailed {
                            pattern: pattern.clone(),
                            measurer: measurer.label(),
                            source: err,
                        });
                    }
                    error!(
                        pattern = %pattern,
                        measurer = measurer.label(),
                        error = %err,
                        "pattern failed, recording absent results"
                    );
                    for input in inputs {
                        for column in measurer.columns() {
                            table.record(pattern, input, column, None);
                        }
                    }
                }
            }
            progress.pair_finished(pattern, measurer.label(), inputs.len());
        }
    }
    Ok(table)
}
