//! Measurement backends behind one capability interface.
//!
//! A measurer wraps one matching backend and reports named measurement
//! columns per `(pattern, input)` pair. The set is closed: adding a new
//! backend is a new [`Measurer`] variant, not new call-site branching.

use driver_core::{DeviceSession, ProtocolError, ResultCode};
use thiserror::Error;
use tracing::warn;

use crate::compiler::{CompileError, CompileOptions, PatternCompiler};
use crate::oracle::{GoldenModel, OracleError};
use crate::table::MeasureValue;

/// Failure of one measurer's run over a pattern's batch.
#[derive(Debug, Error)]
pub enum MeasureError {
    /// Pattern compilation failed.
    #[error(transparent)]
    Compile(#[from] CompileError),
    /// A device protocol exchange failed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    /// The golden model rejected the pattern.
    #[error(transparent)]
    Oracle(#[from] OracleError),
}

/// Measurer driving the REX-7 through its device session.
///
/// Reports three columns per input: whether a match was found, the elapsed
/// clock cycles, and the estimated execution time in microseconds.
pub struct DeviceMeasurer {
    session: DeviceSession,
    compiler: Box<dyn PatternCompiler>,
    columns: Vec<String>,
}

impl DeviceMeasurer {
    /// Creates a device measurer owning `session` and `compiler`.
    #[must_use]
    pub fn new(session: DeviceSession, compiler: Box<dyn PatternCompiler>) -> Self {
        Self {
            session,
            compiler,
            columns: vec![
                "rex7_match[bool]".to_owned(),
                "rex7_exec[cc]".to_owned(),
                "rex7_time[micros]".to_owned(),
            ],
        }
    }

    fn run_pattern(
        &mut self,
        pattern: &str,
        inputs: &[Vec<u8>],
        options: &CompileOptions,
    ) -> Result<Vec<Vec<MeasureValue>>, MeasureError> {
        let program = self.compiler.compile(pattern, options)?;
        self.session.load_program(&program)?;
        self.session.enter_text_mode()?;
        let mut rows = Vec::with_capacity(inputs.len());
        for input in inputs {
            self.session.submit_input(input)?;
            let outcome = self.session.await_result()?;
            if outcome.code == ResultCode::DeviceError {
                warn!(pattern, input_len = input.len(), "device reported an execution error");
            }
            rows.push(vec![
                MeasureValue::Bool(outcome.matched()),
                MeasureValue::Cycles(outcome.elapsed_cycles),
                MeasureValue::Micros(outcome.elapsed_micros()),
            ]);
        }
        self.session.exit_text_mode()?;
        Ok(rows)
    }
}

/// Measurer consulting the golden-model reference matcher.
///
/// Reports a single column: whether the reference found a match.
pub struct ReferenceMeasurer {
    oracle: Box<dyn GoldenModel>,
    columns: Vec<String>,
}

impl ReferenceMeasurer {
    /// Creates a reference measurer owning `oracle`.
    #[must_use]
    pub fn new(oracle: Box<dyn GoldenModel>) -> Self {
        Self {
            oracle,
            columns: vec!["reference_match[bool]".to_owned()],
        }
    }

    fn run_pattern(
        &mut self,
        pattern: &str,
        inputs: &[Vec<u8>],
        options: &CompileOptions,
    ) -> Result<Vec<Vec<MeasureValue>>, MeasureError> {
        let mut rows = Vec::with_capacity(inputs.len());
        for input in inputs {
            let matched = self.oracle.evaluate(pattern, input, options)?;
            rows.push(vec![MeasureValue::Bool(matched)]);
        }
        Ok(rows)
    }
}

/// Closed set of measurement backends.
pub enum Measurer {
    /// Drives the REX-7 hardware (or its simulator) over a session.
    Device(DeviceMeasurer),
    /// Consults the golden-model reference matcher.
    Reference(ReferenceMeasurer),
}

impl Measurer {
    /// Short backend label used in progress reporting and errors.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Device(_) => "rex7-device",
            Self::Reference(_) => "reference",
        }
    }

    /// Measurement column names, fixed per backend.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        match self {
            Self::Device(measurer) => &measurer.columns,
            Self::Reference(measurer) => &measurer.columns,
        }
    }

    /// Measures every input against `pattern`, in input order.
    ///
    /// Returns one row per input, one value per column. The device backend
    /// loads the program once and keeps text mode open across the whole
    /// batch.
    ///
    /// # Errors
    ///
    /// Returns [`MeasureError`] when compilation, a protocol exchange, or
    /// the oracle fails; any failure aborts the whole pattern's batch.
    pub fn run_pattern(
        &mut self,
        pattern: &str,
        inputs: &[Vec<u8>],
        options: &CompileOptions,
    ) -> Result<Vec<Vec<MeasureValue>>, MeasureError> {
        match self {
            Self::Device(measurer) => measurer.run_pattern(pattern, inputs, options),
            Self::Reference(measurer) => measurer.run_pattern(pattern, inputs, options),
        }
    }

    /// Measures a single input against `pattern`.
    ///
    /// Equivalent to a one-input batch: the device backend runs the full
    /// session cycle (load, enter text mode, submit, await, exit) for this
    /// invocation alone.
    ///
    /// # Errors
    ///
    /// Returns [`MeasureError`] as [`Measurer::run_pattern`] does.
    pub fn execute_one(
        &mut self,
        pattern: &str,
        input: &[u8],
        options: &CompileOptions,
    ) -> Result<Vec<MeasureValue>, MeasureError> {
        let rows = self.run_pattern(pattern, &[input.to_vec()], options)?;
        Ok(rows.into_iter().next().unwrap_or_default())
    }
}
