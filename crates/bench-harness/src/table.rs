//! Sparse measurement table assembled by the batch orchestrator.
//!
//! The table is the only externally visible artifact of a batch run. Keys
//! are `(pattern, input, column)` triples. A missing key means the cell was
//! never computed (for example because the run was interrupted), which is
//! distinct from a recorded absent marker left behind by a skipped pattern.

use std::collections::BTreeMap;
use std::fmt;

/// A single measured value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MeasureValue {
    /// Boolean measurement, e.g. whether a match was found.
    Bool(bool),
    /// Clock cycle count.
    Cycles(u64),
    /// Duration in microseconds.
    Micros(f64),
}

impl fmt::Display for MeasureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Cycles(value) => write!(f, "{value}"),
            Self::Micros(value) => write!(f, "{value}"),
        }
    }
}

/// Lookup result distinguishing the two kinds of emptiness.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell<'a> {
    /// The key was never computed.
    NotComputed,
    /// The key's pattern batch failed; an absent marker was recorded.
    Absent,
    /// A measured value.
    Value(&'a MeasureValue),
}

type Key = (String, Vec<u8>, String);

/// Sparse mapping from `(pattern, input, column)` to recorded values.
///
/// Records are never mutated after insertion; a duplicate key overwrites
/// (last write wins), which correct batch iteration never produces.
#[derive(Debug, Default)]
pub struct MeasurementTable {
    cells: BTreeMap<Key, Option<MeasureValue>>,
    patterns: Vec<String>,
    inputs: Vec<Vec<u8>>,
    columns: Vec<String>,
}

impl MeasurementTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a value, or `None` as the absent marker, under one key.
    pub fn record(
        &mut self,
        pattern: &str,
        input: &[u8],
        column: &str,
        value: Option<MeasureValue>,
    ) {
        if !self.patterns.iter().any(|p| p == pattern) {
            self.patterns.push(pattern.to_owned());
        }
        if !self.inputs.iter().any(|i| i == input) {
            self.inputs.push(input.to_vec());
        }
        if !self.columns.iter().any(|c| c == column) {
            self.columns.push(column.to_owned());
        }
        self.cells
            .insert((pattern.to_owned(), input.to_vec(), column.to_owned()), value);
    }

    /// Looks one key up.
    #[must_use]
    pub fn cell(&self, pattern: &str, input: &[u8], column: &str) -> Cell<'_> {
        match self
            .cells
            .get(&(pattern.to_owned(), input.to_vec(), column.to_owned()))
        {
            None => Cell::NotComputed,
            Some(None) => Cell::Absent,
            Some(Some(value)) => Cell::Value(value),
        }
    }

    /// Number of recorded cells, absent markers included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns `true` when nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Patterns in first-recorded order.
    #[must_use]
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Inputs in first-recorded order.
    #[must_use]
    pub fn inputs(&self) -> &[Vec<u8>] {
        &self.inputs
    }

    /// Columns in first-recorded order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}

#[cfg(test)]
mod tests {
    use super::{Cell, MeasureValue, MeasurementTable};

    #[test]
    fn absent_marker_differs_from_not_computed() {
        let mut table = MeasurementTable::new();
        table.record("a+", b"aaab", "match", None);

        assert_eq!(table.cell("a+", b"aaab", "match"), Cell::Absent);
        assert_eq!(table.cell("a+", b"aaab", "cycles"), Cell::NotComputed);
        assert_eq!(table.cell("b+", b"aaab", "match"), Cell::NotComputed);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn recorded_values_are_retrievable() {
        let mut table = MeasurementTable::new();
        table.record("a+", b"aaab", "match", Some(MeasureValue::Bool(true)));
        table.record("a+", b"aaab", "cycles", Some(MeasureValue::Cycles(120)));

        assert_eq!(
            table.cell("a+", b"aaab", "match"),
            Cell::Value(&MeasureValue::Bool(true))
        );
        assert_eq!(
            table.cell("a+", b"aaab", "cycles"),
            Cell::Value(&MeasureValue::Cycles(120))
        );
    }

    #[test]
    fn duplicate_keys_keep_the_last_write() {
        let mut table = MeasurementTable::new();
        table.record("a+", b"x", "match", Some(MeasureValue::Bool(false)));
        table.record("a+", b"x", "match", Some(MeasureValue::Bool(true)));

        assert_eq!(table.len(), 1);
        assert_eq!(
            table.cell("a+", b"x", "match"),
            Cell::Value(&MeasureValue::Bool(true))
        );
    }

    #[test]
    fn key_components_keep_first_recorded_order() {
        let mut table = MeasurementTable::new();
        table.record("b+", b"y", "cycles", None);
        table.record("a+", b"x", "match", None);
        table.record("b+", b"x", "match", None);

        assert_eq!(table.patterns(), ["b+", "a+"]);
        assert_eq!(table.inputs(), [b"y".to_vec(), b"x".to_vec()]);
        assert_eq!(table.columns(), ["cycles", "match"]);
    }

    #[test]
    fn value_rendering_is_plain() {
        assert_eq!(MeasureValue::Bool(true).to_string(), "true");
        assert_eq!(MeasureValue::Cycles(120).to_string(), "120");
        assert_eq!(MeasureValue::Micros(5.0).to_string(), "5");
    }
}
