//! CSV rendering of the measurement table.
//!
//! The report is keyed by input: one row per input, one column per
//! `(pattern, measurement name)` pair. Cells that were skipped or never
//! computed render blank. Quoting is the minimal CSV convention: fields
//! containing a comma, quote, or newline are wrapped and inner quotes
//! doubled.

use std::io::{self, Write};

use crate::table::{Cell, MeasurementTable};

/// Writes `table` as CSV to `out`.
///
/// # Errors
///
/// Returns any I/O error from `out`.
pub fn write_csv<W: Write>(table: &MeasurementTable, out: &mut W) -> io::Result<()> {
    let mut header = vec!["input".to_owned()];
    for pattern in table.patterns() {
        for column in table.columns() {
            header.push(format!("{pattern}/{column}"));
        }
    }
    write_row(out, &header)?;

    for input in table.inputs() {
        let mut row = vec![String::from_utf8_lossy(input).into_owned()];
        for pattern in table.patterns() {
            for column in table.columns() {
                let rendered = match table.cell(pattern, input, column) {
                    Cell::Value(value) => value.to_string(),
                    Cell::Absent | Cell::NotComputed => String::new(),
                };
                row.push(rendered);
            }
        }
        write_row(out, &row)?;
    }
    Ok(())
}

fn write_row<W: Write>(out: &mut W, fields: &[String]) -> io::Result<()> {
    let escaped: Vec<String> = fields.iter().map(|field| escape_field(field)).collect();
    writeln!(out, "{}", escaped.join(","))
}

fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_owned()
    }
}
