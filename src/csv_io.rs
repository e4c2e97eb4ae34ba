//! CSV in and out of [`Row`]s.
//!
//! Written values use their display form (NULL is empty, booleans are
//! `True`/`False`). Read values are always [`Value::Text`]; the row
//! transforms give them their types back.

use crate::error::{Error, Result};
use crate::value::{Row, Value};
use std::io::{Read, Write};
use tracing::debug;

/// Write a header line then one record per row.
pub fn write_csv<W: Write>(writer: W, headers: &[String], rows: &[Vec<Value>]) -> Result<()> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(headers)?;
    for row in rows {
        out.write_record(row.iter().map(|v| v.to_string()))?;
    }
    out.flush()?;
    debug!(rows = rows.len(), columns = headers.len(), "wrote csv");
    Ok(())
}

/// Read records keyed by the header line. Short records only carry the
/// columns they have; a record longer than the header is an error.
pub fn read_csv<R: Read>(reader: R) -> Result<Vec<Row>> {
    let mut input = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = input.headers()?.clone();
    let mut rows = Vec::new();
    for record in input.records() {
        let record = record?;
        if record.len() > headers.len() {
            return Err(Error::ExtraFields {
                line: record.position().map_or(0, |p| p.line()),
                found: record.len(),
                expected: headers.len(),
            });
        }
        let row: Row = headers
            .iter()
            .zip(record.iter())
            .map(|(name, field)| (name.to_string(), Value::Text(field.to_string())))
            .collect();
        rows.push(row);
    }
    debug!(rows = rows.len(), columns = headers.len(), "read csv");
    Ok(rows)
}
