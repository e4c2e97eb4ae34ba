//! Normalisation planning.
//!
//! A plan says, for one table, which columns pass through unchanged and which
//! foreign keys are swapped for the natural key of the table they reference.
//! Both the read path ([`crate::normalise::denormalise_prepare`]) and the write
//! path ([`crate::normalise::renormalise_prepare`]) are driven by it.

use crate::classify::{ColumnPartition, distinct_natural_key, partition_columns};
use crate::error::Result;
use crate::schema::{Column, Schema, Table};
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct NormalisationPlan<'a> {
    pub table: &'a Table,
    /// Pass-through columns, in output order. Includes `raw_foreign_keys`.
    pub simple: Vec<&'a Column>,
    pub denormalised: Vec<DenormalisedColumn<'a>>,
    /// Foreign keys whose target has no natural key, emitted as raw ids.
    pub raw_foreign_keys: Vec<&'a Column>,
}

/// A foreign key replaced by the natural key of the table it references.
#[derive(Debug, Clone)]
pub struct DenormalisedColumn<'a> {
    /// Local column holding the surrogate id.
    pub foreign_key: &'a Column,
    pub remote_table: &'a Table,
    /// Column the foreign key points at (normally the remote primary key).
    pub remote_key: &'a Column,
    /// Remote column projected in place of the id.
    pub natural_key: &'a Column,
}

impl DenormalisedColumn<'_> {
    /// The projection is labelled with the foreign key's own name.
    pub fn label(&self) -> &str {
        &self.foreign_key.name
    }
}

/// Plan how `table` is denormalised against the rest of `schema`.
pub fn plan_table<'a>(schema: &'a Schema, table: &'a Table) -> Result<NormalisationPlan<'a>> {
    let ColumnPartition {
        primary_keys,
        foreign_keys,
        other,
    } = partition_columns(table);

    // A table with its own natural key is identified by it; the surrogate id
    // is then left out of the output.
    let mut simple = match distinct_natural_key(table) {
        Some(_) => Vec::new(),
        None => primary_keys,
    };
    simple.extend(other);

    let mut denormalised = Vec::new();
    let mut raw_foreign_keys = Vec::new();

    for fk in foreign_keys {
        let Some(target) = fk.foreign_key() else {
            continue;
        };
        let remote_table = schema.require_table(&target.table)?;
        let remote_key = remote_table.require_column(&target.column)?;

        match distinct_natural_key(remote_table) {
            Some(natural_key) => {
                debug!(
                    table = %table.name,
                    column = %fk.name,
                    remote = %remote_table.name,
                    natural_key = %natural_key.name,
                    "denormalising foreign key"
                );
                denormalised.push(DenormalisedColumn {
                    foreign_key: fk,
                    remote_table,
                    remote_key,
                    natural_key,
                });
            }
            None => {
                debug!(
                    table = %table.name,
                    column = %fk.name,
                    remote = %remote_table.name,
                    "remote table has no natural key, keeping raw id"
                );
                simple.push(fk);
                raw_foreign_keys.push(fk);
            }
        }
    }

    Ok(NormalisationPlan {
        table,
        simple,
        denormalised,
        raw_foreign_keys,
    })
}

impl NormalisationPlan<'_> {
    /// Output column names: simple names, then tidied denormalised labels.
    pub fn output_names(&self, tidier: &dyn Fn(&str) -> String) -> Vec<String> {
        self.simple
            .iter()
            .map(|c| c.name.clone())
            .chain(self.denormalised.iter().map(|d| tidier(d.label())))
            .collect()
    }
}

impl fmt::Display for NormalisationPlan<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "table {}", self.table.name)?;
        for col in &self.simple {
            if self.raw_foreign_keys.iter().any(|r| r.name == col.name) {
                writeln!(f, "  {} (raw foreign key)", col.name)?;
            } else {
                writeln!(f, "  {}", col.name)?;
            }
        }
        for d in &self.denormalised {
            writeln!(
                f,
                "  {} -> {}.{} via {}",
                d.label(),
                d.remote_table.name,
                d.natural_key.name,
                d.remote_key.name
            )?;
        }
        Ok(())
    }
}

/// Default column-name tidier: drop a trailing `_id`.
pub fn tidy_column_name(name: &str) -> String {
    name.strip_suffix("_id").unwrap_or(name).to_string()
}
