//! Column classification and natural-key resolution.

use crate::schema::{Column, Table};

/// A table's columns split three ways, each in declaration order.
#[derive(Debug, Clone, Default)]
pub struct ColumnPartition<'a> {
    pub primary_keys: Vec<&'a Column>,
    pub foreign_keys: Vec<&'a Column>,
    pub other: Vec<&'a Column>,
}

/// Partition columns into primary keys, foreign keys and everything else.
///
/// A column that references another table counts as a foreign key even when
/// it is also part of the primary key.
pub fn partition_columns(table: &Table) -> ColumnPartition<'_> {
    let mut partition = ColumnPartition::default();
    for col in &table.columns {
        if col.is_foreign_key() {
            partition.foreign_keys.push(col);
        } else if col.primary_key {
            partition.primary_keys.push(col);
        } else {
            partition.other.push(col);
        }
    }
    partition
}

/// The natural key of a table: its single unique non-key column, or failing
/// that its primary-key columns.
///
/// Two or more unique columns do not make a composite natural key (each is
/// unique alone, not as a combination), so the primary key is used then too.
pub fn find_natural_key(table: &Table) -> Vec<&Column> {
    let ColumnPartition {
        primary_keys, other, ..
    } = partition_columns(table);
    let mut candidates = other.into_iter().filter(|c| c.unique);
    match (candidates.next(), candidates.next()) {
        (Some(natural), None) => vec![natural],
        _ => primary_keys,
    }
}

/// True when the natural key is just the surrogate primary key.
pub fn is_surrogate_key(natural_key: &[&Column]) -> bool {
    natural_key.iter().any(|c| c.primary_key)
}

/// The single distinct natural-key column of `table`, if it has one.
pub fn distinct_natural_key(table: &Table) -> Option<&Column> {
    let keys = find_natural_key(table);
    match keys.as_slice() {
        [natural] if !natural.primary_key => Some(*natural),
        _ => None,
    }
}
