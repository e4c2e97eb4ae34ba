//! Per-row transforms for text-sourced rows.
//!
//! The usual import pipeline is
//! `row_maker.then(empty_deleter(table)).then(type_coercer(table))`.

use crate::datetime::{parse_date, parse_datetime};
use crate::error::{Error, Result};
use crate::schema::{Table, ValueType};
use crate::value::{Row, Value};
use std::collections::HashMap;

/// A row-in, row-out step.
pub trait RowTransform {
    fn transform(&self, row: Row) -> Result<Row>;

    /// Run `self`, then `next` on its output.
    fn then<T: RowTransform>(self, next: T) -> Chain<Self, T>
    where
        Self: Sized,
    {
        Chain {
            first: self,
            second: next,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Chain<A, B> {
    first: A,
    second: B,
}

impl<A: RowTransform, B: RowTransform> RowTransform for Chain<A, B> {
    fn transform(&self, row: Row) -> Result<Row> {
        self.second.transform(self.first.transform(row)?)
    }
}

impl<T: RowTransform + ?Sized> RowTransform for &T {
    fn transform(&self, row: Row) -> Result<Row> {
        (**self).transform(row)
    }
}

/// Drops empty strings in nullable columns, so that they insert as NULL.
#[derive(Debug, Clone)]
pub struct EmptyDeleter {
    nullable: Vec<String>,
}

pub fn empty_deleter(table: &Table) -> EmptyDeleter {
    EmptyDeleter {
        nullable: table
            .columns
            .iter()
            .filter(|c| c.nullable)
            .map(|c| c.name.clone())
            .collect(),
    }
}

impl RowTransform for EmptyDeleter {
    /// Empty strings in NOT NULL columns are left for the database to reject.
    fn transform(&self, mut row: Row) -> Result<Row> {
        for name in &self.nullable {
            if matches!(row.get(name), Some(Value::Text(s)) if s.is_empty()) {
                row.shift_remove(name);
            }
        }
        Ok(row)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Coercion {
    Boolean,
    Date,
    DateTime,
    Keep,
}

/// Converts text values to the column's declared type.
#[derive(Debug, Clone)]
pub struct TypeCoercer {
    table: String,
    coercions: HashMap<String, Coercion>,
}

pub fn type_coercer(table: &Table) -> TypeCoercer {
    let coercions = table
        .columns
        .iter()
        .map(|c| {
            let coercion = match c.value_type {
                ValueType::Boolean => Coercion::Boolean,
                ValueType::Date => Coercion::Date,
                ValueType::DateTime => Coercion::DateTime,
                _ => Coercion::Keep,
            };
            (c.name.clone(), coercion)
        })
        .collect();
    TypeCoercer {
        table: table.name.clone(),
        coercions,
    }
}

impl RowTransform for TypeCoercer {
    /// Only `Value::Text` is touched, so already-typed values pass through
    /// and the coercer can run more than once.
    ///
    /// Booleans are `True` exactly or false. Numbers are not converted; the
    /// storage layer does its own coercion.
    fn transform(&self, mut row: Row) -> Result<Row> {
        for (name, value) in row.iter_mut() {
            let Value::Text(text) = value else {
                continue;
            };
            let coercion = self.coercions.get(name).ok_or_else(|| Error::UnknownColumn {
                table: self.table.clone(),
                column: name.clone(),
            })?;
            *value = match coercion {
                Coercion::Boolean => Value::Boolean(text.as_str() == "True"),
                Coercion::Date => Value::Date(parse_date(text)?),
                Coercion::DateTime => Value::DateTime(parse_datetime(text)?),
                Coercion::Keep => continue,
            };
        }
        Ok(row)
    }
}
