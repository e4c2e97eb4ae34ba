//! Projection queries with equality joins.
//!
//! A [`SelectQuery`] is plain data; a [`Session`](crate::session::Session)
//! decides how to run it. [`SelectQuery::to_sql`] renders it for SQL back ends.

use crate::schema::ValueType;
use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinKind {
    /// Rows whose foreign key matches nothing (including NULL) are dropped.
    #[default]
    Inner,
    /// Every base row is kept; unmatched projections come back NULL.
    LeftOuter,
}

/// A column qualified by the table name or join alias it is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    pub source: String,
    pub column: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub column: ColumnRef,
    pub label: Option<String>,
    /// Declared type, so back ends can decode loosely typed storage.
    pub value_type: ValueType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub kind: JoinKind,
    pub table: String,
    pub alias: String,
    /// `left = right`, left on the joined side.
    pub left: ColumnRef,
    pub right: ColumnRef,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    pub from: String,
    pub projections: Vec<Projection>,
    pub joins: Vec<Join>,
    pub order_by: Vec<ColumnRef>,
}

impl ColumnRef {
    pub fn new(source: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            column: column.into(),
        }
    }
}

impl SelectQuery {
    pub fn from_table(table: impl Into<String>) -> Self {
        Self {
            from: table.into(),
            projections: Vec::new(),
            joins: Vec::new(),
            order_by: Vec::new(),
        }
    }

    pub fn select(mut self, column: ColumnRef, value_type: ValueType) -> Self {
        self.projections.push(Projection {
            column,
            label: None,
            value_type,
        });
        self
    }

    pub fn select_as(
        mut self,
        column: ColumnRef,
        label: impl Into<String>,
        value_type: ValueType,
    ) -> Self {
        self.projections.push(Projection {
            column,
            label: Some(label.into()),
            value_type,
        });
        self
    }

    pub fn join(mut self, join: Join) -> Self {
        self.joins.push(join);
        self
    }

    pub fn order_by(mut self, column: ColumnRef) -> Self {
        self.order_by.push(column);
        self
    }

    /// Render as a single SQL `SELECT` statement with quoted identifiers.
    pub fn to_sql(&self) -> String {
        let mut sql = String::from("SELECT ");
        for (i, p) in self.projections.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push_str(&p.column.to_sql());
            if let Some(label) = &p.label {
                let _ = write!(sql, " AS {}", quote_ident(label));
            }
        }
        let _ = write!(sql, " FROM {}", quote_ident(&self.from));
        for join in &self.joins {
            let keyword = match join.kind {
                JoinKind::Inner => "JOIN",
                JoinKind::LeftOuter => "LEFT OUTER JOIN",
            };
            let _ = write!(
                sql,
                " {} {} AS {} ON {} = {}",
                keyword,
                quote_ident(&join.table),
                quote_ident(&join.alias),
                join.left.to_sql(),
                join.right.to_sql()
            );
        }
        if !self.order_by.is_empty() {
            let cols: Vec<String> = self.order_by.iter().map(ColumnRef::to_sql).collect();
            let _ = write!(sql, " ORDER BY {}", cols.join(", "));
        }
        sql
    }
}

impl ColumnRef {
    pub fn to_sql(&self) -> String {
        format!("{}.{}", quote_ident(&self.source), quote_ident(&self.column))
    }
}

/// Double-quote an identifier, doubling embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
