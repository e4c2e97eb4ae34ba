//! SQLite binding: runs queries, reflects schemas and inserts rows.

use crate::datetime::{parse_date, parse_datetime};
use crate::error::Result;
use crate::query::{SelectQuery, quote_ident};
use crate::schema::{Column, ForeignKeyRef, Schema, Table, ValueType};
use crate::session::Session;
use crate::sql::{Dialect, map_type};
use crate::value::{Row, Value};
use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue, ValueRef};
use rusqlite::{Connection, Transaction, params_from_iter};
use std::path::Path;
use tracing::{debug, instrument, trace};

pub struct SqliteSession {
    conn: Connection,
}

impl SqliteSession {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            conn: Connection::open(path)?,
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    /// Start a transaction. Inserts made through this session while it is
    /// open belong to it; nothing is kept unless it is committed.
    pub fn transaction(&self) -> Result<Transaction<'_>> {
        Ok(self.conn.unchecked_transaction()?)
    }

    /// Insert one row. Missing columns are left to their defaults (NULL).
    #[instrument(name = "sqlite::insert", level = "trace", skip(self, row), fields(columns = row.len()))]
    pub fn insert(&self, table: &str, row: &Row) -> Result<usize> {
        let sql = if row.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", quote_ident(table))
        } else {
            let columns: Vec<String> = row.keys().map(|k| quote_ident(k)).collect();
            let placeholders: Vec<String> = (1..=row.len()).map(|i| format!("?{}", i)).collect();
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                quote_ident(table),
                columns.join(", "),
                placeholders.join(", ")
            )
        };
        let mut stmt = self.conn.prepare_cached(&sql)?;
        Ok(stmt.execute(params_from_iter(row.values()))?)
    }

    /// Read the schema of every user table in the database.
    #[instrument(name = "sqlite::reflect_schema", level = "debug", skip(self))]
    pub fn reflect_schema(&self) -> Result<Schema> {
        let names: Vec<String> = {
            let mut stmt = self.conn.prepare(
                "SELECT name FROM sqlite_master \
                 WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY rowid",
            )?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            rows.collect::<rusqlite::Result<_>>()?
        };

        let mut tables = Vec::with_capacity(names.len());
        for name in &names {
            tables.push(self.reflect_table(name)?);
        }

        // A reference without a target column points at the remote primary key.
        let primary_keys: Vec<(String, Option<String>)> = tables
            .iter()
            .map(|t: &Table| {
                let pk = t.columns.iter().find(|c| c.primary_key).map(|c| c.name.clone());
                (t.name.clone(), pk)
            })
            .collect();
        for table in &mut tables {
            for fk in table.columns.iter_mut().flat_map(|c| c.foreign_keys.iter_mut()) {
                if fk.column.is_empty() {
                    fk.column = primary_keys
                        .iter()
                        .find(|(name, _)| *name == fk.table)
                        .and_then(|(_, pk)| pk.clone())
                        .unwrap_or_else(|| "rowid".to_string());
                }
            }
        }

        debug!(tables = tables.len(), "reflected schema");
        Ok(Schema::new(tables))
    }

    fn reflect_table(&self, name: &str) -> Result<Table> {
        let quoted = quote_ident(name);

        let mut columns: Vec<Column> = {
            let mut stmt = self.conn.prepare(&format!("PRAGMA table_info({})", quoted))?;
            let rows = stmt.query_map([], |row| {
                let name: String = row.get(1)?;
                let declared: String = row.get::<_, Option<String>>(2)?.unwrap_or_default();
                let not_null: bool = row.get(3)?;
                let pk: i64 = row.get(5)?;
                let mut column = Column::new(name, map_type(&declared, Dialect::Generic));
                column.nullable = !not_null;
                if pk > 0 {
                    column = column.primary_key();
                }
                Ok(column)
            })?;
            rows.collect::<rusqlite::Result<_>>()?
        };

        {
            let mut stmt = self
                .conn
                .prepare(&format!("PRAGMA foreign_key_list({})", quoted))?;
            let rows = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<String>>(4)?,
                ))
            })?;
            for fk in rows {
                let (target, from, to) = fk?;
                if let Some(col) = columns.iter_mut().find(|c| c.name == from) {
                    col.foreign_keys.push(ForeignKeyRef {
                        table: target,
                        column: to.unwrap_or_default(),
                    });
                }
            }
        }

        for index in self.unique_indexes(&quoted)? {
            let cols = self.index_columns(&index)?;
            // Only single-column uniqueness can make a natural key.
            if let [only] = cols.as_slice() {
                if let Some(col) = columns.iter_mut().find(|c| c.name == *only) {
                    if !col.primary_key {
                        col.unique = true;
                    }
                }
            }
        }

        trace!(table = %name, columns = columns.len(), "reflected table");
        Ok(Table::new(name, columns))
    }

    fn unique_indexes(&self, quoted_table: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA index_list({})", quoted_table))?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(1)?,
                row.get::<_, bool>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;
        let mut names = Vec::new();
        for row in rows {
            let (name, unique, origin) = row?;
            if unique && origin != "pk" {
                names.push(name);
            }
        }
        Ok(names)
    }

    fn index_columns(&self, index: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA index_info({})", quote_ident(index)))?;
        // Expression index entries have no column name.
        let rows = stmt.query_map([], |row| row.get::<_, Option<String>>(2))?;
        let mut cols = Vec::new();
        for row in rows {
            cols.push(row?.unwrap_or_default());
        }
        Ok(cols)
    }
}

impl Session for SqliteSession {
    #[instrument(name = "sqlite::fetch", level = "debug", skip_all, fields(from = %query.from))]
    fn fetch(&self, query: &SelectQuery) -> Result<Vec<Vec<Value>>> {
        let sql = query.to_sql();
        trace!(%sql, "running query");
        let mut stmt = self.conn.prepare(&sql)?;
        let types: Vec<&ValueType> = query.projections.iter().map(|p| &p.value_type).collect();
        let rows = stmt.query_map([], |row| {
            types
                .iter()
                .enumerate()
                .map(|(i, ty)| Ok(decode(row.get_ref(i)?, ty)))
                .collect::<rusqlite::Result<Vec<Value>>>()
        })?;
        let rows = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        debug!(rows = rows.len(), "fetched");
        Ok(rows)
    }
}

/// SQLite keeps booleans as integers and dates as text; use the declared
/// type to get them back. Text that does not parse stays text.
fn decode(value: ValueRef<'_>, value_type: &ValueType) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(n) if *value_type == ValueType::Boolean => Value::Boolean(n != 0),
        ValueRef::Integer(n) => Value::Integer(n),
        ValueRef::Real(x) => Value::Real(x),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            let text = String::from_utf8_lossy(bytes).into_owned();
            match value_type {
                ValueType::Date => parse_date(&text).map(Value::Date).unwrap_or(Value::Text(text)),
                ValueType::DateTime => parse_datetime(&text)
                    .map(Value::DateTime)
                    .unwrap_or(Value::Text(text)),
                _ => Value::Text(text),
            }
        }
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Integer(n) => ToSqlOutput::Owned(SqlValue::Integer(*n)),
            Value::Real(x) => ToSqlOutput::Owned(SqlValue::Real(*x)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Boolean(b) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*b))),
            Value::Date(_) | Value::DateTime(_) => ToSqlOutput::Owned(SqlValue::Text(self.to_string())),
        })
    }
}
