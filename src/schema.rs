//! Static schema descriptors.
//!
//! Everything the planner knows about a database comes from these types.
//! They are filled in by the DDL front end ([`crate::sql`]), by reflecting a
//! live SQLite database, or declared directly with the builder methods.

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Schema {
    pub tables: Vec<Table>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub value_type: ValueType,
    pub nullable: bool,
    pub unique: bool,
    pub primary_key: bool,
    /// Referenced columns. Only the first one takes part in denormalisation.
    pub foreign_keys: Vec<ForeignKeyRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ForeignKeyRef {
    pub table: String,
    pub column: String,
}

/// Declared value type of a column, as far as text coercion cares.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueType {
    Integer,
    Real,
    Text,
    Boolean,
    Date,
    DateTime,
    Other(String),
}

impl Schema {
    pub fn new(tables: Vec<Table>) -> Self {
        Self { tables }
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn require_table(&self, name: &str) -> Result<&Table> {
        self.table(name)
            .ok_or_else(|| Error::UnknownTable(name.to_string()))
    }
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    pub fn require_column(&self, name: &str) -> Result<&Column> {
        self.column(name).ok_or_else(|| Error::UnknownColumn {
            table: self.name.clone(),
            column: name.to_string(),
        })
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}

impl Column {
    /// A nullable, non-unique, non-key column.
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            nullable: true,
            unique: false,
            primary_key: false,
            foreign_keys: Vec::new(),
        }
    }

    /// Marks the column as (part of) the primary key. Implies NOT NULL.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn references(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.foreign_keys.push(ForeignKeyRef {
            table: table.into(),
            column: column.into(),
        });
        self
    }

    pub fn is_foreign_key(&self) -> bool {
        !self.foreign_keys.is_empty()
    }

    /// First foreign-key target; any further targets are ignored.
    pub fn foreign_key(&self) -> Option<&ForeignKeyRef> {
        self.foreign_keys.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_flags() {
        let id = Column::new("id", ValueType::Integer).primary_key();
        assert!(id.primary_key);
        assert!(!id.nullable);

        let fk = Column::new("owner_id", ValueType::Integer)
            .not_null()
            .references("owner", "id");
        assert!(fk.is_foreign_key());
        assert_eq!(fk.foreign_key().map(|r| r.table.as_str()), Some("owner"));
        assert!(!fk.unique);
    }

    #[test]
    fn test_lookups() {
        let schema = Schema::new(vec![Table::new(
            "users",
            vec![
                Column::new("id", ValueType::Integer).primary_key(),
                Column::new("email", ValueType::Text).unique(),
            ],
        )]);

        let users = schema.require_table("users").unwrap();
        assert_eq!(users.column_names().collect::<Vec<_>>(), vec!["id", "email"]);
        assert!(users.require_column("email").is_ok());
        assert!(matches!(
            users.require_column("missing"),
            Err(Error::UnknownColumn { .. })
        ));
        assert!(matches!(
            schema.require_table("nope"),
            Err(Error::UnknownTable(name)) if name == "nope"
        ));
    }
}
