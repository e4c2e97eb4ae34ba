//! Denormalising reads and renormalising writes.
//!
//! [`denormalise_prepare`] builds the query that swaps each eligible foreign
//! key for the natural key it points at. [`renormalise_prepare`] builds the
//! reverse: a [`RowMaker`] that turns natural-key text back into ids.

use crate::error::{Error, Result};
use crate::plan::{NormalisationPlan, plan_table, tidy_column_name};
use crate::query::{ColumnRef, Join, JoinKind, SelectQuery};
use crate::schema::{Schema, Table};
use crate::session::Session;
use crate::transform::RowTransform;
use crate::value::{Row, Value};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, instrument};

/// Knobs shared by both directions.
pub struct NormaliseOptions {
    pub join: JoinKind,
    tidier: Box<dyn Fn(&str) -> String>,
}

impl Default for NormaliseOptions {
    fn default() -> Self {
        Self {
            join: JoinKind::Inner,
            tidier: Box::new(tidy_column_name),
        }
    }
}

impl fmt::Debug for NormaliseOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NormaliseOptions")
            .field("join", &self.join)
            .finish_non_exhaustive()
    }
}

impl NormaliseOptions {
    pub fn with_join(mut self, join: JoinKind) -> Self {
        self.join = join;
        self
    }

    /// Rename denormalised columns with `tidier` instead of stripping `_id`.
    pub fn with_tidier(mut self, tidier: impl Fn(&str) -> String + 'static) -> Self {
        self.tidier = Box::new(tidier);
        self
    }

    /// Keep denormalised columns under their foreign-key names.
    pub fn keep_names(self) -> Self {
        self.with_tidier(|name: &str| name.to_string())
    }

    pub fn tidy(&self, name: &str) -> String {
        (self.tidier)(name)
    }
}

/// The read query for one table, plus the name of each column it yields.
#[derive(Debug, Clone)]
pub struct DenormalisingQuery {
    pub query: SelectQuery,
    pub column_names: Vec<String>,
}

impl DenormalisingQuery {
    /// Run the query; each row lines up with `column_names`.
    pub fn fetch<S: Session + ?Sized>(&self, session: &S) -> Result<Vec<Vec<Value>>> {
        session.fetch(&self.query)
    }

    /// Run the query and key every value by its output column name.
    pub fn fetch_rows<S: Session + ?Sized>(&self, session: &S) -> Result<Vec<Row>> {
        let rows = self.fetch(session)?;
        Ok(rows
            .into_iter()
            .map(|values| self.column_names.iter().cloned().zip(values).collect())
            .collect())
    }
}

/// Build the denormalising read query for `table`.
///
/// Each denormalised foreign key becomes a one-hop equality join against its
/// remote table, aliased `j0`, `j1`, ... so that self references and repeated
/// targets stay unambiguous. Rows come back in primary-key order.
#[instrument(level = "debug", skip_all, fields(table = %table.name))]
pub fn denormalise_prepare(
    schema: &Schema,
    table: &Table,
    options: &NormaliseOptions,
) -> Result<DenormalisingQuery> {
    let plan = plan_table(schema, table)?;
    let base = table.name.as_str();

    let mut query = SelectQuery::from_table(base);
    for col in &plan.simple {
        query = query.select(ColumnRef::new(base, &col.name), col.value_type.clone());
    }
    for (i, d) in plan.denormalised.iter().enumerate() {
        let alias = format!("j{}", i);
        query = query
            .select_as(
                ColumnRef::new(&alias, &d.natural_key.name),
                d.label(),
                d.natural_key.value_type.clone(),
            )
            .join(Join {
                kind: options.join,
                table: d.remote_table.name.clone(),
                left: ColumnRef::new(&alias, &d.remote_key.name),
                right: ColumnRef::new(base, &d.foreign_key.name),
                alias,
            });
    }
    for pk in table.columns.iter().filter(|c| c.primary_key) {
        query = query.order_by(ColumnRef::new(base, &pk.name));
    }

    let column_names = plan.output_names(&|name: &str| options.tidy(name));
    debug!(sql = %query.to_sql(), "built denormalising query");
    Ok(DenormalisingQuery {
        query,
        column_names,
    })
}

/// Natural-key text to surrogate id, for one denormalised column.
#[derive(Debug, Clone)]
struct Lookup {
    remote_table: String,
    natural_key: String,
    /// Name the column has in the text rows.
    text_name: String,
    /// Foreign-key column name in the table.
    column_name: String,
    nullable: bool,
    ids: HashMap<String, Value>,
}

/// Turns a denormalised text row back into an insertable row.
#[derive(Debug, Clone)]
pub struct RowMaker {
    lookups: Vec<Lookup>,
}

/// Load one lookup map per denormalised column of `table`.
///
/// Keys are the text form of each natural-key value, since input rows come
/// from text. The maps are private to the returned [`RowMaker`].
#[instrument(level = "debug", skip_all, fields(table = %table.name))]
pub fn renormalise_prepare<S: Session + ?Sized>(
    session: &S,
    schema: &Schema,
    table: &Table,
    options: &NormaliseOptions,
) -> Result<RowMaker> {
    let plan = plan_table(schema, table)?;
    let lookups = load_lookups(session, &plan, options)?;
    Ok(RowMaker { lookups })
}

fn load_lookups<S: Session + ?Sized>(
    session: &S,
    plan: &NormalisationPlan<'_>,
    options: &NormaliseOptions,
) -> Result<Vec<Lookup>> {
    let mut lookups = Vec::with_capacity(plan.denormalised.len());
    for d in &plan.denormalised {
        let remote = d.remote_table.name.as_str();
        let query = SelectQuery::from_table(remote)
            .select(
                ColumnRef::new(remote, &d.natural_key.name),
                d.natural_key.value_type.clone(),
            )
            .select(
                ColumnRef::new(remote, &d.remote_key.name),
                d.remote_key.value_type.clone(),
            );

        let mut ids = HashMap::new();
        for row in session.fetch(&query)? {
            let mut values = row.into_iter();
            match (values.next(), values.next()) {
                (Some(Value::Null), _) | (None, _) | (_, None) => {}
                (Some(natural), Some(id)) => {
                    ids.insert(natural.to_string(), id);
                }
            }
        }
        debug!(
            remote = %remote,
            natural_key = %d.natural_key.name,
            entries = ids.len(),
            "loaded lookup"
        );

        lookups.push(Lookup {
            remote_table: remote.to_string(),
            natural_key: d.natural_key.name.clone(),
            text_name: options.tidy(d.label()),
            column_name: d.label().to_string(),
            nullable: d.foreign_key.nullable,
            ids,
        });
    }
    Ok(lookups)
}

impl RowMaker {
    /// Names of the columns this maker consumes from text rows.
    pub fn text_columns(&self) -> impl Iterator<Item = &str> {
        self.lookups.iter().map(|l| l.text_name.as_str())
    }
}

impl RowTransform for RowMaker {
    /// Replace each natural-key value with its id, under the foreign-key name
    /// and at the same position in the row.
    ///
    /// An empty value missing from the lookup means NULL for a nullable
    /// foreign key and removes the column. Any other miss is an error.
    fn transform(&self, mut row: Row) -> Result<Row> {
        for lookup in &self.lookups {
            let Some((index, _, value)) = row.shift_remove_full(&lookup.text_name) else {
                return Err(Error::MissingValue(lookup.text_name.clone()));
            };
            let key = match value {
                Value::Text(s) => s,
                other => other.to_string(),
            };
            let id = match lookup.ids.get(&key) {
                Some(id) => id,
                // An empty natural key that exists remotely still wins.
                None if key.is_empty() && lookup.nullable => continue,
                None => {
                    return Err(Error::LookupMiss {
                        table: lookup.remote_table.clone(),
                        column: lookup.natural_key.clone(),
                        value: key,
                    });
                }
            };
            if row.contains_key(&lookup.column_name) {
                row.insert(lookup.column_name.clone(), id.clone());
            } else {
                row.shift_insert(index, lookup.column_name.clone(), id.clone());
            }
        }
        Ok(row)
    }
}
