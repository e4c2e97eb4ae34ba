pub mod classify;
pub mod csv_io;
pub mod datetime;
pub mod error;
pub mod normalise;
pub mod plan;
pub mod query;
pub mod schema;
pub mod session;
pub mod sql;
#[cfg(not(target_arch = "wasm32"))]
pub mod sqlite;
pub mod transform;
pub mod value;

use wasm_bindgen::prelude::*;

pub use error::{Error, Result};
pub use normalise::{
    DenormalisingQuery, NormaliseOptions, RowMaker, denormalise_prepare, renormalise_prepare,
};
pub use plan::{NormalisationPlan, plan_table};
pub use query::{JoinKind, SelectQuery};
pub use schema::{Column, ForeignKeyRef, Schema, Table, ValueType};
pub use session::Session;
pub use transform::{RowTransform, empty_deleter, type_coercer};
pub use value::{Row, Value};

use sql::{Dialect, parse_sql};

/// Initialize panic hook for better error messages in WASM
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
}

/// Parse DDL text; an unknown or missing dialect name means auto-detect.
pub fn load_schema(ddl: &str, dialect: Option<&str>) -> Result<Schema> {
    let dialect = dialect.and_then(Dialect::from_str).unwrap_or_default();
    Ok(parse_sql(ddl, dialect)?)
}

/// Header row a denormalised export of `table` would have.
pub fn denormalised_columns(ddl: &str, table: &str, dialect: Option<&str>) -> Result<Vec<String>> {
    let schema = load_schema(ddl, dialect)?;
    let table = schema.require_table(table)?;
    Ok(denormalise_prepare(&schema, table, &NormaliseOptions::default())?.column_names)
}

/// Human-readable normalisation plan for `table`.
pub fn describe_plan(ddl: &str, table: &str, dialect: Option<&str>) -> Result<String> {
    let schema = load_schema(ddl, dialect)?;
    let table = schema.require_table(table)?;
    Ok(plan_table(&schema, table)?.to_string())
}

#[wasm_bindgen(js_name = "denormalisedColumns")]
pub fn denormalised_columns_js(
    ddl: &str,
    table: &str,
    dialect: Option<String>,
) -> std::result::Result<js_sys::Array, String> {
    let names = denormalised_columns(ddl, table, dialect.as_deref()).map_err(|e| e.to_string())?;
    Ok(names.iter().map(|n| JsValue::from_str(n)).collect())
}

#[wasm_bindgen(js_name = "normalisationPlan")]
pub fn normalisation_plan_js(
    ddl: &str,
    table: &str,
    dialect: Option<String>,
) -> std::result::Result<String, String> {
    describe_plan(ddl, table, dialect.as_deref()).map_err(|e| e.to_string())
}
