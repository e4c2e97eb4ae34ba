//! SQL type names to [`ValueType`].

use super::Dialect;
use crate::schema::ValueType;

/// Map a declared SQL type (e.g. `VARCHAR(255)`, `TINYINT(1)`) to the value
/// type the row coercer works with.
pub fn map_type(sql_type: &str, dialect: Dialect) -> ValueType {
    let lower = sql_type.trim().to_lowercase();
    let base = lower.split('(').next().unwrap_or(&lower).trim();

    let mapped = match dialect {
        Dialect::PostgreSQL => map_postgres_type(base),
        Dialect::MySQL => map_mysql_type(base, &lower),
        _ => None,
    };
    mapped
        .or_else(|| map_common_type(base))
        .unwrap_or_else(|| affinity(base))
}

fn map_postgres_type(base: &str) -> Option<ValueType> {
    let mapped = match base {
        "int2" | "int4" | "int8" | "serial" | "serial4" | "bigserial" | "serial8"
        | "smallserial" | "serial2" => ValueType::Integer,
        "float4" | "float8" | "money" => ValueType::Real,
        "timestamptz" | "timestamp with time zone" | "timestamp without time zone" => {
            ValueType::DateTime
        }
        "character varying" | "citext" | "name" => ValueType::Text,
        "bytea" | "uuid" | "json" | "jsonb" | "interval" | "timetz" => {
            ValueType::Other(base.to_string())
        }
        t if t.ends_with("[]") => ValueType::Other(t.to_string()),
        _ => return None,
    };
    Some(mapped)
}

fn map_mysql_type(base: &str, full: &str) -> Option<ValueType> {
    let mapped = match base {
        // TINYINT(1) is MySQL's boolean
        "tinyint" if full.starts_with("tinyint(1)") => ValueType::Boolean,
        "tinyint" | "mediumint" | "year" => ValueType::Integer,
        "longtext" | "mediumtext" | "tinytext" | "enum" | "set" => ValueType::Text,
        "longblob" | "mediumblob" | "tinyblob" | "binary" | "varbinary" | "json" => {
            ValueType::Other(base.to_string())
        }
        _ => return None,
    };
    Some(mapped)
}

fn map_common_type(base: &str) -> Option<ValueType> {
    let mapped = match base {
        "int" | "integer" | "bigint" | "smallint" => ValueType::Integer,
        "real" | "float" | "double" | "double precision" | "decimal" | "numeric" => {
            ValueType::Real
        }
        "varchar" | "char" | "character" | "text" | "string" | "clob" | "nvarchar"
        | "nchar" => ValueType::Text,
        "boolean" | "bool" => ValueType::Boolean,
        "date" => ValueType::Date,
        "datetime" | "timestamp" => ValueType::DateTime,
        "time" | "blob" => ValueType::Other(base.to_string()),
        _ => return None,
    };
    Some(mapped)
}

/// SQLite-style type affinity for names nobody above recognised.
fn affinity(base: &str) -> ValueType {
    if base.contains("int") {
        ValueType::Integer
    } else if base.contains("char") || base.contains("clob") || base.contains("text") {
        ValueType::Text
    } else if base.contains("real") || base.contains("floa") || base.contains("doub") {
        ValueType::Real
    } else {
        ValueType::Other(base.to_string())
    }
}
