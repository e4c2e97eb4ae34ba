//! DDL front end: loads a [`Schema`](crate::schema::Schema) from SQL text.

mod dialect;
mod lexer;
mod parser;
mod types;

pub use dialect::Dialect;
pub use lexer::Token;
pub use parser::{SqlParseError, parse_sql};
pub use types::map_type;
