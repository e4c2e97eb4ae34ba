//! DDL parser: `CREATE TABLE` and `ALTER TABLE ... ADD ... FOREIGN KEY` into a
//! [`Schema`]. Anything else in the script is skipped statement by statement.

use super::dialect::Dialect;
use super::lexer::{Lexer, Token};
use super::types::map_type;
use crate::schema::{Column, ForeignKeyRef, Schema, Table, ValueType};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SqlParseError {
    #[error("Expected {expected}, found {found:?}")]
    Expected {
        expected: &'static str,
        found: Token,
    },
    #[error("Unexpected end of input")]
    UnexpectedEof,
}

/// Words that end a column's type and start its modifiers.
const MODIFIER_WORDS: &[&str] = &[
    "AUTO_INCREMENT",
    "AUTOINCREMENT",
    "COLLATE",
    "COMMENT",
    "GENERATED",
    "IDENTITY",
];

/// Parse a DDL script into a schema.
pub fn parse_sql(input: &str, dialect: Dialect) -> Result<Schema, SqlParseError> {
    let dialect = dialect.resolve(input);
    let tokens = Lexer::new(input).tokenize();
    let mut parser = Parser {
        tokens,
        pos: 0,
        dialect,
        tables: Vec::new(),
        constraints: Vec::new(),
    };
    parser.parse()?;
    Ok(parser.finish())
}

/// Table-level constraint, applied once every table has been read.
enum TableConstraint {
    PrimaryKey(Vec<String>),
    Unique(Vec<String>),
    ForeignKey {
        columns: Vec<String>,
        target: String,
        target_columns: Vec<String>,
    },
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    dialect: Dialect,
    tables: Vec<Table>,
    constraints: Vec<(String, TableConstraint)>,
}

impl Parser {
    fn current(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.current() == token {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_word(&mut self, word: &str) -> bool {
        if self.current().is_word(word) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn peek_at(&self, offset: usize) -> &Token {
        self.tokens.get(self.pos + offset).unwrap_or(&Token::Eof)
    }

    /// A column name, which may be a non-structural keyword such as `key`.
    fn expect_name(&mut self, expected: &'static str) -> Result<String, SqlParseError> {
        match self.current().name() {
            Some(name) => {
                self.advance();
                Ok(name)
            }
            None => self.expect_ident(expected),
        }
    }

    /// `KEY`/`INDEX` at the start of a table element opens an index
    /// definition (`KEY [name] (cols)`) unless it is a column called `key`.
    /// A column's type arguments are literals; an index lists names.
    fn starts_index_definition(&self) -> bool {
        let list_at = match self.peek_at(1) {
            Token::LParen => 1,
            Token::Ident(_) if self.peek_at(2) == &Token::LParen => 2,
            _ => return false,
        };
        !matches!(self.peek_at(list_at + 1), Token::Num(_) | Token::Str(_))
    }

    fn expect_ident(&mut self, expected: &'static str) -> Result<String, SqlParseError> {
        match self.current().clone() {
            Token::Ident(name) => {
                self.advance();
                Ok(name)
            }
            Token::Eof => Err(SqlParseError::UnexpectedEof),
            found => Err(SqlParseError::Expected { expected, found }),
        }
    }

    fn parse(&mut self) -> Result<(), SqlParseError> {
        while self.current() != &Token::Eof {
            match self.current() {
                Token::Create => self.parse_create()?,
                Token::Alter => self.parse_alter()?,
                _ => self.skip_statement(),
            }
        }
        Ok(())
    }

    fn parse_create(&mut self) -> Result<(), SqlParseError> {
        self.advance(); // CREATE
        while ["TEMP", "TEMPORARY", "UNLOGGED"]
            .iter()
            .any(|w| self.current().is_word(w))
        {
            self.advance();
        }
        if !self.eat(&Token::Table) {
            // INDEX, VIEW, SEQUENCE, ...
            self.skip_statement();
            return Ok(());
        }
        if self.eat(&Token::If) {
            self.eat(&Token::Not);
            self.eat(&Token::Exists);
        }

        let name = self.qualified_name()?;
        if !self.eat(&Token::LParen) {
            // CREATE TABLE ... AS SELECT
            self.skip_statement();
            return Ok(());
        }

        let mut columns = Vec::new();
        loop {
            match self.current() {
                Token::RParen => {
                    self.advance();
                    break;
                }
                Token::Comma => self.advance(),
                Token::Constraint => {
                    self.advance();
                    if let Token::Ident(_) = self.current() {
                        self.advance();
                    }
                }
                Token::Primary | Token::Unique | Token::Foreign => {
                    if let Some(constraint) = self.parse_table_constraint()? {
                        self.constraints.push((name.clone(), constraint));
                    }
                }
                Token::Index | Token::Key if self.starts_index_definition() => {
                    self.skip_element();
                }
                Token::Check => self.skip_element(),
                t if ["FULLTEXT", "SPATIAL", "EXCLUDE"].iter().any(|w| t.is_word(w)) => {
                    self.skip_element();
                }
                Token::Eof => return Err(SqlParseError::UnexpectedEof),
                t if t.name().is_some() => columns.push(self.parse_column()?),
                _ => self.advance(),
            }
        }

        // Table options (ENGINE=..., WITHOUT ROWID, ...)
        self.skip_statement();

        debug!(table = %name, columns = columns.len(), "parsed table");
        self.tables.push(Table::new(name, columns));
        Ok(())
    }

    fn parse_table_constraint(&mut self) -> Result<Option<TableConstraint>, SqlParseError> {
        match self.current() {
            Token::Primary => {
                self.advance();
                self.eat(&Token::Key);
                let cols = self.column_list();
                self.skip_element();
                Ok(Some(TableConstraint::PrimaryKey(cols)))
            }
            Token::Unique => {
                self.advance();
                if !self.eat(&Token::Key) {
                    self.eat(&Token::Index);
                }
                // MySQL: UNIQUE KEY name (col)
                if let Token::Ident(_) = self.current() {
                    self.advance();
                }
                let cols = self.column_list();
                self.skip_element();
                Ok(Some(TableConstraint::Unique(cols)))
            }
            Token::Foreign => self.parse_foreign_key(),
            _ => {
                self.advance();
                Ok(None)
            }
        }
    }

    /// `FOREIGN KEY (cols) REFERENCES target [(cols)] [ON ...] ...`
    fn parse_foreign_key(&mut self) -> Result<Option<TableConstraint>, SqlParseError> {
        self.advance(); // FOREIGN
        if !self.eat(&Token::Key) {
            self.skip_element();
            return Ok(None);
        }
        // MySQL allows an index name here
        if let Token::Ident(_) = self.current() {
            self.advance();
        }
        let columns = self.column_list();
        if !self.eat(&Token::References) {
            self.skip_element();
            return Ok(None);
        }
        let target = self.qualified_name()?;
        let target_columns = self.column_list();
        self.skip_element();

        Ok(Some(TableConstraint::ForeignKey {
            columns,
            target,
            target_columns,
        }))
    }

    fn parse_column(&mut self) -> Result<Column, SqlParseError> {
        let name = self.expect_name("column name")?;
        let value_type = match self.column_type() {
            Some(raw) => map_type(&raw, self.dialect),
            None => ValueType::Other(String::new()),
        };
        let mut column = Column::new(name, value_type);

        loop {
            match self.current() {
                Token::Comma | Token::RParen | Token::Eof => break,
                Token::Primary => {
                    self.advance();
                    self.eat(&Token::Key);
                    column.primary_key = true;
                    column.nullable = false;
                }
                Token::Not => {
                    self.advance();
                    if self.eat(&Token::Null) {
                        column.nullable = false;
                    }
                }
                Token::Unique => {
                    self.advance();
                    self.eat(&Token::Key);
                    column.unique = true;
                }
                Token::Default => {
                    self.advance();
                    self.skip_expression();
                }
                Token::References => {
                    self.advance();
                    let table = self.qualified_name()?;
                    let column_name = self.column_list().into_iter().next().unwrap_or_default();
                    column.foreign_keys.push(ForeignKeyRef {
                        table,
                        column: column_name,
                    });
                    self.skip_on_actions();
                }
                Token::On => self.skip_on_actions(),
                Token::Constraint => {
                    self.advance();
                    if let Token::Ident(_) = self.current() {
                        self.advance();
                    }
                }
                Token::LParen => self.skip_parenthesized(),
                _ => self.advance(),
            }
        }

        Ok(column)
    }

    /// Collect the type words of a column definition, e.g. `double precision`
    /// or `varchar(255)`.
    fn column_type(&mut self) -> Option<String> {
        let mut raw = String::new();
        loop {
            match self.current().clone() {
                Token::Ident(word) if !MODIFIER_WORDS.iter().any(|m| word.eq_ignore_ascii_case(m)) => {
                    if !raw.is_empty() {
                        raw.push(' ');
                    }
                    raw.push_str(&word);
                    self.advance();
                }
                Token::LParen if !raw.is_empty() => {
                    raw.push('(');
                    self.advance();
                    while !matches!(self.current(), Token::RParen | Token::Eof) {
                        match self.current() {
                            Token::Num(n) | Token::Ident(n) => raw.push_str(n),
                            Token::Str(s) => raw.push_str(s),
                            Token::Comma => raw.push(','),
                            _ => {}
                        }
                        self.advance();
                    }
                    self.eat(&Token::RParen);
                    raw.push(')');
                }
                _ => break,
            }
        }
        (!raw.is_empty()).then_some(raw)
    }

    fn parse_alter(&mut self) -> Result<(), SqlParseError> {
        self.advance(); // ALTER
        if !self.eat(&Token::Table) {
            self.skip_statement();
            return Ok(());
        }
        if self.eat(&Token::If) {
            self.eat(&Token::Exists);
        }
        self.eat(&Token::Only);
        let table = self.qualified_name()?;

        while !matches!(self.current(), Token::Semicolon | Token::Eof) {
            if !self.eat(&Token::Add) {
                self.advance();
                continue;
            }
            if self.eat(&Token::Constraint) {
                if let Token::Ident(_) = self.current() {
                    self.advance();
                }
            }
            if matches!(
                self.current(),
                Token::Primary | Token::Unique | Token::Foreign
            ) {
                if let Some(constraint) = self.parse_table_constraint()? {
                    self.constraints.push((table.clone(), constraint));
                }
            }
        }
        self.eat(&Token::Semicolon);
        Ok(())
    }

    /// `name` or `schema.name`; the schema part is dropped.
    fn qualified_name(&mut self) -> Result<String, SqlParseError> {
        let mut name = self.expect_name("table name")?;
        while self.eat(&Token::Dot) {
            name = self.expect_name("table name")?;
        }
        Ok(name)
    }

    /// `(a, b DESC, c(10))` → `[a, b, c]`. Empty when no list follows.
    fn column_list(&mut self) -> Vec<String> {
        let mut cols = Vec::new();
        if !self.eat(&Token::LParen) {
            return cols;
        }
        let mut depth = 1;
        let mut expect_name = true;
        while depth > 0 {
            match self.current() {
                Token::LParen => depth += 1,
                Token::RParen => depth -= 1,
                Token::Comma if depth == 1 => expect_name = true,
                t if depth == 1 && expect_name && t.name().is_some() => {
                    cols.extend(t.name());
                    expect_name = false;
                }
                Token::Eof => break,
                _ => {}
            }
            self.advance();
        }
        cols
    }

    fn skip_on_actions(&mut self) {
        while self.eat(&Token::On) {
            self.advance(); // DELETE / UPDATE
            if self.eat_word("SET") {
                if !self.eat(&Token::Null) {
                    self.eat(&Token::Default);
                }
            } else if self.eat_word("NO") {
                self.eat_word("ACTION");
            } else {
                self.advance(); // CASCADE / RESTRICT
            }
        }
    }

    /// A DEFAULT value: literal, parenthesised expression or function call.
    fn skip_expression(&mut self) {
        match self.current() {
            Token::LParen => self.skip_parenthesized(),
            Token::Ident(_) => {
                self.advance();
                if self.current() == &Token::LParen {
                    self.skip_parenthesized();
                }
            }
            Token::Comma | Token::RParen | Token::Eof => {}
            _ => self.advance(),
        }
    }

    fn skip_parenthesized(&mut self) {
        if !self.eat(&Token::LParen) {
            return;
        }
        let mut depth = 1;
        while depth > 0 {
            match self.current() {
                Token::LParen => depth += 1,
                Token::RParen => depth -= 1,
                Token::Eof => return,
                _ => {}
            }
            self.advance();
        }
    }

    fn skip_statement(&mut self) {
        while !matches!(self.current(), Token::Semicolon | Token::Eof) {
            self.advance();
        }
        self.eat(&Token::Semicolon);
    }

    /// Skip to the end of the current table element or ALTER action.
    fn skip_element(&mut self) {
        self.skip_until(&[Token::Comma, Token::RParen, Token::Semicolon]);
    }

    fn skip_until(&mut self, tokens: &[Token]) {
        while !tokens.contains(self.current()) && self.current() != &Token::Eof {
            if self.current() == &Token::LParen {
                self.skip_parenthesized();
            } else {
                self.advance();
            }
        }
    }

    /// Apply table-level constraints and fill in implicit reference targets.
    fn finish(mut self) -> Schema {
        for (table_name, constraint) in std::mem::take(&mut self.constraints) {
            let Some(table) = self.tables.iter_mut().find(|t| t.name == table_name) else {
                debug!(table = %table_name, "constraint on unknown table ignored");
                continue;
            };
            match constraint {
                TableConstraint::PrimaryKey(cols) => {
                    for name in cols {
                        if let Some(col) = table.column_mut(&name) {
                            col.primary_key = true;
                            col.nullable = false;
                        }
                    }
                }
                // Composite unique constraints cannot make a natural key.
                TableConstraint::Unique(cols) => {
                    if let [name] = cols.as_slice() {
                        if let Some(col) = table.column_mut(name) {
                            col.unique = true;
                        }
                    }
                }
                TableConstraint::ForeignKey {
                    columns,
                    target,
                    target_columns,
                } => {
                    for (i, name) in columns.iter().enumerate() {
                        if let Some(col) = table.column_mut(name) {
                            col.foreign_keys.push(ForeignKeyRef {
                                table: target.clone(),
                                column: target_columns.get(i).cloned().unwrap_or_default(),
                            });
                        }
                    }
                }
            }
        }

        // `REFERENCES t` without a column list points at t's primary key.
        let primary_keys: Vec<(String, Option<String>)> = self
            .tables
            .iter()
            .map(|t| {
                let pk = t.columns.iter().find(|c| c.primary_key).map(|c| c.name.clone());
                (t.name.clone(), pk)
            })
            .collect();
        for table in &mut self.tables {
            for fk in table.columns.iter_mut().flat_map(|c| c.foreign_keys.iter_mut()) {
                if fk.column.is_empty() {
                    fk.column = primary_keys
                        .iter()
                        .find(|(name, _)| *name == fk.table)
                        .and_then(|(_, pk)| pk.clone())
                        .unwrap_or_else(|| "id".to_string());
                }
            }
        }

        Schema::new(self.tables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_table() {
        let sql = r#"
            CREATE TABLE users (
                id INT PRIMARY KEY,
                email VARCHAR(255) NOT NULL UNIQUE,
                nickname TEXT
            );
        "#;

        let schema = parse_sql(sql, Dialect::Generic).unwrap();
        assert_eq!(schema.tables.len(), 1);

        let users = &schema.tables[0];
        assert_eq!(users.name, "users");
        assert_eq!(users.column_names().collect::<Vec<_>>(), vec!["id", "email", "nickname"]);

        let id = users.column("id").unwrap();
        assert!(id.primary_key);
        assert!(!id.nullable);
        assert_eq!(id.value_type, ValueType::Integer);

        let email = users.column("email").unwrap();
        assert!(email.unique);
        assert!(!email.nullable);
        assert_eq!(email.value_type, ValueType::Text);

        assert!(users.column("nickname").unwrap().nullable);
    }

    #[test]
    fn test_parse_foreign_keys() {
        let sql = r#"
            CREATE TABLE lookup_table (
                id INTEGER NOT NULL,
                description VARCHAR NOT NULL,
                PRIMARY KEY (id),
                UNIQUE (description)
            );
            CREATE TABLE normalised_table (
                id INTEGER NOT NULL,
                accounttype_id INTEGER NOT NULL REFERENCES lookup_table,
                other_id INTEGER,
                valid BOOLEAN NOT NULL,
                PRIMARY KEY (id),
                CONSTRAINT fk_other FOREIGN KEY (other_id) REFERENCES lookup_table (id)
                    ON DELETE SET NULL DEFERRABLE INITIALLY DEFERRED
            );
        "#;

        let schema = parse_sql(sql, Dialect::Generic).unwrap();
        let lookup = schema.table("lookup_table").unwrap();
        assert!(lookup.column("id").unwrap().primary_key);
        assert!(lookup.column("description").unwrap().unique);

        let table = schema.table("normalised_table").unwrap();
        let accounttype = table.column("accounttype_id").unwrap();
        assert_eq!(
            accounttype.foreign_key(),
            Some(&ForeignKeyRef {
                table: "lookup_table".to_string(),
                column: "id".to_string(),
            })
        );
        let other = table.column("other_id").unwrap();
        assert_eq!(other.foreign_key().map(|f| f.column.as_str()), Some("id"));
        assert!(other.nullable);
        assert_eq!(table.column("valid").unwrap().value_type, ValueType::Boolean);
        assert_eq!(table.columns.len(), 4);
    }

    #[test]
    fn test_composite_unique_is_ignored() {
        let sql = "CREATE TABLE pair (a INT, b INT, UNIQUE (a, b));";
        let schema = parse_sql(sql, Dialect::Generic).unwrap();
        let pair = schema.table("pair").unwrap();
        assert!(pair.columns.iter().all(|c| !c.unique));
    }

    #[test]
    fn test_parse_postgres_dump() {
        let sql = r#"
            -- PostgreSQL database dump
            SET statement_timeout = 0;
            CREATE TABLE public.kind (
                id serial NOT NULL,
                label character varying(40) NOT NULL,
                created timestamp with time zone DEFAULT now()
            );
            CREATE TABLE public.item (
                id integer NOT NULL,
                kind_id integer
            );
            ALTER TABLE ONLY public.kind ADD CONSTRAINT kind_pkey PRIMARY KEY (id);
            ALTER TABLE ONLY public.kind ADD CONSTRAINT kind_label_key UNIQUE (label);
            ALTER TABLE ONLY public.item
                ADD CONSTRAINT item_kind_fk FOREIGN KEY (kind_id) REFERENCES public.kind(id);
            CREATE INDEX item_kind_idx ON public.item USING btree (kind_id);
        "#;

        let schema = parse_sql(sql, Dialect::Auto).unwrap();
        let kind = schema.table("kind").unwrap();
        assert!(kind.column("id").unwrap().primary_key);
        assert!(kind.column("label").unwrap().unique);
        assert_eq!(kind.column("label").unwrap().value_type, ValueType::Text);
        assert_eq!(kind.column("created").unwrap().value_type, ValueType::DateTime);

        let item = schema.table("item").unwrap();
        assert_eq!(
            item.column("kind_id").unwrap().foreign_key().map(|f| f.table.as_str()),
            Some("kind")
        );
    }

    #[test]
    fn test_parse_mysql_dump() {
        let sql = r#"
            CREATE TABLE `users` (
              `id` int(11) NOT NULL AUTO_INCREMENT,
              `name` varchar(255) COLLATE utf8_bin DEFAULT NULL,
              `active` tinyint(1) NOT NULL DEFAULT '1',
              PRIMARY KEY (`id`),
              UNIQUE KEY `users_name` (`name`),
              KEY `users_active` (`active`)
            ) ENGINE=InnoDB DEFAULT CHARSET=utf8;
        "#;

        let schema = parse_sql(sql, Dialect::MySQL).unwrap();
        let users = schema.table("users").unwrap();
        assert_eq!(users.columns.len(), 3);
        assert!(users.column("id").unwrap().primary_key);
        assert!(users.column("name").unwrap().unique);
        assert!(users.column("name").unwrap().nullable);
        assert_eq!(users.column("active").unwrap().value_type, ValueType::Boolean);
    }

    #[test]
    fn test_keyword_column_names() {
        let sql = r#"
            CREATE TABLE setting (
                id INTEGER PRIMARY KEY,
                key TEXT NOT NULL UNIQUE,
                value TEXT
            );
            CREATE TABLE entry (
                index INTEGER,
                key VARCHAR(32),
                only ENUM('a', 'b'),
                KEY entry_key (key),
                INDEX (index),
                UNIQUE (key)
            );
        "#;
        let schema = parse_sql(sql, Dialect::Generic).unwrap();

        let setting = schema.table("setting").unwrap();
        assert_eq!(
            setting.column_names().collect::<Vec<_>>(),
            vec!["id", "key", "value"]
        );
        let key = setting.column("key").unwrap();
        assert!(key.unique);
        assert!(!key.nullable);

        let entry = schema.table("entry").unwrap();
        assert_eq!(
            entry.column_names().collect::<Vec<_>>(),
            vec!["index", "key", "only"]
        );
        assert_eq!(entry.column("key").unwrap().value_type, ValueType::Text);
        assert!(entry.column("key").unwrap().unique);
    }

    #[test]
    fn test_sqlite_typeless_columns() {
        let sql = "CREATE TABLE IF NOT EXISTS t (a, b INTEGER PRIMARY KEY AUTOINCREMENT);";
        let schema = parse_sql(sql, Dialect::Generic).unwrap();
        let t = schema.table("t").unwrap();
        assert_eq!(t.column("a").unwrap().value_type, ValueType::Other(String::new()));
        assert!(t.column("b").unwrap().primary_key);
        assert_eq!(t.column("b").unwrap().value_type, ValueType::Integer);
    }

    #[test]
    fn test_truncated_input() {
        let err = parse_sql("CREATE TABLE t (id INT", Dialect::Generic).unwrap_err();
        assert!(matches!(err, SqlParseError::UnexpectedEof));

        let err = parse_sql("CREATE TABLE (id INT);", Dialect::Generic).unwrap_err();
        assert!(matches!(err, SqlParseError::Expected { .. }));
    }
}
