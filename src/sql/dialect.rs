//! DDL dialect selection.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// Detect from the script itself
    #[default]
    Auto,
    /// Standard SQL, also used for SQLite
    Generic,
    PostgreSQL,
    MySQL,
}

/// Markers that identify a dump, strongest first: tool headers, then syntax.
const POSTGRES_MARKERS: &[&str] = &[
    "postgresql database dump",
    "pg_dump",
    "-- postgres",
    "serial",
    "timestamptz",
    "::text",
    "alter table only",
];
const MYSQL_MARKERS: &[&str] = &[
    "mysql dump",
    "mysqldump",
    "-- mysql",
    "auto_increment",
    "engine=",
    "unsigned",
    "tinyint",
];

impl Dialect {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "generic" | "sqlite" => Some(Self::Generic),
            "postgres" | "postgresql" | "pg" => Some(Self::PostgreSQL),
            "mysql" | "mariadb" => Some(Self::MySQL),
            _ => None,
        }
    }

    pub fn detect(content: &str) -> Self {
        let lower = content.to_lowercase();
        let hits = |markers: &[&str]| markers.iter().position(|m| lower.contains(m));

        match (hits(POSTGRES_MARKERS), hits(MYSQL_MARKERS)) {
            (Some(pg), Some(my)) if my < pg => Self::MySQL,
            (Some(_), _) => Self::PostgreSQL,
            (None, Some(_)) => Self::MySQL,
            (None, None) => Self::Generic,
        }
    }

    /// Turn `Auto` into a concrete dialect.
    pub fn resolve(self, content: &str) -> Self {
        match self {
            Self::Auto => Self::detect(content),
            other => other,
        }
    }
}
