use serde::{Deserialize, Serialize};
use std::fmt;

/// One table as reported by a schema source, columns in ordinal order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaTable {
    pub table: String,
    pub columns: Vec<SchemaColumn>,
}

impl SchemaTable {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
        }
    }

    /// Builder-style column append, mostly for fixtures.
    pub fn with_column(mut self, column: SchemaColumn) -> Self {
        self.columns.push(column);
        self
    }
}

/// A single column annotated with its key constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaColumn {
    pub name: String,
    /// Declared type exactly as the database reports it (`uuid`, `character varying`, ...).
    #[serde(rename = "type")]
    pub data_type: String,
    pub nullable: bool,
    pub default: Option<String>,
    pub constraint: Option<ConstraintKind>,
    pub foreign_table: Option<String>,
    pub foreign_column: Option<String>,
}

impl SchemaColumn {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            default: None,
            constraint: None,
            foreign_table: None,
            foreign_column: None,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.constraint = Some(ConstraintKind::PrimaryKey);
        self.nullable = false;
        self
    }

    pub fn references(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.constraint = Some(ConstraintKind::ForeignKey);
        self.foreign_table = Some(table.into());
        self.foreign_column = Some(column.into());
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn is_primary_key(&self) -> bool {
        self.constraint == Some(ConstraintKind::PrimaryKey)
    }

    pub fn is_foreign_key(&self) -> bool {
        self.constraint == Some(ConstraintKind::ForeignKey)
    }

    /// `uuid` or `guid` anywhere in the declared type.
    pub fn is_uuid_type(&self) -> bool {
        let t = self.data_type.to_lowercase();
        t.contains("uuid") || t.contains("guid")
    }

    /// Timestamps, datetimes and plain dates.
    pub fn is_temporal_type(&self) -> bool {
        let t = self.data_type.to_lowercase();
        t.contains("timestamp") || t.contains("date")
    }
}

/// Key constraint attached to a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstraintKind {
    #[serde(rename = "PRIMARY KEY")]
    PrimaryKey,
    #[serde(rename = "FOREIGN KEY")]
    ForeignKey,
}

impl ConstraintKind {
    /// Parse the `constraint_type` strings reported by information_schema.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "PRIMARY KEY" => Some(ConstraintKind::PrimaryKey),
            "FOREIGN KEY" => Some(ConstraintKind::ForeignKey),
            _ => None,
        }
    }
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintKind::PrimaryKey => write!(f, "PRIMARY KEY"),
            ConstraintKind::ForeignKey => write!(f, "FOREIGN KEY"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatabaseType {
    PostgreSQL,
    SQLite,
}

impl fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseType::PostgreSQL => write!(f, "PostgreSQL"),
            DatabaseType::SQLite => write!(f, "SQLite"),
        }
    }
}
