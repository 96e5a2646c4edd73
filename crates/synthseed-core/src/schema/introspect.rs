use crate::error::{Result, SynthSeedError};
use crate::schema::types::{DatabaseType, SchemaTable};

/// Trait for fetching a live database's schema.
/// Each database backend implements this to list tables with key-annotated columns.
pub trait SchemaSource: Send + Sync {
    /// Fetch every table, in a stable listing order.
    fn fetch_schema(&self) -> impl std::future::Future<Output = Result<Vec<SchemaTable>>>;
}

/// Determine the database type from a connection URL.
pub fn database_type_from_url(url: &str) -> Result<DatabaseType> {
    let scheme = url.split("://").next().unwrap_or("");
    match scheme {
        "postgres" | "postgresql" => Ok(DatabaseType::PostgreSQL),
        "sqlite" | "file" => Ok(DatabaseType::SQLite),
        other => Err(SynthSeedError::UnsupportedDatabase {
            scheme: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_type_from_url() {
        assert_eq!(
            database_type_from_url("postgres://localhost/app").unwrap(),
            DatabaseType::PostgreSQL
        );
        assert_eq!(
            database_type_from_url("postgresql://u:p@h/db").unwrap(),
            DatabaseType::PostgreSQL
        );
        assert_eq!(
            database_type_from_url("sqlite://dev.db").unwrap(),
            DatabaseType::SQLite
        );
    }

    #[test]
    fn test_database_type_from_url_unsupported() {
        let err = database_type_from_url("mysql://localhost/app").unwrap_err();
        assert!(matches!(err, SynthSeedError::UnsupportedDatabase { ref scheme } if scheme == "mysql"));
    }
}
