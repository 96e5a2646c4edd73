use indexmap::IndexMap;
use sqlx::sqlite::SqlitePool;
use sqlx::Row;

use crate::error::{Result, SynthSeedError};
use crate::schema::introspect::SchemaSource;
use crate::schema::types::*;

pub struct SqliteSchemaSource {
    pool: SqlitePool,
}

impl SqliteSchemaSource {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn fetch_tables(&self) -> Result<IndexMap<String, SchemaTable>> {
        let query = "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name";
        let rows = sqlx::query(query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| SynthSeedError::SchemaFetch {
                query: "fetch tables".to_string(),
                source: e,
            })?;

        let mut tables = IndexMap::new();
        for row in rows {
            let name: String = row.get("name");
            tables.insert(name.clone(), SchemaTable::new(name));
        }
        Ok(tables)
    }

    /// Map of local column → (referenced table, referenced column).
    async fn fetch_foreign_keys(&self, table_name: &str) -> Result<IndexMap<String, (String, String)>> {
        let query = format!("PRAGMA foreign_key_list(\"{}\")", table_name.replace('"', "\"\""));
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| SynthSeedError::SchemaFetch {
                query: format!("PRAGMA foreign_key_list({})", table_name),
                source: e,
            })?;

        let mut fks = IndexMap::new();
        for row in &rows {
            let table: String = row.get("table");
            let from: String = row.get("from");
            // `to` is NULL when the FK targets the parent's implicit primary key.
            let to: Option<String> = row.get("to");
            fks.entry(from)
                .or_insert((table, to.unwrap_or_else(|| "rowid".to_string())));
        }
        Ok(fks)
    }

    async fn fetch_columns(&self, table: &mut SchemaTable) -> Result<()> {
        let foreign_keys = self.fetch_foreign_keys(&table.table).await?;

        let query = format!("PRAGMA table_info(\"{}\")", table.table.replace('"', "\"\""));
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| SynthSeedError::SchemaFetch {
                query: format!("PRAGMA table_info({})", table.table),
                source: e,
            })?;

        for row in rows {
            let name: String = row.get("name");
            let type_str: String = row.get("type");
            let notnull: i32 = row.get("notnull");
            let dflt_value: Option<String> = row.get("dflt_value");
            let pk: i32 = row.get("pk");

            let mut column = SchemaColumn::new(name.clone(), type_str);
            column.nullable = notnull == 0 && pk == 0;
            column.default = dflt_value;

            if let Some((ref_table, ref_column)) = foreign_keys.get(&name) {
                column.constraint = Some(ConstraintKind::ForeignKey);
                column.foreign_table = Some(ref_table.clone());
                column.foreign_column = Some(ref_column.clone());
            } else if pk > 0 {
                column.constraint = Some(ConstraintKind::PrimaryKey);
            }

            table.columns.push(column);
        }

        Ok(())
    }
}

impl SchemaSource for SqliteSchemaSource {
    async fn fetch_schema(&self) -> Result<Vec<SchemaTable>> {
        let mut tables = self.fetch_tables().await?;
        for table in tables.values_mut() {
            self.fetch_columns(table).await?;
        }

        Ok(tables.into_values().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_schema_reads_keys() {
        let pool = memory_pool().await;
        sqlx::raw_sql(
            "CREATE TABLE users (id TEXT PRIMARY KEY, email TEXT NOT NULL);
             CREATE TABLE posts (
                id INTEGER PRIMARY KEY,
                author_id TEXT NOT NULL REFERENCES users(id),
                title TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
             );",
        )
        .execute(&pool)
        .await
        .unwrap();

        let source = SqliteSchemaSource::new(pool);
        let tables = source.fetch_schema().await.unwrap();

        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].table, "posts");
        assert_eq!(tables[1].table, "users");

        let posts = &tables[0];
        let names: Vec<&str> = posts.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "author_id", "title", "created_at"]);
        assert!(posts.columns[0].is_primary_key());
        assert!(posts.columns[1].is_foreign_key());
        assert_eq!(posts.columns[1].foreign_table.as_deref(), Some("users"));
        assert_eq!(posts.columns[1].foreign_column.as_deref(), Some("id"));
        assert!(!posts.columns[1].nullable);
        assert!(posts.columns[2].nullable);
        assert!(posts.columns[3].default.is_some());

        let users = &tables[1];
        assert!(users.columns[0].is_primary_key());
        assert_eq!(users.columns[0].constraint, Some(ConstraintKind::PrimaryKey));
    }

    #[tokio::test]
    async fn test_fetch_schema_empty_database() {
        let pool = memory_pool().await;
        let source = SqliteSchemaSource::new(pool);
        let tables = source.fetch_schema().await.unwrap();
        assert!(tables.is_empty());
    }
}
