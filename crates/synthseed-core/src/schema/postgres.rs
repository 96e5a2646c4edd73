use indexmap::IndexMap;
use sqlx::postgres::PgPool;
use sqlx::Row;

use crate::error::{Result, SynthSeedError};
use crate::schema::introspect::SchemaSource;
use crate::schema::types::*;

pub struct PostgresSchemaSource {
    pool: PgPool,
    schema_name: String,
}

/// A PRIMARY KEY / FOREIGN KEY usage of one column.
struct KeyUsage {
    kind: ConstraintKind,
    foreign_table: Option<String>,
    foreign_column: Option<String>,
}

impl PostgresSchemaSource {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            schema_name: "public".to_string(),
        }
    }

    pub fn with_schema(pool: PgPool, schema_name: String) -> Self {
        Self { pool, schema_name }
    }

    async fn fetch_tables(&self) -> Result<IndexMap<String, SchemaTable>> {
        let query = "SELECT table_name FROM information_schema.tables WHERE table_schema = $1 AND table_type = 'BASE TABLE' ORDER BY table_name";
        let rows = sqlx::query(query)
            .bind(&self.schema_name)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| SynthSeedError::SchemaFetch {
                query: "fetch tables".to_string(),
                source: e,
            })?;

        let mut tables = IndexMap::new();
        for row in rows {
            let name: String = row.get("table_name");
            tables.insert(name.clone(), SchemaTable::new(name));
        }
        Ok(tables)
    }

    async fn fetch_key_usages(&self) -> Result<IndexMap<(String, String), KeyUsage>> {
        let query = r#"
            SELECT
                kcu.table_name,
                kcu.column_name,
                tc.constraint_type,
                ccu.table_name AS foreign_table,
                ccu.column_name AS foreign_column
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
                ON tc.constraint_name = kcu.constraint_name
                AND tc.table_schema = kcu.table_schema
            LEFT JOIN information_schema.constraint_column_usage ccu
                ON tc.constraint_type = 'FOREIGN KEY'
                AND tc.constraint_name = ccu.constraint_name
                AND tc.table_schema = ccu.table_schema
            WHERE tc.table_schema = $1
                AND tc.constraint_type IN ('PRIMARY KEY', 'FOREIGN KEY')
            ORDER BY kcu.table_name, kcu.ordinal_position
        "#;

        let rows = sqlx::query(query)
            .bind(&self.schema_name)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| SynthSeedError::SchemaFetch {
                query: "fetch key constraints".to_string(),
                source: e,
            })?;

        let mut usages: IndexMap<(String, String), KeyUsage> = IndexMap::new();
        for row in rows {
            let table_name: String = row.get("table_name");
            let column_name: String = row.get("column_name");
            let constraint_type: String = row.get("constraint_type");
            let foreign_table: Option<String> = row.get("foreign_table");
            let foreign_column: Option<String> = row.get("foreign_column");

            let Some(kind) = ConstraintKind::parse(&constraint_type) else {
                continue;
            };

            // PK + FK on one column (1:1 extension tables): FOREIGN KEY wins.
            let key = (table_name, column_name);
            match usages.get(&key) {
                Some(existing) if existing.kind == ConstraintKind::ForeignKey => {}
                _ => {
                    usages.insert(
                        key,
                        KeyUsage {
                            kind,
                            foreign_table,
                            foreign_column,
                        },
                    );
                }
            }
        }

        Ok(usages)
    }

    async fn fetch_columns(
        &self,
        tables: &mut IndexMap<String, SchemaTable>,
        usages: &IndexMap<(String, String), KeyUsage>,
    ) -> Result<()> {
        let query = r#"
            SELECT
                c.table_name,
                c.column_name,
                c.data_type,
                c.udt_name,
                c.is_nullable,
                c.column_default
            FROM information_schema.columns c
            WHERE c.table_schema = $1
            ORDER BY c.table_name, c.ordinal_position
        "#;

        let rows = sqlx::query(query)
            .bind(&self.schema_name)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| SynthSeedError::SchemaFetch {
                query: "fetch columns".to_string(),
                source: e,
            })?;

        for row in rows {
            let table_name: String = row.get("table_name");
            let column_name: String = row.get("column_name");
            let data_type: String = row.get("data_type");
            let udt_name: String = row.get("udt_name");
            let is_nullable: String = row.get("is_nullable");
            let column_default: Option<String> = row.get("column_default");

            // Enums report USER-DEFINED; the udt name is what the LLM can reason about.
            let declared = if data_type == "USER-DEFINED" {
                udt_name
            } else {
                data_type
            };

            let mut column = SchemaColumn::new(column_name.clone(), declared);
            column.nullable = is_nullable == "YES";
            column.default = column_default;

            if let Some(usage) = usages.get(&(table_name.clone(), column_name)) {
                column.constraint = Some(usage.kind);
                if usage.kind == ConstraintKind::ForeignKey {
                    column.foreign_table = usage.foreign_table.clone();
                    column.foreign_column = usage.foreign_column.clone();
                }
            }

            if let Some(table) = tables.get_mut(&table_name) {
                table.columns.push(column);
            }
        }

        Ok(())
    }
}

impl SchemaSource for PostgresSchemaSource {
    async fn fetch_schema(&self) -> Result<Vec<SchemaTable>> {
        let mut tables = self.fetch_tables().await?;
        let usages = self.fetch_key_usages().await?;
        self.fetch_columns(&mut tables, &usages).await?;

        Ok(tables.into_values().collect())
    }
}
