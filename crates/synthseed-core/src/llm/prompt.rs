//! # Prompt Templates
//!
//! Builds the row-generation prompt for one batch. The prompt includes a
//! compact DDL of the target table, column hints, the sampled foreign-key
//! context, and the exact number of rows to return as a JSON array.

use crate::generate::foreign_key::ForeignKeyContext;
use crate::generate::hints::ColumnHint;
use crate::schema::analyze::TableModel;

/// Placeholder the model is told to emit for generated UUID columns.
pub const UUID_PLACEHOLDER: &str = "uuid";

/// Generate the prompt for one batch of `count` rows.
pub fn row_generation_prompt(
    table: &TableModel,
    hints: &[ColumnHint],
    context: &ForeignKeyContext,
    count: usize,
) -> String {
    let hint_lines = if hints.is_empty() {
        "- (none)".to_string()
    } else {
        hints
            .iter()
            .map(|h| format!("- {}: {}", h.column, h.hint))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        r#"You are generating realistic mock data for a relational database.

Generate exactly {count} rows for the table `{table}`.

Table definition:
```sql
{ddl}
```

Column guidance:
{hint_lines}

Foreign key values (every foreign key column MUST use one of these values):
{context}

Rules:
- Return ONLY a JSON array of {count} objects with no surrounding text.
- Each object must have exactly the columns of `{table}` as keys.
- For uuid primary keys write the string "{placeholder}"; it is replaced with a real UUID.
- Write timestamps and dates as ISO-8601 strings.
- Use null only for nullable columns.

Example of the expected shape:
[
  {{"column_a": "value", "column_b": 42}}
]"#,
        count = count,
        table = table.name,
        ddl = table_to_compact_ddl(table),
        hint_lines = hint_lines,
        context = context.render(),
        placeholder = UUID_PLACEHOLDER,
    )
}

/// Build a compact CREATE TABLE summary: column names, types, nullability,
/// defaults, the primary key and foreign keys.
pub fn table_to_compact_ddl(table: &TableModel) -> String {
    let mut ddl = format!("CREATE TABLE {} (\n", table.name);

    let mut col_lines = Vec::new();
    for column in &table.columns {
        let mut line = format!("  {} {}", column.name, column.data_type);
        if !column.nullable {
            line.push_str(" NOT NULL");
        }
        if let Some(ref default) = column.default {
            line.push_str(&format!(" DEFAULT {}", default));
        }
        col_lines.push(line);
    }

    if let Some(pk) = &table.primary_key {
        col_lines.push(format!("  PRIMARY KEY ({})", pk.name));
    }

    for dep in &table.dependencies {
        col_lines.push(format!(
            "  FOREIGN KEY ({}) REFERENCES {}({})",
            dep.column, dep.table, dep.foreign_column,
        ));
    }

    ddl.push_str(&col_lines.join(",\n"));
    ddl.push_str("\n);");
    ddl
}
