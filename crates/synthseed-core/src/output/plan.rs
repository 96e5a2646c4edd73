//! # Insert Plans
//!
//! Serializes a table's generated rows into a single multi-row `INSERT`
//! statement. Values are inlined as SQL literals because the executor runs
//! raw statements without bound parameters.

use serde::Serialize;

use crate::generate::dataset::{GeneratedDataSet, Row};

/// One table's rows as a single statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InsertPlan {
    pub table: String,
    pub statement: String,
    pub row_count: usize,
}

/// Build the insert plan for one table. Returns `None` for an empty batch.
///
/// Produces: `INSERT INTO "table" ("col1", "col2") VALUES (v1, v2), (v3, v4)`
/// with columns taken from the first row.
pub fn build_insert_plan(table: &str, rows: &[Row]) -> Option<InsertPlan> {
    let first = rows.first()?;
    let columns: Vec<&String> = first.keys().collect();

    let col_list = columns
        .iter()
        .map(|c| quote_identifier(c))
        .collect::<Vec<_>>()
        .join(", ");

    let mut sql = format!("INSERT INTO {} ({}) VALUES ", quote_identifier(table), col_list);

    for (i, row) in rows.iter().enumerate() {
        if i > 0 {
            sql.push_str(", ");
        }
        sql.push('(');
        for (j, col) in columns.iter().enumerate() {
            if j > 0 {
                sql.push_str(", ");
            }
            let literal = row
                .get(*col)
                .map(to_sql_literal)
                .unwrap_or_else(|| "NULL".to_string());
            sql.push_str(&literal);
        }
        sql.push(')');
    }

    Some(InsertPlan {
        table: table.to_string(),
        statement: sql,
        row_count: rows.len(),
    })
}

/// Build plans for every non-empty table, in the data set's order.
pub fn build_insert_plans(data: &GeneratedDataSet) -> Vec<InsertPlan> {
    data.iter()
        .filter_map(|(table, rows)| build_insert_plan(table, rows))
        .collect()
}

/// Render a JSON value as a SQL literal.
pub fn to_sql_literal(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "NULL".to_string(),
        serde_json::Value::Bool(true) => "TRUE".to_string(),
        serde_json::Value::Bool(false) => "FALSE".to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => format!("'{}'", s.replace('\'', "''")),
        json @ (serde_json::Value::Array(_) | serde_json::Value::Object(_)) => {
            format!("'{}'", json.to_string().replace('\'', "''"))
        }
    }
}

/// Quote a SQL identifier. Valid for both PostgreSQL and SQLite.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
