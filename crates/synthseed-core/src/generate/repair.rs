//! # Row Repair
//!
//! Normalizes parsed generator output into rows that can be inserted:
//! UUID keys are minted locally, timestamps are rewritten to a canonical
//! ISO-8601 form (an explicit null on a nullable column stays null), hallucinated columns are dropped and missing columns are
//! filled with null. Every repaired row has exactly the table's columns, in
//! column order.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::Value;

use crate::error::{Result, SynthSeedError};
use crate::generate::dataset::Row;
use crate::llm::prompt::UUID_PLACEHOLDER;
use crate::schema::types::SchemaColumn;

/// Naive layouts accepted for timestamp columns, tried in order.
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
];

/// Repair every element of a parsed JSON array.
pub fn repair_rows(table: &str, columns: &[SchemaColumn], items: Vec<Value>) -> Result<Vec<Row>> {
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(map) => Ok(repair_row(table, columns, map)),
            other => Err(SynthSeedError::Validation {
                table: table.to_string(),
                message: format!("element {} is not an object: {}", i, other),
            }),
        })
        .collect()
}

/// Repair one generated object into a row with exactly `columns` as keys.
pub fn repair_row(
    table: &str,
    columns: &[SchemaColumn],
    mut raw: serde_json::Map<String, Value>,
) -> Row {
    let mut row = Row::with_capacity(columns.len());

    for column in columns {
        let value = raw.remove(&column.name);
        let repaired = if column.is_uuid_type() {
            repair_uuid(column, value)
        } else if column.is_temporal_type() {
            repair_timestamp(column, value)
        } else {
            value.unwrap_or(Value::Null)
        };
        row.insert(column.name.clone(), repaired);
    }

    for extra in raw.keys() {
        tracing::debug!(table = table, column = %extra, "Dropping column not in schema");
    }

    row
}

fn repair_uuid(column: &SchemaColumn, value: Option<Value>) -> Value {
    let needs_fresh = column.is_primary_key()
        || match &value {
            None => true,
            Some(Value::String(s)) => s.is_empty() || s.eq_ignore_ascii_case(UUID_PLACEHOLDER),
            Some(Value::Null) => !column.nullable,
            Some(_) => false,
        };

    if needs_fresh {
        Value::String(uuid::Uuid::new_v4().to_string())
    } else {
        value.unwrap_or(Value::Null)
    }
}

fn repair_timestamp(column: &SchemaColumn, value: Option<Value>) -> Value {
    match value {
        Some(Value::Null) if column.nullable && !column.is_primary_key() => Value::Null,
        other => Value::String(canonical_timestamp(other.as_ref())),
    }
}

/// Parse a generated timestamp, falling back to the current time when it is
/// absent or unparsable. Output is `YYYY-MM-DDTHH:MM:SS.sssZ`.
pub fn canonical_timestamp(value: Option<&Value>) -> String {
    value
        .and_then(parse_timestamp)
        .unwrap_or_else(Utc::now)
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_timestamp_str(s.trim()),
        // Numbers are read as epoch milliseconds.
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

fn parse_timestamp_str(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(dt.with_timezone(&Utc));
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    fn users_columns() -> Vec<SchemaColumn> {
        vec![
            SchemaColumn::new("id", "uuid").primary_key(),
            SchemaColumn::new("email", "text").not_null(),
            SchemaColumn::new("created_at", "timestamp with time zone"),
        ]
    }

    fn object(v: Value) -> serde_json::Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_uuid_primary_keys_are_unique_and_real() {
        let items: Vec<Value> = (0..100)
            .map(|i| json!({"id": "uuid", "email": format!("u{}@example.com", i)}))
            .collect();

        let rows = repair_rows("users", &users_columns(), items).unwrap();
        assert_eq!(rows.len(), 100);

        let ids: HashSet<String> = rows
            .iter()
            .map(|r| r["id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids.len(), 100);
        for id in &ids {
            assert_ne!(id, UUID_PLACEHOLDER);
            assert!(uuid::Uuid::parse_str(id).is_ok());
        }
    }

    #[test]
    fn test_uuid_primary_key_replaced_even_when_plausible() {
        let given = "6f1c1e4e-7a43-4b4e-9a52-0d6f2d7c1e11";
        let row = repair_row("users", &users_columns(), object(json!({"id": given})));
        assert_ne!(row["id"], given);
    }

    #[test]
    fn test_uuid_foreign_key_values_are_kept() {
        let columns = vec![
            SchemaColumn::new("id", "uuid").primary_key(),
            SchemaColumn::new("author_id", "uuid").references("users", "id"),
        ];
        let author = "6f1c1e4e-7a43-4b4e-9a52-0d6f2d7c1e11";

        let kept = repair_row("posts", &columns, object(json!({"author_id": author})));
        assert_eq!(kept["author_id"], author);

        let nulled = repair_row("posts", &columns, object(json!({"author_id": null})));
        assert!(nulled["author_id"].is_null());

        let placeholder = repair_row("posts", &columns, object(json!({"author_id": "UUID"})));
        assert!(uuid::Uuid::parse_str(placeholder["author_id"].as_str().unwrap()).is_ok());

        let missing = repair_row("posts", &columns, object(json!({})));
        assert!(uuid::Uuid::parse_str(missing["author_id"].as_str().unwrap()).is_ok());
    }

    #[test]
    fn test_unparsable_timestamp_becomes_valid_iso() {
        let row = repair_row(
            "users",
            &users_columns(),
            object(json!({"created_at": "sometime last week"})),
        );

        let ts = row["created_at"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(ts).is_ok());
        assert!(ts.ends_with('Z'));
    }

    #[test]
    fn test_timestamp_formats_are_canonicalized() {
        let cases = [
            (json!("2024-03-05T10:20:30Z"), "2024-03-05T10:20:30.000Z"),
            (json!("2024-03-05T12:20:30+02:00"), "2024-03-05T10:20:30.000Z"),
            (json!("2024-03-05 10:20:30"), "2024-03-05T10:20:30.000Z"),
            (json!("2024-03-05 10:20:30.123456"), "2024-03-05T10:20:30.123Z"),
            (json!("2024-03-05T10:20:30"), "2024-03-05T10:20:30.000Z"),
            (json!("2024-03-05"), "2024-03-05T00:00:00.000Z"),
            (json!(1709634030000i64), "2024-03-05T10:20:30.000Z"),
        ];

        for (input, expected) in cases {
            assert_eq!(canonical_timestamp(Some(&input)), expected, "input: {}", input);
        }
    }

    #[test]
    fn test_missing_timestamp_is_now() {
        let before = Utc::now();
        let ts = canonical_timestamp(None);
        let parsed = DateTime::parse_from_rfc3339(&ts).unwrap();
        // Millisecond truncation can put the result just before `before`.
        assert!(parsed >= before - chrono::Duration::milliseconds(1));
    }

    #[test]
    fn test_null_timestamp_kept_only_on_nullable_column() {
        let columns = vec![
            SchemaColumn::new("id", "uuid").primary_key(),
            SchemaColumn::new("deleted_at", "timestamp with time zone"),
            SchemaColumn::new("created_at", "timestamp with time zone").not_null(),
        ];

        let row = repair_row(
            "users",
            &columns,
            object(json!({"deleted_at": null, "created_at": null})),
        );

        assert!(row["deleted_at"].is_null());
        let created = row["created_at"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(created).is_ok());

        // An absent nullable column is still filled in.
        let missing = repair_row("users", &columns, object(json!({})));
        assert!(missing["deleted_at"].is_string());
    }

    #[test]
    fn test_hallucinated_columns_dropped_and_missing_filled() {
        let row = repair_row(
            "users",
            &users_columns(),
            object(json!({"email": "a@b.com", "favorite_color": "teal"})),
        );

        let keys: Vec<&str> = row.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["id", "email", "created_at"]);
        assert_eq!(row["email"], "a@b.com");
        assert!(!row.contains_key("favorite_color"));
    }

    #[test]
    fn test_missing_plain_column_is_null() {
        let row = repair_row("users", &users_columns(), object(json!({})));
        assert!(row["email"].is_null());
    }

    #[test]
    fn test_non_object_element_fails() {
        let err = repair_rows("users", &users_columns(), vec![json!({}), json!(42)]).unwrap_err();
        assert!(matches!(err, SynthSeedError::Validation { .. }));
        assert!(err.to_string().contains("element 1"));
    }
}
