use indexmap::IndexMap;
use serde::Serialize;

/// One generated row. Keys follow the table's column order, which keeps
/// insert statements and JSON output deterministic.
pub type Row = IndexMap<String, serde_json::Value>;

/// Rows generated so far, keyed by table, in generation order.
///
/// Owned by the orchestrator: the table currently being produced is the only
/// one written, one accepted batch at a time.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct GeneratedDataSet {
    tables: IndexMap<String, Vec<Row>>,
}

impl GeneratedDataSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows for a table; empty if it has not been generated.
    pub fn rows(&self, table: &str) -> &[Row] {
        self.tables.get(table).map(|r| r.as_slice()).unwrap_or(&[])
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.rows(table).len()
    }

    pub fn total_rows(&self) -> usize {
        self.tables.values().map(|r| r.len()).sum()
    }

    /// Append a batch to a table, registering the table on first use.
    pub fn extend(&mut self, table: &str, rows: Vec<Row>) {
        self.tables.entry(table.to_string()).or_default().extend(rows);
    }

    /// Register a table with no rows so it shows up in iteration order.
    pub fn ensure_table(&mut self, table: &str) {
        self.tables.entry(table.to_string()).or_default();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<Row>)> {
        self.tables.iter()
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(|k| k.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.total_rows() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(id: i64) -> Row {
        let mut r = Row::new();
        r.insert("id".to_string(), json!(id));
        r
    }

    #[test]
    fn test_extend_accumulates_in_order() {
        let mut data = GeneratedDataSet::new();
        data.extend("users", vec![row(1), row(2)]);
        data.extend("users", vec![row(3)]);

        let ids: Vec<i64> = data
            .rows("users")
            .iter()
            .map(|r| r["id"].as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(data.total_rows(), 3);
    }

    #[test]
    fn test_unknown_table_is_empty() {
        let data = GeneratedDataSet::new();
        assert!(data.rows("ghost").is_empty());
        assert!(data.is_empty());
    }

    #[test]
    fn test_serializes_as_plain_map() {
        let mut data = GeneratedDataSet::new();
        data.ensure_table("posts");
        data.extend("users", vec![row(7)]);

        let value = serde_json::to_value(&data).unwrap();
        assert_eq!(value, json!({"posts": [], "users": [{"id": 7}]}));
    }
}
