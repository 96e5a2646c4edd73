//! Column-name heuristics that steer the generator toward realistic values.

use crate::schema::types::SchemaColumn;

/// A generation hint for one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnHint {
    pub column: String,
    pub hint: &'static str,
}

/// Ordered (name fragment, hint) rules; the first matching fragment wins.
const HINT_RULES: &[(&str, &str)] = &[
    (
        "status",
        "use realistic business statuses such as active, pending, completed or cancelled",
    ),
    ("email", "use unique, realistic email addresses"),
    ("phone", "use realistically formatted phone numbers"),
    ("amount", "use positive decimal numbers"),
    ("price", "use positive decimal numbers"),
    ("description", "write 1-2 sentences of natural prose"),
    ("bio", "write 1-2 sentences of natural prose"),
];

/// Hint for a single column name (case-insensitive substring match).
pub fn hint_for(column_name: &str) -> Option<&'static str> {
    let lower = column_name.to_lowercase();
    HINT_RULES
        .iter()
        .find(|(fragment, _)| lower.contains(fragment))
        .map(|(_, hint)| *hint)
}

/// Hints for every column that matches a rule; other columns are skipped.
pub fn column_hints(columns: &[SchemaColumn]) -> Vec<ColumnHint> {
    columns
        .iter()
        .filter_map(|c| {
            hint_for(&c.name).map(|hint| ColumnHint {
                column: c.name.clone(),
                hint,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hint_matching_is_case_insensitive_substring() {
        assert!(hint_for("order_status").unwrap().contains("statuses"));
        assert!(hint_for("ContactEmail").unwrap().contains("email"));
        assert!(hint_for("mobile_phone").unwrap().contains("phone"));
        assert!(hint_for("total_amount").unwrap().contains("positive decimal"));
        assert!(hint_for("UNIT_PRICE").unwrap().contains("positive decimal"));
        assert!(hint_for("short_description").unwrap().contains("sentences"));
        assert!(hint_for("author_bio").unwrap().contains("sentences"));
    }

    #[test]
    fn test_unmatched_columns_get_no_hint() {
        assert_eq!(hint_for("title"), None);
        assert_eq!(hint_for("created_at"), None);
    }

    #[test]
    fn test_column_hints_only_for_matches() {
        let columns = vec![
            SchemaColumn::new("id", "uuid"),
            SchemaColumn::new("email", "text"),
            SchemaColumn::new("status", "text"),
        ];
        let hints = column_hints(&columns);

        let names: Vec<&str> = hints.iter().map(|h| h.column.as_str()).collect();
        assert_eq!(names, vec!["email", "status"]);
    }
}
