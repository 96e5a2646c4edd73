use indexmap::IndexMap;
use serde::Serialize;

/// Result of dependency resolution: an ordered list of table names
/// for generation and insertion (parents before children).
#[derive(Debug, Clone, Default, Serialize)]
pub struct InsertionOrder {
    /// Tables in the order they should be generated (parents first).
    pub tables: Vec<String>,
    /// Edges that pointed back into a table still being resolved. These
    /// dependencies are not guaranteed to be satisfied by `tables`.
    pub dropped_edges: Vec<DroppedEdge>,
}

/// A dependency edge skipped because it closed a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DroppedEdge {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    Unvisited,
    InProgress,
    Done,
}

/// Order tables so that each one comes after every table it depends on.
///
/// Depth-first, post-order. Roots are taken in the map's order and
/// neighbors in each dependency list's order, so ties between independent
/// tables follow the schema listing. An edge into a table that is still
/// `InProgress` is dropped (the first edge of a cycle wins), which means
/// cyclic schemas get a best-effort order rather than an error.
pub fn resolve_order(dependencies: &IndexMap<String, Vec<String>>) -> InsertionOrder {
    let mut state: IndexMap<&str, VisitState> = dependencies
        .keys()
        .map(|k| (k.as_str(), VisitState::Unvisited))
        .collect();
    let mut order = InsertionOrder::default();

    for table in dependencies.keys() {
        visit(table, dependencies, &mut state, &mut order);
    }

    order
}

fn visit<'a>(
    table: &'a str,
    dependencies: &'a IndexMap<String, Vec<String>>,
    state: &mut IndexMap<&'a str, VisitState>,
    order: &mut InsertionOrder,
) {
    match state.get(table) {
        Some(VisitState::Unvisited) => {}
        _ => return,
    }
    state.insert(table, VisitState::InProgress);

    for dep in dependencies.get(table).into_iter().flatten() {
        match state.get(dep.as_str()) {
            Some(VisitState::Unvisited) => visit(dep, dependencies, state, order),
            Some(VisitState::InProgress) => {
                tracing::debug!("Dropping cyclic dependency edge {} → {}", table, dep);
                order.dropped_edges.push(DroppedEdge {
                    from: table.to_string(),
                    to: dep.clone(),
                });
            }
            // Done, or not a table in this schema.
            _ => {}
        }
    }

    state.insert(table, VisitState::Done);
    order.tables.push(table.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deps(entries: &[(&str, &[&str])]) -> IndexMap<String, Vec<String>> {
        entries
            .iter()
            .map(|(t, d)| (t.to_string(), d.iter().map(|s| s.to_string()).collect()))
            .collect()
    }

    fn position(order: &InsertionOrder, table: &str) -> usize {
        order.tables.iter().position(|t| t == table).unwrap()
    }

    #[test]
    fn test_parent_before_child() {
        let order = resolve_order(&deps(&[("posts", &["users"]), ("users", &[])]));

        assert_eq!(order.tables, vec!["users", "posts"]);
        assert!(order.dropped_edges.is_empty());
    }

    #[test]
    fn test_chain_and_diamond() {
        let order = resolve_order(&deps(&[
            ("order_items", &["orders", "products"]),
            ("orders", &["users"]),
            ("products", &["categories"]),
            ("users", &[]),
            ("categories", &[]),
        ]));

        assert_eq!(order.tables.len(), 5);
        assert!(position(&order, "users") < position(&order, "orders"));
        assert!(position(&order, "orders") < position(&order, "order_items"));
        assert!(position(&order, "categories") < position(&order, "products"));
        assert!(position(&order, "products") < position(&order, "order_items"));
    }

    #[test]
    fn test_independent_tables_keep_listing_order() {
        let order = resolve_order(&deps(&[("zeta", &[]), ("alpha", &[]), ("mid", &[])]));
        assert_eq!(order.tables, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_mutual_cycle_terminates() {
        let order = resolve_order(&deps(&[("a", &["b"]), ("b", &["a"])]));

        assert_eq!(order.tables, vec!["b", "a"]);
        assert_eq!(
            order.dropped_edges,
            vec![DroppedEdge {
                from: "b".to_string(),
                to: "a".to_string()
            }]
        );
    }

    #[test]
    fn test_self_reference_is_dropped() {
        let order = resolve_order(&deps(&[("categories", &["categories"])]));

        assert_eq!(order.tables, vec!["categories"]);
        assert_eq!(order.dropped_edges.len(), 1);
    }

    #[test]
    fn test_three_cycle_contains_each_table_once() {
        let order = resolve_order(&deps(&[("a", &["b"]), ("b", &["c"]), ("c", &["a"]), ("d", &["a"])]));

        let mut sorted = order.tables.clone();
        sorted.sort();
        assert_eq!(sorted, vec!["a", "b", "c", "d"]);
        assert!(position(&order, "a") < position(&order, "d"));
    }

    #[test]
    fn test_unknown_dependency_is_skipped() {
        let order = resolve_order(&deps(&[("orders", &["ghost"])]));
        assert_eq!(order.tables, vec!["orders"]);
        assert!(order.dropped_edges.is_empty());
    }
}
