use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

use crate::schema::analyze::SchemaAnalysis;

/// A directed graph representing table dependencies via foreign keys.
/// Edges point from dependent table to referenced table (child → parent).
pub struct DependencyGraph {
    pub graph: DiGraph<String, EdgeInfo>,
    pub node_indices: HashMap<String, NodeIndex>,
}

/// Information about an edge (foreign key relationship).
#[derive(Debug, Clone)]
pub struct EdgeInfo {
    /// FK column in the dependent table
    pub column: String,
    /// Referenced column in the parent table
    pub foreign_column: String,
}

impl DependencyGraph {
    /// Build a dependency graph from an analyzed schema.
    /// Each table becomes a node, each resolved FK becomes a directed edge from child to parent.
    pub fn from_analysis(analysis: &SchemaAnalysis) -> Self {
        let mut graph = DiGraph::new();
        let mut node_indices = HashMap::new();

        for table_name in analysis.tables.keys() {
            let idx = graph.add_node(table_name.clone());
            node_indices.insert(table_name.clone(), idx);
        }

        for (table_name, table) in &analysis.tables {
            for dep in &table.dependencies {
                if let (Some(&from_idx), Some(&to_idx)) =
                    (node_indices.get(table_name), node_indices.get(&dep.table))
                {
                    graph.add_edge(
                        from_idx,
                        to_idx,
                        EdgeInfo {
                            column: dep.column.clone(),
                            foreign_column: dep.foreign_column.clone(),
                        },
                    );
                }
            }
        }

        Self {
            graph,
            node_indices,
        }
    }

    /// Groups of tables that reference each other in a cycle, including
    /// self-referencing tables. Each group is sorted by name.
    pub fn cycle_groups(&self) -> Vec<Vec<String>> {
        let mut groups: Vec<Vec<String>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| {
                scc.len() > 1 || self.graph.contains_edge(scc[0], scc[0])
            })
            .map(|scc| {
                let mut names: Vec<String> =
                    scc.iter().map(|&idx| self.table_name(idx).to_string()).collect();
                names.sort();
                names
            })
            .collect();
        groups.sort();
        groups
    }

    pub fn has_cycles(&self) -> bool {
        !self.cycle_groups().is_empty()
    }

    /// Get the table name for a node index.
    pub fn table_name(&self, idx: NodeIndex) -> &str {
        &self.graph[idx]
    }

    /// Get node index for a table name.
    pub fn node_index(&self, table_name: &str) -> Option<NodeIndex> {
        self.node_indices.get(table_name).copied()
    }

    pub fn table_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::analyze::analyze_schema;
    use crate::schema::types::*;

    fn make_test_schema() -> Vec<SchemaTable> {
        vec![
            SchemaTable::new("users")
                .with_column(SchemaColumn::new("id", "integer").primary_key()),
            SchemaTable::new("orders")
                .with_column(SchemaColumn::new("id", "integer").primary_key())
                .with_column(SchemaColumn::new("user_id", "integer").references("users", "id")),
            SchemaTable::new("order_items")
                .with_column(SchemaColumn::new("id", "integer").primary_key())
                .with_column(SchemaColumn::new("order_id", "integer").references("orders", "id")),
        ]
    }

    #[test]
    fn test_build_graph() {
        let analysis = analyze_schema(&make_test_schema());
        let graph = DependencyGraph::from_analysis(&analysis);

        assert_eq!(graph.table_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        assert!(!graph.has_cycles());
    }

    #[test]
    fn test_cycle_groups() {
        let schema = vec![
            SchemaTable::new("a").with_column(SchemaColumn::new("b_id", "integer").references("b", "id")),
            SchemaTable::new("b").with_column(SchemaColumn::new("a_id", "integer").references("a", "id")),
            SchemaTable::new("categories")
                .with_column(SchemaColumn::new("id", "integer").primary_key())
                .with_column(SchemaColumn::new("parent_id", "integer").references("categories", "id")),
            SchemaTable::new("standalone"),
        ];
        let graph = DependencyGraph::from_analysis(&analyze_schema(&schema));

        assert_eq!(
            graph.cycle_groups(),
            vec![
                vec!["a".to_string(), "b".to_string()],
                vec!["categories".to_string()],
            ]
        );
    }
}
