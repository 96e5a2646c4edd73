use crate::graph::dag::DependencyGraph;
use crate::graph::topo::DroppedEdge;
use petgraph::visit::EdgeRef;

/// Output format for graph visualization.
pub enum GraphFormat {
    Mermaid,
    Dot,
}

/// Generate a visualization of the dependency graph.
///
/// Edges the resolver dropped while breaking a cycle are drawn dashed.
pub fn visualize(graph: &DependencyGraph, dropped: &[DroppedEdge], format: GraphFormat) -> String {
    match format {
        GraphFormat::Mermaid => generate_mermaid(graph, dropped),
        GraphFormat::Dot => generate_dot(graph, dropped),
    }
}

fn is_dropped(dropped: &[DroppedEdge], from: &str, to: &str) -> bool {
    dropped.iter().any(|d| d.from == from && d.to == to)
}

fn generate_mermaid(graph: &DependencyGraph, dropped: &[DroppedEdge]) -> String {
    let mut output = String::from("graph TD\n");

    for node in graph.graph.node_indices() {
        let name = graph.table_name(node);
        output.push_str(&format!("    {}[{}]\n", name, name));
    }

    output.push('\n');

    for edge in graph.graph.edge_references() {
        let from = graph.table_name(edge.source());
        let to = graph.table_name(edge.target());
        let label = &edge.weight().column;
        if is_dropped(dropped, from, to) {
            output.push_str(&format!("    {} -.->|{} (cycle)| {}\n", from, label, to));
        } else {
            output.push_str(&format!("    {} -->|{}| {}\n", from, label, to));
        }
    }

    if !dropped.is_empty() {
        output.push_str("\n    %% Dashed edges close a cycle and are not ordering guarantees\n");
    }

    output
}

fn generate_dot(graph: &DependencyGraph, dropped: &[DroppedEdge]) -> String {
    let mut output = String::from("digraph dependencies {\n");
    output.push_str("    rankdir=TB;\n");
    output.push_str("    node [shape=box, style=rounded];\n\n");

    for node in graph.graph.node_indices() {
        output.push_str(&format!("    \"{}\";\n", graph.table_name(node)));
    }

    for edge in graph.graph.edge_references() {
        let from = graph.table_name(edge.source());
        let to = graph.table_name(edge.target());
        let label = &edge.weight().column;
        if is_dropped(dropped, from, to) {
            output.push_str(&format!(
                "    \"{}\" -> \"{}\" [label=\"{} (cycle)\", style=dashed, color=red];\n",
                from, to, label
            ));
        } else {
            output.push_str(&format!(
                "    \"{}\" -> \"{}\" [label=\"{}\"];\n",
                from, to, label
            ));
        }
    }

    output.push_str("}\n");
    output
}
