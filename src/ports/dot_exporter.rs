//! Call Graph DOT Exporter
//!
//! Exports the whole call graph as Graphviz DOT, styling definitions and
//! external references distinctly.

use std::collections::BTreeSet;
use std::io::Result;

use crate::domain::callgraph::{CallGraph, DefKind};
use crate::ports::GraphExporter;

pub struct DotExporter;

impl GraphExporter for DotExporter {
    fn export(&self, graph: &CallGraph, path: &str) -> Result<()> {
        std::fs::write(path, Self::to_dot(graph))
    }
}

impl DotExporter {
    /// Convert a call graph to a DOT string. Output is deterministic: nodes
    /// and edges are emitted in name order.
    pub fn to_dot(graph: &CallGraph) -> String {
        let mut lines = Vec::new();

        lines.push("digraph CallGraph {".to_string());
        lines.push("    rankdir=TB;".to_string());
        lines.push("    node [fontname=\"Helvetica\", fontsize=12];".to_string());
        lines.push("    edge [fontname=\"Helvetica\", fontsize=10];".to_string());
        lines.push("".to_string());

        // Definitions first, in name order.
        let mut def_names: Vec<&String> = graph.defs.keys().collect();
        def_names.sort();
        for name in &def_names {
            let (style, fill, border) = Self::def_style(graph.defs[*name].kind);
            lines.push(format!(
                "    \"{}\" [label=\"{}\", shape=box, style=\"{}\", fillcolor=\"{}\", color=\"{}\"];",
                Self::escape_label(name),
                Self::escape_label(name),
                style,
                fill,
                border
            ));
        }

        // External callees get dashed gray nodes.
        let mut externals: BTreeSet<&str> = BTreeSet::new();
        for callees in graph.calls.values() {
            for callee in callees {
                if !graph.is_internal(callee) {
                    externals.insert(callee);
                }
            }
        }
        for name in &externals {
            lines.push(format!(
                "    \"{}\" [label=\"{}\", shape=box, style=\"filled,dashed\", fillcolor=\"#6c7086\", color=\"#5c5f77\"];",
                Self::escape_label(name),
                Self::escape_label(name)
            ));
        }

        lines.push("".to_string());

        let mut callers: Vec<&String> = graph.calls.keys().collect();
        callers.sort();
        for caller in callers {
            for callee in &graph.calls[caller] {
                lines.push(format!(
                    "    \"{}\" -> \"{}\";",
                    Self::escape_label(caller),
                    Self::escape_label(callee)
                ));
            }
        }

        lines.push("}".to_string());

        lines.join("\n")
    }

    fn def_style(kind: DefKind) -> (&'static str, &'static str, &'static str) {
        match kind {
            DefKind::Function => ("filled", "#89b4fa", "#1e66f5"), // Blue
            DefKind::Method => ("filled", "#a6e3a1", "#40a02b"),   // Green
        }
    }

    fn escape_label(label: &str) -> String {
        label
            .replace('\\', "\\\\")
            .replace('"', "\\\"")
            .replace('\n', "\\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::callgraph::GraphBuilder;
    use serde_json::json;

    #[test]
    fn test_to_dot() {
        let ast = json!({"type": "Module", "body": [
            {"type": "FunctionDef", "name": "main", "body": [
                {"type": "Expr", "value": {"type": "Call", "func": {"type": "Name", "id": "helper"}}},
                {"type": "Expr", "value": {"type": "Call", "func": {"type": "Name", "id": "print"}}},
            ]},
            {"type": "FunctionDef", "name": "helper", "body": []},
        ]});
        let graph = GraphBuilder::build(&ast);

        let dot = DotExporter::to_dot(&graph);
        assert!(dot.contains("digraph CallGraph"));
        assert!(dot.contains("\"main\""));
        assert!(dot.contains("\"helper\""));
        assert!(dot.contains("\"main\" -> \"helper\";"));
        assert!(dot.contains("\"main\" -> \"print\";"));
        // External reference is dashed, internal ones are not.
        assert!(dot.contains("\"print\" [label=\"print\", shape=box, style=\"filled,dashed\""));
    }

    #[test]
    fn test_to_dot_is_deterministic() {
        let ast = json!({"type": "Module", "body": [
            {"type": "FunctionDef", "name": "a", "body": [
                {"type": "Expr", "value": {"type": "Call", "func": {"type": "Name", "id": "b"}}},
            ]},
            {"type": "FunctionDef", "name": "b", "body": []},
        ]});
        let graph = GraphBuilder::build(&ast);
        assert_eq!(DotExporter::to_dot(&graph), DotExporter::to_dot(&graph));
    }

    #[test]
    fn test_escape_label() {
        assert_eq!(DotExporter::escape_label("a\"b"), "a\\\"b");
    }
}
