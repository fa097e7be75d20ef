use serde::{Deserialize, Serialize};

use crate::domain::callgraph::{CallGraph, DefKind};
use crate::domain::calltree::{CallTreeItem, ExpandState, ItemKind};

#[derive(Debug, Serialize, Deserialize)]
pub struct TreeDto {
    pub label: String,
    pub state: String,
    pub kind: String,
    #[serde(default)]
    pub children: Vec<TreeDto>,
}

impl From<&CallTreeItem> for TreeDto {
    fn from(item: &CallTreeItem) -> Self {
        let state = match item.state {
            ExpandState::Collapsed => "collapsed",
            ExpandState::Expanded => "expanded",
            ExpandState::None => "none",
        };
        let kind = match item.kind {
            ItemKind::Function => "function",
            ItemKind::Method => "method",
            ItemKind::Exception => "exception",
        };
        TreeDto {
            label: item.label.clone(),
            state: state.to_string(),
            kind: kind.to_string(),
            children: item.children.iter().map(TreeDto::from).collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GraphDto {
    pub nodes: Vec<NodeDto>,
    pub edges: Vec<EdgeDto>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NodeDto {
    pub name: String,
    pub kind: String,
    pub line: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EdgeDto {
    pub from: String,
    pub to: String,
    pub external: bool,
}

impl From<&CallGraph> for GraphDto {
    fn from(graph: &CallGraph) -> Self {
        let mut nodes: Vec<NodeDto> = graph
            .defs
            .iter()
            .map(|(name, def)| NodeDto {
                name: name.clone(),
                kind: match def.kind {
                    DefKind::Function => "function".to_string(),
                    DefKind::Method => "method".to_string(),
                },
                line: def.start_line,
            })
            .collect();
        nodes.sort_by(|a, b| a.name.cmp(&b.name));

        let mut edges = Vec::new();
        let mut callers: Vec<&String> = graph.calls.keys().collect();
        callers.sort();
        for caller in callers {
            for callee in &graph.calls[caller] {
                edges.push(EdgeDto {
                    from: caller.clone(),
                    to: callee.clone(),
                    external: !graph.is_internal(callee),
                });
            }
        }

        GraphDto { nodes, edges }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::callgraph::GraphBuilder;
    use crate::domain::calltree::build_tree;
    use serde_json::json;

    fn sample_graph() -> CallGraph {
        GraphBuilder::build(&json!({"type": "Module", "body": [
            {"type": "FunctionDef", "name": "a", "lineno": 1, "body": [
                {"type": "Expr", "value": {"type": "Call", "func": {"type": "Name", "id": "b"}}},
                {"type": "Expr", "value": {"type": "Call", "func": {"type": "Name", "id": "print"}}},
            ]},
            {"type": "FunctionDef", "name": "b", "lineno": 4, "body": []},
        ]}))
    }

    #[test]
    fn test_tree_dto_mapping() {
        let graph = sample_graph();
        let tree = build_tree("a", &graph);
        let dto = TreeDto::from(&tree);

        assert_eq!(dto.label, "a");
        assert_eq!(dto.state, "collapsed");
        assert_eq!(dto.kind, "function");
        assert_eq!(dto.children.len(), 2);
        assert_eq!(dto.children[1].state, "none");
        assert_eq!(dto.children[1].kind, "method");
    }

    #[test]
    fn test_graph_dto_mapping() {
        let dto = GraphDto::from(&sample_graph());

        assert_eq!(dto.nodes.len(), 2);
        assert_eq!(dto.nodes[0].name, "a");
        assert_eq!(dto.nodes[0].line, Some(1));

        assert_eq!(dto.edges.len(), 2);
        let external: Vec<&EdgeDto> = dto.edges.iter().filter(|e| e.external).collect();
        assert_eq!(external.len(), 1);
        assert_eq!(external[0].to, "print");
    }
}
