use crate::domain::callgraph::CallGraph;
use crate::domain::calltree::CallTreeItem;
use serde_json::Value;

pub mod dot_exporter;
pub mod tree_renderer;

pub trait CallGraphBuilder {
    fn build_call_graph(&self, ast: &Value) -> CallGraph;
}

pub trait TreeExporter {
    fn export(&self, tree: &CallTreeItem, path: &str) -> std::io::Result<()>;
}

pub trait GraphExporter {
    fn export(&self, graph: &CallGraph, path: &str) -> std::io::Result<()>;
}
