// Infrastructure implementations for calltrace.

pub mod concurrency;
pub mod config;
pub mod dump_cache;
pub mod parser_runner;

use crate::domain::callgraph::{CallGraph, GraphBuilder};
use crate::ports::CallGraphBuilder;
use serde_json::Value;

/// Builds the call graph from a ready-made AST document via the in-process
/// walker. The default engine behind the `CallGraphBuilder` port.
pub struct AstGraphBuilder;

impl CallGraphBuilder for AstGraphBuilder {
    fn build_call_graph(&self, ast: &Value) -> CallGraph {
        GraphBuilder::build(ast)
    }
}
