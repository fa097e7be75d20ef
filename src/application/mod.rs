use rayon::prelude::*;
use serde_json::Value;

use crate::domain::calltree::{annotate_root, build_tree_with_limit, max_depth};
use crate::ports::{CallGraphBuilder, TreeExporter};

pub struct AnalyzeUsecase<'a> {
    pub builder: &'a dyn CallGraphBuilder,
    pub exporter: &'a dyn TreeExporter,
}

impl<'a> AnalyzeUsecase<'a> {
    /// Build the graph, materialize the tree rooted at `root`, annotate the
    /// root with the chain depth, and hand the result to the exporter.
    pub fn run(
        &self,
        ast: &Value,
        root: &str,
        depth_limit: usize,
        export_path: &str,
    ) -> std::io::Result<()> {
        let graph = self.builder.build_call_graph(ast);
        let mut tree = build_tree_with_limit(root, &graph, depth_limit);
        annotate_root(&mut tree, max_depth(root, &graph));
        self.exporter.export(&tree, export_path)
    }
}

/// Per-file result of a batch run.
#[derive(Debug)]
pub struct FileSummary {
    pub path: String,
    pub defs: usize,
    pub edges: usize,
    pub entry_candidates: Vec<String>,
}

/// Analyze many dumped ASTs in parallel and summarize each file. Files are
/// independent (no cross-file resolution), so this is a plain fan-out.
pub fn summarize_batch(builder: &(dyn CallGraphBuilder + Sync), inputs: &[(String, Value)]) -> Vec<FileSummary> {
    let mut summaries: Vec<FileSummary> = inputs
        .par_iter()
        .map(|(path, ast)| {
            let graph = builder.build_call_graph(ast);
            FileSummary {
                path: path.clone(),
                defs: graph.defs.len(),
                edges: graph.edge_count(),
                entry_candidates: graph.entry_candidates(),
            }
        })
        .collect();
    summaries.sort_by(|a, b| a.path.cmp(&b.path));
    summaries
}
