//! Tree Renderers
//!
//! Turns a materialized call tree into text or JSON for terminals, files,
//! and editor clients.

use std::io::Result;

use crate::domain::calltree::CallTreeItem;
use crate::ports::TreeExporter;

pub struct TreeRenderer;

impl TreeRenderer {
    /// Render the tree as indented text, one node per line.
    pub fn to_text(tree: &CallTreeItem) -> String {
        let mut lines = Vec::new();
        Self::render_node(tree, 0, &mut lines);
        lines.join("\n")
    }

    fn render_node(node: &CallTreeItem, depth: usize, lines: &mut Vec<String>) {
        lines.push(format!("{}{}", "  ".repeat(depth), node.label));
        for child in &node.children {
            Self::render_node(child, depth + 1, lines);
        }
    }
}

/// Writes the indented text rendering to a file.
pub struct TextTreeExporter;

impl TreeExporter for TextTreeExporter {
    fn export(&self, tree: &CallTreeItem, path: &str) -> Result<()> {
        let mut content = TreeRenderer::to_text(tree);
        content.push('\n');
        std::fs::write(path, content)
    }
}

/// Writes the tree as pretty-printed JSON.
pub struct JsonTreeExporter;

impl TreeExporter for JsonTreeExporter {
    fn export(&self, tree: &CallTreeItem, path: &str) -> Result<()> {
        let json = serde_json::to_string_pretty(tree)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(path, json)
    }
}
