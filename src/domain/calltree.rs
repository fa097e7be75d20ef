//! Call Tree Materializer
//!
//! Expands the call graph into a display tree rooted at a chosen function.
//! Cycles collapse into a marked leaf; the ancestry set is scoped to the
//! current root-to-node path, so sibling branches expand independently.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::domain::callgraph::CallGraph;

/// Recursion ceiling applied when the caller does not choose one. Deep
/// acyclic chains truncate with a marker leaf instead of exhausting the
/// stack.
pub const DEFAULT_DEPTH_LIMIT: usize = 64;

/// Expansion state handed to the display layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpandState {
    Collapsed,
    Expanded,
    None,
}

/// Display classification of a tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Function,
    Method,
    Exception,
}

/// One node of the materialized tree. The display layer owns the result and
/// may discard it wholesale on the next analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallTreeItem {
    pub label: String,
    pub state: ExpandState,
    pub kind: ItemKind,
    pub children: Vec<CallTreeItem>,
}

impl CallTreeItem {
    pub fn leaf(label: impl Into<String>, kind: ItemKind) -> Self {
        CallTreeItem {
            label: label.into(),
            state: ExpandState::None,
            kind,
            children: Vec::new(),
        }
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

/// Materialize the tree rooted at `name` with the default depth ceiling.
///
/// Never rejects input: a root absent from both maps simply produces a
/// childless node.
pub fn build_tree(name: &str, graph: &CallGraph) -> CallTreeItem {
    build_tree_with_limit(name, graph, DEFAULT_DEPTH_LIMIT)
}

/// Materialize the tree rooted at `name`, truncating below `depth_limit`.
pub fn build_tree_with_limit(name: &str, graph: &CallGraph, depth_limit: usize) -> CallTreeItem {
    expand(name, graph, &HashSet::new(), depth_limit)
}

fn expand(name: &str, graph: &CallGraph, seen: &HashSet<String>, budget: usize) -> CallTreeItem {
    if seen.contains(name) {
        return CallTreeItem::leaf(format!("{name} (recursive)"), ItemKind::Function);
    }
    if budget == 0 {
        return CallTreeItem::leaf(format!("{name} (max depth)"), ItemKind::Function);
    }

    // Copy-on-branch: each path down the tree tracks its own ancestry.
    let mut path = seen.clone();
    path.insert(name.to_string());

    let mut callees: Vec<&str> = graph
        .calls
        .get(name)
        .map(|set| set.iter().map(String::as_str).collect())
        .unwrap_or_default();

    // Expandable definitions first, library leaves after, names ordered
    // within each group.
    callees.sort_by(|a, b| {
        let rank = |n: &str| usize::from(!graph.is_internal(n));
        rank(a).cmp(&rank(b)).then_with(|| a.cmp(b))
    });

    let children: Vec<CallTreeItem> = callees
        .into_iter()
        .map(|callee| {
            if graph.is_internal(callee) {
                expand(callee, graph, &path, budget - 1)
            } else {
                CallTreeItem::leaf(format!("\u{2192} {callee}"), ItemKind::Method)
            }
        })
        .collect();

    let state = if children.is_empty() {
        ExpandState::None
    } else {
        ExpandState::Collapsed
    };

    CallTreeItem {
        label: name.to_string(),
        state,
        kind: ItemKind::Function,
        children,
    }
}

/// Length of the longest acyclic internal call chain starting at `name`.
/// A definition that calls nothing has depth 1.
pub fn max_depth(name: &str, graph: &CallGraph) -> usize {
    depth_from(name, graph, &HashSet::new())
}

fn depth_from(name: &str, graph: &CallGraph, seen: &HashSet<String>) -> usize {
    let mut path = seen.clone();
    path.insert(name.to_string());

    let deepest = graph
        .calls
        .get(name)
        .into_iter()
        .flatten()
        .filter(|callee| graph.is_internal(callee) && !path.contains(callee.as_str()))
        .map(|callee| depth_from(callee, graph, &path))
        .max();

    match deepest {
        Some(depth) => 1 + depth,
        None => 1,
    }
}

/// Prefix the root label with the chain depth, `[3] : main` style.
pub fn annotate_root(tree: &mut CallTreeItem, depth: usize) {
    tree.label = format!("[{depth}] : {}", tree.label);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::callgraph::GraphBuilder;
    use serde_json::json;

    fn call(name: &str) -> serde_json::Value {
        json!({"type": "Expr", "value": {"type": "Call", "func": {"type": "Name", "id": name}, "args": []}})
    }

    fn func(name: &str, body: Vec<serde_json::Value>) -> serde_json::Value {
        json!({"type": "FunctionDef", "name": name, "body": body})
    }

    fn graph_of(body: Vec<serde_json::Value>) -> CallGraph {
        GraphBuilder::build(&json!({"type": "Module", "body": body}))
    }

    #[test]
    fn test_cycle_terminates_with_recursion_marker() {
        let graph = graph_of(vec![
            func("a", vec![call("b")]),
            func("b", vec![call("c")]),
            func("c", vec![call("a")]),
        ]);

        let tree = build_tree("a", &graph);
        assert_eq!(tree.label, "a");
        assert_eq!(tree.state, ExpandState::Collapsed);

        let b = &tree.children[0];
        let c = &b.children[0];
        let back = &c.children[0];
        assert_eq!(b.label, "b");
        assert_eq!(c.label, "c");
        assert_eq!(back.label, "a (recursive)");
        assert_eq!(back.state, ExpandState::None);
        assert!(back.children.is_empty());
    }

    #[test]
    fn test_direct_self_recursion() {
        let graph = graph_of(vec![func("f", vec![call("f")])]);
        let tree = build_tree("f", &graph);
        assert_eq!(tree.children.len(), 1);
        assert_eq!(tree.children[0].label, "f (recursive)");
    }

    #[test]
    fn test_internal_before_external_then_alphabetical() {
        let graph = graph_of(vec![
            func("root", vec![call("zeta"), call("alpha"), call("internal_fn")]),
            func("internal_fn", vec![]),
        ]);

        let tree = build_tree("root", &graph);
        let labels: Vec<&str> = tree.children.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["internal_fn", "\u{2192} alpha", "\u{2192} zeta"]);
    }

    #[test]
    fn test_external_leaves_marked_and_kinded() {
        let graph = graph_of(vec![func("a", vec![call("x"), call("y")])]);
        let tree = build_tree("a", &graph);
        assert_eq!(tree.children.len(), 2);
        for child in &tree.children {
            assert_eq!(child.kind, ItemKind::Method);
            assert_eq!(child.state, ExpandState::None);
            assert!(child.label.starts_with('\u{2192}'));
        }
        assert_eq!(tree.children[0].label, "\u{2192} x");
        assert_eq!(tree.children[1].label, "\u{2192} y");
    }

    #[test]
    fn test_siblings_expand_independently() {
        // Both branches reach `shared`; neither sees the other's ancestry.
        let graph = graph_of(vec![
            func("root", vec![call("left"), call("right")]),
            func("left", vec![call("shared")]),
            func("right", vec![call("shared")]),
            func("shared", vec![call("lib")]),
        ]);

        let tree = build_tree("root", &graph);
        for branch in &tree.children {
            let shared = &branch.children[0];
            assert_eq!(shared.label, "shared");
            assert_eq!(shared.children[0].label, "\u{2192} lib");
        }
    }

    #[test]
    fn test_unknown_root_degrades_to_childless_node() {
        let graph = CallGraph::default();
        let tree = build_tree("ghost", &graph);
        assert_eq!(tree.label, "ghost");
        assert_eq!(tree.state, ExpandState::None);
        assert!(tree.children.is_empty());
    }

    #[test]
    fn test_depth_limit_truncates_with_marker() {
        let graph = graph_of(vec![
            func("a", vec![call("b")]),
            func("b", vec![call("c")]),
            func("c", vec![call("d")]),
            func("d", vec![]),
        ]);

        let tree = build_tree_with_limit("a", &graph, 2);
        let b = &tree.children[0];
        let cut = &b.children[0];
        assert_eq!(cut.label, "c (max depth)");
        assert!(cut.children.is_empty());
    }

    #[test]
    fn test_max_depth_linear_chain() {
        let graph = graph_of(vec![
            func("a", vec![call("b")]),
            func("b", vec![call("c")]),
            func("c", vec![]),
        ]);
        assert_eq!(max_depth("a", &graph), 3);
        assert_eq!(max_depth("c", &graph), 1);
    }

    #[test]
    fn test_max_depth_cuts_cycles() {
        let graph = graph_of(vec![
            func("a", vec![call("b")]),
            func("b", vec![call("a")]),
        ]);
        assert_eq!(max_depth("a", &graph), 2);
    }

    #[test]
    fn test_max_depth_ignores_external_calls() {
        let graph = graph_of(vec![func("a", vec![call("print"), call("len")])]);
        assert_eq!(max_depth("a", &graph), 1);
    }

    #[test]
    fn test_annotate_root() {
        let mut tree = CallTreeItem::leaf("main", ItemKind::Function);
        annotate_root(&mut tree, 4);
        assert_eq!(tree.label, "[4] : main");
    }

    #[test]
    fn test_rebuild_from_same_graph_is_deterministic() {
        let graph = graph_of(vec![
            func("a", vec![call("b"), call("z"), call("m")]),
            func("b", vec![call("a")]),
        ]);
        assert_eq!(build_tree("a", &graph), build_tree("a", &graph));
    }
}
