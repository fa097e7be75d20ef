// Call graph structures for calltrace.
// One depth-first walk over a parsed file yields the definition table and
// the caller -> callees relation everything downstream consumes.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::ast::{AstNode, NodeKind};

/// How a definition was declared. Cosmetic metadata for display layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DefKind {
    Function,
    Method,
}

/// What we keep of a defining node: enough to classify and locate it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefRecord {
    pub kind: DefKind,
    pub start_line: Option<u64>,
    pub end_line: Option<u64>,
}

/// The call graph of a single file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallGraph {
    /// Definition name -> defining-node record. A later definition with the
    /// same name overwrites the earlier one; redefinition is legal in the
    /// source languages we analyze.
    pub defs: HashMap<String, DefRecord>,
    /// Caller name -> distinct callee names. A caller appears as a key only
    /// if at least one resolvable call was seen inside its body.
    pub calls: HashMap<String, BTreeSet<String>>,
}

impl CallGraph {
    /// A callee with a definition here can be expanded further; anything
    /// else is a library reference.
    pub fn is_internal(&self, name: &str) -> bool {
        self.defs.contains_key(name)
    }

    /// Definitions no other definition calls: the natural roots to offer
    /// when the user has not picked one.
    pub fn entry_candidates(&self) -> Vec<String> {
        let mut called: BTreeSet<&str> = BTreeSet::new();
        for callees in self.calls.values() {
            for callee in callees {
                called.insert(callee.as_str());
            }
        }

        let mut roots: Vec<String> = self
            .defs
            .keys()
            .filter(|name| !called.contains(name.as_str()))
            .cloned()
            .collect();
        roots.sort();
        roots
    }

    pub fn edge_count(&self) -> usize {
        self.calls.values().map(BTreeSet::len).sum()
    }
}

/// Single-pass graph builder.
///
/// Known node kinds get a dedicated handler; everything else takes the
/// generic structural walk, so grammars we have never seen still traverse
/// fully. `current` is the stack of enclosing named definitions; the top of
/// the stack owns any call recorded below it.
pub struct GraphBuilder {
    graph: CallGraph,
    current: Vec<String>,
    class_depth: usize,
}

impl GraphBuilder {
    /// Walk the whole document once and return the finished graph.
    /// Never fails: malformed or unknown shapes degrade to "no entry".
    pub fn build(root: &Value) -> CallGraph {
        let mut builder = GraphBuilder {
            graph: CallGraph::default(),
            current: Vec::new(),
            class_depth: 0,
        };
        if let Some(node) = AstNode::cast(root) {
            builder.visit(node);
        }
        builder.graph
    }

    fn visit(&mut self, node: AstNode) {
        match node.kind() {
            NodeKind::FunctionDef => self.visit_function_def(node),
            NodeKind::Call => self.visit_call(node),
            NodeKind::ClassDef => self.visit_class_def(node),
            NodeKind::Other => self.generic_visit(node),
        }
    }

    fn visit_function_def(&mut self, node: AstNode) {
        let Some(name) = node.declared_name() else {
            // Anonymous definition: walk its body, but it never becomes a
            // defs entry or a call context.
            self.generic_visit(node);
            return;
        };

        let kind = if self.class_depth > 0 {
            DefKind::Method
        } else {
            DefKind::Function
        };
        self.graph.defs.insert(
            name.to_string(),
            DefRecord {
                kind,
                start_line: node.start_line(),
                end_line: node.end_line(),
            },
        );

        self.current.push(name.to_string());
        self.generic_visit(node);
        self.current.pop();
    }

    fn visit_call(&mut self, node: AstNode) {
        if let Some(caller) = self.current.last() {
            if let Some(callee) = node.callee_name() {
                self.graph
                    .calls
                    .entry(caller.clone())
                    .or_default()
                    .insert(callee.to_string());
            }
        }

        // Calls nested inside arguments are edges too.
        self.generic_visit(node);
    }

    fn visit_class_def(&mut self, node: AstNode) {
        self.class_depth += 1;
        self.generic_visit(node);
        self.class_depth -= 1;
    }

    fn generic_visit(&mut self, node: AstNode) {
        for (_, child) in node.fields() {
            match child {
                Value::Array(items) => {
                    for item in items {
                        if let Some(child_node) = AstNode::cast(item) {
                            self.visit(child_node);
                        }
                    }
                }
                other => {
                    if let Some(child_node) = AstNode::cast(other) {
                        self.visit(child_node);
                    }
                }
            }
        }
    }
}
