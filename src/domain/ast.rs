// AST node access for calltrace.
// The parser hands us a polymorphic JSON document: every node is an object
// carrying a "type" discriminator plus arbitrary child fields. This module
// wraps that shape behind small accessors so the walker never touches raw
// JSON field plumbing.

use serde_json::Value;

/// Back-reference to the owning node. Excluded from traversal.
const PARENT_FIELD: &str = "parent";

/// Node classes the graph builder dispatches on. Everything else falls
/// through to the generic structural walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    FunctionDef,
    ClassDef,
    Call,
    Other,
}

impl NodeKind {
    /// Classify a `type` tag. Both Python-`ast` and ESTree spellings are
    /// recognized; unknown tags are walked generically, never rejected.
    pub fn classify(type_tag: &str) -> NodeKind {
        match type_tag {
            "FunctionDef" | "AsyncFunctionDef" | "FunctionDeclaration" => NodeKind::FunctionDef,
            "ClassDef" | "ClassDeclaration" => NodeKind::ClassDef,
            "Call" | "CallExpression" => NodeKind::Call,
            _ => NodeKind::Other,
        }
    }
}

/// A borrowed view of one AST node. Read-only: the builder never mutates or
/// re-links the host document.
#[derive(Debug, Clone, Copy)]
pub struct AstNode<'a> {
    value: &'a Value,
    type_tag: &'a str,
}

impl<'a> AstNode<'a> {
    /// Treat a JSON value as a node if it is an object with a string `type`.
    pub fn cast(value: &'a Value) -> Option<AstNode<'a>> {
        let type_tag = value.get("type")?.as_str()?;
        Some(AstNode { value, type_tag })
    }

    pub fn type_tag(&self) -> &'a str {
        self.type_tag
    }

    pub fn kind(&self) -> NodeKind {
        NodeKind::classify(self.type_tag)
    }

    pub fn field(&self, name: &str) -> Option<&'a Value> {
        self.value.get(name)
    }

    /// All fields of this node except the `parent` back-reference.
    pub fn fields(&self) -> impl Iterator<Item = (&'a String, &'a Value)> {
        self.value
            .as_object()
            .into_iter()
            .flatten()
            .filter(|(key, _)| key.as_str() != PARENT_FIELD)
    }

    /// Declared name of a definition node. Python spells it as a plain
    /// `name` string, ESTree as an `id` identifier node. Anonymous
    /// definitions yield `None`.
    pub fn declared_name(&self) -> Option<&'a str> {
        if let Some(name) = self.field("name").and_then(Value::as_str) {
            return Some(name);
        }
        let id = AstNode::cast(self.field("id")?)?;
        id.field("name").and_then(Value::as_str)
    }

    /// Called name of a call-expression node.
    ///
    /// A bare identifier resolves to its own name; an attribute/member
    /// access resolves to the rightmost member only (the receiver is
    /// ignored). Any other callee shape yields `None` and no edge is
    /// recorded.
    pub fn callee_name(&self) -> Option<&'a str> {
        let callee = self
            .field("func")
            .or_else(|| self.field("callee"))
            .and_then(AstNode::cast)?;

        match callee.type_tag() {
            "Name" => callee.field("id").and_then(Value::as_str),
            "Identifier" => callee.field("name").and_then(Value::as_str),
            "Attribute" => callee.field("attr").and_then(Value::as_str),
            "MemberExpression" => {
                let property = AstNode::cast(callee.field("property")?)?;
                if property.type_tag() == "Identifier" {
                    property.field("name").and_then(Value::as_str)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// First source line of this node, when the parser recorded one.
    pub fn start_line(&self) -> Option<u64> {
        if let Some(line) = self.field("lineno").and_then(Value::as_u64) {
            return Some(line);
        }
        self.field("loc")?.get("start")?.get("line")?.as_u64()
    }

    /// Last source line of this node, when the parser recorded one.
    pub fn end_line(&self) -> Option<u64> {
        if let Some(line) = self.field("end_lineno").and_then(Value::as_u64) {
            return Some(line);
        }
        self.field("loc")?.get("end")?.get("line")?.as_u64()
    }
}
