//! Tree-sitter helpers shared by the grammar-backed extractors

use std::collections::BTreeSet;
use tree_sitter::Node;

/// A call-site node kind and the field that names the callee.
pub type CallSite = (&'static str, &'static str);

/// Node kinds that are plain names.
const NAME_KINDS: &[&str] = &[
    "identifier",
    "field_identifier",
    "property_identifier",
    "type_identifier",
    "private_property_identifier",
    "shorthand_property_identifier",
];

/// Fields that lead from a compound callee to its last segment, tried in order.
const SEGMENT_FIELDS: &[&str] = &["attribute", "property", "field", "name", "function", "type"];

pub fn text<'a>(node: Node, source: &'a str) -> &'a str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

pub fn field_text<'a>(node: Node, field: &str, source: &'a str) -> Option<&'a str> {
    node.child_by_field_name(field).map(|child| text(child, source))
}

/// 1-based first line of `node`.
pub fn line_start(node: Node) -> u32 {
    node.start_position().row as u32 + 1
}

/// 1-based last line of `node`.
pub fn line_end(node: Node) -> u32 {
    node.end_position().row as u32 + 1
}

pub fn named_children<'tree>(node: Node<'tree>) -> Vec<Node<'tree>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

pub fn children<'tree>(node: Node<'tree>) -> Vec<Node<'tree>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

/// True if `node` has a direct child (named or anonymous) of `kind`.
pub fn has_child_kind(node: Node, kind: &str) -> bool {
    children(node).iter().any(|child| child.kind() == kind)
}

/// Pre-order walk over `node` and all its descendants.
pub fn walk<'tree>(node: Node<'tree>, mut visit: impl FnMut(Node<'tree>)) {
    let mut stack = vec![node];
    while let Some(current) = stack.pop() {
        visit(current);
        let mut kids = children(current);
        kids.reverse();
        stack.extend(kids);
    }
}

/// Strip one layer of matching quotes or angle brackets.
pub fn unquote(raw: &str) -> &str {
    let raw = raw.trim();
    for (open, close) in [('"', '"'), ('\'', '\''), ('`', '`')] {
        if raw.len() >= 2 && raw.starts_with(open) && raw.ends_with(close) {
            return &raw[1..raw.len() - 1];
        }
    }
    raw
}

/// Short name of a callee expression: the identifier itself, or the last
/// segment of a member, attribute, field or scoped path.
pub fn callee_name(node: Node, source: &str) -> Option<String> {
    let mut current = node;
    loop {
        if NAME_KINDS.contains(&current.kind()) {
            let name = text(current, source);
            return (!name.is_empty()).then(|| name.to_string());
        }
        current = SEGMENT_FIELDS
            .iter()
            .find_map(|field| current.child_by_field_name(field))?;
    }
}

/// Collect callee short names of every call site under `body`.
pub fn collect_calls(body: Node, source: &str, sites: &[CallSite]) -> BTreeSet<String> {
    let mut calls = BTreeSet::new();
    walk(body, |node| {
        for (kind, field) in sites {
            if node.kind() == *kind {
                if let Some(name) = node
                    .child_by_field_name(field)
                    .and_then(|callee| callee_name(callee, source))
                {
                    calls.insert(name);
                }
            }
        }
    });
    calls
}
