//! Error-tolerant parsing: locate ERROR/MISSING nodes in a tree-sitter tree.

use tree_sitter::Node;

use super::types::SourceLocation;

/// Count ERROR and MISSING nodes; returns the count and the first location.
///
/// Walks with a cursor so arbitrarily deep trees do not grow the stack.
/// Subtrees without errors are skipped.
pub fn count_errors(root: Node) -> (u32, Option<SourceLocation>) {
    let mut count = 0u32;
    let mut first = None;
    if !root.has_error() {
        return (count, first);
    }

    let mut cursor = root.walk();
    loop {
        let node = cursor.node();
        if node.is_error() || node.is_missing() {
            count += 1;
            if first.is_none() {
                first = Some(SourceLocation::from_ts_node(&node));
            }
        }
        if node.has_error() && cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return (count, first);
            }
        }
    }
}
