use tracing::debug;

use crate::ast::{NodeId, NodeKind, SyntaxTree};
use crate::parser::{parse_source, ParseOptions};
use crate::source::SourceFile;

/// Source text of the part of `text` a completion request cares about.
///
/// `text` is whatever the user has typed so far and is parsed leniently.
/// Only the first statement is considered: the expression of an expression
/// statement, the discriminant of a `switch`, the condition of an `if` or
/// `while`, the initializer of a `for`. Other statements are returned whole.
/// Unparseable input yields an empty string.
pub fn parse_entered_text(text: &str) -> String {
    let source = SourceFile::fragment(text);
    let output = match parse_source(&source, ParseOptions::lenient()) {
        Ok(output) => output,
        Err(err) => {
            debug!(error = %err, "entered text could not be parsed");
            return String::new();
        }
    };

    let tree = &output.tree;
    let Some(&statement) = tree.statements().first() else {
        return String::new();
    };

    match relevant_part(tree, statement) {
        Some(part) => tree.to_source(part),
        None => String::new(),
    }
}

fn relevant_part(tree: &SyntaxTree, statement: NodeId) -> Option<NodeId> {
    match tree.kind(statement) {
        NodeKind::ExpressionStatement { expression } => Some(*expression),
        NodeKind::Switch { discriminant, .. } => Some(*discriminant),
        NodeKind::If { condition, .. } | NodeKind::While { condition, .. } => Some(*condition),
        NodeKind::For { initializer, .. } => *initializer,
        // empty: a for-in header has no initializer to extract
        NodeKind::ForIn { .. } => None,
        NodeKind::Error { text } => {
            debug!(skipped = %text, "first statement failed to parse");
            None
        }
        _ => Some(statement),
    }
}
