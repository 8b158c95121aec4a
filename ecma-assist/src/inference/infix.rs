use std::sync::Arc;

use crate::ast::{NodeId, NodeKind, SyntaxTree};
use crate::registry::{CanonicalType, TypeDeclaration, TypeRegistry};

/// One step of the infix type fold.
///
/// Binary-form containers pass the accumulator through untouched. A string
/// literal locks the result to `String`; a number literal only fills an
/// empty accumulator; any other node turns everything but `String` into
/// `Any`.
pub fn fold_infix_type(accumulator: Option<CanonicalType>, kind: &NodeKind) -> Option<CanonicalType> {
    if kind.is_binary_form() {
        return accumulator;
    }
    match kind {
        NodeKind::StringLiteral { .. } => Some(CanonicalType::String),
        NodeKind::NumberLiteral { .. } => accumulator.or(Some(CanonicalType::Number)),
        _ => match accumulator {
            Some(CanonicalType::String) => Some(CanonicalType::String),
            _ => Some(CanonicalType::Any),
        },
    }
}

/// Fold every node under `root`, in pre-order, into a canonical type.
pub fn infer_infix_type(tree: &SyntaxTree, root: NodeId) -> Option<CanonicalType> {
    tree.descendants(root)
        .fold(None, |accumulator, id| fold_infix_type(accumulator, tree.kind(id)))
}

pub fn resolve_infix_type(
    tree: &SyntaxTree,
    root: NodeId,
    registry: &TypeRegistry,
) -> Option<Arc<TypeDeclaration>> {
    infer_infix_type(tree, root).and_then(|canonical| registry.lookup_canonical(canonical))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::InfixOperator;

    fn number() -> NodeKind {
        NodeKind::NumberLiteral {
            value: 1.0,
            raw: "1".to_string(),
        }
    }

    fn string() -> NodeKind {
        NodeKind::StringLiteral {
            value: String::new(),
            quote: '"',
        }
    }

    fn identifier() -> NodeKind {
        NodeKind::Identifier {
            name: "foo".to_string(),
        }
    }

    #[test]
    fn string_is_absorbing() {
        let locked = Some(CanonicalType::String);
        assert_eq!(fold_infix_type(locked, &number()), locked);
        assert_eq!(fold_infix_type(locked, &identifier()), locked);
        assert_eq!(fold_infix_type(Some(CanonicalType::Any), &string()), locked);
    }

    #[test]
    fn number_only_fills_empty_accumulator() {
        assert_eq!(fold_infix_type(None, &number()), Some(CanonicalType::Number));
        assert_eq!(
            fold_infix_type(Some(CanonicalType::Any), &number()),
            Some(CanonicalType::Any)
        );
    }

    #[test]
    fn other_nodes_force_any() {
        assert_eq!(fold_infix_type(None, &identifier()), Some(CanonicalType::Any));
        assert_eq!(
            fold_infix_type(Some(CanonicalType::Number), &NodeKind::NullLiteral),
            Some(CanonicalType::Any)
        );
    }

    #[test]
    fn binary_forms_are_transparent() {
        let mut tree = SyntaxTree::new();
        let left = tree.alloc(number(), Default::default());
        let right = tree.alloc(number(), Default::default());
        let infix = NodeKind::Infix {
            operator: InfixOperator::Add,
            left,
            right,
        };
        assert_eq!(fold_infix_type(None, &infix), None);
        assert_eq!(
            fold_infix_type(Some(CanonicalType::Number), &infix),
            Some(CanonicalType::Number)
        );
    }
}
