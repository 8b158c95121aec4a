use crate::ast::{NodeId, NodeKind, SyntaxTree};

const PLACEHOLDER: &str = "p";

/// Arity key of the call enclosing `node`, such as `method(p,p)`.
///
/// Walks from `node` itself up to the script root and stops at the first
/// call or construction. The name is the accessed property when the callee
/// is a member access and empty otherwise. Argument types are discarded.
pub fn function_signature_key(tree: &SyntaxTree, node: NodeId) -> Option<String> {
    let (target, argument_count) = tree
        .ancestors(node)
        .take_while(|id| !matches!(tree.kind(*id), NodeKind::Script { .. }))
        .find_map(|id| call_shape(tree.kind(id)))?;

    let name = match tree.kind(target) {
        NodeKind::PropertyAccess { property, .. } => {
            tree.identifier_name(*property).unwrap_or_default()
        }
        _ => "",
    };
    let placeholders = vec![PLACEHOLDER; argument_count].join(",");
    Some(format!("{name}({placeholders})"))
}

fn call_shape(kind: &NodeKind) -> Option<(NodeId, usize)> {
    match kind {
        NodeKind::Call { target, arguments } => Some((*target, arguments.len())),
        NodeKind::New { target, arguments } => {
            Some((*target, arguments.as_ref().map_or(0, Vec::len)))
        }
        _ => None,
    }
}
