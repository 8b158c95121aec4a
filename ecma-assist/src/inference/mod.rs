mod infix;
mod normalize;
mod signature;

use std::sync::Arc;

use tracing::{debug, trace};

use crate::ast::{NodeId, NodeKind, SyntaxTree};
use crate::parser::{parse_expression_source, ParseOptions};
use crate::registry::{CanonicalType, TypeDeclaration, TypeRegistry};
use crate::source::SourceFile;

pub use infix::{fold_infix_type, infer_infix_type, resolve_infix_type};
pub use normalize::parse_entered_text;
pub use signature::function_signature_key;

/// Resolves an identifier to the type of the value it names.
///
/// Scope tracking lives in the completion engine; this crate only asks.
pub trait NameResolver {
    fn resolve_type_declaration(&self, name: &str) -> Option<Arc<TypeDeclaration>>;
}

impl NameResolver for TypeRegistry {
    fn resolve_type_declaration(&self, name: &str) -> Option<Arc<TypeDeclaration>> {
        self.lookup(name)
    }
}

impl<F> NameResolver for F
where
    F: Fn(&str) -> Option<Arc<TypeDeclaration>>,
{
    fn resolve_type_declaration(&self, name: &str) -> Option<Arc<TypeDeclaration>> {
        self(name)
    }
}

pub struct TypeInference<'a> {
    registry: &'a TypeRegistry,
    resolver: &'a dyn NameResolver,
}

impl<'a> TypeInference<'a> {
    pub fn new(registry: &'a TypeRegistry, resolver: &'a dyn NameResolver) -> Self {
        Self { registry, resolver }
    }

    /// Identifiers are looked up in the registry itself.
    pub fn with_registry(registry: &'a TypeRegistry) -> Self {
        Self {
            registry,
            resolver: registry,
        }
    }

    pub fn registry(&self) -> &TypeRegistry {
        self.registry
    }

    /// Type of the value `node` evaluates to, if it can be told without
    /// running anything. `None` for a missing node.
    ///
    /// A catch clause and its parameter identifier both classify as `Error`;
    /// the parameter is never handed to the name resolver.
    pub fn classify(&self, tree: &SyntaxTree, node: Option<NodeId>) -> Option<Arc<TypeDeclaration>> {
        let node = node?;
        let kind = &tree.get(node)?.kind;
        trace!(node = %node, kind = kind.name(), "classifying node");

        if matches!(kind, NodeKind::CatchClause { .. }) || is_catch_parameter(tree, node) {
            return self.registry.lookup_canonical(CanonicalType::Error);
        }

        match kind {
            NodeKind::Identifier { name } => self.resolver.resolve_type_declaration(name),
            NodeKind::New { .. } => {
                new_expression_target(tree, node).and_then(|name| self.registry.lookup(name))
            }
            NodeKind::NumberLiteral { .. } => self.registry.lookup_canonical(CanonicalType::Number),
            NodeKind::ObjectLiteral { .. } => self.registry.lookup_canonical(CanonicalType::Object),
            NodeKind::StringLiteral { .. } => self.registry.lookup_canonical(CanonicalType::String),
            NodeKind::BooleanLiteral { .. } => {
                self.registry.lookup_canonical(CanonicalType::Boolean)
            }
            NodeKind::ArrayLiteral { .. } => self.registry.lookup_canonical(CanonicalType::Array),
            // Comma sequences fold like infix expressions. Assignments and
            // member accesses share the shape but are not arithmetic.
            NodeKind::Infix { .. } | NodeKind::Sequence { .. } => {
                resolve_infix_type(tree, node, self.registry)
            }
            _ => None,
        }
    }

    /// Classify what the user has typed so far.
    pub fn infer_text(&self, text: &str) -> Option<Arc<TypeDeclaration>> {
        let expression = parse_entered_text(text);
        if expression.is_empty() {
            return None;
        }

        let source = SourceFile::fragment(expression);
        match parse_expression_source(&source, ParseOptions::lenient()) {
            Ok(parsed) => self.classify(&parsed.tree, Some(parsed.expression)),
            Err(err) => {
                debug!(error = %err, text = %source.contents, "normalized text is not an expression");
                None
            }
        }
    }
}

fn is_catch_parameter(tree: &SyntaxTree, node: NodeId) -> bool {
    match tree.parent(node).map(|parent| tree.kind(parent)) {
        Some(NodeKind::CatchClause { parameter, .. }) => *parameter == node,
        _ => false,
    }
}

/// Constructor name of a `new` expression whose callee is a plain identifier.
pub fn new_expression_target(tree: &SyntaxTree, node: NodeId) -> Option<&str> {
    match tree.kind(node) {
        NodeKind::New { target, .. } => tree.identifier_name(*target),
        _ => None,
    }
}

/// Whether `initializer` can be resolved for `target` without going in a
/// circle, as in `var x = x.y`.
///
/// Only the text before the first `.` of the initializer is compared, so
/// `a = a[0].b` is not caught.
pub fn can_resolve_variable(tree: &SyntaxTree, target: NodeId, initializer: NodeId) -> bool {
    let target_text = tree.to_source(target);
    let initializer_text = tree.to_source(initializer);
    match first_segment(&initializer_text) {
        Some(root) => root != target_text,
        None => false,
    }
}

fn first_segment(text: &str) -> Option<&str> {
    if !text.is_empty() && text.chars().all(|ch| ch == '.') {
        return None;
    }
    text.split('.').next()
}

#[cfg(test)]
mod tests {
    use super::first_segment;

    #[test]
    fn first_segment_follows_dot_splitting() {
        assert_eq!(first_segment("x.y.z"), Some("x"));
        assert_eq!(first_segment(".x"), Some(""));
        assert_eq!(first_segment(""), Some(""));
        assert_eq!(first_segment("..."), None);
    }
}
