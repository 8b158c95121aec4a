mod ast;
mod diagnostics;
mod lexer;
mod parser;
mod registry;
mod render;
mod source;

pub mod inference;

pub use crate::ast::{
    Ancestors, AssignmentOperator, Descendants, InfixOperator, Node, NodeId, NodeKind,
    SourceSpan, SyntaxTree, UnaryOperator, UpdateOperator,
};
pub use crate::diagnostics::{Diagnostic, DiagnosticLevel, Diagnostics};
pub use crate::inference::{
    can_resolve_variable, fold_infix_type, function_signature_key, infer_infix_type,
    new_expression_target, parse_entered_text, resolve_infix_type, NameResolver, TypeInference,
};
pub use crate::lexer::{Keyword, Lexer, LexerError, Token, TokenKind};
pub use crate::parser::{
    parse_expression_source, parse_source, ParseOptions, ParseOutput, ParsedExpression, Parser,
};
pub use crate::registry::{CanonicalType, RegistryError, TypeDeclaration, TypeRegistry};
pub use crate::source::{SourceFile, SourceId};
