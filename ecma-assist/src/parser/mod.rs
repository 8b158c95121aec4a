use anyhow::{bail, Result};
use tracing::debug;

use crate::ast::*;
use crate::diagnostics::Diagnostics;
use crate::lexer::{Keyword, Lexer, Token, TokenKind};
use crate::source::SourceFile;

/// Statements and unary or member expressions nested deeper than this are
/// rejected instead of exhausting the stack.
const MAX_NESTING_DEPTH: usize = 256;

#[derive(Copy, Clone, PartialEq, PartialOrd)]
enum Precedence {
    Lowest = 0,
    Or,
    And,
    BitOr,
    BitXor,
    BitAnd,
    Equality,
    Relational,
    Shift,
    Additive,
    Multiplicative,
}

impl Precedence {
    fn of(kind: &TokenKind, allow_in: bool) -> Option<(Self, InfixOperator)> {
        let entry = match kind {
            TokenKind::PipePipe => (Precedence::Or, InfixOperator::Or),
            TokenKind::AmpersandAmpersand => (Precedence::And, InfixOperator::And),
            TokenKind::Pipe => (Precedence::BitOr, InfixOperator::BitOr),
            TokenKind::Caret => (Precedence::BitXor, InfixOperator::BitXor),
            TokenKind::Ampersand => (Precedence::BitAnd, InfixOperator::BitAnd),
            TokenKind::DoubleEqual => (Precedence::Equality, InfixOperator::Equal),
            TokenKind::BangEqual => (Precedence::Equality, InfixOperator::NotEqual),
            TokenKind::TripleEqual => (Precedence::Equality, InfixOperator::StrictEqual),
            TokenKind::BangDoubleEqual => (Precedence::Equality, InfixOperator::StrictNotEqual),
            TokenKind::Less => (Precedence::Relational, InfixOperator::Less),
            TokenKind::LessEqual => (Precedence::Relational, InfixOperator::LessEqual),
            TokenKind::Greater => (Precedence::Relational, InfixOperator::Greater),
            TokenKind::GreaterEqual => (Precedence::Relational, InfixOperator::GreaterEqual),
            TokenKind::Keyword(Keyword::Instanceof) => {
                (Precedence::Relational, InfixOperator::Instanceof)
            }
            TokenKind::Keyword(Keyword::In) if allow_in => {
                (Precedence::Relational, InfixOperator::In)
            }
            TokenKind::LessLess => (Precedence::Shift, InfixOperator::ShiftLeft),
            TokenKind::GreaterGreater => (Precedence::Shift, InfixOperator::ShiftRight),
            TokenKind::GreaterGreaterGreater => {
                (Precedence::Shift, InfixOperator::UnsignedShiftRight)
            }
            TokenKind::Plus => (Precedence::Additive, InfixOperator::Add),
            TokenKind::Minus => (Precedence::Additive, InfixOperator::Subtract),
            TokenKind::Star => (Precedence::Multiplicative, InfixOperator::Multiply),
            TokenKind::Slash => (Precedence::Multiplicative, InfixOperator::Divide),
            TokenKind::Percent => (Precedence::Multiplicative, InfixOperator::Modulo),
            _ => return None,
        };
        Some(entry)
    }
}

/// How forgiving the parser is towards malformed input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Replace statements that fail to parse with error nodes and keep going;
    /// brackets still open at end of input are closed implicitly.
    pub recover_from_errors: bool,
    /// Collect diagnostics for recovered errors instead of dropping them.
    pub report_diagnostics: bool,
}

impl ParseOptions {
    /// Abort on the first syntax error.
    pub fn strict() -> Self {
        Self {
            recover_from_errors: false,
            report_diagnostics: true,
        }
    }

    /// Settings for text typed interactively in an editor.
    pub fn lenient() -> Self {
        Self {
            recover_from_errors: true,
            report_diagnostics: false,
        }
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self::strict()
    }
}

#[derive(Debug)]
pub struct ParseOutput {
    pub tree: SyntaxTree,
    pub diagnostics: Diagnostics,
}

/// A single expression parsed on its own; the expression is the tree root.
#[derive(Debug)]
pub struct ParsedExpression {
    pub tree: SyntaxTree,
    pub expression: NodeId,
}

pub fn parse_source(source: &SourceFile, options: ParseOptions) -> Result<ParseOutput> {
    let tokens = Lexer::new(source).tokenize()?;
    let mut parser = Parser::new(source, tokens, options);
    let tree = parser.parse()?;
    Ok(ParseOutput {
        tree,
        diagnostics: parser.into_diagnostics(),
    })
}

pub fn parse_expression_source(
    source: &SourceFile,
    options: ParseOptions,
) -> Result<ParsedExpression> {
    let tokens = Lexer::new(source).tokenize()?;
    let mut parser = Parser::new(source, tokens, options);
    parser.parse_standalone_expression()
}

pub struct Parser<'a> {
    source: &'a SourceFile,
    tokens: Vec<Token>,
    current: usize,
    options: ParseOptions,
    diagnostics: Diagnostics,
    tree: SyntaxTree,
    /// Inside a `for` header, where `in` ends the initializer.
    no_in: bool,
    depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a SourceFile, tokens: Vec<Token>, options: ParseOptions) -> Self {
        Self {
            source,
            tokens,
            current: 0,
            options,
            diagnostics: Diagnostics::new(),
            tree: SyntaxTree::new(),
            no_in: false,
            depth: 0,
        }
    }

    fn span_from_token(token: &Token) -> SourceSpan {
        let len = token.lexeme.chars().count().max(1);
        SourceSpan::new(
            token.line,
            token.column,
            token.line,
            token.column + len.saturating_sub(1),
        )
    }

    fn span_since(&self, start: usize) -> SourceSpan {
        let last_index = self.tokens.len().saturating_sub(1);
        let start = start.min(last_index);
        let end = self.current.saturating_sub(1).max(start).min(last_index);
        SourceSpan::union(
            &Self::span_from_token(&self.tokens[start]),
            &Self::span_from_token(&self.tokens[end]),
        )
    }

    fn alloc_since(&mut self, start: usize, kind: NodeKind) -> NodeId {
        let span = self.span_since(start);
        self.tree.alloc(kind, span)
    }

    pub fn parse(&mut self) -> Result<SyntaxTree> {
        let start = self.current;
        let statements = self.parse_statement_list(|_| false)?;
        let root = self.alloc_since(start, NodeKind::Script { statements });
        self.tree.set_root(root);
        Ok(std::mem::take(&mut self.tree))
    }

    pub fn parse_standalone_expression(&mut self) -> Result<ParsedExpression> {
        let expression = self.parse_expression()?;
        if !self.is_at_end() {
            let token = self.peek();
            bail!(
                "unexpected '{}' after expression at line {}, column {}",
                token.lexeme,
                token.line,
                token.column
            );
        }
        self.tree.set_root(expression);
        Ok(ParsedExpression {
            tree: std::mem::take(&mut self.tree),
            expression,
        })
    }

    pub fn into_diagnostics(self) -> Diagnostics {
        self.diagnostics
    }

    fn report_error(&mut self, message: impl Into<String>, span: SourceSpan) {
        if self.options.report_diagnostics {
            self.diagnostics.push_error_with_span(message, Some(span));
        }
    }

    fn report_warning(&mut self, message: impl Into<String>, span: SourceSpan) {
        if self.options.report_diagnostics {
            self.diagnostics.push_warning_with_span(message, Some(span));
        }
    }

    fn parse_statement_list(&mut self, terminator: fn(&TokenKind) -> bool) -> Result<Vec<NodeId>> {
        let mut statements = Vec::new();
        while !self.is_at_end() && !terminator(self.peek_kind()) {
            statements.push(self.parse_statement_recovering()?);
        }
        Ok(statements)
    }

    fn parse_statement_recovering(&mut self) -> Result<NodeId> {
        let start = self.current;
        match self.parse_statement() {
            Ok(statement) => Ok(statement),
            Err(err) if self.options.recover_from_errors => {
                debug!(error = %err, token = start, "recovering from syntax error");
                let span = Self::span_from_token(&self.tokens[start]);
                self.report_error(err.to_string(), span);
                Ok(self.recover_statement(start))
            }
            Err(err) => Err(err),
        }
    }

    /// Skip the tokens of a broken statement, up to its terminating `;`, the
    /// next line or the brace that closes the enclosing block. Stray `)` and
    /// `]` are swallowed.
    fn recover_statement(&mut self, start: usize) -> NodeId {
        self.current = start;
        let mut depth = 0usize;
        loop {
            let kind = self.peek_kind().clone();
            let newline_before = self.peek().newline_before;
            match kind {
                TokenKind::Eof => break,
                TokenKind::LBrace | TokenKind::LParen | TokenKind::LBracket => depth += 1,
                TokenKind::RBrace if depth == 0 => {
                    if self.current == start {
                        self.advance();
                    }
                    break;
                }
                TokenKind::RBrace | TokenKind::RParen | TokenKind::RBracket => {
                    depth = depth.saturating_sub(1);
                }
                TokenKind::Semicolon if depth == 0 => {
                    self.advance();
                    break;
                }
                _ if depth == 0 && newline_before && self.current > start => break,
                _ => {}
            }
            self.advance();
        }

        let text = self.source_text(start, self.current);
        self.alloc_since(start, NodeKind::Error { text })
    }

    fn source_text(&self, start: usize, end: usize) -> String {
        if end <= start {
            return String::new();
        }
        let first = &self.tokens[start];
        let last = &self.tokens[end - 1];
        self.source
            .contents
            .get(first.offset..last.offset + last.lexeme.len())
            .unwrap_or_default()
            .to_string()
    }

    fn parse_statement(&mut self) -> Result<NodeId> {
        self.nested(|parser| parser.parse_statement_form())
    }

    fn parse_statement_form(&mut self) -> Result<NodeId> {
        match self.peek_kind() {
            TokenKind::LBrace => self.parse_block(),
            TokenKind::Semicolon => {
                let start = self.current;
                self.advance();
                Ok(self.alloc_since(start, NodeKind::Empty))
            }
            TokenKind::Keyword(Keyword::Var) => self.parse_variable_declaration(true),
            TokenKind::Keyword(Keyword::If) => self.parse_if(),
            TokenKind::Keyword(Keyword::Do) => self.parse_do_while(),
            TokenKind::Keyword(Keyword::While) => self.parse_while(),
            TokenKind::Keyword(Keyword::For) => self.parse_for(),
            TokenKind::Keyword(Keyword::Continue) => self.parse_jump(Keyword::Continue),
            TokenKind::Keyword(Keyword::Break) => self.parse_jump(Keyword::Break),
            TokenKind::Keyword(Keyword::Return) => self.parse_return(),
            TokenKind::Keyword(Keyword::With) => self.parse_with(),
            TokenKind::Keyword(Keyword::Switch) => self.parse_switch(),
            TokenKind::Keyword(Keyword::Throw) => self.parse_throw(),
            TokenKind::Keyword(Keyword::Try) => self.parse_try(),
            TokenKind::Keyword(Keyword::Function) => self.parse_function(true),
            TokenKind::Identifier if matches!(self.peek_kind_at(1), Some(TokenKind::Colon)) => {
                self.parse_labeled()
            }
            TokenKind::Eof if self.options.recover_from_errors => {
                let span = Self::span_from_token(self.peek());
                self.report_error("expected a statement before end of input", span);
                let start = self.current;
                Ok(self.alloc_since(start, NodeKind::Empty))
            }
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_block(&mut self) -> Result<NodeId> {
        let start = self.current;
        self.expect_token(TokenKind::LBrace, "expected '{' to start block")?;
        let statements = self.parse_statement_list(|kind| matches!(kind, TokenKind::RBrace))?;
        self.expect_closing(TokenKind::RBrace, "expected '}' to close block")?;
        Ok(self.alloc_since(start, NodeKind::Block { statements }))
    }

    fn parse_variable_declaration(&mut self, statement: bool) -> Result<NodeId> {
        let start = self.current;
        self.advance(); // consume 'var'

        let mut variables = Vec::new();
        loop {
            let variable_start = self.current;
            let target = self.parse_binding_identifier("expected identifier after 'var'")?;
            let initializer = if matches!(self.peek_kind(), TokenKind::Equal) {
                self.advance(); // consume '='
                Some(self.parse_assignment()?)
            } else {
                None
            };
            variables.push(self.alloc_since(
                variable_start,
                NodeKind::VariableInitializer {
                    target,
                    initializer,
                },
            ));

            if matches!(self.peek_kind(), TokenKind::Comma) {
                self.advance();
                continue;
            }
            break;
        }

        if statement {
            self.consume_semicolon("expected ';' after variable declaration")?;
        }

        Ok(self.alloc_since(
            start,
            NodeKind::VariableDeclaration {
                variables,
                statement,
            },
        ))
    }

    fn parse_if(&mut self) -> Result<NodeId> {
        let start = self.current;
        self.advance(); // consume 'if'
        let condition = self.parse_parenthesized_header("if")?;
        let then_branch = self.parse_statement_recovering()?;
        let else_branch = if self.check_keyword(Keyword::Else) {
            self.advance();
            Some(self.parse_statement_recovering()?)
        } else {
            None
        };

        Ok(self.alloc_since(
            start,
            NodeKind::If {
                condition,
                then_branch,
                else_branch,
            },
        ))
    }

    fn parse_while(&mut self) -> Result<NodeId> {
        let start = self.current;
        self.advance(); // consume 'while'
        let condition = self.parse_parenthesized_header("while")?;
        let body = self.parse_statement_recovering()?;
        Ok(self.alloc_since(start, NodeKind::While { condition, body }))
    }

    fn parse_do_while(&mut self) -> Result<NodeId> {
        let start = self.current;
        self.advance(); // consume 'do'
        let body = self.parse_statement_recovering()?;
        if !self.check_keyword(Keyword::While) {
            let token = self.peek();
            bail!(
                "expected 'while' after do-loop body at line {}, column {}",
                token.line,
                token.column
            );
        }
        self.advance(); // consume 'while'
        let condition = self.parse_parenthesized_header("do-while")?;
        if matches!(self.peek_kind(), TokenKind::Semicolon) {
            self.advance();
        }
        Ok(self.alloc_since(start, NodeKind::DoWhile { body, condition }))
    }

    fn parse_for(&mut self) -> Result<NodeId> {
        let start = self.current;
        self.advance(); // consume 'for'
        self.expect_token(TokenKind::LParen, "expected '(' after 'for'")?;

        let initializer = match self.peek_kind() {
            TokenKind::Semicolon => None,
            TokenKind::Keyword(Keyword::Var) => {
                Some(self.with_in_disallowed(|parser| parser.parse_variable_declaration(false))?)
            }
            _ => Some(self.with_in_disallowed(|parser| parser.parse_expression())?),
        };

        if let Some(iterator) = initializer {
            if self.check_keyword(Keyword::In) {
                self.advance(); // consume 'in'
                let object = self.with_in_allowed(|parser| parser.parse_expression())?;
                self.expect_closing(TokenKind::RParen, "expected ')' after for-in header")?;
                let body = self.parse_statement_recovering()?;
                return Ok(self.alloc_since(
                    start,
                    NodeKind::ForIn {
                        iterator,
                        object,
                        body,
                    },
                ));
            }
        }

        self.expect_token(
            TokenKind::Semicolon,
            "expected ';' after for-loop initializer",
        )?;
        let condition = if matches!(self.peek_kind(), TokenKind::Semicolon) {
            None
        } else {
            Some(self.with_in_allowed(|parser| parser.parse_expression())?)
        };
        self.expect_token(TokenKind::Semicolon, "expected ';' after for-loop condition")?;
        let update = if matches!(self.peek_kind(), TokenKind::RParen) {
            None
        } else {
            Some(self.with_in_allowed(|parser| parser.parse_expression())?)
        };
        self.expect_closing(TokenKind::RParen, "expected ')' after for-loop header")?;
        let body = self.parse_statement_recovering()?;

        Ok(self.alloc_since(
            start,
            NodeKind::For {
                initializer,
                condition,
                update,
                body,
            },
        ))
    }

    fn parse_jump(&mut self, keyword: Keyword) -> Result<NodeId> {
        let start = self.current;
        self.advance(); // consume keyword
        let label = if matches!(self.peek_kind(), TokenKind::Identifier)
            && !self.peek().newline_before
        {
            Some(self.parse_binding_identifier("expected label")?)
        } else {
            None
        };
        self.consume_semicolon("expected ';' after jump statement")?;

        let kind = match keyword {
            Keyword::Break => NodeKind::Break { label },
            _ => NodeKind::Continue { label },
        };
        Ok(self.alloc_since(start, kind))
    }

    fn parse_return(&mut self) -> Result<NodeId> {
        let start = self.current;
        self.advance(); // consume 'return'
        let ends_here = matches!(
            self.peek_kind(),
            TokenKind::Semicolon | TokenKind::RBrace | TokenKind::Eof
        ) || self.peek().newline_before;
        let value = if ends_here {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.consume_semicolon("expected ';' after return statement")?;
        Ok(self.alloc_since(start, NodeKind::Return { value }))
    }

    fn parse_throw(&mut self) -> Result<NodeId> {
        let start = self.current;
        self.advance(); // consume 'throw'
        if self.peek().newline_before || self.is_at_end() {
            let token = self.peek();
            bail!(
                "expected expression after 'throw' at line {}, column {}",
                token.line,
                token.column
            );
        }
        let value = self.parse_expression()?;
        self.consume_semicolon("expected ';' after throw statement")?;
        Ok(self.alloc_since(start, NodeKind::Throw { value }))
    }

    fn parse_with(&mut self) -> Result<NodeId> {
        let start = self.current;
        self.advance(); // consume 'with'
        let object = self.parse_parenthesized_header("with")?;
        let body = self.parse_statement_recovering()?;
        Ok(self.alloc_since(start, NodeKind::With { object, body }))
    }

    fn parse_switch(&mut self) -> Result<NodeId> {
        let start = self.current;
        self.advance(); // consume 'switch'
        let discriminant = self.parse_parenthesized_header("switch")?;
        self.expect_token(TokenKind::LBrace, "expected '{' to start switch body")?;

        let mut cases = Vec::new();
        loop {
            let case_start = self.current;
            let test = match self.peek_kind() {
                TokenKind::RBrace => {
                    self.advance();
                    break;
                }
                TokenKind::Eof if self.options.recover_from_errors => {
                    let span = Self::span_from_token(self.peek());
                    self.report_warning("expected '}' to close switch; closed at end of input", span);
                    break;
                }
                TokenKind::Keyword(Keyword::Case) => {
                    self.advance();
                    Some(self.with_in_allowed(|parser| parser.parse_expression())?)
                }
                TokenKind::Keyword(Keyword::Default) => {
                    self.advance();
                    None
                }
                _ => {
                    let token = self.peek();
                    bail!(
                        "expected 'case' or 'default' in switch body at line {}, column {} (found '{}')",
                        token.line,
                        token.column,
                        token.lexeme
                    );
                }
            };
            self.expect_token(TokenKind::Colon, "expected ':' after switch case")?;
            let body = self.parse_statement_list(|kind| {
                matches!(
                    kind,
                    TokenKind::RBrace
                        | TokenKind::Keyword(Keyword::Case)
                        | TokenKind::Keyword(Keyword::Default)
                )
            })?;
            cases.push(self.alloc_since(case_start, NodeKind::SwitchCase { test, body }));
        }

        Ok(self.alloc_since(
            start,
            NodeKind::Switch {
                discriminant,
                cases,
            },
        ))
    }

    fn parse_try(&mut self) -> Result<NodeId> {
        let start = self.current;
        self.advance(); // consume 'try'
        let block = self.parse_block()?;

        let handler = if self.check_keyword(Keyword::Catch) {
            let catch_start = self.current;
            self.advance(); // consume 'catch'
            self.expect_token(TokenKind::LParen, "expected '(' after 'catch'")?;
            let parameter = self.parse_binding_identifier("expected catch parameter name")?;
            self.expect_closing(TokenKind::RParen, "expected ')' after catch parameter")?;
            let body = self.parse_block()?;
            Some(self.alloc_since(catch_start, NodeKind::CatchClause { parameter, body }))
        } else {
            None
        };

        let finalizer = if self.check_keyword(Keyword::Finally) {
            self.advance();
            Some(self.parse_block()?)
        } else {
            None
        };

        if handler.is_none() && finalizer.is_none() {
            let token = self.peek();
            bail!(
                "expected 'catch' or 'finally' after try block at line {}, column {}",
                token.line,
                token.column
            );
        }

        Ok(self.alloc_since(
            start,
            NodeKind::Try {
                block,
                handler,
                finalizer,
            },
        ))
    }

    fn parse_labeled(&mut self) -> Result<NodeId> {
        let start = self.current;
        let label = self.parse_binding_identifier("expected label")?;
        self.advance(); // consume ':'
        let body = self.parse_statement_recovering()?;
        Ok(self.alloc_since(start, NodeKind::Labeled { label, body }))
    }

    fn parse_function(&mut self, declaration: bool) -> Result<NodeId> {
        let start = self.current;
        self.advance(); // consume 'function'

        let name = if matches!(self.peek_kind(), TokenKind::Identifier) {
            Some(self.parse_binding_identifier("expected function name")?)
        } else if declaration {
            let token = self.peek();
            bail!(
                "expected function name after 'function' at line {}, column {}",
                token.line,
                token.column
            );
        } else {
            None
        };

        self.expect_token(TokenKind::LParen, "expected '(' after function name")?;
        let mut params = Vec::new();
        if matches!(self.peek_kind(), TokenKind::RParen) {
            self.advance();
        } else {
            loop {
                params.push(self.parse_binding_identifier("expected parameter name")?);
                match self.peek_kind() {
                    TokenKind::Comma => {
                        self.advance();
                    }
                    _ => {
                        self.expect_closing(
                            TokenKind::RParen,
                            "expected ',' or ')' in parameter list",
                        )?;
                        break;
                    }
                }
            }
        }

        let body = self.parse_block()?;
        Ok(self.alloc_since(
            start,
            NodeKind::Function {
                name,
                params,
                body,
                declaration,
            },
        ))
    }

    fn parse_expression_statement(&mut self) -> Result<NodeId> {
        let start = self.current;
        let expression = self.parse_expression()?;
        self.consume_semicolon("expected ';' after expression")?;
        Ok(self.alloc_since(start, NodeKind::ExpressionStatement { expression }))
    }

    /// `( expression )` after `if`, `while`, `switch` and friends.
    fn parse_parenthesized_header(&mut self, owner: &str) -> Result<NodeId> {
        self.expect_token(TokenKind::LParen, &format!("expected '(' after '{owner}'"))?;
        let expression = self.with_in_allowed(|parser| parser.parse_expression())?;
        self.expect_closing(
            TokenKind::RParen,
            &format!("expected ')' after {owner} condition"),
        )?;
        Ok(expression)
    }

    fn parse_expression(&mut self) -> Result<NodeId> {
        let start = self.current;
        let first = self.parse_assignment()?;
        if !matches!(self.peek_kind(), TokenKind::Comma) {
            return Ok(first);
        }

        let mut expressions = vec![first];
        while matches!(self.peek_kind(), TokenKind::Comma) {
            self.advance();
            expressions.push(self.parse_assignment()?);
        }
        Ok(self.alloc_since(start, NodeKind::Sequence { expressions }))
    }

    fn parse_assignment(&mut self) -> Result<NodeId> {
        let start = self.current;
        let target = self.parse_conditional()?;
        let Some(operator) = assignment_operator_from_token(self.peek_kind()) else {
            return Ok(target);
        };
        self.advance(); // consume operator
        let value = self.parse_assignment()?;
        Ok(self.alloc_since(
            start,
            NodeKind::Assignment {
                operator,
                target,
                value,
            },
        ))
    }

    fn parse_conditional(&mut self) -> Result<NodeId> {
        let start = self.current;
        let test = self.parse_binary(Precedence::Lowest)?;
        if !matches!(self.peek_kind(), TokenKind::Question) {
            return Ok(test);
        }
        self.advance(); // consume '?'
        let consequent = self.with_in_allowed(|parser| parser.parse_assignment())?;
        self.expect_token(TokenKind::Colon, "expected ':' in conditional expression")?;
        let alternative = self.parse_assignment()?;
        Ok(self.alloc_since(
            start,
            NodeKind::Conditional {
                test,
                consequent,
                alternative,
            },
        ))
    }

    fn parse_binary(&mut self, precedence: Precedence) -> Result<NodeId> {
        let start = self.current;
        let mut left = self.parse_unary()?;

        loop {
            let Some((next_precedence, operator)) = Precedence::of(self.peek_kind(), !self.no_in)
            else {
                break;
            };
            if precedence >= next_precedence {
                break;
            }
            self.advance(); // consume operator
            let right = self.parse_binary(next_precedence)?;
            left = self.alloc_since(
                start,
                NodeKind::Infix {
                    operator,
                    left,
                    right,
                },
            );
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<NodeId> {
        self.nested(|parser| parser.parse_unary_form())
    }

    fn parse_unary_form(&mut self) -> Result<NodeId> {
        let start = self.current;
        let operator = match self.peek_kind() {
            TokenKind::Minus => Some(UnaryOperator::Negative),
            TokenKind::Plus => Some(UnaryOperator::Positive),
            TokenKind::Bang => Some(UnaryOperator::Not),
            TokenKind::Tilde => Some(UnaryOperator::BitNot),
            TokenKind::Keyword(Keyword::Typeof) => Some(UnaryOperator::Typeof),
            TokenKind::Keyword(Keyword::Void) => Some(UnaryOperator::Void),
            TokenKind::Keyword(Keyword::Delete) => Some(UnaryOperator::Delete),
            _ => None,
        };
        if let Some(operator) = operator {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(self.alloc_since(start, NodeKind::Unary { operator, operand }));
        }

        let update = match self.peek_kind() {
            TokenKind::PlusPlus => Some(UpdateOperator::Increment),
            TokenKind::MinusMinus => Some(UpdateOperator::Decrement),
            _ => None,
        };
        if let Some(operator) = update {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(self.alloc_since(
                start,
                NodeKind::Update {
                    operator,
                    prefix: true,
                    operand,
                },
            ));
        }

        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<NodeId> {
        let start = self.current;
        let operand = self.parse_member_expression(true)?;
        if self.peek().newline_before {
            return Ok(operand);
        }
        let operator = match self.peek_kind() {
            TokenKind::PlusPlus => UpdateOperator::Increment,
            TokenKind::MinusMinus => UpdateOperator::Decrement,
            _ => return Ok(operand),
        };
        self.advance();
        Ok(self.alloc_since(
            start,
            NodeKind::Update {
                operator,
                prefix: false,
                operand,
            },
        ))
    }

    /// Member accesses, calls and `new`. Inside the target of `new` calls are
    /// not allowed so that the argument list binds to the construction.
    fn parse_member_expression(&mut self, allow_call: bool) -> Result<NodeId> {
        let start = self.current;
        let mut expression = if self.check_keyword(Keyword::New) {
            self.advance(); // consume 'new'
            let target = self.nested(|parser| parser.parse_member_expression(false))?;
            let arguments = if matches!(self.peek_kind(), TokenKind::LParen) {
                Some(self.parse_arguments()?)
            } else {
                None
            };
            self.alloc_since(start, NodeKind::New { target, arguments })
        } else {
            self.parse_primary()?
        };

        loop {
            match self.peek_kind() {
                TokenKind::Dot => {
                    self.advance(); // consume '.'
                    let property = self.parse_property_name()?;
                    expression = self.alloc_since(
                        start,
                        NodeKind::PropertyAccess {
                            target: expression,
                            property,
                        },
                    );
                }
                TokenKind::LBracket => {
                    self.advance(); // consume '['
                    let element = self.with_in_allowed(|parser| parser.parse_expression())?;
                    self.expect_closing(TokenKind::RBracket, "expected ']' after index expression")?;
                    expression = self.alloc_since(
                        start,
                        NodeKind::ElementAccess {
                            target: expression,
                            element,
                        },
                    );
                }
                TokenKind::LParen if allow_call => {
                    let arguments = self.parse_arguments()?;
                    expression = self.alloc_since(
                        start,
                        NodeKind::Call {
                            target: expression,
                            arguments,
                        },
                    );
                }
                _ => break,
            }
        }

        Ok(expression)
    }

    fn parse_arguments(&mut self) -> Result<Vec<NodeId>> {
        self.expect_token(TokenKind::LParen, "expected '(' to start argument list")?;
        let mut arguments = Vec::new();
        if matches!(self.peek_kind(), TokenKind::RParen) {
            self.advance();
            return Ok(arguments);
        }

        loop {
            arguments.push(self.with_in_allowed(|parser| parser.parse_assignment())?);
            match self.peek_kind() {
                TokenKind::Comma => {
                    self.advance();
                }
                _ => {
                    self.expect_closing(TokenKind::RParen, "expected ',' or ')' in argument list")?;
                    break;
                }
            }
        }

        Ok(arguments)
    }

    fn parse_primary(&mut self) -> Result<NodeId> {
        let start = self.current;
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Identifier => {
                self.advance();
                Ok(self.alloc_since(start, NodeKind::Identifier { name: token.lexeme }))
            }
            TokenKind::NumberLiteral(value) => {
                self.advance();
                Ok(self.alloc_since(
                    start,
                    NodeKind::NumberLiteral {
                        value,
                        raw: token.lexeme,
                    },
                ))
            }
            TokenKind::StringLiteral(value) => {
                self.advance();
                let quote = token.lexeme.chars().next().unwrap_or('"');
                Ok(self.alloc_since(start, NodeKind::StringLiteral { value, quote }))
            }
            TokenKind::BooleanLiteral(value) => {
                self.advance();
                Ok(self.alloc_since(start, NodeKind::BooleanLiteral { value }))
            }
            TokenKind::RegExpLiteral { pattern, flags } => {
                self.advance();
                Ok(self.alloc_since(start, NodeKind::RegExpLiteral { pattern, flags }))
            }
            TokenKind::Keyword(Keyword::Null) => {
                self.advance();
                Ok(self.alloc_since(start, NodeKind::NullLiteral))
            }
            TokenKind::Keyword(Keyword::This) => {
                self.advance();
                Ok(self.alloc_since(start, NodeKind::This))
            }
            TokenKind::Keyword(Keyword::Function) => self.parse_function(false),
            TokenKind::LParen => {
                self.advance(); // consume '('
                let expression = self.with_in_allowed(|parser| parser.parse_expression())?;
                self.expect_closing(TokenKind::RParen, "expected ')' after expression")?;
                Ok(self.alloc_since(start, NodeKind::Parenthesized { expression }))
            }
            TokenKind::LBracket => self.parse_array_literal(),
            TokenKind::LBrace => self.parse_object_literal(),
            TokenKind::Eof => bail!(
                "unexpected end of input at line {}, column {}",
                token.line,
                token.column
            ),
            other => bail!(
                "unexpected token {:?} at line {}, column {}",
                other,
                token.line,
                token.column
            ),
        }
    }

    fn parse_array_literal(&mut self) -> Result<NodeId> {
        let start = self.current;
        self.advance(); // consume '['

        let mut elements = Vec::new();
        loop {
            match self.peek_kind() {
                TokenKind::RBracket => {
                    self.advance();
                    break;
                }
                TokenKind::Comma => {
                    self.advance();
                    elements.push(None);
                    continue;
                }
                _ => {}
            }

            let element = self.with_in_allowed(|parser| parser.parse_assignment())?;
            elements.push(Some(element));
            match self.peek_kind() {
                TokenKind::Comma => {
                    self.advance();
                }
                _ => {
                    self.expect_closing(
                        TokenKind::RBracket,
                        "expected ',' or ']' in array literal",
                    )?;
                    break;
                }
            }
        }

        Ok(self.alloc_since(start, NodeKind::ArrayLiteral { elements }))
    }

    fn parse_object_literal(&mut self) -> Result<NodeId> {
        let start = self.current;
        self.advance(); // consume '{'

        let mut properties = Vec::new();
        loop {
            if matches!(self.peek_kind(), TokenKind::RBrace) {
                self.advance();
                break;
            }

            let property_start = self.current;
            let key = self.parse_property_key()?;
            self.expect_token(TokenKind::Colon, "expected ':' after property name")?;
            let value = self.with_in_allowed(|parser| parser.parse_assignment())?;
            properties.push(self.alloc_since(property_start, NodeKind::ObjectProperty { key, value }));

            match self.peek_kind() {
                TokenKind::Comma => {
                    self.advance();
                }
                _ => {
                    self.expect_closing(
                        TokenKind::RBrace,
                        "expected ',' or '}' in object literal",
                    )?;
                    break;
                }
            }
        }

        Ok(self.alloc_since(start, NodeKind::ObjectLiteral { properties }))
    }

    fn parse_property_key(&mut self) -> Result<NodeId> {
        let start = self.current;
        let token = self.peek().clone();
        match token.kind {
            TokenKind::StringLiteral(value) => {
                self.advance();
                let quote = token.lexeme.chars().next().unwrap_or('"');
                Ok(self.alloc_since(start, NodeKind::StringLiteral { value, quote }))
            }
            TokenKind::NumberLiteral(value) => {
                self.advance();
                Ok(self.alloc_since(
                    start,
                    NodeKind::NumberLiteral {
                        value,
                        raw: token.lexeme,
                    },
                ))
            }
            _ => self.parse_property_name(),
        }
    }

    /// Identifier after `.` or as an object key; reserved words are allowed.
    fn parse_property_name(&mut self) -> Result<NodeId> {
        let start = self.current;
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Identifier | TokenKind::Keyword(_) | TokenKind::BooleanLiteral(_) => {
                self.advance();
                Ok(self.alloc_since(start, NodeKind::Identifier { name: token.lexeme }))
            }
            ref other => bail!(
                "expected property name, found {:?} at line {}, column {}",
                other,
                token.line,
                token.column
            ),
        }
    }

    fn parse_binding_identifier(&mut self, message: &str) -> Result<NodeId> {
        let start = self.current;
        let token = self.peek().clone();
        if !matches!(token.kind, TokenKind::Identifier) {
            bail!(
                "{} at line {}, column {} (found '{}')",
                message,
                token.line,
                token.column,
                token.lexeme
            );
        }
        self.advance();
        Ok(self.alloc_since(start, NodeKind::Identifier { name: token.lexeme }))
    }

    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.depth >= MAX_NESTING_DEPTH {
            let token = self.peek();
            bail!(
                "nesting deeper than {} levels at line {}, column {}",
                MAX_NESTING_DEPTH,
                token.line,
                token.column
            );
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn with_in_allowed<T>(&mut self, parse: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let saved = std::mem::replace(&mut self.no_in, false);
        let result = parse(self);
        self.no_in = saved;
        result
    }

    fn with_in_disallowed<T>(&mut self, parse: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let saved = std::mem::replace(&mut self.no_in, true);
        let result = parse(self);
        self.no_in = saved;
        result
    }

    /// Automatic semicolon insertion: a missing `;` is accepted before `}`,
    /// at end of input and after a line break.
    fn consume_semicolon(&mut self, message: &str) -> Result<()> {
        match self.peek_kind() {
            TokenKind::Semicolon => {
                self.advance();
                Ok(())
            }
            TokenKind::RBrace | TokenKind::Eof => Ok(()),
            _ if self.peek().newline_before => Ok(()),
            _ => {
                let token = self.peek();
                bail!(
                    "{} at line {}, column {} (found '{}')",
                    message,
                    token.line,
                    token.column,
                    token.lexeme
                );
            }
        }
    }

    fn expect_token(&mut self, expected: TokenKind, message: &str) -> Result<()> {
        if std::mem::discriminant(self.peek_kind()) == std::mem::discriminant(&expected) {
            self.advance();
            Ok(())
        } else {
            let token = self.peek();
            bail!(
                "{} at line {}, column {} (found '{}')",
                message,
                token.line,
                token.column,
                token.lexeme
            );
        }
    }

    /// Like [`Self::expect_token`] for closing brackets, except that in
    /// recovery mode end of input closes the bracket implicitly.
    fn expect_closing(&mut self, expected: TokenKind, message: &str) -> Result<()> {
        if self.is_at_end() && self.options.recover_from_errors {
            let span = Self::span_from_token(self.peek());
            self.report_warning(format!("{message}; closed at end of input"), span);
            return Ok(());
        }
        self.expect_token(expected, message)
    }

    fn check_keyword(&self, keyword: Keyword) -> bool {
        matches!(self.peek_kind(), TokenKind::Keyword(kw) if *kw == keyword)
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.tokens[self.current].kind
    }

    fn peek_kind_at(&self, offset: usize) -> Option<&TokenKind> {
        self.tokens
            .get(self.current + offset)
            .map(|token| &token.kind)
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        &self.tokens[self.current - 1]
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }
}

fn assignment_operator_from_token(kind: &TokenKind) -> Option<AssignmentOperator> {
    let operator = match kind {
        TokenKind::Equal => AssignmentOperator::Assign,
        TokenKind::PlusEqual => AssignmentOperator::Add,
        TokenKind::MinusEqual => AssignmentOperator::Subtract,
        TokenKind::StarEqual => AssignmentOperator::Multiply,
        TokenKind::SlashEqual => AssignmentOperator::Divide,
        TokenKind::PercentEqual => AssignmentOperator::Modulo,
        TokenKind::LessLessEqual => AssignmentOperator::ShiftLeft,
        TokenKind::GreaterGreaterEqual => AssignmentOperator::ShiftRight,
        TokenKind::GreaterGreaterGreaterEqual => AssignmentOperator::UnsignedShiftRight,
        TokenKind::AmpersandEqual => AssignmentOperator::BitAnd,
        TokenKind::PipeEqual => AssignmentOperator::BitOr,
        TokenKind::CaretEqual => AssignmentOperator::BitXor,
        _ => return None,
    };
    Some(operator)
}
