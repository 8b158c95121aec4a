use std::fmt::Write;

use ecma_support::escape_string_contents;

use crate::ast::{NodeId, NodeKind, SyntaxTree};

const INDENT: &str = "  ";

impl SyntaxTree {
    /// Print a subtree back as normalized source text.
    ///
    /// Operators are surrounded by single spaces, statements end with `;`
    /// and blocks are indented by two spaces per level. Error nodes print the
    /// text the parser skipped.
    pub fn to_source(&self, id: NodeId) -> String {
        let mut renderer = Renderer {
            tree: self,
            output: String::new(),
            depth: 0,
        };
        renderer.node(id);
        renderer.output
    }
}

struct Renderer<'a> {
    tree: &'a SyntaxTree,
    output: String,
    depth: usize,
}

impl Renderer<'_> {
    fn push(&mut self, text: &str) {
        self.output.push_str(text);
    }

    fn newline(&mut self) {
        self.output.push('\n');
        for _ in 0..self.depth {
            self.output.push_str(INDENT);
        }
    }

    fn list(&mut self, items: &[NodeId], separator: &str) {
        for (index, item) in items.iter().enumerate() {
            if index > 0 {
                self.push(separator);
            }
            self.node(*item);
        }
    }

    fn optional(&mut self, item: Option<NodeId>) {
        if let Some(item) = item {
            self.node(item);
        }
    }

    fn block_body(&mut self, statements: &[NodeId]) {
        if statements.is_empty() {
            self.push("{}");
            return;
        }
        self.push("{");
        self.depth += 1;
        for statement in statements {
            self.newline();
            self.node(*statement);
        }
        self.depth -= 1;
        self.newline();
        self.push("}");
    }

    fn node(&mut self, id: NodeId) {
        let tree = self.tree;
        match tree.kind(id) {
            NodeKind::Script { statements } => {
                for (index, statement) in statements.iter().enumerate() {
                    if index > 0 {
                        self.newline();
                    }
                    self.node(*statement);
                }
            }
            NodeKind::Identifier { name } => self.push(name),
            NodeKind::NumberLiteral { raw, .. } => self.push(raw),
            NodeKind::StringLiteral { value, quote } => {
                let escaped = escape_string_contents(value, *quote);
                let _ = write!(self.output, "{quote}{escaped}{quote}");
            }
            NodeKind::BooleanLiteral { value } => {
                self.push(if *value { "true" } else { "false" })
            }
            NodeKind::NullLiteral => self.push("null"),
            NodeKind::This => self.push("this"),
            NodeKind::RegExpLiteral { pattern, flags } => {
                let _ = write!(self.output, "/{pattern}/{flags}");
            }
            NodeKind::ObjectLiteral { properties } => {
                self.push("{");
                self.list(properties, ", ");
                self.push("}");
            }
            NodeKind::ObjectProperty { key, value } => {
                self.node(*key);
                self.push(": ");
                self.node(*value);
            }
            NodeKind::ArrayLiteral { elements } => {
                self.push("[");
                for (index, element) in elements.iter().enumerate() {
                    if index > 0 {
                        self.push(", ");
                    }
                    self.optional(*element);
                }
                if matches!(elements.last(), Some(None)) {
                    self.push(",");
                }
                self.push("]");
            }
            NodeKind::Infix {
                operator,
                left,
                right,
            } => {
                self.node(*left);
                let _ = write!(self.output, " {} ", operator.symbol());
                self.node(*right);
            }
            NodeKind::Assignment {
                operator,
                target,
                value,
            } => {
                self.node(*target);
                let _ = write!(self.output, " {} ", operator.symbol());
                self.node(*value);
            }
            NodeKind::PropertyAccess { target, property } => {
                self.node(*target);
                self.push(".");
                self.node(*property);
            }
            NodeKind::ElementAccess { target, element } => {
                self.node(*target);
                self.push("[");
                self.node(*element);
                self.push("]");
            }
            NodeKind::Call { target, arguments } => {
                self.node(*target);
                self.push("(");
                self.list(arguments, ", ");
                self.push(")");
            }
            NodeKind::New { target, arguments } => {
                self.push("new ");
                self.node(*target);
                if let Some(arguments) = arguments {
                    self.push("(");
                    self.list(arguments, ", ");
                    self.push(")");
                }
            }
            NodeKind::Unary { operator, operand } => {
                self.push(operator.symbol());
                if operator.is_word() {
                    self.push(" ");
                }
                self.node(*operand);
            }
            NodeKind::Update {
                operator,
                prefix,
                operand,
            } => {
                if *prefix {
                    self.push(operator.symbol());
                    self.node(*operand);
                } else {
                    self.node(*operand);
                    self.push(operator.symbol());
                }
            }
            NodeKind::Conditional {
                test,
                consequent,
                alternative,
            } => {
                self.node(*test);
                self.push(" ? ");
                self.node(*consequent);
                self.push(" : ");
                self.node(*alternative);
            }
            NodeKind::Parenthesized { expression } => {
                self.push("(");
                self.node(*expression);
                self.push(")");
            }
            NodeKind::Sequence { expressions } => self.list(expressions, ", "),
            NodeKind::Function {
                name, params, body, ..
            } => {
                self.push("function");
                if let Some(name) = name {
                    self.push(" ");
                    self.node(*name);
                }
                self.push("(");
                self.list(params, ", ");
                self.push(") ");
                self.node(*body);
            }
            NodeKind::ExpressionStatement { expression } => {
                self.node(*expression);
                self.push(";");
            }
            NodeKind::VariableDeclaration {
                variables,
                statement,
            } => {
                self.push("var ");
                self.list(variables, ", ");
                if *statement {
                    self.push(";");
                }
            }
            NodeKind::VariableInitializer {
                target,
                initializer,
            } => {
                self.node(*target);
                if let Some(initializer) = initializer {
                    self.push(" = ");
                    self.node(*initializer);
                }
            }
            NodeKind::Block { statements } => self.block_body(statements),
            NodeKind::Empty => self.push(";"),
            NodeKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.push("if (");
                self.node(*condition);
                self.push(") ");
                self.node(*then_branch);
                if let Some(else_branch) = else_branch {
                    self.push(" else ");
                    self.node(*else_branch);
                }
            }
            NodeKind::While { condition, body } => {
                self.push("while (");
                self.node(*condition);
                self.push(") ");
                self.node(*body);
            }
            NodeKind::DoWhile { body, condition } => {
                self.push("do ");
                self.node(*body);
                self.push(" while (");
                self.node(*condition);
                self.push(");");
            }
            NodeKind::For {
                initializer,
                condition,
                update,
                body,
            } => {
                self.push("for (");
                self.optional(*initializer);
                self.push("; ");
                self.optional(*condition);
                self.push("; ");
                self.optional(*update);
                self.push(") ");
                self.node(*body);
            }
            NodeKind::ForIn {
                iterator,
                object,
                body,
            } => {
                self.push("for (");
                self.node(*iterator);
                self.push(" in ");
                self.node(*object);
                self.push(") ");
                self.node(*body);
            }
            NodeKind::Switch {
                discriminant,
                cases,
            } => {
                self.push("switch (");
                self.node(*discriminant);
                self.push(") ");
                self.block_body(cases);
            }
            NodeKind::SwitchCase { test, body } => {
                match test {
                    Some(test) => {
                        self.push("case ");
                        self.node(*test);
                        self.push(":");
                    }
                    None => self.push("default:"),
                }
                self.depth += 1;
                for statement in body {
                    self.newline();
                    self.node(*statement);
                }
                self.depth -= 1;
            }
            NodeKind::Break { label } => self.jump("break", *label),
            NodeKind::Continue { label } => self.jump("continue", *label),
            NodeKind::Return { value } => {
                self.push("return");
                if let Some(value) = value {
                    self.push(" ");
                    self.node(*value);
                }
                self.push(";");
            }
            NodeKind::Throw { value } => {
                self.push("throw ");
                self.node(*value);
                self.push(";");
            }
            NodeKind::Try {
                block,
                handler,
                finalizer,
            } => {
                self.push("try ");
                self.node(*block);
                if let Some(handler) = handler {
                    self.push(" ");
                    self.node(*handler);
                }
                if let Some(finalizer) = finalizer {
                    self.push(" finally ");
                    self.node(*finalizer);
                }
            }
            NodeKind::CatchClause { parameter, body } => {
                self.push("catch (");
                self.node(*parameter);
                self.push(") ");
                self.node(*body);
            }
            NodeKind::Labeled { label, body } => {
                self.node(*label);
                self.push(": ");
                self.node(*body);
            }
            NodeKind::With { object, body } => {
                self.push("with (");
                self.node(*object);
                self.push(") ");
                self.node(*body);
            }
            NodeKind::Error { text } => self.push(text),
        }
    }

    fn jump(&mut self, keyword: &str, label: Option<NodeId>) {
        self.push(keyword);
        if let Some(label) = label {
            self.push(" ");
            self.node(label);
        }
        self.push(";");
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::{parse_source, ParseOptions};
    use crate::source::SourceFile;

    fn render(text: &str) -> String {
        let source = SourceFile::fragment(text);
        let output = parse_source(&source, ParseOptions::strict()).expect("parse");
        let root = output.tree.root().expect("root");
        output.tree.to_source(root)
    }

    #[test]
    fn spaces_binary_operators() {
        assert_eq!(render("a+b*c"), "a + b * c;");
        assert_eq!(render("x=y"), "x = y;");
    }

    #[test]
    fn prints_blocks_with_indentation() {
        assert_eq!(render("if(a){b()}"), "if (a) {\n  b();\n}");
        assert_eq!(render("while (x) {}"), "while (x) {}");
    }

    #[test]
    fn keeps_literal_spelling() {
        assert_eq!(render("x = 'it\\'s'"), "x = 'it\\'s';");
        assert_eq!(render("n = 0x1F"), "n = 0x1F;");
        assert_eq!(render("r = /ab+c/gi"), "r = /ab+c/gi;");
    }

    #[test]
    fn prints_literals_and_constructions() {
        assert_eq!(render("o = {a:1,'b':[1,,2]}"), "o = {a: 1, 'b': [1, , 2]};");
        assert_eq!(render("new Foo"), "new Foo;");
        assert_eq!(render("typeof x"), "typeof x;");
        assert_eq!(render("var a = 1, b"), "var a = 1, b;");
    }

    #[test]
    fn prints_for_headers() {
        assert_eq!(render("for(i=0;;){}"), "for (i = 0; ; ) {}");
        assert_eq!(render("for (var k in o) {}"), "for (var k in o) {}");
    }
}
