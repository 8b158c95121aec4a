use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceSpan {
    pub line: usize,
    pub column: usize,
    pub end_line: usize,
    pub end_column: usize,
}

impl SourceSpan {
    pub fn new(line: usize, column: usize, end_line: usize, end_column: usize) -> Self {
        Self {
            line,
            column,
            end_line,
            end_column,
        }
    }

    pub fn single_point(line: usize, column: usize) -> Self {
        Self::new(line, column, line, column)
    }

    pub fn union(a: &Self, b: &Self) -> Self {
        if a.line == 0 {
            return *b;
        }
        if b.line == 0 {
            return *a;
        }

        let (start_line, start_column) =
            if (a.line < b.line) || (a.line == b.line && a.column <= b.column) {
                (a.line, a.column)
            } else {
                (b.line, b.column)
            };

        let (end_line, end_column) = if (a.end_line > b.end_line)
            || (a.end_line == b.end_line && a.end_column >= b.end_column)
        {
            (a.end_line, a.end_column)
        } else {
            (b.end_line, b.end_column)
        };

        Self::new(start_line, start_column, end_line, end_column)
    }

    /// Inclusive on both ends, matching how token spans are built.
    pub fn contains(&self, line: usize, column: usize) -> bool {
        if self.line == 0 {
            return false;
        }
        let after_start = line > self.line || (line == self.line && column >= self.column);
        let before_end =
            line < self.end_line || (line == self.end_line && column <= self.end_column);
        after_start && before_end
    }
}

impl Default for SourceSpan {
    fn default() -> Self {
        Self {
            line: 0,
            column: 0,
            end_line: 0,
            end_column: 0,
        }
    }
}

/// Index of a node inside its [`SyntaxTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfixOperator {
    Or,
    And,
    BitOr,
    BitXor,
    BitAnd,
    Equal,
    NotEqual,
    StrictEqual,
    StrictNotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Instanceof,
    In,
    ShiftLeft,
    ShiftRight,
    UnsignedShiftRight,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

impl InfixOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            InfixOperator::Or => "||",
            InfixOperator::And => "&&",
            InfixOperator::BitOr => "|",
            InfixOperator::BitXor => "^",
            InfixOperator::BitAnd => "&",
            InfixOperator::Equal => "==",
            InfixOperator::NotEqual => "!=",
            InfixOperator::StrictEqual => "===",
            InfixOperator::StrictNotEqual => "!==",
            InfixOperator::Less => "<",
            InfixOperator::LessEqual => "<=",
            InfixOperator::Greater => ">",
            InfixOperator::GreaterEqual => ">=",
            InfixOperator::Instanceof => "instanceof",
            InfixOperator::In => "in",
            InfixOperator::ShiftLeft => "<<",
            InfixOperator::ShiftRight => ">>",
            InfixOperator::UnsignedShiftRight => ">>>",
            InfixOperator::Add => "+",
            InfixOperator::Subtract => "-",
            InfixOperator::Multiply => "*",
            InfixOperator::Divide => "/",
            InfixOperator::Modulo => "%",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentOperator {
    Assign,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    ShiftLeft,
    ShiftRight,
    UnsignedShiftRight,
    BitAnd,
    BitOr,
    BitXor,
}

impl AssignmentOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            AssignmentOperator::Assign => "=",
            AssignmentOperator::Add => "+=",
            AssignmentOperator::Subtract => "-=",
            AssignmentOperator::Multiply => "*=",
            AssignmentOperator::Divide => "/=",
            AssignmentOperator::Modulo => "%=",
            AssignmentOperator::ShiftLeft => "<<=",
            AssignmentOperator::ShiftRight => ">>=",
            AssignmentOperator::UnsignedShiftRight => ">>>=",
            AssignmentOperator::BitAnd => "&=",
            AssignmentOperator::BitOr => "|=",
            AssignmentOperator::BitXor => "^=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Negative,
    Positive,
    Not,
    BitNot,
    Typeof,
    Void,
    Delete,
}

impl UnaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOperator::Negative => "-",
            UnaryOperator::Positive => "+",
            UnaryOperator::Not => "!",
            UnaryOperator::BitNot => "~",
            UnaryOperator::Typeof => "typeof",
            UnaryOperator::Void => "void",
            UnaryOperator::Delete => "delete",
        }
    }

    pub fn is_word(self) -> bool {
        matches!(
            self,
            UnaryOperator::Typeof | UnaryOperator::Void | UnaryOperator::Delete
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOperator {
    Increment,
    Decrement,
}

impl UpdateOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            UpdateOperator::Increment => "++",
            UpdateOperator::Decrement => "--",
        }
    }
}

/// Node category together with the category-specific children.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Script {
        statements: Vec<NodeId>,
    },

    // Expressions
    Identifier {
        name: String,
    },
    NumberLiteral {
        value: f64,
        raw: String,
    },
    StringLiteral {
        value: String,
        quote: char,
    },
    BooleanLiteral {
        value: bool,
    },
    NullLiteral,
    This,
    RegExpLiteral {
        pattern: String,
        flags: String,
    },
    ObjectLiteral {
        properties: Vec<NodeId>,
    },
    ObjectProperty {
        key: NodeId,
        value: NodeId,
    },
    /// `None` entries are elisions such as the hole in `[a, , b]`.
    ArrayLiteral {
        elements: Vec<Option<NodeId>>,
    },
    Infix {
        operator: InfixOperator,
        left: NodeId,
        right: NodeId,
    },
    Assignment {
        operator: AssignmentOperator,
        target: NodeId,
        value: NodeId,
    },
    PropertyAccess {
        target: NodeId,
        property: NodeId,
    },
    ElementAccess {
        target: NodeId,
        element: NodeId,
    },
    Call {
        target: NodeId,
        arguments: Vec<NodeId>,
    },
    /// `arguments` is `None` for `new Foo` written without parentheses.
    New {
        target: NodeId,
        arguments: Option<Vec<NodeId>>,
    },
    Unary {
        operator: UnaryOperator,
        operand: NodeId,
    },
    Update {
        operator: UpdateOperator,
        prefix: bool,
        operand: NodeId,
    },
    Conditional {
        test: NodeId,
        consequent: NodeId,
        alternative: NodeId,
    },
    Parenthesized {
        expression: NodeId,
    },
    Sequence {
        expressions: Vec<NodeId>,
    },
    Function {
        name: Option<NodeId>,
        params: Vec<NodeId>,
        body: NodeId,
        declaration: bool,
    },

    // Statements
    ExpressionStatement {
        expression: NodeId,
    },
    /// `statement` is false for the `var` clause of a `for` header.
    VariableDeclaration {
        variables: Vec<NodeId>,
        statement: bool,
    },
    VariableInitializer {
        target: NodeId,
        initializer: Option<NodeId>,
    },
    Block {
        statements: Vec<NodeId>,
    },
    Empty,
    If {
        condition: NodeId,
        then_branch: NodeId,
        else_branch: Option<NodeId>,
    },
    While {
        condition: NodeId,
        body: NodeId,
    },
    DoWhile {
        body: NodeId,
        condition: NodeId,
    },
    For {
        initializer: Option<NodeId>,
        condition: Option<NodeId>,
        update: Option<NodeId>,
        body: NodeId,
    },
    ForIn {
        iterator: NodeId,
        object: NodeId,
        body: NodeId,
    },
    Switch {
        discriminant: NodeId,
        cases: Vec<NodeId>,
    },
    /// `test` is `None` for the `default:` clause.
    SwitchCase {
        test: Option<NodeId>,
        body: Vec<NodeId>,
    },
    Break {
        label: Option<NodeId>,
    },
    Continue {
        label: Option<NodeId>,
    },
    Return {
        value: Option<NodeId>,
    },
    Throw {
        value: NodeId,
    },
    Try {
        block: NodeId,
        handler: Option<NodeId>,
        finalizer: Option<NodeId>,
    },
    CatchClause {
        parameter: NodeId,
        body: NodeId,
    },
    Labeled {
        label: NodeId,
        body: NodeId,
    },
    With {
        object: NodeId,
        body: NodeId,
    },
    /// Statement the parser skipped while recovering; keeps the raw text.
    Error {
        text: String,
    },
}

impl NodeKind {
    /// Direct children in source order.
    pub fn children(&self) -> Vec<NodeId> {
        match self {
            NodeKind::Script { statements } | NodeKind::Block { statements } => statements.clone(),
            NodeKind::Identifier { .. }
            | NodeKind::NumberLiteral { .. }
            | NodeKind::StringLiteral { .. }
            | NodeKind::BooleanLiteral { .. }
            | NodeKind::NullLiteral
            | NodeKind::This
            | NodeKind::RegExpLiteral { .. }
            | NodeKind::Empty
            | NodeKind::Error { .. } => Vec::new(),
            NodeKind::ObjectLiteral { properties } => properties.clone(),
            NodeKind::ObjectProperty { key, value } => vec![*key, *value],
            NodeKind::ArrayLiteral { elements } => elements.iter().flatten().copied().collect(),
            NodeKind::Infix { left, right, .. } => vec![*left, *right],
            NodeKind::Assignment { target, value, .. } => vec![*target, *value],
            NodeKind::PropertyAccess { target, property } => vec![*target, *property],
            NodeKind::ElementAccess { target, element } => vec![*target, *element],
            NodeKind::Call { target, arguments } => {
                let mut children = vec![*target];
                children.extend(arguments.iter().copied());
                children
            }
            NodeKind::New { target, arguments } => {
                let mut children = vec![*target];
                children.extend(arguments.iter().flatten().copied());
                children
            }
            NodeKind::Unary { operand, .. } | NodeKind::Update { operand, .. } => vec![*operand],
            NodeKind::Conditional {
                test,
                consequent,
                alternative,
            } => vec![*test, *consequent, *alternative],
            NodeKind::Parenthesized { expression }
            | NodeKind::ExpressionStatement { expression } => vec![*expression],
            NodeKind::Sequence { expressions } => expressions.clone(),
            NodeKind::Function {
                name, params, body, ..
            } => {
                let mut children: Vec<NodeId> = name.iter().copied().collect();
                children.extend(params.iter().copied());
                children.push(*body);
                children
            }
            NodeKind::VariableDeclaration { variables, .. } => variables.clone(),
            NodeKind::VariableInitializer {
                target,
                initializer,
            } => {
                let mut children = vec![*target];
                children.extend(initializer.iter().copied());
                children
            }
            NodeKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let mut children = vec![*condition, *then_branch];
                children.extend(else_branch.iter().copied());
                children
            }
            NodeKind::While { condition, body } => vec![*condition, *body],
            NodeKind::DoWhile { body, condition } => vec![*body, *condition],
            NodeKind::For {
                initializer,
                condition,
                update,
                body,
            } => {
                let mut children: Vec<NodeId> = [initializer, condition, update]
                    .into_iter()
                    .flatten()
                    .copied()
                    .collect();
                children.push(*body);
                children
            }
            NodeKind::ForIn {
                iterator,
                object,
                body,
            } => vec![*iterator, *object, *body],
            NodeKind::Switch {
                discriminant,
                cases,
            } => {
                let mut children = vec![*discriminant];
                children.extend(cases.iter().copied());
                children
            }
            NodeKind::SwitchCase { test, body } => {
                let mut children: Vec<NodeId> = test.iter().copied().collect();
                children.extend(body.iter().copied());
                children
            }
            NodeKind::Break { label } | NodeKind::Continue { label } => {
                label.iter().copied().collect()
            }
            NodeKind::Return { value } => value.iter().copied().collect(),
            NodeKind::Throw { value } => vec![*value],
            NodeKind::Try {
                block,
                handler,
                finalizer,
            } => {
                let mut children = vec![*block];
                children.extend(handler.iter().copied());
                children.extend(finalizer.iter().copied());
                children
            }
            NodeKind::CatchClause { parameter, body } => vec![*parameter, *body],
            NodeKind::Labeled { label, body } => vec![*label, *body],
            NodeKind::With { object, body } => vec![*object, *body],
        }
    }

    /// Forms that share the binary-operator shape (operands joined by a
    /// separator) with infix expressions. A comma sequence is one.
    pub fn is_binary_form(&self) -> bool {
        matches!(
            self,
            NodeKind::Infix { .. }
                | NodeKind::Sequence { .. }
                | NodeKind::Assignment { .. }
                | NodeKind::PropertyAccess { .. }
                | NodeKind::ObjectProperty { .. }
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Script { .. } => "Script",
            NodeKind::Identifier { .. } => "Identifier",
            NodeKind::NumberLiteral { .. } => "NumberLiteral",
            NodeKind::StringLiteral { .. } => "StringLiteral",
            NodeKind::BooleanLiteral { .. } => "BooleanLiteral",
            NodeKind::NullLiteral => "NullLiteral",
            NodeKind::This => "This",
            NodeKind::RegExpLiteral { .. } => "RegExpLiteral",
            NodeKind::ObjectLiteral { .. } => "ObjectLiteral",
            NodeKind::ObjectProperty { .. } => "ObjectProperty",
            NodeKind::ArrayLiteral { .. } => "ArrayLiteral",
            NodeKind::Infix { .. } => "Infix",
            NodeKind::Assignment { .. } => "Assignment",
            NodeKind::PropertyAccess { .. } => "PropertyAccess",
            NodeKind::ElementAccess { .. } => "ElementAccess",
            NodeKind::Call { .. } => "Call",
            NodeKind::New { .. } => "New",
            NodeKind::Unary { .. } => "Unary",
            NodeKind::Update { .. } => "Update",
            NodeKind::Conditional { .. } => "Conditional",
            NodeKind::Parenthesized { .. } => "Parenthesized",
            NodeKind::Sequence { .. } => "Sequence",
            NodeKind::Function { .. } => "Function",
            NodeKind::ExpressionStatement { .. } => "ExpressionStatement",
            NodeKind::VariableDeclaration { .. } => "VariableDeclaration",
            NodeKind::VariableInitializer { .. } => "VariableInitializer",
            NodeKind::Block { .. } => "Block",
            NodeKind::Empty => "Empty",
            NodeKind::If { .. } => "If",
            NodeKind::While { .. } => "While",
            NodeKind::DoWhile { .. } => "DoWhile",
            NodeKind::For { .. } => "For",
            NodeKind::ForIn { .. } => "ForIn",
            NodeKind::Switch { .. } => "Switch",
            NodeKind::SwitchCase { .. } => "SwitchCase",
            NodeKind::Break { .. } => "Break",
            NodeKind::Continue { .. } => "Continue",
            NodeKind::Return { .. } => "Return",
            NodeKind::Throw { .. } => "Throw",
            NodeKind::Try { .. } => "Try",
            NodeKind::CatchClause { .. } => "CatchClause",
            NodeKind::Labeled { .. } => "Labeled",
            NodeKind::With { .. } => "With",
            NodeKind::Error { .. } => "Error",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub span: SourceSpan,
    parent: Option<NodeId>,
}

impl Node {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }
}

/// Arena of syntax nodes. Parent links are indices into the same arena and
/// never own anything.
#[derive(Debug, Clone, Default)]
pub struct SyntaxTree {
    nodes: Vec<Node>,
    root: Option<NodeId>,
}

impl SyntaxTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node and adopt its children.
    pub fn alloc(&mut self, kind: NodeKind, span: SourceSpan) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        for child in kind.children() {
            if let Some(node) = self.nodes.get_mut(child.index()) {
                node.parent = Some(id);
            }
        }
        self.nodes.push(Node {
            kind,
            span,
            parent: None,
        });
        id
    }

    pub fn set_root(&mut self, root: NodeId) {
        self.root = Some(root);
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.node(id).kind
    }

    pub fn span(&self, id: NodeId) -> SourceSpan {
        self.node(id).span
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.kind(id).children()
    }

    /// Top-level statements of the script, empty when nothing was parsed.
    pub fn statements(&self) -> &[NodeId] {
        match self.root.map(|root| self.kind(root)) {
            Some(NodeKind::Script { statements }) => statements,
            _ => &[],
        }
    }

    /// The node itself followed by each ancestor up to the root.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: Some(id),
        }
    }

    /// Pre-order walk of `id` and all of its descendants.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            tree: self,
            stack: vec![id],
        }
    }

    /// Innermost node reachable from the root whose span covers the position.
    pub fn node_at(&self, line: usize, column: usize) -> Option<NodeId> {
        let mut current = self.root?;
        if !self.span(current).contains(line, column) {
            return None;
        }
        'descend: loop {
            for child in self.children(current) {
                if self.span(child).contains(line, column) {
                    current = child;
                    continue 'descend;
                }
            }
            return Some(current);
        }
    }

    /// Text of an identifier node, `None` for every other category.
    pub fn identifier_name(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Identifier { name } => Some(name),
            _ => None,
        }
    }
}

pub struct Ancestors<'a> {
    tree: &'a SyntaxTree,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.parent(current);
        Some(current)
    }
}

pub struct Descendants<'a> {
    tree: &'a SyntaxTree,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.stack.pop()?;
        self.stack
            .extend(self.tree.children(current).into_iter().rev());
        Some(current)
    }
}
