use ecma_assist::{
    parse_expression_source, parse_source, DiagnosticLevel, InfixOperator, NodeKind,
    ParseOptions, SourceFile, SyntaxTree,
};

fn parse(text: &str) -> SyntaxTree {
    parse_source(&SourceFile::fragment(text), ParseOptions::strict())
        .expect("source should parse")
        .tree
}

fn statement_kinds(tree: &SyntaxTree) -> Vec<&'static str> {
    tree.statements()
        .iter()
        .map(|id| tree.kind(*id).name())
        .collect()
}

#[test]
fn parses_every_statement_form() {
    let source = r#"
var a = 1, b;
function add(x, y) { return x + y; }
if (a) b = 2; else { b = 3; }
while (a < 10) a++;
do { a--; } while (a > 0);
for (var i = 0; i < 3; i++) {}
for (key in object) {}
switch (a) { case 1: break; default: a = 0; }
try { risky(); } catch (e) { log(e); } finally { done(); }
outer: for (;;) { continue outer; }
with (Math) { max(1, 2); }
throw new Error('boom');
;
"#;
    let tree = parse(source);
    assert_eq!(
        statement_kinds(&tree),
        vec![
            "VariableDeclaration",
            "Function",
            "If",
            "While",
            "DoWhile",
            "For",
            "ForIn",
            "Switch",
            "Try",
            "Labeled",
            "With",
            "Throw",
            "Empty",
        ]
    );
}

#[test]
fn multiplication_binds_tighter_than_addition() {
    let tree = parse("a + b * c - d;");
    let statement = tree.statements()[0];
    let expression = tree.children(statement)[0];
    match tree.kind(expression) {
        NodeKind::Infix { operator, left, .. } => {
            assert_eq!(*operator, InfixOperator::Subtract);
            assert!(matches!(
                tree.kind(*left),
                NodeKind::Infix {
                    operator: InfixOperator::Add,
                    ..
                }
            ));
        }
        other => panic!("expected infix, found {}", other.name()),
    }
}

#[test]
fn slash_after_operand_divides() {
    let tree = parse("x = a / b / c; y = /ab+/g.test(s);");
    assert_eq!(tree.to_source(tree.statements()[0]), "x = a / b / c;");
    assert_eq!(tree.to_source(tree.statements()[1]), "y = /ab+/g.test(s);");
}

#[test]
fn inserts_semicolons_at_line_breaks() {
    let tree = parse("a = 1\nb = 2\nreturn\nc");
    assert_eq!(
        statement_kinds(&tree),
        vec!["ExpressionStatement", "ExpressionStatement", "Return", "ExpressionStatement"]
    );
    assert!(matches!(
        tree.kind(tree.statements()[2]),
        NodeKind::Return { value: None }
    ));
}

#[test]
fn postfix_update_does_not_cross_lines() {
    let tree = parse("a\n++b");
    assert_eq!(statement_kinds(&tree), vec!["ExpressionStatement", "ExpressionStatement"]);
    assert_eq!(tree.to_source(tree.statements()[1]), "++b;");
}

#[test]
fn new_binds_its_argument_list() {
    let tree = parse("new Foo(1).bar();");
    let statement = tree.statements()[0];
    assert_eq!(tree.to_source(statement), "new Foo(1).bar();");
    let call = tree.children(statement)[0];
    let NodeKind::Call { target, .. } = tree.kind(call) else {
        panic!("expected call");
    };
    let NodeKind::PropertyAccess { target, .. } = tree.kind(*target) else {
        panic!("expected property access");
    };
    assert!(matches!(
        tree.kind(*target),
        NodeKind::New {
            arguments: Some(_),
            ..
        }
    ));
}

#[test]
fn parent_links_lead_back_to_the_root() {
    let tree = parse("if (a) { f(g(x)); }");
    let root = tree.root().expect("root");
    for node in tree.descendants(root) {
        let last = tree.ancestors(node).last().expect("at least the node");
        assert_eq!(last, root);
        for child in tree.children(node) {
            assert_eq!(tree.parent(child), Some(node));
        }
    }
}

#[test]
fn strict_mode_rejects_the_first_error() {
    let source = SourceFile::fragment("a = ;\nb = 2;");
    let err = parse_source(&source, ParseOptions::strict()).expect_err("syntax error");
    assert!(err.to_string().contains("line 1"), "{err}");
}

#[test]
fn lexer_errors_are_reported() {
    let source = SourceFile::fragment("a = 'open");
    let err = parse_source(&source, ParseOptions::lenient()).expect_err("lexer error");
    assert!(err.to_string().contains("unterminated"), "{err}");
}

#[test]
fn recovery_replaces_broken_statements_with_error_nodes() {
    let options = ParseOptions {
        recover_from_errors: true,
        report_diagnostics: true,
    };
    let output = parse_source(&SourceFile::fragment("a = ;\nb = 2;\nc = )"), options)
        .expect("recovering parse");
    let tree = &output.tree;
    assert_eq!(
        statement_kinds(tree),
        vec!["Error", "ExpressionStatement", "Error"]
    );
    assert!(matches!(
        tree.kind(tree.statements()[0]),
        NodeKind::Error { text } if text == "a = ;"
    ));
    assert_eq!(tree.to_source(tree.statements()[1]), "b = 2;");
    assert_eq!(output.diagnostics.entries().len(), 2);
    assert!(output.diagnostics.has_errors());
}

#[test]
fn recovery_closes_brackets_at_end_of_input() {
    let options = ParseOptions {
        recover_from_errors: true,
        report_diagnostics: true,
    };
    let output = parse_source(&SourceFile::fragment("function f() { g(1"), options)
        .expect("recovering parse");
    assert_eq!(output.tree.to_source(output.tree.statements()[0]), "function f() {\n  g(1);\n}");
    let levels: Vec<DiagnosticLevel> = output
        .diagnostics
        .entries()
        .iter()
        .map(|diagnostic| diagnostic.level)
        .collect();
    assert_eq!(levels, vec![DiagnosticLevel::Warning, DiagnosticLevel::Warning]);
}

#[test]
fn lenient_mode_drops_diagnostics() {
    let output = parse_source(&SourceFile::fragment("if (x."), ParseOptions::lenient())
        .expect("recovering parse");
    assert!(output.diagnostics.is_empty());
    assert_eq!(statement_kinds(&output.tree), vec!["Error"]);
}

#[test]
fn node_at_finds_innermost_node() {
    let tree = parse("var total = price * count;");
    let node = tree.node_at(1, 21).expect("node under cursor");
    assert_eq!(tree.identifier_name(node), Some("count"));
    assert!(tree.node_at(3, 1).is_none());
}

#[test]
fn standalone_expression_parses_object_literals() {
    let parsed = parse_expression_source(&SourceFile::fragment("{a: 1}"), ParseOptions::lenient())
        .expect("expression");
    assert_eq!(parsed.tree.kind(parsed.expression).name(), "ObjectLiteral");
    assert_eq!(parsed.tree.root(), Some(parsed.expression));

    let trailing = parse_expression_source(&SourceFile::fragment("a b"), ParseOptions::lenient());
    assert!(trailing.is_err());
}

#[test]
fn excessive_nesting_is_a_syntax_error() {
    let text = format!("x = {}1", "(".repeat(10_000));
    let err = parse_source(&SourceFile::fragment(&text), ParseOptions::strict())
        .expect_err("nesting limit");
    assert!(err.to_string().contains("nesting deeper than"), "{err}");

    let output = parse_source(&SourceFile::fragment(&text), ParseOptions::lenient())
        .expect("recovering parse");
    assert_eq!(statement_kinds(&output.tree), vec!["Error"]);
}
