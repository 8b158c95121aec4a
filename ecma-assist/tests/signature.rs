use ecma_assist::{function_signature_key, parse_source, NodeId, ParseOptions, SourceFile, SyntaxTree};
use proptest::prelude::*;

fn parse(text: &str) -> SyntaxTree {
    parse_source(&SourceFile::fragment(text), ParseOptions::strict())
        .expect("source should parse")
        .tree
}

fn identifier(tree: &SyntaxTree, name: &str) -> NodeId {
    let root = tree.root().expect("root");
    tree.descendants(root)
        .find(|id| tree.identifier_name(*id) == Some(name))
        .unwrap_or_else(|| panic!("no identifier {name}"))
}

fn key_at(text: &str, name: &str) -> Option<String> {
    let tree = parse(text);
    let node = identifier(&tree, name);
    function_signature_key(&tree, node)
}

#[test]
fn member_call_uses_property_name() {
    assert_eq!(key_at("obj.method(a, b, c)", "b").as_deref(), Some("method(p,p,p)"));
    assert_eq!(key_at("obj.method()", "obj").as_deref(), Some("method()"));
}

#[test]
fn plain_call_has_empty_name() {
    assert_eq!(key_at("fn(a)", "a").as_deref(), Some("(p)"));
    assert_eq!(key_at("fn(a)", "fn").as_deref(), Some("(p)"));
}

#[test]
fn innermost_call_wins() {
    assert_eq!(key_at("outer(inner(a), b)", "a").as_deref(), Some("(p)"));
    assert_eq!(key_at("outer(inner(a), b)", "b").as_deref(), Some("(p,p)"));
    assert_eq!(key_at("doc.write(s.substr(x, 2))", "x").as_deref(), Some("substr(p,p)"));
}

#[test]
fn constructions_count_as_calls() {
    assert_eq!(key_at("new ui.Widget(x)", "x").as_deref(), Some("Widget(p)"));
    assert_eq!(key_at("new Widget", "Widget").as_deref(), Some("()"));
}

#[test]
fn no_enclosing_call_has_no_key() {
    assert_eq!(key_at("x + y", "y"), None);
    assert_eq!(key_at("var v = w", "w"), None);
}

#[test]
fn starts_at_the_call_node_itself() {
    let tree = parse("list.push(1, 2)");
    let statement = tree.statements()[0];
    let call = tree.children(statement)[0];
    assert_eq!(
        function_signature_key(&tree, call).as_deref(),
        Some("push(p,p)")
    );
}

#[test]
fn anchors_at_a_source_position() {
    let tree = parse("obj.method(a, b, c)");
    let node = tree.node_at(1, 15).expect("node at column 15");
    assert_eq!(tree.identifier_name(node), Some("b"));
    assert_eq!(
        function_signature_key(&tree, node).as_deref(),
        Some("method(p,p,p)")
    );
}

proptest! {
    #[test]
    fn placeholder_count_matches_arguments(count in 0usize..12) {
        let arguments: Vec<String> = (0..count).map(|index| format!("arg{index}")).collect();
        let text = format!("target.invoke({})", arguments.join(", "));
        let tree = parse(&text);
        let node = identifier(&tree, "target");
        let key = function_signature_key(&tree, node).expect("call present");
        let expected = format!("invoke({})", vec!["p"; count].join(","));
        prop_assert_eq!(key, expected);
    }
}
