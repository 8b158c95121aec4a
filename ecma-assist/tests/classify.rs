use std::sync::Arc;

use ecma_assist::{
    new_expression_target, parse_source, CanonicalType, NodeId, ParseOptions, SourceFile,
    SyntaxTree, TypeDeclaration, TypeInference, TypeRegistry,
};
use proptest::prelude::*;

fn parse(text: &str) -> SyntaxTree {
    parse_source(&SourceFile::fragment(text), ParseOptions::strict())
        .expect("source should parse")
        .tree
}

fn find(tree: &SyntaxTree, kind: &str) -> NodeId {
    let root = tree.root().expect("tree has a root");
    tree.descendants(root)
        .find(|id| tree.kind(*id).name() == kind)
        .unwrap_or_else(|| panic!("no {kind} node in tree"))
}

fn registry() -> TypeRegistry {
    let mut registry = TypeRegistry::ecma3();
    registry
        .register(TypeDeclaration::new("Widget"))
        .expect("register Widget");
    registry
}

fn classified_name(text: &str, kind: &str) -> Option<String> {
    let registry = registry();
    let inference = TypeInference::with_registry(&registry);
    let tree = parse(text);
    let node = find(&tree, kind);
    inference
        .classify(&tree, Some(node))
        .map(|declaration| declaration.name.clone())
}

#[test]
fn comma_sequence_classifies_by_its_operands() {
    assert_eq!(classified_name("x = (1, 'a')", "Sequence").as_deref(), Some("String"));
}

#[test]
fn missing_node_has_no_type() {
    let registry = registry();
    let inference = TypeInference::with_registry(&registry);
    let tree = parse("a;");
    assert!(inference.classify(&tree, None).is_none());
}

#[test]
fn literals_classify_to_canonical_types() {
    assert_eq!(classified_name("f(42)", "NumberLiteral").as_deref(), Some("Number"));
    assert_eq!(classified_name("f('hi')", "StringLiteral").as_deref(), Some("String"));
    assert_eq!(classified_name("f(false)", "BooleanLiteral").as_deref(), Some("Boolean"));
    assert_eq!(classified_name("x = {a: 1}", "ObjectLiteral").as_deref(), Some("Object"));
    assert_eq!(classified_name("x = [1, 2]", "ArrayLiteral").as_deref(), Some("Array"));
}

#[test]
fn construction_resolves_identifier_targets_only() {
    assert_eq!(classified_name("x = new Widget(1, 2)", "New").as_deref(), Some("Widget"));
    assert_eq!(classified_name("x = new Widget", "New").as_deref(), Some("Widget"));
    assert_eq!(classified_name("x = new Unknown()", "New"), None);
    assert_eq!(classified_name("x = new (ui.Widget)()", "New"), None);
    assert_eq!(classified_name("x = new ui.Widget()", "New"), None);
}

#[test]
fn construction_target_name() {
    let tree = parse("new Widget(1); new a.b.C();");
    let root = tree.root().expect("root");
    let names: Vec<Option<&str>> = tree
        .descendants(root)
        .filter(|id| tree.kind(*id).name() == "New")
        .map(|id| new_expression_target(&tree, id))
        .collect();
    assert_eq!(names, vec![Some("Widget"), None]);
}

#[test]
fn catch_clause_and_its_parameter_are_errors() {
    assert_eq!(
        classified_name("try { f(); } catch (e) { }", "CatchClause").as_deref(),
        Some("Error")
    );

    let registry = registry();
    let inference = TypeInference::with_registry(&registry);
    let tree = parse("try { f(); } catch (problem) { problem; }");
    let clause = find(&tree, "CatchClause");
    let parameter = tree.children(clause)[0];
    assert_eq!(tree.identifier_name(parameter), Some("problem"));
    let declaration = inference
        .classify(&tree, Some(parameter))
        .expect("catch parameter has a type");
    assert_eq!(declaration.name, "Error");
}

#[test]
fn identifiers_go_through_the_name_resolver() {
    let registry = registry();
    let element = Arc::new(TypeDeclaration::new("HTMLElement"));
    let resolver = |name: &str| (name == "node").then(|| Arc::clone(&element));
    let inference = TypeInference::new(&registry, &resolver);

    let tree = parse("node; other;");
    let statements = tree.statements().to_vec();
    let node = tree.children(statements[0])[0];
    let other = tree.children(statements[1])[0];

    assert_eq!(
        inference.classify(&tree, Some(node)).map(|d| d.name.clone()),
        Some("HTMLElement".to_string())
    );
    assert!(inference.classify(&tree, Some(other)).is_none());
}

#[test]
fn registry_resolves_identifiers_by_default() {
    assert_eq!(classified_name("Math;", "Identifier").as_deref(), Some("Math"));
    assert_eq!(classified_name("counter;", "Identifier"), None);
}

#[test]
fn only_exact_infix_expressions_are_folded() {
    assert_eq!(classified_name("1 + 2", "Infix").as_deref(), Some("Number"));
    assert_eq!(classified_name("a = 1", "Assignment"), None);
    assert_eq!(classified_name("a.b", "PropertyAccess"), None);
    assert_eq!(classified_name("x = {a: 1}", "ObjectProperty"), None);
    assert_eq!(classified_name("-1", "Unary"), None);
}

#[test]
fn infers_types_of_entered_text() {
    let registry = registry();
    let inference = TypeInference::with_registry(&registry);
    let name = |text: &str| inference.infer_text(text).map(|d| d.name.clone());

    assert_eq!(name("'abc'").as_deref(), Some("String"));
    assert_eq!(name("while (1 + 2) {}").as_deref(), Some("Number"));
    assert_eq!(name("if (new Widget()) {}").as_deref(), Some("Widget"));
    assert_eq!(name("[1, 2, 3]").as_deref(), Some("Array"));
    assert_eq!(name("1, 2").as_deref(), Some("Number"));
    assert_eq!(name("'a', 1").as_deref(), Some("String"));
    assert_eq!(name("x = 1"), None);
    assert_eq!(name("if (x."), None);
    assert_eq!(name(&format!("{}1", "(".repeat(10_000))), None);
    assert_eq!(name(""), None);
}

fn literal() -> impl Strategy<Value = (String, CanonicalType)> {
    prop_oneof![
        any::<u32>().prop_map(|n| (n.to_string(), CanonicalType::Number)),
        "[a-z ]{0,8}".prop_map(|s| (format!("\"{s}\""), CanonicalType::String)),
        any::<bool>().prop_map(|b| (b.to_string(), CanonicalType::Boolean)),
        "[a-z]{1,4}".prop_map(|key| (format!("{{{key}: 1}}"), CanonicalType::Object)),
        (0usize..4).prop_map(|n| (format!("[{}]", vec!["0"; n].join(", ")), CanonicalType::Array)),
    ]
}

fn context() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("x = $;"),
        Just("f(1, $);"),
        Just("var v = [$];"),
        Just("if (a) { return $; }"),
    ]
}

proptest! {
    #[test]
    fn literal_classification_ignores_context((text, expected) in literal(), template in context()) {
        let source = template.replace('$', &text);
        let registry = TypeRegistry::ecma3();
        let inference = TypeInference::with_registry(&registry);
        let tree = parse(&source);
        let kind = match expected {
            CanonicalType::Number => "NumberLiteral",
            CanonicalType::String => "StringLiteral",
            CanonicalType::Boolean => "BooleanLiteral",
            CanonicalType::Object => "ObjectLiteral",
            _ => "ArrayLiteral",
        };
        let root = tree.root().expect("root");
        let node = tree
            .descendants(root)
            .filter(|id| tree.kind(*id).name() == kind)
            .last()
            .expect("literal present");
        let declaration = inference.classify(&tree, Some(node)).expect("literal has a type");
        prop_assert_eq!(declaration.name.as_str(), expected.as_str());
    }
}
