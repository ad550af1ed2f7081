use super::*;
use crate::{attrs, h};

fn text_of(node: &VNodeRef) -> &str {
    match node.kind() {
        NodeKind::Text(text) => text,
        other => panic!("expected text node, got {other:?}"),
    }
}

fn noop(_scope: &mut Scope, _props: &Props) -> Child {
    Child::Empty
}

fn other(_scope: &mut Scope, _props: &Props) -> Child {
    Child::Empty
}

#[test]
fn nested_lists_are_flattened_and_empties_dropped() {
    let node = create(
        "ul",
        (),
        vec![
            Child::from("a"),
            Child::from(vec![
                Child::from(1),
                Child::from(vec![Child::from(true), Child::from(2.5)]),
            ]),
            Child::from(None::<&str>),
            Child::from(()),
            Child::from(false),
        ],
    );

    let texts: Vec<&str> = node.children().iter().map(text_of).collect();
    assert_eq!(texts, vec!["a", "1", "2.5"]);
}

#[test]
fn existing_nodes_pass_through_unchanged() {
    let item = h!("li", ());
    let list = h!("ul", (), &item);
    assert!(Rc::ptr_eq(&list.children()[0], &item));
}

#[test]
fn h_macro_without_children_builds_empty_element() {
    let node = h!("div");
    assert!(matches!(node.kind(), NodeKind::Element(tag) if &**tag == "div"));
    assert!(node.children().is_empty());
    assert!(node.attrs().is_empty());
}

#[test]
fn keys_come_from_the_key_attribute() {
    let by_int = h!("li", attrs! { "key" => 3 });
    let by_str = h!("li", attrs! { "key" => "b" });
    let by_float = h!("li", attrs! { "key" => 4.0 });
    let none = h!("li", attrs! { "key" => AttrValue::Null });

    assert_eq!(by_int.key(), Some(NodeKey::Int(3)));
    assert_eq!(by_str.key(), Some(NodeKey::Str("b".into())));
    assert_eq!(by_float.key(), Some(NodeKey::Int(4)));
    assert_eq!(none.key(), None);
}

#[test]
fn normalize_collapses_to_none_single_or_fragment() {
    assert!(Child::Empty.normalize().is_none());
    assert!(Child::from(vec![Child::Empty, Child::from(false)])
        .normalize()
        .is_none());

    let single = h!("p", ());
    let normalized = Child::from(&single).normalize().expect("single node");
    assert!(Rc::ptr_eq(&normalized, &single));

    let text = Child::from(7).normalize().expect("text node");
    assert_eq!(text_of(&text), "7");

    let many = Child::from(vec![h!("a", ()), h!("b", ())])
        .normalize()
        .expect("fragment");
    assert!(matches!(many.kind(), NodeKind::Fragment));
    assert_eq!(many.children().len(), 2);
}

#[test]
fn same_type_compares_tags_and_functions() {
    assert!(NodeKind::from("div").same_type(&NodeKind::from("div")));
    assert!(!NodeKind::from("div").same_type(&NodeKind::from("span")));
    assert!(NodeKind::Text("a".into()).same_type(&NodeKind::Text("b".into())));
    assert!(component(noop).same_type(&component(noop)));
    assert!(!component(noop).same_type(&component(other)));
    assert!(!component(noop).same_type(&memo(noop)));
    assert!(memo(noop).same_type(&memo(noop)));
}

#[test]
fn shallow_equal_checks_values_and_child_identity() {
    let child = h!("span", ());
    let a = Props::new(attrs! { "id" => "x", "n" => 1 }, vec![Rc::clone(&child)]);
    let b = Props::new(attrs! { "id" => "x", "n" => 1 }, vec![Rc::clone(&child)]);
    assert!(shallow_equal(&a, &b));

    let different_value = Props::new(attrs! { "id" => "x", "n" => 2 }, vec![Rc::clone(&child)]);
    assert!(!shallow_equal(&a, &different_value));

    let extra_key = Props::new(
        attrs! { "id" => "x", "n" => 1, "m" => 0 },
        vec![Rc::clone(&child)],
    );
    assert!(!shallow_equal(&a, &extra_key));

    let fresh_child = Props::new(attrs! { "id" => "x", "n" => 1 }, vec![h!("span", ())]);
    assert!(!shallow_equal(&a, &fresh_child));
}

#[test]
fn listeners_compare_by_identity() {
    let listener = AttrValue::listener(|_| {});
    let same = listener.clone();
    let lookalike = AttrValue::listener(|_| {});
    assert_eq!(listener, same);
    assert_ne!(listener, lookalike);
}

#[test]
fn split_ref_removes_ref_from_props() {
    let target = NodeRef::cell(crate::Owned::new(None));
    let props = Props::new(
        attrs! { "ref" => target.clone(), "label" => "go" },
        Vec::new(),
    );
    let (rest, node_ref) = props.split_ref();
    assert!(rest.get("ref").is_none());
    assert_eq!(rest.str("label"), Some("go"));
    assert!(node_ref.expect("ref").ptr_eq(&target));
}
