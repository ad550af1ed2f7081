use super::*;
use crate::{attrs, deps, h};
use std::cell::RefCell;
use std::rc::Rc;

fn setup() -> (Rc<RefCell<MemoryDocument>>, Runtime, NodeId) {
    let doc = Rc::new(RefCell::new(MemoryDocument::new()));
    let container = doc.borrow_mut().create_container();
    let runtime = Runtime::new(Rc::clone(&doc));
    (doc, runtime, container)
}

#[test]
fn mounting_a_keyed_list_renders_items_in_order() {
    let (doc, runtime, container) = setup();
    runtime
        .mount(
            h!(
                "ul",
                (),
                h!("li", attrs! { "key" => "a" }, "Apple"),
                h!("li", attrs! { "key" => "b" }, "Banana")
            ),
            container,
        )
        .unwrap();

    let doc = doc.borrow();
    let lists = doc.children(container);
    assert_eq!(lists.len(), 1);
    assert_eq!(doc.tag(lists[0]), Some("ul"));
    let items = doc.children(lists[0]);
    let texts: Vec<String> = items.iter().map(|&li| doc.text_content(li)).collect();
    assert_eq!(texts, vec!["Apple", "Banana"]);
    assert_eq!(
        doc.dump_tree(Some(lists[0])),
        format!(
            "[{}] <ul>\n  [{}] <li>\n    [{}] #text \"Apple\"\n  [{}] <li>\n    [{}] #text \"Banana\"\n",
            lists[0],
            items[0],
            doc.children(items[0])[0],
            items[1],
            doc.children(items[1])[0],
        )
    );
}

fn counter(scope: &mut Scope, _props: &Props) -> Child {
    let (count, set_count) = scope.use_state(|| 0i64);
    let increment = AttrValue::listener(move |_| set_count.update(|prev| prev + 1));
    h!(
        "div",
        (),
        h!("span", attrs! { "className" => "count" }, count),
        h!("button", attrs! { "onClick" => increment }, "increment")
    )
    .into()
}

#[test]
fn counter_clicked_three_times_shows_three() {
    let (doc, runtime, container) = setup();
    runtime.mount(h!(component(counter), ()), container).unwrap();
    let button = doc.borrow().find_first(container, "button").unwrap();

    for _ in 0..3 {
        assert_eq!(runtime.dispatch(button, "click"), 1);
        runtime.run_microtasks();
    }

    let doc = doc.borrow();
    let span = doc.find_first(container, "span").unwrap();
    assert_eq!(doc.text_content(span), "3");
    assert_eq!(doc.find_first(container, "button"), Some(button));
}

thread_local! {
    static CLEANUPS: RefCell<Vec<String>> = RefCell::new(Vec::new());
}

fn tracked(scope: &mut Scope, props: &Props) -> Child {
    let name = props.str("name").unwrap_or_default().to_string();
    let tag = props.str("tag").unwrap_or("span").to_string();
    let label = name.clone();
    scope.use_effect(deps![], move || {
        Cleanup::new(move || CLEANUPS.with(|log| log.borrow_mut().push(label)))
    });
    create(tag.as_str(), (), [name]).into()
}

fn take_cleanups() -> Vec<String> {
    CLEANUPS.with(|log| std::mem::take(&mut *log.borrow_mut()))
}

#[test]
fn removed_component_runs_its_cleanup_once() {
    take_cleanups();
    let (doc, runtime, container) = setup();
    let both = || {
        h!(
            "div",
            (),
            h!(component(tracked), attrs! { "key" => "x", "name" => "x" }),
            h!(component(tracked), attrs! { "key" => "y", "name" => "y" })
        )
    };
    runtime.render(both(), container).unwrap();
    runtime.run_microtasks();

    runtime
        .render(
            h!("div", (), h!(component(tracked), attrs! { "key" => "y", "name" => "y" })),
            container,
        )
        .unwrap();
    runtime.run_microtasks();
    assert_eq!(take_cleanups(), vec!["x"]);
    assert_eq!(doc.borrow().text_content(container), "y");

    runtime.render(h!("div", ()), container).unwrap();
    runtime.run_microtasks();
    assert_eq!(take_cleanups(), vec!["y"]);
}

fn inner(scope: &mut Scope, _props: &Props) -> Child {
    scope.use_effect(deps![], || {
        Cleanup::new(|| CLEANUPS.with(|log| log.borrow_mut().push("inner".into())))
    });
    Child::Empty
}

fn shell(scope: &mut Scope, props: &Props) -> Child {
    scope.use_effect(deps![], || {
        Cleanup::new(|| CLEANUPS.with(|log| log.borrow_mut().push("shell".into())))
    });
    let tag = props.str("tag").unwrap_or("span").to_string();
    create(tag.as_str(), (), [h!(component(inner), ())]).into()
}

#[test]
fn type_change_unmounts_the_old_subtree_bottom_up() {
    take_cleanups();
    let (doc, runtime, container) = setup();
    runtime
        .render(h!("section", (), h!("span", (), h!(component(shell), ()))), container)
        .unwrap();
    runtime.run_microtasks();
    let span = doc.borrow().find_first(container, "span").unwrap();

    runtime
        .render(h!("section", (), h!("div", (), "fresh")), container)
        .unwrap();

    assert_eq!(take_cleanups(), vec!["inner", "shell"]);
    let doc = doc.borrow();
    let div = doc.find_first(container, "div").unwrap();
    assert_ne!(div, span);
    assert_eq!(doc.tag(span), Some("span"));
    assert_eq!(doc.find_first(container, "span"), None);
}

#[test]
fn element_tag_change_never_reuses_the_handle() {
    let (doc, runtime, container) = setup();
    runtime.render(h!("span", attrs! { "id" => "x" }), container).unwrap();
    let span = doc.borrow().children(container)[0];
    runtime.render(h!("div", attrs! { "id" => "x" }), container).unwrap();
    let div = doc.borrow().children(container)[0];

    assert_ne!(span, div);
    assert_eq!(doc.borrow().tag(div), Some("div"));
    assert_eq!(doc.borrow().inner_html(container), "<div id=\"x\"></div>");
}
