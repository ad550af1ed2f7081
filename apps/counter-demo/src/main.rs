use std::cell::RefCell;
use std::rc::Rc;

use tiny_vdom_core::{
    attrs, component, create, deps, h, memo, style, AttrValue, Child, Cleanup, MemoryDocument,
    NodeId, Props, RenderError, Scope,
};
use tiny_vdom_runtime_std::StdRuntime;

#[derive(Clone, Debug, PartialEq)]
struct Todo {
    id: i64,
    title: String,
    done: bool,
}

#[derive(Clone, Debug)]
enum TodoAction {
    Add(String),
    Toggle(i64),
    Rotate,
}

fn todos_reducer(todos: &Vec<Todo>, action: TodoAction) -> Vec<Todo> {
    let mut next = todos.clone();
    match action {
        TodoAction::Add(title) => {
            let id = next.iter().map(|todo| todo.id).max().unwrap_or(0) + 1;
            next.push(Todo {
                id,
                title,
                done: false,
            });
        }
        TodoAction::Toggle(id) => {
            if let Some(todo) = next.iter_mut().find(|todo| todo.id == id) {
                todo.done = !todo.done;
            }
        }
        TodoAction::Rotate => {
            if !next.is_empty() {
                next.rotate_left(1);
            }
        }
    }
    next
}

fn counter(scope: &mut Scope, props: &Props) -> Child {
    let step = props.int("step").unwrap_or(1);
    let (count, set_count) = scope.use_state(|| 0i64);
    scope.use_effect(deps![count], move || {
        log::info!("counter is now {count}");
    });
    let increment = AttrValue::listener(move |_| set_count.update(|prev| prev + step));
    h!(
        "section",
        attrs! { "className" => "counter" },
        h!("span", attrs! { "id" => "count" }, count),
        h!("button", attrs! { "id" => "increment", "onClick" => increment }, "increment")
    )
    .into()
}

fn todo_item(_scope: &mut Scope, props: &Props) -> Child {
    let title = props.str("title").unwrap_or_default().to_string();
    let done = matches!(props.get("done"), Some(AttrValue::Bool(true)));
    let decoration = if done { "line-through" } else { "none" };
    h!(
        "li",
        attrs! { "style" => style! { "textDecoration" => decoration, "paddingLeft" => 4 } },
        title
    )
    .into()
}

fn todo_list(scope: &mut Scope, _props: &Props) -> Child {
    let (todos, dispatch) = scope.use_reducer(todos_reducer, || {
        vec![
            Todo {
                id: 1,
                title: "write reconciler".into(),
                done: true,
            },
            Todo {
                id: 2,
                title: "write hooks".into(),
                done: false,
            },
        ]
    });
    scope.use_effect(deps![todos.len()], {
        let count = todos.len();
        move || {
            log::info!("tracking {count} todos");
            Cleanup::new(move || log::debug!("stopped tracking {count} todos"))
        }
    });

    let add = {
        let dispatch = dispatch.clone();
        AttrValue::listener(move |_| dispatch.dispatch(TodoAction::Add("ship demo".into())))
    };
    let toggle = {
        let dispatch = dispatch.clone();
        AttrValue::listener(move |_| dispatch.dispatch(TodoAction::Toggle(2)))
    };
    let rotate = AttrValue::listener(move |_| dispatch.dispatch(TodoAction::Rotate));

    h!(
        "div",
        (),
        create(
            "ul",
            (),
            todos.iter().map(|todo| {
                h!(
                    memo(todo_item),
                    attrs! { "key" => todo.id, "title" => todo.title.as_str(), "done" => todo.done }
                )
            })
        ),
        h!("button", attrs! { "id" => "add", "onClick" => add }, "add"),
        h!("button", attrs! { "id" => "toggle", "onClick" => toggle }, "toggle"),
        h!("button", attrs! { "id" => "rotate", "onClick" => rotate }, "rotate")
    )
    .into()
}

fn button_with_id(doc: &MemoryDocument, root: NodeId, id: &str) -> Option<NodeId> {
    doc.find_all(root, "button")
        .into_iter()
        .find(|&button| doc.attribute(button, "id").as_deref() == Some(id))
}

fn click(runtime: &StdRuntime, doc: &Rc<RefCell<MemoryDocument>>, root: NodeId, id: &str) {
    let target = button_with_id(&doc.borrow(), root, id);
    match target {
        Some(button) => {
            runtime.runtime().dispatch(button, "click");
            let ran = runtime.pump();
            log::debug!("click on #{id} ran {ran} microtasks");
        }
        None => log::warn!("no button #{id}"),
    }
}

fn main() -> Result<(), RenderError> {
    env_logger::init();

    println!("=== tiny-vdom counter demo ===");
    println!("Set RUST_LOG=debug to watch renders and effect flushes.");
    println!();

    let doc = Rc::new(RefCell::new(MemoryDocument::new()));
    let counter_root = doc.borrow_mut().create_container();
    let todo_root = doc.borrow_mut().create_container();
    let runtime = StdRuntime::new(Rc::clone(&doc));
    runtime.set_waker(|| log::trace!("microtask drain requested"));

    let vdom = runtime.runtime();
    vdom.mount(
        h!(component(counter), attrs! { "step" => 1 }),
        counter_root,
    )?;
    vdom.mount(h!(component(todo_list), ()), todo_root)?;
    runtime.pump();

    for _ in 0..3 {
        click(&runtime, &doc, counter_root, "increment");
    }
    println!("counter: {}", doc.borrow().to_html(counter_root));

    for id in ["add", "toggle", "rotate"] {
        click(&runtime, &doc, todo_root, id);
        println!("after {id}: {}", doc.borrow().inner_html(todo_root));
    }

    println!();
    print!("{}", doc.borrow().dump_tree(Some(doc.borrow().body())));

    vdom.unmount(todo_root)?;
    vdom.unmount(counter_root)?;
    println!("roots after unmount: {:?}", vdom.roots());
    Ok(())
}
