use super::*;
use crate::document::MemoryDocument;
use crate::node::{component, Child, Props, VNodeRef};
use crate::runtime::{Runtime, RuntimeOptions};
use crate::{attrs, h};
use std::cell::RefCell;

#[derive(Default)]
struct RecordingSink(RefCell<Vec<Diagnostic>>);

impl DiagnosticSink for RecordingSink {
    fn report(&self, diagnostic: &Diagnostic) {
        self.0.borrow_mut().push(diagnostic.clone());
    }
}

fn setup() -> (Rc<RefCell<MemoryDocument>>, Runtime, NodeId) {
    let doc = Rc::new(RefCell::new(MemoryDocument::new()));
    let container = doc.borrow_mut().create_container();
    let runtime = Runtime::new(Rc::clone(&doc));
    (doc, runtime, container)
}

fn with_value(render: crate::RenderFn, value: i64) -> VNodeRef {
    h!(component(render), attrs! { "value" => value })
}

thread_local! {
    static EFFECT_LOG: RefCell<Vec<String>> = RefCell::new(Vec::new());
    static MEMO_COMPUTES: Cell<usize> = Cell::new(0);
    static CALLBACKS: RefCell<Vec<Rc<dyn Fn(&crate::Event)>>> = RefCell::new(Vec::new());
    static REF_BOXES: RefCell<Vec<Owned<usize>>> = RefCell::new(Vec::new());
    static SETTER: RefCell<Option<Setter<i64>>> = RefCell::new(None);
    static DISPATCH: RefCell<Option<Dispatch<CounterAction>>> = RefCell::new(None);
}

fn log(entry: impl Into<String>) {
    EFFECT_LOG.with(|log| log.borrow_mut().push(entry.into()));
}

fn take_log() -> Vec<String> {
    EFFECT_LOG.with(|log| std::mem::take(&mut *log.borrow_mut()))
}

#[test]
fn deps_compare_by_length_and_hashed_entries() {
    assert!(Deps::always().changed_from(&Deps::always()));
    assert!(Deps::always().changed_from(&crate::deps![]));
    assert!(!crate::deps![].changed_from(&crate::deps![]));
    assert!(!crate::deps![1, "a"].changed_from(&crate::deps![1, "a"]));
    assert!(crate::deps![1, "a"].changed_from(&crate::deps![1, "b"]));
    assert!(crate::deps![1].changed_from(&crate::deps![1, 1]));
    assert_eq!(Deps::empty().with(&3).with("x"), crate::deps![3, "x"]);
}

fn gated_effect(scope: &mut Scope, props: &Props) -> Child {
    let value = props.int("value").unwrap_or_default();
    scope.use_effect(crate::deps![value], move || {
        log(format!("run {value}"));
        Cleanup::new(move || log(format!("cleanup {value}")))
    });
    Child::from(value)
}

#[test]
fn effect_reruns_only_when_dependencies_change() {
    take_log();
    let (_doc, runtime, container) = setup();

    runtime.render(with_value(gated_effect, 1), container).unwrap();
    assert!(take_log().is_empty(), "effects are deferred to a microtask");
    runtime.run_microtasks();
    assert_eq!(take_log(), vec!["run 1"]);

    runtime.render(with_value(gated_effect, 1), container).unwrap();
    runtime.run_microtasks();
    assert!(take_log().is_empty());

    runtime.render(with_value(gated_effect, 2), container).unwrap();
    runtime.run_microtasks();
    assert_eq!(take_log(), vec!["cleanup 1", "run 2"]);

    runtime.render(None::<VNodeRef>, container).unwrap();
    assert_eq!(take_log(), vec!["cleanup 2"]);
}

fn always_and_once(scope: &mut Scope, _props: &Props) -> Child {
    scope.use_effect(Deps::always(), || log("always"));
    scope.use_effect(crate::deps![], || log("once"));
    Child::Empty
}

#[test]
fn missing_deps_run_every_render_and_empty_deps_run_once() {
    take_log();
    let (_doc, runtime, container) = setup();
    for _ in 0..3 {
        runtime
            .render(h!(component(always_and_once), ()), container)
            .unwrap();
        runtime.run_microtasks();
    }
    assert_eq!(take_log(), vec!["always", "once", "always", "always"]);
}

#[test]
fn unflushed_effect_is_replaced_by_the_newest_body() {
    take_log();
    let (_doc, runtime, container) = setup();
    runtime.render(with_value(gated_effect, 1), container).unwrap();
    runtime.render(with_value(gated_effect, 2), container).unwrap();
    runtime.run_microtasks();
    assert_eq!(take_log(), vec!["run 2"]);
}

fn memoized(scope: &mut Scope, props: &Props) -> Child {
    let value = props.int("value").unwrap_or_default();
    let doubled = scope.use_memo(crate::deps![value], || {
        MEMO_COMPUTES.with(|c| c.set(c.get() + 1));
        value * 2
    });
    let callback = scope.use_callback(crate::deps![value], move |_: &crate::Event| {
        let _ = value;
    });
    CALLBACKS.with(|cbs| cbs.borrow_mut().push(callback));
    Child::from(doubled)
}

#[test]
fn memo_and_callback_are_stable_until_dependencies_change() {
    MEMO_COMPUTES.with(|c| c.set(0));
    CALLBACKS.with(|cbs| cbs.borrow_mut().clear());
    let (doc, runtime, container) = setup();

    runtime.render(with_value(memoized, 2), container).unwrap();
    runtime.render(with_value(memoized, 2), container).unwrap();
    runtime.render(with_value(memoized, 5), container).unwrap();

    assert_eq!(MEMO_COMPUTES.with(Cell::get), 2);
    assert_eq!(doc.borrow().text_content(container), "10");
    CALLBACKS.with(|cbs| {
        let cbs = cbs.borrow();
        assert!(Rc::ptr_eq(&cbs[0], &cbs[1]));
        assert!(!Rc::ptr_eq(&cbs[1], &cbs[2]));
    });
}

fn ref_holder(scope: &mut Scope, _props: &Props) -> Child {
    let renders = scope.use_ref(|| 0usize);
    renders.update(|count| *count += 1);
    REF_BOXES.with(|boxes| boxes.borrow_mut().push(renders.clone()));
    Child::Empty
}

#[test]
fn ref_box_keeps_identity_and_value_across_renders() {
    REF_BOXES.with(|boxes| boxes.borrow_mut().clear());
    let (_doc, runtime, container) = setup();
    for _ in 0..3 {
        runtime.render(h!(component(ref_holder), ()), container).unwrap();
    }
    REF_BOXES.with(|boxes| {
        let boxes = boxes.borrow();
        assert!(boxes[0].ptr_eq(&boxes[2]));
        assert_eq!(boxes[2].get(), 3);
    });
}

#[derive(Clone, Copy)]
enum CounterAction {
    Add(i64),
    Reset,
}

fn counter_reducer(state: &i64, action: CounterAction) -> i64 {
    match action {
        CounterAction::Add(n) => state + n,
        CounterAction::Reset => 0,
    }
}

fn reducer_counter(scope: &mut Scope, _props: &Props) -> Child {
    let (count, dispatch) = scope.use_reducer(counter_reducer, || 0);
    DISPATCH.with(|slot| *slot.borrow_mut() = Some(dispatch));
    Child::from(count)
}

#[test]
fn reducer_dispatch_rerenders_with_next_state() {
    let (doc, runtime, container) = setup();
    runtime
        .render(h!(component(reducer_counter), ()), container)
        .unwrap();
    let dispatch = DISPATCH.with(|slot| slot.borrow().clone()).expect("dispatch");

    dispatch.dispatch(CounterAction::Add(4));
    dispatch.dispatch(CounterAction::Add(1));
    assert_eq!(doc.borrow().text_content(container), "5");

    dispatch.dispatch(CounterAction::Reset);
    assert_eq!(doc.borrow().text_content(container), "0");
}

fn stateful(scope: &mut Scope, _props: &Props) -> Child {
    let (value, set) = scope.use_state(|| 5i64);
    SETTER.with(|slot| *slot.borrow_mut() = Some(set));
    Child::from(value)
}

#[test]
fn setting_an_equal_value_is_a_no_op() {
    let (doc, runtime, container) = setup();
    runtime.render(h!(component(stateful), ()), container).unwrap();
    let set = SETTER.with(|slot| slot.borrow().clone()).expect("setter");
    doc.borrow_mut().reset_counters();

    set.set(5);
    assert_eq!(doc.borrow().mutation_count(), 0);

    set.update(|prev| prev + 1);
    assert_eq!(doc.borrow().text_content(container), "6");
    assert_eq!(doc.borrow().mutation_count(), 1);
}

#[test]
fn setter_of_an_unmounted_instance_is_ignored() {
    let (doc, runtime, container) = setup();
    runtime.render(h!(component(stateful), ()), container).unwrap();
    let set = SETTER.with(|slot| slot.borrow().clone()).expect("setter");
    runtime.render(None::<VNodeRef>, container).unwrap();
    doc.borrow_mut().reset_counters();

    set.set(42);
    assert_eq!(doc.borrow().mutation_count(), 0);
    assert_eq!(doc.borrow().text_content(container), "");
}

fn shifting_hooks(scope: &mut Scope, props: &Props) -> Child {
    if props.int("value") == Some(1) {
        scope.use_state(|| 0i64);
    } else {
        scope.use_ref(|| 0i64);
    }
    Child::Empty
}

#[test]
#[should_panic(expected = "hook #0 was called as ref but holds state")]
fn changing_hook_order_is_a_usage_error() {
    let (_doc, runtime, container) = setup();
    runtime.render(with_value(shifting_hooks, 1), container).unwrap();
    let _ = runtime.render(with_value(shifting_hooks, 2), container);
}

fn panicking_effects(scope: &mut Scope, _props: &Props) -> Child {
    scope.use_effect(crate::deps![], || -> () { panic!("boom") });
    scope.use_effect(crate::deps![], || log("sibling ran"));
    Child::Empty
}

#[test]
fn effect_panics_are_reported_and_siblings_still_run() {
    take_log();
    let doc = Rc::new(RefCell::new(MemoryDocument::new()));
    let container = doc.borrow_mut().create_container();
    let sink = Rc::new(RecordingSink::default());
    let runtime = Runtime::with_options(
        Rc::clone(&doc),
        RuntimeOptions::default().diagnostics(sink.clone()),
    );

    runtime
        .render(h!(component(panicking_effects), ()), container)
        .unwrap();
    runtime.run_microtasks();

    assert_eq!(take_log(), vec!["sibling ran"]);
    assert_eq!(
        *sink.0.borrow(),
        vec![Diagnostic::EffectPanicked {
            slot: 0,
            phase: EffectPhase::Effect,
            message: "boom".to_string(),
        }]
    );
}

#[test]
fn dispose_runs_every_cleanup_once() {
    take_log();
    let bag = HookBag::new();
    bag.queue_effect(0, Box::new(|| Cleanup::new(|| log("first"))));
    bag.queue_effect(1, Box::new(|| Cleanup::new(|| log("second"))));
    let sink = RecordingSink::default();
    bag.flush(&sink);
    assert!(take_log().is_empty());

    bag.dispose(&sink);
    bag.dispose(&sink);
    assert_eq!(take_log(), vec!["first", "second"]);
    assert!(bag.is_disposed());
}

#[test]
fn flush_stops_once_an_effect_disposes_its_own_instance() {
    take_log();
    let bag = HookBag::new();
    let this = Rc::clone(&bag);
    bag.queue_effect(
        0,
        Box::new(move || {
            log("effect0");
            this.dispose(&crate::platform::LogSink);
            Cleanup::new(|| log("cleanup0"))
        }),
    );
    bag.queue_effect(
        1,
        Box::new(|| {
            log("effect1");
            Cleanup::new(|| log("cleanup1"))
        }),
    );
    let sink = RecordingSink::default();
    bag.flush(&sink);

    assert_eq!(take_log(), vec!["effect0", "cleanup0"]);
    assert!(sink.0.borrow().is_empty());
}
