//! Standard runtime services backed by Rust's `std` library.
//!
//! This crate provides a concrete [`RuntimeScheduler`] for `tiny-vdom-core`.
//! Applications construct a [`StdRuntime`] over their host document, let an
//! event loop watch for microtask requests, and call [`StdRuntime::pump`]
//! once the current task has finished.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tiny_vdom_core::{Host, Runtime, RuntimeHandle, RuntimeOptions, RuntimeScheduler};

/// Passes `pump` makes before leaving the rest to the next turn of the loop.
pub const MAX_PUMP_PASSES: usize = 16;

type Waker = Arc<dyn Fn() + Send + Sync + 'static>;

/// Scheduler that records microtask requests and wakes an external loop.
pub struct StdScheduler {
    microtask_requested: AtomicBool,
    waker: RwLock<Option<Waker>>,
}

impl StdScheduler {
    pub fn new() -> Self {
        Self {
            microtask_requested: AtomicBool::new(false),
            waker: RwLock::new(None),
        }
    }

    /// Returns whether a microtask drain has been requested since the last call.
    pub fn take_microtask_request(&self) -> bool {
        self.microtask_requested.swap(false, Ordering::SeqCst)
    }

    /// Registers a waker invoked whenever a drain is requested.
    pub fn set_waker(&self, waker: impl Fn() + Send + Sync + 'static) {
        *self.waker.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(waker));
    }

    pub fn clear_waker(&self) {
        *self.waker.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn wake(&self) {
        let waker = self
            .waker
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(waker) = waker {
            waker();
        }
    }
}

impl Default for StdScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StdScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdScheduler")
            .field(
                "microtask_requested",
                &self.microtask_requested.load(Ordering::SeqCst),
            )
            .finish()
    }
}

impl RuntimeScheduler for StdScheduler {
    fn schedule_microtask(&self) {
        self.microtask_requested.store(true, Ordering::SeqCst);
        self.wake();
    }
}

/// A [`Runtime`] wired to a [`StdScheduler`].
#[derive(Clone)]
pub struct StdRuntime {
    scheduler: Rc<StdScheduler>,
    runtime: Runtime,
}

impl StdRuntime {
    pub fn new<H: Host + 'static>(host: Rc<RefCell<H>>) -> Self {
        Self::with_options(host, RuntimeOptions::default())
    }

    /// Uses `options` with the scheduler replaced by a fresh [`StdScheduler`].
    pub fn with_options<H: Host + 'static>(host: Rc<RefCell<H>>, options: RuntimeOptions) -> Self {
        let scheduler = Rc::new(StdScheduler::default());
        let runtime = Runtime::with_options(host, options.scheduler(scheduler.clone()));
        Self { scheduler, runtime }
    }

    pub fn runtime(&self) -> Runtime {
        self.runtime.clone()
    }

    pub fn runtime_handle(&self) -> RuntimeHandle {
        self.runtime.handle()
    }

    pub fn scheduler(&self) -> Rc<StdScheduler> {
        Rc::clone(&self.scheduler)
    }

    pub fn take_microtask_request(&self) -> bool {
        self.scheduler.take_microtask_request()
    }

    pub fn set_waker(&self, waker: impl Fn() + Send + Sync + 'static) {
        self.scheduler.set_waker(waker);
    }

    pub fn clear_waker(&self) {
        self.scheduler.clear_waker();
    }

    /// Drains microtasks for as long as new drains keep being requested.
    /// Returns how many tasks ran.
    pub fn pump(&self) -> usize {
        let mut ran = 0;
        for _ in 0..MAX_PUMP_PASSES {
            if !self.scheduler.take_microtask_request() {
                return ran;
            }
            ran += self.runtime.run_microtasks();
        }
        if self.runtime.has_pending_microtasks() {
            log::warn!("microtasks still pending after {MAX_PUMP_PASSES} passes");
        }
        ran
    }
}

impl fmt::Debug for StdRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdRuntime")
            .field("scheduler", &self.scheduler)
            .field("runtime", &self.runtime)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use tiny_vdom_core::{
        attrs, component, deps, h, AttrValue, Child, MemoryDocument, Props, Scope,
    };

    use super::StdRuntime;

    thread_local! {
        static EFFECT_RUNS: Cell<u32> = Cell::new(0);
    }

    fn clicker(scope: &mut Scope, _props: &Props) -> Child {
        let (count, set_count) = scope.use_state(|| 0i64);
        scope.use_effect(deps![count], || EFFECT_RUNS.with(|runs| runs.set(runs.get() + 1)));
        let on_click = AttrValue::listener(move |_| set_count.update(|prev| prev + 1));
        h!("button", attrs! { "onClick" => on_click }, count).into()
    }

    #[test]
    fn std_runtime_requests_a_drain_for_effects_and_pumps_them() {
        EFFECT_RUNS.with(|runs| runs.set(0));
        let doc = Rc::new(RefCell::new(MemoryDocument::new()));
        let container = doc.borrow_mut().create_container();
        let runtime = StdRuntime::new(Rc::clone(&doc));
        let wakes = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&wakes);
        runtime.set_waker(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        runtime
            .runtime()
            .mount(h!(component(clicker), ()), container)
            .expect("initial mount");
        assert_eq!(EFFECT_RUNS.with(Cell::get), 0);
        assert_eq!(wakes.load(Ordering::SeqCst), 1);

        assert_eq!(runtime.pump(), 1);
        assert_eq!(EFFECT_RUNS.with(Cell::get), 1);
        assert!(!runtime.take_microtask_request());

        let button = doc.borrow().find_first(container, "button").expect("button");
        runtime.runtime().dispatch(button, "click");
        assert!(runtime.take_microtask_request(), "state change should queue its effect");
        runtime.runtime().run_microtasks();

        assert_eq!(EFFECT_RUNS.with(Cell::get), 2);
        assert_eq!(doc.borrow().text_content(container), "1");
    }

    #[test]
    fn pump_only_drains_requested_work() {
        let doc = Rc::new(RefCell::new(MemoryDocument::new()));
        let runtime = StdRuntime::new(doc);
        runtime.runtime().queue_microtask(|| {});
        runtime.clear_waker();
        assert_eq!(runtime.pump(), 1);
        assert_eq!(runtime.pump(), 0);
    }
}
