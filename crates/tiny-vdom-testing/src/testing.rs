use std::cell::RefCell;
use std::rc::Rc;

use tiny_vdom_core::{
    MemoryDocument, NodeId, RenderError, Runtime, RuntimeHandle, RuntimeOptions, VNodeRef,
};

/// Drain passes `pump_until_idle` makes before giving up on a queue that
/// keeps refilling itself.
const MAX_IDLE_PASSES: usize = 64;

/// Headless harness for exercising component trees in tests.
///
/// `TestRoot` owns an in-memory document, a runtime over it and one mounted
/// container. Event helpers drain the microtask queue afterwards, so effects
/// queued by the resulting re-render have run by the time they return.
pub struct TestRoot {
    doc: Rc<RefCell<MemoryDocument>>,
    runtime: Runtime,
    container: NodeId,
}

impl TestRoot {
    pub fn new() -> Self {
        Self::with_options(RuntimeOptions::default())
    }

    pub fn with_options(options: RuntimeOptions) -> Self {
        let doc = Rc::new(RefCell::new(MemoryDocument::new()));
        let container = doc.borrow_mut().create_container();
        let runtime = Runtime::with_options(Rc::clone(&doc), options);
        Self {
            doc,
            runtime,
            container,
        }
    }

    /// Mounts `tree` into the container and runs the effects it queued.
    pub fn set_content(
        &self,
        tree: impl Into<Option<VNodeRef>>,
    ) -> Result<Option<NodeId>, RenderError> {
        let dom = self.runtime.mount(tree, self.container)?;
        self.pump_until_idle();
        Ok(dom)
    }

    /// Renders without draining microtasks.
    pub fn render(&self, tree: impl Into<Option<VNodeRef>>) -> Result<Option<NodeId>, RenderError> {
        self.runtime.render(tree, self.container)
    }

    /// Unmounts the container, running every cleanup below it.
    pub fn clear(&self) -> Result<(), RenderError> {
        self.runtime.unmount(self.container)
    }

    /// Drains microtasks until the queue stays empty. Returns how many ran.
    pub fn pump_until_idle(&self) -> usize {
        let mut ran = 0;
        for _ in 0..MAX_IDLE_PASSES {
            if !self.runtime.has_pending_microtasks() {
                return ran;
            }
            ran += self.runtime.run_microtasks();
        }
        log::warn!("microtask queue still busy after {MAX_IDLE_PASSES} passes");
        ran
    }

    /// Fires `event_type` at `target` and settles. Returns how many
    /// listeners ran.
    pub fn dispatch(&self, target: NodeId, event_type: &str) -> usize {
        let ran = self.runtime.dispatch(target, event_type);
        self.pump_until_idle();
        ran
    }

    pub fn click(&self, target: NodeId) -> usize {
        self.dispatch(target, "click")
    }

    /// Clicks the first element with `tag` below the container.
    pub fn click_first(&self, tag: &str) -> usize {
        match self.find(tag) {
            Some(target) => self.click(target),
            None => 0,
        }
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn runtime_handle(&self) -> RuntimeHandle {
        self.runtime.handle()
    }

    pub fn document(&self) -> Rc<RefCell<MemoryDocument>> {
        Rc::clone(&self.doc)
    }

    pub fn container(&self) -> NodeId {
        self.container
    }

    /// Creates another container under the body for multi-root tests.
    pub fn add_container(&self) -> NodeId {
        self.doc.borrow_mut().create_container()
    }

    pub fn html(&self) -> String {
        self.doc.borrow().inner_html(self.container)
    }

    pub fn text(&self) -> String {
        self.doc.borrow().text_content(self.container)
    }

    pub fn text_of(&self, node: NodeId) -> String {
        self.doc.borrow().text_content(node)
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.doc.borrow().attribute(node, name)
    }

    pub fn find(&self, tag: &str) -> Option<NodeId> {
        self.doc.borrow().find_first(self.container, tag)
    }

    pub fn find_all(&self, tag: &str) -> Vec<NodeId> {
        self.doc.borrow().find_all(self.container, tag)
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.doc.borrow().children(node)
    }

    pub fn mutations(&self) -> usize {
        self.doc.borrow().mutation_count()
    }

    pub fn created(&self) -> usize {
        self.doc.borrow().created_count()
    }

    pub fn reset_counters(&self) {
        self.doc.borrow_mut().reset_counters();
    }

    /// Indented `[id] <tag>` listing of the container, for failure messages.
    pub fn dump(&self) -> String {
        self.doc.borrow().dump_tree(Some(self.container))
    }
}

impl Default for TestRoot {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for tests that only need temporary access to a
/// `TestRoot`.
pub fn run_test_root<R>(f: impl FnOnce(&mut TestRoot) -> R) -> R {
    let mut root = TestRoot::new();
    f(&mut root)
}
