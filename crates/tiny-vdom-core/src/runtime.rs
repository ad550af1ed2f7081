use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use crate::error::RenderError;
use crate::hooks::HookBag;
use crate::host::{Event, Host, NodeId};
use crate::node::{NodeKind, VNodeRef};
use crate::platform::{DefaultScheduler, Diagnostic, DiagnosticSink, LogSink, RuntimeScheduler};
use crate::reconciler::Reconciler;

pub const DEFAULT_ROOT_MARKER: &str = "data-tiny-vdom-root";
pub const DEFAULT_MAX_RENDER_DEPTH: usize = 50;
pub const DEFAULT_MICROTASK_BUDGET: usize = 10_000;

/// Runtime configuration.
#[derive(Clone)]
pub struct RuntimeOptions {
    root_marker: String,
    max_render_depth: usize,
    microtask_budget: usize,
    scheduler: Rc<dyn RuntimeScheduler>,
    diagnostics: Rc<dyn DiagnosticSink>,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            root_marker: DEFAULT_ROOT_MARKER.to_string(),
            max_render_depth: DEFAULT_MAX_RENDER_DEPTH,
            microtask_budget: DEFAULT_MICROTASK_BUDGET,
            scheduler: Rc::new(DefaultScheduler),
            diagnostics: Rc::new(LogSink),
        }
    }
}

impl RuntimeOptions {
    /// Attribute `mount` adds to a container.
    pub fn root_marker(mut self, name: impl Into<String>) -> Self {
        self.root_marker = name.into();
        self
    }

    /// Nested or repeated synchronous renders allowed before a render
    /// fails with [`RenderError::RenderDepthExceeded`].
    pub fn max_render_depth(mut self, depth: usize) -> Self {
        self.max_render_depth = depth.max(1);
        self
    }

    /// Microtasks one `run_microtasks` call executes before yielding.
    pub fn microtask_budget(mut self, budget: usize) -> Self {
        self.microtask_budget = budget.max(1);
        self
    }

    pub fn scheduler(mut self, scheduler: Rc<dyn RuntimeScheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn diagnostics(mut self, sink: Rc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = sink;
        self
    }

    pub fn marker(&self) -> &str {
        &self.root_marker
    }

    pub fn render_depth_limit(&self) -> usize {
        self.max_render_depth
    }
}

impl fmt::Debug for RuntimeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeOptions")
            .field("root_marker", &self.root_marker)
            .field("max_render_depth", &self.max_render_depth)
            .field("microtask_budget", &self.microtask_budget)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
struct RootEntry {
    tree: Option<VNodeRef>,
    marked: bool,
    rendering: bool,
    pending_update: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum RenderMode {
    /// Diff against the stored tree; shared subtrees are skipped.
    Update,
    /// Re-run every component below the root with its existing hook bag.
    Refresh,
}

pub(crate) struct RuntimeInner {
    weak_self: Weak<RuntimeInner>,
    host: Rc<RefCell<dyn Host>>,
    options: RuntimeOptions,
    roots: RefCell<IndexMap<NodeId, RootEntry>>,
    flush_scheduled: Cell<bool>,
    microtasks: RefCell<VecDeque<Box<dyn FnOnce()>>>,
    render_depth: Cell<usize>,
}

struct DepthGuard<'a>(&'a Cell<usize>);

impl<'a> DepthGuard<'a> {
    fn enter(depth: &'a Cell<usize>) -> Self {
        depth.set(depth.get() + 1);
        DepthGuard(depth)
    }
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get() - 1);
    }
}

struct RenderingGuard<'a> {
    runtime: &'a RuntimeInner,
    container: NodeId,
}

impl Drop for RenderingGuard<'_> {
    fn drop(&mut self) {
        if let Some(entry) = self.runtime.roots.borrow_mut().get_mut(&self.container) {
            entry.rendering = false;
        }
    }
}

impl RuntimeInner {
    pub(crate) fn host(&self) -> &RefCell<dyn Host> {
        &self.host
    }

    pub(crate) fn handle(&self) -> RuntimeHandle {
        RuntimeHandle(self.weak_self.clone())
    }

    pub(crate) fn diagnostics(&self) -> &dyn DiagnosticSink {
        &*self.options.diagnostics
    }

    fn render_root(
        &self,
        container: NodeId,
        tree: Option<VNodeRef>,
        mode: RenderMode,
    ) -> Result<Option<NodeId>, RenderError> {
        let limit = self.options.max_render_depth;
        if self.render_depth.get() >= limit {
            log::warn!("render of root {container} exceeds the depth limit of {limit}");
            return Err(RenderError::RenderDepthExceeded { limit });
        }
        let _depth = DepthGuard::enter(&self.render_depth);

        let prev = {
            let mut roots = self.roots.borrow_mut();
            let entry = roots.entry(container).or_default();
            entry.rendering = true;
            entry.pending_update = false;
            entry.tree.clone()
        };
        let _rendering = RenderingGuard {
            runtime: self,
            container,
        };

        log::debug!("render root {container} ({mode:?})");
        let refresh = mode == RenderMode::Refresh;
        let mut dom = Reconciler::new(self, container, refresh).diff(
            container,
            prev.as_ref(),
            tree.as_ref(),
            None,
        )?;
        if let Some(entry) = self.roots.borrow_mut().get_mut(&container) {
            entry.tree = tree.clone();
        }

        // State set while this root was rendering re-runs it in place.
        let mut reruns = 0;
        while self.take_pending_update(container) {
            reruns += 1;
            if self.render_depth.get() + reruns > limit {
                log::warn!("root {container} kept updating itself during render; giving up after {reruns} passes");
                return Err(RenderError::RenderDepthExceeded { limit });
            }
            log::trace!("re-render root {container} after in-render update");
            dom = Reconciler::new(self, container, true).diff(
                container,
                tree.as_ref(),
                tree.as_ref(),
                None,
            )?;
        }
        Ok(dom)
    }

    fn take_pending_update(&self, container: NodeId) -> bool {
        self.roots
            .borrow_mut()
            .get_mut(&container)
            .map(|entry| std::mem::take(&mut entry.pending_update))
            .unwrap_or(false)
    }

    fn update_root(&self, container: NodeId) -> Result<Option<NodeId>, RenderError> {
        let tree = self
            .roots
            .borrow()
            .get(&container)
            .map(|entry| entry.tree.clone())
            .ok_or(RenderError::UnknownRoot { container })?;
        self.render_root(container, tree, RenderMode::Refresh)
    }

    /// Re-renders `container` for a state change, or defers the re-render
    /// when that root is mid-render.
    fn request_update(&self, container: NodeId) {
        {
            let mut roots = self.roots.borrow_mut();
            match roots.get_mut(&container) {
                None => {
                    log::debug!("ignoring state update for unregistered root {container}");
                    return;
                }
                Some(entry) if entry.rendering => {
                    entry.pending_update = true;
                    return;
                }
                Some(_) => {}
            }
        }
        if let Err(error) = self.update_root(container) {
            log::error!("state update of root {container} failed: {error}");
            self.diagnostics()
                .report(&Diagnostic::UpdateFailed { container, error });
        }
    }

    /// Marks `bag` and schedules one flush for the current tick.
    pub(crate) fn queue_flush(&self, bag: &Rc<HookBag>) {
        bag.mark_needs_flush();
        if self.flush_scheduled.replace(true) {
            return;
        }
        let weak = self.weak_self.clone();
        self.queue_microtask(Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.flush_effects();
            }
        }));
    }

    fn queue_microtask(&self, task: Box<dyn FnOnce()>) {
        self.microtasks.borrow_mut().push_back(task);
        self.options.scheduler.schedule_microtask();
    }

    fn run_microtasks(&self) -> usize {
        let budget = self.options.microtask_budget;
        let mut ran = 0;
        loop {
            let task = self.microtasks.borrow_mut().pop_front();
            let Some(task) = task else { break };
            task();
            ran += 1;
            if ran >= budget && self.has_pending_microtasks() {
                self.diagnostics()
                    .report(&Diagnostic::MicrotaskBudgetExhausted { budget });
                self.options.scheduler.schedule_microtask();
                break;
            }
        }
        ran
    }

    fn has_pending_microtasks(&self) -> bool {
        !self.microtasks.borrow().is_empty()
    }

    fn flush_effects(&self) {
        self.flush_scheduled.set(false);
        let trees: Vec<VNodeRef> = self
            .roots
            .borrow()
            .values()
            .filter_map(|entry| entry.tree.clone())
            .collect();
        let mut bags = Vec::new();
        for tree in &trees {
            collect_bags(tree, &mut bags);
        }
        log::trace!("flushing effects across {} roots", trees.len());
        for bag in bags {
            if bag.needs_flush() && !bag.is_disposed() {
                bag.flush(self.diagnostics());
            }
        }
    }
}

/// Depth-first: the node, its rendered subtree, then its children.
fn collect_bags(node: &VNodeRef, out: &mut Vec<Rc<HookBag>>) {
    if let Some(bag) = node.hooks() {
        out.push(bag);
    }
    if node.kind().is_component() {
        if let Some(rendered) = node.rendered() {
            collect_bags(&rendered, out);
        }
    }
    if matches!(node.kind(), NodeKind::Element(_) | NodeKind::Fragment) {
        for child in node.children() {
            collect_bags(child, out);
        }
    }
}

/// Owns the root registry, the effect queue and the host document.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

impl Runtime {
    pub fn new<H: Host + 'static>(host: Rc<RefCell<H>>) -> Self {
        Self::with_options(host, RuntimeOptions::default())
    }

    pub fn with_options<H: Host + 'static>(host: Rc<RefCell<H>>, options: RuntimeOptions) -> Self {
        let host: Rc<RefCell<dyn Host>> = host;
        let inner = Rc::new_cyclic(|weak_self| RuntimeInner {
            weak_self: weak_self.clone(),
            host,
            options,
            roots: RefCell::new(IndexMap::new()),
            flush_scheduled: Cell::new(false),
            microtasks: RefCell::new(VecDeque::new()),
            render_depth: Cell::new(0),
        });
        Self { inner }
    }

    pub fn handle(&self) -> RuntimeHandle {
        self.inner.handle()
    }

    pub fn host(&self) -> Rc<RefCell<dyn Host>> {
        Rc::clone(&self.inner.host)
    }

    pub fn options(&self) -> &RuntimeOptions {
        &self.inner.options
    }

    /// Marks `container` as a root on first use, then renders into it.
    pub fn mount(
        &self,
        tree: impl Into<Option<VNodeRef>>,
        container: NodeId,
    ) -> Result<Option<NodeId>, RenderError> {
        let marker = self.inner.options.root_marker.as_str();
        {
            let mut host = self.inner.host.borrow_mut();
            if !host.has_attribute(container, marker) {
                host.set_attribute(container, marker, "")?;
            }
        }
        self.inner
            .roots
            .borrow_mut()
            .entry(container)
            .or_default()
            .marked = true;
        log::debug!("mount root {container}");
        self.render(tree, container)
    }

    /// Diffs `tree` against what `container` last rendered.
    pub fn render(
        &self,
        tree: impl Into<Option<VNodeRef>>,
        container: NodeId,
    ) -> Result<Option<NodeId>, RenderError> {
        self.inner
            .render_root(container, tree.into(), RenderMode::Update)
    }

    /// Re-renders every component below `container` with its current state.
    pub fn update_root(&self, container: NodeId) -> Result<Option<NodeId>, RenderError> {
        self.inner.update_root(container)
    }

    /// Runs all cleanups below `container`, removes its live nodes, its
    /// marker and its registry entry.
    pub fn unmount(&self, container: NodeId) -> Result<(), RenderError> {
        let (tree, marked) = {
            let roots = self.inner.roots.borrow();
            let entry = roots
                .get(&container)
                .ok_or(RenderError::UnknownRoot { container })?;
            (entry.tree.clone(), entry.marked)
        };
        log::debug!("unmount root {container}");
        Reconciler::new(&self.inner, container, false).diff(
            container,
            tree.as_ref(),
            None,
            None,
        )?;
        if marked {
            self.inner
                .host
                .borrow_mut()
                .remove_attribute(container, &self.inner.options.root_marker)?;
        }
        self.inner.roots.borrow_mut().shift_remove(&container);
        Ok(())
    }

    /// Nearest registered container at or above `node`.
    pub fn root_of(&self, node: NodeId) -> Option<NodeId> {
        let host = self.inner.host.borrow();
        let roots = self.inner.roots.borrow();
        let mut current = Some(node);
        while let Some(id) = current {
            if roots.contains_key(&id) {
                return Some(id);
            }
            current = host.parent(id);
        }
        None
    }

    pub fn tree(&self, container: NodeId) -> Option<VNodeRef> {
        self.inner
            .roots
            .borrow()
            .get(&container)
            .and_then(|entry| entry.tree.clone())
    }

    pub fn is_root(&self, container: NodeId) -> bool {
        self.inner.roots.borrow().contains_key(&container)
    }

    /// Registered containers in registration order.
    pub fn roots(&self) -> Vec<NodeId> {
        self.inner.roots.borrow().keys().copied().collect()
    }

    /// Invokes the listeners registered on `target` for `event_type`.
    /// Returns how many ran.
    pub fn dispatch(&self, target: NodeId, event_type: &str) -> usize {
        self.handle().dispatch(target, event_type)
    }

    pub fn queue_microtask(&self, task: impl FnOnce() + 'static) {
        self.inner.queue_microtask(Box::new(task));
    }

    /// Drains queued microtasks, including ones queued while draining, up to
    /// the configured budget. Returns how many ran.
    pub fn run_microtasks(&self) -> usize {
        self.inner.run_microtasks()
    }

    pub fn has_pending_microtasks(&self) -> bool {
        self.inner.has_pending_microtasks()
    }

    /// Runs pending effects immediately instead of waiting for the microtask.
    pub fn flush_effects(&self) {
        self.inner.flush_effects();
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("roots", &self.roots())
            .field("options", &self.inner.options)
            .finish()
    }
}

/// Weak reference to a [`Runtime`] held by setters and render scopes.
#[derive(Clone)]
pub struct RuntimeHandle(Weak<RuntimeInner>);

impl RuntimeHandle {
    pub fn request_update(&self, container: NodeId) {
        if let Some(inner) = self.0.upgrade() {
            inner.request_update(container);
        }
    }

    pub fn queue_microtask(&self, task: impl FnOnce() + 'static) {
        match self.0.upgrade() {
            Some(inner) => inner.queue_microtask(Box::new(task)),
            None => task(),
        }
    }

    pub fn dispatch(&self, target: NodeId, event_type: &str) -> usize {
        let Some(inner) = self.0.upgrade() else { return 0 };
        let listeners = inner.host.borrow().listeners(target, event_type);
        let event = Event::new(event_type, target);
        for listener in &listeners {
            listener(&event);
        }
        listeners.len()
    }

    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

impl fmt::Debug for RuntimeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RuntimeHandle").field(&self.is_alive()).finish()
    }
}

#[cfg(test)]
#[path = "tests/runtime_tests.rs"]
mod tests;
