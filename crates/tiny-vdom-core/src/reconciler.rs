//! Tree diff and patch.
//!
//! [`Reconciler::diff`] moves the live children of one parent from matching
//! an old virtual subtree to matching a new one. Live handles are reused
//! whenever the node kind allows it; everything else is discarded and
//! recreated.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::attributes::{AttrValue, Attributes, NodeKey};
use crate::binding::apply_attributes;
use crate::collections::map::HashMap;
use crate::error::RenderError;
use crate::hooks::{HookBag, Scope};
use crate::host::{Host, Namespace, NodeId};
use crate::node::{Child, ForwardRefFn, MemoComponent, NodeKind, RenderFn, VNode, VNodeRef};
use crate::runtime::RuntimeInner;

type DiffResult = Result<Option<NodeId>, RenderError>;

/// Where the first child of a list goes when nothing has been placed yet.
#[derive(Copy, Clone, Debug)]
enum Anchor {
    /// At the start of the parent.
    Start,
    /// Right after a node that precedes the list.
    After(NodeId),
    /// Before a node that follows the list; `None` appends.
    Before(Option<NodeId>),
}

#[derive(Copy, Clone)]
enum ComponentFn {
    Plain(RenderFn),
    Memo(MemoComponent),
    ForwardRef(ForwardRefFn),
}

pub(crate) struct Reconciler<'a> {
    runtime: &'a RuntimeInner,
    root: NodeId,
    /// Re-run components even when a subtree is shared with the old tree.
    refresh: bool,
}

impl<'a> Reconciler<'a> {
    pub(crate) fn new(runtime: &'a RuntimeInner, root: NodeId, refresh: bool) -> Self {
        Self {
            runtime,
            root,
            refresh,
        }
    }

    fn host(&self) -> &RefCell<dyn Host> {
        self.runtime.host()
    }

    /// Updates `parent` so that `old` becomes `new`; returns the live handle
    /// of `new` (the first one for fragments).
    pub(crate) fn diff(
        &self,
        parent: NodeId,
        old: Option<&VNodeRef>,
        new: Option<&VNodeRef>,
        before: Option<NodeId>,
    ) -> DiffResult {
        if let (Some(old), Some(new)) = (old, new) {
            if Rc::ptr_eq(old, new) && !self.refresh {
                return Ok(new.dom());
            }
        }

        let Some(new) = new else {
            if let Some(old) = old {
                self.remove(parent, old)?;
            }
            return Ok(None);
        };

        match new.kind() {
            NodeKind::Component(render) => {
                self.diff_component(parent, old, new, ComponentFn::Plain(*render), before)
            }
            NodeKind::Memo(memo) => {
                self.diff_component(parent, old, new, ComponentFn::Memo(*memo), before)
            }
            NodeKind::ForwardRef(render) => {
                self.diff_component(parent, old, new, ComponentFn::ForwardRef(*render), before)
            }
            NodeKind::Fragment => self.diff_fragment(parent, old, new, before),
            NodeKind::Text(content) => self.diff_text(parent, old, new, content, before),
            NodeKind::Element(tag) => self.diff_element(parent, old, new, tag, before),
        }
    }

    fn diff_text(
        &self,
        parent: NodeId,
        old: Option<&VNodeRef>,
        new: &VNodeRef,
        content: &str,
        before: Option<NodeId>,
    ) -> DiffResult {
        let reused = old
            .filter(|old| matches!(old.kind(), NodeKind::Text(_)))
            .and_then(|old| old.dom());
        let before = match (old, reused) {
            (Some(old), None) => self.remove_for_replace(parent, old, before)?,
            _ => before,
        };

        let dom = {
            let mut host = self.host().borrow_mut();
            let dom = match reused {
                Some(dom) => dom,
                None => host.create_text(content),
            };
            if host.parent(dom) != Some(parent) {
                let before = before.filter(|b| host.parent(*b) == Some(parent));
                host.insert_before(parent, dom, before)?;
            }
            if host.text(dom) != Some(content) {
                host.set_text(dom, content)?;
            }
            dom
        };
        new.state.borrow_mut().dom = Some(dom);
        Ok(Some(dom))
    }

    fn diff_element(
        &self,
        parent: NodeId,
        old: Option<&VNodeRef>,
        new: &VNodeRef,
        tag: &str,
        before: Option<NodeId>,
    ) -> DiffResult {
        let reused = old
            .filter(|old| matches!(old.kind(), NodeKind::Element(t) if &**t == tag))
            .and_then(|old| old.dom());

        let empty = Attributes::new();
        let (dom, old_attrs, old_children): (NodeId, &Attributes, &[VNodeRef]) =
            match (old, reused) {
                (Some(old), Some(dom)) => (dom, old.attrs(), old.children()),
                _ => {
                    let before = match old {
                        Some(old) => self.remove_for_replace(parent, old, before)?,
                        None => before,
                    };
                    let mut host = self.host().borrow_mut();
                    let namespace = if tag == "svg" || host.namespace(parent) == Some(Namespace::Svg)
                    {
                        Namespace::Svg
                    } else {
                        Namespace::Html
                    };
                    let dom = host.create_element(tag, namespace);
                    let before = before.filter(|b| host.parent(*b) == Some(parent));
                    host.insert_before(parent, dom, before)?;
                    (dom, &empty, &[][..])
                }
            };
        new.state.borrow_mut().dom = Some(dom);

        apply_attributes(self.host(), dom, old_attrs, new.attrs())?;
        self.reconcile_children(dom, old_children, new.children(), Anchor::Start)?;
        Ok(Some(dom))
    }

    fn diff_fragment(
        &self,
        parent: NodeId,
        old: Option<&VNodeRef>,
        new: &VNodeRef,
        before: Option<NodeId>,
    ) -> DiffResult {
        let (old_children, anchor): (&[VNodeRef], Anchor) = match old {
            Some(old) if matches!(old.kind(), NodeKind::Fragment) => {
                let mut live = Vec::new();
                old.live_nodes(&mut live);
                let host = self.host().borrow();
                let anchor = match live.first() {
                    Some(&first) if host.parent(first) == Some(parent) => {
                        match host.previous_sibling(first) {
                            Some(prev) => Anchor::After(prev),
                            None => Anchor::Start,
                        }
                    }
                    _ => Anchor::Before(before),
                };
                (old.children(), anchor)
            }
            Some(old) => {
                let before = self.remove_for_replace(parent, old, before)?;
                (&[][..], Anchor::Before(before))
            }
            None => (&[][..], Anchor::Before(before)),
        };

        let first = self.reconcile_children(parent, old_children, new.children(), anchor)?;
        new.state.borrow_mut().dom = first;
        Ok(first)
    }

    fn diff_component(
        &self,
        parent: NodeId,
        old: Option<&VNodeRef>,
        new: &VNodeRef,
        render: ComponentFn,
        before: Option<NodeId>,
    ) -> DiffResult {
        let (old, before) = match old {
            Some(old) if old.kind().same_type(new.kind()) => (Some(old), before),
            Some(old) => (None, self.remove_for_replace(parent, old, before)?),
            None => (None, before),
        };

        let (prev_rendered, prev_bag, prev_props, prev_dom) = match old {
            Some(old) => {
                let state = old.state();
                (
                    state.rendered.clone(),
                    state.hooks.clone(),
                    state.props.clone(),
                    state.dom,
                )
            }
            None => (None, None, None, None),
        };

        if let (ComponentFn::Memo(memo), Some(bag), Some(prev_props)) =
            (render, &prev_bag, &prev_props)
        {
            let next_props = new.props();
            if !bag.is_dirty() && (memo.compare)(prev_props, &next_props) {
                let dom = match (&prev_rendered, self.refresh) {
                    // State below the memo boundary may still have changed.
                    (Some(rendered), true) => {
                        self.diff(parent, Some(rendered), Some(rendered), before)?
                    }
                    _ => prev_dom,
                };
                let mut state = new.state.borrow_mut();
                state.dom = dom;
                state.rendered = prev_rendered;
                state.hooks = prev_bag;
                state.props = Some(next_props);
                return Ok(dom);
            }
        }

        let bag = prev_bag.unwrap_or_else(HookBag::new);
        bag.begin_render(self.root);
        let mut scope = Scope::new(Rc::clone(&bag), self.runtime.handle());
        let props = new.props();
        let output: Child = match render {
            ComponentFn::Plain(render) => render(&mut scope, &props),
            ComponentFn::Memo(memo) => (memo.render)(&mut scope, &props),
            ComponentFn::ForwardRef(render) => {
                let (props, node_ref) = props.split_ref();
                render(&mut scope, &props, node_ref.as_ref())
            }
        };
        let rendered = output.normalize();

        let before = self.valid_hint(parent, before);
        let dom = self.diff(parent, prev_rendered.as_ref(), rendered.as_ref(), before)?;

        {
            let mut state = new.state.borrow_mut();
            state.dom = dom;
            state.rendered = rendered;
            state.hooks = Some(Rc::clone(&bag));
            state.props = matches!(render, ComponentFn::Memo(_)).then_some(props);
        }
        if bag.has_pending_effects() {
            self.runtime.queue_flush(&bag);
        }
        Ok(dom)
    }

    /// Keyed children match by key, unkeyed ones by type (falling back to
    /// position). Returns the first live node placed.
    fn reconcile_children(
        &self,
        parent: NodeId,
        old: &[VNodeRef],
        new: &[VNodeRef],
        anchor: Anchor,
    ) -> DiffResult {
        // A child carried over from the old list (always the case in a
        // refresh) matches itself before any key or type lookup.
        let mut by_identity: HashMap<*const VNode, VNodeRef> = old
            .iter()
            .map(|child| (Rc::as_ptr(child), Rc::clone(child)))
            .collect();
        let same: Vec<Option<VNodeRef>> = new
            .iter()
            .map(|child| by_identity.remove(&Rc::as_ptr(child)))
            .collect();

        let mut keyed: IndexMap<NodeKey, VNodeRef> = IndexMap::new();
        let mut unkeyed: Vec<VNodeRef> = Vec::new();
        let mut shadowed: Vec<VNodeRef> = Vec::new();
        for child in old {
            if by_identity.remove(&Rc::as_ptr(child)).is_none() {
                continue;
            }
            match child.key() {
                Some(key) => {
                    if let Some(earlier) = keyed.insert(key, Rc::clone(child)) {
                        shadowed.push(earlier);
                    }
                }
                None => unkeyed.push(Rc::clone(child)),
            }
        }

        let mut prev: Option<NodeId> = None;
        let mut first: Option<NodeId> = None;
        let mut live = Vec::new();
        for (child, same) in new.iter().zip(same) {
            let matched = match (same, child.key()) {
                (Some(itself), _) => Some(itself),
                (None, Some(key)) => keyed.shift_remove(&key),
                (None, None) => {
                    let index = unkeyed
                        .iter()
                        .position(|old| old.kind().same_type(child.kind()))
                        .or(if unkeyed.is_empty() { None } else { Some(0) });
                    index.map(|index| unkeyed.remove(index))
                }
            };

            let hint = self.slot_after(parent, prev, anchor);
            self.diff(parent, matched.as_ref(), Some(child), hint)?;

            live.clear();
            child.live_nodes(&mut live);
            for &node in &live {
                self.place(parent, node, prev, anchor)?;
                prev = Some(node);
                first.get_or_insert(node);
            }
        }

        for leftover in keyed.into_values().chain(unkeyed).chain(shadowed) {
            self.remove(parent, &leftover)?;
        }
        Ok(first)
    }

    /// Node that should follow the next placed child, `None` for the end.
    fn slot_after(&self, parent: NodeId, prev: Option<NodeId>, anchor: Anchor) -> Option<NodeId> {
        let host = self.host().borrow();
        match prev {
            Some(prev) => host.next_sibling(prev),
            None => match anchor {
                Anchor::Start => host.first_child(parent),
                Anchor::After(node) if host.parent(node) == Some(parent) => host.next_sibling(node),
                Anchor::After(_) => None,
                Anchor::Before(node) => node.filter(|n| host.parent(*n) == Some(parent)),
            },
        }
    }

    /// Moves `node` right after `prev` unless it is already there.
    fn place(
        &self,
        parent: NodeId,
        node: NodeId,
        prev: Option<NodeId>,
        anchor: Anchor,
    ) -> Result<(), RenderError> {
        let target = self.slot_after(parent, prev, anchor);
        let mut host = self.host().borrow_mut();
        if target == Some(node) && host.parent(node) == Some(parent) {
            return Ok(());
        }
        host.insert_before(parent, node, target)?;
        Ok(())
    }

    fn valid_hint(&self, parent: NodeId, hint: Option<NodeId>) -> Option<NodeId> {
        let host = self.host().borrow();
        hint.filter(|node| host.parent(*node) == Some(parent))
    }

    /// Removes `old` ahead of a replacement and returns an insertion hint
    /// that survives the removal.
    fn remove_for_replace(
        &self,
        parent: NodeId,
        old: &VNodeRef,
        before: Option<NodeId>,
    ) -> Result<Option<NodeId>, RenderError> {
        let mut live = Vec::new();
        old.live_nodes(&mut live);
        let mut hint = before;
        {
            let host = self.host().borrow();
            while let Some(node) = hint.filter(|node| live.contains(node)) {
                hint = host.next_sibling(node);
            }
        }
        self.remove(parent, old)?;
        Ok(self.valid_hint(parent, hint))
    }

    /// Unmounts `node` and detaches its live nodes from `parent`.
    pub(crate) fn remove(&self, parent: NodeId, node: &VNodeRef) -> Result<(), RenderError> {
        let mut live = Vec::new();
        node.live_nodes(&mut live);
        self.unmount(node);
        let mut host = self.host().borrow_mut();
        for dom in live {
            if host.parent(dom) == Some(parent) {
                host.remove_child(parent, dom)?;
            }
        }
        Ok(())
    }

    /// Runs cleanups bottom-up and clears element refs.
    fn unmount(&self, node: &VNodeRef) {
        match node.kind() {
            NodeKind::Component(_) | NodeKind::Memo(_) | NodeKind::ForwardRef(_) => {
                if let Some(rendered) = node.rendered() {
                    self.unmount(&rendered);
                }
            }
            NodeKind::Element(_) | NodeKind::Fragment => {
                for child in node.children() {
                    self.unmount(child);
                }
            }
            NodeKind::Text(_) => {}
        }
        if let Some(bag) = node.hooks() {
            bag.dispose(self.runtime.diagnostics());
        }
        if matches!(node.kind(), NodeKind::Element(_)) {
            if let Some(AttrValue::Ref(node_ref)) = node.attrs().get("ref") {
                node_ref.deliver(None);
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/reconciler_tests.rs"]
mod tests;
