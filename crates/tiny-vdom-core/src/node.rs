//! Virtual node model and the factory that builds it.

use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::attributes::{AttrValue, Attributes, NodeKey, NodeRef};
use crate::hooks::{HookBag, Scope};
use crate::host::NodeId;

pub type VNodeRef = Rc<VNode>;

/// Function component.
pub type RenderFn = fn(&mut Scope, &Props) -> Child;

/// Component that receives the `ref` attribute as an explicit argument.
pub type ForwardRefFn = fn(&mut Scope, &Props, Option<&NodeRef>) -> Child;

/// Returns `true` when two props snapshots should be treated as equal.
pub type CompareFn = fn(&Props, &Props) -> bool;

#[derive(Clone, Copy)]
pub struct MemoComponent {
    pub render: RenderFn,
    pub compare: CompareFn,
}

#[derive(Clone)]
pub enum NodeKind {
    Element(Rc<str>),
    Text(Rc<str>),
    Fragment,
    Component(RenderFn),
    Memo(MemoComponent),
    ForwardRef(ForwardRefFn),
}

impl NodeKind {
    pub fn element(tag: impl Into<Rc<str>>) -> Self {
        NodeKind::Element(tag.into())
    }

    pub fn is_component(&self) -> bool {
        matches!(
            self,
            NodeKind::Component(_) | NodeKind::Memo(_) | NodeKind::ForwardRef(_)
        )
    }

    /// Type-tag equality: same tag, same render function, or both text.
    ///
    /// Functions compare by address. Rust does not promise unique addresses,
    /// so two identical component bodies merged by the optimizer count as one
    /// type, and a hook bag may then pass between them.
    pub fn same_type(&self, other: &NodeKind) -> bool {
        match (self, other) {
            (NodeKind::Element(a), NodeKind::Element(b)) => a == b,
            (NodeKind::Text(_), NodeKind::Text(_)) => true,
            (NodeKind::Fragment, NodeKind::Fragment) => true,
            (NodeKind::Component(a), NodeKind::Component(b)) => *a as usize == *b as usize,
            (NodeKind::Memo(a), NodeKind::Memo(b)) => {
                a.render as usize == b.render as usize && a.compare as usize == b.compare as usize
            }
            (NodeKind::ForwardRef(a), NodeKind::ForwardRef(b)) => *a as usize == *b as usize,
            _ => false,
        }
    }

    fn label(&self) -> String {
        match self {
            NodeKind::Element(tag) => tag.to_string(),
            NodeKind::Text(text) => format!("#text {text:?}"),
            NodeKind::Fragment => "#fragment".into(),
            NodeKind::Component(f) => format!("component@{:#x}", *f as usize),
            NodeKind::Memo(m) => format!("memo@{:#x}", m.render as usize),
            NodeKind::ForwardRef(f) => format!("forward_ref@{:#x}", *f as usize),
        }
    }
}

impl fmt::Debug for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl From<&str> for NodeKind {
    fn from(tag: &str) -> Self {
        NodeKind::Element(tag.into())
    }
}

impl From<String> for NodeKind {
    fn from(tag: String) -> Self {
        NodeKind::Element(tag.into())
    }
}

impl From<MemoComponent> for NodeKind {
    fn from(memo: MemoComponent) -> Self {
        NodeKind::Memo(memo)
    }
}

/// Node kind for a plain function component.
pub fn component(render: RenderFn) -> NodeKind {
    NodeKind::Component(render)
}

/// Wraps `render` so it only re-renders when its props change (shallowly)
/// or its own state changes.
pub fn memo(render: RenderFn) -> NodeKind {
    memo_with(render, shallow_equal)
}

pub fn memo_with(render: RenderFn, compare: CompareFn) -> NodeKind {
    NodeKind::Memo(MemoComponent { render, compare })
}

pub fn forward_ref(render: ForwardRefFn) -> NodeKind {
    NodeKind::ForwardRef(render)
}

/// Render-time bookkeeping attached to a node once it has been diffed.
#[derive(Default)]
pub(crate) struct RenderState {
    pub(crate) dom: Option<NodeId>,
    pub(crate) rendered: Option<VNodeRef>,
    pub(crate) hooks: Option<Rc<HookBag>>,
    pub(crate) props: Option<Props>,
}

pub struct VNode {
    kind: NodeKind,
    attrs: Attributes,
    children: Vec<VNodeRef>,
    pub(crate) state: RefCell<RenderState>,
}

impl VNode {
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn attrs(&self) -> &Attributes {
        &self.attrs
    }

    pub fn children(&self) -> &[VNodeRef] {
        &self.children
    }

    pub fn key(&self) -> Option<NodeKey> {
        self.attrs.key()
    }

    /// Live handle owned by this node after its last diff.
    pub fn dom(&self) -> Option<NodeId> {
        self.state.borrow().dom
    }

    /// Subtree produced by the last render of a component node.
    pub fn rendered(&self) -> Option<VNodeRef> {
        self.state.borrow().rendered.clone()
    }

    pub(crate) fn hooks(&self) -> Option<Rc<HookBag>> {
        self.state.borrow().hooks.clone()
    }

    pub(crate) fn state(&self) -> Ref<'_, RenderState> {
        self.state.borrow()
    }

    pub(crate) fn props(&self) -> Props {
        Props {
            attrs: self.attrs.clone(),
            children: self.children.clone(),
        }
    }

    /// Live nodes this virtual node contributes to its parent, in order.
    pub(crate) fn live_nodes(&self, out: &mut Vec<NodeId>) {
        match &self.kind {
            NodeKind::Element(_) | NodeKind::Text(_) => {
                if let Some(dom) = self.dom() {
                    out.push(dom);
                }
            }
            NodeKind::Fragment => {
                for child in &self.children {
                    child.live_nodes(out);
                }
            }
            NodeKind::Component(_) | NodeKind::Memo(_) | NodeKind::ForwardRef(_) => {
                if let Some(rendered) = self.rendered() {
                    rendered.live_nodes(out);
                }
            }
        }
    }
}

impl fmt::Debug for VNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VNode")
            .field("kind", &self.kind)
            .field("attrs", &self.attrs)
            .field("children", &self.children)
            .finish()
    }
}

/// Anything that can appear in a child list before normalization.
#[derive(Clone, Default)]
pub enum Child {
    #[default]
    Empty,
    Node(VNodeRef),
    Text(Rc<str>),
    List(Vec<Child>),
}

impl Child {
    fn flatten_into(self, out: &mut Vec<VNodeRef>) {
        match self {
            Child::Empty => {}
            Child::Node(node) => out.push(node),
            Child::Text(text) => out.push(text_node(text)),
            Child::List(items) => {
                for item in items {
                    item.flatten_into(out);
                }
            }
        }
    }

    /// Flattens nested lists and turns primitives into text nodes.
    pub fn flatten(self) -> Vec<VNodeRef> {
        let mut out = Vec::new();
        self.flatten_into(&mut out);
        out
    }

    /// Nothing renders as `None`, one node as itself, several as a fragment.
    pub fn normalize(self) -> Option<VNodeRef> {
        let mut nodes = self.flatten();
        match nodes.len() {
            0 => None,
            1 => nodes.pop(),
            _ => Some(new_node(NodeKind::Fragment, Attributes::new(), nodes)),
        }
    }
}

impl fmt::Debug for Child {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Child::Empty => f.write_str("Empty"),
            Child::Node(node) => write!(f, "Node({:?})", node.kind),
            Child::Text(text) => write!(f, "Text({text:?})"),
            Child::List(items) => f.debug_list().entries(items).finish(),
        }
    }
}

impl From<VNodeRef> for Child {
    fn from(node: VNodeRef) -> Self {
        Child::Node(node)
    }
}

impl From<&VNodeRef> for Child {
    fn from(node: &VNodeRef) -> Self {
        Child::Node(Rc::clone(node))
    }
}

impl From<&str> for Child {
    fn from(text: &str) -> Self {
        Child::Text(text.into())
    }
}

impl From<String> for Child {
    fn from(text: String) -> Self {
        Child::Text(text.into())
    }
}

impl From<&String> for Child {
    fn from(text: &String) -> Self {
        Child::Text(text.as_str().into())
    }
}

impl From<Rc<str>> for Child {
    fn from(text: Rc<str>) -> Self {
        Child::Text(text)
    }
}

macro_rules! child_from_display {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Child {
            fn from(value: $ty) -> Self {
                Child::Text(value.to_string().into())
            }
        })*
    };
}

child_from_display!(i32, i64, u32, u64, usize, f32, f64, char);

/// Booleans render nothing, so `cond && node` style children work.
impl From<bool> for Child {
    fn from(_: bool) -> Self {
        Child::Empty
    }
}

impl From<()> for Child {
    fn from(_: ()) -> Self {
        Child::Empty
    }
}

impl<T: Into<Child>> From<Option<T>> for Child {
    fn from(value: Option<T>) -> Self {
        value.map_or(Child::Empty, Into::into)
    }
}

impl<T: Into<Child>> From<Vec<T>> for Child {
    fn from(items: Vec<T>) -> Self {
        Child::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<&[VNodeRef]> for Child {
    fn from(items: &[VNodeRef]) -> Self {
        Child::List(items.iter().map(Child::from).collect())
    }
}

fn new_node(kind: NodeKind, attrs: Attributes, children: Vec<VNodeRef>) -> VNodeRef {
    Rc::new(VNode {
        kind,
        attrs,
        children,
        state: RefCell::new(RenderState::default()),
    })
}

fn text_node(text: Rc<str>) -> VNodeRef {
    new_node(NodeKind::Text(text), Attributes::new(), Vec::new())
}

/// Builds a virtual node. Children are flattened to any depth; empty
/// entries are dropped and primitives become text nodes.
pub fn create<C>(
    kind: impl Into<NodeKind>,
    attrs: impl Into<Attributes>,
    children: impl IntoIterator<Item = C>,
) -> VNodeRef
where
    C: Into<Child>,
{
    let mut flat = Vec::new();
    for child in children {
        child.into().flatten_into(&mut flat);
    }
    new_node(kind.into(), attrs.into(), flat)
}

pub fn text(content: impl Into<Rc<str>>) -> VNodeRef {
    text_node(content.into())
}

pub fn fragment<C: Into<Child>>(children: impl IntoIterator<Item = C>) -> VNodeRef {
    create(NodeKind::Fragment, Attributes::new(), children)
}

/// Element or component shorthand: `h!("li", attrs! { "key" => 1 }, "Apple")`.
#[macro_export]
macro_rules! h {
    ($kind:expr) => {
        $crate::create($kind, $crate::Attributes::new(), ::std::iter::empty::<$crate::Child>())
    };
    ($kind:expr, $attrs:expr $(, $child:expr)* $(,)?) => {{
        let children: ::std::vec::Vec<$crate::Child> = ::std::vec![$($crate::Child::from($child)),*];
        $crate::create($kind, $attrs, children)
    }};
}

/// Attributes plus children as seen by a component.
#[derive(Clone, Debug, Default)]
pub struct Props {
    attrs: Attributes,
    children: Vec<VNodeRef>,
}

impl Props {
    pub fn new(attrs: Attributes, children: Vec<VNodeRef>) -> Self {
        Self { attrs, children }
    }

    pub fn attrs(&self) -> &Attributes {
        &self.attrs
    }

    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.attrs.get(name)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(AttrValue::as_str)
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(AttrValue::as_int)
    }

    pub fn children(&self) -> &[VNodeRef] {
        &self.children
    }

    /// Children ready to be passed back into [`create`].
    pub fn children_node(&self) -> Child {
        Child::from(self.children.as_slice())
    }

    /// Removes `ref` from the props and returns it separately.
    pub fn split_ref(&self) -> (Props, Option<NodeRef>) {
        let mut attrs = self.attrs.clone();
        let node_ref = match attrs.remove("ref") {
            Some(AttrValue::Ref(node_ref)) => Some(node_ref),
            _ => None,
        };
        (
            Props {
                attrs,
                children: self.children.clone(),
            },
            node_ref,
        )
    }
}

/// Default memo comparison: same attribute keys with equal values, and
/// children equal element-wise by reference.
pub fn shallow_equal(prev: &Props, next: &Props) -> bool {
    if prev.attrs.len() != next.attrs.len() {
        return false;
    }
    let attrs_equal = next
        .attrs
        .iter()
        .all(|(name, value)| prev.attrs.get(name) == Some(value));
    attrs_equal
        && prev.children.len() == next.children.len()
        && prev
            .children
            .iter()
            .zip(&next.children)
            .all(|(a, b)| Rc::ptr_eq(a, b))
}

#[cfg(test)]
#[path = "tests/node_tests.rs"]
mod tests;
