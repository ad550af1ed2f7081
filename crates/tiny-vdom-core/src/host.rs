//! The live document the reconciler mutates.
//!
//! [`Host`] is the only way the runtime touches real UI nodes. Handles are
//! plain [`NodeId`]s; the host owns the nodes behind them.

use std::fmt;
use std::rc::Rc;

use crate::attributes::AttrValue;
use crate::error::HostError;

/// Handle of a live host node.
pub type NodeId = usize;

pub const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Namespace {
    #[default]
    Html,
    Svg,
}

impl Namespace {
    pub fn uri(self) -> Option<&'static str> {
        match self {
            Namespace::Html => None,
            Namespace::Svg => Some(SVG_NAMESPACE),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
    event_type: String,
    target: NodeId,
}

impl Event {
    pub fn new(event_type: impl Into<String>, target: NodeId) -> Self {
        Self {
            event_type: event_type.into(),
            target,
        }
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn target(&self) -> NodeId {
        self.target
    }
}

/// Event handler attached through an `on<Event>` attribute.
pub type Listener = Rc<dyn Fn(&Event)>;

/// Operations the reconciler and the attribute binding need from a document.
///
/// Navigation methods return `None` for unknown nodes instead of failing;
/// mutations report [`HostError`].
pub trait Host {
    fn create_element(&mut self, tag: &str, namespace: Namespace) -> NodeId;
    fn create_text(&mut self, data: &str) -> NodeId;

    fn parent(&self, node: NodeId) -> Option<NodeId>;
    fn first_child(&self, node: NodeId) -> Option<NodeId>;
    fn last_child(&self, node: NodeId) -> Option<NodeId>;
    fn next_sibling(&self, node: NodeId) -> Option<NodeId>;
    fn previous_sibling(&self, node: NodeId) -> Option<NodeId>;

    /// Inserts `child` before `before`, or appends it when `before` is `None`.
    /// A child that already has a parent is moved.
    fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        before: Option<NodeId>,
    ) -> Result<(), HostError>;
    fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), HostError>;

    /// Character data of a text node.
    fn text(&self, node: NodeId) -> Option<&str>;
    fn set_text(&mut self, node: NodeId, data: &str) -> Result<(), HostError>;

    /// Namespace of an element; `None` for text nodes and unknown ids.
    fn namespace(&self, node: NodeId) -> Option<Namespace>;

    fn has_attribute(&self, node: NodeId, name: &str) -> bool;
    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), HostError>;
    fn remove_attribute(&mut self, node: NodeId, name: &str) -> Result<(), HostError>;

    /// Whether `name` is a settable field of the live element.
    fn has_property(&self, node: NodeId, name: &str) -> bool;
    fn set_property(&mut self, node: NodeId, name: &str, value: &AttrValue)
        -> Result<(), HostError>;

    /// Replaces the whole inline style text.
    fn set_style_text(&mut self, node: NodeId, css: &str) -> Result<(), HostError>;
    /// Low-level setter for hyphenated and custom (`--x`) properties.
    fn set_style_property(&mut self, node: NodeId, name: &str, value: &str)
        -> Result<(), HostError>;
    fn remove_style_property(&mut self, node: NodeId, name: &str) -> Result<(), HostError>;
    /// Direct camel-case field assignment; an empty value clears the field.
    fn set_style_field(&mut self, node: NodeId, field: &str, value: &str)
        -> Result<(), HostError>;

    fn add_event_listener(
        &mut self,
        node: NodeId,
        event: &str,
        listener: Listener,
    ) -> Result<(), HostError>;
    fn remove_event_listener(
        &mut self,
        node: NodeId,
        event: &str,
        listener: &Listener,
    ) -> Result<(), HostError>;
    fn listeners(&self, node: NodeId, event: &str) -> Vec<Listener>;

    fn set_inner_html(&mut self, node: NodeId, html: &str) -> Result<(), HostError>;
}

impl fmt::Debug for dyn Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("dyn Host")
    }
}
