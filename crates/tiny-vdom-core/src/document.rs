//! Arena-backed [`Host`] used by tests, the harness and the demo.

use std::fmt::Write as _;
use std::rc::Rc;

use indexmap::IndexMap;
use once_cell::sync::Lazy;

use crate::attributes::AttrValue;
use crate::collections::map::HashSet;
use crate::error::HostError;
use crate::host::{Host, Listener, Namespace, NodeId};

/// Element fields settable as properties. The first group reflects to an
/// attribute of the same name; the rest live on the element only.
static REFLECTED_PROPERTIES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "id",
        "title",
        "lang",
        "dir",
        "hidden",
        "name",
        "type",
        "href",
        "src",
        "alt",
        "placeholder",
    ]
    .into_iter()
    .collect()
});

static FIELD_PROPERTIES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    ["value", "checked", "disabled", "selected", "tabIndex"]
        .into_iter()
        .collect()
});

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

struct ElementData {
    tag: String,
    namespace: Namespace,
    attributes: IndexMap<String, String>,
    properties: IndexMap<String, AttrValue>,
    style: IndexMap<String, String>,
    listeners: Vec<(String, Listener)>,
    inner_html: Option<String>,
}

enum NodeData {
    Element(ElementData),
    Text(String),
}

struct DomNode {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: NodeData,
}

pub struct MemoryDocument {
    nodes: Vec<Option<DomNode>>,
    body: NodeId,
    mutations: usize,
    created: usize,
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocument {
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            body: 0,
            mutations: 0,
            created: 0,
        };
        doc.body = doc.create_element("body", Namespace::Html);
        doc.created = 0;
        doc
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    /// Creates an empty `div` attached to the body.
    pub fn create_container(&mut self) -> NodeId {
        let id = self.create_element("div", Namespace::Html);
        let body = self.body;
        self.attach(body, id, None);
        id
    }

    /// Host mutations since creation or the last [`reset_counters`](Self::reset_counters).
    pub fn mutation_count(&self) -> usize {
        self.mutations
    }

    /// Nodes created since creation or the last reset.
    pub fn created_count(&self) -> usize {
        self.created
    }

    pub fn reset_counters(&mut self) {
        self.mutations = 0;
        self.created = 0;
    }

    fn node(&self, id: NodeId) -> Option<&DomNode> {
        self.nodes.get(id).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut DomNode, HostError> {
        self.nodes
            .get_mut(id)
            .and_then(Option::as_mut)
            .ok_or(HostError::Missing { id })
    }

    fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.node(id)?.data {
            NodeData::Element(el) => Some(el),
            NodeData::Text(_) => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Result<&mut ElementData, HostError> {
        self.mutations += 1;
        match &mut self.node_mut(id)?.data {
            NodeData::Element(el) => Ok(el),
            NodeData::Text(_) => Err(HostError::NotAnElement { id }),
        }
    }

    fn is_inclusive_ancestor(&self, ancestor: NodeId, mut node: NodeId) -> bool {
        loop {
            if node == ancestor {
                return true;
            }
            match self.node(node).and_then(|n| n.parent) {
                Some(parent) => node = parent,
                None => return false,
            }
        }
    }

    fn detach(&mut self, child: NodeId) {
        let parent = self.node(child).and_then(|n| n.parent);
        if let Some(parent) = parent {
            if let Some(Some(p)) = self.nodes.get_mut(parent) {
                p.children.retain(|&c| c != child);
            }
        }
        if let Some(Some(c)) = self.nodes.get_mut(child) {
            c.parent = None;
        }
    }

    fn attach(&mut self, parent: NodeId, child: NodeId, before: Option<NodeId>) {
        self.detach(child);
        if let Some(Some(p)) = self.nodes.get_mut(parent) {
            let index = before
                .and_then(|b| p.children.iter().position(|&c| c == b))
                .unwrap_or(p.children.len());
            p.children.insert(index, child);
        }
        if let Some(Some(c)) = self.nodes.get_mut(child) {
            c.parent = Some(parent);
        }
    }

    fn sibling(&self, node: NodeId, offset: isize) -> Option<NodeId> {
        let parent = self.node(self.node(node)?.parent?)?;
        let index = parent.children.iter().position(|&c| c == node)?;
        let target = index.checked_add_signed(offset)?;
        parent.children.get(target).copied()
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.node(node).map(|n| n.children.clone()).unwrap_or_default()
    }

    pub fn tag(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(|el| el.tag.as_str())
    }

    pub fn is_text(&self, node: NodeId) -> bool {
        matches!(self.node(node).map(|n| &n.data), Some(NodeData::Text(_)))
    }

    /// Serialized attribute value, including the inline style text.
    pub fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        let el = self.element(node)?;
        if name == "style" {
            return (!el.style.is_empty()).then(|| style_text(&el.style));
        }
        el.attributes.get(name).cloned()
    }

    pub fn property(&self, node: NodeId, name: &str) -> Option<&AttrValue> {
        self.element(node)?.properties.get(name)
    }

    /// Inline style entry by CSS name (`font-size`) or field name (`fontSize`).
    pub fn style_value(&self, node: NodeId, name: &str) -> Option<&str> {
        let el = self.element(node)?;
        let key = if name.starts_with("--") {
            name.to_string()
        } else {
            kebab_case(name)
        };
        el.style.get(&key).map(String::as_str)
    }

    pub fn listener_count(&self, node: NodeId, event: &str) -> usize {
        self.element(node)
            .map(|el| el.listeners.iter().filter(|(e, _)| e == event).count())
            .unwrap_or(0)
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        let Some(n) = self.node(node) else { return };
        match &n.data {
            NodeData::Text(text) => out.push_str(text),
            NodeData::Element(_) => {
                for &child in &n.children {
                    self.collect_text(child, out);
                }
            }
        }
    }

    /// Elements below `root` (exclusive) with the given tag, in document order.
    pub fn find_all(&self, root: NodeId, tag: &str) -> Vec<NodeId> {
        let mut found = Vec::new();
        self.collect_tag(root, tag, &mut found);
        found
    }

    fn collect_tag(&self, node: NodeId, tag: &str, found: &mut Vec<NodeId>) {
        let Some(n) = self.node(node) else { return };
        for &child in &n.children {
            if self.tag(child) == Some(tag) {
                found.push(child);
            }
            self.collect_tag(child, tag, found);
        }
    }

    pub fn find_first(&self, root: NodeId, tag: &str) -> Option<NodeId> {
        self.find_all(root, tag).into_iter().next()
    }

    /// Serialized content of `node`, without the node itself.
    pub fn inner_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        if let Some(n) = self.node(node) {
            if let NodeData::Element(ElementData {
                inner_html: Some(html),
                ..
            }) = &n.data
            {
                out.push_str(html);
            } else {
                for &child in &n.children {
                    self.write_html(child, &mut out);
                }
            }
        }
        out
    }

    /// Serialized `node` including its own tag.
    pub fn to_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_html(node, &mut out);
        out
    }

    fn write_html(&self, node: NodeId, out: &mut String) {
        let Some(n) = self.node(node) else { return };
        match &n.data {
            NodeData::Text(text) => out.push_str(&escape_text(text)),
            NodeData::Element(el) => {
                out.push('<');
                out.push_str(&el.tag);
                for (name, value) in &el.attributes {
                    write_attribute(out, name, value);
                }
                if !el.style.is_empty() {
                    write_attribute(out, "style", &style_text(&el.style));
                }
                out.push('>');
                if el.namespace == Namespace::Html && VOID_ELEMENTS.contains(&el.tag.as_str()) {
                    return;
                }
                out.push_str(&self.inner_html(node));
                out.push_str("</");
                out.push_str(&el.tag);
                out.push('>');
            }
        }
    }

    pub fn dump_tree(&self, root: Option<NodeId>) -> String {
        let mut output = String::new();
        match root {
            Some(root) => self.dump_node(&mut output, root, 0),
            None => output.push_str("(no root)\n"),
        }
        output
    }

    fn dump_node(&self, output: &mut String, id: NodeId, depth: usize) {
        let indent = "  ".repeat(depth);
        match self.node(id) {
            Some(node) => {
                match &node.data {
                    NodeData::Text(text) => {
                        let _ = writeln!(output, "{indent}[{id}] #text {text:?}");
                    }
                    NodeData::Element(el) => {
                        let _ = writeln!(output, "{indent}[{id}] <{}>", el.tag);
                    }
                }
                for &child in &node.children {
                    self.dump_node(output, child, depth + 1);
                }
            }
            None => {
                let _ = writeln!(output, "{indent}[{id}] (missing)");
            }
        }
    }

    fn ensure_element(&self, id: NodeId) -> Result<(), HostError> {
        match self.node(id).map(|n| &n.data) {
            Some(NodeData::Element(_)) => Ok(()),
            Some(NodeData::Text(_)) => Err(HostError::NotAnElement { id }),
            None => Err(HostError::Missing { id }),
        }
    }
}

impl Host for MemoryDocument {
    fn create_element(&mut self, tag: &str, namespace: Namespace) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Some(DomNode {
            parent: None,
            children: Vec::new(),
            data: NodeData::Element(ElementData {
                tag: tag.to_string(),
                namespace,
                attributes: IndexMap::new(),
                properties: IndexMap::new(),
                style: IndexMap::new(),
                listeners: Vec::new(),
                inner_html: None,
            }),
        }));
        self.created += 1;
        id
    }

    fn create_text(&mut self, data: &str) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Some(DomNode {
            parent: None,
            children: Vec::new(),
            data: NodeData::Text(data.to_string()),
        }));
        self.created += 1;
        id
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node)?.parent
    }

    fn first_child(&self, node: NodeId) -> Option<NodeId> {
        self.node(node)?.children.first().copied()
    }

    fn last_child(&self, node: NodeId) -> Option<NodeId> {
        self.node(node)?.children.last().copied()
    }

    fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        self.sibling(node, 1)
    }

    fn previous_sibling(&self, node: NodeId) -> Option<NodeId> {
        self.sibling(node, -1)
    }

    fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        before: Option<NodeId>,
    ) -> Result<(), HostError> {
        self.ensure_element(parent)?;
        if self.node(child).is_none() {
            return Err(HostError::Missing { id: child });
        }
        if self.is_inclusive_ancestor(child, parent) {
            return Err(HostError::HierarchyRequest { parent, child });
        }
        let before = if before == Some(child) {
            self.next_sibling(child)
        } else {
            before
        };
        if let Some(reference) = before {
            if self.parent(reference) != Some(parent) {
                return Err(HostError::NotAChild {
                    parent,
                    child: reference,
                });
            }
        }
        if let Some(Some(el)) = self.nodes.get_mut(parent) {
            if let NodeData::Element(data) = &mut el.data {
                data.inner_html = None;
            }
        }
        self.attach(parent, child, before);
        self.mutations += 1;
        Ok(())
    }

    fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), HostError> {
        if self.node(child).is_none() {
            return Err(HostError::Missing { id: child });
        }
        if self.parent(child) != Some(parent) {
            return Err(HostError::NotAChild { parent, child });
        }
        self.detach(child);
        self.mutations += 1;
        Ok(())
    }

    fn text(&self, node: NodeId) -> Option<&str> {
        match &self.node(node)?.data {
            NodeData::Text(text) => Some(text),
            NodeData::Element(_) => None,
        }
    }

    fn set_text(&mut self, node: NodeId, data: &str) -> Result<(), HostError> {
        match &mut self.node_mut(node)?.data {
            NodeData::Text(text) => {
                *text = data.to_string();
            }
            NodeData::Element(_) => return Err(HostError::NotAnElement { id: node }),
        }
        self.mutations += 1;
        Ok(())
    }

    fn namespace(&self, node: NodeId) -> Option<Namespace> {
        self.element(node).map(|el| el.namespace)
    }

    fn has_attribute(&self, node: NodeId, name: &str) -> bool {
        self.attribute(node, name).is_some()
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), HostError> {
        if name == "style" {
            return self.set_style_text(node, value);
        }
        let el = self.element_mut(node)?;
        el.attributes.insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) -> Result<(), HostError> {
        let el = self.element_mut(node)?;
        if name == "style" {
            el.style.clear();
        }
        el.attributes.shift_remove(name);
        Ok(())
    }

    fn has_property(&self, node: NodeId, name: &str) -> bool {
        self.element(node).is_some()
            && (REFLECTED_PROPERTIES.contains(name) || FIELD_PROPERTIES.contains(name))
    }

    fn set_property(
        &mut self,
        node: NodeId,
        name: &str,
        value: &AttrValue,
    ) -> Result<(), HostError> {
        let el = self.element_mut(node)?;
        el.properties.insert(name.to_string(), value.clone());
        if REFLECTED_PROPERTIES.contains(name) {
            match value {
                AttrValue::Bool(false) => {
                    el.attributes.shift_remove(name);
                }
                AttrValue::Bool(true) => {
                    el.attributes.insert(name.to_string(), String::new());
                }
                other => {
                    el.attributes.insert(name.to_string(), other.to_string());
                }
            }
        }
        Ok(())
    }

    fn set_style_text(&mut self, node: NodeId, css: &str) -> Result<(), HostError> {
        let el = self.element_mut(node)?;
        el.style = parse_style(css);
        Ok(())
    }

    fn set_style_property(
        &mut self,
        node: NodeId,
        name: &str,
        value: &str,
    ) -> Result<(), HostError> {
        let el = self.element_mut(node)?;
        if value.is_empty() {
            el.style.shift_remove(name);
        } else {
            el.style.insert(name.to_string(), value.to_string());
        }
        Ok(())
    }

    fn remove_style_property(&mut self, node: NodeId, name: &str) -> Result<(), HostError> {
        let el = self.element_mut(node)?;
        el.style.shift_remove(name);
        Ok(())
    }

    fn set_style_field(&mut self, node: NodeId, field: &str, value: &str) -> Result<(), HostError> {
        let name = kebab_case(field);
        self.set_style_property(node, &name, value)
    }

    fn add_event_listener(
        &mut self,
        node: NodeId,
        event: &str,
        listener: Listener,
    ) -> Result<(), HostError> {
        let el = self.element_mut(node)?;
        let present = el
            .listeners
            .iter()
            .any(|(e, l)| e == event && Rc::ptr_eq(l, &listener));
        if !present {
            el.listeners.push((event.to_string(), listener));
        }
        Ok(())
    }

    fn remove_event_listener(
        &mut self,
        node: NodeId,
        event: &str,
        listener: &Listener,
    ) -> Result<(), HostError> {
        let el = self.element_mut(node)?;
        el.listeners
            .retain(|(e, l)| !(e == event && Rc::ptr_eq(l, listener)));
        Ok(())
    }

    fn listeners(&self, node: NodeId, event: &str) -> Vec<Listener> {
        self.element(node)
            .map(|el| {
                el.listeners
                    .iter()
                    .filter(|(e, _)| e == event)
                    .map(|(_, l)| Rc::clone(l))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn set_inner_html(&mut self, node: NodeId, html: &str) -> Result<(), HostError> {
        self.ensure_element(node)?;
        for child in self.children(node) {
            self.detach(child);
        }
        let el = self.element_mut(node)?;
        el.inner_html = (!html.is_empty()).then(|| html.to_string());
        Ok(())
    }
}

/// `fontSize` -> `font-size`; hyphenated names pass through.
fn kebab_case(name: &str) -> String {
    if name.contains('-') {
        return name.to_string();
    }
    let mut out = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

fn parse_style(css: &str) -> IndexMap<String, String> {
    css.split(';')
        .filter_map(|decl| {
            let (name, value) = decl.split_once(':')?;
            let (name, value) = (name.trim(), value.trim());
            (!name.is_empty() && !value.is_empty()).then(|| (name.to_string(), value.to_string()))
        })
        .collect()
}

fn style_text(style: &IndexMap<String, String>) -> String {
    style
        .iter()
        .map(|(name, value)| format!("{name}: {value};"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn write_attribute(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    out.push_str(&value.replace('&', "&amp;").replace('"', "&quot;"));
    out.push('"');
}

#[cfg(test)]
#[path = "tests/document_tests.rs"]
mod tests;
