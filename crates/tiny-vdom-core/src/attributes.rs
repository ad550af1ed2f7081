//! Attribute values carried by virtual nodes.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::host::{Event, Listener, NodeId};
use crate::owned::Owned;

#[derive(Clone)]
pub enum AttrValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    Style(StyleMap),
    Listener(Listener),
    Ref(NodeRef),
    /// Raw markup for `dangerouslySetInnerHTML`.
    Html(Rc<str>),
    Any(Rc<dyn Any>),
}

impl AttrValue {
    pub fn listener(f: impl Fn(&Event) + 'static) -> Self {
        AttrValue::Listener(Rc::new(f))
    }

    pub fn html(markup: impl Into<Rc<str>>) -> Self {
        AttrValue::Html(markup.into())
    }

    pub fn any<T: 'static>(value: T) -> Self {
        AttrValue::Any(Rc::new(value))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AttrValue::Null)
    }

    /// Truthiness with JavaScript rules: `null`, `false`, `0`, `NaN` and the
    /// empty string are falsy.
    pub fn truthy(&self) -> bool {
        match self {
            AttrValue::Null => false,
            AttrValue::Bool(b) => *b,
            AttrValue::Int(n) => *n != 0,
            AttrValue::Float(n) => *n != 0.0 && !n.is_nan(),
            AttrValue::Str(s) => !s.is_empty(),
            _ => true,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(s) | AttrValue::Html(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttrValue::Int(n) => Some(*n),
            AttrValue::Float(n) if n.fract() == 0.0 => Some(*n as i64),
            _ => None,
        }
    }

    pub fn as_listener(&self) -> Option<&Listener> {
        match self {
            AttrValue::Listener(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_ref_target(&self) -> Option<&NodeRef> {
        match self {
            AttrValue::Ref(r) => Some(r),
            _ => None,
        }
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        match self {
            AttrValue::Any(v) => v.downcast_ref(),
            _ => None,
        }
    }
}

impl PartialEq for AttrValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (AttrValue::Null, AttrValue::Null) => true,
            (AttrValue::Bool(a), AttrValue::Bool(b)) => a == b,
            (AttrValue::Int(a), AttrValue::Int(b)) => a == b,
            (AttrValue::Float(a), AttrValue::Float(b)) => a == b,
            (AttrValue::Int(a), AttrValue::Float(b)) | (AttrValue::Float(b), AttrValue::Int(a)) => {
                *a as f64 == *b
            }
            (AttrValue::Str(a), AttrValue::Str(b)) => a == b,
            (AttrValue::Html(a), AttrValue::Html(b)) => a == b,
            (AttrValue::Style(a), AttrValue::Style(b)) => a == b,
            (AttrValue::Listener(a), AttrValue::Listener(b)) => Rc::ptr_eq(a, b),
            (AttrValue::Ref(a), AttrValue::Ref(b)) => a.ptr_eq(b),
            (AttrValue::Any(a), AttrValue::Any(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Null => f.write_str("Null"),
            AttrValue::Bool(b) => write!(f, "Bool({b})"),
            AttrValue::Int(n) => write!(f, "Int({n})"),
            AttrValue::Float(n) => write!(f, "Float({n})"),
            AttrValue::Str(s) => write!(f, "Str({s:?})"),
            AttrValue::Style(s) => write!(f, "Style({s:?})"),
            AttrValue::Listener(_) => f.write_str("Listener(..)"),
            AttrValue::Ref(r) => write!(f, "Ref({r:?})"),
            AttrValue::Html(s) => write!(f, "Html({s:?})"),
            AttrValue::Any(_) => f.write_str("Any(..)"),
        }
    }
}

/// String conversion used when a value lands in the document.
impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Null => f.write_str("null"),
            AttrValue::Bool(b) => write!(f, "{b}"),
            AttrValue::Int(n) => write!(f, "{n}"),
            AttrValue::Float(n) => write!(f, "{n}"),
            AttrValue::Str(s) | AttrValue::Html(s) => f.write_str(s),
            AttrValue::Style(s) => f.write_str(&s.to_css_text()),
            AttrValue::Listener(_) => f.write_str("[listener]"),
            AttrValue::Ref(_) => f.write_str("[ref]"),
            AttrValue::Any(_) => f.write_str("[object]"),
        }
    }
}

macro_rules! attr_from {
    ($($ty:ty => |$v:ident| $body:expr;)*) => {
        $(impl From<$ty> for AttrValue {
            fn from($v: $ty) -> Self {
                $body
            }
        })*
    };
}

attr_from! {
    bool => |v| AttrValue::Bool(v);
    i32 => |v| AttrValue::Int(v.into());
    i64 => |v| AttrValue::Int(v);
    u32 => |v| AttrValue::Int(v.into());
    usize => |v| AttrValue::Int(v as i64);
    f32 => |v| AttrValue::Float(v.into());
    f64 => |v| AttrValue::Float(v);
    &str => |v| AttrValue::Str(v.into());
    String => |v| AttrValue::Str(v.into());
    Rc<str> => |v| AttrValue::Str(v);
    StyleMap => |v| AttrValue::Style(v);
    NodeRef => |v| AttrValue::Ref(v);
}

impl From<&String> for AttrValue {
    fn from(v: &String) -> Self {
        AttrValue::Str(v.as_str().into())
    }
}

/// Stable callbacks from `use_callback` keep their identity as listeners.
impl<F: Fn(&Event) + 'static> From<Rc<F>> for AttrValue {
    fn from(v: Rc<F>) -> Self {
        let listener: Listener = v;
        AttrValue::Listener(listener)
    }
}

impl<T: Into<AttrValue>> From<Option<T>> for AttrValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(AttrValue::Null, Into::into)
    }
}

/// Target of a `ref` attribute: a callback or a mutable box.
#[derive(Clone)]
pub enum NodeRef {
    Callback(Rc<dyn Fn(Option<NodeId>)>),
    Cell(Owned<Option<NodeId>>),
}

impl NodeRef {
    pub fn callback(f: impl Fn(Option<NodeId>) + 'static) -> Self {
        NodeRef::Callback(Rc::new(f))
    }

    pub fn cell(cell: Owned<Option<NodeId>>) -> Self {
        NodeRef::Cell(cell)
    }

    /// Current node for box refs; always `None` for callback refs.
    pub fn current(&self) -> Option<NodeId> {
        match self {
            NodeRef::Callback(_) => None,
            NodeRef::Cell(cell) => cell.get(),
        }
    }

    pub(crate) fn deliver(&self, node: Option<NodeId>) {
        match self {
            NodeRef::Callback(f) => f(node),
            NodeRef::Cell(cell) => {
                cell.replace(node);
            }
        }
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (NodeRef::Callback(a), NodeRef::Callback(b)) => Rc::ptr_eq(a, b),
            (NodeRef::Cell(a), NodeRef::Cell(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRef::Callback(_) => f.write_str("Callback(..)"),
            NodeRef::Cell(cell) => write!(f, "Cell({:?})", cell.get()),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum CssValue {
    Null,
    Num(f64),
    Str(Rc<str>),
}

macro_rules! css_from {
    ($($ty:ty => |$v:ident| $body:expr;)*) => {
        $(impl From<$ty> for CssValue {
            fn from($v: $ty) -> Self {
                $body
            }
        })*
    };
}

css_from! {
    i32 => |v| CssValue::Num(v.into());
    i64 => |v| CssValue::Num(v as f64);
    u32 => |v| CssValue::Num(v.into());
    f32 => |v| CssValue::Num(v.into());
    f64 => |v| CssValue::Num(v);
    &str => |v| CssValue::Str(v.into());
    String => |v| CssValue::Str(v.into());
}

impl<T: Into<CssValue>> From<Option<T>> for CssValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(CssValue::Null, Into::into)
    }
}

/// Object form of the `style` attribute.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StyleMap {
    entries: IndexMap<Rc<str>, CssValue>,
}

impl StyleMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<CssValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &str, value: impl Into<CssValue>) {
        self.entries.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&CssValue> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CssValue)> {
        self.entries.iter().map(|(k, v)| (k.as_ref(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn to_css_text(&self) -> String {
        self.iter()
            .filter_map(|(name, value)| {
                crate::style::css_value(name, value).map(|v| format!("{name}: {v}"))
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Identity hint taken from the `key` attribute.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum NodeKey {
    Int(i64),
    Str(Rc<str>),
}

impl NodeKey {
    fn from_value(value: &AttrValue) -> Option<Self> {
        match value {
            AttrValue::Null => None,
            AttrValue::Str(s) => Some(NodeKey::Str(Rc::clone(s))),
            other => match other.as_int() {
                Some(n) => Some(NodeKey::Int(n)),
                None => Some(NodeKey::Str(other.to_string().into())),
            },
        }
    }
}

/// Attribute map of a virtual node. Keys are unique; iteration follows
/// insertion order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Attributes {
    entries: IndexMap<Rc<str>, AttrValue>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<AttrValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &str, value: impl Into<AttrValue>) {
        self.entries.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<AttrValue> {
        self.entries.shift_remove(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttrValue)> {
        self.entries.iter().map(|(k, v)| (k.as_ref(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn key(&self) -> Option<NodeKey> {
        self.get("key").and_then(NodeKey::from_value)
    }
}

/// `()` stands for "no attributes".
impl From<()> for Attributes {
    fn from(_: ()) -> Self {
        Attributes::new()
    }
}

/// Builds [`Attributes`]: `attrs! { "id" => "main", "onClick" => handler }`.
#[macro_export]
macro_rules! attrs {
    () => {
        $crate::Attributes::new()
    };
    ($($name:expr => $value:expr),+ $(,)?) => {{
        let mut attributes = $crate::Attributes::new();
        $(attributes.set($name, $value);)+
        attributes
    }};
}

/// Builds a [`StyleMap`]: `style! { "fontSize" => 12, "color" => "red" }`.
#[macro_export]
macro_rules! style {
    ($($name:expr => $value:expr),* $(,)?) => {{
        #[allow(unused_mut)]
        let mut style = $crate::StyleMap::new();
        $(style.set($name, $value);)*
        style
    }};
}
