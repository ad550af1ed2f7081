//! Applies attribute deltas to a live element.

use std::cell::RefCell;

use crate::attributes::{AttrValue, Attributes, NodeRef};
use crate::error::HostError;
use crate::host::{Host, Namespace, NodeId};
use crate::style;

const INNER_HTML: &str = "dangerouslySetInnerHTML";

fn is_boolean_prop(name: &str) -> bool {
    matches!(name, "checked" | "disabled" | "selected")
}

/// `onClick` -> `click`. Anything shorter than `on` plus one character is
/// not an event attribute.
pub fn event_name(name: &str) -> Option<String> {
    match name.strip_prefix("on") {
        Some(rest) if !rest.is_empty() => Some(rest.to_ascii_lowercase()),
        _ => None,
    }
}

/// Applies the difference between `old` and `new` to `node`.
///
/// Keys missing from `new` are applied as `null`; keys whose value is
/// unchanged are left alone. Ref callbacks run after the host borrow has
/// been released, so they may read the document.
pub fn apply_attributes(
    host: &RefCell<dyn Host>,
    node: NodeId,
    old: &Attributes,
    new: &Attributes,
) -> Result<(), HostError> {
    let mut refs: Vec<(NodeRef, Option<NodeId>)> = Vec::new();
    {
        let mut host = host.borrow_mut();
        for (name, prev) in old.iter() {
            if !new.contains(name) {
                set_attribute(&mut *host, node, name, &AttrValue::Null, prev, &mut refs)?;
            }
        }
        for (name, value) in new.iter() {
            let prev = old.get(name).unwrap_or(&AttrValue::Null);
            if prev != value || !old.contains(name) {
                set_attribute(&mut *host, node, name, value, prev, &mut refs)?;
            }
        }
    }
    for (target, value) in refs {
        target.deliver(value);
    }
    Ok(())
}

fn set_attribute(
    host: &mut dyn Host,
    node: NodeId,
    name: &str,
    value: &AttrValue,
    prev: &AttrValue,
    refs: &mut Vec<(NodeRef, Option<NodeId>)>,
) -> Result<(), HostError> {
    let name = if name == "className" { "class" } else { name };

    if name == "children" || name == "key" {
        return Ok(());
    }

    if name == "ref" {
        if let AttrValue::Ref(old_ref) = prev {
            refs.push((old_ref.clone(), None));
        }
        if let AttrValue::Ref(new_ref) = value {
            refs.push((new_ref.clone(), Some(node)));
        }
        return Ok(());
    }

    if name == INNER_HTML {
        return match value {
            AttrValue::Null | AttrValue::Bool(false) => host.set_inner_html(node, ""),
            other => host.set_inner_html(node, &other.to_string()),
        };
    }

    if let Some(event) = event_name(name) {
        if let AttrValue::Listener(old_listener) = prev {
            host.remove_event_listener(node, &event, old_listener)?;
        }
        if let AttrValue::Listener(listener) = value {
            host.add_event_listener(node, &event, listener.clone())?;
        }
        return Ok(());
    }

    if name == "style" {
        return style::apply_style(host, node, prev, value);
    }

    if is_boolean_prop(name) {
        let on = value.truthy();
        host.set_property(node, name, &AttrValue::Bool(on))?;
        return if on {
            host.set_attribute(node, name, "")
        } else {
            host.remove_attribute(node, name)
        };
    }

    let is_svg = host.namespace(node) == Some(Namespace::Svg);
    if !is_svg && host.has_property(node, name) {
        let value = match value {
            AttrValue::Null => AttrValue::Str("".into()),
            other => other.clone(),
        };
        return host.set_property(node, name, &value);
    }

    match value {
        AttrValue::Null | AttrValue::Bool(false) => host.remove_attribute(node, name),
        AttrValue::Bool(true) => host.set_attribute(node, name, ""),
        other => host.set_attribute(node, name, &other.to_string()),
    }
}

#[cfg(test)]
#[path = "tests/binding_tests.rs"]
mod tests;
