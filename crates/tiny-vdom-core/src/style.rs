//! Inline style diffing.

use once_cell::sync::Lazy;

use crate::attributes::{AttrValue, CssValue, StyleMap};
use crate::collections::map::HashSet;
use crate::error::HostError;
use crate::host::{Host, NodeId};

/// CSS properties whose numeric values are written without a unit.
static UNITLESS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "animationIterationCount",
        "borderImageOutset",
        "borderImageSlice",
        "borderImageWidth",
        "boxFlex",
        "boxFlexGroup",
        "boxOrdinalGroup",
        "columnCount",
        "columns",
        "flex",
        "flexGrow",
        "flexPositive",
        "flexShrink",
        "flexNegative",
        "flexOrder",
        "gridRow",
        "gridRowEnd",
        "gridRowSpan",
        "gridRowStart",
        "gridColumn",
        "gridColumnEnd",
        "gridColumnSpan",
        "gridColumnStart",
        "fontWeight",
        "lineClamp",
        "lineHeight",
        "opacity",
        "order",
        "orphans",
        "tabSize",
        "widows",
        "zIndex",
        "zoom",
        // svg
        "fillOpacity",
        "floodOpacity",
        "stopOpacity",
        "strokeMiterlimit",
        "strokeOpacity",
        "strokeWidth",
    ]
    .into_iter()
    .collect()
});

pub fn is_unitless(name: &str) -> bool {
    UNITLESS.contains(name)
}

fn is_custom_or_hyphenated(name: &str) -> bool {
    name.starts_with("--") || name.contains('-')
}

/// Serialized value of one style entry; `None` clears the property.
pub(crate) fn css_value(name: &str, value: &CssValue) -> Option<String> {
    match value {
        CssValue::Null => None,
        CssValue::Num(n) if is_unitless(name) => Some(format!("{n}")),
        CssValue::Num(n) => Some(format!("{n}px")),
        CssValue::Str(s) => Some(s.to_string()),
    }
}

fn clear(host: &mut dyn Host, node: NodeId, name: &str) -> Result<(), HostError> {
    if is_custom_or_hyphenated(name) {
        host.remove_style_property(node, name)
    } else {
        host.set_style_field(node, name, "")
    }
}

fn assign(host: &mut dyn Host, node: NodeId, name: &str, value: &str) -> Result<(), HostError> {
    if is_custom_or_hyphenated(name) {
        host.set_style_property(node, name, value)
    } else {
        host.set_style_field(node, name, value)
    }
}

/// Moves the inline style of `node` from `prev` to `next`.
///
/// A string replaces the whole style text. Maps are diffed entry by entry
/// against the previous map, if there was one.
pub(crate) fn apply_style(
    host: &mut dyn Host,
    node: NodeId,
    prev: &AttrValue,
    next: &AttrValue,
) -> Result<(), HostError> {
    if let AttrValue::Str(css) = next {
        return host.set_style_text(node, css);
    }

    let prev_map = match prev {
        AttrValue::Style(map) => Some(map),
        _ => None,
    };
    let next_map = match next {
        AttrValue::Style(map) => Some(map),
        _ => None,
    };

    if next_map.is_some() && matches!(prev, AttrValue::Str(_)) {
        host.set_style_text(node, "")?;
    }

    if let Some(prev_map) = prev_map {
        for (name, _) in prev_map.iter() {
            if !next_map.is_some_and(|next_map| next_map.contains(name)) {
                clear(host, node, name)?;
            }
        }
    }

    match next_map {
        Some(next_map) => apply_entries(host, node, prev_map, next_map),
        None => match next {
            AttrValue::Null | AttrValue::Bool(false) => {
                if matches!(prev, AttrValue::Str(_)) {
                    host.set_style_text(node, "")?;
                }
                Ok(())
            }
            other => host.set_style_text(node, &other.to_string()),
        },
    }
}

fn apply_entries(
    host: &mut dyn Host,
    node: NodeId,
    prev_map: Option<&StyleMap>,
    next_map: &StyleMap,
) -> Result<(), HostError> {
    for (name, value) in next_map.iter() {
        if prev_map.and_then(|prev| prev.get(name)) == Some(value) {
            continue;
        }
        match css_value(name, value) {
            Some(css) => assign(host, node, name, &css)?,
            None => clear(host, node, name)?,
        }
    }
    Ok(())
}
