#![doc = r"Core of tiny-vdom: virtual nodes, the reconciler, hooks and the root registry."]

extern crate self as tiny_vdom_core;

pub mod attributes;
pub mod binding;
pub mod collections;
pub mod document;
pub mod error;
pub mod hash;
pub mod hooks;
pub mod host;
pub mod node;
pub mod owned;
pub mod platform;
mod reconciler;
pub mod runtime;
pub mod style;

pub use attributes::{AttrValue, Attributes, CssValue, NodeKey, NodeRef, StyleMap};
pub use binding::apply_attributes;
pub use document::MemoryDocument;
pub use error::{HostError, RenderError, UsageError};
pub use hash::Key;
pub use hooks::{Cleanup, Deps, Dispatch, HookBag, Scope, Setter};
pub use host::{Event, Host, Listener, Namespace, NodeId, SVG_NAMESPACE};
pub use node::{
    component, create, forward_ref, fragment, memo, memo_with, shallow_equal, text, Child,
    CompareFn, ForwardRefFn, MemoComponent, NodeKind, Props, RenderFn, VNode, VNodeRef,
};
pub use owned::Owned;
pub use platform::{
    DefaultScheduler, Diagnostic, DiagnosticSink, EffectPhase, LogSink, RuntimeScheduler,
};
pub use runtime::{Runtime, RuntimeHandle, RuntimeOptions, DEFAULT_ROOT_MARKER};

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
