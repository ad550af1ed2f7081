//! Testing utilities and harness for tiny-vdom

pub mod testing;

// Re-export testing utilities
pub use testing::*;

pub mod prelude {
    pub use crate::testing::*;
    pub use tiny_vdom_core::{
        attrs, component, create, deps, forward_ref, fragment, h, memo, memo_with, style, text,
        AttrValue, Child, Cleanup, Deps, MemoryDocument, NodeId, NodeRef, Props, Runtime, Scope,
        Setter, VNodeRef,
    };
}
