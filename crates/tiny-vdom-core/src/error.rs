use std::fmt;

use crate::host::NodeId;

/// Failure reported by a [`Host`](crate::Host) operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    Missing { id: NodeId },
    NotAnElement { id: NodeId },
    NotAChild { parent: NodeId, child: NodeId },
    HierarchyRequest { parent: NodeId, child: NodeId },
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostError::Missing { id } => write!(f, "node {id} missing"),
            HostError::NotAnElement { id } => write!(f, "node {id} is not an element"),
            HostError::NotAChild { parent, child } => {
                write!(f, "node {child} is not a child of node {parent}")
            }
            HostError::HierarchyRequest { parent, child } => {
                write!(f, "node {child} cannot be inserted into node {parent}")
            }
        }
    }
}

impl std::error::Error for HostError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    Host(HostError),
    /// Nested or repeated renders went past `RuntimeOptions::max_render_depth`.
    RenderDepthExceeded { limit: usize },
    UnknownRoot { container: NodeId },
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::Host(err) => write!(f, "host operation failed: {err}"),
            RenderError::RenderDepthExceeded { limit } => {
                write!(f, "render depth limit of {limit} exceeded; a state update keeps re-rendering")
            }
            RenderError::UnknownRoot { container } => {
                write!(f, "node {container} is not a registered root")
            }
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::Host(err) => Some(err),
            _ => None,
        }
    }
}

impl From<HostError> for RenderError {
    fn from(err: HostError) -> Self {
        RenderError::Host(err)
    }
}

/// Programming errors in component code. These abort the current render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsageError {
    /// A hook of a different kind occupies this call position.
    HookKindMismatch {
        slot: usize,
        expected: &'static str,
        found: &'static str,
    },
    /// The slot holds a value of another type than the one requested.
    HookTypeMismatch { slot: usize, expected: &'static str },
}

impl fmt::Display for UsageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UsageError::HookKindMismatch {
                slot,
                expected,
                found,
            } => write!(
                f,
                "hook #{slot} was called as {expected} but holds {found}; hooks must be called unconditionally and in the same order on every render"
            ),
            UsageError::HookTypeMismatch { slot, expected } => write!(
                f,
                "hook #{slot} does not hold a value of type {expected}; hooks must be called in the same order on every render"
            ),
        }
    }
}

impl std::error::Error for UsageError {}

#[track_caller]
pub(crate) fn usage_error(err: UsageError) -> ! {
    panic!("{err}")
}
