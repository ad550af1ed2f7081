//! Platform abstraction traits for runtime services.
//!
//! The runtime never spins an event loop of its own. It asks the host to
//! drain its microtask queue through [`RuntimeScheduler`] and reports
//! contained failures through [`DiagnosticSink`].

use std::fmt;

use crate::error::RenderError;
use crate::host::NodeId;

/// Wakes the host event loop.
pub trait RuntimeScheduler {
    /// Request that the host call `Runtime::run_microtasks` once the current
    /// synchronous task has finished.
    fn schedule_microtask(&self);
}

/// Scheduler that relies on the caller to drain microtasks explicitly.
#[derive(Debug, Default)]
pub struct DefaultScheduler;

impl RuntimeScheduler for DefaultScheduler {
    fn schedule_microtask(&self) {}
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EffectPhase {
    Effect,
    Cleanup,
}

impl fmt::Display for EffectPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EffectPhase::Effect => f.write_str("effect"),
            EffectPhase::Cleanup => f.write_str("cleanup"),
        }
    }
}

/// Failure the runtime contained instead of propagating.
#[derive(Clone, Debug, PartialEq)]
pub enum Diagnostic {
    /// An effect body or cleanup panicked. The remaining effects still ran.
    EffectPanicked {
        slot: usize,
        phase: EffectPhase,
        message: String,
    },
    /// A state setter could not re-render its root.
    UpdateFailed {
        container: NodeId,
        error: RenderError,
    },
    /// The microtask queue kept refilling itself past the configured budget.
    MicrotaskBudgetExhausted { budget: usize },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::EffectPanicked {
                slot,
                phase,
                message,
            } => write!(f, "{phase} in hook slot {slot} panicked: {message}"),
            Diagnostic::UpdateFailed { container, error } => {
                write!(f, "state update of root {container} failed: {error}")
            }
            Diagnostic::MicrotaskBudgetExhausted { budget } => {
                write!(f, "microtask budget of {budget} exhausted; remaining tasks deferred")
            }
        }
    }
}

/// Receives contained failures.
pub trait DiagnosticSink {
    fn report(&self, diagnostic: &Diagnostic);
}

/// Sink that forwards every diagnostic to `log::error!`.
#[derive(Debug, Default)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn report(&self, diagnostic: &Diagnostic) {
        log::error!("{diagnostic}");
    }
}
