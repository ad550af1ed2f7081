//! Per-instance hook storage and the hooks exposed to components.
//!
//! Hooks are addressed by call order: the n-th hook call of a render reads
//! and writes slot n of the instance's [`HookBag`]. A render that calls its
//! hooks in a different order or with different types than the previous
//! render panics with a [`UsageError`].

use std::any::{type_name, Any};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use crate::attributes::NodeRef;
use crate::error::{usage_error, UsageError};
use crate::hash::{hash_one, Key};
use crate::host::NodeId;
use crate::owned::Owned;
use crate::platform::{Diagnostic, DiagnosticSink, EffectPhase};
use crate::runtime::RuntimeHandle;

/// Dependency list of an effect or memoized value.
///
/// `Deps::always()` (no list) changes on every render. A list changes when
/// its length or any hashed entry differs from the previous render.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Deps(Option<Vec<Key>>);

impl Deps {
    pub fn always() -> Self {
        Deps(None)
    }

    pub fn empty() -> Self {
        Deps(Some(Vec::new()))
    }

    pub fn from_keys(keys: Vec<Key>) -> Self {
        Deps(Some(keys))
    }

    pub fn with<T: Hash + ?Sized>(self, value: &T) -> Self {
        let mut keys = self.0.unwrap_or_default();
        keys.push(hash_one(value));
        Deps(Some(keys))
    }

    fn changed_from(&self, prev: &Deps) -> bool {
        match (&self.0, &prev.0) {
            (Some(next), Some(prev)) => next != prev,
            _ => true,
        }
    }
}

/// `deps![]` runs once; `deps![a, b]` re-runs when `a` or `b` changes.
#[macro_export]
macro_rules! deps {
    () => {
        $crate::Deps::empty()
    };
    ($($dep:expr),+ $(,)?) => {
        $crate::Deps::from_keys(::std::vec![$($crate::hash::hash_one(&$dep)),+])
    };
}

/// Teardown returned by an effect body.
#[derive(Default)]
pub struct Cleanup(Option<Box<dyn FnOnce()>>);

impl Cleanup {
    pub fn none() -> Self {
        Cleanup(None)
    }

    pub fn new(f: impl FnOnce() + 'static) -> Self {
        Cleanup(Some(Box::new(f)))
    }

    fn into_inner(self) -> Option<Box<dyn FnOnce()>> {
        self.0
    }
}

impl From<()> for Cleanup {
    fn from(_: ()) -> Self {
        Cleanup::none()
    }
}

impl From<Box<dyn FnOnce()>> for Cleanup {
    fn from(f: Box<dyn FnOnce()>) -> Self {
        Cleanup(Some(f))
    }
}

impl fmt::Debug for Cleanup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.0.is_some() { "Cleanup(..)" } else { "Cleanup(none)" })
    }
}

enum HookSlot {
    State(Box<dyn Any>),
    Effect { deps: Deps },
    Ref(Box<dyn Any>),
    Memo { deps: Deps, value: Box<dyn Any> },
}

impl HookSlot {
    fn kind(&self) -> &'static str {
        match self {
            HookSlot::State(_) => "state",
            HookSlot::Effect { .. } => "effect",
            HookSlot::Ref(_) => "ref",
            HookSlot::Memo { .. } => "memo",
        }
    }
}

type EffectBody = Box<dyn FnOnce() -> Cleanup>;

struct PendingEffect {
    slot: usize,
    body: EffectBody,
}

/// Hook state of one component instance.
#[derive(Default)]
pub struct HookBag {
    slots: RefCell<Vec<HookSlot>>,
    cursor: Cell<usize>,
    pending: RefCell<Vec<PendingEffect>>,
    cleanups: RefCell<Vec<Option<Cleanup>>>,
    needs_flush: Cell<bool>,
    dirty: Cell<bool>,
    disposed: Cell<bool>,
    root: Cell<Option<NodeId>>,
}

impl HookBag {
    pub(crate) fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Resets the cursor for a render under `root`.
    pub(crate) fn begin_render(&self, root: NodeId) {
        self.cursor.set(0);
        self.dirty.set(false);
        self.root.set(Some(root));
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    pub(crate) fn needs_flush(&self) -> bool {
        self.needs_flush.get()
    }

    pub(crate) fn mark_needs_flush(&self) {
        self.needs_flush.set(true);
    }

    pub(crate) fn has_pending_effects(&self) -> bool {
        !self.pending.borrow().is_empty()
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    pub fn slot_count(&self) -> usize {
        self.slots.borrow().len()
    }

    fn next_slot(&self) -> usize {
        let slot = self.cursor.get();
        self.cursor.set(slot + 1);
        slot
    }

    fn has_slot(&self, slot: usize) -> bool {
        slot < self.slots.borrow().len()
    }

    fn push_slot(&self, hook: HookSlot) {
        self.slots.borrow_mut().push(hook);
    }

    fn read_state<T: Clone + 'static>(&self, slot: usize) -> T {
        let slots = self.slots.borrow();
        match &slots[slot] {
            HookSlot::State(value) => match value.downcast_ref::<T>() {
                Some(value) => value.clone(),
                None => usage_error(UsageError::HookTypeMismatch {
                    slot,
                    expected: type_name::<T>(),
                }),
            },
            other => usage_error(UsageError::HookKindMismatch {
                slot,
                expected: "state",
                found: other.kind(),
            }),
        }
    }

    fn write_state<T: 'static>(&self, slot: usize, value: T) {
        if let Some(HookSlot::State(stored)) = self.slots.borrow_mut().get_mut(slot) {
            *stored = Box::new(value);
        }
    }

    fn read_ref<T: 'static>(&self, slot: usize) -> Owned<T> {
        let slots = self.slots.borrow();
        match &slots[slot] {
            HookSlot::Ref(value) => match value.downcast_ref::<Owned<T>>() {
                Some(owned) => owned.clone(),
                None => usage_error(UsageError::HookTypeMismatch {
                    slot,
                    expected: type_name::<T>(),
                }),
            },
            other => usage_error(UsageError::HookKindMismatch {
                slot,
                expected: "ref",
                found: other.kind(),
            }),
        }
    }

    /// Records `deps` for an effect slot and reports whether they changed.
    fn swap_effect_deps(&self, slot: usize, deps: Deps) -> bool {
        let mut slots = self.slots.borrow_mut();
        if slot == slots.len() {
            slots.push(HookSlot::Effect { deps });
            return true;
        }
        match &mut slots[slot] {
            HookSlot::Effect { deps: prev } => {
                let changed = deps.changed_from(prev);
                *prev = deps;
                changed
            }
            other => usage_error(UsageError::HookKindMismatch {
                slot,
                expected: "effect",
                found: other.kind(),
            }),
        }
    }

    /// Cached memo value when `deps` did not change.
    fn cached_memo<T: Clone + 'static>(&self, slot: usize, deps: &Deps) -> Option<T> {
        let slots = self.slots.borrow();
        match slots.get(slot)? {
            HookSlot::Memo { deps: prev, value } => {
                if deps.changed_from(prev) {
                    return None;
                }
                match value.downcast_ref::<T>() {
                    Some(value) => Some(value.clone()),
                    None => usage_error(UsageError::HookTypeMismatch {
                        slot,
                        expected: type_name::<T>(),
                    }),
                }
            }
            other => usage_error(UsageError::HookKindMismatch {
                slot,
                expected: "memo",
                found: other.kind(),
            }),
        }
    }

    fn store_memo<T: 'static>(&self, slot: usize, deps: Deps, value: T) {
        let hook = HookSlot::Memo {
            deps,
            value: Box::new(value),
        };
        let mut slots = self.slots.borrow_mut();
        if slot == slots.len() {
            slots.push(hook);
        } else {
            slots[slot] = hook;
        }
    }

    /// Queues `body` for the next flush. An unflushed body for the same slot
    /// is replaced.
    fn queue_effect(&self, slot: usize, body: EffectBody) {
        let mut pending = self.pending.borrow_mut();
        match pending.iter_mut().find(|effect| effect.slot == slot) {
            Some(effect) => effect.body = body,
            None => pending.push(PendingEffect { slot, body }),
        }
    }

    fn take_cleanup(&self, slot: usize) -> Option<Cleanup> {
        self.cleanups
            .borrow_mut()
            .get_mut(slot)
            .and_then(Option::take)
    }

    fn store_cleanup(&self, slot: usize, cleanup: Cleanup) {
        let mut cleanups = self.cleanups.borrow_mut();
        if cleanups.len() <= slot {
            cleanups.resize_with(slot + 1, || None);
        }
        cleanups[slot] = Some(cleanup);
    }

    /// Runs queued effects in slot order, each preceded by the cleanup its
    /// slot returned last time.
    pub(crate) fn flush(&self, sink: &dyn DiagnosticSink) {
        self.needs_flush.set(false);
        let mut pending = std::mem::take(&mut *self.pending.borrow_mut());
        pending.sort_by_key(|effect| effect.slot);
        for PendingEffect { slot, body } in pending {
            // An earlier body may have unmounted this instance.
            if self.disposed.get() {
                break;
            }
            if let Some(cleanup) = self.take_cleanup(slot) {
                run_cleanup(slot, cleanup, sink);
            }
            match catch_unwind(AssertUnwindSafe(body)) {
                Ok(cleanup) if self.disposed.get() => run_cleanup(slot, cleanup, sink),
                Ok(cleanup) => self.store_cleanup(slot, cleanup),
                Err(payload) => sink.report(&Diagnostic::EffectPanicked {
                    slot,
                    phase: EffectPhase::Effect,
                    message: panic_message(payload.as_ref()),
                }),
            }
        }
    }

    /// Runs every stored cleanup and drops queued effects.
    pub(crate) fn dispose(&self, sink: &dyn DiagnosticSink) {
        if self.disposed.replace(true) {
            return;
        }
        self.pending.borrow_mut().clear();
        self.needs_flush.set(false);
        let cleanups = std::mem::take(&mut *self.cleanups.borrow_mut());
        for (slot, cleanup) in cleanups.into_iter().enumerate() {
            if let Some(cleanup) = cleanup {
                run_cleanup(slot, cleanup, sink);
            }
        }
    }
}

impl fmt::Debug for HookBag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots = self.slots.borrow();
        f.debug_struct("HookBag")
            .field("slots", &slots.iter().map(HookSlot::kind).collect::<Vec<_>>())
            .field("pending", &self.pending.borrow().len())
            .field("needs_flush", &self.needs_flush.get())
            .field("dirty", &self.dirty.get())
            .field("root", &self.root.get())
            .finish()
    }
}

fn run_cleanup(slot: usize, cleanup: Cleanup, sink: &dyn DiagnosticSink) {
    let Some(f) = cleanup.into_inner() else { return };
    if let Err(payload) = catch_unwind(AssertUnwindSafe(f)) {
        sink.report(&Diagnostic::EffectPanicked {
            slot,
            phase: EffectPhase::Cleanup,
            message: panic_message(payload.as_ref()),
        });
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Updates one state slot and re-renders the owning root.
pub struct Setter<T> {
    bag: Weak<HookBag>,
    slot: usize,
    runtime: RuntimeHandle,
    _marker: PhantomData<fn(T)>,
}

impl<T> Clone for Setter<T> {
    fn clone(&self) -> Self {
        Self {
            bag: Weak::clone(&self.bag),
            slot: self.slot,
            runtime: self.runtime.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Setter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Setter").field("slot", &self.slot).finish()
    }
}

impl<T: Clone + PartialEq + 'static> Setter<T> {
    pub fn set(&self, value: T) {
        self.update(move |_| value);
    }

    /// Computes the next value from the current one. Equal values are a
    /// no-op; a disposed instance ignores updates.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let Some(bag) = self.bag.upgrade() else { return };
        if bag.disposed.get() {
            return;
        }
        let prev: T = bag.read_state(self.slot);
        let next = f(&prev);
        if next == prev {
            return;
        }
        bag.write_state(self.slot, next);
        bag.dirty.set(true);
        match bag.root.get() {
            Some(root) => self.runtime.request_update(root),
            None => log::debug!("state slot {} updated before first render", self.slot),
        }
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Weak::ptr_eq(&self.bag, &other.bag) && self.slot == other.slot
    }
}

/// Sends actions through a reducer into a state slot.
pub struct Dispatch<A> {
    inner: Rc<dyn Fn(A)>,
}

impl<A> Clone for Dispatch<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<A> Dispatch<A> {
    pub fn dispatch(&self, action: A) {
        (self.inner)(action)
    }
}

impl<A> fmt::Debug for Dispatch<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Dispatch(..)")
    }
}

/// Render context handed to a component: the instance being rendered.
pub struct Scope {
    bag: Rc<HookBag>,
    runtime: RuntimeHandle,
}

impl Scope {
    pub(crate) fn new(bag: Rc<HookBag>, runtime: RuntimeHandle) -> Self {
        Self { bag, runtime }
    }

    /// Container of the root this instance renders under.
    pub fn root(&self) -> Option<NodeId> {
        self.bag.root.get()
    }

    pub fn runtime(&self) -> &RuntimeHandle {
        &self.runtime
    }

    pub fn use_state<T>(&mut self, init: impl FnOnce() -> T) -> (T, Setter<T>)
    where
        T: Clone + PartialEq + 'static,
    {
        let slot = self.bag.next_slot();
        if !self.bag.has_slot(slot) {
            let value = init();
            self.bag.push_slot(HookSlot::State(Box::new(value)));
        }
        let value = self.bag.read_state::<T>(slot);
        let setter = Setter {
            bag: Rc::downgrade(&self.bag),
            slot,
            runtime: self.runtime.clone(),
            _marker: PhantomData,
        };
        (value, setter)
    }

    pub fn use_reducer<S, A>(
        &mut self,
        reducer: fn(&S, A) -> S,
        init: impl FnOnce() -> S,
    ) -> (S, Dispatch<A>)
    where
        S: Clone + PartialEq + 'static,
        A: 'static,
    {
        let (state, setter) = self.use_state(init);
        let dispatch = Dispatch {
            inner: Rc::new(move |action: A| setter.update(|prev| reducer(prev, action))),
        };
        (state, dispatch)
    }

    /// Queues `body` for the next flush when `deps` changed.
    pub fn use_effect<F, C>(&mut self, deps: Deps, body: F)
    where
        F: FnOnce() -> C + 'static,
        C: Into<Cleanup>,
    {
        let slot = self.bag.next_slot();
        if self.bag.swap_effect_deps(slot, deps) {
            self.bag.queue_effect(slot, Box::new(move || body().into()));
        }
    }

    /// Mutable box with a stable identity across renders.
    pub fn use_ref<T: 'static>(&mut self, init: impl FnOnce() -> T) -> Owned<T> {
        let slot = self.bag.next_slot();
        if !self.bag.has_slot(slot) {
            let value = init();
            self.bag.push_slot(HookSlot::Ref(Box::new(Owned::new(value))));
        }
        self.bag.read_ref(slot)
    }

    /// Ref suitable for the `ref` attribute of an element.
    pub fn use_node_ref(&mut self) -> NodeRef {
        NodeRef::cell(self.use_ref(|| None::<NodeId>))
    }

    pub fn use_memo<T: Clone + 'static>(&mut self, deps: Deps, compute: impl FnOnce() -> T) -> T {
        let slot = self.bag.next_slot();
        if let Some(value) = self.bag.cached_memo::<T>(slot, &deps) {
            return value;
        }
        let value = compute();
        self.bag.store_memo(slot, deps, value.clone());
        value
    }

    /// `f` with an identity that only changes when `deps` change.
    pub fn use_callback<F: 'static>(&mut self, deps: Deps, f: F) -> Rc<F> {
        self.use_memo(deps, move || Rc::new(f))
    }
}

#[cfg(test)]
#[path = "tests/hooks_tests.rs"]
mod tests;
