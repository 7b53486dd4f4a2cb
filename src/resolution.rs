//! Resolution tracking: cycle detection and deferred creation callbacks.
//!
//! Every thread that resolves through a container gets its own stack of
//! interfaces currently being instantiated. Entering an interface that is
//! already on the stack is a cycle. Creation callbacks queued while the stack
//! is non-empty are held back until the outermost resolution finishes.

use crate::{Container, DiError, Result};
use ahash::RandomState;
use dashmap::DashMap;
use std::any::TypeId;
use std::thread::{self, ThreadId};

#[cfg(feature = "logging")]
use tracing::trace;

/// A queued on-create notification
pub(crate) struct PendingCreation {
    /// Raw address of the created instance, used for deduplication
    address: usize,
    notify: Box<dyn FnOnce(&Container) + Send + Sync>,
}

impl PendingCreation {
    pub(crate) fn new(address: usize, notify: Box<dyn FnOnce(&Container) + Send + Sync>) -> Self {
        Self { address, notify }
    }

    #[inline]
    pub(crate) fn notify(self, container: &Container) {
        (self.notify)(container)
    }
}

struct Frame {
    type_id: TypeId,
    type_name: &'static str,
}

#[derive(Default)]
struct ResolutionState {
    stack: Vec<Frame>,
    pending: Vec<PendingCreation>,
}

impl ResolutionState {
    fn is_idle(&self) -> bool {
        self.stack.is_empty() && self.pending.is_empty()
    }
}

/// Per-thread resolution stacks of one container
pub(crate) struct ResolutionTracker {
    threads: DashMap<ThreadId, ResolutionState, RandomState>,
}

impl ResolutionTracker {
    pub(crate) fn new() -> Self {
        Self {
            threads: DashMap::with_hasher(RandomState::new()),
        }
    }

    /// Push `I` onto the calling thread's stack.
    ///
    /// Fails with [`DiError::CircularDependency`] when `I` is already being
    /// resolved on this thread. The returned guard pops the frame on drop,
    /// whether the resolution succeeded, failed or panicked.
    pub(crate) fn enter<I: ?Sized + 'static>(&self) -> Result<ResolutionGuard<'_>> {
        let thread = thread::current().id();
        let type_id = TypeId::of::<I>();
        let type_name = std::any::type_name::<I>();

        let mut state = self.threads.entry(thread).or_default();

        if state.stack.iter().any(|frame| frame.type_id == type_id) {
            let mut chain: Vec<&'static str> =
                state.stack.iter().map(|frame| frame.type_name).collect();
            chain.push(type_name);
            return Err(DiError::circular::<I>(chain));
        }

        // Leftovers from a resolution that unwound without draining
        if state.stack.is_empty() {
            state.pending.clear();
        }

        state.stack.push(Frame { type_id, type_name });

        #[cfg(feature = "logging")]
        trace!(
            target: "interface_injector",
            interface = type_name,
            depth = state.stack.len(),
            "Entering resolution frame"
        );

        Ok(ResolutionGuard {
            tracker: self,
            thread,
        })
    }

    /// Queue a creation callback unless one is already pending for the same
    /// instance address.
    pub(crate) fn report(&self, creation: PendingCreation) {
        let thread = thread::current().id();
        let mut state = self.threads.entry(thread).or_default();

        if state
            .pending
            .iter()
            .any(|pending| pending.address == creation.address)
        {
            return;
        }
        state.pending.push(creation);
    }

    /// Take the calling thread's pending callbacks if it is no longer
    /// resolving anything. Returns an empty list while frames remain.
    pub(crate) fn take_if_outermost(&self) -> Vec<PendingCreation> {
        let thread = thread::current().id();
        let taken = match self.threads.get_mut(&thread) {
            Some(mut state) if state.stack.is_empty() => std::mem::take(&mut state.pending),
            _ => Vec::new(),
        };
        self.threads.remove_if(&thread, |_, state| state.is_idle());
        taken
    }

    /// Number of interfaces the calling thread is currently resolving.
    pub(crate) fn depth(&self) -> usize {
        self.threads
            .get(&thread::current().id())
            .map(|state| state.stack.len())
            .unwrap_or(0)
    }

    /// Interfaces the calling thread is currently resolving, outermost first.
    pub(crate) fn chain(&self) -> Vec<&'static str> {
        self.threads
            .get(&thread::current().id())
            .map(|state| state.stack.iter().map(|frame| frame.type_name).collect())
            .unwrap_or_default()
    }

    fn pop(&self, thread: ThreadId) {
        if let Some(mut state) = self.threads.get_mut(&thread) {
            state.stack.pop();
        }
        self.threads.remove_if(&thread, |_, state| state.is_idle());
    }
}

/// Pops one resolution frame when dropped
pub(crate) struct ResolutionGuard<'a> {
    tracker: &'a ResolutionTracker,
    thread: ThreadId,
}

impl Drop for ResolutionGuard<'_> {
    fn drop(&mut self) {
        self.tracker.pop(self.thread);
    }
}
