use crate::world::{EntityId, EntityWorld};

pub type CleanupFn = fn(&mut EntityWorld, EntityId);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionRequest<S> {
    Enter(S),
    Finish,
}

/// Three ordered slots of pending work for one sprite.
///
/// `cleanup` runs when the current state is left, `deferred` holds a
/// request that arrived while a transition was in flight, and `next` is the
/// follow-up entered when the current state finishes. Each slot holds at
/// most one entry; a newer entry replaces the older one.
#[derive(Debug, Clone, Copy)]
pub struct TransitionQueue<S> {
    cleanup: Option<CleanupFn>,
    deferred: Option<TransitionRequest<S>>,
    next: Option<S>,
}

impl<S> Default for TransitionQueue<S> {
    fn default() -> Self {
        Self {
            cleanup: None,
            deferred: None,
            next: None,
        }
    }
}

impl<S: Copy> TransitionQueue<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_cleanup(&mut self, cleanup: Option<CleanupFn>) {
        self.cleanup = cleanup;
    }

    pub fn take_cleanup(&mut self) -> Option<CleanupFn> {
        self.cleanup.take()
    }

    pub fn has_cleanup(&self) -> bool {
        self.cleanup.is_some()
    }

    /// Stores a request behind the in-flight one. Returns true when an
    /// older deferred request was superseded.
    pub fn defer(&mut self, request: TransitionRequest<S>) -> bool {
        self.deferred.replace(request).is_some()
    }

    pub fn take_deferred(&mut self) -> Option<TransitionRequest<S>> {
        self.deferred.take()
    }

    pub fn deferred(&self) -> Option<TransitionRequest<S>> {
        self.deferred
    }

    pub fn set_next(&mut self, next: Option<S>) {
        self.next = next;
    }

    pub fn take_next(&mut self) -> Option<S> {
        self.next.take()
    }

    pub fn next(&self) -> Option<S> {
        self.next
    }

    pub fn len(&self) -> usize {
        usize::from(self.cleanup.is_some())
            + usize::from(self.deferred.is_some())
            + usize::from(self.next.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
