//! Event routing from the current leaf up to the root.
//!
//! The first state on the chain that declares a handler for the event's kind
//! and answers [`Response::Handled`] stops the walk. States without a handler,
//! and handlers answering [`Response::Unhandled`], pass the event to the
//! parent. An event nobody handles is dropped.

use crate::core::{Event, Model, Response, StateId, StateTree, TransitionKind};
use tracing::{debug, trace};

/// A transition declared by a handler, executed once the handler returns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct TransitionRequest {
    pub(crate) source: StateId,
    pub(crate) target: StateId,
    pub(crate) kind: TransitionKind,
}

/// What dispatch found.
pub(crate) struct Handling {
    pub(crate) by: StateId,
    pub(crate) request: Option<TransitionRequest>,
}

/// View of the machine handed to an event handler.
///
/// Gives access to the application context and lets the handler declare at
/// most one transition. The transition runs after the handler returns
/// [`Response::Handled`].
pub struct HandlerContext<'a, M: Model> {
    tree: &'a StateTree<M>,
    context: &'a mut M::Context,
    current: StateId,
    state: StateId,
    request: Option<TransitionRequest>,
}

impl<'a, M: Model> HandlerContext<'a, M> {
    fn new(
        tree: &'a StateTree<M>,
        context: &'a mut M::Context,
        current: StateId,
        state: StateId,
    ) -> Self {
        Self {
            tree,
            context,
            current,
            state,
            request: None,
        }
    }

    pub fn context(&self) -> &M::Context {
        &*self.context
    }

    pub fn context_mut(&mut self) -> &mut M::Context {
        &mut *self.context
    }

    /// The machine's current leaf.
    pub fn current(&self) -> StateId {
        self.current
    }

    /// The state whose handler is running.
    pub fn state(&self) -> StateId {
        self.state
    }

    pub fn tree(&self) -> &StateTree<M> {
        self.tree
    }

    /// Declare an external transition from the handling state to `target`.
    pub fn transition(&mut self, target: impl Into<StateId>) {
        let source = self.state;
        self.declare(source, target.into(), TransitionKind::External);
    }

    /// Declare a local transition from the handling state to `target`.
    pub fn local_transition(&mut self, target: impl Into<StateId>) {
        let source = self.state;
        self.declare(source, target.into(), TransitionKind::Local);
    }

    /// Declare an external transition on behalf of `source`.
    ///
    /// # Panics
    ///
    /// Panics if either state is unknown, if `source` is not the current leaf
    /// or one of its ancestors, or if this handler already declared a
    /// transition.
    pub fn request_transition(&mut self, source: impl Into<StateId>, target: impl Into<StateId>) {
        self.declare(source.into(), target.into(), TransitionKind::External);
    }

    /// The transition declared so far, if any.
    pub fn requested(&self) -> Option<(StateId, StateId)> {
        self.request.map(|request| (request.source, request.target))
    }

    fn declare(&mut self, source: StateId, target: StateId, kind: TransitionKind) {
        if let Some(existing) = self.request {
            panic!(
                "state {} already requested a transition to {} while handling this event",
                existing.source, existing.target
            );
        }
        let current = self.tree.slot(self.current);
        let source_slot = self.tree.slot(source);
        // Unknown targets fail here rather than halfway through the exits.
        self.tree.slot(target);
        self.tree.assert_in_chain(current, source_slot);
        self.request = Some(TransitionRequest {
            source,
            target,
            kind,
        });
    }
}

/// Offer `event` to `current` and its ancestors in turn.
///
/// Returns `Ok(None)` when no state handled the event. Handler failures are
/// returned as-is and any transition they declared is dropped.
pub(crate) fn dispatch<M: Model>(
    tree: &StateTree<M>,
    context: &mut M::Context,
    current: StateId,
    event: &M::Event,
) -> Result<Option<Handling>, M::Error> {
    let kind = event.kind();
    let mut cursor = Some(tree.slot(current));

    while let Some(slot) = cursor {
        let node = tree.node(slot);
        cursor = node.parent;

        let Some(handler) = node.handlers.get(&kind) else {
            continue;
        };

        let mut cx = HandlerContext::new(tree, &mut *context, current, node.id);
        match handler(&mut cx, event)? {
            Response::Handled => {
                debug!(state = %node.name, ?kind, "event handled");
                return Ok(Some(Handling {
                    by: node.id,
                    request: cx.request,
                }));
            }
            Response::Unhandled => {
                if let Some(request) = cx.request {
                    panic!(
                        "state {} requested a transition to {} but did not handle the event",
                        node.id, request.target
                    );
                }
                trace!(state = %node.name, ?kind, "handler delegated to parent");
            }
        }
    }

    debug!(?kind, current = %tree.name(current), "event not handled");
    Ok(None)
}
