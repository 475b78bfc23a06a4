//! Execution of declared transitions.
//!
//! A transition runs in two explicit phases. [`TransitionRun::begin`] runs the
//! exit actions from the current leaf up to the boundary.
//! [`TransitionRun::complete`] runs the entry actions from below the boundary
//! down to the target, then follows default children until a leaf is reached.
//! Neither phase touches the machine's current state; the caller commits the
//! settled leaf in one assignment.

use crate::core::{Model, NodeKind, StateId, StateTree, TransitionPath};
use crate::engine::dispatch::TransitionRequest;
use std::sync::Arc;
use tracing::trace;

/// Outcome of a completed transition or initialization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Settled {
    pub(crate) leaf: StateId,
    pub(crate) exited: Vec<StateId>,
    pub(crate) entered: Vec<StateId>,
}

/// A transition whose exit phase has run.
pub(crate) struct TransitionRun<'t, M: Model> {
    tree: &'t StateTree<M>,
    path: Arc<TransitionPath>,
    target: usize,
    exited: Vec<StateId>,
}

impl<'t, M: Model> TransitionRun<'t, M> {
    /// Run the exit phase for `request` starting at `current`.
    ///
    /// # Panics
    ///
    /// Panics if the request names an unknown state or if its source is not
    /// `current` or one of its ancestors.
    pub(crate) fn begin(
        tree: &'t StateTree<M>,
        context: &mut M::Context,
        current: StateId,
        request: TransitionRequest,
    ) -> Result<Self, M::Error> {
        let current = tree.slot(current);
        let source = tree.slot(request.source);
        let target = tree.slot(request.target);
        tree.assert_in_chain(current, source);

        let path = tree.path(source, target, request.kind);
        let mut exited = Vec::new();
        for slot in tree.exit_slots(current, path.boundary) {
            exit(tree, slot, context, &mut exited)?;
        }

        Ok(Self {
            tree,
            path,
            target,
            exited,
        })
    }

    /// Run the entry phase and resolve the target down to a leaf.
    pub(crate) fn complete(self, context: &mut M::Context) -> Result<Settled, M::Error> {
        let mut entered = Vec::with_capacity(self.path.entries.len());
        for &slot in &self.path.entries {
            enter(self.tree, slot, context, &mut entered)?;
        }
        let leaf = resolve_default(self.tree, self.target, context, &mut entered)?;

        Ok(Settled {
            leaf: self.tree.node(leaf).id,
            exited: self.exited,
            entered,
        })
    }
}

/// Run both phases of `request`.
pub(crate) fn execute<M: Model>(
    tree: &StateTree<M>,
    context: &mut M::Context,
    current: StateId,
    request: TransitionRequest,
) -> Result<Settled, M::Error> {
    TransitionRun::begin(tree, context, current, request)?.complete(context)
}

/// Enter the root and cascade to its default leaf.
pub(crate) fn initialize<M: Model>(
    tree: &StateTree<M>,
    context: &mut M::Context,
) -> Result<Settled, M::Error> {
    let root = tree.root_slot();
    let mut entered = Vec::new();
    enter(tree, root, context, &mut entered)?;
    let leaf = resolve_default(tree, root, context, &mut entered)?;

    Ok(Settled {
        leaf: tree.node(leaf).id,
        exited: Vec::new(),
        entered,
    })
}

/// Follow default children from `slot`, entering each one.
fn resolve_default<M: Model>(
    tree: &StateTree<M>,
    mut slot: usize,
    context: &mut M::Context,
    entered: &mut Vec<StateId>,
) -> Result<usize, M::Error> {
    while let NodeKind::Composite { default_child } = tree.node(slot).kind {
        enter(tree, default_child, context, entered)?;
        slot = default_child;
    }
    Ok(slot)
}

fn enter<M: Model>(
    tree: &StateTree<M>,
    slot: usize,
    context: &mut M::Context,
    entered: &mut Vec<StateId>,
) -> Result<(), M::Error> {
    let node = tree.node(slot);
    trace!(state = %node.name, "entry");
    if let Some(action) = &node.entry {
        action(context)?;
    }
    entered.push(node.id);
    Ok(())
}

fn exit<M: Model>(
    tree: &StateTree<M>,
    slot: usize,
    context: &mut M::Context,
    exited: &mut Vec<StateId>,
) -> Result<(), M::Error> {
    let node = tree.node(slot);
    trace!(state = %node.name, "exit");
    if let Some(action) = &node.exit {
        action(context)?;
    }
    exited.push(node.id);
    Ok(())
}
