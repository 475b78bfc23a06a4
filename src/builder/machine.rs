//! Builder for constructing machines.

use crate::builder::error::BuildError;
use crate::core::{Model, StateTree, DEFAULT_HISTORY_LIMIT};
use crate::engine::Machine;
use std::sync::Arc;

/// Builder for constructing a [`Machine`] with a fluent API.
///
/// The machine is returned uninitialized; call
/// [`Machine::initialize`] before injecting events.
pub struct MachineBuilder<M: Model> {
    tree: Option<Arc<StateTree<M>>>,
    context: Option<M::Context>,
    history_limit: usize,
}

impl<M: Model> MachineBuilder<M> {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            tree: None,
            context: None,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    /// Set the shared state tree (required).
    pub fn tree(mut self, tree: Arc<StateTree<M>>) -> Self {
        self.tree = Some(tree);
        self
    }

    /// Set the application context (required).
    pub fn context(mut self, context: M::Context) -> Self {
        self.context = Some(context);
        self
    }

    /// Keep at most `limit` transition records. Zero disables the history.
    pub fn history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Build the machine.
    /// Returns an error if required fields are missing.
    pub fn build(self) -> Result<Machine<M>, BuildError> {
        let tree = self.tree.ok_or(BuildError::MissingTree)?;
        let context = self.context.ok_or(BuildError::MissingContext)?;
        Ok(Machine::with_history_limit(tree, context, self.history_limit))
    }
}

impl<M: Model> Default for MachineBuilder<M> {
    fn default() -> Self {
        Self::new()
    }
}
