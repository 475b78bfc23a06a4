//! Build errors for state trees and machines.

use crate::core::StateId;
use thiserror::Error;

/// Errors that can occur when building state trees and machines.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("Invalid state tree ({} problem(s)): {}", .errors.len(), summarize(.errors))]
    InvalidTree { errors: Vec<TreeError> },

    #[error("State tree not specified. Call .tree(tree) before .build()")]
    MissingTree,

    #[error("Machine context not specified. Call .context(value) before .build()")]
    MissingContext,
}

impl BuildError {
    /// The individual tree problems, empty for other variants.
    pub fn tree_errors(&self) -> &[TreeError] {
        match self {
            Self::InvalidTree { errors } => errors,
            _ => &[],
        }
    }
}

/// A single problem found while validating a state tree.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("No states declared. Add at least a root state")]
    EmptyTree,

    #[error("State {id} is declared more than once")]
    DuplicateState { id: StateId },

    #[error("No root state. Exactly one state must have no parent")]
    MissingRoot,

    #[error("Multiple root states {roots:?}. Exactly one state may have no parent")]
    MultipleRoots { roots: Vec<StateId> },

    #[error("State {state} names unknown parent {parent}")]
    UnknownParent { state: StateId, parent: StateId },

    #[error("State {state} names leaf {parent} as its parent. Only composites have children")]
    LeafParent { state: StateId, parent: StateId },

    #[error("Composite {state} names unknown default child {child}")]
    UnknownDefaultChild { state: StateId, child: StateId },

    #[error("Composite {state} names {child} as default child, but it is not a direct child")]
    DefaultChildNotChild { state: StateId, child: StateId },

    #[error("State {state} is part of a parent cycle")]
    Cycle { state: StateId },

    #[error("State {state} registers more than one handler for event kind {kind}")]
    DuplicateHandler { state: StateId, kind: String },
}

fn summarize(errors: &[TreeError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_tree_lists_every_problem() {
        let error = BuildError::InvalidTree {
            errors: vec![
                TreeError::MissingRoot,
                TreeError::Cycle {
                    state: StateId::new(2),
                },
            ],
        };

        let message = error.to_string();
        assert!(message.contains("2 problem(s)"));
        assert!(message.contains("No root state"));
        assert!(message.contains("State 2 is part of a parent cycle"));
        assert_eq!(error.tree_errors().len(), 2);
    }

    #[test]
    fn machine_errors_have_no_tree_errors() {
        assert!(BuildError::MissingTree.tree_errors().is_empty());
    }
}
