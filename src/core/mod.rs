//! Core hierarchical state machine types.
//!
//! This module contains the pure data model of the engine:
//! - State identifiers, kinds and the `Model` trait
//! - The immutable state tree with ancestor and LCA queries
//! - Bounded history of settled transitions
//!
//! Nothing here runs application code. Entry, exit and handler procedures are
//! stored in the tree but only invoked by [`engine`](crate::engine).

mod history;
mod state;
mod tree;

pub use history::{TransitionHistory, TransitionRecord, DEFAULT_HISTORY_LIMIT};
pub use state::{Event, EventKind, Model, Response, StateId, StateKind, TransitionKind};
pub use tree::{Action, Ancestors, Handler, StateTree};

pub(crate) use tree::{Node, NodeKind, TransitionPath};
