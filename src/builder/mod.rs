//! Builder API for ergonomic state tree and machine construction.
//!
//! This module provides fluent builders and macros for declaring states,
//! validating the resulting tree, and wiring machines to it.

pub mod error;
pub mod machine;
pub mod macros;
pub mod state;
pub mod tree;

pub use error::{BuildError, TreeError};
pub use machine::MachineBuilder;
pub use state::StateBuilder;
pub use tree::StateTreeBuilder;

use crate::core::{Model, StateId};

/// Declare a leaf that only exists to be current, with no actions or handlers.
///
/// # Example
///
/// ```
/// use hsm_engine::builder::{plain_leaf, StateBuilder, StateTreeBuilder};
/// use hsm_engine::core::{Event, Model, StateId};
/// use std::convert::Infallible;
///
/// #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// struct Tick;
/// impl Event for Tick {
///     type Kind = Tick;
///     fn kind(&self) -> Tick { Tick }
/// }
///
/// struct Clock;
/// impl Model for Clock {
///     type Context = ();
///     type Event = Tick;
///     type Error = Infallible;
/// }
///
/// let tree = StateTreeBuilder::<Clock>::new()
///     .state(StateBuilder::composite(0u32, 1u32))
///     .state(plain_leaf(1u32, 0u32))
///     .build()
///     .unwrap();
/// assert_eq!(tree.parent(StateId::new(1)), Some(StateId::new(0)));
/// ```
pub fn plain_leaf<M: Model>(id: impl Into<StateId>, parent: impl Into<StateId>) -> StateBuilder<M> {
    StateBuilder::leaf(id).parent(parent)
}

/// Declare a composite with a default child and no actions or handlers.
pub fn plain_composite<M: Model>(
    id: impl Into<StateId>,
    parent: impl Into<StateId>,
    default_child: impl Into<StateId>,
) -> StateBuilder<M> {
    StateBuilder::composite(id, default_child).parent(parent)
}
