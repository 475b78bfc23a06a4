//! hsm-engine: hierarchical state machines with UML run-to-completion semantics
//!
//! States are arranged in a tree. Composite states name a default child, leaf
//! states are the only ones a machine can rest in. Events are offered to the
//! current leaf first and bubble towards the root until some state handles
//! them. A handler may declare one transition, which the engine executes by
//! exiting states up to the boundary and entering states down to the target,
//! then following default children until a leaf is reached.
//!
//! # Core Concepts
//!
//! - **Model**: ties together the application context, event and error types
//! - **State tree**: immutable, validated at build time, shareable across machines
//! - **Machine**: owns the context and the current leaf, runs each event to completion
//! - **History**: bounded record of every settled transition
//!
//! # Example
//!
//! ```rust
//! use hsm_engine::{state_ids, Event, Machine, Model, Response, StateBuilder, StateTree};
//! use std::sync::Arc;
//!
//! state_ids! {
//!     enum Door {
//!         Top,
//!         Closed,
//!         Open,
//!     }
//! }
//!
//! #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
//! enum Push {
//!     Open,
//!     Close,
//! }
//!
//! impl Event for Push {
//!     type Kind = Push;
//!     fn kind(&self) -> Push {
//!         *self
//!     }
//! }
//!
//! struct DoorModel;
//!
//! impl Model for DoorModel {
//!     type Context = Vec<String>;
//!     type Event = Push;
//!     type Error = String;
//! }
//!
//! let tree = StateTree::builder()
//!     .state(StateBuilder::<DoorModel>::composite(Door::Top, Door::Closed))
//!     .state(
//!         StateBuilder::<DoorModel>::leaf(Door::Closed)
//!             .parent(Door::Top)
//!             .on(Push::Open, |cx, _| {
//!                 cx.transition(Door::Open);
//!                 Ok(Response::Handled)
//!             }),
//!     )
//!     .state(
//!         StateBuilder::<DoorModel>::leaf(Door::Open)
//!             .parent(Door::Top)
//!             .on_entry(|log: &mut Vec<String>| {
//!                 log.push("creak".to_string());
//!                 Ok(())
//!             })
//!             .on(Push::Close, |cx, _| {
//!                 cx.transition(Door::Closed);
//!                 Ok(Response::Handled)
//!             }),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let mut machine = Machine::new(Arc::new(tree), Vec::new());
//! machine.initialize().unwrap();
//! machine.inject(&Push::Open).unwrap();
//!
//! assert_eq!(machine.current_state_id(), Door::Open.id());
//! assert_eq!(machine.context(), &vec!["creak".to_string()]);
//! ```

pub mod builder;
pub mod core;
pub mod engine;

// Re-export commonly used types
pub use crate::builder::{BuildError, MachineBuilder, StateBuilder, StateTreeBuilder, TreeError};
pub use crate::core::{
    Event, Model, Response, StateId, StateKind, StateTree, TransitionHistory, TransitionKind,
    TransitionRecord,
};
pub use crate::engine::{Dispatched, HandlerContext, Machine};
