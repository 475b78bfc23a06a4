//! Runtime: event dispatch, transition execution and the machine host.
//!
//! - `dispatch` walks the active chain from the current leaf to the root
//! - `transition` runs exit and entry actions for a declared transition
//! - `machine` owns the context and commits each settled leaf

mod dispatch;
mod machine;
mod transition;

pub use dispatch::HandlerContext;
pub use machine::{Dispatched, Machine};
