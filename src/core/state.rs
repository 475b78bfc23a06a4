//! State identifiers, kinds, and the `Model` trait binding a machine together.
//!
//! Everything in this module is plain data. Behavior attached to states lives
//! in the [`StateTree`](crate::core::StateTree); the host that moves between
//! states lives in [`engine`](crate::engine).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;

/// Identifier of a state, unique within one state tree.
///
/// # Example
///
/// ```rust
/// use hsm_engine::core::StateId;
///
/// let idle = StateId::new(1);
/// assert_eq!(idle.get(), 1);
/// assert_eq!(idle.to_string(), "1");
/// assert_eq!(StateId::from(1), idle);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateId(u32);

impl StateId {
    /// Wrap a raw identifier.
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw identifier.
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl From<u32> for StateId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether a state groups other states or can be current.
///
/// Only leaves are ever the current state of a machine. Composites exist for
/// shared entry/exit behavior and shared event handling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StateKind {
    /// Grouping state with a default child.
    Composite,
    /// State that can be current.
    Leaf,
}

impl StateKind {
    pub fn is_leaf(self) -> bool {
        matches!(self, Self::Leaf)
    }

    pub fn is_composite(self) -> bool {
        matches!(self, Self::Composite)
    }
}

/// How the transition boundary is chosen when source and target are nested.
///
/// The two kinds only differ when one of source and target contains the
/// other. For siblings, cousins, and self-transitions they behave the same.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransitionKind {
    /// The containing state is exited and re-entered.
    #[default]
    External,
    /// The containing state stays active; only its inside is exited/entered.
    Local,
}

/// An event injected into a machine.
///
/// Handlers are registered per [`Event::Kind`], so payload-carrying events can
/// share one handler.
///
/// # Example
///
/// ```rust
/// use hsm_engine::core::Event;
///
/// #[derive(Debug)]
/// enum PlayerEvent {
///     Start,
///     Seek(u64),
/// }
///
/// #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// enum PlayerEventKind {
///     Start,
///     Seek,
/// }
///
/// impl Event for PlayerEvent {
///     type Kind = PlayerEventKind;
///
///     fn kind(&self) -> PlayerEventKind {
///         match self {
///             Self::Start => PlayerEventKind::Start,
///             Self::Seek(_) => PlayerEventKind::Seek,
///         }
///     }
/// }
///
/// assert_eq!(PlayerEvent::Seek(30).kind(), PlayerEventKind::Seek);
/// ```
pub trait Event {
    /// Key used to look up a state's handler.
    type Kind: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static;

    fn kind(&self) -> Self::Kind;
}

/// Binds the types one family of machines works with.
///
/// A model is usually a zero-sized marker type:
///
/// ```rust
/// use hsm_engine::core::{Event, Model};
/// use std::convert::Infallible;
///
/// #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// struct Tick;
///
/// impl Event for Tick {
///     type Kind = Tick;
///     fn kind(&self) -> Tick {
///         Tick
///     }
/// }
///
/// struct Counter;
///
/// impl Model for Counter {
///     type Context = u64;
///     type Event = Tick;
///     type Error = Infallible;
/// }
/// ```
pub trait Model: 'static {
    /// Application data owned by the machine and handed to every action.
    type Context;
    /// Events accepted by the machine.
    type Event: Event;
    /// Failure type of entry, exit and handler procedures.
    type Error;
}

/// Shorthand for the handler key of a model's events.
pub type EventKind<M> = <<M as Model>::Event as Event>::Kind;

/// What a handler did with an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Response {
    /// Not handled here; the event falls through to the parent state.
    Unhandled,
    /// Handled here; dispatch stops.
    Handled,
}
