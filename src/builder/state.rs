//! Builder for declaring a single state.

use crate::core::{Action, EventKind, Handler, Model, Response, StateId, StateKind};
use crate::engine::HandlerContext;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Declared {
    Composite { default_child: StateId },
    Leaf,
}

/// Declaration of one state: identity, place in the tree, actions and handlers.
///
/// # Example
///
/// ```
/// use hsm_engine::builder::StateBuilder;
/// use hsm_engine::core::{Event, Model, Response, StateId};
/// use std::convert::Infallible;
///
/// #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// enum Door { Open, Close }
///
/// impl Event for Door {
///     type Kind = Door;
///     fn kind(&self) -> Door { *self }
/// }
///
/// struct DoorModel;
///
/// impl Model for DoorModel {
///     type Context = Vec<&'static str>;
///     type Event = Door;
///     type Error = Infallible;
/// }
///
/// let closed = StateBuilder::<DoorModel>::leaf(StateId::new(2))
///     .named("Closed")
///     .parent(StateId::new(0))
///     .on_entry(|log: &mut Vec<&'static str>| {
///         log.push("closed");
///         Ok(())
///     })
///     .on(Door::Open, |cx, _| {
///         cx.transition(StateId::new(1));
///         Ok(Response::Handled)
///     });
///
/// assert_eq!(closed.id(), StateId::new(2));
/// ```
pub struct StateBuilder<M: Model> {
    pub(crate) id: StateId,
    pub(crate) name: Option<String>,
    pub(crate) parent: Option<StateId>,
    pub(crate) declared: Declared,
    pub(crate) entry: Option<Action<M>>,
    pub(crate) exit: Option<Action<M>>,
    pub(crate) handlers: Vec<(EventKind<M>, Handler<M>)>,
}

impl<M: Model> StateBuilder<M> {
    fn new(id: StateId, declared: Declared) -> Self {
        Self {
            id,
            name: None,
            parent: None,
            declared,
            entry: None,
            exit: None,
            handlers: Vec::new(),
        }
    }

    /// Declare a composite state entered through `default_child`.
    pub fn composite(id: impl Into<StateId>, default_child: impl Into<StateId>) -> Self {
        Self::new(
            id.into(),
            Declared::Composite {
                default_child: default_child.into(),
            },
        )
    }

    /// Declare a leaf state.
    pub fn leaf(id: impl Into<StateId>) -> Self {
        Self::new(id.into(), Declared::Leaf)
    }

    /// Set a display name used in logs. Defaults to the identifier.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the parent state. Exactly one state in a tree has none.
    pub fn parent(mut self, parent: impl Into<StateId>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Set the entry action.
    pub fn on_entry<F>(mut self, action: F) -> Self
    where
        F: Fn(&mut M::Context) -> Result<(), M::Error> + Send + Sync + 'static,
    {
        let action: Action<M> = Arc::new(action);
        self.entry = Some(action);
        self
    }

    /// Set the exit action.
    pub fn on_exit<F>(mut self, action: F) -> Self
    where
        F: Fn(&mut M::Context) -> Result<(), M::Error> + Send + Sync + 'static,
    {
        let action: Action<M> = Arc::new(action);
        self.exit = Some(action);
        self
    }

    /// Register a handler for one event kind.
    ///
    /// Returning [`Response::Unhandled`] passes the event on to the parent.
    pub fn on<F>(mut self, kind: EventKind<M>, handler: F) -> Self
    where
        F: Fn(&mut HandlerContext<'_, M>, &M::Event) -> Result<Response, M::Error>
            + Send
            + Sync
            + 'static,
    {
        let handler: Handler<M> = Arc::new(handler);
        self.handlers.push((kind, handler));
        self
    }

    pub fn id(&self) -> StateId {
        self.id
    }

    pub fn kind(&self) -> StateKind {
        match self.declared {
            Declared::Composite { .. } => StateKind::Composite,
            Declared::Leaf => StateKind::Leaf,
        }
    }
}
