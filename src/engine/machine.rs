//! The machine host: one running instance of a state tree.

use crate::builder::MachineBuilder;
use crate::core::{
    Event, Model, StateId, StateTree, TransitionHistory, TransitionKind, TransitionRecord,
    DEFAULT_HISTORY_LIMIT,
};
use crate::engine::dispatch::{dispatch, TransitionRequest};
use crate::engine::transition::{self, Settled};
use chrono::Utc;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// What happened to an injected event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dispatched {
    /// No state on the active chain handled the event.
    Ignored,

    /// Handled without a transition.
    Handled { by: StateId },

    /// Handled, and the declared transition settled on `to`.
    Transitioned {
        by: StateId,
        from: StateId,
        to: StateId,
    },
}

impl Dispatched {
    pub fn is_handled(&self) -> bool {
        !matches!(self, Self::Ignored)
    }
}

/// A running hierarchical state machine.
///
/// The machine owns the application context and shares its [`StateTree`]
/// with any other machine built from the same tree. It starts out
/// uninitialized; [`initialize`](Self::initialize) enters the root and its
/// default children, after which events can be injected.
///
/// # Example
///
/// ```rust
/// use hsm_engine::builder::StateBuilder;
/// use hsm_engine::core::{Event, Model, Response, StateId, StateTree};
/// use hsm_engine::engine::{Dispatched, Machine};
/// use std::convert::Infallible;
/// use std::sync::Arc;
///
/// #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// struct Toggle;
///
/// impl Event for Toggle {
///     type Kind = Toggle;
///     fn kind(&self) -> Toggle {
///         Toggle
///     }
/// }
///
/// struct Switch;
///
/// impl Model for Switch {
///     type Context = u32;
///     type Event = Toggle;
///     type Error = Infallible;
/// }
///
/// const TOP: StateId = StateId::new(0);
/// const OFF: StateId = StateId::new(1);
/// const ON: StateId = StateId::new(2);
///
/// let tree = StateTree::builder()
///     .state(StateBuilder::<Switch>::composite(TOP, OFF))
///     .state(StateBuilder::<Switch>::leaf(OFF).parent(TOP).on(Toggle, |cx, _| {
///         cx.transition(ON);
///         Ok(Response::Handled)
///     }))
///     .state(
///         StateBuilder::<Switch>::leaf(ON)
///             .parent(TOP)
///             .on_entry(|flips: &mut u32| {
///                 *flips += 1;
///                 Ok(())
///             })
///             .on(Toggle, |cx, _| {
///                 cx.transition(OFF);
///                 Ok(Response::Handled)
///             }),
///     )
///     .build()
///     .unwrap();
///
/// let mut machine = Machine::new(Arc::new(tree), 0);
/// machine.initialize().unwrap();
/// assert_eq!(machine.current_state_id(), OFF);
///
/// let outcome = machine.inject(&Toggle).unwrap();
/// assert_eq!(outcome, Dispatched::Transitioned { by: OFF, from: OFF, to: ON });
/// assert_eq!(*machine.context(), 1);
/// ```
pub struct Machine<M: Model> {
    tree: Arc<StateTree<M>>,
    context: M::Context,
    current: Option<StateId>,
    history: TransitionHistory,
    faulted: bool,
}

impl<M: Model> Machine<M> {
    pub fn new(tree: Arc<StateTree<M>>, context: M::Context) -> Self {
        Self::with_history_limit(tree, context, DEFAULT_HISTORY_LIMIT)
    }

    /// Create a machine that keeps at most `limit` transition records.
    pub fn with_history_limit(tree: Arc<StateTree<M>>, context: M::Context, limit: usize) -> Self {
        Self {
            tree,
            context,
            current: None,
            history: TransitionHistory::with_limit(limit),
            faulted: false,
        }
    }

    pub fn builder() -> MachineBuilder<M> {
        MachineBuilder::new()
    }

    /// Enter the root and its default children down to a leaf.
    ///
    /// Returns the leaf the machine settled on. If an entry action fails the
    /// machine stays uninitialized and is marked faulted.
    ///
    /// # Panics
    ///
    /// Panics if the machine is already initialized or faulted.
    pub fn initialize(&mut self) -> Result<StateId, M::Error> {
        if let Some(current) = self.current {
            panic!("machine is already initialized (current state {current})");
        }
        self.assert_not_faulted();

        let root = self.tree.root();
        let settled = match transition::initialize(&*self.tree, &mut self.context) {
            Ok(settled) => settled,
            Err(error) => {
                warn!(root = %self.tree.name(root), "entry action failed during initialization");
                self.faulted = true;
                return Err(error);
            }
        };

        debug!(state = %self.tree.name(settled.leaf), "machine initialized");
        let request = TransitionRequest {
            source: root,
            target: root,
            kind: TransitionKind::External,
        };
        Ok(self.commit(None, request, settled))
    }

    pub fn is_initialized(&self) -> bool {
        self.current.is_some()
    }

    /// Offer `event` to the current leaf and its ancestors.
    ///
    /// A handler failure is returned unchanged and the machine stays in its
    /// current state. An entry or exit failure during the resulting
    /// transition is returned unchanged as well, but the machine is then
    /// faulted: `current_state_id` still reports the last settled leaf even
    /// though some of its actions have run.
    ///
    /// # Panics
    ///
    /// Panics if the machine is not initialized or is faulted, and on any
    /// invalid transition request made by a handler.
    pub fn inject(&mut self, event: &M::Event) -> Result<Dispatched, M::Error> {
        self.assert_not_faulted();
        let current = self.current_state_id();

        let Some(handling) = dispatch(&*self.tree, &mut self.context, current, event)? else {
            return Ok(Dispatched::Ignored);
        };
        let Some(request) = handling.request else {
            return Ok(Dispatched::Handled { by: handling.by });
        };

        let settled = match transition::execute(&*self.tree, &mut self.context, current, request) {
            Ok(settled) => settled,
            Err(error) => {
                warn!(
                    source = %self.tree.name(request.source),
                    target = %self.tree.name(request.target),
                    kind = ?event.kind(),
                    "action failed during transition; machine faulted"
                );
                self.faulted = true;
                return Err(error);
            }
        };

        debug!(
            from = %self.tree.name(current),
            to = %self.tree.name(settled.leaf),
            by = %self.tree.name(handling.by),
            "transition settled"
        );
        let to = self.commit(Some(current), request, settled);
        Ok(Dispatched::Transitioned {
            by: handling.by,
            from: current,
            to,
        })
    }

    /// The current leaf.
    ///
    /// # Panics
    ///
    /// Panics if the machine has not been initialized.
    pub fn current_state_id(&self) -> StateId {
        match self.current {
            Some(current) => current,
            None => panic!("machine has not been initialized"),
        }
    }

    /// The current leaf, or `None` before initialization.
    pub fn current_state(&self) -> Option<StateId> {
        self.current
    }

    /// Whether `state` is the current leaf or one of its ancestors.
    pub fn is_in(&self, state: impl Into<StateId>) -> bool {
        let state = state.into();
        self.current.is_some_and(|current| {
            current == state || self.tree.is_ancestor_of(state, current)
        })
    }

    pub fn context(&self) -> &M::Context {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut M::Context {
        &mut self.context
    }

    pub fn into_context(self) -> M::Context {
        self.context
    }

    pub fn tree(&self) -> &Arc<StateTree<M>> {
        &self.tree
    }

    pub fn history(&self) -> &TransitionHistory {
        &self.history
    }

    /// Whether an entry or exit action failed partway through a transition.
    pub fn is_faulted(&self) -> bool {
        self.faulted
    }

    /// Accept the partially applied transition and resume injecting events.
    pub fn clear_fault(&mut self) {
        self.faulted = false;
    }

    fn assert_not_faulted(&self) {
        if self.faulted {
            panic!("machine is faulted; call clear_fault() before continuing");
        }
    }

    fn commit(
        &mut self,
        from: Option<StateId>,
        request: TransitionRequest,
        settled: Settled,
    ) -> StateId {
        let Settled {
            leaf,
            exited,
            entered,
        } = settled;
        self.current = Some(leaf);
        self.history.record(TransitionRecord {
            from,
            to: leaf,
            source: request.source,
            target: request.target,
            kind: request.kind,
            exited,
            entered,
            timestamp: Utc::now(),
        });
        leaf
    }
}

impl<M: Model> fmt::Debug for Machine<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Machine")
            .field("current", &self.current)
            .field("faulted", &self.faulted)
            .field("history", &self.history.len())
            .finish_non_exhaustive()
    }
}
