//! Builder for constructing validated state trees.
//!
//! Validation does not stop at the first problem. Every check produces a
//! `Validation` and the results are combined, so a mis-wired tree reports all
//! of its problems in one [`BuildError::InvalidTree`].

use crate::builder::error::{BuildError, TreeError};
use crate::builder::state::{Declared, StateBuilder};
use crate::core::{Model, Node, NodeKind, StateId, StateTree};
use std::collections::{HashMap, HashSet, VecDeque};
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

type Check = Validation<(), NonEmptyVec<TreeError>>;

/// Builder for constructing a [`StateTree`] with a fluent API.
///
/// # Example
///
/// ```
/// use hsm_engine::builder::{StateBuilder, StateTreeBuilder};
/// use hsm_engine::core::{Event, Model, StateId, StateKind};
/// use std::convert::Infallible;
///
/// #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// struct Tick;
///
/// impl Event for Tick {
///     type Kind = Tick;
///     fn kind(&self) -> Tick { Tick }
/// }
///
/// struct Clock;
///
/// impl Model for Clock {
///     type Context = ();
///     type Event = Tick;
///     type Error = Infallible;
/// }
///
/// let top = StateId::new(0);
/// let on = StateId::new(1);
///
/// let tree = StateTreeBuilder::<Clock>::new()
///     .state(StateBuilder::composite(top, on))
///     .state(StateBuilder::leaf(on).parent(top))
///     .build()
///     .unwrap();
///
/// assert_eq!(tree.root(), top);
/// assert_eq!(tree.kind(on), StateKind::Leaf);
/// ```
pub struct StateTreeBuilder<M: Model> {
    states: Vec<StateBuilder<M>>,
}

impl<M: Model> StateTreeBuilder<M> {
    /// Create a new builder.
    pub fn new() -> Self {
        Self { states: Vec::new() }
    }

    /// Declare a state.
    pub fn state(mut self, state: StateBuilder<M>) -> Self {
        self.states.push(state);
        self
    }

    /// Declare several states at once.
    pub fn states(mut self, states: impl IntoIterator<Item = StateBuilder<M>>) -> Self {
        self.states.extend(states);
        self
    }

    /// Validate the declarations and build the tree.
    ///
    /// Returns [`BuildError::InvalidTree`] listing every problem found.
    pub fn build(self) -> Result<StateTree<M>, BuildError> {
        match validate(&self.states) {
            Validation::Success(_) => Ok(assemble(self.states)),
            Validation::Failure(errors) => Err(BuildError::InvalidTree {
                errors: errors.iter().cloned().collect(),
            }),
        }
    }
}

impl<M: Model> Default for StateTreeBuilder<M> {
    fn default() -> Self {
        Self::new()
    }
}

fn validate<M: Model>(states: &[StateBuilder<M>]) -> Check {
    if states.is_empty() {
        return Validation::fail(TreeError::EmptyTree);
    }

    // First declaration of each id wins for the structural checks.
    let mut declared: HashMap<StateId, &StateBuilder<M>> = HashMap::new();
    let mut checks: Vec<Check> = Vec::new();
    for state in states {
        if declared.contains_key(&state.id) {
            checks.push(Validation::fail(TreeError::DuplicateState { id: state.id }));
        } else {
            declared.insert(state.id, state);
        }
    }

    checks.push(check_root(states));
    for state in states {
        checks.push(check_parent(state, &declared));
        checks.push(check_default_child(state, &declared));
        checks.push(check_handlers(state));
    }
    checks.extend(check_cycles(&declared));

    Validation::all_vec(checks).map(|_| ())
}

fn check_root<M: Model>(states: &[StateBuilder<M>]) -> Check {
    let roots: Vec<StateId> = states
        .iter()
        .filter(|state| state.parent.is_none())
        .map(|state| state.id)
        .collect();

    match roots.len() {
        0 => Validation::fail(TreeError::MissingRoot),
        1 => Validation::success(()),
        _ => Validation::fail(TreeError::MultipleRoots { roots }),
    }
}

fn check_parent<M: Model>(
    state: &StateBuilder<M>,
    declared: &HashMap<StateId, &StateBuilder<M>>,
) -> Check {
    let Some(parent) = state.parent else {
        return Validation::success(());
    };

    match declared.get(&parent) {
        None => Validation::fail(TreeError::UnknownParent {
            state: state.id,
            parent,
        }),
        Some(found) if found.declared == Declared::Leaf => {
            Validation::fail(TreeError::LeafParent {
                state: state.id,
                parent,
            })
        }
        Some(_) => Validation::success(()),
    }
}

fn check_default_child<M: Model>(
    state: &StateBuilder<M>,
    declared: &HashMap<StateId, &StateBuilder<M>>,
) -> Check {
    let Declared::Composite { default_child } = state.declared else {
        return Validation::success(());
    };

    match declared.get(&default_child) {
        None => Validation::fail(TreeError::UnknownDefaultChild {
            state: state.id,
            child: default_child,
        }),
        Some(child) if child.parent != Some(state.id) => {
            Validation::fail(TreeError::DefaultChildNotChild {
                state: state.id,
                child: default_child,
            })
        }
        Some(_) => Validation::success(()),
    }
}

fn check_handlers<M: Model>(state: &StateBuilder<M>) -> Check {
    let mut seen = HashSet::new();
    let checks: Vec<Check> = state
        .handlers
        .iter()
        .filter(|(kind, _)| !seen.insert(*kind))
        .map(|(kind, _)| {
            Validation::fail(TreeError::DuplicateHandler {
                state: state.id,
                kind: format!("{kind:?}"),
            })
        })
        .collect();

    Validation::all_vec(checks).map(|_| ())
}

/// One error per state whose parent chain loops back on itself.
fn check_cycles<M: Model>(declared: &HashMap<StateId, &StateBuilder<M>>) -> Vec<Check> {
    let mut ids: Vec<StateId> = declared.keys().copied().collect();
    ids.sort();

    ids.into_iter()
        .filter(|&id| on_cycle(id, declared))
        .map(|state| Validation::fail(TreeError::Cycle { state }))
        .collect()
}

fn on_cycle<M: Model>(start: StateId, declared: &HashMap<StateId, &StateBuilder<M>>) -> bool {
    let mut cursor = declared.get(&start).and_then(|state| state.parent);
    for _ in 0..declared.len() {
        match cursor {
            Some(id) if id == start => return true,
            Some(id) => cursor = declared.get(&id).and_then(|state| state.parent),
            None => return false,
        }
    }
    false
}

/// Lay out validated declarations breadth-first from the root.
fn assemble<M: Model>(states: Vec<StateBuilder<M>>) -> StateTree<M> {
    let mut children: HashMap<StateId, Vec<StateId>> = HashMap::new();
    let mut root = None;
    for state in &states {
        match state.parent {
            Some(parent) => children.entry(parent).or_default().push(state.id),
            None => root = Some(state.id),
        }
    }

    let mut order: Vec<(StateId, Option<usize>, usize)> = Vec::with_capacity(states.len());
    let mut queue: VecDeque<(StateId, Option<usize>, usize)> = root
        .map(|id| (id, None, 0))
        .into_iter()
        .collect();
    while let Some((id, parent, depth)) = queue.pop_front() {
        let slot = order.len();
        order.push((id, parent, depth));
        for &child in children.get(&id).into_iter().flatten() {
            queue.push_back((child, Some(slot), depth + 1));
        }
    }

    let slots: HashMap<StateId, usize> = order
        .iter()
        .enumerate()
        .map(|(slot, (id, _, _))| (*id, slot))
        .collect();
    let mut by_id: HashMap<StateId, StateBuilder<M>> =
        states.into_iter().map(|state| (state.id, state)).collect();

    let nodes = order
        .into_iter()
        .filter_map(|(id, parent, depth)| {
            let state = by_id.remove(&id)?;
            let kind = match state.declared {
                Declared::Composite { default_child } => NodeKind::Composite {
                    default_child: slots[&default_child],
                },
                Declared::Leaf => NodeKind::Leaf,
            };
            Some(Node {
                id,
                name: state.name.unwrap_or_else(|| id.to_string()),
                parent,
                depth,
                kind,
                entry: state.entry,
                exit: state.exit,
                handlers: state.handlers.into_iter().collect(),
            })
        })
        .collect();

    StateTree::from_nodes(nodes)
}
