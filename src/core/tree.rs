//! The static state tree.
//!
//! A [`StateTree`] is built once by
//! [`StateTreeBuilder`](crate::builder::StateTreeBuilder) and never changes
//! afterwards. States live in an arena; parent links are slot indices used only
//! for walking ancestor chains. Looking up an identifier that was never
//! registered is a wiring bug and panics.

use super::state::{EventKind, Model, Response, StateId, StateKind, TransitionKind};
use crate::engine::HandlerContext;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// Entry or exit procedure run against the machine's context.
pub type Action<M> =
    Arc<dyn Fn(&mut <M as Model>::Context) -> Result<(), <M as Model>::Error> + Send + Sync>;

/// Event handler registered on a state for one event kind.
pub type Handler<M> = Arc<
    dyn Fn(&mut HandlerContext<'_, M>, &<M as Model>::Event) -> Result<Response, <M as Model>::Error>
        + Send
        + Sync,
>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum NodeKind {
    Composite { default_child: usize },
    Leaf,
}

pub(crate) struct Node<M: Model> {
    pub(crate) id: StateId,
    pub(crate) name: String,
    pub(crate) parent: Option<usize>,
    pub(crate) depth: usize,
    pub(crate) kind: NodeKind,
    pub(crate) entry: Option<Action<M>>,
    pub(crate) exit: Option<Action<M>>,
    pub(crate) handlers: HashMap<EventKind<M>, Handler<M>>,
}

impl<M: Model> Node<M> {
    pub(crate) fn state_kind(&self) -> StateKind {
        match self.kind {
            NodeKind::Composite { .. } => StateKind::Composite,
            NodeKind::Leaf => StateKind::Leaf,
        }
    }
}

/// Boundary and entry chain of one declared transition.
///
/// `boundary` is the state that is neither exited nor entered (`None` when the
/// transition reaches above the root). `entries` runs root-to-leaf from just
/// below the boundary down to the target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct TransitionPath {
    pub(crate) boundary: Option<usize>,
    pub(crate) entries: Vec<usize>,
}

type PathKey = (usize, usize, TransitionKind);

/// Immutable tree of states shared by every machine built from it.
pub struct StateTree<M: Model> {
    nodes: Vec<Node<M>>,
    index: HashMap<StateId, usize>,
    root: usize,
    paths: RwLock<HashMap<PathKey, Arc<TransitionPath>>>,
}

impl<M: Model> StateTree<M> {
    /// Start building a tree.
    pub fn builder() -> crate::builder::StateTreeBuilder<M> {
        crate::builder::StateTreeBuilder::new()
    }

    /// Assemble a tree from validated nodes. Slot 0 must be the root and every
    /// parent must precede its children.
    pub(crate) fn from_nodes(nodes: Vec<Node<M>>) -> Self {
        let index = nodes
            .iter()
            .enumerate()
            .map(|(slot, node)| (node.id, slot))
            .collect();
        Self {
            nodes,
            index,
            root: 0,
            paths: RwLock::new(HashMap::new()),
        }
    }

    /// The top state.
    pub fn root(&self) -> StateId {
        self.nodes[self.root].id
    }

    /// Number of registered states.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always `false`; a built tree has at least its root.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: StateId) -> bool {
        self.index.contains_key(&id)
    }

    /// All state identifiers, parents before children.
    pub fn states(&self) -> impl Iterator<Item = StateId> + '_ {
        self.nodes.iter().map(|node| node.id)
    }

    pub fn kind(&self, id: StateId) -> StateKind {
        self.node(self.slot(id)).state_kind()
    }

    pub fn name(&self, id: StateId) -> &str {
        &self.node(self.slot(id)).name
    }

    pub fn parent(&self, id: StateId) -> Option<StateId> {
        self.node(self.slot(id))
            .parent
            .map(|slot| self.nodes[slot].id)
    }

    /// The default child of a composite, `None` for a leaf.
    pub fn default_child(&self, id: StateId) -> Option<StateId> {
        match self.node(self.slot(id)).kind {
            NodeKind::Composite { default_child } => Some(self.nodes[default_child].id),
            NodeKind::Leaf => None,
        }
    }

    /// Distance from the root (the root has depth 0).
    pub fn depth(&self, id: StateId) -> usize {
        self.node(self.slot(id)).depth
    }

    /// Whether `id` declares a handler for `kind`.
    pub fn handles(&self, id: StateId, kind: EventKind<M>) -> bool {
        self.node(self.slot(id)).handlers.contains_key(&kind)
    }

    /// `id` itself, then each parent up to and including the root.
    ///
    /// This is the order in which events are offered to handlers.
    pub fn ancestors(&self, id: StateId) -> Ancestors<'_, M> {
        Ancestors {
            tree: self,
            next: Some(self.slot(id)),
        }
    }

    /// Whether `a` is a proper ancestor of `b`. A state is not its own ancestor.
    pub fn is_ancestor_of(&self, a: StateId, b: StateId) -> bool {
        self.is_ancestor_slot(self.slot(a), self.slot(b))
    }

    /// Deepest state that is `a` or one of its ancestors and also `b` or one of
    /// its ancestors.
    pub fn lca(&self, a: StateId, b: StateId) -> StateId {
        self.nodes[self.lca_slot(self.slot(a), self.slot(b))].id
    }

    /// Leaf reached from `id` by following default children.
    pub fn default_leaf(&self, id: StateId) -> StateId {
        let mut slot = self.slot(id);
        while let NodeKind::Composite { default_child } = self.nodes[slot].kind {
            slot = default_child;
        }
        self.nodes[slot].id
    }

    /// The state a transition neither exits nor enters, `None` when the
    /// transition reaches above the root.
    pub fn boundary(
        &self,
        source: StateId,
        target: StateId,
        kind: TransitionKind,
    ) -> Option<StateId> {
        self.path(self.slot(source), self.slot(target), kind)
            .boundary
            .map(|slot| self.nodes[slot].id)
    }

    /// States whose exit actions run, leaf-to-root, when `current` takes the
    /// transition `source -> target`.
    ///
    /// # Panics
    ///
    /// Panics if `source` is neither `current` nor one of its ancestors.
    pub fn exit_chain(
        &self,
        current: StateId,
        source: StateId,
        target: StateId,
        kind: TransitionKind,
    ) -> Vec<StateId> {
        let current_slot = self.slot(current);
        let source_slot = self.slot(source);
        self.assert_in_chain(current_slot, source_slot);
        let path = self.path(source_slot, self.slot(target), kind);
        self.exit_slots(current_slot, path.boundary)
            .map(|slot| self.nodes[slot].id)
            .collect()
    }

    /// States whose entry actions run, root-to-leaf, for `source -> target`,
    /// excluding the default-child cascade below a composite target.
    pub fn entry_chain(
        &self,
        source: StateId,
        target: StateId,
        kind: TransitionKind,
    ) -> Vec<StateId> {
        self.path(self.slot(source), self.slot(target), kind)
            .entries
            .iter()
            .map(|&slot| self.nodes[slot].id)
            .collect()
    }

    pub(crate) fn slot(&self, id: StateId) -> usize {
        match self.index.get(&id) {
            Some(&slot) => slot,
            None => panic!("state {id} is not registered in this state tree"),
        }
    }

    pub(crate) fn node(&self, slot: usize) -> &Node<M> {
        &self.nodes[slot]
    }

    pub(crate) fn root_slot(&self) -> usize {
        self.root
    }

    pub(crate) fn assert_in_chain(&self, current: usize, source: usize) {
        assert!(
            current == source || self.is_ancestor_slot(source, current),
            "transition source {} is not the current state {} or one of its ancestors",
            self.nodes[source].id,
            self.nodes[current].id,
        );
    }

    /// Slots from `current` upward, stopping below `boundary`.
    pub(crate) fn exit_slots(
        &self,
        current: usize,
        boundary: Option<usize>,
    ) -> impl Iterator<Item = usize> + '_ {
        std::iter::successors(Some(current), |&slot| self.nodes[slot].parent)
            .take_while(move |&slot| Some(slot) != boundary)
    }

    /// Cached boundary and entry chain for `(source, target, kind)`.
    pub(crate) fn path(
        &self,
        source: usize,
        target: usize,
        kind: TransitionKind,
    ) -> Arc<TransitionPath> {
        let key = (source, target, kind);
        let cached = self
            .paths
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned();
        if let Some(path) = cached {
            return path;
        }

        let computed = Arc::new(self.compute_path(source, target, kind));
        let mut paths = self.paths.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(paths.entry(key).or_insert(computed))
    }

    fn compute_path(&self, source: usize, target: usize, kind: TransitionKind) -> TransitionPath {
        let boundary = match kind {
            TransitionKind::Local if self.is_ancestor_slot(source, target) => Some(source),
            TransitionKind::Local if self.is_ancestor_slot(target, source) => Some(target),
            _ => self.common_proper_ancestor(source, target),
        };

        let mut entries: Vec<usize> =
            std::iter::successors(Some(target), |&slot| self.nodes[slot].parent)
                .take_while(|&slot| Some(slot) != boundary)
                .collect();
        entries.reverse();

        TransitionPath { boundary, entries }
    }

    /// Deepest state strictly above both `a` and `b`.
    fn common_proper_ancestor(&self, a: usize, b: usize) -> Option<usize> {
        match (self.nodes[a].parent, self.nodes[b].parent) {
            (Some(pa), Some(pb)) => Some(self.lca_slot(pa, pb)),
            _ => None,
        }
    }

    fn lca_slot(&self, mut a: usize, mut b: usize) -> usize {
        while self.nodes[a].depth > self.nodes[b].depth {
            a = self.parent_slot(a);
        }
        while self.nodes[b].depth > self.nodes[a].depth {
            b = self.parent_slot(b);
        }
        while a != b {
            a = self.parent_slot(a);
            b = self.parent_slot(b);
        }
        a
    }

    fn parent_slot(&self, slot: usize) -> usize {
        // Only called below depth 0, where a parent always exists.
        self.nodes[slot].parent.unwrap_or(self.root)
    }

    fn is_ancestor_slot(&self, ancestor: usize, slot: usize) -> bool {
        let target_depth = self.nodes[ancestor].depth;
        let mut cursor = slot;
        while self.nodes[cursor].depth > target_depth {
            cursor = self.parent_slot(cursor);
        }
        cursor == ancestor && slot != ancestor
    }
}

impl<M: Model> fmt::Debug for StateTree<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for node in &self.nodes {
            list.entry(&format_args!(
                "{} {:?} {:?} parent={:?}",
                node.id,
                node.name,
                node.state_kind(),
                node.parent.map(|slot| self.nodes[slot].id),
            ));
        }
        list.finish()
    }
}

/// Iterator over a state and its ancestors, leaf first.
pub struct Ancestors<'a, M: Model> {
    tree: &'a StateTree<M>,
    next: Option<usize>,
}

impl<M: Model> Iterator for Ancestors<'_, M> {
    type Item = StateId;

    fn next(&mut self) -> Option<StateId> {
        let slot = self.next?;
        let node = self.tree.node(slot);
        self.next = node.parent;
        Some(node.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::StateBuilder;
    use crate::core::Event;
    use std::convert::Infallible;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    struct Ping;

    impl Event for Ping {
        type Kind = Ping;
        fn kind(&self) -> Ping {
            Ping
        }
    }

    struct Shape;

    impl Model for Shape {
        type Context = ();
        type Event = Ping;
        type Error = Infallible;
    }

    const TOP: StateId = StateId::new(0);
    const IDLE: StateId = StateId::new(1);
    const ACTIVE: StateId = StateId::new(2);
    const RUNNING: StateId = StateId::new(3);
    const PAUSED: StateId = StateId::new(4);

    fn player() -> StateTree<Shape> {
        StateTree::builder()
            .state(StateBuilder::<Shape>::composite(TOP, IDLE).named("Top"))
            .state(
                StateBuilder::<Shape>::leaf(IDLE)
                    .named("Idle")
                    .parent(TOP)
                    .on(Ping, |_, _| Ok(Response::Handled)),
            )
            .state(StateBuilder::<Shape>::composite(ACTIVE, RUNNING).named("Active").parent(TOP))
            .state(StateBuilder::<Shape>::leaf(RUNNING).named("Running").parent(ACTIVE))
            .state(StateBuilder::<Shape>::leaf(PAUSED).named("Paused").parent(ACTIVE))
            .build()
            .unwrap()
    }

    #[test]
    fn queries_reflect_registration() {
        let tree = player();
        assert_eq!(tree.root(), TOP);
        assert_eq!(tree.len(), 5);
        assert_eq!(tree.kind(ACTIVE), StateKind::Composite);
        assert_eq!(tree.kind(PAUSED), StateKind::Leaf);
        assert_eq!(tree.name(RUNNING), "Running");
        assert_eq!(tree.parent(RUNNING), Some(ACTIVE));
        assert_eq!(tree.parent(TOP), None);
        assert_eq!(tree.default_child(ACTIVE), Some(RUNNING));
        assert_eq!(tree.default_child(IDLE), None);
        assert_eq!(tree.depth(PAUSED), 2);
        assert!(tree.handles(IDLE, Ping));
        assert!(!tree.handles(RUNNING, Ping));
    }

    #[test]
    fn ancestors_walk_leaf_to_root() {
        let tree = player();
        let chain: Vec<_> = tree.ancestors(PAUSED).collect();
        assert_eq!(chain, vec![PAUSED, ACTIVE, TOP]);
    }

    #[test]
    fn ancestor_relation_is_strict() {
        let tree = player();
        assert!(tree.is_ancestor_of(TOP, RUNNING));
        assert!(tree.is_ancestor_of(ACTIVE, RUNNING));
        assert!(!tree.is_ancestor_of(RUNNING, RUNNING));
        assert!(!tree.is_ancestor_of(IDLE, RUNNING));
        assert!(!tree.is_ancestor_of(RUNNING, ACTIVE));
    }

    #[test]
    fn lca_is_inclusive() {
        let tree = player();
        assert_eq!(tree.lca(RUNNING, PAUSED), ACTIVE);
        assert_eq!(tree.lca(IDLE, PAUSED), TOP);
        assert_eq!(tree.lca(ACTIVE, PAUSED), ACTIVE);
        assert_eq!(tree.lca(IDLE, IDLE), IDLE);
    }

    #[test]
    fn default_leaf_follows_default_children() {
        let tree = player();
        assert_eq!(tree.default_leaf(TOP), IDLE);
        assert_eq!(tree.default_leaf(ACTIVE), RUNNING);
        assert_eq!(tree.default_leaf(PAUSED), PAUSED);
    }

    #[test]
    fn sibling_transition_keeps_parent() {
        let tree = player();
        let kind = TransitionKind::External;
        assert_eq!(tree.boundary(RUNNING, PAUSED, kind), Some(ACTIVE));
        assert_eq!(tree.exit_chain(RUNNING, RUNNING, PAUSED, kind), vec![RUNNING]);
        assert_eq!(tree.entry_chain(RUNNING, PAUSED, kind), vec![PAUSED]);
    }

    #[test]
    fn cross_branch_transition_enters_composite() {
        let tree = player();
        let kind = TransitionKind::External;
        assert_eq!(tree.boundary(IDLE, RUNNING, kind), Some(TOP));
        assert_eq!(tree.exit_chain(IDLE, IDLE, RUNNING, kind), vec![IDLE]);
        assert_eq!(tree.entry_chain(IDLE, RUNNING, kind), vec![ACTIVE, RUNNING]);
    }

    #[test]
    fn self_transition_exits_and_enters_once() {
        let tree = player();
        let kind = TransitionKind::External;
        assert_eq!(tree.exit_chain(IDLE, IDLE, IDLE, kind), vec![IDLE]);
        assert_eq!(tree.entry_chain(IDLE, IDLE, kind), vec![IDLE]);
    }

    #[test]
    fn external_transition_into_descendant_reenters_source() {
        let tree = player();
        let kind = TransitionKind::External;
        assert_eq!(
            tree.exit_chain(PAUSED, ACTIVE, RUNNING, kind),
            vec![PAUSED, ACTIVE]
        );
        assert_eq!(tree.entry_chain(ACTIVE, RUNNING, kind), vec![ACTIVE, RUNNING]);
    }

    #[test]
    fn local_transition_into_descendant_keeps_source() {
        let tree = player();
        let kind = TransitionKind::Local;
        assert_eq!(tree.boundary(ACTIVE, RUNNING, kind), Some(ACTIVE));
        assert_eq!(tree.exit_chain(PAUSED, ACTIVE, RUNNING, kind), vec![PAUSED]);
        assert_eq!(tree.entry_chain(ACTIVE, RUNNING, kind), vec![RUNNING]);
    }

    #[test]
    fn local_transition_to_ancestor_enters_nothing_directly() {
        let tree = player();
        let kind = TransitionKind::Local;
        assert_eq!(tree.boundary(PAUSED, ACTIVE, kind), Some(ACTIVE));
        assert_eq!(tree.exit_chain(PAUSED, PAUSED, ACTIVE, kind), vec![PAUSED]);
        assert!(tree.entry_chain(PAUSED, ACTIVE, kind).is_empty());
    }

    #[test]
    fn transition_to_root_reaches_above_it() {
        let tree = player();
        let kind = TransitionKind::External;
        assert_eq!(tree.boundary(RUNNING, TOP, kind), None);
        assert_eq!(
            tree.exit_chain(RUNNING, RUNNING, TOP, kind),
            vec![RUNNING, ACTIVE, TOP]
        );
        assert_eq!(tree.entry_chain(RUNNING, TOP, kind), vec![TOP]);
    }

    #[test]
    fn paths_are_cached_per_pair() {
        let tree = player();
        let a = tree.path(tree.slot(IDLE), tree.slot(PAUSED), TransitionKind::External);
        let b = tree.path(tree.slot(IDLE), tree.slot(PAUSED), TransitionKind::External);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    #[should_panic(expected = "not registered")]
    fn unknown_state_panics() {
        let tree = player();
        tree.kind(StateId::new(99));
    }

    #[test]
    #[should_panic(expected = "not the current state")]
    fn exit_chain_rejects_unrelated_source() {
        let tree = player();
        tree.exit_chain(RUNNING, IDLE, PAUSED, TransitionKind::External);
    }
}
