//! Property-based tests for tree queries and transition execution.
//!
//! These tests use proptest to build random state trees, drive machines
//! through random transitions and compare every exit and entry against a
//! straightforward model of the tree.

use hsm_engine::builder::{StateBuilder, StateTreeBuilder};
use hsm_engine::core::{Event, Model, Response, StateId, StateTree, TransitionHistory};
use hsm_engine::engine::{Dispatched, HandlerContext, Machine};
use proptest::prelude::*;
use proptest::sample::Index;
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Step {
    Entry(u32),
    Exit(u32),
}

/// Transition declared by whichever active state sits `up` levels above the
/// current leaf.
#[derive(Clone, Copy, Debug)]
struct Go {
    up: usize,
    target: u32,
    local: bool,
}

impl Event for Go {
    type Kind = ();
    fn kind(&self) {}
}

struct Random;

impl Model for Random {
    type Context = Vec<Step>;
    type Event = Go;
    type Error = Infallible;
}

/// Parent links of a generated tree; state `i` has id `i`, state 0 is the root.
#[derive(Clone, Debug)]
struct Shape {
    parents: Vec<Option<usize>>,
    children: Vec<Vec<usize>>,
}

impl Shape {
    fn new(parents: Vec<Option<usize>>) -> Self {
        let mut children = vec![Vec::new(); parents.len()];
        for (state, parent) in parents.iter().enumerate() {
            if let Some(parent) = parent {
                children[*parent].push(state);
            }
        }
        Self { parents, children }
    }

    fn len(&self) -> usize {
        self.parents.len()
    }

    fn is_leaf(&self, state: usize) -> bool {
        self.children[state].is_empty()
    }

    /// `state` first, root last.
    fn chain(&self, state: usize) -> Vec<usize> {
        std::iter::successors(Some(state), |&s| self.parents[s]).collect()
    }

    fn is_proper_ancestor(&self, ancestor: usize, state: usize) -> bool {
        ancestor != state && self.chain(state).contains(&ancestor)
    }

    fn lca(&self, a: usize, b: usize) -> usize {
        let above_b = self.chain(b);
        self.chain(a)
            .into_iter()
            .find(|state| above_b.contains(state))
            .unwrap_or(0)
    }

    fn boundary(&self, source: usize, target: usize, local: bool) -> Option<usize> {
        if local && self.is_proper_ancestor(source, target) {
            return Some(source);
        }
        if local && self.is_proper_ancestor(target, source) {
            return Some(target);
        }
        match (self.parents[source], self.parents[target]) {
            (Some(a), Some(b)) => Some(self.lca(a, b)),
            _ => None,
        }
    }

    /// Exits, entries and the settled leaf for one transition.
    fn expect(
        &self,
        current: usize,
        source: usize,
        target: usize,
        local: bool,
    ) -> (Vec<Step>, usize) {
        let boundary = self.boundary(source, target, local);
        let mut steps: Vec<Step> = self
            .chain(current)
            .into_iter()
            .take_while(|&s| Some(s) != boundary)
            .map(|s| Step::Exit(s as u32))
            .collect();

        let mut entries: Vec<usize> = self
            .chain(target)
            .into_iter()
            .take_while(|&s| Some(s) != boundary)
            .collect();
        entries.reverse();
        let mut leaf = target;
        while !self.is_leaf(leaf) {
            leaf = self.children[leaf][0];
            entries.push(leaf);
        }

        steps.extend(entries.into_iter().map(|s| Step::Entry(s as u32)));
        (steps, leaf)
    }

    fn build(&self) -> StateTree<Random> {
        let mut builder = StateTreeBuilder::<Random>::new();
        for state in 0..self.len() {
            let id = state as u32;
            let declared = if self.is_leaf(state) {
                StateBuilder::<Random>::leaf(id)
            } else {
                StateBuilder::<Random>::composite(id, self.children[state][0] as u32)
            };
            let declared = match self.parents[state] {
                Some(parent) => declared.parent(parent as u32),
                None => declared,
            };
            builder = builder.state(
                declared
                    .on_entry(move |log: &mut Vec<Step>| {
                        log.push(Step::Entry(id));
                        Ok(())
                    })
                    .on_exit(move |log: &mut Vec<Step>| {
                        log.push(Step::Exit(id));
                        Ok(())
                    })
                    .on((), route),
            );
        }
        builder.build().unwrap()
    }
}

fn route(cx: &mut HandlerContext<'_, Random>, event: &Go) -> Result<Response, Infallible> {
    let current_depth = cx.tree().depth(cx.current());
    let source_depth = current_depth - event.up % (current_depth + 1);
    if cx.tree().depth(cx.state()) != source_depth {
        return Ok(Response::Unhandled);
    }
    if event.local {
        cx.local_transition(event.target);
    } else {
        cx.transition(event.target);
    }
    Ok(Response::Handled)
}

prop_compose! {
    fn arbitrary_shape()(picks in prop::collection::vec(any::<Index>(), 0..12)) -> Shape {
        let mut parents = vec![None];
        for (offset, pick) in picks.iter().enumerate() {
            parents.push(Some(pick.index(offset + 1)));
        }
        Shape::new(parents)
    }
}

prop_compose! {
    fn arbitrary_go()(up in 0usize..16, target in any::<Index>(), local in any::<bool>()) -> (usize, Index, bool) {
        (up, target, local)
    }
}

fn active_counts(log: &[Step]) -> HashMap<u32, i64> {
    let mut counts = HashMap::new();
    for step in log {
        match step {
            Step::Entry(id) => *counts.entry(*id).or_insert(0) += 1,
            Step::Exit(id) => *counts.entry(*id).or_insert(0) -= 1,
        }
    }
    counts
}

proptest! {
    #[test]
    fn lca_matches_model(shape in arbitrary_shape(), a in any::<Index>(), b in any::<Index>()) {
        let tree = shape.build();
        let (a, b) = (a.index(shape.len()), b.index(shape.len()));
        let lca = tree.lca(StateId::new(a as u32), StateId::new(b as u32));

        prop_assert_eq!(lca, StateId::new(shape.lca(a, b) as u32));
        prop_assert_eq!(
            tree.lca(StateId::new(b as u32), StateId::new(a as u32)),
            lca
        );
    }

    #[test]
    fn ancestry_is_antisymmetric(shape in arbitrary_shape(), a in any::<Index>(), b in any::<Index>()) {
        let tree = shape.build();
        let a = StateId::new(a.index(shape.len()) as u32);
        let b = StateId::new(b.index(shape.len()) as u32);

        prop_assert!(!(tree.is_ancestor_of(a, b) && tree.is_ancestor_of(b, a)));
        prop_assert!(!tree.is_ancestor_of(a, a));
    }

    #[test]
    fn ancestors_end_at_root(shape in arbitrary_shape(), state in any::<Index>()) {
        let tree = shape.build();
        let state = state.index(shape.len());
        let ancestors: Vec<StateId> = tree.ancestors(StateId::new(state as u32)).collect();

        prop_assert_eq!(ancestors.len(), shape.chain(state).len());
        prop_assert_eq!(ancestors.last().copied(), Some(tree.root()));
    }

    #[test]
    fn transitions_follow_model(
        shape in arbitrary_shape(),
        moves in prop::collection::vec(arbitrary_go(), 1..24),
    ) {
        let tree = Arc::new(shape.build());
        let mut machine = Machine::new(tree, Vec::new());
        let leaf = machine.initialize().unwrap();

        let mut expected_leaf = 0;
        while !shape.is_leaf(expected_leaf) {
            expected_leaf = shape.children[expected_leaf][0];
        }
        prop_assert_eq!(leaf, StateId::new(expected_leaf as u32));

        for (up, target, local) in moves {
            let current = machine.current_state_id().get() as usize;
            let chain = shape.chain(current);
            let source = chain[up % chain.len()];
            let target = target.index(shape.len());
            let (steps, leaf) = shape.expect(current, source, target, local);

            let before = machine.context().len();
            let outcome = machine
                .inject(&Go { up, target: target as u32, local })
                .unwrap();

            prop_assert_eq!(
                outcome,
                Dispatched::Transitioned {
                    by: StateId::new(source as u32),
                    from: StateId::new(current as u32),
                    to: StateId::new(leaf as u32),
                }
            );
            prop_assert_eq!(&machine.context()[before..], steps.as_slice());
            prop_assert!(shape.is_leaf(machine.current_state_id().get() as usize));
        }
    }

    #[test]
    fn entries_and_exits_balance(
        shape in arbitrary_shape(),
        moves in prop::collection::vec(arbitrary_go(), 0..24),
    ) {
        let tree = Arc::new(shape.build());
        let mut machine = Machine::new(tree, Vec::new());
        machine.initialize().unwrap();

        for (up, target, local) in moves {
            let target = target.index(shape.len()) as u32;
            machine.inject(&Go { up, target, local }).unwrap();
        }

        let current = machine.current_state_id().get() as usize;
        let active = shape.chain(current);
        for (state, count) in active_counts(machine.context()) {
            let expected = i64::from(active.contains(&(state as usize)));
            prop_assert_eq!(count, expected, "state {} has unbalanced actions", state);
        }
    }

    #[test]
    fn history_path_ends_at_current(
        shape in arbitrary_shape(),
        moves in prop::collection::vec(arbitrary_go(), 0..12),
    ) {
        let tree = Arc::new(shape.build());
        let mut machine = Machine::new(tree, Vec::new());
        machine.initialize().unwrap();

        for (up, target, local) in &moves {
            let target = target.index(shape.len()) as u32;
            machine.inject(&Go { up: *up, target, local: *local }).unwrap();
        }

        let history = machine.history();
        prop_assert_eq!(history.len(), moves.len() + 1);
        prop_assert!(history.transitions().next().unwrap().is_initial());
        prop_assert_eq!(history.get_path().last().copied(), machine.current_state());

        let json = serde_json::to_string(history).unwrap();
        let restored: TransitionHistory = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(restored.get_path(), history.get_path());
    }
}
