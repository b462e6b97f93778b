//! Compilation of a validated element tree into a deterministic execution
//! graph, and path search against a live dependency graph.
//!
//! Positions are assigned Glushkov-style: every item-set and dependency-set
//! occurrence becomes a position; `first`/`last`/`follow` sets over the
//! tree yield an automaton whose states are item positions and whose
//! transitions are keyed by the dependency position just traversed. The
//! compiled automaton is immutable and safe to share across threads.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::Serialize;
use tracing::debug;

use crate::graph::DependencyGraph;
use crate::matching::{DependencyMatch, ItemMatch};
use crate::types::{DepId, ItemId};

use super::ast::{Element, SetMatcher};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum Pos {
    Item(usize),
    Dep(usize),
}

#[derive(Default)]
struct Builder {
    item_sets: Vec<SetMatcher<ItemMatch>>,
    dep_sets: Vec<SetMatcher<DependencyMatch>>,
    follow: HashMap<Pos, BTreeSet<Pos>>,
}

struct Shape {
    first: BTreeSet<Pos>,
    last: BTreeSet<Pos>,
    empty: bool,
}

impl Builder {
    fn link(&mut self, from: &BTreeSet<Pos>, to: &BTreeSet<Pos>) {
        for &f in from {
            self.follow.entry(f).or_default().extend(to.iter().copied());
        }
    }

    fn build(&mut self, element: &Element) -> Shape {
        match element {
            Element::ItemSet(set) => {
                let pos = Pos::Item(self.item_sets.len());
                self.item_sets.push(set.clone());
                Shape {
                    first: BTreeSet::from([pos]),
                    last: BTreeSet::from([pos]),
                    empty: false,
                }
            }
            Element::DepSet(set) => {
                let pos = Pos::Dep(self.dep_sets.len());
                self.dep_sets.push(set.clone());
                Shape {
                    first: BTreeSet::from([pos]),
                    last: BTreeSet::from([pos]),
                    empty: false,
                }
            }
            Element::Sequence(children) => {
                let mut first = BTreeSet::new();
                let mut last: BTreeSet<Pos> = BTreeSet::new();
                let mut empty = true;
                for child in children {
                    let shape = self.build(child);
                    self.link(&last, &shape.first);
                    if empty {
                        first.extend(shape.first.iter().copied());
                    }
                    if shape.empty {
                        last.extend(shape.last.iter().copied());
                    } else {
                        last = shape.last;
                    }
                    empty = empty && shape.empty;
                }
                Shape { first, last, empty }
            }
            Element::Optional(inner) => {
                let shape = self.build(inner);
                Shape {
                    empty: true,
                    ..shape
                }
            }
            Element::ZeroOrMore(inner) => {
                let shape = self.build(inner);
                let last = shape.last.clone();
                self.link(&last, &shape.first);
                Shape {
                    empty: true,
                    ..shape
                }
            }
            Element::OneOrMore(inner) => {
                let shape = self.build(inner);
                let last = shape.last.clone();
                self.link(&last, &shape.first);
                shape
            }
        }
    }
}

/// One concrete path accepted by a [`PathRegex`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct PathMatch {
    pub items: Vec<ItemId>,
    pub deps: Vec<DepId>,
}

/// A compiled path pattern: the deterministic execution graph.
#[derive(Debug)]
pub struct PathRegex {
    source: String,
    item_sets: Vec<SetMatcher<ItemMatch>>,
    dep_sets: Vec<SetMatcher<DependencyMatch>>,
    starts: Vec<usize>,
    accepts: BTreeSet<usize>,
    /// Per item state: (dependency position, successor item states).
    transitions: Vec<Vec<(usize, Vec<usize>)>>,
}

/// Build the execution graph from a validated element tree.
pub(crate) fn build_automaton(source: &str, root: &Element) -> PathRegex {
    let mut builder = Builder::default();
    let shape = builder.build(root);

    // Validation guarantees first/last contain only item positions.
    let starts: Vec<usize> = shape
        .first
        .iter()
        .filter_map(|p| match p {
            Pos::Item(i) => Some(*i),
            Pos::Dep(_) => None,
        })
        .collect();
    let accepts: BTreeSet<usize> = shape
        .last
        .iter()
        .filter_map(|p| match p {
            Pos::Item(i) => Some(*i),
            Pos::Dep(_) => None,
        })
        .collect();

    let mut transitions: Vec<Vec<(usize, Vec<usize>)>> =
        vec![Vec::new(); builder.item_sets.len()];
    for (pos, successors) in &builder.follow {
        let Pos::Item(i) = pos else { continue };
        for succ in successors {
            let Pos::Dep(d) = succ else { continue };
            let nexts: Vec<usize> = builder
                .follow
                .get(&Pos::Dep(*d))
                .map(|set| {
                    set.iter()
                        .filter_map(|p| match p {
                            Pos::Item(i) => Some(*i),
                            Pos::Dep(_) => None,
                        })
                        .collect()
                })
                .unwrap_or_default();
            transitions[*i].push((*d, nexts));
        }
    }
    for row in &mut transitions {
        row.sort_by_key(|(d, _)| *d);
    }

    PathRegex {
        source: source.to_string(),
        item_sets: builder.item_sets,
        dep_sets: builder.dep_sets,
        starts,
        accepts,
        transitions,
    }
}

struct Frame {
    item: ItemId,
    state: usize,
    /// Edge and state that led here, undone on backtrack.
    via: Option<(DepId, usize)>,
    t: usize,
    e: usize,
    n: usize,
}

impl PathRegex {
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Find the next unvisited transition out of a frame, resuming where
    /// the frame left off.
    fn advance(
        &self,
        frame: &mut Frame,
        graph: &DependencyGraph,
        outgoing: &HashMap<ItemId, Vec<DepId>>,
        visited: &HashSet<(DepId, usize)>,
    ) -> Option<(DepId, ItemId, usize)> {
        let trans = &self.transitions[frame.state];
        let edges: &[DepId] = outgoing
            .get(&frame.item)
            .map(|v| v.as_slice())
            .unwrap_or(&[]);
        while frame.t < trans.len() {
            let (dep_pos, nexts) = &trans[frame.t];
            while frame.e < edges.len() {
                let dep_id = edges[frame.e];
                let dep = graph.dependency(dep_id);
                if frame.n == 0 {
                    let ok = self.dep_sets[*dep_pos].matches_dep(
                        dep,
                        graph.item(dep.from),
                        graph.item(dep.to),
                    );
                    if !ok {
                        frame.e += 1;
                        continue;
                    }
                }
                while frame.n < nexts.len() {
                    let next_state = nexts[frame.n];
                    frame.n += 1;
                    if visited.contains(&(dep_id, next_state)) {
                        continue;
                    }
                    if self.item_sets[next_state].matches_item(graph.item(dep.to)) {
                        return Some((dep_id, dep.to, next_state));
                    }
                }
                frame.e += 1;
                frame.n = 0;
            }
            frame.t += 1;
            frame.e = 0;
            frame.n = 0;
        }
        None
    }

    /// Enumerate all alternating item/dependency paths over visible edges
    /// that the automaton accepts.
    ///
    /// Traversal is depth-first with an explicit frame stack; a (edge,
    /// state) pair is never on the current path twice, so the search is
    /// loop-free and bounded.
    pub fn find_paths(&self, graph: &DependencyGraph) -> Vec<PathMatch> {
        let outgoing = graph.outgoing_visible();
        let mut results: HashSet<PathMatch> = HashSet::new();

        for root in graph.working_items() {
            for &start in &self.starts {
                if !self.item_sets[start].matches_item(graph.item(root)) {
                    continue;
                }
                let mut visited: HashSet<(DepId, usize)> = HashSet::new();
                let mut items = vec![root];
                let mut deps: Vec<DepId> = Vec::new();
                if self.accepts.contains(&start) {
                    results.insert(PathMatch {
                        items: items.clone(),
                        deps: deps.clone(),
                    });
                }
                let mut stack = vec![Frame {
                    item: root,
                    state: start,
                    via: None,
                    t: 0,
                    e: 0,
                    n: 0,
                }];
                loop {
                    let Some(frame) = stack.last_mut() else { break };
                    let step = self.advance(frame, graph, &outgoing, &visited);
                    match step {
                        Some((dep_id, target, next_state)) => {
                            visited.insert((dep_id, next_state));
                            items.push(target);
                            deps.push(dep_id);
                            if self.accepts.contains(&next_state) {
                                results.insert(PathMatch {
                                    items: items.clone(),
                                    deps: deps.clone(),
                                });
                            }
                            stack.push(Frame {
                                item: target,
                                state: next_state,
                                via: Some((dep_id, next_state)),
                                t: 0,
                                e: 0,
                                n: 0,
                            });
                        }
                        None => {
                            if let Some(done) = stack.pop() {
                                if let Some(via) = done.via {
                                    visited.remove(&via);
                                    items.pop();
                                    deps.pop();
                                }
                            }
                        }
                    }
                }
            }
        }

        let mut sorted: Vec<PathMatch> = results.into_iter().collect();
        sorted.sort();
        debug!(
            pattern = self.source.as_str(),
            matches = sorted.len(),
            "path search finished"
        );
        sorted
    }

    /// Test one concrete alternating path, given its first item and the
    /// dependency edges in order.
    pub fn matches_path(&self, graph: &DependencyGraph, start: ItemId, deps: &[DepId]) -> bool {
        let mut states: BTreeSet<usize> = self
            .starts
            .iter()
            .copied()
            .filter(|&s| self.item_sets[s].matches_item(graph.item(start)))
            .collect();
        let mut at = start;
        for &dep_id in deps {
            let dep = graph.dependency(dep_id);
            if dep.from != at {
                return false;
            }
            let mut next_states = BTreeSet::new();
            for &state in &states {
                for (dep_pos, nexts) in &self.transitions[state] {
                    if !self.dep_sets[*dep_pos].matches_dep(
                        dep,
                        graph.item(dep.from),
                        graph.item(dep.to),
                    ) {
                        continue;
                    }
                    for &n in nexts {
                        if self.item_sets[n].matches_item(graph.item(dep.to)) {
                            next_states.insert(n);
                        }
                    }
                }
            }
            if next_states.is_empty() {
                return false;
            }
            states = next_states;
            at = dep.to;
        }
        states.iter().any(|s| self.accepts.contains(s))
    }
}
