//! Minimum cut between item sets via Ford-Fulkerson max-flow.
//!
//! Each visible edge gets an integer capacity taken from one of its
//! counts. Augmenting paths are found depth-first, exploring edges by
//! descending residual capacity for determinism, and may push flow back
//! along an edge an earlier path used. When no augmenting path remains,
//! the cut is exactly the set of edges leaving the residual
//! source-reachable node set.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::debug;

use crate::errors::{CutError, RuleError};
use crate::graph::DependencyGraph;
use crate::markers::validate_marker_name;
use crate::types::{DepId, Dependency, ItemId};

/// Which count on a dependency supplies its capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CutCapacity {
    Ct,
    Questionable,
    Bad,
}

impl CutCapacity {
    fn of(self, dep: &Dependency) -> u32 {
        match self {
            CutCapacity::Ct => dep.ct,
            CutCapacity::Questionable => dep.questionable_ct,
            CutCapacity::Bad => dep.bad_ct,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CutResult {
    /// Total flow pushed, equal to the summed capacity of the cut edges.
    pub flow: u32,
    /// Edges crossing from the residual source-reachable set outward.
    pub cut: Vec<DepId>,
    /// Items reachable from the sources in the residual graph.
    pub source_side: Vec<ItemId>,
}

/// Compute the minimum cut separating `sources` from `targets`, optionally
/// incrementing `marker` on every cut edge.
pub fn minimum_cut(
    graph: &mut DependencyGraph,
    sources: &[ItemId],
    targets: &[ItemId],
    capacity: CutCapacity,
    marker: Option<&str>,
) -> Result<CutResult, RuleError> {
    if sources.is_empty() {
        return Err(CutError::EmptySources.into());
    }
    if targets.is_empty() {
        return Err(CutError::EmptyTargets.into());
    }
    let target_set: HashSet<ItemId> = targets.iter().copied().collect();
    if let Some(&shared) = sources.iter().find(|s| target_set.contains(s)) {
        return Err(CutError::Overlapping {
            item: graph.item(shared).name(),
        }
        .into());
    }
    if let Some(name) = marker {
        validate_marker_name(name)?;
    }

    let edges: Vec<DepId> = graph.visible().map(|(id, _)| id).collect();
    let caps: HashMap<DepId, u32> = edges
        .iter()
        .map(|&id| (id, capacity.of(graph.dependency(id))))
        .collect();
    let mut flow: HashMap<DepId, u32> = edges.iter().map(|&id| (id, 0)).collect();

    let mut forward: HashMap<ItemId, Vec<DepId>> = HashMap::new();
    let mut backward: HashMap<ItemId, Vec<DepId>> = HashMap::new();
    for &id in &edges {
        let dep = graph.dependency(id);
        forward.entry(dep.from).or_default().push(id);
        backward.entry(dep.to).or_default().push(id);
    }

    let mut total = 0u32;
    while let Some(path) = augmenting_path(
        graph,
        sources,
        &target_set,
        &forward,
        &backward,
        &caps,
        &flow,
    ) {
        let bottleneck = path
            .iter()
            .map(|step| match step {
                Step::Forward(id) => caps[id] - flow[id],
                Step::Backward(id) => flow[id],
            })
            .min()
            .unwrap_or(0);
        debug_assert!(bottleneck > 0);
        for step in &path {
            match step {
                Step::Forward(id) => *flow.entry(*id).or_insert(0) += bottleneck,
                Step::Backward(id) => *flow.entry(*id).or_insert(0) -= bottleneck,
            }
        }
        total += bottleneck;
    }

    let reachable = residual_reachable(graph, sources, &forward, &backward, &caps, &flow);
    let mut cut: Vec<DepId> = edges
        .iter()
        .copied()
        .filter(|&id| {
            let dep = graph.dependency(id);
            reachable.contains(&dep.from) && !reachable.contains(&dep.to)
        })
        .collect();
    cut.sort();

    if let Some(name) = marker {
        for &id in &cut {
            graph.dependency_mut(id).markers.add_unchecked(name, 1);
        }
    }

    let mut source_side: Vec<ItemId> = reachable.into_iter().collect();
    source_side.sort();
    debug!(flow = total, cut_edges = cut.len(), "minimum cut computed");
    Ok(CutResult {
        flow: total,
        cut,
        source_side,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    /// Traverse an edge along its direction (`flow < capacity`).
    Forward(DepId),
    /// Push flow back against an edge already carrying some (`flow > 0`).
    Backward(DepId),
}

/// Residual moves out of `at`, ordered by descending residual capacity
/// (ties broken by edge id) so augmentation is deterministic.
fn residual_moves(
    graph: &DependencyGraph,
    at: ItemId,
    forward: &HashMap<ItemId, Vec<DepId>>,
    backward: &HashMap<ItemId, Vec<DepId>>,
    caps: &HashMap<DepId, u32>,
    flow: &HashMap<DepId, u32>,
) -> Vec<(Step, ItemId, u32)> {
    let mut moves: Vec<(Step, ItemId, u32)> = Vec::new();
    if let Some(out) = forward.get(&at) {
        for &id in out {
            let residual = caps[&id] - flow[&id];
            if residual > 0 {
                moves.push((Step::Forward(id), graph.dependency(id).to, residual));
            }
        }
    }
    if let Some(inc) = backward.get(&at) {
        for &id in inc {
            let residual = flow[&id];
            if residual > 0 {
                moves.push((Step::Backward(id), graph.dependency(id).from, residual));
            }
        }
    }
    moves.sort_by(|a, b| b.2.cmp(&a.2).then_with(|| a.0.cmp_key().cmp(&b.0.cmp_key())));
    moves
}

impl Step {
    fn cmp_key(self) -> (u32, bool) {
        match self {
            Step::Forward(id) => (id.0, false),
            Step::Backward(id) => (id.0, true),
        }
    }
}

/// Depth-first search for one augmenting path from any source to any
/// target through the residual graph.
fn augmenting_path(
    graph: &DependencyGraph,
    sources: &[ItemId],
    targets: &HashSet<ItemId>,
    forward: &HashMap<ItemId, Vec<DepId>>,
    backward: &HashMap<ItemId, Vec<DepId>>,
    caps: &HashMap<DepId, u32>,
    flow: &HashMap<DepId, u32>,
) -> Option<Vec<Step>> {
    struct Frame {
        at: ItemId,
        moves: Vec<(Step, ItemId, u32)>,
        next: usize,
    }

    for &source in sources {
        let mut visited: HashSet<ItemId> = HashSet::new();
        visited.insert(source);
        let mut steps: Vec<Step> = Vec::new();
        let mut stack = vec![Frame {
            at: source,
            moves: residual_moves(graph, source, forward, backward, caps, flow),
            next: 0,
        }];
        while let Some(frame) = stack.last_mut() {
            if frame.next >= frame.moves.len() {
                stack.pop();
                steps.pop();
                continue;
            }
            let (step, to, _) = frame.moves[frame.next];
            frame.next += 1;
            if visited.contains(&to) {
                continue;
            }
            steps.push(step);
            if targets.contains(&to) {
                return Some(steps);
            }
            visited.insert(to);
            stack.push(Frame {
                at: to,
                moves: residual_moves(graph, to, forward, backward, caps, flow),
                next: 0,
            });
        }
    }
    None
}

/// Nodes reachable from the sources in the residual graph.
fn residual_reachable(
    graph: &DependencyGraph,
    sources: &[ItemId],
    forward: &HashMap<ItemId, Vec<DepId>>,
    backward: &HashMap<ItemId, Vec<DepId>>,
    caps: &HashMap<DepId, u32>,
    flow: &HashMap<DepId, u32>,
) -> HashSet<ItemId> {
    let mut reachable: HashSet<ItemId> = sources.iter().copied().collect();
    let mut stack: Vec<ItemId> = sources.to_vec();
    while let Some(at) = stack.pop() {
        for (_, to, _) in residual_moves(graph, at, forward, backward, caps, flow) {
            if reachable.insert(to) {
                stack.push(to);
            }
        }
    }
    reachable
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Item, ItemType};

    fn module(name: &str) -> Item {
        Item::flat(&ItemType::simple("module"), name)
    }

    fn id_of(graph: &DependencyGraph, name: &str) -> ItemId {
        graph
            .working_items()
            .into_iter()
            .find(|&id| graph.item(id).name() == name)
            .expect("item exists")
    }

    /// The classical 6-node textbook network with max flow 23.
    fn textbook() -> DependencyGraph {
        let mut g = DependencyGraph::new();
        g.add_edge(module("s"), module("v1"), 16);
        g.add_edge(module("s"), module("v2"), 13);
        g.add_edge(module("v2"), module("v1"), 4);
        g.add_edge(module("v1"), module("v3"), 12);
        g.add_edge(module("v3"), module("v2"), 9);
        g.add_edge(module("v2"), module("v4"), 14);
        g.add_edge(module("v4"), module("v3"), 7);
        g.add_edge(module("v3"), module("t"), 20);
        g.add_edge(module("v4"), module("t"), 4);
        g
    }

    #[test]
    fn textbook_network_cut_equals_max_flow() {
        let mut g = textbook();
        let s = id_of(&g, "s");
        let t = id_of(&g, "t");
        let result =
            minimum_cut(&mut g, &[s], &[t], CutCapacity::Ct, None).expect("cut succeeds");
        assert_eq!(result.flow, 23);
        let cut_capacity: u32 = result.cut.iter().map(|&id| g.dependency(id).ct).sum();
        assert_eq!(cut_capacity, 23);
        // Every cut edge crosses from the reachable set outward.
        let reachable: HashSet<ItemId> = result.source_side.iter().copied().collect();
        for &id in &result.cut {
            let dep = g.dependency(id);
            assert!(reachable.contains(&dep.from));
            assert!(!reachable.contains(&dep.to));
        }
        assert!(reachable.contains(&s));
        assert!(!reachable.contains(&t));
    }

    #[test]
    fn single_edge_cut() {
        let mut g = DependencyGraph::new();
        g.add_edge(module("a"), module("b"), 5);
        let a = id_of(&g, "a");
        let b = id_of(&g, "b");
        let result =
            minimum_cut(&mut g, &[a], &[b], CutCapacity::Ct, None).expect("cut succeeds");
        assert_eq!(result.flow, 5);
        assert_eq!(result.cut.len(), 1);
    }

    #[test]
    fn disconnected_targets_yield_empty_cut() {
        let mut g = DependencyGraph::new();
        g.add_edge(module("a"), module("b"), 5);
        g.add_edge(module("c"), module("d"), 5);
        let a = id_of(&g, "a");
        let d = id_of(&g, "d");
        let result =
            minimum_cut(&mut g, &[a], &[d], CutCapacity::Ct, None).expect("cut succeeds");
        assert_eq!(result.flow, 0);
        assert!(result.cut.is_empty());
    }

    #[test]
    fn backward_residual_is_honored() {
        // The greedy first path s->a->b->t would block the network without
        // the ability to push flow back along a->b.
        let mut g = DependencyGraph::new();
        g.add_edge(module("s"), module("a"), 1);
        g.add_edge(module("s"), module("b"), 1);
        g.add_edge(module("a"), module("b"), 1);
        g.add_edge(module("a"), module("t"), 1);
        g.add_edge(module("b"), module("t"), 1);
        let s = id_of(&g, "s");
        let t = id_of(&g, "t");
        let result =
            minimum_cut(&mut g, &[s], &[t], CutCapacity::Ct, None).expect("cut succeeds");
        assert_eq!(result.flow, 2);
    }

    #[test]
    fn selectable_capacity_uses_bad_counts() {
        let mut g = DependencyGraph::new();
        let e = g.add_edge(module("a"), module("b"), 10);
        g.dependency_mut(e).bad_ct = 3;
        let a = id_of(&g, "a");
        let b = id_of(&g, "b");
        let result =
            minimum_cut(&mut g, &[a], &[b], CutCapacity::Bad, None).expect("cut succeeds");
        assert_eq!(result.flow, 3);
    }

    #[test]
    fn cut_edges_can_be_marked() {
        let mut g = DependencyGraph::new();
        g.add_edge(module("a"), module("b"), 5);
        let a = id_of(&g, "a");
        let b = id_of(&g, "b");
        let result = minimum_cut(&mut g, &[a], &[b], CutCapacity::Ct, Some("cut"))
            .expect("cut succeeds");
        assert_eq!(g.dependency(result.cut[0]).markers.get("cut"), 1);
    }

    #[test]
    fn empty_or_overlapping_sets_fail() {
        let mut g = DependencyGraph::new();
        g.add_edge(module("a"), module("b"), 5);
        let a = id_of(&g, "a");
        let b = id_of(&g, "b");
        assert!(matches!(
            minimum_cut(&mut g, &[], &[b], CutCapacity::Ct, None),
            Err(RuleError::Cut(CutError::EmptySources))
        ));
        assert!(matches!(
            minimum_cut(&mut g, &[a], &[], CutCapacity::Ct, None),
            Err(RuleError::Cut(CutError::EmptyTargets))
        ));
        assert!(matches!(
            minimum_cut(&mut g, &[a, b], &[b], CutCapacity::Ct, None),
            Err(RuleError::Cut(CutError::Overlapping { .. }))
        ));
    }
}
