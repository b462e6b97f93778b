//! Transitive-edge hiding.
//!
//! For each root, every other node gets labelled with the MAXIMUM hop
//! distance observed over simple paths of currently visible edges, not the
//! shortest -- a direct edge to a node that is also reachable through a
//! longer route is a shortcut and gets hidden, while direct edges to
//! distance-1 nodes are marked as carrying a transitive relationship.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::graph::DependencyGraph;
use crate::types::ItemId;

/// Maximum hop distance from `root` to every reachable node over simple
/// paths of visible non-self-loop edges. Only simple paths count: a node
/// sitting on a cycle elsewhere must not look further away than any actual
/// alternative route to it.
fn max_distances(root: ItemId, graph: &DependencyGraph) -> HashMap<ItemId, usize> {
    let mut adjacency: HashMap<ItemId, Vec<ItemId>> = HashMap::new();
    for (_, dep) in graph.visible().filter(|(_, d)| !d.is_self_loop()) {
        adjacency.entry(dep.from).or_default().push(dep.to);
    }
    let empty: Vec<ItemId> = Vec::new();

    let mut dist: HashMap<ItemId, usize> = HashMap::new();
    dist.insert(root, 0);
    // Depth-first enumeration of all simple paths; `on_path` blocks
    // revisits within the current path, so the search terminates.
    let mut on_path: HashSet<ItemId> = HashSet::new();
    on_path.insert(root);
    let mut stack: Vec<(ItemId, usize)> = vec![(root, 0)];
    while let Some(frame) = stack.last_mut() {
        let at = frame.0;
        let neighbors = adjacency.get(&at).unwrap_or(&empty);
        let Some(&to) = neighbors.get(frame.1) else {
            on_path.remove(&at);
            stack.pop();
            continue;
        };
        frame.1 += 1;
        if on_path.contains(&to) {
            continue;
        }
        // `to` sits one hop past the end of the current path.
        let depth = stack.len();
        let slot = dist.entry(to).or_insert(0);
        if depth > *slot {
            *slot = depth;
        }
        on_path.insert(to);
        stack.push((to, 0));
    }
    dist
}

/// Hide every visible direct edge whose target sits at maximum distance
/// greater than 1 from its source; mark distance-1 edges as carrying a
/// transitive relationship. Returns the number of edges newly hidden.
///
/// Running the pass a second time on its own output hides nothing more:
/// hidden shortcuts no longer contribute paths, and surviving edges all
/// point at distance-1 targets.
pub fn hide_transitive_edges(graph: &mut DependencyGraph) -> usize {
    let mut hidden = 0usize;
    for root in graph.working_items() {
        let dist = max_distances(root, graph);
        let direct: Vec<crate::types::DepId> = graph
            .visible()
            .filter(|(_, d)| d.from == root && !d.is_self_loop())
            .map(|(id, _)| id)
            .collect();
        for id in direct {
            let to = graph.dependency(id).to;
            match dist.get(&to).copied().unwrap_or(0) {
                0 | 1 => graph.dependency_mut(id).carries_transitive = true,
                _ => {
                    graph.dependency_mut(id).hidden = true;
                    hidden += 1;
                }
            }
        }
    }
    debug!(hidden, "transitive-edge hiding finished");
    hidden
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Item, ItemType};

    fn module(name: &str) -> Item {
        Item::flat(&ItemType::simple("module"), name)
    }

    fn visible_edges(graph: &DependencyGraph) -> Vec<String> {
        graph
            .visible()
            .map(|(_, d)| format!("{}->{}", graph.item(d.from).name(), graph.item(d.to).name()))
            .collect()
    }

    #[test]
    fn hides_the_shortcut_in_a_triangle() {
        // A->B, B->C and the direct shortcut A->C.
        let mut g = DependencyGraph::new();
        g.add_edge(module("A"), module("B"), 1);
        g.add_edge(module("B"), module("C"), 1);
        g.add_edge(module("A"), module("C"), 1);
        let hidden = hide_transitive_edges(&mut g);
        assert_eq!(hidden, 1);
        assert_eq!(
            visible_edges(&g),
            vec!["A->B".to_string(), "B->C".to_string()]
        );
        for (_, d) in g.visible() {
            assert!(d.carries_transitive);
        }
    }

    #[test]
    fn second_run_is_idempotent() {
        let mut g = DependencyGraph::new();
        g.add_edge(module("A"), module("B"), 1);
        g.add_edge(module("B"), module("C"), 1);
        g.add_edge(module("A"), module("C"), 1);
        g.add_edge(module("C"), module("D"), 1);
        g.add_edge(module("A"), module("D"), 1);
        let first = hide_transitive_edges(&mut g);
        assert!(first >= 2);
        let second = hide_transitive_edges(&mut g);
        assert_eq!(second, 0);
    }

    #[test]
    fn keeps_edges_without_longer_route() {
        let mut g = DependencyGraph::new();
        g.add_edge(module("A"), module("B"), 1);
        g.add_edge(module("A"), module("C"), 1);
        let hidden = hide_transitive_edges(&mut g);
        assert_eq!(hidden, 0);
        assert_eq!(g.visible_count(), 2);
    }

    #[test]
    fn max_distance_policy_hides_longest_route_shortcuts() {
        // A->B->C->D chain plus shortcuts A->C and B->D: every direct edge
        // whose target also has a longer route goes away.
        let mut g = DependencyGraph::new();
        g.add_edge(module("A"), module("B"), 1);
        g.add_edge(module("B"), module("C"), 1);
        g.add_edge(module("C"), module("D"), 1);
        g.add_edge(module("A"), module("C"), 1);
        g.add_edge(module("B"), module("D"), 1);
        let hidden = hide_transitive_edges(&mut g);
        assert_eq!(hidden, 2);
        assert_eq!(
            visible_edges(&g),
            vec!["A->B".to_string(), "B->C".to_string(), "C->D".to_string()]
        );
    }

    #[test]
    fn sole_edge_into_a_cycle_survives() {
        // B and C cycle between themselves; A -> B is still the only way
        // into the component and nothing implies it.
        let mut g = DependencyGraph::new();
        g.add_edge(module("A"), module("B"), 1);
        g.add_edge(module("B"), module("C"), 1);
        g.add_edge(module("C"), module("B"), 1);
        let hidden = hide_transitive_edges(&mut g);
        assert_eq!(hidden, 0);
        assert_eq!(g.visible_count(), 3);
    }

    #[test]
    fn cycles_terminate_and_keep_cycle_edges() {
        let mut g = DependencyGraph::new();
        g.add_edge(module("A"), module("B"), 1);
        g.add_edge(module("B"), module("A"), 1);
        hide_transitive_edges(&mut g);
        // Both edges survive: each target is its source's only neighbor.
        assert_eq!(g.visible_count(), 2);
    }

    #[test]
    fn self_loops_are_ignored() {
        let mut g = DependencyGraph::new();
        g.add_edge(module("A"), module("A"), 1);
        g.add_edge(module("A"), module("B"), 1);
        let hidden = hide_transitive_edges(&mut g);
        assert_eq!(hidden, 0);
        assert_eq!(g.visible_count(), 2);
    }
}
