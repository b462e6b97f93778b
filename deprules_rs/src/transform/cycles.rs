//! Cycle detection and marking.
//!
//! For each candidate root, every edge lying on a directed path that
//! returns to the root is marked `on_cycle`, unhidden, and given a marker
//! increment. An edge u -> v is on such a path exactly when the root
//! reaches u and v reaches the root; forward and backward breadth-first
//! distances decide that, and their sum bounds the cycle length.

use std::collections::{HashMap, VecDeque};

use tracing::debug;

use crate::errors::MarkerFormatError;
use crate::graph::DependencyGraph;
use crate::markers::validate_marker_name;
use crate::matching::ItemMatch;
use crate::types::{DepId, ItemId};

#[derive(Debug, Clone)]
pub struct CycleOptions {
    /// Restrict candidate roots to items matching this filter.
    pub root_filter: Option<ItemMatch>,
    /// Ignore cycles longer than this many edges.
    pub max_length: usize,
    /// Marker incremented on every edge found on a cycle.
    pub marker: String,
}

impl Default for CycleOptions {
    fn default() -> Self {
        Self {
            root_filter: None,
            max_length: 64,
            marker: "on-cycle".to_string(),
        }
    }
}

/// Breadth-first hop distances from `root` following `adjacency`.
fn bfs_distances(
    root: ItemId,
    adjacency: &HashMap<ItemId, Vec<(ItemId, DepId)>>,
) -> HashMap<ItemId, usize> {
    let mut dist: HashMap<ItemId, usize> = HashMap::new();
    let mut queue: VecDeque<ItemId> = VecDeque::new();
    dist.insert(root, 0);
    queue.push_back(root);
    while let Some(at) = queue.pop_front() {
        let here = dist[&at];
        if let Some(neighbors) = adjacency.get(&at) {
            for (next, _) in neighbors {
                if !dist.contains_key(next) {
                    dist.insert(*next, here + 1);
                    queue.push_back(*next);
                }
            }
        }
    }
    dist
}

/// Mark all edges that lie on a directed cycle through any candidate root.
/// Hidden edges participate and are unhidden when found on a cycle.
/// Returns the number of edges marked.
pub fn mark_cycles(
    graph: &mut DependencyGraph,
    options: &CycleOptions,
) -> Result<usize, MarkerFormatError> {
    validate_marker_name(&options.marker)?;

    let mut forward: HashMap<ItemId, Vec<(ItemId, DepId)>> = HashMap::new();
    let mut backward: HashMap<ItemId, Vec<(ItemId, DepId)>> = HashMap::new();
    for id in graph.dep_ids() {
        let dep = graph.dependency(id);
        forward.entry(dep.from).or_default().push((dep.to, id));
        backward.entry(dep.to).or_default().push((dep.from, id));
    }

    let roots: Vec<ItemId> = match &options.root_filter {
        Some(filter) => graph
            .working_items()
            .into_iter()
            .filter(|&id| filter.is_match(graph.item(id)))
            .collect(),
        None => graph.working_items(),
    };

    let mut on_cycle: Vec<DepId> = Vec::new();
    for root in roots {
        let from_root = bfs_distances(root, &forward);
        let to_root = bfs_distances(root, &backward);
        for id in graph.dep_ids() {
            let dep = graph.dependency(id);
            let (Some(&d_in), Some(&d_out)) = (from_root.get(&dep.from), to_root.get(&dep.to))
            else {
                continue;
            };
            if d_in + 1 + d_out <= options.max_length {
                on_cycle.push(id);
            }
        }
    }
    on_cycle.sort();
    on_cycle.dedup();

    for &id in &on_cycle {
        let dep = graph.dependency_mut(id);
        dep.on_cycle = true;
        dep.hidden = false;
        dep.markers.add_unchecked(&options.marker, 1);
    }
    debug!(marked = on_cycle.len(), "cycle marking finished");
    Ok(on_cycle.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Item, ItemType};

    fn module(name: &str) -> Item {
        Item::flat(&ItemType::simple("module"), name)
    }

    fn edge_names(graph: &DependencyGraph, pred: impl Fn(&crate::types::Dependency) -> bool) -> Vec<String> {
        graph
            .dependencies()
            .iter()
            .filter(|d| pred(d))
            .map(|d| format!("{}->{}", graph.item(d.from).name(), graph.item(d.to).name()))
            .collect()
    }

    /// A<->B plus B->C and C<->D: two independent cycles.
    fn two_cycles() -> DependencyGraph {
        let mut g = DependencyGraph::new();
        g.add_edge(module("A"), module("B"), 1);
        g.add_edge(module("B"), module("A"), 1);
        g.add_edge(module("B"), module("C"), 1);
        g.add_edge(module("C"), module("D"), 1);
        g.add_edge(module("D"), module("C"), 1);
        g
    }

    #[test]
    fn marks_only_cycle_edges_for_a_single_root() {
        let mut g = two_cycles();
        let options = CycleOptions {
            root_filter: Some(ItemMatch::parse("A").expect("valid matcher")),
            ..CycleOptions::default()
        };
        let marked = mark_cycles(&mut g, &options).expect("marking succeeds");
        assert_eq!(marked, 2);
        let on = edge_names(&g, |d| d.on_cycle);
        assert_eq!(on, vec!["A->B".to_string(), "B->A".to_string()]);
    }

    #[test]
    fn all_roots_find_both_independent_cycles() {
        let mut g = two_cycles();
        let marked = mark_cycles(&mut g, &CycleOptions::default()).expect("marking succeeds");
        assert_eq!(marked, 4);
        let off = edge_names(&g, |d| !d.on_cycle);
        assert_eq!(off, vec!["B->C".to_string()]);
    }

    #[test]
    fn cycle_edges_get_marker_and_are_unhidden() {
        let mut g = two_cycles();
        for id in g.dep_ids().collect::<Vec<_>>() {
            g.dependency_mut(id).hidden = true;
        }
        mark_cycles(&mut g, &CycleOptions::default()).expect("marking succeeds");
        for dep in g.dependencies() {
            if dep.on_cycle {
                assert!(!dep.hidden);
                assert_eq!(dep.markers.get("on-cycle"), 1);
            } else {
                assert!(dep.hidden);
            }
        }
    }

    #[test]
    fn max_length_bounds_detected_cycles() {
        let mut g = DependencyGraph::new();
        g.add_edge(module("a"), module("b"), 1);
        g.add_edge(module("b"), module("c"), 1);
        g.add_edge(module("c"), module("a"), 1);
        let options = CycleOptions {
            max_length: 2,
            ..CycleOptions::default()
        };
        let marked = mark_cycles(&mut g, &options).expect("marking succeeds");
        assert_eq!(marked, 0);
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let mut g = DependencyGraph::new();
        g.add_edge(module("a"), module("a"), 1);
        let marked = mark_cycles(&mut g, &CycleOptions::default()).expect("marking succeeds");
        assert_eq!(marked, 1);
    }

    #[test]
    fn rejects_invalid_marker_name() {
        let mut g = two_cycles();
        let options = CycleOptions {
            marker: "not valid".to_string(),
            ..CycleOptions::default()
        };
        assert!(mark_cycles(&mut g, &options).is_err());
    }

    #[test]
    fn acyclic_graph_marks_nothing() {
        let mut g = DependencyGraph::new();
        g.add_edge(module("a"), module("b"), 1);
        g.add_edge(module("b"), module("c"), 1);
        let marked = mark_cycles(&mut g, &CycleOptions::default()).expect("marking succeeds");
        assert_eq!(marked, 0);
        assert!(g.dependencies().iter().all(|d| !d.on_cycle));
    }

    #[test]
    fn cycle_markers_accumulate_once_per_pass() {
        let mut g = two_cycles();
        mark_cycles(&mut g, &CycleOptions::default()).expect("marking succeeds");
        mark_cycles(&mut g, &CycleOptions::default()).expect("marking succeeds");
        let ab = &g.dependencies()[0];
        assert_eq!(ab.markers.get("on-cycle"), 2);
    }
}
