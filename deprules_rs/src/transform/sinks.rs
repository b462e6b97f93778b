//! Pure-sink hiding.
//!
//! A pure sink is an item whose remaining outgoing edges are all hidden or
//! self-loops: it uses nothing further, so edges into it add no structural
//! information. Hiding those edges can expose new sinks, so the pass
//! repeats up to a configurable depth.

use tracing::debug;

use crate::graph::DependencyGraph;
use crate::matching::ItemMatch;
use crate::types::DepId;

#[derive(Debug, Clone)]
pub struct SinkOptions {
    /// Maximum number of hide-and-repeat rounds.
    pub max_depth: usize,
    /// Restrict sink candidates to items matching this filter.
    pub filter: Option<ItemMatch>,
}

impl Default for SinkOptions {
    fn default() -> Self {
        Self {
            max_depth: 10,
            filter: None,
        }
    }
}

/// Iteratively hide edges into pure sinks. Returns the number of edges
/// hidden across all rounds.
pub fn hide_pure_sinks(graph: &mut DependencyGraph, options: &SinkOptions) -> usize {
    let mut total = 0usize;
    for round in 0..options.max_depth {
        let outgoing = graph.outgoing_visible();
        let incoming = graph.incoming_visible();

        let mut doomed: Vec<DepId> = Vec::new();
        for id in graph.working_items() {
            if let Some(filter) = &options.filter {
                if !filter.is_match(graph.item(id)) {
                    continue;
                }
            }
            let is_sink = outgoing
                .get(&id)
                .map(|edges| {
                    edges
                        .iter()
                        .all(|&e| graph.dependency(e).is_self_loop())
                })
                .unwrap_or(true);
            if !is_sink {
                continue;
            }
            if let Some(edges) = incoming.get(&id) {
                doomed.extend(edges.iter().copied());
            }
        }
        doomed.sort();
        doomed.dedup();
        doomed.retain(|&id| !graph.dependency(id).is_self_loop());
        if doomed.is_empty() {
            debug!(rounds = round, hidden = total, "pure-sink hiding finished");
            return total;
        }
        for id in doomed.drain(..) {
            graph.dependency_mut(id).hidden = true;
            total += 1;
        }
    }
    debug!(
        rounds = options.max_depth,
        hidden = total,
        "pure-sink hiding reached its depth bound"
    );
    total
}
