//! The mutable dependency graph: item arena, interning table, edge list.
//!
//! Items are deduplicated by value at ingestion and addressed by [`ItemId`]
//! afterwards, so the algorithms can rely on cheap id equality. The
//! interning table is owned by the graph (no process-wide state); multiple
//! independent graphs coexist without cross-talk.

use std::collections::HashMap;

use tracing::debug;

use crate::matching::{DependencyMatch, ItemMatch};
use crate::types::{DepId, Dependency, Item, ItemId};

#[derive(Debug, Default)]
pub struct DependencyGraph {
    items: Vec<Item>,
    interned: HashMap<Item, ItemId>,
    deps: Vec<Dependency>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern an item: returns the id of an existing equal item (merging
    /// the incoming markers into it) or appends a new one.
    pub fn intern(&mut self, item: Item) -> ItemId {
        if let Some(&id) = self.interned.get(&item) {
            if !item.markers.is_empty() {
                self.items[id.0 as usize].markers.merge(&item.markers);
            }
            return id;
        }
        let id = ItemId(self.items.len() as u32);
        self.items.push(item.clone());
        self.interned.insert(item, id);
        id
    }

    pub fn item(&self, id: ItemId) -> &Item {
        &self.items[id.0 as usize]
    }

    pub fn item_mut(&mut self, id: ItemId) -> &mut Item {
        &mut self.items[id.0 as usize]
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Append one raw dependency record.
    pub fn add_dependency(&mut self, dep: Dependency) -> DepId {
        let id = DepId(self.deps.len() as u32);
        self.deps.push(dep);
        id
    }

    /// Intern both endpoints and append an edge between them.
    pub fn add_edge(&mut self, from: Item, to: Item, ct: u32) -> DepId {
        let from = self.intern(from);
        let to = self.intern(to);
        self.add_dependency(Dependency::new(from, to, ct))
    }

    pub fn dependency(&self, id: DepId) -> &Dependency {
        &self.deps[id.0 as usize]
    }

    pub fn dependency_mut(&mut self, id: DepId) -> &mut Dependency {
        &mut self.deps[id.0 as usize]
    }

    pub fn dependencies(&self) -> &[Dependency] {
        &self.deps
    }

    pub fn dependencies_mut(&mut self) -> &mut [Dependency] {
        &mut self.deps
    }

    pub fn dep_count(&self) -> usize {
        self.deps.len()
    }

    pub fn dep_ids(&self) -> impl Iterator<Item = DepId> + '_ {
        (0..self.deps.len()).map(|i| DepId(i as u32))
    }

    /// Collapse parallel edges (same `from`/`to`) into one aggregated edge
    /// each: counts sum, markers union, first source location wins.
    ///
    /// Re-indexes the edge list, so previously handed-out [`DepId`]s are
    /// invalidated; aggregate before running transformation passes.
    pub fn aggregate(&mut self) {
        let mut merged: Vec<Dependency> = Vec::new();
        let mut index: HashMap<(ItemId, ItemId), usize> = HashMap::new();
        for dep in self.deps.drain(..) {
            match index.get(&(dep.from, dep.to)) {
                Some(&at) => merged[at].absorb(&dep),
                None => {
                    index.insert((dep.from, dep.to), merged.len());
                    merged.push(dep);
                }
            }
        }
        debug!(edges = merged.len(), "aggregated parallel edges");
        self.deps = merged;
    }

    /// Items with at least one incident dependency (the working graph).
    pub fn working_items(&self) -> Vec<ItemId> {
        let mut incident = vec![false; self.items.len()];
        for dep in &self.deps {
            incident[dep.from.0 as usize] = true;
            incident[dep.to.0 as usize] = true;
        }
        incident
            .iter()
            .enumerate()
            .filter(|(_, inc)| **inc)
            .map(|(i, _)| ItemId(i as u32))
            .collect()
    }

    /// Ids and edges that are not hidden.
    pub fn visible(&self) -> impl Iterator<Item = (DepId, &Dependency)> {
        self.deps
            .iter()
            .enumerate()
            .filter(|(_, d)| !d.hidden)
            .map(|(i, d)| (DepId(i as u32), d))
    }

    pub fn visible_count(&self) -> usize {
        self.deps.iter().filter(|d| !d.hidden).count()
    }

    /// Outgoing visible edges per item.
    pub fn outgoing_visible(&self) -> HashMap<ItemId, Vec<DepId>> {
        let mut map: HashMap<ItemId, Vec<DepId>> = HashMap::new();
        for (id, dep) in self.visible() {
            map.entry(dep.from).or_default().push(id);
        }
        map
    }

    /// Incoming visible edges per item.
    pub fn incoming_visible(&self) -> HashMap<ItemId, Vec<DepId>> {
        let mut map: HashMap<ItemId, Vec<DepId>> = HashMap::new();
        for (id, dep) in self.visible() {
            map.entry(dep.to).or_default().push(id);
        }
        map
    }

    /// Outgoing edges per item, hidden ones included.
    pub fn outgoing_all(&self) -> HashMap<ItemId, Vec<DepId>> {
        let mut map: HashMap<ItemId, Vec<DepId>> = HashMap::new();
        for (i, dep) in self.deps.iter().enumerate() {
            map.entry(dep.from).or_default().push(DepId(i as u32));
        }
        map
    }

    /// Incoming edges per item, hidden ones included.
    pub fn incoming_all(&self) -> HashMap<ItemId, Vec<DepId>> {
        let mut map: HashMap<ItemId, Vec<DepId>> = HashMap::new();
        for (i, dep) in self.deps.iter().enumerate() {
            map.entry(dep.to).or_default().push(DepId(i as u32));
        }
        map
    }

    /// All items matching an item matcher.
    pub fn match_items(&self, matcher: &ItemMatch) -> Vec<ItemId> {
        self.items
            .iter()
            .enumerate()
            .filter(|(_, item)| matcher.is_match(item))
            .map(|(i, _)| ItemId(i as u32))
            .collect()
    }

    /// Match one dependency with its endpoints resolved.
    pub fn match_dependency(&self, id: DepId, matcher: &DependencyMatch) -> Option<Vec<String>> {
        let dep = self.dependency(id);
        matcher.matches(dep, self.item(dep.from), self.item(dep.to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ItemType;

    fn module(name: &str) -> Item {
        Item::flat(&ItemType::simple("module"), name)
    }

    #[test]
    fn interning_dedups_by_value() {
        let mut g = DependencyGraph::new();
        let a1 = g.intern(module("a"));
        let b = g.intern(module("b"));
        let a2 = g.intern(module("a"));
        assert_eq!(a1, a2);
        assert_ne!(a1, b);
        assert_eq!(g.item_count(), 2);
    }

    #[test]
    fn interning_merges_markers_of_duplicates() {
        let mut g = DependencyGraph::new();
        let mut tagged = module("a");
        tagged.markers.increment("seen", 2).expect("valid marker");
        let id1 = g.intern(module("a"));
        let id2 = g.intern(tagged);
        assert_eq!(id1, id2);
        assert_eq!(g.item(id1).markers.get("seen"), 2);
    }

    #[test]
    fn aggregate_merges_parallel_edges() {
        let mut g = DependencyGraph::new();
        g.add_edge(module("a"), module("b"), 3);
        g.add_edge(module("a"), module("b"), 4);
        g.add_edge(module("a"), module("c"), 1);
        g.aggregate();
        assert_eq!(g.dep_count(), 2);
        assert_eq!(g.dependencies()[0].ct, 7);
    }

    #[test]
    fn working_items_require_an_incident_edge() {
        let mut g = DependencyGraph::new();
        let lonely = g.intern(module("lonely"));
        g.add_edge(module("a"), module("b"), 1);
        let working = g.working_items();
        assert_eq!(working.len(), 2);
        assert!(!working.contains(&lonely));
    }

    #[test]
    fn hidden_edges_are_skipped_by_visible() {
        let mut g = DependencyGraph::new();
        let id = g.add_edge(module("a"), module("b"), 1);
        g.add_edge(module("b"), module("c"), 1);
        g.dependency_mut(id).hidden = true;
        assert_eq!(g.visible_count(), 1);
        assert_eq!(g.dep_count(), 2);
    }

    #[test]
    fn match_items_filters_by_pattern() {
        let mut g = DependencyGraph::new();
        g.add_edge(module("app.main"), module("infra.db"), 1);
        let matcher = ItemMatch::parse("app.**").expect("valid matcher");
        let hits = g.match_items(&matcher);
        assert_eq!(hits.len(), 1);
        assert_eq!(g.item(hits[0]).name(), "app.main");
    }
}
