//! Common types shared across the crate: item shapes, items, dependencies.
//!
//! Items are identified by their type name plus the ordered field values;
//! the marker set on an item or dependency is a mutable annotation layer
//! that never participates in identity.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::markers::MarkerSet;

/// Shape of an item: a type name plus ordered field names.
///
/// Two item types are considered the same when their names match; the field
/// names are descriptive (readers use them to label what they emit).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemType {
    pub name: String,
    pub fields: Vec<String>,
}

impl ItemType {
    pub fn new(name: &str, fields: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
        }
    }

    /// Single-field type for readers that only produce flat names.
    pub fn simple(name: &str) -> Self {
        Self::new(name, &["name"])
    }

    /// Two-field type for readers that emit namespace-qualified members.
    pub fn qualified(name: &str) -> Self {
        Self::new(name, &["namespace", "name"])
    }
}

/// Index of an interned item inside one [`DependencyGraph`](crate::graph::DependencyGraph).
///
/// Ids are only meaningful within the graph that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub u32);

/// Index of a dependency inside one graph's edge list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DepId(pub u32);

/// A named node in the dependency graph.
///
/// Identity (type name + field values) is fixed at creation; only the
/// marker set may change afterwards. Equality and hashing deliberately
/// ignore markers so interning stays stable while annotations accumulate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    item_type: String,
    fields: Vec<String>,
    pub markers: MarkerSet,
}

impl Item {
    pub fn new(item_type: &ItemType, fields: Vec<String>) -> Self {
        Self {
            item_type: item_type.name.clone(),
            fields,
            markers: MarkerSet::new(),
        }
    }

    /// Flat single-field item, convenient for readers and tests.
    pub fn flat(item_type: &ItemType, name: &str) -> Self {
        Self::new(item_type, vec![name.to_string()])
    }

    pub fn item_type(&self) -> &str {
        &self.item_type
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Display name: field values joined with `:`.
    pub fn name(&self) -> String {
        self.fields.join(":")
    }
}

impl PartialEq for Item {
    fn eq(&self, other: &Self) -> bool {
        self.item_type == other.item_type && self.fields == other.fields
    }
}

impl Eq for Item {}

impl Hash for Item {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.item_type.hash(state);
        self.fields.hash(state);
    }
}

/// Where a raw dependency was observed by a reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
}

/// A directed, weighted, markable edge between two items.
///
/// `ct` counts raw usages; `questionable_ct` and `bad_ct` track how many of
/// those usages a rule pass classified as suspicious or forbidden. The
/// `hidden`/`on_cycle`/`carries_transitive` flags are set by the graph
/// transformations; a hidden edge is logically absent from rendering but
/// stays in the collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub from: ItemId,
    pub to: ItemId,
    pub ct: u32,
    pub questionable_ct: u32,
    pub bad_ct: u32,
    pub source: Option<SourceLocation>,
    pub markers: MarkerSet,
    pub hidden: bool,
    pub on_cycle: bool,
    pub carries_transitive: bool,
}

impl Dependency {
    pub fn new(from: ItemId, to: ItemId, ct: u32) -> Self {
        Self {
            from,
            to,
            ct,
            questionable_ct: 0,
            bad_ct: 0,
            source: None,
            markers: MarkerSet::new(),
            hidden: false,
            on_cycle: false,
            carries_transitive: false,
        }
    }

    pub fn with_source(mut self, file: &str, line: u32) -> Self {
        self.source = Some(SourceLocation {
            file: file.to_string(),
            line,
        });
        self
    }

    pub fn is_self_loop(&self) -> bool {
        self.from == self.to
    }

    /// Fold another parallel edge (same endpoints) into this one.
    ///
    /// Counts sum, markers union, the first observed source location wins,
    /// flags combine with OR.
    pub fn absorb(&mut self, other: &Dependency) {
        debug_assert_eq!(self.from, other.from);
        debug_assert_eq!(self.to, other.to);
        self.ct = self.ct.saturating_add(other.ct);
        self.questionable_ct = self.questionable_ct.saturating_add(other.questionable_ct);
        self.bad_ct = self.bad_ct.saturating_add(other.bad_ct);
        if self.source.is_none() {
            self.source = other.source.clone();
        }
        self.markers.merge(&other.markers);
        self.hidden = self.hidden || other.hidden;
        self.on_cycle = self.on_cycle || other.on_cycle;
        self.carries_transitive = self.carries_transitive || other.carries_transitive;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_identity_ignores_markers() {
        let ty = ItemType::simple("module");
        let mut a = Item::flat(&ty, "core");
        let b = Item::flat(&ty, "core");
        a.markers.increment("seen", 1).expect("valid marker");
        assert_eq!(a, b);
    }

    #[test]
    fn item_identity_covers_type_and_fields() {
        let ty = ItemType::simple("module");
        let other_ty = ItemType::simple("assembly");
        let a = Item::flat(&ty, "core");
        assert_ne!(a, Item::flat(&other_ty, "core"));
        assert_ne!(a, Item::flat(&ty, "util"));
    }

    #[test]
    fn absorb_sums_counts_and_keeps_first_source() {
        let mut a = Dependency::new(ItemId(0), ItemId(1), 3).with_source("a.rs", 10);
        let b = Dependency::new(ItemId(0), ItemId(1), 2).with_source("b.rs", 20);
        a.absorb(&b);
        assert_eq!(a.ct, 5);
        assert_eq!(a.source.as_ref().map(|s| s.file.as_str()), Some("a.rs"));
    }

    #[test]
    fn dependency_round_trips_through_json() {
        let mut dep = Dependency::new(ItemId(1), ItemId(2), 7).with_source("lib.rs", 42);
        dep.markers.increment("checked", 2).expect("valid marker");
        let text = serde_json::to_string(&dep).expect("serialize dependency");
        let back: Dependency = serde_json::from_str(&text).expect("deserialize dependency");
        assert_eq!(dep, back);
    }
}
