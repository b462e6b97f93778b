//! # deprules
//!
//! **Rule-based dependency-graph analyzer** - pattern matching and
//! transformation passes over item/dependency graphs extracted from a
//! codebase.
//!
//! A graph is a set of interned items (typed, with colon-separated name
//! fields) connected by counted dependencies. Rules classify edges,
//! wildcard patterns select items, path regexes describe multi-hop routes,
//! and transformation passes rewrite the graph in place: cycle marking,
//! transitive-shortcut hiding, pure-sink hiding, and minimum cuts.
//!
//! ## Quick Start (Library Usage)
//!
//! ```rust
//! use deprules::{DependencyGraph, Item, ItemMatch, ItemType};
//!
//! let module = ItemType::simple("module");
//! let mut graph = DependencyGraph::new();
//! graph.add_edge(
//!     Item::flat(&module, "app.main"),
//!     Item::flat(&module, "infra.db"),
//!     3,
//! );
//!
//! let matcher = ItemMatch::parse("app.**").unwrap();
//! assert_eq!(graph.match_items(&matcher).len(), 1);
//! ```
//!
//! ## Checking Rules
//!
//! ```rust
//! use deprules::matching::DependencyMatch;
//! use deprules::rules::{DependencyRule, Severity, check};
//! use deprules::{DependencyGraph, Item, ItemType};
//!
//! let module = ItemType::simple("module");
//! let mut graph = DependencyGraph::new();
//! graph.add_edge(
//!     Item::flat(&module, "ui.view"),
//!     Item::flat(&module, "db.table"),
//!     7,
//! );
//!
//! let rules = vec![DependencyRule::new(
//!     DependencyMatch::parse("ui.** -> db.**").unwrap(),
//!     Severity::Forbidden,
//! )];
//! let totals = check(&mut graph, &rules);
//! assert_eq!(totals.forbidden, 1);
//! ```

// ============================================================================
// Core Modules
// ============================================================================

/// Process-wide cache of compiled name patterns.
pub mod cache;

/// Optional `.deprules/config.toml` loading.
pub mod config;

/// Error types for pattern, marker, path-regex and cut failures.
///
/// The umbrella [`RuleError`](errors::RuleError) wraps every specific kind.
pub mod errors;

/// The mutable dependency graph: item arena, interning, edge list.
pub mod graph;

/// Marker sets and the marker combination algebra.
///
/// # Key Types
///
/// - [`MarkerSet`](markers::MarkerSet) - named counters on items and edges
/// - [`MarkerPredicate`](markers::MarkerPredicate) - `a & ~b` conditions
pub mod markers;

/// Item and dependency matchers built from wildcard patterns.
///
/// - [`ItemMatch`](matching::ItemMatch) - per-field patterns plus marker predicate
/// - [`DependencyMatch`](matching::DependencyMatch) - `lhs -> rhs` arrow forms
/// - [`CountPredicate`](matching::CountPredicate) - `ct >= 5` conditions
pub mod matching;

/// Wildcard name patterns compiled to anchored regex alternatives.
///
/// `*` captures one identifier, `**` a chain of them; a leading `^` takes
/// the fragment as raw regex.
pub mod pattern;

/// Path regexes: automata over alternating item/dependency matches.
///
/// # Key Types
///
/// - [`PathRegex`] - compiled automaton, run with `find_paths`/`matches_path`
/// - [`PathMatch`] - one concrete item/edge route through the graph
/// - [`Definitions`] - named matchers a pattern may reference
pub mod pathregex;

/// Ordered dependency rules and the checking pass.
pub mod rules;

/// Graph transformation passes (cycles, transitive, sinks, min-cut).
pub mod transform;

/// Common types: items, dependencies, ids, source locations.
pub mod types;

// ============================================================================
// Re-exports for convenience
// ============================================================================

/// The mutable graph all passes operate on.
pub use graph::DependencyGraph;

/// Named counters carried by items and edges.
pub use markers::MarkerSet;

/// Item matcher (field patterns plus optional marker predicate).
pub use matching::ItemMatch;

/// Dependency matcher (`using -> used` with markers and counts).
pub use matching::DependencyMatch;

/// Named matchers referenced from path patterns.
pub use pathregex::Definitions;

/// One concrete path found in the graph.
pub use pathregex::PathMatch;

/// Item or dependency matcher behind a path-pattern name.
pub use pathregex::PathMatcher;

/// Compiled path automaton.
pub use pathregex::PathRegex;

/// Compiled wildcard name pattern.
pub use pattern::NamePattern;

/// Umbrella error for every failure this crate reports.
pub use errors::RuleError;

pub use types::{DepId, Dependency, Item, ItemId, ItemType, SourceLocation};
