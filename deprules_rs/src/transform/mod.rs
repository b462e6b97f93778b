//! Graph transformation passes.
//!
//! Each pass takes a mutable [`DependencyGraph`](crate::graph::DependencyGraph)
//! and rewrites edge flags or markers in place: cycle marking, hiding of
//! transitive shortcut edges, hiding of edges into pure sinks, and a
//! max-flow minimum cut between two item sets. Passes compose; run them
//! after [`aggregate`](crate::graph::DependencyGraph::aggregate) so edge
//! ids stay stable.

pub mod cycles;
pub mod mincut;
pub mod sinks;
pub mod transitive;

pub use cycles::{CycleOptions, mark_cycles};
pub use mincut::{CutCapacity, CutResult, minimum_cut};
pub use sinks::{SinkOptions, hide_pure_sinks};
pub use transitive::hide_transitive_edges;
