//! Path regexes: automata over alternating item/dependency matches.
//!
//! A path pattern like `. (: [^forbidden])* target` describes multi-hop
//! paths through the graph: `.` matches any single item, `:` any single
//! dependency, `[...]`/`[^...]` inclusive/exclusive sets of named matchers,
//! and groups take `?`/`*`/`+` postfixes. Construction parses the source
//! into an element tree, validates that item- and dependency-matches
//! alternate all the way through, then compiles a deterministic execution
//! graph that is matched directly against the live graph.

use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::RuleError;
use crate::matching::{DependencyMatch, ItemMatch};

mod ast;
mod exec;
mod parse;

pub use exec::{PathMatch, PathRegex};

/// What a bare name in a path pattern resolves to.
#[derive(Debug, Clone)]
pub enum PathMatcher {
    Item(Arc<ItemMatch>),
    Dependency(Arc<DependencyMatch>),
}

impl PathMatcher {
    pub fn item(matcher: ItemMatch) -> Self {
        Self::Item(Arc::new(matcher))
    }

    pub fn dependency(matcher: DependencyMatch) -> Self {
        Self::Dependency(Arc::new(matcher))
    }
}

/// Named item/dependency matches a path pattern may reference.
pub type Definitions = HashMap<String, PathMatcher>;

impl PathRegex {
    /// Parse, validate and compile a path pattern.
    pub fn compile(source: &str, definitions: &Definitions) -> Result<Self, RuleError> {
        let root = parse::parse(source, definitions)?;
        ast::validate(&root)?;
        Ok(exec::build_automaton(source, &root))
    }
}
