//! Marker sets: countable tags on items and dependencies.
//!
//! A marker's weight is its occurrence count; removing all occurrences
//! removes the key. Plain markers carry no `/`; path markers such as `a/b`
//! record "reached via a path tagged a then b" and combine when edges are
//! merged (see [`combine`]).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::MarkerFormatError;
use crate::pattern::NamePattern;

/// Mapping from marker name to positive occurrence count.
///
/// Backed by a `BTreeMap` so iteration (and serialized output) is
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerSet {
    counts: BTreeMap<String, u32>,
}

/// Check a marker name against the allowed character set.
///
/// A name is one or more non-empty segments joined by `/`; each segment is
/// built from Unicode letters, digits, `_`, `.` and `-`.
pub fn validate_marker_name(name: &str) -> Result<(), MarkerFormatError> {
    let fail = |message: &str| MarkerFormatError {
        name: name.to_string(),
        message: message.to_string(),
    };
    if name.is_empty() {
        return Err(fail("marker name must not be empty"));
    }
    for segment in name.split('/') {
        if segment.is_empty() {
            return Err(fail("empty path segment"));
        }
        for ch in segment.chars() {
            if !(ch.is_alphanumeric() || ch == '_' || ch == '.' || ch == '-') {
                return Err(fail(&format!("character `{ch}` is not allowed")));
            }
        }
    }
    Ok(())
}

impl MarkerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count for a marker, 0 when absent.
    pub fn get(&self, name: &str) -> u32 {
        self.counts.get(name).copied().unwrap_or(0)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name) > 0
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.counts.iter().map(|(name, ct)| (name.as_str(), *ct))
    }

    /// Add `delta` occurrences of a marker, validating the name first.
    pub fn increment(&mut self, name: &str, delta: u32) -> Result<(), MarkerFormatError> {
        validate_marker_name(name)?;
        self.add_unchecked(name, delta);
        Ok(())
    }

    /// Add occurrences of an already-validated name.
    pub(crate) fn add_unchecked(&mut self, name: &str, delta: u32) {
        if delta == 0 {
            return;
        }
        let slot = self.counts.entry(name.to_string()).or_insert(0);
        *slot = slot.saturating_add(delta);
    }

    /// Drop every marker whose name matches any of the given patterns.
    /// Returns the number of keys removed.
    pub fn remove_matching(&mut self, patterns: &[NamePattern]) -> usize {
        let doomed: Vec<String> = self
            .counts
            .keys()
            .filter(|name| patterns.iter().any(|p| p.is_match(name)))
            .cloned()
            .collect();
        for name in &doomed {
            self.counts.remove(name);
        }
        doomed.len()
    }

    /// Per-key summed counts of both sets.
    pub fn merge(&mut self, other: &MarkerSet) {
        for (name, ct) in other.iter() {
            self.add_unchecked(name, ct);
        }
    }

    pub fn union(&self, other: &MarkerSet) -> MarkerSet {
        let mut out = self.clone();
        out.merge(other);
        out
    }

    /// Evaluate a predicate list against this set (all terms must hold).
    pub fn is_match(&self, predicate: &MarkerPredicate) -> bool {
        predicate.is_match(self)
    }
}

/// Split a path marker at its first `/`: `d/e/f` -> (`d`, `e/f`).
fn split_first(name: &str) -> Option<(&str, &str)> {
    name.split_once('/')
}

/// Combine the marker sets of a "left" and a "right" edge that are being
/// merged into one derived edge (transitive construction, simplification).
///
/// For every left path marker `L` and right path marker `R`: when the tail
/// of `L` (after its first `/`) equals the head of `R` (before its first
/// `/`), the pair chains into `prefix(L)/suffix(R)` with weight
/// `weight(L) * weight(R)`, and both partners are consumed. Plain markers
/// and unpartnered path markers copy through unchanged; duplicate result
/// names sum their counts.
pub fn combine(left: &MarkerSet, right: &MarkerSet) -> MarkerSet {
    let mut out = MarkerSet::new();
    let mut consumed_left: Vec<&str> = Vec::new();
    let mut consumed_right: Vec<&str> = Vec::new();

    for (lname, lct) in left.iter() {
        let Some((lprefix, ltail)) = split_first(lname) else {
            continue;
        };
        for (rname, rct) in right.iter() {
            let Some((rhead, rsuffix)) = split_first(rname) else {
                continue;
            };
            if ltail == rhead {
                out.add_unchecked(
                    &format!("{lprefix}/{rsuffix}"),
                    lct.saturating_mul(rct),
                );
                consumed_left.push(lname);
                consumed_right.push(rname);
            }
        }
    }

    for (name, ct) in left.iter() {
        if !consumed_left.contains(&name) {
            out.add_unchecked(name, ct);
        }
    }
    for (name, ct) in right.iter() {
        if !consumed_right.contains(&name) {
            out.add_unchecked(name, ct);
        }
    }
    out
}

/// One term of a marker predicate: `name` (present) or `~name` (absent).
#[derive(Debug, Clone, PartialEq, Eq)]
struct MarkerTerm {
    name: String,
    negated: bool,
}

/// Parsed marker predicate: terms joined by `&`, all of which must hold.
///
/// `a & ~b` matches sets where `a` is present and `b` absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerPredicate {
    terms: Vec<MarkerTerm>,
}

impl MarkerPredicate {
    pub fn parse(source: &str) -> Result<Self, MarkerFormatError> {
        let mut terms = Vec::new();
        for raw in source.split('&') {
            let raw = raw.trim();
            let (negated, name) = match raw.strip_prefix('~') {
                Some(rest) => (true, rest.trim()),
                None => (false, raw),
            };
            validate_marker_name(name)?;
            terms.push(MarkerTerm {
                name: name.to_string(),
                negated,
            });
        }
        Ok(Self { terms })
    }

    pub fn is_match(&self, set: &MarkerSet) -> bool {
        self.terms
            .iter()
            .all(|term| set.contains(&term.name) != term.negated)
    }
}
