//! Element tree for path patterns, with chaining validation.
//!
//! A path pattern is a sequence alternating item-sets and dependency-sets.
//! Every element reports whether it starts/ends with an item-match and
//! whether it can match the empty sequence; validation checks that
//! adjacent elements alternate kinds and that repetition seams alternate
//! too, so a compiled pattern can never skip a hop.

use std::sync::Arc;

use crate::errors::PathRegexValidationError;
use crate::matching::{DependencyMatch, ItemMatch};
use crate::types::{Dependency, Item};

/// An inclusive or exclusive set of matchers of one kind.
///
/// An empty inclusive set matches anything (the `.` / `:` atoms); empty
/// exclusive sets are rejected by the parser.
#[derive(Debug, Clone)]
pub(crate) struct SetMatcher<M> {
    pub matchers: Vec<Arc<M>>,
    pub exclusive: bool,
    pub label: String,
}

impl SetMatcher<ItemMatch> {
    pub fn matches_item(&self, item: &Item) -> bool {
        if self.matchers.is_empty() {
            return !self.exclusive;
        }
        let any = self.matchers.iter().any(|m| m.is_match(item));
        any != self.exclusive
    }
}

impl SetMatcher<DependencyMatch> {
    pub fn matches_dep(&self, dep: &Dependency, using: &Item, used: &Item) -> bool {
        if self.matchers.is_empty() {
            return !self.exclusive;
        }
        let any = self.matchers.iter().any(|m| m.is_match(dep, using, used));
        any != self.exclusive
    }
}

/// One node of the parsed path pattern.
#[derive(Debug, Clone)]
pub(crate) enum Element {
    ItemSet(SetMatcher<ItemMatch>),
    DepSet(SetMatcher<DependencyMatch>),
    Sequence(Vec<Element>),
    Optional(Box<Element>),
    ZeroOrMore(Box<Element>),
    OneOrMore(Box<Element>),
}

/// Chaining info of one element, computed during validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Chaining {
    pub starts_with_item: bool,
    pub ends_with_item: bool,
    pub can_be_empty: bool,
}

impl Element {
    /// Human-readable rendering for error messages.
    pub fn describe(&self) -> String {
        match self {
            Element::ItemSet(s) => s.label.clone(),
            Element::DepSet(s) => s.label.clone(),
            Element::Sequence(children) => children
                .iter()
                .map(Element::describe)
                .collect::<Vec<_>>()
                .join(" "),
            Element::Optional(inner) => format!("({})?", inner.describe()),
            Element::ZeroOrMore(inner) => format!("({})*", inner.describe()),
            Element::OneOrMore(inner) => format!("({})+", inner.describe()),
        }
    }

    /// Compute chaining info, failing on any kind-alternation violation.
    pub fn chaining(&self) -> Result<Chaining, PathRegexValidationError> {
        match self {
            Element::ItemSet(_) => Ok(Chaining {
                starts_with_item: true,
                ends_with_item: true,
                can_be_empty: false,
            }),
            Element::DepSet(_) => Ok(Chaining {
                starts_with_item: false,
                ends_with_item: false,
                can_be_empty: false,
            }),
            Element::Sequence(children) => chain_sequence(children),
            Element::Optional(inner) => {
                let c = inner.chaining()?;
                Ok(Chaining {
                    can_be_empty: true,
                    ..c
                })
            }
            Element::ZeroOrMore(inner) => {
                let c = check_repetition_seam(inner)?;
                Ok(Chaining {
                    can_be_empty: true,
                    ..c
                })
            }
            Element::OneOrMore(inner) => check_repetition_seam(inner),
        }
    }
}

fn kind_name(is_item: bool) -> &'static str {
    if is_item { "item" } else { "dependency" }
}

/// A repeated group must alternate across its seam: repeating it must not
/// put two matches of the same kind back to back.
fn check_repetition_seam(inner: &Element) -> Result<Chaining, PathRegexValidationError> {
    let c = inner.chaining()?;
    if c.ends_with_item == c.starts_with_item {
        return Err(PathRegexValidationError {
            left: inner.describe(),
            right: inner.describe(),
            reason: format!(
                "a repeated group ends with an {} match and restarts with an {} match; \
                 repetition would skip a hop",
                kind_name(c.ends_with_item),
                kind_name(c.starts_with_item),
            ),
        });
    }
    Ok(c)
}

fn chain_sequence(children: &[Element]) -> Result<Chaining, PathRegexValidationError> {
    let mut prev: Option<(&Element, bool)> = None;
    let mut starts_with_item = true;
    let mut all_empty = true;

    for child in children {
        let c = child.chaining()?;
        match prev {
            None => starts_with_item = c.starts_with_item,
            Some((prev_el, prev_end)) => {
                if c.starts_with_item == prev_end {
                    let missing = kind_name(!prev_end);
                    return Err(PathRegexValidationError {
                        left: prev_el.describe(),
                        right: child.describe(),
                        reason: format!("missing {missing} between adjacent patterns"),
                    });
                }
            }
        }
        if c.can_be_empty && c.starts_with_item == c.ends_with_item {
            // Skipping the element must leave its neighbors facing the
            // same kind they would face when it matches.
            return Err(PathRegexValidationError {
                left: prev
                    .map(|(el, _)| el.describe())
                    .unwrap_or_else(|| "start of pattern".to_string()),
                right: child.describe(),
                reason: "a possibly-empty element must start and end with different \
                         pattern kinds"
                    .to_string(),
            });
        }
        if !c.can_be_empty {
            all_empty = false;
        }
        prev = Some((child, c.ends_with_item));
    }

    let ends_with_item = prev.map(|(_, end)| end).unwrap_or(true);
    Ok(Chaining {
        starts_with_item,
        ends_with_item,
        can_be_empty: all_empty,
    })
}

/// Validate a whole path pattern: alternation throughout, and the pattern
/// as a whole must start and end with an item-match and match at least one
/// item.
pub(crate) fn validate(root: &Element) -> Result<Chaining, PathRegexValidationError> {
    let c = root.chaining()?;
    if !c.starts_with_item {
        return Err(PathRegexValidationError {
            left: "start of pattern".to_string(),
            right: root.describe(),
            reason: "a path pattern must start with an item match".to_string(),
        });
    }
    if !c.ends_with_item {
        return Err(PathRegexValidationError {
            left: root.describe(),
            right: "end of pattern".to_string(),
            reason: "a path pattern must end with an item match".to_string(),
        });
    }
    if c.can_be_empty {
        return Err(PathRegexValidationError {
            left: root.describe(),
            right: "end of pattern".to_string(),
            reason: "a path pattern must match at least one item".to_string(),
        });
    }
    Ok(c)
}
