//! Matchers for single items and single dependencies.
//!
//! An [`ItemMatch`] pairs per-field name patterns with an optional marker
//! predicate; a [`DependencyMatch`] adds endpoint matches, edge-marker
//! predicates and numeric count comparisons. Matching returns the captured
//! wildcard groups so rule right-hand sides can back-reference them.

use std::sync::Arc;

use crate::cache;
use crate::errors::{PatternSyntaxError, RuleError};
use crate::markers::MarkerPredicate;
use crate::pattern::NamePattern;
use crate::types::{Dependency, Item};

/// Matcher for a single item: one compiled pattern per item field plus an
/// optional marker predicate.
///
/// Source syntax: field patterns separated by single `:` (a `::` belongs to
/// the member part of a name pattern, not the field separator), optionally
/// followed by `'` and a marker predicate, e.g. `My.Stuff.*:*'tagged&~old`.
/// Missing trailing field patterns match anything.
#[derive(Debug, Clone)]
pub struct ItemMatch {
    field_patterns: Vec<Arc<NamePattern>>,
    markers: Option<MarkerPredicate>,
}

/// Split on single `:` while keeping `::` intact.
fn split_fields(source: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let chars: Vec<char> = source.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == ':' {
            if i + 1 < chars.len() && chars[i + 1] == ':' {
                current.push_str("::");
                i += 2;
                continue;
            }
            fields.push(std::mem::take(&mut current));
            i += 1;
        } else {
            current.push(chars[i]);
            i += 1;
        }
    }
    fields.push(current);
    fields
}

impl ItemMatch {
    /// Parse an item matcher from rule text.
    pub fn parse(source: &str) -> Result<Self, RuleError> {
        let (name_part, marker_part) = match source.split_once('\'') {
            Some((n, m)) => (n, Some(m)),
            None => (source, None),
        };
        let mut field_patterns = Vec::new();
        for field in split_fields(name_part) {
            field_patterns.push(cache::compiled(&field)?);
        }
        let markers = match marker_part {
            Some(m) => Some(MarkerPredicate::parse(m)?),
            None => None,
        };
        Ok(Self {
            field_patterns,
            markers,
        })
    }

    /// Matcher that accepts any item (used for `.` in path patterns).
    pub fn any() -> Self {
        Self {
            field_patterns: Vec::new(),
            markers: None,
        }
    }

    /// Match an item; on success return the wildcard captures of all field
    /// patterns in order.
    pub fn matches(&self, item: &Item) -> Option<Vec<String>> {
        if self.field_patterns.len() > item.fields().len() {
            return None;
        }
        let mut captures = Vec::new();
        for (pattern, field) in self.field_patterns.iter().zip(item.fields()) {
            let caps = pattern.matches(field)?;
            captures.extend(caps);
        }
        if let Some(predicate) = &self.markers {
            if !item.markers.is_match(predicate) {
                return None;
            }
        }
        Some(captures)
    }

    pub fn is_match(&self, item: &Item) -> bool {
        self.matches(item).is_some()
    }
}

/// Which count on a dependency a comparison applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountField {
    Ct,
    Questionable,
    Bad,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

/// Numeric comparison against a dependency count, e.g. `ct>100`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountPredicate {
    pub field: CountField,
    pub op: CmpOp,
    pub value: u32,
}

impl CountPredicate {
    pub fn parse(source: &str) -> Result<Self, PatternSyntaxError> {
        let fail = |message: &str| PatternSyntaxError {
            fragment: source.to_string(),
            message: message.to_string(),
        };
        let trimmed = source.trim();
        let op_at = trimmed
            .find(|c| matches!(c, '<' | '>' | '=' | '!'))
            .ok_or_else(|| fail("expected a comparison operator"))?;
        let (field_text, rest) = trimmed.split_at(op_at);
        let field = match field_text.trim() {
            "ct" => CountField::Ct,
            "questionable" => CountField::Questionable,
            "bad" => CountField::Bad,
            other => return Err(fail(&format!("unknown count field `{other}`"))),
        };
        let (op, value_text) = if let Some(v) = rest.strip_prefix("<=") {
            (CmpOp::Le, v)
        } else if let Some(v) = rest.strip_prefix(">=") {
            (CmpOp::Ge, v)
        } else if let Some(v) = rest.strip_prefix("!=") {
            (CmpOp::Ne, v)
        } else if let Some(v) = rest.strip_prefix('<') {
            (CmpOp::Lt, v)
        } else if let Some(v) = rest.strip_prefix('>') {
            (CmpOp::Gt, v)
        } else if let Some(v) = rest.strip_prefix('=') {
            (CmpOp::Eq, v)
        } else {
            return Err(fail("expected one of < <= > >= = !="));
        };
        let value: u32 = value_text
            .trim()
            .parse()
            .map_err(|_| fail("expected a non-negative integer"))?;
        Ok(Self { field, op, value })
    }

    pub fn is_match(&self, dep: &Dependency) -> bool {
        let actual = match self.field {
            CountField::Ct => dep.ct,
            CountField::Questionable => dep.questionable_ct,
            CountField::Bad => dep.bad_ct,
        };
        match self.op {
            CmpOp::Lt => actual < self.value,
            CmpOp::Le => actual <= self.value,
            CmpOp::Gt => actual > self.value,
            CmpOp::Ge => actual >= self.value,
            CmpOp::Eq => actual == self.value,
            CmpOp::Ne => actual != self.value,
        }
    }
}

/// Matcher for a single dependency edge.
#[derive(Debug, Clone, Default)]
pub struct DependencyMatch {
    using: Option<ItemMatch>,
    used: Option<ItemMatch>,
    markers: Option<MarkerPredicate>,
    counts: Vec<CountPredicate>,
}

impl DependencyMatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Matcher that accepts any dependency (used for `:` in path patterns).
    pub fn any() -> Self {
        Self::default()
    }

    /// Parse the compact arrow form: `using -> used`, or
    /// `using -[clauses]> used` where clauses are `&`-joined count
    /// comparisons and marker terms applying to the edge, e.g.
    /// `app.** -[ct>10 & ~checked]> infra.**`.
    ///
    /// Either endpoint may be empty to match any item.
    pub fn parse(source: &str) -> Result<Self, RuleError> {
        let fail = |message: &str| PatternSyntaxError {
            fragment: source.to_string(),
            message: message.to_string(),
        };

        let (lhs, clauses, rhs) = if let Some(open) = source.find("-[") {
            let close = source[open..]
                .find("]>")
                .map(|off| open + off)
                .ok_or_else(|| fail("unterminated `-[` edge clause"))?;
            (
                &source[..open],
                Some(&source[open + 2..close]),
                &source[close + 2..],
            )
        } else if let Some((l, r)) = source.split_once("->") {
            (l, None, r)
        } else {
            return Err(fail("expected `->` between the endpoint matchers").into());
        };

        let mut matcher = DependencyMatch::new();
        let lhs = lhs.trim();
        let rhs = rhs.trim();
        if !lhs.is_empty() {
            matcher.using = Some(ItemMatch::parse(lhs)?);
        }
        if !rhs.is_empty() {
            matcher.used = Some(ItemMatch::parse(rhs)?);
        }
        if let Some(clauses) = clauses {
            let mut marker_terms: Vec<&str> = Vec::new();
            for clause in clauses.split('&').map(str::trim) {
                if clause.is_empty() {
                    continue;
                }
                if clause.contains(['<', '>', '=', '!']) {
                    matcher.counts.push(CountPredicate::parse(clause)?);
                } else {
                    marker_terms.push(clause);
                }
            }
            if !marker_terms.is_empty() {
                matcher.markers = Some(MarkerPredicate::parse(&marker_terms.join("&"))?);
            }
        }
        Ok(matcher)
    }

    pub fn with_using(mut self, using: ItemMatch) -> Self {
        self.using = Some(using);
        self
    }

    pub fn with_used(mut self, used: ItemMatch) -> Self {
        self.used = Some(used);
        self
    }

    pub fn with_marker_predicate(mut self, predicate: MarkerPredicate) -> Self {
        self.markers = Some(predicate);
        self
    }

    pub fn with_count(mut self, predicate: CountPredicate) -> Self {
        self.counts.push(predicate);
        self
    }

    /// Match one edge given its resolved endpoints; on success return the
    /// using-side captures followed by the used-side captures.
    pub fn matches(&self, dep: &Dependency, using: &Item, used: &Item) -> Option<Vec<String>> {
        let mut captures = Vec::new();
        if let Some(m) = &self.using {
            captures.extend(m.matches(using)?);
        }
        if let Some(m) = &self.used {
            captures.extend(m.matches(used)?);
        }
        if let Some(predicate) = &self.markers {
            if !dep.markers.is_match(predicate) {
                return None;
            }
        }
        if !self.counts.iter().all(|c| c.is_match(dep)) {
            return None;
        }
        Some(captures)
    }

    pub fn is_match(&self, dep: &Dependency, using: &Item, used: &Item) -> bool {
        self.matches(dep, using, used).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ItemId, ItemType};

    fn module(name: &str) -> Item {
        Item::flat(&ItemType::simple("module"), name)
    }

    #[test]
    fn item_match_on_flat_name() {
        let m = ItemMatch::parse("app.core.*").expect("valid matcher");
        let caps = m.matches(&module("app.core.db")).expect("should match");
        assert_eq!(caps, vec!["db".to_string()]);
        assert!(!m.is_match(&module("app.web.db")));
    }

    #[test]
    fn item_match_with_marker_predicate() {
        let m = ItemMatch::parse("app.**'entry").expect("valid matcher");
        let mut item = module("app.main");
        assert!(!m.is_match(&item));
        item.markers.increment("entry", 1).expect("valid marker");
        assert!(m.is_match(&item));
    }

    #[test]
    fn per_field_patterns_split_on_single_colon() {
        let ty = ItemType::qualified("member");
        let item = Item::new(&ty, vec!["app.core".to_string(), "Db::open".to_string()]);
        let m = ItemMatch::parse("app.*:Db::open").expect("valid matcher");
        assert!(m.is_match(&item));
    }

    #[test]
    fn too_many_field_patterns_never_match() {
        let m = ItemMatch::parse("a:b:c").expect("valid matcher");
        assert!(!m.is_match(&module("a")));
    }

    #[test]
    fn count_predicate_parse_and_eval() {
        let p = CountPredicate::parse("ct>=5").expect("valid predicate");
        let mut dep = Dependency::new(ItemId(0), ItemId(1), 5);
        assert!(p.is_match(&dep));
        dep.ct = 4;
        assert!(!p.is_match(&dep));
        assert!(CountPredicate::parse("bogus>1").is_err());
        assert!(CountPredicate::parse("ct?1").is_err());
    }

    #[test]
    fn dependency_match_arrow_form() {
        let m = DependencyMatch::parse("app.** -> infra.**").expect("valid matcher");
        let dep = Dependency::new(ItemId(0), ItemId(1), 1);
        assert!(m.is_match(&dep, &module("app.main"), &module("infra.db")));
        assert!(!m.is_match(&dep, &module("infra.db"), &module("app.main")));
    }

    #[test]
    fn dependency_match_edge_clauses() {
        let m = DependencyMatch::parse("app.** -[ct>10 & ~checked]> infra.**")
            .expect("valid matcher");
        let mut dep = Dependency::new(ItemId(0), ItemId(1), 11);
        let from = module("app.main");
        let to = module("infra.db");
        assert!(m.is_match(&dep, &from, &to));
        dep.markers.increment("checked", 1).expect("valid marker");
        assert!(!m.is_match(&dep, &from, &to));
        dep.ct = 10;
        assert!(!m.is_match(&dep, &from, &to));
    }

    #[test]
    fn empty_endpoints_match_any_item() {
        let m = DependencyMatch::parse("-> infra.**").expect("valid matcher");
        let dep = Dependency::new(ItemId(0), ItemId(1), 1);
        assert!(m.is_match(&dep, &module("anything.at.all"), &module("infra.db")));
    }

    #[test]
    fn captures_concatenate_both_endpoints() {
        let m = DependencyMatch::parse("app.* -> infra.*").expect("valid matcher");
        let dep = Dependency::new(ItemId(0), ItemId(1), 1);
        let caps = m
            .matches(&dep, &module("app.main"), &module("infra.db"))
            .expect("should match");
        assert_eq!(caps, vec!["main".to_string(), "db".to_string()]);
    }
}
