//! Dependency rules: classify every edge by the first matching rule.
//!
//! A ruleset is an ordered list; each visible edge takes the severity of
//! the first rule whose matcher accepts it. Forbidden edges copy their
//! full count into `bad_ct`, questionable ones into `questionable_ct`,
//! and unmatched edges are left untouched.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::graph::DependencyGraph;
use crate::matching::DependencyMatch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Ok,
    Questionable,
    Forbidden,
}

#[derive(Debug, Clone)]
pub struct DependencyRule {
    pub matcher: DependencyMatch,
    pub severity: Severity,
}

impl DependencyRule {
    pub fn new(matcher: DependencyMatch, severity: Severity) -> Self {
        Self { matcher, severity }
    }
}

/// Totals from one checking pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CheckTotals {
    /// Edges any rule matched.
    pub checked: usize,
    pub forbidden: usize,
    pub questionable: usize,
    pub ok: usize,
}

/// Run the ruleset over every visible edge. Returns per-severity totals.
pub fn check(graph: &mut DependencyGraph, rules: &[DependencyRule]) -> CheckTotals {
    let mut totals = CheckTotals::default();
    let visible: Vec<_> = graph.visible().map(|(id, _)| id).collect();
    for id in visible {
        let severity = {
            let dep = graph.dependency(id);
            let using = graph.item(dep.from);
            let used = graph.item(dep.to);
            rules
                .iter()
                .find(|rule| rule.matcher.matches(dep, using, used).is_some())
                .map(|rule| rule.severity)
        };
        let Some(severity) = severity else { continue };
        totals.checked += 1;
        let dep = graph.dependency_mut(id);
        match severity {
            Severity::Forbidden => {
                dep.bad_ct = dep.ct;
                totals.forbidden += 1;
            }
            Severity::Questionable => {
                dep.questionable_ct = dep.ct;
                totals.questionable += 1;
            }
            Severity::Ok => totals.ok += 1,
        }
    }
    info!(
        checked = totals.checked,
        forbidden = totals.forbidden,
        questionable = totals.questionable,
        "rule check finished"
    );
    totals
}
