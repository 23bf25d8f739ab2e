// src/pipeline/diagnostics.rs

use crate::model::validation::Validated;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{info, warn};

/// Non-fatal conditions a reviewer should see counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum IssueKind {
    /// Row dropped because its ProductKey could not be completed.
    UnresolvableKey,
    /// Division by zero or a non-finite value replaced by its default.
    NumericDegeneracy,
    /// Left join without a match; the derived field took its default.
    JoinMismatch,
    /// Malformed input field coerced to null or zero, row kept.
    CoercedField,
    /// Purchase received before it was ordered.
    NegativeLeadTime,
    /// Backfill donor table mapped one key to several values.
    AmbiguousBackfill,
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticRow {
    #[serde(rename = "Stage")]
    pub stage: String,
    #[serde(rename = "Kind")]
    pub kind: IssueKind,
    #[serde(rename = "Detail")]
    pub detail: String,
    #[serde(rename = "Count")]
    pub count: usize,
}

/// Per-stage tally of every row-level issue.
#[derive(Debug, Clone)]
pub struct StageDiagnostics {
    stage: &'static str,
    counts: BTreeMap<(IssueKind, String), usize>,
}

impl StageDiagnostics {
    pub fn new(stage: &'static str) -> Self {
        Self {
            stage,
            counts: BTreeMap::new(),
        }
    }

    pub fn record(&mut self, kind: IssueKind, detail: impl Into<String>) {
        self.record_n(kind, detail, 1);
    }

    pub fn record_n(&mut self, kind: IssueKind, detail: impl Into<String>, n: usize) {
        if n == 0 {
            return;
        }
        *self.counts.entry((kind, detail.into())).or_insert(0) += n;
    }

    /// Records `value` under `kind` when it is anything but `Valid`.
    pub fn note<T>(&mut self, kind: IssueKind, field: &str, value: &Validated<T>) {
        if let Some(reason) = value.reason() {
            self.record(kind, format!("{}: {}", field, reason));
        }
    }

    pub fn count(&self, kind: IssueKind) -> usize {
        self.counts
            .iter()
            .filter(|((k, _), _)| *k == kind)
            .map(|(_, n)| n)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn rows(&self) -> Vec<DiagnosticRow> {
        self.counts
            .iter()
            .map(|((kind, detail), count)| DiagnosticRow {
                stage: self.stage.to_string(),
                kind: *kind,
                detail: detail.clone(),
                count: *count,
            })
            .collect()
    }

    pub fn log_summary(&self) {
        if self.is_empty() {
            info!(stage = self.stage, "no row-level issues");
            return;
        }
        for ((kind, detail), count) in &self.counts {
            warn!(stage = self.stage, kind = %kind, count, "{}", detail);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_accumulate_per_kind_and_detail() {
        let mut diag = StageDiagnostics::new("prepare");
        diag.record(IssueKind::UnresolvableKey, "purchase without size");
        diag.record(IssueKind::UnresolvableKey, "purchase without size");
        diag.record_n(IssueKind::JoinMismatch, "sale without purchase price", 3);
        diag.record_n(IssueKind::JoinMismatch, "ignored", 0);

        assert_eq!(diag.count(IssueKind::UnresolvableKey), 2);
        assert_eq!(diag.count(IssueKind::JoinMismatch), 3);
        assert_eq!(diag.count(IssueKind::NumericDegeneracy), 0);
        assert_eq!(diag.rows().len(), 2);
    }

    #[test]
    fn note_skips_valid_values() {
        let mut diag = StageDiagnostics::new("optimize");
        diag.note(IssueKind::NumericDegeneracy, "EOQ", &Validated::Valid(3u64));
        assert!(diag.is_empty());
        diag.note(
            IssueKind::NumericDegeneracy,
            "EOQ",
            &Validated::Clamped {
                value: 0u64,
                reason: "non-finite result",
            },
        );
        assert_eq!(diag.rows()[0].detail, "EOQ: non-finite result");
    }
}
