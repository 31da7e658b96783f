//! Change classification, changelog and issue body rendering.

use std::fmt::Write as _;

use regex::Regex;
use serde::Serialize;
use tracing::warn;

use depup::{CommitRecord, DepupError, VcsKind};

use crate::update::ChangeDirection;

const ISSUE_PATTERN: &str = r"(?i)\b(issue|fixes)\s+(\d+)\b";
const NOISSUE_PATTERN: &str = r"(?i)^noissue\b";

/// Sorts commits into issue references and "noissue" changes.
pub struct IssueClassifier {
    issue: Regex,
    noissue: Regex,
}

/// Issue IDs referenced by a change list, plus the commits without one.
#[derive(Debug, Default, PartialEq)]
pub struct IssueSummary {
    /// Distinct IDs in ascending numeric order.
    pub issue_ids: Vec<String>,
    pub noissues: Vec<CommitRecord>,
}

impl IssueClassifier {
    pub fn new() -> Result<Self, DepupError> {
        Ok(IssueClassifier {
            issue: compile(ISSUE_PATTERN)?,
            noissue: compile(NOISSUE_PATTERN)?,
        })
    }

    /// Issue number referenced by `message`, if any. The first reference wins.
    pub fn issue_id(&self, message: &str) -> Option<String> {
        self.issue
            .captures(message)
            .and_then(|caps| caps.get(2))
            .map(|m| normalize_id(m.as_str()))
    }

    pub fn classify(&self, changes: &[CommitRecord]) -> IssueSummary {
        let mut summary = IssueSummary::default();
        for change in changes {
            match self.issue_id(&change.message) {
                Some(id) => summary.issue_ids.push(id),
                None => {
                    if !self.noissue.is_match(&change.message) {
                        warn!(
                            hash = %change.hash,
                            message = %change.message,
                            "No issue reference in commit message"
                        );
                    }
                    summary.noissues.push(change.clone());
                }
            }
        }
        summary.issue_ids.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
        summary.issue_ids.dedup();
        summary
    }
}

fn compile(pattern: &str) -> Result<Regex, DepupError> {
    Regex::new(pattern).map_err(|source| DepupError::InvalidRegex {
        pattern: pattern.to_string(),
        source,
    })
}

/// Strip leading zeros so `0042` and `42` name the same ticket.
fn normalize_id(digits: &str) -> String {
    let trimmed = digits.trim_start_matches('0');
    if trimmed.is_empty() { "0".to_string() } else { trimmed.to_string() }
}

/// One `( HASH ) : MESSAGE (by AUTHOR)` line per change, in list order.
pub fn changelog(changes: &[CommitRecord]) -> String {
    let mut out = String::new();
    for change in changes {
        let _ = writeln!(out, "( {} ) : {} (by {})", change.hash, change.message, change.author);
    }
    out
}

/// Flat context handed to issue body renderers.
#[derive(Serialize, Debug)]
pub struct ReportContext {
    pub repository: String,
    /// Current manifest line.
    pub old: String,
    /// Replacement manifest line.
    pub new: String,
    pub hg_hash: String,
    pub git_hash: String,
    pub issue_ids: Vec<String>,
    pub noissues: Vec<CommitRecord>,
    pub direction: ChangeDirection,
}

impl ReportContext {
    pub fn new(
        repository: &str,
        (old, new): (String, String),
        target: &CommitRecord,
        summary: IssueSummary,
        direction: ChangeDirection,
    ) -> Self {
        ReportContext {
            repository: repository.to_string(),
            old,
            new,
            hg_hash: target.hash_for(VcsKind::Mercurial).to_string(),
            git_hash: target.hash_for(VcsKind::Git).to_string(),
            issue_ids: summary.issue_ids,
            noissues: summary.noissues,
            direction,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Issue body in Trac wiki markup.
    pub fn render_trac(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "=== Background ===\n");
        let _ = writeln!(
            out,
            "Update `{}` to pick up the changes listed below.",
            self.repository
        );
        if self.direction == ChangeDirection::Downgrade {
            let _ = writeln!(out, "\n'''Note:''' this reverts `{}` to an older revision.", self.repository);
        }

        let _ = writeln!(out, "\n=== Included changes in `{}` ===\n", self.repository);
        if self.issue_ids.is_empty() {
            let _ = writeln!(out, "No referenced issues.");
        } else {
            let _ = writeln!(
                out,
                "[[TicketQuery(id={}&order=id,format=table,col=summary|component)]]",
                self.issue_ids.join(",")
            );
        }

        if !self.noissues.is_empty() {
            let _ = writeln!(out, "\nChanges without an issue reference:\n");
            let _ = writeln!(out, "||= hg =||= git =||= Message =||");
            for change in &self.noissues {
                let _ = writeln!(
                    out,
                    "|| {} || {} || {} ||",
                    link(change.primary_url.as_deref(), &change.hash),
                    link(change.mirror_url.as_deref(), &change.mirror_hash),
                    change.message
                );
            }
        }

        let _ = writeln!(out, "\n=== What to change ===\n");
        let _ = writeln!(out, "Update the `{}` dependency:", self.repository);
        let _ = writeln!(out, "{{{{{{\n#!diff\n-{}\n+{}\n}}}}}}", self.old, self.new);

        let _ = writeln!(out, "\n=== Integration notes ===\n\nNone.");
        let _ = write!(out, "\n=== Hints for testers ===\n\nNone.\n");
        out
    }
}

fn link(url: Option<&str>, label: &str) -> String {
    match url {
        Some(url) if label != depup::NO_MIRROR => format!("[{} {}]", url, label),
        _ => label.to_string(),
    }
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;
