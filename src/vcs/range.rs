//! Revision ranges: each backend's spelling of "the commits after `from` up
//! to and including `to`", plus the post-processing that makes both return
//! the same shape.
//!
//! | Backend   | log selection                     | raw order    | normalization              |
//! |-----------|-----------------------------------|--------------|----------------------------|
//! | Mercurial | `sort('from'::'to', -rev)`        | newest-first | drop `from` (last), reverse |
//! | Git       | `--reverse from..to`              | oldest-first | none                       |
//!
//! Either way the result is oldest-first, excludes `from` and includes `to`;
//! `from == to` yields an empty list.

use crate::CommitRecord;
use crate::vcs::VcsKind;

/// A `from → to` revision range bound to one backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RevisionRange {
    kind: VcsKind,
    from: String,
    to: String,
}

impl RevisionRange {
    pub fn new(kind: VcsKind, from: impl Into<String>, to: impl Into<String>) -> Self {
        RevisionRange {
            kind,
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn start(&self) -> &str {
        &self.from
    }

    pub fn end(&self) -> &str {
        &self.to
    }

    /// The same range walked the other way (used to probe for downgrades).
    #[must_use]
    pub fn reversed(&self) -> Self {
        RevisionRange::new(self.kind, self.to.clone(), self.from.clone())
    }

    /// Revision-selection arguments for `log`.
    pub fn log_args(&self) -> Vec<String> {
        match self.kind {
            VcsKind::Mercurial => vec![
                "-r".to_string(),
                format!(
                    "sort({}::{}, -rev)",
                    quote_revset(&self.from),
                    quote_revset(&self.to)
                ),
            ],
            VcsKind::Git => vec![
                "--reverse".to_string(),
                format!("{}..{}", self.from, self.to),
            ],
        }
    }

    /// Revision-selection arguments for `diff`.
    pub fn diff_args(&self) -> Vec<String> {
        match self.kind {
            VcsKind::Mercurial => vec![
                "-r".to_string(),
                self.from.clone(),
                "-r".to_string(),
                self.to.clone(),
            ],
            VcsKind::Git => vec![format!("{}..{}", self.from, self.to)],
        }
    }

    /// Bring the raw `log` result into oldest-first order without `from`.
    pub fn normalize(&self, mut records: Vec<CommitRecord>) -> Vec<CommitRecord> {
        match self.kind {
            VcsKind::Mercurial => {
                // `from` is an ancestor of every other member, so it sorts last.
                records.pop();
                records.reverse();
                records
            }
            VcsKind::Git => records,
        }
    }
}

/// Quote a revision name as a revset string literal.
fn quote_revset(rev: &str) -> String {
    let escaped = rev.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{}'", escaped)
}
