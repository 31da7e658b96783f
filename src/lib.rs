//! # depup: dependency update preparation
//!
//! Computes the commits between a dependency's pinned revision and a target
//! revision, cross-references every commit with its twin in the mirror
//! repository (Mercurial ↔ Git) and feeds the result to the diff, changelog,
//! issue and manifest-update commands of the `depup` binary.
//!
//! ## Library usage
//!
//! The VCS layer is exposed as a library for benchmarking and integration
//! testing; the command-line surface lives in the binary crate.

use serde::Serialize;

pub mod config;
pub mod error;
pub mod manifest;
pub mod vcs;

#[cfg(test)]
mod test_fixtures;

pub use config::{Settings, UrlTemplates};
pub use error::DepupError;
pub use vcs::matcher::{CrossRepoMatcher, MatchStats};
pub use vcs::range::RevisionRange;
pub use vcs::runner::CommandRunner;
pub use vcs::{detect_kind, VcsKind, WorkingCopy};

/// Sentinel stored in [`CommitRecord::mirror_hash`] until (or unless) a
/// counterpart commit is found in the mirror repository.
pub const NO_MIRROR: &str = "NO MIRROR";

// ─── Core public types ───────────────────────────────────────────────

/// One commit of a dependency's history, normalized across backends.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    /// Backend that produced this record.
    pub kind: VcsKind,
    /// Backend-native short hash.
    pub hash: String,
    pub author: String,
    /// RFC 2822 date exactly as printed by the tool (kept verbatim for re-querying).
    pub date: String,
    /// First line of the commit message.
    pub message: String,
    /// Hash of the same commit in the mirror, or [`NO_MIRROR`].
    pub mirror_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mirror_url: Option<String>,
}

impl CommitRecord {
    /// Build an unmatched record as produced by a change listing.
    pub fn new(
        kind: VcsKind,
        hash: impl Into<String>,
        author: impl Into<String>,
        date: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        CommitRecord {
            kind,
            hash: hash.into(),
            author: author.into(),
            date: date.into(),
            message: message.into(),
            mirror_hash: NO_MIRROR.to_string(),
            primary_url: None,
            mirror_url: None,
        }
    }

    /// Hash of this commit in the history governed by `kind`.
    ///
    /// Returns the native hash for the record's own backend and the mirror
    /// hash (possibly [`NO_MIRROR`]) for the counterpart.
    #[must_use]
    pub fn hash_for(&self, kind: VcsKind) -> &str {
        if kind == self.kind {
            &self.hash
        } else {
            &self.mirror_hash
        }
    }

    /// Whether cross-matching found a counterpart commit.
    pub fn is_mirrored(&self) -> bool {
        self.mirror_hash != NO_MIRROR
    }
}
