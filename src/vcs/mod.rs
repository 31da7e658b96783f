//! VCS abstraction: one handle type over the `hg` and `git` command-line
//! tools.
//!
//! Only two backends exist and each names its counterpart statically, so the
//! backend is a closed [`VcsKind`] enum and [`WorkingCopy`] dispatches on it.
//! All operations shell out through [`CommandRunner`]; nothing links against
//! a VCS library.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::DateTime;
use serde::Serialize;
use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::{CommitRecord, DepupError};

pub mod log;
pub mod matcher;
pub mod range;
pub mod runner;

use range::RevisionRange;
use runner::CommandRunner;

/// Field separator for `find_matching_commit` candidate lines (git `%x1f`).
const FIELD_SEP: char = '\u{1f}';

// ─── Backend kinds ──────────────────────────────────────────────────

/// The two supported version-control tool families.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum VcsKind {
    #[serde(rename = "hg")]
    Mercurial,
    #[serde(rename = "git")]
    Git,
}

impl VcsKind {
    /// Every known kind, in detection order.
    pub const ALL: [VcsKind; 2] = [VcsKind::Git, VcsKind::Mercurial];

    pub fn executable(self) -> &'static str {
        match self {
            VcsKind::Mercurial => "hg",
            VcsKind::Git => "git",
        }
    }

    /// Arguments placed before every subcommand. For hg these neutralize
    /// user-configured command defaults that would change output formats.
    pub fn base_args(self) -> &'static [&'static str] {
        match self {
            VcsKind::Mercurial => &[
                "--config", "defaults.log=",
                "--config", "defaults.pull=",
                "--config", "defaults.diff=",
            ],
            VcsKind::Git => &["-c", "core.quotePath=false"],
        }
    }

    /// Environment that keeps the tools scriptable and non-interactive.
    pub fn env(self) -> &'static [(&'static str, &'static str)] {
        match self {
            VcsKind::Mercurial => &[("HGPLAIN", "1")],
            VcsKind::Git => &[("GIT_TERMINAL_PROMPT", "0")],
        }
    }

    /// Subcommand that brings remote history into the local repository.
    pub fn refresh_command(self) -> &'static str {
        match self {
            VcsKind::Mercurial => "pull",
            VcsKind::Git => "fetch",
        }
    }

    /// Directory whose presence marks a working copy of this kind.
    pub fn marker(self) -> &'static str {
        match self {
            VcsKind::Mercurial => ".hg",
            VcsKind::Git => ".git",
        }
    }

    /// Key used for this kind in the dependencies manifest.
    pub fn manifest_key(self) -> &'static str {
        self.executable()
    }

    /// The kind this one mirrors against.
    pub fn counterpart(self) -> VcsKind {
        match self {
            VcsKind::Mercurial => VcsKind::Git,
            VcsKind::Git => VcsKind::Mercurial,
        }
    }

    /// True iff the marker of this kind exists directly under `path`.
    pub fn detect(self, path: &Path) -> bool {
        path.join(self.marker()).exists()
    }

    pub fn from_manifest_key(key: &str) -> Option<VcsKind> {
        VcsKind::ALL.into_iter().find(|k| k.manifest_key() == key)
    }
}

impl fmt::Display for VcsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.executable())
    }
}

/// Select the single kind governing `path`.
///
/// Zero or several matches both fail: working against the wrong backend
/// would silently corrupt cross-matching.
pub fn detect_kind(path: &Path) -> Result<VcsKind, DepupError> {
    let found: Vec<VcsKind> = VcsKind::ALL.into_iter().filter(|k| k.detect(path)).collect();
    match found.as_slice() {
        [kind] => Ok(*kind),
        _ => Err(DepupError::AmbiguousOrUnknownVcs {
            path: path.display().to_string(),
            found,
        }),
    }
}

// ─── Working copies ─────────────────────────────────────────────────

/// A repository on disk bound to its backend.
///
/// Temporary handles own their directory; it is removed when the handle is
/// dropped, whatever happened through it.
#[derive(Debug)]
pub struct WorkingCopy {
    kind: VcsKind,
    path: PathBuf,
    runner: CommandRunner,
    scratch: Option<TempDir>,
}

impl WorkingCopy {
    /// Bind an existing repository at `path` to `kind` without probing.
    pub fn open(kind: VcsKind, path: impl Into<PathBuf>, runner: CommandRunner) -> Self {
        WorkingCopy {
            kind,
            path: path.into(),
            runner,
            scratch: None,
        }
    }

    /// Open `path` with whichever backend governs it.
    pub fn detect(path: impl Into<PathBuf>, runner: CommandRunner) -> Result<Self, DepupError> {
        let path = path.into();
        let kind = detect_kind(&path)?;
        debug!(path = %path.display(), vcs = %kind, "Detected working copy");
        Ok(WorkingCopy::open(kind, path, runner))
    }

    /// Create a throwaway repository of `kind` backed by `remote`.
    ///
    /// Git gets a mirror clone (history only, no checkout). Mercurial gets an
    /// empty repository whose default path is `remote`; its history arrives
    /// with the next [`refresh_history`](Self::refresh_history).
    pub fn materialize_temporary(
        kind: VcsKind,
        remote: &str,
        runner: CommandRunner,
    ) -> Result<Self, DepupError> {
        let scratch = tempfile::Builder::new()
            .prefix(&format!("depup-{}-", kind))
            .tempdir()?;
        let copy = WorkingCopy {
            kind,
            path: scratch.path().to_path_buf(),
            runner,
            scratch: Some(scratch),
        };

        info!(vcs = %kind, remote, path = %copy.path.display(), "Materializing temporary repository");
        match kind {
            VcsKind::Git => {
                copy.run(&["clone", "--quiet", "--mirror", remote, "."])?;
            }
            VcsKind::Mercurial => {
                copy.run(&["init", "."])?;
                let hgrc = format!("[paths]\ndefault = {}\n", remote);
                std::fs::write(copy.path.join(".hg").join("hgrc"), hgrc)?;
            }
        }
        Ok(copy)
    }

    pub fn kind(&self) -> VcsKind {
        self.kind
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn runner(&self) -> &CommandRunner {
        &self.runner
    }

    pub fn is_temporary(&self) -> bool {
        self.scratch.is_some()
    }

    /// Run the backend executable with its base arguments in this copy.
    pub fn run<S: AsRef<str>>(&self, args: &[S]) -> Result<String, DepupError> {
        self.runner.run(
            self.kind.executable(),
            self.kind.base_args(),
            args,
            self.kind.env(),
            &self.path,
        )
    }

    /// Pull/fetch from the configured remote. Failures are fatal: ranges
    /// cannot be computed reliably on stale history.
    pub fn refresh_history(&self) -> Result<(), DepupError> {
        debug!(vcs = %self.kind, path = %self.path.display(), "Refreshing history");
        self.run(&[self.kind.refresh_command()])?;
        Ok(())
    }

    /// Commits after `from` up to and including `to`, oldest-first.
    pub fn list_changes(&self, from: &str, to: &str) -> Result<Vec<CommitRecord>, DepupError> {
        let range = RevisionRange::new(self.kind, from, to);
        let mut args = vec!["log".to_string()];
        args.extend(log::log_template_args(self.kind));
        args.extend(range.log_args());

        let raw = self.run(&args)?;
        let records = range.normalize(log::parse_log(self.kind, &raw)?);
        debug!(vcs = %self.kind, from, to, count = records.len(), "Listed changes");
        Ok(records)
    }

    /// The single commit `revision` resolves to.
    pub fn describe(&self, revision: &str) -> Result<CommitRecord, DepupError> {
        let mut args = vec!["log".to_string()];
        args.extend(log::log_template_args(self.kind));
        match self.kind {
            VcsKind::Mercurial => args.extend(["-l", "1", "-r", revision].map(String::from)),
            VcsKind::Git => args.extend(["-1", revision, "--"].map(String::from)),
        }

        let raw = self.run(&args)?;
        log::parse_log(self.kind, &raw)?
            .into_iter()
            .next()
            .ok_or_else(|| DepupError::LogFormat {
                line: 0,
                message: format!("no commit found for revision '{}'", revision),
            })
    }

    /// Unified diff between `from` and `to` with `context_lines` of context.
    pub fn unified_diff(&self, from: &str, to: &str, context_lines: usize) -> Result<String, DepupError> {
        let range = RevisionRange::new(self.kind, from, to);
        let mut args = vec!["diff".to_string(), format!("--unified={}", context_lines)];
        args.extend(range.diff_args());
        self.run(&args)
    }

    /// Short hash of the commit whose author, date and first message line
    /// equal the given ones, or `None`. The first candidate wins.
    pub fn find_matching_commit(
        &self,
        author: &str,
        date: &str,
        message: &str,
    ) -> Result<Option<String>, DepupError> {
        let found = match self.kind {
            VcsKind::Mercurial => {
                let out = self.run(&[
                    "log", "-u", author, "-d", date, "--keyword", message,
                    "--template", "{node|short}\n",
                ])?;
                out.lines().map(str::trim).find(|l| !l.is_empty()).map(str::to_string)
            }
            VcsKind::Git => {
                // --before/--after compare committer dates; the author date
                // is pinned here instead.
                let out = self.run(&[
                    "log".to_string(),
                    "--all".to_string(),
                    "--fixed-strings".to_string(),
                    format!("--author={}", author),
                    format!("--grep={}", message),
                    "--format=%h%x1f%aD".to_string(),
                ])?;
                out.lines().find_map(|line| {
                    let (hash, candidate_date) = line.split_once(FIELD_SEP)?;
                    same_instant(candidate_date.trim(), date).then(|| hash.trim().to_string())
                })
            }
        };
        debug!(vcs = %self.kind, author, date, message, found = ?found, "Matching commit lookup");
        Ok(found)
    }

    /// True iff there are no uncommitted modifications (untracked files
    /// included).
    pub fn is_clean(&self) -> Result<bool, DepupError> {
        let out = match self.kind {
            VcsKind::Mercurial => self.run(&["status"])?,
            VcsKind::Git => self.run(&["status", "--porcelain"])?,
        };
        Ok(out.trim().is_empty())
    }

    /// Revert the working copy to its last committed state, removing
    /// untracked files.
    pub fn discard_changes(&self) -> Result<(), DepupError> {
        info!(vcs = %self.kind, path = %self.path.display(), "Discarding local changes");
        match self.kind {
            VcsKind::Mercurial => {
                self.run(&["revert", "--all", "--no-backup"])?;
                self.run(&["--config", "extensions.purge=", "purge"])?;
            }
            VcsKind::Git => {
                self.run(&["reset", "--hard", "--quiet", "HEAD"])?;
                self.run(&["clean", "-fd", "--quiet"])?;
            }
        }
        Ok(())
    }

    /// Commit every pending modification (additions and removals included).
    pub fn commit_changes(&self, message: &str) -> Result<(), DepupError> {
        info!(vcs = %self.kind, path = %self.path.display(), message, "Committing changes");
        match self.kind {
            VcsKind::Mercurial => {
                self.run(&["commit", "-A", "-m", message])?;
            }
            VcsKind::Git => {
                self.run(&["add", "-A"])?;
                self.run(&["commit", "-q", "-m", message])?;
            }
        }
        Ok(())
    }

    /// Move the working copy to `revision`. Refuses to touch a dirty copy.
    pub fn checkout(&self, revision: &str) -> Result<(), DepupError> {
        self.ensure_clean()?;
        info!(vcs = %self.kind, path = %self.path.display(), revision, "Updating working copy");
        match self.kind {
            VcsKind::Mercurial => self.run(&["update", "-r", revision])?,
            VcsKind::Git => self.run(&["checkout", "-q", revision])?,
        };
        Ok(())
    }

    /// Fail with [`DepupError::DirtyWorkingCopy`] unless the copy is clean.
    pub fn ensure_clean(&self) -> Result<(), DepupError> {
        if self.is_clean()? {
            Ok(())
        } else {
            Err(DepupError::DirtyWorkingCopy {
                path: self.path.display().to_string(),
            })
        }
    }
}

impl Drop for WorkingCopy {
    fn drop(&mut self) {
        if let Some(scratch) = self.scratch.take() {
            let path = scratch.path().display().to_string();
            if let Err(e) = scratch.close() {
                warn!(path = %path, error = %e, "Failed to remove temporary repository");
            } else {
                debug!(path = %path, "Removed temporary repository");
            }
        }
    }
}

/// Whether two RFC 2822 dates denote the same instant. Falls back to plain
/// string comparison when either side does not parse.
pub(crate) fn same_instant(a: &str, b: &str) -> bool {
    match (DateTime::parse_from_rfc2822(a), DateTime::parse_from_rfc2822(b)) {
        (Ok(x), Ok(y)) => x == y,
        _ => a == b,
    }
}

#[cfg(test)]
#[path = "vcs_tests.rs"]
mod tests;
