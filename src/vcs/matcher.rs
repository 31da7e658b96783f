//! Cross-repository commit matching.
//!
//! The same logical commit carries different hashes in the primary and the
//! mirror history. The only shared identity is its metadata, so a commit is
//! located in the mirror by `(author, date, first message line)`. There is
//! no index for that lookup: every miss is a `log` query against the mirror.
//!
//! Results (including misses) are cached per matcher instance, keyed by the
//! metadata triple, so squashed or replayed histories with repeated triples
//! cost one query each.

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, info};

use crate::config::UrlTemplates;
use crate::vcs::runner::CommandRunner;
use crate::vcs::{VcsKind, WorkingCopy};
use crate::{CommitRecord, DepupError, NO_MIRROR};

/// Cache key: the metadata a commit keeps across histories.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct MatchKey {
    author: String,
    date: String,
    message: String,
}

impl MatchKey {
    fn of(commit: &CommitRecord) -> Self {
        MatchKey {
            author: commit.author.clone(),
            date: commit.date.clone(),
            message: commit.message.clone(),
        }
    }
}

/// Cache counters, for logging and tests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MatchStats {
    pub hits: usize,
    pub misses: usize,
}

/// Finds the mirror-side twin of commits from the other history.
#[derive(Debug)]
pub struct CrossRepoMatcher {
    kind: VcsKind,
    location: String,
    runner: CommandRunner,
    cache: HashMap<MatchKey, Option<String>>,
    stats: MatchStats,
}

impl CrossRepoMatcher {
    /// `location` is either a local working copy of `kind` or anything the
    /// backend can clone from (URL or path).
    pub fn new(kind: VcsKind, location: impl Into<String>, runner: CommandRunner) -> Self {
        CrossRepoMatcher {
            kind,
            location: location.into(),
            runner,
            cache: HashMap::new(),
            stats: MatchStats::default(),
        }
    }

    pub fn kind(&self) -> VcsKind {
        self.kind
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn stats(&self) -> MatchStats {
        self.stats
    }

    /// Mirror hash of `commit`, or [`NO_MIRROR`] when the mirror has no
    /// matching commit.
    pub fn resolve(&mut self, commit: &CommitRecord) -> Result<String, DepupError> {
        let mut mirror = None;
        let hash = self.lookup(commit, &mut mirror)?;
        Ok(hash.unwrap_or_else(|| NO_MIRROR.to_string()))
    }

    /// Attach mirror hashes and display links to every record.
    ///
    /// The mirror is opened at most once per call and any temporary copy is
    /// removed before returning, on success and on error alike.
    pub fn enhance(
        &mut self,
        commits: &mut [CommitRecord],
        urls: &UrlTemplates,
        repository: &str,
    ) -> Result<(), DepupError> {
        let mut mirror = None;
        for commit in commits.iter_mut() {
            let hash = self.lookup(commit, &mut mirror)?;
            commit.mirror_hash = hash.unwrap_or_else(|| NO_MIRROR.to_string());
            attach_urls(commit, urls, repository);
        }
        info!(
            mirror = %self.location,
            commits = commits.len(),
            hits = self.stats.hits,
            misses = self.stats.misses,
            "Cross-matched commits"
        );
        Ok(())
    }

    /// Cache lookup, opening (and refreshing) the mirror on the first miss.
    fn lookup(
        &mut self,
        commit: &CommitRecord,
        mirror: &mut Option<WorkingCopy>,
    ) -> Result<Option<String>, DepupError> {
        let key = MatchKey::of(commit);
        if let Some(cached) = self.cache.get(&key) {
            self.stats.hits += 1;
            debug!(hash = %commit.hash, "Match cache hit");
            return Ok(cached.clone());
        }
        self.stats.misses += 1;

        if mirror.is_none() {
            *mirror = Some(self.open_mirror()?);
        }
        let found = match mirror.as_ref() {
            Some(copy) => copy.find_matching_commit(&key.author, &key.date, &key.message)?,
            None => None,
        };
        if found.is_none() {
            debug!(hash = %commit.hash, message = %key.message, "No matching commit in mirror");
        }
        self.cache.insert(key, found.clone());
        Ok(found)
    }

    /// Open the mirror in place when it is a local copy of the right kind,
    /// otherwise materialize a temporary one; then refresh its history.
    fn open_mirror(&self) -> Result<WorkingCopy, DepupError> {
        let local = Path::new(&self.location);
        let copy = if local.is_dir() && self.kind.detect(local) {
            WorkingCopy::open(self.kind, local, self.runner.clone())
        } else {
            WorkingCopy::materialize_temporary(self.kind, &self.location, self.runner.clone())?
        };
        copy.refresh_history()?;
        Ok(copy)
    }
}

/// Fill `primary_url` / `mirror_url` from the URL templates.
pub fn attach_urls(commit: &mut CommitRecord, urls: &UrlTemplates, repository: &str) {
    commit.primary_url = Some(urls.revision_url(commit.kind, repository, &commit.hash));
    commit.mirror_url = Some(urls.revision_url(
        commit.kind.counterpart(),
        repository,
        &commit.mirror_hash,
    ));
}

#[cfg(test)]
#[path = "matcher_tests.rs"]
mod tests;
