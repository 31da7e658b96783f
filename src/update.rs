//! Dependency update orchestration.
//!
//! `prepare` gathers everything the subcommands need (manifest, working
//! copy, change list, mirror hashes) without touching the project;
//! `apply` is the only step that writes.

use std::path::PathBuf;

use serde::Serialize;
use tracing::{info, warn};

use depup::manifest::{Manifest, RevisionMode};
use depup::vcs::matcher::attach_urls;
use depup::{CommandRunner, CommitRecord, CrossRepoMatcher, DepupError, Settings, WorkingCopy};

/// What the user asked for on the command line.
#[derive(Clone, Debug)]
pub struct UpdateRequest {
    pub dependency: String,
    pub revision: String,
    pub project_dir: PathBuf,
    /// Local mirror working copy (or clone URL) overriding the manifest.
    pub mirror_repo: Option<String>,
    pub skip_mirror: bool,
    pub force_hash: bool,
}

/// Relation of the target revision to the pinned one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeDirection {
    Upgrade,
    Downgrade,
    UpToDate,
}

/// Result of [`prepare`].
#[derive(Debug)]
pub struct PreparedUpdate {
    pub request: UpdateRequest,
    pub manifest: Manifest,
    pub base_revision: String,
    pub dependency: WorkingCopy,
    /// Commits between the pinned and the target revision, oldest first.
    pub changes: Vec<CommitRecord>,
    /// The commit the target revision resolves to.
    pub target: CommitRecord,
    pub direction: ChangeDirection,
}

/// Read the manifest, list the changes and cross-match them.
pub fn prepare(
    request: UpdateRequest,
    settings: &Settings,
    runner: &CommandRunner,
) -> Result<PreparedUpdate, DepupError> {
    let manifest = Manifest::load(&request.project_dir)?;
    manifest.dependency(&request.dependency)?;

    let dependency = WorkingCopy::detect(request.project_dir.join(&request.dependency), runner.clone())?;
    let kind = dependency.kind();
    let base_revision = manifest.base_revision(&request.dependency, kind)?;
    info!(
        dependency = %request.dependency,
        vcs = %kind,
        from = %base_revision,
        to = %request.revision,
        "Preparing dependency update"
    );

    dependency.refresh_history()?;
    let (mut changes, direction) = list_in_either_direction(&dependency, &base_revision, &request.revision)?;
    let mut target = dependency.describe(&request.revision)?;

    if direction != ChangeDirection::UpToDate {
        if request.skip_mirror {
            info!("Skipping mirror lookup");
            for commit in changes.iter_mut().chain(std::iter::once(&mut target)) {
                attach_urls(commit, &settings.urls, &request.dependency);
            }
        } else {
            let mirror_kind = kind.counterpart();
            let location = match &request.mirror_repo {
                Some(location) => location.clone(),
                None => manifest.mirror_source(&request.dependency, mirror_kind)?,
            };
            let mut matcher = CrossRepoMatcher::new(mirror_kind, location, runner.clone());
            matcher.enhance(&mut changes, &settings.urls, &request.dependency)?;
            matcher.enhance(std::slice::from_mut(&mut target), &settings.urls, &request.dependency)?;
        }
    }

    Ok(PreparedUpdate {
        request,
        manifest,
        base_revision,
        dependency,
        changes,
        target,
        direction,
    })
}

/// `base → target`, falling back to `target → base` when the target is
/// behind the pinned revision.
fn list_in_either_direction(
    copy: &WorkingCopy,
    base: &str,
    target: &str,
) -> Result<(Vec<CommitRecord>, ChangeDirection), DepupError> {
    let forward = copy.list_changes(base, target)?;
    if !forward.is_empty() {
        return Ok((forward, ChangeDirection::Upgrade));
    }
    if base == target {
        return Ok((forward, ChangeDirection::UpToDate));
    }

    let backward = copy.list_changes(target, base)?;
    if backward.is_empty() {
        Ok((backward, ChangeDirection::UpToDate))
    } else {
        warn!(from = base, to = target, commits = backward.len(), "You are downgrading the dependency");
        Ok((backward, ChangeDirection::Downgrade))
    }
}

impl PreparedUpdate {
    /// `Hashes` when forced or when the requested revision is itself a hash
    /// of the target commit; `Symbolic` otherwise.
    pub fn revision_mode(&self) -> RevisionMode {
        if self.request.force_hash || is_hash_of(&self.request.revision, &self.target.hash) {
            RevisionMode::Hashes
        } else {
            RevisionMode::Symbolic
        }
    }

    /// Current and replacement manifest lines.
    pub fn entries(&self, mode: RevisionMode) -> Result<(String, String), DepupError> {
        let name = &self.request.dependency;
        let old = self.manifest.dependency(name)?.line.trim().to_string();
        let new = self
            .manifest
            .entry_for(name, mode, &self.request.revision, &self.target)?;
        Ok((old, new))
    }

    /// Rewrite the manifest, optionally commit it, and move the dependency
    /// working copy to the target revision.
    ///
    /// Both working copies must be clean before anything is written. A
    /// failed commit reverts the project working copy before the error is
    /// returned.
    pub fn apply(
        &self,
        mode: RevisionMode,
        commit_message: Option<&str>,
        runner: &CommandRunner,
    ) -> Result<String, DepupError> {
        let project = WorkingCopy::detect(&self.request.project_dir, runner.clone())?;
        project.ensure_clean()?;
        self.dependency.ensure_clean()?;

        let name = &self.request.dependency;
        let old_line = &self.manifest.dependency(name)?.line;
        let new_line = self
            .manifest
            .entry_for(name, mode, &self.request.revision, &self.target)?;
        let text = self.manifest.replace_entry(old_line, &new_line)?;
        self.manifest.save(&text)?;
        info!(dependency = %name, entry = %new_line, "Updated dependencies file");

        if let Some(message) = commit_message {
            if let Err(e) = project.commit_changes(message) {
                warn!(error = %e, "Commit failed, reverting the project working copy");
                if let Err(restore) = project.discard_changes() {
                    warn!(error = %restore, "Could not revert the project working copy");
                }
                return Err(e);
            }
        }

        self.dependency.checkout(&self.request.revision)?;
        Ok(new_line)
    }

    pub fn default_commit_message(&self) -> String {
        format!("Update {} to {}", self.request.dependency, self.request.revision)
    }
}

/// Whether `revision` names `hash` by (a prefix of) its hex digits.
fn is_hash_of(revision: &str, hash: &str) -> bool {
    !revision.is_empty()
        && revision.chars().all(|c| c.is_ascii_hexdigit())
        && (hash.starts_with(revision) || revision.starts_with(hash))
}

#[cfg(test)]
#[path = "update_tests.rs"]
mod tests;
