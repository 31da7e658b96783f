//! Reader and rewriter for the buildtools `dependencies` manifest.
//!
//! ```text
//! # comment
//! _root = hg:https://hg.adblockplus.org/ git:https://github.com/adblockplus/
//! _self = buildtools/ensure_dependencies.py
//! buildtools = buildtools hg:016d16f7137b git:f3f8692f82e5
//! adblockpluscore = adblockpluscore 1.5.0
//! ```
//!
//! Dependency values are whitespace-separated items `[kind:]spec` where
//! `kind` is `hg`, `git` or absent (`*`, valid for every backend). The first
//! item without a kind is the source path only; every other item is
//! `source@revision` or a bare `revision`. Items of the same kind merge
//! field-wise, later values winning.
//!
//! Updating never re-serializes the file: the dependency's raw line is
//! replaced textually so comments and formatting survive.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::vcs::VcsKind;
use crate::{CommitRecord, DepupError};

/// File name of the manifest at a project root.
pub const MANIFEST_FILE: &str = "dependencies";

/// One `source@revision` pin. Either half may be missing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Pin {
    pub source: Option<String>,
    pub revision: Option<String>,
}

impl Pin {
    fn merge(&mut self, other: Pin) {
        if other.source.is_some() {
            self.source = other.source;
        }
        if other.revision.is_some() {
            self.revision = other.revision;
        }
    }
}

/// A parsed dependency line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dependency {
    pub name: String,
    /// The line exactly as it appears in the file (without line break).
    pub line: String,
    /// Pin valid for every backend (`*`).
    pub any: Pin,
    /// Backend-specific pins.
    pub by_kind: HashMap<VcsKind, Pin>,
}

impl Dependency {
    /// Source path shared by all backends, defaulting to the dependency name.
    pub fn source_path(&self) -> &str {
        self.any.source.as_deref().unwrap_or(&self.name)
    }

    fn pin(&self, kind: VcsKind) -> Option<&Pin> {
        self.by_kind.get(&kind)
    }
}

/// How the updated entry names the new revision.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RevisionMode {
    /// Keep the requested tag, bookmark or branch name.
    Symbolic,
    /// Pin both histories by hash.
    Hashes,
}

/// Parsed `dependencies` file.
#[derive(Clone, Debug)]
pub struct Manifest {
    path: PathBuf,
    text: String,
    roots: HashMap<VcsKind, String>,
    self_path: Option<String>,
    dependencies: Vec<Dependency>,
}

impl Manifest {
    /// Read and parse `<project_dir>/dependencies`.
    pub fn load(project_dir: &Path) -> Result<Self, DepupError> {
        let path = project_dir.join(MANIFEST_FILE);
        let text = std::fs::read_to_string(&path).map_err(|e| DepupError::Manifest {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::parse(path, text)
    }

    pub fn parse(path: impl Into<PathBuf>, text: impl Into<String>) -> Result<Self, DepupError> {
        let path = path.into();
        let text = text.into();
        let mut roots = HashMap::new();
        let mut self_path = None;
        let mut dependencies: Vec<Dependency> = Vec::new();

        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim_end_matches('\r');
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let Some((key, value)) = trimmed.split_once('=') else {
                warn!(path = %path.display(), line = idx + 1, "Ignoring manifest line without '='");
                continue;
            };
            let key = key.trim();
            let items: Vec<&str> = value.split_whitespace().collect();
            if key.is_empty() || items.is_empty() {
                warn!(path = %path.display(), line = idx + 1, "Ignoring incomplete manifest line");
                continue;
            }

            match key {
                "_root" => {
                    for item in items {
                        let (kind, value) = split_kind(item);
                        match kind {
                            Some(kind) => {
                                roots.insert(kind, value.to_string());
                            }
                            None => {
                                return Err(DepupError::Manifest {
                                    path: path.display().to_string(),
                                    message: format!(
                                        "line {}: _root entries need an hg: or git: prefix, got '{}'",
                                        idx + 1,
                                        item
                                    ),
                                });
                            }
                        }
                    }
                }
                "_self" => self_path = Some(items.join(" ")),
                special if special.starts_with('_') => {
                    debug!(key = special, "Skipping unknown special manifest key");
                }
                name => {
                    let dependency = parse_dependency(name, line, &items);
                    if let Some(existing) = dependencies.iter_mut().find(|d| d.name == name) {
                        warn!(dependency = name, "Dependency listed twice, keeping the last entry");
                        *existing = dependency;
                    } else {
                        dependencies.push(dependency);
                    }
                }
            }
        }

        debug!(path = %path.display(), dependencies = dependencies.len(), "Parsed manifest");
        Ok(Manifest {
            path,
            text,
            roots,
            self_path,
            dependencies,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn root(&self, kind: VcsKind) -> Option<&str> {
        self.roots.get(&kind).map(String::as_str)
    }

    pub fn self_path(&self) -> Option<&str> {
        self.self_path.as_deref()
    }

    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    pub fn dependency(&self, name: &str) -> Result<&Dependency, DepupError> {
        self.dependencies
            .iter()
            .find(|d| d.name == name)
            .ok_or_else(|| DepupError::UnknownDependency {
                name: name.to_string(),
            })
    }

    /// Currently pinned revision: the `*` pin, else the `primary` pin.
    pub fn base_revision(&self, name: &str, primary: VcsKind) -> Result<String, DepupError> {
        let dep = self.dependency(name)?;
        dep.any
            .revision
            .as_ref()
            .or_else(|| dep.pin(primary).and_then(|p| p.revision.as_ref()))
            .cloned()
            .ok_or_else(|| DepupError::Manifest {
                path: self.path.display().to_string(),
                message: format!("no {} or generic revision pinned for '{}'", primary, name),
            })
    }

    /// Where the `mirror` history of `name` can be cloned from.
    pub fn mirror_source(&self, name: &str, mirror: VcsKind) -> Result<String, DepupError> {
        let dep = self.dependency(name)?;
        if let Some(source) = dep.pin(mirror).and_then(|p| p.source.as_ref()) {
            return Ok(source.clone());
        }
        match self.root(mirror) {
            Some(root) => Ok(join_source(root, dep.source_path())),
            None => Err(DepupError::NoMirror {
                dependency: name.to_string(),
            }),
        }
    }

    /// Build the replacement line for `name`.
    ///
    /// `target` is the newest commit of the update, already enhanced with
    /// its mirror hash; `revision` is the name the user asked for.
    pub fn entry_for(
        &self,
        name: &str,
        mode: RevisionMode,
        revision: &str,
        target: &CommitRecord,
    ) -> Result<String, DepupError> {
        let dep = self.dependency(name)?;
        let source = dep.source_path();
        match mode {
            RevisionMode::Symbolic => Ok(format!("{} = {} {}", name, source, revision)),
            RevisionMode::Hashes => {
                if !target.is_mirrored() {
                    return Err(DepupError::MirrorNotFound {
                        hash: target.hash.clone(),
                    });
                }
                let hg = target.hash_for(VcsKind::Mercurial);
                let git = target.hash_for(VcsKind::Git);
                Ok(format!("{} = {} hg:{} git:{}", name, source, hg, git))
            }
        }
    }

    /// Manifest text with `old_line` replaced by `new_line`.
    pub fn replace_entry(&self, old_line: &str, new_line: &str) -> Result<String, DepupError> {
        if !self.text.contains(old_line) {
            return Err(DepupError::Manifest {
                path: self.path.display().to_string(),
                message: format!("entry '{}' not found", old_line),
            });
        }
        Ok(self.text.replacen(old_line, new_line, 1))
    }

    /// Write `text` back to the manifest's path.
    pub fn save(&self, text: &str) -> Result<(), DepupError> {
        std::fs::write(&self.path, text)?;
        debug!(path = %self.path.display(), "Wrote manifest");
        Ok(())
    }
}

/// Split `hg:value` / `git:value`; anything else has no kind.
fn split_kind(item: &str) -> (Option<VcsKind>, &str) {
    match item.split_once(':') {
        Some((prefix, rest)) => match VcsKind::from_manifest_key(prefix) {
            Some(kind) => (Some(kind), rest),
            None => (None, item),
        },
        None => (None, item),
    }
}

/// `source@revision` or bare `revision`.
fn split_source(spec: &str) -> Pin {
    match spec.rsplit_once('@') {
        Some((source, revision)) => Pin {
            source: (!source.is_empty()).then(|| source.to_string()),
            revision: (!revision.is_empty()).then(|| revision.to_string()),
        },
        None => Pin {
            source: None,
            revision: Some(spec.to_string()),
        },
    }
}

fn parse_dependency(name: &str, line: &str, items: &[&str]) -> Dependency {
    let mut any = Pin::default();
    let mut by_kind: HashMap<VcsKind, Pin> = HashMap::new();

    for (i, item) in items.iter().enumerate() {
        let (kind, spec) = split_kind(item);
        match kind {
            None if i == 0 => any.merge(Pin {
                source: Some(spec.to_string()),
                revision: None,
            }),
            None => any.merge(split_source(spec)),
            Some(kind) => by_kind.entry(kind).or_default().merge(split_source(spec)),
        }
    }

    Dependency {
        name: name.to_string(),
        line: line.to_string(),
        any,
        by_kind,
    }
}

/// Join a `_root` base with a dependency path, URL or filesystem alike.
fn join_source(root: &str, path: &str) -> String {
    format!("{}/{}", root.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[cfg(test)]
#[path = "manifest_tests.rs"]
mod tests;
