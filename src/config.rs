//! Runtime settings shared by the library and the CLI.

use std::time::Duration;

use crate::vcs::VcsKind;

/// Default revision-link templates of the upstream hosting.
pub const DEFAULT_HG_URL: &str = "https://hg.adblockplus.org/{repository}/rev/{revision}";
pub const DEFAULT_GIT_URL: &str = "https://www.github.com/adblockplus/{repository}/commit/{revision}";
/// Default issue tracker queried for integration notes.
pub const DEFAULT_TRACKER_URL: &str = "https://issues.adblockplus.org";

/// Display-link templates, one per backend. `{repository}` and `{revision}`
/// are substituted.
#[derive(Clone, Debug)]
pub struct UrlTemplates {
    pub hg: String,
    pub git: String,
}

impl Default for UrlTemplates {
    fn default() -> Self {
        UrlTemplates {
            hg: DEFAULT_HG_URL.to_string(),
            git: DEFAULT_GIT_URL.to_string(),
        }
    }
}

impl UrlTemplates {
    /// Render the revision link for `kind`.
    #[must_use]
    pub fn revision_url(&self, kind: VcsKind, repository: &str, revision: &str) -> String {
        let template = match kind {
            VcsKind::Mercurial => &self.hg,
            VcsKind::Git => &self.git,
        };
        template
            .replace("{repository}", repository)
            .replace("{revision}", revision)
    }
}

/// Settings for one depup invocation.
#[derive(Clone, Debug)]
pub struct Settings {
    /// Per-subprocess timeout. `None` waits indefinitely.
    pub timeout: Option<Duration>,
    pub urls: UrlTemplates,
    pub tracker_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            timeout: None,
            urls: UrlTemplates::default(),
            tracker_url: DEFAULT_TRACKER_URL.to_string(),
        }
    }
}

impl Settings {
    /// Build settings from CLI values; a zero timeout means "no timeout".
    pub fn new(timeout_secs: u64, urls: UrlTemplates, tracker_url: impl Into<String>) -> Self {
        Settings {
            timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
            urls,
            tracker_url: tracker_url.into().trim_end_matches('/').to_string(),
        }
    }
}
