//! CLI argument structs for all subcommands.

use std::path::PathBuf;

use clap::{Args, Parser};

use depup::config::{DEFAULT_GIT_URL, DEFAULT_HG_URL, DEFAULT_TRACKER_URL};

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Log level: error, warn, info, debug, trace (RUST_LOG overrides)
    #[arg(long, default_value = "warn", global = true)]
    pub log_level: String,

    /// Emit log records as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Kill VCS commands running longer than this many seconds (0 = no limit)
    #[arg(long, default_value = "0", env = "DEPUP_VCS_TIMEOUT", global = true)]
    pub timeout_secs: u64,

    /// Revision link template for hg ({repository} and {revision} are replaced)
    #[arg(long, default_value = DEFAULT_HG_URL, global = true)]
    pub hg_url: String,

    /// Revision link template for git ({repository} and {revision} are replaced)
    #[arg(long, default_value = DEFAULT_GIT_URL, global = true)]
    pub git_url: String,

    /// Issue tracker base URL
    #[arg(long, default_value = DEFAULT_TRACKER_URL, global = true)]
    pub tracker_url: String,
}

/// Which dependency to inspect and where to look.
#[derive(Args, Debug, Clone)]
pub struct DependencyArgs {
    /// The dependency to update, as named in the dependencies file
    pub dependency: String,

    /// The revision to update to
    #[arg(short = 'r', long, default_value = "master")]
    pub revision: String,

    /// Local copy (or clone URL) of the mirror repository. Defaults to the
    /// mirror source from the dependencies file.
    #[arg(short = 'g', long)]
    pub mirror_repo: Option<String>,

    /// Do not look up mirror hashes
    #[arg(long, conflicts_with = "mirror_repo")]
    pub skip_mirror: bool,

    /// Pin hashes instead of tags, bookmarks or branches
    #[arg(short = 'f', long)]
    pub force_hash: bool,

    /// Project root containing the dependencies file
    #[arg(short = 'p', long, default_value = ".")]
    pub project_dir: PathBuf,
}

#[derive(Parser, Debug)]
pub struct ChangesArgs {
    #[command(flatten)]
    pub dep: DependencyArgs,
}

#[derive(Parser, Debug)]
pub struct DiffArgs {
    #[command(flatten)]
    pub dep: DependencyArgs,

    /// Lines of context around each change
    #[arg(short = 'n', long, default_value = "16")]
    pub context: usize,

    /// Write the diff to this file instead of STDOUT
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct IssueArgs {
    #[command(flatten)]
    pub dep: DependencyArgs,

    /// Print the report context as JSON instead of the Trac issue body.
    /// Replaces a custom issue template: feed the JSON to your own renderer.
    #[arg(long)]
    pub json: bool,

    /// Search the issue tracker for integration notes of the referenced
    /// issues (one request per issue; results on STDERR)
    #[arg(short = 'l', long)]
    pub lookup_integration_notes: bool,
}

#[derive(Parser, Debug)]
pub struct UpdateArgs {
    #[command(flatten)]
    pub dep: DependencyArgs,

    /// Commit the changed dependencies file
    #[arg(long)]
    pub commit: bool,

    /// Commit message (default: "Update <dependency> to <revision>")
    #[arg(short = 'm', long, requires = "commit")]
    pub message: Option<String>,
}
