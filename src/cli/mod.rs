//! CLI layer: argument parsing, command dispatch, and subcommand implementations.

pub mod args;

pub use args::*;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use depup::{CommandRunner, DepupError, Settings, UrlTemplates};

use crate::notes::NotesLookup;
use crate::report::{changelog, IssueClassifier, ReportContext};
use crate::update::{self, ChangeDirection, PreparedUpdate, UpdateRequest};

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (built ", env!("BUILD_DATETIME"), ")");

// ─── CLI ─────────────────────────────────────────────────────────────

/// Prepare dependency updates for projects tracked in parallel Mercurial and Git histories
#[derive(Parser, Debug)]
#[command(name = "depup", version = VERSION, about, after_help = "\
Run 'depup <COMMAND> --help' for detailed options.\n\
Common options: -r <REV> (target revision), -g <PATH> (mirror repository), -p <DIR> (project root)")]
pub(crate) struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// List the changes between the pinned and the target revision
    Changes(ChangesArgs),

    /// Write a unified diff of all imported changes
    Diff(DiffArgs),

    /// Render an issue body (or its JSON context) for the update
    Issue(IssueArgs),

    /// Rewrite the dependencies file and move the dependency to the target revision
    Update(UpdateArgs),
}

// ─── Main entry point ───────────────────────────────────────────────

pub fn run() {
    let cli = Cli::parse();
    init_logging(&cli.global.log_level, cli.global.log_json);

    let interrupt = Arc::new(AtomicBool::new(false));
    let flag = interrupt.clone();
    if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)) {
        warn!(error = %e, "Could not install Ctrl-C handler");
    }

    let settings = settings_from(&cli.global);
    let runner = CommandRunner::new()
        .with_timeout(settings.timeout)
        .with_interrupt(interrupt);

    let result = match cli.command {
        Commands::Changes(args) => cmd_changes(args, &settings, &runner),
        Commands::Diff(args) => cmd_diff(args, &settings, &runner),
        Commands::Issue(args) => cmd_issue(args, &settings, &runner),
        Commands::Update(args) => cmd_update(args, &settings, &runner),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn settings_from(global: &GlobalArgs) -> Settings {
    let urls = UrlTemplates {
        hg: global.hg_url.clone(),
        git: global.git_url.clone(),
    };
    Settings::new(global.timeout_secs, urls, global.tracker_url.clone())
}

fn request_from(args: &DependencyArgs, skip_mirror: bool) -> UpdateRequest {
    UpdateRequest {
        dependency: args.dependency.clone(),
        revision: args.revision.clone(),
        project_dir: args.project_dir.clone(),
        mirror_repo: args.mirror_repo.clone(),
        skip_mirror: skip_mirror || args.skip_mirror,
        force_hash: args.force_hash,
    }
}

/// Report an up-to-date dependency; true when there is nothing to do.
fn nothing_to_do(prepared: &PreparedUpdate) -> bool {
    if prepared.direction != ChangeDirection::UpToDate {
        return false;
    }
    eprintln!(
        "{} is already at {} (pinned: {}), no changes.",
        prepared.request.dependency, prepared.request.revision, prepared.base_revision
    );
    true
}

// ─── Subcommands ────────────────────────────────────────────────────

fn cmd_changes(args: ChangesArgs, settings: &Settings, runner: &CommandRunner) -> Result<(), DepupError> {
    let prepared = update::prepare(request_from(&args.dep, true), settings, runner)?;
    if nothing_to_do(&prepared) {
        return Ok(());
    }
    print!("{}", changelog(&prepared.changes));
    Ok(())
}

fn cmd_diff(args: DiffArgs, settings: &Settings, runner: &CommandRunner) -> Result<(), DepupError> {
    let prepared = update::prepare(request_from(&args.dep, true), settings, runner)?;
    if nothing_to_do(&prepared) {
        return Ok(());
    }
    let diff = prepared.dependency.unified_diff(
        &prepared.base_revision,
        &prepared.request.revision,
        args.context,
    )?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, &diff)?;
            eprintln!("Diff written to {}", path.display());
        }
        None => print!("{}", diff),
    }
    Ok(())
}

fn cmd_issue(args: IssueArgs, settings: &Settings, runner: &CommandRunner) -> Result<(), DepupError> {
    let classifier = IssueClassifier::new()?;
    let prepared = update::prepare(request_from(&args.dep, false), settings, runner)?;
    if nothing_to_do(&prepared) {
        return Ok(());
    }

    let summary = classifier.classify(&prepared.changes);
    if args.lookup_integration_notes {
        let lookup = NotesLookup::new(&settings.tracker_url, settings.timeout)?;
        for url in lookup.lookup(&summary.issue_ids)? {
            eprintln!("Integration notes found: {}", url);
        }
    }

    let entries = prepared.entries(prepared.revision_mode())?;
    let context = ReportContext::new(
        &prepared.request.dependency,
        entries,
        &prepared.target,
        summary,
        prepared.direction,
    );
    if args.json {
        let json = context
            .to_json()
            .map_err(|e| DepupError::InvalidArgs(format!("Cannot serialize report: {}", e)))?;
        println!("{}", json);
    } else {
        print!("{}", context.render_trac());
    }
    Ok(())
}

fn cmd_update(args: UpdateArgs, settings: &Settings, runner: &CommandRunner) -> Result<(), DepupError> {
    let prepared = update::prepare(request_from(&args.dep, false), settings, runner)?;
    if nothing_to_do(&prepared) {
        return Ok(());
    }

    let mode = prepared.revision_mode();
    let message = args
        .commit
        .then(|| args.message.clone().unwrap_or_else(|| prepared.default_commit_message()));
    let line = prepared.apply(mode, message.as_deref(), runner)?;
    info!(entry = %line, committed = message.is_some(), "Dependency updated");
    eprintln!("Updated: {}", line);
    Ok(())
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
