//! Dependency update preparation for projects tracked in parallel Mercurial
//! and Git histories.
//!
//! Binary crate entry point. All CLI logic is in the `cli` module; the VCS
//! layer lives in the `depup` library crate.

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

mod cli;
mod notes;
mod report;
mod update;

#[cfg(test)]
mod test_fixtures;

fn main() {
    cli::run();
}
