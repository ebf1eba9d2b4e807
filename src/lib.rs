// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod graph;
pub mod logging;
pub mod mode;
pub mod ops;
pub mod pipeline;
pub mod workspace;

use std::path::Path;
use std::time::Instant;

use anyhow::{bail, Result};
use tracing::{info, warn};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::graph::timing::format_duration;
use crate::graph::{collect_reachable, verify_acyclic, Task};
use crate::ops::system;
use crate::pipeline::Roots;
use crate::workspace::Workspace;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - workspace preflight
/// - graph assembly for the requested mode
/// - execution of the two umbrella roots, in order
///
/// Returns `Ok(false)` when a task body failed (ordinary build failure) and
/// `Err` for structural problems: bad config, missing project files, a
/// malformed graph.
pub fn run(args: CliArgs) -> Result<bool> {
    if !system::is_supported_os() {
        bail!("unsupported operating system");
    }

    let cfg = load_and_validate(Path::new(&args.config))?;
    let roots = pipeline::assemble(&cfg, args.mode.flags())?;
    verify_acyclic(&[roots.prebuild.clone(), roots.build.clone()])?;

    if args.dry_run {
        print_dry_run(&roots);
        return Ok(true);
    }

    let ws = Workspace::from_config(&cfg)?;
    ws.preflight()?;

    let started = Instant::now();

    if !roots.prebuild.run()? {
        warn!("Build failed");
        return Ok(false);
    }
    if !roots.build.run()? {
        warn!("Build failed");
        return Ok(false);
    }

    info!("Build succeeded ({})", format_duration(started.elapsed()));
    Ok(true)
}

/// Dry-run output: the tasks each root would run, without executing any.
fn print_dry_run(roots: &Roots) {
    println!("taskforge dry-run");
    print_root(&roots.prebuild);
    print_root(&roots.build);
}

fn print_root(root: &Task) {
    let tasks = collect_reachable(&[root.clone()]);
    println!();
    println!("{} ({} tasks):", root.name(), tasks.len());
    for task in &tasks {
        if task.id() == root.id() {
            continue;
        }
        let deps = task.dependencies().len();
        if deps == 0 {
            println!("  - {}", task.name());
        } else {
            println!("  - {} (after {} dependencies)", task.name(), deps);
        }
    }
}
