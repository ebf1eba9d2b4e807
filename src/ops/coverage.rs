// src/ops/coverage.rs

//! Coverage processing and analysis for the gcc coverage build: lcov +
//! genhtml for the browsable report, gcovr for the HTML details and the JSON
//! summary the analysis gate reads.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::error;

use crate::config::model::ToolsSection;
use crate::exec::Invocation;
use crate::ops::system;

/// Object-file name prefix excluded from gcovr's pattern matching; generated
/// coverage shims carry it so they never count against the project.
const GCOVR_EXCLUDE_PREFIX: &str = "GCOV_COVERAGE_58QuSuUgMN8onvKx_*";

/// Filesystem locations the coverage steps read and write. All absolute.
pub struct CoveragePaths<'a> {
    pub build_dir: &'a Path,
    pub project_root: &'a Path,
    pub test_dir: &'a Path,
    pub lcov_dir: &'a Path,
    pub lcov_file: &'a Path,
    pub gcovr_dir: &'a Path,
    pub gcovr_html: &'a Path,
    pub gcovr_json: &'a Path,
}

fn run_lcov(tools: &ToolsSection, paths: &CoveragePaths<'_>) -> bool {
    if !system::create_dir(paths.lcov_dir) {
        println!("Failed to create {:?}", paths.lcov_dir);
        return false;
    }

    let capture = Invocation::new(&tools.lcov)
        .arg("--branch-coverage")
        .arg("--capture")
        .arg("--directory")
        .arg(paths.build_dir.display().to_string())
        .arg("--exclude")
        .arg(format!("{}/", paths.test_dir.display()))
        .arg("--function-coverage")
        .arg("--ignore-errors")
        .arg("inconsistent")
        .arg("--include")
        .arg(paths.project_root.display().to_string())
        .arg("--output-file")
        .arg(paths.lcov_file.display().to_string())
        .current_dir(paths.project_root)
        .run();
    if !capture.success {
        println!("Error running lcov");
        if let Some(output) = capture.output {
            println!("{output}");
        }
        return false;
    }

    let render = Invocation::new(&tools.genhtml)
        .arg("--branch-coverage")
        .arg("--dark-mode")
        .arg("--flat")
        .arg("--function-coverage")
        .arg("--ignore-errors")
        .arg("inconsistent")
        .arg("--legend")
        .arg("--output-directory")
        .arg(paths.lcov_dir.display().to_string())
        .arg("--show-zero-columns")
        .arg("--sort")
        .arg(paths.lcov_file.display().to_string())
        .current_dir(paths.project_root)
        .run();
    if !render.success {
        println!("Error running genhtml");
        if let Some(output) = render.output {
            println!("{output}");
        }
        return false;
    }

    true
}

fn run_gcovr(tools: &ToolsSection, paths: &CoveragePaths<'_>) -> bool {
    if !system::create_dir(paths.gcovr_dir) {
        println!("Failed to create {:?}", paths.gcovr_dir);
        return false;
    }

    let out = Invocation::new(&tools.gcovr)
        .arg("--decisions")
        .arg("--exclude-pattern-prefix")
        .arg(GCOVR_EXCLUDE_PREFIX)
        .arg("--exclude")
        .arg(format!("{}/", paths.test_dir.display()))
        .arg("--filter")
        .arg(paths.project_root.display().to_string())
        .arg("--gcov-object-directory")
        .arg(paths.build_dir.display().to_string())
        .arg("--html-details")
        .arg(paths.gcovr_html.display().to_string())
        .arg("--html-theme")
        .arg("github.dark-green")
        .arg("--json-summary")
        .arg(paths.gcovr_json.display().to_string())
        .arg("--json-summary-pretty")
        .arg("--root")
        .arg(paths.project_root.display().to_string())
        .arg("--sort")
        .arg("uncovered-percent")
        .arg("--verbose")
        .current_dir(paths.project_root)
        .run();
    if !out.success {
        println!("Error running gcovr");
        if let Some(output) = out.output {
            println!("{output}");
        }
        return false;
    }

    true
}

/// Generate both coverage reports from the instrumented build tree.
pub fn process_coverage(tools: &ToolsSection, paths: &CoveragePaths<'_>) -> bool {
    run_lcov(tools, paths) && run_gcovr(tools, paths)
}

/// The slice of gcovr's `--json-summary` output the analysis gate cares
/// about. Unknown fields are ignored.
#[derive(Debug, Deserialize)]
pub struct CoverageSummary {
    pub branch_covered: u64,
    pub branch_total: u64,
    pub decision_covered: u64,
    pub decision_total: u64,
    pub function_covered: u64,
    pub function_total: u64,
    pub line_covered: u64,
    pub line_total: u64,
}

impl CoverageSummary {
    /// Full coverage means every counted branch, decision, function and line
    /// was exercised. Zero totals trivially pass.
    pub fn is_complete(&self) -> bool {
        self.branch_covered == self.branch_total
            && self.decision_covered == self.decision_total
            && self.function_covered == self.function_total
            && self.line_covered == self.line_total
    }
}

fn load_summary(summary_json: &Path) -> Result<CoverageSummary> {
    let text = fs::read_to_string(summary_json)
        .with_context(|| format!("reading coverage summary {summary_json:?}"))?;
    serde_json::from_str(&text)
        .with_context(|| format!("parsing coverage summary {summary_json:?}"))
}

/// Gate on the gcovr JSON summary: anything short of full coverage fails.
pub fn analyze_coverage(summary_json: &Path) -> bool {
    let summary = match load_summary(summary_json) {
        Ok(summary) => summary,
        Err(err) => {
            error!("coverage analysis failed: {err:#}");
            return false;
        }
    };
    if !summary.is_complete() {
        println!("Incomplete coverage");
        return false;
    }
    true
}
