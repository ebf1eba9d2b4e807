// src/config/validate.rs

use anyhow::{Context, Result, anyhow};
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::config::model::ConfigFile;

/// Run basic semantic validation against a loaded configuration.
///
/// This checks:
/// - no tool command name is empty
/// - `project.library_name` is a plausible file-system name
/// - all `[scan].exclude` patterns compile as globs
///
/// It does **not** check that any configured path exists; that happens in the
/// workspace preflight, right before the task graph runs.
pub fn validate_config(cfg: &ConfigFile) -> Result<()> {
    validate_tools(cfg)?;
    validate_project(cfg)?;
    build_exclude_globs(&cfg.scan.exclude).context("invalid [scan].exclude pattern")?;
    Ok(())
}

/// Compile the exclude patterns into a [`GlobSet`]. Shared with the tree
/// walker so validation and execution agree on what a pattern means.
pub fn build_exclude_globs(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob =
            Glob::new(pattern).with_context(|| format!("compiling glob pattern '{pattern}'"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

fn validate_tools(cfg: &ConfigFile) -> Result<()> {
    let tools = &cfg.tools;
    let entries = [
        ("cmake", &tools.cmake),
        ("ctest", &tools.ctest),
        ("clang_format", &tools.clang_format),
        ("clang_tidy", &tools.clang_tidy),
        ("cmake_format", &tools.cmake_format),
        ("gcovr", &tools.gcovr),
        ("lcov", &tools.lcov),
        ("genhtml", &tools.genhtml),
        ("python", &tools.python),
        ("git", &tools.git),
        ("clang_cc", &tools.clang_cc),
        ("clang_cxx", &tools.clang_cxx),
        ("gcc_cc", &tools.gcc_cc),
        ("gcc_cxx", &tools.gcc_cxx),
    ];

    for (key, value) in entries {
        if value.trim().is_empty() {
            return Err(anyhow!("[tools].{key} must not be empty"));
        }
    }

    Ok(())
}

fn validate_project(cfg: &ConfigFile) -> Result<()> {
    let name = &cfg.project.library_name;
    if name.trim().is_empty() {
        return Err(anyhow!("[project].library_name must not be empty"));
    }
    if name.contains([' ', '/']) {
        return Err(anyhow!(
            "[project].library_name must not contain spaces or path separators (got '{name}')"
        ));
    }
    Ok(())
}
