// src/ops/format.rs

//! Formatting checks and fixes for cmake, C++, JSON and Python sources.
//!
//! C++ goes through clang-format with the project's pinned style file, cmake
//! through cmake-format, Python through isort then black, and JSON is
//! normalized in-process (two-space indent, sorted keys, trailing newline).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rayon::prelude::*;

use crate::config::model::ToolsSection;
use crate::exec::Invocation;
use crate::ops::files::{is_cmake_file, is_cpp_file, is_json_file, is_python_file};

const PYTHON_LINE_LENGTH: &str = "88";

pub fn needs_formatting(path: &Path) -> bool {
    is_cmake_file(path) || is_cpp_file(path) || is_json_file(path) || is_python_file(path)
}

fn run_tool(invocation: Invocation) -> Option<String> {
    let out = invocation.run();
    if out.success {
        None
    } else {
        Some(out.output.unwrap_or_default())
    }
}

fn check_cmake(tools: &ToolsSection, file: &Path) -> Option<String> {
    run_tool(
        Invocation::new(&tools.cmake_format)
            .arg("--enable-markup")
            .arg("FALSE")
            .arg("--check")
            .arg(file.display().to_string()),
    )
}

fn fix_cmake(tools: &ToolsSection, file: &Path) -> Option<String> {
    run_tool(
        Invocation::new(&tools.cmake_format)
            .arg("--enable-markup")
            .arg("FALSE")
            .arg("-i")
            .arg(file.display().to_string()),
    )
}

fn check_cpp(tools: &ToolsSection, style_config: &Path, file: &Path) -> Option<String> {
    run_tool(
        Invocation::new(&tools.clang_format)
            .arg(format!("--style=file:{}", style_config.display()))
            .arg("--dry-run")
            .arg("-Werror")
            .arg(file.display().to_string()),
    )
}

fn fix_cpp(tools: &ToolsSection, style_config: &Path, file: &Path) -> Option<String> {
    run_tool(
        Invocation::new(&tools.clang_format)
            .arg(format!("--style=file:{}", style_config.display()))
            .arg("-i")
            .arg(file.display().to_string()),
    )
}

/// Canonical rendering of a JSON document: two-space indent, object keys
/// sorted, single trailing newline. `serde_json::Value` keeps object keys in
/// a sorted map, so parsing and pretty-printing is enough.
fn canonical_json(text: &str) -> Result<String> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    let mut rendered = serde_json::to_string_pretty(&value)?;
    rendered.push('\n');
    Ok(rendered)
}

fn check_json(file: &Path) -> Option<String> {
    let result: Result<Option<String>> = (|| {
        let original = fs::read_to_string(file).with_context(|| format!("reading {file:?}"))?;
        if canonical_json(&original)? == original {
            Ok(None)
        } else {
            Ok(Some(format!("Incorrect JSON file formatting ({file:?})\n")))
        }
    })();
    match result {
        Ok(problem) => problem,
        Err(err) => Some(format!("Error ({file:?}): {err:#}\n")),
    }
}

fn fix_json(file: &Path) -> Option<String> {
    let result: Result<()> = (|| {
        let original = fs::read_to_string(file).with_context(|| format!("reading {file:?}"))?;
        let rendered = canonical_json(&original)?;
        if rendered != original {
            fs::write(file, rendered).with_context(|| format!("writing {file:?}"))?;
        }
        Ok(())
    })();
    match result {
        Ok(()) => None,
        Err(err) => Some(format!("Error ({file:?}): {err:#}\n")),
    }
}

fn isort(tools: &ToolsSection, check: bool, file: &Path) -> Invocation {
    let mut invocation = Invocation::new(&tools.python).arg("-m").arg("isort");
    if check {
        invocation = invocation.arg("--check");
    }
    invocation
        .arg("--combine-star")
        .arg("--float-to-top")
        .arg("--force-single-line-imports")
        .arg("--ignore-whitespace")
        .arg("--sort-reexports")
        .arg("--star-first")
        .arg("--line-length")
        .arg(PYTHON_LINE_LENGTH)
        .arg(file.display().to_string())
}

fn black(tools: &ToolsSection, check: bool, file: &Path) -> Invocation {
    let mut invocation = Invocation::new(&tools.python)
        .arg("-m")
        .arg("black")
        .arg("--quiet");
    if check {
        invocation = invocation.arg("--check");
    }
    invocation
        .arg("--line-length")
        .arg(PYTHON_LINE_LENGTH)
        .arg(file.display().to_string())
}

fn check_python(tools: &ToolsSection, file: &Path) -> Option<String> {
    run_tool(isort(tools, true, file)).or_else(|| run_tool(black(tools, true, file)))
}

fn fix_python(tools: &ToolsSection, file: &Path) -> Option<String> {
    run_tool(isort(tools, false, file)).or_else(|| run_tool(black(tools, false, file)))
}

fn dispatch(
    tools: &ToolsSection,
    style_config: &Path,
    fix: bool,
    file: &Path,
) -> Option<String> {
    if is_cmake_file(file) {
        return if fix {
            fix_cmake(tools, file)
        } else {
            check_cmake(tools, file)
        };
    }
    if is_cpp_file(file) {
        return if fix {
            fix_cpp(tools, style_config, file)
        } else {
            check_cpp(tools, style_config, file)
        };
    }
    if is_json_file(file) {
        return if fix { fix_json(file) } else { check_json(file) };
    }
    if is_python_file(file) {
        return if fix {
            fix_python(tools, file)
        } else {
            check_python(tools, file)
        };
    }
    Some(format!(
        "Expected to handle unsupported file type ({file:?})\n"
    ))
}

fn run_over_files(
    tools: &ToolsSection,
    style_config: &Path,
    candidates: &[PathBuf],
    fix: bool,
) -> bool {
    let failures: Vec<(&PathBuf, Option<String>)> = candidates
        .par_iter()
        .filter(|path| needs_formatting(path))
        .filter_map(|path| {
            dispatch(tools, style_config, fix, path).map(|output| (path, Some(output)))
        })
        .collect();

    for (file, output) in &failures {
        if let Some(output) = output {
            println!("{output}");
        }
        if fix {
            println!("Error formatting file {file:?}");
        } else {
            println!("Error: {file:?}\nIncorrect formatting; run the build in \"format\" mode");
        }
    }
    failures.is_empty()
}

/// Verify formatting across `candidates` without modifying anything.
pub fn check_formatting(
    tools: &ToolsSection,
    style_config: &Path,
    candidates: &[PathBuf],
) -> bool {
    run_over_files(tools, style_config, candidates, false)
}

/// Rewrite `candidates` in place to the canonical formatting.
pub fn format_files(tools: &ToolsSection, style_config: &Path, candidates: &[PathBuf]) -> bool {
    run_over_files(tools, style_config, candidates, true)
}
