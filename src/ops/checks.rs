// src/ops/checks.rs

//! Miscellaneous project checks and installation-layout verification.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use globset::GlobSet;
use regex::Regex;
use tracing::error;

use crate::config::model::ConfigFile;
use crate::ops::cmake::BuildConfig;
use crate::ops::files::{self, is_cpp_header_file};

fn no_spaces_in_paths(root: &Path, excludes: &GlobSet) -> bool {
    for file in files::find_all_files(root, excludes) {
        let relative = file.strip_prefix(root).unwrap_or(&file);
        if relative.to_string_lossy().contains(' ') {
            println!("Error ({relative:?}):\nNo spaces allowed in file paths");
            return false;
        }
    }
    true
}

fn main_header_has_no_includes(main_header: &Path) -> Result<bool> {
    let pattern = Regex::new(r"# *include")?;
    let contents = fs::read_to_string(main_header)
        .with_context(|| format!("reading main header {main_header:?}"))?;
    Ok(!pattern.is_match(&contents))
}

fn headers_contain_pragma_once(root: &Path, excludes: &GlobSet) -> bool {
    for header in files::find_files(root, excludes, is_cpp_header_file) {
        let Ok(contents) = fs::read_to_string(&header) else {
            println!("Error ({header:?}):\nUnreadable header");
            return false;
        };
        let guards = contents
            .lines()
            .filter(|line| line.trim() == "#pragma once")
            .count();
        if guards != 1 {
            println!("Error ({header:?}):\n\"#pragma once\" not found");
            return false;
        }
    }
    true
}

/// Project hygiene checks: the umbrella header includes nothing, no path
/// contains a space, and every header carries exactly one `#pragma once`.
pub fn misc_checks(root: &Path, main_header: &Path, excludes: &GlobSet) -> bool {
    match main_header_has_no_includes(main_header) {
        Ok(true) => {}
        Ok(false) => {
            println!("Error: Header {main_header:?} must not include other headers");
            return false;
        }
        Err(err) => {
            error!("misc checks failed: {err:#}");
            return false;
        }
    }

    if !no_spaces_in_paths(root, excludes) {
        println!("Error: file paths must not contain spaces");
        return false;
    }

    if !headers_contain_pragma_once(root, excludes) {
        println!("Error: not all headers contain a \"#pragma once\" include guard");
        return false;
    }

    true
}

fn expected_cmake_and_header_files(library: &str) -> Vec<String> {
    let mut expected = vec![
        format!("cmake/{library}-config.cmake"),
        format!("cmake/{library}-config-version.cmake"),
        format!("include/{library}/{library}.hpp"),
    ];
    for config in BuildConfig::ALL {
        expected.push(format!(
            "cmake/{library}-config-{}.cmake",
            config.name().to_lowercase()
        ));
    }
    expected
}

/// Files a static-library installation must contain, install-dir relative.
/// Derived from the library name unless overridden in `[install]`.
pub fn expected_static_files(cfg: &ConfigFile) -> Vec<String> {
    if let Some(overridden) = &cfg.install.static_files {
        return overridden.clone();
    }
    let library = &cfg.project.library_name;
    let mut expected = expected_cmake_and_header_files(library);
    for config in BuildConfig::ALL {
        expected.push(format!("lib/{}/lib{library}.a", config.name()));
    }
    expected
}

/// Files a shared-library installation must contain, install-dir relative.
pub fn expected_shared_files(cfg: &ConfigFile) -> Vec<String> {
    if let Some(overridden) = &cfg.install.shared_files {
        return overridden.clone();
    }
    let library = &cfg.project.library_name;
    let mut expected = expected_cmake_and_header_files(library);
    for config in BuildConfig::ALL {
        expected.push(format!("lib/{}/lib{library}.so", config.name()));
    }
    expected
}

/// Verify an installation tree contains exactly the expected files: every
/// expected path present, nothing extra.
pub fn verify_install_contents(install_dir: &Path, expected: &[String]) -> bool {
    let found = files::find_all_files(install_dir, &GlobSet::empty());

    let mut ok = true;
    for relative in expected {
        let path = install_dir.join(relative);
        if !found.contains(&path) {
            println!("File not found: {path:?}");
            ok = false;
        }
    }
    if found.len() != expected.len() {
        println!(
            "Unexpected files are present in {install_dir:?} \
             (found {}, expected {})",
            found.len(),
            expected.len()
        );
        ok = false;
    }
    ok
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_excludes() -> GlobSet {
        GlobSet::empty()
    }

    #[test]
    fn main_header_with_includes_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        let header = root.join("main.hpp");
        fs::write(&header, "#pragma once\n#include <vector>\n").unwrap();

        assert!(!misc_checks(root, &header, &no_excludes()));

        fs::write(&header, "#pragma once\nnamespace core {}\n").unwrap();
        assert!(misc_checks(root, &header, &no_excludes()));
    }

    #[test]
    fn spaces_in_paths_are_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        let header = root.join("main.hpp");
        fs::write(&header, "#pragma once\n").unwrap();
        fs::write(root.join("bad name.txt"), "x").unwrap();

        assert!(!misc_checks(root, &header, &no_excludes()));
    }

    #[test]
    fn header_without_pragma_once_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        let main = root.join("main.hpp");
        fs::write(&main, "#pragma once\n").unwrap();
        fs::write(root.join("other.hpp"), "int x;\n").unwrap();

        assert!(!misc_checks(root, &main, &no_excludes()));
    }

    #[test]
    fn derived_install_layout_uses_library_name() {
        let cfg = ConfigFile::default();
        let static_files = expected_static_files(&cfg);
        assert!(static_files.contains(&"include/core/core.hpp".to_string()));
        assert!(static_files.contains(&"lib/Debug/libcore.a".to_string()));
        assert!(static_files.contains(&"cmake/core-config-relwithdebinfo.cmake".to_string()));

        let shared_files = expected_shared_files(&cfg);
        assert!(shared_files.contains(&"lib/Release/libcore.so".to_string()));
        assert!(!shared_files.iter().any(|f| f.ends_with(".a")));
    }

    #[test]
    fn install_section_overrides_win() {
        let mut cfg = ConfigFile::default();
        cfg.install.static_files = Some(vec!["lib/libcustom.a".to_string()]);
        assert_eq!(expected_static_files(&cfg), vec!["lib/libcustom.a"]);
    }

    #[test]
    fn install_verification_requires_exact_contents() {
        let tmp = tempfile::tempdir().unwrap();
        let install = tmp.path();
        fs::create_dir_all(install.join("lib")).unwrap();
        fs::write(install.join("lib/liba.a"), "x").unwrap();

        let expected = vec!["lib/liba.a".to_string()];
        assert!(verify_install_contents(install, &expected));

        // missing expected file
        let expected_more = vec!["lib/liba.a".to_string(), "lib/libb.a".to_string()];
        assert!(!verify_install_contents(install, &expected_more));

        // extra file on disk
        fs::write(install.join("lib/stray.a"), "x").unwrap();
        assert!(!verify_install_contents(install, &expected));
    }
}
