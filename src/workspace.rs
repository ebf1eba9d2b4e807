// src/workspace.rs

//! Absolute filesystem layout of the orchestrated project, derived once from
//! the configuration. Everything downstream works with these paths instead
//! of re-joining strings.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, ensure};

use crate::config::model::ConfigFile;
use crate::ops::cmake::{LibKind, Toolchain};

/// The two installation-test flavors: consuming the installed package via
/// `find_package` without a version constraint, and with an exact version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallTestFlavor {
    FindPackageNoVersion,
    FindPackageExactVersion,
}

impl InstallTestFlavor {
    pub const ALL: [InstallTestFlavor; 2] = [
        InstallTestFlavor::FindPackageNoVersion,
        InstallTestFlavor::FindPackageExactVersion,
    ];

    fn dir_name(self) -> &'static str {
        match self {
            InstallTestFlavor::FindPackageNoVersion => "find_package_no_version_test",
            InstallTestFlavor::FindPackageExactVersion => "find_package_exact_version_test",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            InstallTestFlavor::FindPackageNoVersion => "find_package, no version",
            InstallTestFlavor::FindPackageExactVersion => "find_package, exact version",
        }
    }
}

/// Resolved project layout. All paths are absolute.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub root: PathBuf,
    pub library_name: String,

    pub cmake_source_dir: PathBuf,
    pub cmake_lists_file: PathBuf,
    pub cmake_presets_file: PathBuf,

    pub clang_format_config: PathBuf,
    pub clang_tidy_config: PathBuf,

    pub main_header: PathBuf,
    pub license_file: PathBuf,
    pub test_dir: PathBuf,

    pub coverage_lcov_dir: PathBuf,
    pub coverage_lcov_file: PathBuf,
    pub coverage_gcovr_dir: PathBuf,
    pub coverage_gcovr_html: PathBuf,
    pub coverage_gcovr_json: PathBuf,

    pub install_tests_dir: PathBuf,
    pub examples_dir: PathBuf,
}

fn join_config_path(root: &Path, configured: &str) -> PathBuf {
    let path = Path::new(configured);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

impl Workspace {
    pub fn from_config(cfg: &ConfigFile) -> Result<Self> {
        let root = std::path::absolute(&cfg.project.root)
            .with_context(|| format!("resolving project root {:?}", cfg.project.root))?;
        let library_name = cfg.project.library_name.clone();

        let cmake_source_dir = join_config_path(&root, &cfg.project.cmake_source_dir);
        let main_header = match &cfg.project.main_header {
            Some(configured) => join_config_path(&root, configured),
            None => root
                .join("include")
                .join(&library_name)
                .join(format!("{library_name}.hpp")),
        };

        // Generated directories carry the `___` marker so tree walks skip them.
        let coverage_lcov_dir = root.join("coverage_lcov___");
        let coverage_gcovr_dir = root.join("coverage_gcovr___");

        Ok(Self {
            cmake_lists_file: cmake_source_dir.join("CMakeLists.txt"),
            cmake_presets_file: cmake_source_dir.join("CMakePresets.json"),
            clang_format_config: cmake_source_dir.join(".clang-format"),
            clang_tidy_config: cmake_source_dir.join(".clang-tidy"),
            license_file: join_config_path(&root, &cfg.project.license_file),
            test_dir: root.join("test"),
            coverage_lcov_file: coverage_lcov_dir.join("coverage.info"),
            coverage_gcovr_html: coverage_gcovr_dir.join("index.html"),
            coverage_gcovr_json: coverage_gcovr_dir.join("coverage.json"),
            install_tests_dir: root.join("test").join("install_tests"),
            examples_dir: root.join("examples"),
            root,
            library_name,
            cmake_source_dir,
            main_header,
            coverage_lcov_dir,
            coverage_gcovr_dir,
        })
    }

    /// Fail early when the project layout is not what the pipeline expects.
    pub fn preflight(&self) -> Result<()> {
        ensure!(
            self.cmake_lists_file.is_file(),
            "CMakeLists.txt not found at {:?}",
            self.cmake_lists_file
        );
        ensure!(
            self.cmake_presets_file.is_file(),
            "CMakePresets.json not found at {:?}",
            self.cmake_presets_file
        );
        ensure!(
            self.main_header.is_file(),
            "main header not found at {:?}",
            self.main_header
        );
        ensure!(
            self.license_file.is_file(),
            "license file not found at {:?}",
            self.license_file
        );
        Ok(())
    }

    /// Root directory of one installation-test flavor.
    pub fn install_test_dir(&self, flavor: InstallTestFlavor) -> PathBuf {
        self.install_tests_dir.join(flavor.dir_name())
    }

    /// CMake source directory of one installation-test flavor; its presets
    /// file defines the test's own build trees.
    pub fn install_test_cmake_source_dir(&self, flavor: InstallTestFlavor) -> PathBuf {
        self.install_test_dir(flavor).join("infrastructure")
    }

    /// Where one installation-test flavor expects the staged install tree
    /// for a toolchain / library-kind combination.
    pub fn install_test_staging_dir(
        &self,
        flavor: InstallTestFlavor,
        toolchain: Toolchain,
        kind: LibKind,
    ) -> PathBuf {
        let shared_suffix = match kind {
            LibKind::Static => "",
            LibKind::Shared => "_shared",
        };
        self.install_test_dir(flavor).join(format!(
            "{}_install_linux_{}{}___",
            self.library_name,
            toolchain.dir_component(),
            shared_suffix
        ))
    }

    /// CMake source directory of the quick-start example.
    pub fn example_cmake_source_dir(&self) -> PathBuf {
        self.examples_dir.join("quick_start_build_and_install")
    }

    /// Where the quick-start example expects the staged install tree.
    pub fn example_staging_dir(&self) -> PathBuf {
        self.example_cmake_source_dir()
            .join(format!("{}_install___", self.library_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_layout_from_defaults() {
        let ws = Workspace::from_config(&ConfigFile::default()).unwrap();
        assert!(ws.root.is_absolute());
        assert_eq!(ws.cmake_source_dir, ws.root.join("infrastructure"));
        assert_eq!(
            ws.main_header,
            ws.root.join("include").join("core").join("core.hpp")
        );
        assert_eq!(ws.coverage_gcovr_json, ws.root.join("coverage_gcovr___/coverage.json"));
    }

    #[test]
    fn absolute_config_paths_are_kept() {
        let mut cfg = ConfigFile::default();
        cfg.project.main_header = Some("/elsewhere/api.hpp".to_string());
        let ws = Workspace::from_config(&cfg).unwrap();
        assert_eq!(ws.main_header, PathBuf::from("/elsewhere/api.hpp"));
    }

    #[test]
    fn install_test_staging_dirs_are_disjoint_and_marked() {
        let ws = Workspace::from_config(&ConfigFile::default()).unwrap();
        let mut dirs = Vec::new();
        for flavor in InstallTestFlavor::ALL {
            for toolchain in [Toolchain::Clang, Toolchain::Gcc] {
                for kind in [LibKind::Static, LibKind::Shared] {
                    dirs.push(ws.install_test_staging_dir(flavor, toolchain, kind));
                }
            }
        }
        let unique: std::collections::BTreeSet<_> = dirs.iter().collect();
        assert_eq!(unique.len(), dirs.len());
        assert!(dirs.iter().all(|d| d.to_string_lossy().ends_with("___")));
    }

    #[test]
    fn preflight_requires_key_files() {
        let tmp = tempfile::tempdir().unwrap();
        let mut cfg = ConfigFile::default();
        cfg.project.root = tmp.path().to_string_lossy().into_owned();
        let ws = Workspace::from_config(&cfg).unwrap();
        assert!(ws.preflight().is_err());

        std::fs::create_dir_all(&ws.cmake_source_dir).unwrap();
        std::fs::write(&ws.cmake_lists_file, "").unwrap();
        std::fs::write(&ws.cmake_presets_file, "{}").unwrap();
        std::fs::create_dir_all(ws.main_header.parent().unwrap()).unwrap();
        std::fs::write(&ws.main_header, "#pragma once\n").unwrap();
        std::fs::write(&ws.license_file, "MIT\n").unwrap();
        assert!(ws.preflight().is_ok());
    }
}
