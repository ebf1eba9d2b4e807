// src/ops/cmake.rs

//! CMake preset handling: configure, build, test, install, and the
//! resolution of build/install directories from `CMakePresets.json`.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde_json::Value;

use crate::config::model::ToolsSection;
use crate::exec::Invocation;
use crate::ops::system;

/// Which compiler family a preset builds with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Toolchain {
    Clang,
    Gcc,
}

impl Toolchain {
    pub fn display_name(self) -> &'static str {
        match self {
            Toolchain::Clang => "Clang",
            Toolchain::Gcc => "GCC",
        }
    }

    pub fn dir_component(self) -> &'static str {
        match self {
            Toolchain::Clang => "clang",
            Toolchain::Gcc => "gcc",
        }
    }
}

/// Static vs shared library builds. The two kinds use disjoint presets and
/// build trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LibKind {
    Static,
    Shared,
}

impl LibKind {
    /// Label used in task names, matching the install artifact terminology.
    pub fn display_name(self) -> &'static str {
        match self {
            LibKind::Static => "static",
            LibKind::Shared => "dynamic",
        }
    }
}

/// Multi-config build configurations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BuildConfig {
    Debug,
    RelWithDebInfo,
    Release,
}

impl BuildConfig {
    pub const ALL: [BuildConfig; 3] = [
        BuildConfig::Debug,
        BuildConfig::RelWithDebInfo,
        BuildConfig::Release,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BuildConfig::Debug => "Debug",
            BuildConfig::RelWithDebInfo => "RelWithDebInfo",
            BuildConfig::Release => "Release",
        }
    }
}

impl fmt::Display for BuildConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The fixed universe of CMake presets the orchestrator drives. Each carries
/// its toolchain and the configure/build/test preset names from
/// `CMakePresets.json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Preset {
    LinuxClang,
    LinuxGcc,
    LinuxClangShared,
    LinuxGccShared,
    LinuxGccCoverage,
    Example,
    ExampleShared,
    AddressSanitizerClang,
    UndefinedBehaviourSanitizerClang,
}

impl Preset {
    /// The preset for an ordinary (non-sanitizer, non-coverage) build.
    pub fn library(toolchain: Toolchain, kind: LibKind) -> Self {
        match (toolchain, kind) {
            (Toolchain::Clang, LibKind::Static) => Preset::LinuxClang,
            (Toolchain::Gcc, LibKind::Static) => Preset::LinuxGcc,
            (Toolchain::Clang, LibKind::Shared) => Preset::LinuxClangShared,
            (Toolchain::Gcc, LibKind::Shared) => Preset::LinuxGccShared,
        }
    }

    pub fn toolchain(self) -> Toolchain {
        match self {
            Preset::LinuxClang
            | Preset::LinuxClangShared
            | Preset::Example
            | Preset::ExampleShared
            | Preset::AddressSanitizerClang
            | Preset::UndefinedBehaviourSanitizerClang => Toolchain::Clang,
            Preset::LinuxGcc | Preset::LinuxGccShared | Preset::LinuxGccCoverage => Toolchain::Gcc,
        }
    }

    pub fn is_shared(self) -> bool {
        matches!(
            self,
            Preset::LinuxClangShared | Preset::LinuxGccShared | Preset::ExampleShared
        )
    }

    pub fn configure_name(self) -> &'static str {
        match self {
            Preset::LinuxClang => "configure_linux_clang",
            Preset::LinuxGcc => "configure_linux_gcc",
            Preset::LinuxClangShared => "configure_linux_clang_shared",
            Preset::LinuxGccShared => "configure_linux_gcc_shared",
            Preset::LinuxGccCoverage => "configure_linux_gcc_coverage",
            Preset::Example => "example_configure",
            Preset::ExampleShared => "example_configure_shared",
            Preset::AddressSanitizerClang => "configure_linux_clang_address_sanitizer",
            Preset::UndefinedBehaviourSanitizerClang => {
                "configure_linux_clang_undefined_behaviour_sanitizer"
            }
        }
    }

    pub fn build_name(self) -> &'static str {
        match self {
            Preset::LinuxClang => "build_linux_clang",
            Preset::LinuxGcc => "build_linux_gcc",
            Preset::LinuxClangShared => "build_linux_clang_shared",
            Preset::LinuxGccShared => "build_linux_gcc_shared",
            Preset::LinuxGccCoverage => "build_linux_gcc_coverage",
            Preset::Example => "example_build",
            Preset::ExampleShared => "example_build_shared",
            Preset::AddressSanitizerClang => "build_linux_clang_address_sanitizer",
            Preset::UndefinedBehaviourSanitizerClang => {
                "build_linux_clang_undefined_behaviour_sanitizer"
            }
        }
    }

    pub fn test_name(self) -> &'static str {
        match self {
            Preset::LinuxClang => "test_linux_clang",
            Preset::LinuxGcc => "test_linux_gcc",
            Preset::LinuxClangShared => "test_linux_clang_shared",
            Preset::LinuxGccShared => "test_linux_gcc_shared",
            Preset::LinuxGccCoverage => "test_linux_gcc_coverage",
            Preset::Example => "example_test",
            Preset::ExampleShared => "example_test_shared",
            Preset::AddressSanitizerClang => "test_linux_clang_address_sanitizer",
            Preset::UndefinedBehaviourSanitizerClang => {
                "test_linux_clang_undefined_behaviour_sanitizer"
            }
        }
    }
}

/// CC / CXX overrides selecting the preset's compiler family.
fn compiler_env(tools: &ToolsSection, toolchain: Toolchain) -> Vec<(String, String)> {
    let (cc, cxx) = match toolchain {
        Toolchain::Clang => (tools.clang_cc.clone(), tools.clang_cxx.clone()),
        Toolchain::Gcc => (tools.gcc_cc.clone(), tools.gcc_cxx.clone()),
    };
    vec![("CC".to_string(), cc), ("CXX".to_string(), cxx)]
}

/// Configure a preset. An existing build directory is taken to mean the
/// configuration is already done; a `clean` run removes it first.
pub fn configure(tools: &ToolsSection, preset: Preset, cmake_source_dir: &Path) -> bool {
    let build_dir = match build_dir_from_preset(preset, cmake_source_dir) {
        Ok(dir) => dir,
        Err(err) => {
            println!("Error: {err:#}");
            return false;
        }
    };

    if build_dir.exists() {
        return true;
    }
    if fs::create_dir_all(&build_dir).is_err() {
        println!("Error: failed to create {}", build_dir.display());
        return false;
    }

    Invocation::new(&tools.cmake)
        .arg("--preset")
        .arg(preset.configure_name())
        .current_dir(cmake_source_dir)
        .envs(&compiler_env(tools, preset.toolchain()))
        .run()
        .report_on_failure()
}

/// Build a target (`all`, `all_tests`, `test`, ...) for one configuration.
pub fn build(
    tools: &ToolsSection,
    config: BuildConfig,
    preset: Preset,
    cmake_source_dir: &Path,
    target: &str,
) -> bool {
    Invocation::new(&tools.cmake)
        .arg("--build")
        .arg("--preset")
        .arg(preset.build_name())
        .arg("--config")
        .arg(config.name())
        .arg("--target")
        .arg(target)
        .arg("--parallel")
        .arg(system::cpu_count().to_string())
        .current_dir(cmake_source_dir)
        .envs(&compiler_env(tools, preset.toolchain()))
        .run()
        .report_on_failure()
}

/// Run ctest for a preset/configuration, optionally restricted to tests
/// carrying a matching label (`^test$` for the regular suite, `^valgrind$`
/// for the memcheck suite).
pub fn ctest(
    tools: &ToolsSection,
    preset: Preset,
    config: BuildConfig,
    label_include_regex: Option<&str>,
    cmake_source_dir: &Path,
) -> bool {
    let mut inv = Invocation::new(&tools.ctest)
        .arg("--preset")
        .arg(preset.test_name())
        .arg("--build-config")
        .arg(config.name())
        .arg("--parallel")
        .arg(system::cpu_count().to_string())
        .current_dir(cmake_source_dir);

    if let Some(regex) = label_include_regex {
        inv = inv.arg("--label-regex").arg(regex);
    }

    inv.run().report_on_failure()
}

/// Install one configuration via the `install` target.
pub fn install(
    tools: &ToolsSection,
    preset: Preset,
    config: BuildConfig,
    cmake_source_dir: &Path,
) -> bool {
    Invocation::new(&tools.cmake)
        .arg("--build")
        .arg("--preset")
        .arg(preset.build_name())
        .arg("--target")
        .arg("install")
        .arg("--config")
        .arg(config.name())
        .current_dir(cmake_source_dir)
        .run()
        .report_on_failure()
}

fn dir_from_preset(dir_key: &str, preset: Preset, cmake_source_dir: &Path) -> Result<PathBuf> {
    let presets_path = cmake_source_dir.join("CMakePresets.json");
    let contents = fs::read_to_string(&presets_path)
        .with_context(|| format!("reading {}", presets_path.display()))?;
    let data: Value = serde_json::from_str(&contents)
        .with_context(|| format!("parsing {}", presets_path.display()))?;

    let configure_presets = data
        .get("configurePresets")
        .and_then(Value::as_array)
        .ok_or_else(|| anyhow!("no configurePresets array in {}", presets_path.display()))?;

    let entry = configure_presets
        .iter()
        .find(|p| p.get("name").and_then(Value::as_str) == Some(preset.configure_name()))
        .ok_or_else(|| {
            anyhow!(
                "configure preset '{}' not found in {}",
                preset.configure_name(),
                presets_path.display()
            )
        })?;

    let dir = entry.get(dir_key).and_then(Value::as_str).ok_or_else(|| {
        anyhow!(
            "configure preset '{}' has no '{}' entry",
            preset.configure_name(),
            dir_key
        )
    })?;

    let dir = dir.replace("${sourceDir}", &cmake_source_dir.to_string_lossy());
    Ok(PathBuf::from(dir))
}

/// Resolve a preset's build tree (`binaryDir`) from `CMakePresets.json`.
pub fn build_dir_from_preset(preset: Preset, cmake_source_dir: &Path) -> Result<PathBuf> {
    dir_from_preset("binaryDir", preset, cmake_source_dir)
}

/// Resolve a preset's install tree (`installDir`) from `CMakePresets.json`.
pub fn install_dir_from_preset(preset: Preset, cmake_source_dir: &Path) -> Result<PathBuf> {
    dir_from_preset("installDir", preset, cmake_source_dir)
}

/// Remove a preset's build tree. Missing directories are fine (nothing to
/// clean); unresolvable presets are fine too when the tree was never
/// configured.
pub fn clean_build_dir(preset: Preset, cmake_source_dir: &Path) {
    if let Ok(dir) = build_dir_from_preset(preset, cmake_source_dir) {
        system::remove_dir(&dir);
    }
}

/// Remove a preset's install tree.
pub fn clean_install_dir(preset: Preset, cmake_source_dir: &Path) {
    if let Ok(dir) = install_dir_from_preset(preset, cmake_source_dir) {
        system::remove_dir(&dir);
    }
}

/// Copy a preset's install tree to a destination directory (used to stage
/// artifacts for installation tests and examples).
pub fn copy_install_dir(preset: Preset, cmake_source_dir: &Path, destination: &Path) -> bool {
    let install_dir = match install_dir_from_preset(preset, cmake_source_dir) {
        Ok(dir) => dir,
        Err(err) => {
            println!("Error: {err:#}");
            return false;
        }
    };

    if let Err(err) = system::copy_dir_recursive(&install_dir, destination) {
        println!(
            "Error: copying {} to {}: {err}",
            install_dir.display(),
            destination.display()
        );
        return false;
    }

    true
}
