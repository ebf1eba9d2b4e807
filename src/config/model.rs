// src/config/model.rs

use serde::Deserialize;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [project]
/// root = "."
/// library_name = "core"
///
/// [tools]
/// clang_cxx = "clang++-20"
///
/// [scan]
/// exclude = ["third_party/**"]
/// ```
///
/// All sections are optional and have working defaults, so an empty file (or
/// no file at all for `--dry-run` experiments) is a valid configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ConfigFile {
    /// Project layout from `[project]`.
    #[serde(default)]
    pub project: ProjectSection,

    /// External tool command names from `[tools]`.
    #[serde(default)]
    pub tools: ToolsSection,

    /// Source-tree scanning behaviour from `[scan]`.
    #[serde(default)]
    pub scan: ScanSection,

    /// Installation-layout expectations from `[install]`.
    #[serde(default)]
    pub install: InstallSection,

    /// Licensing expectations from `[legal]`.
    #[serde(default)]
    pub legal: LegalSection,
}

/// `[project]` section: where the orchestrated project lives and what its
/// key files are called. All paths are relative to `root` unless absolute.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectSection {
    /// Project root directory.
    #[serde(default = "default_root")]
    pub root: String,

    /// Directory holding `CMakeLists.txt` and `CMakePresets.json`.
    #[serde(default = "default_cmake_source_dir")]
    pub cmake_source_dir: String,

    /// Name of the installed library, used to derive the expected
    /// installation layout and the main header path.
    #[serde(default = "default_library_name")]
    pub library_name: String,

    /// License file validated by the legal checks.
    #[serde(default = "default_license_file")]
    pub license_file: String,

    /// The public umbrella header; it must not include any other header.
    /// If unset, derived as `include/<library_name>/<library_name>.hpp`.
    #[serde(default)]
    pub main_header: Option<String>,
}

fn default_root() -> String {
    ".".to_string()
}

fn default_cmake_source_dir() -> String {
    "infrastructure".to_string()
}

fn default_library_name() -> String {
    "core".to_string()
}

fn default_license_file() -> String {
    "LICENSE".to_string()
}

impl Default for ProjectSection {
    fn default() -> Self {
        Self {
            root: default_root(),
            cmake_source_dir: default_cmake_source_dir(),
            library_name: default_library_name(),
            license_file: default_license_file(),
            main_header: None,
        }
    }
}

/// `[tools]` section: command names for the external tools the leaf tasks
/// invoke. Overridable so versioned binaries (`clang-format-20`, `gcc-15`)
/// can be pinned per machine.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolsSection {
    #[serde(default = "default_cmake")]
    pub cmake: String,
    #[serde(default = "default_ctest")]
    pub ctest: String,
    #[serde(default = "default_clang_format")]
    pub clang_format: String,
    #[serde(default = "default_clang_tidy")]
    pub clang_tidy: String,
    #[serde(default = "default_cmake_format")]
    pub cmake_format: String,
    #[serde(default = "default_gcovr")]
    pub gcovr: String,
    #[serde(default = "default_lcov")]
    pub lcov: String,
    #[serde(default = "default_genhtml")]
    pub genhtml: String,
    #[serde(default = "default_python")]
    pub python: String,
    #[serde(default = "default_git")]
    pub git: String,

    /// C / C++ drivers for the clang toolchain (exported as CC / CXX).
    #[serde(default = "default_clang_cc")]
    pub clang_cc: String,
    #[serde(default = "default_clang_cxx")]
    pub clang_cxx: String,

    /// C / C++ drivers for the gcc toolchain.
    #[serde(default = "default_gcc_cc")]
    pub gcc_cc: String,
    #[serde(default = "default_gcc_cxx")]
    pub gcc_cxx: String,
}

fn default_cmake() -> String {
    "cmake".to_string()
}

fn default_ctest() -> String {
    "ctest".to_string()
}

fn default_clang_format() -> String {
    "clang-format".to_string()
}

fn default_clang_tidy() -> String {
    "clang-tidy".to_string()
}

fn default_cmake_format() -> String {
    "cmake-format".to_string()
}

fn default_gcovr() -> String {
    "gcovr".to_string()
}

fn default_lcov() -> String {
    "lcov".to_string()
}

fn default_genhtml() -> String {
    "genhtml".to_string()
}

fn default_python() -> String {
    "python3".to_string()
}

fn default_git() -> String {
    "git".to_string()
}

fn default_clang_cc() -> String {
    "clang".to_string()
}

fn default_clang_cxx() -> String {
    "clang++".to_string()
}

fn default_gcc_cc() -> String {
    "gcc".to_string()
}

fn default_gcc_cxx() -> String {
    "g++".to_string()
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            cmake: default_cmake(),
            ctest: default_ctest(),
            clang_format: default_clang_format(),
            clang_tidy: default_clang_tidy(),
            cmake_format: default_cmake_format(),
            gcovr: default_gcovr(),
            lcov: default_lcov(),
            genhtml: default_genhtml(),
            python: default_python(),
            git: default_git(),
            clang_cc: default_clang_cc(),
            clang_cxx: default_clang_cxx(),
            gcc_cc: default_gcc_cc(),
            gcc_cxx: default_gcc_cxx(),
        }
    }
}

/// `[scan]` section: extra glob patterns excluded from source-tree walks
/// (formatting, legal and misc checks). Hidden, underscore-prefixed and
/// `___`-marked entries are always skipped regardless of this list.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ScanSection {
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// `[install]` section: overrides for the expected installed-file layout.
/// When unset, the layout is derived from `project.library_name`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct InstallSection {
    #[serde(default)]
    pub static_files: Option<Vec<String>>,
    #[serde(default)]
    pub shared_files: Option<Vec<String>>,
}

/// `[legal]` section: who holds the copyright, which SPDX identifier every
/// source file must carry, and an optional pinned digest of the license file.
#[derive(Debug, Clone, Deserialize)]
pub struct LegalSection {
    #[serde(default = "default_copyright_holder")]
    pub copyright_holder: String,

    #[serde(default = "default_spdx_license_id")]
    pub spdx_license_id: String,

    /// blake3 hex digest the license file must hash to. When unset, only the
    /// copyright notice inside the license file is validated.
    #[serde(default)]
    pub license_digest: Option<String>,
}

fn default_copyright_holder() -> String {
    "Wojciech Kałuża".to_string()
}

fn default_spdx_license_id() -> String {
    "MIT".to_string()
}

impl Default for LegalSection {
    fn default() -> Self {
        Self {
            copyright_holder: default_copyright_holder(),
            spdx_license_id: default_spdx_license_id(),
            license_digest: None,
        }
    }
}
