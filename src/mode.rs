// src/mode.rs

//! Build modes and their feature-flag bundles.
//!
//! A mode is a named, immutable set of booleans; the pipeline consults these
//! flags to decide which tasks to attach to the umbrella roots. No flag
//! implies another: every combination is spelled out per mode.

use clap::ValueEnum;

/// The closed set of mode names accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeName {
    /// Build and install the static library with the default presets.
    BasicStaticBuild,
    /// Build and install the shared library with the default presets.
    BasicSharedBuild,
    /// Delete the build trees.
    Clean,
    /// Measure test coverage.
    Coverage,
    /// One build and its tests, for quick iterations.
    Fast,
    /// Format source files in place.
    Format,
    /// Build everything and run all checks.
    Full,
    /// Static analysis over the whole tree.
    StaticFull,
    /// Static analysis over files changed since the last commit.
    StaticIncremental,
    /// Run the memory-checking test suite.
    Valgrind,
    /// `clean` followed by `full`.
    Verify,
}

/// The feature flags a mode turns on. Flags combine by plain boolean gating
/// in the pipeline; a task variant is included only when every flag guarding
/// it is set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModeFlags {
    pub basic_static_build: bool,
    pub basic_shared_build: bool,
    pub clean: bool,
    pub check_legal: bool,
    pub check_formatting: bool,
    pub fix_formatting: bool,
    pub static_lib: bool,
    pub shared_lib: bool,
    pub clang: bool,
    pub gcc: bool,
    pub debug: bool,
    /// Covers *both* the RelWithDebInfo and Release build configurations:
    /// mode definitions deliberately conflate the two.
    pub release: bool,
    pub static_analysis_full: bool,
    pub static_analysis_incremental: bool,
    pub address_sanitizer: bool,
    pub undefined_behaviour_sanitizer: bool,
    pub test: bool,
    pub test_target: bool,
    pub valgrind: bool,
    pub coverage: bool,
    pub misc: bool,
    pub examples: bool,
    pub install: bool,
    pub test_install: bool,
}

impl ModeName {
    pub fn flags(self) -> ModeFlags {
        match self {
            ModeName::BasicStaticBuild => ModeFlags {
                basic_static_build: true,
                ..ModeFlags::default()
            },
            ModeName::BasicSharedBuild => ModeFlags {
                basic_shared_build: true,
                ..ModeFlags::default()
            },
            ModeName::Clean => ModeFlags {
                clean: true,
                ..ModeFlags::default()
            },
            ModeName::Coverage => ModeFlags {
                gcc: true,
                coverage: true,
                ..ModeFlags::default()
            },
            ModeName::Fast => ModeFlags {
                static_lib: true,
                clang: true,
                debug: true,
                test: true,
                ..ModeFlags::default()
            },
            ModeName::Format => ModeFlags {
                fix_formatting: true,
                ..ModeFlags::default()
            },
            // Like verify, but building on whatever is already on disk, so
            // static analysis narrows to the changed files.
            ModeName::Full => ModeFlags {
                clean: false,
                static_analysis_full: false,
                static_analysis_incremental: true,
                ..ModeName::Verify.flags()
            },
            ModeName::StaticFull => ModeFlags {
                clang: true,
                static_analysis_full: true,
                ..ModeFlags::default()
            },
            ModeName::StaticIncremental => ModeFlags {
                clang: true,
                static_analysis_incremental: true,
                ..ModeFlags::default()
            },
            ModeName::Valgrind => ModeFlags {
                clang: true,
                gcc: true,
                valgrind: true,
                ..ModeFlags::default()
            },
            ModeName::Verify => ModeFlags {
                clean: true,
                check_legal: true,
                check_formatting: true,
                static_lib: true,
                shared_lib: true,
                clang: true,
                gcc: true,
                debug: true,
                release: true,
                static_analysis_full: true,
                address_sanitizer: true,
                undefined_behaviour_sanitizer: true,
                test: true,
                test_target: true,
                valgrind: true,
                coverage: true,
                misc: true,
                examples: true,
                install: true,
                test_install: true,
                ..ModeFlags::default()
            },
        }
    }
}
