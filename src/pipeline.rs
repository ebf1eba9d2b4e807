// src/pipeline.rs

//! Graph assembly: builds the full task universe for the orchestrated
//! project and selects the subset a mode asks for by attaching tasks to the
//! two umbrella roots ("Pre-build" and "Build"). Selection only decides
//! which tasks become root dependencies; sharing and ordering then fall out
//! of the graph.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::Result;
use globset::GlobSet;

use crate::config::model::ConfigFile;
use crate::config::validate::build_exclude_globs;
use crate::graph::Task;
use crate::mode::ModeFlags;
use crate::ops::analysis::{self, AnalysisJob};
use crate::ops::checks;
use crate::ops::cmake::{self, BuildConfig, LibKind, Preset, Toolchain};
use crate::ops::coverage::{self, CoveragePaths};
use crate::ops::files::{self, is_cpp_file, is_cpp_source_file};
use crate::ops::format;
use crate::ops::hooks;
use crate::ops::legal;
use crate::ops::system;
use crate::workspace::{InstallTestFlavor, Workspace};

const TOOLCHAINS: [Toolchain; 2] = [Toolchain::Gcc, Toolchain::Clang];
const LIB_KINDS: [LibKind; 2] = [LibKind::Static, LibKind::Shared];

/// The two umbrella roots every run drives, in order.
pub struct Roots {
    pub prebuild: Task,
    pub build: Task,
}

struct Ctx {
    cfg: ConfigFile,
    ws: Workspace,
    excludes: GlobSet,
}

fn task(ctx: &Rc<Ctx>, name: impl Into<String>, body: impl Fn(&Ctx) -> bool + 'static) -> Task {
    let ctx = Rc::clone(ctx);
    Task::with_body(name, move || body(&ctx))
}

/// The five per-configuration tasks of one library build tree.
struct ConfigChain {
    build_all: Task,
    build_all_tests: Task,
    test: Task,
    test_target: Task,
    install: Task,
}

/// One toolchain / library-kind combination: a configure task plus a
/// [`ConfigChain`] per build configuration.
struct ChainSet {
    configure: Task,
    chains: [ConfigChain; 3],
}

impl ChainSet {
    fn chain(&self, config: BuildConfig) -> &ConfigChain {
        &self.chains[config_index(config)]
    }
}

fn config_index(config: BuildConfig) -> usize {
    match config {
        BuildConfig::Debug => 0,
        BuildConfig::RelWithDebInfo => 1,
        BuildConfig::Release => 2,
    }
}

/// The four ordinary library build trees, one per toolchain / kind.
struct Libraries {
    clang_static: ChainSet,
    clang_shared: ChainSet,
    gcc_static: ChainSet,
    gcc_shared: ChainSet,
}

impl Libraries {
    fn build(ctx: &Rc<Ctx>) -> Self {
        Libraries {
            clang_static: library_chain_set(ctx, Toolchain::Clang, LibKind::Static),
            clang_shared: library_chain_set(ctx, Toolchain::Clang, LibKind::Shared),
            gcc_static: library_chain_set(ctx, Toolchain::Gcc, LibKind::Static),
            gcc_shared: library_chain_set(ctx, Toolchain::Gcc, LibKind::Shared),
        }
    }

    fn set(&self, toolchain: Toolchain, kind: LibKind) -> &ChainSet {
        match (toolchain, kind) {
            (Toolchain::Clang, LibKind::Static) => &self.clang_static,
            (Toolchain::Clang, LibKind::Shared) => &self.clang_shared,
            (Toolchain::Gcc, LibKind::Static) => &self.gcc_static,
            (Toolchain::Gcc, LibKind::Shared) => &self.gcc_shared,
        }
    }

    fn installs(&self, toolchain: Toolchain, kind: LibKind) -> [Task; 3] {
        let set = self.set(toolchain, kind);
        BuildConfig::ALL.map(|config| set.chain(config).install.clone())
    }
}

fn library_chain_set(ctx: &Rc<Ctx>, toolchain: Toolchain, kind: LibKind) -> ChainSet {
    let preset = Preset::library(toolchain, kind);
    let tc = toolchain.display_name();
    let lk = kind.display_name();

    let configure = task(
        ctx,
        format!("Configure CMake for {tc} ({lk})"),
        move |ctx| cmake::configure(&ctx.cfg.tools, preset, &ctx.ws.cmake_source_dir),
    );

    let chains = BuildConfig::ALL.map(|config| {
        let build_all = task(
            ctx,
            format!("Build {tc} {config} ({lk}; all)"),
            move |ctx| cmake::build(&ctx.cfg.tools, config, preset, &ctx.ws.cmake_source_dir, "all"),
        );
        let build_all_tests = task(
            ctx,
            format!("Build {tc} {config} ({lk}; all_tests)"),
            move |ctx| {
                cmake::build(
                    &ctx.cfg.tools,
                    config,
                    preset,
                    &ctx.ws.cmake_source_dir,
                    "all_tests",
                )
            },
        );
        let test = task(ctx, format!("Test {tc} {config} ({lk})"), move |ctx| {
            cmake::ctest(
                &ctx.cfg.tools,
                preset,
                config,
                Some(r"^test$"),
                &ctx.ws.cmake_source_dir,
            )
        });
        let test_target = task(
            ctx,
            format!("Build {tc} {config} test target ({lk})"),
            move |ctx| {
                cmake::build(&ctx.cfg.tools, config, preset, &ctx.ws.cmake_source_dir, "test")
            },
        );
        let install = task(ctx, format!("Install {tc} {config} ({lk})"), move |ctx| {
            cmake::install(&ctx.cfg.tools, preset, config, &ctx.ws.cmake_source_dir)
        });

        build_all.depends_on(&[configure.clone()]);
        build_all_tests.depends_on(&[build_all.clone()]);
        test.depends_on(&[build_all_tests.clone()]);
        test_target.depends_on(&[build_all_tests.clone()]);
        install.depends_on(&[build_all.clone()]);

        ConfigChain {
            build_all,
            build_all_tests,
            test,
            test_target,
            install,
        }
    });

    ChainSet { configure, chains }
}

/// Sanitizer builds run the regular test suite under the instrumented
/// binaries; only the per-configuration test tasks are selectable.
struct SanitizerChain {
    tests: [Task; 3],
}

fn sanitizer_chain(ctx: &Rc<Ctx>, preset: Preset, label: &str) -> SanitizerChain {
    let configure = task(ctx, format!("Configure CMake Clang {label}"), move |ctx| {
        cmake::configure(&ctx.cfg.tools, preset, &ctx.ws.cmake_source_dir)
    });

    let tests = BuildConfig::ALL.map(|config| {
        let build_all = task(ctx, format!("Build Clang {label} {config} all"), move |ctx| {
            cmake::build(&ctx.cfg.tools, config, preset, &ctx.ws.cmake_source_dir, "all")
        });
        let build_all_tests = task(
            ctx,
            format!("Build Clang {label} {config} all_tests"),
            move |ctx| {
                cmake::build(
                    &ctx.cfg.tools,
                    config,
                    preset,
                    &ctx.ws.cmake_source_dir,
                    "all_tests",
                )
            },
        );
        let test = task(ctx, format!("Test Clang {label} {config}"), move |ctx| {
            cmake::ctest(
                &ctx.cfg.tools,
                preset,
                config,
                Some(r"^test$"),
                &ctx.ws.cmake_source_dir,
            )
        });

        build_all.depends_on(&[configure.clone()]);
        build_all_tests.depends_on(&[build_all.clone()]);
        test.depends_on(&[build_all_tests.clone()]);
        test
    });

    SanitizerChain { tests }
}

/// One installation-test flavor for one toolchain / kind: staged artifacts,
/// its own configure, and build + test per configuration.
struct InstallTestChain {
    toolchain: Toolchain,
    kind: LibKind,
    builds: [(Task, Task); 3],
    tests: [Task; 3],
}

impl InstallTestChain {
    fn test(&self, config: BuildConfig) -> &Task {
        &self.tests[config_index(config)]
    }
}

fn install_test_chain(
    ctx: &Rc<Ctx>,
    flavor: InstallTestFlavor,
    toolchain: Toolchain,
    kind: LibKind,
    libraries: &Libraries,
) -> InstallTestChain {
    let preset = Preset::library(toolchain, kind);
    let tc = toolchain.display_name();
    let lk = kind.display_name();
    let fl = flavor.display_name();

    let copy_artifacts = task(
        ctx,
        format!("Copy {tc} artifacts for test install ({lk}; {fl})"),
        move |ctx| {
            let staging = ctx.ws.install_test_staging_dir(flavor, toolchain, kind);
            cmake::copy_install_dir(preset, &ctx.ws.cmake_source_dir, &staging)
        },
    );
    copy_artifacts.depends_on(&libraries.installs(toolchain, kind));

    let configure = task(
        ctx,
        format!("Configure CMake for {tc} test install ({lk}; {fl})"),
        move |ctx| {
            cmake::configure(
                &ctx.cfg.tools,
                preset,
                &ctx.ws.install_test_cmake_source_dir(flavor),
            )
        },
    );
    configure.depends_on(&[copy_artifacts]);

    let builds = BuildConfig::ALL.map(|config| {
        let build_all = task(
            ctx,
            format!("Build {tc} {config} test install ({lk}; all; {fl})"),
            move |ctx| {
                cmake::build(
                    &ctx.cfg.tools,
                    config,
                    preset,
                    &ctx.ws.install_test_cmake_source_dir(flavor),
                    "all",
                )
            },
        );
        let build_all_tests = task(
            ctx,
            format!("Build {tc} {config} test install ({lk}; all_tests; {fl})"),
            move |ctx| {
                cmake::build(
                    &ctx.cfg.tools,
                    config,
                    preset,
                    &ctx.ws.install_test_cmake_source_dir(flavor),
                    "all_tests",
                )
            },
        );
        build_all.depends_on(&[configure.clone()]);
        build_all_tests.depends_on(&[build_all.clone()]);
        (build_all, build_all_tests)
    });

    let tests = BuildConfig::ALL.map(|config| {
        let test = task(
            ctx,
            format!("Test {tc} {config} test install ({lk}; {fl})"),
            move |ctx| {
                cmake::ctest(
                    &ctx.cfg.tools,
                    preset,
                    config,
                    Some(r"^test$"),
                    &ctx.ws.install_test_cmake_source_dir(flavor),
                )
            },
        );
        test.depends_on(&[builds[config_index(config)].1.clone()]);
        test
    });

    InstallTestChain {
        toolchain,
        kind,
        builds,
        tests,
    }
}

/// All build directories whose compilation databases feed clang-tidy, paired
/// with the preset that configured them.
fn analysis_databases(ctx: &Ctx) -> Vec<(Preset, PathBuf)> {
    let mut sources = vec![(Preset::LinuxClang, ctx.ws.cmake_source_dir.clone())];
    for flavor in InstallTestFlavor::ALL {
        sources.push((Preset::LinuxClang, ctx.ws.install_test_cmake_source_dir(flavor)));
    }
    sources.push((Preset::Example, ctx.ws.example_cmake_source_dir()));
    sources
}

fn run_static_analysis(ctx: &Ctx, allowed: BTreeSet<PathBuf>) -> bool {
    let mut jobs: Vec<AnalysisJob> = Vec::new();
    for (preset, cmake_source_dir) in analysis_databases(ctx) {
        let build_dir = match cmake::build_dir_from_preset(preset, &cmake_source_dir) {
            Ok(dir) => dir,
            Err(err) => {
                println!("Error: {err:#}");
                return false;
            }
        };
        if !analysis::jobs_from_database(&build_dir, &allowed, &mut jobs) {
            return false;
        }
    }
    analysis::run_clang_tidy(
        &ctx.cfg.tools,
        &ctx.ws.clang_tidy_config,
        &ctx.ws.root,
        &jobs,
    )
}

fn canonical_set(paths: Vec<PathBuf>) -> BTreeSet<PathBuf> {
    paths
        .into_iter()
        .map(|path| std::fs::canonicalize(&path).unwrap_or(path))
        .collect()
}

fn static_analysis_all_files(ctx: &Ctx) -> bool {
    let allowed = canonical_set(files::find_files(&ctx.ws.root, &ctx.excludes, is_cpp_source_file));
    run_static_analysis(ctx, allowed)
}

fn static_analysis_changed_files(ctx: &Ctx) -> bool {
    let changed = files::changed_files(&ctx.cfg.tools, &ctx.ws.root, &ctx.excludes, is_cpp_file);
    let build_dir = match cmake::build_dir_from_preset(Preset::LinuxClang, &ctx.ws.cmake_source_dir)
    {
        Ok(dir) => dir,
        Err(err) => {
            println!("Error: {err:#}");
            return false;
        }
    };
    let selected = analysis::changed_cpp_sources_and_dependents(&changed, &build_dir, &ctx.ws.root);
    run_static_analysis(ctx, canonical_set(selected))
}

fn process_coverage_body(ctx: &Ctx) -> bool {
    let build_dir =
        match cmake::build_dir_from_preset(Preset::LinuxGccCoverage, &ctx.ws.cmake_source_dir) {
            Ok(dir) => dir,
            Err(err) => {
                println!("Error: {err:#}");
                return false;
            }
        };
    coverage::process_coverage(
        &ctx.cfg.tools,
        &CoveragePaths {
            build_dir: &build_dir,
            project_root: &ctx.ws.root,
            test_dir: &ctx.ws.test_dir,
            lcov_dir: &ctx.ws.coverage_lcov_dir,
            lcov_file: &ctx.ws.coverage_lcov_file,
            gcovr_dir: &ctx.ws.coverage_gcovr_dir,
            gcovr_html: &ctx.ws.coverage_gcovr_html,
            gcovr_json: &ctx.ws.coverage_gcovr_json,
        },
    )
}

/// Run the staged quick-start example end to end, once against the static
/// install and once against the shared install. Mirrors what a consumer of
/// the installed package would do, including executing the built binaries.
fn example_quick_start_body(ctx: &Ctx) -> bool {
    let example_src = ctx.ws.example_cmake_source_dir();
    let staging = ctx.ws.example_staging_dir();

    for install_preset in [Preset::Example, Preset::ExampleShared] {
        cmake::clean_build_dir(Preset::Example, &example_src);

        if !cmake::copy_install_dir(install_preset, &ctx.ws.cmake_source_dir, &staging) {
            return false;
        }
        if !cmake::configure(&ctx.cfg.tools, Preset::Example, &example_src) {
            return false;
        }

        for target in ["all", "test"] {
            for config in BuildConfig::ALL {
                if !cmake::build(&ctx.cfg.tools, config, Preset::Example, &example_src, target) {
                    return false;
                }
            }
        }
        for config in BuildConfig::ALL {
            if !cmake::ctest(&ctx.cfg.tools, Preset::Example, config, None, &example_src) {
                return false;
            }
        }

        let build_dir = match cmake::build_dir_from_preset(Preset::Example, &example_src) {
            Ok(dir) => dir,
            Err(err) => {
                println!("Error: {err:#}");
                return false;
            }
        };
        for config in BuildConfig::ALL {
            let program = build_dir.join(config.name()).join("test_program");
            let ok = crate::exec::Invocation::new(program.display().to_string())
                .current_dir(&example_src)
                .run()
                .report_on_failure();
            if !ok {
                return false;
            }
        }
    }

    true
}

/// Remove every generated tree: build and install directories of all
/// presets, staged artifacts, and coverage output.
fn clean_body(ctx: &Ctx) -> bool {
    let src = &ctx.ws.cmake_source_dir;

    let library_presets = [
        Preset::LinuxClang,
        Preset::LinuxGcc,
        Preset::LinuxClangShared,
        Preset::LinuxGccShared,
    ];
    for preset in library_presets {
        cmake::clean_build_dir(preset, src);
        cmake::clean_install_dir(preset, src);
    }
    for preset in [
        Preset::LinuxGccCoverage,
        Preset::AddressSanitizerClang,
        Preset::UndefinedBehaviourSanitizerClang,
        Preset::Example,
        Preset::ExampleShared,
    ] {
        cmake::clean_build_dir(preset, src);
        cmake::clean_install_dir(preset, src);
    }

    for flavor in InstallTestFlavor::ALL {
        let flavor_src = ctx.ws.install_test_cmake_source_dir(flavor);
        for preset in library_presets {
            cmake::clean_build_dir(preset, &flavor_src);
        }
        for toolchain in TOOLCHAINS {
            for kind in LIB_KINDS {
                system::remove_dir(&ctx.ws.install_test_staging_dir(flavor, toolchain, kind));
            }
        }
    }

    cmake::clean_build_dir(Preset::Example, &ctx.ws.example_cmake_source_dir());
    system::remove_dir(&ctx.ws.example_staging_dir());
    system::remove_dir(&ctx.ws.coverage_lcov_dir);
    system::remove_dir(&ctx.ws.coverage_gcovr_dir);

    true
}

fn valgrind_test(ctx: &Rc<Ctx>, libraries: &Libraries, toolchain: Toolchain) -> Task {
    let set = libraries.set(toolchain, LibKind::Static);
    let tc = toolchain.display_name();

    let configure_umbrella = Task::new(format!("Configure CMake for {tc} with Valgrind"));
    configure_umbrella.depends_on(&[set.configure.clone()]);
    let build_umbrella = Task::new(format!("Build {tc} for Valgrind"));
    build_umbrella.depends_on(&[
        set.chain(BuildConfig::Debug).build_all.clone(),
        set.chain(BuildConfig::Debug).build_all_tests.clone(),
        configure_umbrella,
    ]);

    let preset = Preset::library(toolchain, LibKind::Static);
    let test = task(ctx, format!("Test {tc} build with Valgrind"), move |ctx| {
        cmake::ctest(
            &ctx.cfg.tools,
            preset,
            BuildConfig::Debug,
            Some(r"^valgrind$"),
            &ctx.ws.cmake_source_dir,
        )
    });
    test.depends_on(&[build_umbrella]);
    test
}

/// Installation verification: the expected file layout, derived from the
/// configuration, checked against both toolchains' install trees.
fn verify_install(ctx: &Rc<Ctx>, libraries: &Libraries, kind: LibKind) -> Task {
    let verify = task(
        ctx,
        format!("Verify installation contents ({})", kind.display_name()),
        move |ctx| {
            let expected = match kind {
                LibKind::Static => checks::expected_static_files(&ctx.cfg),
                LibKind::Shared => checks::expected_shared_files(&ctx.cfg),
            };
            for toolchain in TOOLCHAINS {
                let preset = Preset::library(toolchain, kind);
                let install_dir =
                    match cmake::install_dir_from_preset(preset, &ctx.ws.cmake_source_dir) {
                        Ok(dir) => dir,
                        Err(err) => {
                            println!("Error: {err:#}");
                            return false;
                        }
                    };
                if !checks::verify_install_contents(&install_dir, &expected) {
                    println!(
                        "Error: Invalid {} installation contents ({})",
                        toolchain.display_name(),
                        kind.display_name()
                    );
                    return false;
                }
            }
            true
        },
    );
    for toolchain in TOOLCHAINS {
        verify.depends_on(&libraries.installs(toolchain, kind));
    }
    verify
}

/// The default Clang preset builds: per library kind, configure plus one
/// build/install pair per configuration. The installs stage the artifacts
/// the quick-start example runs against, and the basic build modes expose
/// them directly.
struct ExampleTasks {
    static_installs: Vec<Task>,
    shared_installs: Vec<Task>,
    quick_start: Task,
}

fn default_preset_installs(ctx: &Rc<Ctx>, preset: Preset) -> Vec<Task> {
    let lk = if preset.is_shared() { "dynamic" } else { "static" };
    let configure = task(ctx, format!("Configure default Clang ({lk})"), move |ctx| {
        cmake::configure(&ctx.cfg.tools, preset, &ctx.ws.cmake_source_dir)
    });
    let mut installs = Vec::new();
    for config in BuildConfig::ALL {
        let build = task(
            ctx,
            format!("Build default Clang {config} ({lk})"),
            move |ctx| {
                cmake::build(&ctx.cfg.tools, config, preset, &ctx.ws.cmake_source_dir, "all")
            },
        );
        build.depends_on(&[configure.clone()]);
        let install = task(
            ctx,
            format!("Install default Clang {config} ({lk})"),
            move |ctx| cmake::install(&ctx.cfg.tools, preset, config, &ctx.ws.cmake_source_dir),
        );
        install.depends_on(&[build]);
        installs.push(install);
    }
    installs
}

fn example_tasks(ctx: &Rc<Ctx>) -> ExampleTasks {
    let static_installs = default_preset_installs(ctx, Preset::Example);
    let shared_installs = default_preset_installs(ctx, Preset::ExampleShared);

    let quick_start = task(
        ctx,
        "Test examples/quick_start_build_and_install",
        example_quick_start_body,
    );
    quick_start.depends_on(&static_installs);
    quick_start.depends_on(&shared_installs);

    ExampleTasks {
        static_installs,
        shared_installs,
        quick_start,
    }
}

/// Build the complete task universe and wire the mode's selection to the two
/// umbrella roots.
pub fn assemble(cfg: &ConfigFile, mode: ModeFlags) -> Result<Roots> {
    let ws = Workspace::from_config(cfg)?;
    let excludes = build_exclude_globs(&cfg.scan.exclude)?;
    let ctx = Rc::new(Ctx {
        cfg: cfg.clone(),
        ws,
        excludes,
    });

    let libraries = Libraries::build(&ctx);

    // Coverage chain: configure -> all -> all_tests -> test -> process -> analyze.
    let configure_coverage = task(&ctx, "Configure CMake for GCC with coverage", |ctx| {
        cmake::configure(&ctx.cfg.tools, Preset::LinuxGccCoverage, &ctx.ws.cmake_source_dir)
    });
    let build_coverage_all = task(&ctx, "Build GCC with coverage (all)", |ctx| {
        cmake::build(
            &ctx.cfg.tools,
            BuildConfig::Debug,
            Preset::LinuxGccCoverage,
            &ctx.ws.cmake_source_dir,
            "all",
        )
    });
    let build_coverage_all_tests = task(&ctx, "Build GCC with coverage (all_tests)", |ctx| {
        cmake::build(
            &ctx.cfg.tools,
            BuildConfig::Debug,
            Preset::LinuxGccCoverage,
            &ctx.ws.cmake_source_dir,
            "all_tests",
        )
    });
    let test_coverage = task(&ctx, "Test GCC with coverage", |ctx| {
        cmake::ctest(
            &ctx.cfg.tools,
            Preset::LinuxGccCoverage,
            BuildConfig::Debug,
            Some(r"^test$"),
            &ctx.ws.cmake_source_dir,
        )
    });
    let process_coverage = task(&ctx, "Process GCC coverage data", process_coverage_body);
    let analyze_coverage = task(&ctx, "Analyze GCC coverage data", |ctx| {
        coverage::analyze_coverage(&ctx.ws.coverage_gcovr_json)
    });
    build_coverage_all.depends_on(&[configure_coverage]);
    build_coverage_all_tests.depends_on(&[build_coverage_all]);
    test_coverage.depends_on(&[build_coverage_all_tests]);
    process_coverage.depends_on(&[test_coverage]);
    analyze_coverage.depends_on(&[process_coverage]);

    let test_gcc_valgrind = valgrind_test(&ctx, &libraries, Toolchain::Gcc);
    let test_clang_valgrind = valgrind_test(&ctx, &libraries, Toolchain::Clang);

    let address_sanitizer =
        sanitizer_chain(&ctx, Preset::AddressSanitizerClang, "Address Sanitizer");
    let undefined_behaviour_sanitizer = sanitizer_chain(
        &ctx,
        Preset::UndefinedBehaviourSanitizerClang,
        "Undefined Behaviour Sanitizer",
    );

    let verify_install_static = verify_install(&ctx, &libraries, LibKind::Static);
    let verify_install_shared = verify_install(&ctx, &libraries, LibKind::Shared);

    // Legal, formatting and hygiene checks over the source tree.
    let check_license = task(&ctx, "Check LICENSE file", |ctx| {
        legal::check_license_file(&ctx.cfg.legal, &ctx.ws.license_file)
    });
    let check_copyright = task(&ctx, "Check copyright comments", |ctx| {
        let candidates = files::find_all_files(&ctx.ws.root, &ctx.excludes);
        legal::check_copyright_comments(&ctx.cfg.legal, &candidates)
    });
    let check_formatting = task(&ctx, "Check code formatting", |ctx| {
        let candidates = files::find_all_files(&ctx.ws.root, &ctx.excludes);
        format::check_formatting(&ctx.cfg.tools, &ctx.ws.clang_format_config, &candidates)
    });
    let format_sources = task(&ctx, "Format code", |ctx| {
        let candidates = files::find_all_files(&ctx.ws.root, &ctx.excludes);
        format::format_files(&ctx.cfg.tools, &ctx.ws.clang_format_config, &candidates)
    });
    let misc_checks = task(&ctx, "Miscellaneous checks", |ctx| {
        checks::misc_checks(&ctx.ws.root, &ctx.ws.main_header, &ctx.excludes)
    });

    // Installation tests, per flavor x toolchain x kind.
    let mut install_tests: Vec<InstallTestChain> = Vec::new();
    for flavor in InstallTestFlavor::ALL {
        for toolchain in TOOLCHAINS {
            for kind in LIB_KINDS {
                install_tests.push(install_test_chain(&ctx, flavor, toolchain, kind, &libraries));
            }
        }
    }

    let examples = example_tasks(&ctx);

    // Static analysis umbrellas: clang-tidy wants every clang compilation
    // database in place before it runs.
    let configure_static_analysis = Task::new("Configure CMake for clang-tidy");
    configure_static_analysis.depends_on(&[libraries.clang_static.configure.clone()]);
    let build_static_analysis = Task::new("Build Clang for clang-tidy");
    build_static_analysis.depends_on(&[configure_static_analysis]);
    for config in BuildConfig::ALL {
        build_static_analysis.depends_on(&[
            libraries.clang_static.chain(config).build_all.clone(),
            libraries.clang_static.chain(config).build_all_tests.clone(),
        ]);
    }
    let static_analysis_all = task(&ctx, "Run clang-tidy", static_analysis_all_files);
    let static_analysis_changed = task(
        &ctx,
        "Run clang-tidy (incremental)",
        static_analysis_changed_files,
    );
    for analysis_task in [&static_analysis_all, &static_analysis_changed] {
        analysis_task.depends_on(&[build_static_analysis.clone()]);
        for chain in &install_tests {
            if chain.toolchain == Toolchain::Clang && chain.kind == LibKind::Static {
                for (build_all, build_all_tests) in &chain.builds {
                    analysis_task.depends_on(&[build_all.clone(), build_all_tests.clone()]);
                }
            }
        }
        analysis_task.depends_on(&[examples.quick_start.clone()]);
    }

    let install_hooks = task(&ctx, "Install git hooks", |ctx| {
        hooks::ensure_hooks_installed(&ctx.ws.root)
    });
    let clean = task(&ctx, "Clean build files", clean_body);

    // Selection: attach the mode's tasks to the roots. Order here only
    // decides which failure surfaces first; execution order within shared
    // subgraphs is fixed by the dependencies above.
    let mut prebuild_deps = vec![install_hooks];
    let mut build_deps: Vec<Task> = Vec::new();

    if mode.clean {
        prebuild_deps.push(clean);
    }

    if mode.check_legal {
        build_deps.push(check_license);
        build_deps.push(check_copyright);
    }
    if mode.check_formatting {
        build_deps.push(check_formatting);
    }
    if mode.fix_formatting {
        build_deps.push(format_sources);
    }
    if mode.misc {
        build_deps.push(misc_checks);
    }

    if mode.address_sanitizer {
        build_deps.extend(address_sanitizer.tests.iter().cloned());
    }
    if mode.undefined_behaviour_sanitizer {
        build_deps.extend(undefined_behaviour_sanitizer.tests.iter().cloned());
    }

    // The release flag deliberately selects both optimized configurations.
    let selected_configs: Vec<BuildConfig> = {
        let mut configs = Vec::new();
        if mode.debug {
            configs.push(BuildConfig::Debug);
        }
        if mode.release {
            configs.push(BuildConfig::RelWithDebInfo);
            configs.push(BuildConfig::Release);
        }
        configs
    };
    let selected_toolchains: Vec<Toolchain> = TOOLCHAINS
        .into_iter()
        .filter(|toolchain| match toolchain {
            Toolchain::Gcc => mode.gcc,
            Toolchain::Clang => mode.clang,
        })
        .collect();
    let selected_kinds: Vec<LibKind> = LIB_KINDS
        .into_iter()
        .filter(|kind| match kind {
            LibKind::Static => mode.static_lib,
            LibKind::Shared => mode.shared_lib,
        })
        .collect();

    for &toolchain in &selected_toolchains {
        for &config in &selected_configs {
            for &kind in &selected_kinds {
                let chain = libraries.set(toolchain, kind).chain(config);
                build_deps.push(chain.build_all.clone());
                if mode.test {
                    build_deps.push(chain.test.clone());
                }
                if mode.test_target {
                    build_deps.push(chain.test_target.clone());
                }
                if mode.install {
                    build_deps.push(chain.install.clone());
                }
            }
        }
    }

    if mode.install {
        if mode.static_lib {
            build_deps.push(verify_install_static);
        }
        if mode.shared_lib {
            build_deps.push(verify_install_shared);
        }
    }

    if mode.coverage && mode.gcc {
        build_deps.push(analyze_coverage);
    }

    if mode.valgrind {
        if mode.gcc {
            build_deps.push(test_gcc_valgrind);
        }
        if mode.clang {
            build_deps.push(test_clang_valgrind);
        }
    }

    if mode.test_install {
        for chain in &install_tests {
            let toolchain_selected = selected_toolchains.contains(&chain.toolchain);
            let kind_selected = selected_kinds.contains(&chain.kind);
            if toolchain_selected && kind_selected {
                for &config in &selected_configs {
                    build_deps.push(chain.test(config).clone());
                }
            }
        }
    }

    if mode.examples {
        build_deps.push(examples.quick_start.clone());
    }

    if mode.static_analysis_full {
        build_deps.push(static_analysis_all);
    }
    if mode.static_analysis_incremental {
        build_deps.push(static_analysis_changed);
    }

    if mode.basic_static_build {
        build_deps.extend(examples.static_installs.iter().cloned());
    }
    if mode.basic_shared_build {
        build_deps.extend(examples.shared_installs.iter().cloned());
    }

    let prebuild = Task::new("Pre-build");
    prebuild.depends_on(&prebuild_deps);
    let build = Task::new("Build");
    build.depends_on(&build_deps);

    Ok(Roots { prebuild, build })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{collect_reachable, verify_acyclic};
    use crate::mode::ModeName;

    #[test]
    fn every_mode_assembles_an_acyclic_graph() {
        let cfg = ConfigFile::default();
        for mode in [
            ModeName::BasicStaticBuild,
            ModeName::BasicSharedBuild,
            ModeName::Clean,
            ModeName::Coverage,
            ModeName::Fast,
            ModeName::Format,
            ModeName::Full,
            ModeName::StaticFull,
            ModeName::StaticIncremental,
            ModeName::Valgrind,
            ModeName::Verify,
        ] {
            let roots = assemble(&cfg, mode.flags()).unwrap();
            verify_acyclic(&[roots.prebuild, roots.build]).unwrap();
        }
    }

    #[test]
    fn fast_mode_selects_a_single_build_chain() {
        let cfg = ConfigFile::default();
        let roots = assemble(&cfg, ModeName::Fast.flags()).unwrap();
        let names: Vec<String> = collect_reachable(&[roots.build])
            .iter()
            .map(|t| t.name().to_string())
            .collect();

        assert!(names.contains(&"Build Clang Debug (static; all)".to_string()));
        assert!(names.contains(&"Test Clang Debug (static)".to_string()));
        assert!(!names.iter().any(|n| n.contains("GCC")));
        assert!(!names.iter().any(|n| n.contains("dynamic")));
        assert!(!names.iter().any(|n| n.contains("Release")));
    }

    #[test]
    fn clean_mode_runs_only_prebuild_work() {
        let cfg = ConfigFile::default();
        let roots = assemble(&cfg, ModeName::Clean.flags()).unwrap();
        let prebuild_names: Vec<String> = collect_reachable(&[roots.prebuild])
            .iter()
            .map(|t| t.name().to_string())
            .collect();
        assert!(prebuild_names.contains(&"Clean build files".to_string()));
        assert_eq!(collect_reachable(&[roots.build]).len(), 1);
    }

    #[test]
    fn release_selection_covers_both_optimized_configs() {
        let cfg = ConfigFile::default();
        let roots = assemble(&cfg, ModeName::Full.flags()).unwrap();
        let names: Vec<String> = collect_reachable(&[roots.build])
            .iter()
            .map(|t| t.name().to_string())
            .collect();
        assert!(names.contains(&"Build GCC RelWithDebInfo (dynamic; all)".to_string()));
        assert!(names.contains(&"Build GCC Release (dynamic; all)".to_string()));
        assert!(names.contains(&"Run clang-tidy (incremental)".to_string()));
        assert!(!names.contains(&"Run clang-tidy".to_string()));
    }
}
