// src/ops/analysis.rs

//! Static analysis with clang-tidy, driven by the compilation databases the
//! configure steps emit. The incremental variant narrows the file set to
//! changed C++ sources plus everything that includes them, reconstructed
//! from the compiler's depfiles.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use rayon::prelude::*;
use serde::Deserialize;
use tracing::error;

use crate::config::model::ToolsSection;
use crate::exec::Invocation;
use crate::ops::files::is_cpp_source_file;

#[derive(Debug, Deserialize)]
struct CompileCommand {
    file: String,
}

/// Translation units listed in `<build_dir>/compile_commands.json`,
/// canonicalized, deduplicated and sorted. Paths carrying the `___` build
/// marker are generated shims and are dropped.
pub fn files_from_compilation_database(build_dir: &Path) -> Result<Vec<PathBuf>> {
    let db_path = build_dir.join("compile_commands.json");
    let text = fs::read_to_string(&db_path)
        .with_context(|| format!("reading compilation database {db_path:?}"))?;
    let commands: Vec<CompileCommand> = serde_json::from_str(&text)
        .with_context(|| format!("parsing compilation database {db_path:?}"))?;

    let mut files = BTreeSet::new();
    for command in commands {
        let path = fs::canonicalize(&command.file)
            .with_context(|| format!("file from compilation database not found: {}", command.file))?;
        if path.to_string_lossy().contains("___") {
            continue;
        }
        files.insert(path);
    }
    Ok(files.into_iter().collect())
}

/// A single clang-tidy invocation: the translation unit and the build tree
/// whose compilation database describes it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct AnalysisJob {
    pub file: PathBuf,
    pub build_dir: PathBuf,
}

fn tidy_single(
    tools: &ToolsSection,
    tidy_config: &Path,
    project_root: &Path,
    job: &AnalysisJob,
) -> Option<String> {
    let out = Invocation::new(&tools.clang_tidy)
        .arg(format!("--config-file={}", tidy_config.display()))
        .arg("-p")
        .arg(job.build_dir.display().to_string())
        .arg(job.file.display().to_string())
        .current_dir(project_root)
        .run();
    if out.success {
        None
    } else {
        Some(out.output.unwrap_or_default().trim().to_string())
    }
}

/// Run clang-tidy over `jobs`, fanning out across the thread pool. An empty
/// job list trivially passes.
pub fn run_clang_tidy(
    tools: &ToolsSection,
    tidy_config: &Path,
    project_root: &Path,
    jobs: &[AnalysisJob],
) -> bool {
    if jobs.is_empty() {
        return true;
    }

    let mut jobs: Vec<&AnalysisJob> = jobs.iter().collect();
    jobs.sort();
    jobs.dedup();

    let failures: Vec<(&AnalysisJob, String)> = jobs
        .par_iter()
        .filter_map(|job| {
            tidy_single(tools, tidy_config, project_root, job).map(|output| (*job, output))
        })
        .collect();

    for (job, output) in &failures {
        println!("Error running clang-tidy on {:?}", job.file);
        if !output.is_empty() {
            println!("{output}");
        }
    }
    failures.is_empty()
}

/// Every `*.o.d` depfile under `build_dir`, sorted.
fn collect_depfiles(build_dir: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    collect_depfiles_into(build_dir, &mut out);
    out.sort();
    out
}

fn collect_depfiles_into(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() {
            collect_depfiles_into(&path, out);
        } else if file_type.is_file()
            && path.to_string_lossy().ends_with(".o.d")
        {
            out.push(path);
        }
    }
}

/// Parse one Make-style depfile into the set of project paths it mentions.
/// The first line (the object target) is dropped; continuation lines are
/// unescaped and split on spaces. The first surviving path is the
/// translation unit, the rest are the headers it includes.
fn parse_depfile(path: &Path, project_root: &Path) -> Result<(PathBuf, BTreeSet<PathBuf>)> {
    let text = fs::read_to_string(path).with_context(|| format!("reading depfile {path:?}"))?;
    let mut paths = Vec::new();
    for line in text.lines().skip(1) {
        let line = line.trim_start_matches(' ').trim_end_matches('\\').trim_end();
        for token in line.split(' ').filter(|token| !token.is_empty()) {
            let Ok(resolved) = fs::canonicalize(token) else {
                continue;
            };
            if resolved.starts_with(project_root) && resolved.is_file() {
                paths.push(resolved);
            }
        }
    }
    if paths.is_empty() {
        bail!("depfile {path:?} names no project files");
    }
    let unit = paths[0].clone();
    Ok((unit, paths.into_iter().collect()))
}

type DependentsIndex = BTreeMap<PathBuf, BTreeSet<PathBuf>>;

/// Build header → dependent-translation-units index from the depfiles of one
/// build tree. Every file also maps to itself, so a changed source selects
/// itself for re-analysis.
fn dependents_index(build_dir: &Path, project_root: &Path) -> DependentsIndex {
    let mut index: DependentsIndex = BTreeMap::new();
    for depfile in collect_depfiles(build_dir) {
        let Ok((unit, deps)) = parse_depfile(&depfile, project_root) else {
            continue;
        };
        for dep in deps {
            let entry = index.entry(dep.clone()).or_default();
            entry.insert(unit.clone());
            entry.insert(dep);
        }
    }
    index
}

/// Changed C++ files plus every translation unit that (transitively via one
/// depfile hop) includes them, restricted to `.cpp` sources. Empty when
/// nothing relevant changed.
pub fn changed_cpp_sources_and_dependents(
    changed_cpp_files: &[PathBuf],
    build_dir: &Path,
    project_root: &Path,
) -> Vec<PathBuf> {
    if changed_cpp_files.is_empty() {
        return Vec::new();
    }

    let index = dependents_index(build_dir, project_root);
    let mut selected = BTreeSet::new();
    for changed in changed_cpp_files {
        let resolved = fs::canonicalize(changed).unwrap_or_else(|_| changed.clone());
        if let Some(dependents) = index.get(&resolved) {
            selected.extend(dependents.iter().cloned());
        }
    }

    selected
        .into_iter()
        .filter(|path| is_cpp_source_file(path))
        .collect()
}

/// Restrict the translation units of one compilation database to `allowed`
/// and pair them with their build tree. Errors (missing database, missing
/// files) are reported and surface as failure.
pub fn jobs_from_database(
    build_dir: &Path,
    allowed: &BTreeSet<PathBuf>,
    jobs: &mut Vec<AnalysisJob>,
) -> bool {
    match files_from_compilation_database(build_dir) {
        Ok(files) => {
            jobs.extend(
                files
                    .into_iter()
                    .filter(|file| allowed.contains(file))
                    .map(|file| AnalysisJob {
                        file,
                        build_dir: build_dir.to_path_buf(),
                    }),
            );
            true
        }
        Err(err) => {
            error!("static analysis input collection failed: {err:#}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compilation_database_is_deduplicated_and_filtered() {
        let tmp = tempfile::tempdir().unwrap();
        let build = tmp.path().join("build");
        fs::create_dir(&build).unwrap();

        let a = tmp.path().join("a.cpp");
        let b = tmp.path().join("b.cpp");
        fs::write(&a, "int a;").unwrap();
        fs::write(&b, "int b;").unwrap();
        let shim = tmp.path().join("gen___shim.cpp");
        fs::write(&shim, "int s;").unwrap();

        let db = format!(
            "[{{\"directory\": \"{0}\", \"command\": \"c++ a.cpp\", \"file\": \"{1}\"}},\
              {{\"directory\": \"{0}\", \"command\": \"c++ a.cpp\", \"file\": \"{1}\"}},\
              {{\"directory\": \"{0}\", \"command\": \"c++ b.cpp\", \"file\": \"{2}\"}},\
              {{\"directory\": \"{0}\", \"command\": \"c++ s.cpp\", \"file\": \"{3}\"}}]",
            build.display(),
            a.display(),
            b.display(),
            shim.display(),
        );
        fs::write(build.join("compile_commands.json"), db).unwrap();

        let files = files_from_compilation_database(&build).unwrap();
        assert_eq!(
            files,
            vec![fs::canonicalize(&a).unwrap(), fs::canonicalize(&b).unwrap()]
        );
    }

    #[test]
    fn missing_database_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(files_from_compilation_database(tmp.path()).is_err());
    }

    #[test]
    fn changed_header_selects_its_including_sources() {
        let tmp = tempfile::tempdir().unwrap();
        let root = fs::canonicalize(tmp.path()).unwrap();
        let build = root.join("build");
        fs::create_dir(&build).unwrap();

        let header = root.join("util.hpp");
        let user = root.join("user.cpp");
        let other = root.join("other.cpp");
        fs::write(&header, "#pragma once").unwrap();
        fs::write(&user, "#include \"util.hpp\"").unwrap();
        fs::write(&other, "int o;").unwrap();

        fs::write(
            build.join("user.o.d"),
            format!(
                "user.o: \\\n {} \\\n {}\n",
                user.display(),
                header.display()
            ),
        )
        .unwrap();
        fs::write(
            build.join("other.o.d"),
            format!("other.o: \\\n {}\n", other.display()),
        )
        .unwrap();

        let selected =
            changed_cpp_sources_and_dependents(&[header.clone()], &build, &root);
        assert_eq!(selected, vec![user.clone()]);

        // a changed source selects itself
        let selected = changed_cpp_sources_and_dependents(&[other.clone()], &build, &root);
        assert_eq!(selected, vec![other]);

        // nothing changed, nothing selected
        assert!(changed_cpp_sources_and_dependents(&[], &build, &root).is_empty());
    }

    #[test]
    fn empty_job_list_passes() {
        let tools = ToolsSection::default();
        assert!(run_clang_tidy(
            &tools,
            Path::new(".clang-tidy"),
            Path::new("."),
            &[]
        ));
    }
}
