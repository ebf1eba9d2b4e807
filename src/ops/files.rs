// src/ops/files.rs

//! Source-tree discovery: recursive walks with the project's skip rules,
//! file-kind predicates, content digests, and changed-file queries via git.

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use blake3::Hasher;
use globset::GlobSet;

use crate::config::model::ToolsSection;
use crate::exec::Invocation;

pub fn is_bash_file(path: &Path) -> bool {
    has_extension(path, "bash")
}

pub fn is_cmake_file(path: &Path) -> bool {
    file_name_is(path, "CMakeLists.txt") || has_extension(path, "cmake")
}

pub fn is_cpp_header_file(path: &Path) -> bool {
    has_extension(path, "hpp")
}

pub fn is_cpp_source_file(path: &Path) -> bool {
    has_extension(path, "cpp")
}

pub fn is_cpp_file(path: &Path) -> bool {
    is_cpp_source_file(path) || is_cpp_header_file(path)
}

pub fn is_docker_file(path: &Path) -> bool {
    has_extension(path, "dockerfile") || file_name_is(path, "Dockerfile")
}

pub fn is_json_file(path: &Path) -> bool {
    has_extension(path, "json")
}

pub fn is_python_file(path: &Path) -> bool {
    has_extension(path, "py")
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(ext)
}

fn file_name_is(path: &Path, name: &str) -> bool {
    path.file_name().and_then(|n| n.to_str()) == Some(name)
}

/// An entry is skipped when its name starts with `.` or `_`, or contains
/// `___`, the marker generated artifact directories carry so that walks
/// never descend into build output.
fn skip_entry(name: &str) -> bool {
    name.starts_with('.') || name.starts_with('_') || name.contains("___")
}

/// Walk `root` depth-first and return every file accepted by `pred`, sorted.
///
/// Skip rules: hidden / underscore-prefixed / `___`-marked names (files and
/// directories alike), plus any path whose root-relative form matches one of
/// the configured exclude globs.
pub fn find_files<P>(root: &Path, excludes: &GlobSet, pred: P) -> Vec<PathBuf>
where
    P: Fn(&Path) -> bool,
{
    let mut out = Vec::new();
    walk(root, root, excludes, &pred, &mut out);
    out.sort();
    out
}

fn walk<P>(root: &Path, dir: &Path, excludes: &GlobSet, pred: &P, out: &mut Vec<PathBuf>)
where
    P: Fn(&Path) -> bool,
{
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return,
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };

        if skip_entry(name) {
            continue;
        }
        if let Ok(relative) = path.strip_prefix(root)
            && excludes.is_match(relative)
        {
            continue;
        }

        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() {
            walk(root, &path, excludes, pred, out);
        } else if file_type.is_file() && pred(&path) {
            out.push(path);
        }
    }
}

pub fn find_all_files(root: &Path, excludes: &GlobSet) -> Vec<PathBuf> {
    find_files(root, excludes, |_| true)
}

pub fn find_all_cpp_source_files(root: &Path, excludes: &GlobSet) -> Vec<PathBuf> {
    find_files(root, excludes, is_cpp_source_file)
}

/// Files touched since the last commit: unstaged + staged changes and
/// untracked files, filtered by `pred`. Falls back to a full tree walk when
/// git is unavailable, so callers always get a usable file set.
pub fn changed_files<P>(
    tools: &ToolsSection,
    root: &Path,
    excludes: &GlobSet,
    pred: P,
) -> Vec<PathBuf>
where
    P: Fn(&Path) -> bool,
{
    let queries: [&[&str]; 3] = [
        &["diff", "--name-only"],
        &["diff", "--cached", "--name-only"],
        &["ls-files", "--others", "--exclude-standard"],
    ];

    let mut listed = Vec::new();
    for args in queries {
        let out = Invocation::new(&tools.git)
            .args(args.iter().copied())
            .current_dir(root)
            .run();
        match out.output {
            Some(text) if out.success => listed.push(text),
            _ => return find_files(root, excludes, pred),
        }
    }

    let mut files: Vec<PathBuf> = listed
        .iter()
        .flat_map(|text| text.lines())
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| root.join(line))
        .filter(|path| {
            path.is_file() && !skipped_by_walk_rules(root, path, excludes) && pred(path)
        })
        .collect();

    files.sort();
    files.dedup();
    files
}

/// The same filtering a full tree walk applies, for paths git reported: the
/// exclude globs on the root-relative path, plus the per-component skip
/// rules.
fn skipped_by_walk_rules(root: &Path, path: &Path, excludes: &GlobSet) -> bool {
    let Ok(relative) = path.strip_prefix(root) else {
        return false;
    };
    if excludes.is_match(relative) {
        return true;
    }
    relative
        .components()
        .filter_map(|c| c.as_os_str().to_str())
        .any(skip_entry)
}

/// blake3 digest of a file's contents, as lowercase hex.
pub fn file_digest(path: &Path) -> Result<String> {
    let mut file =
        File::open(path).with_context(|| format!("opening file for hashing: {path:?}"))?;
    let mut hasher = Hasher::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// blake3 digest of an in-memory byte string, as lowercase hex.
pub fn content_digest(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use globset::GlobSet;

    use super::*;
    use crate::config::validate::build_exclude_globs;

    fn no_excludes() -> GlobSet {
        GlobSet::empty()
    }

    #[test]
    fn walk_skips_hidden_underscore_and_marked_entries() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();

        fs::create_dir(root.join("src")).unwrap();
        fs::create_dir(root.join(".git")).unwrap();
        fs::create_dir(root.join("_private")).unwrap();
        fs::create_dir(root.join("build_clang___")).unwrap();
        fs::write(root.join("src/a.cpp"), "int a;").unwrap();
        fs::write(root.join("src/.hidden.cpp"), "x").unwrap();
        fs::write(root.join(".git/b.cpp"), "x").unwrap();
        fs::write(root.join("_private/c.cpp"), "x").unwrap();
        fs::write(root.join("build_clang___/d.cpp"), "x").unwrap();

        let files = find_all_files(root, &no_excludes());
        assert_eq!(files, vec![root.join("src/a.cpp")]);
    }

    #[test]
    fn exclude_globs_filter_relative_paths() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();

        fs::create_dir(root.join("third_party")).unwrap();
        fs::write(root.join("third_party/x.cpp"), "x").unwrap();
        fs::write(root.join("keep.cpp"), "x").unwrap();

        let excludes = build_exclude_globs(&["third_party/**".to_string()]).unwrap();
        let files = find_all_cpp_source_files(root, &excludes);
        assert_eq!(files, vec![root.join("keep.cpp")]);
    }

    #[test]
    fn changed_files_apply_the_walk_rules_on_the_git_path() {
        let tmp = tempfile::tempdir().unwrap();
        let root = fs::canonicalize(tmp.path()).unwrap();
        let tools = ToolsSection::default();
        assert!(
            Invocation::new(&tools.git)
                .arg("init")
                .current_dir(&root)
                .run()
                .success
        );

        fs::create_dir(root.join("third_party")).unwrap();
        fs::write(root.join("third_party/vendored.cpp"), "int v;").unwrap();
        fs::create_dir(root.join("_scratch")).unwrap();
        fs::write(root.join("_scratch/tmp.cpp"), "int t;").unwrap();
        fs::write(root.join("changed.cpp"), "int c;").unwrap();

        let excludes = build_exclude_globs(&["third_party/**".to_string()]).unwrap();
        let files = changed_files(&tools, &root, &excludes, is_cpp_source_file);
        assert_eq!(files, vec![root.join("changed.cpp")]);
    }

    #[test]
    fn predicates_match_expected_kinds() {
        assert!(is_cmake_file(Path::new("a/CMakeLists.txt")));
        assert!(is_cmake_file(Path::new("a/module.cmake")));
        assert!(is_cpp_file(Path::new("x.hpp")));
        assert!(is_cpp_source_file(Path::new("x.cpp")));
        assert!(!is_cpp_source_file(Path::new("x.hpp")));
        assert!(is_docker_file(Path::new("a/Dockerfile")));
        assert!(is_python_file(Path::new("b.py")));
        assert!(!is_json_file(Path::new("b.py")));
    }

    #[test]
    fn digest_is_stable_and_matches_content_digest() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("f");
        fs::write(&path, b"payload").unwrap();

        assert_eq!(file_digest(&path).unwrap(), content_digest(b"payload"));
    }
}
