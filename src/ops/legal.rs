// src/ops/legal.rs

//! Licensing checks: the license file itself, and the copyright comment
//! block every source file must open with.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Datelike;
use rayon::prelude::*;
use regex::Regex;
use tracing::error;

use crate::config::model::LegalSection;
use crate::ops::files::{
    self, is_bash_file, is_cmake_file, is_cpp_file, is_docker_file, is_python_file,
};

/// Files whose first lines must carry the copyright comment block.
pub fn needs_licensing_comment(path: &Path) -> bool {
    is_bash_file(path)
        || is_cmake_file(path)
        || is_cpp_file(path)
        || is_docker_file(path)
        || is_python_file(path)
}

fn current_year() -> i32 {
    chrono::Local::now().year()
}

/// Validate a bare `Copyright (c) ...` notice: holder name must match, the
/// year (or end of the year range) must equal the current year, and ranges
/// must be increasing.
fn validate_notice(legal: &LegalSection, file: &Path, notice: &str) -> Result<Option<String>> {
    let single_year = Regex::new(r"^Copyright \(c\) ([0-9]{4}) (.+)$")?;
    let year_range = Regex::new(r"^Copyright \(c\) ([0-9]{4})-([0-9]{4}) (.+)$")?;
    let now = current_year();

    if let Some(caps) = year_range.captures(notice) {
        let start: i32 = caps[1].parse()?;
        let end: i32 = caps[2].parse()?;
        let name = &caps[3];

        if name != legal.copyright_holder {
            return Ok(Some(format!(
                "Error ({file:?}):\nUnexpected copyright holder name \"{name}\", \
                 expected \"{}\"",
                legal.copyright_holder
            )));
        }
        if end <= start {
            return Ok(Some(format!(
                "Error ({file:?}):\nMalformed year range in notice of copyright ({start}-{end})"
            )));
        }
        if now < end {
            return Ok(Some(format!(
                "Error ({file:?}):\nYear in notice of copyright appears to be in the future \
                 ({start}-{end}; current year is {now})"
            )));
        }
        if end != now {
            return Ok(Some(format!(
                "Error ({file:?}):\nNotice of copyright begins with \
                 \"Copyright (c) {start}-{end}\", but it should begin with \
                 \"Copyright (c) {start}-{now}\""
            )));
        }
        return Ok(None);
    }

    if let Some(caps) = single_year.captures(notice) {
        let start: i32 = caps[1].parse()?;
        let name = &caps[2];

        if name != legal.copyright_holder {
            return Ok(Some(format!(
                "Error ({file:?}):\nUnexpected copyright holder name \"{name}\", \
                 expected \"{}\"",
                legal.copyright_holder
            )));
        }
        if now < start {
            return Ok(Some(format!(
                "Error ({file:?}):\nYear in notice of copyright appears to be in the future \
                 ({start}; current year is {now})"
            )));
        }
        if start != now {
            return Ok(Some(format!(
                "Error ({file:?}):\nNotice of copyright begins with \
                 \"Copyright (c) {start}\", but it should begin with \
                 \"Copyright (c) {start}-{now}\""
            )));
        }
        return Ok(None);
    }

    Ok(Some(format!(
        "Error ({file:?}):\nNotice of copyright not found or is malformed"
    )))
}

/// Check the comment block in the first three lines of one file: exactly one
/// copyright notice, one matching SPDX identifier, and one license-file
/// reference line.
fn check_comment_block(legal: &LegalSection, file: &Path) -> Result<Option<String>> {
    let notice_line = Regex::new(r"^(?://|#) (Copyright \(c\) [0-9]{4}[- ].+)$")?;
    let spdx_line = Regex::new(r"^(?://|#) SPDX-License-Identifier: (.+)$")?;
    let reference_line = Regex::new(r"^(?://|#) For license details, see LICENSE file$")?;

    let text = fs::read_to_string(file).with_context(|| format!("reading {file:?}"))?;
    let head: Vec<&str> = text.lines().take(3).map(str::trim).collect();

    let notices: Vec<&str> = head
        .iter()
        .filter_map(|line| notice_line.captures(line))
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .collect();
    let [notice] = notices[..] else {
        return Ok(Some(format!(
            "Error ({file:?}):\nNotice of copyright not found or multiple lines matched in error"
        )));
    };
    if let Some(problem) = validate_notice(legal, file, notice)? {
        return Ok(Some(problem));
    }

    let spdx_ids: Vec<&str> = head
        .iter()
        .filter_map(|line| spdx_line.captures(line))
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .collect();
    let [spdx_id] = spdx_ids[..] else {
        return Ok(Some(format!(
            "Error ({file:?}):\nSPDX-License-Identifier not found or multiple lines matched \
             in error"
        )));
    };
    if spdx_id != legal.spdx_license_id {
        return Ok(Some(format!(
            "Error ({file:?}):\nUnexpected SPDX-License-Identifier: expected {}, found {spdx_id}",
            legal.spdx_license_id
        )));
    }

    if head.iter().filter(|line| reference_line.is_match(line)).count() != 1 {
        return Ok(Some(format!(
            "Error ({file:?}):\nReference to LICENSE file not found or multiple lines matched \
             in error"
        )));
    }

    Ok(None)
}

/// Check copyright comments across `files`, fanning out over the thread
/// pool. Prints every problem found; returns whether all files passed.
pub fn check_copyright_comments(legal: &LegalSection, candidates: &[PathBuf]) -> bool {
    let problems: Vec<String> = candidates
        .par_iter()
        .filter(|path| needs_licensing_comment(path))
        .filter_map(|path| match check_comment_block(legal, path) {
            Ok(problem) => problem.map(|text| (path, text)),
            Err(err) => Some((path, format!("Error ({path:?}):\n{err:#}"))),
        })
        .map(|(path, text)| format!("Error: {path:?}\nIncorrect copyright comment\n{text}"))
        .collect();

    for problem in &problems {
        println!("{problem}");
    }
    problems.is_empty()
}

/// Check the license file: existence, optional pinned digest, and exactly
/// one valid copyright notice inside it.
pub fn check_license_file(legal: &LegalSection, license_path: &Path) -> bool {
    match check_license_file_inner(legal, license_path) {
        Ok(None) => true,
        Ok(Some(problem)) => {
            println!("{problem}");
            false
        }
        Err(err) => {
            error!("license check failed: {err:#}");
            false
        }
    }
}

fn check_license_file_inner(legal: &LegalSection, license_path: &Path) -> Result<Option<String>> {
    if !license_path.is_file() {
        return Ok(Some(format!(
            "Error: file {license_path:?} does not exist"
        )));
    }

    if let Some(expected) = &legal.license_digest {
        let digest = files::file_digest(license_path)?;
        if digest != *expected {
            return Ok(Some(format!(
                "Unexpected license file digest: {digest}\n\
                 Verify the license file is correct and update legal.license_digest \
                 in the configuration"
            )));
        }
    }

    let notice_line = Regex::new(r"^Copyright \(c\) [0-9]{4}[- ].+$")?;
    let text = fs::read_to_string(license_path)
        .with_context(|| format!("reading {license_path:?}"))?;
    let notices: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| notice_line.is_match(line))
        .collect();
    let [notice] = notices[..] else {
        return Ok(Some(format!(
            "Error ({license_path:?}):\nNotice of copyright not found or multiple lines \
             matched in error"
        )));
    };

    validate_notice(legal, license_path, notice)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn legal() -> LegalSection {
        LegalSection {
            copyright_holder: "Wojciech Kałuża".to_string(),
            spdx_license_id: "MIT".to_string(),
            license_digest: None,
        }
    }

    fn header(year_part: &str) -> String {
        format!(
            "// Copyright (c) {year_part} Wojciech Kałuża\n\
             // SPDX-License-Identifier: MIT\n\
             // For license details, see LICENSE file\n\
             int x;\n"
        )
    }

    #[test]
    fn current_year_comment_block_passes() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("good.cpp");
        fs::write(&file, header(&current_year().to_string())).unwrap();

        assert!(check_copyright_comments(&legal(), &[file]));
    }

    #[test]
    fn range_ending_this_year_passes() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("ranged.cpp");
        fs::write(&file, header(&format!("2020-{}", current_year()))).unwrap();

        assert!(check_copyright_comments(&legal(), &[file]));
    }

    #[test]
    fn stale_year_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("stale.cpp");
        fs::write(&file, header("2020")).unwrap();

        assert!(!check_copyright_comments(&legal(), &[file]));
    }

    #[test]
    fn wrong_holder_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("holder.cpp");
        let text = format!(
            "// Copyright (c) {} Somebody Else\n\
             // SPDX-License-Identifier: MIT\n\
             // For license details, see LICENSE file\n",
            current_year()
        );
        fs::write(&file, text).unwrap();

        assert!(!check_copyright_comments(&legal(), &[file]));
    }

    #[test]
    fn missing_spdx_line_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("spdx.py");
        let text = format!(
            "# Copyright (c) {} Wojciech Kałuża\n\
             # For license details, see LICENSE file\n",
            current_year()
        );
        fs::write(&file, text).unwrap();

        assert!(!check_copyright_comments(&legal(), &[file]));
    }

    #[test]
    fn files_outside_licensed_kinds_are_ignored() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("notes.md");
        fs::write(&file, "no header at all").unwrap();

        assert!(check_copyright_comments(&legal(), &[file]));
    }

    #[test]
    fn license_file_with_pinned_digest() {
        let tmp = tempfile::tempdir().unwrap();
        let license = tmp.path().join("LICENSE");
        let body = format!(
            "MIT License\n\nCopyright (c) 2020-{} Wojciech Kałuża\n",
            current_year()
        );
        fs::write(&license, &body).unwrap();

        let mut section = legal();
        section.license_digest = Some(files::content_digest(body.as_bytes()));
        assert!(check_license_file(&section, &license));

        section.license_digest = Some("0".repeat(64));
        assert!(!check_license_file(&section, &license));
    }

    #[test]
    fn missing_license_file_fails() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(!check_license_file(&legal(), &tmp.path().join("LICENSE")));
    }
}
