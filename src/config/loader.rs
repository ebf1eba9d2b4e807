// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::model::ConfigFile;
use crate::config::validate::validate_config;

/// Load a configuration file from a given path and return the raw
/// [`ConfigFile`].
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    let contents =
        fs::read_to_string(path).with_context(|| format!("reading config file at {path:?}"))?;

    let config: ConfigFile = toml::from_str(&contents)
        .with_context(|| format!("parsing TOML config from {path:?}"))?;

    Ok(config)
}

/// Load a configuration file and run semantic validation.
///
/// A missing file is not an error: the defaults describe a conventional
/// project layout, so taskforge works out of the box in a tree that follows
/// it.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    let config = if path.is_file() {
        load_from_path(path)?
    } else {
        ConfigFile::default()
    };
    validate_config(&config)?;
    Ok(config)
}

/// Default config path: `Taskforge.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Taskforge.toml")
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let cfg = load_and_validate("/definitely/not/a/real/Taskforge.toml").unwrap();
        assert_eq!(cfg.project.library_name, "core");
        assert_eq!(cfg.tools.cmake, "cmake");
    }

    #[test]
    fn partial_file_keeps_defaults_for_the_rest() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[project]\nlibrary_name = \"widget\"\n\n[tools]\nclang_cxx = \"clang++-20\"\n"
        )
        .unwrap();

        let cfg = load_and_validate(file.path()).unwrap();
        assert_eq!(cfg.project.library_name, "widget");
        assert_eq!(cfg.tools.clang_cxx, "clang++-20");
        assert_eq!(cfg.tools.gcc_cxx, "g++");
    }

    #[test]
    fn malformed_toml_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[project\nroot = ").unwrap();
        assert!(load_and_validate(file.path()).is_err());
    }
}
