// src/exec/process.rs

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

/// Outcome of a single external command.
///
/// `output` is the combined stdout + stderr text; when the command could not
/// be spawned at all (e.g. the binary is not installed) it carries the spawn
/// error instead.
pub struct RunOutput {
    pub success: bool,
    pub output: Option<String>,
}

impl RunOutput {
    /// Print the captured output (when present) and return whether the
    /// command succeeded. The printing happens at the point of failure so the
    /// operator sees the underlying tool's diagnostics, not just "failed".
    pub fn report_on_failure(self) -> bool {
        if !self.success
            && let Some(text) = &self.output
        {
            println!("{text}");
        }
        self.success
    }
}

/// A single external command: program, arguments, optional working directory
/// and environment overrides. Built up fluently, executed with [`run`].
///
/// [`run`]: Invocation::run
pub struct Invocation {
    program: String,
    args: Vec<String>,
    cwd: Option<PathBuf>,
    envs: Vec<(String, String)>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            envs: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn envs(mut self, envs: &[(String, String)]) -> Self {
        self.envs.extend(envs.iter().cloned());
        self
    }

    /// Execute the command, blocking until it exits, capturing combined
    /// output. Spawn failures are reported as an unsuccessful run whose
    /// output names the missing tool; the command line is logged either way.
    pub fn run(&self) -> RunOutput {
        debug!(program = %self.program, args = ?self.args, "running external command");

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }
        for (key, value) in &self.envs {
            cmd.env(key, value);
        }

        match cmd.output() {
            Ok(out) => {
                let mut text = String::from("\n");
                text.push_str(&String::from_utf8_lossy(&out.stdout));
                text.push_str(&String::from_utf8_lossy(&out.stderr));
                text.push('\n');

                RunOutput {
                    success: out.status.success(),
                    output: Some(text),
                }
            }
            Err(err) => {
                debug!(program = %self.program, error = %err, "failed to spawn command");
                RunOutput {
                    success: false,
                    output: Some(format!("Error: failed to run {}: {err}", self.program)),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_output_of_successful_command() {
        let out = Invocation::new("sh").arg("-c").arg("echo hello").run();
        assert!(out.success);
        assert!(out.output.unwrap().contains("hello"));
    }

    #[test]
    fn nonzero_exit_is_failure_with_output() {
        let out = Invocation::new("sh")
            .arg("-c")
            .arg("echo oops; exit 3")
            .run();
        assert!(!out.success);
        assert!(out.output.unwrap().contains("oops"));
    }

    #[test]
    fn missing_binary_names_the_tool_in_the_output() {
        let out = Invocation::new("definitely-not-a-real-binary-42").run();
        assert!(!out.success);
        let text = out.output.unwrap();
        assert!(text.contains("failed to run definitely-not-a-real-binary-42"));
    }
}
