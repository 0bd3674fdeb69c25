//! Subprocess helpers for the external tools the pipeline drives
//! (`rsync`, `chmod`, `chown`, `hostname`, shell commands from templates).
use anyhow::{Context, Result, bail};
use std::path::Path;
use std::process::{Command, Output};

/// Result of a command execution.
#[derive(Debug)]
pub struct ExecResult {
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
    /// Whether the process exited with status zero.
    pub success: bool,
    /// Exit code, `None` when terminated by a signal.
    pub code: Option<i32>,
}

impl ExecResult {
    /// Non-empty lines of stdout followed by stderr.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.stdout
            .lines()
            .chain(self.stderr.lines())
            .filter(|l| !l.trim().is_empty())
    }
}

impl From<Output> for ExecResult {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            code: output.status.code(),
        }
    }
}

/// Execute a command and return the result, bailing on non-zero exit.
fn execute_checked(mut cmd: Command, label: &str) -> Result<ExecResult> {
    let output = cmd
        .output()
        .with_context(|| format!("failed to execute: {label}"))?;
    let result = ExecResult::from(output);
    if !result.success {
        bail!(
            "{label} failed (exit {}): {}",
            result.code.unwrap_or(-1),
            result.stderr.trim()
        );
    }
    Ok(result)
}

/// Run a command and return its output. Fails if the command exits non-zero.
///
/// # Errors
///
/// Returns an error if the program cannot be spawned or exits non-zero.
pub fn run<S: AsRef<std::ffi::OsStr>>(program: impl AsRef<Path>, args: &[S]) -> Result<ExecResult> {
    let program = program.as_ref();
    let mut cmd = Command::new(program);
    cmd.args(args);
    execute_checked(cmd, &program.display().to_string())
}

/// Run a command, allowing failure (returns result without bailing).
///
/// # Errors
///
/// Returns an error only if the program cannot be spawned.
pub fn run_unchecked<S: AsRef<std::ffi::OsStr>>(
    program: impl AsRef<Path>,
    args: &[S],
) -> Result<ExecResult> {
    let program = program.as_ref();
    let output = Command::new(program)
        .args(args)
        .output()
        .with_context(|| format!("failed to execute: {}", program.display()))?;

    Ok(ExecResult::from(output))
}

/// Run `command` through `sh -c`, returning its output whatever the exit
/// status.
///
/// # Errors
///
/// Returns an error if the shell cannot be spawned.
pub fn run_shell(command: &str) -> Result<ExecResult> {
    run_unchecked("sh", &["-c", command])
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn run_echo() {
        let result = run("echo", &["hello"]).unwrap();
        assert!(result.success, "echo command should succeed");
        assert_eq!(result.stdout.trim(), "hello");
    }

    #[test]
    fn run_failure() {
        let err = run("false", &[] as &[&str]).unwrap_err();
        assert!(err.to_string().contains("false failed (exit 1)"), "{err}");
    }

    #[test]
    fn run_unchecked_failure() {
        let result = run_unchecked("false", &[] as &[&str]).unwrap();
        assert!(!result.success, "non-zero exit should set success=false");
        assert_eq!(result.code, Some(1));
    }

    #[test]
    fn run_missing_program() {
        assert!(run_unchecked("this-program-does-not-exist-12345", &["x"]).is_err());
    }

    #[test]
    fn run_shell_keeps_output_on_failure() {
        let result = run_shell("echo partial; echo oops >&2; exit 3").unwrap();
        assert!(!result.success);
        assert_eq!(result.code, Some(3));
        assert_eq!(result.lines().collect::<Vec<_>>(), vec!["partial", "oops"]);
    }
}
