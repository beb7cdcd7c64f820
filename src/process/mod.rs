//! Subprocess execution port.
//!
//! All git and npm calls go through [`CommandRunner`] with an explicit working
//! directory, so nothing in the pipeline depends on the process-wide cwd.

mod runner;

pub use runner::SystemRunner;

use crate::error::Result;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};

/// How a subprocess's output streams are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Capture stdout/stderr and log them
    Capture,
    /// Capture stdout/stderr but only surface them on failure
    Quiet,
    /// Stream output straight to the terminal
    Inherit,
}

/// A single command to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: String,
    args: Vec<String>,
    cwd: PathBuf,
    mode: OutputMode,
}

impl Invocation {
    /// Start building an invocation of `program` in `cwd`
    pub fn new(program: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.into(),
            mode: OutputMode::Capture,
        }
    }

    /// `git` in `cwd`
    pub fn git(cwd: impl Into<PathBuf>) -> Self {
        Self::new("git", cwd)
    }

    /// `npm` in `cwd`
    pub fn npm(cwd: impl Into<PathBuf>) -> Self {
        Self::new("npm", cwd)
    }

    /// Append one argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the output mode
    pub fn mode(mut self, mode: OutputMode) -> Self {
        self.mode = mode;
        self
    }

    /// Program name
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments
    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// Working directory
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Output mode
    pub fn output_mode(&self) -> OutputMode {
        self.mode
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) || arg.contains('"') {
                write!(f, " \"{}\"", arg.replace('"', "\\\""))?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Runs external commands.
///
/// Implementations return captured stdout on success and fail with
/// [`crate::error::CommandError::Failed`] (carrying stdout and stderr) on a
/// non-zero exit.
pub trait CommandRunner: Clone + Send + Sync + 'static {
    /// Run the invocation to completion
    fn execute(&self, invocation: &Invocation) -> impl Future<Output = Result<String>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_quotes_arguments_with_spaces() {
        let inv = Invocation::git("/repo").args(["commit", "-m", "chore: release [skip ci]"]);
        assert_eq!(inv.to_string(), "git commit -m \"chore: release [skip ci]\"");
    }

    #[test]
    fn test_builder_defaults_to_capture() {
        let inv = Invocation::npm("/repo").arg("install");
        assert_eq!(inv.output_mode(), OutputMode::Capture);
        assert_eq!(inv.program(), "npm");
        assert_eq!(inv.arguments(), ["install".to_string()]);
    }
}
