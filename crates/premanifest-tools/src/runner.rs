use crate::ToolError;
use std::fmt;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::debug;

/// A program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn arg_path(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy())
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Run an external tool and capture its stdout.
///
/// Implementations must treat a non-zero exit as an error; callers never
/// retry.
pub trait ToolRunner: Send + Sync {
    fn run(&self, invocation: &Invocation) -> Result<Vec<u8>, ToolError>;
}

impl<T: ToolRunner + ?Sized> ToolRunner for std::sync::Arc<T> {
    fn run(&self, invocation: &Invocation) -> Result<Vec<u8>, ToolError> {
        (**self).run(invocation)
    }
}

/// Runs tools as child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner {
    passthrough_stderr: bool,
}

impl SystemRunner {
    /// With `passthrough_stderr`, tool diagnostics go straight to our stderr
    /// instead of being captured into the error message.
    pub fn new(passthrough_stderr: bool) -> Self {
        Self { passthrough_stderr }
    }
}

impl ToolRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> Result<Vec<u8>, ToolError> {
        debug!("running cmd: {invocation}");
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args).stdin(Stdio::null());
        if self.passthrough_stderr {
            cmd.stderr(Stdio::inherit());
        }

        let output = cmd.output().map_err(|source| ToolError::Spawn {
            command: invocation.to_string(),
            source,
        })?;

        if !output.status.success() {
            return Err(ToolError::Failed {
                command: invocation.to_string(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }
        Ok(output.stdout)
    }
}
