use crate::runner::{Invocation, ToolRunner};
use crate::ToolError;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

#[derive(Debug, Clone, Default)]
struct Script {
    stdout: Vec<u8>,
    exit_code: i32,
    files: Vec<(PathBuf, Vec<u8>)>,
}

/// A [`ToolRunner`] that answers from scripted responses keyed by the full
/// command line, and records every invocation.
///
/// Commands without a script fail with exit code 127, like a shell would
/// for a missing program.
#[derive(Debug, Default)]
pub struct MockRunner {
    scripts: HashMap<String, Script>,
    calls: Mutex<Vec<String>>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_output(mut self, command: &str, stdout: impl Into<Vec<u8>>) -> Self {
        self.scripts.entry(command.to_owned()).or_default().stdout = stdout.into();
        self
    }

    #[must_use]
    pub fn with_failure(mut self, command: &str, exit_code: i32) -> Self {
        self.scripts.entry(command.to_owned()).or_default().exit_code = exit_code;
        self
    }

    /// Have `command` create `path` with `contents` when it runs successfully.
    #[must_use]
    pub fn with_file(
        mut self,
        command: &str,
        path: impl Into<PathBuf>,
        contents: impl Into<Vec<u8>>,
    ) -> Self {
        self.scripts
            .entry(command.to_owned())
            .or_default()
            .files
            .push((path.into(), contents.into()));
        self
    }

    /// Command lines run so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl ToolRunner for MockRunner {
    fn run(&self, invocation: &Invocation) -> Result<Vec<u8>, ToolError> {
        let command = invocation.to_string();
        self.calls
            .lock()
            .map_err(|_| ToolError::Poisoned)?
            .push(command.clone());

        let Some(script) = self.scripts.get(&command) else {
            return Err(ToolError::Failed {
                command,
                code: Some(127),
                stderr: "no scripted response".to_owned(),
            });
        };
        if script.exit_code != 0 {
            return Err(ToolError::Failed {
                command,
                code: Some(script.exit_code),
                stderr: String::new(),
            });
        }
        for (path, contents) in &script.files {
            std::fs::write(path, contents)?;
        }
        Ok(script.stdout.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_output_is_returned() {
        let runner = MockRunner::new().with_output("ldd /bin/x", "out");
        let out = runner.run(&Invocation::new("ldd").arg("/bin/x")).unwrap();
        assert_eq!(out, b"out");
    }

    #[test]
    fn unscripted_command_fails() {
        let runner = MockRunner::new();
        let err = runner.run(&Invocation::new("ldd").arg("/bin/y")).unwrap_err();
        assert!(matches!(err, ToolError::Failed { code: Some(127), .. }));
        assert_eq!(runner.calls(), vec!["ldd /bin/y"]);
    }

    #[test]
    fn scripted_files_are_written() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("token");
        let runner = MockRunner::new().with_file("mk", &target, "tok");
        runner.run(&Invocation::new("mk")).unwrap();
        assert_eq!(std::fs::read_to_string(target).unwrap(), "tok");
    }
}
